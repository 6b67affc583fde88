//! Heuristics module for the TSP.
//!
//! This module exports the route operators, construction heuristics and the
//! four search strategies.

pub mod operators;
pub mod construction;
pub mod annealing;
pub mod tabu;
pub mod genetic;
pub mod aco;

pub use operators::*;
pub use construction::*;
pub use annealing::*;
pub use tabu::*;
pub use genetic::*;
pub use aco::*;
