//! Base data structures shared by the expression engine.
//!
//! This module provides the interval index used to locate fixed features on a
//! polymer and the weighted random draws used for stochastic selection.

pub mod interval;
pub mod random;

pub use interval::{Interval, IntervalTree};
pub use random::weighted_index;
