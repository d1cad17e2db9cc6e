//! Native layouts shared by all types.

pub mod array;
pub mod handle;
