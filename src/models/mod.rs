//! Core data models for the stats processor.

mod ids;
mod match_data;
mod summary;

pub use ids::*;
pub use match_data::*;
pub use summary::*;
