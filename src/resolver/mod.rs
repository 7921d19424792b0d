//! Turns user-supplied year and coordinate specs into concrete ordered sequences.

pub mod coordinates;
pub mod error;
pub mod years;
