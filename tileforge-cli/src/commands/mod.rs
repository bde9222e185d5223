//! Command handlers.

pub mod acquire;
pub mod samples;
