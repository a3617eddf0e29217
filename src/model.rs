//! Model-wide configuration.
pub mod parameters;
pub use parameters::{ModelParameters, ShiftLimit};
