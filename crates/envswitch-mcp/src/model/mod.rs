//! Environment domain types: per-environment config, the validated
//! aggregate, and the active-environment selection.

pub mod active;
pub mod configuration;
pub mod environment;

pub use active::*;
pub use configuration::*;
pub use environment::*;
