//! Domain models for AshtonPath.

mod journal;
mod medication;
mod plan;

pub use journal::*;
pub use medication::*;
pub use plan::*;
