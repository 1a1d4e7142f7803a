//! Shared Types

pub mod events;
pub mod roles;
pub mod verification;

pub use events::*;
pub use roles::*;
pub use verification::*;
