//! Tenant Association Common Library
//!
//! Shared types used by the server and by anything that produces workflow events.

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::*;
