//! Role-based access control.
//!
//! Users hold named roles; each role carries a boolean permission map. Checks
//! use OR semantics: holding any required role (or permission) is enough.

pub mod helpers;
pub mod models;
pub mod queries;
pub mod resolver;

pub use helpers::can_manage_floor;
pub use models::*;
pub use queries::*;
pub use resolver::{check_user_access, format_role_names, is_admin, is_floor_captain};
