//! Tenant Association Server
//!
//! Resident registration and verification, the resident directory and
//! floor-captain tooling, with notifications run as memoized workflow steps.

pub mod admin;
pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod directory;
pub mod email;
pub mod floors;
pub mod permissions;
pub mod workflow;
