//! Shared plumbing for the ovpn workspace: wire error codes, default
//! paths, and small persistence helpers.

pub mod api;
pub mod error;
pub mod paths;
pub mod persist;
