//! Shared API plumbing.
//!
//! Core authentication routes live under `crate::auth`; this module holds
//! the response envelope and error-to-HTTP mapping they share.

pub mod common;
