//! Persistence layer: repository traits and their sqlite implementations.

pub mod session_repository;
pub mod user_repository;
pub mod verification_repository;
