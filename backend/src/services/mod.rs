//! Module for core business logic services.
//!
//! This module encapsulates services that perform specific business
//! operations and orchestrate interactions between different parts of the
//! application, such as issuing verification tokens or sending email.

pub mod email_service;
pub mod verification_service;
