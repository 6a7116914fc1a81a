//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate document store calls into registration use-cases.
//! - Keep CLI callers decoupled from storage details.

pub mod registration_service;
