//! Domain model for course registration records.
//!
//! # Responsibility
//! - Define the flat document value model consumed by stores.
//! - Define the registration entity and its write payloads.
//!
//! # Invariants
//! - Every registration is identified by a store-assigned `RegistrationId`.
//! - Deletion is permanent; there are no tombstones.

pub mod registration;
pub mod value;
