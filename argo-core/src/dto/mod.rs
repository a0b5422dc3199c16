//! Data Transfer Objects
//!
//! Request and response bodies exchanged with the control plane and the
//! identity service. Domain entities that travel unchanged over the wire
//! live in [`crate::domain`].

pub mod auth;
pub mod callback;
pub mod secrets;
