//! Argo Core
//!
//! Core types and abstractions shared by the Argo build task runner.
//!
//! This crate contains:
//! - Domain types: control-plane entities (BuildRun, BuildConfig, registry access, secrets)
//! - DTOs: request/response bodies exchanged with the control plane and identity service
//! - Cancellation: the token threaded into every external call of a run

pub mod cancel;
pub mod domain;
pub mod dto;
