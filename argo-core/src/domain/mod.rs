//! Core domain types
//!
//! This module contains the entities owned by the control plane as seen by
//! the build task runner. They are read-only from the runner's perspective;
//! the only mutation the runner performs is the terminal callback
//! (see [`crate::dto::callback`]).

pub mod build_config;
pub mod build_run;
pub mod registry;
pub mod secret;

use serde::{Deserialize, Deserializer};

/// Deserializes `null` like a missing field
///
/// The control plane sends `null` for unset nested objects and lists.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
