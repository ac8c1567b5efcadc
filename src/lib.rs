//! Cloud credential inventory.
//!
//! Lists, creates and revokes long-lived API credentials across AWS IAM
//! access keys, GCP service-account keys and Aiven API tokens, normalizing
//! them into one [`Key`] record.
//!
//! ## Modules
//! - `cli` — Command-line handlers
//! - `core` — Registry, dispatcher, normalization, config loading
//! - `models` — Data structures
//! - `providers` — Provider adapters
//! - `util` — HTTP, request signing, XML, secret files

pub mod cli;
pub mod constants;
pub mod core;
pub mod error;
pub mod models;
pub mod providers;
pub mod util;

pub use crate::core::dispatch::{Dispatcher, FanOut, Inventory, RequestFailure};
pub use crate::core::registry::Registry;
pub use crate::error::{ErrorKind, KeysError};
pub use crate::models::key::{Key, KeyStatus, NewKey};
pub use crate::models::provider::Provider;
pub use crate::providers::KeyProvider;
