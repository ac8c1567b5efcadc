//! Core business logic modules.

pub mod config;
pub mod dispatch;
pub mod normalize;
pub mod registry;
