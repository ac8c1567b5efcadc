//! Utility modules for provider HTTP plumbing and secret files.

pub mod fs;
pub mod http;
pub mod sigv4;
pub mod xml;
