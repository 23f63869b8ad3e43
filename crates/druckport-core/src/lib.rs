// SPDX-License-Identifier: MIT
// Druckport — Core types and error definitions shared across all crates.

pub mod config;
pub mod error;
pub mod types;

pub use config::ServerConfig;
pub use error::DruckportError;
pub use types::*;
