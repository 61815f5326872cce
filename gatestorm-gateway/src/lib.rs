//! Virtual-user archetypes for load and security probing of an HTTP API gateway.
//!
//! `ApiGatewayUser` produces realistic authenticated traffic. The four testers probe token
//! validation, token revocation, session-cookie handling and rate limiting, and record
//! their verdicts as named checks.

pub mod archetypes;
pub mod auth;
pub mod config;
pub mod directory;
mod error;
pub mod messages;
pub mod routes;

pub use archetypes::{Archetype, build_scenarios};
pub use config::{GatewayConfig, Login, WaitRange, YamlDuration};
pub use directory::{DirectoryEntry, UserDirectory, discover};
pub use error::{Error, Result};
