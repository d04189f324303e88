//! VaultMesh control panel
//!
//! The control plane sits between web clients and a VaultMesh storage node.
//! It authenticates callers, keeps file and user metadata in SQLite, and
//! brokers file payloads over the node's fixed-header binary TCP protocol.
//!
//! ## Services
//!
//! - **Bridge**: streaming upload/download relays over the node protocol
//! - **Auth**: Argon2 credentials and JWT bearer tokens
//! - **Metadata**: SQLite-backed user and file records
//! - **API**: axum REST surface for auth and file transfer

pub mod auth;
pub mod bridge;
pub mod config;
pub mod db;
pub mod protocol;
pub mod routes;
pub mod server;
pub mod types;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{Result, VaultError};
