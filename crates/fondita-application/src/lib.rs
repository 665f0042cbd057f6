//! Application layer for Fondita.
//!
//! This crate provides the use cases the HTTP layer calls: reading and saving
//! the menu, admin authentication, and publishing to the production site.

pub mod auth_service;
pub mod menu_service;
pub mod render;
pub mod replication;
pub mod scheduler;

pub use auth_service::{AdminCredentials, AuthService};
pub use menu_service::MenuService;
pub use replication::{ReplicationJob, ReplicationReport, ReplicationSettings};
pub use scheduler::{ReplicationScheduler, SyncState, SyncStatus};
