//! Domain layer for Fondita.
//!
//! Holds the menu document model, the admin session model and the traits the
//! outer layers implement: [`menu::MenuRepository`], [`image::ImageStore`],
//! [`session::SessionStore`] and [`publish::PublishRepository`]. Nothing in
//! this crate performs I/O.

pub mod clock;
pub mod config;
pub mod error;
pub mod image;
pub mod menu;
pub mod publish;
pub mod session;

// Re-export common error type
pub use error::{FonditaError, Result};
