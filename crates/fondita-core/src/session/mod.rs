//! Session domain module.
//!
//! - `model`: The session record and its expiry policy
//! - `store`: Store trait for issuing, validating and revoking tokens

mod model;
mod store;

pub use model::{Session, SessionPolicy};
pub use store::SessionStore;
