//! Menu repository trait.
//!
//! Defines the interface for menu document persistence.

use super::model::MenuDocument;
use crate::error::Result;
use async_trait::async_trait;

/// An abstract store for the single menu document.
///
/// The document is always read and written whole. There is deliberately no
/// partial update: callers load, mutate in memory and save.
///
/// # Implementation Notes
///
/// Implementations should handle:
/// - Atomic replacement on save so readers never see a partial document
/// - Serializing concurrent saves
#[async_trait]
pub trait MenuRepository: Send + Sync {
    /// Loads the document.
    ///
    /// # Returns
    ///
    /// - `Ok(MenuDocument)`: Document loaded
    /// - `Err(NotFound)`: Nothing has been saved yet
    /// - `Err(CorruptDocument)`: The stored content is not a menu document
    async fn load(&self) -> Result<MenuDocument>;

    /// Replaces the stored document with `document`.
    async fn save(&self, document: &MenuDocument) -> Result<()>;
}
