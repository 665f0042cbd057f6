//! Menu use cases: reading the document for clients and saving admin edits.

use fondita_core::error::Result;
use fondita_core::image::ImageStore;
use fondita_core::menu::{MenuDocument, MenuRepository};
use std::sync::Arc;

/// Coordinates the document store and the image store.
///
/// Every document handed out or persisted goes through
/// [`MenuDocument::normalize`], and references to images that no longer
/// exist are cleared so clients never render a broken link.
#[derive(Clone)]
pub struct MenuService {
    repository: Arc<dyn MenuRepository>,
    images: Arc<dyn ImageStore>,
    week_days: usize,
}

impl MenuService {
    pub fn new(
        repository: Arc<dyn MenuRepository>,
        images: Arc<dyn ImageStore>,
        week_days: usize,
    ) -> Self {
        Self {
            repository,
            images,
            week_days,
        }
    }

    /// Loads the document, substituting the empty document when none exists.
    ///
    /// A corrupt document is still an error; it is never silently replaced.
    pub async fn load_or_default(&self) -> Result<MenuDocument> {
        let mut document = match self.repository.load().await {
            Ok(document) => document,
            Err(e) if e.is_not_found() => {
                tracing::debug!("No menu saved yet, serving the empty document");
                MenuDocument::empty()
            }
            Err(e) => return Err(e),
        };

        document.normalize(self.week_days);
        self.clear_missing_images(&mut document).await?;
        Ok(document)
    }

    /// Validates, normalizes and persists `document`.
    ///
    /// Returns the document as stored.
    pub async fn save(&self, mut document: MenuDocument) -> Result<MenuDocument> {
        document.validate()?;
        document.normalize(self.week_days);
        self.clear_missing_images(&mut document).await?;

        self.repository.save(&document).await?;
        tracing::info!(version = %document.version(), "Menu saved");
        Ok(document)
    }

    /// The version token of the current document.
    pub async fn current_version(&self) -> Result<String> {
        Ok(self.load_or_default().await?.version())
    }

    async fn clear_missing_images(&self, document: &mut MenuDocument) -> Result<()> {
        if document.referenced_images().is_empty() {
            return Ok(());
        }
        let existing = self.images.list().await?;
        for image in document.clear_missing_images(&existing) {
            tracing::warn!(image = %image, "Menu references a missing image; reference cleared");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fondita_core::image::UploadPolicy;
    use fondita_core::menu::{CartaItem, DayEntry};
    use fondita_core::FonditaError;
    use fondita_infrastructure::{FileSystemImageStore, JsonMenuRepository};
    use tempfile::TempDir;

    async fn service(temp_dir: &TempDir) -> (MenuService, Arc<FileSystemImageStore>) {
        let repository = Arc::new(JsonMenuRepository::new(temp_dir.path().join("data/menu.json")));
        let images = Arc::new(
            FileSystemImageStore::new(temp_dir.path().join("img"), UploadPolicy::default())
                .await
                .unwrap(),
        );
        (MenuService::new(repository, images.clone(), 5), images)
    }

    #[tokio::test]
    async fn test_empty_store_serves_padded_empty_document() {
        let temp_dir = TempDir::new().unwrap();
        let (menu, _images) = service(&temp_dir).await;

        let document = menu.load_or_default().await.unwrap();
        assert_eq!(document.carta.len(), 1);
        assert_eq!(document.week_schedule.len(), 5);
        assert_eq!(document.week_schedule[2].day, "Miércoles");
    }

    #[tokio::test]
    async fn test_save_splits_dishes_and_keeps_fields() {
        let temp_dir = TempDir::new().unwrap();
        let (menu, _images) = service(&temp_dir).await;

        let document: MenuDocument = serde_json::from_str(
            r#"{
                "carta": [{ "name": "Sopa", "price": "$50" }],
                "weekSchedule": [{ "day": "Lunes", "platillos": "Sopa, Agua" }]
            }"#,
        )
        .unwrap();
        menu.save(document).await.unwrap();

        let loaded = menu.load_or_default().await.unwrap();
        assert_eq!(loaded.carta[0].name, "Sopa");
        assert_eq!(loaded.carta[0].price, "$50");
        assert_eq!(loaded.week_schedule[0].dishes, vec!["Sopa", "Agua"]);
    }

    #[tokio::test]
    async fn test_save_rejects_invalid_document() {
        let temp_dir = TempDir::new().unwrap();
        let (menu, _images) = service(&temp_dir).await;

        let document = MenuDocument {
            carta: vec![CartaItem::default(), CartaItem::default()],
            week_schedule: Vec::new(),
        };
        assert!(matches!(
            menu.save(document).await,
            Err(FonditaError::Validation(_))
        ));
        assert!(!temp_dir.path().join("data/menu.json").exists());
    }

    #[tokio::test]
    async fn test_missing_images_are_cleared() {
        let temp_dir = TempDir::new().unwrap();
        let (menu, images) = service(&temp_dir).await;
        let kept = images.put(b"jpeg", "lunes.jpg", "image/jpeg").await.unwrap();

        let document = MenuDocument {
            carta: vec![CartaItem::default()],
            week_schedule: vec![
                DayEntry {
                    day: "Lunes".to_string(),
                    image: kept.clone(),
                    ..DayEntry::default()
                },
                DayEntry {
                    day: "Martes".to_string(),
                    image: "tuesday.jpg".to_string(),
                    ..DayEntry::default()
                },
            ],
        };
        let saved = menu.save(document).await.unwrap();
        assert_eq!(saved.week_schedule[0].image, kept);
        assert_eq!(saved.week_schedule[1].image, "");
    }

    #[tokio::test]
    async fn test_corrupt_document_is_not_replaced() {
        let temp_dir = TempDir::new().unwrap();
        let (menu, _images) = service(&temp_dir).await;
        std::fs::create_dir_all(temp_dir.path().join("data")).unwrap();
        std::fs::write(temp_dir.path().join("data/menu.json"), "not json").unwrap();

        let err = menu.load_or_default().await.unwrap_err();
        assert!(err.is_corrupt());
    }
}
