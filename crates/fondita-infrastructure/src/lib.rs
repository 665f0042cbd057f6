pub mod config_service;
pub mod fs_image_store;
pub mod git_working_tree;
pub mod json_menu_repository;
pub mod memory_publish_repository;
pub mod memory_session_store;
pub mod paths;
pub mod storage;

pub use crate::config_service::ConfigService;
pub use crate::fs_image_store::FileSystemImageStore;
pub use crate::git_working_tree::{GitSettings, GitWorkingTree};
pub use crate::json_menu_repository::JsonMenuRepository;
pub use crate::memory_publish_repository::InMemoryPublishRepository;
pub use crate::memory_session_store::{InMemorySessionStore, spawn_session_sweeper};
pub use crate::paths::FonditaPaths;
