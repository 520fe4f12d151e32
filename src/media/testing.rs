//! Shared fixtures for media tests.

use bytes::Bytes;
use chrono::{TimeZone, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use std::sync::Arc;
use tempfile::TempDir;

use super::assets::{set_tags, AssetLibrary, AssetParams, Upload};
use super::contents;
use super::model::Visibility;
use crate::db::entities::{asset, asset_type, content_record};
use crate::db::init_database;
use crate::storage::{LocalStorage, StorageBackend};

const PNG_BYTES: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52,
    0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F, 0x15, 0xC4,
];

pub fn png_upload(file_name: &str) -> Upload {
    Upload {
        file_name: file_name.to_string(),
        content_type: Some("image/png".to_string()),
        data: Bytes::from_static(PNG_BYTES),
    }
}

pub fn text_upload(file_name: &str) -> Upload {
    Upload {
        file_name: file_name.to_string(),
        content_type: Some("text/plain".to_string()),
        data: Bytes::from_static(b"some notes"),
    }
}

/// Unix seconds of a UTC wall-clock time
pub fn timestamp(year: i32, month: u32, day: u32, hour: u32, minute: u32, second: u32) -> i64 {
    Utc.with_ymd_and_hms(year, month, day, hour, minute, second)
        .unwrap()
        .timestamp()
}

pub struct Fixture {
    _dir: TempDir,
    pub db: DatabaseConnection,
    pub storage: Arc<dyn StorageBackend>,
    pub library: AssetLibrary,
}

impl Fixture {
    pub async fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let db = init_database(&dir.path().join("media.db")).await.unwrap();
        let storage: Arc<dyn StorageBackend> = Arc::new(LocalStorage::new(dir.path().join("resources")));
        let library = AssetLibrary::new(db.clone(), storage.clone());
        Self {
            _dir: dir,
            db,
            storage,
            library,
        }
    }

    /// Number of stored resource files, across namespaces
    pub fn resource_count(&self) -> usize {
        fn count(dir: &std::path::Path) -> usize {
            let Ok(entries) = std::fs::read_dir(dir) else {
                return 0;
            };
            entries
                .flatten()
                .map(|e| if e.path().is_dir() { count(&e.path()) } else { 1 })
                .sum()
        }
        count(&self._dir.path().join("resources"))
    }

    pub async fn asset_type_id(&self, key: &str) -> i32 {
        asset_type::Entity::find()
            .filter(asset_type::Column::Key.eq(key))
            .one(&self.db)
            .await
            .unwrap()
            .unwrap()
            .id
    }

    /// Insert an asset row directly, with a fixed creation time
    pub async fn insert_asset(
        &self,
        name: &str,
        visibility: Visibility,
        type_key: &str,
        created_at: i64,
        tags: &[&str],
    ) -> asset::Model {
        let asset_type_id = self.asset_type_id(type_key).await;
        let model = asset::ActiveModel {
            name: Set(name.to_string()),
            description: Set(None),
            visibility: Set(visibility.as_str().to_string()),
            asset_type_id: Set(Some(asset_type_id)),
            file_name: Set(format!("{}.bin", name)),
            content_type: Set("application/octet-stream".to_string()),
            size: Set(0),
            checksum: Set(String::new()),
            storage_key: Set(format!("fixture{}", name.len())),
            locale: Set(None),
            created_at: Set(created_at),
            updated_at: Set(created_at),
            ..Default::default()
        }
        .insert(&self.db)
        .await
        .unwrap();

        let tags = tags.iter().map(|t| t.to_string()).collect();
        set_tags(&self.db, model.id, &tags).await.unwrap();
        model
    }

    pub async fn set_description(&self, id: i32, description: &str) {
        let existing = asset::Entity::find_by_id(id).one(&self.db).await.unwrap().unwrap();
        let mut model: asset::ActiveModel = existing.into();
        model.description = Set(Some(description.to_string()));
        model.update(&self.db).await.unwrap();
    }

    /// Create a public image asset through the library
    pub async fn upload(&self, name: &str) -> asset::Model {
        self.create(name, png_upload("image.png")).await
    }

    /// Create a public document asset through the library
    pub async fn upload_text(&self, name: &str) -> asset::Model {
        self.create(name, text_upload("notes.txt")).await
    }

    async fn create(&self, name: &str, upload: Upload) -> asset::Model {
        self.library
            .create(
                AssetParams {
                    name: Some(name.to_string()),
                    resource: Some(upload),
                    ..Default::default()
                },
                Visibility::Public,
            )
            .await
            .unwrap()
    }

    pub async fn record(&self, record_type: &str, locale: Option<&str>) -> content_record::Model {
        contents::create_record(&self.db, record_type, locale, None).await.unwrap()
    }
}
