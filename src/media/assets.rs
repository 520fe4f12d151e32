//! Asset library: creating, updating and destroying assets together with
//! their stored resources and tags.

use bytes::Bytes;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::sync::Arc;

use super::attachments::ASSET_OWNER_TYPE;
use super::model::{asset_type_key_for_mime, Visibility};
use crate::db::entities::{asset, asset_relation, asset_tag, asset_type, tag};
use crate::error::{Result, ServerError};
use crate::storage::StorageBackend;

const MAX_NAME_LEN: usize = 255;

/// An uploaded file
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    /// Content type declared by the client, if any
    pub content_type: Option<String>,
    pub data: Bytes,
}

/// Attribute changes submitted by the asset forms
#[derive(Debug, Clone, Default)]
pub struct AssetParams {
    pub name: Option<String>,
    pub description: Option<String>,
    /// Comma separated tag names; `Some("")` clears all tags
    pub tag_list: Option<String>,
    pub locale: Option<String>,
    pub resource: Option<Upload>,
}

/// Current unix time in seconds
pub fn now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

/// Split a comma separated tag list into unique, trimmed names
pub fn parse_tag_list(list: &str) -> BTreeSet<String> {
    list.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Asset operations over the database and the resource storage
#[derive(Clone)]
pub struct AssetLibrary {
    db: DatabaseConnection,
    storage: Arc<dyn StorageBackend>,
}

impl AssetLibrary {
    pub fn new(db: DatabaseConnection, storage: Arc<dyn StorageBackend>) -> Self {
        Self { db, storage }
    }

    pub async fn find(&self, id: i32) -> Result<asset::Model> {
        asset::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(ServerError::AssetNotFound(id))
    }

    /// Create an asset from an upload
    pub async fn create(&self, params: AssetParams, visibility: Visibility) -> Result<asset::Model> {
        let name = params.name.as_deref().map(str::trim).unwrap_or_default().to_string();

        let mut errors = validate_name(&name);
        match &params.resource {
            None => errors.push("Resource can't be blank".to_string()),
            Some(upload) if upload.data.is_empty() => {
                errors.push("Resource can't be empty".to_string())
            }
            Some(_) => {}
        }
        if !errors.is_empty() {
            return Err(ServerError::Validation(errors));
        }
        let Some(upload) = params.resource else {
            return Err(ServerError::Validation(vec!["Resource can't be blank".to_string()]));
        };

        let stored = self.store(&upload, visibility).await?;
        let description = params.description.filter(|d| !d.trim().is_empty());
        let locale = params.locale.filter(|l| !l.trim().is_empty());
        let tags = params.tag_list.as_deref().map(parse_tag_list);

        let result = self
            .insert_asset(name, description, locale, visibility, &upload, &stored, tags)
            .await;

        match result {
            Ok(model) => {
                tracing::info!("Created asset {} ({}, {} bytes)", model.id, model.visibility, model.size);
                Ok(model)
            }
            Err(e) => {
                // Do not leave an orphaned resource behind
                if let Err(cleanup) = self.storage.delete(visibility.namespace(), &stored.key).await {
                    tracing::warn!("Failed to remove resource {} after error: {}", stored.key, cleanup);
                }
                Err(e)
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn insert_asset(
        &self,
        name: String,
        description: Option<String>,
        locale: Option<String>,
        visibility: Visibility,
        upload: &Upload,
        stored: &StoredResource,
        tags: Option<BTreeSet<String>>,
    ) -> Result<asset::Model> {
        let created_at = now();
        let txn = self.db.begin().await?;

        let model = asset::ActiveModel {
            name: Set(name),
            description: Set(description),
            visibility: Set(visibility.as_str().to_string()),
            asset_type_id: Set(stored.asset_type_id),
            file_name: Set(upload.file_name.clone()),
            content_type: Set(stored.content_type.clone()),
            size: Set(upload.data.len() as i64),
            checksum: Set(stored.checksum.clone()),
            storage_key: Set(stored.key.clone()),
            locale: Set(locale),
            created_at: Set(created_at),
            updated_at: Set(created_at),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        if let Some(tags) = &tags {
            set_tags(&txn, model.id, tags).await?;
        }

        txn.commit().await?;
        Ok(model)
    }

    /// Update an asset's attributes and optionally replace its resource.
    /// Visibility is fixed at creation.
    pub async fn update(&self, id: i32, params: AssetParams) -> Result<asset::Model> {
        let existing = self.find(id).await?;
        let visibility = Visibility::parse(&existing.visibility).unwrap_or_default();

        let mut errors = Vec::new();
        if let Some(name) = &params.name {
            errors.extend(validate_name(name.trim()));
        }
        if matches!(&params.resource, Some(upload) if upload.data.is_empty()) {
            errors.push("Resource can't be empty".to_string());
        }
        if !errors.is_empty() {
            return Err(ServerError::Validation(errors));
        }

        let replaced = match &params.resource {
            Some(upload) => Some((upload, self.store(upload, visibility).await?)),
            None => None,
        };

        let result = self.write_update(&existing, &params, replaced.as_ref()).await;
        let updated = match result {
            Ok(model) => model,
            Err(e) => {
                // Keep the old resource and drop the one stored for this update
                if let Some((_, stored)) = &replaced {
                    if let Err(cleanup) = self.storage.delete(visibility.namespace(), &stored.key).await {
                        tracing::warn!("Failed to remove resource {} after error: {}", stored.key, cleanup);
                    }
                }
                return Err(e);
            }
        };

        if replaced.is_some() {
            if let Err(e) = self.storage.delete(visibility.namespace(), &existing.storage_key).await {
                tracing::warn!("Failed to remove replaced resource {}: {}", existing.storage_key, e);
            }
        }

        tracing::info!("Updated asset {}", id);
        Ok(updated)
    }

    async fn write_update(
        &self,
        existing: &asset::Model,
        params: &AssetParams,
        replaced: Option<&(&Upload, StoredResource)>,
    ) -> Result<asset::Model> {
        let txn = self.db.begin().await?;
        let mut model: asset::ActiveModel = existing.clone().into();
        if let Some(name) = &params.name {
            model.name = Set(name.trim().to_string());
        }
        if let Some(description) = &params.description {
            model.description = Set(Some(description.clone()).filter(|d| !d.trim().is_empty()));
        }
        if let Some(locale) = &params.locale {
            model.locale = Set(Some(locale.clone()).filter(|l| !l.trim().is_empty()));
        }
        if let Some((upload, stored)) = replaced {
            model.file_name = Set(upload.file_name.clone());
            model.content_type = Set(stored.content_type.clone());
            model.asset_type_id = Set(stored.asset_type_id);
            model.size = Set(upload.data.len() as i64);
            model.checksum = Set(stored.checksum.clone());
            model.storage_key = Set(stored.key.clone());
        }
        model.updated_at = Set(now());
        let updated = model.update(&txn).await?;

        if let Some(list) = &params.tag_list {
            set_tags(&txn, existing.id, &parse_tag_list(list)).await?;
        }
        txn.commit().await?;
        Ok(updated)
    }

    /// Destroy an asset, its relations, its tag links and its resource
    pub async fn destroy(&self, id: i32) -> Result<()> {
        let existing = self.find(id).await?;

        let txn = self.db.begin().await?;
        // Relations pointing at the asset and relations the asset owns
        let relations = asset_relation::Entity::delete_many()
            .filter(
                Condition::any()
                    .add(asset_relation::Column::AssetId.eq(id))
                    .add(
                        Condition::all()
                            .add(asset_relation::Column::OwnerType.eq(ASSET_OWNER_TYPE))
                            .add(asset_relation::Column::OwnerId.eq(id)),
                    ),
            )
            .exec(&txn)
            .await?;
        asset_tag::Entity::delete_many()
            .filter(asset_tag::Column::AssetId.eq(id))
            .exec(&txn)
            .await?;
        asset::Entity::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;

        let visibility = Visibility::parse(&existing.visibility).unwrap_or_default();
        if let Err(e) = self.storage.delete(visibility.namespace(), &existing.storage_key).await {
            tracing::warn!("Asset {} removed but its resource was not: {}", id, e);
        }

        tracing::info!("Destroyed asset {} and {} relation(s)", id, relations.rows_affected);
        Ok(())
    }

    /// Open the stored resource of an asset for streaming
    pub async fn open_resource(
        &self,
        asset: &asset::Model,
    ) -> Result<Box<dyn tokio::io::AsyncRead + Unpin + Send>> {
        let visibility = Visibility::parse(&asset.visibility).unwrap_or_default();
        Ok(self.storage.get_stream(visibility.namespace(), &asset.storage_key).await?)
    }

    /// Tag names of one asset, sorted
    pub async fn tags_for(&self, asset_id: i32) -> Result<Vec<String>> {
        let tags = tag::Entity::find()
            .inner_join(asset_tag::Entity)
            .filter(asset_tag::Column::AssetId.eq(asset_id))
            .order_by_asc(tag::Column::Name)
            .all(&self.db)
            .await?;
        Ok(tags.into_iter().map(|t| t.name).collect())
    }

    /// Tags attached to at least one asset
    pub async fn tags_in_use(&self) -> Result<Vec<tag::Model>> {
        Ok(tag::Entity::find()
            .inner_join(asset_tag::Entity)
            .distinct()
            .order_by_asc(tag::Column::Name)
            .all(&self.db)
            .await?)
    }

    pub async fn asset_types(&self) -> Result<Vec<asset_type::Model>> {
        Ok(asset_type::Entity::find()
            .order_by_asc(asset_type::Column::Id)
            .all(&self.db)
            .await?)
    }

    async fn store(&self, upload: &Upload, visibility: Visibility) -> Result<StoredResource> {
        let content_type = detect_content_type(upload);
        let type_key = asset_type_key_for_mime(&content_type);
        let asset_type_id = asset_type::Entity::find()
            .filter(asset_type::Column::Key.eq(type_key))
            .one(&self.db)
            .await?
            .map(|t| t.id);

        let checksum = format!("{:x}", Sha256::digest(&upload.data));
        let key = uuid::Uuid::new_v4().simple().to_string();
        self.storage
            .put(visibility.namespace(), &key, upload.data.clone())
            .await?;

        Ok(StoredResource {
            key,
            content_type,
            asset_type_id,
            checksum,
        })
    }
}

struct StoredResource {
    key: String,
    content_type: String,
    asset_type_id: Option<i32>,
    checksum: String,
}

fn validate_name(name: &str) -> Vec<String> {
    let mut errors = Vec::new();
    if name.is_empty() {
        errors.push("Name can't be blank".to_string());
    } else if name.chars().count() > MAX_NAME_LEN {
        errors.push(format!("Name is too long (maximum is {} characters)", MAX_NAME_LEN));
    }
    errors
}

/// Sniff the content type from the bytes, falling back to what the client sent
fn detect_content_type(upload: &Upload) -> String {
    infer::get(&upload.data)
        .map(|kind| kind.mime_type().to_string())
        .or_else(|| upload.content_type.clone().filter(|c| !c.trim().is_empty()))
        .unwrap_or_else(|| "application/octet-stream".to_string())
}

/// Replace the tags of an asset, creating unknown tags
pub async fn set_tags<C: ConnectionTrait>(
    db: &C,
    asset_id: i32,
    names: &BTreeSet<String>,
) -> Result<()> {
    asset_tag::Entity::delete_many()
        .filter(asset_tag::Column::AssetId.eq(asset_id))
        .exec(db)
        .await?;

    for name in names {
        let tag = match tag::Entity::find()
            .filter(tag::Column::Name.eq(name.as_str()))
            .one(db)
            .await?
        {
            Some(tag) => tag,
            None => {
                tag::ActiveModel {
                    name: Set(name.clone()),
                    ..Default::default()
                }
                .insert(db)
                .await?
            }
        };

        asset_tag::ActiveModel {
            asset_id: Set(asset_id),
            tag_id: Set(tag.id),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::search::{filtered_search, paginate, AssetFilters};
    use crate::media::testing::{png_upload, Fixture};
    use crate::media::{attachments, MediaAttachment};
    use sea_orm::{ConnectionTrait, PaginatorTrait};

    fn params(name: &str) -> AssetParams {
        AssetParams {
            name: Some(name.to_string()),
            resource: Some(png_upload("photo.png")),
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_tag_list() {
        let tags = parse_tag_list(" cats, dogs,,cats , ");
        assert_eq!(tags.into_iter().collect::<Vec<_>>(), vec!["cats", "dogs"]);
        assert!(parse_tag_list("").is_empty());
    }

    #[tokio::test]
    async fn test_create_detects_type_and_stores_resource() {
        let fixture = Fixture::new().await;
        let asset = fixture
            .library
            .create(
                AssetParams {
                    tag_list: Some("nature, sky".to_string()),
                    ..params("Sunset")
                },
                Visibility::Private,
            )
            .await
            .unwrap();

        assert_eq!(asset.name, "Sunset");
        assert_eq!(asset.visibility, "private");
        assert_eq!(asset.content_type, "image/png");
        assert_eq!(asset.asset_type_id, Some(fixture.asset_type_id("image").await));
        assert_eq!(asset.checksum.len(), 64);
        assert!(fixture
            .storage
            .exists(Visibility::Private.namespace(), &asset.storage_key)
            .await
            .unwrap());
        assert_eq!(fixture.library.tags_for(asset.id).await.unwrap(), vec!["nature", "sky"]);
    }

    #[tokio::test]
    async fn test_create_reports_all_validation_errors() {
        let fixture = Fixture::new().await;
        let err = fixture
            .library
            .create(AssetParams::default(), Visibility::Public)
            .await
            .unwrap_err();

        match err {
            ServerError::Validation(errors) => {
                assert!(errors.contains(&"Name can't be blank".to_string()));
                assert!(errors.contains(&"Resource can't be blank".to_string()));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
        assert_eq!(asset::Entity::find().count(&fixture.db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_update_replaces_resource_and_tags() {
        let fixture = Fixture::new().await;
        let asset = fixture
            .library
            .create(
                AssetParams {
                    tag_list: Some("old".to_string()),
                    ..params("Report")
                },
                Visibility::Public,
            )
            .await
            .unwrap();

        let updated = fixture
            .library
            .update(
                asset.id,
                AssetParams {
                    name: Some("Annual report".to_string()),
                    tag_list: Some("finance".to_string()),
                    resource: Some(Upload {
                        file_name: "report.txt".to_string(),
                        content_type: Some("text/plain".to_string()),
                        data: Bytes::from_static(b"plain text body"),
                    }),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.name, "Annual report");
        assert_eq!(updated.visibility, "public");
        assert_eq!(updated.content_type, "text/plain");
        assert_eq!(updated.asset_type_id, Some(fixture.asset_type_id("doc").await));
        assert_ne!(updated.storage_key, asset.storage_key);
        assert!(!fixture.storage.exists(Visibility::Public.namespace(), &asset.storage_key).await.unwrap());
        assert_eq!(fixture.library.tags_for(asset.id).await.unwrap(), vec!["finance"]);
    }

    #[tokio::test]
    async fn test_failed_update_keeps_old_resource_only() {
        let fixture = Fixture::new().await;
        let asset = fixture.library.create(params("Report"), Visibility::Public).await.unwrap();
        assert_eq!(fixture.resource_count(), 1);

        // Make the tag write inside the update transaction fail
        fixture.db.execute_unprepared("DROP TABLE asset_tags").await.unwrap();

        let result = fixture
            .library
            .update(
                asset.id,
                AssetParams {
                    tag_list: Some("finance".to_string()),
                    resource: Some(png_upload("new.png")),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(result, Err(ServerError::Database(_))));

        assert_eq!(fixture.resource_count(), 1);
        assert!(fixture.storage.exists(Visibility::Public.namespace(), &asset.storage_key).await.unwrap());
        assert_eq!(fixture.library.find(asset.id).await.unwrap().storage_key, asset.storage_key);
    }

    #[tokio::test]
    async fn test_update_rejects_blank_name() {
        let fixture = Fixture::new().await;
        let asset = fixture.library.create(params("Keep me"), Visibility::Public).await.unwrap();

        let err = fixture
            .library
            .update(asset.id, AssetParams { name: Some("   ".to_string()), ..Default::default() })
            .await
            .unwrap_err();
        assert!(matches!(err, ServerError::Validation(_)));
        assert_eq!(fixture.library.find(asset.id).await.unwrap().name, "Keep me");
    }

    #[tokio::test]
    async fn test_destroy_removes_asset_relations_and_listing() {
        let fixture = Fixture::new().await;
        let asset = fixture.library.create(params("Doomed"), Visibility::Public).await.unwrap();
        let other = fixture.library.create(params("Survivor"), Visibility::Public).await.unwrap();

        let record = fixture.record("article", Some("en")).await;
        let photo = MediaAttachment::new("article", "photo");
        attachments::attach(&fixture.db, &photo, &record, asset.id, None).await.unwrap();
        attachments::attach(&fixture.db, &photo, &record, other.id, None).await.unwrap();

        fixture.library.destroy(asset.id).await.unwrap();

        assert!(matches!(fixture.library.find(asset.id).await, Err(ServerError::AssetNotFound(_))));
        assert!(!fixture.storage.exists(Visibility::Public.namespace(), &asset.storage_key).await.unwrap());

        let remaining = attachments::field_relations(&fixture.db, &photo, &record).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].asset_id, other.id);

        let query = filtered_search(&fixture.db, &AssetFilters::default(), None).await.unwrap();
        let listed: Vec<i32> = paginate(&fixture.db, query, 1, 50)
            .await
            .unwrap()
            .items
            .iter()
            .map(|a| a.id)
            .collect();
        assert_eq!(listed, vec![other.id]);
    }

    #[tokio::test]
    async fn test_destroy_missing_asset() {
        let fixture = Fixture::new().await;
        assert!(matches!(fixture.library.destroy(42).await, Err(ServerError::AssetNotFound(42))));
    }

    #[tokio::test]
    async fn test_tags_in_use_only_lists_linked_tags() {
        let fixture = Fixture::new().await;
        let asset = fixture
            .library
            .create(AssetParams { tag_list: Some("b, a".to_string()), ..params("One") }, Visibility::Public)
            .await
            .unwrap();
        fixture
            .library
            .update(asset.id, AssetParams { tag_list: Some("a".to_string()), ..Default::default() })
            .await
            .unwrap();

        let names: Vec<String> = fixture.library.tags_in_use().await.unwrap().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["a"]);
    }
}
