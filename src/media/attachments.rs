//! Media attachment fields and their translation-sharing rules.
//!
//! An attachment field (e.g. `photo` on `article`) is a list of asset
//! relations owned by a record. Records that share a `content_id` are
//! translations of one logical item, and a field decides whether those
//! translations see one common list ([`TranslationSharing::Shared`]) or
//! keep independent lists ([`TranslationSharing::PerLocale`]).
//!
//! For shared fields every relation row carries a relation `content_id`.
//! Rows with the same relation `content_id` are translations of one
//! logical attachment: they point at the same asset but keep their own
//! display name. Reading a shared field groups rows by that id and keeps
//! the row that best matches the reader.

use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

use super::assets::now;
use crate::db::entities::{asset, asset_relation, asset_type, content_record};
use crate::error::{Result, ServerError};

/// Owner type used when assets themselves carry attachments
pub const ASSET_OWNER_TYPE: &str = "asset";

/// How an attachment field behaves across translations of its owner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranslationSharing {
    /// All translations see the same attachments
    Shared,
    /// Each translation owns its own attachments
    #[default]
    PerLocale,
}

/// Declaration of one attachment field on an owner type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaAttachment {
    pub owner_type: String,
    pub field: String,
    #[serde(default)]
    pub sharing: TranslationSharing,
    /// Maximum number of attached assets (unlimited when absent)
    #[serde(default)]
    pub size: Option<usize>,
    /// Accepted asset type keys (any type when empty)
    #[serde(default)]
    pub types: Vec<String>,
}

impl MediaAttachment {
    pub fn new(owner_type: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            owner_type: owner_type.into(),
            field: field.into(),
            sharing: TranslationSharing::PerLocale,
            size: None,
            types: Vec::new(),
        }
    }

    pub fn translation_shared(mut self, shared: bool) -> Self {
        self.sharing = if shared {
            TranslationSharing::Shared
        } else {
            TranslationSharing::PerLocale
        };
        self
    }

    pub fn with_size(mut self, size: usize) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_types(mut self, types: &[&str]) -> Self {
        self.types = types.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn is_translation_shared(&self) -> bool {
        self.sharing == TranslationSharing::Shared
    }
}

/// Attachment fields known to the service, keyed by owner type and field
#[derive(Debug, Clone, Default)]
pub struct AttachmentRegistry {
    fields: HashMap<(String, String), MediaAttachment>,
}

impl AttachmentRegistry {
    pub fn new(attachments: impl IntoIterator<Item = MediaAttachment>) -> Self {
        let mut registry = Self::default();
        for attachment in attachments {
            registry.register(attachment);
        }
        registry
    }

    /// Declare a field; declaring the same field again replaces it
    pub fn register(&mut self, attachment: MediaAttachment) {
        let key = (attachment.owner_type.clone(), attachment.field.clone());
        self.fields.insert(key, attachment);
    }

    pub fn get(&self, owner_type: &str, field: &str) -> Option<&MediaAttachment> {
        self.fields.get(&(owner_type.to_string(), field.to_string()))
    }

    pub fn lookup(&self, owner_type: &str, field: &str) -> Result<&MediaAttachment> {
        self.get(owner_type, field)
            .ok_or_else(|| ServerError::UnknownField(format!("{}.{}", owner_type, field)))
    }

    /// Fields declared on an owner type, sorted by name
    pub fn fields_for(&self, owner_type: &str) -> Vec<&MediaAttachment> {
        let mut fields: Vec<_> = self
            .fields
            .values()
            .filter(|a| a.owner_type == owner_type)
            .collect();
        fields.sort_by(|a, b| a.field.cmp(&b.field));
        fields
    }
}

/// A record assets can be attached to
pub trait Attachable {
    fn owner_type(&self) -> &str;

    fn owner_id(&self) -> i32;

    /// Locale of a translatable owner
    fn locale(&self) -> Option<&str> {
        None
    }

    /// Identity shared by all translations of a translatable owner
    fn content_id(&self) -> Option<i32> {
        None
    }
}

impl Attachable for content_record::Model {
    fn owner_type(&self) -> &str {
        &self.record_type
    }

    fn owner_id(&self) -> i32 {
        self.id
    }

    fn locale(&self) -> Option<&str> {
        self.locale.as_deref()
    }

    fn content_id(&self) -> Option<i32> {
        self.content_id
    }
}

// Assets carry attachments too, but are not translatable owners
impl Attachable for asset::Model {
    fn owner_type(&self) -> &str {
        ASSET_OWNER_TYPE
    }

    fn owner_id(&self) -> i32 {
        self.id
    }
}

/// Values a new relation inherits from its owner
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelationDefaults {
    pub locale: Option<String>,
}

pub fn default_values<A: Attachable + ?Sized>(owner: &A) -> RelationDefaults {
    RelationDefaults {
        locale: owner.locale().map(str::to_string),
    }
}

/// One element of a field assignment, as submitted by a form or API client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentEntry {
    /// Existing relation row, possibly owned by a sibling translation
    #[serde(default)]
    pub id: Option<i32>,
    pub asset_id: i32,
    /// New display name; keeps the current one when absent
    #[serde(default)]
    pub name: Option<String>,
}

impl AttachmentEntry {
    pub fn new(asset_id: i32) -> Self {
        Self {
            id: None,
            asset_id,
            name: None,
        }
    }

    pub fn existing(id: i32, asset_id: i32) -> Self {
        Self {
            id: Some(id),
            asset_id,
            name: None,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    fn new_name(&self) -> Option<&str> {
        self.name.as_deref().map(str::trim).filter(|n| !n.is_empty())
    }
}

/// Ids of every translation of the owner's content item, the owner included
async fn translation_owner_ids<C, A>(db: &C, owner: &A) -> Result<Vec<i32>>
where
    C: ConnectionTrait,
    A: Attachable + ?Sized,
{
    let mut ids = match owner.content_id() {
        Some(content_id) => content_record::Entity::find()
            .filter(content_record::Column::RecordType.eq(owner.owner_type()))
            .filter(content_record::Column::ContentId.eq(content_id))
            .all(db)
            .await?
            .into_iter()
            .map(|r| r.id)
            .collect(),
        None => Vec::new(),
    };
    if !ids.contains(&owner.owner_id()) {
        ids.push(owner.owner_id());
    }
    Ok(ids)
}

/// All relation rows owned by the record, across fields. Never shared
/// between translations.
pub async fn relations_for<C, A>(db: &C, owner: &A) -> Result<Vec<asset_relation::Model>>
where
    C: ConnectionTrait,
    A: Attachable + ?Sized,
{
    Ok(asset_relation::Entity::find()
        .filter(asset_relation::Column::OwnerType.eq(owner.owner_type()))
        .filter(asset_relation::Column::OwnerId.eq(owner.owner_id()))
        .order_by_asc(asset_relation::Column::FieldName)
        .order_by_asc(asset_relation::Column::Position)
        .order_by_asc(asset_relation::Column::Id)
        .all(db)
        .await?)
}

/// Relation rows visible from the owner for one field, in display order
pub async fn field_relations<C, A>(
    db: &C,
    attachment: &MediaAttachment,
    owner: &A,
) -> Result<Vec<asset_relation::Model>>
where
    C: ConnectionTrait,
    A: Attachable + ?Sized,
{
    let base = asset_relation::Entity::find()
        .filter(asset_relation::Column::OwnerType.eq(owner.owner_type()))
        .filter(asset_relation::Column::FieldName.eq(attachment.field.as_str()));

    if !attachment.is_translation_shared() {
        return Ok(base
            .filter(asset_relation::Column::OwnerId.eq(owner.owner_id()))
            .order_by_asc(asset_relation::Column::Position)
            .order_by_asc(asset_relation::Column::Id)
            .all(db)
            .await?);
    }

    let owner_ids = translation_owner_ids(db, owner).await?;
    let rows = base
        .filter(asset_relation::Column::OwnerId.is_in(owner_ids))
        .order_by_asc(asset_relation::Column::Id)
        .all(db)
        .await?;

    Ok(resolve_shared(rows, owner.owner_id(), owner.locale()))
}

/// Pick one row per relation content id: the row in the reader's locale,
/// else the reader's own row, else the oldest. `rows` must be sorted by id.
fn resolve_shared(
    rows: Vec<asset_relation::Model>,
    owner_id: i32,
    locale: Option<&str>,
) -> Vec<asset_relation::Model> {
    let rank = |row: &asset_relation::Model| -> u8 {
        if locale.is_some() && row.locale.as_deref() == locale {
            0
        } else if row.owner_id == owner_id {
            1
        } else {
            2
        }
    };

    let mut chosen: BTreeMap<i32, asset_relation::Model> = BTreeMap::new();
    for row in rows {
        match chosen.get(&row.content_id) {
            Some(current) if rank(current) <= rank(&row) => {}
            _ => {
                chosen.insert(row.content_id, row);
            }
        }
    }

    let mut visible: Vec<_> = chosen.into_values().collect();
    visible.sort_by_key(|r| (r.position, r.id));
    visible
}

/// Visible relations of a field paired with their assets
pub async fn field_assets<C, A>(
    db: &C,
    attachment: &MediaAttachment,
    owner: &A,
) -> Result<Vec<(asset_relation::Model, asset::Model)>>
where
    C: ConnectionTrait,
    A: Attachable + ?Sized,
{
    let relations = field_relations(db, attachment, owner).await?;
    let ids: Vec<i32> = relations.iter().map(|r| r.asset_id).collect();
    let assets: HashMap<i32, asset::Model> = asset::Entity::find()
        .filter(asset::Column::Id.is_in(ids))
        .all(db)
        .await?
        .into_iter()
        .map(|a| (a.id, a))
        .collect();

    Ok(relations
        .into_iter()
        .filter_map(|r| assets.get(&r.asset_id).cloned().map(|a| (r, a)))
        .collect())
}

/// Display name of `asset` in the field as seen from `owner`; the asset's
/// own name when it is not attached there
pub async fn name_for_asset<C, A>(
    db: &C,
    attachment: &MediaAttachment,
    asset: &asset::Model,
    owner: &A,
) -> Result<String>
where
    C: ConnectionTrait,
    A: Attachable + ?Sized,
{
    let relations = field_relations(db, attachment, owner).await?;
    Ok(relations
        .into_iter()
        .find(|r| r.asset_id == asset.id)
        .map(|r| r.name)
        .unwrap_or_else(|| asset.name.clone()))
}

/// Append one asset to a field. Attaching an asset that is already visible
/// in the field returns the existing relation.
pub async fn attach<C, A>(
    db: &C,
    attachment: &MediaAttachment,
    owner: &A,
    asset_id: i32,
    name: Option<&str>,
) -> Result<asset_relation::Model>
where
    C: ConnectionTrait + TransactionTrait,
    A: Attachable + ?Sized,
{
    check_owner(attachment, owner)?;
    let txn = db.begin().await?;

    let visible = field_relations(&txn, attachment, owner).await?;
    if let Some(existing) = visible.iter().find(|r| r.asset_id == asset_id) {
        return Ok(existing.clone());
    }

    let mut entries: Vec<AttachmentEntry> = visible
        .iter()
        .map(|r| AttachmentEntry::existing(r.id, r.asset_id))
        .collect();
    entries.push(AttachmentEntry::new(asset_id));
    let assets = load_checked_assets(&txn, attachment, &entries).await?;

    let position = visible.iter().map(|r| r.position + 1).max().unwrap_or(0);
    let asset = &assets[&asset_id];
    let name = name
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(&asset.name);
    let content_id = next_content_id(&txn).await?;
    let relation = insert_relation(&txn, attachment, owner, asset_id, name, position, content_id).await?;

    txn.commit().await?;
    tracing::debug!(
        "Attached asset {} to {}#{}.{}",
        asset_id,
        owner.owner_type(),
        owner.owner_id(),
        attachment.field
    );
    Ok(relation)
}

/// Make `entries` the visible content of a field, in order.
///
/// Entries naming a relation of a sibling translation become translated
/// copies owned by this owner when they change anything; a changed asset
/// on a shared field moves every translation to it. Entries without an id
/// reuse the visible relation of the same asset. Visible relations left
/// out are detached (for shared fields, from every translation).
pub async fn assign<C, A>(
    db: &C,
    attachment: &MediaAttachment,
    owner: &A,
    entries: &[AttachmentEntry],
) -> Result<Vec<asset_relation::Model>>
where
    C: ConnectionTrait + TransactionTrait,
    A: Attachable + ?Sized,
{
    check_owner(attachment, owner)?;
    let shared = attachment.is_translation_shared();
    let txn = db.begin().await?;

    let assets = load_checked_assets(&txn, attachment, entries).await?;
    let visible = field_relations(&txn, attachment, owner).await?;
    let owner_ids = translation_owner_ids(&txn, owner).await?;

    let mut kept: HashSet<i32> = HashSet::new();
    for (index, entry) in entries.iter().enumerate() {
        let position = index as i32;

        let mut target = match entry.id {
            Some(id) => Some(find_entry_relation(&txn, attachment, owner, &owner_ids, id).await?),
            None => visible
                .iter()
                .find(|r| r.asset_id == entry.asset_id && !kept.contains(&r.content_id))
                .cloned(),
        };

        // Translations of a shared field always point at the same asset
        if shared {
            if let Some(relation) = target.as_mut().filter(|r| r.asset_id != entry.asset_id) {
                retarget_group(&txn, attachment, owner, &owner_ids, relation.content_id, entry.asset_id)
                    .await?;
                relation.asset_id = entry.asset_id;
            }
        }

        let row = match target {
            Some(relation) if relation.owner_id == owner.owner_id() => {
                update_relation(&txn, relation, entry, position).await?
            }
            Some(relation) if shared => {
                translate_relation(&txn, attachment, owner, relation, entry, position).await?
            }
            _ => {
                let name = entry.new_name().unwrap_or(&assets[&entry.asset_id].name);
                let content_id = next_content_id(&txn).await?;
                insert_relation(&txn, attachment, owner, entry.asset_id, name, position, content_id)
                    .await?
            }
        };
        kept.insert(row.content_id);
    }

    for relation in visible.iter().filter(|r| !kept.contains(&r.content_id)) {
        if shared {
            asset_relation::Entity::delete_many()
                .filter(asset_relation::Column::OwnerType.eq(owner.owner_type()))
                .filter(asset_relation::Column::FieldName.eq(attachment.field.as_str()))
                .filter(asset_relation::Column::OwnerId.is_in(owner_ids.clone()))
                .filter(asset_relation::Column::ContentId.eq(relation.content_id))
                .exec(&txn)
                .await?;
        } else {
            asset_relation::Entity::delete_by_id(relation.id).exec(&txn).await?;
        }
    }

    let result = field_relations(&txn, attachment, owner).await?;
    txn.commit().await?;

    tracing::debug!(
        "Assigned {} asset(s) to {}#{}.{}",
        result.len(),
        owner.owner_type(),
        owner.owner_id(),
        attachment.field
    );
    Ok(result)
}

/// Optional predicates over relation rows
#[derive(Debug, Clone, Default)]
pub struct RelationFilters {
    pub locale: Option<String>,
    pub owner_type: Option<String>,
    pub field: Option<String>,
}

pub async fn search_relations<C: ConnectionTrait>(
    db: &C,
    filters: &RelationFilters,
) -> Result<Vec<asset_relation::Model>> {
    let mut query = asset_relation::Entity::find();
    if let Some(locale) = &filters.locale {
        query = query.filter(asset_relation::Column::Locale.eq(locale.as_str()));
    }
    if let Some(owner_type) = &filters.owner_type {
        query = query.filter(asset_relation::Column::OwnerType.eq(owner_type.as_str()));
    }
    if let Some(field) = &filters.field {
        query = query.filter(asset_relation::Column::FieldName.eq(field.as_str()));
    }
    Ok(query.order_by_asc(asset_relation::Column::Id).all(db).await?)
}

fn check_owner<A: Attachable + ?Sized>(attachment: &MediaAttachment, owner: &A) -> Result<()> {
    if attachment.owner_type != owner.owner_type() {
        return Err(ServerError::UnknownField(format!(
            "{}.{}",
            owner.owner_type(),
            attachment.field
        )));
    }
    Ok(())
}

/// Load the assets named by `entries` and check them against the field's
/// size and type limits
async fn load_checked_assets<C: ConnectionTrait>(
    db: &C,
    attachment: &MediaAttachment,
    entries: &[AttachmentEntry],
) -> Result<HashMap<i32, asset::Model>> {
    let ids: Vec<i32> = entries.iter().map(|e| e.asset_id).collect();
    let found = asset::Entity::find()
        .filter(asset::Column::Id.is_in(ids))
        .find_also_related(asset_type::Entity)
        .all(db)
        .await?;

    let mut errors = Vec::new();
    if let Some(max) = attachment.size {
        if entries.len() > max {
            errors.push(format!(
                "{} accepts at most {} asset(s)",
                attachment.field, max
            ));
        }
    }

    let type_keys: HashMap<i32, Option<String>> = found
        .iter()
        .map(|(a, t)| (a.id, t.as_ref().map(|t| t.key.clone())))
        .collect();
    for entry in entries {
        match type_keys.get(&entry.asset_id) {
            None => errors.push(format!("Asset {} does not exist", entry.asset_id)),
            Some(key) if !attachment.types.is_empty() => {
                let accepted = key.as_ref().is_some_and(|k| attachment.types.contains(k));
                if !accepted {
                    errors.push(format!(
                        "Asset {} is not an accepted type for {} ({})",
                        entry.asset_id,
                        attachment.field,
                        attachment.types.join(", ")
                    ));
                }
            }
            Some(_) => {}
        }
    }

    if !errors.is_empty() {
        return Err(ServerError::Validation(errors));
    }
    Ok(found.into_iter().map(|(a, _)| (a.id, a)).collect())
}

/// Relation row an entry refers to; it must belong to this field and to
/// the owner or (for shared fields) one of its translations
async fn find_entry_relation<C: ConnectionTrait, A: Attachable + ?Sized>(
    db: &C,
    attachment: &MediaAttachment,
    owner: &A,
    owner_ids: &[i32],
    id: i32,
) -> Result<asset_relation::Model> {
    let relation = asset_relation::Entity::find_by_id(id)
        .filter(asset_relation::Column::OwnerType.eq(owner.owner_type()))
        .filter(asset_relation::Column::FieldName.eq(attachment.field.as_str()))
        .one(db)
        .await?;

    match relation {
        Some(r) if r.owner_id == owner.owner_id() => Ok(r),
        Some(r) if attachment.is_translation_shared() && owner_ids.contains(&r.owner_id) => Ok(r),
        _ => Err(ServerError::Validation(vec![format!(
            "Relation {} does not belong to {}",
            id, attachment.field
        )])),
    }
}

/// Point every translation's row of one shared relation at `asset_id`
async fn retarget_group<C: ConnectionTrait, A: Attachable + ?Sized>(
    db: &C,
    attachment: &MediaAttachment,
    owner: &A,
    owner_ids: &[i32],
    content_id: i32,
    asset_id: i32,
) -> Result<()> {
    asset_relation::Entity::update_many()
        .col_expr(asset_relation::Column::AssetId, Expr::value(asset_id))
        .filter(asset_relation::Column::OwnerType.eq(owner.owner_type()))
        .filter(asset_relation::Column::FieldName.eq(attachment.field.as_str()))
        .filter(asset_relation::Column::OwnerId.is_in(owner_ids.to_vec()))
        .filter(asset_relation::Column::ContentId.eq(content_id))
        .exec(db)
        .await?;
    Ok(())
}

async fn next_content_id<C: ConnectionTrait>(db: &C) -> Result<i32> {
    let max: Option<Option<i32>> = asset_relation::Entity::find()
        .select_only()
        .column_as(asset_relation::Column::ContentId.max(), "max_content_id")
        .into_tuple::<Option<i32>>()
        .one(db)
        .await?;
    Ok(max.flatten().unwrap_or(0) + 1)
}

async fn insert_relation<C: ConnectionTrait, A: Attachable + ?Sized>(
    db: &C,
    attachment: &MediaAttachment,
    owner: &A,
    asset_id: i32,
    name: &str,
    position: i32,
    content_id: i32,
) -> Result<asset_relation::Model> {
    let defaults = default_values(owner);
    Ok(asset_relation::ActiveModel {
        asset_id: Set(asset_id),
        owner_type: Set(owner.owner_type().to_string()),
        owner_id: Set(owner.owner_id()),
        field_name: Set(attachment.field.clone()),
        name: Set(name.to_string()),
        position: Set(position),
        locale: Set(defaults.locale),
        content_id: Set(content_id),
        created_at: Set(now()),
        ..Default::default()
    }
    .insert(db)
    .await?)
}

async fn update_relation<C: ConnectionTrait>(
    db: &C,
    relation: asset_relation::Model,
    entry: &AttachmentEntry,
    position: i32,
) -> Result<asset_relation::Model> {
    let unchanged = relation.asset_id == entry.asset_id
        && relation.position == position
        && entry.new_name().map_or(true, |n| n == relation.name);
    if unchanged {
        return Ok(relation);
    }

    let mut model: asset_relation::ActiveModel = relation.into();
    model.asset_id = Set(entry.asset_id);
    model.position = Set(position);
    if let Some(name) = entry.new_name() {
        model.name = Set(name.to_string());
    }
    Ok(model.update(db).await?)
}

/// Apply an entry that names a sibling translation's relation: leave it
/// alone when nothing changes, otherwise write the owner's own row for
/// the same logical relation so the sibling keeps its values
async fn translate_relation<C: ConnectionTrait, A: Attachable + ?Sized>(
    db: &C,
    attachment: &MediaAttachment,
    owner: &A,
    relation: asset_relation::Model,
    entry: &AttachmentEntry,
    position: i32,
) -> Result<asset_relation::Model> {
    let own = asset_relation::Entity::find()
        .filter(asset_relation::Column::OwnerType.eq(owner.owner_type()))
        .filter(asset_relation::Column::FieldName.eq(attachment.field.as_str()))
        .filter(asset_relation::Column::OwnerId.eq(owner.owner_id()))
        .filter(asset_relation::Column::ContentId.eq(relation.content_id))
        .one(db)
        .await?;
    if let Some(own) = own {
        return update_relation(db, own, entry, position).await;
    }

    let unchanged = relation.asset_id == entry.asset_id
        && relation.position == position
        && entry.new_name().map_or(true, |n| n == relation.name);
    if unchanged {
        return Ok(relation);
    }

    let name = entry.new_name().unwrap_or(&relation.name).to_string();
    insert_relation(
        db,
        attachment,
        owner,
        entry.asset_id,
        &name,
        position,
        relation.content_id,
    )
    .await
}
