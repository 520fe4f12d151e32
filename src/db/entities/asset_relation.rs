//! Asset relation entity
//!
//! Links one named attachment field of an owning record to an asset.
//! Rows that are translations of the same logical relation share a
//! `content_id`; `locale` is set when the owner is translatable.

use sea_orm::entity::prelude::*;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "asset_relations")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub asset_id: i32,
    /// Type of the owning record (e.g. "article", "asset")
    pub owner_type: String,
    pub owner_id: i32,
    /// Attachment field name on the owner (e.g. "photo")
    pub field_name: String,
    /// Display name of the attachment, per translation
    pub name: String,
    pub position: i32,
    pub locale: Option<String>,
    pub content_id: i32,
    pub created_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::asset::Entity",
        from = "Column::AssetId",
        to = "super::asset::Column::Id",
        on_delete = "Cascade"
    )]
    Asset,
}

impl Related<super::asset::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Asset.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
