//! Asset entity: one uploaded media resource and its metadata

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "assets")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub visibility: String, // "public", "private"
    pub asset_type_id: Option<i32>,
    /// Original file name as uploaded
    pub file_name: String,
    pub content_type: String,
    pub size: i64,
    /// SHA-256 of the resource bytes, hex encoded
    pub checksum: String,
    /// Key of the resource inside the storage namespace of its visibility
    pub storage_key: String,
    pub locale: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::asset_type::Entity",
        from = "Column::AssetTypeId",
        to = "super::asset_type::Column::Id"
    )]
    AssetType,
    #[sea_orm(has_many = "super::asset_relation::Entity")]
    AssetRelations,
    #[sea_orm(has_many = "super::asset_tag::Entity")]
    AssetTags,
}

impl Related<super::asset_type::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AssetType.def()
    }
}

impl Related<super::asset_relation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AssetRelations.def()
    }
}

impl Related<super::asset_tag::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AssetTags.def()
    }
}

impl Related<super::tag::Entity> for Entity {
    fn to() -> RelationDef {
        super::asset_tag::Relation::Tag.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::asset_tag::Relation::Asset.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
