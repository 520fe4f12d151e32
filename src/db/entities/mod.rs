//! Database entities

pub mod asset;
pub mod asset_relation;
pub mod asset_tag;
pub mod asset_type;
pub mod content_record;
pub mod tag;

pub use asset::Entity as Asset;
pub use asset_relation::Entity as AssetRelation;
pub use asset_tag::Entity as AssetTag;
pub use asset_type::Entity as AssetType;
pub use content_record::Entity as ContentRecord;
pub use tag::Entity as Tag;
