//! Media library: assets, their search and the attachment fields that tie
//! assets to translatable content.

pub mod assets;
pub mod attachments;
pub mod contents;
pub mod model;
pub mod search;

#[cfg(test)]
pub(crate) mod testing;

pub use assets::{AssetLibrary, AssetParams, Upload};
pub use attachments::{
    AttachmentEntry, AttachmentRegistry, Attachable, MediaAttachment, TranslationSharing,
};
pub use model::{asset_type_caption, asset_type_key_for_mime, Visibility};
pub use search::{AssetFilters, AssetOrdering, OrderField, Page, PageInfo, SortOrder};
