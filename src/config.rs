//! Service configuration.
//!
//! Settings come from an optional JSON file (every field has a default)
//! and are then overridden by a handful of environment variables.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use crate::error::{Result, ServerError};
use crate::media::{MediaAttachment, OrderField, SortOrder, Visibility};

const CONFIG_FILENAME: &str = "media.json";

/// Typed configuration for the media library
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// Address the HTTP server binds to
    pub bind_addr: SocketAddr,
    /// Directory holding the database and stored resources
    pub data_dir: PathBuf,

    pub assets_default_order_field: OrderField,
    pub assets_default_sort_order: SortOrder,
    pub assets_elements_per_page: u64,
    /// Page size of the attachment picker search
    pub media_selector_list_size: u64,

    pub assets_string_filter_enabled: bool,
    pub assets_asset_types_filter_enabled: bool,
    pub assets_asset_visibility_filter_enabled: bool,
    pub assets_date_filter_enabled: bool,

    /// When set, every new asset gets this visibility and the visibility
    /// filter is hidden
    pub force_visibility: Option<Visibility>,

    /// Attachment fields declared on content record types
    pub attachments: Vec<MediaAttachment>,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            data_dir: std::env::temp_dir().join("media-assets"),
            assets_default_order_field: OrderField::CreatedAt,
            assets_default_sort_order: SortOrder::Desc,
            assets_elements_per_page: 10,
            media_selector_list_size: 6,
            assets_string_filter_enabled: true,
            assets_asset_types_filter_enabled: true,
            assets_asset_visibility_filter_enabled: true,
            assets_date_filter_enabled: true,
            force_visibility: None,
            attachments: Vec::new(),
        }
    }
}

impl MediaConfig {
    /// Load config from a JSON file, or return defaults if the file is missing
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::info!("No config file at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let config: MediaConfig = serde_json::from_str(&content).map_err(|e| {
            ServerError::InvalidRequest(format!("Invalid config file {:?}: {}", path, e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load config the way the server does at startup:
    /// `MEDIA_CONFIG` (or `<data dir>/media.json`), then env overrides.
    pub fn from_env() -> Result<Self> {
        let data_dir = std::env::var("MEDIA_DATA_DIR").map(PathBuf::from).ok();

        let config_path = std::env::var("MEDIA_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                data_dir
                    .clone()
                    .unwrap_or_else(|| Self::default().data_dir)
                    .join(CONFIG_FILENAME)
            });

        let mut config = Self::load(&config_path)?;

        if let Some(dir) = data_dir {
            config.data_dir = dir;
        }
        if let Ok(bind) = std::env::var("MEDIA_BIND") {
            config.bind_addr = bind
                .parse()
                .map_err(|_| ServerError::InvalidRequest(format!("Invalid MEDIA_BIND: {}", bind)))?;
        }
        if let Ok(per_page) = std::env::var("MEDIA_PER_PAGE") {
            config.assets_elements_per_page = per_page.parse().map_err(|_| {
                ServerError::InvalidRequest(format!("Invalid MEDIA_PER_PAGE: {}", per_page))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.assets_elements_per_page == 0 || self.media_selector_list_size == 0 {
            return Err(ServerError::InvalidRequest(
                "Page sizes must be greater than zero".to_string(),
            ));
        }

        let mut declared = HashSet::new();
        for attachment in &self.attachments {
            if !declared.insert((attachment.owner_type.as_str(), attachment.field.as_str())) {
                return Err(ServerError::InvalidRequest(format!(
                    "Attachment field {}.{} is declared more than once",
                    attachment.owner_type, attachment.field
                )));
            }
        }
        Ok(())
    }

    /// Whether the visibility filter should be offered at all
    pub fn visibility_filter_enabled(&self) -> bool {
        self.assets_asset_visibility_filter_enabled && self.force_visibility.is_none()
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("media.db")
    }

    pub fn storage_path(&self) -> PathBuf {
        self.data_dir.join("resources")
    }
}
