//! Filter widgets shown above the asset list.

use serde::Serialize;

use crate::config::MediaConfig;
use crate::db::entities::asset_type;
use crate::media::{asset_type_caption, Visibility};

/// One selectable option of a link filter
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterOption {
    pub key: String,
    pub name: String,
}

/// A filter widget as the index template renders it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FilterDefinition {
    /// Free text box bound to `filter_text`
    Text { param: String, caption: String },
    /// A list of links, one per option, bound to `param`
    Link {
        param: String,
        caption: String,
        options: Vec<FilterOption>,
        /// Caption of the link that clears the filter
        all_caption: Option<String>,
    },
    /// A start/end date pair
    Date {
        start_param: String,
        end_param: String,
        caption: String,
    },
}

/// Filters enabled by the configuration, in display order
pub fn asset_filters(config: &MediaConfig, asset_types: &[asset_type::Model]) -> Vec<FilterDefinition> {
    let mut filters = Vec::new();

    if config.assets_string_filter_enabled {
        filters.push(FilterDefinition::Text {
            param: "filter_text".to_string(),
            caption: "Text".to_string(),
        });
    }

    if config.assets_asset_types_filter_enabled {
        filters.push(FilterDefinition::Link {
            param: "filter_type".to_string(),
            caption: "Type".to_string(),
            options: asset_types
                .iter()
                .map(|t| FilterOption {
                    key: t.id.to_string(),
                    name: asset_type_caption(&t.key),
                })
                .collect(),
            all_caption: Some("All".to_string()),
        });
    }

    if config.visibility_filter_enabled() {
        filters.push(FilterDefinition::Link {
            param: "filter_visibility".to_string(),
            caption: "Visibility".to_string(),
            options: Visibility::ALL
                .iter()
                .map(|v| FilterOption {
                    key: v.as_str().to_string(),
                    name: v.caption().to_string(),
                })
                .collect(),
            all_caption: None,
        });
    }

    if config.assets_date_filter_enabled {
        filters.push(FilterDefinition::Date {
            start_param: "filter_created_start".to_string(),
            end_param: "filter_created_end".to_string(),
            caption: "Creation".to_string(),
        });
    }

    filters
}
