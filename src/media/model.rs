//! Closed vocabularies of the media library.

use serde::{Deserialize, Serialize};

use crate::storage::namespaces;

/// Who may see an asset's resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Private,
}

impl Visibility {
    pub const ALL: [Visibility; 2] = [Visibility::Public, Visibility::Private];

    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Private => "private",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "public" => Some(Visibility::Public),
            "private" => Some(Visibility::Private),
            _ => None,
        }
    }

    /// Visibility requested by an upload form's `is_protected` field.
    /// Both the checkbox value `1` and the literal `private` mean private.
    pub fn from_protected_param(value: Option<&str>) -> Self {
        match value {
            Some("private") | Some("1") => Visibility::Private,
            _ => Visibility::Public,
        }
    }

    /// Storage namespace holding resources of this visibility
    pub fn namespace(&self) -> &'static str {
        match self {
            Visibility::Public => namespaces::PUBLIC,
            Visibility::Private => namespaces::PRIVATE,
        }
    }

    pub fn caption(&self) -> &'static str {
        match self {
            Visibility::Public => "Public",
            Visibility::Private => "Private",
        }
    }
}

/// Asset type key for a MIME type
pub fn asset_type_key_for_mime(mime: &str) -> &'static str {
    let mime = mime.to_ascii_lowercase();
    match mime.split('/').next().unwrap_or_default() {
        "image" => "image",
        "video" => "video",
        "audio" => "audio",
        "text" => "doc",
        _ if mime == "application/x-shockwave-flash" => "flash",
        _ if is_document_mime(&mime) => "doc",
        _ => "other",
    }
}

fn is_document_mime(mime: &str) -> bool {
    mime == "application/pdf"
        || mime == "application/msword"
        || mime == "application/rtf"
        || mime.starts_with("application/vnd.openxmlformats-officedocument")
        || mime.starts_with("application/vnd.oasis.opendocument")
        || mime.starts_with("application/vnd.ms-")
}

/// Human-readable name of an asset type key
pub fn asset_type_caption(key: &str) -> String {
    match key {
        "image" => "Image".to_string(),
        "video" => "Video".to_string(),
        "audio" => "Audio".to_string(),
        "doc" => "Document".to_string(),
        "flash" => "Flash".to_string(),
        "other" => "Other".to_string(),
        other => other.to_string(),
    }
}
