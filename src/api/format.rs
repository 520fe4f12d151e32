//! Response format negotiation and the XML representation of assets.

use axum::{
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::db::entities::asset;

/// Representation a client asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    Html,
    Xml,
    /// Inline upload widget embedded in another record's form
    Js,
}

impl ResponseFormat {
    /// An explicit `format` parameter wins over the `Accept` header
    pub fn negotiate(format: Option<&str>, headers: &HeaderMap) -> Self {
        match format.map(|f| f.trim().to_ascii_lowercase()).as_deref() {
            Some("xml") => return ResponseFormat::Xml,
            Some("js") => return ResponseFormat::Js,
            Some("html") => return ResponseFormat::Html,
            _ => {}
        }

        let accept = headers
            .get(header::ACCEPT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if accept.contains("application/xml") || accept.contains("text/xml") {
            ResponseFormat::Xml
        } else {
            ResponseFormat::Html
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AssetXml {
    pub id: i32,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub visibility: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_type_id: Option<i32>,
    pub file_name: String,
    pub content_type: String,
    pub size: i64,
    pub created_at: i64,
    pub updated_at: i64,
    pub tag_list: String,
}

impl AssetXml {
    pub fn new(asset: &asset::Model, tags: &[String]) -> Self {
        Self {
            id: asset.id,
            name: asset.name.clone(),
            description: asset.description.clone(),
            visibility: asset.visibility.clone(),
            asset_type_id: asset.asset_type_id,
            file_name: asset.file_name.clone(),
            content_type: asset.content_type.clone(),
            size: asset.size,
            created_at: asset.created_at,
            updated_at: asset.updated_at,
            tag_list: tags.join(", "),
        }
    }
}

#[derive(Debug, Serialize)]
struct AssetListXml<'a> {
    #[serde(rename = "asset")]
    assets: &'a [AssetXml],
}

#[derive(Debug, Serialize)]
struct ErrorsXml<'a> {
    #[serde(rename = "error")]
    errors: &'a [String],
}

fn xml_response<T: Serialize>(status: StatusCode, root: &str, value: &T) -> Response {
    match quick_xml::se::to_string_with_root(root, value) {
        Ok(body) => (
            status,
            [(header::CONTENT_TYPE, "application/xml")],
            format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{}", body),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to serialize {} as XML: {}", root, e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
        }
    }
}

pub fn asset_xml(status: StatusCode, asset: &AssetXml) -> Response {
    xml_response(status, "asset", asset)
}

pub fn asset_list_xml(assets: &[AssetXml]) -> Response {
    xml_response(StatusCode::OK, "assets", &AssetListXml { assets })
}

pub fn errors_xml(status: StatusCode, errors: &[String]) -> Response {
    xml_response(status, "errors", &ErrorsXml { errors })
}
