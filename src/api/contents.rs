//! JSON endpoints for content records and their attachment fields.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::db::entities::{asset, asset_relation, content_record};
use crate::error::{Result, ServerError};
use crate::media::attachments::{self, RelationFilters};
use crate::media::{contents, AttachmentEntry, MediaAttachment};

#[derive(Debug, Deserialize)]
pub struct CreateRecordRequest {
    pub record_type: String,
    #[serde(default)]
    pub locale: Option<String>,
    /// Join an existing content item instead of starting a new one
    #[serde(default)]
    pub content_id: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct TranslateRequest {
    pub locale: String,
}

#[derive(Debug, Deserialize)]
pub struct AssignRequest {
    pub assets: Vec<AttachmentEntry>,
}

#[derive(Debug, Deserialize)]
pub struct AttachRequest {
    pub asset_id: i32,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RelationQuery {
    pub locale: Option<String>,
    pub owner_type: Option<String>,
    pub field: Option<String>,
}

/// A visible attachment with the asset it points at
#[derive(Debug, Serialize)]
pub struct FieldItem {
    pub id: i32,
    pub asset_id: i32,
    pub name: String,
    pub position: i32,
    pub locale: Option<String>,
    pub content_id: i32,
    pub asset_name: String,
    pub content_type: String,
    pub url: String,
}

impl FieldItem {
    fn new(relation: asset_relation::Model, asset: asset::Model) -> Self {
        Self {
            id: relation.id,
            asset_id: relation.asset_id,
            name: relation.name,
            position: relation.position,
            locale: relation.locale,
            content_id: relation.content_id,
            url: format!("/assets/{}/resource", asset.id),
            asset_name: asset.name,
            content_type: asset.content_type,
        }
    }
}

/// Validation failures become a 422 `{"errors": [...]}` body
fn json_error(error: ServerError) -> Response {
    match error {
        ServerError::Validation(errors) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(serde_json::json!({ "errors": errors })),
        )
            .into_response(),
        other => other.into_response(),
    }
}

fn respond<T: Serialize>(status: StatusCode, result: Result<T>) -> Response {
    match result {
        Ok(value) => (status, Json(value)).into_response(),
        Err(e) => json_error(e),
    }
}

/// POST /contents
pub async fn create_record(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateRecordRequest>,
) -> Response {
    let result = contents::create_record(
        &state.db,
        &req.record_type,
        req.locale.as_deref(),
        req.content_id,
    )
    .await;
    respond(StatusCode::CREATED, result)
}

/// POST /contents/:id/translations
pub async fn translate_record(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Json(req): Json<TranslateRequest>,
) -> Response {
    let result = async {
        let record = contents::find_record(&state.db, id).await?;
        contents::translate(&state.db, &record, &req.locale).await
    }
    .await;
    respond(StatusCode::CREATED, result)
}

/// GET /contents/:id/translations - the record and its sibling translations
pub async fn list_translations(State(state): State<Arc<AppState>>, Path(id): Path<i32>) -> Response {
    let result = async {
        let record = contents::find_record(&state.db, id).await?;
        contents::translations(&state.db, &record).await
    }
    .await;
    respond(StatusCode::OK, result)
}

/// GET /contents/:id/relations - every relation the record owns
pub async fn list_relations(State(state): State<Arc<AppState>>, Path(id): Path<i32>) -> Response {
    let result = async {
        let record = contents::find_record(&state.db, id).await?;
        attachments::relations_for(&state.db, &record).await
    }
    .await;
    respond(StatusCode::OK, result)
}

/// GET /contents/:id/media - attachment fields declared for the record's type
pub async fn list_fields(State(state): State<Arc<AppState>>, Path(id): Path<i32>) -> Response {
    let result = async {
        let record = contents::find_record(&state.db, id).await?;
        Ok::<_, ServerError>(
            state
                .registry
                .fields_for(&record.record_type)
                .into_iter()
                .cloned()
                .collect::<Vec<MediaAttachment>>(),
        )
    }
    .await;
    respond(StatusCode::OK, result)
}

/// GET /contents/:id/media/:field
pub async fn show_field(
    State(state): State<Arc<AppState>>,
    Path((id, field)): Path<(i32, String)>,
) -> Response {
    let result = async {
        let record = contents::find_record(&state.db, id).await?;
        let attachment = state.registry.lookup(&record.record_type, &field)?;
        field_items(&state, attachment, &record).await
    }
    .await;
    respond(StatusCode::OK, result)
}

/// PUT /contents/:id/media/:field - replace the field's attachments
pub async fn assign_field(
    State(state): State<Arc<AppState>>,
    Path((id, field)): Path<(i32, String)>,
    Json(req): Json<AssignRequest>,
) -> Response {
    let result = async {
        let record = contents::find_record(&state.db, id).await?;
        let attachment = state.registry.lookup(&record.record_type, &field)?;
        attachments::assign(&state.db, attachment, &record, &req.assets).await?;
        field_items(&state, attachment, &record).await
    }
    .await;
    respond(StatusCode::OK, result)
}

/// POST /contents/:id/media/:field - append one asset
pub async fn attach_asset(
    State(state): State<Arc<AppState>>,
    Path((id, field)): Path<(i32, String)>,
    Json(req): Json<AttachRequest>,
) -> Response {
    let result = async {
        let record = contents::find_record(&state.db, id).await?;
        let attachment = state.registry.lookup(&record.record_type, &field)?;
        attachments::attach(&state.db, attachment, &record, req.asset_id, req.name.as_deref()).await
    }
    .await;
    respond(StatusCode::CREATED, result)
}

/// GET /contents/:id/media/:field/:asset_id - display name of an attached asset
pub async fn asset_name(
    State(state): State<Arc<AppState>>,
    Path((id, field, asset_id)): Path<(i32, String, i32)>,
) -> Response {
    let result = async {
        let record = contents::find_record(&state.db, id).await?;
        let attachment = state.registry.lookup(&record.record_type, &field)?;
        let asset = state.library.find(asset_id).await?;
        let name = attachments::name_for_asset(&state.db, attachment, &asset, &record).await?;
        Ok::<_, ServerError>(serde_json::json!({ "asset_id": asset.id, "name": name }))
    }
    .await;
    respond(StatusCode::OK, result)
}

/// GET /relations
pub async fn search_relations(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RelationQuery>,
) -> Response {
    let filters = RelationFilters {
        locale: query.locale.filter(|l| !l.is_empty()),
        owner_type: query.owner_type.filter(|t| !t.is_empty()),
        field: query.field.filter(|f| !f.is_empty()),
    };
    respond(StatusCode::OK, attachments::search_relations(&state.db, &filters).await)
}

async fn field_items(
    state: &AppState,
    attachment: &MediaAttachment,
    record: &content_record::Model,
) -> Result<Vec<FieldItem>> {
    let pairs = attachments::field_assets(&state.db, attachment, record).await?;
    Ok(pairs.into_iter().map(|(r, a)| FieldItem::new(r, a)).collect())
}
