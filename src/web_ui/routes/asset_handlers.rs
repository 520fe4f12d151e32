//! Asset controller: listing, forms, create/update/destroy, the picker
//! search and resource downloads.

use axum::{
    body::Body,
    extract::{Multipart, Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tera::Context;
use tokio_util::io::ReaderStream;

use super::utils::{format_relative_time, format_size, render_failure, render_template, render_with_status};
use crate::api::format::{asset_list_xml, asset_xml, errors_xml, AssetXml, ResponseFormat};
use crate::api::AppState;
use crate::db::entities::{asset, asset_type};
use crate::error::{Result, ServerError};
use crate::media::search::{filtered_search, paginate, parse_page};
use crate::media::{
    asset_type_caption, AssetFilters, AssetOrdering, AssetParams, OrderField, Upload, Visibility,
};
use crate::web_ui::filters::asset_filters;
use crate::web_ui::templates;

const ORDER_FIELDS: [(OrderField, &str); 4] = [
    (OrderField::Id, "Id"),
    (OrderField::Name, "Name"),
    (OrderField::CreatedAt, "Created"),
    (OrderField::UpdatedAt, "Updated"),
];

#[derive(Debug, Default, Deserialize)]
pub struct IndexQuery {
    pub filter_text: Option<String>,
    pub filter_tag: Option<String>,
    pub filter_type: Option<String>,
    pub filter_visibility: Option<String>,
    pub filter_created_start: Option<String>,
    pub filter_created_end: Option<String>,
    pub order_by: Option<String>,
    pub sort_order: Option<String>,
    pub page: Option<String>,
    pub format: Option<String>,
    pub notice: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub field: Option<String>,
    pub text: Option<String>,
    pub asset_type_id: Option<String>,
    pub visibility: Option<String>,
    pub page: Option<String>,
    pub format: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct FormatQuery {
    pub format: Option<String>,
}

/// Fields of the asset upload form
#[derive(Debug, Default)]
pub struct AssetForm {
    pub name: Option<String>,
    pub description: Option<String>,
    pub tag_list: Option<String>,
    pub is_protected: Option<String>,
    pub locale: Option<String>,
    pub resource: Option<Upload>,
    /// Attachment field the inline widget uploads for
    pub field: Option<String>,
    pub format: Option<String>,
}

impl AssetForm {
    fn params(&self) -> AssetParams {
        AssetParams {
            name: self.name.clone(),
            description: self.description.clone(),
            tag_list: self.tag_list.clone(),
            locale: self.locale.clone(),
            resource: self.resource.clone(),
        }
    }
}

/// Echo of the current filter values for links and inputs
#[derive(Debug, Default, Serialize)]
struct ListParams {
    filter_text: String,
    filter_tag: String,
    filter_type: String,
    filter_visibility: String,
    filter_created_start: String,
    filter_created_end: String,
}

impl ListParams {
    fn new(query: &IndexQuery) -> Self {
        let value = |v: &Option<String>| v.clone().unwrap_or_default();
        Self {
            filter_text: value(&query.filter_text),
            filter_tag: value(&query.filter_tag),
            filter_type: value(&query.filter_type),
            filter_visibility: value(&query.filter_visibility),
            filter_created_start: value(&query.filter_created_start),
            filter_created_end: value(&query.filter_created_end),
        }
    }
}

#[derive(Debug, Serialize)]
struct AssetRow {
    id: i32,
    name: String,
    description: Option<String>,
    file_name: String,
    type_caption: String,
    visibility: String,
    visibility_caption: String,
    size: String,
    created: String,
    updated: String,
    tags: Vec<String>,
    url: String,
}

/// Values the upload form shows
#[derive(Debug, Default, Serialize)]
struct FormView {
    action: String,
    submit: String,
    name: String,
    description: String,
    tag_list: String,
    is_protected: bool,
    show_visibility: bool,
    field: Option<String>,
}

impl FormView {
    fn for_new(state: &AppState, form: Option<&AssetForm>) -> Self {
        let text = |value: Option<&String>| value.cloned().unwrap_or_default();
        let is_protected = form.and_then(|f| f.is_protected.as_deref());
        Self {
            action: "/assets".to_string(),
            submit: "Create".to_string(),
            name: text(form.and_then(|f| f.name.as_ref())),
            description: text(form.and_then(|f| f.description.as_ref())),
            tag_list: text(form.and_then(|f| f.tag_list.as_ref())),
            is_protected: Visibility::from_protected_param(is_protected) == Visibility::Private,
            show_visibility: state.config.force_visibility.is_none(),
            field: form.and_then(|f| f.field.clone()),
        }
    }

    fn for_edit(asset: &asset::Model, tags: &[String], form: Option<&AssetForm>) -> Self {
        Self {
            action: format!("/assets/{}", asset.id),
            submit: "Save".to_string(),
            name: form
                .and_then(|f| f.name.clone())
                .unwrap_or_else(|| asset.name.clone()),
            description: form
                .and_then(|f| f.description.clone())
                .or_else(|| asset.description.clone())
                .unwrap_or_default(),
            tag_list: form
                .and_then(|f| f.tag_list.clone())
                .unwrap_or_else(|| tags.join(", ")),
            // Visibility is fixed once an asset exists
            is_protected: asset.visibility == Visibility::Private.as_str(),
            show_visibility: false,
            field: None,
        }
    }
}

fn resource_url(asset: &asset::Model) -> String {
    format!("/assets/{}/resource", asset.id)
}

async fn asset_row(state: &AppState, asset: &asset::Model, types: &[asset_type::Model]) -> Result<AssetRow> {
    let visibility = Visibility::parse(&asset.visibility).unwrap_or_default();
    let type_caption = asset
        .asset_type_id
        .and_then(|id| types.iter().find(|t| t.id == id))
        .map(|t| asset_type_caption(&t.key))
        .unwrap_or_default();

    Ok(AssetRow {
        id: asset.id,
        name: asset.name.clone(),
        description: asset.description.clone(),
        file_name: asset.file_name.clone(),
        type_caption,
        visibility: visibility.as_str().to_string(),
        visibility_caption: visibility.caption().to_string(),
        size: format_size(asset.size.max(0) as u64),
        created: format_relative_time(asset.created_at),
        updated: format_relative_time(asset.updated_at),
        tags: state.library.tags_for(asset.id).await?,
        url: resource_url(asset),
    })
}

async fn asset_rows(state: &AppState, assets: &[asset::Model]) -> Result<Vec<AssetRow>> {
    let types = state.library.asset_types().await?;
    let mut rows = Vec::with_capacity(assets.len());
    for asset in assets {
        rows.push(asset_row(state, asset, &types).await?);
    }
    Ok(rows)
}

async fn assets_xml(state: &AppState, assets: &[asset::Model]) -> Result<Vec<AssetXml>> {
    let mut items = Vec::with_capacity(assets.len());
    for asset in assets {
        let tags = state.library.tags_for(asset.id).await?;
        items.push(AssetXml::new(asset, &tags));
    }
    Ok(items)
}

/// Error response in the representation the client asked for
fn failure(format: ResponseFormat, error: ServerError) -> Response {
    match format {
        ResponseFormat::Html => render_failure(&error),
        ResponseFormat::Xml if error.status() != StatusCode::INTERNAL_SERVER_ERROR => {
            errors_xml(error.status(), &error.messages())
        }
        _ => error.into_response(),
    }
}

fn redirect_with(key: &str, message: &str) -> Response {
    Redirect::to(&format!("/assets?{}={}", key, message.replace(' ', "%20"))).into_response()
}

/// GET /assets
pub async fn index(
    State(state): State<Arc<AppState>>,
    Query(query): Query<IndexQuery>,
    headers: HeaderMap,
) -> Response {
    let format = ResponseFormat::negotiate(query.format.as_deref(), &headers);
    match index_response(&state, &query, format).await {
        Ok(response) => response,
        Err(e) => failure(format, e),
    }
}

async fn index_response(state: &AppState, query: &IndexQuery, format: ResponseFormat) -> Result<Response> {
    let filters = AssetFilters::from_params(
        query.filter_text.as_deref(),
        query.filter_tag.as_deref(),
        query.filter_type.as_deref(),
        query.filter_visibility.as_deref(),
        query.filter_created_start.as_deref(),
        query.filter_created_end.as_deref(),
    );
    let ordering = AssetOrdering::resolve(query.order_by.as_deref(), query.sort_order.as_deref(), &state.config);
    let page_number = parse_page(query.page.as_deref());

    let select = filtered_search(&state.db, &filters, Some(ordering)).await?;
    let page = paginate(&state.db, select, page_number, state.config.assets_elements_per_page).await?;
    tracing::debug!(
        "Listing assets: page {} of {} ({} matching)",
        page.info.page,
        page.info.total_pages,
        page.info.total_items
    );

    if format == ResponseFormat::Xml {
        return Ok(asset_list_xml(&assets_xml(state, &page.items).await?));
    }

    let asset_types = state.library.asset_types().await?;
    let order_fields: Vec<_> = ORDER_FIELDS
        .iter()
        .map(|(field, name)| serde_json::json!({ "key": field.as_str(), "name": name }))
        .collect();

    let mut context = Context::new();
    context.insert("assets", &asset_rows(state, &page.items).await?);
    context.insert("page", &page.info);
    context.insert("filters", &asset_filters(&state.config, &asset_types));
    context.insert("tags", &tag_names(state).await?);
    context.insert("params", &ListParams::new(query));
    context.insert(
        "ordering",
        &serde_json::json!({ "field": ordering.field.as_str(), "order": ordering.order.as_str() }),
    );
    context.insert("order_fields", &order_fields);
    context.insert("notice", &query.notice);
    context.insert("error", &query.error);

    Ok(render_template("assets_index.html", &context))
}

async fn tag_names(state: &AppState) -> Result<Vec<serde_json::Value>> {
    Ok(state
        .library
        .tags_in_use()
        .await?
        .into_iter()
        .map(|t| serde_json::json!({ "id": t.id, "name": t.name }))
        .collect())
}

/// GET /assets/new
pub async fn new_asset(State(state): State<Arc<AppState>>) -> Response {
    let mut context = Context::new();
    context.insert("form", &FormView::for_new(&state, None));
    render_template("asset_new.html", &context)
}

/// GET /assets/:id/edit
pub async fn edit_asset(State(state): State<Arc<AppState>>, Path(id): Path<i32>) -> Response {
    match edit_page(&state, id, None, &[]).await {
        Ok(context) => render_template("asset_edit.html", &context),
        Err(e) => render_failure(&e),
    }
}

async fn edit_page(state: &AppState, id: i32, form: Option<&AssetForm>, errors: &[String]) -> Result<Context> {
    let asset = state.library.find(id).await?;
    let types = state.library.asset_types().await?;
    let tags = state.library.tags_for(id).await?;

    let mut context = Context::new();
    context.insert("asset", &asset_row(state, &asset, &types).await?);
    context.insert("form", &FormView::for_edit(&asset, &tags, form));
    context.insert("errors", errors);
    Ok(context)
}

/// Read the multipart body of the asset forms
pub async fn read_asset_form(mut multipart: Multipart) -> Result<AssetForm> {
    let invalid = |e: axum::extract::multipart::MultipartError| {
        ServerError::InvalidRequest(format!("Invalid multipart body: {}", e))
    };

    let mut form = AssetForm::default();
    while let Some(field) = multipart.next_field().await.map_err(invalid)? {
        let name = field.name().unwrap_or_default().to_string();
        if name == "asset[resource]" {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let content_type = field.content_type().map(str::to_string);
            let data = field.bytes().await.map_err(invalid)?;
            // Browsers send an empty part when no file was chosen
            if !file_name.is_empty() || !data.is_empty() {
                form.resource = Some(Upload {
                    file_name,
                    content_type,
                    data,
                });
            }
            continue;
        }

        let value = field.text().await.map_err(invalid)?;
        match name.as_str() {
            "asset[name]" => form.name = Some(value),
            "asset[description]" => form.description = Some(value),
            "asset[tag_list]" => form.tag_list = Some(value),
            "asset[is_protected]" => form.is_protected = Some(value),
            "asset[locale]" => form.locale = Some(value),
            "field" => form.field = Some(value),
            "format" => form.format = Some(value),
            other => tracing::debug!("Ignoring form field {}", other),
        }
    }
    Ok(form)
}

/// POST /assets
pub async fn create_asset(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FormatQuery>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Response {
    let form = match read_asset_form(multipart).await {
        Ok(form) => form,
        Err(e) => return failure(ResponseFormat::negotiate(query.format.as_deref(), &headers), e),
    };
    let format = ResponseFormat::negotiate(query.format.as_deref().or(form.format.as_deref()), &headers);
    create_response(&state, format, form).await
}

async fn create_response(state: &AppState, format: ResponseFormat, form: AssetForm) -> Response {
    let visibility = state
        .config
        .force_visibility
        .unwrap_or_else(|| Visibility::from_protected_param(form.is_protected.as_deref()));

    match state.library.create(form.params(), visibility).await {
        Ok(asset) => match format {
            ResponseFormat::Html => redirect_with("notice", "Asset created"),
            ResponseFormat::Xml => {
                let tags = match state.library.tags_for(asset.id).await {
                    Ok(tags) => tags,
                    Err(e) => return failure(format, e),
                };
                let mut response = asset_xml(StatusCode::CREATED, &AssetXml::new(&asset, &tags));
                if let Ok(location) = HeaderValue::from_str(&format!("/assets/{}", asset.id)) {
                    response.headers_mut().insert(header::LOCATION, location);
                }
                response
            }
            ResponseFormat::Js => {
                // A fresh form replaces the submitted one in the widget
                let fresh = AssetForm {
                    field: form.field.clone(),
                    ..Default::default()
                };
                let form_html = match render_form(state, &fresh, &[]) {
                    Ok(html) => html,
                    Err(e) => return failure(format, e),
                };
                let thumbnail_url = asset
                    .content_type
                    .starts_with("image/")
                    .then(|| resource_url(&asset));
                (
                    StatusCode::CREATED,
                    Json(serde_json::json!({
                        "field": form.field,
                        "asset": {
                            "id": asset.id,
                            "name": asset.name,
                            "thumbnail_url": thumbnail_url,
                            "view_url": resource_url(&asset),
                        },
                        "form_html": form_html,
                    })),
                )
                    .into_response()
            }
        },
        Err(ServerError::Validation(errors)) => {
            tracing::debug!("Asset not created: {}", errors.join(", "));
            match format {
                ResponseFormat::Html => {
                    let mut context = Context::new();
                    context.insert("form", &FormView::for_new(state, Some(&form)));
                    context.insert("errors", &errors);
                    context.insert("error", "Asset could not be created");
                    render_with_status(StatusCode::UNPROCESSABLE_ENTITY, "asset_new.html", &context)
                }
                ResponseFormat::Xml => errors_xml(StatusCode::UNPROCESSABLE_ENTITY, &errors),
                ResponseFormat::Js => {
                    let form_html = match render_form(state, &form, &errors) {
                        Ok(html) => html,
                        Err(e) => return failure(format, e),
                    };
                    (
                        StatusCode::UNPROCESSABLE_ENTITY,
                        Json(serde_json::json!({
                            "field": form.field,
                            "errors": errors,
                            "form_html": form_html,
                        })),
                    )
                        .into_response()
                }
            }
        }
        Err(e) => failure(format, e),
    }
}

fn render_form(state: &AppState, form: &AssetForm, errors: &[String]) -> Result<String> {
    let mut context = Context::new();
    context.insert("form", &FormView::for_new(state, Some(form)));
    context.insert("errors", errors);
    templates::render("asset_form.html", &context)
}

/// PUT /assets/:id, POST /assets/:id
pub async fn update_asset(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Query(query): Query<FormatQuery>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Response {
    let form = match read_asset_form(multipart).await {
        Ok(form) => form,
        Err(e) => return failure(ResponseFormat::negotiate(query.format.as_deref(), &headers), e),
    };
    let format = ResponseFormat::negotiate(query.format.as_deref().or(form.format.as_deref()), &headers);
    update_response(&state, id, format, form).await
}

async fn update_response(state: &AppState, id: i32, format: ResponseFormat, form: AssetForm) -> Response {
    match state.library.update(id, form.params()).await {
        Ok(asset) => match format {
            ResponseFormat::Xml => StatusCode::OK.into_response(),
            ResponseFormat::Js => Json(serde_json::json!({ "id": asset.id, "name": asset.name })).into_response(),
            ResponseFormat::Html => redirect_with("notice", "Asset updated"),
        },
        Err(ServerError::Validation(errors)) => match format {
            ResponseFormat::Html => match edit_page(state, id, Some(&form), &errors).await {
                Ok(mut context) => {
                    context.insert("error", "Asset could not be updated");
                    render_with_status(StatusCode::UNPROCESSABLE_ENTITY, "asset_edit.html", &context)
                }
                Err(e) => render_failure(&e),
            },
            _ => errors_xml(StatusCode::UNPROCESSABLE_ENTITY, &errors),
        },
        Err(e) => failure(format, e),
    }
}

/// DELETE /assets/:id, POST /assets/:id/delete
pub async fn destroy_asset(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Query(query): Query<FormatQuery>,
    headers: HeaderMap,
) -> Response {
    let format = ResponseFormat::negotiate(query.format.as_deref(), &headers);
    match state.library.destroy(id).await {
        Ok(()) => match format {
            ResponseFormat::Html => redirect_with("notice", "Asset removed"),
            _ => StatusCode::OK.into_response(),
        },
        Err(e @ ServerError::AssetNotFound(_)) => failure(format, e),
        Err(e) => {
            tracing::error!("Failed to destroy asset {}: {}", id, e);
            match format {
                ResponseFormat::Html => redirect_with("error", "Asset could not be removed"),
                _ => e.into_response(),
            }
        }
    }
}

/// GET /assets/:id - XML document of one asset; HTML goes to the edit page
pub async fn show_asset(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Query(query): Query<FormatQuery>,
    headers: HeaderMap,
) -> Response {
    let format = ResponseFormat::negotiate(query.format.as_deref(), &headers);
    if format == ResponseFormat::Html {
        return Redirect::to(&format!("/assets/{}/edit", id)).into_response();
    }

    let result = async {
        let asset = state.library.find(id).await?;
        let tags = state.library.tags_for(id).await?;
        Ok::<_, ServerError>((asset, tags))
    }
    .await;
    match result {
        Ok((asset, tags)) => asset_xml(StatusCode::OK, &AssetXml::new(&asset, &tags)),
        Err(e) => failure(format, e),
    }
}

/// GET /assets/search - picker widget listing
pub async fn search_assets(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
    headers: HeaderMap,
) -> Response {
    let format = ResponseFormat::negotiate(query.format.as_deref(), &headers);
    match search_response(&state, &query, format).await {
        Ok(response) => response,
        Err(e) => failure(format, e),
    }
}

async fn search_response(state: &AppState, query: &SearchQuery, format: ResponseFormat) -> Result<Response> {
    let filters = AssetFilters::from_params(
        query.text.as_deref(),
        None,
        query.asset_type_id.as_deref(),
        query.visibility.as_deref(),
        None,
        None,
    );
    let select = filtered_search(&state.db, &filters, None).await?;
    let page = paginate(
        &state.db,
        select,
        parse_page(query.page.as_deref()),
        state.config.media_selector_list_size,
    )
    .await?;

    if format == ResponseFormat::Xml {
        return Ok(asset_list_xml(&assets_xml(state, &page.items).await?));
    }

    let mut context = Context::new();
    context.insert("assets", &asset_rows(state, &page.items).await?);
    context.insert("page", &page.info);
    context.insert("field", &query.field.clone().unwrap_or_default());
    context.insert("text", &query.text.clone().unwrap_or_default());
    context.insert("asset_type_id", &query.asset_type_id.clone().unwrap_or_default());
    context.insert("visibility", &query.visibility.clone().unwrap_or_default());
    Ok(render_template("assets_search.html", &context))
}

/// GET /assets/:id/resource
pub async fn asset_resource(State(state): State<Arc<AppState>>, Path(id): Path<i32>) -> Response {
    let result = async {
        let asset = state.library.find(id).await?;
        let reader = state.library.open_resource(&asset).await?;
        Ok::<_, ServerError>((asset, reader))
    }
    .await;

    match result {
        Ok((asset, reader)) => {
            let disposition = format!("inline; filename=\"{}\"", asset.file_name.replace('"', ""));
            let headers = [
                (header::CONTENT_TYPE, asset.content_type.clone()),
                (header::CONTENT_LENGTH, asset.size.to_string()),
                (header::CONTENT_DISPOSITION, disposition),
            ];
            (headers, Body::from_stream(ReaderStream::new(reader))).into_response()
        }
        Err(e) => render_failure(&e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MediaConfig;
    use crate::media::testing::{png_upload, timestamp, Fixture};
    use axum::extract::FromRequest;
    use axum::http::Request;
    use sea_orm::EntityTrait;

    fn state(fixture: &Fixture, config: MediaConfig) -> Arc<AppState> {
        Arc::new(AppState::new(fixture.db.clone(), fixture.storage.clone(), config))
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8_lossy(&bytes).to_string()
    }

    fn upload_form(name: &str) -> AssetForm {
        AssetForm {
            name: Some(name.to_string()),
            resource: Some(png_upload("photo.png")),
            ..Default::default()
        }
    }

    fn xml_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/xml"));
        headers
    }

    #[tokio::test]
    async fn test_read_multipart_form() {
        let mut body = Vec::new();
        body.extend_from_slice(b"--XBOUNDARY\r\nContent-Disposition: form-data; name=\"asset[name]\"\r\n\r\nSunset\r\n");
        body.extend_from_slice(b"--XBOUNDARY\r\nContent-Disposition: form-data; name=\"asset[is_protected]\"\r\n\r\n1\r\n");
        body.extend_from_slice(b"--XBOUNDARY\r\nContent-Disposition: form-data; name=\"field\"\r\n\r\nphoto\r\n");
        body.extend_from_slice(
            b"--XBOUNDARY\r\nContent-Disposition: form-data; name=\"asset[resource]\"; filename=\"sunset.png\"\r\nContent-Type: image/png\r\n\r\n",
        );
        body.extend_from_slice(&png_upload("x").data);
        body.extend_from_slice(b"\r\n--XBOUNDARY--\r\n");

        let request = Request::builder()
            .method("POST")
            .uri("/assets")
            .header(header::CONTENT_TYPE, "multipart/form-data; boundary=XBOUNDARY")
            .body(Body::from(body))
            .unwrap();
        let multipart = Multipart::from_request(request, &()).await.unwrap();
        let form = read_asset_form(multipart).await.unwrap();

        assert_eq!(form.name.as_deref(), Some("Sunset"));
        assert_eq!(form.is_protected.as_deref(), Some("1"));
        assert_eq!(form.field.as_deref(), Some("photo"));
        let resource = form.resource.unwrap();
        assert_eq!(resource.file_name, "sunset.png");
        assert_eq!(resource.data, png_upload("x").data);
    }

    #[tokio::test]
    async fn test_create_html_redirects_with_notice() {
        let fixture = Fixture::new().await;
        let state = state(&fixture, MediaConfig::default());

        let response = create_response(&state, ResponseFormat::Html, upload_form("Sunset")).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/assets?notice=Asset%20created");
    }

    #[tokio::test]
    async fn test_create_validation_per_format() {
        let fixture = Fixture::new().await;
        let state = state(&fixture, MediaConfig::default());

        let response = create_response(&state, ResponseFormat::Html, AssetForm::default()).await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let html = body_text(response).await;
        assert!(html.contains("Name can&#x27;t be blank") || html.contains("Name can't be blank"));

        let response = create_response(&state, ResponseFormat::Xml, AssetForm::default()).await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body_text(response).await.contains("<errors>"));

        let form = AssetForm { field: Some("photo".into()), ..Default::default() };
        let response = create_response(&state, ResponseFormat::Js, form).await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(json["field"], "photo");
        assert!(json["form_html"].as_str().unwrap().contains("asset[name]"));
    }

    #[tokio::test]
    async fn test_create_xml_and_widget_responses() {
        let fixture = Fixture::new().await;
        let state = state(&fixture, MediaConfig::default());

        let response = create_response(&state, ResponseFormat::Xml, upload_form("Sunset")).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let location = response.headers()[header::LOCATION].to_str().unwrap().to_string();
        assert!(body_text(response).await.contains("<name>Sunset</name>"));

        // The Location header resolves to the created asset
        let id: i32 = location.trim_start_matches("/assets/").parse().unwrap();
        let response = show_asset(
            State(state.clone()),
            Path(id),
            Query(FormatQuery { format: Some("xml".into()) }),
            HeaderMap::new(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("<name>Sunset</name>"));

        let response = show_asset(State(state.clone()), Path(id), Query(FormatQuery::default()), HeaderMap::new()).await;
        assert_eq!(response.headers()[header::LOCATION], format!("/assets/{}/edit", id));

        let form = AssetForm { field: Some("photo".into()), ..upload_form("Beach") };
        let response = create_response(&state, ResponseFormat::Js, form).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(json["field"], "photo");
        assert_eq!(json["asset"]["name"], "Beach");
        assert!(json["asset"]["thumbnail_url"].as_str().is_some());
    }

    #[tokio::test]
    async fn test_forced_visibility_overrides_form() {
        let fixture = Fixture::new().await;
        let config = MediaConfig { force_visibility: Some(Visibility::Private), ..Default::default() };
        let state = state(&fixture, config);

        let form = AssetForm { is_protected: Some("0".into()), ..upload_form("Secret") };
        create_response(&state, ResponseFormat::Html, form).await;

        let created = asset::Entity::find_by_id(1).one(&fixture.db).await.unwrap().unwrap();
        assert_eq!(created.visibility, "private");
    }

    #[tokio::test]
    async fn test_index_filters_and_renders() {
        let fixture = Fixture::new().await;
        let state = state(&fixture, MediaConfig::default());
        fixture.insert_asset("Lighthouse", Visibility::Public, "image", timestamp(2024, 3, 1, 12, 0, 0), &["coast"]).await;
        fixture.insert_asset("Budget", Visibility::Private, "doc", timestamp(2024, 3, 2, 12, 0, 0), &[]).await;

        let query = IndexQuery {
            filter_visibility: Some("public".into()),
            notice: Some("Asset created".into()),
            ..Default::default()
        };
        let response = index(State(state.clone()), Query(query), HeaderMap::new()).await;
        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("Lighthouse"));
        assert!(!html.contains("Budget"));
        assert!(html.contains("Asset created"));

        let query = IndexQuery {
            filter_created_end: Some("2024-03-01".into()),
            ..Default::default()
        };
        let response = index(State(state), Query(query), xml_headers()).await;
        let xml = body_text(response).await;
        assert!(xml.contains("<name>Lighthouse</name>"));
        assert!(xml.contains("<tag_list>coast</tag_list>"));
        assert!(!xml.contains("Budget"));
    }

    #[tokio::test]
    async fn test_update_and_destroy() {
        let fixture = Fixture::new().await;
        let state = state(&fixture, MediaConfig::default());
        let asset = fixture.upload("Draft").await;

        let form = AssetForm { name: Some("Final".into()), ..Default::default() };
        let response = update_response(&state, asset.id, ResponseFormat::Html, form).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(state.library.find(asset.id).await.unwrap().name, "Final");

        let form = AssetForm { name: Some(" ".into()), ..Default::default() };
        let response = update_response(&state, asset.id, ResponseFormat::Html, form).await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let response = destroy_asset(
            State(state.clone()),
            Path(asset.id),
            Query(FormatQuery::default()),
            HeaderMap::new(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/assets?notice=Asset%20removed");

        let response = destroy_asset(State(state), Path(asset.id), Query(FormatQuery::default()), HeaderMap::new()).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_search_uses_selector_page_size() {
        let fixture = Fixture::new().await;
        let config = MediaConfig { media_selector_list_size: 2, ..Default::default() };
        let state = state(&fixture, config);
        for name in ["one", "two", "three"] {
            fixture.insert_asset(name, Visibility::Public, "image", timestamp(2024, 1, 1, 0, 0, 0), &[]).await;
        }

        let query = SearchQuery { field: Some("photo".into()), ..Default::default() };
        let response = search_assets(State(state), Query(query), HeaderMap::new()).await;
        let html = body_text(response).await;
        assert_eq!(html.matches("data-asset-id=").count(), 2);
        assert!(html.contains("data-field=\"photo\""));
    }

    #[tokio::test]
    async fn test_resource_streams_file() {
        let fixture = Fixture::new().await;
        let state = state(&fixture, MediaConfig::default());
        let asset = fixture.upload("Pixel").await;

        let response = asset_resource(State(state.clone()), Path(asset.id)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(bytes, png_upload("x").data);

        let response = asset_resource(State(state), Path(999)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
