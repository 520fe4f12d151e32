//! Filtered asset search and pagination.
//!
//! Every filter is optional and a missing (or blank) one adds no
//! predicate. The creation date range is inclusive of its end date: the
//! end boundary is the start of the day after the supplied end date.

use chrono::{Days, NaiveDate};
use sea_orm::{
    sea_query::{Expr, LikeExpr, Query},
    ColumnTrait, Condition, ConnectionTrait, DbErr, EntityTrait, Order,
    PaginatorTrait, QueryFilter, QueryOrder, Select,
};
use serde::{Deserialize, Serialize};

use super::model::Visibility;
use crate::config::MediaConfig;
use crate::db::entities::{asset, asset_tag, tag};

/// Columns assets may be ordered by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderField {
    Id,
    Name,
    CreatedAt,
    UpdatedAt,
}

impl OrderField {
    /// Parse an order field, accepting an optional `assets.` table prefix
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        match value.strip_prefix("assets.").unwrap_or(value) {
            "id" => Some(OrderField::Id),
            "name" => Some(OrderField::Name),
            "created_at" => Some(OrderField::CreatedAt),
            "updated_at" => Some(OrderField::UpdatedAt),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderField::Id => "id",
            OrderField::Name => "name",
            OrderField::CreatedAt => "created_at",
            OrderField::UpdatedAt => "updated_at",
        }
    }

    fn column(&self) -> asset::Column {
        match self {
            OrderField::Id => asset::Column::Id,
            OrderField::Name => asset::Column::Name,
            OrderField::CreatedAt => asset::Column::CreatedAt,
            OrderField::UpdatedAt => asset::Column::UpdatedAt,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "asc" => Some(SortOrder::Asc),
            "desc" => Some(SortOrder::Desc),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }

    fn order(&self) -> Order {
        match self {
            SortOrder::Asc => Order::Asc,
            SortOrder::Desc => Order::Desc,
        }
    }
}

/// Ordering of a listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssetOrdering {
    pub field: OrderField,
    pub order: SortOrder,
}

impl AssetOrdering {
    /// Requested ordering, with unknown or missing parts taken from config
    pub fn resolve(field: Option<&str>, order: Option<&str>, config: &MediaConfig) -> Self {
        Self {
            field: field
                .and_then(OrderField::parse)
                .unwrap_or(config.assets_default_order_field),
            order: order
                .and_then(SortOrder::parse)
                .unwrap_or(config.assets_default_sort_order),
        }
    }
}

/// Optional predicates of an asset search
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetFilters {
    /// Substring of the name or description
    pub text: Option<String>,
    /// Tag name
    pub tag: Option<String>,
    pub asset_type_id: Option<i32>,
    pub visibility: Option<Visibility>,
    pub created_start: Option<NaiveDate>,
    /// Inclusive end date
    pub created_end: Option<NaiveDate>,
}

impl AssetFilters {
    /// Build filters from raw request parameters; blank or malformed
    /// values are treated as absent
    pub fn from_params(
        text: Option<&str>,
        tag: Option<&str>,
        asset_type: Option<&str>,
        visibility: Option<&str>,
        created_start: Option<&str>,
        created_end: Option<&str>,
    ) -> Self {
        Self {
            text: non_blank(text),
            tag: non_blank(tag),
            asset_type_id: non_blank(asset_type).and_then(|t| t.parse().ok()),
            visibility: non_blank(visibility).and_then(|v| Visibility::parse(&v)),
            created_start: created_start.and_then(parse_date),
            created_end: created_end.and_then(parse_date),
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Parse a filter date given as `YYYY-MM-DD` or `DD/MM/YYYY`
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(value, "%d/%m/%Y"))
        .ok()
}

/// Unix timestamp of midnight UTC at the start of `date`
fn day_start(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp())
        .unwrap_or_default()
}

/// Exclusive upper bound for an inclusive end date
fn end_boundary(date: NaiveDate) -> i64 {
    match date.checked_add_days(Days::new(1)) {
        Some(next_day) => day_start(next_day),
        None => i64::MAX,
    }
}

/// Escape LIKE wildcards so the text filter matches literally
fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Build the asset query for a set of filters and an ordering
pub async fn filtered_search<C: ConnectionTrait>(
    db: &C,
    filters: &AssetFilters,
    ordering: Option<AssetOrdering>,
) -> Result<Select<asset::Entity>, DbErr> {
    let mut query = asset::Entity::find();

    if let Some(text) = &filters.text {
        let pattern = format!("%{}%", escape_like(text));
        let like = || LikeExpr::new(pattern.as_str()).escape('\\');
        query = query.filter(
            Condition::any()
                .add(Expr::col(asset::Column::Name).like(like()))
                .add(Expr::col(asset::Column::Description).like(like())),
        );
    }

    if let Some(tag_name) = &filters.tag {
        let tag = tag::Entity::find()
            .filter(tag::Column::Name.eq(tag_name.as_str()))
            .one(db)
            .await?;
        query = match tag {
            Some(tag) => query.filter(
                asset::Column::Id.in_subquery(
                    Query::select()
                        .column(asset_tag::Column::AssetId)
                        .from(asset_tag::Entity)
                        .and_where(asset_tag::Column::TagId.eq(tag.id))
                        .to_owned(),
                ),
            ),
            // Unknown tag: nothing can match
            None => query.filter(asset::Column::Id.is_in(Vec::<i32>::new())),
        };
    }

    if let Some(type_id) = filters.asset_type_id {
        query = query.filter(asset::Column::AssetTypeId.eq(type_id));
    }

    if let Some(visibility) = filters.visibility {
        query = query.filter(asset::Column::Visibility.eq(visibility.as_str()));
    }

    if let Some(start) = filters.created_start {
        query = query.filter(asset::Column::CreatedAt.gte(day_start(start)));
    }

    if let Some(end) = filters.created_end {
        query = query.filter(asset::Column::CreatedAt.lt(end_boundary(end)));
    }

    if let Some(ordering) = ordering {
        query = query
            .order_by(ordering.field.column(), ordering.order.order())
            .order_by(asset::Column::Id, ordering.order.order());
    } else {
        query = query.order_by_desc(asset::Column::Id);
    }

    Ok(query)
}

/// Page metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageInfo {
    pub page: u64,
    pub per_page: u64,
    pub total_items: u64,
    pub total_pages: u64,
    pub prev_page: Option<u64>,
    pub next_page: Option<u64>,
}

impl PageInfo {
    fn new(page: u64, per_page: u64, total_items: u64, total_pages: u64) -> Self {
        Self {
            page,
            per_page,
            total_items,
            total_pages,
            prev_page: if page > 1 { Some(page - 1) } else { None },
            next_page: if page < total_pages { Some(page + 1) } else { None },
        }
    }
}

/// One page of results
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub info: PageInfo,
}

/// Parse a 1-based page number; missing or invalid pages become 1
pub fn parse_page(value: Option<&str>) -> u64 {
    value
        .and_then(|p| p.trim().parse::<u64>().ok())
        .filter(|p| *p > 0)
        .unwrap_or(1)
}

/// Fetch one page (1-based) of a query
pub async fn paginate<C: ConnectionTrait>(
    db: &C,
    query: Select<asset::Entity>,
    page: u64,
    per_page: u64,
) -> Result<Page<asset::Model>, DbErr> {
    let page = page.max(1);
    let per_page = per_page.max(1);

    let paginator = query.paginate(db, per_page);
    let totals = paginator.num_items_and_pages().await?;
    let items = paginator.fetch_page(page - 1).await?;

    Ok(Page {
        items,
        info: PageInfo::new(page, per_page, totals.number_of_items, totals.number_of_pages),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::testing::{timestamp, Fixture};

    async fn names(fixture: &Fixture, filters: &AssetFilters) -> Vec<String> {
        let ordering = AssetOrdering {
            field: OrderField::Name,
            order: SortOrder::Asc,
        };
        let query = filtered_search(&fixture.db, filters, Some(ordering)).await.unwrap();
        paginate(&fixture.db, query, 1, 100)
            .await
            .unwrap()
            .items
            .into_iter()
            .map(|a| a.name)
            .collect()
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 9);
        assert_eq!(parse_date("2024-03-09"), expected);
        assert_eq!(parse_date("09/03/2024"), expected);
        assert_eq!(parse_date(" 2024-03-09 "), expected);
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("yesterday"), None);
        assert_eq!(parse_date("2024-02-30"), None);
    }

    #[test]
    fn test_end_boundary_is_next_midnight() {
        let date = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
        assert_eq!(end_boundary(date), timestamp(2025, 1, 1, 0, 0, 0));
        assert_eq!(end_boundary(date) - day_start(date), 86_400);
    }

    #[test]
    fn test_order_parsing_and_fallback() {
        let config = MediaConfig::default();

        let ordering = AssetOrdering::resolve(Some("assets.name"), Some("ASC"), &config);
        assert_eq!(ordering.field, OrderField::Name);
        assert_eq!(ordering.order, SortOrder::Asc);

        let ordering = AssetOrdering::resolve(Some("name; DROP TABLE assets"), Some("sideways"), &config);
        assert_eq!(ordering.field, config.assets_default_order_field);
        assert_eq!(ordering.order, config.assets_default_sort_order);

        let ordering = AssetOrdering::resolve(None, None, &config);
        assert_eq!(ordering.field, OrderField::CreatedAt);
        assert_eq!(ordering.order, SortOrder::Desc);
    }

    #[test]
    fn test_from_params_ignores_blank_and_malformed_values() {
        let filters = AssetFilters::from_params(
            Some("  "),
            Some(""),
            Some("not-a-number"),
            Some("secret"),
            Some("garbage"),
            None,
        );
        assert_eq!(filters, AssetFilters::default());

        let filters = AssetFilters::from_params(
            Some(" cat "),
            Some("animals"),
            Some("3"),
            Some("private"),
            Some("01/02/2024"),
            Some("2024-02-05"),
        );
        assert_eq!(filters.text.as_deref(), Some("cat"));
        assert_eq!(filters.tag.as_deref(), Some("animals"));
        assert_eq!(filters.asset_type_id, Some(3));
        assert_eq!(filters.visibility, Some(Visibility::Private));
        assert_eq!(filters.created_start, NaiveDate::from_ymd_opt(2024, 2, 1));
        assert_eq!(filters.created_end, NaiveDate::from_ymd_opt(2024, 2, 5));
    }

    #[test]
    fn test_parse_page() {
        assert_eq!(parse_page(None), 1);
        assert_eq!(parse_page(Some("0")), 1);
        assert_eq!(parse_page(Some("-3")), 1);
        assert_eq!(parse_page(Some("abc")), 1);
        assert_eq!(parse_page(Some("4")), 4);
    }

    #[tokio::test]
    async fn test_absent_filters_are_noops() {
        let fixture = Fixture::new().await;
        fixture.insert_asset("alpha", Visibility::Public, "image", timestamp(2024, 1, 1, 10, 0, 0), &[]).await;
        fixture.insert_asset("beta", Visibility::Private, "doc", timestamp(2024, 1, 2, 10, 0, 0), &[]).await;

        assert_eq!(names(&fixture, &AssetFilters::default()).await, vec!["alpha", "beta"]);
    }

    #[tokio::test]
    async fn test_created_end_date_is_inclusive() {
        let fixture = Fixture::new().await;
        fixture.insert_asset("before", Visibility::Public, "image", timestamp(2024, 5, 9, 23, 59, 59), &[]).await;
        fixture.insert_asset("start of end day", Visibility::Public, "image", timestamp(2024, 5, 10, 0, 0, 0), &[]).await;
        fixture.insert_asset("late on end day", Visibility::Public, "image", timestamp(2024, 5, 10, 23, 59, 59), &[]).await;
        fixture.insert_asset("next day", Visibility::Public, "image", timestamp(2024, 5, 11, 0, 0, 0), &[]).await;

        let filters = AssetFilters {
            created_start: NaiveDate::from_ymd_opt(2024, 5, 10),
            created_end: NaiveDate::from_ymd_opt(2024, 5, 10),
            ..Default::default()
        };
        assert_eq!(
            names(&fixture, &filters).await,
            vec!["late on end day", "start of end day"]
        );

        let only_end = AssetFilters {
            created_end: NaiveDate::from_ymd_opt(2024, 5, 10),
            ..Default::default()
        };
        assert_eq!(
            names(&fixture, &only_end).await,
            vec!["before", "late on end day", "start of end day"]
        );
    }

    #[tokio::test]
    async fn test_text_tag_type_and_visibility_filters() {
        let fixture = Fixture::new().await;
        let now = timestamp(2024, 6, 1, 12, 0, 0);
        fixture.insert_asset("Red Cat", Visibility::Public, "image", now, &["animals"]).await;
        fixture.insert_asset("Dog report", Visibility::Private, "doc", now, &["animals", "reports"]).await;
        fixture.insert_asset("Quarterly", Visibility::Public, "doc", now, &["reports"]).await;

        let text = AssetFilters { text: Some("cat".into()), ..Default::default() };
        assert_eq!(names(&fixture, &text).await, vec!["Red Cat"]);

        let tag = AssetFilters { tag: Some("reports".into()), ..Default::default() };
        assert_eq!(names(&fixture, &tag).await, vec!["Dog report", "Quarterly"]);

        let unknown_tag = AssetFilters { tag: Some("nope".into()), ..Default::default() };
        assert!(names(&fixture, &unknown_tag).await.is_empty());

        let doc_type = fixture.asset_type_id("doc").await;
        let by_type = AssetFilters { asset_type_id: Some(doc_type), ..Default::default() };
        assert_eq!(names(&fixture, &by_type).await, vec!["Dog report", "Quarterly"]);

        let private = AssetFilters { visibility: Some(Visibility::Private), ..Default::default() };
        assert_eq!(names(&fixture, &private).await, vec!["Dog report"]);

        let combined = AssetFilters {
            tag: Some("animals".into()),
            visibility: Some(Visibility::Public),
            ..Default::default()
        };
        assert_eq!(names(&fixture, &combined).await, vec!["Red Cat"]);
    }

    #[tokio::test]
    async fn test_text_filter_matches_wildcards_literally() {
        let fixture = Fixture::new().await;
        let now = timestamp(2024, 6, 1, 12, 0, 0);
        fixture.insert_asset("Red Cat", Visibility::Public, "image", now, &[]).await;
        fixture.insert_asset("50% off", Visibility::Public, "image", now, &[]).await;
        fixture.insert_asset("snake_case", Visibility::Public, "doc", now, &[]).await;

        let percent = AssetFilters { text: Some("%".into()), ..Default::default() };
        assert_eq!(names(&fixture, &percent).await, vec!["50% off"]);

        let single = AssetFilters { text: Some("R_d".into()), ..Default::default() };
        assert!(names(&fixture, &single).await.is_empty());

        let underscore = AssetFilters { text: Some("_".into()), ..Default::default() };
        assert_eq!(names(&fixture, &underscore).await, vec!["snake_case"]);

        assert_eq!(escape_like(r"a\b%c_d"), r"a\\b\%c\_d");
    }

    #[tokio::test]
    async fn test_description_matches_text_filter() {
        let fixture = Fixture::new().await;
        let asset = fixture
            .insert_asset("plain", Visibility::Public, "image", timestamp(2024, 1, 1, 0, 0, 0), &[])
            .await;
        fixture.set_description(asset.id, "a picture of a lighthouse").await;

        let text = AssetFilters { text: Some("lighthouse".into()), ..Default::default() };
        assert_eq!(names(&fixture, &text).await, vec!["plain"]);
    }

    #[tokio::test]
    async fn test_pagination_and_ordering() {
        let fixture = Fixture::new().await;
        for (i, name) in ["a", "b", "c", "d", "e"].iter().enumerate() {
            fixture
                .insert_asset(name, Visibility::Public, "image", timestamp(2024, 1, 1 + i as u32, 0, 0, 0), &[])
                .await;
        }

        let newest_first = AssetOrdering { field: OrderField::CreatedAt, order: SortOrder::Desc };
        let query = filtered_search(&fixture.db, &AssetFilters::default(), Some(newest_first)).await.unwrap();
        let page = paginate(&fixture.db, query, 2, 2).await.unwrap();

        let page_names: Vec<_> = page.items.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(page_names, vec!["c", "b"]);
        assert_eq!(page.info.total_items, 5);
        assert_eq!(page.info.total_pages, 3);
        assert_eq!(page.info.prev_page, Some(1));
        assert_eq!(page.info.next_page, Some(3));

        let query = filtered_search(&fixture.db, &AssetFilters::default(), Some(newest_first)).await.unwrap();
        let beyond = paginate(&fixture.db, query, 9, 2).await.unwrap();
        assert!(beyond.items.is_empty());
        assert_eq!(beyond.info.next_page, None);
    }
}
