//! Translatable content records that own attachments.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};

use super::assets::now;
use crate::db::entities::content_record;
use crate::error::{Result, ServerError};

pub async fn find_record<C: ConnectionTrait>(db: &C, id: i32) -> Result<content_record::Model> {
    content_record::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or(ServerError::RecordNotFound(id))
}

/// Create a record. Without a `content_id` the record starts a new content
/// item; with one it joins that item as a translation.
pub async fn create_record<C>(
    db: &C,
    record_type: &str,
    locale: Option<&str>,
    content_id: Option<i32>,
) -> Result<content_record::Model>
where
    C: ConnectionTrait + TransactionTrait,
{
    let record_type = record_type.trim();
    if record_type.is_empty() {
        return Err(ServerError::Validation(vec!["Record type can't be blank".to_string()]));
    }
    let locale = locale.map(str::trim).filter(|l| !l.is_empty());

    let txn = db.begin().await?;
    let content_id = match content_id {
        Some(id) => {
            if let Some(locale) = locale {
                ensure_locale_free(&txn, record_type, id, locale).await?;
            }
            id
        }
        None => next_content_id(&txn).await?,
    };

    let record = content_record::ActiveModel {
        record_type: Set(record_type.to_string()),
        locale: Set(locale.map(str::to_string)),
        content_id: Set(Some(content_id)),
        created_at: Set(now()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;

    tracing::debug!(
        "Created {} record {} (content {}, locale {:?})",
        record.record_type,
        record.id,
        content_id,
        record.locale
    );
    Ok(record)
}

/// Create the `locale` translation of a record
pub async fn translate<C>(
    db: &C,
    record: &content_record::Model,
    locale: &str,
) -> Result<content_record::Model>
where
    C: ConnectionTrait + TransactionTrait,
{
    let locale = locale.trim();
    if locale.is_empty() {
        return Err(ServerError::Validation(vec!["Locale can't be blank".to_string()]));
    }

    let content_id = match record.content_id {
        Some(id) => id,
        None => {
            // Records created outside this module may lack a content id
            let id = next_content_id(db).await?;
            let mut model: content_record::ActiveModel = record.clone().into();
            model.content_id = Set(Some(id));
            model.update(db).await?;
            id
        }
    };

    create_record(db, &record.record_type, Some(locale), Some(content_id)).await
}

/// Every record sharing the content item of `record`, the record included
pub async fn translations<C: ConnectionTrait>(
    db: &C,
    record: &content_record::Model,
) -> Result<Vec<content_record::Model>> {
    let Some(content_id) = record.content_id else {
        return Ok(vec![record.clone()]);
    };
    Ok(content_record::Entity::find()
        .filter(content_record::Column::RecordType.eq(record.record_type.as_str()))
        .filter(content_record::Column::ContentId.eq(content_id))
        .order_by_asc(content_record::Column::Id)
        .all(db)
        .await?)
}

async fn ensure_locale_free<C: ConnectionTrait>(
    db: &C,
    record_type: &str,
    content_id: i32,
    locale: &str,
) -> Result<()> {
    let existing = content_record::Entity::find()
        .filter(content_record::Column::RecordType.eq(record_type))
        .filter(content_record::Column::ContentId.eq(content_id))
        .filter(content_record::Column::Locale.eq(locale))
        .one(db)
        .await?;
    if existing.is_some() {
        return Err(ServerError::Validation(vec![format!(
            "Translation for locale {} already exists",
            locale
        )]));
    }
    Ok(())
}

async fn next_content_id<C: ConnectionTrait>(db: &C) -> Result<i32> {
    let max: Option<Option<i32>> = content_record::Entity::find()
        .select_only()
        .column_as(content_record::Column::ContentId.max(), "max_content_id")
        .into_tuple::<Option<i32>>()
        .one(db)
        .await?;
    Ok(max.flatten().unwrap_or(0) + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::testing::Fixture;

    #[tokio::test]
    async fn test_create_starts_new_content_items() {
        let fixture = Fixture::new().await;
        let first = create_record(&fixture.db, "article", Some("ca"), None).await.unwrap();
        let second = create_record(&fixture.db, "article", Some("ca"), None).await.unwrap();

        assert!(first.content_id.is_some());
        assert_ne!(first.content_id, second.content_id);
    }

    #[tokio::test]
    async fn test_translate_shares_content_id() {
        let fixture = Fixture::new().await;
        let original = create_record(&fixture.db, "article", Some("ca"), None).await.unwrap();
        let translation = translate(&fixture.db, &original, "en").await.unwrap();

        assert_eq!(translation.content_id, original.content_id);
        assert_eq!(translation.locale.as_deref(), Some("en"));
        assert_eq!(translation.record_type, "article");

        let all = translations(&fixture.db, &translation).await.unwrap();
        let ids: Vec<i32> = all.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![original.id, translation.id]);
    }

    #[tokio::test]
    async fn test_translate_rejects_duplicate_locale() {
        let fixture = Fixture::new().await;
        let original = create_record(&fixture.db, "article", Some("ca"), None).await.unwrap();
        translate(&fixture.db, &original, "en").await.unwrap();

        assert!(matches!(
            translate(&fixture.db, &original, "en").await,
            Err(ServerError::Validation(_))
        ));
        assert!(matches!(
            translate(&fixture.db, &original, "ca").await,
            Err(ServerError::Validation(_))
        ));
        assert!(matches!(
            translate(&fixture.db, &original, " ").await,
            Err(ServerError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_find_and_blank_type() {
        let fixture = Fixture::new().await;
        assert!(matches!(find_record(&fixture.db, 42).await, Err(ServerError::RecordNotFound(42))));
        assert!(matches!(
            create_record(&fixture.db, "  ", None, None).await,
            Err(ServerError::Validation(_))
        ));
    }
}
