//! Database module for SQLite persistence using SeaORM

pub mod entities;

use sea_orm::{ConnectionTrait, Database, DatabaseConnection, DbErr, Statement};
use std::path::Path;

/// Asset type keys seeded at startup
pub const ASSET_TYPE_KEYS: [&str; 6] = ["image", "video", "audio", "doc", "flash", "other"];

/// Initialize database connection and create tables
pub async fn init_database(db_path: &Path) -> Result<DatabaseConnection, DbErr> {
    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent).ok();
    }

    let db_url = format!("sqlite:{}?mode=rwc", db_path.display());
    tracing::info!("Connecting to database: {}", db_url);

    let db = Database::connect(&db_url).await?;

    create_tables(&db).await?;
    seed_asset_types(&db).await?;

    Ok(db)
}

async fn execute(db: &DatabaseConnection, sql: &str) -> Result<(), DbErr> {
    db.execute(Statement::from_string(db.get_database_backend(), sql.to_string()))
        .await?;
    Ok(())
}

/// Create all tables if they don't exist
async fn create_tables(db: &DatabaseConnection) -> Result<(), DbErr> {
    // Translatable records that assets get attached to
    execute(
        db,
        r#"
        CREATE TABLE IF NOT EXISTS content_records (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            record_type TEXT NOT NULL,
            locale TEXT,
            content_id INTEGER,
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .await?;
    execute(
        db,
        r#"CREATE INDEX IF NOT EXISTS idx_content_records_content ON content_records(content_id)"#,
    )
    .await?;

    execute(
        db,
        r#"
        CREATE TABLE IF NOT EXISTS asset_types (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            key TEXT NOT NULL UNIQUE
        )
        "#,
    )
    .await?;

    execute(
        db,
        r#"
        CREATE TABLE IF NOT EXISTS tags (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE
        )
        "#,
    )
    .await?;

    execute(
        db,
        r#"
        CREATE TABLE IF NOT EXISTS assets (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            description TEXT,
            visibility TEXT NOT NULL DEFAULT 'public',
            asset_type_id INTEGER,
            file_name TEXT NOT NULL,
            content_type TEXT NOT NULL,
            size INTEGER NOT NULL,
            checksum TEXT NOT NULL,
            storage_key TEXT NOT NULL,
            locale TEXT,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,
            FOREIGN KEY (asset_type_id) REFERENCES asset_types(id)
        )
        "#,
    )
    .await?;
    execute(db, r#"CREATE INDEX IF NOT EXISTS idx_assets_created ON assets(created_at)"#).await?;
    execute(db, r#"CREATE INDEX IF NOT EXISTS idx_assets_type ON assets(asset_type_id)"#).await?;

    execute(
        db,
        r#"
        CREATE TABLE IF NOT EXISTS asset_tags (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            asset_id INTEGER NOT NULL,
            tag_id INTEGER NOT NULL,
            FOREIGN KEY (asset_id) REFERENCES assets(id) ON DELETE CASCADE,
            FOREIGN KEY (tag_id) REFERENCES tags(id) ON DELETE CASCADE,
            UNIQUE(asset_id, tag_id)
        )
        "#,
    )
    .await?;
    execute(db, r#"CREATE INDEX IF NOT EXISTS idx_asset_tags_tag ON asset_tags(tag_id)"#).await?;

    execute(
        db,
        r#"
        CREATE TABLE IF NOT EXISTS asset_relations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            asset_id INTEGER NOT NULL,
            owner_type TEXT NOT NULL,
            owner_id INTEGER NOT NULL,
            field_name TEXT NOT NULL,
            name TEXT NOT NULL,
            position INTEGER NOT NULL DEFAULT 0,
            locale TEXT,
            content_id INTEGER NOT NULL,
            created_at INTEGER NOT NULL,
            FOREIGN KEY (asset_id) REFERENCES assets(id) ON DELETE CASCADE
        )
        "#,
    )
    .await?;

    // Owner lookups (per-record reads) and content lookups (shared reads)
    execute(
        db,
        r#"CREATE INDEX IF NOT EXISTS idx_asset_relations_owner ON asset_relations(owner_type, owner_id, field_name)"#,
    )
    .await?;
    execute(
        db,
        r#"CREATE INDEX IF NOT EXISTS idx_asset_relations_content ON asset_relations(content_id)"#,
    )
    .await?;
    execute(
        db,
        r#"CREATE INDEX IF NOT EXISTS idx_asset_relations_asset ON asset_relations(asset_id)"#,
    )
    .await?;

    tracing::info!("Database tables initialized");
    Ok(())
}

async fn seed_asset_types(db: &DatabaseConnection) -> Result<(), DbErr> {
    for key in ASSET_TYPE_KEYS {
        db.execute(Statement::from_sql_and_values(
            db.get_database_backend(),
            "INSERT OR IGNORE INTO asset_types (key) VALUES (?)",
            [key.into()],
        ))
        .await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{EntityTrait, PaginatorTrait};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_init_is_idempotent_and_seeds_types() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("media.db");

        let db = init_database(&path).await.unwrap();
        drop(db);
        let db = init_database(&path).await.unwrap();

        let count = entities::AssetType::find().count(&db).await.unwrap();
        assert_eq!(count, ASSET_TYPE_KEYS.len() as u64);
    }
}
