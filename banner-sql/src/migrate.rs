use crate::sql::Ident;
use sqlx::PgPool;

const BANNER_TABLE: Ident = Ident::unqualified("banner");
const BANNER_CONTENT_TABLE: Ident = Ident::unqualified("banner_content");
const BANNER_MAPPING_TABLE: Ident = Ident::unqualified("banner_mapping");

/// Creates the banner schema if it does not already exist.
///
/// Idempotent: safe to call on every process start. The `banner` row owns a
/// single `deleted` boolean (invariant 5's sole source of truth); its mapping
/// rows are removed as soon as a banner is logically deleted, so
/// `banner_identifier` can be a plain (non-partial) unique index over
/// `(feature_id, tag_id)` — a conflicting insert fails with Postgres error
/// code `23505`, translated by [`crate::PgStore`] into
/// [`banner_core::StoreError::ConflictExists`].
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    let ddl = format!(
        "CREATE TABLE IF NOT EXISTS {banner} (\
            id SERIAL PRIMARY KEY, \
            is_active BOOLEAN NOT NULL, \
            deleted BOOLEAN NOT NULL DEFAULT false, \
            created_at BIGINT NOT NULL, \
            updated_at BIGINT NOT NULL\
        );\n\
        CREATE TABLE IF NOT EXISTS {content} (\
            banner_id INTEGER NOT NULL REFERENCES {banner}(id), \
            version INTEGER NOT NULL, \
            content JSONB NOT NULL, \
            created_at BIGINT NOT NULL, \
            PRIMARY KEY (banner_id, version)\
        );\n\
        CREATE TABLE IF NOT EXISTS {mapping} (\
            banner_id INTEGER NOT NULL REFERENCES {banner}(id), \
            feature_id INTEGER NOT NULL, \
            tag_id INTEGER NOT NULL, \
            PRIMARY KEY (banner_id, tag_id)\
        );\n\
        CREATE UNIQUE INDEX IF NOT EXISTS banner_identifier \
            ON {mapping} (feature_id, tag_id);",
        banner = BANNER_TABLE.quote(),
        content = BANNER_CONTENT_TABLE.quote(),
        mapping = BANNER_MAPPING_TABLE.quote(),
    );

    sqlx::raw_sql(&ddl).execute(pool).await?;

    Ok(())
}
