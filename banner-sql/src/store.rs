use async_trait::async_trait;
use banner_core::{
    store::{BannerUpdate, Store},
    Banner, BannerFilter, BannerId, Content, ContentVersion, FeatureId, Pagination, Patch,
    StoreError, TagId, Version, MAX_RETAINED_VERSIONS,
};
use sqlx::{postgres::PgRow, PgPool, QueryBuilder, Row};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

const CONFLICT_CONSTRAINT: &str = "banner_identifier";

fn to_epoch_secs(time: SystemTime) -> i64 {
    time.duration_since(UNIX_EPOCH).unwrap_or_default().as_secs() as i64
}

fn from_epoch_secs(secs: i64) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(secs.max(0) as u64)
}

fn classify(error: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = error {
        if db_err.code().as_deref() == Some("23505") && db_err.constraint() == Some(CONFLICT_CONSTRAINT)
        {
            return StoreError::ConflictExists;
        }
    }

    tracing::error!(error = %error, "banner store operation failed");
    StoreError::Transient(error.to_string())
}

fn content_from_row(value: serde_json::Value) -> Result<Content, StoreError> {
    Content::new(value).map_err(|_| StoreError::Transient("stored content was not a JSON object".into()))
}

/// A [`Store`] backed by a Postgres connection pool.
///
/// Every multi-statement operation (create, update, delete-by-filter) runs
/// inside a single transaction; uniqueness on `(feature_id, tag_id)` is
/// enforced declaratively by the `banner_identifier` unique index rather than
/// by an application-level check-then-insert. `banner.deleted` is the sole
/// source of truth for invariant 5 — mapping rows are removed as soon as a
/// banner is logically deleted, so they never need their own tombstone flag.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Wraps an already-configured [`PgPool`]. Callers are expected to have
    /// run [`crate::run_migrations`] against the same pool beforehand.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load_banner(&self, id: i32, row: &PgRow) -> Result<Banner, StoreError> {
        let is_active: bool = row.try_get("is_active").map_err(classify)?;
        let created_at: i64 = row.try_get("created_at").map_err(classify)?;
        let updated_at: i64 = row.try_get("updated_at").map_err(classify)?;

        let feature_id: i32 =
            sqlx::query_scalar("SELECT feature_id FROM banner_mapping WHERE banner_id = $1 LIMIT 1")
                .bind(id)
                .fetch_one(&self.pool)
                .await
                .map_err(classify)?;

        let tag_rows: Vec<(i32,)> =
            sqlx::query_as("SELECT tag_id FROM banner_mapping WHERE banner_id = $1 ORDER BY tag_id")
                .bind(id)
                .fetch_all(&self.pool)
                .await
                .map_err(classify)?;

        let content_rows: Vec<(i32, serde_json::Value, i64)> = sqlx::query_as(
            "SELECT version, content, created_at FROM banner_content WHERE banner_id = $1 ORDER BY version",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(classify)?;

        let versions = content_rows
            .into_iter()
            .map(|(version, content, created_at)| {
                content_from_row(content).map(|content| ContentVersion {
                    version: Version(version as u32),
                    content,
                    created_at: from_epoch_secs(created_at),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Banner {
            id: BannerId(id as u32),
            feature_id: FeatureId(feature_id as u32),
            tag_ids: tag_rows.into_iter().map(|(t,)| TagId(t as u32)).collect(),
            is_active,
            created_at: from_epoch_secs(created_at),
            updated_at: from_epoch_secs(updated_at),
            versions,
        })
    }
}

#[async_trait]
impl Store for PgStore {
    async fn create_banner(
        &self,
        feature_id: FeatureId,
        tag_ids: Vec<TagId>,
        content: Content,
        is_active: bool,
    ) -> Result<BannerId, StoreError> {
        let mut tx = self.pool.begin().await.map_err(classify)?;
        let now = to_epoch_secs(SystemTime::now());

        let id: i32 = sqlx::query_scalar(
            "INSERT INTO banner (is_active, deleted, created_at, updated_at) VALUES ($1, false, $2, $2) RETURNING id",
        )
        .bind(is_active)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(classify)?;

        sqlx::query(
            "INSERT INTO banner_content (banner_id, version, content, created_at) VALUES ($1, 1, $2, $3)",
        )
        .bind(id)
        .bind(content.into_value())
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(classify)?;

        let mut insert =
            QueryBuilder::new("INSERT INTO banner_mapping (banner_id, feature_id, tag_id) ");
        insert.push_values(tag_ids.iter(), |mut row, tag| {
            row.push_bind(id)
                .push_bind(feature_id.0 as i32)
                .push_bind(tag.0 as i32);
        });
        insert.build().execute(&mut *tx).await.map_err(classify)?;

        tx.commit().await.map_err(classify)?;

        Ok(BannerId(id as u32))
    }

    async fn delete_banner(&self, id: BannerId) -> Result<BannerId, StoreError> {
        let raw_id = id.0 as i32;
        let mut tx = self.pool.begin().await.map_err(classify)?;

        let alive: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM banner WHERE id = $1 AND NOT deleted)",
        )
        .bind(raw_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(classify)?;

        if !alive {
            return Err(StoreError::NotFound);
        }

        sqlx::query("DELETE FROM banner_content WHERE banner_id = $1")
            .bind(raw_id)
            .execute(&mut *tx)
            .await
            .map_err(classify)?;
        sqlx::query("DELETE FROM banner_mapping WHERE banner_id = $1")
            .bind(raw_id)
            .execute(&mut *tx)
            .await
            .map_err(classify)?;
        sqlx::query("DELETE FROM banner WHERE id = $1")
            .bind(raw_id)
            .execute(&mut *tx)
            .await
            .map_err(classify)?;

        tx.commit().await.map_err(classify)?;

        Ok(id)
    }

    async fn update_banner(&self, update: BannerUpdate) -> Result<BannerId, StoreError> {
        let is_empty = update.is_empty();
        let id = update.id.0 as i32;
        let mut tx = self.pool.begin().await.map_err(classify)?;

        let alive: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM banner WHERE id = $1 AND NOT deleted)")
                .bind(id)
                .fetch_one(&mut *tx)
                .await
                .map_err(classify)?;

        if !alive {
            return Err(StoreError::NotFound);
        }

        if let Patch::Set(active) = update.is_active {
            sqlx::query("UPDATE banner SET is_active = $2 WHERE id = $1")
                .bind(id)
                .bind(active)
                .execute(&mut *tx)
                .await
                .map_err(classify)?;
        }

        if let Patch::Set(content) = update.content {
            let next_version: i32 = sqlx::query_scalar(
                "SELECT COALESCE(MAX(version), 0) + 1 FROM banner_content WHERE banner_id = $1",
            )
            .bind(id)
            .fetch_one(&mut *tx)
            .await
            .map_err(classify)?;

            let now = to_epoch_secs(SystemTime::now());

            sqlx::query(
                "INSERT INTO banner_content (banner_id, version, content, created_at) VALUES ($1, $2, $3, $4)",
            )
            .bind(id)
            .bind(next_version)
            .bind(content.into_value())
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(classify)?;

            sqlx::query(
                "DELETE FROM banner_content WHERE banner_id = $1 AND version <= (\
                    SELECT version FROM banner_content WHERE banner_id = $1 \
                    ORDER BY version DESC OFFSET $2 LIMIT 1\
                )",
            )
            .bind(id)
            .bind(MAX_RETAINED_VERSIONS as i64)
            .execute(&mut *tx)
            .await
            .map_err(classify)?;
        }

        let tag_ids = update.tag_ids.into_option();
        let feature_id = update.feature_id.into_option();

        if tag_ids.is_some() || feature_id.is_some() {
            let current_feature_id: i32 =
                sqlx::query_scalar("SELECT feature_id FROM banner_mapping WHERE banner_id = $1 LIMIT 1")
                    .bind(id)
                    .fetch_one(&mut *tx)
                    .await
                    .map_err(classify)?;

            let new_feature_id = feature_id.map(|f| f.0 as i32).unwrap_or(current_feature_id);

            if let Some(new_tags) = tag_ids {
                sqlx::query("DELETE FROM banner_mapping WHERE banner_id = $1")
                    .bind(id)
                    .execute(&mut *tx)
                    .await
                    .map_err(classify)?;

                let mut insert = QueryBuilder::new(
                    "INSERT INTO banner_mapping (banner_id, feature_id, tag_id) ",
                );
                insert.push_values(new_tags.iter(), |mut row, tag| {
                    row.push_bind(id).push_bind(new_feature_id).push_bind(tag.0 as i32);
                });
                insert.build().execute(&mut *tx).await.map_err(classify)?;
            } else {
                sqlx::query("UPDATE banner_mapping SET feature_id = $2 WHERE banner_id = $1")
                    .bind(id)
                    .bind(new_feature_id)
                    .execute(&mut *tx)
                    .await
                    .map_err(classify)?;
            }
        }

        if !is_empty {
            let now = to_epoch_secs(SystemTime::now());
            sqlx::query("UPDATE banner SET updated_at = $2 WHERE id = $1")
                .bind(id)
                .bind(now)
                .execute(&mut *tx)
                .await
                .map_err(classify)?;
        }

        tx.commit().await.map_err(classify)?;

        Ok(update.id)
    }

    async fn get_banner(
        &self,
        feature_id: FeatureId,
        tag_id: TagId,
        version: Option<Version>,
    ) -> Result<Content, StoreError> {
        let row = sqlx::query(
            "SELECT bc.content FROM banner b \
             JOIN banner_mapping m ON m.banner_id = b.id \
             JOIN banner_content bc ON bc.banner_id = b.id \
             WHERE m.feature_id = $1 AND m.tag_id = $2 AND b.is_active AND NOT b.deleted \
             AND bc.version = COALESCE($3, (SELECT MAX(version) FROM banner_content WHERE banner_id = b.id)) \
             LIMIT 1",
        )
        .bind(feature_id.0 as i32)
        .bind(tag_id.0 as i32)
        .bind(version.map(|v| v.0 as i32))
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)?
        .ok_or(StoreError::NotFound)?;

        let value: serde_json::Value = row.try_get("content").map_err(classify)?;

        content_from_row(value)
    }

    async fn get_banners(
        &self,
        filter: BannerFilter,
        pagination: Pagination,
    ) -> Result<Vec<Banner>, StoreError> {
        let mut query = QueryBuilder::new(
            "SELECT DISTINCT b.id, b.is_active, b.created_at, b.updated_at FROM banner b \
             JOIN banner_mapping m ON m.banner_id = b.id WHERE NOT b.deleted",
        );

        if let Patch::Set(feature_id) = filter.feature_id {
            query.push(" AND m.feature_id = ").push_bind(feature_id.0 as i32);
        }
        if let Patch::Set(tag_id) = filter.tag_id {
            query.push(" AND m.tag_id = ").push_bind(tag_id.0 as i32);
        }

        query
            .push(" ORDER BY b.id OFFSET ")
            .push_bind(pagination.offset as i64)
            .push(" LIMIT ")
            .push_bind(pagination.limit as i64);

        let rows = query.build().fetch_all(&self.pool).await.map_err(classify)?;

        let mut banners = Vec::with_capacity(rows.len());
        for row in &rows {
            let id: i32 = row.try_get("id").map_err(classify)?;
            banners.push(self.load_banner(id, row).await?);
        }

        Ok(banners)
    }

    async fn delete_filtered_banner(&self, filter: BannerFilter) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(classify)?;

        let mut find = QueryBuilder::new(
            "SELECT DISTINCT m.banner_id FROM banner_mapping m \
             JOIN banner b ON b.id = m.banner_id AND NOT b.deleted WHERE TRUE",
        );

        if let Patch::Set(feature_id) = filter.feature_id {
            find.push(" AND m.feature_id = ").push_bind(feature_id.0 as i32);
        }
        if let Patch::Set(tag_id) = filter.tag_id {
            find.push(" AND m.tag_id = ").push_bind(tag_id.0 as i32);
        }

        let ids: Vec<i32> = find
            .build_query_scalar()
            .fetch_all(&mut *tx)
            .await
            .map_err(classify)?;

        if ids.is_empty() {
            return Err(StoreError::NotFound);
        }

        // Mapping rows are dropped immediately so the (feature_id, tag_id) pair
        // frees up right away; `clean_deleted_banner` only needs to reap the
        // `banner`/`banner_content` rows afterward.
        sqlx::query("UPDATE banner SET deleted = true WHERE id = ANY($1)")
            .bind(&ids)
            .execute(&mut *tx)
            .await
            .map_err(classify)?;
        sqlx::query("DELETE FROM banner_mapping WHERE banner_id = ANY($1)")
            .bind(&ids)
            .execute(&mut *tx)
            .await
            .map_err(classify)?;

        tx.commit().await.map_err(classify)?;

        Ok(())
    }

    async fn clean_deleted_banner(&self) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(classify)?;

        let ids: Vec<i32> = sqlx::query_scalar("SELECT id FROM banner WHERE deleted")
            .fetch_all(&mut *tx)
            .await
            .map_err(classify)?;

        if !ids.is_empty() {
            sqlx::query("DELETE FROM banner_content WHERE banner_id = ANY($1)")
                .bind(&ids)
                .execute(&mut *tx)
                .await
                .map_err(classify)?;
            sqlx::query("DELETE FROM banner_mapping WHERE banner_id = ANY($1)")
                .bind(&ids)
                .execute(&mut *tx)
                .await
                .map_err(classify)?;
            sqlx::query("DELETE FROM banner WHERE id = ANY($1)")
                .bind(&ids)
                .execute(&mut *tx)
                .await
                .map_err(classify)?;
        }

        tx.commit().await.map_err(classify)?;

        Ok(())
    }
}
