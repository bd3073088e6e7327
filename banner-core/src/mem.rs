use crate::{
    cache::{Cache, CacheLookup},
    store::Store,
    Banner, BannerFilter, BannerId, Clock, Content, ContentVersion, FeatureId, Pagination, Patch,
    StoreError, TagId, Version, WallClock, MAX_RETAINED_VERSIONS,
};
use async_trait::async_trait;
use std::{
    collections::{HashMap, HashSet},
    sync::{atomic::{AtomicU32, Ordering}, Arc, RwLock},
    time::{Duration, SystemTime},
};

struct Row {
    id: BannerId,
    feature_id: FeatureId,
    tag_ids: Vec<TagId>,
    is_active: bool,
    created_at: SystemTime,
    updated_at: SystemTime,
    versions: Vec<ContentVersion>,
    deleted: bool,
}

impl Row {
    fn matches(&self, filter: &BannerFilter) -> bool {
        if let Patch::Set(feature_id) = filter.feature_id {
            if self.feature_id != feature_id {
                return false;
            }
        }

        if let Patch::Set(tag_id) = filter.tag_id {
            if !self.tag_ids.contains(&tag_id) {
                return false;
            }
        }

        true
    }

    fn to_banner(&self) -> Banner {
        Banner {
            id: self.id,
            feature_id: self.feature_id,
            tag_ids: self.tag_ids.clone(),
            is_active: self.is_active,
            created_at: self.created_at,
            updated_at: self.updated_at,
            versions: self.versions.clone(),
        }
    }
}

/// An in-memory [`Store`], useful for fast unit tests that don't need a live
/// Postgres instance. Mirrors the same invariants as the SQL-backed store in
/// `banner-sql`, just without persistence.
pub struct MemStore {
    rows: RwLock<HashMap<u32, Row>>,
    next_id: AtomicU32,
    clock: Arc<dyn Clock>,
}

impl Default for MemStore {
    fn default() -> Self {
        Self::new(Arc::new(WallClock::new()))
    }
}

impl MemStore {
    /// Initializes a new, empty [`MemStore`] driven by `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            rows: RwLock::new(HashMap::new()),
            next_id: AtomicU32::new(1),
            clock,
        }
    }

    fn existing_pairs(rows: &HashMap<u32, Row>, exclude: Option<u32>) -> HashSet<(u32, u32)> {
        rows.values()
            .filter(|row| !row.deleted && Some(row.id.0) != exclude)
            .flat_map(|row| row.tag_ids.iter().map(move |tag| (row.feature_id.0, tag.0)))
            .collect()
    }
}

#[async_trait]
impl Store for MemStore {
    async fn create_banner(
        &self,
        feature_id: FeatureId,
        tag_ids: Vec<TagId>,
        content: Content,
        is_active: bool,
    ) -> Result<BannerId, StoreError> {
        let mut rows = self.rows.write().unwrap();
        let existing = Self::existing_pairs(&rows, None);

        if tag_ids.iter().any(|tag| existing.contains(&(feature_id.0, tag.0))) {
            return Err(StoreError::ConflictExists);
        }

        let id = BannerId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let now = self.clock.now();

        rows.insert(
            id.0,
            Row {
                id,
                feature_id,
                tag_ids,
                is_active,
                created_at: now,
                updated_at: now,
                versions: vec![ContentVersion {
                    version: Version::FIRST,
                    content,
                    created_at: now,
                }],
                deleted: false,
            },
        );

        Ok(id)
    }

    async fn delete_banner(&self, id: BannerId) -> Result<BannerId, StoreError> {
        let mut rows = self.rows.write().unwrap();

        match rows.get(&id.0) {
            Some(row) if !row.deleted => {
                rows.remove(&id.0);
                Ok(id)
            }
            _ => Err(StoreError::NotFound),
        }
    }

    async fn update_banner(
        &self,
        update: crate::store::BannerUpdate,
    ) -> Result<BannerId, StoreError> {
        let is_empty = update.is_empty();
        let mut rows = self.rows.write().unwrap();

        if !matches!(rows.get(&update.id.0), Some(row) if !row.deleted) {
            return Err(StoreError::NotFound);
        }

        if let Patch::Set(active) = update.is_active {
            rows.get_mut(&update.id.0).unwrap().is_active = active;
        }

        if let Patch::Set(content) = update.content {
            let now = self.clock.now();
            let row = rows.get_mut(&update.id.0).unwrap();
            let next_version = row.versions.last().map_or(Version::FIRST, |v| v.version.next());

            row.versions.push(ContentVersion {
                version: next_version,
                content,
                created_at: now,
            });

            if row.versions.len() > MAX_RETAINED_VERSIONS {
                let excess = row.versions.len() - MAX_RETAINED_VERSIONS;
                row.versions.drain(0..excess);
            }
        }

        let tag_ids = update.tag_ids.into_option();
        let feature_id = update.feature_id.into_option();

        if tag_ids.is_some() || feature_id.is_some() {
            let current = rows.get(&update.id.0).unwrap();
            let new_feature_id = feature_id.unwrap_or(current.feature_id);
            let new_tags = tag_ids.clone().unwrap_or_else(|| current.tag_ids.clone());
            let existing = Self::existing_pairs(&rows, Some(update.id.0));

            if new_tags.iter().any(|tag| existing.contains(&(new_feature_id.0, tag.0))) {
                return Err(StoreError::ConflictExists);
            }

            let row = rows.get_mut(&update.id.0).unwrap();
            row.feature_id = new_feature_id;

            if tag_ids.is_some() {
                row.tag_ids = new_tags;
            }
        }

        if !is_empty {
            let now = self.clock.now();
            rows.get_mut(&update.id.0).unwrap().updated_at = now;
        }

        Ok(update.id)
    }

    async fn get_banner(
        &self,
        feature_id: FeatureId,
        tag_id: TagId,
        version: Option<Version>,
    ) -> Result<Content, StoreError> {
        let rows = self.rows.read().unwrap();
        let row = rows
            .values()
            .find(|row| {
                !row.deleted
                    && row.is_active
                    && row.feature_id == feature_id
                    && row.tag_ids.contains(&tag_id)
            })
            .ok_or(StoreError::NotFound)?;

        row.to_banner()
            .content_at(version)
            .map(|v| v.content.clone())
            .ok_or(StoreError::NotFound)
    }

    async fn get_banners(
        &self,
        filter: BannerFilter,
        pagination: Pagination,
    ) -> Result<Vec<Banner>, StoreError> {
        let rows = self.rows.read().unwrap();
        let mut matched: Vec<&Row> = rows
            .values()
            .filter(|row| !row.deleted && row.matches(&filter))
            .collect();

        matched.sort_by_key(|row| row.id.0);

        Ok(matched
            .into_iter()
            .skip(pagination.offset as usize)
            .take(pagination.limit as usize)
            .map(Row::to_banner)
            .collect())
    }

    async fn delete_filtered_banner(&self, filter: BannerFilter) -> Result<(), StoreError> {
        let mut rows = self.rows.write().unwrap();
        let ids: Vec<u32> = rows
            .values()
            .filter(|row| !row.deleted && row.matches(&filter))
            .map(|row| row.id.0)
            .collect();

        if ids.is_empty() {
            return Err(StoreError::NotFound);
        }

        for id in ids {
            rows.get_mut(&id).unwrap().deleted = true;
        }

        Ok(())
    }

    async fn clean_deleted_banner(&self) -> Result<(), StoreError> {
        let mut rows = self.rows.write().unwrap();
        rows.retain(|_, row| !row.deleted);
        Ok(())
    }
}

struct CacheEntry {
    value: Vec<u8>,
    expires_at: SystemTime,
}

/// An in-memory [`Cache`], useful for tests that don't need a live Redis instance.
#[derive(Default)]
pub struct MemCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl MemCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Cache for MemCache {
    async fn get(&self, key: &str) -> CacheLookup {
        let entries = self.entries.read().unwrap();

        match entries.get(key) {
            Some(entry) if entry.expires_at > SystemTime::now() => CacheLookup::Hit(entry.value.clone()),
            _ => CacheLookup::Miss,
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) {
        let mut entries = self.entries.write().unwrap();
        entries.insert(
            key.to_owned(),
            CacheEntry {
                value,
                expires_at: SystemTime::now() + ttl,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::VirtualClock;

    fn content(body: &str) -> Content {
        Content::new(serde_json::from_str(body).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn create_then_get_returns_created_content() {
        let store = MemStore::default();
        store
            .create_banner(FeatureId(1), vec![TagId(2), TagId(3)], content(r#"{"t":"a"}"#), true)
            .await
            .unwrap();

        let got = store.get_banner(FeatureId(1), TagId(2), None).await.unwrap();

        assert_eq!(got, content(r#"{"t":"a"}"#));
    }

    #[tokio::test]
    async fn create_rejects_conflicting_feature_tag_pair() {
        let store = MemStore::default();
        store
            .create_banner(FeatureId(1), vec![TagId(2)], content("{}"), true)
            .await
            .unwrap();

        let result = store
            .create_banner(FeatureId(1), vec![TagId(2), TagId(9)], content("{}"), true)
            .await;

        assert!(matches!(result, Err(StoreError::ConflictExists)));
    }

    #[tokio::test]
    async fn retention_keeps_only_last_three_versions() {
        let store = MemStore::default();
        let id = store
            .create_banner(FeatureId(1), vec![TagId(2)], content(r#"{"v":1}"#), true)
            .await
            .unwrap();

        for v in 2..=5 {
            let mut update = crate::store::BannerUpdate::for_id(id);
            update.content = Patch::Set(content(&format!(r#"{{"v":{v}}}"#)));
            store.update_banner(update).await.unwrap();
        }

        let banners = store
            .get_banners(BannerFilter::all(), Pagination::default())
            .await
            .unwrap();
        let banner = banners.into_iter().find(|b| b.id == id).unwrap();

        assert_eq!(banner.versions.len(), MAX_RETAINED_VERSIONS);
        let values: Vec<_> = banner
            .versions
            .iter()
            .map(|v| v.content.as_value()["v"].clone())
            .collect();
        assert_eq!(values, vec![3.into(), 4.into(), 5.into()]);
    }

    #[tokio::test]
    async fn inactive_banner_is_not_visible_to_get_banner() {
        let store = MemStore::default();
        store
            .create_banner(FeatureId(1), vec![TagId(2)], content("{}"), false)
            .await
            .unwrap();

        let result = store.get_banner(FeatureId(1), TagId(2), None).await;

        assert!(matches!(result, Err(StoreError::NotFound)));
    }

    #[tokio::test]
    async fn delete_filtered_then_get_banner_returns_not_found() {
        let store = MemStore::default();
        store
            .create_banner(FeatureId(1), vec![TagId(2)], content("{}"), true)
            .await
            .unwrap();

        let mut filter = BannerFilter::all();
        filter.feature_id = Patch::Set(FeatureId(1));
        store.delete_filtered_banner(filter).await.unwrap();

        let result = store.get_banner(FeatureId(1), TagId(2), None).await;
        assert!(matches!(result, Err(StoreError::NotFound)));
    }

    #[tokio::test]
    async fn delete_filtered_with_no_matches_is_not_found() {
        let store = MemStore::default();
        let mut filter = BannerFilter::all();
        filter.feature_id = Patch::Set(FeatureId(99));

        let result = store.delete_filtered_banner(filter).await;
        assert!(matches!(result, Err(StoreError::NotFound)));
    }

    #[tokio::test]
    async fn clean_deleted_banner_physically_removes_logically_deleted_rows() {
        let store = MemStore::default();
        let id = store
            .create_banner(FeatureId(1), vec![TagId(2)], content("{}"), true)
            .await
            .unwrap();

        let mut filter = BannerFilter::all();
        filter.feature_id = Patch::Set(FeatureId(1));
        store.delete_filtered_banner(filter).await.unwrap();
        store.clean_deleted_banner().await.unwrap();

        let result = store.delete_banner(id).await;
        assert!(matches!(result, Err(StoreError::NotFound)));
    }

    #[tokio::test]
    async fn empty_update_does_not_bump_updated_at() {
        let clock = Arc::new(VirtualClock::new());
        let store = MemStore::new(clock.clone());
        let id = store
            .create_banner(FeatureId(1), vec![TagId(2)], content("{}"), true)
            .await
            .unwrap();

        let before = store
            .get_banners(BannerFilter::all(), Pagination::default())
            .await
            .unwrap()[0]
            .updated_at;

        clock.advance(Duration::from_secs(60));
        store
            .update_banner(crate::store::BannerUpdate::for_id(id))
            .await
            .unwrap();

        let after = store
            .get_banners(BannerFilter::all(), Pagination::default())
            .await
            .unwrap()[0]
            .updated_at;

        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn version_pin_returns_historical_content() {
        let store = MemStore::default();
        let id = store
            .create_banner(FeatureId(1), vec![TagId(2)], content(r#"{"t":"a"}"#), true)
            .await
            .unwrap();

        let mut update = crate::store::BannerUpdate::for_id(id);
        update.content = Patch::Set(content(r#"{"t":"b"}"#));
        store.update_banner(update).await.unwrap();

        let pinned = store
            .get_banner(FeatureId(1), TagId(2), Some(Version::FIRST))
            .await
            .unwrap();

        assert_eq!(pinned, content(r#"{"t":"a"}"#));
    }

    #[tokio::test]
    async fn mem_cache_reports_miss_after_ttl_expires() {
        let cache = MemCache::new();
        cache.set("1-2", b"hello".to_vec(), Duration::from_millis(1)).await;
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(cache.get("1-2").await, CacheLookup::Miss);
    }
}
