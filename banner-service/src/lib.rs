//! The banner service facade and its cache-aside read gateway.

use banner_core::{
    cache::{cache_key, Cache, CacheLookup, DEFAULT_TTL},
    store::{BannerUpdate, Store},
    Banner, BannerFilter, BannerId, Content, FeatureId, Pagination, Patch, ServiceError, TagId,
    Version,
};
use std::sync::Arc;

/// Facade over the banner store and its cache, exposing the operations a
/// delivery layer (HTTP, gRPC, a CLI) drives directly.
pub struct BannerService {
    store: Arc<dyn Store>,
    cache: Arc<dyn Cache>,
}

impl BannerService {
    pub fn new(store: Arc<dyn Store>, cache: Arc<dyn Cache>) -> Self {
        Self { store, cache }
    }

    /// Creates a banner. `tag_ids` must be non-empty.
    pub async fn create_banner(
        &self,
        feature_id: FeatureId,
        tag_ids: Vec<TagId>,
        content: Content,
        is_active: bool,
    ) -> Result<BannerId, ServiceError> {
        if tag_ids.is_empty() {
            return Err(ServiceError::Validation("tag_ids must not be empty".into()));
        }

        Ok(self
            .store
            .create_banner(feature_id, tag_ids, content, is_active)
            .await?)
    }

    /// Physically deletes a banner immediately, bypassing the deferred sweep.
    pub async fn delete_banner(&self, id: BannerId) -> Result<BannerId, ServiceError> {
        Ok(self.store.delete_banner(id).await?)
    }

    /// Applies a partial update. An update with every field unset is accepted
    /// as a no-op.
    pub async fn update_banner(&self, update: BannerUpdate) -> Result<BannerId, ServiceError> {
        Ok(self.store.update_banner(update).await?)
    }

    /// Lists banners for administration: both active and inactive, never
    /// filtered by liveness beyond "not logically deleted".
    pub async fn get_admin_banners(
        &self,
        feature_id: Option<FeatureId>,
        tag_id: Option<TagId>,
        offset: Option<u32>,
        limit: Option<u32>,
    ) -> Result<Vec<Banner>, ServiceError> {
        let filter = BannerFilter {
            feature_id: Patch::from(feature_id),
            tag_id: Patch::from(tag_id),
        };
        let pagination = Pagination {
            offset: offset.unwrap_or(Pagination::DEFAULT_OFFSET),
            limit: limit.unwrap_or(Pagination::DEFAULT_LIMIT),
        };

        Ok(self.store.get_banners(filter, pagination).await?)
    }

    /// Logically deletes every banner matching `feature_id`/`tag_id`. At
    /// least one of the two must be given.
    pub async fn delete_filtered_banner(
        &self,
        feature_id: Option<FeatureId>,
        tag_id: Option<TagId>,
    ) -> Result<(), ServiceError> {
        if feature_id.is_none() && tag_id.is_none() {
            return Err(ServiceError::Validation(
                "at least one of feature_id or tag_id must be given".into(),
            ));
        }

        let filter = BannerFilter {
            feature_id: Patch::from(feature_id),
            tag_id: Patch::from(tag_id),
        };

        Ok(self.store.delete_filtered_banner(filter).await?)
    }

    /// Reads a banner's content the way an end user sees it: cache-aside,
    /// honoring `version` and `use_last_revision` (see [`CacheGateway`]).
    pub async fn get_user_banner(
        &self,
        feature_id: FeatureId,
        tag_id: TagId,
        version: Option<Version>,
        use_last_revision: bool,
    ) -> Result<Content, ServiceError> {
        CacheGateway::new(&self.store, &self.cache)
            .get(feature_id, tag_id, version, use_last_revision)
            .await
    }
}

/// The cache-aside gateway for user banner reads (C5).
///
/// Implements the read path as a short, explicit sequence rather than folding
/// it into [`BannerService::get_user_banner`] directly, so its steps can be
/// exercised in isolation against a [`banner_core::mem::MemCache`] double.
pub struct CacheGateway<'a> {
    store: &'a Arc<dyn Store>,
    cache: &'a Arc<dyn Cache>,
}

impl<'a> CacheGateway<'a> {
    pub fn new(store: &'a Arc<dyn Store>, cache: &'a Arc<dyn Cache>) -> Self {
        Self { store, cache }
    }

    /// 1. `use_last_revision` bypasses the cache entirely and always reads
    ///    through to the store, refreshing the cached entry on success — this
    ///    is how a caller forces a guaranteed-fresh read after a write.
    /// 2. Otherwise, look up the key (`"{feature_id}-{tag_id}"`, or
    ///    `"{feature_id}-{tag_id}-{version}"` when a version is pinned).
    /// 3. A hit returns the cached bytes directly, decoded back into
    ///    [`Content`].
    /// 4. A miss reads through to the store and, on success, populates the
    ///    cache with the default TTL before returning.
    /// 5. A cache failure (`Get` or `Set`) is never surfaced to the caller:
    ///    [`Cache`] degrades errors to [`CacheLookup::Miss`] / a dropped write
    ///    on its own, so this gateway only ever sees `Hit` or `Miss`.
    pub async fn get(
        &self,
        feature_id: FeatureId,
        tag_id: TagId,
        version: Option<Version>,
        use_last_revision: bool,
    ) -> Result<Content, ServiceError> {
        let key = cache_key(feature_id.0, tag_id.0, version.map(|v| v.0));

        if use_last_revision {
            return self.read_through(feature_id, tag_id, version, &key).await;
        }

        match self.cache.get(&key).await {
            CacheLookup::Hit(bytes) => decode(&bytes),
            CacheLookup::Miss => self.read_through(feature_id, tag_id, version, &key).await,
        }
    }

    async fn read_through(
        &self,
        feature_id: FeatureId,
        tag_id: TagId,
        version: Option<Version>,
        key: &str,
    ) -> Result<Content, ServiceError> {
        let content = self.store.get_banner(feature_id, tag_id, version).await?;

        if let Ok(bytes) = serde_json::to_vec(content.as_value()) {
            self.cache.set(key, bytes, DEFAULT_TTL).await;
        }

        Ok(content)
    }
}

fn decode(bytes: &[u8]) -> Result<Content, ServiceError> {
    let value: serde_json::Value = serde_json::from_slice(bytes)
        .map_err(|e| ServiceError::Transient(format!("corrupt cache entry: {e}")))?;

    Content::new(value).map_err(|_| ServiceError::Transient("corrupt cache entry".into()))
}
