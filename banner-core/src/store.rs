use crate::{Banner, BannerFilter, BannerId, Content, FeatureId, Pagination, Patch, StoreError, TagId, Version};
use async_trait::async_trait;

/// A partial update to an existing banner.
///
/// Every field besides `id` is a [`Patch`]; only fields set to [`Patch::Set`] are
/// applied. A value with every field [`Patch::Unset`] is a valid, accepted no-op
/// that leaves `updated_at` untouched.
#[derive(Clone, Debug, Default)]
pub struct BannerUpdate {
    pub id: BannerId,
    pub content: Patch<Content>,
    pub feature_id: Patch<FeatureId>,
    pub tag_ids: Patch<Vec<TagId>>,
    pub is_active: Patch<bool>,
}

impl BannerUpdate {
    /// Creates an update that touches no fields.
    pub fn for_id(id: BannerId) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }

    /// Returns `true` when no field is being changed.
    pub fn is_empty(&self) -> bool {
        self.content.is_unset()
            && self.feature_id.is_unset()
            && self.tag_ids.is_unset()
            && self.is_active.is_unset()
    }
}

/// Defines the behavior of the banner store.
///
/// Implementations must uphold the core entity invariants at every transaction
/// boundary, in particular: deleted banners are invisible to every method here,
/// and a successful [`Store::create_banner`]/[`Store::update_banner`] never leaves
/// a (feature_id, tag) pair duplicated across non-deleted banners.
#[async_trait]
pub trait Store: Send + Sync {
    /// Atomically creates a banner with an initial content version. Fails with
    /// [`StoreError::ConflictExists`] if any (feature_id, tag) pair collides with
    /// an existing non-deleted banner. `tag_ids` must be non-empty.
    async fn create_banner(
        &self,
        feature_id: FeatureId,
        tag_ids: Vec<TagId>,
        content: Content,
        is_active: bool,
    ) -> Result<BannerId, StoreError>;

    /// Physically deletes the banner with the given id. Fails with
    /// [`StoreError::NotFound`] if no non-deleted banner has that id.
    async fn delete_banner(&self, id: BannerId) -> Result<BannerId, StoreError>;

    /// Applies a partial update atomically. Fails with [`StoreError::NotFound`] if
    /// the target is absent or already deleted, or [`StoreError::ConflictExists`]
    /// if the resulting mapping set would violate uniqueness.
    async fn update_banner(&self, update: BannerUpdate) -> Result<BannerId, StoreError>;

    /// Returns the content of the unique active, non-deleted banner mapped to
    /// `(feature_id, tag_id)`, at `version` if given, else at the banner's
    /// `last_version`. Fails with [`StoreError::NotFound`] when the banner does
    /// not exist, is inactive, is deleted, or lacks the requested version.
    async fn get_banner(
        &self,
        feature_id: FeatureId,
        tag_id: TagId,
        version: Option<Version>,
    ) -> Result<Content, StoreError>;

    /// Returns every non-deleted banner matching `filter`, paginated, ordered by
    /// id ascending, each with its full retained content list. Never fails with
    /// [`StoreError::NotFound`]; an empty match is a successful empty list.
    async fn get_banners(
        &self,
        filter: BannerFilter,
        pagination: Pagination,
    ) -> Result<Vec<Banner>, StoreError>;

    /// Logically deletes every non-deleted banner matching `filter` and enqueues a
    /// one-shot sweep. Fails with [`StoreError::NotFound`] if zero banners match.
    /// At least one of `filter.feature_id`/`filter.tag_id` must be set; callers
    /// above this trait are responsible for enforcing that.
    async fn delete_filtered_banner(&self, filter: BannerFilter) -> Result<(), StoreError>;

    /// Physically removes every banner marked deleted. Idempotent; never fails
    /// with a domain error.
    async fn clean_deleted_banner(&self) -> Result<(), StoreError>;
}
