//! Core domain types, traits, and error taxonomy shared by every banner-service
//! crate: the entity model, the `Store`/`Cache` trait seams implemented by
//! `banner-sql`/`banner-cache`, and the `Clock` abstraction used to make retention
//! and timestamp behavior deterministic in tests.

mod clock;
mod error;
mod model;
mod patch;

pub mod cache;
pub mod store;

/// In-memory reference implementations of [`store::Store`] and [`cache::Cache`],
/// useful for fast unit tests that don't need a live Postgres or Redis instance.
pub mod mem;

pub use clock::{Clock, VirtualClock, WallClock};
pub use error::{ServiceError, StoreError};
pub use model::{
    Banner, BannerFilter, BannerId, Content, ContentVersion, FeatureId, Pagination, TagId,
    Version, MAX_RETAINED_VERSIONS,
};
pub use patch::Patch;
