use async_trait::async_trait;
use std::time::Duration;

/// The cache's default TTL when a caller does not specify one.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// Outcome of a [`Cache::get`] call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CacheLookup {
    Hit(Vec<u8>),
    Miss,
}

/// Defines the behavior of the read-through content cache.
///
/// # Remarks
///
/// Implementations are expected to never fail outwardly: a connection error or a
/// malformed entry should be swallowed and reported as [`CacheLookup::Miss`] (a
/// `Get`) or silently dropped (a `Set`), with the failure logged by the
/// implementation. `banner-service`'s cache gateway relies on this —
/// "a cache error ... is logged and treated as a miss; it never fails the
/// request."
#[async_trait]
pub trait Cache: Send + Sync {
    /// Looks up `key`. Implementations MUST NOT propagate backend errors; a
    /// failed lookup degrades to [`CacheLookup::Miss`].
    async fn get(&self, key: &str) -> CacheLookup;

    /// Stores `value` under `key` with the given TTL, overwriting any existing
    /// entry (last-writer-wins). Implementations MUST NOT propagate backend
    /// errors; a failed write is swallowed.
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration);
}

/// Builds the cache key for a user read.
///
/// Pinning the version into the key means cached entries for different versions
/// never alias, and the "latest" entry (no version) can be invalidated
/// independently of any pinned version.
pub fn cache_key(feature_id: u32, tag_id: u32, version: Option<u32>) -> String {
    match version {
        Some(version) => format!("{feature_id}-{tag_id}-{version}"),
        None => format!("{feature_id}-{tag_id}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_omits_version_when_not_given() {
        assert_eq!(cache_key(1, 2, None), "1-2");
    }

    #[test]
    fn key_includes_version_when_given() {
        assert_eq!(cache_key(1, 2, Some(3)), "1-2-3");
    }
}
