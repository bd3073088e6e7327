use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// The number of [`ContentVersion`]s a [`Banner`] retains.
pub const MAX_RETAINED_VERSIONS: usize = 3;

macro_rules! id_newtype {
    ($name:ident) => {
        /// Opaque 32-bit identifier.
        #[repr(transparent)]
        #[derive(
            Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl $name {
            /// Returns the raw numeric value.
            #[inline]
            pub const fn value(self) -> u32 {
                self.0
            }
        }

        impl From<u32> for $name {
            fn from(value: u32) -> Self {
                Self(value)
            }
        }

        impl From<$name> for u32 {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(BannerId);
id_newtype!(FeatureId);
id_newtype!(TagId);

/// A per-banner, monotonically increasing content revision number.
///
/// Versions start at 1 and never repeat or go backwards for a given banner.
#[repr(transparent)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(pub u32);

impl Version {
    /// The version assigned to a banner's first content on create.
    pub const FIRST: Version = Version(1);

    /// Returns the next version in sequence.
    #[inline]
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for Version {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl From<Version> for u32 {
    fn from(value: Version) -> Self {
        value.0
    }
}

/// Opaque JSON content bytes.
///
/// Validated only as "syntactically valid JSON object" at construction time;
/// callers never need to know the shape of a banner's payload beyond that.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Content(serde_json::Value);

/// Indicates `Content::new` was given a JSON value that is not an object.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("content must be a JSON object")]
pub struct NotAJsonObject;

impl Content {
    /// Wraps a [`serde_json::Value`], rejecting anything that is not a JSON object.
    pub fn new(value: serde_json::Value) -> Result<Self, NotAJsonObject> {
        if value.is_object() {
            Ok(Self(value))
        } else {
            Err(NotAJsonObject)
        }
    }

    /// Returns the wrapped JSON value.
    pub fn into_value(self) -> serde_json::Value {
        self.0
    }

    /// Borrows the wrapped JSON value.
    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }
}

/// A single retained content revision of a [`Banner`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContentVersion {
    pub version: Version,
    pub content: Content,
    pub created_at: SystemTime,
}

/// The root banner entity.
///
/// `deleted` is intentionally absent here: it is never exposed externally and a
/// [`Banner`] value is only ever constructed by the store for rows that are not
/// (yet) logically deleted (invariant 5).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Banner {
    pub id: BannerId,
    pub feature_id: FeatureId,
    pub tag_ids: Vec<TagId>,
    pub is_active: bool,
    pub created_at: SystemTime,
    pub updated_at: SystemTime,
    /// Ascending by version, oldest first; at most [`MAX_RETAINED_VERSIONS`] entries.
    pub versions: Vec<ContentVersion>,
}

impl Banner {
    /// Returns the highest retained [`Version`], i.e. the banner's `last_version`.
    pub fn last_version(&self) -> Option<Version> {
        self.versions.last().map(|v| v.version)
    }

    /// Returns the content at a specific version, or the latest if `version` is `None`.
    pub fn content_at(&self, version: Option<Version>) -> Option<&ContentVersion> {
        match version {
            Some(wanted) => self.versions.iter().find(|v| v.version == wanted),
            None => self.versions.last(),
        }
    }
}

/// Filter used by `GetBanners` / `DeleteFilteredBanner`.
///
/// Both fields use [`crate::Patch`] rather than [`Option`] so the filter and the
/// partial-update representation share one vocabulary for "field present or not",
/// per the nullable-wrapper vocabulary used throughout this crate.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BannerFilter {
    pub feature_id: crate::Patch<FeatureId>,
    pub tag_id: crate::Patch<TagId>,
}

impl BannerFilter {
    /// Returns a filter that matches every non-deleted banner.
    pub fn all() -> Self {
        Self::default()
    }

    /// Returns `true` when neither field is set.
    pub fn is_empty(&self) -> bool {
        self.feature_id.is_unset() && self.tag_id.is_unset()
    }
}

/// Pagination parameters for `GetBanners`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Pagination {
    pub offset: u32,
    pub limit: u32,
}

impl Pagination {
    pub const DEFAULT_LIMIT: u32 = 100;
    pub const DEFAULT_OFFSET: u32 = 0;
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: Self::DEFAULT_OFFSET,
            limit: Self::DEFAULT_LIMIT,
        }
    }
}
