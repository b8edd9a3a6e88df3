//! StageTag - stable identifier of a stage type
//!
//! The tag is what the serialized pipeline stores for each link and what the
//! stage registry is keyed by. Renaming a tag breaks every persisted work unit.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Borrow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::Arc;

/// Stage type identifier with cheap cloning.
///
/// # Examples
/// ```
/// use contracts::StageTag;
///
/// let tag = StageTag::new("download");
/// assert_eq!(tag, "download");
/// ```
#[derive(Clone)]
pub struct StageTag(Arc<str>);

impl StageTag {
    /// Create a tag from a string slice.
    #[inline]
    pub fn new(s: &str) -> Self {
        Self(Arc::from(s))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for StageTag {
    type Target = str;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Borrow<str> for StageTag {
    #[inline]
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for StageTag {
    #[inline]
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for StageTag {
    #[inline]
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

impl fmt::Display for StageTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for StageTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StageTag({:?})", self.0)
    }
}

impl PartialEq for StageTag {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0 == other.0
    }
}

impl Eq for StageTag {}

impl PartialEq<str> for StageTag {
    #[inline]
    fn eq(&self, other: &str) -> bool {
        self.0.as_ref() == other
    }
}

impl PartialEq<&str> for StageTag {
    #[inline]
    fn eq(&self, other: &&str) -> bool {
        self.0.as_ref() == *other
    }
}

// Must agree with `str` hashing so `HashMap<StageTag, _>::get(&str)` works.
impl Hash for StageTag {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state)
    }
}

impl Serialize for StageTag {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for StageTag {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Self::from(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_lookup_by_str() {
        let mut registry: HashMap<StageTag, u32> = HashMap::new();
        registry.insert("download".into(), 1);
        registry.insert("two_d_search".into(), 2);

        assert_eq!(registry.get("download"), Some(&1));
        assert_eq!(registry.get("inject"), None);
    }

    #[test]
    fn test_serde_is_plain_string() {
        let tag = StageTag::new("prepare");
        let json = serde_json::to_string(&tag).unwrap();
        assert_eq!(json, "\"prepare\"");

        let back: StageTag = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tag);
    }
}
