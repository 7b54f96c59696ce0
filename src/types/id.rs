// ABOUTME: Phantom-typed identifiers assigned by the container runtime.
// ABOUTME: Keeps container, network, and image IDs from being swapped by accident.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// Marker types for phantom type parameters.
pub enum ContainerMarker {}
pub enum NetworkMarker {}
pub enum ImageMarker {}

const DIGEST_PREFIX: &str = "sha256:";

/// An opaque identifier handed out by the runtime.
///
/// The gateway never invents these; they only ever come back from a
/// create or list call.
#[must_use = "IDs reference resources and should not be ignored"]
pub struct Id<T> {
    value: String,
    _marker: PhantomData<T>,
}

impl<T> Id<T> {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            _marker: PhantomData,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// The 12-character form the CLI prints, without any digest prefix.
    pub fn short(&self) -> &str {
        let bare = self
            .value
            .strip_prefix(DIGEST_PREFIX)
            .unwrap_or(&self.value);
        bare.get(..12).unwrap_or(bare)
    }

    /// Whether `candidate` names this ID the way the runtime resolves it:
    /// the full value or any prefix of it, with or without `sha256:`.
    pub fn matches(&self, candidate: &str) -> bool {
        if candidate.is_empty() {
            return false;
        }
        let bare = self
            .value
            .strip_prefix(DIGEST_PREFIX)
            .unwrap_or(&self.value);
        let wanted = candidate.strip_prefix(DIGEST_PREFIX).unwrap_or(candidate);
        !wanted.is_empty() && bare.starts_with(wanted)
    }
}

// Manual trait implementations so T needs no bounds of its own.

impl<T> std::fmt::Debug for Id<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Id").field("value", &self.value).finish()
    }
}

impl<T> Clone for Id<T> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> PartialEq for Id<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<T> Eq for Id<T> {}

impl<T> PartialOrd for Id<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Id<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.value.cmp(&other.value)
    }
}

impl<T> Hash for Id<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl<T> std::fmt::Display for Id<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl<T> Serialize for Id<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.value.serialize(serializer)
    }
}

impl<'de, T> Deserialize<'de> for Id<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Ok(Self::new(value))
    }
}

pub type ContainerId = Id<ContainerMarker>;
pub type NetworkId = Id<NetworkMarker>;
pub type ImageId = Id<ImageMarker>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_strips_digest_prefix() {
        let id = ImageId::new("sha256:0123456789abcdef0123");
        assert_eq!(id.short(), "0123456789ab");
    }

    #[test]
    fn matches_accepts_prefixes_with_or_without_digest() {
        let id = ImageId::new("sha256:0123456789abcdef");
        assert!(id.matches("0123"));
        assert!(id.matches("sha256:0123456789abcdef"));
        assert!(!id.matches("abcd"));
        assert!(!id.matches(""));
        assert!(!id.matches("sha256:"));
    }
}
