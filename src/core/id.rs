//! Unique identifiers for render targets, textures and materials.

use std::sync::atomic::{AtomicU64, Ordering};

/// Global ID counter.
static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// A unique identifier for a GPU-side resource.
///
/// Backends key their resource tables by `Id`, so two handles with the same
/// id always refer to the same surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Id(u64);

impl Id {
    /// Generate a new unique ID.
    #[inline]
    pub fn new() -> Self {
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    #[inline]
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl Default for Id {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_ids() {
        let id1 = Id::new();
        let id2 = Id::new();
        assert_ne!(id1, id2);
        assert!(id2 > id1);
    }

    #[test]
    fn test_display() {
        let id = Id::new();
        assert_eq!(id.to_string(), format!("#{}", id.value()));
    }
}
