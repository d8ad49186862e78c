//! Field paths locating a node inside a nested value.
//!
//! A [`FieldPath`] is built while walking an [`EncodedValue`](crate::EncodedValue)
//! and is rendered into a query key by joining its segments with `.`.

use std::fmt;

/// One step of a [`FieldPath`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// Field of a keyed container.
    Named(String),
    /// Position in an indexed container, starting at zero.
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => f.write_str(name),
            Self::Index(index) => write!(f, "{index}"),
        }
    }
}

impl From<&str> for PathSegment {
    fn from(name: &str) -> Self {
        Self::Named(name.to_string())
    }
}

impl From<String> for PathSegment {
    fn from(name: String) -> Self {
        Self::Named(name)
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

/// Ordered sequence of segments from the root to a node.
///
/// Paths are never mutated in place: [`FieldPath::child`] returns a new path
/// with one more segment, so a parent path can be shared by all its children.
///
/// # Example
///
/// ```
/// use courier_core::FieldPath;
///
/// let path = FieldPath::root().child("filter").child("tags").child(0);
/// assert_eq!(path.to_key(), "filter.tags.0");
/// assert_eq!(FieldPath::root().to_key(), "");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FieldPath {
    segments: Vec<PathSegment>,
}

impl FieldPath {
    /// The empty path, pointing at the root value.
    #[must_use]
    pub const fn root() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    /// Returns a new path with `segment` appended.
    #[must_use]
    pub fn child(&self, segment: impl Into<PathSegment>) -> Self {
        let mut segments = Vec::with_capacity(self.segments.len() + 1);
        segments.extend_from_slice(&self.segments);
        segments.push(segment.into());
        Self { segments }
    }

    /// Path segments, root first.
    #[must_use]
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Number of segments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Returns `true` for the root path.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Render the path as a query key (`a.b.0.c`).
    #[must_use]
    pub fn to_key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (position, segment) in self.segments.iter().enumerate() {
            if position > 0 {
                f.write_str(".")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

impl FromIterator<PathSegment> for FieldPath {
    fn from_iter<I: IntoIterator<Item = PathSegment>>(iter: I) -> Self {
        Self {
            segments: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_renders_empty_key() {
        let path = FieldPath::root();
        assert!(path.is_root());
        assert_eq!(path.len(), 0);
        assert_eq!(path.to_key(), "");
    }

    #[test]
    fn named_and_indexed_segments_join_with_dots() {
        let path = FieldPath::root().child("key1").child("list").child(12);
        assert_eq!(path.to_key(), "key1.list.12");
        assert_eq!(path.len(), 3);
    }

    #[test]
    fn child_leaves_parent_untouched() {
        let parent = FieldPath::root().child("user");
        let name = parent.child("name");
        let age = parent.child("age");

        assert_eq!(parent.to_key(), "user");
        assert_eq!(name.to_key(), "user.name");
        assert_eq!(age.to_key(), "user.age");
    }

    #[test]
    fn collect_from_segments() {
        let path: FieldPath = vec![PathSegment::from("a"), PathSegment::Index(0)]
            .into_iter()
            .collect();
        assert_eq!(path.segments(), &[PathSegment::Named("a".into()), PathSegment::Index(0)]);
        assert_eq!(path.to_string(), "a.0");
    }
}
