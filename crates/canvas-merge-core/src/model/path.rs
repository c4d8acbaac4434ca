//! Tree paths and their pointer form.
//!
//! A [`NodePath`] is the external path vocabulary: an ordered list of array
//! indices and field names leading from the document root to a location.
//! The first numeric segment implicitly indexes the artboard list, so
//!
//! ```text
//! [0, "children", 2, "frame"]  →  /artboards/0/children/2/frame
//! []                           →  /artboards
//! ```
//!
//! Paths serialise as plain JSON arrays (`[0, "children", 2]`).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::PatchError;

/// Field name under which containers hold their child nodes.
pub const CHILDREN: &str = "children";

/// Field name of the artboard list at the document root.
pub const ARTBOARDS: &str = "artboards";

/// Marker for "one past the last element" in array pointers.
pub const LAST: &str = "-";

/// One hop of a [`NodePath`].
///
/// `Index` sorts before `Field` so paths order naturally by tree position.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    Index(usize),
    Field(String),
}

impl PathSegment {
    #[must_use]
    pub const fn as_index(&self) -> Option<usize> {
        match self {
            Self::Index(i) => Some(*i),
            Self::Field(_) => None,
        }
    }

    #[must_use]
    pub fn is_field(&self, name: &str) -> bool {
        matches!(self, Self::Field(f) if f == name)
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(i) => write!(f, "{i}"),
            Self::Field(name) => f.write_str(name),
        }
    }
}

impl From<usize> for PathSegment {
    fn from(i: usize) -> Self {
        Self::Index(i)
    }
}

impl From<&str> for PathSegment {
    fn from(s: &str) -> Self {
        Self::Field(s.to_owned())
    }
}

/// A location in a document, expressed from the root.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodePath(Vec<PathSegment>);

impl NodePath {
    /// The empty path (the artboard list).
    #[must_use]
    pub const fn root() -> Self {
        Self(Vec::new())
    }

    /// Path of the artboard at `index`.
    #[must_use]
    pub fn artboard(index: usize) -> Self {
        Self(vec![PathSegment::Index(index)])
    }

    #[must_use]
    pub fn from_segments(segments: Vec<PathSegment>) -> Self {
        Self(segments)
    }

    #[must_use]
    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Path of the `index`-th child of the node at `self`.
    #[must_use]
    pub fn child(&self, index: usize) -> Self {
        let mut segments = self.0.clone();
        segments.push(PathSegment::Field(CHILDREN.to_owned()));
        segments.push(PathSegment::Index(index));
        Self(segments)
    }

    /// Path of the `children` array of the node at `self`.
    #[must_use]
    pub fn children(&self) -> Self {
        self.field(CHILDREN)
    }

    /// `self` extended with a field name.
    #[must_use]
    pub fn field(&self, name: &str) -> Self {
        let mut segments = self.0.clone();
        segments.push(PathSegment::Field(name.to_owned()));
        Self(segments)
    }

    /// `self` extended with an array index.
    #[must_use]
    pub fn index(&self, index: usize) -> Self {
        let mut segments = self.0.clone();
        segments.push(PathSegment::Index(index));
        Self(segments)
    }

    /// `self` followed by every segment of `suffix`.
    #[must_use]
    pub fn join(&self, suffix: &Self) -> Self {
        let mut segments = self.0.clone();
        segments.extend(suffix.0.iter().cloned());
        Self(segments)
    }

    /// The containing array path and the trailing index, if the path ends in one.
    #[must_use]
    pub fn split_last_index(&self) -> Option<(Self, usize)> {
        let (last, rest) = self.0.split_last()?;
        last.as_index().map(|i| (Self(rest.to_vec()), i))
    }

    /// Split into the node part (`[artboard, ("children", i)*]`) and the field
    /// remainder that addresses something inside that node.
    ///
    /// A path that does not start with an artboard index has no node part.
    #[must_use]
    pub fn split_node_prefix(&self) -> (Self, Self) {
        if self.0.first().and_then(PathSegment::as_index).is_none() {
            return (Self::root(), self.clone());
        }
        let mut end = 1;
        while end + 1 < self.0.len()
            && self.0[end].is_field(CHILDREN)
            && self.0[end + 1].as_index().is_some()
        {
            end += 2;
        }
        (Self(self.0[..end].to_vec()), Self(self.0[end..].to_vec()))
    }

    /// `true` if `self` is a strict prefix of `other`.
    #[must_use]
    pub fn is_ancestor_of(&self, other: &Self) -> bool {
        self.0.len() < other.0.len() && other.0[..self.0.len()] == self.0[..]
    }

    /// Render as a root-prefixed pointer string.
    #[must_use]
    pub fn to_pointer(&self) -> String {
        let mut out = String::new();
        if self.0.first().is_none_or(|s| s.as_index().is_some()) {
            out.push('/');
            out.push_str(ARTBOARDS);
        }
        for segment in &self.0 {
            out.push('/');
            match segment {
                PathSegment::Index(i) => out.push_str(&i.to_string()),
                PathSegment::Field(name) => out.push_str(&escape_component(name)),
            }
        }
        out
    }

    /// Pointer to the `index`-th slot of the array at `self`, or to the
    /// last-element marker when `index` is `None`.
    #[must_use]
    pub fn slot_pointer(&self, index: Option<usize>) -> String {
        let mut pointer = self.to_pointer();
        pointer.push('/');
        match index {
            Some(i) => pointer.push_str(&i.to_string()),
            None => pointer.push_str(LAST),
        }
        pointer
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_pointer())
    }
}

impl<S: Into<PathSegment>> FromIterator<S> for NodePath {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

// ---------------------------------------------------------------------------
// Pointer components
// ---------------------------------------------------------------------------

/// Escape one pointer component (`~` → `~0`, `/` → `~1`).
#[must_use]
pub fn escape_component(component: &str) -> String {
    if !component.contains(['/', '~']) {
        return component.to_owned();
    }
    component.replace('~', "~0").replace('/', "~1")
}

/// Undo [`escape_component`].
#[must_use]
pub fn unescape_component(component: &str) -> String {
    if !component.contains('~') {
        return component.to_owned();
    }
    component.replace("~1", "/").replace("~0", "~")
}

/// Split a pointer string into unescaped components.
///
/// # Errors
/// Returns [`PatchError::InvalidPointer`] when a non-empty pointer does not
/// start with `/`.
pub fn parse_pointer(pointer: &str) -> Result<Vec<String>, PatchError> {
    if pointer.is_empty() {
        return Ok(Vec::new());
    }
    let Some(rest) = pointer.strip_prefix('/') else {
        return Err(PatchError::InvalidPointer {
            pointer: pointer.to_owned(),
        });
    };
    Ok(rest.split('/').map(unescape_component).collect())
}

#[cfg(test)]
#[allow(clippy::all, clippy::pedantic, clippy::nursery)]
mod tests {
    use super::*;

    fn p(segments: Vec<PathSegment>) -> NodePath {
        NodePath::from_segments(segments)
    }

    #[test]
    fn pointer_maps_first_index_into_artboards() {
        let path = NodePath::artboard(0).child(2).field("frame");
        assert_eq!(path.to_pointer(), "/artboards/0/children/2/frame");
        assert_eq!(NodePath::root().to_pointer(), "/artboards");
        assert_eq!(NodePath::artboard(1).children().slot_pointer(None), "/artboards/1/children/-");
    }

    #[test]
    fn field_components_are_escaped() {
        let path = NodePath::artboard(0).field("props").field("a/b~c");
        assert_eq!(path.to_pointer(), "/artboards/0/props/a~1b~0c");
        assert_eq!(
            parse_pointer("/artboards/0/props/a~1b~0c").unwrap(),
            vec!["artboards", "0", "props", "a/b~c"]
        );
    }

    #[test]
    fn parse_rejects_relative_pointer() {
        assert!(matches!(
            parse_pointer("artboards/0"),
            Err(PatchError::InvalidPointer { .. })
        ));
        assert!(parse_pointer("").unwrap().is_empty());
    }

    #[test]
    fn split_node_prefix_separates_field_suffix() {
        let path = NodePath::artboard(0).child(1).child(3).field("style").field("fills");
        let (node, field) = path.split_node_prefix();
        assert_eq!(node, NodePath::artboard(0).child(1).child(3));
        assert_eq!(field, p(vec!["style".into(), "fills".into()]));

        let (node, field) = NodePath::artboard(2).children().split_node_prefix();
        assert_eq!(node, NodePath::artboard(2));
        assert_eq!(field, p(vec!["children".into()]));
    }

    #[test]
    fn split_last_index() {
        let (parent, idx) = NodePath::artboard(0).child(4).split_last_index().unwrap();
        assert_eq!(parent, NodePath::artboard(0).children());
        assert_eq!(idx, 4);
        assert!(NodePath::artboard(0).field("name").split_last_index().is_none());
    }

    #[test]
    fn serializes_as_mixed_array() {
        let path = NodePath::artboard(0).child(1);
        assert_eq!(serde_json::to_string(&path).unwrap(), r#"[0,"children",1]"#);
        let back: NodePath = serde_json::from_str(r#"[0,"children",1]"#).unwrap();
        assert_eq!(back, path);
    }

    #[test]
    fn ancestor_check() {
        let a = NodePath::artboard(0).child(1);
        assert!(a.is_ancestor_of(&a.child(0)));
        assert!(!a.is_ancestor_of(&a));
        assert!(!a.child(0).is_ancestor_of(&a));
    }
}
