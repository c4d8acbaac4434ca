//! Design-document model: artboards, nodes, geometry and style.
//!
//! A [`Document`] is an ordered list of artboards. Every artboard is itself a
//! root [`Node`] (normally a `frame`) whose `children` hold the nodes placed on
//! it. Ownership is exclusive: a node lives in exactly one `children` array.
//!
//! The model is a typed mirror of the JSON document shape. Field names are
//! camelCase on the wire and optional fields are omitted when absent, so a
//! `Document` survives `to_value` → `from_value` unchanged. The patch
//! interpreter relies on that property.
//!
//! ```json
//! {
//!   "version": 1,
//!   "artboards": [{
//!     "id": "01HZY0000000000000000000AB",
//!     "type": "frame",
//!     "name": "Home",
//!     "frame": { "x": 0, "y": 0, "width": 1440, "height": 900 },
//!     "children": [
//!       { "id": "01HZY0000000000000000000AC", "type": "text", "name": "Title",
//!         "frame": { "x": 24, "y": 24, "width": 300, "height": 40 },
//!         "text": "Welcome" }
//!     ]
//!   }]
//! }
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ---------------------------------------------------------------------------
// NodeId
// ---------------------------------------------------------------------------

/// Globally unique, lexicographically sortable node identity.
///
/// Well-formed identities are 26 Crockford base-32 characters (see
/// [`crate::id::UlidGenerator`]). The type itself accepts any string so that
/// documents produced by other tools can still be indexed; an empty identity
/// is rejected by the indexer as a data-integrity error.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

/// Length of a well-formed node identity.
pub const NODE_ID_LEN: usize = 26;

const CROCKFORD: &[u8] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

impl NodeId {
    /// Wrap a raw identity string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Return the identity as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `true` if the identity is empty (a node without identity).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `true` if the identity is exactly 26 upper-case Crockford base-32 characters.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.0.len() == NODE_ID_LEN && self.0.bytes().all(|b| CROCKFORD.contains(&b))
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// ---------------------------------------------------------------------------
// NodeType
// ---------------------------------------------------------------------------

/// Discriminant tag for a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    /// Container with its own geometry and optional auto-layout.
    Frame,
    /// Lightweight grouping container.
    Group,
    /// Vector shape.
    Vector,
    /// Text run.
    Text,
    /// Raster image.
    Image,
    /// Instance of a reusable component.
    Component,
}

impl NodeType {
    /// Container-like types own an ordered `children` array.
    #[must_use]
    pub const fn is_container(self) -> bool {
        matches!(self, Self::Frame | Self::Group)
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Frame => "frame",
            Self::Group => "group",
            Self::Vector => "vector",
            Self::Text => "text",
            Self::Image => "image",
            Self::Component => "component",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

/// Geometry rectangle in artboard coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    #[must_use]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

// ---------------------------------------------------------------------------
// Style
// ---------------------------------------------------------------------------

/// Visual style of a node. Every property is optional.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Style {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fills: Option<Vec<Paint>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strokes: Option<Vec<Stroke>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corner_radius: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shadow: Option<Shadow>,
}

/// Kind of paint used by a fill.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaintKind {
    Solid,
    LinearGradient,
    RadialGradient,
    Image,
}

/// One fill layer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Paint {
    #[serde(rename = "type")]
    pub kind: PaintKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
}

impl Paint {
    /// A solid colour fill.
    pub fn solid(color: impl Into<String>) -> Self {
        Self {
            kind: PaintKind::Solid,
            color: Some(color.into()),
            opacity: None,
        }
    }
}

/// Where a stroke sits relative to the node outline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrokeAlign {
    Inside,
    Center,
    Outside,
}

/// One stroke layer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub color: String,
    pub width: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub align: Option<StrokeAlign>,
}

/// Drop shadow.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Shadow {
    pub x: f64,
    pub y: f64,
    pub blur: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spread: Option<f64>,
    pub color: String,
}

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

/// Auto-layout direction of a container.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutMode {
    Horizontal,
    Vertical,
    Grid,
}

/// Per-edge padding.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Padding {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

/// Auto-layout configuration of a container node.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Layout {
    pub mode: LayoutMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gap: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub padding: Option<Padding>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub align_items: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub justify_content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wrap: Option<bool>,
}

impl Layout {
    /// A layout in `mode` with no other settings.
    #[must_use]
    pub const fn new(mode: LayoutMode) -> Self {
        Self {
            mode,
            gap: None,
            padding: None,
            align_items: None,
            justify_content: None,
            wrap: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Text
// ---------------------------------------------------------------------------

/// Horizontal text alignment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    Left,
    Center,
    Right,
    Justify,
}

/// Typography of a text node.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextStyle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_weight: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub letter_spacing: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub align: Option<TextAlign>,
}

// ---------------------------------------------------------------------------
// Node
// ---------------------------------------------------------------------------

/// One node of the design tree.
///
/// Type-specific fields (`text`, `component_key`, `props`, `src`) are plain
/// optionals rather than an enum payload so that every field stays addressable
/// by name from a [`NodePath`](super::path::NodePath).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    /// Node identity. Missing on the wire deserialises as empty, which the
    /// indexer reports as [`IndexError::MissingIdentity`](crate::error::IndexError).
    #[serde(default)]
    pub id: NodeId,
    #[serde(rename = "type")]
    pub kind: NodeType,
    #[serde(default)]
    pub name: String,
    /// Absent means visible.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,
    #[serde(default)]
    pub frame: Rect,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<Style>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<Layout>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<Node>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_style: Option<TextStyle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub props: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
}

impl Node {
    /// Wire names of every node field.
    pub const FIELDS: [&'static str; 13] = [
        "id",
        "type",
        "name",
        "visible",
        "frame",
        "style",
        "layout",
        "children",
        "text",
        "textStyle",
        "componentKey",
        "props",
        "src",
    ];

    /// A bare node of `kind` with the given identity, name and geometry.
    pub fn new(id: impl Into<NodeId>, kind: NodeType, name: impl Into<String>, frame: Rect) -> Self {
        Self {
            id: id.into(),
            kind,
            name: name.into(),
            visible: None,
            frame,
            style: None,
            layout: None,
            children: None,
            text: None,
            text_style: None,
            component_key: None,
            props: None,
            src: None,
        }
    }

    /// A `frame` node with the given children.
    pub fn frame(id: impl Into<NodeId>, name: impl Into<String>, frame: Rect, children: Vec<Self>) -> Self {
        Self {
            children: Some(children),
            ..Self::new(id, NodeType::Frame, name, frame)
        }
    }

    /// A `text` node holding `text`.
    pub fn text(id: impl Into<NodeId>, name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::new(id, NodeType::Text, name, Rect::default())
        }
    }

    /// A `component` instance of `component_key` with `props`.
    pub fn component(
        id: impl Into<NodeId>,
        name: impl Into<String>,
        component_key: impl Into<String>,
        props: Map<String, Value>,
    ) -> Self {
        Self {
            component_key: Some(component_key.into()),
            props: Some(props),
            ..Self::new(id, NodeType::Component, name, Rect::default())
        }
    }

    /// Visibility with the "absent means visible" default applied.
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.visible.unwrap_or(true)
    }

    /// Children in order; empty for leaf nodes.
    #[must_use]
    pub fn children(&self) -> &[Self] {
        self.children.as_deref().unwrap_or(&[])
    }
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

const fn default_version() -> u32 {
    1
}

/// A complete design document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub artboards: Vec<Node>,
}

impl Document {
    /// A version-1 document holding `artboards`.
    #[must_use]
    pub const fn new(artboards: Vec<Node>) -> Self {
        Self {
            version: default_version(),
            name: None,
            artboards,
        }
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

#[cfg(test)]
#[allow(clippy::all, clippy::pedantic, clippy::nursery)]
mod tests {
    use super::*;

    #[test]
    fn absent_optionals_are_not_serialized() {
        let node = Node::new("A", NodeType::Vector, "Shape", Rect::new(1.0, 2.0, 3.0, 4.0));
        let value = serde_json::to_value(&node).unwrap();
        let obj = value.as_object().unwrap();
        assert_eq!(obj.len(), 4, "only id, type, name, frame: {obj:?}");
        assert_eq!(obj["type"], "vector");
    }

    #[test]
    fn document_roundtrips_through_json_value() {
        let mut props = Map::new();
        props.insert("label".into(), Value::from("Buy"));
        let mut button = Node::component("C", "Button", "button/primary", props);
        button.style = Some(Style {
            fills: Some(vec![Paint::solid("#ff0000")]),
            opacity: Some(0.5),
            ..Style::default()
        });
        let doc = Document::new(vec![Node::frame(
            "ROOT",
            "Home",
            Rect::new(0.0, 0.0, 100.0, 100.0),
            vec![button, Node::text("T", "Title", "Hello")],
        )]);

        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["artboards"][0]["children"][0]["componentKey"], "button/primary");
        let back: Document = serde_json::from_value(value).unwrap();
        assert_eq!(back, doc);
    }

    #[test]
    fn field_names_match_the_wire_format() {
        let mut node = Node::component("C", "Button", "button/primary", Map::new());
        node.visible = Some(false);
        node.style = Some(Style::default());
        node.layout = Some(Layout::new(LayoutMode::Vertical));
        node.children = Some(Vec::new());
        node.text = Some(String::new());
        node.text_style = Some(TextStyle::default());
        node.src = Some(String::new());
        let value = serde_json::to_value(&node).unwrap();
        let mut keys: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
        keys.sort_unstable();
        let mut fields = Node::FIELDS.to_vec();
        fields.sort_unstable();
        assert_eq!(keys, fields);
    }

    #[test]
    fn missing_id_deserializes_as_empty() {
        let node: Node = serde_json::from_str(r#"{"type":"group","name":"g"}"#).unwrap();
        assert!(node.id.is_empty());
        assert!(node.is_visible());
    }

    #[test]
    fn well_formed_ids() {
        assert!(NodeId::new("01HZY0000000000000000000AB").is_well_formed());
        assert!(!NodeId::new("01HZY0000000000000000000ab").is_well_formed());
        assert!(!NodeId::new("short").is_well_formed());
        // I, L, O and U are excluded from Crockford base-32.
        assert!(!NodeId::new("01HZY000000000000000000ILO").is_well_formed());
    }
}
