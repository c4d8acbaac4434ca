//! Structured conflict model.
//!
//! Each [`Conflict`] records exactly one rule firing for one node. Rules are a
//! closed set ([`ConflictCode`]) so strategy tables and application logic are
//! exhaustive `match`es rather than string lookups.
//!
//! | Code | Category | Severity | Fires when |
//! |------|----------|----------|------------|
//! | `S-DEL-MOD` | structural | error | one side deleted, the other kept the node |
//! | `S-ADD-ADD` | structural | warning | both sides added the same identity |
//! | `S-MOVE-MOVE` | structural | warning | both sides moved a frame to different parents |
//! | `S-ORDER` | structural | info | both sides reordered the same siblings differently |
//! | `P-GEOMETRY` | property | warning | frame rectangle diverged |
//! | `P-VISIBILITY` | property | info | visibility diverged |
//! | `P-LAYOUT` | property | warning | layout configuration diverged |
//! | `P-STYLE` | property | warning | a style property diverged |
//! | `C-TEXT` | content | warning | text content diverged |
//! | `C-COMPONENT-PROPS` | content | warning | instance properties diverged |
//! | `M-NAME` | metadata | info | node name diverged |
//!
//! Conflicts serialise as camelCase JSON with the code as its short string:
//!
//! ```json
//! {
//!   "nodeId": "01HZY0000000000000000000AC",
//!   "category": "property",
//!   "code": "P-GEOMETRY",
//!   "severity": "warning",
//!   "path": [0, "children", 0, "frame"],
//!   "autoResolvable": false,
//!   "base":   { "kind": "frame", "value": { "x": 0, "y": 0, "width": 10, "height": 10 } },
//!   "local":  { "kind": "frame", "value": { "x": 5, "y": 0, "width": 10, "height": 10 } },
//!   "remote": { "kind": "frame", "value": { "x": 9, "y": 0, "width": 10, "height": 10 } },
//!   "message": "geometry of \"Card\" (01HZY0000000000000000000AC) changed differently on both sides"
//! }
//! ```

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::document::{Layout, Node, NodeId, Paint, Rect, Shadow, Stroke};
use super::path::NodePath;

// ---------------------------------------------------------------------------
// Category / Severity
// ---------------------------------------------------------------------------

/// Detection pass that produced a conflict.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Structural,
    Property,
    Content,
    Metadata,
}

/// How serious a conflict is. Declaration order is the sort order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        })
    }
}

// ---------------------------------------------------------------------------
// ConflictCode
// ---------------------------------------------------------------------------

/// The exact detection rule that fired.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ConflictCode {
    #[serde(rename = "S-DEL-MOD")]
    DeleteModify,
    #[serde(rename = "S-ADD-ADD")]
    AddAdd,
    #[serde(rename = "S-MOVE-MOVE")]
    MoveMove,
    #[serde(rename = "S-ORDER")]
    Order,
    #[serde(rename = "P-GEOMETRY")]
    Geometry,
    #[serde(rename = "P-VISIBILITY")]
    Visibility,
    #[serde(rename = "P-LAYOUT")]
    Layout,
    #[serde(rename = "P-STYLE")]
    Style,
    #[serde(rename = "C-TEXT")]
    Text,
    #[serde(rename = "C-COMPONENT-PROPS")]
    ComponentProps,
    #[serde(rename = "M-NAME")]
    Name,
}

impl ConflictCode {
    /// Every code, in declaration order.
    pub const ALL: [Self; 11] = [
        Self::DeleteModify,
        Self::AddAdd,
        Self::MoveMove,
        Self::Order,
        Self::Geometry,
        Self::Visibility,
        Self::Layout,
        Self::Style,
        Self::Text,
        Self::ComponentProps,
        Self::Name,
    ];

    /// Short wire form, e.g. `"S-DEL-MOD"`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DeleteModify => "S-DEL-MOD",
            Self::AddAdd => "S-ADD-ADD",
            Self::MoveMove => "S-MOVE-MOVE",
            Self::Order => "S-ORDER",
            Self::Geometry => "P-GEOMETRY",
            Self::Visibility => "P-VISIBILITY",
            Self::Layout => "P-LAYOUT",
            Self::Style => "P-STYLE",
            Self::Text => "C-TEXT",
            Self::ComponentProps => "C-COMPONENT-PROPS",
            Self::Name => "M-NAME",
        }
    }

    #[must_use]
    pub const fn category(self) -> Category {
        match self {
            Self::DeleteModify | Self::AddAdd | Self::MoveMove | Self::Order => Category::Structural,
            Self::Geometry | Self::Visibility | Self::Layout | Self::Style => Category::Property,
            Self::Text | Self::ComponentProps => Category::Content,
            Self::Name => Category::Metadata,
        }
    }

    #[must_use]
    pub const fn severity(self) -> Severity {
        match self {
            Self::DeleteModify => Severity::Error,
            Self::AddAdd
            | Self::MoveMove
            | Self::Geometry
            | Self::Layout
            | Self::Style
            | Self::Text
            | Self::ComponentProps => Severity::Warning,
            Self::Order | Self::Visibility | Self::Name => Severity::Info,
        }
    }

    /// Strategy hint attached to conflicts of this code, if any.
    #[must_use]
    pub const fn suggested_strategy(self) -> Option<StrategyKind> {
        match self {
            Self::Order => Some(StrategyKind::PreferLocal),
            Self::Name => Some(StrategyKind::PreferRemote),
            _ => None,
        }
    }

    /// Conflicts whose suggested strategy may be applied without review.
    #[must_use]
    pub const fn auto_resolvable(self) -> bool {
        self.suggested_strategy().is_some()
    }
}

impl fmt::Display for ConflictCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Error returned when a conflict code or strategy name is not recognised.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} `{value}`")]
pub struct UnknownName {
    pub kind: &'static str,
    pub value: String,
}

impl FromStr for ConflictCode {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|code| code.as_str() == s)
            .ok_or_else(|| UnknownName {
                kind: "conflict code",
                value: s.to_owned(),
            })
    }
}

// ---------------------------------------------------------------------------
// StrategyKind
// ---------------------------------------------------------------------------

/// Names of resolution strategies, as used in configuration and reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    PreferLocal,
    PreferRemote,
    PreferBase,
    Average,
    Merge,
    Manual,
}

impl StrategyKind {
    pub const ALL: [Self; 6] = [
        Self::PreferLocal,
        Self::PreferRemote,
        Self::PreferBase,
        Self::Average,
        Self::Merge,
        Self::Manual,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PreferLocal => "prefer-local",
            Self::PreferRemote => "prefer-remote",
            Self::PreferBase => "prefer-base",
            Self::Average => "average",
            Self::Merge => "merge",
            Self::Manual => "manual",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownName {
                kind: "strategy",
                value: s.to_owned(),
            })
    }
}

// ---------------------------------------------------------------------------
// ConflictValue
// ---------------------------------------------------------------------------

/// Typed payload of one side of a conflict.
///
/// The variant is fixed by the conflict code: `S-ORDER` always carries
/// [`ConflictValue::Order`], `P-GEOMETRY` always [`ConflictValue::Frame`], and
/// so on. `P-STYLE` picks the variant of the style property that diverged.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ConflictValue {
    /// Whole node (`S-DEL-MOD`, `S-ADD-ADD`).
    Node(Box<Node>),
    /// Parent identity (`S-MOVE-MOVE`); absent at the conflict level for roots.
    Parent(NodeId),
    /// Sibling order as identities (`S-ORDER`).
    Order(Vec<NodeId>),
    Frame(Rect),
    Visible(bool),
    Layout(Layout),
    Fills(Vec<Paint>),
    Strokes(Vec<Stroke>),
    Opacity(f64),
    Shadow(Shadow),
    Text(String),
    Props(Map<String, Value>),
    Name(String),
}

impl ConflictValue {
    /// JSON form of the payload, as written into a document.
    ///
    /// # Errors
    /// Returns the serializer's error if a payload cannot be represented.
    pub fn to_json(&self) -> Result<Value, serde_json::Error> {
        match self {
            Self::Node(node) => serde_json::to_value(node),
            Self::Parent(id) => serde_json::to_value(id),
            Self::Order(ids) => serde_json::to_value(ids),
            Self::Frame(rect) => serde_json::to_value(rect),
            Self::Visible(v) => Ok(Value::Bool(*v)),
            Self::Layout(layout) => serde_json::to_value(layout),
            Self::Fills(fills) => serde_json::to_value(fills),
            Self::Strokes(strokes) => serde_json::to_value(strokes),
            Self::Opacity(o) => serde_json::to_value(o),
            Self::Shadow(shadow) => serde_json::to_value(shadow),
            Self::Text(text) => Ok(Value::String(text.clone())),
            Self::Props(props) => Ok(Value::Object(props.clone())),
            Self::Name(name) => Ok(Value::String(name.clone())),
        }
    }
}

// ---------------------------------------------------------------------------
// Conflict
// ---------------------------------------------------------------------------

/// One detected divergence between base, local and remote.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conflict {
    /// The node the conflict is about (the parent for `S-ORDER`).
    pub node_id: NodeId,
    pub category: Category,
    pub code: ConflictCode,
    pub severity: Severity,
    /// Where the conflict lives, in at least one of the three documents.
    pub path: NodePath,
    pub auto_resolvable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_strategy: Option<StrategyKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<ConflictValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local: Option<ConflictValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote: Option<ConflictValue>,
    pub message: String,
}

impl Conflict {
    /// A conflict for `code` with category, severity and hints taken from the code.
    pub fn new(code: ConflictCode, node_id: NodeId, path: NodePath, message: impl Into<String>) -> Self {
        Self {
            node_id,
            category: code.category(),
            code,
            severity: code.severity(),
            path,
            auto_resolvable: code.auto_resolvable(),
            suggested_strategy: code.suggested_strategy(),
            base: None,
            local: None,
            remote: None,
            message: message.into(),
        }
    }

    /// Attach the three sides' payloads.
    #[must_use]
    pub fn with_values(
        mut self,
        base: Option<ConflictValue>,
        local: Option<ConflictValue>,
        remote: Option<ConflictValue>,
    ) -> Self {
        self.base = base;
        self.local = local;
        self.remote = remote;
        self
    }

    /// Deterministic report order: severity, then path, then code, then node.
    #[must_use]
    pub fn report_order(&self, other: &Self) -> Ordering {
        self.severity
            .cmp(&other.severity)
            .then_with(|| self.path.cmp(&other.path))
            .then_with(|| self.code.as_str().cmp(other.code.as_str()))
            .then_with(|| self.node_id.cmp(&other.node_id))
    }
}

#[cfg(test)]
#[allow(clippy::all, clippy::pedantic, clippy::nursery)]
mod tests {
    use super::*;

    #[test]
    fn codes_roundtrip_through_strings() {
        for code in ConflictCode::ALL {
            assert_eq!(code.as_str().parse::<ConflictCode>().unwrap(), code);
            let json = serde_json::to_value(code).unwrap();
            assert_eq!(json, code.as_str());
        }
        assert!("S-NOPE".parse::<ConflictCode>().is_err());
    }

    #[test]
    fn strategies_roundtrip_through_strings() {
        for kind in StrategyKind::ALL {
            assert_eq!(kind.as_str().parse::<StrategyKind>().unwrap(), kind);
            assert_eq!(serde_json::to_value(kind).unwrap(), kind.as_str());
        }
    }

    #[test]
    fn hints_follow_code() {
        let order = Conflict::new(ConflictCode::Order, "P".into(), NodePath::artboard(0).children(), "");
        assert_eq!(order.category, Category::Structural);
        assert_eq!(order.severity, Severity::Info);
        assert!(order.auto_resolvable);
        assert_eq!(order.suggested_strategy, Some(StrategyKind::PreferLocal));

        let name = Conflict::new(ConflictCode::Name, "N".into(), NodePath::artboard(0), "");
        assert_eq!(name.suggested_strategy, Some(StrategyKind::PreferRemote));

        let del = Conflict::new(ConflictCode::DeleteModify, "N".into(), NodePath::artboard(0), "");
        assert_eq!(del.severity, Severity::Error);
        assert!(!del.auto_resolvable);
    }

    #[test]
    fn report_order_is_severity_then_path_then_code() {
        let info = Conflict::new(ConflictCode::Name, "A".into(), NodePath::artboard(0), "");
        let warn_late = Conflict::new(ConflictCode::Geometry, "B".into(), NodePath::artboard(1), "");
        let warn_early = Conflict::new(ConflictCode::Text, "C".into(), NodePath::artboard(0), "");
        let error = Conflict::new(ConflictCode::DeleteModify, "D".into(), NodePath::artboard(3), "");

        let mut all = vec![info, warn_late, warn_early, error];
        all.sort_by(Conflict::report_order);
        let codes: Vec<_> = all.iter().map(|c| c.code).collect();
        assert_eq!(
            codes,
            vec![ConflictCode::DeleteModify, ConflictCode::Text, ConflictCode::Geometry, ConflictCode::Name]
        );
    }

    #[test]
    fn payload_serializes_with_kind_tag() {
        let value = ConflictValue::Order(vec!["A".into(), "B".into()]);
        let json = serde_json::to_value(&value).unwrap();
        assert_eq!(json, serde_json::json!({ "kind": "order", "value": ["A", "B"] }));
        assert_eq!(value.to_json().unwrap(), serde_json::json!(["A", "B"]));
    }

    #[test]
    fn payloads_convert_to_document_json() {
        use crate::model::document::{Paint, Rect};

        let frame = ConflictValue::Frame(Rect::new(1.0, 2.0, 3.0, 4.0));
        assert_eq!(
            frame.to_json().unwrap(),
            serde_json::json!({ "x": 1.0, "y": 2.0, "width": 3.0, "height": 4.0 })
        );
        let fills = ConflictValue::Fills(vec![Paint::solid("#fff")]);
        assert_eq!(
            fills.to_json().unwrap(),
            serde_json::json!([{ "type": "solid", "color": "#fff" }])
        );
        assert_eq!(ConflictValue::Visible(false).to_json().unwrap(), Value::Bool(false));
    }
}
