//! Data model: documents, paths into them, and detected conflicts.

pub mod conflict;
pub mod document;
pub mod path;

pub use conflict::{Category, Conflict, ConflictCode, ConflictValue, Severity, StrategyKind, UnknownName};
pub use document::{
    Document, Layout, LayoutMode, NODE_ID_LEN, Node, NodeId, NodeType, Padding, Paint, PaintKind, Rect, Shadow,
    Stroke, StrokeAlign, Style, TextAlign, TextStyle,
};
pub use path::{NodePath, PathSegment};
