//! The slice of the OSM data model the filter engine consumes.

use std::collections::HashMap;
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementType {
    Node,
    Way,
    Relation,
}

impl ElementType {
    /// The plural keyword used in filter syntax ("nodes, ways with ...").
    pub fn keyword(self) -> &'static str {
        match self {
            ElementType::Node => "nodes",
            ElementType::Way => "ways",
            ElementType::Relation => "relations",
        }
    }
}

/// A map element as seen by the filter engine: a type, a tag map and an
/// optional edit timestamp. The engine never mutates elements.
#[derive(Debug, Clone)]
pub struct Element {
    pub id: i64,
    pub element_type: ElementType,
    pub tags: HashMap<String, String>,
    pub edited_at: Option<OffsetDateTime>,
}
