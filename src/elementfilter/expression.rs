//! The top level of a parsed filter: which element types, plus an optional
//! tag condition tree.

use std::fmt;

use super::boolean_expression::{BooleanExpression, Matcher};
use super::filters::ElementFilter;
use super::overpass::OverpassQueryCreator;
use crate::mapdata::{Element, ElementType};

/// The set of element types a filter applies to. Never empty after parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementTypeSet {
    nodes: bool,
    ways: bool,
    relations: bool,
}

impl ElementTypeSet {
    pub fn empty() -> Self {
        ElementTypeSet {
            nodes: false,
            ways: false,
            relations: false,
        }
    }

    /// Returns false if the type was already present.
    pub fn insert(&mut self, element_type: ElementType) -> bool {
        let slot = match element_type {
            ElementType::Node => &mut self.nodes,
            ElementType::Way => &mut self.ways,
            ElementType::Relation => &mut self.relations,
        };
        let newly_added = !*slot;
        *slot = true;
        newly_added
    }

    pub fn contains(&self, element_type: ElementType) -> bool {
        match element_type {
            ElementType::Node => self.nodes,
            ElementType::Way => self.ways,
            ElementType::Relation => self.relations,
        }
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        !self.nodes && !self.ways && !self.relations
    }

    /// Iterates in the fixed order node, way, relation regardless of
    /// insertion order, so output built from the set is deterministic.
    pub fn iter(&self) -> impl Iterator<Item = ElementType> + '_ {
        [
            (self.nodes, ElementType::Node),
            (self.ways, ElementType::Way),
            (self.relations, ElementType::Relation),
        ]
        .into_iter()
        .filter_map(|(present, t)| present.then_some(t))
    }
}

/// A complete element filter: the result of parsing a filter string.
#[derive(Debug, Clone)]
pub struct ElementFilterExpression {
    element_types: ElementTypeSet,
    expr: Option<BooleanExpression<ElementFilter>>,
}

impl ElementFilterExpression {
    pub fn new(
        element_types: ElementTypeSet,
        expr: Option<BooleanExpression<ElementFilter>>,
    ) -> Self {
        ElementFilterExpression {
            element_types,
            expr,
        }
    }

    pub fn element_types(&self) -> ElementTypeSet {
        self.element_types
    }

    pub fn expr(&self) -> Option<&BooleanExpression<ElementFilter>> {
        self.expr.as_ref()
    }

    /// Whether the element is of a type this filter applies to and fulfills
    /// the tag condition (if any).
    pub fn matches(&self, element: &Element) -> bool {
        self.element_types.contains(element.element_type)
            && self.expr.as_ref().is_none_or(|e| e.matches(element))
    }

    /// Renders the filter as the body of an Overpass QL query.
    pub fn to_overpass_ql_string(&self) -> String {
        OverpassQueryCreator::new(self).create()
    }
}

impl fmt::Display for ElementFilterExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let types = self
            .element_types
            .iter()
            .map(ElementType::keyword)
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "{types}")?;
        if let Some(expr) = &self.expr {
            write!(f, " with {expr}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn types(list: &[ElementType]) -> ElementTypeSet {
        let mut set = ElementTypeSet::empty();
        for &t in list {
            set.insert(t);
        }
        set
    }

    fn element_of(element_type: ElementType) -> Element {
        Element {
            id: 1,
            element_type,
            tags: HashMap::new(),
            edited_at: None,
        }
    }

    #[test]
    fn insert_reports_duplicates() {
        let mut set = ElementTypeSet::empty();
        assert!(set.is_empty());
        assert!(set.insert(ElementType::Node));
        assert!(!set.insert(ElementType::Node));
        assert!(set.insert(ElementType::Way));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn iteration_order_is_fixed() {
        let mut set = ElementTypeSet::empty();
        set.insert(ElementType::Relation);
        set.insert(ElementType::Node);
        assert_eq!(
            set.iter().collect::<Vec<_>>(),
            vec![ElementType::Node, ElementType::Relation]
        );
    }

    #[test]
    fn type_gating() {
        use ElementType::*;
        let cases: &[(&[ElementType], [bool; 3])] = &[
            (&[Node], [true, false, false]),
            (&[Way], [false, true, false]),
            (&[Relation], [false, false, true]),
            (&[Node, Way], [true, true, false]),
            (&[Node, Relation], [true, false, true]),
            (&[Way, Relation], [false, true, true]),
            (&[Node, Way, Relation], [true, true, true]),
        ];
        for (list, expected) in cases {
            let expr = ElementFilterExpression::new(types(list), None);
            assert_eq!(expr.matches(&element_of(Node)), expected[0], "{list:?}");
            assert_eq!(expr.matches(&element_of(Way)), expected[1], "{list:?}");
            assert_eq!(
                expr.matches(&element_of(Relation)),
                expected[2],
                "{list:?}"
            );
        }
    }

    #[test]
    fn no_tag_condition_matches_everything_of_the_type() {
        let expr = ElementFilterExpression::new(types(&[ElementType::Node]), None);
        let mut el = element_of(ElementType::Node);
        el.tags.insert("anything".into(), "goes".into());
        assert!(expr.matches(&el));
    }

    #[test]
    fn expressions_are_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ElementFilterExpression>();
    }

    #[test]
    fn display_round_trip_text() {
        let expr = ElementFilterExpression::new(types(&[ElementType::Node]), None);
        assert_eq!(expr.to_string(), "nodes");

        let expr = ElementFilterExpression::new(
            types(&[ElementType::Node, ElementType::Way]),
            Some(BooleanExpression::Leaf(ElementFilter::HasKey(
                "highway".into(),
            ))),
        );
        assert_eq!(expr.to_string(), "nodes, ways with highway");
    }
}
