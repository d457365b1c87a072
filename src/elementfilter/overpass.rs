//! Renders a parsed filter as the body of an Overpass QL query.

use super::boolean_expression::BooleanExpression;
use super::expression::{ElementFilterExpression, ElementTypeSet};
use super::filters::ElementFilter;
use crate::mapdata::ElementType;

/// Builds the Overpass statements for one [`ElementFilterExpression`].
///
/// AND chains of plain tag filters collapse into a single statement. OR
/// groups render each branch into a named set and union them. Mixed trees
/// pipe intermediate results through working sets. Set ids are assigned in
/// render order, so output is deterministic for a given filter.
pub struct OverpassQueryCreator<'a> {
    expression: &'a ElementFilterExpression,
    set_id_counter: usize,
}

impl<'a> OverpassQueryCreator<'a> {
    pub fn new(expression: &'a ElementFilterExpression) -> Self {
        OverpassQueryCreator {
            expression,
            set_id_counter: 1,
        }
    }

    pub fn create(mut self) -> String {
        let names = oql_names(self.expression.element_types());
        let expr = self.expression.expr();

        if names.len() == 1 {
            let name = names[0];
            return match expr {
                None => format!("{name};\n"),
                Some(expr) => self.render(expr, name, None, None),
            };
        }

        match expr {
            None => {
                let stmts = names
                    .iter()
                    .map(|n| format!("{n};"))
                    .collect::<Vec<_>>()
                    .join(" ");
                format!("({stmts});\n")
            }
            Some(expr) => {
                let result_set_id = self.next_set_id();
                let mut out = String::new();
                for name in &names {
                    // every type renders the same tree in the same order, so
                    // restarting the counter reproduces identical numbering
                    self.set_id_counter = result_set_id + 1;
                    out.push_str(&self.render(expr, name, None, Some(result_set_id)));
                }
                let union = names
                    .iter()
                    .map(|n| format!("{};", set_id(n, result_set_id)))
                    .collect::<Vec<_>>()
                    .join(" ");
                out.push_str(&format!("({union});\n"));
                out
            }
        }
    }

    fn render(
        &mut self,
        expr: &BooleanExpression<ElementFilter>,
        element_type: &str,
        input_set: Option<usize>,
        result_set: Option<usize>,
    ) -> String {
        match expr {
            BooleanExpression::Leaf(filter) => {
                self.leaf_statement(&[filter], element_type, input_set, result_set)
            }
            BooleanExpression::All(children) => {
                self.render_all(children, element_type, input_set, result_set)
            }
            BooleanExpression::Any(children) => {
                self.render_any(children, element_type, input_set, result_set)
            }
        }
    }

    fn render_all(
        &mut self,
        children: &[BooleanExpression<ElementFilter>],
        element_type: &str,
        input_set: Option<usize>,
        result_set: Option<usize>,
    ) -> String {
        let chunks = merge_consecutive_leaves(children);

        // a chain of plain tag filters fits into one statement; anything more
        // needs a working set to pipe intermediate results through
        let working_set = if chunks.len() > 1 {
            Some(self.next_set_id())
        } else {
            None
        };

        let mut out = String::new();
        let last = chunks.len() - 1;
        for (i, chunk) in chunks.iter().enumerate() {
            let stmt_input = if i == 0 { input_set } else { working_set };
            let stmt_result = if i == last { result_set } else { working_set };
            match chunk {
                Chunk::Filters(filters) => out.push_str(&self.leaf_statement(
                    filters,
                    element_type,
                    stmt_input,
                    stmt_result,
                )),
                Chunk::Compound(child) => {
                    out.push_str(&self.render(child, element_type, stmt_input, stmt_result))
                }
            }
        }
        out
    }

    fn render_any(
        &mut self,
        children: &[BooleanExpression<ElementFilter>],
        element_type: &str,
        input_set: Option<usize>,
        result_set: Option<usize>,
    ) -> String {
        let mut out = String::new();
        let mut branch_sets = Vec::with_capacity(children.len());
        for child in children {
            let branch_set = self.next_set_id();
            out.push_str(&self.render(child, element_type, input_set, Some(branch_set)));
            branch_sets.push(branch_set);
        }
        let union = branch_sets
            .iter()
            .map(|&id| format!("{};", set_id(element_type, id)))
            .collect::<Vec<_>>()
            .join(" ");
        let result = result_set
            .map(|id| format!(" -> {}", set_id(element_type, id)))
            .unwrap_or_default();
        out.push_str(&format!("({union}){result};\n"));
        out
    }

    fn leaf_statement(
        &mut self,
        filters: &[&ElementFilter],
        element_type: &str,
        input_set: Option<usize>,
        result_set: Option<usize>,
    ) -> String {
        let input = input_set
            .map(|id| set_id(element_type, id))
            .unwrap_or_default();
        let fragments = filters
            .iter()
            .map(|f| f.to_overpass_ql_string())
            .collect::<String>();
        let result = result_set
            .map(|id| format!(" -> {}", set_id(element_type, id)))
            .unwrap_or_default();
        format!("{element_type}{input}{fragments}{result};\n")
    }

    fn next_set_id(&mut self) -> usize {
        let id = self.set_id_counter;
        self.set_id_counter += 1;
        id
    }
}

enum Chunk<'a> {
    /// One or more tag filters that collapse into a single statement.
    Filters(Vec<&'a ElementFilter>),
    /// A nested OR group that needs its own statements.
    Compound(&'a BooleanExpression<ElementFilter>),
}

fn merge_consecutive_leaves(children: &[BooleanExpression<ElementFilter>]) -> Vec<Chunk<'_>> {
    let mut chunks = Vec::new();
    let mut run: Vec<&ElementFilter> = Vec::new();
    for child in children {
        match child {
            BooleanExpression::Leaf(filter) => run.push(filter),
            compound => {
                if !run.is_empty() {
                    chunks.push(Chunk::Filters(std::mem::take(&mut run)));
                }
                chunks.push(Chunk::Compound(compound));
            }
        }
    }
    if !run.is_empty() {
        chunks.push(Chunk::Filters(run));
    }
    chunks
}

/// The shortest selector names covering the requested types. `nwr`, `nw` and
/// `wr` exist as combined selectors; node + relation is the one combination
/// that needs two.
fn oql_names(types: ElementTypeSet) -> Vec<&'static str> {
    let (n, w, r) = (
        types.contains(ElementType::Node),
        types.contains(ElementType::Way),
        types.contains(ElementType::Relation),
    );
    match (n, w, r) {
        (true, true, true) => vec!["nwr"],
        (true, true, false) => vec!["nw"],
        (false, true, true) => vec!["wr"],
        _ => {
            let mut names = Vec::new();
            if n {
                names.push("node");
            }
            if w {
                names.push("way");
            }
            if r {
                names.push("rel");
            }
            names
        }
    }
}

fn set_id(element_type: &str, id: usize) -> String {
    let prefix = match element_type {
        "node" => "n",
        "way" => "w",
        "rel" => "r",
        _ => "e",
    };
    format!(".{prefix}{id}")
}
