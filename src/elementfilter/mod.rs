//! Parsing and evaluation of element filters.
//!
//! A filter string names the element types it applies to, optionally followed
//! by `with` and a boolean combination of tag conditions:
//!
//! ```text
//! nodes, ways with (highway = residential or highway = tertiary) and !name
//! ```
//!
//! Supported tag conditions:
//!
//! - `key` / `!key`: the key exists / does not exist
//! - `key = value` / `key != value`: exact value comparison
//! - `key ~ regex` / `key !~ regex`: value regex, anchored to the whole value
//! - `~regex` / `!~regex`: key regex; `~kregex ~ vregex` matches both
//! - `key > 3.5`, `key >= 2` etc.: numeric value comparison
//! - `key < 2020-01-01`: date value comparison, `YYYY-MM-DD` or `YYYY-MM`
//! - `older <date>` / `newer <date>`: element edit age; dates may be relative
//!   (`today - 8 years`)
//! - `key older <date>`: the key's last survey age, taking `check_date`-style
//!   companion tags into account
//!
//! `and` binds tighter than `or`; brackets group. Keys and values with
//! special characters go in single or double quotes.
//!
//! Parsed filters evaluate in-memory elements and serialize to Overpass QL.

mod boolean_expression;
mod expression;
mod filters;
mod lexer;
mod overpass;
mod parser;

pub use boolean_expression::{
    BooleanExpression, BooleanExpressionBuilder, BuildError, Matcher,
};
pub use expression::{ElementFilterExpression, ElementTypeSet};
pub use filters::{
    AnchoredPattern, CompareOp, DateFilter, ElementFilter, RelativeDate, to_check_date,
    to_check_date_string,
};
pub use parser::{ParseError, parse_element_filter_expression};
