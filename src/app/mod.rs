use anyhow::{Context, Result, bail};
use clap::Parser;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::elementfilter::{ElementFilterExpression, to_check_date};
use crate::mapdata::{Element, ElementType};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Filter expression, e.g. "nodes, ways with highway and !name"
    #[arg(short, long, conflicts_with = "filter_file")]
    pub filter: Option<String>,

    /// Read the filter expression from a file instead
    #[arg(long)]
    pub filter_file: Option<PathBuf>,

    /// JSON file with elements to run the filter against
    #[arg(short, long)]
    pub elements: Option<PathBuf>,

    /// Print the filter as an Overpass QL query body and exit
    #[arg(long)]
    pub overpass: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

pub fn load_filter_text(cli: &Cli) -> Result<String> {
    if let Some(filter) = &cli.filter {
        return Ok(filter.clone());
    }
    if let Some(path) = &cli.filter_file {
        return std::fs::read_to_string(path)
            .with_context(|| format!("CLI: Failed to read filter file {path:?}"));
    }
    bail!("CLI: No filter given; use --filter or --filter-file")
}

/// On-disk element format. Tags default to empty; the timestamp is either
/// RFC 3339 or a plain date.
#[derive(Deserialize)]
struct RawElement {
    #[serde(rename = "type")]
    element_type: String,
    id: i64,
    #[serde(default)]
    tags: HashMap<String, String>,
    timestamp: Option<String>,
}

fn parse_timestamp(value: &str) -> Result<OffsetDateTime> {
    if let Ok(ts) = OffsetDateTime::parse(value, &Rfc3339) {
        return Ok(ts);
    }
    to_check_date(value)
        .with_context(|| format!("Expected an RFC 3339 timestamp or YYYY-MM-DD, got '{value}'"))
}

pub fn load_elements(path: &Path) -> Result<Vec<Element>> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("CLI: Failed to read elements file {path:?}"))?;
    let raw: Vec<RawElement> = serde_json::from_str(&data)
        .with_context(|| format!("CLI: Failed to parse elements file {path:?}"))?;

    raw.into_iter()
        .map(|el| {
            let element_type = match el.element_type.as_str() {
                "node" => ElementType::Node,
                "way" => ElementType::Way,
                "relation" => ElementType::Relation,
                other => bail!(
                    "Element {}: unknown type '{}', expected node, way or relation",
                    el.id,
                    other
                ),
            };
            let edited_at = el
                .timestamp
                .as_deref()
                .map(parse_timestamp)
                .transpose()
                .with_context(|| format!("Element {}: bad timestamp", el.id))?;
            Ok(Element {
                id: el.id,
                element_type,
                tags: el.tags,
                edited_at,
            })
        })
        .collect()
}

pub fn evaluate<'a>(
    expr: &ElementFilterExpression,
    elements: &'a [Element],
) -> Vec<&'a Element> {
    elements.iter().filter(|el| expr.matches(el)).collect()
}

pub fn element_ref(element: &Element) -> String {
    let type_name = match element.element_type {
        ElementType::Node => "node",
        ElementType::Way => "way",
        ElementType::Relation => "relation",
    };
    format!("{type_name}/{}", element.id)
}
