//! Leaf predicates over a single tag, plus their Overpass QL fragments.

use regex::Regex;
use std::fmt;
use std::sync::{Arc, LazyLock};
use time::{Date, Duration, Month, OffsetDateTime};

use super::boolean_expression::Matcher;
use crate::mapdata::Element;

/// Check dates are `yyyy-mm-dd`; the day part is optional so that a plain
/// `2000-11` is understood as well.
static CHECK_DATE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("^([0-9]{4})-([0-9]{2})(?:-([0-9]{2}))?$").unwrap());

static QUOTES_NOT_REQUIRED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("^[a-zA-Z_][a-zA-Z0-9_]*$").unwrap());

/// Parses a check-date tag value. Returns `None` for anything unparsable;
/// evaluation treats that as "no match", never as an error.
pub fn to_check_date(value: &str) -> Option<OffsetDateTime> {
    let caps = CHECK_DATE_REGEX.captures(value)?;
    let year: i32 = caps[1].parse().ok()?;
    let month: u8 = caps[2].parse().ok()?;
    let day: u8 = match caps.get(3) {
        Some(m) => m.as_str().parse().ok()?,
        None => 1,
    };
    let date = Date::from_calendar_date(year, Month::try_from(month).ok()?, day).ok()?;
    Some(date.midnight().assume_utc())
}

pub fn to_check_date_string(date: OffsetDateTime) -> String {
    format!(
        "{:04}-{:02}-{:02}",
        date.year(),
        u8::from(date.month()),
        date.day()
    )
}

/// All keys under which the last survey date of `key` may be recorded.
pub fn last_check_date_keys(key: &str) -> [String; 6] {
    [
        format!("{key}:check_date"),
        format!("check_date:{key}"),
        format!("{key}:lastcheck"),
        format!("lastcheck:{key}"),
        format!("{key}:last_checked"),
        format!("last_checked:{key}"),
    ]
}

fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'"))
}

fn quote_if_necessary(s: &str) -> String {
    if QUOTES_NOT_REQUIRED.is_match(s) {
        s.to_string()
    } else {
        quote(s)
    }
}

/// Quoting for filter-syntax output. The lexer has no escape sequences, so a
/// string is quoted with whichever quote character it does not contain.
/// Reserved words must be quoted to parse as keys again.
fn dsl_quote_if_necessary(s: &str) -> String {
    let reserved = matches!(s, "with" | "and" | "or");
    if QUOTES_NOT_REQUIRED.is_match(s) && !reserved {
        s.to_string()
    } else if !s.contains('\'') {
        format!("'{s}'")
    } else {
        format!("\"{s}\"")
    }
}

fn format_number(value: f32) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

fn age_word(op: CompareOp) -> &'static str {
    match op {
        CompareOp::Greater | CompareOp::GreaterOrEqual => "newer",
        _ => "older",
    }
}

/// A regex compiled once at construction, anchored to the whole value.
#[derive(Debug, Clone)]
pub struct AnchoredPattern {
    pattern: String,
    regex: Regex,
}

impl AnchoredPattern {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(AnchoredPattern {
            pattern: pattern.to_string(),
            regex: Regex::new(&format!("^({pattern})$"))?,
        })
    }

    pub fn is_match(&self, value: &str) -> bool {
        self.regex.is_match(value)
    }

    fn to_overpass_ql_string(&self) -> String {
        quote_if_necessary(&format!("^({})$", self.pattern))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Greater,
    GreaterOrEqual,
    Less,
    LessOrEqual,
}

impl CompareOp {
    fn compare<T: PartialOrd>(self, value: T, reference: T) -> bool {
        match self {
            CompareOp::Greater => value > reference,
            CompareOp::GreaterOrEqual => value >= reference,
            CompareOp::Less => value < reference,
            CompareOp::LessOrEqual => value <= reference,
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompareOp::Greater => write!(f, ">"),
            CompareOp::GreaterOrEqual => write!(f, ">="),
            CompareOp::Less => write!(f, "<"),
            CompareOp::LessOrEqual => write!(f, "<="),
        }
    }
}

pub type Clock = Arc<dyn Fn() -> OffsetDateTime + Send + Sync>;

/// A date relative to now (positive delta: future, negative: past).
///
/// The date is resolved against the clock on every access, not cached, so a
/// long-lived filter stays correct across day boundaries. Tests inject a
/// fixed clock; production uses UTC now.
#[derive(Clone)]
pub struct RelativeDate {
    delta_days: f32,
    clock: Clock,
}

impl RelativeDate {
    pub fn new(delta_days: f32) -> Self {
        Self::with_clock(delta_days, Arc::new(OffsetDateTime::now_utc))
    }

    pub fn with_clock(delta_days: f32, clock: Clock) -> Self {
        RelativeDate { delta_days, clock }
    }

    pub fn date(&self) -> OffsetDateTime {
        // widen before multiplying; f32 seconds lose whole minutes on
        // multi-year deltas
        let seconds = f64::from(self.delta_days) * 86_400.0;
        (self.clock)() + Duration::seconds(seconds as i64)
    }
}

impl fmt::Debug for RelativeDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelativeDate")
            .field("delta_days", &self.delta_days)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub enum DateFilter {
    Fixed(OffsetDateTime),
    Relative(RelativeDate),
}

impl DateFilter {
    pub fn date(&self) -> OffsetDateTime {
        match self {
            DateFilter::Fixed(date) => *date,
            DateFilter::Relative(relative) => relative.date(),
        }
    }
}

/// An atomic tag-level test. Immutable once constructed; regexes are compiled
/// at construction time, never per match.
#[derive(Debug, Clone)]
pub enum ElementFilter {
    HasKey(String),
    NotHasKey(String),
    HasKeyLike(AnchoredPattern),
    NotHasKeyLike(AnchoredPattern),
    HasTag { key: String, value: String },
    NotHasTag { key: String, value: String },
    HasTagValueLike { key: String, value: AnchoredPattern },
    NotHasTagValueLike { key: String, value: AnchoredPattern },
    HasTagLike { key: AnchoredPattern, value: AnchoredPattern },
    CompareTagValue { key: String, op: CompareOp, value: f32 },
    CompareDateTagValue { key: String, op: CompareOp, date: DateFilter },
    CompareTagAge { key: String, op: CompareOp, date: DateFilter },
    CompareElementAge { op: CompareOp, date: DateFilter },
    CombineFilters(Vec<ElementFilter>),
}

impl ElementFilter {
    pub fn to_overpass_ql_string(&self) -> String {
        match self {
            ElementFilter::HasKey(key) => format!("[{}]", quote_if_necessary(key)),
            ElementFilter::NotHasKey(key) => format!("[!{}]", quote_if_necessary(key)),
            ElementFilter::HasKeyLike(key) => {
                format!("[~{} ~ '.*']", key.to_overpass_ql_string())
            }
            ElementFilter::NotHasKeyLike(key) => {
                format!("[!~{} ~ '.*']", key.to_overpass_ql_string())
            }
            ElementFilter::HasTag { key, value } => format!(
                "[{} = {}]",
                quote_if_necessary(key),
                quote_if_necessary(value)
            ),
            ElementFilter::NotHasTag { key, value } => format!(
                "[{} != {}]",
                quote_if_necessary(key),
                quote_if_necessary(value)
            ),
            ElementFilter::HasTagValueLike { key, value } => format!(
                "[{} ~ {}]",
                quote_if_necessary(key),
                value.to_overpass_ql_string()
            ),
            ElementFilter::NotHasTagValueLike { key, value } => format!(
                "[{} !~ {}]",
                quote_if_necessary(key),
                value.to_overpass_ql_string()
            ),
            ElementFilter::HasTagLike { key, value } => format!(
                "[~{} ~ {}]",
                key.to_overpass_ql_string(),
                value.to_overpass_ql_string()
            ),
            ElementFilter::CompareTagValue { key, op, value } => format!(
                "[{}](if: number(t[{}]) {} {})",
                quote_if_necessary(key),
                quote(key),
                op,
                format_number(*value)
            ),
            ElementFilter::CompareDateTagValue { key, op, date } => format!(
                "[{}](if: date(t[{}]) {} date('{}'))",
                quote_if_necessary(key),
                quote(key),
                op,
                to_check_date_string(date.date())
            ),
            ElementFilter::CompareTagAge { key, op, date } => {
                let date_str = to_check_date_string(date.date());
                let mut operands = vec!["timestamp()".to_string()];
                operands.extend(last_check_date_keys(key).iter().map(|k| format!("t['{k}']")));
                let evaluators = operands
                    .iter()
                    .map(|operand| format!("date({operand}) {op} date('{date_str}')"))
                    .collect::<Vec<_>>()
                    .join(" || ");
                format!("(if: {evaluators})")
            }
            ElementFilter::CompareElementAge { op, date } => format!(
                "(if: date(timestamp()) {} date('{}'))",
                op,
                to_check_date_string(date.date())
            ),
            ElementFilter::CombineFilters(filters) => filters
                .iter()
                .map(|f| f.to_overpass_ql_string())
                .collect::<String>(),
        }
    }
}

/// Filters display in filter syntax, so a serialized expression parses back
/// into an equivalent filter.
impl fmt::Display for ElementFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementFilter::HasKey(key) => write!(f, "{}", dsl_quote_if_necessary(key)),
            ElementFilter::NotHasKey(key) => write!(f, "!{}", dsl_quote_if_necessary(key)),
            ElementFilter::HasKeyLike(key) => {
                write!(f, "~{}", dsl_quote_if_necessary(&key.pattern))
            }
            ElementFilter::NotHasKeyLike(key) => {
                write!(f, "!~{}", dsl_quote_if_necessary(&key.pattern))
            }
            ElementFilter::HasTag { key, value } => write!(
                f,
                "{} = {}",
                dsl_quote_if_necessary(key),
                dsl_quote_if_necessary(value)
            ),
            ElementFilter::NotHasTag { key, value } => write!(
                f,
                "{} != {}",
                dsl_quote_if_necessary(key),
                dsl_quote_if_necessary(value)
            ),
            ElementFilter::HasTagValueLike { key, value } => write!(
                f,
                "{} ~ {}",
                dsl_quote_if_necessary(key),
                dsl_quote_if_necessary(&value.pattern)
            ),
            ElementFilter::NotHasTagValueLike { key, value } => write!(
                f,
                "{} !~ {}",
                dsl_quote_if_necessary(key),
                dsl_quote_if_necessary(&value.pattern)
            ),
            ElementFilter::HasTagLike { key, value } => write!(
                f,
                "~{} ~ {}",
                dsl_quote_if_necessary(&key.pattern),
                dsl_quote_if_necessary(&value.pattern)
            ),
            // numbers and dates lex as single words and must stay unquoted
            ElementFilter::CompareTagValue { key, op, value } => write!(
                f,
                "{} {} {}",
                dsl_quote_if_necessary(key),
                op,
                format_number(*value)
            ),
            ElementFilter::CompareDateTagValue { key, op, date } => {
                write!(f, "{} {} {}", dsl_quote_if_necessary(key), op, date)
            }
            ElementFilter::CompareTagAge { key, op, date } => {
                write!(f, "{} {} {}", dsl_quote_if_necessary(key), age_word(*op), date)
            }
            ElementFilter::CompareElementAge { op, date } => {
                write!(f, "{} {}", age_word(*op), date)
            }
            ElementFilter::CombineFilters(filters) => {
                for (i, filter) in filters.iter().enumerate() {
                    if i > 0 {
                        write!(f, " and ")?;
                    }
                    write!(f, "{filter}")?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for DateFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateFilter::Fixed(date) => write!(f, "{}", to_check_date_string(*date)),
            DateFilter::Relative(relative) => {
                let delta = relative.delta_days;
                if delta == 0.0 {
                    write!(f, "today")
                } else if delta > 0.0 {
                    write!(f, "today + {} days", format_number(delta))
                } else {
                    write!(f, "today - {} days", format_number(-delta))
                }
            }
        }
    }
}

impl Matcher<Element> for ElementFilter {
    fn matches(&self, element: &Element) -> bool {
        match self {
            ElementFilter::HasKey(key) => element.tags.contains_key(key),
            ElementFilter::NotHasKey(key) => !element.tags.contains_key(key),
            ElementFilter::HasKeyLike(key) => element.tags.keys().any(|k| key.is_match(k)),
            ElementFilter::NotHasKeyLike(key) => !element.tags.keys().any(|k| key.is_match(k)),
            ElementFilter::HasTag { key, value } => {
                element.tags.get(key).is_some_and(|v| v == value)
            }
            // absence of the key counts as "not equal"
            ElementFilter::NotHasTag { key, value } => {
                !element.tags.get(key).is_some_and(|v| v == value)
            }
            ElementFilter::HasTagValueLike { key, value } => {
                element.tags.get(key).is_some_and(|v| value.is_match(v))
            }
            ElementFilter::NotHasTagValueLike { key, value } => {
                !element.tags.get(key).is_some_and(|v| value.is_match(v))
            }
            ElementFilter::HasTagLike { key, value } => element
                .tags
                .iter()
                .any(|(k, v)| key.is_match(k) && value.is_match(v)),
            ElementFilter::CompareTagValue { key, op, value } => element
                .tags
                .get(key)
                .and_then(|v| v.parse::<f32>().ok())
                .is_some_and(|v| op.compare(v, *value)),
            ElementFilter::CompareDateTagValue { key, op, date } => element
                .tags
                .get(key)
                .and_then(|v| to_check_date(v))
                .is_some_and(|v| op.compare(v, date.date())),
            ElementFilter::CompareTagAge { key, op, date } => {
                let Some(edited_at) = element.edited_at else {
                    return false;
                };
                let reference = date.date();
                if op.compare(edited_at, reference) {
                    return true;
                }
                last_check_date_keys(key).iter().any(|k| {
                    element
                        .tags
                        .get(k)
                        .and_then(|v| to_check_date(v))
                        .is_some_and(|d| op.compare(d, reference))
                })
            }
            ElementFilter::CompareElementAge { op, date } => element
                .edited_at
                .is_some_and(|edited_at| op.compare(edited_at, date.date())),
            ElementFilter::CombineFilters(filters) => {
                filters.iter().all(|f| f.matches(element))
            }
        }
    }
}
