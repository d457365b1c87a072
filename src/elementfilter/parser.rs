//! Parser for the element filter syntax.
//!
//! Grammar (in rough EBNF):
//!
//! filter      = types ["with" expr]
//! types       = type ("," type)*
//! type        = "nodes" | "ways" | "relations" | "nwr"
//! expr        = term (("and" | "or") term)*
//! term        = "(" expr ")" | tag_filter
//! tag_filter  = "!" key | "!~" key_regex
//!             | "~" key_regex "~" value_regex
//!             | key (op value)? | key ("older" | "newer") date
//!             | ("older" | "newer") date
//! op          = "=" | "!=" | "~" | "!~" | "<" | "<=" | ">" | ">="
//! date        = YYYY-MM-DD | YYYY-MM | "today" (("+" | "-") number unit)?
//! unit        = "days" | "weeks" | "months" | "years"

use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

use super::boolean_expression::BooleanExpressionBuilder;
use super::expression::{ElementFilterExpression, ElementTypeSet};
use super::filters::{
    AnchoredPattern, CompareOp, DateFilter, ElementFilter, RelativeDate, to_check_date,
};
use super::lexer::{SpannedToken, Token, tokenize};
use crate::mapdata::ElementType;

const RESERVED_WORDS: [&str; 3] = ["with", "and", "or"];

/// A number that is a number and nothing else; anything that fails this test
/// after a comparison operator is tried as a date instead.
static NUMBER_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:[0-9]+(?:\.[0-9]*)?|\.[0-9]+)$").unwrap());

/// Fatal error compiling a filter string. A filter either parses completely
/// or not at all; there is no partial result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub message: String,
    /// Byte offset into the filter source.
    pub position: usize,
}

impl ParseError {
    pub fn new(message: impl Into<String>, position: usize) -> Self {
        ParseError {
            message: message.into(),
            position,
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (at position {})", self.message, self.position)
    }
}

impl std::error::Error for ParseError {}

/// Compiles a string in filter syntax into an [`ElementFilterExpression`].
///
/// A string in filter syntax is something like
/// `"ways with (highway = residential or highway = tertiary) and !name"`
/// (all residential and tertiary roads that have no name).
pub fn parse_element_filter_expression(
    input: &str,
) -> Result<ElementFilterExpression, ParseError> {
    let tokens = tokenize(input)?;
    let mut parser = Parser::new(tokens);
    let element_types = parser.parse_element_types()?;
    let expr = parser.parse_tag_clause()?;
    Ok(ElementFilterExpression::new(element_types, expr))
}

/// Parser state: a token stream and a cursor.
struct Parser {
    tokens: Vec<SpannedToken>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<SpannedToken>) -> Self {
        Parser { tokens, pos: 0 }
    }

    fn peek(&self) -> &Token {
        self.tokens
            .get(self.pos)
            .map(|t| &t.token)
            .unwrap_or(&Token::Eof)
    }

    fn offset(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|t| t.offset)
            .unwrap_or(0)
    }

    fn advance(&mut self) -> Token {
        let token = self
            .tokens
            .get(self.pos)
            .map(|t| t.token.clone())
            .unwrap_or(Token::Eof);
        self.pos += 1;
        token
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError::new(message, self.offset())
    }

    fn next_is_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Token::Word(w) if w == keyword)
    }

    fn parse_element_types(&mut self) -> Result<ElementTypeSet, ParseError> {
        let mut set = ElementTypeSet::empty();
        loop {
            let at = self.offset();
            let word = match self.advance() {
                Token::Word(w) => w,
                _ => {
                    return Err(ParseError::new(
                        "Expected element types. Any of: nodes, ways, relations or nwr, \
                         separated by ','",
                        at,
                    ));
                }
            };
            let newly_added = match word.as_str() {
                "nodes" => set.insert(ElementType::Node),
                "ways" => set.insert(ElementType::Way),
                "relations" => set.insert(ElementType::Relation),
                "nwr" => {
                    let n = set.insert(ElementType::Node);
                    let w = set.insert(ElementType::Way);
                    let r = set.insert(ElementType::Relation);
                    n && w && r
                }
                _ => {
                    return Err(ParseError::new(
                        format!(
                            "Expected element types ('nodes', 'ways', 'relations' or 'nwr'), \
                             got '{word}'"
                        ),
                        at,
                    ));
                }
            };
            if !newly_added {
                return Err(ParseError::new(
                    "Mentioned the same element type twice",
                    at,
                ));
            }
            if !matches!(self.peek(), Token::Comma) {
                return Ok(set);
            }
            self.advance();
        }
    }

    fn parse_tag_clause(
        &mut self,
    ) -> Result<Option<super::BooleanExpression<ElementFilter>>, ParseError> {
        // the tag clause is optional: "ways" alone matches every way
        match self.peek() {
            Token::Eof => return Ok(None),
            Token::Word(w) if w == "with" => {
                self.advance();
            }
            _ => return Err(self.error("Expected end of string or 'with' keyword")),
        }

        let mut builder = BooleanExpressionBuilder::new();
        loop {
            while matches!(self.peek(), Token::LParen) {
                self.advance();
                builder.add_open_bracket();
            }

            builder.add_value(self.parse_tag_filter()?);

            while matches!(self.peek(), Token::RParen) {
                let at = self.offset();
                self.advance();
                builder
                    .add_close_bracket()
                    .map_err(|e| ParseError::new(e.to_string(), at))?;
            }

            let at = self.offset();
            if matches!(self.peek(), Token::Eof) {
                break;
            } else if self.next_is_keyword("or") {
                self.advance();
                builder
                    .add_or()
                    .map_err(|e| ParseError::new(e.to_string(), at))?;
            } else if self.next_is_keyword("and") {
                self.advance();
                builder
                    .add_and()
                    .map_err(|e| ParseError::new(e.to_string(), at))?;
            } else {
                return Err(self.error("Expected end of string, 'and' or 'or'"));
            }
        }

        let at = self.offset();
        builder
            .build()
            .map_err(|e| ParseError::new(e.to_string(), at))
    }

    fn parse_tag_filter(&mut self) -> Result<ElementFilter, ParseError> {
        match self.peek().clone() {
            Token::Bang => {
                self.advance();
                if matches!(self.peek(), Token::Tilde) {
                    self.advance();
                    return Ok(ElementFilter::NotHasKeyLike(self.parse_key_pattern()?));
                }
                Ok(ElementFilter::NotHasKey(self.parse_key()?))
            }
            Token::NotTilde => {
                self.advance();
                Ok(ElementFilter::NotHasKeyLike(self.parse_key_pattern()?))
            }
            Token::Tilde => {
                self.advance();
                let key = self.parse_key_pattern()?;
                match self.peek() {
                    Token::Tilde => {
                        self.advance();
                        let value = self.parse_value_pattern()?;
                        Ok(ElementFilter::HasTagLike { key, value })
                    }
                    Token::Eq | Token::Ne | Token::NotTilde | Token::Lt | Token::Le
                    | Token::Gt | Token::Ge => Err(self.error(
                        "The key prefix operator '~' must be used together with the binary \
                         operator '~'",
                    )),
                    _ => Ok(ElementFilter::HasKeyLike(key)),
                }
            }
            Token::Word(w) if w == "older" => {
                self.advance();
                Ok(ElementFilter::CompareElementAge {
                    op: CompareOp::Less,
                    date: self.parse_date()?,
                })
            }
            Token::Word(w) if w == "newer" => {
                self.advance();
                Ok(ElementFilter::CompareElementAge {
                    op: CompareOp::Greater,
                    date: self.parse_date()?,
                })
            }
            Token::Word(_) | Token::Quoted(_) => {
                let key = self.parse_key()?;
                self.parse_key_filter(key)
            }
            _ => Err(self.error("Expected a tag filter")),
        }
    }

    /// Everything that may follow a parsed key: nothing (existence check),
    /// a key-value operator, a numeric/date comparison, or an age check.
    fn parse_key_filter(&mut self, key: String) -> Result<ElementFilter, ParseError> {
        if self.next_is_keyword("older") {
            self.advance();
            return Ok(tag_age_filter(key, CompareOp::Less, self.parse_date()?));
        }
        if self.next_is_keyword("newer") {
            self.advance();
            return Ok(tag_age_filter(key, CompareOp::Greater, self.parse_date()?));
        }

        match self.peek().clone() {
            Token::Eq => {
                self.advance();
                let value = self.parse_quotable_word()?;
                Ok(ElementFilter::HasTag { key, value })
            }
            Token::Ne => {
                self.advance();
                let value = self.parse_quotable_word()?;
                Ok(ElementFilter::NotHasTag { key, value })
            }
            Token::Tilde => {
                self.advance();
                let value = self.parse_value_pattern()?;
                Ok(ElementFilter::HasTagValueLike { key, value })
            }
            Token::NotTilde => {
                self.advance();
                let value = self.parse_value_pattern()?;
                Ok(ElementFilter::NotHasTagValueLike { key, value })
            }
            Token::Gt | Token::Ge | Token::Lt | Token::Le => {
                let op = match self.advance() {
                    Token::Gt => CompareOp::Greater,
                    Token::Ge => CompareOp::GreaterOrEqual,
                    Token::Lt => CompareOp::Less,
                    _ => CompareOp::LessOrEqual,
                };
                let is_number =
                    matches!(self.peek(), Token::Word(w) if NUMBER_WORD.is_match(w));
                if is_number {
                    let at = self.offset();
                    let word = match self.advance() {
                        Token::Word(w) => w,
                        _ => unreachable!("peeked a word"),
                    };
                    let value: f32 = word
                        .parse()
                        .map_err(|_| ParseError::new("Expected a number", at))?;
                    Ok(ElementFilter::CompareTagValue { key, op, value })
                } else {
                    let date = self.parse_date()?;
                    Ok(ElementFilter::CompareDateTagValue { key, op, date })
                }
            }
            _ => Ok(ElementFilter::HasKey(key)),
        }
    }

    fn parse_key(&mut self) -> Result<String, ParseError> {
        let at = self.offset();
        match self.advance() {
            Token::Word(w) => {
                if RESERVED_WORDS.contains(&w.as_str()) {
                    Err(ParseError::new(
                        format!(
                            "A key cannot be named like the reserved word '{w}', surround it \
                             with quotation marks"
                        ),
                        at,
                    ))
                } else {
                    Ok(w)
                }
            }
            Token::Quoted(w) => Ok(w),
            _ => Err(ParseError::new("Missing key (dangling prefix operator)", at)),
        }
    }

    fn parse_key_pattern(&mut self) -> Result<AnchoredPattern, ParseError> {
        let at = self.offset();
        let pattern = self.parse_key()?;
        AnchoredPattern::new(&pattern)
            .map_err(|e| ParseError::new(format!("Invalid regex: {e}"), at))
    }

    fn parse_value_pattern(&mut self) -> Result<AnchoredPattern, ParseError> {
        let at = self.offset();
        let pattern = self.parse_quotable_word()?;
        AnchoredPattern::new(&pattern)
            .map_err(|e| ParseError::new(format!("Invalid regex: {e}"), at))
    }

    fn parse_quotable_word(&mut self) -> Result<String, ParseError> {
        let at = self.offset();
        match self.advance() {
            Token::Word(w) | Token::Quoted(w) => Ok(w),
            _ => Err(ParseError::new("Missing value (dangling operator)", at)),
        }
    }

    fn parse_date(&mut self) -> Result<DateFilter, ParseError> {
        let at = self.offset();
        let word = match self.advance() {
            Token::Word(w) => w,
            _ => return Err(ParseError::new("Missing date", at)),
        };

        if word == "today" {
            let mut delta_days = 0.0;
            if matches!(self.peek(), Token::Word(w) if w.starts_with('+') || w.starts_with('-'))
            {
                delta_days = self.parse_delta_duration_in_days()?;
            }
            return Ok(DateFilter::Relative(RelativeDate::new(delta_days)));
        }

        if let Some(date) = to_check_date(&word) {
            return Ok(DateFilter::Fixed(date));
        }

        Err(ParseError::new(
            "Expected either a date (YYYY-MM-DD) or 'today'",
            at,
        ))
    }

    fn parse_delta_duration_in_days(&mut self) -> Result<f32, ParseError> {
        let at = self.offset();
        let word = match self.advance() {
            Token::Word(w) => w,
            _ => return Err(ParseError::new("Expected + or -", at)),
        };
        let (sign, number_part) = match word.split_at(1) {
            ("+", rest) => (1.0, rest.to_string()),
            ("-", rest) => (-1.0, rest.to_string()),
            _ => return Err(ParseError::new("Expected + or -", at)),
        };

        // the sign may stand alone ("today - 8 days") or be attached ("-8")
        let number_word = if number_part.is_empty() {
            let at = self.offset();
            match self.advance() {
                Token::Word(w) => w,
                _ => return Err(ParseError::new("Expected a number", at)),
            }
        } else {
            number_part
        };
        let duration: f32 = number_word
            .parse()
            .map_err(|_| ParseError::new("Expected a number", at))?;

        Ok(sign * self.parse_duration_unit(duration)?)
    }

    fn parse_duration_unit(&mut self, duration: f32) -> Result<f32, ParseError> {
        let at = self.offset();
        match self.advance() {
            Token::Word(w) => match w.as_str() {
                "years" => Ok(365.25 * duration),
                "months" => Ok(30.5 * duration),
                "weeks" => Ok(7.0 * duration),
                "days" => Ok(duration),
                _ => Err(ParseError::new("Expected years, months, weeks or days", at)),
            },
            _ => Err(ParseError::new("Expected years, months, weeks or days", at)),
        }
    }
}

/// `key older <date>` means: the key exists, and neither the element nor any
/// of the key's check dates has been touched since `<date>`.
fn tag_age_filter(key: String, op: CompareOp, date: DateFilter) -> ElementFilter {
    ElementFilter::CombineFilters(vec![
        ElementFilter::HasKey(key.clone()),
        ElementFilter::CompareTagAge { key, op, date },
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapdata::Element;
    use std::collections::HashMap;
    use time::OffsetDateTime;

    fn parse(input: &str) -> ElementFilterExpression {
        parse_element_filter_expression(input).unwrap()
    }

    fn parse_err(input: &str) -> ParseError {
        parse_element_filter_expression(input).unwrap_err()
    }

    fn node(pairs: &[(&str, &str)]) -> Element {
        Element {
            id: 1,
            element_type: ElementType::Node,
            tags: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            edited_at: Some(OffsetDateTime::now_utc()),
        }
    }

    fn expr_string(input: &str) -> String {
        parse(input).expr().expect("tag clause").to_string()
    }

    #[test]
    fn element_type_lists() {
        assert!(parse("nodes").element_types().contains(ElementType::Node));
        assert!(!parse("nodes").element_types().contains(ElementType::Way));

        let both = parse("nodes, ways").element_types();
        assert!(both.contains(ElementType::Node));
        assert!(both.contains(ElementType::Way));
        assert!(!both.contains(ElementType::Relation));

        let all = parse("nwr").element_types();
        assert_eq!(all.len(), 3);

        let all = parse("nodes, ways, relations").element_types();
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn bad_element_type_lists() {
        assert!(parse_err("").message.contains("Expected element types"));
        assert!(parse_err("foo with bar").message.contains("Expected element types"));
        assert!(
            parse_err("nodes, nodes")
                .message
                .contains("same element type twice")
        );
        assert!(
            parse_err("nwr, ways")
                .message
                .contains("same element type twice")
        );
        assert!(parse_err("nodes,").message.contains("Expected element types"));
    }

    #[test]
    fn missing_with_keyword() {
        let err = parse_err("nodes bla");
        assert!(err.message.contains("'with'"));
        assert_eq!(err.position, 6);
    }

    #[test]
    fn tag_clause_is_optional() {
        let expr = parse("ways");
        assert!(expr.expr().is_none());
        assert!(expr.matches(&Element {
            id: 1,
            element_type: ElementType::Way,
            tags: HashMap::new(),
            edited_at: None,
        }));
    }

    #[test]
    fn empty_tag_clause_is_an_error() {
        assert!(parse_err("nodes with").message.contains("tag filter"));
    }

    #[test]
    fn key_existence() {
        let expr = parse("nodes with name");
        assert!(expr.matches(&node(&[("name", "Foo")])));
        assert!(!expr.matches(&node(&[("namee", "Foo")])));

        let expr = parse("nodes with !name");
        assert!(!expr.matches(&node(&[("name", "Foo")])));
        assert!(expr.matches(&node(&[])));
    }

    #[test]
    fn quoted_keys_and_values() {
        let expr = parse("nodes with 'wid th' = 'four oh'");
        assert!(expr.matches(&node(&[("wid th", "four oh")])));

        // reserved words are keys when quoted
        let expr = parse("nodes with 'with' = yes");
        assert!(expr.matches(&node(&[("with", "yes")])));
    }

    #[test]
    fn reserved_word_as_key_is_an_error() {
        let err = parse_err("nodes with or = yes");
        assert!(err.message.contains("reserved word 'or'"));
    }

    #[test]
    fn key_value_operators() {
        let expr = parse("nodes with highway = residential");
        assert!(expr.matches(&node(&[("highway", "residential")])));
        assert!(!expr.matches(&node(&[("highway", "service")])));

        let expr = parse("nodes with highway != residential");
        assert!(!expr.matches(&node(&[("highway", "residential")])));
        assert!(expr.matches(&node(&[("highway", "service")])));
        assert!(expr.matches(&node(&[])));

        let expr = parse("nodes with highway ~ residential|unclassified");
        assert!(expr.matches(&node(&[("highway", "residential")])));
        assert!(expr.matches(&node(&[("highway", "unclassified")])));
        assert!(!expr.matches(&node(&[("highway", "service")])));

        let expr = parse("nodes with highway !~ residential|unclassified");
        assert!(!expr.matches(&node(&[("highway", "residential")])));
        assert!(expr.matches(&node(&[("highway", "service")])));
    }

    #[test]
    fn key_regex_forms() {
        let expr = parse("nodes with ~maxspeed|maxheight");
        assert!(expr.matches(&node(&[("maxspeed", "30")])));
        assert!(expr.matches(&node(&[("maxheight", "3")])));
        assert!(!expr.matches(&node(&[("maxweight", "3")])));

        let expr = parse("nodes with !~maxspeed:.*");
        assert!(expr.matches(&node(&[("maxspeed", "30")])));
        assert!(!expr.matches(&node(&[("maxspeed:forward", "30")])));

        let expr = parse("nodes with ~surface ~ paved|asphalt");
        assert!(expr.matches(&node(&[("surface", "paved")])));
        assert!(!expr.matches(&node(&[("surface", "gravel")])));
    }

    #[test]
    fn key_prefix_tilde_with_wrong_operator() {
        let err = parse_err("nodes with ~key = value");
        assert!(err.message.contains("binary operator '~'"));
    }

    #[test]
    fn invalid_regex_is_a_parse_error() {
        let err = parse_err("nodes with highway ~ [");
        assert!(err.message.contains("Invalid regex"));
    }

    #[test]
    fn numeric_comparisons() {
        let expr = parse("nodes with width > 3.5");
        assert!(expr.matches(&node(&[("width", "3.6")])));
        assert!(!expr.matches(&node(&[("width", "3.5")])));
        assert!(!expr.matches(&node(&[("width", "broad")])));
        assert!(!expr.matches(&node(&[])));

        let expr = parse("nodes with lanes >= 2");
        assert!(expr.matches(&node(&[("lanes", "2")])));
        assert!(!expr.matches(&node(&[("lanes", "1")])));

        let expr = parse("nodes with width<3");
        assert!(expr.matches(&node(&[("width", "2.9")])));
        assert!(!expr.matches(&node(&[("width", "3")])));
    }

    #[test]
    fn date_comparisons() {
        let expr = parse("nodes with check_date < 2000-11-11");
        assert!(expr.matches(&node(&[("check_date", "2000-11-10")])));
        assert!(!expr.matches(&node(&[("check_date", "2000-11-11")])));
        assert!(!expr.matches(&node(&[("check_date", "bla")])));

        // month-only dates default the day to the 1st
        let expr = parse("nodes with check_date >= 2000-11");
        assert!(expr.matches(&node(&[("check_date", "2000-11-01")])));
        assert!(!expr.matches(&node(&[("check_date", "2000-10-31")])));
    }

    #[test]
    fn malformed_date_is_a_parse_error() {
        let err = parse_err("nodes with check_date < 2000-11-11-11");
        assert!(err.message.contains("date"));
        let err = parse_err("nodes with older tomorrow");
        assert!(err.message.contains("date"));
    }

    #[test]
    fn relative_dates() {
        // edited two days ago, filter asks for "older than a day ago"
        let mut el = node(&[]);
        el.edited_at = Some(OffsetDateTime::now_utc() - time::Duration::days(2));
        assert!(parse("nodes with older today - 1 days").matches(&el));
        assert!(!parse("nodes with newer today - 1 days").matches(&el));
        assert!(!parse("nodes with older today - 3 days").matches(&el));
        // attached sign
        assert!(parse("nodes with older today -1 days").matches(&el));
        // and in the other direction
        assert!(parse("nodes with newer today - 3 days").matches(&el));
    }

    #[test]
    fn malformed_relative_date_is_a_parse_error() {
        assert!(
            parse_err("nodes with older today - 8")
                .message
                .contains("years, months, weeks or days")
        );
        assert!(
            parse_err("nodes with older today - x days")
                .message
                .contains("number")
        );
    }

    #[test]
    fn tag_age_requires_the_key() {
        let expr = parse("nodes with width older today - 1 days");
        let mut el = node(&[("width", "3")]);
        el.edited_at = Some(OffsetDateTime::now_utc() - time::Duration::days(2));
        assert!(expr.matches(&el));

        // same age, but no width tag
        let mut el = node(&[]);
        el.edited_at = Some(OffsetDateTime::now_utc() - time::Duration::days(2));
        assert!(!expr.matches(&el));
    }

    #[test]
    fn precedence_and_brackets() {
        assert_eq!(expr_string("nodes with a or b and c"), "a or b and c");
        assert_eq!(expr_string("nodes with a and b or c"), "a and b or c");
        assert_eq!(
            expr_string("nodes with a and (b or c)"),
            "a and (b or c)"
        );
        assert_eq!(
            expr_string("nodes with (a or (b or (c or d)))"),
            "a or b or c or d"
        );
        assert_eq!(expr_string("nodes with ((a and b))"), "a and b");
    }

    #[test]
    fn serialized_filter_parses_back_to_an_equivalent_filter() {
        let inputs = [
            "nodes, ways with highway and !name",
            "nodes with a or b and c",
            "nodes with width > 3.5 and surface ~ paved|asphalt",
            "nodes with check_date < 2000-11 or older today - 8 days",
            "nodes with width older today - 1 days",
            "nodes with ~maxspeed|maxheight and 'wid th' != 'four oh'",
            "nwr with 'with' = yes or amenity newer today",
        ];
        let samples = [
            node(&[("a", "x")]),
            node(&[("b", "x"), ("c", "x")]),
            node(&[("highway", "residential"), ("name", "A")]),
            node(&[("highway", "service")]),
            node(&[("width", "4"), ("surface", "paved")]),
            node(&[("check_date", "1999-01-01")]),
            node(&[("wid th", "four oh")]),
            node(&[("maxspeed", "30")]),
            node(&[("with", "yes")]),
            node(&[]),
        ];
        for input in inputs {
            let parsed = parse(input);
            let serialized = parsed.to_string();
            let reparsed = parse_element_filter_expression(&serialized)
                .unwrap_or_else(|e| panic!("'{serialized}' failed to parse: {e}"));
            for sample in &samples {
                assert_eq!(
                    parsed.matches(sample),
                    reparsed.matches(sample),
                    "'{input}' vs '{serialized}' on {:?}",
                    sample.tags
                );
            }
        }
    }

    #[test]
    fn precedence_affects_matching() {
        let expr = parse("nodes with a or b and c");
        assert!(expr.matches(&node(&[("a", "x")])));
        assert!(expr.matches(&node(&[("b", "x"), ("c", "x")])));
        assert!(!expr.matches(&node(&[("b", "x")])));
    }

    #[test]
    fn unbalanced_brackets_are_fatal() {
        assert!(parse_err("nodes with (a or b").message.contains("bracket"));
        assert!(parse_err("nodes with a or b)").message.contains("bracket"));
        assert!(
            parse_err("nodes with ((a and (b or c))")
                .message
                .contains("bracket")
        );
    }

    #[test]
    fn garbage_after_expression() {
        let err = parse_err("nodes with a b");
        assert!(err.message.contains("'and' or 'or'"));
    }

    #[test]
    fn errors_carry_positions() {
        assert_eq!(parse_err("nodes with a or b)").position, 17);
        let err = parse_err("nodes with check_date < nonsense");
        assert_eq!(err.position, 24);
    }

    #[test]
    fn whitespace_and_newlines_are_insignificant() {
        let expr = parse(
            "nodes, ways with\n            highway = residential\n            and !name\n        ",
        );
        let mut el = node(&[("highway", "residential")]);
        el.element_type = ElementType::Way;
        assert!(expr.matches(&el));
    }
}
