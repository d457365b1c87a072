//! Generic AND/OR expression tree and the builder that assembles it.

use std::fmt;

/// Something that can decide whether a candidate matches.
///
/// Both the leaf predicates and the composed tree implement this, so callers
/// can hold either behind the same capability.
pub trait Matcher<T> {
    fn matches(&self, obj: &T) -> bool;
}

/// A boolean combination of leaf values.
///
/// Internal nodes always hold at least two children and are maximally
/// flattened: an `All` never directly contains an `All`, an `Any` never
/// directly contains an `Any`. The builder below establishes this invariant;
/// code that pattern-matches on the tree may rely on it.
#[derive(Debug, Clone, PartialEq)]
pub enum BooleanExpression<L> {
    Leaf(L),
    All(Vec<BooleanExpression<L>>),
    Any(Vec<BooleanExpression<L>>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operator {
    And,
    Or,
}

impl<L, T> Matcher<T> for BooleanExpression<L>
where
    L: Matcher<T>,
{
    fn matches(&self, obj: &T) -> bool {
        match self {
            BooleanExpression::Leaf(value) => value.matches(obj),
            BooleanExpression::All(children) => children.iter().all(|c| c.matches(obj)),
            BooleanExpression::Any(children) => children.iter().any(|c| c.matches(obj)),
        }
    }
}

impl<L: fmt::Display> fmt::Display for BooleanExpression<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BooleanExpression::Leaf(value) => write!(f, "{value}"),
            BooleanExpression::All(children) => {
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        write!(f, " and ")?;
                    }
                    // OR groups need brackets inside an AND to stay unambiguous
                    if matches!(child, BooleanExpression::Any(_)) {
                        write!(f, "({child})")?;
                    } else {
                        write!(f, "{child}")?;
                    }
                }
                Ok(())
            }
            BooleanExpression::Any(children) => {
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        write!(f, " or ")?;
                    }
                    write!(f, "{child}")?;
                }
                Ok(())
            }
        }
    }
}

/// Error raised by [`BooleanExpressionBuilder`] on malformed input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    ClosedTooManyBrackets,
    ClosedTooFewBrackets,
    MissingOperand,
    MissingOperator,
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildError::ClosedTooManyBrackets => write!(f, "Closed one bracket too much"),
            BuildError::ClosedTooFewBrackets => write!(f, "Closed one bracket too little"),
            BuildError::MissingOperand => write!(f, "Missing operand for operator"),
            BuildError::MissingOperator => write!(f, "Missing operator between operands"),
        }
    }
}

impl std::error::Error for BuildError {}

/// One open context on the builder stack.
///
/// `operator: None` marks a bracket level whose mode is not locked yet; once
/// the first operator at that level is seen, an operator frame with the mode
/// locked sits above it.
struct Frame<L> {
    operator: Option<Operator>,
    children: Vec<BooleanExpression<L>>,
}

impl<L> Frame<L> {
    fn bracket() -> Self {
        Frame {
            operator: None,
            children: Vec::new(),
        }
    }

    fn with_operator(operator: Operator, operand: BooleanExpression<L>) -> Self {
        let mut frame = Frame {
            operator: Some(operator),
            children: Vec::new(),
        };
        frame.attach(operand);
        frame
    }

    /// Adds a finished subexpression, splicing it in when its root operator
    /// equals this frame's operator so the tree stays maximally flat.
    fn attach(&mut self, node: BooleanExpression<L>) {
        match (self.operator, node) {
            (Some(Operator::And), BooleanExpression::All(children)) => {
                self.children.extend(children)
            }
            (Some(Operator::Or), BooleanExpression::Any(children)) => {
                self.children.extend(children)
            }
            (_, node) => self.children.push(node),
        }
    }

    fn finalize(mut self) -> BooleanExpression<L> {
        if self.children.len() == 1 {
            return self.children.pop().unwrap();
        }
        match self.operator {
            Some(Operator::And) => BooleanExpression::All(self.children),
            _ => BooleanExpression::Any(self.children),
        }
    }
}

/// Incrementally builds a [`BooleanExpression`] from a token stream, giving
/// AND precedence over OR and flattening same-operator nesting as it goes.
///
/// AND locks onto the most recently pushed operand ("steals" it into a new
/// nested context), OR closes any open AND context first; this is what makes
/// `a or b and c` come out as `a or (b and c)`.
///
/// The stack grows with bracket depth; pathologically nested input is bounded
/// only by available memory, and `matches`/`Display` on the resulting tree
/// recurse over its depth.
pub struct BooleanExpressionBuilder<L> {
    frames: Vec<Frame<L>>,
}

impl<L> Default for BooleanExpressionBuilder<L> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L> BooleanExpressionBuilder<L> {
    pub fn new() -> Self {
        BooleanExpressionBuilder {
            frames: vec![Frame::bracket()],
        }
    }

    pub fn add_open_bracket(&mut self) {
        self.frames.push(Frame::bracket());
    }

    pub fn add_close_bracket(&mut self) -> Result<(), BuildError> {
        while self.current().operator.is_some() {
            self.collapse_top();
        }
        if self.frames.len() == 1 {
            return Err(BuildError::ClosedTooManyBrackets);
        }
        let mut bracket = self.frames.pop().expect("bracket frame");
        let operand = match bracket.children.len() {
            0 => return Err(BuildError::MissingOperand),
            1 => bracket.children.pop().unwrap(),
            _ => return Err(BuildError::MissingOperator),
        };
        self.current().attach(operand);
        Ok(())
    }

    pub fn add_value(&mut self, value: L) {
        self.current().attach(BooleanExpression::Leaf(value));
    }

    pub fn add_and(&mut self) -> Result<(), BuildError> {
        if self.current().operator == Some(Operator::And) {
            return Ok(());
        }
        // AND binds tighter: steal the last operand into a nested AND context
        let operand = self
            .current()
            .children
            .pop()
            .ok_or(BuildError::MissingOperand)?;
        self.frames.push(Frame::with_operator(Operator::And, operand));
        Ok(())
    }

    pub fn add_or(&mut self) -> Result<(), BuildError> {
        match self.current().operator {
            Some(Operator::Or) => Ok(()),
            Some(Operator::And) => {
                // an OR ends the nested AND context started by add_and
                let node = self.collapse_top_detached();
                if self.current().operator == Some(Operator::Or) {
                    self.current().attach(node);
                } else {
                    self.frames.push(Frame::with_operator(Operator::Or, node));
                }
                Ok(())
            }
            None => {
                let operand = self
                    .current()
                    .children
                    .pop()
                    .ok_or(BuildError::MissingOperand)?;
                self.frames.push(Frame::with_operator(Operator::Or, operand));
                Ok(())
            }
        }
    }

    /// Finalizes the tree. Returns `None` when no value was ever added.
    pub fn build(mut self) -> Result<Option<BooleanExpression<L>>, BuildError> {
        while self.current().operator.is_some() {
            self.collapse_top();
        }
        if self.frames.len() > 1 {
            return Err(BuildError::ClosedTooFewBrackets);
        }
        let mut root = self.frames.pop().expect("root frame");
        match root.children.len() {
            0 => Ok(None),
            1 => Ok(Some(root.children.pop().unwrap())),
            _ => Err(BuildError::MissingOperator),
        }
    }

    fn current(&mut self) -> &mut Frame<L> {
        self.frames.last_mut().expect("builder stack is never empty")
    }

    fn collapse_top(&mut self) {
        let node = self.collapse_top_detached();
        self.current().attach(node);
    }

    fn collapse_top_detached(&mut self) -> BooleanExpression<L> {
        self.frames.pop().expect("operator frame").finalize()
    }
}
