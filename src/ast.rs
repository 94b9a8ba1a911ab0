use crate::error::Span;
use std::collections::BTreeMap;
use std::rc::Rc;

/// Pre-declared identifier bound to the index of the innermost `DO` loop.
pub const LOOP_INDEX: &str = "i";

/// A parsed program: the top-level code plus every `: NAME ... ;` definition.
#[derive(Debug, Clone)]
pub struct Program {
    pub functions: Vec<Function>,
    pub body: Node,
}

#[derive(Debug, Clone)]
pub struct Function {
    pub name: String,
    pub body: Rc<Node>,
    pub span: Span,
}

/// Storage unit named after `CREATE NAME <count>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Cell,
    Float,
    Char,
}

impl ElementKind {
    pub fn from_unit(unit: &str) -> Option<Self> {
        match unit {
            "cells" => Some(ElementKind::Cell),
            "floats" => Some(ElementKind::Float),
            "chars" => Some(ElementKind::Char),
            _ => None,
        }
    }

    pub fn size(self) -> usize {
        match self {
            ElementKind::Cell | ElementKind::Float => 8,
            ElementKind::Char => 1,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Node {
    Sequence(Vec<Node>),
    /// Operator, function call, variable reference or literal; which one is
    /// decided when the node runs.
    Word {
        text: String,
        span: Span,
    },
    Variable {
        name: String,
        count: i64,
        kind: ElementKind,
        span: Span,
    },
    While {
        condition: Box<Node>,
        body: Box<Node>,
    },
    For {
        body: Box<Node>,
        span: Span,
    },
    If {
        then_branch: Box<Node>,
        else_branch: Option<Box<Node>>,
        span: Span,
    },
    Switch {
        cases: BTreeMap<i64, Node>,
        span: Span,
    },
}

/// Result of evaluating a node; anything but `Proceed` unwinds the enclosing
/// sequences until a loop or a function call consumes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Proceed,
    BreakLoop,
    ContinueLoop,
    ReturnFromFunction,
}
