//! Abstract syntax tree for Cox programs.
//!
//! Two closed node families, [`Expr`] and [`Stmt`]. Every node owns its
//! children exclusively; function declarations sit behind an `Rc` so the
//! runtime function values created from them can share the body without
//! cloning it.
//!
//! Expressions that the resolver annotates (variable reads, assignments,
//! `this`, `super`) carry an [`ExprId`]. The resolver's distance table is
//! keyed by that id instead of by mutating the node.

use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::token::Token;

static NEXT_EXPR_ID: AtomicUsize = AtomicUsize::new(0);

/// Identity of a resolvable expression node. Unique for the whole process,
/// so tables from successive REPL lines never collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExprId(usize);

impl ExprId {
    pub fn fresh() -> Self {
        ExprId(NEXT_EXPR_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// A **literal constant** that appears directly in the source code.
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    /// Numeric literal ‑ stored as IEEE‑754 `f64`.
    Number(f64),

    /// String literal without surrounding quotes.
    Str(String),

    /// The boolean constant `true`.
    True,

    /// The boolean constant `false`.
    False,

    /// The `null` literal.
    Null,
}

#[derive(Debug, Clone)]
pub enum Expr {
    /// `name = value`
    Assign {
        id: ExprId,
        name: Token,
        value: Box<Expr>,
    },

    /// Infix operator, including `,`, bitwise operators and arithmetic.
    Binary {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },

    /// `callee(arguments)`; `paren` is the closing `)` for error reporting.
    Call {
        callee: Box<Expr>,
        paren: Token,
        arguments: Vec<Expr>,
    },

    /// `condition ? then_branch : else_branch`
    Conditional {
        condition: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Box<Expr>,
    },

    /// `object.name`
    Get { object: Box<Expr>, name: Token },

    /// Parenthesised sub‑expression.
    Grouping(Box<Expr>),

    Literal(LiteralValue),

    /// Short‑circuiting `&&` / `||`.
    Logical {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },

    /// `object.name = value`
    Set {
        object: Box<Expr>,
        name: Token,
        value: Box<Expr>,
    },

    /// `super.method`
    Super {
        id: ExprId,
        keyword: Token,
        method: Token,
    },

    This { id: ExprId, keyword: Token },

    /// Prefix `!`, `-`, `~`, `++`, `--`.
    Unary { operator: Token, right: Box<Expr> },

    /// Postfix `++` / `--`; yields the value before the update.
    Postfix { operator: Token, target: Box<Expr> },

    Variable { id: ExprId, name: Token },

    /// `$"…"`: literal runs and [`Expr::StringFormat`] segments, in order.
    Interpolation { token: Token, parts: Vec<Expr> },

    /// `{value,alignment:format}` inside an interpolated string; `brace` is
    /// the opening `{`.
    StringFormat {
        brace: Token,
        value: Box<Expr>,
        alignment: Option<Box<Expr>>,
        format: Option<Token>,
    },
}

/// A function or method declaration, shared by every runtime function value
/// created from it.
#[derive(Debug)]
pub struct FunctionDecl {
    pub name: Token,
    pub params: Vec<Token>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub enum Stmt {
    Block(Vec<Stmt>),

    /// `break;` ‑ leaves the nearest enclosing loop.
    Break(Token),

    Class {
        name: Token,
        /// Always an [`Expr::Variable`]; resolved by name at run time.
        superclass: Option<Expr>,
        methods: Vec<Rc<FunctionDecl>>,
    },

    Expression(Expr),

    Function(Rc<FunctionDecl>),

    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },

    Print(Expr),

    Return {
        /// The `return` keyword token (for error locations).
        keyword: Token,
        value: Option<Expr>,
    },

    Var {
        name: Token,
        initializer: Option<Expr>,
    },

    /// `while` loop; `for` loops are desugared into this.
    While { condition: Expr, body: Box<Stmt> },
}
