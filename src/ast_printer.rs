//! Prints an AST back as Cox source.
//!
//! Output re-parses to the same tree shape: parentheses are only added where
//! the tree would otherwise re-associate differently (a desugared compound
//! assignment such as `a.b *= 1 + 2` prints as `a.b = a.b * (1 + 2)`), and a
//! second print of that re-parse is identical to the first.

use crate::ast::{Expr, LiteralValue, Stmt};
use crate::token::TokenType;

/// Binding strength of each grammar level, loosest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Prec {
    Comma,
    Assignment,
    Conditional,
    Or,
    And,
    Equality,
    Comparison,
    Bitwise,
    Term,
    Factor,
    Unary,
    Postfix,
    Call,
    Primary,
}

impl Prec {
    fn next(self) -> Prec {
        match self {
            Prec::Comma => Prec::Assignment,
            Prec::Assignment => Prec::Conditional,
            Prec::Conditional => Prec::Or,
            Prec::Or => Prec::And,
            Prec::And => Prec::Equality,
            Prec::Equality => Prec::Comparison,
            Prec::Comparison => Prec::Bitwise,
            Prec::Bitwise => Prec::Term,
            Prec::Term => Prec::Factor,
            Prec::Factor => Prec::Unary,
            Prec::Unary => Prec::Postfix,
            Prec::Postfix => Prec::Call,
            Prec::Call | Prec::Primary => Prec::Primary,
        }
    }
}

pub struct AstPrinter {
    indent: usize,
}

impl Default for AstPrinter {
    fn default() -> Self {
        Self::new()
    }
}

impl AstPrinter {
    pub fn new() -> Self {
        AstPrinter { indent: 0 }
    }

    /// Print a whole program, one top-level statement per line.
    pub fn print_program(&mut self, statements: &[Stmt]) -> String {
        let mut out: String = String::new();

        for stmt in statements {
            out.push_str(&self.print_stmt(stmt));
            out.push('\n');
        }

        out
    }

    pub fn print_stmt(&mut self, stmt: &Stmt) -> String {
        match stmt {
            Stmt::Block(statements) => self.block(statements),

            Stmt::Break(_) => "break;".to_string(),

            Stmt::Class {
                name,
                superclass,
                methods,
            } => {
                let mut out: String = format!("class {}", name.lexeme);

                if let Some(Expr::Variable { name: parent, .. }) = superclass {
                    out.push_str(&format!(" < {}", parent.lexeme));
                }

                out.push_str(" {\n");
                self.indent += 1;

                for method in methods {
                    let params: Vec<&str> = method.params.iter().map(|p| p.lexeme.as_str()).collect();

                    out.push_str(&self.pad());
                    out.push_str(&format!(
                        "{}({}) {}\n",
                        method.name.lexeme,
                        params.join(", "),
                        self.block(&method.body)
                    ));
                }

                self.indent -= 1;
                out.push_str(&self.pad());
                out.push('}');

                out
            }

            Stmt::Expression(expr) => format!("{};", self.print(expr)),

            Stmt::Function(decl) => {
                let params: Vec<&str> = decl.params.iter().map(|p| p.lexeme.as_str()).collect();

                format!(
                    "func {}({}) {}",
                    decl.name.lexeme,
                    params.join(", "),
                    self.block(&decl.body)
                )
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                let mut out: String = format!(
                    "if ({}) {}",
                    self.print(condition),
                    self.print_stmt(then_branch)
                );

                if let Some(else_branch) = else_branch {
                    out.push_str(" else ");
                    out.push_str(&self.print_stmt(else_branch));
                }

                out
            }

            Stmt::Print(expr) => format!("print {};", self.print(expr)),

            Stmt::Return { value: None, .. } => "return;".to_string(),

            Stmt::Return {
                value: Some(value), ..
            } => format!("return {};", self.print(value)),

            Stmt::Var {
                name,
                initializer: None,
            } => format!("var {};", name.lexeme),

            Stmt::Var {
                name,
                initializer: Some(init),
            } => format!("var {} = {};", name.lexeme, self.print(init)),

            Stmt::While { condition, body } => {
                format!("while ({}) {}", self.print(condition), self.print_stmt(body))
            }
        }
    }

    fn block(&mut self, statements: &[Stmt]) -> String {
        if statements.is_empty() {
            return "{}".to_string();
        }

        let mut out: String = "{\n".to_string();
        self.indent += 1;

        for stmt in statements {
            out.push_str(&self.pad());
            out.push_str(&self.print_stmt(stmt));
            out.push('\n');
        }

        self.indent -= 1;
        out.push_str(&self.pad());
        out.push('}');

        out
    }

    fn pad(&self) -> String {
        "    ".repeat(self.indent)
    }

    /// Print an expression at the loosest level.
    pub fn print(&self, expr: &Expr) -> String {
        self.expr_at(expr, Prec::Comma)
    }

    /// Print `expr` so that it parses at level `min` or tighter.
    fn expr_at(&self, expr: &Expr, min: Prec) -> String {
        let (prec, text) = self.expr(expr);

        if prec < min {
            format!("({})", text)
        } else {
            text
        }
    }

    fn expr(&self, expr: &Expr) -> (Prec, String) {
        match expr {
            Expr::Assign { name, value, .. } => (
                Prec::Assignment,
                format!("{} = {}", name.lexeme, self.expr_at(value, Prec::Assignment)),
            ),

            Expr::Binary {
                left,
                operator,
                right,
            } => {
                let prec: Prec = binary_prec(&operator.token_type);
                let left: String = self.expr_at(left, prec);
                let right: String = self.expr_at(right, prec.next());

                if operator.token_type == TokenType::COMMA {
                    (prec, format!("{}, {}", left, right))
                } else {
                    (prec, format!("{} {} {}", left, operator.lexeme, right))
                }
            }

            Expr::Call {
                callee, arguments, ..
            } => {
                let args: Vec<String> = arguments
                    .iter()
                    .map(|a| self.expr_at(a, Prec::Assignment))
                    .collect();

                (
                    Prec::Call,
                    format!("{}({})", self.expr_at(callee, Prec::Call), args.join(", ")),
                )
            }

            Expr::Conditional {
                condition,
                then_branch,
                else_branch,
            } => (
                Prec::Conditional,
                format!(
                    "{} ? {} : {}",
                    self.expr_at(condition, Prec::Or),
                    self.expr_at(then_branch, Prec::Comma),
                    self.expr_at(else_branch, Prec::Conditional)
                ),
            ),

            Expr::Get { object, name } => (
                Prec::Call,
                format!("{}.{}", self.expr_at(object, Prec::Call), name.lexeme),
            ),

            Expr::Grouping(inner) => (Prec::Primary, format!("({})", self.print(inner))),

            Expr::Literal(value) => (Prec::Primary, literal(value)),

            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let prec: Prec = if operator.token_type == TokenType::OR {
                    Prec::Or
                } else {
                    Prec::And
                };

                (
                    prec,
                    format!(
                        "{} {} {}",
                        self.expr_at(left, prec),
                        operator.lexeme,
                        self.expr_at(right, prec.next())
                    ),
                )
            }

            Expr::Set {
                object,
                name,
                value,
            } => (
                Prec::Assignment,
                format!(
                    "{}.{} = {}",
                    self.expr_at(object, Prec::Call),
                    name.lexeme,
                    self.expr_at(value, Prec::Assignment)
                ),
            ),

            Expr::Super { method, .. } => (Prec::Primary, format!("super.{}", method.lexeme)),

            Expr::This { .. } => (Prec::Primary, "this".to_string()),

            Expr::Unary { operator, right } => {
                let operand: String = self.expr_at(right, Prec::Unary);

                // "- -x" must not fuse into "--x".
                let gap: &str = if operand.starts_with('-') || operand.starts_with('+') {
                    " "
                } else {
                    ""
                };

                (Prec::Unary, format!("{}{}{}", operator.lexeme, gap, operand))
            }

            Expr::Postfix { operator, target } => (
                Prec::Postfix,
                format!("{}{}", self.expr_at(target, Prec::Call), operator.lexeme),
            ),

            Expr::Variable { name, .. } => (Prec::Primary, name.lexeme.clone()),

            Expr::Interpolation { parts, .. } => {
                let mut out: String = "$\"".to_string();

                for part in parts {
                    match part {
                        Expr::Literal(LiteralValue::Str(s)) => out.push_str(&escape_braces(s)),
                        other => out.push_str(&self.segment(other)),
                    }
                }

                out.push('"');

                (Prec::Primary, out)
            }

            Expr::StringFormat { .. } => (Prec::Primary, self.segment(expr)),
        }
    }

    fn segment(&self, expr: &Expr) -> String {
        match expr {
            Expr::StringFormat {
                value,
                alignment,
                format,
                ..
            } => {
                let mut out: String = format!("{{{}", self.expr_at(value, Prec::Assignment));

                if let Some(alignment) = alignment {
                    out.push(',');
                    out.push_str(&self.expr_at(alignment, Prec::Assignment));
                }

                if let Some(format) = format {
                    out.push(':');
                    out.push_str(&format.lexeme);
                }

                out.push('}');

                out
            }

            other => format!("{{{}}}", self.expr_at(other, Prec::Assignment)),
        }
    }
}

fn binary_prec(operator: &TokenType) -> Prec {
    match operator {
        TokenType::COMMA => Prec::Comma,
        TokenType::BANG_EQUAL | TokenType::EQUAL_EQUAL => Prec::Equality,
        TokenType::GREATER | TokenType::GREATER_EQUAL | TokenType::LESS | TokenType::LESS_EQUAL => {
            Prec::Comparison
        }
        TokenType::BIT_AND
        | TokenType::BIT_OR
        | TokenType::BIT_XOR
        | TokenType::LEFT_SHIFT
        | TokenType::RIGHT_SHIFT => Prec::Bitwise,
        TokenType::MINUS | TokenType::PLUS => Prec::Term,
        _ => Prec::Factor,
    }
}

fn literal(value: &LiteralValue) -> String {
    match value {
        LiteralValue::Number(n) => n.to_string(),
        LiteralValue::Str(s) => format!("\"{}\"", s),
        LiteralValue::True => "true".to_string(),
        LiteralValue::False => "false".to_string(),
        LiteralValue::Null => "null".to_string(),
    }
}

/// Re-escape a literal run so the interpolation pass reads it back unchanged.
fn escape_braces(s: &str) -> String {
    let mut out: String = String::with_capacity(s.len());
    let mut chars = s.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                out.push(c);

                if let Some(escaped) = chars.next() {
                    out.push(escaped);
                }
            }
            '{' => out.push_str("{{"),
            _ => out.push(c),
        }
    }

    out
}
