//! Tree‑walking evaluator for Cox.
//!
//! The interpreter executes statements against a process‑wide global frame.
//! Variable references that the resolver annotated are read with an exact
//! hop count (`get_at`/`assign_at`); unannotated ones are globals.
//!
//! Non‑local exits travel as [`Flow`] values, not as errors:
//!
//! | Signal           | Produced by | Stopped at                       |
//! |------------------|-------------|----------------------------------|
//! | `Flow::Return(v)`| `return`    | the enclosing call boundary      |
//! | `Flow::Break`    | `break`     | the nearest loop (or call, as null)|
//!
//! The first runtime error aborts the current unit and is handed back to
//! the caller of [`Interpreter::interpret`].
//!
//! Distance tables from successive units are merged and never pruned: a
//! function defined by an earlier unit may still be called later. A long
//! REPL session therefore keeps one entry per resolved reference it has
//! ever seen.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{self, Write};
use std::rc::Rc;

use log::{debug, info};

use crate::ast::{Expr, ExprId, LiteralValue, Stmt};
use crate::callable::Function;
use crate::class::{Class, Instance};
use crate::environment::Environment;
use crate::error::{CoxError, Result};
use crate::resolver::Locals;
use crate::token::{Token, TokenType};
use crate::value::Value;

/// How a statement finished.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    Normal,
    Return(Value),
    Break,
}

pub struct Interpreter {
    globals: Rc<RefCell<Environment>>,
    environment: Rc<RefCell<Environment>>,
    locals: Locals,
    out: Box<dyn Write>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    /// An interpreter that prints to standard output.
    pub fn new() -> Self {
        Self::with_writer(io::stdout())
    }

    /// An interpreter whose `print` statements go to `out`.
    pub fn with_writer<W: Write + 'static>(out: W) -> Self {
        info!("Initializing Interpreter");

        let globals: Rc<RefCell<Environment>> = Rc::new(RefCell::new(Environment::new()));

        Interpreter {
            environment: Rc::clone(&globals),
            globals,
            locals: HashMap::new(),
            out: Box::new(out),
        }
    }

    /// Run one unit. `locals` is merged into the tables of earlier units so
    /// functions defined by those units keep resolving.
    pub fn interpret(&mut self, statements: &[Stmt], locals: Locals) -> Result<()> {
        debug!(
            "Interpreting {} statement(s) with {} resolved reference(s)",
            statements.len(),
            locals.len()
        );

        self.locals.extend(locals);

        for stmt in statements {
            self.execute(stmt)?;
        }

        self.out.flush()?;

        info!("Interpretation completed successfully");

        Ok(())
    }

    // ───────────────────────── statements ─────────────────────────

    pub fn execute(&mut self, stmt: &Stmt) -> Result<Flow> {
        match stmt {
            Stmt::Block(statements) => {
                debug!("Entering block with {} statement(s)", statements.len());

                let environment: Environment =
                    Environment::with_enclosing(Rc::clone(&self.environment));

                self.execute_block(statements, Rc::new(RefCell::new(environment)))
            }

            Stmt::Break(_) => {
                debug!("Break signal raised");

                Ok(Flow::Break)
            }

            Stmt::Class {
                name,
                superclass,
                methods,
            } => {
                self.environment.borrow_mut().define(&name.lexeme, Value::Null);

                let parent: Option<Rc<Class>> = match superclass {
                    Some(expr) => Some(self.superclass(expr, name)?),
                    None => None,
                };

                let previous: Rc<RefCell<Environment>> = Rc::clone(&self.environment);

                if let Some(parent) = &parent {
                    let mut scope: Environment =
                        Environment::with_enclosing(Rc::clone(&self.environment));
                    scope.define("super", Value::Class(Rc::clone(parent)));

                    self.environment = Rc::new(RefCell::new(scope));
                }

                let mut table: HashMap<String, Rc<Function>> = HashMap::new();

                for method in methods {
                    let function: Function = Function::new(
                        Rc::clone(method),
                        Rc::clone(&self.environment),
                        method.name.lexeme == "init",
                    );

                    table.insert(method.name.lexeme.clone(), Rc::new(function));
                }

                self.environment = previous;

                let class: Class = Class::new(name.lexeme.clone(), parent, table);

                info!("Class '{}' defined", name.lexeme);

                self.environment
                    .borrow_mut()
                    .assign(name, Value::Class(Rc::new(class)))?;

                Ok(Flow::Normal)
            }

            Stmt::Expression(expr) => {
                self.evaluate(expr)?;

                Ok(Flow::Normal)
            }

            Stmt::Function(decl) => {
                debug!("Defining function '{}'", decl.name.lexeme);

                let function: Function =
                    Function::new(Rc::clone(decl), Rc::clone(&self.environment), false);

                self.environment
                    .borrow_mut()
                    .define(&decl.name.lexeme, Value::Function(Rc::new(function)));

                Ok(Flow::Normal)
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.execute(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch)
                } else {
                    Ok(Flow::Normal)
                }
            }

            Stmt::Print(expr) => {
                let value: Value = self.evaluate(expr)?;

                writeln!(self.out, "{}", value)?;

                Ok(Flow::Normal)
            }

            Stmt::Return { value, .. } => {
                let value: Value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Null,
                };

                debug!("Return signal raised with {}", value);

                Ok(Flow::Return(value))
            }

            Stmt::Var { name, initializer } => {
                let value: Value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Null,
                };

                debug!("Defining variable '{}' = {}", name.lexeme, value);

                self.environment.borrow_mut().define(&name.lexeme, value);

                Ok(Flow::Normal)
            }

            Stmt::While { condition, body } => {
                while self.evaluate(condition)?.is_truthy() {
                    match self.execute(body)? {
                        Flow::Normal => {}
                        Flow::Break => {
                            debug!("Loop terminated by break");
                            break;
                        }
                        Flow::Return(value) => return Ok(Flow::Return(value)),
                    }
                }

                Ok(Flow::Normal)
            }
        }
    }

    /// Run `statements` inside `environment`, restoring the current frame
    /// afterwards whether they finished, signalled or failed.
    pub fn execute_block(
        &mut self,
        statements: &[Stmt],
        environment: Rc<RefCell<Environment>>,
    ) -> Result<Flow> {
        let previous: Rc<RefCell<Environment>> =
            std::mem::replace(&mut self.environment, environment);

        let result: Result<Flow> = self.execute_all(statements);

        self.environment = previous;

        result
    }

    fn execute_all(&mut self, statements: &[Stmt]) -> Result<Flow> {
        for stmt in statements {
            match self.execute(stmt)? {
                Flow::Normal => {}
                signal => return Ok(signal),
            }
        }

        Ok(Flow::Normal)
    }

    /// Evaluate a class's `< Parent` clause. Failures point at the parent's
    /// name, or at the class name when the clause is not a plain variable.
    fn superclass(&mut self, expr: &Expr, class_name: &Token) -> Result<Rc<Class>> {
        match self.evaluate(expr)? {
            Value::Class(class) => Ok(class),
            _ => {
                let at: &Token = match expr {
                    Expr::Variable { name, .. } => name,
                    _ => class_name,
                };

                Err(CoxError::runtime(at, "Superclass must be a class."))
            }
        }
    }

    // ───────────────────────── expressions ─────────────────────────

    pub fn evaluate(&mut self, expr: &Expr) -> Result<Value> {
        match expr {
            Expr::Assign { id, name, value } => {
                let value: Value = self.evaluate(value)?;

                self.assign_variable(*id, name, value.clone())?;

                Ok(value)
            }

            Expr::Binary {
                left,
                operator,
                right,
            } => {
                let left: Value = self.evaluate(left)?;
                let right: Value = self.evaluate(right)?;

                binary(operator, left, right)
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee: Value = self.evaluate(callee)?;

                let mut values: Vec<Value> = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    values.push(self.evaluate(argument)?);
                }

                let Some(callable) = callee.as_callable() else {
                    return Err(CoxError::runtime(
                        paren,
                        "Can only call functions and classes.",
                    ));
                };

                if values.len() < callable.arity() {
                    return Err(CoxError::runtime(
                        paren,
                        format!(
                            "Not enough arguments: expected {} but got {}.",
                            callable.arity(),
                            values.len()
                        ),
                    ));
                }

                debug!("Calling {} with {} argument(s)", callee, values.len());

                callable.call(self, values)
            }

            Expr::Conditional {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.evaluate(then_branch)
                } else {
                    self.evaluate(else_branch)
                }
            }

            Expr::Get { object, name } => match self.evaluate(object)? {
                Value::Instance(instance) => Instance::get(&instance, name),
                _ => Err(CoxError::runtime(name, "Only instances have properties.")),
            },

            Expr::Grouping(inner) => self.evaluate(inner),

            Expr::Literal(literal) => Ok(match literal {
                LiteralValue::Number(n) => Value::Number(*n),
                LiteralValue::Str(s) => Value::String(s.clone()),
                LiteralValue::True => Value::Bool(true),
                LiteralValue::False => Value::Bool(false),
                LiteralValue::Null => Value::Null,
            }),

            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let left: Value = self.evaluate(left)?;

                if operator.token_type == TokenType::OR {
                    if left.is_truthy() {
                        return Ok(left);
                    }
                } else if !left.is_truthy() {
                    return Ok(left);
                }

                self.evaluate(right)
            }

            Expr::Set {
                object,
                name,
                value,
            } => {
                let value: Value = self.evaluate(value)?;

                let Value::Instance(instance) = self.evaluate(object)? else {
                    return Err(CoxError::runtime(name, "Only instances have fields."));
                };

                instance.borrow_mut().set(name, value.clone());

                Ok(value)
            }

            Expr::Super {
                id,
                keyword,
                method,
            } => self.super_method(*id, keyword, method),

            Expr::This { id, keyword } => self.lookup_variable(*id, keyword),

            Expr::Unary { operator, right } => match operator.token_type {
                TokenType::PLUS_PLUS | TokenType::MINUS_MINUS => self.step(operator, right, true),

                TokenType::BANG => Ok(Value::Bool(!self.evaluate(right)?.is_truthy())),

                TokenType::MINUS => match self.evaluate(right)? {
                    Value::Number(n) => Ok(Value::Number(-n)),
                    _ => Err(CoxError::runtime(operator, "Operand must be a number.")),
                },

                _ => match self.evaluate(right)? {
                    Value::Number(n) => Ok(Value::Number(f64::from(!to_i32(n)))),
                    _ => Err(CoxError::runtime(operator, "Operand must be a number.")),
                },
            },

            Expr::Postfix { operator, target } => self.step(operator, target, false),

            Expr::Variable { id, name } => self.lookup_variable(*id, name),

            Expr::Interpolation { parts, .. } => {
                let mut out: String = String::new();

                for part in parts {
                    let value: Value = self.evaluate(part)?;
                    out.push_str(&value.to_string());
                }

                Ok(Value::String(out))
            }

            Expr::StringFormat {
                brace,
                value,
                alignment,
                format,
            } => {
                let text: String = self.evaluate(value)?.to_string();

                if let Some(format) = format {
                    debug!("Format specifier '{}' has no effect", format.lexeme);
                }

                let Some(alignment) = alignment else {
                    return Ok(Value::String(text));
                };

                let Value::Number(width) = self.evaluate(alignment)? else {
                    return Err(CoxError::runtime(brace, "Alignment must be a number."));
                };

                Ok(Value::String(align(brace, &text, width)?))
            }
        }
    }

    fn lookup_variable(&self, id: ExprId, name: &Token) -> Result<Value> {
        match self.locals.get(&id) {
            Some(distance) => Environment::get_at(&self.environment, *distance, name),
            None => self.globals.borrow().get(name),
        }
    }

    fn assign_variable(&mut self, id: ExprId, name: &Token, value: Value) -> Result<()> {
        match self.locals.get(&id) {
            Some(distance) => Environment::assign_at(&self.environment, *distance, name, value),
            None => self.globals.borrow_mut().assign(name, value),
        }
    }

    /// `++`/`--` on a variable or property. Prefix forms yield the updated
    /// value, postfix forms the value before the update.
    fn step(&mut self, operator: &Token, target: &Expr, prefix: bool) -> Result<Value> {
        let delta: f64 = if matches!(operator.token_type, TokenType::PLUS_PLUS) {
            1.0
        } else {
            -1.0
        };

        let (before, after) = match target {
            Expr::Variable { id, name } => {
                let before: f64 = number_operand(operator, self.lookup_variable(*id, name)?)?;
                let after: f64 = before + delta;

                self.assign_variable(*id, name, Value::Number(after))?;

                (before, after)
            }

            Expr::Get { object, name } => {
                let Value::Instance(instance) = self.evaluate(object)? else {
                    return Err(CoxError::runtime(name, "Only instances have properties."));
                };

                let before: f64 = number_operand(operator, Instance::get(&instance, name)?)?;
                let after: f64 = before + delta;

                instance.borrow_mut().set(name, Value::Number(after));

                (before, after)
            }

            _ => {
                return Err(CoxError::runtime(operator, "Invalid increment target."));
            }
        };

        Ok(Value::Number(if prefix { after } else { before }))
    }

    fn super_method(&mut self, id: ExprId, keyword: &Token, method: &Token) -> Result<Value> {
        let Some(distance) = self.locals.get(&id).copied() else {
            return Err(CoxError::runtime(keyword, "Undefined variable 'super'."));
        };

        let superclass: Value = Environment::get_at(&self.environment, distance, keyword)?;

        // `this` lives in the frame just inside the one binding `super`.
        let this: Token = Token::new(TokenType::THIS, "this", keyword.line);
        let object: Value =
            Environment::get_at(&self.environment, distance.saturating_sub(1), &this)?;

        let (Value::Class(superclass), Value::Instance(instance)) = (superclass, object) else {
            return Err(CoxError::runtime(keyword, "Superclass must be a class."));
        };

        match superclass.find_method(&method.lexeme) {
            Some(found) => Ok(Value::Function(Rc::new(found.bind(instance)))),
            None => Err(CoxError::runtime(
                method,
                format!("Undefined property '{}'.", method.lexeme),
            )),
        }
    }
}

// ─────────────────────────── operators ────────────────────────────

fn binary(operator: &Token, left: Value, right: Value) -> Result<Value> {
    use TokenType::*;

    match operator.token_type {
        COMMA => Ok(right),

        EQUAL_EQUAL => Ok(Value::Bool(left == right)),
        BANG_EQUAL => Ok(Value::Bool(left != right)),

        PLUS => match (left, right) {
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
            (Value::String(a), Value::String(b)) => Ok(Value::String(a + &b)),
            _ => Err(CoxError::runtime(
                operator,
                "Operands must be two numbers or two strings.",
            )),
        },

        _ => {
            let (a, b) = number_operands(operator, &left, &right)?;

            Ok(match operator.token_type {
                MINUS => Value::Number(a - b),
                STAR => Value::Number(a * b),
                SLASH => Value::Number(a / b),
                GREATER => Value::Bool(a > b),
                GREATER_EQUAL => Value::Bool(a >= b),
                LESS => Value::Bool(a < b),
                LESS_EQUAL => Value::Bool(a <= b),
                BIT_AND => Value::Number(f64::from(to_i32(a) & to_i32(b))),
                BIT_OR => Value::Number(f64::from(to_i32(a) | to_i32(b))),
                BIT_XOR => Value::Number(f64::from(to_i32(a) ^ to_i32(b))),
                LEFT_SHIFT => Value::Number(f64::from(to_i32(a).wrapping_shl(to_i32(b) as u32))),
                RIGHT_SHIFT => Value::Number(f64::from(to_i32(a).wrapping_shr(to_i32(b) as u32))),
                _ => {
                    return Err(CoxError::runtime(
                        operator,
                        format!("Unknown binary operator '{}'.", operator.lexeme),
                    ))
                }
            })
        }
    }
}

#[inline(always)]
fn number_operand(operator: &Token, value: Value) -> Result<f64> {
    match value {
        Value::Number(n) => Ok(n),
        _ => Err(CoxError::runtime(operator, "Operand must be a number.")),
    }
}

#[inline(always)]
fn number_operands(operator: &Token, left: &Value, right: &Value) -> Result<(f64, f64)> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok((*a, *b)),
        _ => Err(CoxError::runtime(operator, "Operands must be numbers.")),
    }
}

/// Bitwise operands are rounded half to even and saturated to 32 bits.
#[inline(always)]
fn to_i32(n: f64) -> i32 {
    n.round_ties_even() as i32
}

/// Positive widths right‑align, negative widths left‑align. The width must
/// fit in 32 bits once rounded.
fn align(brace: &Token, text: &str, width: f64) -> Result<String> {
    let width: f64 = width.round_ties_even();

    if !(i32::MIN as f64..=i32::MAX as f64).contains(&width) {
        return Err(CoxError::runtime(brace, "Alignment is out of range."));
    }

    let width: i32 = width as i32;
    let fill: String = " ".repeat((width.unsigned_abs() as usize).saturating_sub(text.chars().count()));

    if width < 0 {
        Ok(format!("{}{}", text, fill))
    } else {
        Ok(format!("{}{}", fill, text))
    }
}
