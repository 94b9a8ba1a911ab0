use crate::ast::{Node, Program, Signal, LOOP_INDEX};
use crate::environment::{Binding, Environment};
use crate::error::{ErrorKind, ForthError, Result, Span};
use crate::lexer::{is_float, is_integer, string_body};
use crate::value::Value;

// Remaining native stack that triggers growth, and how much to add.
const STACK_RED_ZONE: usize = 128 * 1024;
const STACK_GROW_SIZE: usize = 4 * 1024 * 1024;

pub struct Evaluator {
    environment: Environment,
}

impl Evaluator {
    pub fn new(environment: Environment) -> Self {
        Self { environment }
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    /// Register every function, then run the top-level code. Functions are
    /// bound up front so a call may precede the definition in the source.
    pub fn evaluate_program(&mut self, program: &Program) -> Result<()> {
        for function in &program.functions {
            self.environment
                .define_function(&function.name, function.body.clone());
        }

        let result = program.body.evaluate(&mut self.environment);
        let flushed = self.environment.flush();
        result?;
        flushed
    }
}

impl Node {
    pub fn evaluate(&self, env: &mut Environment) -> Result<Signal> {
        match self {
            Node::Sequence(statements) => {
                for statement in statements {
                    let signal = statement.evaluate(env)?;
                    if signal != Signal::Proceed {
                        return Ok(signal);
                    }
                }
                Ok(Signal::Proceed)
            }
            Node::Word { text, span } => evaluate_word(text, *span, env),
            Node::Variable {
                name,
                count,
                kind,
                span,
            } => {
                env.declare_variable(name, *count, *kind)
                    .map_err(|e| e.or_at(*span))?;
                Ok(Signal::Proceed)
            }
            Node::While { condition, body } => {
                loop {
                    match condition.evaluate(env)? {
                        Signal::BreakLoop => break,
                        Signal::ReturnFromFunction => return Ok(Signal::ReturnFromFunction),
                        // continue falls through to the flag check
                        Signal::Proceed | Signal::ContinueLoop => {}
                    }
                    if !env.pop()?.is_truthy() {
                        break;
                    }
                    match body.evaluate(env)? {
                        Signal::BreakLoop => break,
                        Signal::ReturnFromFunction => return Ok(Signal::ReturnFromFunction),
                        Signal::Proceed | Signal::ContinueLoop => {}
                    }
                }
                Ok(Signal::Proceed)
            }
            Node::For { body, span } => {
                let from = env.pop_int().map_err(|e| e.or_at(*span))?;
                let to = env.pop_int().map_err(|e| e.or_at(*span))?;
                let step = env.pop_int().map_err(|e| e.or_at(*span))?;

                let outer = env.loop_index();
                let result = run_counted_loop(body, from, to, step, env);
                env.replace_loop_index(outer);
                result
            }
            Node::If {
                then_branch,
                else_branch,
                span,
            } => {
                let flag = env.pop().map_err(|e| e.or_at(*span))?;
                if flag.is_truthy() {
                    then_branch.evaluate(env)
                } else if let Some(else_branch) = else_branch {
                    else_branch.evaluate(env)
                } else {
                    Ok(Signal::Proceed)
                }
            }
            Node::Switch { cases, span } => {
                let selector = env.pop_int().map_err(|e| e.or_at(*span))?;
                match cases.get(&selector) {
                    Some(body) => body.evaluate(env),
                    None => Ok(Signal::Proceed),
                }
            }
        }
    }
}

/// `i = from; step > 0 ? i < to : i > to; i += step`, with `i` visible to
/// the body as the loop index. A zero step never runs the body.
fn run_counted_loop(body: &Node, from: i64, to: i64, step: i64, env: &mut Environment) -> Result<Signal> {
    let mut i = from;
    while (step > 0 && i < to) || (step < 0 && i > to) {
        env.replace_loop_index(Some(i));
        match body.evaluate(env)? {
            Signal::BreakLoop => break,
            Signal::ReturnFromFunction => return Ok(Signal::ReturnFromFunction),
            Signal::Proceed | Signal::ContinueLoop => {}
        }
        i = match i.checked_add(step) {
            Some(next) => next,
            None => break,
        };
    }
    Ok(Signal::Proceed)
}

/// Resolve a word at evaluation time: built-ins, functions and variables
/// first (one namespace), then the loop index, then literal syntax.
fn evaluate_word(text: &str, span: Span, env: &mut Environment) -> Result<Signal> {
    match env.lookup(text) {
        Some(Binding::BuiltIn(word)) => return word(env).map_err(|e| e.or_at(span)),
        Some(Binding::Function(body)) => return call_function(text, &body, span, env),
        Some(Binding::Variable(address)) => {
            env.push(Value::Int(address));
            return Ok(Signal::Proceed);
        }
        None => {}
    }

    if text == LOOP_INDEX {
        return match env.loop_index() {
            Some(i) => {
                env.push(Value::Int(i));
                Ok(Signal::Proceed)
            }
            None => Err(ForthError::at(
                ErrorKind::UnknownWord,
                span,
                format!("loop index '{}' used outside of a DO ... LOOP", text),
            )),
        };
    }

    if let Some(value) = parse_number(text) {
        env.push(value);
        return Ok(Signal::Proceed);
    }

    if let Some(body) = string_body(text) {
        let address = env.memory_mut().intern(body).map_err(|e| e.or_at(span))?;
        env.push(Value::Int(address));
        env.push(Value::Int(body.len() as i64));
        return Ok(Signal::Proceed);
    }

    Err(ForthError::at(
        ErrorKind::UnknownWord,
        span,
        format!("unknown word '{}' at row {} column {}", text, span.row, span.column),
    ))
}

/// Run a function body one call level deeper. The native stack is grown on
/// demand so the depth limit, not the thread's stack size, bounds recursion.
fn call_function(name: &str, body: &Node, span: Span, env: &mut Environment) -> Result<Signal> {
    env.enter_call(name).map_err(|e| e.or_at(span))?;
    tracing::trace!(name, depth = env.call_depth(), "calling function");

    let result = stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || body.evaluate(env));
    env.leave_call();

    match result? {
        Signal::ReturnFromFunction => Ok(Signal::Proceed),
        signal => Ok(signal),
    }
}

fn parse_number(text: &str) -> Option<Value> {
    if is_integer(text) {
        text.parse().ok().map(Value::Int)
    } else if is_float(text) {
        text.parse().ok().map(Value::Float)
    } else {
        None
    }
}
