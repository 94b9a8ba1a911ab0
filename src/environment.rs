use crate::ast::{ElementKind, Node};
use crate::builtins::{self, Builtin};
use crate::error::{ErrorKind, ForthError, Result};
use crate::memory::Memory;
use crate::value::Value;
use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::io::{self, BufRead, Write};
use std::rc::Rc;

/// What a word resolves to at evaluation time.
#[derive(Clone)]
pub enum Binding {
    BuiltIn(Builtin),
    Function(Rc<Node>),
    Variable(i64),
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Binding::BuiltIn(_) => write!(f, "BuiltIn"),
            Binding::Function(_) => write!(f, "Function"),
            Binding::Variable(address) => write!(f, "Variable({})", address),
        }
    }
}

/// Deepest chain of nested function calls a program may build.
pub const MAX_CALL_DEPTH: usize = 10_000;

/// All mutable state of one program run. Nothing here is global: every run
/// constructs its own environment.
pub struct Environment {
    stack: Vec<Value>,
    builtins: BTreeMap<&'static str, Builtin>,
    // functions and variables
    words: BTreeMap<String, Binding>,
    call_depth: usize,
    memory: Memory,
    loop_index: Option<i64>,
    input: Box<dyn BufRead>,
    output: Box<dyn Write>,
    pending_input: VecDeque<String>,
}

impl Environment {
    pub fn new() -> Self {
        Self::with_io(Box::new(io::stdin().lock()), Box::new(io::stdout()))
    }

    pub fn with_io(input: Box<dyn BufRead>, output: Box<dyn Write>) -> Self {
        Self {
            stack: Vec::new(),
            builtins: builtins::table().iter().copied().collect(),
            words: BTreeMap::new(),
            call_depth: 0,
            memory: Memory::new(),
            loop_index: None,
            input,
            output,
            pending_input: VecDeque::new(),
        }
    }

    pub fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    pub fn pop(&mut self) -> Result<Value> {
        self.stack.pop().ok_or_else(ForthError::stack_underflow)
    }

    pub fn pop_int(&mut self) -> Result<i64> {
        Ok(self.pop()?.as_int())
    }

    pub fn pop_float(&mut self) -> Result<f64> {
        Ok(self.pop()?.as_float())
    }

    /// Bottom of the stack first.
    pub fn stack(&self) -> &[Value] {
        &self.stack
    }

    /// Copy of the element `depth` places below the top (0 = top).
    pub fn peek_at(&self, depth: i64) -> Result<Value> {
        let index = self.index_from_top(depth, "pick")?;
        Ok(self.stack[index])
    }

    /// Remove the element `depth` places below the top and return it.
    pub fn remove_at(&mut self, depth: i64) -> Result<Value> {
        let index = self.index_from_top(depth, "roll")?;
        Ok(self.stack.remove(index))
    }

    fn index_from_top(&self, depth: i64, word: &str) -> Result<usize> {
        let len = self.stack.len() as i64;
        if (0..len).contains(&depth) {
            Ok((len - 1 - depth) as usize)
        } else {
            Err(ForthError::runtime(
                ErrorKind::PickOutOfRange,
                format!("'{}' index {} is out of range for a stack of depth {}", word, depth, len),
            ))
        }
    }

    /// Built-ins always win over a function or variable of the same name.
    pub fn lookup(&self, name: &str) -> Option<Binding> {
        match self.builtins.get(name) {
            Some(word) => Some(Binding::BuiltIn(*word)),
            None => self.words.get(name).cloned(),
        }
    }

    pub fn is_builtin(&self, name: &str) -> bool {
        self.builtins.contains_key(name)
    }

    pub fn define_function(&mut self, name: &str, body: Rc<Node>) {
        self.words.insert(name.to_string(), Binding::Function(body));
    }

    /// Allocate backing storage for `count` elements and bind `name` to its
    /// address. Binding the same name twice is an error even when the parser
    /// accepted it, e.g. a declaration inside a loop body.
    pub fn declare_variable(&mut self, name: &str, count: i64, kind: ElementKind) -> Result<i64> {
        if self.words.contains_key(name) || self.is_builtin(name) {
            return Err(ForthError::runtime(
                ErrorKind::DuplicateAllocation,
                format!("'{}' is already allocated", name),
            )
            .with_help("Move the declaration out of the loop or function that runs it twice."));
        }

        let size = usize::try_from(count.max(0))
            .ok()
            .and_then(|count| count.checked_mul(kind.size()))
            .ok_or_else(|| {
                ForthError::runtime(
                    ErrorKind::AllocationFailed,
                    format!("'{}' asks for {} elements, which does not fit in memory", name, count),
                )
            })?;
        let address = self.memory.allocate(size)?;
        tracing::debug!(name, address, size, "allocated variable");
        self.words.insert(name.to_string(), Binding::Variable(address));
        Ok(address)
    }

    /// Account for one more nested function call.
    pub fn enter_call(&mut self, name: &str) -> Result<()> {
        if self.call_depth >= MAX_CALL_DEPTH {
            return Err(ForthError::runtime(
                ErrorKind::CallDepth,
                format!("calling '{}' would nest more than {} function calls", name, MAX_CALL_DEPTH),
            )
            .with_help("Check the recursion for a missing base case."));
        }
        self.call_depth += 1;
        Ok(())
    }

    pub fn leave_call(&mut self) {
        self.call_depth = self.call_depth.saturating_sub(1);
    }

    pub fn call_depth(&self) -> usize {
        self.call_depth
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut Memory {
        &mut self.memory
    }

    pub fn loop_index(&self) -> Option<i64> {
        self.loop_index
    }

    /// Bind the innermost loop index, returning the previous binding so the
    /// caller can restore it.
    pub fn replace_loop_index(&mut self, index: Option<i64>) -> Option<i64> {
        std::mem::replace(&mut self.loop_index, index)
    }

    pub fn write_output(&mut self, bytes: &[u8]) -> Result<()> {
        self.output.write_all(bytes).map_err(io_error)
    }

    pub fn flush(&mut self) -> Result<()> {
        self.output.flush().map_err(io_error)
    }

    /// Next whitespace-delimited token from the input stream.
    pub fn read_token(&mut self) -> Result<String> {
        self.flush()?;
        loop {
            if let Some(token) = self.pending_input.pop_front() {
                return Ok(token);
            }

            let mut line = String::new();
            if self.input.read_line(&mut line).map_err(io_error)? == 0 {
                return Err(ForthError::runtime(
                    ErrorKind::InvalidInput,
                    "input ended while a word was waiting for it".to_string(),
                ));
            }
            self.pending_input
                .extend(line.split_whitespace().map(str::to_string));
        }
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

fn io_error(error: io::Error) -> ForthError {
    ForthError::runtime(ErrorKind::Io, format!("I/O error: {}", error))
}
