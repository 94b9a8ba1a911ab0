// Tree-walking interpreter for a small Forth dialect.
//
// Source text is preprocessed, lexed into classified lexemes, analyzed into an
// executable tree (with declaration and context checks done up front) and
// evaluated against a per-run environment.

// Public modules
pub mod ast;
pub mod builtins;
pub mod environment;
pub mod error;
pub mod evaluator;
pub mod lexer;
pub mod memory;
pub mod parser;
pub mod preprocessor;
pub mod runner;
pub mod value;
pub mod vocabulary;

// Re-export commonly used items
pub use ast::{Node, Program, Signal};
pub use environment::Environment;
pub use error::{ErrorKind, ForthError, Span};
pub use evaluator::Evaluator;
pub use lexer::{Lexeme, LexemeKind, Lexer};
pub use parser::Parser;
pub use value::Value;
pub use vocabulary::{Vocabulary, VocabularyError};

// Re-export main functions
pub use runner::{interpret, parse_program, run};
