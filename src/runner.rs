use crate::ast::Program;
use crate::environment::Environment;
use crate::error::Result;
use crate::evaluator::Evaluator;
use crate::lexer::{Lexeme, Lexer};
use crate::parser::Parser;
use crate::preprocessor::preprocess;
use crate::vocabulary::Vocabulary;

/// Strip comments and split the source into classified lexemes.
pub fn tokenize(source: &str, vocabulary: &Vocabulary) -> Vec<Lexeme> {
    let mut lexer = Lexer::new(preprocess(source), vocabulary);
    lexer.scan_tokens()
}

/// Lex and analyze; nothing runs unless the whole program is valid.
pub fn parse_program(source: &str, vocabulary: &Vocabulary) -> Result<Program> {
    let lexemes = tokenize(source, vocabulary);
    let mut parser = Parser::new(lexemes, vocabulary);
    parser.parse()
}

pub fn interpret(source: &str, vocabulary: &Vocabulary, evaluator: &mut Evaluator) -> Result<()> {
    let program = parse_program(source, vocabulary)?;
    evaluator.evaluate_program(&program)
}

/// Run a whole program against the process's stdin/stdout, reporting any
/// error. Returns whether the run completed.
pub fn run(source: &str, filename: Option<&str>, vocabulary: &Vocabulary) -> bool {
    let mut evaluator = Evaluator::new(Environment::new());

    match interpret(source, vocabulary, &mut evaluator) {
        Ok(()) => true,
        Err(error) => {
            tracing::debug!(kind = ?error.kind, runtime = error.kind.is_runtime(), "run failed");
            // Preprocessing keeps offsets intact, so spans index the text as written.
            error.report(source, filename);
            false
        }
    }
}
