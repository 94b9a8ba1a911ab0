//! Keyword, operator and block-ender lists that seed the lexer and analyzer.
//!
//! The defaults describe the language as shipped. A TOML file can replace any
//! of the three lists:
//!
//! ```toml
//! operators = ["dup", "drop", "+"]
//! ```

use serde::Deserialize;
use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;

pub const DEFAULT_KEYWORDS: &[&str] = &[
    "BEGIN", "WHILE", "REPEAT", "DO", "LOOP", "IF", "ENDIF", "ELSE", "CASE", "OF", "ENDOF",
    "ENDCASE", ":", ";",
];

pub const DEFAULT_OPERATORS: &[&str] = &[
    // stack
    "dup", "drop", "swap", "over", "rot", "pick", "nip", "tuck", "roll",
    // arithmetic and bits
    "+", "-", "*", "/", "%", "negate", "invert", "lshift", "rshift", "and", "or", "xor", "not",
    // comparison
    "<", ">", "<=", ">=", "=",
    // strings
    "s+", "s=",
    // memory
    "!", "f!", "c!", "@", "f@", "c@", "cells", "floats", "chars", "allot",
    // declarations
    "VARIABLE", "CREATE",
    // conversion
    "tocell", "tofloat",
    // I/O
    "input", "finput", "sinput", "type", "emit", ".", ".s",
    // control
    "leave", "continue", "return", "exit",
];

pub const DEFAULT_ENDERS: &[&str] = &[";", "REPEAT", "LOOP", "ELSE", "ENDOF", ":", "ENDIF", "WHILE"];

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Vocabulary {
    pub keywords: Vec<String>,
    pub operators: Vec<String>,
    pub enders: Vec<String>,
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self {
            keywords: to_owned(DEFAULT_KEYWORDS),
            operators: to_owned(DEFAULT_OPERATORS),
            enders: to_owned(DEFAULT_ENDERS),
        }
    }
}

#[derive(Debug, Error)]
pub enum VocabularyError {
    #[error("cannot read vocabulary file: {0}")]
    Io(#[from] io::Error),
    #[error("invalid vocabulary file: {0}")]
    Toml(#[from] toml::de::Error),
}

impl Vocabulary {
    pub fn from_toml(text: &str) -> Result<Self, VocabularyError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, VocabularyError> {
        let text = fs::read_to_string(path)?;
        Self::from_toml(&text)
    }
}

fn to_owned(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_remaining_defaults() {
        let vocabulary = Vocabulary::from_toml("operators = [\"dup\"]").unwrap();
        assert_eq!(vocabulary.operators, vec!["dup".to_string()]);
        assert_eq!(vocabulary.keywords, Vocabulary::default().keywords);
        assert_eq!(vocabulary.enders, Vocabulary::default().enders);
    }

    #[test]
    fn unknown_shape_is_rejected() {
        assert!(matches!(
            Vocabulary::from_toml("keywords = 3"),
            Err(VocabularyError::Toml(_))
        ));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let result = Vocabulary::load(Path::new("/nonexistent/tforth-vocabulary.toml"));
        assert!(matches!(result, Err(VocabularyError::Io(_))));
    }
}
