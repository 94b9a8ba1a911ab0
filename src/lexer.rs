use crate::error::Span;
use crate::vocabulary::Vocabulary;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexemeKind {
    Whitespace,
    Literal,
    Identifier,
    Operator,
    Keyword,
    /// Never produced by the lexer; the analyzer uses it for the end-of-input
    /// sentinel so every expectation fails against it.
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Lexeme {
    pub kind: LexemeKind,
    pub text: String,
    pub span: Span,
}

impl Lexeme {
    pub fn new(kind: LexemeKind, text: String, span: Span) -> Self {
        Self { kind, text, span }
    }

    pub fn row(&self) -> usize {
        self.span.row
    }

    pub fn column(&self) -> usize {
        self.span.column
    }
}

/// Prefix tree over the characters of a fixed word list.
#[derive(Debug, Default)]
pub struct Trie {
    root: TrieNode,
}

#[derive(Debug, Default)]
struct TrieNode {
    terminal: bool,
    children: BTreeMap<char, TrieNode>,
}

impl Trie {
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut trie = Self::default();
        for word in words {
            trie.insert(word.as_ref());
        }
        trie
    }

    pub fn insert(&mut self, word: &str) {
        let mut node = &mut self.root;
        for c in word.chars() {
            node = node.children.entry(c).or_default();
        }
        node.terminal = true;
    }

    /// Exact membership: walking a prefix of some word is not enough, the
    /// walk has to stop on a node that ends a word.
    pub fn contains(&self, word: &str) -> bool {
        let mut node = &self.root;
        for c in word.chars() {
            match node.children.get(&c) {
                Some(next) => node = next,
                None => return false,
            }
        }
        node.terminal
    }
}

/// `-?[0-9]+`
pub fn is_integer(text: &str) -> bool {
    let digits = text.strip_prefix('-').unwrap_or(text);
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}

/// `-?[0-9]+(\.[0-9]+)?`
pub fn is_float(text: &str) -> bool {
    match text.split_once('.') {
        Some((whole, fraction)) => {
            is_integer(whole)
                && !fraction.is_empty()
                && fraction.chars().all(|c| c.is_ascii_digit())
        }
        None => is_integer(text),
    }
}

/// `s"..."`: the opening `s"` plus a closing quote.
pub fn is_string_literal(text: &str) -> bool {
    text.len() >= 3 && text.starts_with("s\"") && text.ends_with('"')
}

pub fn is_literal(text: &str) -> bool {
    is_integer(text) || is_float(text) || is_string_literal(text)
}

/// Body of a string literal: the token without its `s"` prefix and closing `"`.
pub fn string_body(text: &str) -> Option<&str> {
    if is_string_literal(text) {
        Some(&text[2..text.len() - 1])
    } else {
        None
    }
}

pub struct Lexer {
    source: String,
    lexemes: Vec<Lexeme>,
    keywords: Trie,
    operators: Trie,
    candidate: String,
    // position of the current character
    offset: usize,
    row: usize,
    column: usize,
    // position where the candidate began
    start: usize,
    start_row: usize,
    start_column: usize,
}

impl Lexer {
    pub fn new(source: String, vocabulary: &Vocabulary) -> Self {
        Self {
            source,
            lexemes: Vec::new(),
            keywords: Trie::new(&vocabulary.keywords),
            operators: Trie::new(&vocabulary.operators),
            candidate: String::new(),
            offset: 0,
            row: 1,
            column: 1,
            start: 0,
            start_row: 1,
            start_column: 1,
        }
    }

    pub fn scan_tokens(&mut self) -> Vec<Lexeme> {
        let source = std::mem::take(&mut self.source);

        for c in source.chars() {
            let inside_string = self.inside_string_literal();
            if is_delimiter(c) && !inside_string {
                self.finish_candidate();
            } else {
                if self.candidate.is_empty() {
                    self.start = self.offset;
                    self.start_row = self.row;
                    self.start_column = self.column;
                }
                self.candidate.push(c);
            }

            self.offset += 1;
            if c == '\n' {
                self.row += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }

            // A closing quote ends the literal even when more text is glued on.
            if inside_string && c == '"' {
                self.finish_candidate();
            }
        }
        self.finish_candidate();

        self.source = source;
        tracing::debug!(count = self.lexemes.len(), "lexed source");
        std::mem::take(&mut self.lexemes)
    }

    fn inside_string_literal(&self) -> bool {
        self.candidate.starts_with("s\"") && !is_string_literal(&self.candidate)
    }

    fn finish_candidate(&mut self) {
        if self.candidate.is_empty() {
            return;
        }
        let text = std::mem::take(&mut self.candidate);
        let kind = self.classify(&text);
        let span = Span::new(self.start, self.offset, self.start_row, self.start_column);
        self.lexemes.push(Lexeme::new(kind, text, span));
    }

    fn classify(&self, text: &str) -> LexemeKind {
        if self.keywords.contains(text) {
            LexemeKind::Keyword
        } else if is_literal(text) {
            LexemeKind::Literal
        } else if self.operators.contains(text) {
            LexemeKind::Operator
        } else {
            LexemeKind::Identifier
        }
    }
}

fn is_delimiter(c: char) -> bool {
    c == ' ' || c == '\n' || c == '\t' || c == '\r'
}
