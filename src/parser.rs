use crate::ast::{ElementKind, Function, Node, Program, LOOP_INDEX};
use crate::builtins;
use crate::error::{ErrorKind, ForthError, Result, Span};
use crate::lexer::{is_integer, Lexeme, LexemeKind};
use crate::vocabulary::Vocabulary;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::rc::Rc;

/// Recursive-descent analyzer: builds the tree and enforces the declaration
/// and context rules in the same pass.
pub struct Parser {
    lexemes: Vec<Lexeme>,
    current: usize,
    end_of_input: Lexeme,
    enders: HashSet<String>,
    identifiers: BTreeSet<String>,
    loop_depth: usize,
    function_depth: usize,
    functions: Vec<Function>,
}

impl Parser {
    pub fn new(lexemes: Vec<Lexeme>, vocabulary: &Vocabulary) -> Self {
        let last = lexemes.last().map(|l| l.span).unwrap_or_default();
        let end_of_input = Lexeme::new(
            LexemeKind::Error,
            "end of input".to_string(),
            Span::new(last.end, last.end, last.row, last.column),
        );

        Self {
            lexemes,
            current: 0,
            end_of_input,
            enders: vocabulary.enders.iter().cloned().collect(),
            identifiers: BTreeSet::from([LOOP_INDEX.to_string()]),
            loop_depth: 0,
            function_depth: 0,
            functions: Vec::new(),
        }
    }

    pub fn parse(&mut self) -> Result<Program> {
        let mut statements = Vec::new();

        while !self.is_at_end() {
            if self.check(":") {
                let function = self.function_definition()?;
                self.functions.push(function);
                continue;
            }

            let block = self.code_block()?;
            if !self.is_at_end() && !self.check(":") {
                // A block ender with nothing open to close.
                let found = self.peek();
                return Err(ForthError::syntax(found.span, "statement", &found.text));
            }
            statements.push(block);
        }

        self.check_identifiers()?;

        Ok(Program {
            functions: std::mem::take(&mut self.functions),
            body: Node::Sequence(statements),
        })
    }

    /// Names known after parsing, the loop index included.
    pub fn identifiers(&self) -> &BTreeSet<String> {
        &self.identifiers
    }

    fn function_definition(&mut self) -> Result<Function> {
        let colon = self.expect(":")?;
        let name = self.declare()?;
        let body = self.in_function(|parser| parser.code_block())?;
        self.expect(";")?;

        tracing::debug!(name = %name.text, row = name.row(), "defined function");
        Ok(Function {
            name: name.text,
            body: Rc::new(body),
            span: colon.span,
        })
    }

    /// Statements and control constructs up to (not including) the next ender.
    fn code_block(&mut self) -> Result<Node> {
        let mut statements = Vec::new();

        while !self.is_at_end() && !self.enders.contains(&self.peek().text) {
            let node = match self.peek().text.as_str() {
                "BEGIN" => self.while_loop()?,
                "DO" => self.for_loop()?,
                "IF" => self.if_statement()?,
                "CASE" => self.switch()?,
                _ => self.statement()?,
            };
            statements.push(node);
        }

        Ok(Node::Sequence(statements))
    }

    fn while_loop(&mut self) -> Result<Node> {
        self.expect("BEGIN")?;
        self.in_loop(|parser| {
            let condition = parser.code_block()?;
            parser.expect("WHILE")?;
            let body = parser.code_block()?;
            parser.expect("REPEAT")?;

            Ok(Node::While {
                condition: Box::new(condition),
                body: Box::new(body),
            })
        })
    }

    fn for_loop(&mut self) -> Result<Node> {
        let start = self.expect("DO")?;
        let body = self.in_loop(|parser| parser.code_block())?;
        self.expect("LOOP")?;

        Ok(Node::For {
            body: Box::new(body),
            span: start.span,
        })
    }

    fn if_statement(&mut self) -> Result<Node> {
        let start = self.expect("IF")?;
        let then_branch = Box::new(self.code_block()?);
        let else_branch = if self.check("ELSE") {
            self.advance();
            Some(Box::new(self.code_block()?))
        } else {
            None
        };
        self.expect("ENDIF")?;

        Ok(Node::If {
            then_branch,
            else_branch,
            span: start.span,
        })
    }

    fn switch(&mut self) -> Result<Node> {
        let start = self.expect("CASE")?;
        let mut cases = BTreeMap::new();

        while !self.check("ENDCASE") {
            let label = self.peek().clone();
            if label.kind != LexemeKind::Literal {
                return Err(ForthError::syntax(label.span, "case label or 'ENDCASE'", &label.text));
            }
            let selector = self.integer_literal(&label)?;
            self.advance();

            self.expect("OF")?;
            let body = self.code_block()?;
            self.expect("ENDOF")?;

            if cases.insert(selector, body).is_some() {
                return Err(ForthError::at(
                    ErrorKind::Syntax,
                    label.span,
                    format!("duplicate case label {} at row {} column {}", selector, label.row(), label.column()),
                ));
            }
        }
        self.advance();

        Ok(Node::Switch {
            cases,
            span: start.span,
        })
    }

    fn statement(&mut self) -> Result<Node> {
        let lexeme = self.peek().clone();

        match lexeme.text.as_str() {
            "VARIABLE" => return self.variable_declaration(),
            "CREATE" => return self.array_declaration(),
            "leave" | "continue" if self.loop_depth == 0 => {
                return Err(ForthError::at(
                    ErrorKind::NotInLoop,
                    lexeme.span,
                    format!("'{}' used outside of a loop at row {} column {}", lexeme.text, lexeme.row(), lexeme.column()),
                )
                .with_help("'leave' and 'continue' are only valid between BEGIN ... REPEAT or DO ... LOOP."));
            }
            "return" | "exit" if self.function_depth == 0 => {
                return Err(ForthError::at(
                    ErrorKind::NotInFunction,
                    lexeme.span,
                    format!("'{}' used outside of a function at row {} column {}", lexeme.text, lexeme.row(), lexeme.column()),
                )
                .with_help("'return' is only valid inside a ': NAME ... ;' definition."));
            }
            _ => {}
        }

        match lexeme.kind {
            LexemeKind::Literal if is_integer(&lexeme.text) && lexeme.text.parse::<i64>().is_err() => {
                Err(ForthError::syntax(lexeme.span, "a literal that fits in a cell", &lexeme.text))
            }
            LexemeKind::Literal | LexemeKind::Operator | LexemeKind::Identifier => {
                self.advance();
                Ok(Node::Word {
                    text: lexeme.text,
                    span: lexeme.span,
                })
            }
            _ => Err(ForthError::syntax(lexeme.span, "statement", &lexeme.text)),
        }
    }

    fn variable_declaration(&mut self) -> Result<Node> {
        self.expect("VARIABLE")?;
        let name = self.declare()?;

        tracing::debug!(name = %name.text, "declared variable");
        Ok(Node::Variable {
            name: name.text,
            count: 1,
            kind: ElementKind::Cell,
            span: name.span,
        })
    }

    fn array_declaration(&mut self) -> Result<Node> {
        self.expect("CREATE")?;
        let name = self.declare()?;

        let size = self.peek().clone();
        if size.kind != LexemeKind::Literal {
            return Err(ForthError::syntax(size.span, "element count", &size.text));
        }
        let count = self.integer_literal(&size)?;
        if count < 0 {
            return Err(ForthError::syntax(size.span, "non-negative element count", &size.text));
        }
        self.advance();

        let unit = self.peek().clone();
        let kind = ElementKind::from_unit(&unit.text)
            .ok_or_else(|| ForthError::syntax(unit.span, "'cells', 'floats' or 'chars'", &unit.text))?;
        self.advance();
        self.expect("allot")?;

        tracing::debug!(name = %name.text, count, ?kind, "declared array");
        Ok(Node::Variable {
            name: name.text,
            count,
            kind,
            span: name.span,
        })
    }

    /// Consume an identifier and add it to the flat namespace.
    fn declare(&mut self) -> Result<Lexeme> {
        let name = self.peek().clone();
        if name.kind != LexemeKind::Identifier {
            return Err(ForthError::syntax(name.span, "identifier", &name.text));
        }
        if is_builtin(&name.text) {
            return Err(ForthError::at(
                ErrorKind::Redefinition,
                name.span,
                format!("'{}' is a built-in word (row {} column {})", name.text, name.row(), name.column()),
            ));
        }
        if !self.identifiers.insert(name.text.clone()) {
            return Err(ForthError::at(
                ErrorKind::Redefinition,
                name.span,
                format!("'{}' is already defined (row {} column {})", name.text, name.row(), name.column()),
            )
            .with_help("Variables, arrays and functions share one namespace; pick a different name."));
        }
        self.advance();
        Ok(name)
    }

    fn integer_literal(&self, lexeme: &Lexeme) -> Result<i64> {
        if is_integer(&lexeme.text) {
            if let Ok(value) = lexeme.text.parse::<i64>() {
                return Ok(value);
            }
        }
        Err(ForthError::at(
            ErrorKind::NotInteger,
            lexeme.span,
            format!("expected an integer literal but got '{}' at row {} column {}", lexeme.text, lexeme.row(), lexeme.column()),
        ))
    }

    /// Every identifier anywhere in the program must have been declared by
    /// the time parsing ends; this is what lets a call precede its definition.
    fn check_identifiers(&self) -> Result<()> {
        let undefined = self
            .lexemes
            .iter()
            .find(|l| {
                l.kind == LexemeKind::Identifier
                    && !self.identifiers.contains(&l.text)
                    && !is_builtin(&l.text)
            });

        match undefined {
            Some(lexeme) => Err(ForthError::at(
                ErrorKind::UndefinedIdentifier,
                lexeme.span,
                format!("undefined identifier '{}' at row {} column {}", lexeme.text, lexeme.row(), lexeme.column()),
            )
            .with_help(format!(
                "Declare it with 'VARIABLE {0}', 'CREATE {0} <n> cells allot' or ': {0} ... ;'.",
                lexeme.text
            ))),
            None => Ok(()),
        }
    }

    fn in_loop<T>(&mut self, parse: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        self.loop_depth += 1;
        let result = parse(self);
        self.loop_depth -= 1;
        result
    }

    fn in_function<T>(&mut self, parse: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        self.function_depth += 1;
        let result = parse(self);
        self.function_depth -= 1;
        result
    }

    fn check(&self, text: &str) -> bool {
        !self.is_at_end() && self.peek().text == text
    }

    fn advance(&mut self) {
        if !self.is_at_end() {
            self.current += 1;
        }
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.lexemes.len()
    }

    fn peek(&self) -> &Lexeme {
        self.lexemes.get(self.current).unwrap_or(&self.end_of_input)
    }

    fn expect(&mut self, text: &str) -> Result<Lexeme> {
        if self.check(text) {
            let lexeme = self.peek().clone();
            self.advance();
            Ok(lexeme)
        } else {
            let found = self.peek();
            Err(ForthError::syntax(found.span, &format!("'{}'", text), &found.text))
        }
    }
}

/// Built-in words resolve whether or not the vocabulary lists them as
/// operators, so their names can never be declared.
fn is_builtin(name: &str) -> bool {
    builtins::table().iter().any(|(word, _)| *word == name)
}
