//! The lexer.

use derive_more::Display;
use regex::Regex;

/// Tokens in the program
#[derive(Clone, Copy, PartialEq, Eq, Hash, Display)]
#[display("kind: '{kind}', part of input: '{text}'")]
pub struct Token<'src> {
    /// What token class this token belongs to.
    pub(crate) kind: TokenKind,
    /// What part of the input this token carries.
    pub(crate) text: &'src str,
}

/// Token classes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Display)]
pub(crate) enum TokenKind {
    #[display("id")]
    Id,
    #[display("num")]
    Num,
    #[display(":=")]
    Assign,
    #[display("$print")]
    Print,
    #[display("$read")]
    Read,
    #[display("$if")]
    If,
    #[display("{{")]
    LBrace,
    #[display("}}")]
    RBrace,
    #[display("+")]
    Plus,
    #[display("-")]
    Minus,
    #[display("*")]
    Mul,
    #[display("/")]
    Div,
    #[display("<")]
    Lt,
}

pub struct LexError(usize, char);

impl std::fmt::Display for LexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Lexer error: unexpected character {:?} at {}", self.1, self.0)
    }
}

impl std::fmt::Debug for LexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Lexer error: unexpected character {:?} at {}", self.1, self.0)
    }
}

pub struct Lexer<'input> {
    input: &'input str,
    pos: usize,
    whitespace: Regex,
    matchers: Vec<(Regex, TokenKind)>,
}

impl<'input> Lexer<'input> {
    pub fn new(input: &'input str) -> Self {
        Lexer {
            input,
            pos: 0,
            whitespace: Regex::new(r"\A(?:[ \t\f\r\n\v]|(?://.*))*").unwrap(),
            matchers: vec![
                (Regex::new(r"\A\$print\b").unwrap(), TokenKind::Print),
                (Regex::new(r"\A\$read\b").unwrap(), TokenKind::Read),
                (Regex::new(r"\A\$if\b").unwrap(), TokenKind::If),
                (Regex::new(r"\A:=").unwrap(), TokenKind::Assign),
                (Regex::new(r"\A\{").unwrap(), TokenKind::LBrace),
                (Regex::new(r"\A\}").unwrap(), TokenKind::RBrace),
                (Regex::new(r"\A\+").unwrap(), TokenKind::Plus),
                (Regex::new(r"\A-").unwrap(), TokenKind::Minus),
                (Regex::new(r"\A\*").unwrap(), TokenKind::Mul),
                (Regex::new(r"\A/").unwrap(), TokenKind::Div),
                (Regex::new(r"\A<").unwrap(), TokenKind::Lt),
                (Regex::new(r"\A[0-9]+").unwrap(), TokenKind::Num),
                (Regex::new(r"\A[A-Za-z_][A-Za-z0-9_]*").unwrap(), TokenKind::Id),
            ],
        }
    }

    /// Has the lexer reached the end of input?
    pub fn end_of_input(&self) -> bool {
        self.pos == self.input.len()
    }

    // Skip comments and whitespace
    fn skip_whitespace(&mut self) {
        if let Some(m) = self.whitespace.find(&self.input[self.pos..]) {
            self.pos += m.end()
        }
    }

    /// Get the next token if possible.
    ///
    /// The return type distinguishes between end-of-input and lexer error.
    pub fn next(&mut self) -> Result<Option<Token<'input>>, LexError> {
        self.skip_whitespace();
        if self.end_of_input() {
            return Ok(None);
        }
        let rest = &self.input[self.pos..];
        for (regex, kind) in &self.matchers {
            if let Some(m) = regex.find(rest) {
                let text = m.as_str();
                self.pos += m.end();
                return Ok(Some(Token { kind: *kind, text }));
            }
        }
        let bad = rest.chars().next().unwrap();
        Err(LexError(self.pos, bad))
    }
}
