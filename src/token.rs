//! The token definition for the SQL subset accepted by the query endpoint.

/// A token is a single unit of the language, with a specific kind and location.
#[derive(Debug, Clone, PartialEq)]
pub struct Token<'a> {
    pub kind: TokenKind<'a>,
    pub span: Span,
}

/// The kind of a token.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind<'a> {
    // Keywords
    Select,  // "SELECT"
    From,    // "FROM"
    Where,   // "WHERE"
    And,     // "AND"
    Or,      // "OR"
    Between, // "BETWEEN"

    // Literals
    Identifier(&'a str),
    String(&'a str), // Content between the quotes
    Number(i64),

    // Punctuation
    LParen,    // (
    RParen,    // )
    Comma,     // ,
    Star,      // *
    Semicolon, // ;
    Slash,     // /

    // Operators
    Eq,    // =
    NotEq, // != or <>
    Gt,    // >
    Lt,    // <
    Gte,   // >=
    Lte,   // <=

    // Special
    Illegal, // An illegal/unknown character
}

impl TokenKind<'_> {
    /// Operator spelling as it appears in the AST `value` of an operator node.
    pub fn operator_symbol(&self) -> Option<&'static str> {
        match self {
            TokenKind::Eq => Some("="),
            TokenKind::NotEq => Some("!="),
            TokenKind::Gt => Some(">"),
            TokenKind::Lt => Some("<"),
            TokenKind::Gte => Some(">="),
            TokenKind::Lte => Some("<="),
            _ => None,
        }
    }
}

/// Represents a span in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    /// The starting byte offset.
    pub start: usize,
    /// The ending byte offset.
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}
