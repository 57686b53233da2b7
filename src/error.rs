//! Error kinds surfaced by query conversion, planning and execution.

use thiserror::Error;

use crate::parser::ParseError;

pub type QueryResult<T> = Result<T, QueryError>;

/// Every failure aborts the request; no partial output is ever produced.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    // ==================
    // Client Errors (4xx)
    // ==================
    #[error("sql must be provided")]
    SqlRequired,

    #[error("{0}")]
    InvalidSelect(String),

    #[error("{0}")]
    InvalidField(String),

    #[error("{0}")]
    PeriodNotValid(String),

    #[error("{0}")]
    GeostoreNeeded(String),

    #[error("{0}")]
    CoordinatesNeeded(String),

    #[error("{0}")]
    TableNameNotValid(String),

    // ==================
    // Server Errors (5xx)
    // ==================
    #[error("{0}")]
    SqlFormatError(String),

    /// A backend collaborator failed (timeout, transport, malformed reply).
    #[error("Backend error: {0}")]
    Backend(String),
}

impl QueryError {
    pub fn invalid_select() -> Self {
        QueryError::InvalidSelect("Invalid Select".to_string())
    }

    pub fn invalid_field() -> Self {
        QueryError::InvalidField("Invalid Fields".to_string())
    }

    /// HTTP status the request handler answers with.
    pub fn status_code(&self) -> u16 {
        match self {
            QueryError::SqlRequired
            | QueryError::InvalidSelect(_)
            | QueryError::InvalidField(_)
            | QueryError::PeriodNotValid(_)
            | QueryError::GeostoreNeeded(_)
            | QueryError::CoordinatesNeeded(_) => 400,
            QueryError::TableNameNotValid(_) => 404,
            QueryError::SqlFormatError(_) | QueryError::Backend(_) => 500,
        }
    }
}

impl From<ParseError> for QueryError {
    fn from(e: ParseError) -> Self {
        let message = match e.span {
            Some(span) => format!("{} (at {}-{})", e.message, span.start, span.end),
            None => e.message,
        };
        QueryError::SqlFormatError(message)
    }
}
