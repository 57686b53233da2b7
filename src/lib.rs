//! Translates SQL-like queries over NEX-GDDP climate datasets into raster
//! backend calls and reshapes the per-operation results into rows.

pub mod ast;
pub mod backend;
pub mod bbox;
pub mod config;
pub mod error;
pub mod executor;
pub mod lexer;
pub mod memory;
pub mod parser;
pub mod plan;
pub mod service;
pub mod token;

use ast::Query;
use error::QueryResult;
use lexer::Lexer;
use parser::Parser;

/// Converts SQL text into its AST.
pub fn convert(sql: &str) -> QueryResult<Query> {
    let tokens: Vec<_> = Lexer::new(sql).collect();
    Ok(Parser::new(&tokens).parse()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::AstNode;
    use crate::error::QueryError;

    #[test]
    fn test_convert() {
        let query = convert("select avg(tmax) from t where year between 2020 and 2022").unwrap();
        assert_eq!(query.select, vec![AstNode::function("avg", vec![AstNode::literal("tmax")])]);
        assert_eq!(query.from, "t");
    }

    #[test]
    fn test_convert_reports_format_error() {
        assert!(matches!(convert("select avg(tmax) from t where"), Err(QueryError::SqlFormatError(_))));
        assert!(matches!(convert("select ! from t"), Err(QueryError::SqlFormatError(_))));
    }
}
