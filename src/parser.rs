//! SQL 查询的语法分析器
//!
//! ## 解析流程图
//!
//! ```text
//! parse()
//!   ├─ 期望 SELECT → parse_select_item() (逗号分隔)
//!   │                 ├─ "*"            → Wildcard
//!   │                 ├─ ident "(" ... → Function (parse_function_argument)
//!   │                 └─ ident          → Literal
//!   ├─ 期望 FROM   → parse_table_name()
//!   ├─ 可选 WHERE  → parse_condition() (递归下降解析)
//!   │                 └─ parse_or_expression()
//!   │                      └─ parse_and_expression()
//!   │                           └─ parse_primary_expression()
//!   │                                ├─ "(" → 分组表达式 (递归调用parse_condition)
//!   │                                ├─ operand BETWEEN operand AND operand
//!   │                                └─ operand 比较运算符 operand
//!   └─ 可选 ";"，之后必须到达输入末尾
//! ```
//!
//! ## 语法优先级（从高到低）
//!
//! 1. **括号分组** `(expression)`
//! 2. **比较操作 / BETWEEN** `year >= 2000`, `year BETWEEN 2000 AND 2010`
//! 3. **AND操作** `expr1 AND expr2`
//! 4. **OR操作** `expr1 OR expr2`
//!
//! ## 解析示例
//!
//! ```text
//! SELECT avg(tasmax), max(tasmin) FROM rcp45/ACCESS1-0 WHERE year BETWEEN 2020 AND 2030
//! SELECT tasmax, year FROM rcp45 WHERE year >= 2000 AND year <= 2010
//! SELECT max(year), min(year) FROM rcp45
//! ```

use crate::ast::{AstNode, Query};
use crate::token::{Span, Token, TokenKind};

pub struct Parser<'a> {
    tokens: &'a [Token<'a>],
    position: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
    pub span: Option<Span>,
}

impl ParseError {
    fn new(message: String, span: Option<Span>) -> Self {
        Self { message, span }
    }

    fn at_position(message: String, span: Span) -> Self {
        Self { message, span: Some(span) }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.span {
            Some(span) => write!(f, "{} at {}-{}", self.message, span.start, span.end),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for ParseError {}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [Token<'a>]) -> Self {
        Self {
            tokens,
            position: 0,
        }
    }

    /// 返回当前 token，不推进位置
    fn peek(&self) -> Option<&Token<'a>> {
        self.tokens.get(self.position)
    }

    /// 返回下一个 token，不推进位置
    fn peek_next(&self) -> Option<&Token<'a>> {
        self.tokens.get(self.position + 1)
    }

    /// 返回当前 token 并推进位置
    fn advance(&mut self) -> Option<&Token<'a>> {
        if self.position < self.tokens.len() {
            let token = &self.tokens[self.position];
            self.position += 1;
            Some(token)
        } else {
            None
        }
    }

    /// 期望特定类型的 token 并推进，否则返回错误
    fn expect(&mut self, expected: TokenKind) -> Result<&Token<'a>, ParseError> {
        match self.tokens.get(self.position) {
            Some(token) if std::mem::discriminant(&token.kind) == std::mem::discriminant(&expected) => {
                self.position += 1;
                Ok(token)
            }
            Some(token) => Err(ParseError::at_position(
                format!("Expected {:?}, found {:?}", expected, token.kind),
                token.span,
            )),
            None => Err(ParseError::new(
                format!("Expected {:?}, but reached end of input", expected),
                None,
            )),
        }
    }

    /// 检查当前 token 是否匹配给定类型
    fn match_token(&self, kind: &TokenKind) -> bool {
        if let Some(token) = self.peek() {
            std::mem::discriminant(&token.kind) == std::mem::discriminant(kind)
        } else {
            false
        }
    }

    pub fn parse(&mut self) -> Result<Query, ParseError> {
        self.expect(TokenKind::Select)?;

        let mut select = vec![self.parse_select_item()?];
        while self.match_token(&TokenKind::Comma) {
            self.advance(); // 消费 ","
            select.push(self.parse_select_item()?);
        }

        self.expect(TokenKind::From)?;
        let from = self.parse_table_name()?;

        let where_clause = if self.match_token(&TokenKind::Where) {
            self.advance(); // 消费 WHERE
            Some(self.parse_condition()?)
        } else {
            None
        };

        if self.match_token(&TokenKind::Semicolon) {
            self.advance();
        }
        if let Some(token) = self.peek() {
            return Err(ParseError::at_position(
                format!("Unexpected token: {:?}", token.kind),
                token.span,
            ));
        }

        Ok(Query {
            select,
            from,
            where_clause,
        })
    }

    /// 解析 SELECT 列表中的一项
    fn parse_select_item(&mut self) -> Result<AstNode, ParseError> {
        if self.match_token(&TokenKind::Star) {
            self.advance();
            return Ok(AstNode::wildcard());
        }

        let name = self.expect_identifier()?;
        if !self.match_token(&TokenKind::LParen) {
            return Ok(AstNode::literal(name));
        }

        self.advance(); // 消费 (
        let mut arguments = Vec::new();
        if !self.match_token(&TokenKind::RParen) {
            loop {
                arguments.push(self.parse_function_argument()?);
                if self.match_token(&TokenKind::RParen) {
                    break;
                }
                self.expect(TokenKind::Comma)?;
            }
        }
        self.expect(TokenKind::RParen)?;

        // 函数名统一为小写, 以便识别 MAX(year) 之类的写法
        Ok(AstNode::function(name.to_ascii_lowercase(), arguments))
    }

    fn parse_function_argument(&mut self) -> Result<AstNode, ParseError> {
        if self.match_token(&TokenKind::Star) {
            self.advance();
            return Ok(AstNode::wildcard());
        }
        self.parse_operand()
    }

    /// 表名可以是 `scenario/model` 形式的路径或带引号的字符串
    fn parse_table_name(&mut self) -> Result<String, ParseError> {
        if let Some(Token { kind: TokenKind::String(s), .. }) = self.peek() {
            let name = s.to_string();
            self.advance();
            return Ok(name);
        }

        let mut name = self.expect_identifier()?;
        while self.match_token(&TokenKind::Slash) {
            self.advance(); // 消费 "/"
            name.push('/');
            name.push_str(&self.expect_identifier()?);
        }
        Ok(name)
    }

    fn expect_identifier(&mut self) -> Result<String, ParseError> {
        let token = self.expect(TokenKind::Identifier(""))?;
        match &token.kind {
            TokenKind::Identifier(name) => Ok(name.to_string()),
            _ => Err(ParseError::at_position(
                "Expected identifier".to_string(),
                token.span,
            )),
        }
    }

    /// 解析条件表达式的入口点
    ///
    /// 条件解析采用递归下降方式，按照优先级从低到高依次处理：
    /// OR → AND → PRIMARY
    fn parse_condition(&mut self) -> Result<AstNode, ParseError> {
        self.parse_or_expression()
    }

    /// 解析OR表达式 (最低优先级)
    ///
    /// 语法: `and_expr (OR and_expr)*`
    fn parse_or_expression(&mut self) -> Result<AstNode, ParseError> {
        let mut left = self.parse_and_expression()?;

        while self.match_token(&TokenKind::Or) {
            self.advance(); // 消费 OR
            let right = self.parse_and_expression()?;
            left = AstNode::conditional("or", left, right);
        }

        Ok(left)
    }

    /// 解析AND表达式
    ///
    /// 语法: `primary (AND primary)*`
    /// 示例: `year >= 2000 AND year <= 2010`
    fn parse_and_expression(&mut self) -> Result<AstNode, ParseError> {
        let mut left = self.parse_primary_expression()?;

        while self.match_token(&TokenKind::And) {
            self.advance(); // 消费 AND
            let right = self.parse_primary_expression()?;
            left = AstNode::conditional("and", left, right);
        }

        Ok(left)
    }

    /// 解析基础表达式 (最高优先级)
    ///
    /// 支持的表达式类型:
    /// - `(condition)` - 分组表达式
    /// - `operand BETWEEN low AND high` - 区间, BETWEEN 内部的 AND 在此消费
    /// - `operand op operand` - 比较运算
    fn parse_primary_expression(&mut self) -> Result<AstNode, ParseError> {
        if self.match_token(&TokenKind::LParen) {
            self.advance(); // 消费 (
            let expr = self.parse_condition()?;
            self.expect(TokenKind::RParen)?;
            return Ok(expr);
        }

        if matches!(self.peek_next(), Some(Token { kind: TokenKind::Between, .. })) {
            let field = self.parse_operand()?;
            self.advance(); // 消费 BETWEEN
            let low = self.parse_operand()?;
            self.expect(TokenKind::And)?;
            let high = self.parse_operand()?;
            return Ok(AstNode::between(field.value(), low, high));
        }

        let left = self.parse_operand()?;
        let op = self.parse_comparison_operator()?;
        let right = self.parse_operand()?;
        Ok(AstNode::operator(op, left, right))
    }

    fn parse_comparison_operator(&mut self) -> Result<&'static str, ParseError> {
        if let Some(token) = self.advance() {
            token.kind.operator_symbol().ok_or_else(|| {
                ParseError::at_position(
                    format!("Expected comparison operator, found {:?}", token.kind),
                    token.span,
                )
            })
        } else {
            Err(ParseError::new("Expected comparison operator".to_string(), None))
        }
    }

    fn parse_operand(&mut self) -> Result<AstNode, ParseError> {
        if let Some(token) = self.advance() {
            match &token.kind {
                TokenKind::Identifier(s) => Ok(AstNode::literal(*s)),
                TokenKind::Number(n) => Ok(AstNode::number(*n)),
                TokenKind::String(s) => Ok(AstNode::String { value: s.to_string() }),
                _ => Err(ParseError::at_position(
                    format!("Expected field or value, found {:?}", token.kind),
                    token.span,
                )),
            }
        } else {
            Err(ParseError::new("Unexpected end of input".to_string(), None))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;

    fn parse_string(input: &str) -> Result<Query, ParseError> {
        let tokens: Vec<_> = Lexer::new(input).collect();
        Parser::new(&tokens).parse()
    }

    #[test]
    fn test_function_select_with_between() {
        let result = parse_string("select avg(tmax) from t where year between 2020 and 2022").unwrap();

        assert_eq!(result.select, vec![AstNode::function("avg", vec![AstNode::literal("tmax")])]);
        assert_eq!(result.from, "t");
        assert_eq!(
            result.where_clause,
            Some(AstNode::between("year", AstNode::number(2020), AstNode::number(2022)))
        );
    }

    #[test]
    fn test_literal_select_without_where() {
        let result = parse_string("SELECT tasmax, pr FROM rcp45/ACCESS1-0;").unwrap();

        assert_eq!(result.select, vec![AstNode::literal("tasmax"), AstNode::literal("pr")]);
        assert_eq!(result.from, "rcp45/ACCESS1-0");
        assert_eq!(result.where_clause, None);
    }

    #[test]
    fn test_quoted_table_name() {
        let result = parse_string(r#"SELECT * FROM "rcp85/GFDL-CM3""#).unwrap();
        assert_eq!(result.select, vec![AstNode::wildcard()]);
        assert_eq!(result.from, "rcp85/GFDL-CM3");
    }

    #[test]
    fn test_function_name_lowercased() {
        let result = parse_string("SELECT MAX(year), Min(year) FROM t").unwrap();
        assert_eq!(
            result.select,
            vec![
                AstNode::function("max", vec![AstNode::literal("year")]),
                AstNode::function("min", vec![AstNode::literal("year")]),
            ]
        );
    }

    #[test]
    fn test_function_arguments() {
        let result = parse_string("SELECT count(*), percentile(tas, 99), now() FROM t").unwrap();
        assert_eq!(
            result.select,
            vec![
                AstNode::function("count", vec![AstNode::wildcard()]),
                AstNode::function("percentile", vec![AstNode::literal("tas"), AstNode::number(99)]),
                AstNode::function("now", vec![]),
            ]
        );
    }

    #[test]
    fn test_and_condition() {
        let result = parse_string("SELECT tas FROM t WHERE year >= 2000 AND year <= 2010").unwrap();
        assert_eq!(
            result.where_clause,
            Some(AstNode::conditional(
                "and",
                AstNode::operator(">=", AstNode::literal("year"), AstNode::number(2000)),
                AstNode::operator("<=", AstNode::literal("year"), AstNode::number(2010)),
            ))
        );
    }

    #[test]
    fn test_and_binds_tighter_than_or() {
        let result = parse_string("SELECT tas FROM t WHERE year = 1 OR year = 2 AND year = 3").unwrap();
        match result.where_clause {
            Some(AstNode::Conditional { value, right, .. }) => {
                assert_eq!(value, "or");
                assert!(matches!(*right, AstNode::Conditional { ref value, .. } if value == "and"));
            }
            other => panic!("Expected OR conditional, got {:?}", other),
        }
    }

    #[test]
    fn test_grouped_condition() {
        let result = parse_string("SELECT tas FROM t WHERE (2030 = year)").unwrap();
        assert_eq!(
            result.where_clause,
            Some(AstNode::operator("=", AstNode::number(2030), AstNode::literal("year")))
        );
    }

    #[test]
    fn test_syntax_errors() {
        assert!(parse_string("").is_err());
        assert!(parse_string("SELECT FROM t").is_err());
        assert!(parse_string("SELECT tas").is_err());
        assert!(parse_string("SELECT tas FROM t WHERE year").is_err());
        assert!(parse_string("SELECT tas FROM t WHERE year BETWEEN 2000 2010").is_err());
        assert!(parse_string("SELECT avg(tas,) FROM t").is_err());
    }

    #[test]
    fn test_trailing_tokens_rejected() {
        let err = parse_string("SELECT tas FROM t LIMIT 5").unwrap_err();
        assert!(err.message.contains("Unexpected token"));
        assert_eq!(err.span, Some(Span::new(18, 23)));
    }
}
