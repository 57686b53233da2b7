use serde::{Deserialize, Serialize};

/// AST 的根节点, 代表一条完整的 `SELECT ... FROM ... [WHERE ...]` 语句
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub select: Vec<AstNode>,
    pub from: String,
    #[serde(rename = "where", default, skip_serializing_if = "Option::is_none")]
    pub where_clause: Option<AstNode>,
}

/// 单个子句片段。JSON 形式以 `type` 字段区分节点种类，
/// 与外部 SQL 转换服务输出的格式一致。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AstNode {
    /// 不带引号的标识符, 例如字段名 `tasmax`
    Literal { value: String },
    /// 带引号的字符串常量
    String { value: String },
    /// `*`
    Wildcard { value: String },
    Number { value: i64 },
    /// 函数调用, 例如 `avg(tasmax)`
    Function {
        value: String,
        #[serde(default)]
        arguments: Vec<AstNode>,
    },
    /// 单个比较运算, 例如 `year = 2020`
    Operator {
        #[serde(default)]
        value: String,
        left: Box<AstNode>,
        right: Box<AstNode>,
    },
    /// 逻辑连接 (AND / OR)
    Conditional {
        #[serde(default)]
        value: String,
        left: Box<AstNode>,
        right: Box<AstNode>,
    },
    /// `field BETWEEN a AND b`
    Between {
        #[serde(default)]
        value: String,
        arguments: Vec<AstNode>,
    },
}

impl AstNode {
    pub fn literal(value: impl Into<String>) -> Self {
        AstNode::Literal { value: value.into() }
    }

    pub fn number(value: i64) -> Self {
        AstNode::Number { value }
    }

    pub fn wildcard() -> Self {
        AstNode::Wildcard { value: "*".to_string() }
    }

    pub fn function(name: impl Into<String>, arguments: Vec<AstNode>) -> Self {
        AstNode::Function { value: name.into(), arguments }
    }

    pub fn operator(op: impl Into<String>, left: AstNode, right: AstNode) -> Self {
        AstNode::Operator { value: op.into(), left: Box::new(left), right: Box::new(right) }
    }

    pub fn conditional(op: impl Into<String>, left: AstNode, right: AstNode) -> Self {
        AstNode::Conditional { value: op.into(), left: Box::new(left), right: Box::new(right) }
    }

    pub fn between(field: impl Into<String>, low: AstNode, high: AstNode) -> Self {
        AstNode::Between { value: field.into(), arguments: vec![low, high] }
    }

    /// 节点的 `value`，数字按十进制文本返回
    pub fn value(&self) -> String {
        match self {
            AstNode::Number { value } => value.to_string(),
            AstNode::Literal { value }
            | AstNode::String { value }
            | AstNode::Wildcard { value }
            | AstNode::Function { value, .. }
            | AstNode::Operator { value, .. }
            | AstNode::Conditional { value, .. }
            | AstNode::Between { value, .. } => value.clone(),
        }
    }

    /// 是否为指向给定字段名的标识符
    pub fn is_field(&self, name: &str) -> bool {
        matches!(self, AstNode::Literal { value } if value == name)
    }

    pub fn as_number(&self) -> Option<i64> {
        match self {
            AstNode::Number { value } => Some(*value),
            _ => None,
        }
    }
}
