//! Query plan derivation: which backend operations a SELECT asks for, and which
//! years its WHERE clause covers.

use log::debug;

use crate::ast::AstNode;
use crate::error::{QueryError, QueryResult};

/// Pseudo-function for a bare field reference: one raw value per year.
pub const TEMPORAL_SERIES: &str = "temporal_series";

/// The implicit time dimension of every dataset.
pub const YEAR_FIELD: &str = "year";

/// One requested operation, e.g. `avg(tasmax)` or the temporal series of `pr`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectTerm {
    pub function: String,
    pub argument: String,
}

impl SelectTerm {
    pub fn new(function: impl Into<String>, argument: impl Into<String>) -> Self {
        Self { function: function.into(), argument: argument.into() }
    }

    pub fn temporal_series(argument: impl Into<String>) -> Self {
        Self::new(TEMPORAL_SERIES, argument)
    }

    pub fn is_temporal_series(&self) -> bool {
        self.function == TEMPORAL_SERIES
    }

    /// Column label in the output rows.
    pub fn label(&self) -> String {
        if self.is_temporal_series() {
            self.argument.clone()
        } else {
            format!("{}({})", self.function, self.argument)
        }
    }

    fn is_year_extremum(&self) -> bool {
        (self.function == "max" || self.function == "min") && self.argument == YEAR_FIELD
    }
}

/// Non-empty, ordered, never mixing reductions with temporal series.
pub type SelectPlan = Vec<SelectTerm>;

fn function_term(node: &AstNode) -> Option<SelectTerm> {
    match node {
        AstNode::Function { value, arguments } => arguments
            .first()
            .map(|first| SelectTerm::new(value.clone(), first.value())),
        _ => None,
    }
}

fn literal_term(node: &AstNode) -> Option<SelectTerm> {
    match node {
        AstNode::Literal { value } => Some(SelectTerm::temporal_series(value.clone())),
        _ => None,
    }
}

/// Derives the ordered list of operations requested by a SELECT clause.
///
/// Reductions (`avg(x)`) and temporal series (`x`) have different result
/// cardinalities, so a clause mixing both is rejected, as is `SELECT *`, an
/// empty selection and any term whose argument is `*`.
pub fn derive_select_plan(select: &[AstNode]) -> QueryResult<SelectPlan> {
    if let [only] = select {
        if only.value() == "*" {
            debug!("Wildcard selection is not allowed");
            return Err(QueryError::invalid_select());
        }
    }

    let functions: Vec<Option<SelectTerm>> = select.iter().map(function_term).collect();
    let literals: Vec<Option<SelectTerm>> = select.iter().map(literal_term).collect();

    if functions.iter().any(Option::is_some) && literals.iter().any(Option::is_some) {
        debug!("Provided functions and literals at the same time");
        return Err(QueryError::invalid_select());
    }

    let plan: SelectPlan = functions.into_iter().chain(literals).flatten().collect();
    if plan.is_empty() {
        return Err(QueryError::invalid_select());
    }
    if plan.iter().any(|term| term.argument == "*") {
        debug!("Wildcard argument is not allowed");
        return Err(QueryError::invalid_select());
    }

    Ok(plan)
}

/// Longest period, in years, a single query may cover.
pub const MAX_PERIOD_YEARS: i64 = 1000;

/// Inclusive `low..=high`; empty when the bounds are reversed.
fn year_range(low: i64, high: i64) -> QueryResult<Vec<i64>> {
    if high < low {
        return Ok(Vec::new());
    }
    match high.checked_sub(low) {
        Some(span) if span < MAX_PERIOD_YEARS => Ok((low..=high).collect()),
        _ => Err(QueryError::PeriodNotValid(format!(
            "Period of time must not exceed {} years",
            MAX_PERIOD_YEARS
        ))),
    }
}

/// Derives the ascending, inclusive list of years the WHERE clause covers.
///
/// An empty result means no period was given; a period longer than
/// [`MAX_PERIOD_YEARS`] fails with `PeriodNotValid`.
pub fn derive_years(where_clause: Option<&AstNode>) -> QueryResult<Vec<i64>> {
    match where_clause {
        None => Ok(Vec::new()),
        Some(AstNode::Between { arguments, .. }) => match arguments.as_slice() {
            // Bounds are taken in argument order; reversed bounds give no years.
            [low, high] => match (low.as_number(), high.as_number()) {
                (Some(low), Some(high)) => year_range(low, high),
                _ => Ok(Vec::new()),
            },
            _ => Ok(Vec::new()),
        },
        Some(node @ (AstNode::Conditional { .. } | AstNode::Operator { .. })) => {
            let mut years = collect_years(node, Vec::new());
            years.sort_unstable();
            match (years.first(), years.last()) {
                (Some(&first), Some(&last)) if years.len() > 1 => year_range(first, last),
                _ => Ok(years),
            }
        }
        Some(_) => Ok(Vec::new()),
    }
}

/// Walks `conditional`/`operator` nodes collecting the numbers compared
/// against `year`, left to right.
fn collect_years(node: &AstNode, mut years: Vec<i64>) -> Vec<i64> {
    match node {
        AstNode::Operator { left, right, .. } => {
            let sibling = if left.is_field(YEAR_FIELD) {
                Some(right)
            } else if right.is_field(YEAR_FIELD) {
                Some(left)
            } else {
                None
            };
            if let Some(year) = sibling.and_then(|node| node.as_number()) {
                years.push(year);
            }
            years
        }
        AstNode::Conditional { left, right, .. } => {
            let years = collect_years(left, years);
            collect_years(right, years)
        }
        _ => years,
    }
}

/// True when every term is `max(year)` or `min(year)`: answerable from the
/// dataset's domain metadata alone, without a bounding box or a period.
pub fn is_year_extremum_plan(plan: &[SelectTerm]) -> bool {
    !plan.is_empty() && plan.iter().all(SelectTerm::is_year_extremum)
}
