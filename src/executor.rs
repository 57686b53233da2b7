//! Runs a derived plan against the backend and reshapes the columnar results
//! into rows.

use log::debug;
use serde_json::{Map, Value};

use crate::ast::Query;
use crate::backend::{BoundingBox, FieldSchema, RasterBackend};
use crate::error::{QueryError, QueryResult};
use crate::plan::{derive_select_plan, derive_years, is_year_extremum_plan, SelectTerm, YEAR_FIELD};

/// One output record: label -> value, in SELECT order.
pub type Row = Map<String, Value>;

/// Label -> per-year values, in insertion order. Re-inserting a label replaces
/// its values but keeps its original position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultColumns {
    columns: Vec<(String, Vec<Value>)>,
}

impl ResultColumns {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, label: String, values: Vec<Value>) {
        match self.columns.iter_mut().find(|(existing, _)| *existing == label) {
            Some((_, slot)) => *slot = values,
            None => self.columns.push((label, values)),
        }
    }

    /// Row `i` pairs every label with element `i` of its column.
    ///
    /// Columns are equally long by construction; should they differ, the
    /// shortest one bounds the number of rows.
    pub fn into_rows(self) -> Vec<Row> {
        let row_count = self
            .columns
            .iter()
            .map(|(_, values)| values.len())
            .min()
            .unwrap_or(0);

        (0..row_count)
            .map(|i| {
                self.columns
                    .iter()
                    .map(|(label, values)| (label.clone(), values[i].clone()))
                    .collect()
            })
            .collect()
    }
}

impl FromIterator<(String, Vec<Value>)> for ResultColumns {
    fn from_iter<I: IntoIterator<Item = (String, Vec<Value>)>>(iter: I) -> Self {
        let mut columns = ResultColumns::new();
        for (label, values) in iter {
            columns.insert(label, values);
        }
        columns
    }
}

/// Scenario/model pair identifying one dataset on the backend.
#[derive(Debug, Clone, Copy)]
pub struct Dataset<'a> {
    pub scenario: &'a str,
    pub model: &'a str,
}

/// Executes one Select Term after another against a backend.
pub struct QueryExecutor<'a, B: RasterBackend + ?Sized> {
    backend: &'a B,
    dataset: Dataset<'a>,
}

impl<'a, B: RasterBackend + ?Sized> QueryExecutor<'a, B> {
    pub fn new(backend: &'a B, dataset: Dataset<'a>) -> Self {
        Self { backend, dataset }
    }

    /// Answers a `min(year)`/`max(year)` plan from the domain metadata: a
    /// single row, no spatial or temporal execution.
    pub fn resolve_year_extremum(&self, plan: &[SelectTerm]) -> QueryResult<Vec<Row>> {
        let domain = self.backend.domain(self.dataset.scenario, self.dataset.model)?;
        let mut row = Row::new();
        for term in plan {
            let value = domain
                .get(&term.argument)
                .and_then(|extent| extent.get(&term.function))
                .ok_or_else(QueryError::invalid_field)?;
            row.insert(term.label(), value.clone());
        }
        Ok(vec![row])
    }

    /// Runs every term in plan order. The first failing term aborts the whole
    /// query; later terms are never sent to the backend.
    pub fn execute(
        &self,
        plan: &[SelectTerm],
        schema: &FieldSchema,
        years: &[i64],
        bbox: &BoundingBox,
    ) -> QueryResult<ResultColumns> {
        let Dataset { scenario, model } = self.dataset;
        let mut results = ResultColumns::new();

        for term in plan {
            if !schema.contains_key(&term.argument) {
                return Err(QueryError::invalid_field());
            }

            let values = if term.is_temporal_series() && term.argument == YEAR_FIELD {
                years.iter().map(|&year| Value::from(year)).collect()
            } else if term.is_temporal_series() {
                self.backend
                    .temporal_series(scenario, model, years, &term.argument, bbox)?
            } else {
                self.backend
                    .statistic(scenario, model, years, &term.argument, bbox, &term.function)?
            };
            results.insert(term.label(), values);
        }

        debug!("Results: {:?}", results);
        Ok(results)
    }
}

/// Plans `query`, runs it against `backend` and returns the output rows.
///
/// `bbox` is only optional for the `min(year)`/`max(year)` shortcut; any other
/// plan without one fails with `CoordinatesNeeded`, and a plan without a
/// usable period fails with `PeriodNotValid`.
pub fn plan_and_execute<B: RasterBackend + ?Sized>(
    backend: &B,
    dataset: Dataset<'_>,
    query: &Query,
    schema: &FieldSchema,
    bbox: Option<&BoundingBox>,
) -> QueryResult<Vec<Row>> {
    let plan = derive_select_plan(&query.select)?;
    debug!("Select: {:?}", plan);

    let executor = QueryExecutor::new(backend, dataset);
    if is_year_extremum_plan(&plan) {
        return executor.resolve_year_extremum(&plan);
    }

    let bbox = bbox.ok_or_else(|| {
        QueryError::CoordinatesNeeded("No coordinates provided. Include geostore or lat & lon".to_string())
    })?;

    let years = derive_years(query.where_clause.as_ref())?;
    debug!("Years: {:?}", years);
    if years.is_empty() {
        return Err(QueryError::PeriodNotValid("Period of time must be set".to_string()));
    }

    Ok(executor.execute(&plan, schema, &years, bbox)?.into_rows())
}
