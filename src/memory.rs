//! In-memory collaborators backed by a [`DatasetConfig`], used by the shell and tests.
//!
//! Fixture samples are not georeferenced: a bounding box is required by the
//! query core but does not narrow the samples.

use serde_json::Value;
use std::cell::RefCell;
use std::collections::BTreeMap;

use crate::backend::{BoundingBox, DatasetCatalog, Domain, FieldSchema, GeostoreResolver, RasterBackend};
use crate::config::{DatasetConfig, DatasetFixture};
use crate::error::{QueryError, QueryResult};

pub struct MemoryBackend {
    config: DatasetConfig,
}

impl MemoryBackend {
    pub fn new(config: DatasetConfig) -> Self {
        Self { config }
    }

    fn dataset(&self, scenario: &str, model: &str) -> QueryResult<&DatasetFixture> {
        self.config
            .datasets
            .get(&format!("{}/{}", scenario, model))
            .ok_or_else(|| QueryError::TableNameNotValid("Table name not valid".to_string()))
    }

    /// Samples of `field` for every requested year, in year order.
    fn samples<'a>(
        &'a self,
        scenario: &str,
        model: &str,
        years: &[i64],
        field: &str,
    ) -> QueryResult<Vec<&'a [f64]>> {
        let series: &BTreeMap<i64, Vec<f64>> = self
            .dataset(scenario, model)?
            .series
            .get(field)
            .ok_or_else(QueryError::invalid_field)?;

        years
            .iter()
            .map(|year| {
                series
                    .get(year)
                    .map(Vec::as_slice)
                    .ok_or_else(|| QueryError::PeriodNotValid(format!("Year {} not available", year)))
            })
            .collect()
    }
}

/// Reduces one year's samples with the named aggregation function.
fn reduce(function: &str, samples: &[f64]) -> QueryResult<Value> {
    let value = match function {
        "count" => return Ok(Value::from(samples.len())),
        "sum" => samples.iter().sum(),
        "avg" => {
            if samples.is_empty() {
                return Ok(Value::Null);
            }
            samples.iter().sum::<f64>() / samples.len() as f64
        }
        "max" => match samples.iter().copied().reduce(f64::max) {
            Some(max) => max,
            None => return Ok(Value::Null),
        },
        "min" => match samples.iter().copied().reduce(f64::min) {
            Some(min) => min,
            None => return Ok(Value::Null),
        },
        other => {
            return Err(QueryError::InvalidSelect(format!("Unsupported function {}", other)));
        }
    };
    Ok(Value::from(value))
}

impl RasterBackend for MemoryBackend {
    fn field_schema(&self, scenario: &str, model: &str) -> QueryResult<FieldSchema> {
        Ok(self.dataset(scenario, model)?.fields.clone())
    }

    fn domain(&self, scenario: &str, model: &str) -> QueryResult<Domain> {
        Ok(self.dataset(scenario, model)?.domain.clone())
    }

    fn statistic(
        &self,
        scenario: &str,
        model: &str,
        years: &[i64],
        field: &str,
        _bbox: &BoundingBox,
        function: &str,
    ) -> QueryResult<Vec<Value>> {
        self.samples(scenario, model, years, field)?
            .into_iter()
            .map(|samples| reduce(function, samples))
            .collect()
    }

    fn temporal_series(
        &self,
        scenario: &str,
        model: &str,
        years: &[i64],
        field: &str,
        _bbox: &BoundingBox,
    ) -> QueryResult<Vec<Value>> {
        self.samples(scenario, model, years, field)?
            .into_iter()
            .map(|samples| reduce("avg", samples))
            .collect()
    }
}

impl GeostoreResolver for MemoryBackend {
    fn bounding_box(&self, geostore_id: &str) -> QueryResult<Option<BoundingBox>> {
        Ok(self.config.geostores.get(geostore_id).copied())
    }
}

/// Catalog that keeps every PATCH it receives and echoes the body back.
#[derive(Debug, Default)]
pub struct RecordingCatalog {
    patches: RefCell<Vec<(String, Value)>>,
}

impl RecordingCatalog {
    pub fn patches(&self) -> Vec<(String, Value)> {
        self.patches.borrow().clone()
    }
}

impl DatasetCatalog for RecordingCatalog {
    fn patch_dataset(&self, dataset_id: &str, body: &Value) -> QueryResult<Value> {
        self.patches.borrow_mut().push((dataset_id.to_string(), body.clone()));
        Ok(body.clone())
    }
}
