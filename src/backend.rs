//! Narrow interfaces to the collaborators the query core depends on.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::QueryResult;

/// Spatial extent in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl BoundingBox {
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self { west, south, east, north }
    }

    /// Degenerate box around a single point.
    pub fn point(lat: f64, lon: f64) -> Self {
        Self::new(lon, lat, lon, lat)
    }
}

/// Field name -> descriptor (e.g. `{"type": "number"}`), in schema order.
pub type FieldSchema = Map<String, Value>;

/// Known extent of one dataset dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainExtent {
    pub min: Value,
    pub max: Value,
}

impl DomainExtent {
    /// Looks up the extremum named by an aggregation function (`min` or `max`).
    pub fn get(&self, function: &str) -> Option<&Value> {
        match function {
            "min" => Some(&self.min),
            "max" => Some(&self.max),
            _ => None,
        }
    }
}

/// Field name -> extent.
pub type Domain = std::collections::HashMap<String, DomainExtent>;

/// The raster time-series store queried per Select Term.
///
/// Implementations report an unknown `scenario/model` pair with
/// `TableNameNotValid` and an unusable period with `PeriodNotValid`; transport
/// failures and timeouts surface as `Backend`.
pub trait RasterBackend {
    fn field_schema(&self, scenario: &str, model: &str) -> QueryResult<FieldSchema>;

    fn domain(&self, scenario: &str, model: &str) -> QueryResult<Domain>;

    /// One value of `function` over `bbox` per year.
    fn statistic(
        &self,
        scenario: &str,
        model: &str,
        years: &[i64],
        field: &str,
        bbox: &BoundingBox,
        function: &str,
    ) -> QueryResult<Vec<Value>>;

    /// One raw value of `field` over `bbox` per year.
    fn temporal_series(
        &self,
        scenario: &str,
        model: &str,
        years: &[i64],
        field: &str,
        bbox: &BoundingBox,
    ) -> QueryResult<Vec<Value>>;
}

/// Resolves a geostore identifier to its bounding box.
pub trait GeostoreResolver {
    fn bounding_box(&self, geostore_id: &str) -> QueryResult<Option<BoundingBox>>;
}

/// The external dataset catalog notified when a dataset registration finishes.
pub trait DatasetCatalog {
    fn patch_dataset(&self, dataset_id: &str, body: &Value) -> QueryResult<Value>;
}
