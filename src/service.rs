//! Request handlers behind the `query`, `fields` and dataset registration
//! endpoints. Each returns a status code and a JSON body; transport is left to
//! the caller.

use log::{debug, error, info};
use serde::Serialize;
use serde_json::{json, Value};

use crate::backend::{DatasetCatalog, GeostoreResolver, RasterBackend};
use crate::bbox::{resolve_bounding_box, LocationParams};
use crate::error::{QueryError, QueryResult};
use crate::executor::{plan_and_execute, Dataset, Row};

/// Status code plus JSON body, ready to be written by a transport layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    pub fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }

    pub fn error(err: &QueryError) -> Self {
        let status = err.status_code();
        Self {
            status,
            body: json!({"errors": [{"status": status, "detail": err.to_string()}]}),
        }
    }
}

impl From<QueryResult<Value>> for ApiResponse {
    fn from(result: QueryResult<Value>) -> Self {
        match result {
            Ok(body) => ApiResponse::ok(body),
            Err(e) => ApiResponse::error(&e),
        }
    }
}

/// An incoming query: the dataset's table name, the SQL text and where to look.
#[derive(Debug, Clone, Default)]
pub struct QueryRequest {
    pub table_name: String,
    pub sql: Option<String>,
    pub location: LocationParams,
}

/// Splits `scenario/model`.
pub fn split_table_name(table_name: &str) -> QueryResult<Dataset<'_>> {
    match table_name.split('/').collect::<Vec<_>>().as_slice() {
        &[scenario, model] if !scenario.is_empty() && !model.is_empty() => Ok(Dataset { scenario, model }),
        _ => Err(QueryError::TableNameNotValid("Nexgddp tableName Not Valid".to_string())),
    }
}

pub struct QueryService<B> {
    backend: B,
}

impl<B: RasterBackend + GeostoreResolver> QueryService<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Answers `{"data": rows}`.
    pub fn query(&self, request: &QueryRequest) -> ApiResponse {
        info!("Doing query of table {}", request.table_name);
        self.run_query(request)
            .map(|rows| json!({ "data": rows }))
            .into()
    }

    fn run_query(&self, request: &QueryRequest) -> QueryResult<Vec<Row>> {
        let bbox = resolve_bounding_box(&request.location, &self.backend)?;

        let sql = match request.sql.as_deref().map(str::trim) {
            Some(sql) if !sql.is_empty() => sql,
            _ => return Err(QueryError::SqlRequired),
        };
        let dataset = split_table_name(&request.table_name)?;

        let query = crate::convert(sql).inspect_err(|e| error!("{}", e))?;
        debug!("Query AST: {:?}", query);

        let schema = self.backend.field_schema(dataset.scenario, dataset.model)?;
        plan_and_execute(&self.backend, dataset, &query, &schema, bbox.as_ref())
    }

    /// Answers `{"tableName": ..., "fields": {...}}`.
    pub fn fields(&self, table_name: &str) -> ApiResponse {
        info!("Getting fields of table {}", table_name);
        let result = split_table_name(table_name)
            .and_then(|dataset| self.backend.field_schema(dataset.scenario, dataset.model))
            .map(|fields| json!({ "tableName": table_name, "fields": fields }));
        result.into()
    }

    /// Validates a new dataset and reports the outcome to the catalog with
    /// `{"status": 1}` or `{"status": 2, "errorMessage": ...}`. The catalog's
    /// reply is returned with status 200 either way.
    pub fn register_dataset<C: DatasetCatalog + ?Sized>(
        &self,
        catalog: &C,
        connector_id: &str,
        table_name: &str,
    ) -> ApiResponse {
        info!("Registering new dataset {}", table_name);

        let body = match split_table_name(table_name) {
            Err(e) => {
                error!("{}", e);
                json!({"status": 2, "errorMessage": e.to_string()})
            }
            Ok(dataset) => match self.backend.field_schema(dataset.scenario, dataset.model) {
                Ok(_) => json!({"status": 1}),
                Err(e) => {
                    error!("Error validating dataset {}: {}", table_name, e);
                    json!({"status": 2, "errorMessage": "Error Validating Nexgddp Dataset"})
                }
            },
        };

        catalog.patch_dataset(connector_id, &body).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatasetConfig;
    use crate::memory::{MemoryBackend, RecordingCatalog};

    const TABLE: &str = "historical/ACCESS1-0";

    fn service() -> QueryService<MemoryBackend> {
        QueryService::new(MemoryBackend::new(DatasetConfig::sample()))
    }

    fn request(sql: &str) -> QueryRequest {
        QueryRequest {
            table_name: TABLE.to_string(),
            sql: Some(sql.to_string()),
            location: LocationParams { geostore: Some("sample".to_string()), ..Default::default() },
        }
    }

    fn detail(response: &ApiResponse) -> &str {
        response.body["errors"][0]["detail"].as_str().unwrap()
    }

    #[test]
    fn test_split_table_name() {
        let dataset = split_table_name("rcp45/ACCESS1-0").unwrap();
        assert_eq!((dataset.scenario, dataset.model), ("rcp45", "ACCESS1-0"));
        assert!(split_table_name("rcp45").is_err());
        assert!(split_table_name("a/b/c").is_err());
        assert!(split_table_name("/b").is_err());
    }

    #[test]
    fn test_aggregation_query() {
        let response = service().query(&request(
            "SELECT avg(tasmax), max(pr) FROM historical WHERE year BETWEEN 2000 AND 2001",
        ));
        assert_eq!(response.status, 200);
        assert_eq!(
            response.body,
            json!({"data": [
                {"avg(tasmax)": 21.0, "max(pr)": 3.0},
                {"avg(tasmax)": 22.0, "max(pr)": 4.0},
            ]})
        );
    }

    #[test]
    fn test_temporal_series_query() {
        let response = service().query(&request(
            "SELECT year, tasmax FROM historical WHERE year >= 2004 AND year <= 2005",
        ));
        assert_eq!(response.status, 200);
        assert_eq!(
            response.body,
            json!({"data": [{"year": 2004, "tasmax": 25.0}, {"year": 2005, "tasmax": 26.0}]})
        );
    }

    #[test]
    fn test_year_extremum_query_without_location() {
        let mut req = request("SELECT max(year), min(year) FROM historical");
        req.location = LocationParams::default();
        let response = service().query(&req);
        assert_eq!(response.status, 200);
        assert_eq!(response.body, json!({"data": [{"max(year)": 2005, "min(year)": 2000}]}));
    }

    #[test]
    fn test_missing_sql() {
        let mut req = request("");
        assert_eq!(service().query(&req).status, 400);
        req.sql = None;
        let response = service().query(&req);
        assert_eq!(response.status, 400);
        assert_eq!(detail(&response), "sql must be provided");
    }

    #[test]
    fn test_malformed_sql() {
        let response = service().query(&request("SELECT FROM"));
        assert_eq!(response.status, 500);
    }

    #[test]
    fn test_invalid_select() {
        let response = service().query(&request("SELECT * FROM historical WHERE year = 2000"));
        assert_eq!(response.status, 400);
        assert_eq!(detail(&response), "Invalid Select");
    }

    #[test]
    fn test_invalid_field() {
        let response = service().query(&request("SELECT avg(humidity) FROM historical WHERE year = 2000"));
        assert_eq!(response.status, 400);
        assert_eq!(detail(&response), "Invalid Fields");
    }

    #[test]
    fn test_missing_location() {
        let mut req = request("SELECT avg(tasmax) FROM historical WHERE year = 2000");
        req.location = LocationParams::default();
        let response = service().query(&req);
        assert_eq!(response.status, 400);
        assert_eq!(detail(&response), "No coordinates provided. Include geostore or lat & lon");
    }

    #[test]
    fn test_missing_period() {
        let response = service().query(&request("SELECT avg(tasmax) FROM historical"));
        assert_eq!(response.status, 400);
        assert_eq!(detail(&response), "Period of time must be set");
    }

    #[test]
    fn test_period_too_long() {
        let response = service().query(&request(
            "SELECT avg(tasmax) FROM historical WHERE year BETWEEN 0 AND 9223372036854775807",
        ));
        assert_eq!(response.status, 400);

        let response = service().query(&request(
            "SELECT tasmax FROM historical WHERE year >= -9000000000000000000 AND year <= 9000000000000000000",
        ));
        assert_eq!(response.status, 400);
        assert_eq!(detail(&response), "Period of time must not exceed 1000 years");
    }

    #[test]
    fn test_period_outside_dataset() {
        let response = service().query(&request("SELECT avg(tasmax) FROM historical WHERE year = 1990"));
        assert_eq!(response.status, 400);
    }

    #[test]
    fn test_unknown_table() {
        let mut req = request("SELECT avg(tasmax) FROM x WHERE year = 2000");
        req.table_name = "rcp85/unknown".to_string();
        assert_eq!(service().query(&req).status, 404);
    }

    #[test]
    fn test_fields() {
        let response = service().fields(TABLE);
        assert_eq!(response.status, 200);
        assert_eq!(response.body["tableName"], json!(TABLE));
        assert_eq!(response.body["fields"]["tasmax"], json!({"type": "number"}));
        assert_eq!(service().fields("bad").status, 404);
    }

    #[test]
    fn test_register_valid_dataset() {
        let catalog = RecordingCatalog::default();
        let response = service().register_dataset(&catalog, "dataset-1", TABLE);
        assert_eq!(response, ApiResponse::ok(json!({"status": 1})));
        assert_eq!(catalog.patches(), vec![("dataset-1".to_string(), json!({"status": 1}))]);
    }

    #[test]
    fn test_register_invalid_dataset() {
        let catalog = RecordingCatalog::default();

        let response = service().register_dataset(&catalog, "d1", "no-slash");
        assert_eq!(response.status, 200);
        assert_eq!(response.body, json!({"status": 2, "errorMessage": "Nexgddp tableName Not Valid"}));

        let response = service().register_dataset(&catalog, "d2", "rcp85/unknown");
        assert_eq!(
            response.body,
            json!({"status": 2, "errorMessage": "Error Validating Nexgddp Dataset"})
        );
        assert_eq!(catalog.patches().len(), 2);
    }
}
