//! Bounding-box resolution from a geostore id or an explicit lat/lon pair.

use log::debug;

use crate::backend::{BoundingBox, GeostoreResolver};
use crate::error::{QueryError, QueryResult};

/// Location parameters of an incoming request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocationParams {
    pub geostore: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

fn coordinates_needed(detail: &str) -> QueryError {
    QueryError::CoordinatesNeeded(detail.to_string())
}

/// A geostore id takes precedence over coordinates. Returns `Ok(None)` when the
/// request carries no location at all; whether that is acceptable depends on
/// the query.
pub fn resolve_bounding_box<G: GeostoreResolver + ?Sized>(
    params: &LocationParams,
    resolver: &G,
) -> QueryResult<Option<BoundingBox>> {
    if let Some(geostore) = params.geostore.as_deref() {
        debug!("Resolving geostore {}", geostore);
        return match resolver.bounding_box(geostore)? {
            Some(bbox) => Ok(Some(bbox)),
            None => Err(QueryError::GeostoreNeeded(format!("Geostore {} not found", geostore))),
        };
    }

    match (params.lat, params.lon) {
        (None, None) => Ok(None),
        (Some(lat), Some(lon)) => {
            if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
                return Err(coordinates_needed("Coordinates out of range"));
            }
            Ok(Some(BoundingBox::point(lat, lon)))
        }
        _ => Err(coordinates_needed("Both lat and lon must be provided")),
    }
}
