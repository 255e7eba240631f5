//! Spatial filter validation and encoding.
//!
//! CMR spatial filters are flat comma-joined coordinate sequences in
//! `lon,lat` order. Validation covers shape only (arity, ring closure);
//! whether the geometry intersects anything is the server's business.

use crate::error::{CmrError, CmrResult};

fn join_pairs(coordinates: &[(f64, f64)]) -> String {
    coordinates
        .iter()
        .flat_map(|(lon, lat)| [lon.to_string(), lat.to_string()])
        .collect::<Vec<_>>()
        .join(",")
}

/// Encode a geographic point as `lon,lat`.
pub(crate) fn encode_point(lon: f64, lat: f64) -> String {
    format!("{},{}", lon, lat)
}

/// Encode a circle as `lon,lat,radius_meters`.
pub(crate) fn encode_circle(lon: f64, lat: f64, dist: f64) -> String {
    format!("{},{},{}", lon, lat, dist)
}

/// Encode a bounding box as `west,south,east,north`.
pub(crate) fn encode_bounding_box(
    lower_left_lon: f64,
    lower_left_lat: f64,
    upper_right_lon: f64,
    upper_right_lat: f64,
) -> String {
    format!(
        "{},{},{},{}",
        lower_left_lon, lower_left_lat, upper_right_lon, upper_right_lat
    )
}

/// Validate and encode a polygon ring.
///
/// Requires at least 4 coordinate pairs with the last pair equal to the
/// first (ring closure).
pub(crate) fn encode_polygon(coordinates: &[(f64, f64)]) -> CmrResult<String> {
    if coordinates.len() < 4 {
        return Err(CmrError::invalid(
            "polygon",
            format!(
                "a polygon requires at least 4 coordinate pairs; got {}",
                coordinates.len()
            ),
        ));
    }

    let first = coordinates[0];
    let last = coordinates[coordinates.len() - 1];
    if first != last {
        return Err(CmrError::invalid(
            "polygon",
            format!(
                "the last pair must match the first to close the ring: {:?} != {:?}",
                first, last
            ),
        ));
    }

    Ok(join_pairs(coordinates))
}

/// Validate and encode a connecting line.
///
/// Requires at least 2 coordinate pairs.
pub(crate) fn encode_line(coordinates: &[(f64, f64)]) -> CmrResult<String> {
    if coordinates.len() < 2 {
        return Err(CmrError::invalid(
            "line",
            format!(
                "a line requires at least 2 coordinate pairs; got {}",
                coordinates.len()
            ),
        ));
    }

    Ok(join_pairs(coordinates))
}
