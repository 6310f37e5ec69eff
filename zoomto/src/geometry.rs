//! Bounding boxes of GeoJSON coordinate arrays.
//!
//! Geometries are not distinguished by their `type` tag. A coordinate array is
//! reduced by nesting depth alone, so Points, LineStrings, Polygons and
//! MultiPolygons all go through the same recursion.

use crate::bbox::{BBox, merge};
use serde_json::Value;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum GeometryError {
    #[error("expected a coordinate array, found {0}")]
    NotAnArray(String),

    #[error("coordinate must contain two numbers, found {0}")]
    InvalidCoordinate(String),
}

/// Computes the bounding box of a GeoJSON `coordinates` member.
///
/// An array whose first element is a number is a coordinate: its first two
/// members are `x` and `y`, further members (elevation) are ignored. Any other
/// array is a sequence of nested coordinate arrays which are reduced
/// recursively and merged. This is the only type dispatch performed.
///
/// Returns `Ok(None)` when the geometry holds no coordinates at all.
pub fn compute_bbox(coordinates: &Value) -> Result<Option<BBox>, GeometryError> {
    let items = coordinates
        .as_array()
        .ok_or_else(|| GeometryError::NotAnArray(coordinates.to_string()))?;

    match items.first() {
        None => Ok(None),
        Some(Value::Number(_)) => coordinate_bbox(items, coordinates).map(Some),
        Some(_) => {
            let mut bbox = None;
            for item in items {
                if let Some(inner) = compute_bbox(item)? {
                    bbox = Some(merge(bbox, inner));
                }
            }
            Ok(bbox)
        }
    }
}

fn coordinate_bbox(items: &[Value], raw: &Value) -> Result<BBox, GeometryError> {
    match (
        items.first().and_then(Value::as_f64),
        items.get(1).and_then(Value::as_f64),
    ) {
        (Some(x), Some(y)) => Ok(BBox::from_point(x, y)),
        _ => Err(GeometryError::InvalidCoordinate(raw.to_string())),
    }
}
