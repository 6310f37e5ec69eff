//! Axis-aligned bounding boxes in the planar output CRS.

use serde::{Deserialize, Serialize};

/// An axis-aligned bounding box.
///
/// Serialized as the four-element array `[min_x, min_y, max_x, max_y]`, which
/// is the form used both in tenant configuration and in zoomTo responses.
/// Deserialization rejects boxes whose minimum exceeds their maximum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "[f64; 4]", into = "[f64; 4]")]
pub struct BBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BBox {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Degenerate box covering a single coordinate.
    pub fn from_point(x: f64, y: f64) -> Self {
        Self::new(x, y, x, y)
    }

    /// Envelope of `self` and `other`.
    pub fn union(&self, other: &BBox) -> BBox {
        BBox {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    /// Query string form expected by the data service: "minx,miny,maxx,maxy".
    pub fn to_query_string(&self) -> String {
        format!(
            "{},{},{},{}",
            self.min_x, self.min_y, self.max_x, self.max_y
        )
    }
}

/// Merges `b` into the optional running box `a`.
///
/// An absent `a` is the empty box: the result is `b` unchanged.
pub fn merge(a: Option<BBox>, b: BBox) -> BBox {
    match a {
        Some(a) => a.union(&b),
        None => b,
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum BBoxError {
    #[error("Invalid bbox {0:?}: minimum exceeds maximum")]
    Inverted([f64; 4]),

    #[error("Invalid bbox {0:?}: coordinates must be finite")]
    NotFinite([f64; 4]),
}

impl TryFrom<[f64; 4]> for BBox {
    type Error = BBoxError;

    fn try_from(value: [f64; 4]) -> Result<Self, Self::Error> {
        let [min_x, min_y, max_x, max_y] = value;
        if value.iter().any(|v| !v.is_finite()) {
            return Err(BBoxError::NotFinite(value));
        }
        if min_x > max_x || min_y > max_y {
            return Err(BBoxError::Inverted(value));
        }
        Ok(BBox::new(min_x, min_y, max_x, max_y))
    }
}

impl From<BBox> for [f64; 4] {
    fn from(bbox: BBox) -> Self {
        [bbox.min_x, bbox.min_y, bbox.max_x, bbox.max_y]
    }
}
