//! Zoom-to resolution for CCC map clients.
//!
//! Turns a locator query ("zoom to parcel X") into a viewport by probing the
//! datasets configured for the locator type and merging the bounding boxes
//! of the features found.

pub mod bbox;
pub mod data_service;
pub mod geometry;
pub mod metrics_defs;
pub mod resolver;
pub mod template;
pub mod types;

#[cfg(test)]
mod testutils;

pub use bbox::BBox;
pub use data_service::{DEFAULT_PROBE_TIMEOUT, DataServiceClient, DatasetClient, ProbeError};
pub use resolver::{DEFAULT_MAX_CONCURRENT_PROBES, ZoomError, ZoomResolver};
pub use types::{LocatorCatalog, LocatorEntry, ResolvedViewport, ZoomQuery, ZoomResponse, ZoomSettings};
