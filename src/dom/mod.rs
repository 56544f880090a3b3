//! Page model for documents split across shadow-root boundaries.

mod locator;
mod snapshot;

pub use locator::{BoundaryForest, BoundaryId, LocateError, Located, Locator};
pub use snapshot::{FoundElement, PageSnapshot, ParsedDom, SnapshotError, BOUNDARY_ATTRIBUTE};
