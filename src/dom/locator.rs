//! Boundary-crossing element search.
//!
//! A page is modelled as a forest of independently rooted trees: the document
//! itself plus one tree per open shadow root. A selector run inside one tree
//! cannot see into another, so finding every match means walking the
//! host → shadow-root edges explicitly.

use std::collections::HashSet;

use thiserror::Error;
use tracing::{debug, warn};

/// Identity of one encapsulation boundary within a forest.
///
/// Two hosts that reference the same shadow root carry the same id.
pub type BoundaryId = usize;

/// Why a query inside a single boundary produced nothing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LocateError {
    #[error("invalid pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },
    #[error("boundary {0} is detached from the snapshot")]
    DetachedBoundary(BoundaryId),
}

/// A forest of trees linked through encapsulation boundaries.
pub trait BoundaryForest {
    type Element;

    /// The outermost boundary (the document).
    fn root(&self) -> BoundaryId;

    /// Elements matching `pattern` inside this boundary only.
    fn query(&self, boundary: BoundaryId, pattern: &str)
        -> Result<Vec<Self::Element>, LocateError>;

    /// Boundaries owned by hosts that live directly inside this boundary.
    fn hosted_boundaries(&self, boundary: BoundaryId) -> Result<Vec<BoundaryId>, LocateError>;
}

/// Matches collected by one search, plus how far the search reached.
#[derive(Debug)]
pub struct Located<E> {
    pub elements: Vec<E>,
    pub boundaries_visited: usize,
}

/// Recursive search across every boundary reachable from the forest root.
pub struct Locator<'a, F: ?Sized> {
    forest: &'a F,
}

impl<'a, F: BoundaryForest + ?Sized> Locator<'a, F> {
    pub fn new(forest: &'a F) -> Self {
        Self { forest }
    }

    /// Every element matching `pattern` anywhere in the forest.
    pub fn find_all(&self, pattern: &str) -> Vec<F::Element> {
        self.search(pattern).elements
    }

    /// Like [`Locator::find_all`], also reporting the number of boundaries walked.
    pub fn search(&self, pattern: &str) -> Located<F::Element> {
        let root = self.forest.root();
        let mut visited = HashSet::from([root]);
        let mut elements = Vec::new();

        self.descend(root, pattern, &mut visited, &mut elements);

        debug!(
            "Pattern {:?}: {} match(es) across {} boundaries",
            pattern,
            elements.len(),
            visited.len()
        );

        Located {
            elements,
            boundaries_visited: visited.len(),
        }
    }

    fn descend(
        &self,
        boundary: BoundaryId,
        pattern: &str,
        visited: &mut HashSet<BoundaryId>,
        found: &mut Vec<F::Element>,
    ) {
        match self.forest.query(boundary, pattern) {
            Ok(matches) => found.extend(matches),
            Err(e @ LocateError::InvalidPattern { .. }) => {
                // Same pattern everywhere: no other boundary can match either.
                warn!("{}", e);
                return;
            }
            Err(e) => {
                warn!("Query in boundary {} failed: {}", boundary, e);
                return;
            }
        }

        let nested = match self.forest.hosted_boundaries(boundary) {
            Ok(nested) => nested,
            Err(e) => {
                warn!("Could not enumerate hosts in boundary {}: {}", boundary, e);
                return;
            }
        };

        for child in nested {
            if visited.insert(child) {
                self.descend(child, pattern, visited, found);
            }
        }
    }
}
