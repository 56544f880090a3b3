//! archive-harvest: document harvesting for search archives built from web
//! components.
//!
//! Results pages and article pages keep their content inside nested shadow
//! roots. Pages are captured as a forest of serialized boundaries
//! ([`dom`]), searched across those boundaries for result items and document
//! links ([`discovery`], [`resolver`]), and the documents are stored in a
//! digest-verified local cache ([`storage`]) while [`crawler`] walks the
//! pagination.

pub mod cli;
pub mod config;
pub mod crawler;
pub mod discovery;
pub mod dom;
pub mod metadata;
pub mod models;
pub mod organize;
pub mod resolver;
pub mod scrapers;
pub mod storage;
