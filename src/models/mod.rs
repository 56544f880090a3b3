//! Data models for archive harvesting.

mod article;
mod link;
mod record;

pub use article::ArticleDescriptor;
pub use link::{path_basename, path_has_extension, LinkCandidate, LinkOrigin, ResolvedLink};
pub use record::DownloadRecord;
