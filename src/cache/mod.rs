//! On-disk persistence and background warming.
//!
//! Layout under the project root:
//!
//! ```text
//! .auzoom/
//!     index.json                            whole file index
//!     metadata/<slugified_path>_<hash>.json one record per (path, hash)
//!     summaries/<basename>_<hash>.json      non-Python summaries
//! ```

pub mod store;
pub mod warmer;

pub use store::{CacheRecord, FileIndexEntry, MetadataStore};
pub use warmer::CacheWarmer;
