//! Normalized name → resource index for ichiryu.
//!
//! Builds the suffix-matchable index from a JSON card catalog, keeps only the
//! newest resource per normalized name, and persists the result to a binary
//! cache so later startups skip the rebuild.
//!
//! ```rust
//! use ichiryu_index::{CatalogRecord, NameIndex};
//!
//! let records = vec![CatalogRecord::new(
//!     "Lightning Bolt",
//!     "http://example.org/images/1234_bolt.jpg",
//! )];
//! let index = NameIndex::build(&records);
//! assert_eq!(
//!     index.lookup_longest_suffix("just draw a Lightning Bolt!!"),
//!     Some("http://example.org/images/1234_bolt.jpg"),
//! );
//! ```

pub mod catalog;
pub mod index_cache;
pub mod name_index;
pub mod normalize;

pub use catalog::{load_catalog, parse_catalog, CatalogRecord};
pub use index_cache::{load_index_cache, load_or_build_index, save_index_cache, CacheLoadError};
pub use name_index::{NameIndex, MIN_SUFFIX_CHARS};
pub use normalize::{normalize_name, parse_url_version};
