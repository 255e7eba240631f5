//! Client library for NASA's Common Metadata Repository (CMR) search API.
//!
//! The CMR indexes metadata for collections, granules, tools, services,
//! and variables across NASA's Earthdata providers. This crate builds
//! search requests against it: filters accumulate through a fluent
//! builder, get validated client-side as they are set, serialize into a
//! deterministic URL, and results come back through a pagination engine
//! that speaks both of the CMR's paging protocols.
//!
//! ```no_run
//! use cmr_search::GranuleQuery;
//!
//! fn main() -> Result<(), cmr_search::CmrError> {
//!     let mut query = GranuleQuery::new();
//!     query
//!         .short_name("MOD09GA")?
//!         .version("006")?
//!         .temporal(Some("2016-10-10T01:02:00Z"), Some("2016-10-12T00:00:30Z"), false)?;
//!
//!     println!("{} matching granules", query.hits()?);
//!     for record in query.get(10)? {
//!         println!("{:?}", record);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! All I/O is blocking; one page request is in flight at a time. Queries
//! carry no retrieval state, so a built query can be fetched from
//! repeatedly.

pub mod error;
mod format;
pub mod kind;
pub mod mode;
pub mod paginate;
pub mod params;
pub mod query;
mod spatial;
pub mod temporal;

pub use error::{CmrError, CmrResult};
pub use kind::{
    Collections, ConceptKind, CollectionScoped, CursorPaged, Granules, NamedRecord,
    PaginationStyle, Services, Tools, Variables,
};
pub use mode::{Mode, CMR_OPS, CMR_SIT, CMR_UAT};
pub use paginate::{Record, RecordStream, CMR_PAGE_MAX};
pub use params::{OptionStore, ParamStore, ParamValue};
pub use query::{
    CollectionQuery, FilterArg, GranuleQuery, HasNativeId, Query, ServiceQuery, ToolQuery,
    VariableQuery,
};
pub use temporal::DateLike;
