//! Per-kind query configuration.
//!
//! CMR exposes five searchable record kinds. Instead of an inheritance
//! hierarchy, each kind is a zero-sized marker carrying a configuration
//! record as associated consts: its route, the concept-ID prefixes it
//! accepts, which output formats it allows, how its results paginate, and
//! its cross-field state validator. Marker subtraits gate the filters that
//! only some kinds support.

use crate::error::{CmrError, CmrResult};
use crate::params::ParamStore;
use crate::query::Registry;

/// How a kind's results are paginated by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaginationStyle {
    /// Opaque `cmr-search-after` cursor carried in request headers;
    /// results arrive in a `feed.entry` envelope.
    Cursor,
    /// Explicit `page_num` counter; results arrive in an `items` envelope.
    PageNumber,
}

mod sealed {
    pub trait Sealed {}
}

/// Configuration record for one searchable record kind.
pub trait ConceptKind: sealed::Sealed + Sized + 'static {
    /// Resource route appended to the base URL.
    const ROUTE: &'static str;
    /// Leading characters legal for concept IDs passed to this kind.
    const ID_PREFIXES: &'static [char];
    /// Whether the extended output formats (dif, opendata, umm_json, ...)
    /// are accepted.
    const EXTENDED_FORMATS: bool;
    /// Pagination protocol used during retrieval.
    const PAGINATION: PaginationStyle;

    /// Cross-field validation, run immediately before URL construction.
    fn validate_state(_params: &ParamStore) -> CmrResult<()> {
        Ok(())
    }

    /// Dispatch table for the generic
    /// [`parameters`](crate::Query::parameters) entry point.
    fn registry() -> Registry<Self>;
}

/// Kinds that scope to (or are) collections and support spatial, temporal,
/// and collection-name filters: granules and collections.
pub trait CollectionScoped: ConceptKind {}

/// Kinds addressed by a plain `name` filter: tools, services, variables.
pub trait NamedRecord: ConceptKind {}

/// Kinds retrieved through the cursor protocol, which also exposes the
/// `CMR-Hits` count probe.
pub trait CursorPaged: ConceptKind {}

/// Granule searches (`granules` route).
#[derive(Debug, Clone, Copy, Default)]
pub struct Granules;

/// Collection searches (`collections` route).
#[derive(Debug, Clone, Copy, Default)]
pub struct Collections;

/// Tool searches (`tools` route).
#[derive(Debug, Clone, Copy, Default)]
pub struct Tools;

/// Service searches (`services` route).
#[derive(Debug, Clone, Copy, Default)]
pub struct Services;

/// Variable searches (`variables` route).
#[derive(Debug, Clone, Copy, Default)]
pub struct Variables;

impl sealed::Sealed for Granules {}
impl sealed::Sealed for Collections {}
impl sealed::Sealed for Tools {}
impl sealed::Sealed for Services {}
impl sealed::Sealed for Variables {}

const SPATIAL_KEYS: &[&str] = &["point", "circle", "polygon", "bounding_box", "line"];
const COLLECTION_KEYS: &[&str] = &["short_name", "entry_title"];

impl ConceptKind for Granules {
    const ROUTE: &'static str = "granules";
    const ID_PREFIXES: &'static [char] = &['G', 'C'];
    const EXTENDED_FORMATS: bool = false;
    const PAGINATION: PaginationStyle = PaginationStyle::Cursor;

    /// Spatial filters are only meaningful within a collection, so CMR
    /// rejects them unless the query also narrows by collection.
    fn validate_state(params: &ParamStore) -> CmrResult<()> {
        let spatial = SPATIAL_KEYS.iter().any(|key| params.contains(key));
        let scoped = COLLECTION_KEYS.iter().any(|key| params.contains(key));
        if spatial && !scoped {
            return Err(CmrError::InvalidState(
                "spatial parameters must be accompanied by a collection filter \
                 (ex: short_name or entry_title)"
                    .to_string(),
            ));
        }
        Ok(())
    }

    fn registry() -> Registry<Self> {
        crate::query::dispatch::granule_registry()
    }
}

impl ConceptKind for Collections {
    const ROUTE: &'static str = "collections";
    const ID_PREFIXES: &'static [char] = &['C'];
    const EXTENDED_FORMATS: bool = true;
    const PAGINATION: PaginationStyle = PaginationStyle::Cursor;

    fn registry() -> Registry<Self> {
        crate::query::dispatch::collection_registry()
    }
}

impl ConceptKind for Tools {
    const ROUTE: &'static str = "tools";
    const ID_PREFIXES: &'static [char] = &['T'];
    const EXTENDED_FORMATS: bool = true;
    const PAGINATION: PaginationStyle = PaginationStyle::PageNumber;

    fn registry() -> Registry<Self> {
        crate::query::dispatch::named_record_registry()
    }
}

impl ConceptKind for Services {
    const ROUTE: &'static str = "services";
    const ID_PREFIXES: &'static [char] = &['S'];
    const EXTENDED_FORMATS: bool = true;
    const PAGINATION: PaginationStyle = PaginationStyle::PageNumber;

    fn registry() -> Registry<Self> {
        crate::query::dispatch::named_record_registry()
    }
}

impl ConceptKind for Variables {
    const ROUTE: &'static str = "variables";
    const ID_PREFIXES: &'static [char] = &['V'];
    const EXTENDED_FORMATS: bool = true;
    const PAGINATION: PaginationStyle = PaginationStyle::PageNumber;

    fn registry() -> Registry<Self> {
        crate::query::dispatch::named_record_registry()
    }
}

impl CollectionScoped for Granules {}
impl CollectionScoped for Collections {}

impl NamedRecord for Tools {}
impl NamedRecord for Services {}
impl NamedRecord for Variables {}

impl CursorPaged for Granules {}
impl CursorPaged for Collections {}
