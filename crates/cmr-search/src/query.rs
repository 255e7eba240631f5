//! Fluent query construction.
//!
//! [`Query<K>`] accumulates filters into a parameter store through chained
//! builder calls, validates each filter as it is set, and serializes the
//! whole thing into a CMR request target. The kind marker `K` decides which
//! filters are available, which concept-ID prefixes are legal, and how
//! results paginate (see [`crate::kind`]).
//!
//! Builder calls return `Result<&mut Self>` so chains keep the fluent shape
//! while every validation failure surfaces immediately:
//!
//! ```no_run
//! use cmr_search::GranuleQuery;
//!
//! # fn main() -> Result<(), cmr_search::CmrError> {
//! let mut query = GranuleQuery::new();
//! query
//!     .short_name("MOD09GA")?
//!     .version("006")?
//!     .point(-105.2705, 40.015)?;
//! let granules = query.get(2000)?;
//! # Ok(())
//! # }
//! ```

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::error::{CmrError, CmrResult};
use crate::format::validate_format;
use crate::kind::{
    Collections, ConceptKind, CollectionScoped, Granules, NamedRecord, Services, Tools, Variables,
};
use crate::mode::Mode;
use crate::params::{encode_query, OptionStore, ParamStore, ParamValue};
use crate::spatial;
use crate::temporal::{encode_range, DateLike};

/// Handler signature for the generic [`Query::parameters`] entry point.
pub type HandlerFn<K> = fn(&mut Query<K>, FilterArg) -> CmrResult<()>;

/// Name-to-handler dispatch table, built once per kind at construction.
pub type Registry<K> = Vec<(&'static str, HandlerFn<K>)>;

/// Percent-encoding set matching a conventional URL quote: unreserved
/// characters and `/` pass through.
const QUOTE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'/');

/// Granule search on the production CMR.
pub type GranuleQuery = Query<Granules>;
/// Collection search on the production CMR.
pub type CollectionQuery = Query<Collections>;
/// Tool search on the production CMR.
pub type ToolQuery = Query<Tools>;
/// Service search on the production CMR.
pub type ServiceQuery = Query<Services>;
/// Variable search on the production CMR.
pub type VariableQuery = Query<Variables>;

/// An in-progress CMR search for records of kind `K`.
///
/// A query is built once and may be retrieved from repeatedly; retrieval
/// never mutates accumulated filters. Sharing one instance across threads
/// is out of contract.
#[derive(Debug, Clone)]
pub struct Query<K: ConceptKind> {
    pub(crate) base_url: String,
    pub(crate) format: String,
    pub(crate) params: ParamStore,
    pub(crate) options: OptionStore,
    pub(crate) headers: Vec<(String, String)>,
    registry: Registry<K>,
}

impl<K: ConceptKind> Default for Query<K> {
    fn default() -> Self {
        Self::new()
    }
}

// === Construction and shared filters ===

impl<K: ConceptKind> Query<K> {
    /// Create a query against the production environment.
    pub fn new() -> Self {
        Query {
            base_url: format!("{}{}", crate::mode::CMR_OPS, K::ROUTE),
            format: "json".to_string(),
            params: ParamStore::default(),
            options: OptionStore::default(),
            headers: Vec::new(),
            registry: K::registry(),
        }
    }

    /// Create a query against a specific environment.
    pub fn with_mode(mode: &Mode) -> CmrResult<Self> {
        let mut query = Self::new();
        query.mode(mode)?;
        Ok(query)
    }

    /// Point the query at a different CMR deployment.
    pub fn mode(&mut self, mode: &Mode) -> CmrResult<&mut Self> {
        self.base_url = format!("{}{}", mode.base_url()?, K::ROUTE);
        Ok(self)
    }

    /// Set the output format for returned results.
    ///
    /// Note that validation searches for a known format token *within* the
    /// requested string rather than comparing exactly, so a typo containing
    /// a valid token (e.g. `jsonn`) is accepted and sent to the server
    /// verbatim.
    pub fn format(&mut self, output_format: &str) -> CmrResult<&mut Self> {
        self.format = validate_format(output_format, K::EXTENDED_FORMATS)?;
        Ok(self)
    }

    /// Authenticate with a raw Echo-Token or Launchpad token.
    ///
    /// Replaces any previously configured authorization, bearer or raw,
    /// without disturbing other headers. An empty token is a no-op.
    pub fn token(&mut self, token: &str) -> &mut Self {
        if !token.is_empty() {
            self.set_authorization(token.to_string());
        }
        self
    }

    /// Authenticate with an EDL bearer token.
    ///
    /// Replaces any previously configured authorization, bearer or raw,
    /// without disturbing other headers. An empty token is a no-op.
    pub fn bearer_token(&mut self, token: &str) -> &mut Self {
        if !token.is_empty() {
            self.set_authorization(format!("Bearer {}", token));
        }
        self
    }

    fn set_authorization(&mut self, value: String) {
        match self
            .headers
            .iter()
            .position(|(name, _)| name.eq_ignore_ascii_case("Authorization"))
        {
            Some(i) => self.headers[i].1 = value,
            None => self.headers.push(("Authorization".to_string(), value)),
        }
    }

    /// Filter by data provider. An empty provider is a no-op.
    pub fn provider(&mut self, provider: &str) -> CmrResult<&mut Self> {
        if !provider.is_empty() {
            self.params
                .set("provider", ParamValue::Scalar(provider.to_string()));
        }
        Ok(self)
    }

    /// Filter by concept ID.
    ///
    /// Every ID must begin with a prefix legal for this query kind (`C` for
    /// collections, `G`/`C` for granules, and so on); one non-conforming ID
    /// fails the whole call and leaves the parameter unset.
    pub fn concept_id<I, S>(&mut self, ids: I) -> CmrResult<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let ids = validate_prefixes(ids, "concept_id", K::ID_PREFIXES)?;
        self.params.set("concept_id", ParamValue::List(ids));
        Ok(self)
    }

    /// Set filters by name, dispatching each to the matching builder call.
    ///
    /// Names look up in an explicit per-kind registry; an unknown name or a
    /// value of the wrong shape fails immediately.
    ///
    /// ```no_run
    /// # use cmr_search::GranuleQuery;
    /// # fn main() -> Result<(), cmr_search::CmrError> {
    /// let mut query = GranuleQuery::new();
    /// query.parameters([
    ///     ("short_name", "AST_L1T".into()),
    ///     ("point", (-100.0, 42.0).into()),
    /// ])?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn parameters<I, S>(&mut self, args: I) -> CmrResult<&mut Self>
    where
        I: IntoIterator<Item = (S, FilterArg)>,
        S: AsRef<str>,
    {
        for (name, arg) in args {
            let name = name.as_ref();
            let handler = self
                .registry
                .iter()
                .find(|(n, _)| *n == name)
                .map(|(_, handler)| *handler)
                .ok_or_else(|| CmrError::UnknownParameter(name.to_string()))?;
            handler(self, arg)?;
        }
        Ok(self)
    }

    /// Build the request target, running cross-field validation first.
    pub fn build_url(&self) -> CmrResult<String> {
        K::validate_state(&self.params)?;
        let query = encode_query(&self.params, &self.options);
        Ok(format!("{}.{}?{}", self.base_url, self.format, query))
    }

    /// The accumulated parameters. Mostly useful for inspection in tests.
    pub fn params(&self) -> &ParamStore {
        &self.params
    }

    /// The accumulated per-parameter options.
    pub fn options(&self) -> &OptionStore {
        &self.options
    }

    /// The configured request headers.
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// The currently selected output format token.
    pub fn output_format(&self) -> &str {
        &self.format
    }
}

// === Filters shared by granule and collection searches ===

impl<K: CollectionScoped> Query<K> {
    /// Filter by collection short name (product name). Empty is a no-op.
    pub fn short_name(&mut self, short_name: &str) -> CmrResult<&mut Self> {
        if !short_name.is_empty() {
            self.params
                .set("short_name", ParamValue::Scalar(short_name.to_string()));
        }
        Ok(self)
    }

    /// Filter by collection version. CMR versions are strings: MODIS
    /// version 6 products are `"006"`. Empty is a no-op.
    pub fn version(&mut self, version: &str) -> CmrResult<&mut Self> {
        if !version.is_empty() {
            self.params
                .set("version", ParamValue::Scalar(version.to_string()));
        }
        Ok(self)
    }

    /// Filter by collection entry title. The title is percent-encoded
    /// before storage.
    pub fn entry_title(&mut self, entry_title: &str) -> CmrResult<&mut Self> {
        let quoted = utf8_percent_encode(entry_title, QUOTE).to_string();
        self.params.set("entry_title", ParamValue::Scalar(quoted));
        Ok(self)
    }

    /// Filter by records containing a geographic point.
    pub fn point(&mut self, lon: f64, lat: f64) -> CmrResult<&mut Self> {
        self.params
            .set("point", ParamValue::Scalar(spatial::encode_point(lon, lat)));
        Ok(self)
    }

    /// Filter by records within `dist` meters of a point.
    pub fn circle(&mut self, lon: f64, lat: f64, dist: f64) -> CmrResult<&mut Self> {
        self.params.set(
            "circle",
            ParamValue::Scalar(spatial::encode_circle(lon, lat, dist)),
        );
        Ok(self)
    }

    /// Filter by records overlapping a polygon.
    ///
    /// Requires at least 4 `(lon, lat)` pairs with the last equal to the
    /// first. An empty slice is a no-op. Granule queries must pair this
    /// with a collection filter such as `short_name` or `entry_title`.
    pub fn polygon(&mut self, coordinates: &[(f64, f64)]) -> CmrResult<&mut Self> {
        if coordinates.is_empty() {
            return Ok(self);
        }
        let encoded = spatial::encode_polygon(coordinates)?;
        self.params.set("polygon", ParamValue::Scalar(encoded));
        Ok(self)
    }

    /// Filter by records overlapping a bounding box
    /// (`lower_left_lon, lower_left_lat, upper_right_lon, upper_right_lat`).
    pub fn bounding_box(
        &mut self,
        lower_left_lon: f64,
        lower_left_lat: f64,
        upper_right_lon: f64,
        upper_right_lat: f64,
    ) -> CmrResult<&mut Self> {
        self.params.set(
            "bounding_box",
            ParamValue::Scalar(spatial::encode_bounding_box(
                lower_left_lon,
                lower_left_lat,
                upper_right_lon,
                upper_right_lat,
            )),
        );
        Ok(self)
    }

    /// Filter by records overlapping a series of connected points.
    ///
    /// Requires at least 2 `(lon, lat)` pairs. An empty slice is a no-op.
    pub fn line(&mut self, coordinates: &[(f64, f64)]) -> CmrResult<&mut Self> {
        if coordinates.is_empty() {
            return Ok(self);
        }
        let encoded = spatial::encode_line(coordinates)?;
        self.params.set("line", ParamValue::Scalar(encoded));
        Ok(self)
    }

    /// Filter by an open or closed temporal range.
    ///
    /// Successive calls accumulate additional ranges (logical OR) rather
    /// than replacing the previous one. Setting `exclude_boundary` records
    /// the corresponding option flag for the temporal parameter.
    pub fn temporal<F, T>(
        &mut self,
        date_from: Option<F>,
        date_to: Option<T>,
        exclude_boundary: bool,
    ) -> CmrResult<&mut Self>
    where
        F: Into<DateLike>,
        T: Into<DateLike>,
    {
        let range = encode_range(date_from.map(Into::into), date_to.map(Into::into))?;
        self.params.push("temporal", range);

        if exclude_boundary {
            self.options.set("temporal", "exclude_boundary", true);
        }

        Ok(self)
    }

    /// Only match records that are available for download. Clears the
    /// mutually exclusive `online_only` flag.
    pub fn downloadable(&mut self, downloadable: bool) -> CmrResult<&mut Self> {
        // Sending both flags makes the server reject the request.
        self.params.remove("online_only");
        self.params
            .set("downloadable", ParamValue::Flag(downloadable));
        Ok(self)
    }

    /// Only match records that are online but not downloadable. Clears the
    /// mutually exclusive `downloadable` flag.
    pub fn online_only(&mut self, online_only: bool) -> CmrResult<&mut Self> {
        self.params.remove("downloadable");
        self.params.set("online_only", ParamValue::Flag(online_only));
        Ok(self)
    }
}

// === Granule-only filters ===

impl Query<Granules> {
    /// Filter by the orbit the granule was acquired during, either a single
    /// orbit or an inclusive range.
    pub fn orbit_number(&mut self, orbit1: f64, orbit2: Option<f64>) -> CmrResult<&mut Self> {
        let value = match orbit2 {
            Some(orbit2) => {
                let pair = format!("{},{}", orbit1, orbit2);
                utf8_percent_encode(&pair, QUOTE).to_string()
            }
            None => orbit1.to_string(),
        };
        self.params.set("orbit_number", ParamValue::Scalar(value));
        Ok(self)
    }

    /// Filter by the period of day the granule was collected during:
    /// `day`, `night`, or `unspecified` (case-insensitive).
    pub fn day_night_flag(&mut self, day_night_flag: &str) -> CmrResult<&mut Self> {
        let normalized = day_night_flag.to_lowercase();
        if !matches!(normalized.as_str(), "day" | "night" | "unspecified") {
            return Err(CmrError::invalid(
                "day_night_flag",
                format!(
                    "must be 'day', 'night', or 'unspecified': {:?}",
                    day_night_flag
                ),
            ));
        }
        self.params
            .set("day_night_flag", ParamValue::Scalar(normalized));
        Ok(self)
    }

    /// Filter by percentage of cloud cover. At least one bound is
    /// required; when both are given the minimum must not exceed the
    /// maximum.
    pub fn cloud_cover(
        &mut self,
        min_cover: Option<f64>,
        max_cover: Option<f64>,
    ) -> CmrResult<&mut Self> {
        if min_cover.is_none() && max_cover.is_none() {
            return Err(CmrError::MissingValue("cloud_cover"));
        }
        if let (Some(min), Some(max)) = (min_cover, max_cover) {
            if min > max {
                return Err(CmrError::invalid(
                    "cloud_cover",
                    "min cloud cover must not exceed max cloud cover",
                ));
            }
        }

        let side = |cover: Option<f64>| cover.map(|c| c.to_string()).unwrap_or_default();
        self.params.set(
            "cloud_cover",
            ParamValue::Scalar(format!("{},{}", side(min_cover), side(max_cover))),
        );
        Ok(self)
    }

    /// Filter by the instrument associated with the granule.
    pub fn instrument(&mut self, instrument: &str) -> CmrResult<&mut Self> {
        if instrument.is_empty() {
            return Err(CmrError::MissingValue("instrument"));
        }
        self.params
            .set("instrument", ParamValue::Scalar(instrument.to_string()));
        Ok(self)
    }

    /// Filter by the satellite platform the granule came from.
    pub fn platform(&mut self, platform: &str) -> CmrResult<&mut Self> {
        if platform.is_empty() {
            return Err(CmrError::MissingValue("platform"));
        }
        self.params
            .set("platform", ParamValue::Scalar(platform.to_string()));
        Ok(self)
    }

    /// Sort results by one of the granule sort keys; prefix with `-` for
    /// descending order.
    pub fn sort_key(&mut self, sort_key: &str) -> CmrResult<&mut Self> {
        const VALID_SORT_KEYS: &[&str] = &[
            "campaign",
            "entry_title",
            "dataset_id",
            "data_size",
            "end_date",
            "granule_ur",
            "producer_granule_id",
            "project",
            "provider",
            "readable_granule_name",
            "short_name",
            "start_date",
            "version",
            "platform",
            "instrument",
            "sensor",
            "day_night_flag",
            "online_only",
            "browsable",
            "browse_only",
            "cloud_cover",
            "revision_date",
        ];

        let bare = sort_key.strip_prefix('-').unwrap_or(sort_key);
        if !VALID_SORT_KEYS.contains(&bare) {
            return Err(CmrError::invalid(
                "sort_key",
                format!("{:?} is not a sortable granule field", sort_key),
            ));
        }
        self.params
            .set("sort_key", ParamValue::Scalar(sort_key.to_string()));
        Ok(self)
    }

    /// Filter by the granule's unique UR; at most one granule will match.
    pub fn granule_ur(&mut self, granule_ur: &str) -> CmrResult<&mut Self> {
        if granule_ur.is_empty() {
            return Err(CmrError::MissingValue("granule_ur"));
        }
        self.params
            .set("granule_ur", ParamValue::Scalar(granule_ur.to_string()));
        Ok(self)
    }

    /// Filter by readable granule name with wildcard support (`*` matches
    /// any number of characters, `?` exactly one). Sets the `pattern`
    /// option for the parameter.
    pub fn readable_granule_name<I, S>(&mut self, names: I) -> CmrResult<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        self.params
            .set("readable_granule_name", ParamValue::List(names));
        self.options.set("readable_granule_name", "pattern", true);
        Ok(self)
    }
}

// === Collection-only filters ===

impl Query<Collections> {
    /// Filter by the archive center that maintains the collection. Empty
    /// is a no-op.
    pub fn archive_center(&mut self, center: &str) -> CmrResult<&mut Self> {
        if !center.is_empty() {
            self.params
                .set("archive_center", ParamValue::Scalar(center.to_string()));
        }
        Ok(self)
    }

    /// Case-insensitive wildcard search across two dozen collection record
    /// fields (summary, science keywords, ...). Empty is a no-op.
    pub fn keyword(&mut self, text: &str) -> CmrResult<&mut Self> {
        if !text.is_empty() {
            self.params
                .set("keyword", ParamValue::Scalar(text.to_string()));
        }
        Ok(self)
    }

    /// Filter collections associated with a tool concept ID
    /// (ex: `TL2092786348-POCLOUD`).
    pub fn tool_concept_id<I, S>(&mut self, ids: I) -> CmrResult<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let ids = validate_prefixes(ids, "tool_concept_id", &['T'])?;
        self.params.set("tool_concept_id", ParamValue::List(ids));
        Ok(self)
    }

    /// Filter collections associated with a service concept ID
    /// (ex: `S1962070864-POCLOUD`).
    pub fn service_concept_id<I, S>(&mut self, ids: I) -> CmrResult<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let ids = validate_prefixes(ids, "service_concept_id", &['S'])?;
        self.params.set("service_concept_id", ParamValue::List(ids));
        Ok(self)
    }
}

// === Native-ID filter (collections, tools, services, variables) ===

/// Kinds addressable by provider-scoped native ID.
pub trait HasNativeId: ConceptKind {}

impl HasNativeId for Collections {}
impl HasNativeId for Tools {}
impl HasNativeId for Services {}
impl HasNativeId for Variables {}

impl<K: HasNativeId> Query<K> {
    /// Filter by native ID within a provider.
    pub fn native_id<I, S>(&mut self, native_ids: I) -> CmrResult<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let ids: Vec<String> = native_ids.into_iter().map(Into::into).collect();
        self.params.set("native_id", ParamValue::List(ids));
        Ok(self)
    }
}

// === Name filter (tools, services, variables) ===

impl<K: NamedRecord> Query<K> {
    /// Filter by tool, service, or variable name. Empty is a no-op.
    pub fn name(&mut self, name: &str) -> CmrResult<&mut Self> {
        if !name.is_empty() {
            self.params.set("name", ParamValue::Scalar(name.to_string()));
        }
        Ok(self)
    }
}

fn validate_prefixes<I, S>(
    ids: I,
    param: &'static str,
    prefixes: &[char],
) -> CmrResult<Vec<String>>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let ids: Vec<String> = ids.into_iter().map(Into::into).collect();
    for id in &ids {
        let leading = id.trim().chars().next();
        if !leading.is_some_and(|c| prefixes.contains(&c)) {
            return Err(CmrError::invalid(
                param,
                format!(
                    "only concept IDs that begin with {:?} can be provided: {}",
                    prefixes, id
                ),
            ));
        }
    }
    Ok(ids)
}

// === Generic dispatch values and handlers ===

/// A loosely typed argument for the name-based [`Query::parameters`]
/// entry point. `From` impls cover the common literal shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterArg {
    Str(String),
    Float(f64),
    Bool(bool),
    StrList(Vec<String>),
    Floats(Vec<f64>),
    Coords(Vec<(f64, f64)>),
    /// Mixed positional arguments, unpacked by the receiving handler the
    /// way a multi-argument builder call would take them.
    Args(Vec<FilterArg>),
}

impl From<&str> for FilterArg {
    fn from(value: &str) -> Self {
        FilterArg::Str(value.to_string())
    }
}

impl From<String> for FilterArg {
    fn from(value: String) -> Self {
        FilterArg::Str(value)
    }
}

impl From<f64> for FilterArg {
    fn from(value: f64) -> Self {
        FilterArg::Float(value)
    }
}

impl From<bool> for FilterArg {
    fn from(value: bool) -> Self {
        FilterArg::Bool(value)
    }
}

impl From<Vec<String>> for FilterArg {
    fn from(value: Vec<String>) -> Self {
        FilterArg::StrList(value)
    }
}

impl From<Vec<&str>> for FilterArg {
    fn from(value: Vec<&str>) -> Self {
        FilterArg::StrList(value.into_iter().map(str::to_string).collect())
    }
}

impl From<(&str, &str)> for FilterArg {
    fn from((a, b): (&str, &str)) -> Self {
        FilterArg::StrList(vec![a.to_string(), b.to_string()])
    }
}

impl From<(&str, &str, bool)> for FilterArg {
    fn from((a, b, flag): (&str, &str, bool)) -> Self {
        FilterArg::Args(vec![a.into(), b.into(), FilterArg::Bool(flag)])
    }
}

impl From<(f64, f64)> for FilterArg {
    fn from((a, b): (f64, f64)) -> Self {
        FilterArg::Floats(vec![a, b])
    }
}

impl From<(f64, f64, f64)> for FilterArg {
    fn from((a, b, c): (f64, f64, f64)) -> Self {
        FilterArg::Floats(vec![a, b, c])
    }
}

impl From<(f64, f64, f64, f64)> for FilterArg {
    fn from((a, b, c, d): (f64, f64, f64, f64)) -> Self {
        FilterArg::Floats(vec![a, b, c, d])
    }
}

impl From<Vec<(f64, f64)>> for FilterArg {
    fn from(value: Vec<(f64, f64)>) -> Self {
        FilterArg::Coords(value)
    }
}

impl FilterArg {
    fn into_str(self, param: &'static str) -> CmrResult<String> {
        match self {
            FilterArg::Str(s) => Ok(s),
            _ => Err(CmrError::WrongType {
                param,
                expected: "string",
            }),
        }
    }

    fn into_bool(self, param: &'static str) -> CmrResult<bool> {
        match self {
            FilterArg::Bool(b) => Ok(b),
            _ => Err(CmrError::WrongType {
                param,
                expected: "boolean",
            }),
        }
    }

    fn into_floats(self, param: &'static str) -> CmrResult<Vec<f64>> {
        match self {
            FilterArg::Floats(floats) => Ok(floats),
            FilterArg::Float(f) => Ok(vec![f]),
            FilterArg::Str(s) => {
                let parsed = s.trim().parse::<f64>().map_err(|_| {
                    CmrError::invalid(param, format!("{:?} is not a float", s))
                })?;
                Ok(vec![parsed])
            }
            _ => Err(CmrError::WrongType {
                param,
                expected: "float or sequence of floats",
            }),
        }
    }

    fn into_str_list(self, param: &'static str) -> CmrResult<Vec<String>> {
        match self {
            FilterArg::StrList(list) => Ok(list),
            FilterArg::Str(s) => Ok(vec![s]),
            _ => Err(CmrError::WrongType {
                param,
                expected: "string or list of strings",
            }),
        }
    }

    fn into_coords(self, param: &'static str) -> CmrResult<Vec<(f64, f64)>> {
        match self {
            FilterArg::Coords(coords) => Ok(coords),
            _ => Err(CmrError::WrongType {
                param,
                expected: "list of (lon, lat) pairs",
            }),
        }
    }
}

/// Registry builders and handler shims for [`Query::parameters`].
pub(crate) mod dispatch {
    use super::*;

    fn expect_arity(param: &'static str, got: usize, low: usize, high: usize) -> CmrResult<()> {
        if got < low || got > high {
            return Err(CmrError::invalid(
                param,
                format!("expected {} to {} values, got {}", low, high, got),
            ));
        }
        Ok(())
    }

    // --- shared handlers ---

    fn h_provider<K: ConceptKind>(q: &mut Query<K>, arg: FilterArg) -> CmrResult<()> {
        q.provider(&arg.into_str("provider")?).map(|_| ())
    }

    fn h_concept_id<K: ConceptKind>(q: &mut Query<K>, arg: FilterArg) -> CmrResult<()> {
        q.concept_id(arg.into_str_list("concept_id")?).map(|_| ())
    }

    fn h_format<K: ConceptKind>(q: &mut Query<K>, arg: FilterArg) -> CmrResult<()> {
        q.format(&arg.into_str("format")?).map(|_| ())
    }

    fn h_token<K: ConceptKind>(q: &mut Query<K>, arg: FilterArg) -> CmrResult<()> {
        q.token(&arg.into_str("token")?);
        Ok(())
    }

    fn h_bearer_token<K: ConceptKind>(q: &mut Query<K>, arg: FilterArg) -> CmrResult<()> {
        q.bearer_token(&arg.into_str("bearer_token")?);
        Ok(())
    }

    fn shared<K: ConceptKind>() -> Registry<K> {
        vec![
            ("provider", h_provider::<K> as HandlerFn<K>),
            ("concept_id", h_concept_id::<K>),
            ("format", h_format::<K>),
            ("token", h_token::<K>),
            ("bearer_token", h_bearer_token::<K>),
        ]
    }

    // --- handlers shared by granules and collections ---

    fn h_short_name<K: CollectionScoped>(q: &mut Query<K>, arg: FilterArg) -> CmrResult<()> {
        q.short_name(&arg.into_str("short_name")?).map(|_| ())
    }

    fn h_version<K: CollectionScoped>(q: &mut Query<K>, arg: FilterArg) -> CmrResult<()> {
        q.version(&arg.into_str("version")?).map(|_| ())
    }

    fn h_entry_title<K: CollectionScoped>(q: &mut Query<K>, arg: FilterArg) -> CmrResult<()> {
        q.entry_title(&arg.into_str("entry_title")?).map(|_| ())
    }

    fn h_point<K: CollectionScoped>(q: &mut Query<K>, arg: FilterArg) -> CmrResult<()> {
        let floats = arg.into_floats("point")?;
        expect_arity("point", floats.len(), 2, 2)?;
        q.point(floats[0], floats[1]).map(|_| ())
    }

    fn h_circle<K: CollectionScoped>(q: &mut Query<K>, arg: FilterArg) -> CmrResult<()> {
        let floats = arg.into_floats("circle")?;
        expect_arity("circle", floats.len(), 3, 3)?;
        q.circle(floats[0], floats[1], floats[2]).map(|_| ())
    }

    fn h_polygon<K: CollectionScoped>(q: &mut Query<K>, arg: FilterArg) -> CmrResult<()> {
        q.polygon(&arg.into_coords("polygon")?).map(|_| ())
    }

    fn h_bounding_box<K: CollectionScoped>(q: &mut Query<K>, arg: FilterArg) -> CmrResult<()> {
        let floats = arg.into_floats("bounding_box")?;
        expect_arity("bounding_box", floats.len(), 4, 4)?;
        q.bounding_box(floats[0], floats[1], floats[2], floats[3])
            .map(|_| ())
    }

    fn h_line<K: CollectionScoped>(q: &mut Query<K>, arg: FilterArg) -> CmrResult<()> {
        q.line(&arg.into_coords("line")?).map(|_| ())
    }

    fn h_temporal<K: CollectionScoped>(q: &mut Query<K>, arg: FilterArg) -> CmrResult<()> {
        fn side(s: Option<&String>) -> Option<&str> {
            s.filter(|s| !s.is_empty()).map(|s| s.as_str())
        }

        // A trailing boolean positional argument is the boundary-exclusion
        // flag; everything before it is a range bound.
        let (bounds, exclude_boundary) = match arg {
            FilterArg::Args(mut items) => {
                let exclude = match items.pop() {
                    Some(FilterArg::Bool(b)) => b,
                    Some(other) => {
                        items.push(other);
                        false
                    }
                    None => false,
                };
                let bounds = items
                    .into_iter()
                    .map(|item| item.into_str("temporal"))
                    .collect::<CmrResult<Vec<_>>>()?;
                (bounds, exclude)
            }
            other => (other.into_str_list("temporal")?, false),
        };

        expect_arity("temporal", bounds.len(), 1, 2)?;
        q.temporal(side(bounds.first()), side(bounds.get(1)), exclude_boundary)
            .map(|_| ())
    }

    fn h_downloadable<K: CollectionScoped>(q: &mut Query<K>, arg: FilterArg) -> CmrResult<()> {
        q.downloadable(arg.into_bool("downloadable")?).map(|_| ())
    }

    fn h_online_only<K: CollectionScoped>(q: &mut Query<K>, arg: FilterArg) -> CmrResult<()> {
        q.online_only(arg.into_bool("online_only")?).map(|_| ())
    }

    fn collection_scoped<K: CollectionScoped>() -> Registry<K> {
        let mut registry = shared::<K>();
        registry.extend([
            ("short_name", h_short_name::<K> as HandlerFn<K>),
            ("version", h_version::<K>),
            ("entry_title", h_entry_title::<K>),
            ("point", h_point::<K>),
            ("circle", h_circle::<K>),
            ("polygon", h_polygon::<K>),
            ("bounding_box", h_bounding_box::<K>),
            ("line", h_line::<K>),
            ("temporal", h_temporal::<K>),
            ("downloadable", h_downloadable::<K>),
            ("online_only", h_online_only::<K>),
        ]);
        registry
    }

    // --- granule handlers ---

    fn h_orbit_number(q: &mut Query<Granules>, arg: FilterArg) -> CmrResult<()> {
        let floats = arg.into_floats("orbit_number")?;
        expect_arity("orbit_number", floats.len(), 1, 2)?;
        q.orbit_number(floats[0], floats.get(1).copied()).map(|_| ())
    }

    fn h_day_night_flag(q: &mut Query<Granules>, arg: FilterArg) -> CmrResult<()> {
        q.day_night_flag(&arg.into_str("day_night_flag")?).map(|_| ())
    }

    fn h_cloud_cover(q: &mut Query<Granules>, arg: FilterArg) -> CmrResult<()> {
        let floats = arg.into_floats("cloud_cover")?;
        expect_arity("cloud_cover", floats.len(), 1, 2)?;
        q.cloud_cover(floats.first().copied(), floats.get(1).copied())
            .map(|_| ())
    }

    fn h_instrument(q: &mut Query<Granules>, arg: FilterArg) -> CmrResult<()> {
        q.instrument(&arg.into_str("instrument")?).map(|_| ())
    }

    fn h_platform(q: &mut Query<Granules>, arg: FilterArg) -> CmrResult<()> {
        q.platform(&arg.into_str("platform")?).map(|_| ())
    }

    fn h_sort_key(q: &mut Query<Granules>, arg: FilterArg) -> CmrResult<()> {
        q.sort_key(&arg.into_str("sort_key")?).map(|_| ())
    }

    fn h_granule_ur(q: &mut Query<Granules>, arg: FilterArg) -> CmrResult<()> {
        q.granule_ur(&arg.into_str("granule_ur")?).map(|_| ())
    }

    fn h_readable_granule_name(q: &mut Query<Granules>, arg: FilterArg) -> CmrResult<()> {
        q.readable_granule_name(arg.into_str_list("readable_granule_name")?)
            .map(|_| ())
    }

    pub(crate) fn granule_registry() -> Registry<Granules> {
        let mut registry = collection_scoped::<Granules>();
        registry.extend([
            ("orbit_number", h_orbit_number as HandlerFn<Granules>),
            ("day_night_flag", h_day_night_flag),
            ("cloud_cover", h_cloud_cover),
            ("instrument", h_instrument),
            ("platform", h_platform),
            ("sort_key", h_sort_key),
            ("granule_ur", h_granule_ur),
            ("readable_granule_name", h_readable_granule_name),
        ]);
        registry
    }

    // --- collection handlers ---

    fn h_archive_center(q: &mut Query<Collections>, arg: FilterArg) -> CmrResult<()> {
        q.archive_center(&arg.into_str("archive_center")?).map(|_| ())
    }

    fn h_keyword(q: &mut Query<Collections>, arg: FilterArg) -> CmrResult<()> {
        q.keyword(&arg.into_str("keyword")?).map(|_| ())
    }

    fn h_collection_native_id(q: &mut Query<Collections>, arg: FilterArg) -> CmrResult<()> {
        q.native_id(arg.into_str_list("native_id")?).map(|_| ())
    }

    fn h_tool_concept_id(q: &mut Query<Collections>, arg: FilterArg) -> CmrResult<()> {
        q.tool_concept_id(arg.into_str_list("tool_concept_id")?)
            .map(|_| ())
    }

    fn h_service_concept_id(q: &mut Query<Collections>, arg: FilterArg) -> CmrResult<()> {
        q.service_concept_id(arg.into_str_list("service_concept_id")?)
            .map(|_| ())
    }

    pub(crate) fn collection_registry() -> Registry<Collections> {
        let mut registry = collection_scoped::<Collections>();
        registry.extend([
            ("archive_center", h_archive_center as HandlerFn<Collections>),
            ("keyword", h_keyword),
            ("native_id", h_collection_native_id),
            ("tool_concept_id", h_tool_concept_id),
            ("service_concept_id", h_service_concept_id),
        ]);
        registry
    }

    // --- tool/service/variable handlers ---

    fn h_name<K: NamedRecord>(q: &mut Query<K>, arg: FilterArg) -> CmrResult<()> {
        q.name(&arg.into_str("name")?).map(|_| ())
    }

    fn h_native_id<K: NamedRecord + HasNativeId>(
        q: &mut Query<K>,
        arg: FilterArg,
    ) -> CmrResult<()> {
        q.native_id(arg.into_str_list("native_id")?).map(|_| ())
    }

    pub(crate) fn named_record_registry<K: NamedRecord + HasNativeId>() -> Registry<K> {
        let mut registry = shared::<K>();
        registry.extend([
            ("name", h_name::<K> as HandlerFn<K>),
            ("native_id", h_native_id::<K>),
        ]);
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_name_set() {
        let mut query = GranuleQuery::new();
        query.short_name("MOD09GA").unwrap();
        assert_eq!(
            query.params().get("short_name"),
            Some(&ParamValue::Scalar("MOD09GA".to_string()))
        );
    }

    #[test]
    fn test_point_set() {
        let mut query = GranuleQuery::new();
        query.point(10.0, 15.1).unwrap();
        assert_eq!(
            query.params().get("point"),
            Some(&ParamValue::Scalar("10,15.1".to_string()))
        );
    }

    #[test]
    fn test_temporal_accumulates_ranges() {
        let mut query = GranuleQuery::new();
        query
            .temporal(Some("2016-10-10T01:02:03Z"), Some("2016-10-12T09:08:07Z"), false)
            .unwrap()
            .temporal(Some("2017-01-01T00:00:00Z"), None::<&str>, false)
            .unwrap();

        assert_eq!(
            query.params().get("temporal"),
            Some(&ParamValue::List(vec![
                "2016-10-10T01:02:03Z,2016-10-12T09:08:07Z".to_string(),
                "2017-01-01T00:00:00Z,".to_string(),
            ]))
        );
    }

    #[test]
    fn test_temporal_exclude_boundary_option() {
        let mut query = GranuleQuery::new();
        query
            .temporal(Some("2016-10-10T01:02:03Z"), Some("2016-10-12T09:08:07Z"), true)
            .unwrap();
        assert_eq!(query.options().get("temporal", "exclude_boundary"), Some(true));
    }

    #[test]
    fn test_downloadable_clears_online_only() {
        let mut query = GranuleQuery::new();
        query.online_only(true).unwrap();
        query.downloadable(true).unwrap();

        assert!(query.params().contains("downloadable"));
        assert!(!query.params().contains("online_only"));
    }

    #[test]
    fn test_online_only_clears_downloadable() {
        let mut query = GranuleQuery::new();
        query.downloadable(true).unwrap();
        query.online_only(true).unwrap();

        assert!(query.params().contains("online_only"));
        assert!(!query.params().contains("downloadable"));
    }

    #[test]
    fn test_entry_title_is_quoted() {
        let mut query = GranuleQuery::new();
        query.entry_title("DatasetId 5").unwrap();
        assert_eq!(
            query.params().get("entry_title"),
            Some(&ParamValue::Scalar("DatasetId%205".to_string()))
        );
    }

    #[test]
    fn test_orbit_number_single() {
        let mut query = GranuleQuery::new();
        query.orbit_number(985.0, None).unwrap();
        assert_eq!(
            query.params().get("orbit_number"),
            Some(&ParamValue::Scalar("985".to_string()))
        );
    }

    #[test]
    fn test_orbit_number_range_is_quoted() {
        let mut query = GranuleQuery::new();
        query.orbit_number(985.0, Some(986.0)).unwrap();
        assert_eq!(
            query.params().get("orbit_number"),
            Some(&ParamValue::Scalar("985%2C986".to_string()))
        );
    }

    #[test]
    fn test_day_night_flag_normalized() {
        let mut query = GranuleQuery::new();
        query.day_night_flag("DAY").unwrap();
        assert_eq!(
            query.params().get("day_night_flag"),
            Some(&ParamValue::Scalar("day".to_string()))
        );
    }

    #[test]
    fn test_day_night_flag_invalid() {
        let mut query = GranuleQuery::new();
        let result = query.day_night_flag("invaliddaynight");
        assert!(matches!(result, Err(CmrError::InvalidValue { .. })));
        assert!(!query.params().contains("day_night_flag"));
    }

    #[test]
    fn test_cloud_cover_both_bounds() {
        let mut query = GranuleQuery::new();
        query.cloud_cover(Some(-70.0), Some(120.0)).unwrap();
        assert_eq!(
            query.params().get("cloud_cover"),
            Some(&ParamValue::Scalar("-70,120".to_string()))
        );
    }

    #[test]
    fn test_cloud_cover_single_bound() {
        let mut query = GranuleQuery::new();
        query.cloud_cover(None, Some(120.0)).unwrap();
        assert_eq!(
            query.params().get("cloud_cover"),
            Some(&ParamValue::Scalar(",120".to_string()))
        );
    }

    #[test]
    fn test_cloud_cover_requires_a_bound() {
        let mut query = GranuleQuery::new();
        let result = query.cloud_cover(None, None);
        assert!(matches!(result, Err(CmrError::MissingValue("cloud_cover"))));
    }

    #[test]
    fn test_cloud_cover_inverted_bounds() {
        let mut query = GranuleQuery::new();
        let result = query.cloud_cover(Some(50.0), Some(10.0));
        assert!(matches!(result, Err(CmrError::InvalidValue { .. })));
    }

    #[test]
    fn test_sort_key_allows_descending_prefix() {
        let mut query = GranuleQuery::new();
        query.sort_key("-start_date").unwrap();
        assert_eq!(
            query.params().get("sort_key"),
            Some(&ParamValue::Scalar("-start_date".to_string()))
        );
    }

    #[test]
    fn test_sort_key_rejects_unknown_field() {
        let mut query = GranuleQuery::new();
        assert!(query.sort_key("no_such_field").is_err());
        assert!(query.sort_key("").is_err());
    }

    #[test]
    fn test_concept_id_prefix_validation() {
        let mut query = CollectionQuery::new();

        query.concept_id(["C1299783579-LPDAAC_ECS"]).unwrap();
        assert_eq!(
            query.params().get("concept_id"),
            Some(&ParamValue::List(vec!["C1299783579-LPDAAC_ECS".to_string()]))
        );

        // Granule IDs are not legal for collection queries; the whole
        // batch fails and the previous value stays.
        let result = query.concept_id(["C1-A", "G2-A"]);
        assert!(matches!(result, Err(CmrError::InvalidValue { .. })));
        assert_eq!(
            query.params().get("concept_id"),
            Some(&ParamValue::List(vec!["C1299783579-LPDAAC_ECS".to_string()]))
        );
    }

    #[test]
    fn test_granule_accepts_collection_concept_ids() {
        let mut query = GranuleQuery::new();
        query
            .concept_id(["C1299783579-LPDAAC_ECS", "G1441380236-PODAAC"])
            .unwrap();
        assert_eq!(
            query.params().get("concept_id"),
            Some(&ParamValue::List(vec![
                "C1299783579-LPDAAC_ECS".to_string(),
                "G1441380236-PODAAC".to_string(),
            ]))
        );
    }

    #[test]
    fn test_tool_concept_id_prefix() {
        let mut query = CollectionQuery::new();
        assert!(query.tool_concept_id(["G1327299284-LPDAAC_ECS"]).is_err());
        query.tool_concept_id(["T1299783579-LPDAAC_ECS"]).unwrap();
    }

    #[test]
    fn test_service_concept_id_prefix() {
        let mut query = CollectionQuery::new();
        assert!(query.service_concept_id(["G1327299284-LPDAAC_ECS"]).is_err());
        query.service_concept_id(["S1299783579-LPDAAC_ECS"]).unwrap();
    }

    #[test]
    fn test_readable_granule_name_sets_pattern_option() {
        let mut query = GranuleQuery::new();
        query.readable_granule_name(["A*"]).unwrap();
        assert_eq!(
            query.params().get("readable_granule_name"),
            Some(&ParamValue::List(vec!["A*".to_string()]))
        );
        assert_eq!(
            query.options().get("readable_granule_name", "pattern"),
            Some(true)
        );
    }

    #[test]
    fn test_token_and_bearer_token_replace_each_other() {
        let mut query = GranuleQuery::new();
        query.headers.push(("foo".to_string(), "bar".to_string()));

        query.token("token");
        assert_eq!(
            query.headers().iter().find(|(n, _)| n == "Authorization"),
            Some(&("Authorization".to_string(), "token".to_string()))
        );

        query.bearer_token("bearertoken");
        assert_eq!(
            query.headers().iter().find(|(n, _)| n == "Authorization"),
            Some(&("Authorization".to_string(), "Bearer bearertoken".to_string()))
        );

        // Other headers are untouched, and there is exactly one
        // Authorization entry.
        assert_eq!(query.headers().len(), 2);
        assert!(query.headers().iter().any(|(n, v)| n == "foo" && v == "bar"));
    }

    #[test]
    fn test_parameters_dispatch() {
        let mut query = GranuleQuery::new();
        query
            .parameters([
                ("short_name", "AST_L1T".into()),
                ("version", "003".into()),
                ("point", (-100.0, 42.0).into()),
            ])
            .unwrap();

        assert_eq!(
            query.params().get("short_name"),
            Some(&ParamValue::Scalar("AST_L1T".to_string()))
        );
        assert_eq!(
            query.params().get("version"),
            Some(&ParamValue::Scalar("003".to_string()))
        );
        assert_eq!(
            query.params().get("point"),
            Some(&ParamValue::Scalar("-100,42".to_string()))
        );
    }

    #[test]
    fn test_parameters_temporal_pair_with_empty_side() {
        let mut query = GranuleQuery::new();
        query
            .parameters([("temporal", ("2016-10-12T10:55:07Z", "").into())])
            .unwrap();

        assert_eq!(
            query.params().get("temporal"),
            Some(&ParamValue::List(vec!["2016-10-12T10:55:07Z,".to_string()]))
        );
        assert_eq!(query.options().get("temporal", "exclude_boundary"), None);
    }

    #[test]
    fn test_parameters_temporal_trailing_bool_sets_exclude_boundary() {
        let mut query = GranuleQuery::new();
        query
            .parameters([(
                "temporal",
                ("2016-10-10T01:02:03Z", "2016-10-12T09:08:07Z", true).into(),
            )])
            .unwrap();

        assert_eq!(
            query.params().get("temporal"),
            Some(&ParamValue::List(vec![
                "2016-10-10T01:02:03Z,2016-10-12T09:08:07Z".to_string()
            ]))
        );
        assert_eq!(query.options().get("temporal", "exclude_boundary"), Some(true));
    }

    #[test]
    fn test_parameters_unknown_name() {
        let mut query = GranuleQuery::new();
        let result = query.parameters([("fake", FilterArg::Float(123.0))]);
        assert!(matches!(result, Err(CmrError::UnknownParameter(_))));
    }

    #[test]
    fn test_parameters_kind_gating() {
        // keyword is a collection filter; granule queries don't know it.
        let mut query = GranuleQuery::new();
        let result = query.parameters([("keyword", "AST_*".into())]);
        assert!(matches!(result, Err(CmrError::UnknownParameter(_))));

        let mut query = CollectionQuery::new();
        query.parameters([("keyword", "AST_*".into())]).unwrap();
    }

    #[test]
    fn test_parameters_wrong_shape() {
        let mut query = GranuleQuery::new();
        let result = query.parameters([("point", "not-a-pair".into())]);
        assert!(result.is_err());

        let result = query.parameters([("day_night_flag", true.into())]);
        assert!(matches!(result, Err(CmrError::WrongType { .. })));
    }

    #[test]
    fn test_build_url_shape() {
        let mut query = GranuleQuery::new();
        query.short_name("MOD09GA").unwrap().version("006").unwrap();
        let url = query.build_url().unwrap();
        assert_eq!(
            url,
            "https://cmr.earthdata.nasa.gov/search/granules.json?short_name=MOD09GA&version=006"
        );
    }

    #[test]
    fn test_build_url_lowercase_bools() {
        let mut query = GranuleQuery::new();
        query
            .parameters([
                ("short_name", "AST_L1T".into()),
                ("downloadable", false.into()),
            ])
            .unwrap();
        let url = query.build_url().unwrap();
        assert!(!url.contains("True"));
        assert!(!url.contains("False"));
        assert!(url.contains("downloadable=false"));
    }

    #[test]
    fn test_spatial_requires_collection_scope() {
        let mut query = GranuleQuery::new();
        query.point(10.0, 15.1).unwrap();
        assert!(matches!(query.build_url(), Err(CmrError::InvalidState(_))));

        query.short_name("test").unwrap();
        assert!(query.build_url().is_ok());
    }

    #[test]
    fn test_collection_spatial_needs_no_scope() {
        let mut query = CollectionQuery::new();
        query.point(10.0, 15.1).unwrap();
        assert!(query.build_url().is_ok());
    }

    #[test]
    fn test_format_gating_per_kind() {
        let mut granules = GranuleQuery::new();
        assert!(granules.format("dif10").is_err());

        let mut collections = CollectionQuery::new();
        collections.format("dif10").unwrap();
        assert_eq!(collections.output_format(), "dif10");
    }

    #[test]
    fn test_mode_switch_rebuilds_base_url() {
        let mut query = ToolQuery::new();
        query
            .mode(&Mode::Custom("http://localhost:3003".to_string()))
            .unwrap();
        let url = query.build_url().unwrap();
        assert!(url.starts_with("http://localhost:3003/tools.json?"));
    }
}
