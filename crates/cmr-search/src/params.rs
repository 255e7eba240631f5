//! Parameter and option storage plus query-string encoding.
//!
//! CMR's query grammar has three value shapes: plain scalars
//! (`short_name=MOD09GA`), repeated list entries (`concept_id[]=C1-X`),
//! and per-parameter option flags (`options[temporal][exclude_boundary]=true`).
//! Insertion order is preserved so a given query always serializes to the
//! same string.

/// A single parameter value.
///
/// A parameter keeps one shape for the lifetime of a query: filters that
/// accumulate (`temporal`) are lists from the first call, everything else
/// is a scalar or flag that later calls overwrite.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    /// A single pre-encoded value.
    Scalar(String),
    /// Repeated values, serialized as `name[]=value` per element.
    List(Vec<String>),
    /// A boolean, serialized lowercase (`true`/`false`).
    Flag(bool),
}

/// Insertion-ordered parameter map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamStore {
    entries: Vec<(String, ParamValue)>,
}

impl ParamStore {
    /// Set a parameter, replacing any previous value in place.
    pub fn set(&mut self, name: &str, value: ParamValue) {
        match self.entries.iter().position(|(n, _)| n == name) {
            Some(i) => self.entries[i].1 = value,
            None => self.entries.push((name.to_string(), value)),
        }
    }

    /// Append to a list parameter, creating the list on first use.
    pub fn push(&mut self, name: &str, value: String) {
        match self.entries.iter().position(|(n, _)| n == name) {
            Some(i) => match &mut self.entries[i].1 {
                ParamValue::List(values) => values.push(value),
                other => *other = ParamValue::List(vec![value]),
            },
            None => self
                .entries
                .push((name.to_string(), ParamValue::List(vec![value]))),
        }
    }

    /// Remove a parameter if present.
    pub fn remove(&mut self, name: &str) {
        self.entries.retain(|(n, _)| n != name);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| n == name)
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, ParamValue)> {
        self.entries.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Insertion-ordered `parameter -> option -> bool` map.
///
/// CMR only accepts boolean option values; the typed API makes anything
/// else unrepresentable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OptionStore {
    entries: Vec<(String, Vec<(String, bool)>)>,
}

impl OptionStore {
    /// Set an option flag for a parameter.
    pub fn set(&mut self, param: &str, option: &str, value: bool) {
        let i = match self.entries.iter().position(|(n, _)| n == param) {
            Some(i) => i,
            None => {
                self.entries.push((param.to_string(), Vec::new()));
                self.entries.len() - 1
            }
        };
        let options = &mut self.entries[i].1;
        match options.iter().position(|(n, _)| n == option) {
            Some(j) => options[j].1 = value,
            None => options.push((option.to_string(), value)),
        }
    }

    pub fn get(&self, param: &str, option: &str) -> Option<bool> {
        self.entries
            .iter()
            .find(|(n, _)| n == param)
            .and_then(|(_, options)| options.iter().find(|(n, _)| n == option))
            .map(|(_, v)| *v)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, Vec<(String, bool)>)> {
        self.entries.iter()
    }
}

/// Serialize parameters and options into a query string.
///
/// Booleans serialize lowercase, list parameters repeat as `name[]=value`
/// in insertion order, and options as `options[param][option]=bool`.
pub(crate) fn encode_query(params: &ParamStore, options: &OptionStore) -> String {
    let mut parts: Vec<String> = Vec::new();

    for (name, value) in params.iter() {
        match value {
            ParamValue::Scalar(v) => parts.push(format!("{}={}", name, v)),
            ParamValue::List(values) => {
                for v in values {
                    parts.push(format!("{}[]={}", name, v));
                }
            }
            ParamValue::Flag(v) => parts.push(format!("{}={}", name, v)),
        }
    }

    for (param, opts) in options.iter() {
        for (option, value) in opts {
            parts.push(format!("options[{}][{}]={}", param, option, value));
        }
    }

    parts.join("&")
}
