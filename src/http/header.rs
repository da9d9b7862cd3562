//! Ordered, case-insensitive header view.
//!
//! # Responsibilities
//! - Own the request headers for the lifetime of a facade
//! - Keep header names in the order they first arrived
//! - Report the wire length of the header block without serializing it
//!
//! # Design Decisions
//! - Names are `HeaderName`, which is always lowercase, so lookups are
//!   case-insensitive for free
//! - Values stay raw `HeaderValue`; string accessors skip values that are
//!   not valid UTF-8 instead of failing the whole lookup

use axum::http::header::{HeaderMap, HeaderName, HeaderValue};
use indexmap::IndexMap;

use crate::http::error::HeaderError;

/// Header container owned by a request facade.
#[derive(Debug, Clone, Default)]
pub struct HeaderView {
    entries: IndexMap<HeaderName, Vec<HeaderValue>>,
}

impl HeaderView {
    /// Create an empty view.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a view from a transport header map.
    pub fn from_map(map: HeaderMap) -> Self {
        let mut entries: IndexMap<HeaderName, Vec<HeaderValue>> = IndexMap::new();
        let mut current: Option<HeaderName> = None;

        // `HeaderMap::into_iter` yields the name only on the first value of each run.
        for (name, value) in map {
            if let Some(name) = name {
                current = Some(name);
            }
            if let Some(name) = &current {
                entries.entry(name.clone()).or_default().push(value);
            }
        }

        Self { entries }
    }

    /// Rebuild a transport header map, preserving view order.
    pub fn into_map(self) -> HeaderMap {
        let mut map = HeaderMap::with_capacity(self.entries.len());
        for (name, values) in self.entries {
            for value in values {
                map.append(name.clone(), value);
            }
        }
        map
    }

    /// First value for `name` that is valid UTF-8.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values(name)?.iter().find_map(|v| v.to_str().ok())
    }

    /// All UTF-8 values for `name`, in arrival order.
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.values(name)
            .map(|vs| vs.iter().filter_map(|v| v.to_str().ok()).collect())
            .unwrap_or_default()
    }

    /// Whether any value exists for `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.values(name).is_some_and(|vs| !vs.is_empty())
    }

    /// Replace every value of `name` with `value`.
    pub fn set(&mut self, name: &str, value: &str) -> Result<(), HeaderError> {
        let (name, value) = parse_pair(name, value)?;
        match self.entries.get_mut(&name) {
            Some(values) => {
                values.clear();
                values.push(value);
            }
            None => {
                self.entries.insert(name, vec![value]);
            }
        }
        Ok(())
    }

    /// Append `value` to the values of `name`.
    pub fn add(&mut self, name: &str, value: &str) -> Result<(), HeaderError> {
        let (name, value) = parse_pair(name, value)?;
        self.entries.entry(name).or_default().push(value);
        Ok(())
    }

    /// Remove `name`, returning how many values were dropped.
    pub fn remove(&mut self, name: &str) -> usize {
        let Ok(name) = HeaderName::from_bytes(name.as_bytes()) else {
            return 0;
        };
        self.entries
            .shift_remove(&name)
            .map(|values| values.len())
            .unwrap_or(0)
    }

    /// Iterate `(name, value)` pairs in view order.
    pub fn iter(&self) -> impl Iterator<Item = (&HeaderName, &HeaderValue)> {
        self.entries
            .iter()
            .flat_map(|(name, values)| values.iter().map(move |v| (name, v)))
    }

    /// Number of header values (a name with two values counts twice).
    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Byte length of the header block as `name: value\r\n` lines.
    pub fn encoded_len(&self) -> usize {
        self.iter()
            .map(|(name, value)| name.as_str().len() + 2 + value.len() + 2)
            .sum()
    }

    fn values(&self, name: &str) -> Option<&Vec<HeaderValue>> {
        let name = HeaderName::from_bytes(name.as_bytes()).ok()?;
        self.entries.get(&name)
    }
}

impl From<HeaderMap> for HeaderView {
    fn from(map: HeaderMap) -> Self {
        Self::from_map(map)
    }
}

fn parse_pair(name: &str, value: &str) -> Result<(HeaderName, HeaderValue), HeaderError> {
    let header_name = HeaderName::from_bytes(name.as_bytes())
        .map_err(|_| HeaderError::InvalidName(name.to_string()))?;
    let header_value = HeaderValue::from_str(value).map_err(|_| HeaderError::InvalidValue {
        name: name.to_string(),
    })?;
    Ok((header_name, header_value))
}
