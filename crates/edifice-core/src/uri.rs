//! Graph URIs linking a record back to the source graph.
//!
//! Two forms are understood:
//!
//! - `graph://{element}/vertex/{vertex}/global/{global}` for direct
//!   references into the source graph database
//! - `{base}/element/{element}?vertex={vertex}&global={global}` for
//!   resolution through an HTTP endpoint
//!
//! Keys are not percent-encoded; the extraction tooling only emits
//! URL-safe keys.

use crate::error::CoreError;
use crate::node::ExternalKeys;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

const SCHEME: &str = "graph://";

/// The three external keys of a record, addressable as a URI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphUri {
    pub element_key: String,
    pub vertex_key: String,
    pub global_key: String,
}

impl GraphUri {
    pub fn new(
        element_key: impl Into<String>,
        vertex_key: impl Into<String>,
        global_key: impl Into<String>,
    ) -> Self {
        Self {
            element_key: element_key.into(),
            vertex_key: vertex_key.into(),
            global_key: global_key.into(),
        }
    }

    /// Renders the HTTP form against `base` (trailing slashes are trimmed).
    pub fn with_base(&self, base: &str) -> String {
        format!(
            "{}/element/{}?vertex={}&global={}",
            base.trim_end_matches('/'),
            self.element_key,
            self.vertex_key,
            self.global_key
        )
    }

    fn parse_scheme(rest: &str) -> Option<Self> {
        let (element, rest) = rest.split_once("/vertex/")?;
        let (vertex, global) = rest.split_once("/global/")?;
        if element.is_empty() || vertex.is_empty() || global.is_empty() {
            return None;
        }
        Some(Self::new(element, vertex, global))
    }

    fn parse_http(uri: &str) -> Option<Self> {
        let (path, query) = uri.split_once('?')?;
        let (_, element) = path.rsplit_once("/element/")?;

        let mut vertex = None;
        let mut global = None;
        for pair in query.split('&') {
            match pair.split_once('=') {
                Some(("vertex", v)) => vertex = Some(v),
                Some(("global", g)) => global = Some(g),
                _ => {}
            }
        }

        match (element, vertex, global) {
            (e, Some(v), Some(g)) if !e.is_empty() && !v.is_empty() && !g.is_empty() => {
                Some(Self::new(e, v, g))
            }
            _ => None,
        }
    }
}

impl From<&ExternalKeys> for GraphUri {
    fn from(keys: &ExternalKeys) -> Self {
        Self::new(&keys.element_key, &keys.vertex_key, &keys.global_key)
    }
}

impl std::fmt::Display for GraphUri {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}{}/vertex/{}/global/{}",
            SCHEME, self.element_key, self.vertex_key, self.global_key
        )
    }
}

impl FromStr for GraphUri {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parsed = if let Some(rest) = s.strip_prefix(SCHEME) {
            Self::parse_scheme(rest)
        } else if s.starts_with("http://") || s.starts_with("https://") {
            Self::parse_http(s)
        } else {
            None
        };

        parsed.ok_or_else(|| CoreError::InvalidUri(s.to_string()))
    }
}
