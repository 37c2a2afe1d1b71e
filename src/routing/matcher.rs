//! Route pattern matching.
//!
//! # Responsibilities
//! - Match a request path against a `/`-separated pattern
//! - Capture `:name` segments in declaration order
//!
//! # Design Decisions
//! - Exact arity: N pattern segments only match N path segments
//! - Anchored at both ends, literal segments compare exactly
//! - No trailing-slash normalization (`/a/` and `/a` differ)
//! - No regex, a single pass over the segments

/// Marker that turns a pattern segment into a named parameter.
const PARAM_MARKER: char = ':';

/// Parameters captured by a successful match, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteParams {
    pairs: Vec<(String, String)>,
}

impl RouteParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            pairs: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Value captured for `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    fn push(&mut self, name: &str, value: &str) {
        self.pairs.push((name.to_string(), value.to_string()));
    }
}

/// Match `path` against `pattern`.
///
/// Returns the captured parameters, or `None` when the path does not fit
/// the pattern structurally.
pub fn match_path(pattern: &str, path: &str) -> Option<RouteParams> {
    let mut pattern_segments = pattern.split('/');
    let mut path_segments = path.split('/');
    let mut params = RouteParams::new();

    loop {
        match (pattern_segments.next(), path_segments.next()) {
            (None, None) => return Some(params),
            (Some(expected), Some(actual)) => match param_name(expected) {
                Some(name) => {
                    if actual.is_empty() {
                        return None;
                    }
                    params.push(name, actual);
                }
                None if expected == actual => {}
                None => return None,
            },
            _ => return None,
        }
    }
}

fn param_name(segment: &str) -> Option<&str> {
    segment
        .strip_prefix(PARAM_MARKER)
        .filter(|name| !name.is_empty())
}
