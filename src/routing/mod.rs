//! Path router: maps (method, path) onto contract operations.

mod index;

pub use index::RouteIndex;

use crate::contract::{HttpMethod, OperationTemplate, SchemaModel};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Why a request did not match any operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnmatchedKind {
    /// No template has the shape of the request path
    NoPath,
    /// The path is known but not for this method
    WrongMethod,
}

/// Outcome of routing one request
#[derive(Debug, Clone)]
pub enum MatchResult {
    Matched {
        operation: Arc<OperationTemplate>,
        path_params: BTreeMap<String, String>,
    },
    Unmatched {
        kind: UnmatchedKind,
        /// Methods declared for the path; empty for `NoPath`
        allowed_methods: Vec<HttpMethod>,
    },
}

impl MatchResult {
    fn no_path() -> Self {
        MatchResult::Unmatched {
            kind: UnmatchedKind::NoPath,
            allowed_methods: vec![],
        }
    }

    pub fn is_matched(&self) -> bool {
        matches!(self, MatchResult::Matched { .. })
    }
}

/// Routing knobs taken from the validator configuration
#[derive(Debug, Clone, Copy, Default)]
pub struct RouteOptions {
    /// Treat `/pet/` like `/pet`
    pub ignore_trailing_slash: bool,
}

/// Route a request against the model.
///
/// Never fails: malformed paths are reported as `NoPath`.
pub fn match_route(
    model: &SchemaModel,
    method: &http::Method,
    path: &str,
    options: RouteOptions,
) -> MatchResult {
    let Some(segments) = split_path(path, options) else {
        return MatchResult::no_path();
    };

    let candidates = model.routes().candidates(&segments);
    if candidates.is_empty() {
        return MatchResult::no_path();
    }

    let method = HttpMethod::from_http(method);
    // Candidates come most specific first
    let matched = method.and_then(|method| {
        candidates
            .iter()
            .find_map(|candidate| candidate.entry.operation(method).map(|op| (candidate, op)))
    });

    match matched {
        Some((candidate, operation)) => MatchResult::Matched {
            operation: Arc::clone(operation),
            path_params: candidate
                .bindings
                .iter()
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect(),
        },
        None => {
            let mut allowed_methods: Vec<HttpMethod> = candidates
                .iter()
                .flat_map(|candidate| candidate.entry.methods())
                .collect();
            allowed_methods.sort();
            allowed_methods.dedup();

            MatchResult::Unmatched {
                kind: UnmatchedKind::WrongMethod,
                allowed_methods,
            }
        }
    }
}

/// Split a request path into segments; `None` when it cannot match anything
fn split_path(path: &str, options: RouteOptions) -> Option<Vec<&str>> {
    let path = path.split_once('?').map_or(path, |(path, _)| path);
    let mut rest = path.strip_prefix('/')?;

    if options.ignore_trailing_slash {
        rest = rest.strip_suffix('/').unwrap_or(rest);
    }
    if rest.is_empty() {
        return Some(vec![]);
    }
    Some(rest.split('/').collect())
}
