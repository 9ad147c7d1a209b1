use crate::contract::{HttpMethod, OperationTemplate, PathTemplate, Segment};
use crate::error::{GuardError, Result};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// All operations sharing one path template
#[derive(Debug)]
pub struct RouteEntry {
    template: PathTemplate,
    operations: BTreeMap<HttpMethod, Arc<OperationTemplate>>,
}

impl RouteEntry {
    pub fn template(&self) -> &PathTemplate {
        &self.template
    }

    pub fn operation(&self, method: HttpMethod) -> Option<&Arc<OperationTemplate>> {
        self.operations.get(&method)
    }

    pub fn methods(&self) -> impl Iterator<Item = HttpMethod> + '_ {
        self.operations.keys().copied()
    }
}

/// A template whose shape matched the request path, with its bindings
#[derive(Debug)]
pub struct Candidate<'a, 'p> {
    pub entry: &'a RouteEntry,
    pub bindings: Vec<(&'a str, &'p str)>,
}

/// Path-template index grouped by segment count.
///
/// Within a group entries are ordered most specific first: at the first
/// position where two templates differ, a literal segment beats a parameter.
#[derive(Debug, Default)]
pub struct RouteIndex {
    by_len: HashMap<usize, Vec<RouteEntry>>,
}

impl RouteIndex {
    pub fn build(operations: &[Arc<OperationTemplate>]) -> Result<Self> {
        let mut entries: BTreeMap<&str, RouteEntry> = BTreeMap::new();
        for op in operations {
            let entry = entries
                .entry(op.template.as_str())
                .or_insert_with(|| RouteEntry {
                    template: op.template.clone(),
                    operations: BTreeMap::new(),
                });
            if entry.operations.insert(op.method, Arc::clone(op)).is_some() {
                return Err(GuardError::ContractError(format!(
                    "duplicate operation {} {}",
                    op.method, op.template
                )));
            }
        }

        // Same shape under different parameter names cannot be routed apart
        let mut shapes: HashMap<(String, HttpMethod), &str> = HashMap::new();
        for entry in entries.values() {
            for method in entry.methods() {
                if let Some(other) = shapes.insert((entry.template.shape(), method), entry.template.as_str()) {
                    return Err(GuardError::ContractError(format!(
                        "ambiguous templates for {}: {} and {}",
                        method, other, entry.template
                    )));
                }
            }
        }

        let mut by_len: HashMap<usize, Vec<RouteEntry>> = HashMap::new();
        for entry in entries.into_values() {
            by_len.entry(entry.template.len()).or_default().push(entry);
        }
        for group in by_len.values_mut() {
            group.sort_by(|a, b| specificity(&a.template, &b.template));
        }

        Ok(Self { by_len })
    }

    /// Every entry whose shape matches the path, most specific first
    pub fn candidates<'a, 'p>(&'a self, segments: &[&'p str]) -> Vec<Candidate<'a, 'p>> {
        self.by_len
            .get(&segments.len())
            .into_iter()
            .flatten()
            .filter_map(|entry| {
                entry
                    .template
                    .match_segments(segments)
                    .map(|bindings| Candidate { entry, bindings })
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.by_len.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Orders more specific templates first
fn specificity(a: &PathTemplate, b: &PathTemplate) -> Ordering {
    for (x, y) in a.segments().iter().zip(b.segments()) {
        match (x, y) {
            (Segment::Literal(_), Segment::Param { .. }) => return Ordering::Less,
            (Segment::Param { .. }, Segment::Literal(_)) => return Ordering::Greater,
            _ => {}
        }
    }
    a.as_str().cmp(b.as_str())
}
