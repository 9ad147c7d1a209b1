use crate::error::{GuardError, Result};
use std::fmt;

/// One segment of a path template
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Must match the request segment exactly (case-sensitive)
    Literal(String),
    /// `{name}`, optionally surrounded by literal text within the segment
    Param {
        name: String,
        prefix: String,
        suffix: String,
    },
}

impl Segment {
    pub fn is_literal(&self) -> bool {
        matches!(self, Segment::Literal(_))
    }

    /// Match one request segment, returning the bound value for parameters
    fn matches<'p>(&self, segment: &'p str) -> Option<Option<&'p str>> {
        match self {
            Segment::Literal(literal) => (literal == segment).then_some(None),
            Segment::Param { prefix, suffix, .. } => {
                let value = segment.strip_prefix(prefix.as_str())?;
                let value = value.strip_suffix(suffix.as_str())?;
                (!value.is_empty()).then_some(Some(value))
            }
        }
    }
}

/// Parsed path template such as `/v2/pet/{petId}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    raw: String,
    segments: Vec<Segment>,
}

impl PathTemplate {
    pub fn parse(raw: &str) -> Result<Self> {
        let invalid = |reason: &str| GuardError::InvalidPathTemplate {
            template: raw.to_string(),
            reason: reason.to_string(),
        };

        let rest = raw
            .strip_prefix('/')
            .ok_or_else(|| invalid("template must start with '/'"))?;

        let mut segments = Vec::new();
        let mut names: Vec<&str> = Vec::new();

        if !rest.is_empty() {
            let parts: Vec<&str> = rest.split('/').collect();
            let last = parts.len() - 1;

            for (i, part) in parts.iter().enumerate() {
                // Only a trailing slash may leave an empty segment
                if part.is_empty() && i != last {
                    return Err(invalid("empty segment"));
                }

                match (part.find('{'), part.find('}')) {
                    (None, None) => segments.push(Segment::Literal(part.to_string())),
                    (Some(open), Some(close)) if open < close => {
                        let name = &part[open + 1..close];
                        let suffix = &part[close + 1..];
                        if name.is_empty() {
                            return Err(invalid("empty parameter name"));
                        }
                        if suffix.contains(['{', '}']) || part[..open].contains('}') {
                            return Err(invalid("only one parameter per segment is supported"));
                        }
                        if names.contains(&name) {
                            return Err(invalid("duplicate parameter name"));
                        }
                        names.push(name);
                        segments.push(Segment::Param {
                            name: name.to_string(),
                            prefix: part[..open].to_string(),
                            suffix: suffix.to_string(),
                        });
                    }
                    _ => return Err(invalid("unbalanced braces")),
                }
            }
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Names of the parameters bound by this template, left to right
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Param { name, .. } => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Template with parameter names erased; two templates with the same
    /// shape can never be told apart by a request path.
    pub fn shape(&self) -> String {
        self.segments
            .iter()
            .map(|s| match s {
                Segment::Literal(l) => l.clone(),
                Segment::Param { prefix, suffix, .. } => format!("{}{{}}{}", prefix, suffix),
            })
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Match request segments (already split) and collect parameter bindings
    pub fn match_segments<'p>(&self, path: &[&'p str]) -> Option<Vec<(&str, &'p str)>> {
        if path.len() != self.segments.len() {
            return None;
        }

        let mut bindings = Vec::new();
        for (segment, &part) in self.segments.iter().zip(path) {
            let bound = segment.matches(part)?;
            if let (Some(value), Segment::Param { name, .. }) = (bound, segment) {
                bindings.push((name.as_str(), value));
            }
        }
        Some(bindings)
    }
}

impl fmt::Display for PathTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
