//! Path pattern parsing and matching.
//!
//! # Responsibilities
//! - Parse patterns like `/users/:id/files/*rest` into segments
//! - Match a request path and bind named segments
//! - Rank competing matches by specificity
//!
//! # Design Decisions
//! - Static and `:param` patterns match an exact segment count
//! - `:param` matches any non-empty segment
//! - `*name` must be the last segment and captures the remaining path
//! - Matching is case-sensitive; no regex in the hot path
//! - Request segments are percent-decoded one by one, so `%2F` stays inside
//!   its segment

use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

use percent_encoding::percent_decode_str;
use thiserror::Error;

/// Why a path pattern was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("path pattern {0:?} must start with '/'")]
    MissingLeadingSlash(String),

    #[error("path pattern {0:?} has an unnamed parameter")]
    EmptyParamName(String),

    #[error("path pattern {0:?} has a catch-all segment that is not last")]
    CatchAllNotLast(String),

    #[error("path pattern {0:?} binds parameter {1:?} twice")]
    DuplicateParam(String, String),
}

/// One segment of a compiled pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Static(String),
    Param(String),
    CatchAll(String),
}

impl Segment {
    fn rank(&self) -> u8 {
        match self {
            Segment::Static(_) => 2,
            Segment::Param(_) => 1,
            Segment::CatchAll(_) => 0,
        }
    }
}

/// A compiled path pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
}

/// Named segments bound by a successful match.
pub type PathParams = HashMap<String, String>;

impl PathPattern {
    /// Compile a pattern.
    pub fn parse(raw: &str) -> Result<Self, PatternError> {
        let rest = raw
            .strip_prefix('/')
            .ok_or_else(|| PatternError::MissingLeadingSlash(raw.to_string()))?;

        let mut segments = Vec::new();
        let mut names: Vec<&str> = Vec::new();
        let parts: Vec<&str> = if rest.is_empty() {
            Vec::new()
        } else {
            rest.split('/').collect()
        };

        for (i, part) in parts.iter().enumerate() {
            let segment = if let Some(name) = part.strip_prefix(':') {
                Self::check_name(raw, name, &mut names)?;
                Segment::Param(name.to_string())
            } else if let Some(name) = part.strip_prefix('*') {
                if i + 1 != parts.len() {
                    return Err(PatternError::CatchAllNotLast(raw.to_string()));
                }
                Self::check_name(raw, name, &mut names)?;
                Segment::CatchAll(name.to_string())
            } else {
                Segment::Static(part.to_string())
            };
            segments.push(segment);
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    fn check_name<'a>(raw: &str, name: &'a str, names: &mut Vec<&'a str>) -> Result<(), PatternError> {
        if name.is_empty() {
            return Err(PatternError::EmptyParamName(raw.to_string()));
        }
        if names.contains(&name) {
            return Err(PatternError::DuplicateParam(raw.to_string(), name.to_string()));
        }
        names.push(name);
        Ok(())
    }

    /// The pattern as written.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Normalized shape with parameter names erased.
    ///
    /// `/users/:id` and `/users/:uid` share the shape `/users/:`, so they
    /// compete for the same requests and count as the same path.
    pub fn shape(&self) -> String {
        let mut shape = String::new();
        for segment in &self.segments {
            shape.push('/');
            match segment {
                Segment::Static(s) => shape.push_str(s),
                Segment::Param(_) => shape.push(':'),
                Segment::CatchAll(_) => shape.push('*'),
            }
        }
        if shape.is_empty() {
            shape.push('/');
        }
        shape
    }

    /// Match a raw request path, returning the bound (decoded) parameters.
    pub fn matches(&self, path: &str) -> Option<PathParams> {
        let rest = path.strip_prefix('/').unwrap_or(path);
        let parts: Vec<Cow<'_, str>> = if rest.is_empty() {
            Vec::new()
        } else {
            rest.split('/')
                .map(|part| percent_decode_str(part).decode_utf8_lossy())
                .collect()
        };

        let mut params = PathParams::new();
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::CatchAll(name) => {
                    let tail = parts.get(i..).map(|t| t.join("/")).unwrap_or_default();
                    params.insert(name.clone(), format!("/{}", tail));
                    return Some(params);
                }
                Segment::Static(expected) => {
                    if parts.get(i).map(|p| &**p) != Some(expected.as_str()) {
                        return None;
                    }
                }
                Segment::Param(name) => match parts.get(i) {
                    Some(value) if !value.is_empty() => {
                        params.insert(name.clone(), value.to_string());
                    }
                    _ => return None,
                },
            }
        }

        if parts.len() == self.segments.len() {
            Some(params)
        } else {
            None
        }
    }

    /// Order two patterns by specificity; `Greater` means `self` wins.
    pub fn specificity_cmp(&self, other: &Self) -> Ordering {
        for (a, b) in self.segments.iter().zip(&other.segments) {
            match a.rank().cmp(&b.rank()) {
                Ordering::Equal => continue,
                unequal => return unequal,
            }
        }
        self.segments.len().cmp(&other.segments.len())
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
