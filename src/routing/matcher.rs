//! Path template parsing and matching.
//!
//! # Responsibilities
//! - Parse route templates such as `/config/iplist:update` or `/v1/{name=**}`
//! - Match tokenized request paths against a compiled template
//! - Bind captured segments to parameter names in declaration order
//!
//! # Design Decisions
//! - Templates are parsed once at registration, never on the request path
//! - A verb is only split off the final segment when the template declares one;
//!   otherwise the colon is an ordinary segment character
//! - No regex: segment-by-segment comparison
//! - Literals compare against the raw path; captured values are percent-decoded,
//!   except that `%2F` stays encoded inside a single-segment capture

use percent_encoding::percent_decode_str;
use thiserror::Error;

/// Errors raised while parsing a path template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("template '{0}' must start with '/'")]
    MissingLeadingSlash(String),

    #[error("template '{0}' contains an empty segment")]
    EmptySegment(String),

    #[error("malformed segment '{segment}' in template '{template}'")]
    MalformedSegment { template: String, segment: String },

    #[error("open-ended capture must be the last segment in template '{0}'")]
    RemainderNotLast(String),

    #[error("capture '{name}' is declared twice in template '{template}'")]
    DuplicateCapture { template: String, name: String },

    #[error("template '{0}' declares an empty verb")]
    EmptyVerb(String),
}

/// One compiled template segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Must equal the input segment exactly.
    Literal(String),
    /// Consumes exactly one segment, optionally binding it.
    Capture(Option<String>),
    /// Consumes all remaining segments (zero or more).
    Remainder(Option<String>),
}

impl Segment {
    fn parse(raw: &str, template: &str) -> Result<Self, PatternError> {
        let malformed = || PatternError::MalformedSegment {
            template: template.to_string(),
            segment: raw.to_string(),
        };

        match raw {
            "*" => return Ok(Segment::Capture(None)),
            "**" => return Ok(Segment::Remainder(None)),
            _ => {}
        }

        if let Some(inner) = raw.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
            let (name, sub) = match inner.split_once('=') {
                Some((name, sub)) => (name, Some(sub)),
                None => (inner, None),
            };
            if !is_field_path(name) {
                return Err(malformed());
            }
            return match sub {
                None | Some("*") => Ok(Segment::Capture(Some(name.to_string()))),
                Some("**") => Ok(Segment::Remainder(Some(name.to_string()))),
                Some(_) => Err(malformed()),
            };
        }

        if raw.contains(['{', '}', '*']) {
            return Err(malformed());
        }
        Ok(Segment::Literal(raw.to_string()))
    }

    fn name(&self) -> Option<&str> {
        match self {
            Segment::Capture(name) | Segment::Remainder(name) => name.as_deref(),
            Segment::Literal(_) => None,
        }
    }
}

fn is_field_path(name: &str) -> bool {
    !name.is_empty()
        && name
            .split('.')
            .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'))
}

/// Path parameters bound by a successful match, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams {
    entries: Vec<(String, String)>,
}

impl PathParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Match precedence of a template. Higher sorts first.
///
/// Field order matters: literal count dominates, then the presence of a verb,
/// then whether the template is bounded (no open-ended capture).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Specificity {
    literals: usize,
    has_verb: bool,
    bounded: bool,
}

/// A compiled path template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    template: String,
    segments: Vec<Segment>,
    verb: Option<String>,
}

impl PathPattern {
    /// Parse a template like `/config/{name}:update`.
    pub fn parse(template: &str) -> Result<Self, PatternError> {
        let mut rest = template
            .strip_prefix('/')
            .ok_or_else(|| PatternError::MissingLeadingSlash(template.to_string()))?;

        let mut verb = None;
        if let Some(idx) = rest.rfind(':') {
            let tail = &rest[idx + 1..];
            if !tail.contains(['/', '}']) {
                if tail.is_empty() {
                    return Err(PatternError::EmptyVerb(template.to_string()));
                }
                verb = Some(tail.to_string());
                rest = &rest[..idx];
            }
        }

        let mut segments = Vec::new();
        if !rest.is_empty() {
            for raw in rest.split('/') {
                if raw.is_empty() {
                    return Err(PatternError::EmptySegment(template.to_string()));
                }
                segments.push(Segment::parse(raw, template)?);
            }
        }

        if let Some(pos) = segments.iter().position(|s| matches!(s, Segment::Remainder(_))) {
            if pos + 1 != segments.len() {
                return Err(PatternError::RemainderNotLast(template.to_string()));
            }
        }

        let mut seen: Vec<&str> = Vec::new();
        for name in segments.iter().filter_map(Segment::name) {
            if seen.contains(&name) {
                return Err(PatternError::DuplicateCapture {
                    template: template.to_string(),
                    name: name.to_string(),
                });
            }
            seen.push(name);
        }

        Ok(Self {
            template: template.to_string(),
            segments,
            verb,
        })
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn verb(&self) -> Option<&str> {
        self.verb.as_deref()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn specificity(&self) -> Specificity {
        Specificity {
            literals: self
                .segments
                .iter()
                .filter(|s| matches!(s, Segment::Literal(_)))
                .count(),
            has_verb: self.verb.is_some(),
            bounded: !self.segments.iter().any(|s| matches!(s, Segment::Remainder(_))),
        }
    }

    /// Match tokenized path segments (see [`split_path`]).
    pub fn matches(&self, input: &[&str]) -> Option<PathParams> {
        match &self.verb {
            Some(verb) => {
                let (last, init) = input.split_last()?;
                let stem = last.strip_suffix(verb.as_str())?.strip_suffix(':')?;
                if stem.is_empty() {
                    return None;
                }
                let mut segments = init.to_vec();
                segments.push(stem);
                self.match_segments(&segments)
            }
            None => self.match_segments(input),
        }
    }

    fn match_segments(&self, input: &[&str]) -> Option<PathParams> {
        let mut params = PathParams::new();
        let mut pos = 0;

        for segment in &self.segments {
            match segment {
                Segment::Literal(literal) => {
                    if *input.get(pos)? != literal.as_str() {
                        return None;
                    }
                    pos += 1;
                }
                Segment::Capture(name) => {
                    let value = input.get(pos)?;
                    if let Some(name) = name {
                        params.push(name.as_str(), unescape_segment(value));
                    }
                    pos += 1;
                }
                Segment::Remainder(name) => {
                    if let Some(name) = name {
                        params.push(name.as_str(), decode(&input[pos..].join("/")));
                    }
                    pos = input.len();
                }
            }
        }

        (pos == input.len()).then_some(params)
    }

    /// Whether some request path could be matched by both templates.
    pub fn overlaps(&self, other: &PathPattern) -> bool {
        self.verb == other.verb && segments_overlap(&self.segments, &other.segments)
    }
}

fn segments_overlap(a: &[Segment], b: &[Segment]) -> bool {
    match (a.split_first(), b.split_first()) {
        (None, None) => true,
        (Some((Segment::Remainder(_), _)), _) | (_, Some((Segment::Remainder(_), _))) => true,
        (Some((x, rest_a)), Some((y, rest_b))) => {
            let compatible = match (x, y) {
                (Segment::Literal(l), Segment::Literal(r)) => l == r,
                _ => true,
            };
            compatible && segments_overlap(rest_a, rest_b)
        }
        _ => false,
    }
}

fn decode(raw: &str) -> String {
    percent_decode_str(raw).decode_utf8_lossy().into_owned()
}

/// Decode one captured segment, keeping encoded slashes as `%2F`.
fn unescape_segment(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(idx) = find_encoded_slash(rest) {
        out.push_str(&decode(&rest[..idx]));
        out.push_str(&rest[idx..idx + 3]);
        rest = &rest[idx + 3..];
    }
    out.push_str(&decode(rest));
    out
}

fn find_encoded_slash(raw: &str) -> Option<usize> {
    raw.as_bytes()
        .windows(3)
        .position(|w| w[0] == b'%' && w[1] == b'2' && w[2].eq_ignore_ascii_case(&b'f'))
}

/// Split a request path into segments, ignoring leading and trailing slashes.
pub fn split_path(path: &str) -> Vec<&str> {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        Vec::new()
    } else {
        trimmed.split('/').collect()
    }
}
