//! Call metadata and the header/trailer merge rules.
//!
//! # Responsibilities
//! - Hold ordered multi-valued metadata with lowercase keys
//! - Merge metadata observed at different points of a call
//! - Convert to and from tonic's wire representation
//!
//! # Design Decisions
//! - Insertion order is preserved so rendered headers are deterministic
//! - Joining never duplicates an identical (key, value) pair
//! - Binary (`-bin`) entries are not carried; the HTTP side is text only
//! - Transport-reserved keys never surface as call metadata

use tonic::metadata::{AsciiMetadataKey, AsciiMetadataValue, KeyAndValueRef};

const RESERVED_KEYS: &[&str] = &[
    "content-type",
    "content-length",
    "te",
    "trailer",
    "transfer-encoding",
    "connection",
    "date",
    "grpc-status",
    "grpc-message",
    "grpc-status-details-bin",
    "grpc-encoding",
    "grpc-accept-encoding",
    "grpc-timeout",
];

/// Whether `key` belongs to the transport rather than the application.
pub fn is_reserved(key: &str) -> bool {
    RESERVED_KEYS.contains(&key)
}

/// Ordered multi-map of lowercase metadata keys to string values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataMap {
    entries: Vec<(String, Vec<String>)>,
}

impl MetadataMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value under `key` (lowercased).
    pub fn append(&mut self, key: impl AsRef<str>, value: impl Into<String>) {
        let key = key.as_ref().to_ascii_lowercase();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, values)) => values.push(value),
            None => self.entries.push((key, vec![value])),
        }
    }

    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, values)| values.as_slice())
    }

    pub fn get_first(&self, key: &str) -> Option<&str> {
        self.get(key)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(k, values)| (k.as_str(), values.as_slice()))
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Union `other` into `self`: existing entries first, new values after,
    /// identical pairs kept once.
    pub fn join(&mut self, other: &MetadataMap) {
        for (key, values) in &other.entries {
            match self.entries.iter_mut().find(|(k, _)| k == key) {
                Some((_, existing)) => {
                    for value in values {
                        if !existing.contains(value) {
                            existing.push(value.clone());
                        }
                    }
                }
                None => {
                    let mut fresh: Vec<String> = Vec::with_capacity(values.len());
                    for value in values {
                        if !fresh.contains(value) {
                            fresh.push(value.clone());
                        }
                    }
                    self.entries.push((key.clone(), fresh));
                }
            }
        }
    }

    /// Application metadata from a tonic map. Binary and reserved keys are skipped.
    pub fn from_tonic(map: &tonic::metadata::MetadataMap) -> Self {
        let mut metadata = Self::new();
        for entry in map.iter() {
            if let KeyAndValueRef::Ascii(key, value) = entry {
                if is_reserved(key.as_str()) {
                    continue;
                }
                match value.to_str() {
                    Ok(value) => metadata.append(key.as_str(), value),
                    Err(_) => {
                        tracing::trace!(key = key.as_str(), "Skipping non-printable metadata value");
                    }
                }
            }
        }
        metadata
    }

    /// Wire representation for an outgoing call. Entries tonic cannot encode are dropped.
    pub fn to_tonic(&self) -> tonic::metadata::MetadataMap {
        let mut map = tonic::metadata::MetadataMap::new();
        for (key, values) in self.iter() {
            let Ok(name) = AsciiMetadataKey::from_bytes(key.as_bytes()) else {
                tracing::debug!(key, "Skipping metadata key not valid for gRPC");
                continue;
            };
            for value in values {
                match AsciiMetadataValue::try_from(value.as_str()) {
                    Ok(value) => {
                        map.append(name.clone(), value);
                    }
                    Err(_) => tracing::debug!(key, "Skipping metadata value not valid for gRPC"),
                }
            }
        }
        map
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for MetadataMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut metadata = Self::new();
        for (key, value) in iter {
            metadata.append(key, value);
        }
        metadata
    }
}

/// Metadata observed during one call, split by phase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallMetadata {
    pub header: MetadataMap,
    pub trailer: MetadataMap,
}

impl CallMetadata {
    pub fn new(header: MetadataMap, trailer: MetadataMap) -> Self {
        Self { header, trailer }
    }

    pub fn from_header(header: MetadataMap) -> Self {
        Self {
            header,
            trailer: MetadataMap::new(),
        }
    }

    /// Merge each phase independently.
    pub fn merge(mut self, captured: &CallMetadata) -> Self {
        self.header.join(&captured.header);
        self.trailer.join(&captured.trailer);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.header.is_empty() && self.trailer.is_empty()
    }
}

/// Trailer metadata an in-process handler attaches to its response
/// extensions. Local calls have no wire trailers, so this stands in for them.
#[derive(Debug, Clone, Default)]
pub struct TrailerMetadata(pub MetadataMap);
