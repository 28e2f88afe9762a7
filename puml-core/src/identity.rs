//! Content-derived identity for rendered artifacts.
//!
//! An [`ArtifactId`] is a pure function of the request's semantic fields:
//! the output format and the diagram source. Nothing time- or
//! randomness-dependent enters the digest, so identical requests always
//! share one artifact.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::request::RenderRequest;

/// Length in hex characters of every [`ArtifactId`] (128-bit SHA-256 prefix).
pub const ARTIFACT_ID_LEN: usize = 32;

/// Fixed-width, lowercase-hex identifier of a rendered artifact.
///
/// Safe to use verbatim as a file name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ArtifactId(String);

impl ArtifactId {
    /// Parse an id previously produced by [`identify`].
    ///
    /// Returns `None` unless the input is exactly [`ARTIFACT_ID_LEN`]
    /// lowercase hex characters.
    pub fn parse(raw: &str) -> Option<Self> {
        let valid = raw.len() == ARTIFACT_ID_LEN
            && raw
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        valid.then(|| Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ArtifactId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ArtifactId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("invalid artifact id: {}", value))
    }
}

impl From<ArtifactId> for String {
    fn from(id: ArtifactId) -> Self {
        id.0
    }
}

/// Derive the artifact id for a render request.
///
/// The format name and source are separated by a NUL byte so that no
/// (format, text) pair can alias another.
pub fn identify(request: &RenderRequest) -> ArtifactId {
    let mut hasher = Sha256::new();
    hasher.update(request.output_format.as_str().as_bytes());
    hasher.update([0u8]);
    hasher.update(request.source_text.as_bytes());
    let digest = hasher.finalize();
    ArtifactId(hex::encode(&digest[..ARTIFACT_ID_LEN / 2]))
}
