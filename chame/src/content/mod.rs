//! Content categories, descriptors and loader outcomes

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of asset a bundle request asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentCategory {
    /// JavaScript bundles
    #[serde(alias = "js")]
    JavaScript,
    /// Stylesheet bundles
    Css,
}

/// Static metadata for a [`ContentCategory`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentDescriptor {
    /// MIME type written in the `Content-Type` header
    pub mime_type: &'static str,
    /// Conventional file extension, without the dot
    pub file_extension: &'static str,
    /// Whether several files may be concatenated into one response
    pub allow_bundling: bool,
}

const JAVASCRIPT: ContentDescriptor = ContentDescriptor {
    mime_type: "application/javascript",
    file_extension: "js",
    allow_bundling: true,
};

const CSS: ContentDescriptor = ContentDescriptor {
    mime_type: "text/css",
    file_extension: "css",
    allow_bundling: true,
};

impl ContentCategory {
    /// Every category, in a stable order
    pub const ALL: [Self; 2] = [Self::JavaScript, Self::Css];

    /// Descriptor for this category
    #[must_use]
    pub const fn descriptor(self) -> &'static ContentDescriptor {
        match self {
            Self::JavaScript => &JAVASCRIPT,
            Self::Css => &CSS,
        }
    }

    /// Short name used in cache keys and logs
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::JavaScript => "js",
            Self::Css => "css",
        }
    }
}

impl fmt::Display for ContentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown category name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown content category: {0}")]
pub struct UnknownCategory(pub String);

impl FromStr for ContentCategory {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "js" | "javascript" => Ok(Self::JavaScript),
            "css" => Ok(Self::Css),
            _ => Err(UnknownCategory(s.to_string())),
        }
    }
}

/// Text encoding label of a payload, e.g. `utf-8`
///
/// Payloads are kept as raw bytes already in this encoding; the label is
/// echoed in the `Content-Type` header and compared when responses merge.
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Charset(String);

impl Charset {
    /// The `utf-8` charset
    #[must_use]
    pub fn utf8() -> Self {
        Self("utf-8".to_string())
    }

    /// Create a charset from its label
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    /// The charset label
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Charset {
    fn default() -> Self {
        Self::utf8()
    }
}

impl PartialEq for Charset {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A concatenated bundle, as stored in the cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedContent {
    /// Bundle bytes
    pub payload: Bytes,
    /// Encoding of `payload`
    pub charset: Charset,
    /// Uppercase hex digest of `payload`, when ETag support is on
    pub fingerprint: Option<String>,
}

/// Result of one loader invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseOutcome {
    /// Content was produced (the payload may still be absent)
    Ok {
        /// Bundle bytes
        payload: Option<Bytes>,
        /// Encoding of the payload
        charset: Charset,
        /// Content fingerprint used as ETag
        fingerprint: Option<String>,
    },
    /// The client's cached copy is current
    NotModified {
        /// Fingerprint the client presented
        fingerprint: String,
    },
    /// This loader has nothing for the request
    NotFound,
}

impl ResponseOutcome {
    /// Build an `Ok` outcome carrying a payload
    #[must_use]
    pub fn content(payload: impl Into<Bytes>, charset: Charset, fingerprint: Option<String>) -> Self {
        Self::Ok {
            payload: Some(payload.into()),
            charset,
            fingerprint,
        }
    }
}

impl From<CachedContent> for ResponseOutcome {
    fn from(content: CachedContent) -> Self {
        Self::Ok {
            payload: Some(content.payload),
            charset: content.charset,
            fingerprint: content.fingerprint,
        }
    }
}
