//! Core type definitions for Talon
//!
//! This module defines the hierarchical path type the datastore is
//! addressed by, and the payload-encoding tag carried by every path.

use serde::{Deserialize, Serialize};
use std::fmt;

/// File-name suffix that marks a JSON-encoded record on disk.
pub const JSON_SUFFIX: &str = ".json.db";

/// Payload encoding for a datastore record
///
/// The tag selects how a structured message is encoded into payload
/// bytes; directory membership is purely structural and ignores it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PayloadKind {
    /// Self-describing canonical JSON text
    #[default]
    Json,
    /// Compact binary encoding
    Binary,
}

impl PayloadKind {
    /// Infer the encoding of an on-disk record from its file name
    #[must_use]
    pub fn from_file_name(name: &str) -> Self {
        if name.ends_with(JSON_SUFFIX) {
            Self::Json
        } else {
            Self::Binary
        }
    }
}

/// Hierarchical datastore key
///
/// A sequence of name components plus a payload-encoding tag. Two paths
/// are equal when both the components and the tag match. The empty
/// sequence denotes the datastore root.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StorePath {
    components: Vec<String>,
    kind: PayloadKind,
}

impl StorePath {
    /// Create a path from components with an explicit encoding tag
    pub fn new<I, S>(components: I, kind: PayloadKind) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            components: components.into_iter().map(Into::into).collect(),
            kind,
        }
    }

    /// Create a JSON-tagged path
    pub fn json<I, S>(components: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(components, PayloadKind::Json)
    }

    /// Create a binary-tagged path
    pub fn binary<I, S>(components: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(components, PayloadKind::Binary)
    }

    /// The datastore root
    #[must_use]
    pub fn root() -> Self {
        Self {
            components: Vec::new(),
            kind: PayloadKind::Json,
        }
    }

    /// Path components, outermost first
    #[must_use]
    pub fn components(&self) -> &[String] {
        &self.components
    }

    /// The payload-encoding tag
    #[must_use]
    pub fn kind(&self) -> PayloadKind {
        self.kind
    }

    /// True for the empty (root) path
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.components.is_empty()
    }

    /// Final component, if any
    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        self.components.last().map(String::as_str)
    }

    /// The containing directory: this path with its last component
    /// removed. The parent of the root is the root.
    #[must_use]
    pub fn parent(&self) -> Self {
        let mut components = self.components.clone();
        components.pop();
        Self {
            components,
            kind: self.kind,
        }
    }

    /// Derive a child path; the tag is inferred from the child's name
    #[must_use]
    pub fn child(&self, name: impl Into<String>) -> Self {
        let name = name.into();
        let kind = PayloadKind::from_file_name(&name);
        let mut components = self.components.clone();
        components.push(name);
        Self { components, kind }
    }

    /// Canonical directory-key string for this path (`/a/b`, root = `/`)
    ///
    /// The key is independent of the encoding tag, so all records under
    /// a directory share one directory-cache entry.
    #[must_use]
    pub fn dir_key(&self) -> String {
        if self.components.is_empty() {
            return "/".to_string();
        }
        let mut key = String::new();
        for component in &self.components {
            key.push('/');
            key.push_str(component);
        }
        key
    }
}

impl fmt::Debug for StorePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StorePath({}, {:?})", self.dir_key(), self.kind)
    }
}

impl fmt::Display for StorePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.dir_key())
    }
}
