use serde::{Deserialize, Serialize};

/// The OAI-PMH header of a harvested record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub identifier: String,
    #[serde(default)]
    pub datestamp: String,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub set_specs: Vec<String>,
}

impl Header {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            datestamp: String::new(),
            deleted: false,
            set_specs: Vec::new(),
        }
    }

    pub fn with_datestamp(mut self, datestamp: impl Into<String>) -> Self {
        self.datestamp = datestamp.into();
        self
    }

    pub fn with_set(mut self, set_spec: impl Into<String>) -> Self {
        self.set_specs.push(set_spec.into());
        self
    }

    pub fn mark_deleted(mut self) -> Self {
        self.deleted = true;
        self
    }
}

/// One harvested (header, metadata, about) triple.
///
/// `metadata` is `None` when the provider has no content for the requested
/// format or the record was deleted upstream. `about` is carried along but
/// never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub header: Header,
    #[serde(default)]
    pub metadata: Option<String>,
    #[serde(default)]
    pub about: Option<String>,
}

impl Record {
    pub fn new(header: Header, metadata: Option<String>) -> Self {
        Self {
            header,
            metadata,
            about: None,
        }
    }

    pub fn identifier(&self) -> &str {
        &self.header.identifier
    }

    /// The metadata payload, treating an empty string the same as no payload.
    pub fn content(&self) -> Option<&str> {
        self.metadata.as_deref().filter(|m| !m.is_empty())
    }
}
