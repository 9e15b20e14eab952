use std::collections::BTreeMap;
use std::fmt;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::{IndexError, IndexResult};

/// Metadata key a release stamps onto the document it freezes.
pub const RELEASE_METADATA_KEY: &str = "gdc_release_number";

/// Metadata key binding a record to the `{program}-{project}` it was submitted under.
pub const PROJECT_METADATA_KEY: &str = "project_id";

/// Version marker of an index document.
///
/// On the wire a head carries `"version": null` and a frozen record carries
/// its number as a string.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Version {
    /// The single mutable record of an entity that has not been released yet.
    #[default]
    Head,
    Versioned(u32),
}

impl Version {
    #[must_use]
    pub const fn number(self) -> Option<u32> {
        match self {
            Version::Head => None,
            Version::Versioned(n) => Some(n),
        }
    }

    #[must_use]
    pub const fn is_head(self) -> bool {
        matches!(self, Version::Head)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Version::Head => f.write_str("head"),
            Version::Versioned(n) => write!(f, "{n}"),
        }
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Version::Head => serializer.serialize_none(),
            Version::Versioned(n) => serializer.serialize_str(&n.to_string()),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawVersion {
    Number(u32),
    Text(String),
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Option::<RawVersion>::deserialize(deserializer)? {
            None => Ok(Version::Head),
            Some(RawVersion::Number(n)) => Ok(Version::Versioned(n)),
            Some(RawVersion::Text(s)) => s
                .trim()
                .parse()
                .map(Version::Versioned)
                .map_err(|_| D::Error::custom(format!("invalid version marker '{s}'"))),
        }
    }
}

/// One record in the index service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDocument {
    pub did: String,
    /// Identifier shared by every version of one logical entity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baseid: Option<String>,
    /// Revision token; persisting a stale revision is rejected by the index.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    #[serde(default)]
    pub version: Version,
    #[serde(default)]
    pub hashes: BTreeMap<String, String>,
    #[serde(default)]
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default)]
    pub urls: Vec<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form: Option<String>,
}

impl IndexDocument {
    /// Overwrites content attributes with `attrs`. Optional attributes left
    /// unset keep their current value.
    pub fn apply(&mut self, attrs: &NewVersion) {
        self.hashes = attrs.hashes.clone();
        self.size = attrs.size;
        if let Some(file_name) = &attrs.file_name {
            self.file_name = Some(file_name.clone());
        }
        if let Some(urls) = &attrs.urls {
            self.urls = urls.clone();
        }
        if let Some(metadata) = &attrs.metadata {
            self.metadata = metadata.clone();
        }
    }

    /// True when the record was submitted under `project_id`.
    #[must_use]
    pub fn belongs_to(&self, project_id: &str) -> bool {
        self.metadata
            .get(PROJECT_METADATA_KEY)
            .and_then(Value::as_str)
            == Some(project_id)
    }

    /// Freezes this head as version `number` and records the release in its metadata.
    pub fn stamp_release(&mut self, number: u32, release: &str) {
        self.version = Version::Versioned(number);
        self.metadata.insert(
            RELEASE_METADATA_KEY.to_string(),
            Value::String(release.to_string()),
        );
    }
}

/// Content attributes for a new or updated version of an entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewVersion {
    pub hashes: BTreeMap<String, String>,
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub urls: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<BTreeMap<String, Value>>,
}

impl NewVersion {
    #[must_use]
    pub fn new(hashes: BTreeMap<String, String>, size: u64) -> Self {
        Self {
            hashes,
            size,
            ..Self::default()
        }
    }

    /// Stamps `project_id` into the metadata. Metadata left unset is taken
    /// from `current` without its release stamp, so the binding survives
    /// writes that only change content.
    pub fn bind_to_project(&mut self, project_id: &str, current: Option<&IndexDocument>) {
        let metadata = self.metadata.get_or_insert_with(|| {
            current
                .map(|doc| {
                    let mut inherited = doc.metadata.clone();
                    inherited.remove(RELEASE_METADATA_KEY);
                    inherited
                })
                .unwrap_or_default()
        });
        metadata.insert(
            PROJECT_METADATA_KEY.to_string(),
            Value::String(project_id.to_string()),
        );
    }

    /// At least one hash with a non-empty value is required.
    pub fn validate(&self) -> IndexResult<()> {
        if self.hashes.is_empty() {
            return Err(IndexError::InvalidAttributes(
                "at least one hash is required".to_string(),
            ));
        }
        if let Some((algorithm, _)) = self.hashes.iter().find(|(_, v)| v.trim().is_empty()) {
            return Err(IndexError::InvalidAttributes(format!(
                "hash '{algorithm}' has an empty value"
            )));
        }
        Ok(())
    }
}
