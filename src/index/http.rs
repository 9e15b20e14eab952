//! Index service client
//!
//! Speaks the indexd REST API: `GET /index/{did}`, `GET /index/{did}/versions`,
//! `POST /index/`, `POST /index/{did}` and `PUT /index/{did}?rev=...`.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use tracing::{debug, instrument};

use super::{IndexDocument, IndexService, NewVersion, Version};
use crate::config::IndexConfig;
use crate::error::{Error, IndexError, IndexResult, Result};

const DOCUMENT_FORM: &str = "object";

pub struct HttpIndexClient {
    http: Client,
    base_url: String,
    credentials: Option<(String, String)>,
}

/// Identifiers echoed back by the index after a write.
#[derive(Debug, Deserialize)]
struct RecordRef {
    did: String,
    #[serde(default)]
    rev: Option<String>,
}

#[derive(Debug, Serialize)]
struct CreateBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    did: Option<&'a str>,
    form: &'static str,
    hashes: &'a BTreeMap<String, String>,
    size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    file_name: Option<&'a str>,
    urls: &'a [String],
    metadata: &'a BTreeMap<String, Value>,
}

#[derive(Debug, Serialize)]
struct PatchBody<'a> {
    version: Version,
    hashes: &'a BTreeMap<String, String>,
    size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    file_name: Option<&'a str>,
    urls: &'a [String],
    metadata: &'a BTreeMap<String, Value>,
}

/// indexd answers the versions listing with an object keyed by position;
/// a bare array is accepted too.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum VersionListing {
    Keyed(BTreeMap<String, IndexDocument>),
    List(Vec<IndexDocument>),
}

impl VersionListing {
    fn into_documents(self) -> Vec<IndexDocument> {
        match self {
            VersionListing::Keyed(map) => map.into_values().collect(),
            VersionListing::List(list) => list,
        }
    }
}

impl HttpIndexClient {
    /// Create a new index client from configuration
    pub fn new(config: &IndexConfig) -> Result<Self> {
        let base_url = config
            .url
            .as_deref()
            .ok_or_else(|| Error::Config("index service url is not set".to_string()))?
            .trim_end_matches('/')
            .to_string();

        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(format!("sheepdog/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Config(format!("failed to build index client: {e}")))?;

        let credentials = match (&config.username, &config.password) {
            (Some(user), Some(password)) => Some((user.clone(), password.clone())),
            _ => None,
        };

        Ok(Self {
            http,
            base_url,
            credentials,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn record_url(&self, did: &str) -> String {
        format!("{}/index/{}", self.base_url, urlencoding::encode(did))
    }

    fn authenticate(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.credentials {
            Some((user, password)) => request.basic_auth(user, Some(password)),
            None => request,
        }
    }

    async fn handle_response(&self, did: &str, response: Response) -> IndexResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(IndexError::from_response(status.as_u16(), did, &body))
    }

    async fn parse_body<T: DeserializeOwned>(response: Response) -> IndexResult<T> {
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| IndexError::Malformed(e.to_string()))
    }

    /// Posts a record body and fetches the stored document it produced.
    async fn write_record(&self, did: &str, url: String, body: &CreateBody<'_>) -> IndexResult<IndexDocument> {
        let request = self.authenticate(self.http.post(&url).json(body));
        let response = self.handle_response(did, request.send().await?).await?;
        let created: RecordRef = Self::parse_body(response).await?;

        debug!(did = %created.did, "Index record written");

        self.get(&created.did)
            .await?
            .ok_or(IndexError::NotFound { did: created.did })
    }
}

#[async_trait]
impl IndexService for HttpIndexClient {
    #[instrument(skip(self))]
    async fn get(&self, did: &str) -> IndexResult<Option<IndexDocument>> {
        let response = self.http.get(self.record_url(did)).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let response = self.handle_response(did, response).await?;
        Self::parse_body(response).await.map(Some)
    }

    #[instrument(skip(self))]
    async fn list_versions(&self, did: &str) -> IndexResult<Vec<IndexDocument>> {
        let url = format!("{}/versions", self.record_url(did));
        let response = self.http.get(&url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }

        let response = self.handle_response(did, response).await?;
        let listing: VersionListing = Self::parse_body(response).await?;
        Ok(listing.into_documents())
    }

    #[instrument(skip(self, attrs))]
    async fn create(&self, did: &str, attrs: &NewVersion) -> IndexResult<IndexDocument> {
        let empty = BTreeMap::new();
        let body = CreateBody {
            did: Some(did),
            form: DOCUMENT_FORM,
            hashes: &attrs.hashes,
            size: attrs.size,
            file_name: attrs.file_name.as_deref(),
            urls: attrs.urls.as_deref().unwrap_or_default(),
            metadata: attrs.metadata.as_ref().unwrap_or(&empty),
        };
        let url = format!("{}/index/", self.base_url);
        self.write_record(did, url, &body).await
    }

    #[instrument(skip(self, attrs))]
    async fn add_version(&self, did: &str, attrs: &NewVersion) -> IndexResult<IndexDocument> {
        let empty = BTreeMap::new();
        let body = CreateBody {
            did: None,
            form: DOCUMENT_FORM,
            hashes: &attrs.hashes,
            size: attrs.size,
            file_name: attrs.file_name.as_deref(),
            urls: attrs.urls.as_deref().unwrap_or_default(),
            metadata: attrs.metadata.as_ref().unwrap_or(&empty),
        };
        self.write_record(did, self.record_url(did), &body).await
    }

    #[instrument(skip(self, doc), fields(did = %doc.did, version = %doc.version))]
    async fn patch(&self, doc: &IndexDocument) -> IndexResult<IndexDocument> {
        let rev = doc
            .rev
            .as_deref()
            .ok_or_else(|| IndexError::Malformed(format!("record {} has no revision", doc.did)))?;

        let body = PatchBody {
            version: doc.version,
            hashes: &doc.hashes,
            size: doc.size,
            file_name: doc.file_name.as_deref(),
            urls: &doc.urls,
            metadata: &doc.metadata,
        };

        let request = self
            .http
            .put(self.record_url(&doc.did))
            .query(&[("rev", rev)])
            .json(&body);
        let request = self.authenticate(request);

        let response = self.handle_response(&doc.did, request.send().await?).await?;
        let updated: RecordRef = Self::parse_body(response).await?;

        let mut patched = doc.clone();
        if updated.rev.is_some() {
            patched.rev = updated.rev;
        }
        Ok(patched)
    }
}
