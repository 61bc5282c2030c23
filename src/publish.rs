//! Index publishing
//!
//! Pushes a finished batch artifact to a Solr collection. The artifact is
//! read as text, line breaks are stripped, and a batch that carries a
//! delete section is wrapped in a single `<update>` element so the payload
//! is one XML document. The payload goes out as one update request followed
//! by a commit. The artifact on disk is never modified.

use crate::error::{PublishError, PublishResult};
use reqwest::header::CONTENT_TYPE;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tokio::runtime::{Builder, Runtime};
use tracing::{debug, info};

/// Default Solr base URL
pub const DEFAULT_SOLR_URL: &str = "http://localhost:8983/solr";

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

const COMMIT: &str = "<commit/>";

/// Sends a prepared update payload to a named index collection
pub trait IndexPublisher {
    fn publish(&self, collection: &str, payload: &str) -> PublishResult<()>;
}

/// HTTP publisher for a Solr server
pub struct SolrPublisher {
    base_url: String,
    client: reqwest::Client,
    runtime: Runtime,
}

impl SolrPublisher {
    /// Create a publisher for `base_url` (e.g. `http://localhost:8983/solr`)
    pub fn new(base_url: &str, timeout: Duration) -> PublishResult<Self> {
        let base_url = base_url.trim_end_matches('/').to_string();

        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(PublishError::Runtime)?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| PublishError::Transport {
                url: base_url.clone(),
                source,
            })?;

        Ok(Self {
            base_url,
            client,
            runtime,
        })
    }

    /// Update handler URL of a collection
    pub fn update_url(&self, collection: &str) -> String {
        format!("{}/{}/update", self.base_url, collection)
    }

    async fn post_xml(&self, url: &str, body: String) -> PublishResult<()> {
        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "text/xml")
            .body(body)
            .send()
            .await
            .map_err(|source| PublishError::Transport {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PublishError::Status {
                url: url.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        debug!(url = %url, status = status.as_u16(), "Update accepted");
        Ok(())
    }
}

impl IndexPublisher for SolrPublisher {
    fn publish(&self, collection: &str, payload: &str) -> PublishResult<()> {
        let url = self.update_url(collection);
        self.runtime.block_on(async {
            self.post_xml(&url, payload.to_string()).await?;
            self.post_xml(&url, COMMIT.to_string()).await
        })
    }
}

/// Turn artifact text into a single-line update payload
pub fn normalize_payload(artifact: &str) -> String {
    let flat: String = artifact.chars().filter(|c| *c != '\r' && *c != '\n').collect();
    if flat.starts_with("<delete>") {
        format!("<update>{}</update>", flat)
    } else {
        flat
    }
}

/// Read an artifact and publish it to `collection`
pub fn publish_artifact(
    publisher: &dyn IndexPublisher,
    collection: &str,
    path: &Path,
) -> PublishResult<()> {
    let artifact = fs::read_to_string(path).map_err(|source| PublishError::ReadArtifact {
        path: path.to_path_buf(),
        source,
    })?;
    let payload = normalize_payload(&artifact);

    info!(
        collection,
        bytes = payload.len(),
        artifact = %path.display(),
        "Publishing batch"
    );
    publisher.publish(collection, &payload)?;
    info!(collection, "Batch published");
    Ok(())
}
