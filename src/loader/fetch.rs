use std::path::PathBuf;

use futures_util::future::BoxFuture;
use tracing::debug;

use crate::error::LoadError;

// Turns a sample uri into raw bytes. Decoding is someone else's job.
pub trait Fetch: Send + Sync {
    fn fetch<'a>(&'a self, uri: &'a str) -> BoxFuture<'a, Result<Vec<u8>, LoadError>>;
}

// http(s) goes over the network; anything else is a path, optionally `file://`,
// resolved against `base_dir` when relative
pub struct SourceFetcher {
    client: reqwest::Client,
    base_dir: PathBuf,
}

impl SourceFetcher {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_dir: base_dir.into(),
        }
    }

    pub fn resolve_path(&self, uri: &str) -> PathBuf {
        let raw = uri.strip_prefix("file://").unwrap_or(uri);
        let path = PathBuf::from(raw);
        if path.is_absolute() {
            path
        } else {
            self.base_dir.join(raw.trim_start_matches('/'))
        }
    }

    async fn fetch_http(&self, uri: &str) -> Result<Vec<u8>, LoadError> {
        let response = self.client.get(uri).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(LoadError::Status(status.as_u16()));
        }
        Ok(response.bytes().await?.to_vec())
    }
}

impl Fetch for SourceFetcher {
    fn fetch<'a>(&'a self, uri: &'a str) -> BoxFuture<'a, Result<Vec<u8>, LoadError>> {
        Box::pin(async move {
            if uri.starts_with("http://") || uri.starts_with("https://") {
                debug!(uri, "fetching sample over http");
                self.fetch_http(uri).await
            } else {
                let path = self.resolve_path(uri);
                debug!(path = %path.display(), "reading sample file");
                Ok(tokio::fs::read(path).await?)
            }
        })
    }
}
