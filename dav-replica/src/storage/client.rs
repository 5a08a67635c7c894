//! WebDAV server client over HTTP

use super::traits::DavClient;
use super::types::{join_url, parent_collections};
use crate::config::{validate_base_url, ServerDescriptor, StorageConfig};
use crate::error::{StorageError, StorageResult};
use async_trait::async_trait;
use bytes::Bytes;
use http::StatusCode;
use reqwest::{Client, Method, RequestBuilder, Response};

/// HTTP client for one WebDAV endpoint
///
/// Writes create missing parent collections with `MKCOL` before the `PUT`,
/// existence is probed with `HEAD`, and `DELETE` of an absent file succeeds.
///
/// # Examples
///
/// ```rust,no_run
/// use dav_replica::config::{ServerDescriptor, StorageConfig};
/// use dav_replica::storage::{DavClient, HttpDavClient};
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = StorageConfig::default();
/// let client = HttpDavClient::new(&ServerDescriptor::new("http://webdav1.example.com"), &config)?;
///
/// client.put("/files/original/image.png", b"png bytes".to_vec().into()).await?;
/// assert!(client.exists("/files/original/image.png").await?);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpDavClient {
    base_url: String,
    http: Client,
    credentials: Option<(String, Option<String>)>,
    mkcol: Method,
}

impl HttpDavClient {
    /// Builds a client for `server` using the timeouts from `config`
    ///
    /// # Errors
    ///
    /// Returns `InvalidUrl` if the server URL is not an absolute http(s) URL,
    /// or `Other` if the HTTP client cannot be built.
    pub fn new(server: &ServerDescriptor, config: &StorageConfig) -> StorageResult<Self> {
        validate_base_url(&server.url)?;

        let http = Client::builder()
            .timeout(server.request_timeout(config))
            .connect_timeout(config.connect_timeout())
            .build()
            .map_err(|e| StorageError::Other(format!("Failed to build HTTP client: {e}")))?;

        let mkcol = Method::from_bytes(b"MKCOL")
            .map_err(|e| StorageError::Other(format!("Invalid WebDAV method: {e}")))?;

        Ok(Self {
            base_url: server.url.clone(),
            http,
            credentials: server
                .username
                .clone()
                .map(|user| (user, server.password.clone())),
            mkcol,
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.http.request(method, join_url(&self.base_url, path));
        match &self.credentials {
            Some((user, password)) => builder.basic_auth(user, password.as_ref()),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> StorageResult<Response> {
        builder
            .send()
            .await
            .map_err(|e| StorageError::RemoteUnavailable {
                server: self.base_url.clone(),
                message: e.to_string(),
            })
    }

    fn rejected(&self, path: &str, status: StatusCode) -> StorageError {
        tracing::warn!(
            server = %self.base_url,
            path,
            status = status.as_u16(),
            "WebDAV request rejected"
        );
        StorageError::RemoteRejected {
            server: self.base_url.clone(),
            path: path.to_string(),
            status: status.as_u16(),
        }
    }

    /// Creates every collection above `path`, outermost first
    async fn ensure_collections(&self, path: &str) -> StorageResult<()> {
        for collection in parent_collections(path) {
            let response = self
                .send(self.request(self.mkcol.clone(), &collection))
                .await?;
            let status = response.status();

            // 405: collection already exists
            if status.is_success()
                || status == StatusCode::METHOD_NOT_ALLOWED
                || status == StatusCode::MOVED_PERMANENTLY
            {
                tracing::trace!(
                    server = %self.base_url,
                    collection,
                    status = status.as_u16(),
                    "Collection ready"
                );
                continue;
            }
            return Err(self.rejected(&collection, status));
        }
        Ok(())
    }
}

#[async_trait]
impl DavClient for HttpDavClient {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn put(&self, path: &str, body: Bytes) -> StorageResult<()> {
        self.ensure_collections(path).await?;

        tracing::debug!(server = %self.base_url, path, size = body.len(), "PUT");
        let response = self.send(self.request(Method::PUT, path).body(body)).await?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(self.rejected(path, status))
        }
    }

    async fn get(&self, path: &str) -> StorageResult<Bytes> {
        tracing::debug!(server = %self.base_url, path, "GET");
        let response = self.send(self.request(Method::GET, path)).await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(StorageError::NotFound(path.to_string()));
        }
        if !status.is_success() {
            return Err(self.rejected(path, status));
        }

        response
            .bytes()
            .await
            .map_err(|e| StorageError::RemoteUnavailable {
                server: self.base_url.clone(),
                message: e.to_string(),
            })
    }

    async fn delete(&self, path: &str) -> StorageResult<()> {
        tracing::debug!(server = %self.base_url, path, "DELETE");
        let response = self.send(self.request(Method::DELETE, path)).await?;
        let status = response.status();

        if status.is_success() || status == StatusCode::NOT_FOUND {
            Ok(())
        } else {
            Err(self.rejected(path, status))
        }
    }

    async fn exists(&self, path: &str) -> StorageResult<bool> {
        tracing::debug!(server = %self.base_url, path, "HEAD");
        let response = self.send(self.request(Method::HEAD, path)).await?;
        let status = response.status();

        if status.is_success() {
            Ok(true)
        } else if status == StatusCode::NOT_FOUND {
            Ok(false)
        } else {
            Err(self.rejected(path, status))
        }
    }
}
