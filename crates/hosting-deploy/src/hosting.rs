use std::time::Duration;

use derive_more::{Display, Error, From};
use reqwest::{
    blocking::{
        multipart::{Form, Part},
        Client, Response,
    },
    StatusCode,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{archiver::Archive, config::Rewrite, credential::Token};

/// MIME type of the uploaded site archive.
const ARCHIVE_MIME_TYPE: &str = "application/zip";

/// Multipart form field that carries the site archive.
const ARCHIVE_FIELD: &str = "file";

/// JSON request body used to declare a new release.
#[derive(Serialize)]
struct ReleaseCreateRequest<'a> {
    /// Hosting configuration attached to the release.
    config: ReleaseConfig<'a>,
}

/// Hosting configuration of a release.
#[derive(Serialize)]
struct ReleaseConfig<'a> {
    /// Routing rules.
    rewrites: &'a [Rewrite],
}

/// JSON response body of a newly created release.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Release {
    /// Provider-assigned release name.
    pub name: String,

    /// Single-use URL that accepts the site archive.
    pub upload_url: String,
}

/// Hosting API errors.
#[derive(Debug, Display, From, Error)]
pub(crate) enum HostingError {
    /// HTTP client error.
    Http(reqwest::Error),

    /// Server responded with a non-success status code.
    #[display(fmt = "server responded with {}: {}", status, body)]
    #[from(ignore)]
    Rejected {
        /// Response status code.
        status: StatusCode,

        /// Raw response body.
        body: String,
    },
}

/// Hosting provider operations used by the deployment pipeline.
pub(crate) trait HostingApi {
    /// Declare a new release of `site_id` with the provided routing rules.
    fn create_release(
        &self,
        token: &Token,
        site_id: &str,
        rewrites: &[Rewrite],
    ) -> Result<Release, HostingError>;

    /// Upload `archive` to the URL returned by [`HostingApi::create_release`].
    fn upload_archive(
        &self,
        upload_url: &str,
        file_name: &str,
        archive: Archive,
    ) -> Result<(), HostingError>;
}

/// Blocking REST client of the hosting API.
pub(crate) struct HostingClient {
    /// Underlying HTTP client.
    client: Client,

    /// API root, without a trailing slash.
    api_url: String,
}

impl HostingClient {
    /// Create new client for the API rooted at `api_url`.
    ///
    /// Requests never time out unless `timeout` is provided.
    pub fn new(api_url: &str, timeout: Option<Duration>) -> Result<Self, HostingError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
        })
    }

    /// Release collection URL of the provided site.
    fn releases_url(&self, site_id: &str) -> String {
        format!("{}/sites/{site_id}/releases", self.api_url)
    }
}

impl HostingApi for HostingClient {
    fn create_release(
        &self,
        token: &Token,
        site_id: &str,
        rewrites: &[Rewrite],
    ) -> Result<Release, HostingError> {
        let url = self.releases_url(site_id);

        debug!(%url, "creating release");

        let response = self
            .client
            .post(url)
            .bearer_auth(token.as_str())
            .json(&ReleaseCreateRequest {
                config: ReleaseConfig { rewrites },
            })
            .send()?;

        Ok(check_status(response)?.json()?)
    }

    fn upload_archive(
        &self,
        upload_url: &str,
        file_name: &str,
        archive: Archive,
    ) -> Result<(), HostingError> {
        debug!(%upload_url, size = archive.bytes().len(), "uploading archive");

        let part = Part::bytes(archive.into_bytes())
            .file_name(file_name.to_string())
            .mime_str(ARCHIVE_MIME_TYPE)?;

        let response = self
            .client
            .post(upload_url)
            .multipart(Form::new().part(ARCHIVE_FIELD, part))
            .send()?;

        check_status(response)?;

        Ok(())
    }
}

/// Convert non-success responses into [`HostingError::Rejected`],
/// preserving the raw response body.
fn check_status(response: Response) -> Result<Response, HostingError> {
    let status = response.status();

    if status.is_success() {
        return Ok(response);
    }

    let body = response.text()?;

    Err(HostingError::Rejected { status, body })
}

#[cfg(test)]
mod tests {
    use std::{
        fs,
        io::{Read, Write},
        net::TcpListener,
        thread,
    };

    use assert_json::assert_json;
    use serde_json::json;
    use tempfile::TempDir;
    use wiremock::{
        matchers::{body_json, header, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    use super::*;
    use crate::archiver::build_zip_archive;

    fn rewrites() -> Vec<Rewrite> {
        vec![Rewrite {
            source: String::from("**"),
            destination: String::from("/index.html"),
        }]
    }

    fn site_archive() -> Archive {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("index.html"), b"<html></html>").unwrap();
        build_zip_archive(dir.path()).unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn create_release() {
        let server = MockServer::start().await;
        let upload_url = format!("{}/upload/sites/my-site/releases/1", server.uri());

        Mock::given(method("POST"))
            .and(path("/v1beta1/sites/my-site/releases"))
            .and(header("authorization", "Bearer 1//token"))
            .and(header("content-type", "application/json"))
            .and(body_json(json!({
                "config": { "rewrites": [{ "source": "**", "destination": "/index.html" }] }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "sites/my-site/releases/1",
                "uploadUrl": upload_url.clone(),
            })))
            .expect(1)
            .mount(&server)
            .await;

        let api_url = format!("{}/v1beta1/", server.uri());

        let release = tokio::task::spawn_blocking(move || {
            HostingClient::new(&api_url, None)?.create_release(
                &Token::parse("1//token").unwrap(),
                "my-site",
                &rewrites(),
            )
        })
        .await
        .unwrap()
        .unwrap();

        assert_eq!(
            release,
            Release {
                name: String::from("sites/my-site/releases/1"),
                upload_url,
            }
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn create_release_rejected() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/sites/my-site/releases"))
            .respond_with(ResponseTemplate::new(403).set_body_string("permission denied"))
            .expect(1)
            .mount(&server)
            .await;

        let api_url = server.uri();

        let error = tokio::task::spawn_blocking(move || {
            HostingClient::new(&api_url, None)?.create_release(
                &Token::parse("expired").unwrap(),
                "my-site",
                &rewrites(),
            )
        })
        .await
        .unwrap()
        .unwrap_err();

        match error {
            HostingError::Rejected { status, body } => {
                assert_eq!(status, StatusCode::FORBIDDEN);
                assert_eq!(body, "permission denied");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn create_release_sends_custom_rewrites() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "sites/docs/releases/2",
                "uploadUrl": "https://upload.example.com/2",
            })))
            .mount(&server)
            .await;

        let api_url = server.uri();

        tokio::task::spawn_blocking(move || {
            HostingClient::new(&api_url, None)?.create_release(
                &Token::parse("token").unwrap(),
                "docs",
                &[
                    Rewrite {
                        source: String::from("/api/**"),
                        destination: String::from("/api.html"),
                    },
                    Rewrite {
                        source: String::from("**"),
                        destination: String::from("/index.html"),
                    },
                ],
            )
        })
        .await
        .unwrap()
        .unwrap();

        let requests = server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();

        assert_json!(body, {
            "config": {
                "rewrites": [
                    { "source": "/api/**", "destination": "/api.html" },
                    { "source": "**", "destination": "/index.html" }
                ]
            }
        });
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn upload_archive() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/upload/1"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let upload_url = format!("{}/upload/1", server.uri());
        let archive = site_archive();
        let archive_bytes = archive.bytes().to_vec();

        tokio::task::spawn_blocking(move || {
            HostingClient::new("http://unused.invalid", None)?.upload_archive(
                &upload_url,
                "site.zip",
                archive,
            )
        })
        .await
        .unwrap()
        .unwrap();

        let requests = server.received_requests().await.unwrap();
        let request = &requests[0];
        let body = String::from_utf8_lossy(&request.body);

        assert!(request.headers.get("authorization").is_none());
        assert!(request
            .headers
            .get("content-type")
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("multipart/form-data")));
        assert!(body.contains(r#"name="file"; filename="site.zip""#));
        assert!(body.contains("Content-Type: application/zip"));
        assert!(request
            .body
            .windows(archive_bytes.len())
            .any(|window| window == archive_bytes.as_slice()));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn upload_archive_rejected() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string("upload url expired"))
            .mount(&server)
            .await;

        let upload_url = format!("{}/upload/1", server.uri());
        let archive = site_archive();

        let error = tokio::task::spawn_blocking(move || {
            HostingClient::new("http://unused.invalid", None)?.upload_archive(
                &upload_url,
                "site.zip",
                archive,
            )
        })
        .await
        .unwrap()
        .unwrap_err();

        assert_eq!(
            error.to_string(),
            "server responded with 400 Bad Request: upload url expired"
        );
    }

    #[test]
    fn releases_url_ignores_trailing_slash() {
        let client = HostingClient::new("https://hosting.example.com/v1beta1/", None).unwrap();

        assert_eq!(
            client.releases_url("my-site"),
            "https://hosting.example.com/v1beta1/sites/my-site/releases"
        );
    }

    #[test]
    fn unreadable_rejection_body_is_http_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let api_url = format!("http://{}", listener.local_addr().unwrap());

        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];

            while !request.ends_with(b"}]}}") {
                let read = stream.read(&mut buf).unwrap();
                assert!(read > 0, "connection closed before request body");
                request.extend_from_slice(&buf[..read]);
            }

            stream
                .write_all(b"HTTP/1.1 500 Internal Server Error\r\ncontent-length: 64\r\n\r\ntruncated")
                .unwrap();
        });

        let error = HostingClient::new(&api_url, None)
            .unwrap()
            .create_release(&Token::parse("token").unwrap(), "my-site", &rewrites())
            .unwrap_err();

        server.join().unwrap();

        assert!(matches!(error, HostingError::Http(_)), "unexpected error: {error}");
    }
}
