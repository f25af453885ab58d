//! HTTP client wrapper for Dropbox API requests.

use std::time::Duration;

use futures::TryStreamExt;
use reqwest::{Body, Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio_util::io::{ReaderStream, StreamReader};
use tracing::debug;

use crate::api::ByteStream;
use crate::config::Config;
use crate::error::{DropboxError, Result};

/// Header carrying the JSON argument on content routes.
const API_ARG_HEADER: &str = "Dropbox-API-Arg";

/// HTTP client for the RPC and content endpoints.
pub struct HttpClient {
    client: Client,
    access_token: String,
    api_url: String,
    content_url: String,
    request_timeout: Duration,
}

#[derive(Deserialize)]
struct ErrorBody {
    error_summary: String,
}

impl HttpClient {
    /// Create a new HTTP client from configuration.
    ///
    /// A proxy is installed when `config.proxy` is set.
    pub fn new(config: &Config) -> Result<Self> {
        config.validate()?;

        let client = match &config.proxy {
            Some(proxy) => {
                let proxy = reqwest::Proxy::all(proxy)
                    .map_err(|e| DropboxError::InvalidConfig(format!("Invalid proxy: {}", e)))?;
                Client::builder().proxy(proxy).build().map_err(|e| {
                    DropboxError::InvalidConfig(format!("Failed to build client: {}", e))
                })?
            }
            None => Client::new(),
        };

        Ok(Self {
            client,
            access_token: config.access_token.clone(),
            api_url: config.api_url.trim_end_matches('/').to_string(),
            content_url: config.content_url.trim_end_matches('/').to_string(),
            request_timeout: config.request_timeout,
        })
    }

    /// Call an RPC route with a JSON argument and decode the JSON result.
    ///
    /// # Arguments
    /// * `route` - Route below the API root, e.g. `files/get_metadata`
    /// * `arg` - Request argument, sent as the JSON body
    pub async fn rpc<A, R>(&self, route: &str, arg: &A) -> Result<R>
    where
        A: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = format!("{}/{}", self.api_url, route);
        debug!(route, "rpc request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.access_token)
            .timeout(self.request_timeout)
            .json(arg)
            .send()
            .await?;

        let response = check_status(response).await?;
        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Call a content-download route and return the body as a live stream.
    ///
    /// The argument travels in the `Dropbox-API-Arg` header; the caller owns
    /// the returned stream and must drop it to release the connection.
    pub async fn content_download<A>(&self, route: &str, arg: &A) -> Result<ByteStream>
    where
        A: Serialize + ?Sized,
    {
        let url = format!("{}/{}", self.content_url, route);
        debug!(route, "content download");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.access_token)
            .header(API_ARG_HEADER, header_safe_json(arg)?)
            .send()
            .await?;

        let response = check_status(response).await?;
        let stream = response.bytes_stream().map_err(std::io::Error::other);
        Ok(Box::pin(StreamReader::new(stream)))
    }

    /// Call a content-upload route, streaming `body` as the request body.
    ///
    /// Returns once the server has read the whole stream and answered.
    pub async fn content_upload<A, R>(&self, route: &str, arg: &A, body: ByteStream) -> Result<R>
    where
        A: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = format!("{}/{}", self.content_url, route);
        debug!(route, "content upload");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.access_token)
            .header(API_ARG_HEADER, header_safe_json(arg)?)
            .header("Content-Type", "application/octet-stream")
            .body(Body::wrap_stream(ReaderStream::new(body)))
            .send()
            .await?;

        let response = check_status(response).await?;
        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("api_url", &self.api_url)
            .field("content_url", &self.content_url)
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}

/// Turn non-2xx responses into errors, keeping the API's error summary.
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    debug!(status = status.as_u16(), body = %text, "api error response");

    match serde_json::from_str::<ErrorBody>(&text) {
        Ok(body) => Err(DropboxError::Api {
            status: status.as_u16(),
            summary: body.error_summary,
        }),
        Err(_) => Err(DropboxError::HttpError(status.as_u16())),
    }
}

/// Serialize `arg` as JSON that is safe to place in an HTTP header.
///
/// Non-ASCII characters are escaped as `\uXXXX` (UTF-16 pairs above the BMP).
pub(crate) fn header_safe_json<A: Serialize + ?Sized>(arg: &A) -> Result<String> {
    let json = serde_json::to_string(arg)?;
    let mut out = String::with_capacity(json.len());
    for ch in json.chars() {
        if ch.is_ascii() && ch != '\u{7f}' {
            out.push(ch);
        } else {
            let mut units = [0u16; 2];
            for unit in ch.encode_utf16(&mut units) {
                out.push_str(&format!("\\u{:04x}", unit));
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Client;
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one canned response on a local port and return its base URL.
    async fn serve_once(
        status: &'static str,
        content_type: &'static str,
        body: &'static str,
    ) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();

            // Drain the request head and any body before answering.
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
                if let Some(end) = request.windows(4).position(|w| w == b"\r\n\r\n") {
                    let head = String::from_utf8_lossy(&request[..end]).to_lowercase();
                    let body_len = head
                        .lines()
                        .find_map(|l| l.strip_prefix("content-length:"))
                        .and_then(|v| v.trim().parse::<usize>().ok())
                        .unwrap_or(0);
                    let done = if head.contains("transfer-encoding: chunked") {
                        request.ends_with(b"0\r\n\r\n")
                    } else {
                        request.len() >= end + 4 + body_len
                    };
                    if done {
                        break;
                    }
                }
            }

            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                content_type,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
        });

        format!("http://{}", addr)
    }

    fn local_config(url: &str) -> Config {
        Config::new("token").with_api_url(url).with_content_url(url)
    }

    #[test]
    fn test_client_creation() {
        let client = HttpClient::new(&Config::new("token"));
        assert!(client.is_ok());
    }

    #[test]
    fn test_urls_are_trimmed() {
        let config = Config::new("token")
            .with_api_url("http://localhost:9000/2/")
            .with_content_url("http://localhost:9001/2/");
        let client = HttpClient::new(&config).unwrap();
        assert_eq!(client.api_url, "http://localhost:9000/2");
        assert_eq!(client.content_url, "http://localhost:9001/2");
    }

    #[test]
    fn test_proxy_creation() {
        let client = HttpClient::new(&Config::new("token").with_proxy("http://127.0.0.1:8080"));
        assert!(client.is_ok());
    }

    #[test]
    fn test_proxy_invalid() {
        let res = HttpClient::new(&Config::new("token").with_proxy(":::::::"));
        assert!(matches!(res, Err(DropboxError::InvalidConfig(_))));
    }

    #[test]
    fn test_empty_token_rejected() {
        assert!(HttpClient::new(&Config::new("")).is_err());
    }

    #[test]
    fn test_header_safe_json_ascii() {
        let out = header_safe_json(&json!({"path": "/hello.txt"})).unwrap();
        assert_eq!(out, r#"{"path":"/hello.txt"}"#);
    }

    #[test]
    fn test_header_safe_json_escapes_non_ascii() {
        let out = header_safe_json(&json!({"path": "/café"})).unwrap();
        assert_eq!(out, r#"{"path":"/caf\u00e9"}"#);
        assert!(out.is_ascii());

        // Outside the BMP: surrogate pair.
        let out = header_safe_json(&json!({"path": "/😀"})).unwrap();
        assert_eq!(out, r#"{"path":"/\ud83d\ude00"}"#);
    }

    #[tokio::test]
    async fn test_rpc_error_summary_becomes_api_error() {
        let url = serve_once(
            "409 Conflict",
            "application/json",
            r#"{"error_summary": "path/not_found/..", "error": {".tag": "path"}}"#,
        )
        .await;
        let client = HttpClient::new(&local_config(&url)).unwrap();

        let err = client
            .rpc::<_, serde_json::Value>("files/get_metadata", &json!({"path": "/missing"}))
            .await
            .unwrap_err();
        match &err {
            DropboxError::Api { status, summary } => {
                assert_eq!(*status, 409);
                assert_eq!(summary, "path/not_found/..");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_plain_error_body_becomes_http_error() {
        let url = serve_once("500 Internal Server Error", "text/plain", "oops").await;
        let client = HttpClient::new(&local_config(&url)).unwrap();

        let err = client
            .content_download("files/download", &json!({"path": "/a.txt"}))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, DropboxError::HttpError(500)));
    }

    #[tokio::test]
    async fn test_download_not_found_reaches_client_as_not_found() {
        let url = serve_once(
            "409 Conflict",
            "application/json",
            r#"{"error_summary": "path/not_found/."}"#,
        )
        .await;
        let client = Client::new(local_config(&url)).unwrap();

        let err = client.read_all("/missing.txt").await.unwrap_err();
        match err {
            DropboxError::NotFound { path } => assert_eq!(path, "/missing.txt"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_content_upload_streams_body() {
        let url = serve_once(
            "200 OK",
            "application/json",
            r#"{"name": "up.txt", "path_display": "/up.txt", "size": 11}"#,
        )
        .await;
        let client = HttpClient::new(&local_config(&url)).unwrap();

        let body: ByteStream = Box::pin(std::io::Cursor::new(b"Hello World".to_vec()));
        let meta: crate::api::RawMetadata = client
            .content_upload("files/upload", &json!({"path": "/up.txt"}), body)
            .await
            .unwrap();
        assert_eq!(meta.name, "up.txt");
        assert_eq!(meta.size, Some(11));
    }

    #[tokio::test]
    async fn test_download_streams_body() {
        let url = serve_once("200 OK", "application/octet-stream", "whoop").await;
        let client = Client::new(local_config(&url)).unwrap();
        assert_eq!(client.read_all("/hello.txt").await.unwrap(), b"whoop");
    }
}
