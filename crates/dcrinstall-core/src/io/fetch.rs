//! Artifact transport.
//!
//! Copies a URI to a local path. `http(s)://` is streamed to disk through
//! reqwest; `file://` URIs and bare paths are plain file copies. There is no
//! retry: any failure is returned to the caller as-is.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use thiserror::Error;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::debug;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP error fetching {url}: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP {status} fetching {url}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("IO error fetching {uri}: {source}")]
    Io {
        uri: String,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported URI scheme: {0}")]
    UnsupportedScheme(String),
}

/// Transport capability used for manifests, signatures and archives.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Copy the resource at `uri` to `dest`, replacing any existing file.
    async fn fetch(&self, uri: &str, dest: &Path) -> Result<(), FetchError>;
}

/// The production [`Fetcher`].
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    client: Client,
}

enum Location<'a> {
    Remote(&'a str),
    Local(PathBuf),
}

fn classify(uri: &str) -> Result<Location<'_>, FetchError> {
    if let Some(path) = uri.strip_prefix("file://") {
        Ok(Location::Local(PathBuf::from(path)))
    } else if uri.starts_with("https://") || uri.starts_with("http://") {
        Ok(Location::Remote(uri))
    } else if uri.contains("://") {
        Err(FetchError::UnsupportedScheme(uri.to_string()))
    } else {
        Ok(Location::Local(PathBuf::from(uri)))
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, uri: &str, dest: &Path) -> Result<(), FetchError> {
        let io_err = |source| FetchError::Io {
            uri: uri.to_string(),
            source,
        };

        match classify(uri)? {
            Location::Local(src) => {
                if same_file(&src, dest).await {
                    debug!(uri, "artifact already in place");
                    return Ok(());
                }
                let bytes = tokio::fs::copy(&src, dest).await.map_err(io_err)?;
                debug!(uri, bytes, "copied local artifact");
                Ok(())
            }
            Location::Remote(url) => {
                let response = self
                    .client
                    .get(url)
                    .header(reqwest::header::USER_AGENT, crate::USER_AGENT)
                    .send()
                    .await
                    .map_err(|source| FetchError::Http {
                        url: url.to_string(),
                        source,
                    })?;

                let status = response.status();
                if !status.is_success() {
                    return Err(FetchError::Status {
                        url: url.to_string(),
                        status,
                    });
                }

                let mut file = File::create(dest).await.map_err(io_err)?;
                let mut stream = response.bytes_stream();
                let mut downloaded: u64 = 0;

                while let Some(chunk) = stream.next().await {
                    let chunk = chunk.map_err(|source| FetchError::Http {
                        url: url.to_string(),
                        source,
                    })?;
                    file.write_all(&chunk).await.map_err(io_err)?;
                    downloaded += chunk.len() as u64;
                }

                file.flush().await.map_err(io_err)?;
                debug!(url, bytes = downloaded, "downloaded");
                Ok(())
            }
        }
    }
}

/// Whether `a` and `b` resolve to the same existing file. Copying a file onto
/// itself truncates it.
async fn same_file(a: &Path, b: &Path) -> bool {
    match (tokio::fs::canonicalize(a).await, tokio::fs::canonicalize(b).await) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Directory part of a manifest URI, with its trailing separator.
///
/// Artifacts listed in a manifest live next to it, so
/// `https://host/rel/v1.7.0/manifest.txt` yields `https://host/rel/v1.7.0/`.
pub fn base_uri(uri: &str) -> &str {
    match uri.rfind(['/', '\\']) {
        Some(idx) => &uri[..=idx],
        None => "",
    }
}

/// Last path segment of a URI.
pub fn filename_from_uri(uri: &str) -> &str {
    uri.rsplit(['/', '\\']).next().unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn base_uri_strips_last_segment() {
        assert_eq!(
            base_uri("https://example.com/rel/v1.7.0/decred-v1.7.0-manifest.txt"),
            "https://example.com/rel/v1.7.0/"
        );
        assert_eq!(base_uri("/srv/mirror/manifest.txt"), "/srv/mirror/");
        assert_eq!(base_uri("manifest.txt"), "");
    }

    #[test]
    fn filename_is_last_segment() {
        assert_eq!(
            filename_from_uri("https://example.com/a/SHA256SUMS.asc"),
            "SHA256SUMS.asc"
        );
        assert_eq!(filename_from_uri("plain.txt"), "plain.txt");
    }

    #[tokio::test]
    async fn copies_file_uris_and_bare_paths() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("manifest.txt");
        std::fs::write(&src, b"contents").unwrap();
        let fetcher = HttpFetcher::default();

        let via_uri = dir.path().join("a");
        fetcher
            .fetch(&format!("file://{}", src.display()), &via_uri)
            .await
            .unwrap();
        assert_eq!(std::fs::read(&via_uri).unwrap(), b"contents");

        let via_path = dir.path().join("b");
        fetcher
            .fetch(src.to_str().unwrap(), &via_path)
            .await
            .unwrap();
        assert_eq!(std::fs::read(&via_path).unwrap(), b"contents");
    }

    #[tokio::test]
    async fn fetching_a_file_onto_itself_keeps_it() {
        let dir = tempdir().unwrap();
        let manifest = dir.path().join("manifest.txt");
        std::fs::write(&manifest, b"digest  file.tar.gz\n").unwrap();
        let fetcher = HttpFetcher::default();

        fetcher
            .fetch(&format!("file://{}", manifest.display()), &manifest)
            .await
            .unwrap();
        let dotted = dir.path().join(".").join("manifest.txt");
        fetcher.fetch(dotted.to_str().unwrap(), &manifest).await.unwrap();

        assert_eq!(
            std::fs::read(&manifest).unwrap(),
            b"digest  file.tar.gz\n"
        );
    }

    #[tokio::test]
    async fn missing_local_file_is_io_error() {
        let dir = tempdir().unwrap();
        let err = HttpFetcher::default()
            .fetch(
                dir.path().join("absent").to_str().unwrap(),
                &dir.path().join("out"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Io { .. }));
    }

    #[tokio::test]
    async fn rejects_unknown_schemes() {
        let dir = tempdir().unwrap();
        let err = HttpFetcher::default()
            .fetch("ftp://example.com/x", &dir.path().join("out"))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::UnsupportedScheme(_)));
    }

    #[tokio::test]
    async fn streams_http_body_to_disk() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/rel/manifest.txt")
            .with_status(200)
            .with_body("digest  file.tar.gz\n")
            .create_async()
            .await;

        let dir = tempdir().unwrap();
        let dest = dir.path().join("manifest.txt");
        HttpFetcher::default()
            .fetch(&format!("{}/rel/manifest.txt", server.url()), &dest)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(
            std::fs::read_to_string(&dest).unwrap(),
            "digest  file.tar.gz\n"
        );
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/missing.tar.gz")
            .with_status(404)
            .create_async()
            .await;

        let dir = tempdir().unwrap();
        let url = format!("{}/missing.tar.gz", server.url());
        let err = HttpFetcher::default()
            .fetch(&url, &dir.path().join("out"))
            .await
            .unwrap_err();

        match err {
            FetchError::Status { url: failed, status } => {
                assert_eq!(failed, url);
                assert_eq!(status.as_u16(), 404);
            }
            other => panic!("expected status error, got {other}"),
        }
    }
}
