// Input acquisition: local files and web pages

use crate::config::FetchConfig;
use crate::error::{FabricError, FabricResult};
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::StatusCode;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Read a local file as text. A leading `~/` is expanded to the home directory.
pub async fn read_file(path: &str) -> FabricResult<String> {
    let path = expand_home(path);

    match tokio::fs::try_exists(&path).await {
        Ok(true) => {}
        Ok(false) => return Err(FabricError::NotFound { path }),
        Err(source) => return Err(FabricError::Io { path, source }),
    }

    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|source| FabricError::Io {
            path: path.clone(),
            source,
        })?;

    tracing::debug!(path = %path.display(), bytes = bytes.len(), "Read input file");
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

/// HTTP(S) GET with manual, bounded redirect following.
pub struct UrlFetcher {
    client: reqwest::Client,
    max_redirects: usize,
}

impl UrlFetcher {
    pub fn new(config: &FetchConfig) -> FabricResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
        );
        headers.insert(header::ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9,*;q=0.5"));

        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::none())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|source| FabricError::Network {
                url: "(client setup)".to_string(),
                source,
            })?;

        Ok(Self {
            client,
            max_redirects: config.max_redirects,
        })
    }

    /// Fetch the body of `url`, following 301/302 responses.
    pub async fn fetch(&self, url: &str) -> FabricResult<String> {
        let mut current = parse_http_url(url)?;
        let mut hops = 0;

        loop {
            tracing::debug!(url = %current, hops, "Fetching URL");
            let response = self
                .client
                .get(current.clone())
                .send()
                .await
                .map_err(|source| FabricError::Network {
                    url: current.to_string(),
                    source,
                })?;

            let status = response.status();
            match status {
                StatusCode::OK => {
                    return response.text().await.map_err(|source| FabricError::Network {
                        url: current.to_string(),
                        source,
                    });
                }
                StatusCode::MOVED_PERMANENTLY | StatusCode::FOUND => {
                    let next = redirect_target(&current, status, response.headers())?;
                    hops += 1;
                    if hops > self.max_redirects {
                        return Err(FabricError::TooManyRedirects {
                            url: url.to_string(),
                            limit: self.max_redirects,
                        });
                    }
                    tracing::debug!(from = %current, to = %next, "Following redirect");
                    current = next;
                }
                other => {
                    return Err(FabricError::HttpStatus {
                        url: current.to_string(),
                        status: other.as_u16(),
                        reason: other.canonical_reason().unwrap_or("Unknown").to_string(),
                    });
                }
            }
        }
    }
}

fn parse_http_url(url: &str) -> FabricResult<Url> {
    let parsed = Url::parse(url).map_err(|e| FabricError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        scheme => Err(FabricError::InvalidUrl {
            url: url.to_string(),
            reason: format!("only http and https are supported, got {}", scheme),
        }),
    }
}

fn redirect_target(current: &Url, status: StatusCode, headers: &HeaderMap) -> FabricResult<Url> {
    let location = headers
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| FabricError::HttpStatus {
            url: current.to_string(),
            status: status.as_u16(),
            reason: "redirect without a Location header".to_string(),
        })?;

    let next = current.join(location).map_err(|e| FabricError::InvalidUrl {
        url: location.to_string(),
        reason: e.to_string(),
    })?;
    parse_http_url(next.as_str())
}
