use std::time::Duration;

use anyhow::Context as _;
use reqwest::header::{ACCEPT, USER_AGENT};
use url::Url;

use crate::error::BackupError;

pub const DEFAULT_BASE_URL: &str = "https://www.goodreads.com";

const USER_AGENT_VALUE: &str = concat!("goodreads-backup/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// A single blocking GET. Implementations must not retry.
pub trait Transport {
    fn get(&self, url: &Url) -> anyhow::Result<HttpResponse>;
}

#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::blocking::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .context("build http client")?;
        Ok(Self { client })
    }
}

impl Transport for ReqwestTransport {
    fn get(&self, url: &Url) -> anyhow::Result<HttpResponse> {
        let response = self
            .client
            .get(url.as_str())
            .header(USER_AGENT, USER_AGENT_VALUE)
            .header(ACCEPT, "text/html,application/xml;q=0.9,*/*;q=0.8")
            .send()
            .with_context(|| format!("GET {}", redacted(url)))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .with_context(|| format!("read response body: {}", redacted(url)))?;
        Ok(HttpResponse { status, body })
    }
}

/// Fetches `url` and returns the body, failing with [`BackupError::Transport`] on any
/// non-2xx status.
pub fn fetch_ok(transport: &impl Transport, url: &Url) -> anyhow::Result<String> {
    let response = transport.get(url)?;
    if !response.is_success() {
        return Err(BackupError::Transport {
            url: redacted(url),
            status: response.status,
            body: response.body,
        }
        .into());
    }
    Ok(response.body)
}

/// The URL without its query string, which carries the API key for review requests.
fn redacted(url: &Url) -> String {
    let mut url = url.clone();
    url.set_query(None);
    url.to_string()
}

#[derive(Debug, Clone)]
pub struct Endpoints {
    base: Url,
}

impl Endpoints {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let mut base = Url::parse(base_url).with_context(|| format!("parse base url: {base_url}"))?;
        if base.scheme() != "http" && base.scheme() != "https" {
            anyhow::bail!("base url must be http/https: {base}");
        }
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self { base })
    }

    pub fn review_list(
        &self,
        user_id: &str,
        api_key: &str,
        page: u32,
        page_size: u32,
    ) -> anyhow::Result<Url> {
        let mut url = self
            .base
            .join("review/list.xml")
            .context("build review list url")?;
        url.query_pairs_mut()
            .append_pair("v", "2")
            .append_pair("key", api_key)
            .append_pair("id", user_id)
            .append_pair("page", &page.to_string())
            .append_pair("per_page", &page_size.to_string());
        Ok(url)
    }

    pub fn status_list(&self, user_id: &str, page: u32) -> anyhow::Result<Url> {
        if matches!(user_id, "" | "." | "..") {
            anyhow::bail!("user id cannot be used as a path segment: {user_id:?}");
        }
        let mut url = self
            .base
            .join("user_status/list/")
            .context("build status list url")?;
        url.path_segments_mut()
            .map_err(|()| anyhow::anyhow!("base url cannot carry a path: {}", self.base))?
            .pop_if_empty()
            .push(user_id);
        url.query_pairs_mut().append_pair("page", &page.to_string());
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(HttpResponse);

    impl Transport for Fixed {
        fn get(&self, _url: &Url) -> anyhow::Result<HttpResponse> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn review_list_url_carries_paging_params() -> anyhow::Result<()> {
        let endpoints = Endpoints::new("https://example.com/gr")?;
        let url = endpoints.review_list("42", "secret", 3, 200)?;
        assert_eq!(
            url.as_str(),
            "https://example.com/gr/review/list.xml?v=2&key=secret&id=42&page=3&per_page=200"
        );
        Ok(())
    }

    #[test]
    fn status_list_url_uses_user_path_segment() -> anyhow::Result<()> {
        let endpoints = Endpoints::new(DEFAULT_BASE_URL)?;
        let url = endpoints.status_list("42", 0)?;
        assert_eq!(
            url.as_str(),
            "https://www.goodreads.com/user_status/list/42?page=0"
        );
        Ok(())
    }

    #[test]
    fn status_list_escapes_user_id_as_one_segment() -> anyhow::Result<()> {
        let endpoints = Endpoints::new("https://example.com/gr")?;

        let url = endpoints.status_list("a:b", 1)?;
        assert_eq!(url.as_str(), "https://example.com/gr/user_status/list/a:b?page=1");

        let url = endpoints.status_list("../x/y?admin=1#f", 1)?;
        assert_eq!(url.host_str(), Some("example.com"));
        assert!(
            url.path().starts_with("/gr/user_status/list/"),
            "escaped path: {}",
            url.path()
        );
        assert_eq!(url.path_segments().map(|s| s.count()), Some(4));
        assert_eq!(url.query(), Some("page=1"));
        assert_eq!(url.fragment(), None);

        assert!(endpoints.status_list("..", 1).is_err());
        assert!(endpoints.status_list("", 1).is_err());
        Ok(())
    }

    #[test]
    fn fetch_ok_reports_status_and_body_without_query() -> anyhow::Result<()> {
        let transport = Fixed(HttpResponse {
            status: 401,
            body: "Invalid API key".to_owned(),
        });
        let url = Url::parse("https://example.com/review/list.xml?key=secret")?;

        let err = fetch_ok(&transport, &url).expect_err("401 must fail");
        match err.downcast_ref::<BackupError>() {
            Some(BackupError::Transport { url, status, body }) => {
                assert_eq!(*status, 401);
                assert_eq!(body, "Invalid API key");
                assert!(!url.contains("secret"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        Ok(())
    }
}
