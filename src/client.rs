use std::{
    collections::HashMap,
    path::Path,
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

use anyhow::Context;
use bytes::Bytes;
use log::{debug, info};
use reqwest::{
    cookie::Jar,
    header::{
        HeaderMap, HeaderValue, ACCEPT, ACCEPT_ENCODING, UPGRADE_INSECURE_REQUESTS, USER_AGENT,
    },
    Client,
};
use url::Url;

use crate::{
    error::{ChuggError, Result},
    models::{BookMeta, SectionMeta, TocItem, TocResponse},
};

/// CDN where the book API is hosted.
const BOOK_CDN: &str = "https://ereader-books-prod.chegg.com";

/// Browser identities to choose from when the caller does not supply one.
const USER_AGENT_POOL: [&str; 4] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/87.0.4280.141 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:84.0) Gecko/20100101 Firefox/84.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_6) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/14.0.2 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/87.0.4280.141 Safari/537.36 Edg/87.0.664.75",
];

fn pick_user_agent() -> &'static str {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.subsec_nanos())
        .unwrap_or(0);
    USER_AGENT_POOL[nanos as usize % USER_AGENT_POOL.len()]
}

/// Read previously exported cookies: a flat JSON object of name/value pairs.
fn load_cookies(path: &Path) -> Result<HashMap<String, String>> {
    let raw = std::fs::read_to_string(path).map_err(|err| {
        ChuggError::AuthenticationFailed(format!(
            "could not read cookie file {}: {}",
            path.display(),
            err
        ))
    })?;
    serde_json::from_str(&raw).map_err(|err| {
        ChuggError::AuthenticationFailed(format!(
            "cookie file {} is not a JSON object of name/value pairs: {}",
            path.display(),
            err
        ))
    })
}

#[derive(Debug)]
pub struct CheggClient {
    client: Client,
    base_url: Url,
}

impl CheggClient {
    /// Build a client scoped to one book. Imports cookies from `cookie_file`
    /// and sets browser-like identity headers on every request.
    pub fn new(
        isbn: &str,
        book_id: &str,
        cookie_file: &Path,
        user_agent: Option<&str>,
    ) -> Result<Self> {
        // The CDN shards books under the last three ISBN characters.
        if isbn.len() < 3 || !isbn.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ChuggError::InvalidIsbn(isbn.to_string()));
        }

        let user_agent = match user_agent {
            Some(ua) => ua.to_string(),
            None => {
                info!("No User-Agent provided, picking one from the pool");
                pick_user_agent().to_string()
            }
        };
        debug!("Using User-Agent: {}", user_agent);

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json,text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,image/apng,*/*;q=0.8"));
        headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("gzip, deflate"));
        headers.insert(UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&user_agent).context("user agent is not a valid header value")?,
        );

        let cdn_url: Url = BOOK_CDN.parse().expect("correct base url");
        let jar = Arc::new(Jar::default());
        for (name, value) in load_cookies(cookie_file)? {
            jar.add_cookie_str(&format!("{}={}", name, value), &cdn_url);
        }

        let base_url = format!(
            "{}/{}/{}/{}/",
            BOOK_CDN,
            &isbn[isbn.len() - 3..],
            isbn,
            book_id
        )
        .parse()
        .with_context(|| format!("invalid book url for id {}", book_id))?;

        Ok(Self {
            client: Client::builder()
                .default_headers(headers)
                .cookie_provider(jar)
                .build()
                .context("failed to build the http client")?,
            base_url,
        })
    }

    #[cfg(test)]
    pub(crate) fn with_base_url(base_url: Url) -> Self {
        Self {
            client: Client::new(),
            base_url,
        }
    }

    fn make_url(&self, endpoint: &str) -> Result<Url> {
        Ok(self
            .base_url
            .join(endpoint)
            .with_context(|| format!("invalid endpoint: {}", endpoint))?)
    }

    pub async fn fetch_metadata(&self) -> Result<BookMeta> {
        let response = self
            .client
            .get(self.make_url("metadata.json")?)
            .send()
            .await?;

        response.error_for_status_ref()?;

        Ok(response.json::<BookMeta>().await?)
    }

    pub async fn fetch_toc(&self) -> Result<Vec<TocItem>> {
        info!("Loading table of contents");

        let response = self.client.get(self.make_url("toc.json")?).send().await?;

        response.error_for_status_ref()?;

        let toc = response.json::<TocResponse>().await?;

        Ok(toc.toc.toc_items)
    }

    /// Raw HTML of one section, exactly as served.
    pub async fn fetch_section_content(&self, section: usize) -> Result<String> {
        let response = self
            .client
            .get(self.make_url(&format!("sections/{}/content", section))?)
            .send()
            .await?;

        response.error_for_status_ref()?;

        Ok(response.text().await?)
    }

    /// Asset manifest of one section.
    pub async fn fetch_section_meta(&self, section: usize) -> Result<SectionMeta> {
        let response = self
            .client
            .get(self.make_url(&format!("sections/{}/metadata.json", section))?)
            .send()
            .await?;

        response.error_for_status_ref()?;

        Ok(response.json::<SectionMeta>().await?)
    }

    /// Fetch an asset by the absolute URL the manifest lists for it.
    pub async fn download_asset(&self, url: &str) -> Result<Bytes> {
        let url: Url = url
            .parse()
            .with_context(|| format!("invalid asset url: {}", url))?;

        let response = self.client.get(url).send().await?;

        response.error_for_status_ref()?;

        Ok(response.bytes().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::GET, MockServer};

    fn test_client(server: &MockServer) -> CheggClient {
        CheggClient::with_base_url(server.url("/988/9781234567988/b00k/").parse().unwrap())
    }

    #[test]
    fn picked_user_agent_comes_from_the_pool() {
        assert!(USER_AGENT_POOL.contains(&pick_user_agent()));
    }

    #[test]
    fn rejects_short_isbn() {
        let err = CheggClient::new("12", "b00k", Path::new("cookies.json"), None).unwrap_err();
        assert!(matches!(err, ChuggError::InvalidIsbn(_)));
    }

    #[test]
    fn rejects_non_alphanumeric_isbn() {
        let err = CheggClient::new("978-0-13", "b00k", Path::new("cookies.json"), None).unwrap_err();
        assert!(matches!(err, ChuggError::InvalidIsbn(_)));
    }

    #[test]
    fn missing_cookie_file_is_an_auth_failure() {
        let err = CheggClient::new(
            "9781234567988",
            "b00k",
            Path::new("/nonexistent/chugg/cookies.json"),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, ChuggError::AuthenticationFailed(_)));
    }

    #[test]
    fn malformed_cookie_file_is_an_auth_failure() {
        let path = std::env::temp_dir().join("chugg_client_test_bad_cookies.json");
        std::fs::write(&path, r#"["not", "an", "object"]"#).unwrap();
        let err =
            CheggClient::new("9781234567988", "b00k", &path, Some("Test/1.0")).unwrap_err();
        assert!(matches!(err, ChuggError::AuthenticationFailed(_)));
    }

    #[test]
    fn base_url_is_sharded_by_isbn_suffix() {
        let path = std::env::temp_dir().join("chugg_client_test_cookies.json");
        std::fs::write(&path, r#"{"sessionid": "abc", "csrftoken": "def"}"#).unwrap();
        let client =
            CheggClient::new("9781234567988", "6f3cb0de", &path, Some("Test/1.0")).unwrap();
        assert_eq!(
            client.base_url.as_str(),
            "https://ereader-books-prod.chegg.com/988/9781234567988/6f3cb0de/"
        );
    }

    #[tokio::test]
    async fn fetch_metadata_parses_response() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/988/9781234567988/b00k/metadata.json");
                then.status(200)
                    .header("content-type", "application/json")
                    .body(r#"{"length": 12, "title": "Intro to Things"}"#);
            })
            .await;

        let meta = test_client(&server).fetch_metadata().await.unwrap();

        mock.assert_async().await;
        assert_eq!(meta.length, 12);
        assert_eq!(meta.title.as_deref(), Some("Intro to Things"));
    }

    #[tokio::test]
    async fn fetch_toc_unwraps_nested_items() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/988/9781234567988/b00k/toc.json");
                then.status(200)
                    .header("content-type", "application/json")
                    .body(
                        r#"{"toc": {"tocItems": [
                            {"sectionIndex": 1, "depth": 1, "title": "One", "filename": "ch01.html"}
                        ]}}"#,
                    );
            })
            .await;

        let toc = test_client(&server).fetch_toc().await.unwrap();

        mock.assert_async().await;
        assert_eq!(toc.len(), 1);
        assert_eq!(toc[0].section_index, 1);
    }

    #[tokio::test]
    async fn fetch_section_content_returns_raw_text() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/988/9781234567988/b00k/sections/4/content");
                then.status(200).body("<p>Section four</p>");
            })
            .await;

        let content = test_client(&server).fetch_section_content(4).await.unwrap();
        assert_eq!(content, "<p>Section four</p>");
    }

    #[tokio::test]
    async fn download_asset_returns_bytes() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/images/fig1.png");
                then.status(200).body([0x89u8, 0x50, 0x4e, 0x47].as_slice());
            })
            .await;

        let bytes = test_client(&server)
            .download_asset(&server.url("/images/fig1.png"))
            .await
            .unwrap();
        assert_eq!(bytes.as_ref(), &[0x89, 0x50, 0x4e, 0x47]);
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/988/9781234567988/b00k/metadata.json");
                then.status(403);
            })
            .await;

        assert!(test_client(&server).fetch_metadata().await.is_err());
    }
}
