use std::num::NonZeroU32;

use color_eyre::eyre::{Context, Result};
use governor::{
    Quota, RateLimiter, clock::DefaultClock, state::InMemoryState, state::direct::NotKeyed,
};
use reqwest::{Client, RequestBuilder, header};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::ports::discogs::{
    DiscogsClient, DiscogsCollectionPage, DiscogsRelease, DiscogsSearchResult,
};

const BASE_URL: &str = "https://api.discogs.com";
const USER_AGENT: &str = concat!("music-catalog/", env!("CARGO_PKG_VERSION"));
const COLLECTION_PAGE_SIZE: u32 = 100;
/// Discogs allows 60 authenticated requests per minute.
const REQUESTS_PER_MINUTE: NonZeroU32 = NonZeroU32::new(60).unwrap();

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<DiscogsSearchResult>,
}

/// Discogs REST API client. Every request, image downloads included, waits
/// on one shared rate limiter.
pub struct DiscogsHttpAdapter {
    client: Client,
    base_url: Url,
    token: Option<String>,
    limiter: DirectRateLimiter,
}

impl DiscogsHttpAdapter {
    pub fn new(token: Option<String>) -> Result<Self> {
        Self::with_base_url(BASE_URL, token)
    }

    pub fn with_base_url(base_url: &str, token: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .wrap_err("Failed to build Discogs HTTP client")?;
        Ok(Self {
            client,
            base_url: Url::parse(base_url).wrap_err("Invalid Discogs base URL")?,
            token,
            limiter: RateLimiter::direct(Quota::per_minute(REQUESTS_PER_MINUTE)),
        })
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .wrap_err_with(|| format!("Invalid Discogs path {path}"))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => {
                request.header(header::AUTHORIZATION, format!("Discogs token={token}"))
            }
            None => request,
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        self.limiter.until_ready().await;
        debug!("GET {url}");
        self.authorize(self.client.get(url.clone()))
            .send()
            .await?
            .error_for_status()
            .wrap_err_with(|| format!("Discogs request failed: {}", url.path()))?
            .json::<T>()
            .await
            .wrap_err_with(|| format!("Failed to parse Discogs response from {}", url.path()))
    }
}

#[async_trait::async_trait]
impl DiscogsClient for DiscogsHttpAdapter {
    async fn collection_page(&self, username: &str, page: u32) -> Result<DiscogsCollectionPage> {
        let mut url = self.url(&format!(
            "/users/{}/collection/folders/0/releases",
            urlencoding::encode(username)
        ))?;
        url.query_pairs_mut()
            .append_pair("page", &page.to_string())
            .append_pair("per_page", &COLLECTION_PAGE_SIZE.to_string());
        self.get_json(url).await
    }

    async fn release(&self, release_id: i64) -> Result<DiscogsRelease> {
        let url = self.url(&format!("/releases/{release_id}"))?;
        self.get_json(url).await
    }

    async fn search_by_catalog_number(
        &self,
        catalog_number: &str,
    ) -> Result<Vec<DiscogsSearchResult>> {
        let mut url = self.url("/database/search")?;
        url.query_pairs_mut()
            .append_pair("catno", catalog_number)
            .append_pair("type", "release");
        let response: SearchResponse = self.get_json(url).await?;
        Ok(response.results)
    }

    async fn image(&self, url: &str) -> Result<Vec<u8>> {
        let url = Url::parse(url).wrap_err_with(|| format!("Invalid image URL {url}"))?;
        self.limiter.until_ready().await;
        let bytes = self
            .authorize(self.client.get(url))
            .send()
            .await?
            .error_for_status()
            .wrap_err("Discogs image download failed")?
            .bytes()
            .await?;
        Ok(bytes.to_vec())
    }
}
