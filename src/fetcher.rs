use async_trait::async_trait;
use reqwest::{Client, ClientBuilder};
use url::Url;

use crate::error::{MirrorError, Result};

/// Source of raw response bytes for a URL.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Fetch: Send + Sync {
    /// Fetches `url`, failing on transport errors and non-success statuses.
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>>;
}

/// [`Fetch`] over a shared `reqwest` client.
#[derive(Clone, Debug)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(user_agent: &str) -> anyhow::Result<Self> {
        let client = ClientBuilder::new()
            .use_rustls_tls()
            .user_agent(user_agent)
            .cookie_store(true)
            .build()?;

        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>> {
        let network = |source| MirrorError::Network {
            url: url.to_string(),
            source,
        };

        let response = self.client.get(url.clone()).send().await.map_err(network)?;

        let status = response.status();
        if !status.is_success() {
            return Err(MirrorError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(network)?;
        Ok(body.to_vec())
    }
}
