use launchgate_core::errors::FetchError;
use launchgate_core::traits::{FetchResponse, HttpFetcher};

/// Blocking HTTP client for OWNERS files and rotation endpoints.
#[cfg(feature = "http")]
pub struct ReqwestFetcher {
    http_client: reqwest::blocking::Client,
}

#[cfg(feature = "http")]
impl ReqwestFetcher {
    pub fn new(
        connect_timeout: std::time::Duration,
        timeout: std::time::Duration,
    ) -> Result<Self, FetchError> {
        let http_client = reqwest::blocking::Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(timeout)
            .user_agent(concat!("launchgate/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|error| FetchError::Transport {
                url: String::new(),
                message: error.to_string(),
            })?;
        Ok(Self { http_client })
    }

    pub fn from_config(config: &launchgate_core::config::LaunchgateConfig) -> Result<Self, FetchError> {
        Self::new(
            std::time::Duration::from_secs(config.http_connect_timeout_secs),
            std::time::Duration::from_secs(config.http_timeout_secs),
        )
    }
}

#[cfg(feature = "http")]
impl HttpFetcher for ReqwestFetcher {
    fn get(&self, url: &str) -> Result<FetchResponse, FetchError> {
        let transport = |error: reqwest::Error| FetchError::Transport {
            url: url.to_string(),
            message: error.to_string(),
        };
        let response = self.http_client.get(url).send().map_err(transport)?;
        let status = response.status().as_u16();
        let body = response.bytes().map_err(transport)?.to_vec();
        Ok(FetchResponse { status, body })
    }
}

/// Fetcher for hosts without network access. Every request fails, so
/// callers fall back to stored data.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineFetcher;

impl HttpFetcher for OfflineFetcher {
    fn get(&self, url: &str) -> Result<FetchResponse, FetchError> {
        Err(FetchError::Transport {
            url: url.to_string(),
            message: "network access disabled".to_string(),
        })
    }
}
