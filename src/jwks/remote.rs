//! JWKS key source refreshed from a fixed URL.

use std::sync::Arc;

use url::Url;

use crate::config::RefreshConfig;
use crate::error::KeySourceError;
use crate::http::build_http_client;
use crate::jwks::KeySource;
use crate::jwks::key::Key;
use crate::jwks::refresher::{self, JwksFetcher, KeySlot, Refresh, RefreshHandle, RefreshState};
use crate::jwks::set::KeySet;
use crate::shutdown::ShutdownSignal;

/// Key source that periodically re-fetches a JWKS document.
///
/// Lookups read the last successfully published [`KeySet`]. Failed refreshes
/// leave it untouched; before the first success it is empty.
pub struct UrlKeySource {
    keys: KeySlot,
    handle: RefreshHandle,
}

struct UrlRefresh {
    url: String,
    fetcher: JwksFetcher,
}

impl Refresh for UrlRefresh {
    const SOURCE: &'static str = "url";

    async fn refresh(&self) -> Result<usize, KeySourceError> {
        self.fetcher.fetch_and_publish(&self.url).await
    }
}

impl UrlKeySource {
    /// Starts refreshing `url` and returns once the first attempt finished.
    ///
    /// The refresher stops when `shutdown` fires.
    ///
    /// # Errors
    ///
    /// Only construction problems are returned: an unparsable URL, an
    /// invalid [`RefreshConfig`] or an HTTP client that cannot be built.
    /// A failing first fetch is reported to the error handler instead.
    pub async fn new(
        url: &str,
        config: RefreshConfig,
        shutdown: ShutdownSignal,
    ) -> Result<Self, KeySourceError> {
        config.validate()?;
        let url = parse_url(url)?;
        let fetcher =
            JwksFetcher::new(build_http_client(&config.http)?, config.http.max_body_bytes);
        let keys = fetcher.slot();

        let job = UrlRefresh {
            url: url.into(),
            fetcher,
        };
        let handle = refresher::spawn(job, &config, shutdown).await;

        Ok(Self { keys, handle })
    }

    /// Current published snapshot
    #[must_use]
    pub fn snapshot(&self) -> Arc<KeySet> {
        self.keys.load_full()
    }

    /// Refresher lifecycle state
    #[must_use]
    pub fn state(&self) -> RefreshState {
        self.handle.state()
    }
}

impl KeySource for UrlKeySource {
    fn get(&self, kid: &str) -> Option<Arc<Key>> {
        self.keys.load().get(kid)
    }
}

pub(crate) fn parse_url(url: &str) -> Result<Url, KeySourceError> {
    Url::parse(url).map_err(|e| KeySourceError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })
}
