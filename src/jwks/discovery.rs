//! OIDC Discovery backed key source
//!
//! Each refresh fetches `<issuer>/.well-known/openid-configuration`, checks
//! that the document names the configured issuer, then fetches the JWKS at
//! its `jwks_uri` through the same path as [`UrlKeySource`].
//!
//! [`UrlKeySource`]: crate::jwks::UrlKeySource

use std::sync::Arc;

use serde::Deserialize;
use tracing::instrument;

use crate::config::RefreshConfig;
use crate::error::KeySourceError;
use crate::http::build_http_client;
use crate::jwks::KeySource;
use crate::jwks::key::Key;
use crate::jwks::refresher::{self, JwksFetcher, KeySlot, Refresh, RefreshHandle, RefreshState};
use crate::jwks::remote::parse_url;
use crate::jwks::set::KeySet;
use crate::shutdown::ShutdownSignal;

const DISCOVERY_PATH: &str = "/.well-known/openid-configuration";

/// OIDC Discovery document (partial)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DiscoveryDocument {
    /// Issuer identifier
    #[serde(default)]
    pub issuer: String,
    /// Location of the issuer's JWKS
    #[serde(default)]
    pub jwks_uri: String,
}

/// Builds the discovery document URL for an issuer.
#[must_use]
pub fn discovery_url(issuer: &str) -> String {
    format!("{}{DISCOVERY_PATH}", issuer.trim_end_matches('/'))
}

/// Key source locating its JWKS through the issuer's discovery document.
///
/// Advertises its issuer, so validators built on it check `iss` by default.
pub struct DiscoveryKeySource {
    issuer: String,
    keys: KeySlot,
    handle: RefreshHandle,
}

struct DiscoveryRefresh {
    issuer: String,
    discovery_url: String,
    fetcher: JwksFetcher,
}

impl DiscoveryRefresh {
    #[instrument(skip(self), fields(issuer = %self.issuer))]
    async fn discover(&self) -> Result<DiscoveryDocument, KeySourceError> {
        let body = self.fetcher.get_document(&self.discovery_url).await?;
        let document: DiscoveryDocument =
            serde_json::from_slice(&body).map_err(|e| KeySourceError::Decode {
                document: "Discovery",
                reason: e.to_string(),
            })?;

        if document.issuer != self.issuer {
            return Err(KeySourceError::DiscoveryIssuerMismatch {
                expected: self.issuer.clone(),
                discovered: document.issuer,
            });
        }

        Ok(document)
    }
}

impl Refresh for DiscoveryRefresh {
    const SOURCE: &'static str = "discovery";

    async fn refresh(&self) -> Result<usize, KeySourceError> {
        let document = self.discover().await?;
        self.fetcher.fetch_and_publish(&document.jwks_uri).await
    }
}

impl DiscoveryKeySource {
    /// Starts refreshing keys for `issuer` and returns once the first
    /// attempt finished.
    ///
    /// `issuer` is compared verbatim with the discovery document's `issuer`.
    ///
    /// # Errors
    ///
    /// Only construction problems are returned: an issuer that does not
    /// form a valid URL, an invalid [`RefreshConfig`] or an HTTP client
    /// that cannot be built.
    pub async fn new(
        issuer: &str,
        config: RefreshConfig,
        shutdown: ShutdownSignal,
    ) -> Result<Self, KeySourceError> {
        config.validate()?;
        let discovery_url = parse_url(&discovery_url(issuer))?;
        let fetcher =
            JwksFetcher::new(build_http_client(&config.http)?, config.http.max_body_bytes);
        let keys = fetcher.slot();

        let job = DiscoveryRefresh {
            issuer: issuer.to_string(),
            discovery_url: discovery_url.into(),
            fetcher,
        };
        let handle = refresher::spawn(job, &config, shutdown).await;

        Ok(Self {
            issuer: issuer.to_string(),
            keys,
            handle,
        })
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

impl KeySource for DiscoveryKeySource {
    fn get(&self, kid: &str) -> Option<Arc<Key>> {
        self.keys.load().get(kid)
    }

    fn issuer(&self) -> Option<&str> {
        Some(&self.issuer)
    }
}
