//! Key Source and Validation Metrics
//!
//! Provides Prometheus metrics for JWKS refresh outcomes and token
//! validation results. Both are optional and registered against a
//! caller-owned [`Registry`].

use prometheus::{CounterVec, GaugeVec, Opts, Registry};

use crate::error::{KeySourceError, ValidationError};

const NAMESPACE: &str = "jwks_validator";

/// Refresh metrics shared by URL and Discovery key sources
pub struct KeySourceMetrics {
    /// Refresh attempts by source kind and outcome
    pub refreshes: CounterVec,
    /// Keys in the currently published set
    pub published_keys: GaugeVec,
}

impl KeySourceMetrics {
    /// Creates and registers key source metrics
    pub fn new(registry: &Registry) -> Result<Self, prometheus::Error> {
        let refreshes = CounterVec::new(
            Opts::new("jwks_refresh_total", "Total JWKS refresh attempts").namespace(NAMESPACE),
            &["source", "outcome"],
        )?;
        registry.register(Box::new(refreshes.clone()))?;

        let published_keys = GaugeVec::new(
            Opts::new("jwks_keys", "Keys in the published key set").namespace(NAMESPACE),
            &["source"],
        )?;
        registry.register(Box::new(published_keys.clone()))?;

        Ok(Self {
            refreshes,
            published_keys,
        })
    }

    /// Records one refresh attempt
    pub fn record_refresh(&self, source: &str, outcome: Result<usize, &KeySourceError>) {
        match outcome {
            Ok(count) => {
                self.refreshes.with_label_values(&[source, "success"]).inc();
                #[allow(clippy::cast_precision_loss)]
                self.published_keys
                    .with_label_values(&[source])
                    .set(count as f64);
            }
            Err(err) => {
                self.refreshes
                    .with_label_values(&[source, err.code().as_str()])
                    .inc();
            }
        }
    }
}

/// Token validation metrics
pub struct ValidatorMetrics {
    /// Validation results by outcome
    pub validations: CounterVec,
}

impl ValidatorMetrics {
    /// Creates and registers validator metrics
    pub fn new(registry: &Registry) -> Result<Self, prometheus::Error> {
        let validations = CounterVec::new(
            Opts::new("jwt_validations_total", "Total token validations").namespace(NAMESPACE),
            &["result"],
        )?;
        registry.register(Box::new(validations.clone()))?;

        Ok(Self { validations })
    }

    /// Records one validation result
    pub fn record(&self, result: Result<(), &ValidationError>) {
        let label = match result {
            Ok(()) => "valid",
            Err(err) => err.code().as_str(),
        };
        self.validations.with_label_values(&[label]).inc();
    }
}
