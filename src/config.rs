//! Per-service tuning and migration policy.
//!
//! Defaults reflect each catalog's quota and metadata quality. Any of them
//! can be overridden from a TOML file:
//!
//! ```toml
//! abort_on_playlist_failure = false
//! candidate_policy = "best_score"
//!
//! [services.youtube]
//! accept_threshold = 0.65
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{MigrateError, Result};
use crate::matching::CandidatePolicy;
use crate::models::ServiceKind;

/// Description written on every playlist the migration creates.
pub const DEFAULT_PLAYLIST_DESCRIPTION: &str = "Migrated via TuneShift";

/// Rate, batch and threshold settings for one service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceSettings {
    /// Maximum outbound calls per second.
    pub requests_per_second: f64,

    /// Maximum track references per write call.
    pub batch_size: usize,

    /// Minimum fuzzy score for a candidate on this service to be accepted.
    pub accept_threshold: f64,

    /// Override for the API base URL (proxies, test servers).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
}

impl ServiceSettings {
    /// Built-in settings for a service.
    pub fn defaults_for(kind: ServiceKind) -> Self {
        let (requests_per_second, batch_size, accept_threshold) = match kind {
            ServiceKind::Spotify => (10.0, 100, 0.80),
            // Strict daily quota, and noisy video titles.
            ServiceKind::Youtube => (1.0, 50, 0.60),
            // User uploads with loose metadata.
            ServiceKind::Soundcloud => (5.0, 50, 0.70),
            ServiceKind::Tidal => (5.0, 100, 0.80),
        };

        Self {
            requests_per_second,
            batch_size,
            accept_threshold,
            api_base: None,
        }
    }

    fn validate(&self, kind: ServiceKind) -> Result<()> {
        if !(self.requests_per_second > 0.0) {
            return Err(MigrateError::Config(format!(
                "{}: requests_per_second must be greater than 0",
                kind.id()
            )));
        }
        if self.batch_size == 0 || self.batch_size > 100 {
            return Err(MigrateError::Config(format!(
                "{}: batch_size must be between 1 and 100",
                kind.id()
            )));
        }
        if !(0.0..=1.0).contains(&self.accept_threshold) {
            return Err(MigrateError::Config(format!(
                "{}: accept_threshold must be between 0 and 1",
                kind.id()
            )));
        }
        Ok(())
    }

    fn apply(&mut self, overrides: &PartialServiceSettings) {
        if let Some(rps) = overrides.requests_per_second {
            self.requests_per_second = rps;
        }
        if let Some(batch_size) = overrides.batch_size {
            self.batch_size = batch_size;
        }
        if let Some(threshold) = overrides.accept_threshold {
            self.accept_threshold = threshold;
        }
        if let Some(base) = &overrides.api_base {
            self.api_base = Some(base.clone());
        }
    }
}

/// Settings for every service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceTable {
    pub spotify: ServiceSettings,
    pub youtube: ServiceSettings,
    pub soundcloud: ServiceSettings,
    pub tidal: ServiceSettings,
}

impl Default for ServiceTable {
    fn default() -> Self {
        Self {
            spotify: ServiceSettings::defaults_for(ServiceKind::Spotify),
            youtube: ServiceSettings::defaults_for(ServiceKind::Youtube),
            soundcloud: ServiceSettings::defaults_for(ServiceKind::Soundcloud),
            tidal: ServiceSettings::defaults_for(ServiceKind::Tidal),
        }
    }
}

impl ServiceTable {
    /// Settings for one service.
    pub fn get(&self, kind: ServiceKind) -> &ServiceSettings {
        match kind {
            ServiceKind::Spotify => &self.spotify,
            ServiceKind::Youtube => &self.youtube,
            ServiceKind::Soundcloud => &self.soundcloud,
            ServiceKind::Tidal => &self.tidal,
        }
    }

    /// Mutable settings for one service.
    pub fn get_mut(&mut self, kind: ServiceKind) -> &mut ServiceSettings {
        match kind {
            ServiceKind::Spotify => &mut self.spotify,
            ServiceKind::Youtube => &mut self.youtube,
            ServiceKind::Soundcloud => &mut self.soundcloud,
            ServiceKind::Tidal => &mut self.tidal,
        }
    }
}

/// Everything the orchestrator needs to know besides credentials and selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationConfig {
    /// Fail the whole run when one playlist cannot be fetched or written.
    /// When false the playlist is recorded as failed and the run continues.
    pub abort_on_playlist_failure: bool,

    /// Which acceptable candidate wins.
    pub candidate_policy: CandidatePolicy,

    /// Number of destination candidates requested per fuzzy search.
    pub search_limit: usize,

    /// Extra attempts for a call that failed with a transport error.
    pub transport_retries: u32,

    /// Description set on created playlists.
    pub playlist_description: String,

    /// Market passed to Tidal endpoints.
    pub tidal_country_code: String,

    /// Per-service settings.
    pub services: ServiceTable,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            abort_on_playlist_failure: true,
            candidate_policy: CandidatePolicy::FirstAcceptable,
            search_limit: 5,
            transport_retries: 2,
            playlist_description: DEFAULT_PLAYLIST_DESCRIPTION.to_string(),
            tidal_country_code: "US".to_string(),
            services: ServiceTable::default(),
        }
    }
}

/// On-disk shape: every key optional, merged over the defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    abort_on_playlist_failure: Option<bool>,
    candidate_policy: Option<CandidatePolicy>,
    search_limit: Option<usize>,
    transport_retries: Option<u32>,
    playlist_description: Option<String>,
    tidal_country_code: Option<String>,
    #[serde(default)]
    services: ServicesFile,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ServicesFile {
    spotify: Option<PartialServiceSettings>,
    youtube: Option<PartialServiceSettings>,
    soundcloud: Option<PartialServiceSettings>,
    tidal: Option<PartialServiceSettings>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PartialServiceSettings {
    requests_per_second: Option<f64>,
    batch_size: Option<usize>,
    accept_threshold: Option<f64>,
    api_base: Option<String>,
}

impl MigrationConfig {
    /// Load from a TOML file, merging over the defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading config from {}", path.display());
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Parse TOML text, merging over the defaults.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let file: ConfigFile =
            toml::from_str(text).map_err(|e| MigrateError::Config(e.to_string()))?;

        let mut config = Self::default();
        if let Some(v) = file.abort_on_playlist_failure {
            config.abort_on_playlist_failure = v;
        }
        if let Some(v) = file.candidate_policy {
            config.candidate_policy = v;
        }
        if let Some(v) = file.search_limit {
            config.search_limit = v;
        }
        if let Some(v) = file.transport_retries {
            config.transport_retries = v;
        }
        if let Some(v) = file.playlist_description {
            config.playlist_description = v;
        }
        if let Some(v) = file.tidal_country_code {
            config.tidal_country_code = v;
        }

        let sections = [
            (ServiceKind::Spotify, &file.services.spotify),
            (ServiceKind::Youtube, &file.services.youtube),
            (ServiceKind::Soundcloud, &file.services.soundcloud),
            (ServiceKind::Tidal, &file.services.tidal),
        ];
        for (kind, section) in sections {
            if let Some(overrides) = section {
                config.services.get_mut(kind).apply(overrides);
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Check every value is usable.
    pub fn validate(&self) -> Result<()> {
        if self.search_limit == 0 {
            return Err(MigrateError::Config(
                "search_limit must be greater than 0".to_string(),
            ));
        }
        for kind in ServiceKind::all() {
            self.services.get(*kind).validate(*kind)?;
        }
        Ok(())
    }

    /// Settings for one service.
    pub fn service(&self, kind: ServiceKind) -> &ServiceSettings {
        self.services.get(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table() {
        let config = MigrationConfig::default();
        let youtube = config.service(ServiceKind::Youtube);
        assert_eq!(youtube.requests_per_second, 1.0);
        assert_eq!(youtube.batch_size, 50);
        assert_eq!(youtube.accept_threshold, 0.60);
        assert_eq!(config.service(ServiceKind::Spotify).batch_size, 100);
        assert_eq!(config.service(ServiceKind::Soundcloud).accept_threshold, 0.70);
        assert_eq!(config.service(ServiceKind::Tidal).requests_per_second, 5.0);
        assert!(config.abort_on_playlist_failure);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_override_keeps_other_defaults() {
        let config = MigrationConfig::from_toml_str(
            r#"
            abort_on_playlist_failure = false
            candidate_policy = "best_score"

            [services.youtube]
            accept_threshold = 0.65
            "#,
        )
        .unwrap();

        assert!(!config.abort_on_playlist_failure);
        assert_eq!(config.candidate_policy, CandidatePolicy::BestScore);
        let youtube = config.service(ServiceKind::Youtube);
        assert_eq!(youtube.accept_threshold, 0.65);
        assert_eq!(youtube.batch_size, 50);
        assert_eq!(config.service(ServiceKind::Spotify).accept_threshold, 0.80);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = MigrationConfig::from_toml_str("[services.tidal]\nbatch_size = 500\n").unwrap_err();
        assert!(matches!(err, MigrateError::Config(msg) if msg.contains("tidal")));

        assert!(MigrationConfig::from_toml_str("[services.spotify]\nrequests_per_second = 0\n").is_err());
        assert!(MigrationConfig::from_toml_str("search_limit = 0\n").is_err());
        assert!(MigrationConfig::from_toml_str("unknown_key = 1\n").is_err());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tuneshift.toml");
        fs::write(&path, "search_limit = 3\n").unwrap();

        let config = MigrationConfig::from_file(&path).unwrap();
        assert_eq!(config.search_limit, 3);
    }
}
