//! Per-run context
//!
//! Built once per run and passed to whatever needs the configuration, the
//! test-data store or the API client. Nothing here is global.

use std::path::Path;
use std::time::Duration;

use crate::auth::TokenManager;
use crate::client::ApiClient;
use crate::common::config::{ConfigStore, Settings};
use crate::common::{paths, Error, Result};
use crate::store::TestDataStore;

/// Everything a flow needs: configuration, test data, token and HTTP client
#[derive(Debug)]
pub struct RunContext {
    config: ConfigStore,
    settings: Settings,
    data: TestDataStore,
    auth: TokenManager,
    http: reqwest::Client,
}

impl RunContext {
    /// Build a context from already-opened stores
    pub fn new(config: ConfigStore, data: TestDataStore) -> Result<Self> {
        let settings = config.settings()?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.environments.timeout))
            .user_agent(concat!("apiflow/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;

        let auth = TokenManager::new(http.clone(), settings.clone());

        tracing::debug!(
            base_url = %settings.environments.api_base_url,
            timeout_secs = settings.environments.timeout,
            data_file = %data.path().display(),
            "Run context ready"
        );

        Ok(Self {
            config,
            settings,
            data,
            auth,
            http,
        })
    }

    /// Discover and load the configuration and test-data files
    ///
    /// `config_path`/`data_path` are explicit overrides (CLI flags); see
    /// [`paths`] for the fallback order.
    pub fn from_config(config_path: Option<&Path>, data_path: Option<&Path>) -> Result<Self> {
        let config = open_config(config_path)?;
        let data = open_data(&config, data_path)?;
        Self::new(config, data)
    }

    pub fn config(&self) -> &ConfigStore {
        &self.config
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn data(&self) -> &TestDataStore {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut TestDataStore {
        &mut self.data
    }

    pub fn token_manager(&self) -> &TokenManager {
        &self.auth
    }

    /// API client borrowing this context
    pub fn client(&mut self) -> ApiClient<'_> {
        ApiClient::new(&self.http, &self.settings, &self.auth, &mut self.data)
    }

    /// Cached token, logging in when absent or when forced
    pub async fn get_token(&mut self, force_refresh: bool) -> Result<String> {
        self.auth.get_token(&mut self.data, force_refresh).await
    }
}

/// Locate and load the configuration file
pub fn open_config(explicit: Option<&Path>) -> Result<ConfigStore> {
    let path = paths::resolve_config_path(explicit).ok_or_else(|| {
        Error::Config(format!(
            "No configuration file found. Pass --config, set ${}, or create config/config.yaml",
            paths::CONFIG_ENV
        ))
    })?;
    ConfigStore::open(path)
}

/// Open the test-data store that belongs to `config`
pub fn open_data(config: &ConfigStore, explicit: Option<&Path>) -> Result<TestDataStore> {
    let configured = config.get_str("test_data_file").map(Path::new);
    let path = paths::resolve_data_path(explicit, config.path(), configured);
    TestDataStore::open(path)
}
