//! Per-process state handed to every command handler.

use std::time::Duration;

use esc_api::{ControlEndpoint, LightingClient, TlsMode, TransportConfig};
use esc_config::ConfigStore;
use esc_core::{CoreError, ResultCache, slot};

use crate::cli::{GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

/// Config store, result cache and global flags, built once at startup.
pub struct Context {
    config: ConfigStore,
    cache: ResultCache,
    global: GlobalOpts,
}

impl Context {
    pub fn new(global: GlobalOpts) -> Result<Self, CliError> {
        let config_path = global
            .config
            .clone()
            .unwrap_or_else(esc_config::config_path);
        let config = ConfigStore::load(&config_path).map_err(|e| {
            tracing::debug!(path = %config_path.display(), error = %e, "config load failed");
            CliError::from(e)
        })?;

        let cache_path = global
            .cache_file
            .clone()
            .unwrap_or_else(esc_config::cache_path);
        tracing::debug!(path = %cache_path.display(), "using result cache");

        Ok(Self {
            config,
            cache: ResultCache::open(cache_path),
            global,
        })
    }

    pub fn global(&self) -> &GlobalOpts {
        &self.global
    }

    pub fn output(&self) -> OutputFormat {
        self.global.output
    }

    pub fn config(&self) -> &ConfigStore {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut ConfigStore {
        &mut self.config
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    fn reply_timeout(&self) -> Duration {
        Duration::from_secs(self.global.timeout)
    }

    /// HTTP client for the configured backend.
    pub fn lighting_client(&self) -> Result<LightingClient, CliError> {
        let cfg = self.config.config();
        let transport = TransportConfig {
            tls: if self.global.insecure {
                TlsMode::DangerAcceptInvalid
            } else {
                TlsMode::System
            },
            timeout: self.reply_timeout(),
        };
        LightingClient::new(cfg.base_url()?, &cfg.http_token(), &transport)
            .map_err(|e| CoreError::from(e).into())
    }

    /// Control channel endpoint derived from the configured backend URL.
    pub fn control_endpoint(&self) -> Result<ControlEndpoint, CliError> {
        let cfg = self.config.config();
        ControlEndpoint::new(&cfg.base_url()?, cfg.ws_token(), self.reply_timeout())
            .map_err(|e| CoreError::from(e).into())
    }

    /// Print rendered output and remember it under `slot` and as the last
    /// shown output.
    pub fn emit(&self, slot_name: &str, rendered: &str) -> Result<(), CliError> {
        output::print_output(rendered, self.global.quiet);
        if slot_name != slot::LAST {
            self.cache.set(slot_name, rendered)?;
        }
        self.cache.set(slot::LAST, rendered)?;
        Ok(())
    }
}
