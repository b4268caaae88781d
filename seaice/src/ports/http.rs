//! HTTP archive download.

use std::fs;
use std::path::{Path, PathBuf};

use reqwest::blocking::Client;
use tracing::{debug, info};

use super::ArchiveFetcher;
use crate::config::FetchConfig;
use crate::core::RunKey;
use crate::errors::FetchError;

/// Downloads daily archives from the polar imagery server.
#[derive(Debug, Clone)]
pub struct HttpArchiveFetcher {
    client: Client,
    config: FetchConfig,
}

impl HttpArchiveFetcher {
    /// Creates a fetcher with a client built from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Transport`] if the HTTP client cannot be built.
    pub fn new(config: FetchConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| FetchError::Transport {
                url: config.base_url.clone(),
                reason: e.to_string(),
            })?;
        Ok(Self { client, config })
    }

    /// The archive URL for a run.
    #[must_use]
    pub fn url_for(&self, run_key: &RunKey) -> String {
        format!(
            "{}/{run_key}/{run_key}.antarctic.tar.gz",
            self.config.base_url.trim_end_matches('/')
        )
    }
}

impl ArchiveFetcher for HttpArchiveFetcher {
    fn fetch(&self, run_key: &RunKey, dest: &Path) -> Result<PathBuf, FetchError> {
        if dest.exists() {
            debug!(path = %dest.display(), "Archive already present, skipping download");
            return Ok(dest.to_path_buf());
        }

        let url = self.url_for(run_key);
        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| FetchError::Transport {
                url: url.clone(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url,
                status: status.as_u16(),
            });
        }

        let body = response.bytes().map_err(|e| FetchError::Transport {
            url: url.clone(),
            reason: e.to_string(),
        })?;

        let write_err = |e: std::io::Error| FetchError::Write {
            path: dest.to_path_buf(),
            reason: e.to_string(),
        };
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        // A partial body must never satisfy the existence check of a later run.
        let mut partial = dest.as_os_str().to_owned();
        partial.push(".part");
        let partial = PathBuf::from(partial);
        fs::write(&partial, &body).map_err(write_err)?;
        fs::rename(&partial, dest).map_err(write_err)?;

        info!(url = %url, bytes = body.len(), "Downloaded archive");
        Ok(dest.to_path_buf())
    }
}
