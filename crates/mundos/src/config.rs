//! Engine configuration, stored as JSON.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Failures reading or writing a config file.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("config I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to build worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Size of the script worker pool. `None` uses one thread per core.
    pub worker_threads: Option<usize>,
    /// Run `on_update` callbacks on the pool. Off runs them on the frame
    /// thread, in archetype order.
    pub parallel_scripts: bool,
    /// `env_logger` filter, e.g. `"mundos=debug"`. Ignored when `RUST_LOG` is
    /// set.
    pub log_filter: Option<String>,
    /// Scene loaded by [`Runtime::new`](crate::frame::Runtime::new).
    pub scene_path: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            worker_threads: None,
            parallel_scripts: true,
            log_filter: None,
            scene_path: None,
        }
    }
}

impl EngineConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&json)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Initialise `env_logger` with `log_filter` as the default filter.
    /// Safe to call more than once.
    pub fn init_logger(&self) {
        let filter = self.log_filter.as_deref().unwrap_or("info");
        let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).try_init();
    }

    pub(crate) fn build_pool(&self) -> Result<rayon::ThreadPool, ConfigError> {
        let mut builder = rayon::ThreadPoolBuilder::new().thread_name(|i| format!("mundos-script-{i}"));
        if let Some(threads) = self.worker_threads {
            builder = builder.num_threads(threads);
        }
        Ok(builder.build()?)
    }
}
