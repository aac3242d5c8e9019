//! Configuration loaders for scenarios covering success and failure paths.

use std::ffi::OsString;
use std::sync::Arc;

use camino::Utf8PathBuf;
use ortho_config::{OrthoConfig, OrthoError};
use tempfile::TempDir;
use wb_config::Config;

use crate::bootstrap::ConfigLoader;

/// Loader rooting the sessions directory in a temporary directory.
#[derive(Clone)]
pub(crate) struct TestConfigLoader {
    root: Arc<TempDir>,
}

impl TestConfigLoader {
    pub(crate) fn new() -> Self {
        let root = TempDir::new().expect("temporary sessions directory");
        Self {
            root: Arc::new(root),
        }
    }

    pub(crate) fn config(&self) -> Config {
        let sessions_dir = Utf8PathBuf::from_path_buf(self.root.path().to_path_buf())
            .expect("temporary directory path was not valid UTF-8");
        Config {
            sessions_dir,
            ..Config::default()
        }
    }
}

impl ConfigLoader for TestConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(self.config())
    }
}

/// Loader that fails by passing an invalid browser name.
pub(crate) struct FailingConfigLoader;

impl ConfigLoader for FailingConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load_from_iter([
            OsString::from("wbd"),
            OsString::from("--browser"),
            OsString::from("netscape"),
        ])
    }
}
