//! Vivado installation discovery.
//!
//! Sessions only need an [`Installation`]; where it comes from is decided by
//! an [`InstallationResolver`]. The default resolver, [`Detector`], honors the
//! configured path or version and otherwise probes the standard install
//! roots.

mod detection;

use std::path::PathBuf;

use serde::Serialize;

use crate::config::Config;

pub use detection::{
    default_installation, detect_installations, find_executable, is_version_dir, parse_version,
    platform_search_paths,
};

/// A Vivado installation on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Installation {
    /// Release string, e.g. `2023.2`, or `unknown`.
    pub version: String,
    /// Version directory.
    pub path: PathBuf,
    /// Launcher script or binary.
    pub executable: PathBuf,
}

impl Installation {
    /// Describe an installation directly from its launcher path.
    pub fn from_executable(version: impl Into<String>, executable: impl Into<PathBuf>) -> Self {
        let executable = executable.into();
        let path = executable
            .parent()
            .and_then(|bin| bin.parent())
            .map(PathBuf::from)
            .unwrap_or_default();
        Self {
            version: version.into(),
            path,
            executable,
        }
    }
}

/// Source of the installation to use when a caller does not name one.
pub trait InstallationResolver: Send + Sync {
    /// Resolve the default installation, or `None` if nothing usable exists.
    fn resolve(&self) -> Option<Installation>;
}

/// Resolver that always returns the same answer.
impl InstallationResolver for Option<Installation> {
    fn resolve(&self) -> Option<Installation> {
        self.clone()
    }
}

/// Configuration-driven resolver backed by filesystem probing.
#[derive(Debug, Clone, Default)]
pub struct Detector {
    override_path: Option<PathBuf>,
    override_version: Option<String>,
    search_paths: Vec<PathBuf>,
}

impl Detector {
    /// Build a detector from loaded configuration.
    ///
    /// Configured search paths are probed after the platform defaults.
    pub fn from_config(config: &Config) -> Self {
        let mut search_paths = platform_search_paths();
        search_paths.extend(config.additional_search_paths.iter().cloned());
        Self {
            override_path: config.vivado_path.clone(),
            override_version: config.vivado_version.clone(),
            search_paths,
        }
    }

    /// Build a detector that only probes the given roots.
    pub fn with_search_paths(search_paths: Vec<PathBuf>) -> Self {
        Self {
            search_paths,
            ..Self::default()
        }
    }

    /// Roots this detector probes.
    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    /// All installations under the search roots, newest first.
    pub fn detect_all(&self) -> Vec<Installation> {
        detect_installations(&self.search_paths)
    }
}

impl InstallationResolver for Detector {
    fn resolve(&self) -> Option<Installation> {
        default_installation(
            self.override_path.as_deref(),
            self.override_version.as_deref(),
            &self.search_paths,
        )
    }
}
