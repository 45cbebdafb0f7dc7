//! Filesystem probing for Vivado installations.

use std::cmp::Reverse;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, trace};

use super::Installation;

fn version_dir_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\d{4}\.\d").expect("version pattern is valid"))
}

/// Whether a directory name looks like a Vivado release (`2023.2`).
pub fn is_version_dir(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|name| version_dir_pattern().is_match(name))
}

/// Numeric components of a version string, up to the first non-numeric one.
///
/// `2024.1.1` sorts after `2024.1`, which sorts after `2023.2`.
pub fn parse_version(version: &str) -> Vec<u32> {
    version
        .split(['.', '_', '-'])
        .map_while(|part| part.parse().ok())
        .collect()
}

/// Standard installation roots for the current platform.
pub fn platform_search_paths() -> Vec<PathBuf> {
    #[cfg(windows)]
    {
        let mut paths = Vec::new();
        for drive in ["C:", "D:", "E:"] {
            paths.push(PathBuf::from(format!("{}/Xilinx/Vivado", drive)));
            paths.push(PathBuf::from(format!("{}/Xilinx/Vivado_Lab", drive)));
        }
        let program_files =
            std::env::var("PROGRAMFILES").unwrap_or_else(|_| "C:/Program Files".to_string());
        let program_files_x86 = std::env::var("PROGRAMFILES(X86)")
            .unwrap_or_else(|_| "C:/Program Files (x86)".to_string());
        paths.push(PathBuf::from(program_files).join("Xilinx").join("Vivado"));
        paths.push(PathBuf::from(program_files_x86).join("Xilinx").join("Vivado"));
        paths
    }
    #[cfg(not(windows))]
    {
        let mut paths = vec![
            PathBuf::from("/opt/Xilinx/Vivado"),
            PathBuf::from("/tools/Xilinx/Vivado"),
        ];
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join("Xilinx").join("Vivado"));
            paths.push(home.join(".Xilinx").join("Vivado"));
        }
        paths
    }
}

/// Locate the launcher inside a version directory.
pub fn find_executable(version_dir: &Path) -> Option<PathBuf> {
    let bin = version_dir.join("bin");

    #[cfg(windows)]
    let candidates = ["vivado.bat", "vivado.exe"];
    #[cfg(not(windows))]
    let candidates = ["vivado"];

    candidates
        .iter()
        .map(|name| bin.join(name))
        .find(|path| path.exists())
}

/// Scan `search_paths` for installations, newest first.
///
/// Unreadable roots are skipped; symlinked duplicates are reported once.
pub fn detect_installations(search_paths: &[PathBuf]) -> Vec<Installation> {
    let mut installations = Vec::new();
    let mut seen = HashSet::new();

    for root in search_paths {
        let entries = match std::fs::read_dir(root) {
            Ok(entries) => entries,
            Err(e) => {
                trace!("skipping search path {}: {}", root.display(), e);
                continue;
            }
        };

        for entry in entries.flatten() {
            let version_dir = entry.path();
            if !version_dir.is_dir() || !is_version_dir(&version_dir) {
                continue;
            }

            let resolved = version_dir
                .canonicalize()
                .unwrap_or_else(|_| version_dir.clone());
            if !seen.insert(resolved) {
                continue;
            }

            let Some(executable) = find_executable(&version_dir) else {
                continue;
            };

            let version = entry.file_name().to_string_lossy().into_owned();
            debug!("found Vivado {} at {}", version, version_dir.display());
            installations.push(Installation {
                version,
                path: version_dir,
                executable,
            });
        }
    }

    installations.sort_by_key(|install| Reverse(parse_version(&install.version)));
    installations
}

/// Pick the installation to use.
///
/// Priority:
/// 1. `override_path`, used as-is when it contains a launcher
/// 2. `override_version` among the detected installations
/// 3. the newest detected installation
pub fn default_installation(
    override_path: Option<&Path>,
    override_version: Option<&str>,
    search_paths: &[PathBuf],
) -> Option<Installation> {
    if let Some(path) = override_path {
        if !path.exists() {
            return None;
        }
        let executable = find_executable(path)?;
        let version = if is_version_dir(path) {
            path.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "unknown".to_string())
        } else {
            "unknown".to_string()
        };
        return Some(Installation {
            version,
            path: path.to_path_buf(),
            executable,
        });
    }

    let installations = detect_installations(search_paths);

    match override_version {
        Some(wanted) => installations
            .into_iter()
            .find(|install| install.version == wanted),
        None => installations.into_iter().next(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn launcher_name() -> &'static str {
        if cfg!(windows) {
            "vivado.bat"
        } else {
            "vivado"
        }
    }

    fn fake_install(root: &Path, version: &str) -> PathBuf {
        let dir = root.join(version);
        std::fs::create_dir_all(dir.join("bin")).unwrap();
        std::fs::write(dir.join("bin").join(launcher_name()), "").unwrap();
        dir
    }

    #[test]
    fn test_is_version_dir() {
        assert!(is_version_dir(Path::new("/opt/Xilinx/Vivado/2023.2")));
        assert!(is_version_dir(Path::new("2024.1.1")));
        assert!(!is_version_dir(Path::new("/opt/Xilinx/Vivado/latest")));
        assert!(!is_version_dir(Path::new("23.2")));
    }

    #[test]
    fn test_parse_version_ordering() {
        assert_eq!(parse_version("2023.2"), vec![2023, 2]);
        assert_eq!(parse_version("2024.1.1"), vec![2024, 1, 1]);
        assert_eq!(parse_version("2022.1_beta"), vec![2022, 1]);
        assert!(parse_version("2024.1.1") > parse_version("2024.1"));
        assert!(parse_version("2024.1") > parse_version("2023.2"));
    }

    #[test]
    fn test_detect_sorted_newest_first() {
        let root = TempDir::new().unwrap();
        fake_install(root.path(), "2022.2");
        fake_install(root.path(), "2024.1");
        fake_install(root.path(), "2023.2");

        let found = detect_installations(&[root.path().to_path_buf()]);
        let versions: Vec<_> = found.iter().map(|i| i.version.as_str()).collect();
        assert_eq!(versions, vec!["2024.1", "2023.2", "2022.2"]);
    }

    #[test]
    fn test_detect_skips_invalid_entries() {
        let root = TempDir::new().unwrap();
        fake_install(root.path(), "2023.2");
        // Version-looking directory without a launcher.
        std::fs::create_dir_all(root.path().join("2024.1").join("bin")).unwrap();
        // Launcher under a non-version directory.
        fake_install(root.path(), "DocNav");
        std::fs::write(root.path().join("2025.1"), "not a dir").unwrap();

        let found = detect_installations(&[
            root.path().to_path_buf(),
            root.path().join("does-not-exist"),
        ]);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].version, "2023.2");
        assert!(found[0].executable.ends_with(launcher_name()));
    }

    #[test]
    fn test_detect_deduplicates_roots() {
        let root = TempDir::new().unwrap();
        fake_install(root.path(), "2023.2");

        let found = detect_installations(&[root.path().to_path_buf(), root.path().to_path_buf()]);
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn test_default_with_override_path() {
        let root = TempDir::new().unwrap();
        let dir = fake_install(root.path(), "2023.1");

        let install = default_installation(Some(&dir), None, &[]).unwrap();
        assert_eq!(install.version, "2023.1");
        assert_eq!(install.path, dir);
    }

    #[test]
    fn test_default_override_path_unknown_version() {
        let root = TempDir::new().unwrap();
        let dir = fake_install(root.path(), "custom");

        let install = default_installation(Some(&dir), None, &[]).unwrap();
        assert_eq!(install.version, "unknown");
    }

    #[test]
    fn test_default_override_path_missing() {
        let root = TempDir::new().unwrap();
        assert!(default_installation(Some(&root.path().join("nope")), None, &[]).is_none());
        // Exists but has no launcher.
        assert!(default_installation(Some(root.path()), None, &[]).is_none());
    }

    #[test]
    fn test_default_by_version() {
        let root = TempDir::new().unwrap();
        fake_install(root.path(), "2023.2");
        fake_install(root.path(), "2024.1");
        let paths = [root.path().to_path_buf()];

        let install = default_installation(None, Some("2023.2"), &paths).unwrap();
        assert_eq!(install.version, "2023.2");

        assert!(default_installation(None, Some("2019.1"), &paths).is_none());
    }

    #[test]
    fn test_default_newest() {
        let root = TempDir::new().unwrap();
        fake_install(root.path(), "2023.2");
        fake_install(root.path(), "2024.1");

        let install = default_installation(None, None, &[root.path().to_path_buf()]).unwrap();
        assert_eq!(install.version, "2024.1");
    }

    #[test]
    fn test_default_none_found() {
        let root = TempDir::new().unwrap();
        assert!(default_installation(None, None, &[root.path().to_path_buf()]).is_none());
    }
}
