use komorebi_core::paths;
use std::path::{Path, PathBuf};

/// Resolve the workspace root: the directory holding `config/settings.yaml`.
///
/// Priority:
/// 1. `--config` flag / `KOMOREBI_CONFIG` (passed in as `explicit`): two
///    levels above `config/settings.yaml`, otherwise the file's directory
/// 2. Walk upward from `cwd` looking for `config/settings.yaml`
/// 3. Fall back to `cwd`
pub fn resolve_root(explicit: Option<&Path>) -> PathBuf {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    match explicit {
        Some(config) => root_of_config(&cwd.join(config)),
        None => find_upward(&cwd).unwrap_or(cwd),
    }
}

/// Config path to load: the explicit one, or the root's default.
pub fn resolve_config(root: &Path, explicit: Option<&Path>) -> PathBuf {
    match explicit {
        Some(p) if p.is_absolute() => p.to_path_buf(),
        Some(p) => std::env::current_dir()
            .map(|cwd| cwd.join(p))
            .unwrap_or_else(|_| p.to_path_buf()),
        None => paths::config_path(root),
    }
}

fn root_of_config(config: &Path) -> PathBuf {
    let dir = config.parent().unwrap_or(Path::new("."));
    if dir.file_name().is_some_and(|n| n == paths::CONFIG_DIR) {
        dir.parent().unwrap_or(dir).to_path_buf()
    } else {
        dir.to_path_buf()
    }
}

fn find_upward(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| paths::config_path(dir).is_file())
        .map(Path::to_path_buf)
}
