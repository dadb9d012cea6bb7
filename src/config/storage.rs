//! Persistence for configuration files.

use super::Config;
use crate::error::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Directory name for stackland metadata within the user config dir.
const APP_DIR: &str = "stackland";

/// Filename for the user-level config.
const USER_CONFIG_FILE: &str = "config.toml";

/// Filename for the repository-level config inside the git dir.
const REPO_CONFIG_FILE: &str = "stackland.toml";

/// Resolve the git directory for a repository root.
///
/// In linked worktrees (created via `git worktree add`), `<root>/.git` is a
/// plain text file of the form `gitdir: <path>` pointing at the real git
/// directory. Relative pointers are resolved against the root.
///
/// Falls back to `<root>/.git` if resolution fails.
pub fn git_dir(repo_root: &Path) -> PathBuf {
    let dot_git = repo_root.join(".git");

    if dot_git.is_file() {
        if let Ok(contents) = fs::read_to_string(&dot_git) {
            if let Some(pointer) = contents.trim().strip_prefix("gitdir:") {
                let target = PathBuf::from(pointer.trim());
                let target = if target.is_absolute() {
                    target
                } else {
                    repo_root.join(target)
                };
                if target.is_dir() {
                    return fs::canonicalize(&target).unwrap_or(target);
                }
            }
        }
        // Pointer file exists but is invalid/unreadable - return as-is to surface error
        return dot_git;
    }

    dot_git
}

/// Get path to the repository config file.
pub fn repo_config_path(repo_root: &Path) -> PathBuf {
    git_dir(repo_root).join(REPO_CONFIG_FILE)
}

/// Get path to the user config file, if the platform has a config dir.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join(USER_CONFIG_FILE))
}

/// Load configuration for a repository.
///
/// Missing files are skipped; values from the repository file win over the
/// user file, which wins over built-in defaults.
pub fn load_config(repo_root: &Path) -> Result<Config> {
    load_layered(user_config_path().as_deref(), &repo_config_path(repo_root))
}

pub(crate) fn load_layered(user_path: Option<&Path>, repo_path: &Path) -> Result<Config> {
    let mut merged = toml::Value::try_from(Config::default())
        .map_err(|e| Error::Config(format!("failed to encode defaults: {e}")))?;

    for path in user_path.into_iter().chain(std::iter::once(repo_path)) {
        if let Some(layer) = read_layer(path)? {
            merge_values(&mut merged, layer);
        }
    }

    let config: Config = merged
        .try_into()
        .map_err(|e| Error::Config(format!("invalid configuration: {e}")))?;
    config.poll.validate()?;
    Ok(config)
}

fn read_layer(path: &Path) -> Result<Option<toml::Value>> {
    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("failed to read {}: {e}", path.display())))?;

    let value: toml::Value = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("failed to parse {}: {e}", path.display())))?;

    Ok(Some(value))
}

/// Deep-merge `overlay` into `base`; tables merge key by key, anything else replaces.
fn merge_values(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, value) in overlay_table {
                match base_table.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base_table.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

/// Save configuration to the repository config file.
pub fn save_repo_config(repo_root: &Path, config: &Config) -> Result<()> {
    let path = repo_config_path(repo_root);

    if let Some(dir) = path.parent() {
        if !dir.exists() {
            fs::create_dir_all(dir)
                .map_err(|e| Error::Config(format!("failed to create {}: {e}", dir.display())))?;
        }
    }

    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("failed to serialize config: {e}")))?;

    // Add header comment
    let content_with_header = format!(
        "# stackland repository configuration\n# Values here override the user config\n\n{content}"
    );

    fs::write(&path, content_with_header)
        .map_err(|e| Error::Config(format!("failed to write {}: {e}", path.display())))?;

    Ok(())
}
