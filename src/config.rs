use std::fmt::Write as _;
use std::fs;

use anyhow::{Context, Result, anyhow, bail};
use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use tracing::info;

use crate::templates;

/// Per-project config file, discovered by walking up from the working directory.
pub const PROJECT_FILE: &str = ".folderforge.toml";

const EXAMPLE_TEMPLATE: &str = "config/example.config.toml";

/// Configuration document, from `.folderforge.toml` or the user config dir.
#[derive(Debug, Default, Deserialize)]
pub struct ForgeConfig {
    pub strict: Option<bool>,
    pub template_dir: Option<String>,
}

impl ForgeConfig {
    pub fn strict(&self) -> bool {
        self.strict.unwrap_or(false)
    }

    /// User template directory, resolved against the directory holding the config file.
    pub fn template_dir(&self, config_path: &Utf8Path) -> Option<Utf8PathBuf> {
        let raw = self.template_dir.as_deref()?;
        let dir = Utf8Path::new(raw);
        if dir.is_absolute() {
            return Some(dir.to_owned());
        }
        let base = config_path.parent().unwrap_or(Utf8Path::new("."));
        Some(base.join(dir))
    }
}

/// Load a configuration file from disk and deserialize it.
pub fn load_from_path(path: &Utf8Path) -> Result<ForgeConfig> {
    let raw = fs::read_to_string(path).with_context(|| format!("reading config {}", path))?;
    let config = toml::from_str(&raw).with_context(|| format!("parsing config {}", path))?;
    info!(path = %path, "loaded config");
    Ok(config)
}

/// Like [`load_from_path`], but a missing file yields the defaults.
pub fn load_or_default(path: &Utf8Path) -> Result<ForgeConfig> {
    if !path.exists() {
        return Ok(ForgeConfig::default());
    }
    load_from_path(path)
}

/// Nearest [`PROJECT_FILE`] in `start` or one of its ancestors.
pub fn discover(start: &Utf8Path) -> Option<Utf8PathBuf> {
    let mut current = Some(start);
    while let Some(dir) = current {
        let candidate = dir.join(PROJECT_FILE);
        if candidate.exists() {
            return Some(candidate);
        }
        current = dir.parent();
    }
    None
}

/// `<config dir>/folderforge/config.toml`.
pub fn home_default() -> Result<Utf8PathBuf> {
    let mut path =
        dirs::config_dir().ok_or_else(|| anyhow!("unable to determine user config directory"))?;
    path.push("folderforge");
    path.push("config.toml");
    Utf8PathBuf::from_path_buf(path).map_err(|_| anyhow!("config path must be valid UTF-8"))
}

pub fn write_example_config(path: &Utf8Path, overwrite: bool) -> Result<()> {
    if path.exists() && !overwrite {
        bail!("{} already exists; rerun with --force to overwrite", path);
    }

    templates::write_template(path, EXAMPLE_TEMPLATE)
}

pub fn format_summary(config: &ForgeConfig, config_path: &Utf8Path) -> String {
    let mut out = String::new();
    let template_dir = config
        .template_dir(config_path)
        .map(|dir| dir.to_string())
        .unwrap_or_else(|| "<none>".to_owned());

    let _ = writeln!(out, "Strict parsing: {}", config.strict());
    let _ = writeln!(out, "Template directory: {}", template_dir);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utf8_root(dir: &tempfile::TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap()
    }

    #[test]
    fn discover_prefers_nearest_file() {
        let dir = tempfile::tempdir().unwrap();
        let root = utf8_root(&dir);
        let nested = root.join("a").join("b");
        fs::create_dir_all(&nested).unwrap();
        fs::write(root.join(PROJECT_FILE), "strict = true\n").unwrap();
        fs::write(root.join("a").join(PROJECT_FILE), "strict = false\n").unwrap();

        let found = discover(&nested).unwrap();
        assert_eq!(found, root.join("a").join(PROJECT_FILE));
    }

    #[test]
    fn discover_returns_none_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let root = utf8_root(&dir);
        assert!(discover(&root).is_none());
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_or_default(&utf8_root(&dir).join("nope.toml")).unwrap();
        assert!(!config.strict());
        assert!(config.template_dir.is_none());
    }

    #[test]
    fn template_dir_is_relative_to_config() {
        let dir = tempfile::tempdir().unwrap();
        let root = utf8_root(&dir);
        let path = root.join(PROJECT_FILE);
        fs::write(&path, "strict = true\ntemplate_dir = 'layouts'\n").unwrap();

        let config = load_from_path(&path).unwrap();
        assert!(config.strict());
        assert_eq!(config.template_dir(&path), Some(root.join("layouts")));

        let summary = format_summary(&config, &path);
        assert!(summary.contains("Strict parsing: true"));
        assert!(summary.contains("layouts"));
    }

    #[test]
    fn malformed_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = utf8_root(&dir).join(PROJECT_FILE);
        fs::write(&path, "strict = 'sometimes'\n").unwrap();

        let err = load_from_path(&path).unwrap_err();
        assert!(err.to_string().contains("parsing config"));
    }

    #[test]
    fn example_config_is_not_overwritten_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let path = utf8_root(&dir).join("nested").join("config.toml");

        write_example_config(&path, false).unwrap();
        let written = load_from_path(&path).unwrap();
        assert!(!written.strict());

        assert!(write_example_config(&path, false).is_err());
        write_example_config(&path, true).unwrap();
    }
}
