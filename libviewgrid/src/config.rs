use config::{Config, Environment, File};
use directories::ProjectDirs;
use eyre::{Result, anyhow};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

pub static PROJECT_DIR: LazyLock<Option<ProjectDirs>> =
    LazyLock::new(|| ProjectDirs::from("org", "viewgrid", "viewgrid"));
const CONFIG_FILE: &str = "config.toml";
pub const LOCAL_DIR: &str = ".viewgrid";
const DEFAULT_CONFIG: &str = include_str!("../../default_config.toml");

#[derive(Debug, Clone, Deserialize)]
pub struct GridConfig {
    pub autosave: AutosaveConfig,
    pub pager: PagerConfig,
    pub matrix: MatrixConfig,
    pub format: FormatConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AutosaveConfig {
    /// Quiet period in milliseconds before a dirty layout is saved
    pub debounce_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PagerConfig {
    /// Rows requested per matrix page
    pub page_size: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MatrixConfig {
    /// Ask the server to also resolve historicized values
    pub include_historical: bool,
    /// Number of fetched pages a view keeps around
    pub cache_pages: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FormatConfig {
    /// Locale for number grouping, empty for the system locale
    pub locale: String,
    pub date_format: String,
    pub datetime_format: String,
    pub no_date_sentinel: f64,
    /// Group label used when the group value is empty
    pub empty_group_label: String,
    pub as_of_prefix: String,
    pub expert_mode: bool,
}

impl GridConfig {
    /// Loads the embedded defaults, then the user config, local `.viewgrid` directories
    /// and finally `VIEWGRID_*` environment variables.
    pub fn new(force_default_config: bool) -> Result<Self> {
        let mut config = Config::builder().add_source(File::from_str(
            DEFAULT_CONFIG,
            config::FileFormat::Toml,
        ));

        if !force_default_config {
            if let Some(proj_dirs) = &*PROJECT_DIR {
                let config_file = proj_dirs.config_dir().join(CONFIG_FILE);
                config = config.add_source(File::from(config_file).required(false));
            }

            // Most top-level first so that local directories win.
            config = find_local_configs()
                .into_iter()
                .fold(config, |c, p| {
                    c.add_source(File::from(p.join(CONFIG_FILE)).required(false))
                })
                .add_source(
                    Environment::with_prefix("viewgrid")
                        .prefix_separator("_")
                        .separator("__")
                        .try_parsing(true),
                );
        }

        config
            .build()?
            .try_deserialize()
            .map_err(|e| anyhow!("Failed to parse config {e}"))
    }

    /// Embedded defaults overlaid with a single explicit file.
    pub fn from_file(path: &Path) -> Result<Self> {
        Config::builder()
            .add_source(File::from_str(DEFAULT_CONFIG, config::FileFormat::Toml))
            .add_source(File::from(path))
            .build()?
            .try_deserialize()
            .map_err(|e| anyhow!("Failed to parse config {}: {e}", path.display()))
    }

    pub fn new_from_toml(config: &str) -> Result<Self> {
        Ok(toml::from_str(config)?)
    }

    #[must_use]
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.autosave.debounce_ms)
    }
}

impl Default for GridConfig {
    fn default() -> Self {
        Self::new_from_toml(DEFAULT_CONFIG).expect("Failed to load default config")
    }
}

/// Searches for `.viewgrid` directories upward from the current location, returned from
/// the most top-level to the most local one.
fn find_local_configs() -> Vec<PathBuf> {
    match std::env::current_dir() {
        Ok(dir) => dir
            .ancestors()
            .map(|p| p.join(LOCAL_DIR))
            .filter(|p| p.is_dir())
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect(),
        Err(_) => vec![],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn embedded_defaults_parse() {
        let config = GridConfig::default();
        assert_eq!(config.autosave.debounce_ms, 600);
        assert_eq!(config.debounce(), Duration::from_millis(600));
        assert_eq!(config.pager.page_size, 100);
        assert_eq!(config.format.empty_group_label, "(empty)");
        assert_eq!(config.format.no_date_sentinel, 0.0);
        assert!(!config.format.expert_mode);
        assert_eq!(config.matrix.cache_pages, 16);
    }

    #[test]
    fn file_overrides_single_keys() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[autosave]\ndebounce_ms = 50\n[format]\nlocale = \"en-US\"").unwrap();

        let config = GridConfig::from_file(file.path()).unwrap();
        assert_eq!(config.autosave.debounce_ms, 50);
        assert_eq!(config.format.locale, "en-US");
        assert_eq!(config.pager.page_size, 100);
    }
}
