use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;

#[derive(Debug, Serialize, Deserialize)]
pub struct Config {
    /// Cap on the randomized rerooting retry loop before a run is
    /// declared structurally anomalous.
    #[serde(default = "default_max_reroot_attempts")]
    pub max_reroot_attempts: usize,
    /// Worker threads for per-phylum rootings; 0 means one per core.
    #[serde(default = "default_threads")]
    pub threads: usize,
}

fn default_max_reroot_attempts() -> usize {
    100
}

fn default_threads() -> usize {
    0
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_reroot_attempts: default_max_reroot_attempts(),
            threads: default_threads(),
        }
    }
}

impl Config {
    pub fn load() -> Self {
        if let Some(proj_dirs) = ProjectDirs::from("org", "reldiv", "reldiv") {
            let config_dir = proj_dirs.config_dir();
            let config_path = config_dir.join("config.toml");

            if config_path.exists() {
                if let Ok(content) = fs::read_to_string(config_path) {
                    if let Ok(config) = toml::from_str(&content) {
                        return config;
                    }
                }
            }
        }
        Config::default()
    }

    pub fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(proj_dirs) = ProjectDirs::from("org", "reldiv", "reldiv") {
            let config_dir = proj_dirs.config_dir();
            fs::create_dir_all(config_dir)?;

            let config_path = config_dir.join("config.toml");
            let content = toml::to_string_pretty(self)?;
            fs::write(config_path, content)?;
        }
        Ok(())
    }
}
