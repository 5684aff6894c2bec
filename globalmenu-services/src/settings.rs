// SPDX-License-Identifier: LGPL-3.0-only
use anyhow::Result;
use globalmenu_core::config::MenuPreferences;
use serde::Deserialize;
use smol::fs;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use xdg::BaseDirectories;

const XDG_PREFIX: &str = "globalmenu";
const CONFIG_FILE: &str = "config.toml";

/// The main configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// General settings
    #[serde(default)]
    pub general: GeneralSettings,
    /// Menu behaviour
    #[serde(default)]
    pub menu: MenuSettings,
    /// Any other sections are captured here
    #[serde(flatten)]
    pub other: HashMap<String, toml::Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeneralSettings {
    pub debug: Option<bool>,
    pub log_level: Option<String>,
}

/// The `[menu]` section. Unset keys keep the engine defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MenuSettings {
    /// Show icons in menus.
    pub show_icons: Option<bool>,
    /// DOM key code of the menu access key.
    pub access_key: Option<u32>,
    /// Delay before a keyboard-opened menu is presented.
    pub open_delay_ms: Option<u64>,
    /// Largest icon dimension in pixels.
    pub max_icon_size: Option<u32>,
    /// Longest label in characters.
    pub max_label_chars: Option<usize>,
}

/// Registry for managing settings.
#[derive(Debug, Default)]
pub struct SettingsRegistry {
    config: Config,
}

impl SettingsRegistry {
    /// Create a new SettingsRegistry and load configuration from standard locations.
    pub async fn new() -> Result<Self> {
        let mut registry = Self::default();
        registry.load().await?;
        Ok(registry)
    }

    /// Load configuration from standard locations in precedence order.
    ///
    /// Order (later overrides earlier):
    /// 1. System Data: /usr/share/globalmenu/config.toml (and XDG_DATA_DIRS)
    /// 2. System Config: /etc/xdg/globalmenu/config.toml (and XDG_CONFIG_DIRS)
    /// 3. User Config: ~/.config/globalmenu/config.toml (XDG_CONFIG_HOME)
    pub async fn load(&mut self) -> Result<()> {
        let xdg_dirs = BaseDirectories::with_prefix(XDG_PREFIX)?;

        for path in xdg_dirs.find_data_files(CONFIG_FILE).rev() {
            self.load_file(&path).await;
        }
        for path in xdg_dirs.find_config_files(CONFIG_FILE).rev() {
            self.load_file(&path).await;
        }
        let user_config_path = xdg_dirs.get_config_home().join(CONFIG_FILE);
        if user_config_path.exists() {
            self.load_file(&user_config_path).await;
        }

        Ok(())
    }

    async fn load_file(&mut self, path: &Path) {
        log::info!("Loading config from: {:?}", path);
        match fs::read_to_string(path).await {
            Ok(content) => match toml::from_str::<Config>(&content) {
                Ok(loaded_config) => self.merge(loaded_config),
                Err(e) => {
                    log::error!("Failed to parse config file {:?}: {}", path, e);
                },
            },
            Err(e) => {
                log::warn!("Failed to read config file {:?}: {}", path, e);
            },
        }
    }

    /// Merge a loaded config into the current config.
    fn merge(&mut self, other: Config) {
        let general = &mut self.config.general;
        if other.general.debug.is_some() {
            general.debug = other.general.debug;
        }
        if other.general.log_level.is_some() {
            general.log_level = other.general.log_level;
        }

        let menu = &mut self.config.menu;
        if other.menu.show_icons.is_some() {
            menu.show_icons = other.menu.show_icons;
        }
        if other.menu.access_key.is_some() {
            menu.access_key = other.menu.access_key;
        }
        if other.menu.open_delay_ms.is_some() {
            menu.open_delay_ms = other.menu.open_delay_ms;
        }
        if other.menu.max_icon_size.is_some() {
            menu.max_icon_size = other.menu.max_icon_size;
        }
        if other.menu.max_label_chars.is_some() {
            menu.max_label_chars = other.menu.max_label_chars;
        }

        self.config.other.extend(other.other);
    }

    /// Get the current configuration.
    pub fn get(&self) -> &Config {
        &self.config
    }

    /// Engine preferences with the configured overrides applied.
    pub fn preferences(&self) -> MenuPreferences {
        let menu = &self.config.menu;
        let defaults = MenuPreferences::default();
        MenuPreferences {
            menus_have_icons: menu.show_icons.unwrap_or(defaults.menus_have_icons),
            menu_access_key: menu.access_key.unwrap_or(defaults.menu_access_key),
            open_delay: menu
                .open_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.open_delay),
            max_icon_size: menu.max_icon_size.unwrap_or(defaults.max_icon_size),
            max_label_chars: menu.max_label_chars.unwrap_or(defaults.max_label_chars),
        }
    }

    /// Load configuration from multiple custom paths asynchronously.
    pub async fn load_from_paths_async(&mut self, paths: Vec<PathBuf>) -> Vec<anyhow::Result<()>> {
        let mut results = Vec::new();

        for path in paths {
            let result = async {
                let content = fs::read_to_string(&path)
                    .await
                    .map_err(|e| anyhow::anyhow!("Failed to read config file {:?}: {}", path, e))?;

                let loaded_config: Config = toml::from_str(&content)
                    .map_err(|e| anyhow::anyhow!("Failed to parse config file {:?}: {}", path, e))?;

                self.merge(loaded_config);
                Ok(())
            }
            .await;

            results.push(result);
        }

        results
    }

    /// Reload configuration asynchronously (re-runs the full load process).
    pub async fn reload_async(&mut self) -> anyhow::Result<()> {
        *self = Self::default();
        self.load().await
    }
}
