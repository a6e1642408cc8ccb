// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use atrium_app::{AVAILABLE_PAGE_SIZES, DEFAULT_PAGE_SIZE, PageSize};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use url::Url;

pub const APP_NAME: &str = "atrium";

const CONFIG_VERSION: i64 = 1;
const DEFAULT_API_BASE_URL: &str = "http://localhost:3000";
const DEFAULT_API_TIMEOUT: &str = "5s";
const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub api: Api,
    #[serde(default)]
    pub ui: Ui,
    #[serde(default)]
    pub log: Log,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            api: Api::default(),
            ui: Ui::default(),
            log: Log::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Api {
    pub base_url: Option<String>,
    pub timeout: Option<String>,
}

impl Default for Api {
    fn default() -> Self {
        Self {
            base_url: Some(DEFAULT_API_BASE_URL.to_owned()),
            timeout: Some(DEFAULT_API_TIMEOUT.to_owned()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Ui {
    pub page_size: Option<i64>,
    pub show_dashboard: Option<bool>,
}

impl Default for Ui {
    fn default() -> Self {
        Self {
            page_size: Some(5),
            show_dashboard: Some(true),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Log {
    pub level: Option<String>,
    pub file: Option<String>,
}

impl Default for Log {
    fn default() -> Self {
        Self {
            level: Some(DEFAULT_LOG_LEVEL.to_owned()),
            file: None,
        }
    }
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os("ATRIUM_CONFIG_PATH") {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!("cannot resolve config directory; set ATRIUM_CONFIG_PATH to the config file")
        })?;
        Ok(config_root.join(APP_NAME).join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let value: toml::Value = toml::from_str(&raw)
            .with_context(|| format!("parse TOML config {}", path.display()))?;

        let version = value
            .get("version")
            .and_then(toml::Value::as_integer)
            .ok_or_else(|| {
                anyhow!(
                    "config file {} is not versioned. Add `version = 1` and put values under [api], [ui], and [log]",
                    path.display()
                )
            })?;

        if version != CONFIG_VERSION {
            bail!(
                "unsupported config version {} in {}; expected version = 1",
                version,
                path.display()
            );
        }

        let config: Config = value
            .try_into()
            .with_context(|| format!("decode config {}", path.display()))?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if let Some(base_url) = &self.api.base_url {
            validate_base_url(base_url)
                .with_context(|| format!("api.base_url in {}", path.display()))?;
        }

        if let Some(timeout) = &self.api.timeout {
            let parsed = parse_duration(timeout)?;
            if parsed.is_zero() {
                bail!(
                    "api.timeout in {} must be positive, got {}",
                    path.display(),
                    timeout
                );
            }
        }

        if let Some(page_size) = self.ui.page_size
            && page_size_from_config(page_size).is_none()
        {
            bail!(
                "ui.page_size in {} must be one of 5, 10, 20 or 0 (all rows), got {}",
                path.display(),
                page_size
            );
        }

        if let Some(level) = &self.log.level {
            EnvFilter::try_new(level).with_context(|| {
                format!("log.level in {} is not a valid filter: {level:?}", path.display())
            })?;
        }

        Ok(())
    }

    /// `ATRIUM_API_URL` wins over the file value.
    pub fn api_base_url(&self) -> String {
        let from_env = env::var("ATRIUM_API_URL")
            .ok()
            .filter(|value| !value.trim().is_empty());
        from_env
            .or_else(|| self.api.base_url.clone())
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_owned())
            .trim()
            .trim_end_matches('/')
            .to_owned()
    }

    pub fn api_timeout(&self) -> Result<Duration> {
        parse_duration(self.api.timeout.as_deref().unwrap_or(DEFAULT_API_TIMEOUT))
    }

    pub fn page_size(&self) -> PageSize {
        self.ui
            .page_size
            .and_then(page_size_from_config)
            .unwrap_or(DEFAULT_PAGE_SIZE)
    }

    pub fn show_dashboard(&self) -> bool {
        self.ui.show_dashboard.unwrap_or(true)
    }

    /// `ATRIUM_LOG` wins over `log.level`.
    pub fn log_filter(&self) -> String {
        env::var("ATRIUM_LOG")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .or_else(|| self.log.level.clone())
            .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_owned())
    }

    pub fn log_file(&self) -> Result<PathBuf> {
        if let Some(file) = &self.log.file {
            return Ok(PathBuf::from(file));
        }
        let cache_root = dirs::cache_dir().ok_or_else(|| {
            anyhow!("cannot resolve cache directory; set [log].file in the config")
        })?;
        Ok(cache_root.join(APP_NAME).join("atrium.log"))
    }

    pub fn example_config(path: &Path) -> String {
        format!(
            "# atrium config\n# Place this file at: {}\n\nversion = 1\n\n[api]\n# ATRIUM_API_URL overrides this value\nbase_url = \"{}\"\ntimeout = \"{}\"\n\n[ui]\n# One of 5, 10, 20, or 0 for all rows\npage_size = 5\nshow_dashboard = true\n\n[log]\n# Filter directive, for example \"info\" or \"atrium_api=debug\". ATRIUM_LOG overrides it\nlevel = \"{}\"\n# Optional. Default is the platform cache dir (for example ~/.cache/atrium/atrium.log)\n# file = \"/absolute/path/to/atrium.log\"\n",
            path.display(),
            DEFAULT_API_BASE_URL,
            DEFAULT_API_TIMEOUT,
            DEFAULT_LOG_LEVEL,
        )
    }
}

fn validate_base_url(raw: &str) -> Result<()> {
    let parsed = Url::parse(raw.trim()).with_context(|| format!("{raw:?} is not a valid URL"))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        bail!("{raw:?} must use http or https");
    }
    Ok(())
}

fn page_size_from_config(value: i64) -> Option<PageSize> {
    let size = if value == 0 {
        PageSize::All
    } else {
        PageSize::Rows(usize::try_from(value).ok()?)
    };
    AVAILABLE_PAGE_SIZES.contains(&size).then_some(size)
}

fn parse_duration(raw: &str) -> Result<Duration> {
    if let Some(value) = raw.strip_suffix("ms") {
        let millis: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_millis(millis));
    }
    if let Some(value) = raw.strip_suffix('s') {
        let secs: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_secs(secs));
    }
    if let Some(value) = raw.strip_suffix('m') {
        let mins: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_secs(mins * 60));
    }

    bail!("invalid duration {raw:?}; use one of: <N>ms, <N>s, <N>m (for example 500ms or 5s)")
}

#[cfg(test)]
mod tests {
    use super::{Config, parse_duration};
    use anyhow::Result;
    use atrium_app::PageSize;
    use std::path::PathBuf;
    use std::sync::{Mutex, OnceLock};
    use std::time::Duration;

    fn write_config(content: &str) -> Result<(tempfile::TempDir, PathBuf)> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("config.toml");
        std::fs::write(&path, content)?;
        Ok((temp, path))
    }

    fn env_lock() -> std::sync::MutexGuard<'static, ()> {
        static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        match ENV_LOCK.get_or_init(|| Mutex::new(())).lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    #[test]
    fn missing_config_uses_defaults() -> Result<()> {
        let _guard = env_lock();
        let temp = tempfile::tempdir()?;
        let config = Config::load(&temp.path().join("missing.toml"))?;
        assert_eq!(config.version, 1);
        assert!(config.show_dashboard());
        assert_eq!(config.page_size(), PageSize::Rows(5));
        assert_eq!(config.api_timeout()?, Duration::from_secs(5));
        Ok(())
    }

    #[test]
    fn unversioned_config_is_rejected_with_actionable_message() -> Result<()> {
        let (_temp, path) = write_config("[api]\nbase_url=\"http://localhost:3000\"\n")?;
        let error = Config::load(&path).expect_err("unversioned config should fail");
        let message = error.to_string();
        assert!(message.contains("version = 1"));
        assert!(message.contains("[api], [ui], and [log]"));
        Ok(())
    }

    #[test]
    fn full_config_parses() -> Result<()> {
        let _guard = env_lock();
        let (_temp, path) = write_config(
            "version = 1\n[api]\nbase_url = \"https://api.example.test/v1/\"\ntimeout = \"750ms\"\n[ui]\npage_size = 0\nshow_dashboard = false\n[log]\nlevel = \"atrium_api=debug\"\nfile = \"/var/log/atrium.log\"\n",
        )?;
        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::remove_var("ATRIUM_API_URL");
            std::env::remove_var("ATRIUM_LOG");
        }

        let config = Config::load(&path)?;
        assert_eq!(config.api_base_url(), "https://api.example.test/v1");
        assert_eq!(config.api_timeout()?, Duration::from_millis(750));
        assert_eq!(config.page_size(), PageSize::All);
        assert!(!config.show_dashboard());
        assert_eq!(config.log_filter(), "atrium_api=debug");
        assert_eq!(config.log_file()?, PathBuf::from("/var/log/atrium.log"));
        Ok(())
    }

    #[test]
    fn malformed_config_returns_parse_error() -> Result<()> {
        let (_temp, path) = write_config("{{not toml")?;
        let error = Config::load(&path).expect_err("malformed config should fail");
        assert!(error.to_string().contains("parse TOML config"));
        Ok(())
    }

    #[test]
    fn unsupported_config_version_is_rejected() -> Result<()> {
        let (_temp, path) = write_config("version = 2\n")?;
        let error = Config::load(&path).expect_err("v2 config should fail");
        assert!(error.to_string().contains("unsupported config version 2"));
        Ok(())
    }

    #[test]
    fn default_path_honors_env_override() -> Result<()> {
        let _guard = env_lock();
        let temp = tempfile::tempdir()?;
        let override_path = temp.path().join("custom-config.toml");
        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::set_var("ATRIUM_CONFIG_PATH", &override_path);
        }
        let resolved = Config::default_path()?;
        // SAFETY: test cleanup for process-local env mutation.
        unsafe {
            std::env::remove_var("ATRIUM_CONFIG_PATH");
        }
        assert_eq!(resolved, override_path);
        Ok(())
    }

    #[test]
    fn default_path_ends_in_app_config_toml() -> Result<()> {
        let _guard = env_lock();
        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::remove_var("ATRIUM_CONFIG_PATH");
        }
        let path = Config::default_path()?;
        assert!(path.ends_with("atrium/config.toml"), "got {}", path.display());
        Ok(())
    }

    #[test]
    fn api_url_env_override_wins_over_file() -> Result<()> {
        let _guard = env_lock();
        let (_temp, path) =
            write_config("version = 1\n[api]\nbase_url = \"http://from-config.test\"\n")?;
        let config = Config::load(&path)?;
        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::set_var("ATRIUM_API_URL", "http://from-env.test/");
        }
        let resolved = config.api_base_url();
        // SAFETY: test cleanup for process-local env mutation.
        unsafe {
            std::env::remove_var("ATRIUM_API_URL");
        }
        assert_eq!(resolved, "http://from-env.test");
        assert_eq!(config.api_base_url(), "http://from-config.test");
        Ok(())
    }

    #[test]
    fn log_env_override_wins_over_file() -> Result<()> {
        let _guard = env_lock();
        let (_temp, path) = write_config("version = 1\n[log]\nlevel = \"warn\"\n")?;
        let config = Config::load(&path)?;
        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::set_var("ATRIUM_LOG", "trace");
        }
        let resolved = config.log_filter();
        // SAFETY: test cleanup for process-local env mutation.
        unsafe {
            std::env::remove_var("ATRIUM_LOG");
        }
        assert_eq!(resolved, "trace");
        assert_eq!(config.log_filter(), "warn");
        Ok(())
    }

    #[test]
    fn log_file_defaults_to_cache_dir() -> Result<()> {
        let config = Config::default();
        let path = config.log_file()?;
        assert!(path.ends_with("atrium/atrium.log"), "got {}", path.display());
        Ok(())
    }

    #[test]
    fn base_url_must_be_http() -> Result<()> {
        let (_temp, path) = write_config("version = 1\n[api]\nbase_url = \"ftp://files.test\"\n")?;
        let error = Config::load(&path).expect_err("ftp base_url should fail");
        assert!(format!("{error:#}").contains("must use http or https"));

        let (_temp, path) = write_config("version = 1\n[api]\nbase_url = \"localhost\"\n")?;
        let error = Config::load(&path).expect_err("relative base_url should fail");
        assert!(format!("{error:#}").contains("not a valid URL"));
        Ok(())
    }

    #[test]
    fn page_size_must_be_an_offered_option() -> Result<()> {
        let (_temp, path) = write_config("version = 1\n[ui]\npage_size = 7\n")?;
        let error = Config::load(&path).expect_err("page size 7 should fail");
        assert!(error.to_string().contains("must be one of 5, 10, 20 or 0"));

        let (_temp, path) = write_config("version = 1\n[ui]\npage_size = 20\n")?;
        assert_eq!(Config::load(&path)?.page_size(), PageSize::Rows(20));
        Ok(())
    }

    #[test]
    fn invalid_log_level_is_rejected() -> Result<()> {
        let (_temp, path) = write_config("version = 1\n[log]\nlevel = \"atrium=loud\"\n")?;
        let error = Config::load(&path).expect_err("bad filter should fail");
        assert!(error.to_string().contains("log.level"));
        Ok(())
    }

    #[test]
    fn timeout_parses_ms_seconds_and_minutes() -> Result<()> {
        assert_eq!(parse_duration("500ms")?, Duration::from_millis(500));
        assert_eq!(parse_duration("5s")?, Duration::from_secs(5));
        assert_eq!(parse_duration("2m")?, Duration::from_secs(120));
        Ok(())
    }

    #[test]
    fn timeout_rejects_invalid_duration() {
        let error = parse_duration("oops").expect_err("invalid duration should fail");
        let message = error.to_string();
        assert!(
            message.contains("invalid duration") || message.contains("invalid timeout duration"),
            "unexpected message: {message}"
        );
    }

    #[test]
    fn timeout_rejects_zero_in_config() -> Result<()> {
        let (_temp, path) = write_config("version = 1\n[api]\ntimeout = \"0s\"\n")?;
        let error = Config::load(&path).expect_err("zero timeout should fail");
        assert!(error.to_string().contains("must be positive"));
        Ok(())
    }

    #[test]
    fn example_config_round_trips_through_load() -> Result<()> {
        let _guard = env_lock();
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("config.toml");
        let example = Config::example_config(&path);
        assert!(example.contains("version = 1"));
        assert!(example.contains("[api]"));
        assert!(example.contains("[ui]"));
        assert!(example.contains("[log]"));

        std::fs::write(&path, &example)?;
        let config = Config::load(&path)?;
        assert_eq!(config.page_size(), PageSize::Rows(5));
        Ok(())
    }
}
