use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use url::Url;

use crate::{
    fetcher::{ListEndpoint, DEFAULT_COLLECTION_KEY, DEFAULT_LIST_PATH},
    query::{Query, DEFAULT_PAGE_SIZE, DEFAULT_SORT_KEY},
    render::ActivityPolicy,
};

pub const DEFAULT_CONFIG_FILE: &str = "ticketnest.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    pub server_url: String,
    pub page_size: u32,
    pub sort_key: String,
    pub search_debounce_ms: u64,
    pub request_timeout_secs: u64,
    pub inactive_after_days: u32,
    pub list_path: String,
    pub collection_key: String,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:5000".into(),
            page_size: DEFAULT_PAGE_SIZE,
            sort_key: DEFAULT_SORT_KEY.into(),
            search_debounce_ms: 300,
            request_timeout_secs: 10,
            inactive_after_days: 30,
            list_path: DEFAULT_LIST_PATH.into(),
            collection_key: DEFAULT_COLLECTION_KEY.into(),
        }
    }
}

impl ClientSettings {
    pub fn initial_query(&self) -> Query {
        Query::new(self.page_size, self.sort_key.clone())
    }

    pub fn list_endpoint(&self) -> ListEndpoint {
        ListEndpoint::new(self.list_path.clone(), self.collection_key.clone())
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn activity_policy(&self) -> ActivityPolicy {
        ActivityPolicy::from_days(self.inactive_after_days)
    }

    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.server_url)
            .with_context(|| format!("invalid server_url '{}'", self.server_url))?;
        if !matches!(url.scheme(), "http" | "https") {
            bail!("server_url must use http or https, got '{}'", url.scheme());
        }
        if self.page_size == 0 {
            bail!("page_size must be greater than zero");
        }
        if !self.list_path.starts_with('/') {
            bail!("list_path must start with '/', got '{}'", self.list_path);
        }
        if self.collection_key.trim().is_empty() {
            bail!("collection_key must not be empty");
        }
        Ok(())
    }
}

/// Defaults, then the TOML file, then environment overrides.
///
/// An explicit `path` must exist; otherwise `ticketnest.toml` in the working
/// directory is used when present.
pub fn load_settings(path: Option<&Path>) -> Result<ClientSettings> {
    let mut settings = match resolve_config_path(path) {
        Some(path) => {
            let raw = fs::read_to_string(&path)
                .with_context(|| format!("failed to read config file {}", path.display()))?;
            parse_settings(&raw)
                .with_context(|| format!("failed to parse config file {}", path.display()))?
        }
        None => ClientSettings::default(),
    };

    apply_env_overrides(&mut settings, |key| std::env::var(key).ok());
    settings.validate()?;
    Ok(settings)
}

fn resolve_config_path(path: Option<&Path>) -> Option<PathBuf> {
    match path {
        Some(path) => Some(path.to_path_buf()),
        None => {
            let default = PathBuf::from(DEFAULT_CONFIG_FILE);
            default.exists().then_some(default)
        }
    }
}

pub fn parse_settings(raw: &str) -> Result<ClientSettings> {
    Ok(toml::from_str(raw)?)
}

pub fn apply_env_overrides(settings: &mut ClientSettings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("TICKETNEST_SERVER_URL") {
        settings.server_url = v;
    }
    if let Some(v) = lookup("APP__SERVER_URL") {
        settings.server_url = v;
    }
    if let Some(v) = lookup("APP__PAGE_SIZE").and_then(|v| v.parse().ok()) {
        settings.page_size = v;
    }
    if let Some(v) = lookup("APP__SORT_KEY") {
        settings.sort_key = v;
    }
    if let Some(v) = lookup("APP__SEARCH_DEBOUNCE_MS").and_then(|v| v.parse().ok()) {
        settings.search_debounce_ms = v;
    }
    if let Some(v) = lookup("APP__REQUEST_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
        settings.request_timeout_secs = v;
    }
    if let Some(v) = lookup("APP__INACTIVE_AFTER_DAYS").and_then(|v| v.parse().ok()) {
        settings.inactive_after_days = v;
    }
    if let Some(v) = lookup("APP__LIST_PATH") {
        settings.list_path = v;
    }
    if let Some(v) = lookup("APP__COLLECTION_KEY") {
        settings.collection_key = v;
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashMap,
        env,
        time::{SystemTime, UNIX_EPOCH},
    };

    use super::*;

    #[test]
    fn defaults_are_valid() {
        let settings = ClientSettings::default();
        settings.validate().expect("valid defaults");
        assert_eq!(settings.search_debounce(), Duration::from_millis(300));
        assert_eq!(settings.initial_query().page_size, 10);
    }

    #[test]
    fn toml_overrides_only_listed_fields() {
        let settings = parse_settings(
            r#"
            server_url = "https://api.ticketnest.example"
            page_size = 25
            "#,
        )
        .expect("parse");
        assert_eq!(settings.server_url, "https://api.ticketnest.example");
        assert_eq!(settings.page_size, 25);
        assert_eq!(settings.list_path, DEFAULT_LIST_PATH);
    }

    #[test]
    fn env_overrides_win_and_bad_numbers_are_ignored() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("TICKETNEST_SERVER_URL", "http://legacy:1"),
            ("APP__SERVER_URL", "http://preferred:2"),
            ("APP__PAGE_SIZE", "not-a-number"),
            ("APP__SEARCH_DEBOUNCE_MS", "500"),
        ]);
        let mut settings = ClientSettings::default();
        apply_env_overrides(&mut settings, |key| env.get(key).map(|v| v.to_string()));

        assert_eq!(settings.server_url, "http://preferred:2");
        assert_eq!(settings.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(settings.search_debounce_ms, 500);
    }

    #[test]
    fn rejects_non_http_server_url() {
        let settings = ClientSettings {
            server_url: "ftp://files.example".into(),
            ..ClientSettings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn rejects_zero_page_size() {
        let settings = ClientSettings {
            page_size: 0,
            ..ClientSettings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn explicit_missing_config_file_is_an_error() {
        let suffix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos();
        let path = env::temp_dir().join(format!("ticketnest_missing_{suffix}.toml"));
        let err = load_settings(Some(&path)).expect_err("missing file");
        assert!(err.to_string().contains("failed to read config file"));
    }

    #[test]
    fn loads_explicit_config_file() {
        let suffix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos();
        let path = env::temp_dir().join(format!("ticketnest_config_{suffix}.toml"));
        fs::write(&path, "inactive_after_days = 7\ncollection_key = \"users\"\n").expect("write");

        let settings = load_settings(Some(&path)).expect("load");
        assert_eq!(settings.inactive_after_days, 7);

        fs::remove_file(path).expect("cleanup");
    }
}
