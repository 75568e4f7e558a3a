use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::Error;
use crate::types::FieldBoosts;

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
        Self::load_for_env(&env_name)
    }

    pub fn load_for_env(env_name: &str) -> anyhow::Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file("config.toml"));
        match env_name {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.validate()?;
        Ok(config)
    }

    /// Wrap an already-assembled figment, e.g. one built from strings in tests.
    pub fn from_figment(figment: Figment) -> anyhow::Result<Self> {
        let config = Self { figment: Figment::from(Serialized::defaults(Settings::default())).merge(figment) };
        config.validate()?;
        Ok(config)
    }

    pub fn settings(&self) -> anyhow::Result<Settings> {
        self.figment
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to read settings: {}", e))
    }

    fn validate(&self) -> anyhow::Result<()> {
        let settings = self.settings()?;
        settings.search.validate()?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub search: SearchSettings,
    pub lifecycle: LifecycleSettings,
}

/// Query-engine knobs. Defaults reproduce the blog's original search behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    pub default_limit: usize,
    pub max_limit: usize,
    pub max_query_tokens: usize,
    pub min_token_len: usize,
    /// Allowed edits as a fraction of the query token length.
    pub fuzzy_fraction: f32,
    pub fuzzy_max_edits: usize,
    pub prefix: bool,
    pub boosts: FieldBoosts,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            default_limit: 10,
            max_limit: 100,
            max_query_tokens: 32,
            min_token_len: 2,
            fuzzy_fraction: 0.2,
            fuzzy_max_edits: 6,
            prefix: true,
            boosts: FieldBoosts::default(),
        }
    }
}

impl SearchSettings {
    pub fn validate(&self) -> crate::Result<()> {
        if self.default_limit == 0 {
            return Err(Error::InvalidConfig("search.default_limit must be positive".into()));
        }
        if self.max_limit < self.default_limit {
            return Err(Error::InvalidConfig("search.max_limit must be >= search.default_limit".into()));
        }
        if self.max_query_tokens == 0 {
            return Err(Error::InvalidConfig("search.max_query_tokens must be positive".into()));
        }
        if !(0.0..=1.0).contains(&self.fuzzy_fraction) {
            return Err(Error::InvalidConfig(format!(
                "search.fuzzy_fraction must be within [0, 1], got {}",
                self.fuzzy_fraction
            )));
        }
        let b = self.boosts;
        if [b.title, b.tags, b.excerpt, b.body].iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(Error::InvalidConfig("search.boosts must be finite and non-negative".into()));
        }
        Ok(())
    }

    /// Forgiving limit parsing for user input: missing, non-numeric or negative
    /// values become `default_limit`; everything is clamped to `max_limit`.
    /// An explicit `0` stays `0` and yields no results.
    pub fn parse_limit(&self, raw: Option<&str>) -> usize {
        let parsed = raw.map(str::trim).and_then(|s| s.parse::<i64>().ok());
        match parsed {
            Some(n) if n >= 0 => usize::try_from(n).unwrap_or(self.max_limit).min(self.max_limit),
            _ => self.default_limit,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleSettings {
    pub content_dir: Option<String>,
    pub artifact_path: Option<String>,
    pub load_timeout_ms: u64,
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        Self { content_dir: None, artifact_path: None, load_timeout_ms: 5_000 }
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_limit_is_forgiving() {
        let s = SearchSettings::default();
        assert_eq!(s.parse_limit(None), 10);
        assert_eq!(s.parse_limit(Some("abc")), 10);
        assert_eq!(s.parse_limit(Some("-3")), 10);
        assert_eq!(s.parse_limit(Some(" 4 ")), 4);
        assert_eq!(s.parse_limit(Some("0")), 0);
        assert_eq!(s.parse_limit(Some("5000")), 100);
    }

    #[test]
    fn toml_overrides_defaults() {
        let figment = Figment::new().merge(Toml::string(
            "[search]\ndefault_limit = 5\n[search.boosts]\ntitle = 4.0\n[lifecycle]\nload_timeout_ms = 250\n",
        ));
        let settings = Config::from_figment(figment).expect("config").settings().expect("settings");
        assert_eq!(settings.search.default_limit, 5);
        assert_eq!(settings.search.boosts.title, 4.0);
        assert_eq!(settings.search.boosts.tags, 2.0);
        assert_eq!(settings.search.max_query_tokens, 32);
        assert_eq!(settings.lifecycle.load_timeout_ms, 250);
    }

    #[test]
    fn rejects_out_of_range_fuzzy_fraction() {
        let figment = Figment::new().merge(Toml::string("[search]\nfuzzy_fraction = 1.5\n"));
        assert!(Config::from_figment(figment).is_err());
    }
}
