use std::fmt;

use tracing::debug;

use crate::settings_store::{SettingsStore, SettingsStoreError};

pub const SETTING_KEY: &str = "key";
pub const SETTING_TOKEN: &str = "token";

/// Validated module configuration: the encryption passphrase, the relay API
/// token and the highlight keywords captured at load time.
#[derive(Clone, PartialEq, Eq)]
pub struct ModuleSettings {
    key: String,
    token: String,
    keywords: Vec<String>,
}

impl fmt::Debug for ModuleSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleSettings")
            .field("key", &"***")
            .field("token", &"***")
            .field("keywords", &self.keywords)
            .finish()
    }
}

impl ModuleSettings {
    pub fn new(key: impl Into<String>, token: impl Into<String>, keywords: Vec<String>) -> Self {
        Self {
            key: key.into(),
            token: token.into(),
            keywords,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingSetting {
    Key,
    Token,
}

impl MissingSetting {
    /// The instruction shown to the operator on the module channel.
    pub fn hint(&self) -> &'static str {
        match self {
            MissingSetting::Key => {
                "No key specified, please pass key=encrkey to the loadmod call"
            }
            MissingSetting::Token => {
                "No token specified, please pass token=apitoken to the loadmod call"
            }
        }
    }
}

impl fmt::Display for MissingSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissingSetting::Key => f.write_str(SETTING_KEY),
            MissingSetting::Token => f.write_str(SETTING_TOKEN),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required settings: {}", join_missing(.0))]
    Missing(Vec<MissingSetting>),
    #[error("malformed module argument #{0} (expected name=value)")]
    MalformedArgument(usize),
    #[error("settings store error: {0}")]
    Settings(#[from] SettingsStoreError),
    #[error("module load aborted")]
    Aborted,
}

fn join_missing(missing: &[MissingSetting]) -> String {
    missing
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Splits `name=value` tokens and keeps the recognized names. The value is
/// everything after the first `=`, so passphrases may contain `=`.
pub fn parse_load_args(args: &str) -> Result<Vec<(&str, &str)>, ConfigError> {
    let mut recognized = Vec::new();
    for (index, token) in args.split_whitespace().enumerate() {
        let (name, value) = token
            .split_once('=')
            .ok_or(ConfigError::MalformedArgument(index + 1))?;
        if matches!(name, SETTING_KEY | SETTING_TOKEN) {
            recognized.push((name, value));
        } else {
            debug!("ignoring unknown module argument {}", name);
        }
    }
    Ok(recognized)
}

/// Persists recognized arguments, then validates what the store holds. Values
/// saved by an earlier load count, so reloading without arguments works.
pub fn load_settings(
    args: &str,
    store: &mut dyn SettingsStore,
    user_nick: &str,
) -> Result<ModuleSettings, ConfigError> {
    for (name, value) in parse_load_args(args)? {
        store.set(name, value)?;
    }

    let key = store.get(SETTING_KEY)?.filter(|value| !value.is_empty());
    let token = store.get(SETTING_TOKEN)?.filter(|value| !value.is_empty());
    match (key, token) {
        (Some(key), Some(token)) => Ok(ModuleSettings::new(
            key,
            token,
            vec![user_nick.to_string()],
        )),
        (key, token) => {
            let mut missing = Vec::new();
            if key.is_none() {
                missing.push(MissingSetting::Key);
            }
            if token.is_none() {
                missing.push(MissingSetting::Token);
            }
            Err(ConfigError::Missing(missing))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings_store::MemorySettingsStore;

    #[test]
    fn parse_keeps_only_key_and_token() {
        let parsed = parse_load_args("key=K  color=red\ttoken=T").expect("parse");
        assert_eq!(parsed, vec![("key", "K"), ("token", "T")]);
    }

    #[test]
    fn parse_keeps_equals_inside_values() {
        let parsed = parse_load_args("key=a=b==").expect("parse");
        assert_eq!(parsed, vec![("key", "a=b==")]);
    }

    #[test]
    fn parse_rejects_tokens_without_equals() {
        let err = parse_load_args("key=K oops").expect_err("malformed");
        assert!(matches!(err, ConfigError::MalformedArgument(2)));
    }

    #[test]
    fn load_with_key_and_token_succeeds() {
        let mut store = MemorySettingsStore::new();
        let settings = load_settings("key=K token=T", &mut store, "bob").expect("load");
        assert_eq!(settings.key(), "K");
        assert_eq!(settings.token(), "T");
        assert_eq!(settings.keywords(), ["bob".to_string()]);
        assert_eq!(store.get(SETTING_KEY).expect("get"), Some("K".to_string()));
        assert_eq!(store.get(SETTING_TOKEN).expect("get"), Some("T".to_string()));
    }

    #[test]
    fn load_without_key_fails() {
        let mut store = MemorySettingsStore::new();
        let err = load_settings("token=abc", &mut store, "bob").expect_err("missing key");
        match err {
            ConfigError::Missing(missing) => assert_eq!(missing, vec![MissingSetting::Key]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn load_with_nothing_reports_both() {
        let mut store = MemorySettingsStore::new();
        let err = load_settings("", &mut store, "bob").expect_err("missing both");
        assert_eq!(err.to_string(), "missing required settings: key, token");
    }

    #[test]
    fn empty_values_count_as_missing() {
        let mut store = MemorySettingsStore::new();
        let err = load_settings("key= token=T", &mut store, "bob").expect_err("empty key");
        assert!(matches!(err, ConfigError::Missing(ref missing) if missing == &[MissingSetting::Key]));
    }

    #[test]
    fn persisted_values_satisfy_a_later_load() {
        let mut store = MemorySettingsStore::new();
        load_settings("key=K token=T", &mut store, "bob").expect("first load");
        let settings = load_settings("", &mut store, "bob").expect("reload");
        assert_eq!(settings.token(), "T");
    }

    #[test]
    fn debug_hides_secrets() {
        let settings = ModuleSettings::new("passphrase", "api-token", vec!["bob".to_string()]);
        let rendered = format!("{:?}", settings);
        assert!(!rendered.contains("passphrase"));
        assert!(!rendered.contains("api-token"));
    }
}
