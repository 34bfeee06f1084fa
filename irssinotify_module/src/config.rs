use std::env;
use std::path::PathBuf;
use std::time::Duration;

use encrypt_module::EncryptOptions;

use crate::event_loop::DEFAULT_POLL_INTERVAL;
use crate::pipeline::PipelineOptions;
use crate::scheduler::DEBOUNCE_INTERVAL;

pub const DEFAULT_SETTINGS_PATH: &str = "irssinotify_settings.db";
/// Upper bound for `IRSSINOTIFY_DEBOUNCE_SECS`; larger values are clamped.
pub const MAX_DEBOUNCE_SECS: u64 = 24 * 60 * 60;

#[derive(Debug, thiserror::Error)]
pub enum RelayConfigError {
    #[error("{0} must be set")]
    MissingVar(&'static str),
}

/// Environment of the standalone relay binary.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Module argument string, e.g. `key=... token=...`.
    pub load_args: String,
    pub settings_path: PathBuf,
    pub nick: String,
    pub start_away: bool,
    pub debounce_interval: Duration,
    pub retry_limit: u32,
    pub poll_interval: Duration,
    pub encrypt: EncryptOptions,
}

impl RelayConfig {
    pub fn from_env() -> Result<Self, RelayConfigError> {
        dotenvy::dotenv().ok();

        let load_args = env::var("IRSSINOTIFY_ARGS").unwrap_or_default();
        let settings_path = env::var("IRSSINOTIFY_SETTINGS_PATH")
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS_PATH));
        let nick = env::var("IRSSINOTIFY_NICK")
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .ok_or(RelayConfigError::MissingVar("IRSSINOTIFY_NICK"))?;
        let start_away = env::var("IRSSINOTIFY_START_AWAY")
            .ok()
            .map(|value| parse_flag(&value))
            .unwrap_or(false);
        let debounce_interval = env::var("IRSSINOTIFY_DEBOUNCE_SECS")
            .ok()
            .and_then(|value| value.trim().parse::<u64>().ok())
            .filter(|value| *value > 0)
            .map(|value| Duration::from_secs(value.min(MAX_DEBOUNCE_SECS)))
            .unwrap_or(DEBOUNCE_INTERVAL);
        let retry_limit = env::var("IRSSINOTIFY_RETRY_LIMIT")
            .ok()
            .and_then(|value| value.trim().parse::<u32>().ok())
            .unwrap_or(0);
        let poll_interval = env::var("IRSSINOTIFY_POLL_INTERVAL_MS")
            .ok()
            .and_then(|value| value.trim().parse::<u64>().ok())
            .filter(|value| *value > 0)
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_POLL_INTERVAL);

        Ok(Self {
            load_args,
            settings_path,
            nick,
            start_away,
            debounce_interval,
            retry_limit,
            poll_interval,
            encrypt: EncryptOptions::from_env(),
        })
    }

    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            debounce_interval: self.debounce_interval,
            retry_limit: self.retry_limit,
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    struct EnvGuard {
        saved: Vec<(&'static str, Option<String>)>,
    }

    impl EnvGuard {
        fn set(vars: &[(&'static str, Option<&str>)]) -> Self {
            let saved = vars
                .iter()
                .map(|(name, _)| (*name, env::var(name).ok()))
                .collect();
            for (name, value) in vars {
                match value {
                    Some(value) => env::set_var(name, value),
                    None => env::remove_var(name),
                }
            }
            Self { saved }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for (name, value) in &self.saved {
                match value {
                    Some(value) => env::set_var(name, value),
                    None => env::remove_var(name),
                }
            }
        }
    }

    const ALL_VARS: [&str; 7] = [
        "IRSSINOTIFY_ARGS",
        "IRSSINOTIFY_SETTINGS_PATH",
        "IRSSINOTIFY_NICK",
        "IRSSINOTIFY_START_AWAY",
        "IRSSINOTIFY_DEBOUNCE_SECS",
        "IRSSINOTIFY_RETRY_LIMIT",
        "IRSSINOTIFY_POLL_INTERVAL_MS",
    ];

    fn cleared_except(vars: &[(&'static str, Option<&'static str>)]) -> EnvGuard {
        let mut all: Vec<(&'static str, Option<&str>)> =
            ALL_VARS.iter().map(|name| (*name, None)).collect();
        for (name, value) in vars {
            if let Some(slot) = all.iter_mut().find(|(existing, _)| existing == name) {
                slot.1 = *value;
            }
        }
        EnvGuard::set(&all)
    }

    #[test]
    #[serial]
    fn defaults_apply_when_only_nick_is_set() {
        let _guard = cleared_except(&[("IRSSINOTIFY_NICK", Some(" bob "))]);

        let config = RelayConfig::from_env().expect("config");

        assert_eq!(config.nick, "bob");
        assert_eq!(config.load_args, "");
        assert_eq!(config.settings_path, PathBuf::from(DEFAULT_SETTINGS_PATH));
        assert!(!config.start_away);
        assert_eq!(config.debounce_interval, DEBOUNCE_INTERVAL);
        assert_eq!(config.retry_limit, 0);
        assert_eq!(config.poll_interval, DEFAULT_POLL_INTERVAL);
    }

    #[test]
    #[serial]
    fn overrides_are_parsed() {
        let _guard = cleared_except(&[
            ("IRSSINOTIFY_NICK", Some("bob")),
            ("IRSSINOTIFY_ARGS", Some("key=K token=T")),
            ("IRSSINOTIFY_SETTINGS_PATH", Some("/tmp/irssi.db")),
            ("IRSSINOTIFY_START_AWAY", Some("TRUE")),
            ("IRSSINOTIFY_DEBOUNCE_SECS", Some("5")),
            ("IRSSINOTIFY_RETRY_LIMIT", Some("3")),
            ("IRSSINOTIFY_POLL_INTERVAL_MS", Some("garbage")),
        ]);

        let config = RelayConfig::from_env().expect("config");

        assert_eq!(config.load_args, "key=K token=T");
        assert_eq!(config.settings_path, PathBuf::from("/tmp/irssi.db"));
        assert!(config.start_away);
        let options = config.pipeline_options();
        assert_eq!(options.debounce_interval, Duration::from_secs(5));
        assert_eq!(options.retry_limit, 3);
        assert_eq!(config.poll_interval, DEFAULT_POLL_INTERVAL);
    }

    #[test]
    #[serial]
    fn huge_debounce_is_clamped() {
        let _guard = cleared_except(&[
            ("IRSSINOTIFY_NICK", Some("bob")),
            ("IRSSINOTIFY_DEBOUNCE_SECS", Some("10000000000000")),
        ]);

        let config = RelayConfig::from_env().expect("config");

        assert_eq!(
            config.debounce_interval,
            Duration::from_secs(MAX_DEBOUNCE_SECS)
        );
    }

    #[test]
    #[serial]
    fn missing_nick_is_an_error() {
        let _guard = cleared_except(&[("IRSSINOTIFY_NICK", Some("   "))]);
        let err = RelayConfig::from_env().expect_err("no nick");
        assert_eq!(err.to_string(), "IRSSINOTIFY_NICK must be set");
    }
}
