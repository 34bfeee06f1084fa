use std::env;
use std::fmt;
use std::io;
use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use tracing::debug;

use super::constants::{
    DEFAULT_ENCRYPT_TIMEOUT_SECS, DEFAULT_OPENSSL_BIN, OPENSSL_CIPHER, OUTPUT_TAIL_LEN,
    PLAINTEXT_SUFFIX, SALTED_MAGIC, SALT_LEN,
};
use super::errors::EncryptError;
use super::utils::{run_command_with_input, tail_string};

/// How the `openssl` subprocess is located and bounded.
#[derive(Debug, Clone)]
pub struct EncryptOptions {
    pub binary: PathBuf,
    pub timeout: Duration,
}

impl Default for EncryptOptions {
    fn default() -> Self {
        Self {
            binary: PathBuf::from(DEFAULT_OPENSSL_BIN),
            timeout: Duration::from_secs(DEFAULT_ENCRYPT_TIMEOUT_SECS),
        }
    }
}

impl EncryptOptions {
    /// Reads `IRSSINOTIFY_OPENSSL_BIN` and `IRSSINOTIFY_ENCRYPT_TIMEOUT_SECS`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let binary = env::var("IRSSINOTIFY_OPENSSL_BIN")
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.binary);
        let timeout = env::var("IRSSINOTIFY_ENCRYPT_TIMEOUT_SECS")
            .ok()
            .and_then(|value| value.trim().parse::<u64>().ok())
            .filter(|value| *value > 0)
            .map(Duration::from_secs)
            .unwrap_or(defaults.timeout);
        Self { binary, timeout }
    }
}

/// Encrypts conversation fields the way IrssiNotifier clients expect them:
/// AES-128-CBC with a salted passphrase key, base64 without line breaks, then
/// made safe for a query string.
#[derive(Clone)]
pub struct Encryptor {
    passphrase: String,
    options: EncryptOptions,
}

impl fmt::Debug for Encryptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Encryptor")
            .field("passphrase", &"***")
            .field("options", &self.options)
            .finish()
    }
}

impl Encryptor {
    pub fn new(passphrase: impl Into<String>, options: EncryptOptions) -> Self {
        Self {
            passphrase: passphrase.into(),
            options,
        }
    }

    pub fn options(&self) -> &EncryptOptions {
        &self.options
    }

    pub fn encrypt(&self, text: &str) -> Result<String, EncryptError> {
        let mut cmd = Command::new(&self.options.binary);
        cmd.args(["enc", OPENSSL_CIPHER, "-salt", "-base64", "-A", "-pass"])
            .arg(format!("pass:{}", self.passphrase));

        let mut plaintext = String::with_capacity(text.len() + PLAINTEXT_SUFFIX.len());
        plaintext.push_str(text);
        plaintext.push_str(PLAINTEXT_SUFFIX);

        let output = match run_command_with_input(
            cmd,
            plaintext.as_bytes(),
            self.options.timeout,
            "openssl",
        ) {
            Ok(output) => output,
            Err(EncryptError::Io(err)) if err.kind() == io::ErrorKind::NotFound => {
                return Err(EncryptError::OpensslNotFound {
                    binary: self.options.binary.clone(),
                })
            }
            Err(err) => return Err(err),
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(EncryptError::OpensslFailed {
                status: output.status.code(),
                output: tail_string(&stderr, OUTPUT_TAIL_LEN),
            });
        }

        let encoded = String::from_utf8_lossy(&output.stdout).trim().to_string();
        validate_salted_output(&encoded)?;
        debug!(
            "encrypted {} plaintext bytes into {} encoded bytes",
            plaintext.len(),
            encoded.len()
        );
        Ok(url_safe(&encoded))
    }
}

/// Turns standard base64 into the relay's transport alphabet: `/` becomes `_`,
/// `+` becomes `-` and `=` padding is dropped.
pub fn url_safe(encoded: &str) -> String {
    encoded
        .chars()
        .filter(|ch| *ch != '=')
        .map(|ch| match ch {
            '/' => '_',
            '+' => '-',
            other => other,
        })
        .collect()
}

fn validate_salted_output(encoded: &str) -> Result<(), EncryptError> {
    if encoded.is_empty() {
        return Err(EncryptError::InvalidOutput {
            reason: "empty ciphertext",
        });
    }
    let raw = STANDARD
        .decode(encoded)
        .map_err(|_| EncryptError::InvalidOutput {
            reason: "ciphertext is not base64",
        })?;
    if !raw.starts_with(SALTED_MAGIC) || raw.len() <= SALTED_MAGIC.len() + SALT_LEN {
        return Err(EncryptError::InvalidOutput {
            reason: "ciphertext is missing the salt header",
        });
    }
    Ok(())
}
