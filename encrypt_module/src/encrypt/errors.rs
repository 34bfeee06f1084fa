use std::fmt;
use std::io;
use std::path::PathBuf;

#[derive(Debug)]
pub enum EncryptError {
    Io(io::Error),
    OpensslNotFound {
        binary: PathBuf,
    },
    OpensslFailed {
        status: Option<i32>,
        output: String,
    },
    CommandTimeout {
        command: &'static str,
        timeout_secs: u64,
        output: String,
    },
    InvalidOutput {
        reason: &'static str,
    },
}

impl fmt::Display for EncryptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncryptError::Io(err) => write!(f, "I/O error: {}", err),
            EncryptError::OpensslNotFound { binary } => {
                write!(f, "openssl binary not found: {}", binary.display())
            }
            EncryptError::OpensslFailed { status, output } => write!(
                f,
                "openssl failed (status: {:?}). Output tail:\n{}",
                status, output
            ),
            EncryptError::CommandTimeout {
                command,
                timeout_secs,
                output,
            } => write!(
                f,
                "{} timed out after {}s. Output tail:\n{}",
                command, timeout_secs, output
            ),
            EncryptError::InvalidOutput { reason } => {
                write!(f, "unexpected openssl output: {}", reason)
            }
        }
    }
}

impl std::error::Error for EncryptError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EncryptError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for EncryptError {
    fn from(err: io::Error) -> Self {
        EncryptError::Io(err)
    }
}
