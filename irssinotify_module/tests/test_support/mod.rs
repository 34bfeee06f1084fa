use std::process::Command;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use irssinotify_module::BouncerContext;

pub fn start_mockito_server(test_name: &str) -> Option<mockito::ServerGuard> {
    let server = std::panic::catch_unwind(|| mockito::Server::new());
    match server {
        Ok(server) => Some(server),
        Err(_) => {
            eprintln!(
                "Skipping {test_name}; unable to start mockito server in this environment."
            );
            None
        }
    }
}

pub fn require_openssl(test_name: &str) -> bool {
    let available = Command::new("openssl")
        .arg("version")
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false);
    if !available {
        eprintln!("Skipping {test_name}; openssl binary not available.");
    }
    available
}

/// Session double that records every module channel line.
pub struct RecordingContext {
    away: AtomicBool,
    nick: String,
    lines: Mutex<Vec<String>>,
}

impl RecordingContext {
    pub fn away(nick: &str) -> Self {
        Self {
            away: AtomicBool::new(true),
            nick: nick.to_string(),
            lines: Mutex::new(Vec::new()),
        }
    }

    pub fn set_away(&self, away: bool) {
        self.away.store(away, Ordering::SeqCst);
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().expect("lines lock").clone()
    }
}

impl BouncerContext for RecordingContext {
    fn is_away(&self) -> bool {
        self.away.load(Ordering::SeqCst)
    }

    fn current_nick(&self) -> String {
        self.nick.clone()
    }

    fn user_nick(&self) -> String {
        self.nick.clone()
    }

    fn put_module(&self, line: &str) {
        self.lines.lock().expect("lines lock").push(line.to_string());
    }
}
