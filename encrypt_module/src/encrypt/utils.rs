use std::io::{Read, Write};
use std::process::{Command, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

use super::constants::OUTPUT_TAIL_LEN;
use super::errors::EncryptError;

const CHILD_POLL_INTERVAL: Duration = Duration::from_millis(10);

pub(super) fn tail_string(input: &str, max_len: usize) -> String {
    let trimmed = input.trim();
    if trimmed.len() <= max_len {
        return trimmed.to_string();
    }
    let mut start = trimmed.len().saturating_sub(max_len);
    while start < trimmed.len() && !trimmed.is_char_boundary(start) {
        start += 1;
    }
    trimmed[start..].to_string()
}

/// Runs `cmd` with `input` on stdin, killing it once `timeout` elapses.
///
/// stdin, stdout and stderr are serviced on their own threads so a child that
/// produces or consumes more than a pipe buffer cannot stall the poll loop.
pub(super) fn run_command_with_input(
    mut cmd: Command,
    input: &[u8],
    timeout: Duration,
    label: &'static str,
) -> Result<Output, EncryptError> {
    cmd.stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    let mut child = cmd.spawn()?;

    let stdin = child.stdin.take();
    let input = input.to_vec();
    let writer = thread::spawn(move || {
        if let Some(mut stdin) = stdin {
            // The child may exit without draining stdin; the exit status tells the story.
            if let Err(err) = stdin.write_all(&input) {
                debug!("{} stdin closed early: {}", label, err);
            }
        }
    });
    let stdout_reader = spawn_reader(child.stdout.take());
    let stderr_reader = spawn_reader(child.stderr.take());

    let start = Instant::now();
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }

        if start.elapsed() >= timeout {
            let _ = child.kill();
            let _ = child.wait();
            let _ = writer.join();
            let mut combined = String::new();
            combined.push_str(&String::from_utf8_lossy(&join_reader(stdout_reader)));
            combined.push_str(&String::from_utf8_lossy(&join_reader(stderr_reader)));
            return Err(EncryptError::CommandTimeout {
                command: label,
                timeout_secs: timeout.as_secs(),
                output: tail_string(&combined, OUTPUT_TAIL_LEN),
            });
        }

        thread::sleep(CHILD_POLL_INTERVAL);
    };

    let _ = writer.join();
    Ok(Output {
        status,
        stdout: join_reader(stdout_reader),
        stderr: join_reader(stderr_reader),
    })
}

fn spawn_reader<R>(source: Option<R>) -> thread::JoinHandle<Vec<u8>>
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let mut buffer = Vec::new();
        if let Some(mut source) = source {
            let _ = source.read_to_end(&mut buffer);
        }
        buffer
    })
}

fn join_reader(handle: thread::JoinHandle<Vec<u8>>) -> Vec<u8> {
    handle.join().unwrap_or_default()
}
