//! Bounded, read-only invocations of external programs.

use crate::error::{KomorebiError, Result};
use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread::JoinHandle;
use std::time::Duration;
use wait_timeout::ChildExt;

/// Run `program args...` and return its stdout.
///
/// Fails with [`KomorebiError::ExternalProcess`] when the program is not on
/// `PATH`, exits non-zero, or is still running after `timeout` (in which case
/// it is killed).
pub fn run_bounded(
    program: &str,
    args: &[String],
    cwd: Option<&Path>,
    timeout: Duration,
) -> Result<String> {
    let binary = which::which(program)
        .map_err(|_| KomorebiError::ExternalProcess(format!("{program} not found on PATH")))?;

    let mut command = Command::new(binary);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(dir) = cwd {
        command.current_dir(dir);
    }

    let mut child = command
        .spawn()
        .map_err(|e| KomorebiError::ExternalProcess(format!("failed to spawn {program}: {e}")))?;

    // Drain both pipes while waiting so a chatty child cannot block on a full pipe.
    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let status = match child.wait_timeout(timeout)? {
        Some(status) => status,
        None => {
            let _ = child.kill();
            let _ = child.wait();
            tracing::warn!(program, ?args, ?timeout, "external command timed out");
            return Err(KomorebiError::ExternalProcess(format!(
                "{program} timed out after {}s",
                timeout.as_secs_f32()
            )));
        }
    };

    let out = join(stdout);
    if !status.success() {
        let err = join(stderr);
        return Err(KomorebiError::ExternalProcess(format!(
            "{program} exited with {status}: {}",
            err.trim()
        )));
    }
    Ok(out)
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<String>> {
    pipe.map(|mut p| {
        std::thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = p.read_to_end(&mut buf);
            String::from_utf8_lossy(&buf).into_owned()
        })
    })
}

fn join(handle: Option<JoinHandle<String>>) -> String {
    handle.and_then(|h| h.join().ok()).unwrap_or_default()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> Vec<String> {
        vec!["-c".to_string(), script.to_string()]
    }

    #[test]
    fn captures_stdout() {
        let out = run_bounded("sh", &sh("echo hello"), None, Duration::from_secs(5)).unwrap();
        assert_eq!(out.trim(), "hello");
    }

    #[test]
    fn non_zero_exit_is_an_error() {
        let err = run_bounded("sh", &sh("echo boom >&2; exit 3"), None, Duration::from_secs(5))
            .unwrap_err();
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn timeout_kills_the_child() {
        let started = std::time::Instant::now();
        let err = run_bounded("sh", &sh("sleep 5"), None, Duration::from_millis(200)).unwrap_err();
        assert!(err.to_string().contains("timed out"));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn missing_program() {
        let err = run_bounded("komorebi-no-such-binary", &[], None, Duration::from_secs(1))
            .unwrap_err();
        assert!(matches!(err, KomorebiError::ExternalProcess(_)));
    }
}
