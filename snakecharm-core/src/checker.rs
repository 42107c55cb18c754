//! checker.rs - Optional verification of candidate payloads.
//!
//! A [`Checker`] answers whether a candidate would get through the real
//! target. The search asks the [`CheckerGate`], which runs the checker on a
//! worker thread and gives up after a timeout. A rejection or timeout is
//! recorded against the candidate and the search moves on to the next one.
//!
//! License: MIT OR Apache-2.0

use log::{debug, warn};
use std::io::{ErrorKind, Read, Write};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::errors::CheckerError;
use crate::eval::{evaluate_snippet, py_eq};
use crate::rules::RuleSet;

/// Verifies one candidate. An empty list accepts it; otherwise the entries
/// say why it was refused.
pub trait Checker: Send + Sync {
    fn check(&self, candidate: &str) -> Result<Vec<String>, CheckerError>;
}

/// How a gated check ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Accepted,
    Rejected(Vec<String>),
    TimedOut,
    Failed(String),
}

/// Runs a [`Checker`] with a deadline.
#[derive(Clone)]
pub struct CheckerGate {
    checker: Arc<dyn Checker>,
    timeout: Duration,
}

impl std::fmt::Debug for CheckerGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckerGate").field("timeout", &self.timeout).finish_non_exhaustive()
    }
}

impl CheckerGate {
    pub fn new(checker: Arc<dyn Checker>, timeout: Duration) -> Self {
        Self { checker, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn verify(&self, candidate: &str) -> Verdict {
        let (tx, rx) = mpsc::channel();
        let checker = Arc::clone(&self.checker);
        let owned = candidate.to_string();
        // The worker is detached; a checker that never returns only leaks its thread.
        thread::spawn(move || {
            let _ = tx.send(checker.check(&owned));
        });
        match rx.recv_timeout(self.timeout) {
            Ok(Ok(reasons)) if reasons.is_empty() => Verdict::Accepted,
            Ok(Ok(reasons)) => Verdict::Rejected(reasons),
            Ok(Err(CheckerError::Timeout(_))) | Err(mpsc::RecvTimeoutError::Timeout) => {
                warn!(target: "snakecharm_core::checker", "Checker timed out after {:?}.", self.timeout);
                Verdict::TimedOut
            }
            Ok(Err(e)) => Verdict::Failed(e.to_string()),
            Err(mpsc::RecvTimeoutError::Disconnected) => Verdict::Failed("checker thread panicked".into()),
        }
    }
}

/// Refuses candidates that break a second rule set, such as the real
/// target's stricter filter.
#[derive(Debug, Clone)]
pub struct RuleChecker {
    rules: Arc<RuleSet>,
}

impl RuleChecker {
    pub fn new(rules: RuleSet) -> Self {
        Self { rules: Arc::new(rules) }
    }
}

impl Checker for RuleChecker {
    fn check(&self, candidate: &str) -> Result<Vec<String>, CheckerError> {
        Ok(self.rules.violations(candidate).iter().map(|v| v.to_string()).collect())
    }
}

/// Refuses candidates whose value differs from the original snippet's.
///
/// Snippets the evaluator cannot model are refused with the reason.
#[derive(Debug, Clone)]
pub struct EvalChecker {
    original: String,
}

impl EvalChecker {
    pub fn new(original: impl Into<String>) -> Self {
        Self {
            original: original.into(),
        }
    }
}

impl Checker for EvalChecker {
    fn check(&self, candidate: &str) -> Result<Vec<String>, CheckerError> {
        let expected = evaluate_snippet(&self.original)
            .map_err(|e| CheckerError::Failed(format!("original does not evaluate: {e}")))?;
        let actual = match evaluate_snippet(candidate) {
            Ok(values) => values,
            Err(e) => return Ok(vec![e.to_string()]),
        };
        if expected.len() != actual.len() {
            return Ok(vec![format!("{} statements, expected {}", actual.len(), expected.len())]);
        }
        Ok(expected
            .iter()
            .zip(&actual)
            .filter(|(e, a)| !py_eq(e, a))
            .map(|(e, a)| format!("evaluates to {a}, expected {e}"))
            .collect())
    }
}

const STDERR_GRACE: Duration = Duration::from_millis(500);

/// Pipes the candidate to an external program on stdin. Exit status zero
/// accepts; anything else rejects with the program's stderr.
#[derive(Debug, Clone)]
pub struct CommandChecker {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandChecker {
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }

    /// Splits a command line on whitespace.
    pub fn from_command_line(line: &str, timeout: Duration) -> Option<Self> {
        let mut parts = line.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self::new(program, parts.collect(), timeout))
    }
}

impl CommandChecker {
    /// Kills and reaps the child so no process outlives the check.
    fn abandon(child: &mut Child) {
        let _ = child.kill();
        let _ = child.wait();
    }
}

impl Checker for CommandChecker {
    fn check(&self, candidate: &str) -> Result<Vec<String>, CheckerError> {
        debug!(target: "snakecharm_core::checker", "Running {} {:?}", self.program, self.args);
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| CheckerError::Failed(format!("failed to start {}: {e}", self.program)))?;

        // Pipes are serviced on helper threads; only the deadline blocks here.
        if let Some(mut stdin) = child.stdin.take() {
            let input = candidate.as_bytes().to_vec();
            let program = self.program.clone();
            thread::spawn(move || match stdin.write_all(&input) {
                Err(e) if e.kind() != ErrorKind::BrokenPipe => {
                    debug!(target: "snakecharm_core::checker", "Failed to write to {program}: {e}");
                }
                _ => {}
            });
        }
        let (stderr_tx, stderr_rx) = mpsc::channel();
        if let Some(mut pipe) = child.stderr.take() {
            thread::spawn(move || {
                let mut text = String::new();
                let _ = pipe.read_to_string(&mut text);
                let _ = stderr_tx.send(text);
            });
        }

        let start = Instant::now();
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) if start.elapsed() >= self.timeout => {
                    Self::abandon(&mut child);
                    return Err(CheckerError::Timeout(self.timeout));
                }
                Ok(None) => thread::sleep(Duration::from_millis(10)),
                Err(e) => {
                    Self::abandon(&mut child);
                    return Err(CheckerError::Failed(format!("failed to wait for {}: {e}", self.program)));
                }
            }
        };

        if status.success() {
            return Ok(Vec::new());
        }
        // A grandchild may still hold stderr open; take what arrives in time.
        let stderr = stderr_rx.recv_timeout(STDERR_GRACE).unwrap_or_default();
        let reason = match stderr.trim() {
            "" => format!("{} exited with {status}", self.program),
            text => text.to_string(),
        };
        Ok(vec![reason])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Slow;

    impl Checker for Slow {
        fn check(&self, _: &str) -> Result<Vec<String>, CheckerError> {
            thread::sleep(Duration::from_millis(500));
            Ok(Vec::new())
        }
    }

    #[test]
    fn rule_checker_reports_violations() {
        let gate = CheckerGate::new(
            Arc::new(RuleChecker::new(RuleSet::blacklist(["x"]).unwrap())),
            Duration::from_secs(1),
        );
        assert_eq!(gate.verify("abc"), Verdict::Accepted);
        assert!(matches!(gate.verify("xyz"), Verdict::Rejected(r) if r.len() == 1));
    }

    #[test]
    fn eval_checker_compares_values() {
        let checker = EvalChecker::new("'abc'");
        assert!(checker.check("'cba'[::-1]").unwrap().is_empty());
        assert_eq!(checker.check("'abd'").unwrap().len(), 1);
        assert_eq!(checker.check("1/0").unwrap().len(), 1);
    }

    #[test]
    fn slow_checker_times_out() {
        let gate = CheckerGate::new(Arc::new(Slow), Duration::from_millis(20));
        assert_eq!(gate.verify("x"), Verdict::TimedOut);
    }

    #[cfg(unix)]
    #[test]
    fn command_checker_uses_exit_status() {
        let accept = CommandChecker::from_command_line("true", Duration::from_secs(5)).unwrap();
        assert!(accept.check("1").unwrap().is_empty());
        let reject = CommandChecker::from_command_line("false", Duration::from_secs(5)).unwrap();
        assert_eq!(reject.check("1").unwrap().len(), 1);
        assert!(CommandChecker::from_command_line("   ", Duration::from_secs(1)).is_none());
    }

    #[cfg(unix)]
    #[test]
    fn command_checker_kills_programs_past_the_deadline() {
        let sleeper = CommandChecker::from_command_line("sleep 5", Duration::from_millis(100)).unwrap();
        let started = Instant::now();
        assert!(matches!(sleeper.check("1"), Err(CheckerError::Timeout(_))));
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[cfg(unix)]
    #[test]
    fn command_checker_survives_unread_stdin_and_noisy_stderr() {
        let big = "1+".repeat(512 * 1024) + "1";
        let ignores_input = CommandChecker::from_command_line("false", Duration::from_secs(5)).unwrap();
        assert_eq!(ignores_input.check(&big).unwrap().len(), 1);

        let noisy = CommandChecker::new(
            "sh",
            vec!["-c".into(), "head -c 200000 /dev/zero | tr '\\0' x >&2; exit 3".into()],
            Duration::from_secs(5),
        );
        let reasons = noisy.check("1").unwrap();
        assert_eq!(reasons.len(), 1);
        assert!(reasons[0].starts_with("xxx"));
    }
}
