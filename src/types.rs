use std::str::FromStr;

use serde::Deserialize;

/// What happens to the rest of a run when a task fails.
///
/// - `Isolate`: only the failed task's dependents are blocked; unrelated
///   branches keep executing (default behaviour).
/// - `Abort`: no new task is started after the first failure. Tasks that are
///   already running are allowed to finish; everything still pending is
///   reported as blocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    #[default]
    Isolate,
    Abort,
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "isolate" => Ok(FailurePolicy::Isolate),
            "abort" => Ok(FailurePolicy::Abort),
            other => Err(format!(
                "invalid failure_policy: {other} (expected \"isolate\" or \"abort\")"
            )),
        }
    }
}

/// How much of an action's output is echoed to the terminal.
///
/// Output is always captured and attached to the task's error on failure;
/// verbosity only controls what is shown while the build runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Verbosity {
    /// Never echo action output.
    Quiet,
    /// Echo captured stderr of failing actions.
    #[default]
    Failures,
    /// Echo all action output as it is produced.
    All,
}

impl Verbosity {
    pub fn from_level(level: u8) -> Self {
        match level {
            0 => Verbosity::Quiet,
            1 => Verbosity::Failures,
            _ => Verbosity::All,
        }
    }
}
