use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// How a `parallel` composite reports failure.
///
/// - `WaitAll`: wait until every child has settled, then report the first
///   failure in completion order (default).
/// - `FailFast`: report the first failure as soon as it arrives. Siblings
///   still running are detached, not aborted, so each one finishes writing
///   its own destination.
///
/// One policy is used for every `parallel` in a process; it travels with the
/// shared [`TaskContext`](crate::task::TaskContext).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ParallelPolicy {
    WaitAll,
    FailFast,
}

impl Default for ParallelPolicy {
    fn default() -> Self {
        ParallelPolicy::WaitAll
    }
}

impl FromStr for ParallelPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "wait-all" => Ok(ParallelPolicy::WaitAll),
            "fail-fast" => Ok(ParallelPolicy::FailFast),
            other => Err(format!(
                "invalid parallel_policy: {other} (expected \"wait-all\" or \"fail-fast\")"
            )),
        }
    }
}

impl fmt::Display for ParallelPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParallelPolicy::WaitAll => f.write_str("wait-all"),
            ParallelPolicy::FailFast => f.write_str("fail-fast"),
        }
    }
}
