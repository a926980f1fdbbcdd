#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Decides, before any executor runs, whether a check may run at all.

use super::outcome::Verdict;
use crate::{config::Capabilities, rubric::Check, tools::ToolProbe};

/// Result of passing a check through the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Hand the check to its executor.
    Execute,
    /// The check is settled without running.
    Settle(Verdict),
}

/// Applies the skip/deny policy to `check`.
///
/// The capability gate comes first: a check whose capability is disabled is
/// skipped without probing for its tool. A missing tool then skips the check
/// when its policy allows it and fails it otherwise.
pub fn evaluate(check: &Check, capabilities: &Capabilities, probe: &ToolProbe) -> GateDecision {
    if let Some(flag) = check.requires_flag
        && !capabilities.enabled(flag)
    {
        return GateDecision::Settle(Verdict::Skipped(format!("{flag} flag not enabled")));
    }

    if let Some(tool) = check.tool.as_deref()
        && !probe.is_present(tool)
    {
        let message = format!("tool {tool} missing");
        return GateDecision::Settle(if check.skip_if_missing_tool {
            Verdict::Skipped(message)
        } else {
            Verdict::Fail(message)
        });
    }

    GateDecision::Execute
}
