#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::fmt::{self, Display};

use serde::Serialize;

use crate::rubric::Check;

/// How a check ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// The check ran and its condition held.
    Pass,
    /// The check ran and its condition did not hold, or it could not run.
    Fail,
    /// The check was bypassed by policy.
    Skipped,
}

impl Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Pass => write!(f, "pass"),
            Status::Fail => write!(f, "fail"),
            Status::Skipped => write!(f, "skipped"),
        }
    }
}

/// What the policy gate or an executor decided, before points are attached.
/// Points are never chosen here, so a check can only ever earn its full
/// value, its skip credit, or nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Award the check's points.
    Pass(String),
    /// Award nothing.
    Fail(String),
    /// Award the check's skip credit.
    Skipped(String),
}

impl Verdict {
    /// Passes when `ok`, fails otherwise, with the same message.
    pub fn from_bool(ok: bool, message: impl Into<String>) -> Self {
        if ok {
            Verdict::Pass(message.into())
        } else {
            Verdict::Fail(message.into())
        }
    }
}

/// The recorded result of one check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outcome {
    /// How the check ended.
    status:      Status,
    /// Points awarded.
    earned:      u32,
    /// Points the check was worth.
    points:      u32,
    /// Identifier of the originating check.
    id:          String,
    /// Description of the originating check.
    description: String,
    /// Explanation of the result.
    message:     String,
}

impl Outcome {
    /// Ties a verdict to the check it was reached for.
    pub fn new(check: &Check, verdict: Verdict) -> Self {
        let (status, earned, message) = match verdict {
            Verdict::Pass(message) => (Status::Pass, check.points, message),
            Verdict::Fail(message) => (Status::Fail, 0, message),
            Verdict::Skipped(message) => {
                (Status::Skipped, check.skip_points.min(check.points), message)
            }
        };

        Self {
            status,
            earned,
            points: check.points,
            id: check.id.clone(),
            description: check.description.clone(),
            message,
        }
    }

    /// Returns how the check ended.
    pub fn status(&self) -> Status {
        self.status
    }

    /// Returns the points awarded.
    pub fn earned(&self) -> u32 {
        self.earned
    }

    /// Returns the points the check was worth.
    pub fn points(&self) -> u32 {
        self.points
    }

    /// Returns the check identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the check description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the explanation of the result.
    pub fn message(&self) -> &str {
        &self.message
    }
}
