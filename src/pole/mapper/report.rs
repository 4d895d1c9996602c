use std::fmt;

use serde::Serialize;
use tracing::{info, warn};

/// How serious a finding is. None of them stop a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// Kind of finding raised while processing a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// Row without a recognizable pole identifier; skipped.
    UnmappedRow,
    /// Pole dropped by the SCID ignore list.
    IgnoredPole,
    /// More generic comm attachments on one pole than there are comm slots.
    CommSlotOverflow,
    /// A numeric field could not be parsed.
    InvalidNumber,
    /// Manual route segment naming fewer than two poles.
    ManualRouteTooShort,
    /// Manual route pair naming a pole that is not in the dataset.
    UnknownManualRouteReference,
    /// QC connection naming a pole that is not in the dataset.
    UnknownQcReference,
    /// "To Pole" reference to a pole that is not in the dataset.
    UnresolvedLink,
    /// "To Pole" chain that loops back onto itself.
    RouteCycleDetected,
    /// Span without both a recorded and a reference length.
    ToleranceCheckSkipped,
    /// Span length outside the configured tolerance.
    ToleranceExceeded,
}

impl IssueKind {
    /// Severity the kind is reported at.
    pub fn severity(self) -> Severity {
        match self {
            IssueKind::IgnoredPole | IssueKind::ToleranceCheckSkipped => Severity::Info,
            IssueKind::UnknownManualRouteReference | IssueKind::RouteCycleDetected => {
                Severity::Error
            }
            IssueKind::UnmappedRow
            | IssueKind::CommSlotOverflow
            | IssueKind::InvalidNumber
            | IssueKind::ManualRouteTooShort
            | IssueKind::UnknownQcReference
            | IssueKind::UnresolvedLink
            | IssueKind::ToleranceExceeded => Severity::Warning,
        }
    }
}

/// A single reported finding with the row or pole it refers to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Issue {
    pub severity: Severity,
    pub kind: IssueKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pole: Option<String>,
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.severity, self.message)?;
        if let Some(row) = self.row {
            write!(f, " (row {row})")?;
        }
        if let Some(pole) = &self.pole {
            write!(f, " (pole {pole})")?;
        }
        Ok(())
    }
}

/// Findings accumulated over one processing run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Report {
    pub issues: Vec<Issue>,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a finding about a source row.
    pub fn row(&mut self, kind: IssueKind, row: usize, message: impl Into<String>) {
        self.push(kind, message.into(), Some(row), None);
    }

    /// Records a finding about a pole.
    pub fn pole(&mut self, kind: IssueKind, pole: &str, message: impl Into<String>) {
        self.push(kind, message.into(), None, Some(pole.to_string()));
    }

    /// Records a finding without a row or pole reference.
    pub fn note(&mut self, kind: IssueKind, message: impl Into<String>) {
        self.push(kind, message.into(), None, None);
    }

    fn push(&mut self, kind: IssueKind, message: String, row: Option<usize>, pole: Option<String>) {
        let severity = kind.severity();
        match severity {
            Severity::Info => info!(?kind, row, pole = pole.as_deref(), "{message}"),
            Severity::Warning | Severity::Error => {
                warn!(?kind, row, pole = pole.as_deref(), "{message}")
            }
        }
        self.issues.push(Issue {
            severity,
            kind,
            message,
            row,
            pole,
        });
    }

    /// Issues of the given kind.
    pub fn of_kind(&self, kind: IssueKind) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(move |issue| issue.kind == kind)
    }

    pub fn count(&self, kind: IssueKind) -> usize {
        self.of_kind(kind).count()
    }

    /// Number of issues at or above the given severity.
    pub fn count_at_least(&self, severity: Severity) -> usize {
        self.issues
            .iter()
            .filter(|issue| issue.severity >= severity)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }
}
