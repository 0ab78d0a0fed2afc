use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::case::GroupShape;
use crate::error::CleanError;
use crate::text::RepairStats;

/// A case that was cleaned and written.
#[derive(Debug, Clone, Serialize)]
pub struct CaseOutput {
    pub name: String,
    pub output: PathBuf,
    pub chars: usize,
    pub lines: usize,
    pub repair: RepairStats,
    #[serde(skip)]
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MemberOutcome {
    Succeeded(CaseOutput),
    Failed { kind: String, error: String },
}

impl MemberOutcome {
    pub fn failed(err: &CleanError) -> Self {
        MemberOutcome::Failed {
            kind: err.kind().to_string(),
            error: err.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, MemberOutcome::Succeeded(_))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MemberReport {
    pub name: String,
    pub suffix: Option<char>,
    pub outcome: MemberOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupStatus {
    Success,
    /// Split group where only some parts, or only one, came through.
    Degraded,
    Failed,
}

impl GroupStatus {
    pub fn is_success(self) -> bool {
        !matches!(self, GroupStatus::Failed)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupReport {
    pub base: String,
    pub shape: GroupShape,
    pub status: GroupStatus,
    pub members: Vec<MemberReport>,
    pub merged: Option<PathBuf>,
    pub merge_error: Option<String>,
}

impl GroupReport {
    pub fn succeeded_members(&self) -> usize {
        self.members.iter().filter(|m| m.outcome.is_success()).count()
    }

    pub fn failed_members(&self) -> usize {
        self.members.len() - self.succeeded_members()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    pub mother: PathBuf,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub success_groups: usize,
    pub failed_groups: usize,
    pub total_groups: usize,
    pub groups: Vec<GroupReport>,
}

impl BatchSummary {
    pub fn new(
        mother: PathBuf,
        started_at: DateTime<Utc>,
        elapsed_ms: u64,
        groups: Vec<GroupReport>,
    ) -> Self {
        let success_groups = groups.iter().filter(|g| g.status.is_success()).count();
        BatchSummary {
            mother,
            started_at,
            elapsed_ms,
            success_groups,
            failed_groups: groups.len() - success_groups,
            total_groups: groups.len(),
            groups,
        }
    }

    pub fn print(&self) {
        println!("\nSuccessful groups: {}", self.success_groups);
        println!("Failed groups:     {}", self.failed_groups);
        println!("Total groups:      {}", self.total_groups);

        let split: Vec<_> = self
            .groups
            .iter()
            .filter(|g| g.shape == GroupShape::Split)
            .collect();
        if !split.is_empty() {
            println!("\n--- Split groups ---");
            for g in split {
                let merged = match (&g.merged, &g.merge_error) {
                    (Some(path), _) => format!("merged -> {}", path.display()),
                    (None, Some(err)) => format!("merge failed: {err}"),
                    (None, None) => "not merged".to_string(),
                };
                println!(
                    "  {}: {} ok, {} failed, {}",
                    g.base,
                    g.succeeded_members(),
                    g.failed_members(),
                    merged
                );
            }
        }

        let failures: Vec<_> = self
            .groups
            .iter()
            .flat_map(|g| g.members.iter())
            .filter_map(|m| match &m.outcome {
                MemberOutcome::Failed { error, .. } => Some((m.name.as_str(), error.as_str())),
                MemberOutcome::Succeeded(_) => None,
            })
            .collect();
        if !failures.is_empty() {
            println!("\n--- Failures ---");
            for (name, error) in failures {
                println!("  {name}: {error}");
            }
        }
    }
}

// ── Tests ──
