use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, warn};

use super::locate;
use super::name::{self, compare_suffixes};
use crate::error::{CleanError, Result};

/// One case folder inside the mother folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Member {
    pub path: PathBuf,
    pub name: String,
    pub suffix: Option<char>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupShape {
    Simple,
    Split,
}

/// All folders sharing one base identifier, in discovery order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseGroup {
    pub base: String,
    pub members: Vec<Member>,
}

impl CaseGroup {
    pub fn shape(&self) -> GroupShape {
        match self.members.as_slice() {
            [only] if only.suffix.is_none() => GroupShape::Simple,
            _ => GroupShape::Split,
        }
    }

    /// A split group that also holds a folder without a suffix.
    pub fn is_mixed(&self) -> bool {
        self.members.len() > 1 && self.members.iter().any(|m| m.suffix.is_none())
    }

    /// Members sorted by suffix key. The sort is stable, so unknown or
    /// absent suffixes keep their discovery order after the known letters.
    pub fn ordered_members(&self) -> Vec<&Member> {
        let mut members: Vec<&Member> = self.members.iter().collect();
        members.sort_by(|a, b| compare_suffixes(a.suffix, b.suffix));
        members
    }

    /// True when `selector` names the base or one of the member folders.
    pub fn matches(&self, selector: &str) -> bool {
        self.base == selector || self.members.iter().any(|m| m.name == selector)
    }
}

/// Groups keyed by base; iteration is ascending by base.
pub type Groups = BTreeMap<String, CaseGroup>;

/// Scan the immediate subdirectories of `mother` and group the case folders.
///
/// Entries that are not directories, or whose names are not case names, are
/// skipped. An empty map is a valid result.
pub fn discover(mother: &Path) -> Result<Groups> {
    if !mother.is_dir() {
        return Err(CleanError::NotFound(mother.to_path_buf()));
    }

    let entries = std::fs::read_dir(mother).map_err(|source| CleanError::Io {
        path: mother.to_path_buf(),
        source,
    })?;

    let mut groups = Groups::new();
    for entry in entries {
        let entry = entry.map_err(|source| CleanError::Io {
            path: mother.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let Some(folder_name) = entry.file_name().to_str().map(str::to_string) else {
            debug!(path = %path.display(), "Skipping folder with non UTF-8 name");
            continue;
        };
        let parsed = name::parse(&folder_name);
        let Some(base) = parsed.base else {
            debug!(folder = %folder_name, "Skipping non-case folder");
            continue;
        };

        groups
            .entry(base.clone())
            .or_insert_with(|| CaseGroup {
                base,
                members: Vec::new(),
            })
            .members
            .push(Member {
                path,
                name: folder_name,
                suffix: parsed.suffix,
            });
    }

    for group in groups.values() {
        if group.is_mixed() {
            warn!(
                base = %group.base,
                "Group mixes a folder without suffix with split parts; treating it as the last part"
            );
        }
    }

    Ok(groups)
}

/// A discovered member together with the document the locator found for it.
#[derive(Debug, Clone, Serialize)]
pub struct SurveyMember {
    pub name: String,
    pub suffix: Option<char>,
    pub document: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SurveyEntry {
    pub base: String,
    pub shape: GroupShape,
    pub members: Vec<SurveyMember>,
}

impl SurveyEntry {
    pub fn missing_documents(&self) -> usize {
        self.members.iter().filter(|m| m.document.is_none()).count()
    }
}

/// Discover groups and locate each member's PDF without processing anything.
pub fn survey(mother: &Path) -> Result<Vec<SurveyEntry>> {
    let groups = discover(mother)?;
    Ok(groups
        .values()
        .map(|group| SurveyEntry {
            base: group.base.clone(),
            shape: group.shape(),
            members: group
                .ordered_members()
                .into_iter()
                .map(|m| SurveyMember {
                    name: m.name.clone(),
                    suffix: m.suffix,
                    document: locate::locate(&m.path, &m.name),
                })
                .collect(),
        })
        .collect())
}

// ── Tests ──
