use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::Utc;
use rayon::prelude::*;
use tracing::{info, warn};

use crate::case::{self, locate, CaseGroup, GroupShape, Member};
use crate::error::{CleanError, Result};
use crate::extract::{PageSource, PdfTextSource};
use crate::report::{BatchSummary, CaseOutput, GroupReport, GroupStatus, MemberOutcome, MemberReport};
use crate::text::{self, CompiledRules, RuleSet};

pub const CLEANED_SUFFIX: &str = "_CLEANED.txt";
pub const MERGED_SUFFIX: &str = "_cleaned_merged.txt";
pub const MERGE_SEPARATOR: &str = "\n\n";

pub fn cleaned_path(folder: &Path, case_name: &str) -> PathBuf {
    folder.join(format!("{case_name}{CLEANED_SUFFIX}"))
}

pub fn merged_path(mother: &Path, base: &str) -> PathBuf {
    mother.join(format!("{base}{MERGED_SUFFIX}"))
}

/// Locate → extract → normalize → repair → write, for single folders,
/// split groups and whole mother folders.
pub struct Pipeline<S = PdfTextSource> {
    source: S,
    rules: CompiledRules,
    parallel: bool,
}

impl Pipeline<PdfTextSource> {
    pub fn pdf() -> Result<Self> {
        Self::new(PdfTextSource)
    }
}

impl<S: PageSource> Pipeline<S> {
    pub fn new(source: S) -> Result<Self> {
        let rules = RuleSet::default()
            .compile()
            .map_err(|e| CleanError::Rules(e.to_string()))?;
        Ok(Pipeline {
            source,
            rules,
            parallel: true,
        })
    }

    pub fn with_rules(mut self, rules: CompiledRules) -> Self {
        self.rules = rules;
        self
    }

    /// Process groups, and the parts of a split group, on the rayon pool.
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Extract, normalize and repair one document.
    pub fn clean_document(&self, document: &Path) -> Result<(String, text::RepairStats)> {
        let pages = self.source.extract_pages(document)?;
        let normalized = text::normalize_with(&self.rules, pages)
            .map_err(|_| CleanError::EmptyDocument(document.to_path_buf()))?;
        Ok(text::repair_with_stats(&normalized))
    }

    /// Process one case folder whose document is `<case_name>.pdf`.
    pub fn process_case(&self, folder: &Path, case_name: &str) -> Result<CaseOutput> {
        let document =
            locate::locate(folder, case_name).ok_or_else(|| CleanError::DocumentNotFound {
                folder: folder.to_path_buf(),
                case: case_name.to_string(),
            })?;
        self.process_document(folder, case_name, &document)
    }

    /// Process one case folder with an explicitly chosen document.
    pub fn process_document(
        &self,
        folder: &Path,
        case_name: &str,
        document: &Path,
    ) -> Result<CaseOutput> {
        info!(case = %case_name, document = %document.display(), "Reading PDF");
        let (text, repair) = self.clean_document(document)?;

        let output = cleaned_path(folder, case_name);
        std::fs::write(&output, &text).map_err(|source| CleanError::Write {
            path: output.clone(),
            source,
        })?;

        let chars = text.chars().count();
        let lines = text.lines().count();
        info!(
            case = %case_name,
            chars,
            lines,
            repaired = repair.repaired,
            fell_back = repair.fell_back,
            "Saved {}",
            output.display()
        );
        Ok(CaseOutput {
            name: case_name.to_string(),
            output,
            chars,
            lines,
            repair,
            text,
        })
    }

    fn process_member(&self, member: &Member) -> MemberReport {
        let outcome = match self.process_case(&member.path, &member.name) {
            Ok(output) => MemberOutcome::Succeeded(output),
            Err(e) => {
                warn!(case = %member.name, error = %e, "Case failed");
                MemberOutcome::failed(&e)
            }
        };
        MemberReport {
            name: member.name.clone(),
            suffix: member.suffix,
            outcome,
        }
    }

    /// Process every part of a split group in suffix order and merge the
    /// parts that succeeded into `<base>_cleaned_merged.txt` in `mother`.
    pub fn process_split_case(&self, mother: &Path, group: &CaseGroup) -> GroupReport {
        let ordered = group.ordered_members();
        info!(
            base = %group.base,
            parts = %ordered.iter().map(|m| m.name.as_str()).collect::<Vec<_>>().join(", "),
            "Split group"
        );

        // collect() keeps suffix order whichever part finishes first
        let members: Vec<MemberReport> = if self.parallel {
            ordered.par_iter().map(|m| self.process_member(m)).collect()
        } else {
            ordered.iter().map(|m| self.process_member(m)).collect()
        };

        let texts: Vec<&str> = members
            .iter()
            .filter_map(|m| match &m.outcome {
                MemberOutcome::Succeeded(out) => Some(out.text.as_str()),
                MemberOutcome::Failed { .. } => None,
            })
            .collect();

        let mut merged = None;
        let mut merge_error = None;
        let status = match texts.len() {
            0 => GroupStatus::Failed,
            1 => {
                warn!(base = %group.base, "Only one part processed; merged file not created");
                GroupStatus::Degraded
            }
            n => {
                let path = merged_path(mother, &group.base);
                match std::fs::write(&path, texts.join(MERGE_SEPARATOR)) {
                    Ok(()) => {
                        info!(base = %group.base, parts = n, "Merged saved: {}", path.display());
                        merged = Some(path);
                        if n == members.len() {
                            GroupStatus::Success
                        } else {
                            GroupStatus::Degraded
                        }
                    }
                    Err(source) => {
                        let err = CleanError::Write { path, source };
                        warn!(base = %group.base, error = %err, "Merge failed");
                        merge_error = Some(err.to_string());
                        GroupStatus::Degraded
                    }
                }
            }
        };

        GroupReport {
            base: group.base.clone(),
            shape: GroupShape::Split,
            status,
            members,
            merged,
            merge_error,
        }
    }

    /// Dispatch a group by shape. Failures end up in the report, never as `Err`.
    pub fn process_group(&self, mother: &Path, group: &CaseGroup) -> GroupReport {
        match (group.shape(), group.members.as_slice()) {
            (GroupShape::Simple, [member]) => {
                let report = self.process_member(member);
                let status = if report.outcome.is_success() {
                    GroupStatus::Success
                } else {
                    GroupStatus::Failed
                };
                GroupReport {
                    base: group.base.clone(),
                    shape: GroupShape::Simple,
                    status,
                    members: vec![report],
                    merged: None,
                    merge_error: None,
                }
            }
            _ => self.process_split_case(mother, group),
        }
    }

    pub fn run_batch(&self, mother: &Path) -> Result<BatchSummary> {
        self.run_batch_with(mother, &[], |_| {})
    }

    /// Discover and process every group of `mother` in ascending base order.
    ///
    /// `only` restricts the run to groups named by base or member folder
    /// (empty means all). `on_group` is called as each group finishes, from
    /// worker threads when running in parallel.
    pub fn run_batch_with<F>(&self, mother: &Path, only: &[String], on_group: F) -> Result<BatchSummary>
    where
        F: Fn(&GroupReport) + Sync,
    {
        let started_at = Utc::now();
        let t0 = Instant::now();

        let groups = case::discover(mother)?;
        if groups.is_empty() {
            return Err(CleanError::NoCasesFound(mother.to_path_buf()));
        }

        let selected: Vec<&CaseGroup> = groups
            .values()
            .filter(|g| only.is_empty() || only.iter().any(|sel| g.matches(sel)))
            .collect();
        if selected.is_empty() {
            warn!(selectors = ?only, "No group matches the selection");
        }
        info!(
            folders = selected.iter().map(|g| g.members.len()).sum::<usize>(),
            groups = selected.len(),
            "Starting batch processing"
        );

        let run = |g: &&CaseGroup| {
            let report = self.process_group(mother, g);
            on_group(&report);
            report
        };
        let reports: Vec<GroupReport> = if self.parallel {
            selected.par_iter().map(run).collect()
        } else {
            selected.iter().map(run).collect()
        };

        let summary = BatchSummary::new(
            mother.to_path_buf(),
            started_at,
            t0.elapsed().as_millis() as u64,
            reports,
        );
        info!(
            ok = summary.success_groups,
            failed = summary.failed_groups,
            total = summary.total_groups,
            "Batch processing complete"
        );
        Ok(summary)
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    /// Pages keyed by document file stem.
    #[derive(Default)]
    struct MockSource {
        docs: HashMap<String, Vec<Option<String>>>,
    }

    impl MockSource {
        fn with(mut self, stem: &str, pages: &[Option<&str>]) -> Self {
            self.docs.insert(
                stem.to_string(),
                pages.iter().map(|p| p.map(str::to_string)).collect(),
            );
            self
        }
    }

    impl PageSource for MockSource {
        fn extract_pages(&self, path: &Path) -> Result<Vec<Option<String>>> {
            let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
            self.docs
                .get(stem)
                .cloned()
                .ok_or_else(|| CleanError::Extraction {
                    path: path.to_path_buf(),
                    reason: "unknown document".to_string(),
                })
        }
    }

    /// Create `mother/<name>/` and, when `pdf`, an empty `<name>.pdf` inside.
    fn case_dir(mother: &Path, name: &str, pdf: bool) -> PathBuf {
        let dir = mother.join(name);
        std::fs::create_dir(&dir).unwrap();
        if pdf {
            std::fs::write(dir.join(format!("{name}.pdf")), b"%PDF-1.4").unwrap();
        }
        dir
    }

    fn pipeline(source: MockSource, parallel: bool) -> Pipeline<MockSource> {
        Pipeline::new(source).unwrap().parallel(parallel)
    }

    #[test]
    fn simple_case_end_to_end() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = case_dir(tmp.path(), "אה456", true);
        let source = MockSource::default().with(
            "אה456",
            &[Some("--- PAGE 1 ---\nהזנמנא: שאר באכ 3 םימי\nCT 2024 הקידב")],
        );

        let out = pipeline(source, false).process_case(&dir, "אה456").unwrap();
        assert!(!out.text.is_empty());
        assert_eq!(out.output, dir.join("אה456_CLEANED.txt"));
        let written = std::fs::read_to_string(&out.output).unwrap();
        assert_eq!(written, out.text);
        assert!(written.contains("בדיקה 2024 CT"), "{written}");
        assert!(written.contains("ימים 3 כאב ראש"), "{written}");
        assert_eq!(out.chars, written.chars().count());
    }

    #[test]
    fn encounter_fixture_reads_in_order() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = case_dir(tmp.path(), "אה456", true);
        let page = std::fs::read_to_string("tests/fixtures/encounter_page.txt").unwrap();
        let source = MockSource::default().with("אה456", &[Some(page.as_str())]);

        let out = pipeline(source, false).process_case(&dir, "אה456").unwrap();
        let lines: Vec<&str> = out.text.lines().collect();
        assert!(lines.contains(&"כאב ראש אחוז שלושה ימים"));
        assert!(lines.contains(&"ל\"ד 120/80 תקין"));
        assert!(lines.contains(&"400mg Tab פריון"));
        assert!(lines.contains(&"10/03/2024"));
        assert!(!out.text.contains("סודי רפואי"));
        assert_eq!(out.repair.fell_back, 0);
    }

    #[test]
    fn custom_rules_apply_to_cases() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = case_dir(tmp.path(), "אה456", true);
        let source = MockSource::default().with("אה456", &[Some("Printed 01/02/2024\nbody")]);
        let mut rules = RuleSet::default();
        rules.boilerplate.push(r"^Printed [0-9/]+$".to_string());

        let out = pipeline(source, false)
            .with_rules(rules.compile().unwrap())
            .process_case(&dir, "אה456")
            .unwrap();
        assert_eq!(out.text, "body");
    }

    #[test]
    fn rerun_overwrites_output() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = case_dir(tmp.path(), "אה456", true);
        std::fs::write(dir.join("אה456_CLEANED.txt"), "stale").unwrap();
        let source = MockSource::default().with("אה456", &[Some("hello")]);

        pipeline(source, false).process_case(&dir, "אה456").unwrap();
        assert_eq!(std::fs::read_to_string(dir.join("אה456_CLEANED.txt")).unwrap(), "hello");
    }

    #[test]
    fn missing_document_is_reported() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = case_dir(tmp.path(), "בל123", false);
        let err = pipeline(MockSource::default(), false)
            .process_case(&dir, "בל123")
            .unwrap_err();
        assert!(matches!(err, CleanError::DocumentNotFound { .. }));
        assert!(!dir.join("בל123_CLEANED.txt").exists());
    }

    #[test]
    fn blank_document_is_empty_error() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = case_dir(tmp.path(), "גר789", true);
        let source = MockSource::default().with("גר789", &[None, Some("  ")]);
        let err = pipeline(source, false).process_case(&dir, "גר789").unwrap_err();
        assert!(matches!(err, CleanError::EmptyDocument(_)));
    }

    #[test]
    fn explicit_document_name() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = case_dir(tmp.path(), "גר789", false);
        let doc = dir.join("scan.pdf");
        std::fs::write(&doc, b"%PDF").unwrap();
        let source = MockSource::default().with("scan", &[Some("abc")]);
        let out = pipeline(source, false)
            .process_document(&dir, "גר789", &doc)
            .unwrap();
        assert_eq!(out.output, dir.join("גר789_CLEANED.txt"));
    }

    fn split_fixture(parallel: bool) -> (tempfile::TempDir, GroupReport) {
        let tmp = tempfile::tempdir().unwrap();
        // created out of order on purpose
        case_dir(tmp.path(), "ננ449ב", true);
        case_dir(tmp.path(), "ננ449א", true);
        let source = MockSource::default()
            .with("ננ449א", &[Some("ןושאר קלח")])
            .with("ננ449ב", &[Some("ינש קלח")]);

        let groups = case::discover(tmp.path()).unwrap();
        let report = pipeline(source, parallel).process_split_case(tmp.path(), &groups["ננ449"]);
        (tmp, report)
    }

    #[test]
    fn split_case_merges_in_suffix_order() {
        for parallel in [false, true] {
            let (tmp, report) = split_fixture(parallel);
            assert_eq!(report.status, GroupStatus::Success);
            assert_eq!(report.succeeded_members(), 2);

            let first = std::fs::read_to_string(tmp.path().join("ננ449א/ננ449א_CLEANED.txt")).unwrap();
            let second = std::fs::read_to_string(tmp.path().join("ננ449ב/ננ449ב_CLEANED.txt")).unwrap();
            assert_eq!(first, "חלק ראשון");
            assert_eq!(second, "חלק שני");

            let merged_file = tmp.path().join("ננ449_cleaned_merged.txt");
            assert_eq!(report.merged.as_deref(), Some(merged_file.as_path()));
            let merged = std::fs::read_to_string(merged_file).unwrap();
            assert_eq!(merged, format!("{first}\n\n{second}"));
        }
    }

    #[test]
    fn split_case_with_one_good_part_is_degraded_without_merge() {
        let tmp = tempfile::tempdir().unwrap();
        case_dir(tmp.path(), "ננ449א", true);
        case_dir(tmp.path(), "ננ449ב", false);
        let source = MockSource::default().with("ננ449א", &[Some("קלח")]);

        let groups = case::discover(tmp.path()).unwrap();
        let report = pipeline(source, false).process_group(tmp.path(), &groups["ננ449"]);
        assert_eq!(report.status, GroupStatus::Degraded);
        assert!(report.status.is_success());
        assert_eq!(report.succeeded_members(), 1);
        assert_eq!(report.failed_members(), 1);
        assert!(report.merged.is_none());
        assert!(!tmp.path().join("ננ449_cleaned_merged.txt").exists());
    }

    #[test]
    fn split_case_with_no_good_part_fails() {
        let tmp = tempfile::tempdir().unwrap();
        case_dir(tmp.path(), "ננ449א", false);
        case_dir(tmp.path(), "ננ449ב", false);
        let groups = case::discover(tmp.path()).unwrap();
        let report = pipeline(MockSource::default(), false).process_group(tmp.path(), &groups["ננ449"]);
        assert_eq!(report.status, GroupStatus::Failed);
        assert_eq!(report.failed_members(), 2);
    }

    #[test]
    fn batch_isolates_failures_between_groups() {
        for parallel in [false, true] {
            let tmp = tempfile::tempdir().unwrap();
            case_dir(tmp.path(), "אה456", true);
            case_dir(tmp.path(), "בל123", false);
            case_dir(tmp.path(), "ננ449א", true);
            case_dir(tmp.path(), "ננ449ב", true);
            std::fs::create_dir(tmp.path().join("notes")).unwrap();
            let source = MockSource::default()
                .with("אה456", &[Some("אב")])
                .with("ננ449א", &[Some("גד")])
                .with("ננ449ב", &[Some("הו")]);

            let summary = pipeline(source, parallel).run_batch(tmp.path()).unwrap();
            assert_eq!(summary.total_groups, 3);
            assert_eq!(summary.success_groups, 2);
            assert_eq!(summary.failed_groups, 1);

            let bases: Vec<_> = summary.groups.iter().map(|g| g.base.as_str()).collect();
            assert_eq!(bases, vec!["אה456", "בל123", "ננ449"]);
            match &summary.groups[1].members[0].outcome {
                MemberOutcome::Failed { kind, .. } => assert_eq!(kind, "document_not_found"),
                other => panic!("expected failure, got {other:?}"),
            }
            assert!(tmp.path().join("ננ449_cleaned_merged.txt").exists());
        }
    }

    #[test]
    fn unwritable_output_fails_only_that_case() {
        let tmp = tempfile::tempdir().unwrap();
        case_dir(tmp.path(), "אה456", true);
        let blocked = case_dir(tmp.path(), "בל123", true);
        std::fs::create_dir(blocked.join("בל123_CLEANED.txt")).unwrap();
        case_dir(tmp.path(), "ננ449א", true);
        case_dir(tmp.path(), "ננ449ב", true);
        let source = MockSource::default()
            .with("אה456", &[Some("אב")])
            .with("בל123", &[Some("גד")])
            .with("ננ449א", &[Some("הו")])
            .with("ננ449ב", &[Some("זח")]);

        let summary = pipeline(source, true).run_batch(tmp.path()).unwrap();
        assert_eq!(summary.success_groups, 2);
        assert_eq!(summary.failed_groups, 1);

        let blocked = &summary.groups[1];
        assert_eq!(blocked.base, "בל123");
        assert_eq!(blocked.status, GroupStatus::Failed);
        match &blocked.members[0].outcome {
            MemberOutcome::Failed { kind, .. } => assert_eq!(kind, "write"),
            other => panic!("expected write failure, got {other:?}"),
        }
        assert_eq!(summary.groups[0].status, GroupStatus::Success);
        assert_eq!(summary.groups[2].status, GroupStatus::Success);
    }

    #[test]
    fn unwritable_merge_degrades_split_case() {
        let tmp = tempfile::tempdir().unwrap();
        case_dir(tmp.path(), "ננ449א", true);
        case_dir(tmp.path(), "ננ449ב", true);
        std::fs::create_dir(tmp.path().join("ננ449_cleaned_merged.txt")).unwrap();
        let source = MockSource::default()
            .with("ננ449א", &[Some("ןושאר")])
            .with("ננ449ב", &[Some("ינש")]);

        let groups = case::discover(tmp.path()).unwrap();
        let report = pipeline(source, false).process_group(tmp.path(), &groups["ננ449"]);
        assert_eq!(report.status, GroupStatus::Degraded);
        assert_eq!(report.succeeded_members(), 2);
        assert!(report.merged.is_none());
        assert!(report.merge_error.is_some());
        assert!(tmp.path().join("ננ449א/ננ449א_CLEANED.txt").exists());
    }

    #[test]
    fn batch_selection_and_progress_callback() {
        let tmp = tempfile::tempdir().unwrap();
        case_dir(tmp.path(), "אה456", true);
        case_dir(tmp.path(), "בל123", true);
        let source = MockSource::default()
            .with("אה456", &[Some("x")])
            .with("בל123", &[Some("y")]);

        let seen = std::sync::atomic::AtomicUsize::new(0);
        let summary = pipeline(source, true)
            .run_batch_with(tmp.path(), &["בל123".to_string()], |_| {
                seen.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            })
            .unwrap();
        assert_eq!(summary.total_groups, 1);
        assert_eq!(summary.groups[0].base, "בל123");
        assert_eq!(seen.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert!(!tmp.path().join("אה456/אה456_CLEANED.txt").exists());
    }

    #[test]
    fn batch_without_cases_is_reported() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir(tmp.path().join("misc")).unwrap();
        let err = pipeline(MockSource::default(), false)
            .run_batch(tmp.path())
            .unwrap_err();
        assert!(matches!(err, CleanError::NoCasesFound(_)));
        assert!(!err.is_fatal());
    }

    #[test]
    fn batch_on_missing_folder_is_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        let err = pipeline(MockSource::default(), false)
            .run_batch(&tmp.path().join("nope"))
            .unwrap_err();
        assert!(err.is_fatal());
    }
}
