//! Roster and report persistence.
//!
//! CSV files under a data directory, read and written through the
//! `FileSystem` port:
//!
//! ```text
//! <root>/
//!   ├── rosters/<group>.csv
//!   └── reports/<group>report.csv
//! ```

use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::model::{RoleId, RosterRecord};
use crate::ports::{FileSystem, ReportSink, RosterLoad, RosterSource, RowDiagnostic};
use crate::reconcile::{PassSummary, RecordReport};

/// Columns a roster must have.
const REQUIRED_COLUMNS: [&str; 2] = ["full_name", "alg_names"];

/// Failures reading or writing roster data.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The group key cannot be used as a file name.
    #[error("invalid group key {0:?}")]
    InvalidGroup(String),
    /// No roster file exists for the group.
    #[error("no roster found for group {group} at {}", path.display())]
    MissingRoster {
        /// Group key.
        group: String,
        /// Where the roster was expected.
        path: PathBuf,
    },
    /// No report has been written for the group yet.
    #[error("no assignment report for group {0}; run `assign` first")]
    MissingReport(String),
    /// The roster header lacks a required column.
    #[error("roster for {group} is missing required column `{column}`")]
    MissingColumn {
        /// Group key.
        group: String,
        /// Column name.
        column: &'static str,
    },
    /// The file could not be parsed as CSV.
    #[error("malformed CSV in {}: {source}", path.display())]
    Csv {
        /// File being read or written.
        path: PathBuf,
        /// Underlying parser error.
        #[source]
        source: csv::Error,
    },
    /// The filesystem refused a read or write.
    #[error("I/O error on {}: {message}", path.display())]
    Io {
        /// File involved.
        path: PathBuf,
        /// Adapter-reported reason.
        message: String,
    },
}

/// One roster row as it appears in the sheet.
#[derive(Debug, Deserialize)]
struct RosterRow {
    full_name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    role_names: String,
    #[serde(default)]
    alg_names: String,
    #[serde(default)]
    affinity_groups: String,
}

impl RosterRow {
    fn into_record(self) -> Result<RosterRecord, crate::model::RecordError> {
        Ok(RosterRecord::new(self.full_name, self.email)?
            .with_roles(split_cell(&self.role_names))
            .with_aliases(split_cell(&self.alg_names))
            .with_groups(split_cell(&self.affinity_groups)))
    }
}

/// One line of an assignment report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRow {
    /// Person's full name.
    pub full_name: String,
    /// Person's email.
    pub email: String,
    /// Desired role names, comma separated.
    pub role_names: String,
    /// Whether the person was matched to a member.
    pub found: bool,
    /// Whether the person had no usable aliases.
    pub unmatchable: bool,
    /// Matched member id, empty when not found.
    pub member_id: String,
    /// `<roster alias> in <directory alias>` for matched rows.
    pub matched_alias: String,
    /// Roles granted this pass.
    pub newly_granted: String,
    /// Roles already held.
    pub already_held: String,
    /// Role names the catalog did not know.
    pub dropped_roles: String,
    /// `<role>: <reason>` entries separated by `; `.
    pub failed_grants: String,
}

impl From<&RecordReport> for ReportRow {
    fn from(report: &RecordReport) -> Self {
        let outcome = &report.outcome;
        Self {
            full_name: report.record.full_name().to_string(),
            email: report.record.email().to_string(),
            role_names: report.record.role_names().join(","),
            found: report.found(),
            unmatchable: report.unmatchable,
            member_id: outcome.member.as_ref().map(ToString::to_string).unwrap_or_default(),
            matched_alias: report
                .matched_on
                .as_ref()
                .map(|pair| format!("{} in {}", pair.target, pair.candidate))
                .unwrap_or_default(),
            newly_granted: join_roles(&outcome.newly_granted),
            already_held: join_roles(&outcome.already_held),
            dropped_roles: outcome.dropped.join(","),
            failed_grants: outcome
                .failed
                .iter()
                .map(|f| format!("{}: {}", f.role, f.reason))
                .collect::<Vec<_>>()
                .join("; "),
        }
    }
}

/// CSV-backed roster source and report sink.
pub struct RosterStore {
    fs: Arc<dyn FileSystem>,
    root: PathBuf,
}

impl RosterStore {
    /// Creates a store rooted at `root`.
    #[must_use]
    pub fn new(fs: Arc<dyn FileSystem>, root: impl Into<PathBuf>) -> Self {
        Self { fs, root: root.into() }
    }

    /// The data directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the roster for `group`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidGroup`] if `group` is not a plain name.
    pub fn roster_path(&self, group: &str) -> Result<PathBuf, StoreError> {
        Ok(self.root.join("rosters").join(format!("{}.csv", checked_group(group)?)))
    }

    /// Path of the assignment report for `group`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidGroup`] if `group` is not a plain name.
    pub fn report_path(&self, group: &str) -> Result<PathBuf, StoreError> {
        Ok(self.root.join("reports").join(format!("{}report.csv", checked_group(group)?)))
    }

    /// Loads and validates the roster for `group`.
    ///
    /// Rows that fail to parse or have a blank full name are excluded and
    /// listed in [`RosterLoad::diagnostics`].
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the file is missing, unreadable, or lacks
    /// a required column.
    pub fn load(&self, group: &str) -> Result<RosterLoad, StoreError> {
        let path = self.roster_path(group)?;
        if !self.fs.exists(&path) {
            return Err(StoreError::MissingRoster { group: group.to_string(), path });
        }
        let text = self.read(&path)?;
        let load = parse_roster(group, &path, &text)?;
        info!(
            group,
            records = load.records.len(),
            excluded = load.diagnostics.len(),
            "loaded roster"
        );
        Ok(load)
    }

    /// Lists groups that have a roster file, sorted.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the roster directory cannot be listed.
    pub fn list_groups(&self) -> Result<Vec<String>, StoreError> {
        let dir = self.root.join("rosters");
        if !self.fs.exists(&dir) {
            return Ok(Vec::new());
        }
        let entries = self.fs.list_dir(&dir).map_err(|e| io_error(&dir, &*e))?;
        let mut groups: Vec<String> =
            entries.into_iter().filter_map(|n| n.strip_suffix(".csv").map(String::from)).collect();
        groups.sort();
        Ok(groups)
    }

    /// Writes the assignment report for a finished pass.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if encoding or writing fails.
    pub fn save_report(&self, group: &str, summary: &PassSummary) -> Result<PathBuf, StoreError> {
        let path = self.report_path(group)?;
        let csv_error = |source| StoreError::Csv { path: path.clone(), source };

        let mut writer = csv::Writer::from_writer(Vec::new());
        for report in &summary.records {
            writer.serialize(ReportRow::from(report)).map_err(csv_error)?;
        }
        let bytes = writer.into_inner().map_err(|e| io_error(&path, e.error()))?;
        let text = String::from_utf8(bytes).map_err(|e| io_error(&path, &e))?;

        self.fs.write(&path, &text).map_err(|e| io_error(&path, &*e))?;
        info!(
            group,
            path = %path.display(),
            rows = summary.records.len(),
            "wrote assignment report"
        );
        Ok(path)
    }

    /// Reads back the last report for `group`.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if no report exists or it cannot be parsed.
    pub fn load_report(&self, group: &str) -> Result<Vec<ReportRow>, StoreError> {
        let path = self.report_path(group)?;
        if !self.fs.exists(&path) {
            return Err(StoreError::MissingReport(group.to_string()));
        }
        let text = self.read(&path)?;
        let mut reader = csv::ReaderBuilder::new().has_headers(true).from_reader(text.as_bytes());
        reader
            .deserialize()
            .collect::<Result<Vec<ReportRow>, _>>()
            .map_err(|source| StoreError::Csv { path, source })
    }

    /// Sorted full names of people the last pass for `group` could not find.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the report is missing or unreadable.
    pub fn load_unmatched(&self, group: &str) -> Result<Vec<String>, StoreError> {
        let mut names: Vec<String> = self
            .load_report(group)?
            .into_iter()
            .filter(|row| !row.found)
            .map(|row| row.full_name)
            .collect();
        names.sort();
        Ok(names)
    }

    fn read(&self, path: &Path) -> Result<String, StoreError> {
        self.fs.read_to_string(path).map_err(|e| io_error(path, &*e))
    }
}

impl RosterSource for RosterStore {
    fn load_roster(&self, group: &str) -> Result<RosterLoad, Box<dyn Error + Send + Sync>> {
        Ok(self.load(group)?)
    }
}

impl ReportSink for RosterStore {
    fn write_report(
        &self,
        group: &str,
        summary: &PassSummary,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.save_report(group, summary)?;
        Ok(())
    }
}

/// Parses roster CSV text.
///
/// Multi-valued cells (`role_names`, `alg_names`, `affinity_groups`) are
/// comma separated inside one quoted cell.
fn parse_roster(group: &str, path: &Path, text: &str) -> Result<RosterLoad, StoreError> {
    let csv_error = |source| StoreError::Csv { path: path.to_path_buf(), source };
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers = reader.headers().map_err(csv_error)?.clone();
    for column in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == column) {
            return Err(StoreError::MissingColumn { group: group.to_string(), column });
        }
    }

    let mut load = RosterLoad::default();
    for (idx, row) in reader.records().enumerate() {
        let fallback_line = idx + 2;
        let row = match row {
            Ok(row) => row,
            Err(err) => {
                let line = err
                    .position()
                    .and_then(|p| usize::try_from(p.line()).ok())
                    .unwrap_or(fallback_line);
                load.diagnostics.push(RowDiagnostic { line, message: err.to_string() });
                continue;
            }
        };
        let line =
            row.position().and_then(|p| usize::try_from(p.line()).ok()).unwrap_or(fallback_line);

        let parsed = row
            .deserialize::<RosterRow>(Some(&headers))
            .map_err(|e| e.to_string())
            .and_then(|r| r.into_record().map_err(|e| e.to_string()));
        match parsed {
            Ok(record) => load.records.push(record),
            Err(message) => {
                debug!(group, line, reason = %message, "excluding roster row");
                load.diagnostics.push(RowDiagnostic { line, message });
            }
        }
    }
    Ok(load)
}

fn split_cell(cell: &str) -> impl Iterator<Item = &str> {
    cell.split(',').map(str::trim).filter(|s| !s.is_empty())
}

fn join_roles<'a>(roles: impl IntoIterator<Item = &'a RoleId>) -> String {
    roles.into_iter().map(ToString::to_string).collect::<Vec<_>>().join(",")
}

fn checked_group(group: &str) -> Result<&str, StoreError> {
    let valid = !group.is_empty()
        && group.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(group)
    } else {
        Err(StoreError::InvalidGroup(group.to_string()))
    }
}

fn io_error(path: &Path, err: &(dyn Error + 'static)) -> StoreError {
    StoreError::Io { path: path.to_path_buf(), message: err.to_string() }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::model::{AliasPair, GrantFailure, GrantOutcome, MemberId};
    use crate::reconcile::{normalize, PassCounts};
    use crate::testing::MemFs;

    const ROSTER: &str = "\
full_name,email,role_names,alg_names,affinity_groups
Jane Doe,jane@example.com,\"Scholar,Mentor\",\"janedoe, jdoe\",fli-rural
,ghost@example.com,Scholar,ghost,
Sam Roe,sam@example.com,Scholar,,
";

    #[test]
    fn load_parses_multi_valued_cells_and_excludes_bad_rows() {
        let fs = MemFs::with_files(&[("/data/rosters/cohort.csv", ROSTER)]);
        let store = RosterStore::new(fs, "/data");
        let load = store.load("cohort").unwrap();

        assert_eq!(load.records.len(), 2);
        let jane = &load.records[0];
        assert_eq!(jane.full_name(), "Jane Doe");
        assert_eq!(jane.role_names(), ["Scholar", "Mentor"]);
        assert!(jane.match_aliases().contains("janedoe"));
        assert!(jane.match_aliases().contains("jdoe"));
        assert!(jane.group_tags().contains("fli-rural"));

        // Sam has no aliases; kept so the pass can flag them unmatchable.
        assert!(load.records[1].match_aliases().is_empty());

        assert_eq!(load.diagnostics.len(), 1);
        assert_eq!(load.diagnostics[0].line, 3);
        assert!(load.diagnostics[0].message.contains("full name"));
    }

    #[test]
    fn load_rejects_roster_without_alias_column() {
        let store = RosterStore::new(
            MemFs::with_files(&[("/data/rosters/cohort.csv", "full_name,email\nJane,j@x\n")]),
            "/data",
        );
        assert!(matches!(
            store.load("cohort"),
            Err(StoreError::MissingColumn { column: "alg_names", .. })
        ));
    }

    #[test]
    fn missing_roster_and_bad_group_keys_are_errors() {
        let store = RosterStore::new(MemFs::with_files(&[]), "/data");
        assert!(matches!(store.load("nope"), Err(StoreError::MissingRoster { .. })));
        assert!(matches!(store.load("../etc"), Err(StoreError::InvalidGroup(_))));
        assert!(matches!(store.load_unmatched("nope"), Err(StoreError::MissingReport(_))));
    }

    #[test]
    fn list_groups_strips_extension() {
        let fs = MemFs::with_files(&[("/data/rosters/beta.csv", ROSTER)]);
        fs.write(Path::new("/data/rosters/alpha.csv"), ROSTER).unwrap();
        fs.write(Path::new("/data/rosters/notes.txt"), "").unwrap();
        let store = RosterStore::new(fs, "/data");
        assert_eq!(store.list_groups().unwrap(), ["alpha", "beta"]);
    }

    fn summary() -> PassSummary {
        let jane = RosterRecord::new("Jane Doe", "jane@example.com")
            .unwrap()
            .with_roles(["Scholar", "Ghost"]);
        let zed = RosterRecord::new("Zed", "").unwrap().with_aliases(["zed"]);
        let amy = RosterRecord::new("Amy", "").unwrap();
        let at = Utc.with_ymd_and_hms(2024, 6, 15, 10, 30, 0).unwrap();

        PassSummary {
            pass_id: "pass-1".into(),
            group: "cohort".into(),
            dry_run: false,
            started_at: at,
            finished_at: at,
            records: vec![
                RecordReport {
                    record: jane,
                    unmatchable: false,
                    matched_on: Some(AliasPair {
                        candidate: normalize("janedoe2024"),
                        target: normalize("janedoe"),
                    }),
                    outcome: GrantOutcome {
                        member: Some(MemberId("m1".into())),
                        newly_granted: [RoleId(7)].into(),
                        already_held: [RoleId(3)].into(),
                        dropped: vec!["Ghost".into()],
                        failed: vec![GrantFailure { role: RoleId(9), reason: "denied".into() }],
                        ..GrantOutcome::default()
                    },
                },
                RecordReport {
                    record: zed,
                    unmatchable: false,
                    matched_on: None,
                    outcome: GrantOutcome::skipped(),
                },
                RecordReport {
                    record: amy,
                    unmatchable: true,
                    matched_on: None,
                    outcome: GrantOutcome::skipped(),
                },
            ],
            excluded: vec![],
            contested: std::collections::BTreeMap::new(),
            counts: PassCounts::default(),
        }
    }

    #[test]
    fn report_is_written_and_read_back() {
        let store = RosterStore::new(MemFs::with_files(&[]), "/data");
        let path = store.save_report("cohort", &summary()).unwrap();
        assert_eq!(path, Path::new("/data/reports/cohortreport.csv"));

        let rows = store.load_report("cohort").unwrap();
        assert_eq!(rows.len(), 3);
        let jane = &rows[0];
        assert!(jane.found);
        assert_eq!(jane.member_id, "m1");
        assert_eq!(jane.role_names, "Scholar,Ghost");
        assert_eq!(jane.matched_alias, "janedoe in janedoe");
        assert_eq!(jane.newly_granted, "7");
        assert_eq!(jane.already_held, "3");
        assert_eq!(jane.dropped_roles, "Ghost");
        assert_eq!(jane.failed_grants, "9: denied");
        assert!(rows[2].unmatchable);
    }

    #[test]
    fn load_unmatched_returns_sorted_names_of_unfound_rows() {
        let store = RosterStore::new(MemFs::with_files(&[]), "/data");
        store.save_report("cohort", &summary()).unwrap();
        assert_eq!(store.load_unmatched("cohort").unwrap(), ["Amy", "Zed"]);
    }
}
