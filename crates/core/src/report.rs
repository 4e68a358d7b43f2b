//! Report rendering.
//!
//! A report lists the subject's contributions for one period, one line per
//! contribution: `<title> (<diff file name>)`. Without a template the default
//! text layout is written to `report.txt`. With a template, every `{{ key }}`
//! placeholder in the template file is replaced and the result is written
//! under the template's file name.
//!
//! Known placeholders are `periodFrom`, `periodTill`, `approvalDate`, `result`
//! and the keys of the report's `extraFields`. Unknown placeholders are kept.

use std::collections::BTreeMap;
use std::fmt::Display;
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone};
use indoc::formatdoc;
use lazy_static::lazy_static;
use pkup_developer_platforms::models::{CommitRecord, PullRequestRecord};
use regex::{Captures, Regex};
use tracing::{debug, instrument};

use crate::artifacts::{build_diff_filename, write_file};
use crate::errors::PkupError;
use crate::period::PERIOD_FORMAT;

#[cfg(test)]
#[path = "report_tests.rs"]
mod tests;

/// File name of the report rendered without a template.
pub const DEFAULT_REPORT_FILE: &str = "report.txt";

pub const PERIOD_FROM_KEY: &str = "periodFrom";
pub const PERIOD_TILL_KEY: &str = "periodTill";
pub const APPROVAL_DATE_KEY: &str = "approvalDate";
pub const RESULT_KEY: &str = "result";

lazy_static! {
    /// Matches `{{ key }}` placeholders
    static ref PLACEHOLDER_REGEX: Regex =
        Regex::new(r"\{\{\s*([A-Za-z0-9_.-]+)\s*\}\}").expect("Failed to compile placeholder regex");
}

/// One authored change that ends up in a report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Contribution {
    Commit(CommitRecord),
    PullRequest(PullRequestRecord),
}

impl Contribution {
    pub fn title(&self) -> &str {
        match self {
            Contribution::Commit(commit) => commit.title(),
            Contribution::PullRequest(pr) => pr.title.as_str(),
        }
    }

    /// The SHA whose diff represents this contribution.
    pub fn sha(&self) -> &str {
        match self {
            Contribution::Commit(commit) => commit.sha.as_str(),
            Contribution::PullRequest(pr) => pr.merge_commit_sha.as_deref().unwrap_or_default(),
        }
    }
}

/// Contributions of one subject in one repository.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportResult {
    pub org: String,
    pub repo: String,
    pub contributions: Vec<Contribution>,
}

impl ReportResult {
    /// `<title> (<diff file name>)` for every contribution.
    ///
    /// Contributions without a SHA have no diff file and list the title only.
    pub fn lines(&self) -> Vec<String> {
        self.contributions
            .iter()
            .map(|c| match c.sha() {
                "" => c.title().to_string(),
                sha => format!(
                    "{} ({})",
                    c.title(),
                    build_diff_filename(sha, &self.org, &self.repo)
                ),
            })
            .collect()
    }
}

/// Orders results by `org/repo`.
pub fn sort_results(results: &mut [ReportResult]) {
    results.sort_by(|a, b| (&a.org, &a.repo).cmp(&(&b.org, &b.repo)));
}

/// Values available to report layouts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportValues {
    pub period_from: String,
    pub period_till: String,

    /// The day after the period ends
    pub approval_date: String,
    pub result: Vec<String>,
    pub extra_fields: BTreeMap<String, String>,
}

impl ReportValues {
    /// Formats the period in the time zone of the given bounds.
    pub fn new<Tz>(
        since: &DateTime<Tz>,
        until: &DateTime<Tz>,
        results: &[ReportResult],
        extra_fields: BTreeMap<String, String>,
    ) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        let approval = until.clone() + chrono::Duration::hours(24);
        Self {
            period_from: since.format(PERIOD_FORMAT).to_string(),
            period_till: until.format(PERIOD_FORMAT).to_string(),
            approval_date: approval.format(PERIOD_FORMAT).to_string(),
            result: results.iter().flat_map(ReportResult::lines).collect(),
            extra_fields,
        }
    }

    fn lookup(&self, key: &str) -> Option<String> {
        match key {
            PERIOD_FROM_KEY => Some(self.period_from.clone()),
            PERIOD_TILL_KEY => Some(self.period_till.clone()),
            APPROVAL_DATE_KEY => Some(self.approval_date.clone()),
            RESULT_KEY => Some(self.result.iter().map(|line| format!("- {}\n", line)).collect()),
            _ => self.extra_fields.get(key).cloned(),
        }
    }
}

/// The default text report.
pub fn render_default(values: &ReportValues) -> String {
    let result: String = values
        .result
        .iter()
        .map(|line| format!("\n- {}", line))
        .collect();

    formatdoc!(
        "
        period:
        {from} - {till}

        approvalDate:
        {approval}

        result:
        {result}
        ",
        from = values.period_from,
        till = values.period_till,
        approval = values.approval_date,
        result = result,
    )
}

/// Replaces the known placeholders of `template`.
pub fn render_template(template: &str, values: &ReportValues) -> String {
    PLACEHOLDER_REGEX
        .replace_all(template, |caps: &Captures| {
            values
                .lookup(&caps[1])
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Renders the report into `dir` and returns the written file.
#[instrument(skip(values))]
pub async fn render_to_dir(
    dir: &Path,
    template: Option<&Path>,
    values: &ReportValues,
) -> Result<PathBuf, PkupError> {
    let (filename, content) = match template {
        Some(path) => {
            let source = tokio::fs::read_to_string(path).await.map_err(|e| {
                PkupError::Report(format!("failed to read template '{}': {}", path.display(), e))
            })?;
            let filename = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .ok_or_else(|| {
                    PkupError::Report(format!("template path '{}' has no file name", path.display()))
                })?;
            (filename, render_template(&source, values))
        }
        None => (DEFAULT_REPORT_FILE.to_string(), render_default(values)),
    };

    let written = write_file(dir, &filename, &content).await?;
    debug!(path = %written.display(), lines = values.result.len(), "Rendered report");
    Ok(written)
}
