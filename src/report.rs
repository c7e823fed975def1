use chrono::NaiveDate;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::error::ReportError;
use crate::format::format_duration;
use crate::session::{SessionEntry, SubjectId};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    clap::ValueEnum,
    strum_macros::Display,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Csv,
    Json,
}

impl ReportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Csv => "csv",
            ReportFormat::Json => "json",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayTotal {
    pub day: NaiveDate,
    pub total_ms: u64,
    pub sessions: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectTotal {
    pub subject_id: SubjectId,
    pub total_ms: u64,
    pub sessions: usize,
}

/// Aggregates over a snapshot of the session log
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudyReport {
    pub total_ms: u64,
    pub session_count: usize,
    pub mean_session_ms: Option<f64>,
    /// ascending by local date
    pub days: Vec<DayTotal>,
    /// longest total first
    pub subjects: Vec<SubjectTotal>,
    pub sessions: Vec<SessionEntry>,
}

impl StudyReport {
    pub fn from_entries(entries: &[SessionEntry]) -> Self {
        let total_ms: u64 = entries.iter().map(|e| e.elapsed_ms).sum();
        let session_count = entries.len();
        let mean_session_ms = match session_count {
            0 => None,
            n => Some(total_ms as f64 / n as f64),
        };

        let mut by_day: BTreeMap<NaiveDate, (u64, usize)> = BTreeMap::new();
        for entry in entries {
            let slot = by_day.entry(entry.started_at.date_naive()).or_default();
            slot.0 += entry.elapsed_ms;
            slot.1 += 1;
        }
        let days = by_day
            .into_iter()
            .map(|(day, (total_ms, sessions))| DayTotal {
                day,
                total_ms,
                sessions,
            })
            .collect();

        let subjects = entries
            .iter()
            .into_group_map_by(|e| e.subject_id.clone())
            .into_iter()
            .map(|(subject_id, group)| SubjectTotal {
                subject_id,
                total_ms: group.iter().map(|e| e.elapsed_ms).sum(),
                sessions: group.len(),
            })
            .sorted_by(|a, b| {
                b.total_ms
                    .cmp(&a.total_ms)
                    .then_with(|| a.subject_id.cmp(&b.subject_id))
            })
            .collect();

        Self {
            total_ms,
            session_count,
            mean_session_ms,
            days,
            subjects,
            sessions: entries.to_vec(),
        }
    }

    pub fn total_for_day(&self, day: NaiveDate) -> u64 {
        self.days
            .iter()
            .find(|d| d.day == day)
            .map_or(0, |d| d.total_ms)
    }

    /// One CSV row per session
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), ReportError> {
        let mut wtr = csv::Writer::from_writer(writer);
        for session in &self.sessions {
            wtr.serialize(session)?;
        }
        wtr.flush()?;
        Ok(())
    }

    pub fn write_json<W: Write>(&self, writer: W) -> Result<(), ReportError> {
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    pub fn write<W: Write>(&self, format: ReportFormat, writer: W) -> Result<(), ReportError> {
        match format {
            ReportFormat::Csv => self.write_csv(writer),
            ReportFormat::Json => self.write_json(writer),
        }
    }

    pub fn save<P: AsRef<Path>>(&self, format: ReportFormat, path: P) -> Result<(), ReportError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        self.write(format, file)?;
        tracing::info!(path = %path.display(), %format, "report written");
        Ok(())
    }

    /// Short plain-text summary for terminals
    pub fn summary(&self) -> String {
        let mut out = format!(
            "{} sessions, {} total",
            self.session_count,
            format_duration(self.total_ms)
        );
        for day in &self.days {
            out.push_str(&format!(
                "\n  {}  {} ({} sessions)",
                day.day,
                format_duration(day.total_ms),
                day.sessions
            ));
        }
        for subject in &self.subjects {
            out.push_str(&format!(
                "\n  {}  {} ({} sessions)",
                subject.subject_id,
                format_duration(subject.total_ms),
                subject.sessions
            ));
        }
        out
    }
}
