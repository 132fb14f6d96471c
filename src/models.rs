use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum WorkMode {
    Remote,
    Hybrid,
    Onsite,
}

impl WorkMode {
    pub const ALL: [WorkMode; 3] = [WorkMode::Remote, WorkMode::Hybrid, WorkMode::Onsite];

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkMode::Remote => "Remote",
            WorkMode::Hybrid => "Hybrid",
            WorkMode::Onsite => "Onsite",
        }
    }
}

impl fmt::Display for WorkMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for WorkMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "remote" => Ok(WorkMode::Remote),
            "hybrid" => Ok(WorkMode::Hybrid),
            "onsite" | "on-site" => Ok(WorkMode::Onsite),
            other => Err(format!("unknown work mode '{}' (remote, hybrid, onsite)", other)),
        }
    }
}

/// A posting from the catalog. Never mutated after load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: String,
    pub title: String,
    pub company: String,
    pub location: String,
    pub mode: WorkMode,
    pub experience: String, // "Fresher", "0-1 Years", "1-3 Years", ...
    pub skills: Vec<String>,
    pub source: String, // "LinkedIn", "Naukri", "Indeed", ...
    pub posted_days_ago: u32,
    pub salary_range: String,
    pub apply_url: String,
    pub description: String,
}

/// The user's matching profile. Replaced wholesale on save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Preferences {
    pub role_keywords: Vec<String>,
    pub preferred_locations: Vec<String>,
    pub preferred_mode: Vec<WorkMode>,
    pub experience_level: String, // empty = unset
    pub skills: Vec<String>,
    pub min_match_score: u8,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            role_keywords: Vec::new(),
            preferred_locations: Vec::new(),
            preferred_mode: Vec::new(),
            experience_level: String::new(),
            skills: Vec::new(),
            min_match_score: 40,
        }
    }
}

impl Preferences {
    /// Adds the mode if absent, removes it if present. Keeps insertion order.
    pub fn toggle_mode(&mut self, mode: WorkMode) {
        if let Some(pos) = self.preferred_mode.iter().position(|m| *m == mode) {
            self.preferred_mode.remove(pos);
        } else {
            self.preferred_mode.push(mode);
        }
    }

    pub fn set_min_match_score(&mut self, score: i64) {
        self.min_match_score = score.clamp(0, 100) as u8;
    }
}

/// Splits comma-separated form input into trimmed, non-empty entries.
pub fn parse_list(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchColor {
    Green,
    Amber,
    Neutral,
    Grey,
}

impl MatchColor {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchColor::Green => "green",
            MatchColor::Amber => "amber",
            MatchColor::Neutral => "neutral",
            MatchColor::Grey => "grey",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    pub score: u8,
    pub color: MatchColor,
}

/// A job paired with its score, as persisted inside a digest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredJob {
    #[serde(flatten)]
    pub job: Job,
    pub match_result: MatchResult,
}

/// Top matches generated for one calendar day.
#[derive(Debug, Clone, PartialEq)]
pub struct Digest {
    pub date: NaiveDate,
    pub entries: Vec<ScoredJob>,
}

impl Digest {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum JobStatus {
    #[default]
    #[serde(rename = "Not Applied")]
    NotApplied,
    Applied,
    Rejected,
    Selected,
}

impl JobStatus {
    pub const ALL: [JobStatus; 4] = [
        JobStatus::NotApplied,
        JobStatus::Applied,
        JobStatus::Rejected,
        JobStatus::Selected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::NotApplied => "Not Applied",
            JobStatus::Applied => "Applied",
            JobStatus::Rejected => "Rejected",
            JobStatus::Selected => "Selected",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphabetic())
            .collect();
        match normalized.as_str() {
            "notapplied" => Ok(JobStatus::NotApplied),
            "applied" => Ok(JobStatus::Applied),
            "rejected" => Ok(JobStatus::Rejected),
            "selected" => Ok(JobStatus::Selected),
            _ => Err(format!(
                "unknown status '{}' (not-applied, applied, rejected, selected)",
                s
            )),
        }
    }
}

/// Latest status for a job. Overwritten on every change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRecord {
    pub status: JobStatus,
    pub date: DateTime<Utc>,
}

pub type StatusMap = BTreeMap<String, StatusRecord>;
