//! Filter and sort the catalog for browsing.
//!
//! A plain function of its inputs: callers rerun [`process_jobs`] whenever any
//! criterion, the preferences, or the status map changes.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use crate::models::{Job, JobStatus, MatchResult, Preferences, StatusMap, WorkMode};
use crate::scoring::{calculate_match_score, max_salary};
use crate::status::current_status;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    Latest,
    Match,
    Salary,
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "latest" => Ok(SortKey::Latest),
            "match" => Ok(SortKey::Match),
            "salary" => Ok(SortKey::Salary),
            other => Err(format!("unknown sort '{}' (latest, match, salary)", other)),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            SortKey::Latest => "latest",
            SortKey::Match => "match",
            SortKey::Salary => "salary",
        })
    }
}

/// Ad hoc criteria from the browsing view. `None` means "all".
#[derive(Debug, Clone, Default)]
pub struct FilterCriteria {
    pub search: Option<String>,
    pub location: Option<String>,
    pub experience: Option<String>,
    pub mode: Option<WorkMode>,
    pub source: Option<String>,
    pub status: Option<JobStatus>,
    pub matches_only: bool,
    pub sort: SortKey,
}

/// A catalog entry as displayed. `match_result` is `None` when no
/// preferences are configured.
#[derive(Debug, Clone, PartialEq)]
pub struct ListedJob<'a> {
    pub job: &'a Job,
    pub match_result: Option<MatchResult>,
}

impl ListedJob<'_> {
    fn score(&self) -> u8 {
        self.match_result.map(|m| m.score).unwrap_or(0)
    }
}

pub fn process_jobs<'a>(
    jobs: &'a [Job],
    prefs: Option<&Preferences>,
    statuses: &StatusMap,
    criteria: &FilterCriteria,
) -> Vec<ListedJob<'a>> {
    let Some(prefs) = prefs else {
        return jobs
            .iter()
            .map(|job| ListedJob {
                job,
                match_result: None,
            })
            .collect();
    };

    let mut result: Vec<ListedJob<'a>> = jobs
        .iter()
        .map(|job| ListedJob {
            job,
            match_result: Some(calculate_match_score(job, Some(prefs))),
        })
        .collect();

    if criteria.matches_only {
        result.retain(|listed| listed.score() >= prefs.min_match_score);
        debug!(
            remaining = result.len(),
            threshold = prefs.min_match_score,
            "matches-only filter"
        );
    }

    if let Some(term) = criteria.search.as_deref().filter(|t| !t.is_empty()) {
        let term = term.to_lowercase();
        result.retain(|listed| {
            listed.job.title.to_lowercase().contains(&term)
                || listed.job.company.to_lowercase().contains(&term)
        });
        debug!(remaining = result.len(), "search filter");
    }

    if let Some(location) = &criteria.location {
        let location = location.to_lowercase();
        result.retain(|listed| listed.job.location.to_lowercase().contains(&location));
    }
    if let Some(experience) = &criteria.experience {
        result.retain(|listed| &listed.job.experience == experience);
    }
    if let Some(mode) = criteria.mode {
        result.retain(|listed| listed.job.mode == mode);
    }
    if let Some(source) = &criteria.source {
        result.retain(|listed| &listed.job.source == source);
    }
    if let Some(status) = criteria.status {
        result.retain(|listed| current_status(statuses, &listed.job.id) == status);
    }

    sort_listed(&mut result, criteria.sort);
    debug!(count = result.len(), sort = %criteria.sort, "pipeline complete");
    result
}

fn sort_listed(result: &mut [ListedJob<'_>], key: SortKey) {
    match key {
        SortKey::Match => result.sort_by(|a, b| by_match(a.score(), a.job, b.score(), b.job)),
        SortKey::Salary => result.sort_by(|a, b| {
            max_salary(&b.job.salary_range).cmp(&max_salary(&a.job.salary_range))
        }),
        SortKey::Latest => result.sort_by_key(|listed| listed.job.posted_days_ago),
    }
}

/// Score descending, then fresher postings first.
pub fn by_match(a_score: u8, a: &Job, b_score: u8, b: &Job) -> Ordering {
    b_score
        .cmp(&a_score)
        .then_with(|| a.posted_days_ago.cmp(&b.posted_days_ago))
}
