use regex::Regex;
use std::sync::LazyLock;

use crate::models::{Job, MatchColor, MatchResult, Preferences};

const TITLE_KEYWORD_POINTS: u32 = 25;
const DESCRIPTION_KEYWORD_POINTS: u32 = 15;
const LOCATION_POINTS: u32 = 15;
const MODE_POINTS: u32 = 10;
const EXPERIENCE_POINTS: u32 = 10;
const SKILL_POINTS: u32 = 15;
const RECENCY_POINTS: u32 = 5;
const LINKEDIN_POINTS: u32 = 5;

const RECENT_DAYS: u32 = 2;
pub const MAX_SCORE: u8 = 100;

static RE_DIGITS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?-u:\d)+").unwrap());

/// Scores a job against the user's preferences.
///
/// Every rule adds points independently; the total is capped at 100. Without
/// preferences the result is always 0/grey.
pub fn calculate_match_score(job: &Job, prefs: Option<&Preferences>) -> MatchResult {
    let Some(prefs) = prefs else {
        return MatchResult {
            score: 0,
            color: MatchColor::Grey,
        };
    };

    let mut score: u32 = 0;

    if any_substring(&prefs.role_keywords, &job.title) {
        score += TITLE_KEYWORD_POINTS;
    }
    if any_substring(&prefs.role_keywords, &job.description) {
        score += DESCRIPTION_KEYWORD_POINTS;
    }
    if any_substring(&prefs.preferred_locations, &job.location) {
        score += LOCATION_POINTS;
    }
    if prefs.preferred_mode.contains(&job.mode) {
        score += MODE_POINTS;
    }
    if job.experience == prefs.experience_level {
        score += EXPERIENCE_POINTS;
    }
    if skills_overlap(&job.skills, &prefs.skills) {
        score += SKILL_POINTS;
    }
    if job.posted_days_ago <= RECENT_DAYS {
        score += RECENCY_POINTS;
    }
    if job.source == "LinkedIn" {
        score += LINKEDIN_POINTS;
    }

    let score = score.min(MAX_SCORE as u32) as u8;
    MatchResult {
        score,
        color: score_color(score),
    }
}

pub fn score_color(score: u8) -> MatchColor {
    match score {
        80.. => MatchColor::Green,
        60..=79 => MatchColor::Amber,
        40..=59 => MatchColor::Neutral,
        _ => MatchColor::Grey,
    }
}

// Blank entries never match; otherwise a case-insensitive substring check.
fn any_substring(needles: &[String], haystack: &str) -> bool {
    let haystack = haystack.to_lowercase();
    needles.iter().any(|needle| {
        let needle = needle.trim();
        !needle.is_empty() && haystack.contains(&needle.to_lowercase())
    })
}

fn skills_overlap(job_skills: &[String], wanted: &[String]) -> bool {
    let job_skills: Vec<String> = job_skills.iter().map(|s| s.trim().to_lowercase()).collect();
    wanted.iter().any(|skill| {
        let skill = skill.trim().to_lowercase();
        !skill.is_empty() && job_skills.contains(&skill)
    })
}

/// Largest number embedded in a salary string, or 0 when it has no digits.
/// Runs too long for a u64 saturate.
pub fn max_salary(salary_range: &str) -> u64 {
    RE_DIGITS
        .find_iter(salary_range)
        .map(|m| m.as_str().parse::<u64>().unwrap_or(u64::MAX))
        .max()
        .unwrap_or(0)
}
