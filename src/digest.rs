//! Daily top-N digest.
//!
//! Selection is a pure function of the catalog and preferences. The
//! [`DigestGenerator`] adds per-day persistence and the simulated latency of
//! the "9AM" run.

use chrono::NaiveDate;
use std::time::Duration;
use tracing::info;

use crate::catalog::Catalog;
use crate::models::{Digest, Job, Preferences, ScoredJob};
use crate::pipeline::by_match;
use crate::scoring::calculate_match_score;
use crate::store::{Store, StoreError};

pub const DIGEST_SIZE: usize = 10;
pub const DEFAULT_LATENCY: Duration = Duration::from_millis(800);

/// Best matches above the threshold, highest score first.
///
/// The threshold never drops below 1, so a zero minimum still leaves out
/// jobs that matched nothing.
pub fn select_digest(jobs: &[Job], prefs: &Preferences) -> Vec<ScoredJob> {
    let threshold = prefs.min_match_score.max(1);

    let mut candidates: Vec<ScoredJob> = jobs
        .iter()
        .map(|job| ScoredJob {
            job: job.clone(),
            match_result: calculate_match_score(job, Some(prefs)),
        })
        .filter(|scored| scored.match_result.score >= threshold)
        .collect();

    candidates.sort_by(|a, b| {
        by_match(a.match_result.score, &a.job, b.match_result.score, &b.job)
    });
    candidates.truncate(DIGEST_SIZE);
    candidates
}

/// `None` when no preferences are configured.
pub fn generate_digest(
    jobs: &[Job],
    prefs: Option<&Preferences>,
    day: NaiveDate,
) -> Option<Digest> {
    let prefs = prefs?;
    Some(Digest {
        date: day,
        entries: select_digest(jobs, prefs),
    })
}

#[derive(Debug, Clone, PartialEq)]
pub enum DigestOutcome {
    /// Computed by this call and persisted.
    Generated(Digest),
    /// Read back from an earlier run for the same day.
    Stored(Digest),
    PreferencesRequired,
}

impl DigestOutcome {
    pub fn digest(&self) -> Option<&Digest> {
        match self {
            DigestOutcome::Generated(digest) | DigestOutcome::Stored(digest) => Some(digest),
            DigestOutcome::PreferencesRequired => None,
        }
    }
}

pub type DelayHook = Box<dyn Fn(Duration)>;

pub struct DigestGenerator<'a, S: Store + ?Sized> {
    store: &'a S,
    catalog: &'a Catalog,
    latency: Duration,
    delay: DelayHook,
}

impl<'a, S: Store + ?Sized> DigestGenerator<'a, S> {
    pub fn new(store: &'a S, catalog: &'a Catalog) -> Self {
        Self {
            store,
            catalog,
            latency: DEFAULT_LATENCY,
            delay: Box::new(std::thread::sleep),
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    #[cfg(test)]
    pub fn with_delay_hook(mut self, delay: DelayHook) -> Self {
        self.delay = delay;
        self
    }

    pub fn load(&self, day: NaiveDate) -> Option<Digest> {
        self.store.load_digest(day)
    }

    /// Recomputes the day's digest and overwrites whatever was stored.
    pub fn trigger(&self, day: NaiveDate) -> Result<DigestOutcome, StoreError> {
        let prefs = self.store.load_preferences();
        if prefs.is_some() && !self.latency.is_zero() {
            (self.delay)(self.latency);
        }

        let Some(digest) = generate_digest(self.catalog.jobs(), prefs.as_ref(), day) else {
            info!(%day, "digest skipped, no preferences configured");
            return Ok(DigestOutcome::PreferencesRequired);
        };
        self.store.save_digest(day, &digest)?;
        info!(%day, entries = digest.len(), "digest generated");
        Ok(DigestOutcome::Generated(digest))
    }

    /// Returns the stored digest for the day, generating it only when none
    /// exists or `regenerate` is set.
    pub fn today(&self, day: NaiveDate, regenerate: bool) -> Result<DigestOutcome, StoreError> {
        if !regenerate {
            if let Some(digest) = self.load(day) {
                return Ok(DigestOutcome::Stored(digest));
            }
        }
        self.trigger(day)
    }
}

pub fn digest_subject(date: NaiveDate) -> String {
    format!("My 9AM Job Digest - {}", date.format("%Y-%m-%d"))
}

/// Clipboard-style text export.
pub fn render_plain_text(digest: &Digest) -> String {
    let body = digest
        .entries
        .iter()
        .map(|d| {
            format!(
                "Role: {}\nCompany: {}\nMatch: {}%\nLink: {}",
                d.job.title, d.job.company, d.match_result.score, d.job.apply_url
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");
    format!(
        "{}\n-----------------------------\n\n{}",
        digest_subject(digest.date),
        body
    )
}

/// `mailto:` link that opens a draft of the digest.
pub fn mailto_draft(digest: &Digest) -> String {
    let body = digest
        .entries
        .iter()
        .map(|d| {
            format!(
                "{} @ {} ({}% Match)\r\n{} | {}\r\n",
                d.job.title, d.job.company, d.match_result.score, d.job.location, d.job.experience
            )
        })
        .collect::<Vec<_>>()
        .join("\r\n");
    format!(
        "mailto:?subject={}&body={}",
        percent_encode(&digest_subject(digest.date)),
        percent_encode(&body)
    )
}

fn percent_encode(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WorkMode;
    use crate::store::MemoryStore;
    use std::cell::Cell;
    use std::rc::Rc;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
    }

    fn job(id: &str, title: &str, days: u32) -> Job {
        Job {
            id: id.to_string(),
            title: title.to_string(),
            company: format!("Company {}", id),
            location: "Pune".to_string(),
            mode: WorkMode::Onsite,
            experience: "3-5 Years".to_string(),
            skills: vec![],
            source: "Naukri".to_string(),
            posted_days_ago: days,
            salary_range: String::new(),
            apply_url: format!("https://jobs.example.com/{}", id),
            description: String::new(),
        }
    }

    fn rust_prefs(min: u8) -> Preferences {
        Preferences {
            role_keywords: vec!["rust".to_string()],
            min_match_score: min,
            ..Preferences::default()
        }
    }

    fn no_wait<S: Store + ?Sized>(generator: DigestGenerator<'_, S>) -> DigestGenerator<'_, S> {
        generator.with_delay_hook(Box::new(|_| {}))
    }

    #[test]
    fn test_requires_preferences() {
        assert!(generate_digest(&[job("1", "Rust", 0)], None, day()).is_none());

        let store = MemoryStore::new();
        let catalog = Catalog::builtin().unwrap();
        let generator = no_wait(DigestGenerator::new(&store, &catalog));
        assert_eq!(generator.trigger(day()).unwrap(), DigestOutcome::PreferencesRequired);
        assert!(generator.load(day()).is_none());
    }

    #[test]
    fn test_zero_threshold_still_excludes_zero_scores() {
        let jobs = vec![job("1", "Rust Dev", 9), job("2", "Painter", 9)];
        let digest = generate_digest(&jobs, Some(&rust_prefs(0)), day()).unwrap();
        let ids: Vec<&str> = digest.entries.iter().map(|d| d.job.id.as_str()).collect();
        assert_eq!(ids, vec!["1"]);
    }

    #[test]
    fn test_threshold_applies() {
        let jobs = vec![job("1", "Rust Dev", 9), job("2", "Rust Dev", 1)];
        // "2" scores 25 + 5 for recency
        let digest = generate_digest(&jobs, Some(&rust_prefs(30)), day()).unwrap();
        assert_eq!(digest.len(), 1);
        assert_eq!(digest.entries[0].job.id, "2");
        assert_eq!(digest.entries[0].match_result.score, 30);
    }

    #[test]
    fn test_empty_candidates_is_valid_digest() {
        let jobs = vec![job("1", "Painter", 9)];
        let digest = generate_digest(&jobs, Some(&rust_prefs(0)), day()).unwrap();
        assert!(digest.is_empty());
        assert_eq!(digest.date, day());
    }

    #[test]
    fn test_top_ten_sorted_with_freshness_tie_break() {
        let mut jobs = Vec::new();
        for i in 0..15u32 {
            // alternate matching titles; days descending so ties need the tie-break
            let title = if i % 3 == 0 { "Painter" } else { "Rust Engineer" };
            jobs.push(job(&i.to_string(), title, 20 - i));
        }
        let prefs = Preferences {
            role_keywords: vec!["rust".to_string(), "painter".to_string()],
            ..rust_prefs(0)
        };
        let mut richer = jobs.clone();
        richer[3].source = "LinkedIn".to_string();
        let entries = select_digest(&richer, &prefs);

        assert_eq!(entries.len(), DIGEST_SIZE);
        assert_eq!(entries[0].job.id, "3");
        for pair in entries.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            assert!(a.match_result.score >= b.match_result.score);
            if a.match_result.score == b.match_result.score {
                assert!(a.job.posted_days_ago <= b.job.posted_days_ago);
            }
        }

        let tenth = entries.last().unwrap().match_result.score;
        let kept: Vec<&str> = entries.iter().map(|e| e.job.id.as_str()).collect();
        for excluded in richer.iter().filter(|j| !kept.contains(&j.id.as_str())) {
            assert!(calculate_match_score(excluded, Some(&prefs)).score <= tenth);
        }
    }

    #[test]
    fn test_stored_digest_survives_preference_changes() {
        let store = MemoryStore::new();
        let catalog = Catalog::builtin().unwrap();
        store
            .save_preferences(&Preferences {
                role_keywords: vec!["Frontend".to_string()],
                min_match_score: 0,
                ..Preferences::default()
            })
            .unwrap();

        let generator = no_wait(DigestGenerator::new(&store, &catalog));
        let first = match generator.today(day(), false).unwrap() {
            DigestOutcome::Generated(digest) => digest,
            other => panic!("expected a fresh digest, got {:?}", other),
        };
        assert!(!first.is_empty());
        let persisted = store.get_raw(&crate::store::digest_key(day())).unwrap();

        store
            .save_preferences(&Preferences {
                role_keywords: vec!["Machine Learning".to_string()],
                ..Preferences::default()
            })
            .unwrap();

        assert_eq!(
            generator.today(day(), false).unwrap(),
            DigestOutcome::Stored(first.clone())
        );
        assert_eq!(store.get_raw(&crate::store::digest_key(day())).unwrap(), persisted);

        // An explicit trigger recomputes with the new preferences.
        let regenerated = generator.today(day(), true).unwrap();
        let regenerated = regenerated.digest().unwrap();
        assert_ne!(regenerated, &first);
        assert_eq!(generator.load(day()).as_ref(), Some(regenerated));
    }

    #[test]
    fn test_trigger_is_deterministic() {
        let store = MemoryStore::new();
        let catalog = Catalog::builtin().unwrap();
        store.save_preferences(&rust_prefs(0)).unwrap();
        let generator = no_wait(DigestGenerator::new(&store, &catalog));
        let key = crate::store::digest_key(day());

        generator.trigger(day()).unwrap();
        let first = store.get_raw(&key).unwrap();
        generator.trigger(day()).unwrap();
        assert_eq!(store.get_raw(&key).unwrap(), first);
    }

    #[test]
    fn test_delay_hook_receives_latency() {
        let store = MemoryStore::new();
        let catalog = Catalog::builtin().unwrap();
        store.save_preferences(&rust_prefs(0)).unwrap();

        let waited = Rc::new(Cell::new(Duration::ZERO));
        let seen = Rc::clone(&waited);
        let generator = DigestGenerator::new(&store, &catalog)
            .with_latency(Duration::from_millis(250))
            .with_delay_hook(Box::new(move |d| seen.set(d)));
        generator.trigger(day()).unwrap();
        assert_eq!(waited.get(), Duration::from_millis(250));

        // zero latency skips the hook entirely
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let generator = DigestGenerator::new(&store, &catalog)
            .with_latency(Duration::ZERO)
            .with_delay_hook(Box::new(move |_| counter.set(counter.get() + 1)));
        generator.trigger(day()).unwrap();
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn test_plain_text_export() {
        let jobs = [job("1", "Rust Dev", 9)];
        let digest = generate_digest(&jobs, Some(&rust_prefs(0)), day()).unwrap();
        let text = render_plain_text(&digest);
        assert!(text.starts_with(
            "My 9AM Job Digest - 2026-10-16\n-----------------------------\n\n"
        ));
        assert!(text.contains(
            "Role: Rust Dev\nCompany: Company 1\nMatch: 25%\nLink: https://jobs.example.com/1"
        ));
    }

    #[test]
    fn test_mailto_draft() {
        let jobs = [job("1", "Rust Dev", 9)];
        let digest = generate_digest(&jobs, Some(&rust_prefs(0)), day()).unwrap();
        let url = mailto_draft(&digest);
        assert!(url.starts_with("mailto:?subject=My%209AM%20Job%20Digest%20-%202026-10-16&body="));
        let body = concat!(
            "Rust%20Dev%20%40%20Company%201%20%2825%25%20Match%29%0D%0A",
            "Pune%20%7C%203-5%20Years%0D%0A"
        );
        assert!(url.contains(body));
    }
}
