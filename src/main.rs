mod catalog;
mod config;
mod db;
mod digest;
mod models;
mod pipeline;
mod saved;
mod scoring;
mod status;
mod store;

use anyhow::{Context, Result, anyhow};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing::warn;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use catalog::Catalog;
use config::Config;
use db::Database;
use digest::{DigestGenerator, mailto_draft, render_plain_text};
use models::{Digest, JobStatus, MatchResult, Preferences, WorkMode, parse_list};
use pipeline::{FilterCriteria, SortKey, process_jobs};
use status::{RECENT_UPDATES_LIMIT, StatusTracker, current_status, recent_updates, status_record};
use store::Store;

#[derive(Parser)]
#[command(name = "jobdigest")]
#[command(about = "Match job postings against your preferences and track applications")]
struct Cli {
    /// Database path (overrides JOBDIGEST_DB)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Catalog JSON file (overrides JOBDIGEST_CATALOG)
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database
    Init,

    /// Show or edit matching preferences
    Prefs {
        #[command(subcommand)]
        command: PrefsCommands,
    },

    /// Browse jobs with filters
    Jobs {
        /// Search title or company
        #[arg(short = 'q', long)]
        search: Option<String>,

        /// Location substring (e.g. bangalore, remote)
        #[arg(short, long)]
        location: Option<String>,

        /// Exact experience level (e.g. "1-3 Years")
        #[arg(short, long)]
        experience: Option<String>,

        /// Work mode (remote, hybrid, onsite)
        #[arg(short, long)]
        mode: Option<WorkMode>,

        /// Exact source (e.g. LinkedIn, Naukri)
        #[arg(long)]
        source: Option<String>,

        /// Application status (not-applied, applied, rejected, selected)
        #[arg(short, long)]
        status: Option<JobStatus>,

        /// Only jobs at or above your minimum match score
        #[arg(long)]
        matches_only: bool,

        /// Sort order (latest, match, salary)
        #[arg(long, default_value = "latest")]
        sort: SortKey,
    },

    /// List the values accepted by the jobs filters
    Filters,

    /// Show job details
    Show {
        /// Job ID
        id: String,
    },

    /// Set the application status of a job
    Status {
        /// Job ID
        id: String,

        /// New status (not-applied, applied, rejected, selected)
        status: JobStatus,
    },

    /// Save or unsave a job
    Save {
        /// Job ID
        id: String,
    },

    /// List saved jobs
    Saved,

    /// Show today's digest, generating it if needed
    Digest {
        /// Digest date (YYYY-MM-DD), defaults to today
        #[arg(short, long)]
        date: Option<NaiveDate>,

        /// Recompute even if a digest exists for the date
        #[arg(long)]
        regenerate: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = DigestFormat::Table)]
        format: DigestFormat,
    },

    /// List dates with a stored digest
    Digests,

    /// Show recent status changes
    Updates {
        /// Number of updates to show
        #[arg(short, long, default_value_t = RECENT_UPDATES_LIMIT)]
        limit: usize,
    },
}

#[derive(Subcommand)]
enum PrefsCommands {
    /// Show current preferences
    Show,

    /// Update preferences (unspecified fields keep their value)
    Set {
        /// Role keywords, comma-separated
        #[arg(long)]
        keywords: Option<String>,

        /// Preferred locations, comma-separated
        #[arg(long)]
        locations: Option<String>,

        /// Preferred work modes, comma-separated (remote, hybrid, onsite)
        #[arg(long)]
        modes: Option<String>,

        /// Toggle a single work mode
        #[arg(long)]
        toggle_mode: Option<WorkMode>,

        /// Experience level; empty to unset
        #[arg(long)]
        experience: Option<String>,

        /// Skills, comma-separated
        #[arg(long)]
        skills: Option<String>,

        /// Minimum match score (0-100)
        #[arg(long, allow_negative_numbers = true)]
        min_score: Option<i64>,
    },

    /// Remove saved preferences
    Clear,
}

#[derive(Clone, Copy, ValueEnum)]
enum DigestFormat {
    Table,
    Text,
    Mailto,
}

fn ensure_initialized(db: &Database) -> Result<()> {
    if !db.is_initialized()? {
        return Err(anyhow!("Database not initialized. Run 'jobdigest init' first."));
    }
    Ok(())
}

fn load_catalog(config: &Config) -> Result<Catalog> {
    let catalog = match &config.catalog_path {
        Some(path) => Catalog::from_path(path)?,
        None => Catalog::builtin()?,
    };
    if catalog.is_empty() {
        warn!("catalog contains no jobs");
    }
    Ok(catalog)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?.with_overrides(cli.db, cli.catalog);

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.log_level))
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let db = Database::open(&config.db_path)
        .with_context(|| format!("Failed to open database at {}", config.db_path.display()))?;

    let ready = || -> Result<Catalog> {
        ensure_initialized(&db)?;
        load_catalog(&config)
    };

    match cli.command {
        Commands::Init => {
            db.init()?;
            println!("Database initialized at {}", db.path().display());
        }

        Commands::Prefs { command } => {
            ensure_initialized(&db)?;
            match command {
                PrefsCommands::Show => match db.load_preferences() {
                    Some(prefs) => print_preferences(&prefs),
                    None => println!(
                        "No preferences set. Use 'jobdigest prefs set' to configure matching."
                    ),
                },

                PrefsCommands::Set {
                    keywords,
                    locations,
                    modes,
                    toggle_mode,
                    experience,
                    skills,
                    min_score,
                } => {
                    let mut prefs = db.load_preferences().unwrap_or_default();
                    if let Some(keywords) = keywords {
                        prefs.role_keywords = parse_list(&keywords);
                    }
                    if let Some(locations) = locations {
                        prefs.preferred_locations = parse_list(&locations);
                    }
                    if let Some(modes) = modes {
                        let mut parsed: Vec<WorkMode> = Vec::new();
                        for mode in parse_list(&modes) {
                            let mode: WorkMode = mode.parse().map_err(|e: String| anyhow!(e))?;
                            if !parsed.contains(&mode) {
                                parsed.push(mode);
                            }
                        }
                        prefs.preferred_mode = parsed;
                    }
                    if let Some(mode) = toggle_mode {
                        prefs.toggle_mode(mode);
                    }
                    if let Some(experience) = experience {
                        prefs.experience_level = experience.trim().to_string();
                    }
                    if let Some(skills) = skills {
                        prefs.skills = parse_list(&skills);
                    }
                    if let Some(score) = min_score {
                        prefs.set_min_match_score(score);
                    }
                    db.save_preferences(&prefs)?;
                    println!("Preferences saved.");
                    print_preferences(&prefs);
                }

                PrefsCommands::Clear => {
                    db.clear_preferences()?;
                    println!("Preferences cleared.");
                }
            }
        }

        Commands::Jobs {
            search,
            location,
            experience,
            mode,
            source,
            status,
            matches_only,
            sort,
        } => {
            let catalog = ready()?;
            let prefs = db.load_preferences();
            let statuses = db.load_status_map();
            let criteria = FilterCriteria {
                search,
                location,
                experience,
                mode,
                source,
                status,
                matches_only,
                sort,
            };
            let listed = process_jobs(catalog.jobs(), prefs.as_ref(), &statuses, &criteria);

            if prefs.is_none() {
                println!(
                    "Set your preferences to activate intelligent matching: jobdigest prefs set\n"
                );
            }

            if listed.is_empty() {
                println!("No roles match your criteria. Adjust filters or lower your threshold.");
            } else {
                println!(
                    "{:<5} {:<6} {:<30} {:<18} {:<12} {:<8} {:<12}",
                    "ID", "MATCH", "TITLE", "COMPANY", "LOCATION", "POSTED", "STATUS"
                );
                println!("{}", "-".repeat(97));
                for item in &listed {
                    println!(
                        "{:<5} {:<6} {:<30} {:<18} {:<12} {:<8} {:<12}",
                        truncate(&item.job.id, 5),
                        format_match(item.match_result),
                        truncate(&item.job.title, 28),
                        truncate(&item.job.company, 16),
                        truncate(&item.job.location, 12),
                        format_posted(item.job.posted_days_ago),
                        current_status(&statuses, &item.job.id)
                    );
                }
                println!("\n{} of {} jobs", listed.len(), catalog.len());
            }
        }

        Commands::Filters => {
            let catalog = ready()?;
            let modes: Vec<&str> = WorkMode::ALL.iter().map(|m| m.as_str()).collect();
            let statuses: Vec<&str> = JobStatus::ALL.iter().map(|s| s.as_str()).collect();
            println!("Experience: {}", catalog.distinct(|job| job.experience.as_str()).join(", "));
            println!("Source:     {}", catalog.distinct(|job| job.source.as_str()).join(", "));
            println!("Location:   {}", catalog.distinct(|job| job.location.as_str()).join(", "));
            println!("Mode:       {}", modes.join(", "));
            println!("Status:     {}", statuses.join(", "));
            println!("Sort:       {}, {}, {}", SortKey::Latest, SortKey::Match, SortKey::Salary);
        }

        Commands::Show { id } => {
            let catalog = ready()?;
            match catalog.get(&id) {
                Some(job) => {
                    let prefs = db.load_preferences();
                    let statuses = db.load_status_map();

                    println!("Job #{}", job.id);
                    println!("Title: {}", job.title);
                    println!("Company: {}", job.company);
                    println!("Location: {} ({})", job.location, job.mode);
                    println!("Experience: {}", job.experience);
                    println!("Salary: {}", job.salary_range);
                    println!("Source: {} - {}", job.source, format_posted(job.posted_days_ago));
                    println!("Skills: {}", job.skills.join(", "));
                    if let Some(prefs) = &prefs {
                        let result = scoring::calculate_match_score(job, Some(prefs));
                        println!("Match: {}% ({})", result.score, result.color.as_str());
                    }
                    match status_record(&statuses, &job.id) {
                        Some(record) => println!(
                            "Status: {} (since {})",
                            record.status,
                            record.date.format("%Y-%m-%d %H:%M")
                        ),
                        None => println!("Status: {}", JobStatus::NotApplied),
                    }
                    if saved::is_saved(&db, &job.id) {
                        println!("Saved: yes");
                    }
                    println!("Apply: {}", job.apply_url);
                    println!("\n--- Description ---\n{}", textwrap::fill(&job.description, 78));
                }
                None => {
                    println!("Job #{} not found.", id);
                }
            }
        }

        Commands::Status { id, status } => {
            let catalog = ready()?;
            let job = catalog
                .get(&id)
                .ok_or_else(|| anyhow!("Job #{} not found", id))?;
            let tracker = StatusTracker::new(&db);
            let previous = tracker.get(&job.id);
            let record = tracker.update(&job.id, status)?;
            println!("Status updated: {} ({} -> {})", job.title, previous, record.status);
        }

        Commands::Save { id } => {
            let catalog = ready()?;
            let job = catalog
                .get(&id)
                .ok_or_else(|| anyhow!("Job #{} not found", id))?;
            if saved::toggle_saved(&db, &job.id)? {
                println!("Saved '{}'.", job.title);
            } else {
                println!("Removed '{}' from saved jobs.", job.title);
            }
        }

        Commands::Saved => {
            let catalog = ready()?;
            let jobs = saved::saved_jobs(&catalog, &db);
            if jobs.is_empty() {
                println!("No saved jobs. Use 'jobdigest save <id>' to bookmark one.");
            } else {
                println!(
                    "{:<5} {:<30} {:<18} {:<12} {:<16}",
                    "ID", "TITLE", "COMPANY", "MODE", "SALARY"
                );
                println!("{}", "-".repeat(85));
                for job in jobs {
                    println!(
                        "{:<5} {:<30} {:<18} {:<12} {:<16}",
                        truncate(&job.id, 5),
                        truncate(&job.title, 28),
                        truncate(&job.company, 16),
                        job.mode,
                        truncate(&job.salary_range, 16)
                    );
                }
            }
        }

        Commands::Digest {
            date,
            regenerate,
            format,
        } => {
            let catalog = ready()?;
            let day = date.unwrap_or_else(|| chrono::Local::now().date_naive());
            let generator =
                DigestGenerator::new(&db, &catalog).with_latency(config.digest_delay);

            if db.load_preferences().is_some() && (regenerate || generator.load(day).is_none()) {
                eprintln!("Generating digest for {}...", day);
            }

            let outcome = generator.today(day, regenerate)?;
            match outcome.digest() {
                None => {
                    println!(
                        "Preferences required. Run 'jobdigest prefs set' to generate a digest."
                    );
                }
                Some(digest) => match format {
                    DigestFormat::Table => print_digest(digest),
                    DigestFormat::Text => println!("{}", render_plain_text(digest)),
                    DigestFormat::Mailto => println!("{}", mailto_draft(digest)),
                },
            }

            if let DigestFormat::Table = format {
                print_recent_updates(&catalog, &db, RECENT_UPDATES_LIMIT);
            }
        }

        Commands::Digests => {
            ensure_initialized(&db)?;
            let keys = db.keys_with_prefix(store::DIGEST_KEY_PREFIX)?;
            if keys.is_empty() {
                println!("No digests generated yet.");
            }
            for key in keys {
                let Some(day) = key
                    .strip_prefix(store::DIGEST_KEY_PREFIX)
                    .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
                else {
                    continue;
                };
                let count = db.load_digest(day).map(|d| d.len()).unwrap_or(0);
                println!("{}  {} job(s)", day, count);
            }
        }

        Commands::Updates { limit } => {
            let catalog = ready()?;
            if !print_recent_updates(&catalog, &db, limit) {
                println!("No status updates yet.");
            }
        }
    }

    Ok(())
}

fn print_preferences(prefs: &Preferences) {
    let modes: Vec<&str> = prefs.preferred_mode.iter().map(|m| m.as_str()).collect();
    println!("Role keywords:   {}", or_dash(&prefs.role_keywords.join(", ")));
    println!("Locations:       {}", or_dash(&prefs.preferred_locations.join(", ")));
    println!("Work modes:      {}", or_dash(&modes.join(", ")));
    println!("Experience:      {}", or_dash(&prefs.experience_level));
    println!("Skills:          {}", or_dash(&prefs.skills.join(", ")));
    println!("Min match score: {}", prefs.min_match_score);
}

fn print_digest(digest: &Digest) {
    println!("{}", digest::digest_subject(digest.date));
    if digest.is_empty() {
        println!("No matching roles today. Check again tomorrow.");
        return;
    }
    println!(
        "{:<5} {:<6} {:<30} {:<18} {:<12} {:<10}",
        "RANK", "MATCH", "TITLE", "COMPANY", "LOCATION", "EXPERIENCE"
    );
    println!("{}", "-".repeat(86));
    for (i, entry) in digest.entries.iter().enumerate() {
        println!(
            "{:<5} {:<6} {:<30} {:<18} {:<12} {:<10}",
            i + 1,
            format_match(Some(entry.match_result)),
            truncate(&entry.job.title, 28),
            truncate(&entry.job.company, 16),
            truncate(&entry.job.location, 12),
            entry.job.experience
        );
    }
    println!("\nThis digest was generated based on your preferences.");
}

/// Returns false when there was nothing to print.
fn print_recent_updates<S: Store + ?Sized>(catalog: &Catalog, store: &S, limit: usize) -> bool {
    let statuses = store.load_status_map();
    let updates = recent_updates(catalog, &statuses, limit);
    if updates.is_empty() {
        return false;
    }
    println!("\nRecent Status Updates");
    println!("{}", "-".repeat(60));
    for update in updates {
        println!(
            "{:<30} {:<16} {:<12} {}",
            truncate(&update.job.title, 28),
            truncate(&update.job.company, 14),
            update.status,
            update.date.format("%Y-%m-%d")
        );
    }
    true
}

fn format_match(result: Option<MatchResult>) -> String {
    match result {
        Some(result) => format!("{}%", result.score),
        None => "-".to_string(),
    }
}

fn format_posted(days: u32) -> String {
    match days {
        0 => "Today".to_string(),
        1 => "1d ago".to_string(),
        n => format!("{}d ago", n),
    }
}

fn or_dash(s: &str) -> &str {
    if s.is_empty() { "-" } else { s }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}
