use anyhow::{Context, Result, anyhow};
use std::collections::HashSet;
use std::path::Path;

use crate::models::Job;

const BUILTIN_CATALOG: &str = include_str!("../data/jobs.json");

/// The fixed set of postings the matcher works over.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    jobs: Vec<Job>,
}

impl Catalog {
    pub fn new(jobs: Vec<Job>) -> Result<Self> {
        let mut seen = HashSet::new();
        for job in &jobs {
            if !seen.insert(job.id.as_str()) {
                return Err(anyhow!("Duplicate job id '{}' in catalog", job.id));
            }
        }
        Ok(Self { jobs })
    }

    pub fn builtin() -> Result<Self> {
        Self::from_json(BUILTIN_CATALOG).context("Bundled catalog is invalid")
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog file: {}", path.display()))?;
        Self::from_json(&content)
            .with_context(|| format!("Failed to parse catalog file: {}", path.display()))
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let jobs: Vec<Job> = serde_json::from_str(content)?;
        Self::new(jobs)
    }

    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    pub fn get(&self, id: &str) -> Option<&Job> {
        self.jobs.iter().find(|job| job.id == id)
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Distinct values of a field, in first-seen order.
    pub fn distinct<'a, F>(&'a self, field: F) -> Vec<&'a str>
    where
        F: Fn(&'a Job) -> &'a str,
    {
        let mut seen = HashSet::new();
        self.jobs
            .iter()
            .map(field)
            .filter(|value| seen.insert(*value))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog_loads() {
        let catalog = Catalog::builtin().unwrap();
        assert!(catalog.len() >= 12);
        assert!(catalog.get("1").is_some());
        assert!(catalog.get("does-not-exist").is_none());
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let catalog = Catalog::builtin().unwrap();
        let mut jobs = catalog.jobs().to_vec();
        jobs.push(jobs[0].clone());
        let err = Catalog::new(jobs).unwrap_err();
        assert!(err.to_string().contains("Duplicate job id"));
    }

    #[test]
    fn test_distinct_sources() {
        let catalog = Catalog::builtin().unwrap();
        let sources = catalog.distinct(|job| job.source.as_str());
        assert!(sources.contains(&"LinkedIn"));
        let unique: HashSet<_> = sources.iter().collect();
        assert_eq!(unique.len(), sources.len());
    }

    #[test]
    fn test_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jobs.json");
        std::fs::write(&path, "[]").unwrap();
        assert!(Catalog::from_path(&path).unwrap().is_empty());

        std::fs::write(&path, "{").unwrap();
        let err = Catalog::from_path(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to parse catalog file"));
    }
}
