use crate::catalog::Catalog;
use crate::models::Job;
use crate::store::{Store, StoreError};

/// Bookmarks a job, or removes the bookmark. Returns true when now saved.
pub fn toggle_saved<S: Store + ?Sized>(store: &S, job_id: &str) -> Result<bool, StoreError> {
    let mut ids = store.try_load_saved_ids()?;
    let saved = if let Some(pos) = ids.iter().position(|id| id == job_id) {
        ids.remove(pos);
        false
    } else {
        ids.push(job_id.to_string());
        true
    };
    store.save_saved_ids(&ids)?;
    Ok(saved)
}

pub fn is_saved<S: Store + ?Sized>(store: &S, job_id: &str) -> bool {
    store.load_saved_ids().iter().any(|id| id == job_id)
}

/// Saved jobs in catalog order. Ids no longer in the catalog are ignored.
pub fn saved_jobs<'a, S: Store + ?Sized>(catalog: &'a Catalog, store: &S) -> Vec<&'a Job> {
    let ids = store.load_saved_ids();
    catalog
        .jobs()
        .iter()
        .filter(|job| ids.contains(&job.id))
        .collect()
}
