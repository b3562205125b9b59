//! Filesystem-existence cache signals.
//!
//! A stage is skipped when its artifact is present. Presence is an existence
//! or non-emptiness check only; content is never validated, so a stale or
//! partial artifact counts as complete. Substituting a stricter cache means
//! replacing these predicates and nothing else.

use std::path::Path;

use crate::layout::ExperimentPaths;

pub fn dataset_present(paths: &ExperimentPaths) -> bool {
    paths.dataset.exists()
}

/// Existing weights are treated as complete; there is no partial-checkpoint
/// detection.
pub fn weights_present(paths: &ExperimentPaths) -> bool {
    dir_non_empty(&paths.weights)
}

pub fn results_present(paths: &ExperimentPaths) -> bool {
    paths.results_file.exists()
}

fn dir_non_empty(dir: &Path) -> bool {
    std::fs::read_dir(dir).map(|mut entries| entries.next().is_some()).unwrap_or(false)
}
