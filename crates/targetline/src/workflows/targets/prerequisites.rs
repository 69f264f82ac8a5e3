//! Administrative checks on the prerequisite graph.
//!
//! Targets reference their prerequisites by id only; the graph must stay acyclic so that status
//! resolution terminates with a meaningful answer.

use std::collections::{BTreeSet, HashMap, HashSet};

use super::domain::{Target, TargetId};
use super::repository::CatalogError;

/// Check that `candidate` only depends on known targets and closes no cycle once registered
/// alongside `existing`.
pub fn validate_prerequisites(
    existing: &HashMap<TargetId, Target>,
    candidate: &Target,
) -> Result<(), CatalogError> {
    for prerequisite in &candidate.prerequisites {
        if prerequisite != &candidate.id && !existing.contains_key(prerequisite) {
            return Err(CatalogError::UnknownPrerequisite {
                target: candidate.id.0.clone(),
                prerequisite: prerequisite.0.clone(),
            });
        }
    }

    let mut edges: HashMap<&TargetId, &BTreeSet<TargetId>> = existing
        .iter()
        .map(|(id, target)| (id, &target.prerequisites))
        .collect();
    edges.insert(&candidate.id, &candidate.prerequisites);

    match find_cycle(&edges, &candidate.id) {
        Some(path) => Err(CatalogError::PrerequisiteCycle {
            path: path.into_iter().map(|id| id.0.clone()).collect(),
        }),
        None => Ok(()),
    }
}

fn find_cycle<'a>(
    edges: &HashMap<&'a TargetId, &'a BTreeSet<TargetId>>,
    start: &'a TargetId,
) -> Option<Vec<&'a TargetId>> {
    let mut path = vec![start];
    let mut cleared = HashSet::new();
    if walk(edges, start, start, &mut path, &mut cleared) {
        Some(path)
    } else {
        None
    }
}

fn walk<'a>(
    edges: &HashMap<&'a TargetId, &'a BTreeSet<TargetId>>,
    start: &'a TargetId,
    current: &'a TargetId,
    path: &mut Vec<&'a TargetId>,
    cleared: &mut HashSet<&'a TargetId>,
) -> bool {
    let Some(&next) = edges.get(current) else {
        return false;
    };

    for prerequisite in next.iter() {
        if prerequisite == start {
            path.push(prerequisite);
            return true;
        }
        if cleared.contains(prerequisite) || path.contains(&prerequisite) {
            continue;
        }

        path.push(prerequisite);
        if walk(edges, start, prerequisite, path, cleared) {
            return true;
        }
        path.pop();
        cleared.insert(prerequisite);
    }

    false
}
