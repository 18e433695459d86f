//! Merge-base discovery and the fast-forward predicate
//!
//! Ancestors are collected by BFS over parent edges; the merge base is
//! the first ancestor of one tip (in BFS order) that also appears in the
//! other tip's ancestor set. With criss-cross merges this is a common
//! ancestor but not necessarily the lowest one; for the histories a
//! fast-forward check cares about it is exact.

use crate::areas::database::Database;
use crate::artifacts::objects::object_id::ObjectId;
use std::collections::{HashSet, VecDeque};

/// Commits reachable from `tip` (tip included), BFS order.
///
/// Commits that cannot be loaded end the walk along that edge; remote
/// tips may reference history the local store has never seen.
pub fn ancestors(database: &Database, tip: &ObjectId) -> Vec<ObjectId> {
    let mut visited: HashSet<ObjectId> = HashSet::new();
    let mut order = Vec::new();
    let mut queue = VecDeque::from([tip.clone()]);

    while let Some(current) = queue.pop_front() {
        if !visited.insert(current.clone()) {
            continue;
        }
        order.push(current.clone());

        let Ok(commit) = database.load_commit(&current) else {
            continue;
        };
        for parent in commit.parents() {
            if !visited.contains(parent) {
                queue.push_back(parent.clone());
            }
        }
    }

    order
}

/// First ancestor of `a` that is also an ancestor of `b`
pub fn merge_base(database: &Database, a: &ObjectId, b: &ObjectId) -> Option<ObjectId> {
    if a == b {
        return Some(a.clone());
    }

    let ancestors_of_b: HashSet<ObjectId> = ancestors(database, b).into_iter().collect();
    ancestors(database, a)
        .into_iter()
        .find(|candidate| ancestors_of_b.contains(candidate))
}

/// A ref at `old` may fast-forward to `new` iff `old` is an ancestor of
/// `new`, i.e. `merge_base(old, new) == old`.
pub fn can_fast_forward(database: &Database, old: &ObjectId, new: &ObjectId) -> bool {
    merge_base(database, old, new).as_ref() == Some(old)
}
