//! Ancestor walk over the stored commit graph.

use std::collections::HashSet;

use crate::entity::prelude::CommitModel;

use super::DocumentStore;
use super::errors::{Result, StoreError};

impl DocumentStore {
    /// Hashes reachable from `hash` through parent edges, `hash` included,
    /// restricted to commits accepted by `predicate`.
    ///
    /// A rejected commit is neither returned nor expanded, so its ancestors
    /// are only reached through other paths. A commit missing from the store
    /// ends its branch. Each commit is looked up at most once, which also
    /// bounds the walk on a cyclic graph.
    pub async fn get_commit_ancestors<P>(&self, hash: &str, predicate: P) -> Result<Vec<String>>
    where
        P: Fn(&CommitModel) -> bool + Send + Sync,
    {
        if hash.trim().is_empty() {
            return Err(StoreError::InvalidArgument("commit hash is required".into()));
        }

        let mut visited: HashSet<String> = HashSet::new();
        let mut stack = vec![hash.to_string()];
        let mut accepted = Vec::new();

        while let Some(current) = stack.pop() {
            if !visited.insert(current.clone()) {
                continue;
            }

            let Some(commit) = self.get_commit(&current).await? else {
                tracing::trace!(hash = %current, "Ancestor not in store");
                continue;
            };
            if !predicate(&commit) {
                continue;
            }

            // Reverse so the first parent is expanded first.
            for parent in commit.parent_hashes().into_iter().rev() {
                if !visited.contains(&parent) {
                    stack.push(parent);
                }
            }
            accepted.push(commit.hash);
        }

        tracing::debug!(start = %hash, visited = visited.len(), accepted = accepted.len(), "Walked ancestors");
        Ok(accepted)
    }

    /// Every stored ancestor of `hash`, `hash` included.
    pub async fn get_all_commit_ancestors(&self, hash: &str) -> Result<Vec<String>> {
        self.get_commit_ancestors(hash, |_| true).await
    }
}
