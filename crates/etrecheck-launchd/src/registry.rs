//! Shared indexes for a collection pass: live tasks and claimed identifiers.
//!
//! Both use short synchronous critical sections and are never held across
//! an `.await`.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use etrecheck_core::{TaskHandle, TaskId};

use crate::hash::sha256_bytes;

/// Length of the path-hash suffix used to disambiguate identifiers.
const COLLISION_SUFFIX_LEN: usize = 8;

/// Index of tasks the service controller has reported, keyed by task id.
///
/// Records keep task ids and look them up here, so a task that goes away
/// simply stops resolving.
#[derive(Debug, Clone, Default)]
pub struct TaskRegistry {
    inner: Arc<RwLock<BTreeMap<TaskId, TaskHandle>>>,
}

impl TaskRegistry {
    /// Replace every task of `label` with `tasks`.
    ///
    /// Returns the ids now registered for the label, in the given order.
    pub fn replace_label(&self, label: &str, tasks: Vec<TaskHandle>) -> Vec<TaskId> {
        let mut map = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        map.retain(|_, task| task.label != label);
        tasks
            .into_iter()
            .map(|task| {
                let id = task.id.clone();
                map.insert(id.clone(), task);
                id
            })
            .collect()
    }

    /// Forget the given tasks
    pub fn remove(&self, ids: &[TaskId]) {
        let mut map = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        for id in ids {
            map.remove(id);
        }
    }

    /// Is the task still known?
    #[must_use]
    pub fn contains(&self, id: &TaskId) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(id)
    }

    /// Look up a task
    #[must_use]
    pub fn get(&self, id: &TaskId) -> Option<TaskHandle> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    /// Number of registered tasks
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Is the registry empty?
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Identifiers claimed during a collection pass.
///
/// The first path to claim an identifier keeps it; any other path gets the
/// identifier plus `_` and the first hex digits of SHA-256 of its path,
/// which is still a valid name token. The suffix grows until it is free.
#[derive(Debug, Clone, Default)]
pub struct IdentifierRegistry {
    claimed: Arc<Mutex<HashMap<String, PathBuf>>>,
}

impl IdentifierRegistry {
    /// Claim `candidate` for `path`, returning the identifier to use.
    pub fn claim(&self, candidate: &str, path: &Path) -> String {
        let mut claimed = self.claimed.lock().unwrap_or_else(PoisonError::into_inner);

        match claimed.get(candidate) {
            None => {
                claimed.insert(candidate.to_string(), path.to_path_buf());
                candidate.to_string()
            }
            Some(owner) if owner == path => candidate.to_string(),
            Some(_) => {
                let digest = sha256_bytes(path.to_string_lossy().as_bytes());
                let mut len = COLLISION_SUFFIX_LEN;
                loop {
                    let unique = if len <= digest.len() {
                        format!("{candidate}_{}", &digest[..len])
                    } else {
                        format!("{candidate}_{digest}_{}", len - digest.len())
                    };
                    match claimed.get(&unique) {
                        None => {
                            claimed.insert(unique.clone(), path.to_path_buf());
                            return unique;
                        }
                        Some(owner) if owner == path => return unique,
                        Some(_) => len += 1,
                    }
                }
            }
        }
    }

    /// Number of identifiers claimed so far
    #[must_use]
    pub fn len(&self) -> usize {
        self.claimed.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Has nothing been claimed yet?
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replace_label_drops_stale_tasks() {
        let registry = TaskRegistry::default();
        let first = registry.replace_label(
            "com.example.agent",
            vec![
                TaskHandle::new("com.example.agent", 0, Some(10)),
                TaskHandle::new("com.example.agent", 1, Some(11)),
            ],
        );
        registry.replace_label("com.other", vec![TaskHandle::new("com.other", 0, None)]);
        assert_eq!(registry.len(), 3);

        let second = registry.replace_label(
            "com.example.agent",
            vec![TaskHandle::new("com.example.agent", 0, Some(12))],
        );
        assert_eq!(second, vec![first[0].clone()]);
        assert!(!registry.contains(&first[1]));
        assert_eq!(registry.get(&first[0]).unwrap().pid, Some(12));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn remove_forgets_tasks() {
        let registry = TaskRegistry::default();
        let ids = registry.replace_label("a", vec![TaskHandle::new("a", 0, None)]);
        registry.remove(&ids);
        assert!(registry.is_empty());
    }

    #[test]
    fn identifier_collisions_get_stable_suffix() {
        let ids = IdentifierRegistry::default();
        let a = Path::new("/Library/LaunchAgents/com.x.plist");
        let b = Path::new("/Users/j/Library/LaunchAgents/com.x.plist");

        assert_eq!(ids.claim("com.x", a), "com.x");
        assert_eq!(ids.claim("com.x", a), "com.x");

        let second = ids.claim("com.x", b);
        assert!(second.starts_with("com.x_"));
        assert_eq!(second.len(), "com.x_".len() + COLLISION_SUFFIX_LEN);

        let again = IdentifierRegistry::default();
        again.claim("com.x", a);
        assert_eq!(again.claim("com.x", b), second);
    }

    #[test]
    fn suffix_already_claimed_grows() {
        let ids = IdentifierRegistry::default();
        let a = Path::new("/Library/LaunchAgents/com.x.plist");
        let b = Path::new("/Users/j/Library/LaunchAgents/com.x.plist");
        let squatter = Path::new("/Library/LaunchDaemons/squatter.plist");

        let digest = sha256_bytes(b.to_string_lossy().as_bytes());
        let short = format!("com.x_{}", &digest[..COLLISION_SUFFIX_LEN]);
        assert_eq!(ids.claim(&short, squatter), short);
        assert_eq!(ids.claim("com.x", a), "com.x");

        let longer = ids.claim("com.x", b);
        assert_eq!(longer, format!("com.x_{}", &digest[..=COLLISION_SUFFIX_LEN]));
        assert_eq!(ids.claim("com.x", b), longer);
        assert_eq!(ids.len(), 3);
    }
}
