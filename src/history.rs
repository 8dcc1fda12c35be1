//! Generation history with the modules each generation published.
use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::error::StoreError;
use crate::store::Store;

/// One generation and the module names it recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    /// Generation id.
    pub id: Uuid,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Optional description given at deploy time.
    pub description: Option<String>,
    /// Module names, sorted.
    pub modules: Vec<String>,
}

impl HistoryEntry {
    /// Creation time in local time, `YYYY-MM-DD HH:MM:SS`.
    #[must_use]
    pub fn created_local(&self) -> String {
        self.created_at
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
    }
}

/// Generations newest first.
///
/// With `module`, only generations containing that module are returned and
/// their module list is reduced to it.
///
/// # Errors
///
/// Returns an error if the store cannot be read.
pub fn collect_history(
    store: &Store<'_>,
    module: Option<&str>,
) -> Result<Vec<HistoryEntry>, StoreError> {
    let mut entries = Vec::new();
    for generation in store.generations().list_by_recency_desc()? {
        let mut names: Vec<String> = store
            .modules()
            .list_by_generation(generation.id)?
            .into_iter()
            .map(|m| m.module_name)
            .collect();
        names.sort();

        let modules = match module {
            None => names,
            Some(wanted) if names.iter().any(|n| n == wanted) => vec![wanted.to_string()],
            Some(_) => continue,
        };
        entries.push(HistoryEntry {
            id: generation.id,
            created_at: generation.created_at,
            description: generation.description,
            modules,
        });
    }
    Ok(entries)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::store::Database;
    use chrono::TimeZone as _;
    use std::path::Path;

    fn seed(store: &Store<'_>) -> (Uuid, Uuid, Uuid) {
        let first = store.generations().create(Some("initial")).unwrap();
        for name in ["zsh", "git"] {
            store
                .modules()
                .create(first.id, name, Path::new("/r/x"), Path::new("/t"))
                .unwrap();
        }
        let second = store.generations().create(None).unwrap();
        store
            .modules()
            .create(second.id, "vim", Path::new("/r/v"), Path::new("/t"))
            .unwrap();
        let empty = store.generations().create(Some("empty")).unwrap();
        (first.id, second.id, empty.id)
    }

    #[test]
    fn history_is_newest_first_with_sorted_modules() {
        let mut db = Database::in_memory().unwrap();
        db.unit_of_work(|store| {
            let (first, second, empty) = seed(store);
            let history = collect_history(store, None)?;
            let ids: Vec<_> = history.iter().map(|h| h.id).collect();
            assert_eq!(ids, vec![empty, second, first]);
            assert_eq!(history[2].modules, vec!["git", "zsh"]);
            assert_eq!(history[2].description.as_deref(), Some("initial"));
            assert!(history[0].modules.is_empty());
            Ok::<_, StoreError>(())
        })
        .unwrap();
    }

    #[test]
    fn module_filter_keeps_matching_generations_only() {
        let mut db = Database::in_memory().unwrap();
        db.unit_of_work(|store| {
            let (first, _, _) = seed(store);
            let history = collect_history(store, Some("git"))?;
            assert_eq!(history.len(), 1);
            assert_eq!(history[0].id, first);
            assert_eq!(history[0].modules, vec!["git"]);
            assert!(collect_history(store, Some("emacs"))?.is_empty());
            Ok::<_, StoreError>(())
        })
        .unwrap();
    }

    #[test]
    fn history_json_shape() {
        let entry = HistoryEntry {
            id: Uuid::nil(),
            created_at: Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap(),
            description: None,
            modules: vec!["vim".to_string()],
        };
        insta::assert_json_snapshot!(entry, @r#"
        {
          "id": "00000000-0000-0000-0000-000000000000",
          "created_at": "2025-03-01T08:00:00Z",
          "description": null,
          "modules": [
            "vim"
          ]
        }
        "#);
    }
}
