use serde::Serialize;
use strollup_domain::{RoleDefinition, UserProfile};

use super::AdminError;

/// Reconciliation status of one administered entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EditStatus {
    /// Local state matches the last acknowledged write.
    Committed,
    /// A write is in flight; local state shows its optimistic result.
    Pending,
    /// The last write failed and local state was restored.
    RolledBack,
}

/// An administered entity together with its reconciliation status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminEntry<T> {
    /// Value as currently displayed.
    pub value: T,
    /// Reconciliation status.
    pub status: EditStatus,
}

pub(super) trait Keyed {
    fn key(&self) -> &str;
}

impl Keyed for RoleDefinition {
    fn key(&self) -> &str {
        self.id().as_str()
    }
}

impl Keyed for UserProfile {
    fn key(&self) -> &str {
        self.id()
    }
}

#[derive(Debug, Clone)]
enum Edit<T> {
    Committed,
    /// `previous` is `None` when the entity did not exist before the edit.
    Pending { previous: Option<T> },
    RolledBack,
}

#[derive(Debug, Clone)]
struct Tracked<T> {
    key: String,
    /// `None` while an optimistic removal is in flight.
    current: Option<T>,
    edit: Edit<T>,
}

/// Displayed entities with one optional in-flight edit each.
#[derive(Debug, Clone)]
pub(super) struct Ledger<T> {
    entries: Vec<Tracked<T>>,
}

impl<T> Default for Ledger<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T: Keyed + Clone> Ledger<T> {
    pub(super) fn replace_all(&mut self, values: Vec<T>) {
        self.entries = values
            .into_iter()
            .map(|value| Tracked {
                key: value.key().to_owned(),
                current: Some(value),
                edit: Edit::Committed,
            })
            .collect();
    }

    pub(super) fn has_pending(&self) -> bool {
        self.entries
            .iter()
            .any(|entry| matches!(entry.edit, Edit::Pending { .. }))
    }

    pub(super) fn get(&self, key: &str) -> Option<&T> {
        self.entries
            .iter()
            .find(|entry| entry.key == key)
            .and_then(|entry| entry.current.as_ref())
    }

    pub(super) fn values(&self) -> impl Iterator<Item = &T> {
        self.entries.iter().filter_map(|entry| entry.current.as_ref())
    }

    pub(super) fn entries(&self) -> Vec<AdminEntry<T>> {
        self.entries
            .iter()
            .filter_map(|entry| {
                let value = entry.current.clone()?;
                let status = match entry.edit {
                    Edit::Committed => EditStatus::Committed,
                    Edit::Pending { .. } => EditStatus::Pending,
                    Edit::RolledBack => EditStatus::RolledBack,
                };
                Some(AdminEntry { value, status })
            })
            .collect()
    }

    /// Shows `next` immediately and remembers what it replaced.
    ///
    /// `next = None` removes the entity; an unknown key inserts it.
    pub(super) fn begin(&mut self, key: &str, next: Option<T>) -> Result<(), AdminError> {
        match self.entries.iter_mut().find(|entry| entry.key == key) {
            Some(entry) if matches!(entry.edit, Edit::Pending { .. }) => {
                Err(AdminError::AlreadySaving(key.to_owned()))
            }
            Some(entry) => {
                let previous = std::mem::replace(&mut entry.current, next);
                entry.edit = Edit::Pending { previous };
                Ok(())
            }
            None => {
                self.entries.push(Tracked {
                    key: key.to_owned(),
                    current: next,
                    edit: Edit::Pending { previous: None },
                });
                Ok(())
            }
        }
    }

    /// Marks the in-flight edit as acknowledged.
    pub(super) fn commit(&mut self, key: &str) {
        let Some(index) = self.entries.iter().position(|entry| entry.key == key) else {
            return;
        };

        if self.entries[index].current.is_none() {
            self.entries.remove(index);
        } else {
            self.entries[index].edit = Edit::Committed;
        }
    }

    /// Restores the value the in-flight edit replaced.
    pub(super) fn roll_back(&mut self, key: &str) {
        let Some(index) = self.entries.iter().position(|entry| entry.key == key) else {
            return;
        };

        match std::mem::replace(&mut self.entries[index].edit, Edit::RolledBack) {
            Edit::Pending {
                previous: Some(previous),
            } => self.entries[index].current = Some(previous),
            Edit::Pending { previous: None } => {
                self.entries.remove(index);
            }
            other => self.entries[index].edit = other,
        }
    }
}
