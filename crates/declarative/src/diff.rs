//! Diff computation between two documents
//!
//! Each domain's declarations are flattened into a [`Snapshot`] of
//! `(key path, value)` entries, for list and map domains alike. The two
//! snapshots are then compared entry by entry:
//!
//! - map entries are identified by key path, so a changed value is an update
//! - list entries are identified by key path and value, so a changed value is
//!   a removal plus an addition
//!
//! Within a domain, removals come first (newest declaration first), then
//! additions and updates in declaration order. Domains are visited in the
//! order they first appear in the desired document, followed by domains only
//! the previous document declares.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::document::Document;
use crate::domain::{DomainDescriptor, Registry};
use crate::error::{Error, Result};
use crate::types::{ActionKind, DomainKind};
use crate::value::Value;

/// One planned add/update/remove on a single key path of a domain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainAction {
    pub domain: String,
    pub kind: ActionKind,
    /// Enclosing keys, as many as the domain's key depth
    pub key_path: Vec<String>,
    /// Value being added, the new value of an update, or the value removed
    pub value: Value,
    /// Value being replaced, for updates
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous: Option<Value>,
}

impl DomainAction {
    fn new(domain: &str, kind: ActionKind, entry: &Entry) -> Self {
        Self {
            domain: domain.to_string(),
            kind,
            key_path: entry.key_path.clone(),
            value: entry.value.clone(),
            previous: None,
        }
    }

    /// Key path joined with dots, empty for depth-0 domains
    pub fn target(&self) -> String {
        self.key_path.join(".")
    }

    /// Human-readable description, without the command
    pub fn description(&self) -> String {
        let target = if self.key_path.is_empty() {
            String::new()
        } else {
            format!("{} = ", self.target())
        };

        match (&self.kind, &self.previous) {
            (ActionKind::Update, Some(previous)) => format!(
                "{} {}: {}{} -> {}",
                self.kind.verb(),
                self.domain,
                target,
                previous,
                self.value
            ),
            _ => format!(
                "{} {}: {}{}",
                self.kind.verb(),
                self.domain,
                target,
                self.value
            ),
        }
    }
}

/// One flattened declaration
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub key_path: Vec<String>,
    pub value: Value,
}

/// Identity of an entry: the key path, plus the value for list domains
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct EntryKey {
    key_path: Vec<String>,
    value: Option<String>,
}

/// Merged view of one domain's declarations across a document's sections
///
/// Entries keep declaration order and are indexed by identity.
#[derive(Debug, Clone)]
pub struct Snapshot {
    kind: DomainKind,
    entries: IndexMap<EntryKey, Entry>,
}

impl Snapshot {
    /// Flatten every declaration of `descriptor`'s domain in `document`
    pub fn flatten(descriptor: &DomainDescriptor, document: &Document) -> Result<Self> {
        let mut snapshot = Self {
            kind: descriptor.kind(),
            entries: IndexMap::new(),
        };

        for declaration in document.declarations(descriptor.name()) {
            for (key_path, leaf) in descend(descriptor, declaration)? {
                match descriptor.kind() {
                    DomainKind::Map => snapshot.merge_map(descriptor, key_path, leaf.clone())?,
                    DomainKind::List => snapshot.merge_list(descriptor, &key_path, leaf)?,
                }
            }
        }

        Ok(snapshot)
    }

    /// Entries in declaration order
    pub fn entries(&self) -> impl DoubleEndedIterator<Item = &Entry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn key(&self, key_path: &[String], value: &Value) -> EntryKey {
        EntryKey {
            key_path: key_path.to_vec(),
            value: match self.kind {
                DomainKind::Map => None,
                DomainKind::List => Some(value.identity()),
            },
        }
    }

    fn merge_map(
        &mut self,
        descriptor: &DomainDescriptor,
        key_path: Vec<String>,
        value: Value,
    ) -> Result<()> {
        let key = self.key(&key_path, &value);
        match self.entries.get(&key) {
            Some(existing) if existing.value == value => Ok(()),
            Some(_) => Err(Error::ConflictingValue {
                domain: descriptor.name().to_string(),
                path: key_path.join("."),
            }),
            None => {
                self.entries.insert(key, Entry { key_path, value });
                Ok(())
            }
        }
    }

    fn merge_list(
        &mut self,
        descriptor: &DomainDescriptor,
        key_path: &[String],
        leaf: &Value,
    ) -> Result<()> {
        let items = match leaf {
            Value::Null => return Ok(()),
            Value::List(items) => items,
            other => {
                return Err(Error::ShapeMismatch {
                    domain: descriptor.name().to_string(),
                    path: key_path.join("."),
                    message: format!("expected a list, found a {}", other.type_name()),
                });
            }
        };

        for item in items {
            let key = self.key(key_path, item);
            if self.entries.contains_key(&key) {
                return Err(Error::DuplicateEntry {
                    domain: descriptor.name().to_string(),
                    path: key_path.join("."),
                    value: item.to_string(),
                });
            }
            let entry = Entry {
                key_path: key_path.to_vec(),
                value: item.clone(),
            };
            self.entries.insert(key, entry);
        }

        Ok(())
    }

    /// Entry with the same identity as `entry`
    fn find(&self, entry: &Entry) -> Option<&Entry> {
        self.entries.get(&self.key(&entry.key_path, &entry.value))
    }
}

/// Walk `key_depth` map levels, returning `(key path, leaf)` pairs
///
/// Null at any intermediate level means nothing is declared below it.
fn descend<'a>(
    descriptor: &DomainDescriptor,
    declaration: &'a Value,
) -> Result<Vec<(Vec<String>, &'a Value)>> {
    let mut level: Vec<(Vec<String>, &Value)> = vec![(Vec::new(), declaration)];

    for _ in 0..descriptor.key_depth() {
        let mut next = Vec::new();
        for (path, value) in level {
            match value {
                Value::Null => {}
                Value::Map(map) => {
                    for (key, child) in map {
                        let mut child_path = path.clone();
                        child_path.push(key.clone());
                        next.push((child_path, child));
                    }
                }
                other => {
                    return Err(Error::ShapeMismatch {
                        domain: descriptor.name().to_string(),
                        path: path.join("."),
                        message: format!(
                            "expected a map ({} key levels), found a {}",
                            descriptor.key_depth(),
                            other.type_name()
                        ),
                    });
                }
            }
        }
        level = next;
    }

    Ok(level)
}

/// Compute the actions for a single domain
pub fn diff_domain(
    descriptor: &DomainDescriptor,
    previous: &Snapshot,
    desired: &Snapshot,
) -> Vec<DomainAction> {
    let name = descriptor.name();
    let replace_changed = descriptor.kind() == DomainKind::Map && !descriptor.supports_update();
    let mut actions = Vec::new();

    for old in previous.entries().rev() {
        let gone = match desired.find(old) {
            None => true,
            Some(new) => replace_changed && new.value != old.value,
        };
        if gone {
            actions.push(DomainAction::new(name, ActionKind::Remove, old));
        }
    }

    for new in desired.entries() {
        match previous.find(new) {
            None => actions.push(DomainAction::new(name, ActionKind::Add, new)),
            Some(old) if old.value != new.value => {
                if replace_changed {
                    actions.push(DomainAction::new(name, ActionKind::Add, new));
                } else {
                    let mut action = DomainAction::new(name, ActionKind::Update, new);
                    action.previous = Some(old.value.clone());
                    actions.push(action);
                }
            }
            Some(_) => {}
        }
    }

    actions
}

/// Compute the ordered actions turning `previous` into `desired`
///
/// Fails with [`Error::UnknownDomain`] if either document declares a domain
/// the registry cannot resolve.
pub fn diff(
    previous: &Document,
    desired: &Document,
    registry: &Registry,
) -> Result<Vec<DomainAction>> {
    let mut order = desired.domain_order();
    for name in previous.domain_order() {
        if !order.contains(&name) {
            order.push(name);
        }
    }

    let mut actions = Vec::new();
    for name in order {
        let descriptor = registry.resolve(name)?;
        let old = Snapshot::flatten(descriptor, previous)?;
        let new = Snapshot::flatten(descriptor, desired)?;
        let domain_actions = diff_domain(descriptor, &old, &new);
        log::debug!(
            "Domain {}: {} previous, {} desired, {} actions",
            name,
            old.len(),
            new.len(),
            domain_actions.len()
        );
        actions.extend(domain_actions);
    }

    Ok(actions)
}

/// Diff summary statistics
#[derive(Debug, Clone, Default)]
pub struct DiffSummary {
    pub additions: usize,
    pub updates: usize,
    pub removals: usize,
}

impl DiffSummary {
    /// Create a summary from a list of actions
    pub fn from_actions(actions: &[DomainAction]) -> Self {
        let mut summary = Self::default();
        for action in actions {
            match action.kind {
                ActionKind::Add => summary.additions += 1,
                ActionKind::Update => summary.updates += 1,
                ActionKind::Remove => summary.removals += 1,
            }
        }
        summary
    }

    /// Total number of changes
    pub fn total(&self) -> usize {
        self.additions + self.updates + self.removals
    }

    /// Check if there are any changes
    pub fn has_changes(&self) -> bool {
        self.total() > 0
    }
}

/// Group actions by domain, keeping emission order
pub fn group_by_domain(actions: &[DomainAction]) -> Vec<(&str, Vec<&DomainAction>)> {
    let mut groups: Vec<(&str, Vec<&DomainAction>)> = Vec::new();
    for action in actions {
        match groups.iter_mut().find(|(name, _)| *name == action.domain) {
            Some((_, group)) => group.push(action),
            None => groups.push((action.domain.as_str(), vec![action])),
        }
    }
    groups
}
