//! Shared library of node group definitions

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};
use texmat_core::ContentHash;

use crate::group::NodeGroupDef;
use crate::naming::unique_name;

/// A group found or created in the library
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupHandle {
    /// Final name, possibly renamed for uniqueness
    pub name: String,
    pub fingerprint: ContentHash,
    /// Whether this call created the definition
    pub created: bool,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct LibraryState {
    /// Definitions by name, the namespace users and hosts see
    #[serde(default)]
    groups: BTreeMap<String, NodeGroupDef>,
    /// Intended shape -> name of the definition created for it
    #[serde(default)]
    by_shape: BTreeMap<ContentHash, String>,
}

/// Process-wide cache of reusable node groups.
///
/// Definitions are found by the fingerprint of their intended shape rather
/// than by name. All find-or-create work happens under one lock, so
/// concurrent imports never create the same group twice.
#[derive(Debug, Default)]
pub struct NodeGroupLibrary {
    state: Mutex<LibraryState>,
}

impl NodeGroupLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, LibraryState> {
        // The state is never left half-updated, so a poisoned lock is safe
        // to keep using.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Return the group with `template`'s shape, creating it if needed.
    ///
    /// A cached definition that fails validation against `template` was
    /// edited after it was created. It is left as it is and a fresh
    /// definition takes over the shape.
    pub fn find_or_create(&self, template: &NodeGroupDef) -> GroupHandle {
        let fingerprint = template.fingerprint();
        let mut state = self.lock();

        if let Some(def) = state
            .by_shape
            .get(&fingerprint)
            .and_then(|name| state.groups.get(name))
        {
            match def.validate_against(template) {
                Ok(()) => {
                    return GroupHandle {
                        name: def.name.clone(),
                        fingerprint,
                        created: false,
                    }
                }
                Err(e) => {
                    tracing::debug!(group = %def.name, error = %e, "cached group rejected, recreating");
                }
            }
        }

        let name = unique_name(&template.name, |n| state.groups.contains_key(n));
        let mut def = template.clone();
        def.name = name.clone();
        state.groups.insert(name.clone(), def);
        state.by_shape.insert(fingerprint, name.clone());
        tracing::debug!(group = %name, "created node group");

        GroupHandle {
            name,
            fingerprint,
            created: true,
        }
    }

    /// Add an existing definition, as found in a host document. Returns the
    /// name it was stored under. A definition whose shape is not indexed yet
    /// becomes the one `find_or_create` returns for that shape.
    pub fn insert(&self, mut def: NodeGroupDef) -> String {
        let mut state = self.lock();
        let name = unique_name(&def.name, |n| state.groups.contains_key(n));
        def.name = name.clone();
        let fingerprint = def.fingerprint();
        state.by_shape.entry(fingerprint).or_insert_with(|| name.clone());
        state.groups.insert(name.clone(), def);
        name
    }

    pub fn get(&self, name: &str) -> Option<NodeGroupDef> {
        self.lock().groups.get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.lock().groups.keys().cloned().collect()
    }

    /// Snapshot of every definition
    pub fn groups(&self) -> Vec<NodeGroupDef> {
        self.lock().groups.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().groups.is_empty()
    }
}

impl Serialize for NodeGroupLibrary {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.lock().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for NodeGroupLibrary {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let state = LibraryState::deserialize(deserializer)?;
        Ok(Self {
            state: Mutex::new(state),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::{normal_rotation_group, GroupSocket, SocketType, NORMAL_ROTATION_GROUP};
    use std::sync::Arc;

    #[test]
    fn test_find_or_create_is_idempotent() {
        let library = NodeGroupLibrary::new();
        let first = library.find_or_create(&normal_rotation_group());
        let second = library.find_or_create(&normal_rotation_group());
        assert!(first.created);
        assert!(!second.created);
        assert_eq!(first.name, second.name);
        assert_eq!(library.len(), 1);
    }

    #[test]
    fn test_name_collision_with_unrelated_group() {
        let library = NodeGroupLibrary::new();
        let mut unrelated = normal_rotation_group();
        unrelated.nodes.truncate(2);
        unrelated.links.clear();
        library.insert(unrelated);

        let handle = library.find_or_create(&normal_rotation_group());
        assert!(handle.created);
        assert_eq!(handle.name, format!("{}.001", NORMAL_ROTATION_GROUP));
        // The unrelated group is untouched
        assert_eq!(library.get(NORMAL_ROTATION_GROUP).unwrap().nodes.len(), 2);
    }

    #[test]
    fn test_inserted_matching_group_is_reused() {
        let library = NodeGroupLibrary::new();
        let mut existing = normal_rotation_group();
        existing.name = "Saved Rotation".to_string();
        library.insert(existing);

        let handle = library.find_or_create(&normal_rotation_group());
        assert!(!handle.created);
        assert_eq!(handle.name, "Saved Rotation");
        assert_eq!(library.len(), 1);
    }

    #[test]
    fn test_modified_group_recreated_not_touched() {
        let saved = NodeGroupLibrary::new();
        let first = saved.find_or_create(&normal_rotation_group());

        // A user adds a socket to the group in the saved document
        let mut doc: toml::Value = toml::from_str(&toml::to_string(&saved).unwrap()).unwrap();
        let extra = toml::Value::try_from(GroupSocket::new("Strength", SocketType::Float)).unwrap();
        doc.get_mut("groups")
            .and_then(|g| g.get_mut(&first.name))
            .and_then(|d| d.get_mut("inputs"))
            .and_then(|i| i.as_array_mut())
            .unwrap()
            .push(extra);
        let library: NodeGroupLibrary = doc.try_into().unwrap();

        let second = library.find_or_create(&normal_rotation_group());
        assert!(second.created);
        assert_ne!(second.name, first.name);
        assert_eq!(library.len(), 2);
        assert_eq!(library.get(&first.name).unwrap().inputs.len(), 2);

        // The fresh definition is now the cached one
        let third = library.find_or_create(&normal_rotation_group());
        assert!(!third.created);
        assert_eq!(third.name, second.name);
    }

    #[test]
    fn test_concurrent_find_or_create_single_definition() {
        let library = Arc::new(NodeGroupLibrary::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let library = Arc::clone(&library);
                std::thread::spawn(move || library.find_or_create(&normal_rotation_group()))
            })
            .collect();
        let created = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|h| h.created)
            .count();
        assert_eq!(created, 1);
        assert_eq!(library.len(), 1);
    }

    #[test]
    fn test_library_toml_roundtrip() {
        let library = NodeGroupLibrary::new();
        let handle = library.find_or_create(&normal_rotation_group());
        let text = toml::to_string(&library).unwrap();

        let reloaded: NodeGroupLibrary = toml::from_str(&text).unwrap();
        let again = reloaded.find_or_create(&normal_rotation_group());
        assert!(!again.created);
        assert_eq!(again.name, handle.name);
    }
}
