//! Per-conversation character rosters.
//!
//! Each conversation partition owns an independent ordered list of characters
//! plus its own next-id counter. Switching partitions flushes the in-memory
//! working set into a keyed map and loads the target partition's set. Ids are
//! monotonically assigned and never reused after deletion within a session.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

fn default_tracking() -> bool {
    true
}

/// A tracked character/entity. `stats` keys are kept in sync with the stat
/// configuration by the synchronizer; transient divergence is tolerated only
/// between a config edit and the next sync. The serde field names match the
/// original persisted blob (`otherName` / `tracking`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Character {
    pub id: u64,
    pub name: String,
    #[serde(rename = "otherName", default)]
    pub alternate_name: String,
    #[serde(default = "default_tracking")]
    pub tracking: bool,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub stats: HashMap<String, i64>,
}

/// Partial update applied to an existing character.
#[derive(Debug, Clone, Default)]
pub struct CharacterPatch {
    pub name: Option<String>,
    pub alternate_name: Option<String>,
    pub tracking: Option<bool>,
    pub description: Option<String>,
    pub stats: Option<HashMap<String, i64>>,
}

/// One conversation's roster and id counter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Partition {
    #[serde(default)]
    pub characters: Vec<Character>,
    #[serde(default = "Partition::initial_next_id")]
    pub next_id: u64,
}

impl Partition {
    fn initial_next_id() -> u64 {
        1
    }

    /// `max(existing ids) + 1`, or 1 when empty.
    pub fn recompute_next_id(&mut self) {
        self.next_id = self.characters.iter().map(|c| c.id).max().unwrap_or(0) + 1;
    }
}

impl Default for Partition {
    fn default() -> Self {
        Self {
            characters: Vec::new(),
            next_id: 1,
        }
    }
}

/// Keyed map of partitions plus the current working set. The working set is
/// authoritative for the current key; the map holds everything else.
#[derive(Debug, Clone)]
pub struct RosterStore {
    current_key: String,
    current: Partition,
    partitions: HashMap<String, Partition>,
}

impl RosterStore {
    pub fn new(initial_key: impl Into<String>) -> Self {
        Self {
            current_key: initial_key.into(),
            current: Partition::default(),
            partitions: HashMap::new(),
        }
    }

    /// Restores a store from persisted partition data, making `current_key`
    /// the working set.
    pub fn from_partitions(
        mut partitions: HashMap<String, Partition>,
        current_key: impl Into<String>,
    ) -> Self {
        let current_key = current_key.into();
        let mut current = partitions.remove(&current_key).unwrap_or_default();
        current.recompute_next_id();
        Self {
            current_key,
            current,
            partitions,
        }
    }

    pub fn current_key(&self) -> &str {
        &self.current_key
    }

    pub fn characters(&self) -> &[Character] {
        &self.current.characters
    }

    pub fn characters_mut(&mut self) -> &mut Vec<Character> {
        &mut self.current.characters
    }

    pub fn next_id(&self) -> u64 {
        self.current.next_id
    }

    /// The character list owned by `key`: the working set when `key` is
    /// current, otherwise the mapped partition (created empty when unseen).
    /// Used by in-flight summarizations that must persist into the partition
    /// they were started for, not whatever is current at completion time.
    pub fn characters_for_mut(&mut self, key: &str) -> &mut Vec<Character> {
        if key == self.current_key {
            &mut self.current.characters
        } else {
            &mut self.partitions.entry(key.to_string()).or_default().characters
        }
    }

    /// Saves the working set under the outgoing key (when non-empty or
    /// previously existing), then loads the incoming key's partition and
    /// recomputes its next-id counter.
    pub fn switch_partition(&mut self, key: &str) {
        if key == self.current_key {
            return;
        }

        if !self.current.characters.is_empty() || self.partitions.contains_key(&self.current_key) {
            self.partitions
                .insert(self.current_key.clone(), std::mem::take(&mut self.current));
        }

        let mut incoming = self.partitions.get(key).cloned().unwrap_or_default();
        incoming.recompute_next_id();
        log::info!(
            "Switched roster partition '{}' -> '{}' ({} characters)",
            self.current_key,
            key,
            incoming.characters.len()
        );
        self.current = incoming;
        self.current_key = key.to_string();
    }

    /// Adds a character to the current partition with the next id. Stat
    /// zero-filling against the configuration is the store's job.
    pub fn add_character(&mut self, name: impl Into<String>) -> &mut Character {
        let character = Character {
            id: self.current.next_id,
            name: name.into(),
            alternate_name: String::new(),
            tracking: true,
            description: String::new(),
            stats: HashMap::new(),
        };
        self.current.next_id += 1;
        self.current.characters.push(character);
        let idx = self.current.characters.len() - 1;
        &mut self.current.characters[idx]
    }

    /// Removes by id. Ids are never reused: `next_id` does not decrease.
    pub fn remove_character(&mut self, id: u64) -> bool {
        let before = self.current.characters.len();
        self.current.characters.retain(|c| c.id != id);
        before != self.current.characters.len()
    }

    pub fn update_character(&mut self, id: u64, patch: CharacterPatch) -> bool {
        let Some(character) = self.current.characters.iter_mut().find(|c| c.id == id) else {
            return false;
        };
        if let Some(name) = patch.name {
            character.name = name;
        }
        if let Some(alternate_name) = patch.alternate_name {
            character.alternate_name = alternate_name;
        }
        if let Some(tracking) = patch.tracking {
            character.tracking = tracking;
        }
        if let Some(description) = patch.description {
            character.description = description;
        }
        if let Some(stats) = patch.stats {
            character.stats = stats;
        }
        true
    }

    /// Snapshot of every partition, the working set included, for
    /// persistence into the settings blob.
    pub fn snapshot(&self) -> HashMap<String, Partition> {
        let mut all = self.partitions.clone();
        all.insert(self.current_key.clone(), self.current.clone());
        all
    }

    /// Serializes the current partition's character list as pretty JSON.
    pub fn export_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.current.characters)
    }

    /// Replaces the current partition's characters from a JSON array and
    /// recomputes the id counter.
    pub fn import_json(&mut self, json: &str) -> Result<usize, serde_json::Error> {
        let imported: Vec<Character> = serde_json::from_str(json)?;
        let count = imported.len();
        self.current.characters = imported;
        self.current.recompute_next_id();
        Ok(count)
    }

    /// All character lists across every partition, for config-change syncs
    /// that must touch the working set and the map alike.
    pub fn all_characters_mut(&mut self) -> Vec<&mut Vec<Character>> {
        let mut lists = vec![&mut self.current.characters];
        for partition in self.partitions.values_mut() {
            lists.push(&mut partition.characters);
        }
        lists
    }
}
