//! Aggregate owner of the stat configuration and the partitioned rosters.
//!
//! Configuration mutations immediately re-sync every partition's character
//! list; this is not optional, since the rest of the pipeline assumes each
//! character's stat keys exactly match the configured names at all times
//! outside of a single mutating call.

use crate::stats::config::{StatConfiguration, StatDefinition};
use crate::stats::roster::{Character, CharacterPatch, Partition, RosterStore};
use crate::stats::sync::{rename_stat_key, sync_all};
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct StateStore {
    config: StatConfiguration,
    roster: RosterStore,
}

impl StateStore {
    pub fn new(config: StatConfiguration, initial_key: impl Into<String>) -> Self {
        Self {
            config,
            roster: RosterStore::new(initial_key),
        }
    }

    /// Restores from persisted data and syncs once, in case the blob was
    /// written by an older configuration.
    pub fn from_persisted(
        config: StatConfiguration,
        partitions: HashMap<String, Partition>,
        current_key: impl Into<String>,
    ) -> Self {
        let mut store = Self {
            config,
            roster: RosterStore::from_partitions(partitions, current_key),
        };
        store.sync_everywhere();
        store
    }

    pub fn config(&self) -> &StatConfiguration {
        &self.config
    }

    pub fn characters(&self) -> &[Character] {
        self.roster.characters()
    }

    pub fn roster(&self) -> &RosterStore {
        &self.roster
    }

    pub fn roster_mut(&mut self) -> &mut RosterStore {
        &mut self.roster
    }

    fn sync_everywhere(&mut self) {
        for list in self.roster.all_characters_mut() {
            sync_all(list, &self.config);
        }
    }

    /// Replaces the whole configuration (the "save" action of the stat
    /// editor) and re-syncs every partition.
    pub fn set_config(&mut self, config: StatConfiguration) {
        self.config = config;
        self.sync_everywhere();
    }

    pub fn add_stat(&mut self, def: StatDefinition) {
        self.config.stats.push(def);
        self.sync_everywhere();
    }

    pub fn remove_stat(&mut self, name: &str) -> bool {
        let before = self.config.stats.len();
        self.config.stats.retain(|s| s.name != name);
        let removed = before != self.config.stats.len();
        if removed {
            self.sync_everywhere();
        }
        removed
    }

    /// Renames a stat, propagating existing values to the new key across
    /// every partition before the zero-fill sync runs.
    pub fn rename_stat(&mut self, old: &str, new: &str) -> bool {
        if old == new || !self.config.contains(old) {
            return false;
        }

        for list in self.roster.all_characters_mut() {
            rename_stat_key(list, old, new);
        }
        for def in &mut self.config.stats {
            if def.name == old {
                def.name = new.to_string();
                break;
            }
        }
        self.sync_everywhere();
        true
    }

    /// Adds a character to the current partition with every configured stat
    /// zero-filled.
    pub fn add_character(&mut self, name: impl Into<String>) -> Character {
        let stats = self
            .config
            .stats
            .iter()
            .map(|s| (s.name.clone(), 0))
            .collect();
        let character = self.roster.add_character(name);
        character.stats = stats;
        character.clone()
    }

    pub fn remove_character(&mut self, id: u64) -> bool {
        self.roster.remove_character(id)
    }

    /// Applies a patch, then re-syncs that character's stat keys so a patch
    /// cannot introduce unconfigured stats.
    pub fn update_character(&mut self, id: u64, patch: CharacterPatch) -> bool {
        if !self.roster.update_character(id, patch) {
            return false;
        }
        sync_all(self.roster.characters_mut(), &self.config);
        true
    }

    pub fn switch_partition(&mut self, key: &str) {
        self.roster.switch_partition(key);
    }

    pub fn snapshot_partitions(&self) -> HashMap<String, Partition> {
        self.roster.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::tiers::TierRange;

    fn stat(name: &str) -> StatDefinition {
        StatDefinition {
            name: name.to_string(),
            description: String::new(),
            tiers: vec![TierRange {
                label: "默认".to_string(),
                from: -999,
                to: 999,
                description: "默认".to_string(),
            }],
        }
    }

    fn store_with(names: &[&str]) -> StateStore {
        StateStore::new(
            StatConfiguration {
                stats: names.iter().map(|n| stat(n)).collect(),
            },
            "张大力::chat-1",
        )
    }

    #[test]
    fn new_characters_are_zero_filled_from_config() {
        let mut store = store_with(&["生命值", "法力值"]);
        let character = store.add_character("张大力");
        assert_eq!(character.stats.len(), 2);
        assert_eq!(character.stats["生命值"], 0);
    }

    #[test]
    fn add_stat_syncs_every_partition() {
        let mut store = store_with(&["生命值"]);
        store.add_character("张大力");
        store.switch_partition("李佳::chat-2");
        store.add_character("李佳");

        store.add_stat(stat("法力值"));

        assert_eq!(store.characters()[0].stats["法力值"], 0);
        store.switch_partition("张大力::chat-1");
        assert_eq!(store.characters()[0].stats["法力值"], 0);
    }

    #[test]
    fn remove_stat_drops_values_everywhere() {
        let mut store = store_with(&["生命值", "法力值"]);
        store.add_character("张大力");
        assert!(store.remove_stat("法力值"));
        assert!(!store.remove_stat("不存在"));
        assert_eq!(store.characters()[0].stats.len(), 1);
    }

    #[test]
    fn rename_stat_preserves_values_across_partitions() {
        let mut store = store_with(&["生命值"]);
        store.add_character("张大力");
        store.update_character(
            1,
            CharacterPatch {
                stats: Some([("生命值".to_string(), -110)].into_iter().collect()),
                ..Default::default()
            },
        );
        store.switch_partition("李佳::chat-2");

        assert!(store.rename_stat("生命值", "体力值"));

        store.switch_partition("张大力::chat-1");
        assert_eq!(store.characters()[0].stats["体力值"], -110);
        assert!(!store.characters()[0].stats.contains_key("生命值"));
    }

    #[test]
    fn update_character_cannot_introduce_unconfigured_stats() {
        let mut store = store_with(&["生命值"]);
        store.add_character("张大力");
        store.update_character(
            1,
            CharacterPatch {
                stats: Some(
                    [("生命值".to_string(), 5), ("野键".to_string(), 9)]
                        .into_iter()
                        .collect(),
                ),
                ..Default::default()
            },
        );

        let stats = &store.characters()[0].stats;
        assert_eq!(stats["生命值"], 5);
        assert!(!stats.contains_key("野键"));
    }
}
