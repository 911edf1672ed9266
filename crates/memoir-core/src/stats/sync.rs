//! Reconciliation of character stat maps against the current configuration.
//!
//! Whenever stats are added, removed, or renamed, every character's numeric
//! state must be brought back in line: unchanged stats keep their values, new
//! stats zero-fill, removed stats drop. The rest of the pipeline assumes this
//! invariant holds at all times outside of a single mutating call.

use crate::stats::config::StatConfiguration;
use crate::stats::roster::Character;
use std::collections::HashMap;

/// Rebuilds each character's stat map so its keys are exactly the configured
/// stat names. Idempotent. An empty configuration clears every map.
pub fn sync_all(characters: &mut [Character], config: &StatConfiguration) {
    for character in characters.iter_mut() {
        let mut next = HashMap::with_capacity(config.stats.len());
        for def in &config.stats {
            let value = character.stats.get(&def.name).copied().unwrap_or(0);
            next.insert(def.name.clone(), value);
        }

        let removed: Vec<&String> = character
            .stats
            .keys()
            .filter(|k| !config.contains(k))
            .collect();
        let added: Vec<&String> = config
            .stats
            .iter()
            .map(|d| &d.name)
            .filter(|n| !character.stats.contains_key(*n))
            .collect();
        if !removed.is_empty() || !added.is_empty() {
            log::debug!(
                "Synced stats for character '{}': removed {:?}, added {:?}",
                character.name,
                removed,
                added
            );
        }

        character.stats = next;
    }
}

/// Moves the value stored under `old` to `new` for every character that has
/// it. Must run *before* [`sync_all`] is invoked with the renamed
/// configuration, otherwise the value is lost to the zero-fill rule.
pub fn rename_stat_key(characters: &mut [Character], old: &str, new: &str) {
    for character in characters.iter_mut() {
        if let Some(value) = character.stats.remove(old) {
            character.stats.insert(new.to_string(), value);
            log::debug!(
                "Renamed stat '{}' -> '{}' for character '{}'",
                old,
                new,
                character.name
            );
        }
    }
}
