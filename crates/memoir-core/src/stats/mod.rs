//! Character stat tracking: tier tables, per-conversation rosters, and the
//! delta micro-format parser.
//!
//! Stat definitions are shared across conversations while character instances
//! are partitioned per conversation. The [`StateStore`] aggregate owns both
//! sides, so configuration edits and character mutations never have to reach
//! across module boundaries to stay consistent.

pub mod config;
pub mod delta;
pub mod roster;
pub mod store;
pub mod sync;
pub mod tiers;

pub use config::{StatConfiguration, StatDefinition};
pub use delta::{apply_deltas, DeltaReport, StatChange};
pub use roster::{Character, CharacterPatch, Partition, RosterStore};
pub use store::StateStore;
pub use sync::{rename_stat_key, sync_all};
pub use tiers::{resolve_tier, TierRange};
