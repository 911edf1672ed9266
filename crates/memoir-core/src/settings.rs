//! Persisted settings blob and coalesced persistence.
//!
//! The host stores one JSON blob per extension; this struct mirrors the shape
//! the original extension persisted (camelCase keys included) so existing
//! blobs load without migration. Defaults follow the layered-optional pattern:
//! every field has a `#[serde(default)]`, so a minimal blob progressively
//! enhances into a full configuration.

use crate::errors::MemoirError;
use crate::host::ChatHost;
use crate::stats::config::StatConfiguration;
use crate::stats::roster::Partition;
use crate::status_summary::StatusSummarySettings;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_PROMPT_TEMPLATE: &str = "请总结最近的对话要点，提取重要信息和情感变化，保持简洁。";

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_prompt_template() -> String {
    DEFAULT_PROMPT_TEMPLATE.to_string()
}

fn default_scan_depth() -> usize {
    3
}

fn default_true() -> bool {
    true
}

fn default_update_interval() -> u32 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemoirSettings {
    #[serde(rename = "apiKey", default)]
    pub api_key: String,
    #[serde(rename = "apiUrl", default = "default_api_url")]
    pub api_url: String,
    #[serde(rename = "aiModel", default = "default_model")]
    pub model: String,
    /// How many recent turns each summarization reads.
    #[serde(rename = "scanDepth", default = "default_scan_depth")]
    pub scan_depth: usize,
    #[serde(rename = "promptTemplate", default = "default_prompt_template")]
    pub prompt_template: String,
    /// The currently active injection payload (the selected conversation's
    /// saved summary).
    #[serde(rename = "injectionContent", default)]
    pub injection_content: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(rename = "autoUpdate", default = "default_true")]
    pub auto_update: bool,
    /// Summarize after this many qualifying assistant turns.
    #[serde(rename = "updateInterval", default = "default_update_interval")]
    pub update_interval: u32,
    /// Saved summaries keyed by persona name.
    #[serde(rename = "characterInjections", default)]
    pub character_injections: HashMap<String, String>,
    #[serde(rename = "modelList", default)]
    pub model_list: Vec<String>,
    #[serde(rename = "statsData", default)]
    pub stat_config: StatConfiguration,
    /// Character rosters keyed by conversation partition.
    #[serde(default)]
    pub rosters: HashMap<String, Partition>,
    #[serde(rename = "statusSummarySettings", default)]
    pub status_summary: StatusSummarySettings,
}

impl Default for MemoirSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_url: default_api_url(),
            model: default_model(),
            scan_depth: default_scan_depth(),
            prompt_template: default_prompt_template(),
            injection_content: String::new(),
            enabled: true,
            auto_update: true,
            update_interval: default_update_interval(),
            character_injections: HashMap::new(),
            model_list: Vec::new(),
            stat_config: StatConfiguration::default(),
            rosters: HashMap::new(),
            status_summary: StatusSummarySettings::default(),
        }
    }
}

/// Coalesces rapid settings mutations into one host write. Each schedule
/// replaces the pending snapshot; the first schedule in a burst arms a timer
/// that flushes whatever snapshot is latest when it fires. Fire-and-forget:
/// failures are logged, and writes eventually converge to the latest state.
#[derive(Clone)]
pub struct DebouncedSaver {
    host: Arc<dyn ChatHost>,
    pending: Arc<Mutex<Option<MemoirSettings>>>,
    delay: Duration,
}

impl DebouncedSaver {
    pub fn new(host: Arc<dyn ChatHost>, delay: Duration) -> Self {
        Self {
            host,
            pending: Arc::new(Mutex::new(None)),
            delay,
        }
    }

    pub fn schedule(&self, settings: MemoirSettings) {
        let armed = {
            let mut slot = self.pending.lock().unwrap();
            let was_empty = slot.is_none();
            *slot = Some(settings);
            was_empty
        };
        if !armed {
            return;
        }

        let host = Arc::clone(&self.host);
        let pending = Arc::clone(&self.pending);
        let delay = self.delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let latest = pending.lock().unwrap().take();
            if let Some(settings) = latest {
                if let Err(err) = host.save_settings(&settings).await {
                    log::warn!("Debounced settings save failed: {}", err);
                } else {
                    log::debug!("Settings flushed to host");
                }
            }
        });
    }

    /// Immediately writes the pending snapshot, if any.
    pub async fn flush(&self) -> Result<(), MemoirError> {
        let latest = self.pending.lock().unwrap().take();
        if let Some(settings) = latest {
            self.host.save_settings(&settings).await?;
        }
        Ok(())
    }
}
