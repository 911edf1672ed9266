//! The summarization cycle controller.
//!
//! `MemoryEngine` owns the settings, the stat/roster state, and the LLM
//! handle, and reacts to host notifications: assistant turns rendered,
//! conversation switches, and generation starts. One summarization may be in
//! flight at a time; the partition identity is captured when the call starts,
//! so a conversation switch during the call cannot redirect its results.

use crate::core_types::{ChatTurn, Message};
use crate::errors::MemoirError;
use crate::host::{ChatHost, PromptInjection};
use crate::llm::{CompletionClient, LLM};
use crate::settings::{DebouncedSaver, MemoirSettings};
use crate::stats::config::{apply_tracking_prompt, tracking_prompt, StatConfiguration, StatDefinition};
use crate::stats::delta::apply_deltas;
use crate::stats::roster::{Character, CharacterPatch};
use crate::stats::store::StateStore;
use crate::status_summary::{parse_status_summary, status_summary_prompt};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const SAVE_DEBOUNCE: Duration = Duration::from_millis(500);

struct EngineState {
    settings: MemoirSettings,
    store: StateStore,
    /// Qualifying assistant turns seen since the last summarization.
    turn_counter: u32,
    /// Highest turn index already handled; -1 for an empty conversation.
    last_processed: i64,
    in_flight: bool,
}

pub struct MemoryEngine {
    host: Arc<dyn ChatHost>,
    llm: Arc<dyn LLM>,
    saver: DebouncedSaver,
    state: Mutex<EngineState>,
}

/// Everything a summarization call needs, snapshotted before the await so the
/// call is pinned to the conversation it was started for.
struct SummarizeRequest {
    messages: Vec<Message>,
    partition_key: String,
    persona: String,
}

impl MemoryEngine {
    pub fn new(settings: MemoirSettings, host: Arc<dyn ChatHost>, llm: Arc<dyn LLM>) -> Self {
        let partition_key = Self::partition_key_of(host.as_ref());
        let store = StateStore::from_persisted(
            settings.stat_config.clone(),
            settings.rosters.clone(),
            partition_key,
        );
        let last_processed = host.turns().len() as i64 - 1;
        log::info!(
            "Memory engine initialized for partition '{}' (last turn index {})",
            store.roster().current_key(),
            last_processed
        );

        Self {
            saver: DebouncedSaver::new(Arc::clone(&host), SAVE_DEBOUNCE),
            host,
            llm,
            state: Mutex::new(EngineState {
                settings,
                store,
                turn_counter: 0,
                last_processed,
                in_flight: false,
            }),
        }
    }

    /// `persona::chat_id`, falling back to the persona name alone.
    fn partition_key_of(host: &dyn ChatHost) -> String {
        let persona = host.persona_name();
        match host.chat_id() {
            Some(chat_id) if !chat_id.is_empty() => format!("{}::{}", persona, chat_id),
            _ => persona,
        }
    }

    /// Notification: a new assistant turn finished rendering. Counts the turn
    /// and runs one summarization when the configured interval is reached.
    /// Old or repeated indexes are skipped; a missing API key/model or a
    /// summarization already in flight blocks a new one without consuming the
    /// accumulated count.
    pub async fn on_assistant_turn_rendered(&self, index: i64) {
        {
            let mut state = self.state.lock().unwrap();
            if !state.settings.enabled {
                return;
            }
            if index <= state.last_processed {
                log::debug!(
                    "Skipping old/duplicate turn {} (last processed {})",
                    index,
                    state.last_processed
                );
                return;
            }
            state.last_processed = index;

            if !state.settings.auto_update {
                log::debug!("Auto update disabled, not counting turn {}", index);
                return;
            }

            state.turn_counter += 1;
            let interval = state.settings.update_interval.max(1);
            log::info!("Turn counter {}/{}", state.turn_counter, interval);
            if state.turn_counter < interval {
                return;
            }
            // Never reach the endpoint unconfigured. The counter is kept, so
            // the next qualifying turn after configuration triggers.
            if state.settings.api_key.is_empty() || state.settings.model.is_empty() {
                log::warn!("Summarization due but API key/model not configured, skipping");
                return;
            }
            if state.in_flight {
                log::info!("Summarization already in flight, deferring");
                return;
            }
            state.turn_counter = 0;
            state.in_flight = true;
        }

        let result = self.run_summarization().await;
        self.state.lock().unwrap().in_flight = false;
        if let Err(err) = result {
            log::warn!("Automatic summarization failed: {}", err);
        }
    }

    /// Notification: the host switched conversations. Resets the rolling
    /// counter, rebases the last-processed index on the new conversation, and
    /// swaps in that conversation's roster partition and saved summary.
    pub fn on_conversation_changed(&self) {
        let mut state = self.state.lock().unwrap();
        if !state.settings.enabled {
            return;
        }

        state.turn_counter = 0;
        state.last_processed = self.host.turns().len() as i64 - 1;

        let persona = self.host.persona_name();
        let partition_key = Self::partition_key_of(self.host.as_ref());
        state.store.switch_partition(&partition_key);

        let saved = state
            .settings
            .character_injections
            .get(&persona)
            .cloned()
            .unwrap_or_default();
        if saved.is_empty() {
            log::info!("No saved summary for persona '{}'", persona);
        } else {
            log::info!(
                "Loaded saved summary for persona '{}' ({} chars)",
                persona,
                saved.len()
            );
        }
        state.settings.injection_content = saved;
    }

    /// Notification: the host is about to build a generation request.
    /// Re-publishes the current injection payload; empty content clears it.
    pub fn on_generation_started(&self) {
        let content = {
            let state = self.state.lock().unwrap();
            if !state.settings.enabled {
                return;
            }
            state.settings.injection_content.clone()
        };
        if content.is_empty() {
            log::debug!("Clearing prompt injection");
        } else {
            log::info!("Publishing prompt injection ({} chars)", content.len());
        }
        self.host.set_prompt_injection(PromptInjection::system(content));
    }

    /// Manual trigger: bypasses the interval and auto-update gating but still
    /// requires the feature enabled, an API key, and a model. Returns the
    /// final summary text, or `Ok(None)` when there was nothing to do.
    pub async fn summarize_now(&self) -> Result<Option<String>, MemoirError> {
        {
            let mut state = self.state.lock().unwrap();
            if !state.settings.enabled {
                return Err(MemoirError::Configuration("feature is disabled".to_string()));
            }
            if state.settings.api_key.is_empty() {
                return Err(MemoirError::Configuration("API key not configured".to_string()));
            }
            if state.settings.model.is_empty() {
                return Err(MemoirError::Configuration("no model selected".to_string()));
            }
            if state.in_flight {
                log::warn!("Summarization already in flight, manual trigger ignored");
                return Ok(None);
            }
            state.in_flight = true;
        }

        let result = self.run_summarization().await;
        self.state.lock().unwrap().in_flight = false;
        result
    }

    /// A depth of zero selects no turns.
    fn render_turns(turns: &[ChatTurn], depth: usize) -> String {
        let start = turns.len().saturating_sub(depth);
        turns[start..]
            .iter()
            .map(|t| format!("{}: {}", t.speaker_label(), t.text))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn build_request(&self, state: &EngineState) -> Option<SummarizeRequest> {
        let turns = self.host.turns();
        let conversation = Self::render_turns(&turns, state.settings.scan_depth);
        if conversation.is_empty() {
            log::info!("No turns selected for summarization, nothing to do");
            return None;
        }
        let persona = self.host.persona_name();
        let partition_key = Self::partition_key_of(self.host.as_ref());

        let previous = state
            .settings
            .character_injections
            .get(&persona)
            .filter(|s| !s.is_empty())
            .cloned()
            .or_else(|| {
                let active = &state.settings.injection_content;
                (!active.is_empty()).then(|| active.clone())
            });

        let user_content = match previous {
            Some(prev) => {
                log::info!("Chaining previous summary ({} chars)", prev.len());
                format!(
                    "之前的对话总结:\n{}\n\n请基于上述历史总结，继续总结以下最新对话，形成完整连贯的记忆总结:\n\n{}",
                    prev, conversation
                )
            }
            None => format!("请总结以下对话:\n\n{}", conversation),
        };

        let mut system_content = state.settings.prompt_template.clone();
        let status_section = status_summary_prompt(&state.settings.status_summary);
        if !status_section.is_empty() {
            system_content.push('\n');
            system_content.push_str(&status_section);
        }

        Some(SummarizeRequest {
            messages: vec![Message::system(system_content), Message::user(user_content)],
            partition_key,
            persona,
        })
    }

    /// One full cycle: snapshot, await the completion, merge the deltas into
    /// the partition captured at the start, persist, and activate the new
    /// injection payload when that partition is still current.
    async fn run_summarization(&self) -> Result<Option<String>, MemoirError> {
        let request = {
            let state = self.state.lock().unwrap();
            match self.build_request(&state) {
                Some(request) => request,
                None => return Ok(None),
            }
        };

        let response = self.llm.generate(request.messages).await?;
        let raw_text = response
            .content
            .filter(|s| !s.is_empty())
            .ok_or(MemoirError::EmptyResult)?;
        log::info!("Summary received ({} chars)", raw_text.len());

        let mut state = self.state.lock().unwrap();

        let config = state.store.config().clone();
        let characters = state.store.roster_mut().characters_for_mut(&request.partition_key);
        let (final_text, report) = apply_deltas(&raw_text, characters, &config);
        if report.block_found {
            log::info!(
                "Delta block applied: {} changes across {} characters",
                report.changes.len(),
                report.updated_character_count()
            );
        }

        if let Some(summary_data) = parse_status_summary(&final_text, &state.settings.status_summary)
        {
            state.settings.status_summary.summary_data = summary_data;
        }

        state
            .settings
            .character_injections
            .insert(request.persona.clone(), final_text.clone());
        // The active payload tracks the *current* conversation; only update it
        // when the conversation this call started for is still selected.
        if Self::partition_key_of(self.host.as_ref()) == request.partition_key {
            state.settings.injection_content = final_text.clone();
        } else {
            log::info!(
                "Conversation changed during summarization; result saved to '{}' only",
                request.partition_key
            );
        }

        Self::sync_and_save(&mut state, &self.saver);
        Ok(Some(final_text))
    }

    /// Mirrors the store into the settings blob and schedules one coalesced
    /// host write.
    fn sync_and_save(state: &mut EngineState, saver: &DebouncedSaver) {
        state.settings.stat_config = state.store.config().clone();
        state.settings.rosters = state.store.snapshot_partitions();
        saver.schedule(state.settings.clone());
    }

    /// Regenerates the stat-tracking section of the prompt template from the
    /// current configuration and roster.
    fn refresh_tracking_prompt(state: &mut EngineState) {
        let section = tracking_prompt(state.store.config(), state.store.characters());
        state.settings.prompt_template =
            apply_tracking_prompt(&state.settings.prompt_template, &section);
    }

    // --- configuration and roster operations -----------------------------

    pub fn set_stat_config(&self, config: StatConfiguration) {
        let mut state = self.state.lock().unwrap();
        state.store.set_config(config);
        Self::refresh_tracking_prompt(&mut state);
        Self::sync_and_save(&mut state, &self.saver);
    }

    pub fn add_stat(&self, def: StatDefinition) {
        let mut state = self.state.lock().unwrap();
        state.store.add_stat(def);
        Self::refresh_tracking_prompt(&mut state);
        Self::sync_and_save(&mut state, &self.saver);
    }

    pub fn remove_stat(&self, name: &str) -> bool {
        let mut state = self.state.lock().unwrap();
        let removed = state.store.remove_stat(name);
        if removed {
            Self::refresh_tracking_prompt(&mut state);
            Self::sync_and_save(&mut state, &self.saver);
        }
        removed
    }

    pub fn rename_stat(&self, old: &str, new: &str) -> bool {
        let mut state = self.state.lock().unwrap();
        let renamed = state.store.rename_stat(old, new);
        if renamed {
            Self::refresh_tracking_prompt(&mut state);
            Self::sync_and_save(&mut state, &self.saver);
        }
        renamed
    }

    pub fn add_character(&self, name: impl Into<String>) -> Character {
        let mut state = self.state.lock().unwrap();
        let character = state.store.add_character(name);
        Self::refresh_tracking_prompt(&mut state);
        Self::sync_and_save(&mut state, &self.saver);
        character
    }

    pub fn remove_character(&self, id: u64) -> bool {
        let mut state = self.state.lock().unwrap();
        let removed = state.store.remove_character(id);
        if removed {
            Self::refresh_tracking_prompt(&mut state);
            Self::sync_and_save(&mut state, &self.saver);
        }
        removed
    }

    pub fn update_character(&self, id: u64, patch: CharacterPatch) -> bool {
        let mut state = self.state.lock().unwrap();
        let updated = state.store.update_character(id, patch);
        if updated {
            Self::refresh_tracking_prompt(&mut state);
            Self::sync_and_save(&mut state, &self.saver);
        }
        updated
    }

    pub fn characters(&self) -> Vec<Character> {
        self.state.lock().unwrap().store.characters().to_vec()
    }

    /// Serializes the current conversation's characters as pretty JSON.
    pub fn export_characters(&self) -> Result<String, MemoirError> {
        let state = self.state.lock().unwrap();
        Ok(state.store.roster().export_json()?)
    }

    /// Replaces the current conversation's characters from a JSON array,
    /// returning how many were imported. Imported stat maps are synced
    /// against the configuration.
    pub fn import_characters(&self, json: &str) -> Result<usize, MemoirError> {
        let mut state = self.state.lock().unwrap();
        let count = state.store.roster_mut().import_json(json)?;
        let config = state.store.config().clone();
        crate::stats::sync::sync_all(state.store.roster_mut().characters_mut(), &config);
        Self::refresh_tracking_prompt(&mut state);
        Self::sync_and_save(&mut state, &self.saver);
        log::info!("Imported {} characters", count);
        Ok(count)
    }

    /// Fetches the model list from the configured endpoint and persists it
    /// into the settings blob.
    pub async fn refresh_model_list(&self) -> Result<Vec<String>, MemoirError> {
        let snapshot = self.settings();
        if snapshot.api_key.is_empty() {
            return Err(MemoirError::Configuration("API key not configured".to_string()));
        }
        let client = CompletionClient::from_settings(&snapshot);
        let models = client.list_models().await?;

        let mut state = self.state.lock().unwrap();
        state.settings.model_list = models.clone();
        Self::sync_and_save(&mut state, &self.saver);
        Ok(models)
    }

    /// Snapshot of the settings blob (the export surface for any UI layer).
    pub fn settings(&self) -> MemoirSettings {
        self.state.lock().unwrap().settings.clone()
    }

    /// Applies a mutation to the settings and schedules a coalesced save.
    pub fn update_settings(&self, mutate: impl FnOnce(&mut MemoirSettings)) {
        let mut state = self.state.lock().unwrap();
        mutate(&mut state.settings);
        Self::sync_and_save(&mut state, &self.saver);
    }

    /// Forces any pending settings write out immediately.
    pub async fn flush_settings(&self) -> Result<(), MemoirError> {
        self.saver.flush().await
    }
}
