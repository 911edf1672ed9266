//! Delta block parsing and in-place status rendering.
//!
//! The model is instructed to embed a backtick-wrapped JSON array between
//! `<数据统计>` tags anywhere in its output. Each array element carries one
//! character name plus `"<stat>变化"` integer entries. This module extracts
//! that block, merges the deltas into the character roster, and rewrites the
//! block as a human-readable `<角色当前状态>` section with tier descriptions
//! in place of numbers. Every failure mode degrades to pass-through: text
//! without a block, malformed JSON, or a non-array payload all come back
//! unchanged, and unmatched elements are silently skipped.

use crate::stats::config::StatConfiguration;
use crate::stats::roster::Character;
use crate::stats::tiers::resolve_tier;
use regex::Regex;
use serde_json::Value;

/// Key aliases accepted for the character name inside a delta element.
const NAME_KEYS: [&str; 3] = ["角色名", "角色", "name"];

/// Suffix stripped from delta keys to recover the stat name.
const DELTA_SUFFIX: &str = "变化";

/// One applied stat change, reported for logging/notification purposes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatChange {
    pub character: String,
    pub stat: String,
    pub delta: i64,
    pub new_value: i64,
}

/// Outcome of one parsing pass.
#[derive(Debug, Clone, Default)]
pub struct DeltaReport {
    /// Whether a delta block was found and rewritten at all.
    pub block_found: bool,
    pub changes: Vec<StatChange>,
}

impl DeltaReport {
    pub fn updated_character_count(&self) -> usize {
        let mut names: Vec<&str> = self.changes.iter().map(|c| c.character.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        names.len()
    }
}

fn block_regex() -> Regex {
    Regex::new(r"(?s)<数据统计>`(.+?)`</数据统计>").unwrap()
}

/// Mirrors JavaScript `parseInt(value) || 0`: integers pass through, floats
/// truncate, numeric strings parse, everything else coerces to 0.
fn coerce_delta(value: &Value) -> i64 {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        Value::String(s) => {
            let trimmed = s.trim();
            trimmed
                .parse::<i64>()
                .ok()
                .or_else(|| trimmed.parse::<f64>().ok().map(|f| f as i64))
                .unwrap_or(0)
        }
        _ => 0,
    }
}

/// Cascading name match: exact name, exact alternate name, substring
/// containment either direction on the alternate name, then either direction
/// on the name. First character in list order wins within each rule. Aliases
/// overlapping across characters resolve to whichever character sorts first;
/// no stricter tie-break is applied.
fn match_character(characters: &[Character], name: &str) -> Option<usize> {
    characters
        .iter()
        .position(|c| c.name == name)
        .or_else(|| characters.iter().position(|c| c.alternate_name == name))
        .or_else(|| {
            characters.iter().position(|c| {
                !c.alternate_name.is_empty()
                    && (c.alternate_name.contains(name) || name.contains(&c.alternate_name))
            })
        })
        .or_else(|| {
            characters
                .iter()
                .position(|c| !c.name.is_empty() && (c.name.contains(name) || name.contains(&c.name)))
        })
}

fn element_name(element: &serde_json::Map<String, Value>) -> Option<&str> {
    NAME_KEYS
        .iter()
        .find_map(|key| element.get(*key).and_then(Value::as_str))
        .filter(|s| !s.is_empty())
}

/// Renders one status line per character: `name:` plus comma-joined tier
/// descriptions for each configured stat that resolves to a tier. Characters
/// whose stats all fall outside configured ranges are omitted entirely.
fn render_status(characters: &[Character], indexes: &[usize], config: &StatConfiguration) -> String {
    let mut lines = Vec::new();
    for &idx in indexes {
        let character = &characters[idx];
        let mut texts = Vec::new();
        for def in &config.stats {
            let Some(&value) = character.stats.get(&def.name) else {
                continue;
            };
            if let Some(tier) = resolve_tier(value, &def.tiers) {
                if !tier.description.is_empty() {
                    texts.push(tier.description.clone());
                }
            }
        }
        if !texts.is_empty() {
            lines.push(format!("{}:{}", character.name, texts.join(",")));
        }
    }
    lines.join("\n")
}

/// Extracts the delta block from `raw`, merges the deltas into `characters`,
/// and returns the text with the block replaced by a rendered status section.
/// Text outside the block is never touched; text without a parseable block is
/// returned unchanged.
pub fn apply_deltas(
    raw: &str,
    characters: &mut [Character],
    config: &StatConfiguration,
) -> (String, DeltaReport) {
    let mut report = DeltaReport::default();
    let regex = block_regex();

    let Some(captures) = regex.captures(raw) else {
        log::debug!("No delta block found in summary text");
        return (raw.to_string(), report);
    };
    let payload = captures[1].trim().to_string();

    let parsed: Value = match serde_json::from_str(&payload) {
        Ok(value) => value,
        Err(err) => {
            log::warn!("Delta block JSON failed to parse, passing through: {}", err);
            return (raw.to_string(), report);
        }
    };
    let Value::Array(elements) = parsed else {
        log::warn!("Delta block payload is not an array, passing through");
        return (raw.to_string(), report);
    };

    report.block_found = true;

    // indexes of characters that received a real update, in first-update order
    let mut updated: Vec<usize> = Vec::new();
    // every referenced element that matched a character, update or not
    let mut referenced: Vec<usize> = Vec::new();

    for element in &elements {
        let Some(object) = element.as_object() else {
            log::warn!("Skipping non-object delta element: {}", element);
            continue;
        };
        let Some(name) = element_name(object) else {
            log::warn!("Skipping delta element without a character name: {}", element);
            continue;
        };
        let Some(idx) = match_character(characters, name) else {
            log::warn!("No character matched delta name '{}'", name);
            continue;
        };
        if !referenced.contains(&idx) {
            referenced.push(idx);
        }

        let mut has_updates = false;
        for (key, value) in object {
            if NAME_KEYS.contains(&key.as_str()) {
                continue;
            }
            let stat_name = key.strip_suffix(DELTA_SUFFIX).unwrap_or(key);
            if !config.contains(stat_name) {
                log::warn!("Stat '{}' is not configured, skipping", stat_name);
                continue;
            }
            let delta = coerce_delta(value);
            if delta == 0 {
                continue;
            }

            let character = &mut characters[idx];
            let entry = character.stats.entry(stat_name.to_string()).or_insert(0);
            *entry += delta;
            log::info!(
                "Character '{}' stat '{}' changed by {} to {}",
                character.name,
                stat_name,
                delta,
                *entry
            );
            report.changes.push(StatChange {
                character: character.name.clone(),
                stat: stat_name.to_string(),
                delta,
                new_value: *entry,
            });
            has_updates = true;
        }

        if has_updates && !updated.contains(&idx) {
            updated.push(idx);
        }
    }

    // Render updated characters; fall back to every referenced-and-matched
    // character so the output is never empty when the input was non-trivial.
    let render_set = if updated.is_empty() { &referenced } else { &updated };
    let rendered = render_status(characters, render_set, config);
    let replacement = format!("<角色当前状态>{}</角色当前状态>", rendered);
    let result = regex
        .replace(raw, regex::NoExpand(&replacement))
        .into_owned();

    (result, report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::config::StatConfiguration;

    fn character(id: u64, name: &str, alt: &str, stats: &[(&str, i64)]) -> Character {
        Character {
            id,
            name: name.to_string(),
            alternate_name: alt.to_string(),
            tracking: true,
            description: String::new(),
            stats: stats.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
        }
    }

    fn config() -> StatConfiguration {
        StatConfiguration::default()
    }

    const SAMPLE: &str = "查线路无果，邀\"你\"今晚一起去变电站查看。\n<数据统计>`[{\"角色名\": \"张大力\",\"生命值变化\": -110,\"法力值变化\": 5},{\"角色名\": \"李佳\",\"生命值变化\": 0,\"法力值变化\": -30}]`</数据统计>";

    #[test]
    fn merges_deltas_and_rewrites_block() {
        let mut characters = vec![
            character(1, "张大力", "", &[("生命值", 0), ("法力值", 0)]),
            character(2, "李佳", "", &[("生命值", 0), ("法力值", 0)]),
        ];

        let (text, report) = apply_deltas(SAMPLE, &mut characters, &config());

        assert_eq!(characters[0].stats["生命值"], -110);
        assert_eq!(characters[0].stats["法力值"], 5);
        assert_eq!(characters[1].stats["法力值"], -30);
        // zero delta is a no-op
        assert_eq!(characters[1].stats["生命值"], 0);

        assert!(report.block_found);
        assert_eq!(report.updated_character_count(), 2);

        // -110 resolves to 垂死, 5 to 正常 (first matching tier in order)
        assert!(text.contains("<角色当前状态>张大力:再接受一次攻击就会死亡,正常"));
        assert!(!text.contains("<数据统计>"));
        assert!(text.starts_with("查线路无果"));
    }

    #[test]
    fn text_without_block_is_identity() {
        let mut characters = vec![character(1, "张大力", "", &[("生命值", 0)])];
        let raw = "普通总结文本，没有统计块。";
        let (text, report) = apply_deltas(raw, &mut characters, &config());
        assert_eq!(text, raw);
        assert!(!report.block_found);
    }

    #[test]
    fn malformed_json_passes_through() {
        let mut characters = vec![character(1, "张大力", "", &[("生命值", 0)])];
        let raw = "前文<数据统计>`[{\"角色名\": 未加引号}]`</数据统计>后文";
        let (text, report) = apply_deltas(raw, &mut characters, &config());
        assert_eq!(text, raw);
        assert!(report.changes.is_empty());
        assert_eq!(characters[0].stats["生命值"], 0);
    }

    #[test]
    fn non_array_payload_passes_through() {
        let mut characters = vec![character(1, "张大力", "", &[])];
        let raw = "<数据统计>`{\"角色名\": \"张大力\"}`</数据统计>";
        let (text, _) = apply_deltas(raw, &mut characters, &config());
        assert_eq!(text, raw);
    }

    #[test]
    fn unknown_characters_and_stats_are_skipped() {
        let mut characters = vec![character(1, "张大力", "", &[("生命值", 0), ("法力值", 0)])];
        let raw = "<数据统计>`[{\"角色名\": \"王五\",\"生命值变化\": -10},{\"角色名\": \"张大力\",\"未知属性变化\": 3,\"生命值变化\": -5}]`</数据统计>";

        let (text, report) = apply_deltas(raw, &mut characters, &config());

        assert_eq!(characters[0].stats["生命值"], -5);
        assert!(!characters[0].stats.contains_key("未知属性"));
        assert_eq!(report.changes.len(), 1);
        assert!(text.contains("<角色当前状态>"));
    }

    #[test]
    fn matches_by_alternate_name_and_substring() {
        let mut characters = vec![
            character(1, "张大力", "大力哥", &[("生命值", 0), ("法力值", 0)]),
            character(2, "李佳", "", &[("生命值", 0), ("法力值", 0)]),
        ];
        let raw = "<数据统计>`[{\"角色名\": \"大力\",\"生命值变化\": -10},{\"name\": \"小李佳\",\"法力值变化\": 2}]`</数据统计>";

        apply_deltas(raw, &mut characters, &config());

        // "大力" is a substring of alternate name "大力哥"
        assert_eq!(characters[0].stats["生命值"], -10);
        // "小李佳" contains name "李佳"
        assert_eq!(characters[1].stats["法力值"], 2);
    }

    #[test]
    fn string_deltas_coerce_like_parse_int() {
        let mut characters = vec![character(1, "张大力", "", &[("生命值", 0), ("法力值", 0)])];
        let raw = "<数据统计>`[{\"角色名\": \"张大力\",\"生命值变化\": \"-15\",\"法力值变化\": \"abc\"}]`</数据统计>";

        apply_deltas(raw, &mut characters, &config());

        assert_eq!(characters[0].stats["生命值"], -15);
        assert_eq!(characters[0].stats["法力值"], 0);
    }

    #[test]
    fn all_zero_deltas_still_rewrite_with_referenced_characters() {
        let mut characters = vec![character(1, "张大力", "", &[("生命值", -50), ("法力值", 50)])];
        let raw = "<数据统计>`[{\"角色名\": \"张大力\",\"生命值变化\": 0}]`</数据统计>";

        let (text, report) = apply_deltas(raw, &mut characters, &config());

        assert!(report.changes.is_empty());
        // fallback renders the referenced character's current tiers
        assert!(text.contains("张大力:无法动弹,正常"));
    }

    #[test]
    fn stats_outside_all_tiers_are_omitted() {
        let mut characters = vec![character(1, "张大力", "", &[("生命值", 0), ("法力值", 0)])];
        // 生命值 ends at 5000, outside every configured tier
        let raw = "<数据统计>`[{\"角色名\": \"张大力\",\"生命值变化\": 5000,\"法力值变化\": 5}]`</数据统计>";

        let (text, _) = apply_deltas(raw, &mut characters, &config());

        assert!(text.contains("<角色当前状态>张大力:正常</角色当前状态>"));
    }

    #[test]
    fn surrounding_text_survives_multiline_blocks() {
        let mut characters = vec![character(1, "张大力", "", &[("生命值", 0), ("法力值", 0)])];
        let raw = "第一段。\n<数据统计>`[\n  {\"角色名\": \"张大力\", \"生命值变化\": -1}\n]`</数据统计>\n最后一段。";

        let (text, _) = apply_deltas(raw, &mut characters, &config());

        assert!(text.starts_with("第一段。\n<角色当前状态>"));
        assert!(text.ends_with("</角色当前状态>\n最后一段。"));
    }

    #[test]
    fn dollar_signs_in_rendered_text_are_literal() {
        let mut config = config();
        config.stats[0].tiers[1].description = "价值$100".to_string();
        let mut characters = vec![character(1, "张大力", "", &[("生命值", 0), ("法力值", 0)])];
        let raw = "<数据统计>`[{\"角色名\": \"张大力\",\"生命值变化\": -1}]`</数据统计>";

        let (text, _) = apply_deltas(raw, &mut characters, &config);

        assert!(text.contains("价值$100"));
    }
}
