//! Stat configuration: the tracked stat definitions and the prompt section
//! that instructs the model to emit the delta block.
//!
//! The serde field names match the persisted settings blob of the original
//! extension (`statName` / `prompt` / `tier` / `states`), so an existing blob
//! imports without migration.

use crate::stats::roster::Character;
use crate::stats::tiers::TierRange;
use serde::{Deserialize, Serialize};

/// A named numeric attribute tracked per character, with a tier table mapping
/// value ranges to descriptive labels. `name` is unique within a configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatDefinition {
    #[serde(rename = "statName")]
    pub name: String,
    #[serde(rename = "prompt", default)]
    pub description: String,
    #[serde(rename = "tier", default)]
    pub tiers: Vec<TierRange>,
}

/// Ordered sequence of stat definitions, shared across all conversations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatConfiguration {
    #[serde(rename = "states", default)]
    pub stats: Vec<StatDefinition>,
}

impl StatConfiguration {
    pub fn empty() -> Self {
        Self { stats: Vec::new() }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.stats.iter().any(|s| s.name == name)
    }

    pub fn get(&self, name: &str) -> Option<&StatDefinition> {
        self.stats.iter().find(|s| s.name == name)
    }

    pub fn stat_names(&self) -> Vec<String> {
        self.stats.iter().map(|s| s.name.clone()).collect()
    }
}

impl Default for StatConfiguration {
    /// The stock 生命值/法力值 configuration shipped with the extension.
    fn default() -> Self {
        Self {
            stats: vec![
                StatDefinition {
                    name: "生命值".to_string(),
                    description: "角色的生命力".to_string(),
                    tiers: vec![
                        TierRange {
                            label: "垂死".to_string(),
                            from: -999,
                            to: -100,
                            description: "再接受一次攻击就会死亡".to_string(),
                        },
                        TierRange {
                            label: "重伤".to_string(),
                            from: -100,
                            to: 0,
                            description: "无法动弹".to_string(),
                        },
                    ],
                },
                StatDefinition {
                    name: "法力值".to_string(),
                    description: "角色的发力".to_string(),
                    tiers: vec![
                        TierRange {
                            label: "枯竭".to_string(),
                            from: -999,
                            to: 0,
                            description: "没有任何发力".to_string(),
                        },
                        TierRange {
                            label: "正常".to_string(),
                            from: 0,
                            to: 100,
                            description: "正常".to_string(),
                        },
                    ],
                },
            ],
        }
    }
}

/// Marker under which the tracking section is spliced into the summary prompt
/// template. A previous section under the same marker is replaced.
pub const TRACKING_PROMPT_MARKER: &str = "\n\n=== 状态监控提示词 ===\n";

/// Builds the stat-tracking instruction section: which characters to watch,
/// which stats to report, and the exact wire format for the delta block.
/// Empty configuration produces an empty section. Characters with tracking
/// disabled are left out of the watch list.
pub fn tracking_prompt(config: &StatConfiguration, characters: &[Character]) -> String {
    if config.stats.is_empty() {
        return String::new();
    }

    let character_list = characters
        .iter()
        .filter(|c| c.tracking)
        .map(|c| {
            if c.alternate_name.is_empty() {
                c.name.clone()
            } else {
                format!("{}({})", c.name, c.alternate_name)
            }
        })
        .collect::<Vec<_>>()
        .join(",");

    let mut prompt = if character_list.is_empty() {
        "根据最后一条回复内容，统计以下状态值的变化。\n".to_string()
    } else {
        format!(
            "根据最后一条回复内容，统计角色[{}]状态值的变化。\n",
            character_list
        )
    };

    let stat_descriptions = config
        .stats
        .iter()
        .map(|s| format!("{}：{}", s.name, s.description))
        .collect::<Vec<_>>()
        .join("，");

    prompt.push_str(&format!("【{}】", stat_descriptions));
    prompt.push_str(&format!(
        "统计结果以下面格式返回: <数据统计>`json格式数据统计`</数据统计>，\
         每个角色一个json对象，使用中括号包含。仅统计变化量，而不是合计值。返回的属性为：{}",
        stat_descriptions
    ));

    prompt
}

/// Splices `section` into `template` under [`TRACKING_PROMPT_MARKER`],
/// removing any previous marker section first. An empty section leaves the
/// template untouched.
pub fn apply_tracking_prompt(template: &str, section: &str) -> String {
    if section.is_empty() {
        return template.to_string();
    }

    let base = match template.find(TRACKING_PROMPT_MARKER) {
        Some(idx) => &template[..idx],
        None => template,
    };

    format!("{}{}{}", base, TRACKING_PROMPT_MARKER, section)
}
