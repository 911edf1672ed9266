//! Free-form status summary tracking.
//!
//! Alongside numeric stats, the model can be asked to report structured
//! free-text status per character (clothing, illness, anything the user
//! configures). The model replies with a `<状态摘要>` JSON object keyed by
//! status type; each type holds an array of per-character objects. Parsing is
//! lenient: when the block is not strict JSON, a per-type regex fallback
//! salvages whatever well-formed objects it can find.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One configurable status category and the fields the model should fill in.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusType {
    pub name: String,
    #[serde(default)]
    pub fields: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusSummarySettings {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(rename = "statusTypes", default)]
    pub status_types: Vec<StatusType>,
    #[serde(rename = "summaryData", default)]
    pub summary_data: Map<String, Value>,
}

fn default_enabled() -> bool {
    true
}

impl Default for StatusSummarySettings {
    fn default() -> Self {
        Self {
            enabled: true,
            status_types: vec![
                StatusType {
                    name: "衣物状态".to_string(),
                    fields: vec![
                        "上衣".to_string(),
                        "裤子".to_string(),
                        "鞋子".to_string(),
                        "配饰".to_string(),
                    ],
                },
                StatusType {
                    name: "疾病状态".to_string(),
                    fields: vec![
                        "感冒".to_string(),
                        "发烧".to_string(),
                        "咳嗽".to_string(),
                        "其他症状".to_string(),
                    ],
                },
            ],
            summary_data: Map::new(),
        }
    }
}

impl StatusSummarySettings {
    pub fn add_status_type(&mut self, name: impl Into<String>, fields: Vec<String>) {
        self.status_types.push(StatusType {
            name: name.into(),
            fields,
        });
    }

    pub fn remove_status_type(&mut self, name: &str) -> bool {
        let before = self.status_types.len();
        self.status_types.retain(|t| t.name != name);
        before != self.status_types.len()
    }

    pub fn update_status_type_fields(&mut self, name: &str, fields: Vec<String>) -> bool {
        match self.status_types.iter_mut().find(|t| t.name == name) {
            Some(status_type) => {
                status_type.fields = fields;
                true
            }
            None => false,
        }
    }
}

/// Builds the prompt section instructing the model to emit the `<状态摘要>`
/// block with one JSON array per configured status type. Disabled or empty
/// configuration produces an empty section.
pub fn status_summary_prompt(settings: &StatusSummarySettings) -> String {
    if !settings.enabled || settings.status_types.is_empty() {
        return String::new();
    }

    let type_names = settings
        .status_types
        .iter()
        .map(|t| t.name.as_str())
        .collect::<Vec<_>>()
        .join("、");

    let mut json_structure = String::from("{\n");
    for (index, status_type) in settings.status_types.iter().enumerate() {
        json_structure.push_str(&format!("   \"{}\": [\n", status_type.name));
        json_structure.push_str("      {\n");
        json_structure.push_str("         \"姓名\": \"xxx\"");
        for field in &status_type.fields {
            json_structure.push_str(&format!(",\n         \"{}\": \"xxx\"", field));
        }
        json_structure.push_str("\n      }\n");
        json_structure.push_str("   ]");
        if index < settings.status_types.len() - 1 {
            json_structure.push_str(",\n");
        } else {
            json_structure.push('\n');
        }
    }
    json_structure.push('}');

    format!(
        "\n## 状态摘要\n总结<user>及角色的【{}】摘要，返回以下格式的回复：\n<状态摘要>\n{}\n</状态摘要>\n> 注：每行一个角色，不要重复",
        type_names, json_structure
    )
}

/// Extracts and parses the `<状态摘要>` block. Strict JSON first; on failure
/// the per-type fallback scans for well-formed `{...}` objects. Returns
/// `None` when the block is absent or nothing could be salvaged; never fails
/// the caller.
pub fn parse_status_summary(
    text: &str,
    settings: &StatusSummarySettings,
) -> Option<Map<String, Value>> {
    if !settings.enabled {
        return None;
    }

    let regex = Regex::new(r"(?s)<状态摘要>(.*?)</状态摘要>").unwrap();
    let content = regex.captures(text)?[1].trim().to_string();

    match serde_json::from_str::<Value>(&content) {
        Ok(Value::Object(map)) => {
            log::info!("Parsed status summary with {} status types", map.len());
            Some(map)
        }
        Ok(_) => {
            log::warn!("Status summary block is not a JSON object");
            None
        }
        Err(err) => {
            log::warn!("Status summary JSON parse failed ({}), trying manual fallback", err);
            parse_manual_format(&content, settings)
        }
    }
}

/// Fallback parser: for each configured type, find its array section and pick
/// out any object literals that parse on their own.
fn parse_manual_format(content: &str, settings: &StatusSummarySettings) -> Option<Map<String, Value>> {
    let object_regex = Regex::new(r"\{[^}]+\}").unwrap();
    let mut result = Map::new();

    for status_type in &settings.status_types {
        let section_pattern = format!(
            "(?is)\"{}\"\\s*:\\s*\\[(.*?)\\]",
            regex::escape(&status_type.name)
        );
        let Ok(section_regex) = Regex::new(&section_pattern) else {
            continue;
        };
        let Some(captures) = section_regex.captures(content) else {
            continue;
        };

        let mut entries = Vec::new();
        for object_match in object_regex.find_iter(&captures[1]) {
            if let Ok(value) = serde_json::from_str::<Value>(object_match.as_str()) {
                entries.push(value);
            }
        }
        if !entries.is_empty() {
            result.insert(status_type.name.clone(), Value::Array(entries));
        }
    }

    if result.is_empty() {
        None
    } else {
        log::info!("Manual status summary fallback recovered {} types", result.len());
        Some(result)
    }
}
