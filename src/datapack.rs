use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::ir::event::EventCondition;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Criterion {
    pub trigger: String,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub conditions: Map<String, Value>,
    #[serde(skip)]
    pub paths: Vec<EventCondition>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Rewards {
    pub function: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Advancement {
    #[serde(skip)]
    pub name: String,
    pub criteria: IndexMap<String, Criterion>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rewards: Option<Rewards>,
}

fn insert_path(root: &mut Map<String, Value>, path: &[String], value: &str) {
    let Some((last, parents)) = path.split_last() else {
        return;
    };
    let mut node = root;
    for key in parents {
        let entry = node
            .entry(key.clone())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        let Value::Object(next) = entry else {
            return;
        };
        node = next;
    }
    node.insert(last.clone(), Value::String(value.to_string()));
}

impl Advancement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            criteria: IndexMap::new(),
            rewards: None,
        }
    }

    pub fn event_criteria(&mut self, key: &str, trigger: &str, conditions: &[EventCondition]) {
        let mut json = Map::new();
        for condition in conditions {
            insert_path(&mut json, &condition.path, &condition.value);
        }
        self.criteria.insert(
            key.to_string(),
            Criterion {
                trigger: trigger.to_string(),
                conditions: json,
                paths: conditions.to_vec(),
            },
        );
    }

    pub fn reward_function(&mut self, function: impl Into<String>) {
        self.rewards = Some(Rewards {
            function: function.into(),
        });
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

pub trait Writer {
    fn write_function(&mut self, name: &str, commands: &[String]);
    fn write_tag(&mut self, category: &str, name: &str, members: &[String], namespace: &str);
    fn write_advancement(&mut self, advancement: &Advancement);
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TagKey {
    pub category: String,
    pub namespace: String,
    pub name: String,
}

/// Keeps every artifact in memory; writing a name again replaces it.
#[derive(Debug, Default)]
pub struct MemoryWriter {
    pub functions: IndexMap<String, Vec<String>>,
    pub tags: IndexMap<TagKey, Vec<String>>,
    pub advancements: IndexMap<String, Advancement>,
}

impl MemoryWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn function(&self, name: &str) -> Option<&[String]> {
        self.functions.get(name).map(Vec::as_slice)
    }

    pub fn tag(&self, category: &str, namespace: &str, name: &str) -> Option<&[String]> {
        self.tags
            .get(&TagKey {
                category: category.to_string(),
                namespace: namespace.to_string(),
                name: name.to_string(),
            })
            .map(Vec::as_slice)
    }
}

impl Writer for MemoryWriter {
    fn write_function(&mut self, name: &str, commands: &[String]) {
        self.functions.insert(name.to_string(), commands.to_vec());
    }

    fn write_tag(&mut self, category: &str, name: &str, members: &[String], namespace: &str) {
        self.tags.insert(
            TagKey {
                category: category.to_string(),
                namespace: namespace.to_string(),
                name: name.to_string(),
            },
            members.to_vec(),
        );
    }

    fn write_advancement(&mut self, advancement: &Advancement) {
        self.advancements
            .insert(advancement.name.clone(), advancement.clone());
    }
}

impl<W: Writer + ?Sized> Writer for &mut W {
    fn write_function(&mut self, name: &str, commands: &[String]) {
        (**self).write_function(name, commands)
    }

    fn write_tag(&mut self, category: &str, name: &str, members: &[String], namespace: &str) {
        (**self).write_tag(category, name, members, namespace)
    }

    fn write_advancement(&mut self, advancement: &Advancement) {
        (**self).write_advancement(advancement)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn conditions_nest_by_path() {
        let mut adv = Advancement::new("adv_h");
        adv.event_criteria(
            "h",
            "minecraft:tick",
            &[
                EventCondition::new("player.stats.foo", "5"),
                EventCondition::new("player.level", "2"),
            ],
        );
        adv.reward_function("ns:h_trampoline");
        let value: Value = serde_json::from_str(&adv.to_json().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({
                "criteria": {
                    "h": {
                        "trigger": "minecraft:tick",
                        "conditions": {"player": {"stats": {"foo": "5"}, "level": "2"}}
                    }
                },
                "rewards": {"function": "ns:h_trampoline"}
            })
        );
    }

    #[test]
    fn empty_conditions_are_omitted() {
        let mut adv = Advancement::new("adv_h");
        adv.event_criteria("h", "minecraft:tick", &[]);
        let value: Value = serde_json::from_str(&adv.to_json().unwrap()).unwrap();
        assert_eq!(value["criteria"]["h"], json!({"trigger": "minecraft:tick"}));
        assert!(value.get("rewards").is_none());
    }
}
