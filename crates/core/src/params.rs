use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct NodeParams {
    #[serde(default)]
    pub values: BTreeMap<String, ParamValue>,
}

impl NodeParams {
    pub fn set(&mut self, key: impl Into<String>, value: ParamValue) {
        self.values.insert(key.into(), value);
    }

    /// Overlays `other` on top of these values.
    pub fn merged(mut self, other: &NodeParams) -> Self {
        for (key, value) in &other.values {
            self.values.insert(key.clone(), value.clone());
        }
        self
    }

    pub fn get_int(&self, key: &str, default: i32) -> i32 {
        self.values
            .get(key)
            .and_then(|value| match value {
                ParamValue::Int(v) => Some(*v),
                _ => None,
            })
            .unwrap_or(default)
    }

    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        self.values
            .get(key)
            .and_then(|value| match value {
                ParamValue::Bool(v) => Some(*v),
                ParamValue::Int(v) => Some(*v != 0),
                _ => None,
            })
            .unwrap_or(default)
    }

    pub fn get_string<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.values
            .get(key)
            .and_then(|value| match value {
                ParamValue::String(v) => Some(v.as_str()),
                _ => None,
            })
            .unwrap_or(default)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum ParamValue {
    Int(i32),
    Bool(bool),
    String(String),
}

#[derive(Debug, Clone)]
pub struct NodeDefinition {
    pub name: String,
    pub category: String,
    pub inputs: Vec<PinDefinition>,
    pub outputs: Vec<PinDefinition>,
}

#[derive(Debug, Clone)]
pub struct PinDefinition {
    pub name: String,
    pub optional: bool,
}

pub fn mesh_in(name: &str) -> PinDefinition {
    PinDefinition {
        name: name.to_string(),
        optional: false,
    }
}

pub fn optional_mesh_in(name: &str) -> PinDefinition {
    PinDefinition {
        name: name.to_string(),
        optional: true,
    }
}

pub fn mesh_out(name: &str) -> PinDefinition {
    PinDefinition {
        name: name.to_string(),
        optional: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn getters_fall_back_on_type_mismatch() {
        let mut params = NodeParams::default();
        params.set("mode", ParamValue::String("name".to_string()));
        params.set("store", ParamValue::Int(1));
        assert_eq!(params.get_int("mode", 1), 1);
        assert!(params.get_bool("store", false));
        assert_eq!(params.get_string("missing", "fallback"), "fallback");
    }

    #[test]
    fn merged_overrides_defaults() {
        let mut defaults = NodeParams::default();
        defaults.set("group", ParamValue::String(String::new()));
        defaults.set("method", ParamValue::Int(0));
        let mut overrides = NodeParams::default();
        overrides.set("method", ParamValue::Int(2));
        let params = defaults.merged(&overrides);
        assert_eq!(params.get_int("method", 0), 2);
        assert_eq!(params.get_string("group", "x"), "");
    }
}
