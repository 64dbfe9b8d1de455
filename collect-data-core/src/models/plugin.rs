//! Static plugin metadata reported to the runner

use serde::{Deserialize, Serialize};

/// Parameter keys understood by the collect data action
pub const FLOW_ID_PARAM: &str = "FlowID";
pub const PAYLOAD_ID_PARAM: &str = "PayloadID";
pub const LOG_DATA_PARAM: &str = "LogData";

const PLACEHOLDER_ID: &str = "00000000-0000-0000-0000-00000000";

/// Kind of UI input for a parameter
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    Text,
    Boolean,
}

/// Declared parameter of an action
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParamDescriptor {
    pub key: String,
    #[serde(rename = "type")]
    pub param_type: ParamType,
    #[serde(default)]
    pub default: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub description: String,
}

/// Action exposed by the plugin
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActionDescriptor {
    pub id: String,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub category: String,
    #[serde(default)]
    pub is_hidden: bool,
    #[serde(default)]
    pub params: Vec<ParamDescriptor>,
}

/// Plugin metadata returned by the `details` request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PluginDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub plugin_type: String,
    pub version: String,
    pub author: String,
    pub action: ActionDescriptor,
}

impl PluginDescriptor {
    /// Descriptor of the collect data plugin
    pub fn collect_data() -> Self {
        Self {
            name: "Collect Data".to_string(),
            plugin_type: "action".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            author: "JustNZ".to_string(),
            action: ActionDescriptor {
                id: "collect_data".to_string(),
                name: "Collect Data".to_string(),
                description: "Collects Flow and Payload data from AlertFlow".to_string(),
                icon: "solar:inbox-archive-linear".to_string(),
                category: "Data".to_string(),
                is_hidden: true,
                params: vec![
                    ParamDescriptor {
                        key: FLOW_ID_PARAM.to_string(),
                        param_type: ParamType::Text,
                        default: PLACEHOLDER_ID.to_string(),
                        required: true,
                        description: "The Flow ID to collect data from".to_string(),
                    },
                    ParamDescriptor {
                        key: PAYLOAD_ID_PARAM.to_string(),
                        param_type: ParamType::Text,
                        default: PLACEHOLDER_ID.to_string(),
                        required: true,
                        description: "The Payload ID to collect data from".to_string(),
                    },
                    ParamDescriptor {
                        key: LOG_DATA_PARAM.to_string(),
                        param_type: ParamType::Boolean,
                        default: "false".to_string(),
                        required: false,
                        description: "Include the collected data in the step log".to_string(),
                    },
                ],
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_round_trip() {
        let descriptor = PluginDescriptor::collect_data();
        let json = serde_json::to_string(&descriptor).unwrap();
        let decoded: PluginDescriptor = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, descriptor);
    }

    #[test]
    fn test_descriptor_wire_names() {
        let json = serde_json::to_value(PluginDescriptor::collect_data()).unwrap();
        assert_eq!(json["type"], "action");
        assert_eq!(json["action"]["id"], "collect_data");
        assert_eq!(json["action"]["params"][0]["type"], "text");
        assert_eq!(json["action"]["params"][2]["type"], "boolean");
        assert_eq!(json["action"]["params"][2]["default"], "false");
    }

    #[test]
    fn test_identifier_params_are_required() {
        let descriptor = PluginDescriptor::collect_data();
        let required: Vec<&str> = descriptor
            .action
            .params
            .iter()
            .filter(|param| param.required)
            .map(|param| param.key.as_str())
            .collect();
        assert_eq!(required, vec![FLOW_ID_PARAM, PAYLOAD_ID_PARAM]);
    }
}
