//! `api.v1.ConfigService` messages.
//!
//! Each type is both a protobuf message (prost) for the backend wire and a
//! serde type for the HTTP JSON mapping: lowerCamelCase names on output,
//! camelCase or snake_case accepted on input, unpopulated fields emitted.

use serde::{Deserialize, Serialize};

#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct GetConfigRequest {}

#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExternalAuthConfig {
    #[prost(bool, tag = "1")]
    pub enable: bool,
    #[prost(string, tag = "2")]
    pub domain: String,
    #[prost(string, tag = "3")]
    #[serde(alias = "client_id")]
    pub client_id: String,
    #[prost(string, tag = "4")]
    #[serde(alias = "client_secret")]
    pub client_secret: String,
    #[prost(string, tag = "5")]
    #[serde(alias = "callback_url")]
    pub callback_url: String,
}

/// Current gateway configuration.
#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GetConfigResponse {
    #[prost(bool, tag = "1")]
    #[serde(alias = "http_compression")]
    pub http_compression: bool,
    #[prost(bool, tag = "2")]
    pub https: bool,
    #[prost(bool, tag = "3")]
    #[serde(alias = "enable_rate_limitor")]
    pub enable_rate_limitor: bool,
    #[prost(uint32, tag = "4")]
    #[serde(alias = "num_token_max")]
    pub num_token_max: u32,
    #[prost(uint32, tag = "5")]
    #[serde(alias = "num_token_per_sec")]
    pub num_token_per_sec: u32,
    #[prost(message, optional, tag = "6")]
    #[serde(alias = "external_auth_config")]
    pub external_auth_config: Option<ExternalAuthConfig>,
}

/// Partial update: only present fields are applied.
#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UpdateConfigRequest {
    #[prost(bool, optional, tag = "1")]
    #[serde(alias = "http_compression")]
    pub http_compression: Option<bool>,
    #[prost(bool, optional, tag = "2")]
    pub https: Option<bool>,
    #[prost(bool, optional, tag = "3")]
    #[serde(alias = "enable_rate_limitor")]
    pub enable_rate_limitor: Option<bool>,
    #[prost(uint32, optional, tag = "4")]
    #[serde(alias = "num_token_max")]
    pub num_token_max: Option<u32>,
    #[prost(uint32, optional, tag = "5")]
    #[serde(alias = "num_token_per_sec")]
    pub num_token_per_sec: Option<u32>,
    #[prost(message, optional, tag = "6")]
    #[serde(alias = "external_auth_config")]
    pub external_auth_config: Option<ExternalAuthConfig>,
}

/// Configuration after the update was applied.
pub type UpdateConfigResponse = GetConfigResponse;

#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct GetIpBlackListRequest {}

#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GetIpBlackListResponse {
    #[prost(string, repeated, tag = "1")]
    #[serde(alias = "ip_list")]
    pub ip_list: Vec<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum ActionType {
    Unspecified = 0,
    Add = 1,
    Remove = 2,
}

impl ActionType {
    pub fn as_str_name(&self) -> &'static str {
        match self {
            ActionType::Unspecified => "ACTION_TYPE_UNSPECIFIED",
            ActionType::Add => "ACTION_TYPE_ADD",
            ActionType::Remove => "ACTION_TYPE_REMOVE",
        }
    }

    pub fn from_str_name(value: &str) -> Option<Self> {
        match value {
            "ACTION_TYPE_UNSPECIFIED" => Some(ActionType::Unspecified),
            "ACTION_TYPE_ADD" => Some(ActionType::Add),
            "ACTION_TYPE_REMOVE" => Some(ActionType::Remove),
            _ => None,
        }
    }
}

#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UpdateIpBlackListRequest {
    #[prost(enumeration = "ActionType", tag = "1")]
    #[serde(with = "action_type")]
    pub action: i32,
    #[prost(string, repeated, tag = "2")]
    #[serde(alias = "ip_list")]
    pub ip_list: Vec<String>,
}

#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateIpBlackListResponse {}

/// Enum fields as names on output, name or number on input.
mod action_type {
    use std::fmt;

    use serde::de::{self, Unexpected, Visitor};
    use serde::{Deserializer, Serializer};

    use super::ActionType;

    const NAMES: &[&str] = &["ACTION_TYPE_UNSPECIFIED", "ACTION_TYPE_ADD", "ACTION_TYPE_REMOVE"];

    pub fn serialize<S: Serializer>(value: &i32, serializer: S) -> Result<S::Ok, S::Error> {
        match ActionType::try_from(*value) {
            Ok(action) => serializer.serialize_str(action.as_str_name()),
            Err(_) => serializer.serialize_i32(*value),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i32, D::Error> {
        deserializer.deserialize_any(ActionVisitor)
    }

    struct ActionVisitor;

    impl<'de> Visitor<'de> for ActionVisitor {
        type Value = i32;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("an ActionType name or number")
        }

        fn visit_str<E: de::Error>(self, value: &str) -> Result<i32, E> {
            ActionType::from_str_name(value)
                .map(|action| action as i32)
                .ok_or_else(|| E::unknown_variant(value, NAMES))
        }

        fn visit_i64<E: de::Error>(self, value: i64) -> Result<i32, E> {
            i32::try_from(value).map_err(|_| E::invalid_value(Unexpected::Signed(value), &self))
        }

        fn visit_u64<E: de::Error>(self, value: u64) -> Result<i32, E> {
            i32::try_from(value).map_err(|_| E::invalid_value(Unexpected::Unsigned(value), &self))
        }

        fn visit_unit<E: de::Error>(self) -> Result<i32, E> {
            Ok(ActionType::Unspecified as i32)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost::Message;
    use serde_json::json;

    #[test]
    fn test_config_json_uses_camel_case_and_emits_defaults() {
        let value = serde_json::to_value(GetConfigResponse::default()).unwrap();
        assert_eq!(
            value,
            json!({
                "httpCompression": false,
                "https": false,
                "enableRateLimitor": false,
                "numTokenMax": 0,
                "numTokenPerSec": 0,
                "externalAuthConfig": null
            })
        );
    }

    #[test]
    fn test_update_accepts_both_spellings() {
        let camel: UpdateConfigRequest = serde_json::from_value(json!({"numTokenMax": 10})).unwrap();
        let snake: UpdateConfigRequest = serde_json::from_value(json!({"num_token_max": 10})).unwrap();
        assert_eq!(camel, snake);
        assert_eq!(camel.num_token_max, Some(10));
        assert_eq!(camel.https, None);
    }

    #[test]
    fn test_action_by_name_or_number() {
        let by_name: UpdateIpBlackListRequest =
            serde_json::from_value(json!({"action": "ACTION_TYPE_REMOVE", "ipList": ["1.2.3.4"]})).unwrap();
        let by_number: UpdateIpBlackListRequest =
            serde_json::from_value(json!({"action": 2, "ip_list": ["1.2.3.4"]})).unwrap();
        assert_eq!(by_name, by_number);
        assert_eq!(by_name.action(), ActionType::Remove);

        let out = serde_json::to_value(&by_name).unwrap();
        assert_eq!(out["action"], "ACTION_TYPE_REMOVE");

        assert!(serde_json::from_value::<UpdateIpBlackListRequest>(json!({"action": "DROP"})).is_err());
    }

    #[test]
    fn test_protobuf_wire_keeps_presence() {
        let request = UpdateConfigRequest {
            https: Some(false),
            ..Default::default()
        };
        let decoded = UpdateConfigRequest::decode(request.encode_to_vec().as_slice()).unwrap();
        assert_eq!(decoded.https, Some(false));
        assert_eq!(decoded.http_compression, None);
    }
}
