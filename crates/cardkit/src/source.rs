//! Input shapes accepted by card import.

use cardkit_core::{CoreError, RawSignedModel};
use serde_json::Value;

/// A card in one of its exported shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum CardSource {
    /// Base64 of the model JSON, as produced by string export.
    Base64(String),
    /// The model JSON text.
    Json(String),
    /// An already parsed JSON document, as produced by JSON export.
    JsonValue(Value),
    /// The wire model itself.
    Model(RawSignedModel),
}

impl CardSource {
    /// Classify a string: JSON objects start with `{`, anything else is
    /// taken as base64.
    pub fn sniff(data: &str) -> Self {
        if data.trim_start().starts_with('{') {
            CardSource::Json(data.to_string())
        } else {
            CardSource::Base64(data.to_string())
        }
    }

    /// Decode into the wire model.
    pub fn into_model(self) -> Result<RawSignedModel, CoreError> {
        match self {
            CardSource::Base64(s) => RawSignedModel::from_base64_str(&s),
            CardSource::Json(s) => RawSignedModel::from_json_str(&s),
            CardSource::JsonValue(v) => RawSignedModel::from_json_value(v),
            CardSource::Model(model) => Ok(model),
        }
    }
}

impl From<RawSignedModel> for CardSource {
    fn from(model: RawSignedModel) -> Self {
        CardSource::Model(model)
    }
}

impl From<Value> for CardSource {
    fn from(value: Value) -> Self {
        CardSource::JsonValue(value)
    }
}

impl From<&str> for CardSource {
    fn from(data: &str) -> Self {
        CardSource::sniff(data)
    }
}

impl From<String> for CardSource {
    fn from(data: String) -> Self {
        CardSource::sniff(&data)
    }
}
