use depa_core::error::ExtractError;
use serde::Serialize;

pub fn pretty<T: Serialize>(value: &T) -> Result<String, ExtractError> {
    Ok(serde_json::to_string_pretty(value)?)
}
