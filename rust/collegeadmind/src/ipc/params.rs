use serde::de::DeserializeOwned;

/// A parameter extraction failure, rendered as `bad_params`.
pub struct ParamErr(pub String);

pub fn required_str(params: &serde_json::Value, key: &str) -> Result<String, ParamErr> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ParamErr(format!("missing {}", key)))
}

pub fn optional_str(params: &serde_json::Value, key: &str) -> Option<String> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

pub fn required_u32(params: &serde_json::Value, key: &str) -> Result<u32, ParamErr> {
    let v = params
        .get(key)
        .ok_or_else(|| ParamErr(format!("missing {}", key)))?;
    v.as_u64()
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| ParamErr(format!("{} must be a non-negative integer", key)))
}

pub fn decode<T: DeserializeOwned>(params: &serde_json::Value) -> Result<T, ParamErr> {
    serde_json::from_value(params.clone()).map_err(|e| ParamErr(e.to_string()))
}
