use crate::area::{AreaNode, int_from_number_or_string, text_from_any};
use crate::error::Result;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Top-level envelope returned by the area endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AreaResponse {
    #[serde(rename = "showapi_res_code", deserialize_with = "int_from_number_or_string")]
    pub res_code: i64,
    #[serde(rename = "showapi_res_error", deserialize_with = "text_from_any")]
    pub res_error: String,
    #[serde(rename = "showapi_res_body", deserialize_with = "null_as_default")]
    pub body: AreaResponseBody,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AreaResponseBody {
    /// Number or string depending on the upstream gateway.
    pub ret_code: Value,
    #[serde(deserialize_with = "null_as_default")]
    pub flag: bool,
    #[serde(deserialize_with = "text_from_any")]
    pub msg: String,
    #[serde(deserialize_with = "null_as_default")]
    pub data: Vec<AreaNode>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl AreaResponse {
    pub fn is_ok(&self) -> bool {
        self.res_code == 0
    }

    pub fn into_areas(self) -> Vec<AreaNode> {
        self.body.data
    }
}

pub fn decode_page(bytes: &[u8]) -> Result<AreaResponse> {
    Ok(serde_json::from_slice(bytes)?)
}
