use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Parent id the API uses for the country level.
pub const ROOT_PARENT_ID: &str = "0";

/// One administrative area as served by the area API.
///
/// Every field defaults when the API leaves it out or sends `null`. Text
/// fields also take bare numbers (`"lon": 116.4`) and keep their JSON text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AreaNode {
    #[serde(rename = "id", deserialize_with = "text_from_any")]
    pub uid: String,
    #[serde(rename = "parentId", deserialize_with = "text_from_any")]
    pub parent_id: String,
    #[serde(deserialize_with = "int_from_number_or_string")]
    pub level: i64,
    #[serde(rename = "areaName", deserialize_with = "text_from_any")]
    pub area_name: String,
    #[serde(rename = "simpleName", deserialize_with = "text_from_any")]
    pub simple_name: String,
    #[serde(rename = "wholeName", deserialize_with = "text_from_any")]
    pub whole_name: String,
    #[serde(rename = "pinYin", deserialize_with = "text_from_any")]
    pub pin_yin: String,
    #[serde(rename = "prePinYin", deserialize_with = "text_from_any")]
    pub pre_pin_yin: String,
    #[serde(rename = "simplePy", deserialize_with = "text_from_any")]
    pub simple_py: String,
    #[serde(rename = "provinceId", deserialize_with = "text_from_any")]
    pub province_id: String,
    #[serde(rename = "cityId", deserialize_with = "text_from_any")]
    pub city_id: String,
    #[serde(rename = "countyId", deserialize_with = "text_from_any")]
    pub county_id: String,
    #[serde(rename = "areaCode", deserialize_with = "text_from_any")]
    pub area_code: String,
    #[serde(rename = "zipCode", deserialize_with = "text_from_any")]
    pub zip_code: String,
    #[serde(deserialize_with = "text_from_any")]
    pub lon: String,
    #[serde(deserialize_with = "text_from_any")]
    pub lat: String,
    #[serde(deserialize_with = "text_from_any")]
    pub remark: String,
}

impl AreaNode {
    pub fn new(uid: impl Into<String>, parent_id: impl Into<String>, level: i64) -> Self {
        Self {
            uid: uid.into(),
            parent_id: parent_id.into(),
            level,
            ..Self::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.area_name = name.into();
        self
    }
}

// The API is not consistent about quoting integers; anything unusable becomes 0.
pub(crate) fn int_from_number_or_string<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let level = match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_i64().unwrap_or(0),
        Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    };
    Ok(level)
}

/// Strings as received, numbers as their JSON text, anything else empty.
pub(crate) fn text_from_any<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let text = match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    };
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decodes_api_field_names() {
        let json = r#"{
            "id": "110000",
            "parentId": "0",
            "level": 1,
            "areaName": "北京",
            "wholeName": "北京市",
            "pinYin": "beijing",
            "zipCode": "100000",
            "lon": "116.40",
            "lat": "39.90"
        }"#;

        let area: AreaNode = serde_json::from_str(json).unwrap();
        assert_eq!(area.uid, "110000");
        assert_eq!(area.parent_id, "0");
        assert_eq!(area.level, 1);
        assert_eq!(area.area_name, "北京");
        assert_eq!(area.whole_name, "北京市");
        assert_eq!(area.zip_code, "100000");
        assert_eq!(area.remark, "");
    }

    #[test]
    fn test_level_as_string() {
        let area: AreaNode = serde_json::from_str(r#"{"id": "1", "level": " 3 "}"#).unwrap();
        assert_eq!(area.level, 3);
    }

    #[test]
    fn test_level_unusable_defaults_to_zero() {
        let area: AreaNode = serde_json::from_str(r#"{"id": "1", "level": null}"#).unwrap();
        assert_eq!(area.level, 0);

        let area: AreaNode = serde_json::from_str(r#"{"id": "1", "level": "city"}"#).unwrap();
        assert_eq!(area.level, 0);
    }

    #[test]
    fn test_numeric_text_fields_keep_their_digits() {
        let json = r#"{"id": 110000, "parentId": 0, "zipCode": 100000, "lon": 116.4, "lat": 39.9}"#;

        let area: AreaNode = serde_json::from_str(json).unwrap();
        assert_eq!(area.uid, "110000");
        assert_eq!(area.parent_id, "0");
        assert_eq!(area.zip_code, "100000");
        assert_eq!(area.lon, "116.4");
        assert_eq!(area.lat, "39.9");
    }

    #[test]
    fn test_null_and_odd_fields_become_empty() {
        let json = r#"{"id": "1", "remark": null, "areaName": null, "cityId": true, "simplePy": []}"#;

        let area: AreaNode = serde_json::from_str(json).unwrap();
        assert_eq!(area.uid, "1");
        assert_eq!(area.remark, "");
        assert_eq!(area.area_name, "");
        assert_eq!(area.city_id, "");
        assert_eq!(area.simple_py, "");
    }

    #[test]
    fn test_builder_helpers() {
        let area = AreaNode::new("2", ROOT_PARENT_ID, 1).with_name("Tianjin");
        assert_eq!(area.uid, "2");
        assert_eq!(area.parent_id, "0");
        assert_eq!(area.area_name, "Tianjin");
    }
}
