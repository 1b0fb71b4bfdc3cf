//! Storage-level record shape.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::model::Timestamp;

/// One persisted annotation as the store sees it.
///
/// Every field defaults when absent, null or of the wrong JSON type, so that
/// damaged rows still load and can be found by repair. `payload` is the JSON
/// encoding of the shape.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoredRecord {
    #[serde(deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(rename = "type", deserialize_with = "lenient_string")]
    pub kind: String,
    #[serde(deserialize_with = "lenient_string")]
    pub label_id: String,
    #[serde(deserialize_with = "lenient_string")]
    pub image_id: String,
    #[serde(deserialize_with = "lenient_string")]
    pub project_id: String,
    #[serde(deserialize_with = "lenient_timestamp")]
    pub created_at: Timestamp,
    #[serde(deserialize_with = "lenient_timestamp")]
    pub updated_at: Timestamp,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_notes"
    )]
    pub notes: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub payload: String,
}

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        _ => String::new(),
    })
}

fn lenient_timestamp<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Timestamp, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_i64().unwrap_or(0),
        _ => 0,
    })
}

fn lenient_notes<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}

impl StoredRecord {
    /// Read one row of a store file.
    ///
    /// A row that is not even an object becomes an empty record, which
    /// `missing_required_field` reports and repair removes.
    pub fn from_row(row: Value) -> Self {
        serde_json::from_value(row).unwrap_or_else(|e| {
            log::warn!("Store row is not a record: {}", e);
            Self::default()
        })
    }

    /// First required field that is missing or empty, if any.
    pub fn missing_required_field(&self) -> Option<&'static str> {
        [
            ("id", &self.id),
            ("type", &self.kind),
            ("labelId", &self.label_id),
            ("imageId", &self.image_id),
            ("projectId", &self.project_id),
            ("payload", &self.payload),
        ]
        .into_iter()
        .find(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
    }
}

/// Which records a scan should return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordFilter {
    All,
    Image(String),
    Project(String),
    Label(String),
}

impl RecordFilter {
    pub fn matches(&self, record: &StoredRecord) -> bool {
        match self {
            RecordFilter::All => true,
            RecordFilter::Image(id) => record.image_id == *id,
            RecordFilter::Project(id) => record.project_id == *id,
            RecordFilter::Label(id) => record.label_id == *id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete() -> StoredRecord {
        StoredRecord {
            id: "a".into(),
            kind: "polygon".into(),
            label_id: "l".into(),
            image_id: "i".into(),
            project_id: "p".into(),
            created_at: 1,
            updated_at: 1,
            notes: None,
            payload: "{}".into(),
        }
    }

    #[test]
    fn test_missing_required_field() {
        assert_eq!(complete().missing_required_field(), None);

        let mut record = complete();
        record.label_id.clear();
        assert_eq!(record.missing_required_field(), Some("labelId"));

        let mut record = complete();
        record.payload = "   ".into();
        assert_eq!(record.missing_required_field(), Some("payload"));
    }

    #[test]
    fn test_absent_fields_deserialize_as_empty() {
        let record: StoredRecord = serde_json::from_str(r#"{"id":"x","type":"polygon"}"#).unwrap();
        assert_eq!(record.id, "x");
        assert_eq!(record.missing_required_field(), Some("labelId"));
    }

    #[test]
    fn test_null_and_mistyped_fields_read_as_missing() {
        let record: StoredRecord = serde_json::from_str(
            r#"{"id":"x","type":"polygon","labelId":null,"imageId":"i","projectId":"p","payload":"{}"}"#,
        )
        .unwrap();
        assert_eq!(record.missing_required_field(), Some("labelId"));

        let record: StoredRecord = serde_json::from_str(
            r#"{"id":"x","type":"polygon","labelId":"l","imageId":"i","projectId":"p","createdAt":"yesterday","payload":{"type":"polygon"}}"#,
        )
        .unwrap();
        assert_eq!(record.created_at, 0);
        assert_eq!(record.missing_required_field(), Some("payload"));
    }

    #[test]
    fn test_non_object_row() {
        let record = StoredRecord::from_row(serde_json::json!(42));
        assert_eq!(record, StoredRecord::default());
        assert_eq!(record.missing_required_field(), Some("id"));

        let record = StoredRecord::from_row(serde_json::json!({"id": "a", "notes": 7}));
        assert_eq!(record.id, "a");
        assert_eq!(record.notes, None);
    }

    #[test]
    fn test_camel_case_field_names() {
        let json = serde_json::to_value(complete()).unwrap();
        assert!(json.get("labelId").is_some());
        assert!(json.get("type").is_some());
        assert!(json.get("notes").is_none());
    }

    #[test]
    fn test_filter() {
        let record = complete();
        assert!(RecordFilter::All.matches(&record));
        assert!(RecordFilter::Image("i".into()).matches(&record));
        assert!(!RecordFilter::Project("other".into()).matches(&record));
        assert!(RecordFilter::Label("l".into()).matches(&record));
    }
}
