use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Map, Value};

use super::acl::Acl;
use super::error::ServiceError;

pub const OBJECT_ID: &str = "objectId";
pub const ACL: &str = "acl";
pub const CREATE_DATE: &str = "createDate";
pub const UPDATE_DATE: &str = "updateDate";

/// A backend object: user fields plus the system-managed id and ACL.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    pub object_id: Option<String>,
    pub fields: Map<String, Value>,
    pub acl: Acl,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.fields.insert(key.to_string(), value.into());
    }

    pub fn set_date(&mut self, key: &str, value: DateTime<Utc>) {
        self.fields.insert(key.to_string(), encode_date(value));
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    pub fn get_date(&self, key: &str) -> Option<DateTime<Utc>> {
        self.fields.get(key).and_then(decode_date)
    }

    /// Body sent on insert/update. System fields other than the ACL are
    /// never written by the client.
    pub fn to_body(&self) -> Value {
        let mut body: Map<String, Value> = self
            .fields
            .iter()
            .filter(|(k, _)| !matches!(k.as_str(), OBJECT_ID | CREATE_DATE | UPDATE_DATE))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        if !self.acl.is_empty() {
            body.insert(ACL.to_string(), json!(self.acl));
        }
        Value::Object(body)
    }

    pub fn from_json(value: Value) -> Result<Self, ServiceError> {
        let mut fields = match value {
            Value::Object(fields) => fields,
            other => {
                return Err(ServiceError::Decode(format!("expected object, got {other}")));
            }
        };
        let object_id = match fields.remove(OBJECT_ID) {
            Some(Value::String(id)) => Some(id),
            Some(Value::Null) | None => None,
            Some(other) => {
                return Err(ServiceError::Decode(format!("invalid objectId {other}")));
            }
        };
        let acl = match fields.remove(ACL) {
            Some(Value::Null) | None => Acl::new(),
            Some(v) => serde_json::from_value(v)?,
        };
        Ok(Self {
            object_id,
            fields,
            acl,
        })
    }
}

/// `{"__type": "Date", "iso": "..."}`, millisecond precision, UTC.
pub fn encode_date(value: DateTime<Utc>) -> Value {
    json!({
        "__type": "Date",
        "iso": value.to_rfc3339_opts(SecondsFormat::Millis, true),
    })
}

/// Accepts the typed date object as well as a bare RFC 3339 string.
pub fn decode_date(value: &Value) -> Option<DateTime<Utc>> {
    let iso = match value {
        Value::Object(obj) if obj.get("__type").and_then(Value::as_str) == Some("Date") => {
            obj.get("iso")?.as_str()?
        }
        Value::String(s) => s.as_str(),
        _ => return None,
    };
    DateTime::parse_from_rfc3339(iso)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
