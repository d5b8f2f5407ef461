//! Request body extraction.
//!
//! Producers and workers send either JSON objects or urlencoded forms. Both
//! are normalised into a JSON object, and field presence follows JSON
//! truthiness rather than key existence.

use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::{Form, FromRequest, Request};
use axum::http::header::CONTENT_TYPE;
use serde_json::{Map, Value};

use crate::error::Error;
use crate::model::{NewJob, Report, is_payload_key, is_truthy};

/// A request body as a JSON object. An empty body is an empty object.
#[derive(Debug, Default)]
pub struct FieldMap(pub Map<String, Value>);

impl<S: Send + Sync> FromRequest<S> for FieldMap {
    type Rejection = Error;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_form = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));

        if is_form {
            let Form(fields) = Form::<HashMap<String, String>>::from_request(req, state)
                .await
                .map_err(|e| Error::MalformedBody(e.body_text()))?;
            let map = fields
                .into_iter()
                .map(|(k, v)| (k, Value::String(v)))
                .collect();
            return Ok(Self(map));
        }

        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| Error::MalformedBody(e.body_text()))?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json::from_slice(&bytes)
            .map(Self)
            .map_err(|e| Error::MalformedBody(e.to_string()))
    }
}

impl FieldMap {
    /// A field as text. Falsy values read as empty; numbers and `true`
    /// are rendered as their JSON text.
    pub fn text(&self, key: &str) -> String {
        match self.0.get(key) {
            Some(Value::String(s)) => s.clone(),
            Some(v @ (Value::Number(_) | Value::Bool(_))) if is_truthy(v) => v.to_string(),
            _ => String::new(),
        }
    }

    pub fn flag(&self, key: &str) -> bool {
        self.0.get(key).is_some_and(is_truthy)
    }

    /// Every field without a dedicated job field, verbatim.
    pub fn extras(&self) -> Map<String, Value> {
        self.0
            .iter()
            .filter(|(k, _)| is_payload_key(k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn into_new_job(self) -> NewJob {
        NewJob {
            id: self.text("id"),
            url: self.text("url"),
            kind: self.text("type"),
            payload: self.extras(),
        }
    }

    pub fn into_report(self) -> Report {
        let kind = Some(self.text("type")).filter(|k| !k.is_empty());
        let mut fields = self.extras();
        fields.remove("result");
        Report {
            id: self.text("id"),
            url: self.text("url"),
            result: self.0.get("result").cloned().unwrap_or(Value::Null),
            completed: self.flag("completed"),
            kind,
            fields,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> FieldMap {
        match value {
            Value::Object(map) => FieldMap(map),
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn numeric_ids_are_rendered_as_text() {
        let body = fields(json!({"id": 42, "url": "http://x", "type": "t"}));
        assert_eq!(body.text("id"), "42");
    }

    #[test]
    fn falsy_values_read_as_missing() {
        let body = fields(json!({"id": 0, "url": "", "type": null, "flag": false}));
        assert_eq!(body.text("id"), "");
        assert_eq!(body.text("url"), "");
        assert_eq!(body.text("type"), "");
        assert!(!body.flag("flag"));
        assert!(!body.flag("absent"));
    }

    #[test]
    fn job_field_keys_stay_out_of_payload() {
        let job = fields(json!({
            "id": "a",
            "url": "http://x",
            "type": "t",
            "createdAt": "yesterday",
            "result": "seed",
            "depth": 3
        }))
        .into_new_job();

        assert_eq!(job.payload.len(), 2);
        assert_eq!(job.payload["depth"], json!(3));
        assert_eq!(job.payload["result"], json!("seed"));
    }

    #[test]
    fn report_reads_completion_flag_and_type_override() {
        let report = fields(json!({
            "id": "a",
            "url": "http://x",
            "result": {"status": 200},
            "completed": 1,
            "type": "retyped"
        }))
        .into_report();

        assert!(report.completed);
        assert_eq!(report.kind.as_deref(), Some("retyped"));
        assert_eq!(report.result, json!({"status": 200}));
        assert_eq!(report.fields.len(), 1);
        assert_eq!(report.fields["completed"], json!(1));
    }
}
