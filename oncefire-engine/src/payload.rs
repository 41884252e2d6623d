use oncefire_models::core::{TaskRecord, DEVICE_KEYS_FIELD};
use reqwest::Method;
use serde_json::{Map, Value};

use crate::{
    credentials::CredentialSet,
    error::{Result, TaskError},
};

/// Everything needed to deliver one task's callback.
#[derive(Debug, Clone, PartialEq)]
pub struct WebhookRequest {
    pub method: Method,
    pub url: String,
    pub payload: Map<String, Value>,
}

impl WebhookRequest {
    /// Query-string form of the payload for GET callbacks. Lists expand into
    /// repeated keys, nulls are dropped and nested objects are sent as JSON.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        for (key, value) in &self.payload {
            match value {
                Value::Null => {}
                Value::Array(items) => {
                    for item in items {
                        if let Some(text) = query_text(item) {
                            pairs.push((key.clone(), text));
                        }
                    }
                }
                other => {
                    if let Some(text) = query_text(other) {
                        pairs.push((key.clone(), text));
                    }
                }
            }
        }
        pairs
    }
}

fn query_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

/// Builds the outgoing request from a deep copy of the record's body with the
/// device keys resolved. The record itself is left untouched.
pub fn build_request(record: &TaskRecord, credentials: &CredentialSet) -> Result<WebhookRequest> {
    let url = match record.webhook_url()? {
        Some(url) if !url.trim().is_empty() => url.to_string(),
        _ => return Err(TaskError::MissingWebhookUrl),
    };

    let verb = record.method()?.unwrap_or("POST").to_uppercase();
    let method =
        Method::from_bytes(verb.as_bytes()).map_err(|_| TaskError::InvalidMethod(verb.clone()))?;

    let mut payload = record.body()?.cloned().unwrap_or_default();
    let declared = declared_keys(&payload)?;
    let resolved = credentials.resolve(&declared);
    payload.insert(
        DEVICE_KEYS_FIELD.into(),
        Value::Array(resolved.into_iter().map(Value::String).collect()),
    );

    Ok(WebhookRequest {
        method,
        url,
        payload,
    })
}

fn declared_keys(payload: &Map<String, Value>) -> Result<Vec<String>> {
    match payload.get(DEVICE_KEYS_FIELD) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str().map(str::to_string).ok_or_else(|| {
                    TaskError::InvalidPayload(format!("{DEVICE_KEYS_FIELD} entry {item} is not a string"))
                })
            })
            .collect(),
        Some(other) => Err(TaskError::InvalidPayload(format!(
            "{DEVICE_KEYS_FIELD} should be a list, found {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use serde_json::json;

    use super::*;

    fn record(value: Value) -> TaskRecord {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn resolution_never_touches_the_record() {
        let task = record(json!({
            "webhook_url": "https://push.example/send",
            "body": { "title": "hi", "device_keys": ["iphone", "raw"] }
        }));
        let before = serde_json::to_vec(&task).unwrap();
        let credentials = CredentialSet::Map(BTreeMap::from([("iphone".to_string(), "secret".to_string())]));

        let request = build_request(&task, &credentials).unwrap();

        assert_eq!(request.payload["device_keys"], json!(["secret", "raw"]));
        assert_eq!(request.payload["title"], json!("hi"));
        assert_eq!(serde_json::to_vec(&task).unwrap(), before);
    }

    #[test]
    fn defaults_to_post_with_empty_body() {
        let task = record(json!({ "webhook_url": "https://push.example/send" }));
        let request = build_request(&task, &CredentialSet::List(vec!["k1".into()])).unwrap();
        assert_eq!(request.method, Method::POST);
        assert_eq!(request.payload, json!({ "device_keys": ["k1"] }).as_object().cloned().unwrap());
    }

    #[test]
    fn method_is_case_insensitive() {
        let task = record(json!({ "webhook_url": "https://push.example", "method": "get" }));
        assert_eq!(build_request(&task, &CredentialSet::default()).unwrap().method, Method::GET);
    }

    #[test]
    fn rejects_unusable_records() {
        let credentials = CredentialSet::default();
        assert!(matches!(
            build_request(&record(json!({})), &credentials),
            Err(TaskError::MissingWebhookUrl)
        ));
        assert!(matches!(
            build_request(&record(json!({ "webhook_url": "https://x", "method": "PO ST" })), &credentials),
            Err(TaskError::InvalidMethod(_))
        ));
        assert!(matches!(
            build_request(
                &record(json!({ "webhook_url": "https://x", "body": { "device_keys": "k1" } })),
                &credentials
            ),
            Err(TaskError::InvalidPayload(_))
        ));
        assert!(matches!(
            build_request(&record(json!({ "webhook_url": "https://x", "body": [1] })), &credentials),
            Err(TaskError::Field(_))
        ));
    }

    #[test]
    fn query_pairs_expand_lists() {
        let request = WebhookRequest {
            method: Method::GET,
            url: "https://push.example".into(),
            payload: json!({
                "title": "hi",
                "badge": 3,
                "sound": null,
                "device_keys": ["k1", "k2"],
                "extra": { "a": 1 }
            })
            .as_object()
            .cloned()
            .unwrap(),
        };
        assert_eq!(
            request.query_pairs(),
            vec![
                ("title".to_string(), "hi".to_string()),
                ("badge".to_string(), "3".to_string()),
                ("device_keys".to_string(), "k1".to_string()),
                ("device_keys".to_string(), "k2".to_string()),
                ("extra".to_string(), r#"{"a":1}"#.to_string()),
            ]
        );
    }
}
