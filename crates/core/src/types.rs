//! User-side records consumed from the backend's `users` and `events` tables.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// A user row plus the events recorded against it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserContext {
    pub user_id: Uuid,
    /// Column name to value. `custom_attributes` is kept as a nested object.
    #[serde(default)]
    pub attributes: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub events: Vec<UserEvent>,
}

/// A user row as listed to callers: the id plus its attribute columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: Uuid,
    #[serde(flatten)]
    pub attributes: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserEvent {
    pub event_name: String,
    #[serde(default)]
    pub properties: HashMap<String, serde_json::Value>,
    pub timestamp: DateTime<Utc>,
}

impl UserContext {
    pub fn new(user_id: Uuid) -> Self {
        Self {
            user_id,
            ..Default::default()
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    pub fn with_event(mut self, event_name: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        self.events.push(UserEvent {
            event_name: event_name.into(),
            properties: HashMap::new(),
            timestamp,
        });
        self
    }

    /// Look up an attribute by key. Dotted keys such as
    /// `custom_attributes.subscription_tier` descend into nested objects.
    /// JSON `null` is reported as absent.
    pub fn attribute(&self, key: &str) -> Option<&serde_json::Value> {
        let found = match self.attributes.get(key) {
            Some(value) => Some(value),
            None => {
                let (head, rest) = key.split_once('.')?;
                rest.split('.')
                    .try_fold(self.attributes.get(head)?, |value, part| value.get(part))
            }
        };
        found.filter(|v| !v.is_null())
    }

    /// The attribute row without events.
    pub fn to_record(&self) -> UserRecord {
        UserRecord {
            id: self.user_id,
            attributes: self.attributes.clone(),
        }
    }

    /// Number of events named `event_name` at or after `since` (all time when `None`).
    pub fn count_events(&self, event_name: &str, since: Option<DateTime<Utc>>) -> u64 {
        self.events
            .iter()
            .filter(|e| e.event_name == event_name)
            .filter(|e| since.map_or(true, |cutoff| e.timestamp >= cutoff))
            .count() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    #[test]
    fn test_nested_attribute_lookup() {
        let user = UserContext::new(Uuid::new_v4())
            .with_attribute("country", json!("US"))
            .with_attribute("custom_attributes", json!({"subscription_tier": "gold"}))
            .with_attribute("city", serde_json::Value::Null);

        assert_eq!(user.attribute("country"), Some(&json!("US")));
        assert_eq!(
            user.attribute("custom_attributes.subscription_tier"),
            Some(&json!("gold"))
        );
        assert!(user.attribute("custom_attributes.favorite_category").is_none());
        assert!(user.attribute("city").is_none());
        assert!(user.attribute("missing").is_none());
    }

    #[test]
    fn test_count_events_respects_cutoff() {
        let now = Utc::now();
        let user = UserContext::new(Uuid::new_v4())
            .with_event("page_view", now - Duration::days(40))
            .with_event("page_view", now - Duration::days(2))
            .with_event("purchase_completed", now);

        assert_eq!(user.count_events("page_view", None), 2);
        assert_eq!(user.count_events("page_view", Some(now - Duration::days(7))), 1);
        assert_eq!(user.count_events("cart_abandoned", None), 0);
    }

    #[test]
    fn test_record_flattens_attributes() {
        let id = Uuid::new_v4();
        let user = UserContext::new(id)
            .with_attribute("email", json!("ana@example.com"))
            .with_event("page_view", Utc::now());

        let value = serde_json::to_value(user.to_record()).unwrap();
        assert_eq!(value, json!({"id": id, "email": "ana@example.com"}));

        let back: UserRecord = serde_json::from_value(value).unwrap();
        assert_eq!(back.id, id);
        assert_eq!(back.attributes.get("email"), Some(&json!("ana@example.com")));
    }
}
