//! In-memory segment backend backed by DashMap.
//!
//! Stands in for the hosted database during development and tests. Preview
//! counts are computed by evaluating criteria against the seeded users.

use crate::backend::SegmentBackend;
use async_trait::async_trait;
use audience_core::types::{UserContext, UserRecord};
use audience_core::{AudienceError, AudienceResult};
use audience_segmentation::{
    CriteriaEvaluator, Criterion, Operator, Segment, SegmentBuilder, SegmentUpdate, Timeframe,
};
use chrono::{Duration, Utc};
use dashmap::DashMap;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

pub struct InMemoryBackend {
    segments: DashMap<Uuid, Segment>,
    users: DashMap<Uuid, UserContext>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        info!("Segment backend initialized (in-memory)");
        Self {
            segments: DashMap::new(),
            users: DashMap::new(),
        }
    }

    /// A backend pre-populated with demo users, events and segments.
    pub fn with_demo_data() -> Self {
        let backend = Self::new();
        backend.seed_demo_data();
        backend
    }

    pub fn add_user(&self, user: UserContext) {
        self.users.insert(user.user_id, user);
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    fn count_users(&self, evaluator: &CriteriaEvaluator) -> u64 {
        let now = Utc::now();
        self.users
            .iter()
            .filter(|entry| evaluator.matches(entry.value(), now))
            .count() as u64
    }

    fn seed_demo_data(&self) {
        let now = Utc::now();
        let day = |n: i64| (now - Duration::days(n)).to_rfc3339();

        // (email, first name, country, city, device, orders, spent, sessions,
        //  signup days ago, last seen days ago, push, rfm, tier, events)
        #[allow(clippy::type_complexity)]
        let users: Vec<(&str, &str, &str, &str, &str, u32, f64, u32, i64, i64, bool, &str, &str, &[(&str, i64)])> = vec![
            ("ana@example.com", "Ana", "US", "Austin", "ios", 14, 1820.0, 96, 420, 1, true, "555", "gold",
                &[("purchase_completed", 2), ("page_view", 1), ("page_view", 0)]),
            ("ben@example.com", "Ben", "US", "Denver", "android", 3, 240.0, 18, 200, 12, false, "322", "silver",
                &[("cart_abandoned", 12), ("page_view", 12)]),
            ("chloe@example.ca", "Chloe", "CA", "Toronto", "ios", 9, 960.0, 51, 610, 3, true, "444", "gold",
                &[("purchase_completed", 20), ("button_click", 3)]),
            ("diego@example.mx", "Diego", "MX", "Monterrey", "android", 1, 35.0, 4, 150, 110, true, "212", "",
                &[("cart_abandoned", 120)]),
            ("emma@example.co.uk", "Emma", "GB", "Leeds", "web", 6, 520.0, 33, 300, 40, false, "231", "silver",
                &[("purchase_completed", 41), ("page_view", 40)]),
            ("farid@example.com", "Farid", "US", "Seattle", "web", 0, 0.0, 2, 6, 5, false, "", "",
                &[("page_view", 5), ("button_click", 5)]),
            ("grace@example.com", "Grace", "US", "Boston", "ios", 22, 3400.0, 140, 900, 0, true, "545", "platinum",
                &[("purchase_completed", 0), ("purchase_completed", 9), ("page_view", 0)]),
            ("hiro@example.jp", "Hiro", "JP", "Osaka", "android", 5, 610.0, 27, 380, 160, true, "132", "",
                &[("purchase_completed", 170)]),
        ];

        for (email, first_name, country, city, device, orders, spent, sessions, signup, seen, push, rfm, tier, events) in users {
            let mut user = UserContext::new(Uuid::new_v4())
                .with_attribute("email", json!(email))
                .with_attribute("first_name", json!(first_name))
                .with_attribute("country", json!(country))
                .with_attribute("city", json!(city))
                .with_attribute("device_type", json!(device))
                .with_attribute("total_orders", json!(orders))
                .with_attribute("total_spent", json!(spent))
                .with_attribute("avg_order_value", json!(if orders > 0 { spent / orders as f64 } else { 0.0 }))
                .with_attribute("session_count", json!(sessions))
                .with_attribute("signup_date", json!(day(signup)))
                .with_attribute("last_seen", json!(day(seen)))
                .with_attribute("push_enabled", json!(push))
                .with_attribute("email_subscribed", json!(true))
                .with_attribute("sms_subscribed", json!(false));
            if !rfm.is_empty() {
                user = user.with_attribute("rfm_score", json!(rfm));
            }
            if !tier.is_empty() {
                user = user.with_attribute("custom_attributes", json!({ "subscription_tier": tier }));
            }
            for (name, ago) in events {
                user = user.with_event(*name, now - Duration::days(*ago));
            }
            self.add_user(user);
        }

        let demo = [
            SegmentBuilder::new("High-value US customers")
                .description("US users who have spent more than 500")
                .and("country", Operator::Equals, "US")
                .and("total_spent", Operator::GreaterThan, "500")
                .created_by("admin")
                .build(),
            SegmentBuilder::new("Cart abandoners")
                .description("Abandoned a cart in the last 90 days without buying")
                .did_event("cart_abandoned", Some(Timeframe::NinetyDays))
                .did_not_do_event("purchase_completed", Some(Timeframe::NinetyDays))
                .created_by("admin")
                .build(),
        ];
        for (offset, mut new) in demo.into_iter().enumerate() {
            if let Ok(evaluator) = CriteriaEvaluator::compile(&new.criteria.conditions) {
                new.user_count = self.count_users(&evaluator);
            }
            let segment = new.into_segment(now - Duration::days(offset as i64 + 1));
            self.segments.insert(segment.id, segment);
        }

        info!(
            users = self.users.len(),
            segments = self.segments.len(),
            "Seeded demo segment data"
        );
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SegmentBackend for InMemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn insert_segment(&self, segment: Segment) -> AudienceResult<Segment> {
        match self.segments.entry(segment.id) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(AudienceError::Rejected {
                status: 409,
                message: format!("segment {} already exists", segment.id),
            }),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(segment.clone());
                Ok(segment)
            }
        }
    }

    async fn get_segment(&self, id: Uuid) -> AudienceResult<Option<Segment>> {
        Ok(self.segments.get(&id).map(|r| r.value().clone()))
    }

    async fn list_segments(&self) -> AudienceResult<Vec<Segment>> {
        let mut segments: Vec<Segment> = self.segments.iter().map(|r| r.value().clone()).collect();
        segments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(segments)
    }

    async fn update_segment(&self, id: Uuid, update: SegmentUpdate) -> AudienceResult<Option<Segment>> {
        Ok(self.segments.get_mut(&id).map(|mut entry| {
            update.apply_to(entry.value_mut(), Utc::now());
            entry.value().clone()
        }))
    }

    async fn delete_segment(&self, id: Uuid) -> AudienceResult<bool> {
        Ok(self.segments.remove(&id).is_some())
    }

    async fn count_matching(&self, criteria: &[Criterion]) -> AudienceResult<u64> {
        let evaluator = CriteriaEvaluator::compile(criteria)?;
        Ok(self.count_users(&evaluator))
    }

    async fn matching_users(&self, criteria: &[Criterion], limit: usize) -> AudienceResult<Vec<UserRecord>> {
        let evaluator = CriteriaEvaluator::compile(criteria)?;
        let now = Utc::now();
        let mut members: Vec<UserRecord> = self
            .users
            .iter()
            .filter(|entry| evaluator.matches(entry.value(), now))
            .map(|entry| entry.value().to_record())
            .collect();
        // Map iteration order is arbitrary; keep listings stable across calls.
        members.sort_by_key(|m| m.id);
        members.truncate(limit);
        Ok(members)
    }

    async fn rfm_scores(&self) -> AudienceResult<Vec<String>> {
        Ok(self
            .users
            .iter()
            .filter_map(|entry| {
                entry
                    .value()
                    .attribute("rfm_score")
                    .and_then(|v| v.as_str())
                    .map(str::to_string)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use audience_segmentation::Joiner;

    #[tokio::test]
    async fn test_demo_data_counts() {
        let backend = InMemoryBackend::with_demo_data();
        assert_eq!(backend.user_count(), 8);

        let high_value_us = [
            Criterion::new("country", Operator::Equals, "US"),
            Criterion::new("total_spent", Operator::GreaterThan, "500").joined_by(Joiner::And),
        ];
        // Ana and Grace.
        assert_eq!(backend.count_matching(&high_value_us).await.unwrap(), 2);

        let segments = backend.list_segments().await.unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].name, "High-value US customers");
        assert_eq!(segments[0].user_count, 2);
        // Ben abandoned 12 days ago; Diego's abandonment is outside 90 days.
        assert_eq!(segments[1].user_count, 1);
    }

    #[tokio::test]
    async fn test_insert_conflict() {
        let backend = InMemoryBackend::new();
        let segment = SegmentBuilder::new("US")
            .and("country", Operator::Equals, "US")
            .build()
            .into_segment(Utc::now());
        backend.insert_segment(segment.clone()).await.unwrap();
        let err = backend.insert_segment(segment).await.unwrap_err();
        assert!(matches!(err, AudienceError::Rejected { status: 409, .. }));
    }

    #[tokio::test]
    async fn test_update_and_delete_unknown_id() {
        let backend = InMemoryBackend::new();
        let id = Uuid::new_v4();
        assert!(backend
            .update_segment(id, SegmentUpdate::default())
            .await
            .unwrap()
            .is_none());
        assert!(!backend.delete_segment(id).await.unwrap());
    }

    #[tokio::test]
    async fn test_matching_users_limit() {
        let backend = InMemoryBackend::with_demo_data();
        let us = [Criterion::new("country", Operator::Equals, "US")];

        let members = backend.matching_users(&us, 100).await.unwrap();
        assert_eq!(members.len(), 4);
        assert!(members
            .iter()
            .all(|m| m.attributes.get("country") == Some(&json!("US"))));

        let first_two = backend.matching_users(&us, 2).await.unwrap();
        assert_eq!(first_two, members[..2].to_vec());
        assert!(backend.matching_users(&us, 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rfm_scores_skip_missing() {
        let backend = InMemoryBackend::with_demo_data();
        let scores = backend.rfm_scores().await.unwrap();
        assert_eq!(scores.len(), 7);
    }
}
