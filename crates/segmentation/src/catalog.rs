//! Static field, operator and timeframe catalogs for segment criteria.
//!
//! The tables are immutable and shared for the life of the process. Lookups
//! never fail: an unknown field key is treated as a string field.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    String,
    Number,
    Date,
    Boolean,
    Event,
}

impl ValueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueType::String => "string",
            ValueType::Number => "number",
            ValueType::Date => "date",
            ValueType::Boolean => "boolean",
            ValueType::Event => "event",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "string" => Some(ValueType::String),
            "number" => Some(ValueType::Number),
            "date" => Some(ValueType::Date),
            "boolean" => Some(ValueType::Boolean),
            "event" => Some(ValueType::Event),
            _ => None,
        }
    }

    /// Date and event criteria may be bounded by a relative timeframe.
    pub fn accepts_timeframe(&self) -> bool {
        matches!(self, ValueType::Date | ValueType::Event)
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Equals,
    NotEquals,
    Contains,
    NotContains,
    StartsWith,
    EndsWith,
    In,
    NotIn,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    Between,
    Before,
    After,
    WithinLast,
    MoreThanAgo,
    Performed,
    NotPerformed,
    PerformedCount,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Equals => "equals",
            Operator::NotEquals => "not_equals",
            Operator::Contains => "contains",
            Operator::NotContains => "not_contains",
            Operator::StartsWith => "starts_with",
            Operator::EndsWith => "ends_with",
            Operator::In => "in",
            Operator::NotIn => "not_in",
            Operator::GreaterThan => "greater_than",
            Operator::GreaterThanOrEqual => "greater_than_or_equal",
            Operator::LessThan => "less_than",
            Operator::LessThanOrEqual => "less_than_or_equal",
            Operator::Between => "between",
            Operator::Before => "before",
            Operator::After => "after",
            Operator::WithinLast => "within_last",
            Operator::MoreThanAgo => "more_than_ago",
            Operator::Performed => "performed",
            Operator::NotPerformed => "not_performed",
            Operator::PerformedCount => "performed_count",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        ALL_OPERATORS.iter().copied().find(|op| op.as_str() == key)
    }

    /// Operators that need a timeframe rather than a value to be meaningful.
    pub fn requires_timeframe(&self) -> bool {
        matches!(self, Operator::WithinLast | Operator::MoreThanAgo)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const ALL_OPERATORS: [Operator; 20] = [
    Operator::Equals,
    Operator::NotEquals,
    Operator::Contains,
    Operator::NotContains,
    Operator::StartsWith,
    Operator::EndsWith,
    Operator::In,
    Operator::NotIn,
    Operator::GreaterThan,
    Operator::GreaterThanOrEqual,
    Operator::LessThan,
    Operator::LessThanOrEqual,
    Operator::Between,
    Operator::Before,
    Operator::After,
    Operator::WithinLast,
    Operator::MoreThanAgo,
    Operator::Performed,
    Operator::NotPerformed,
    Operator::PerformedCount,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldDefinition {
    pub key: &'static str,
    pub label: &'static str,
    pub value_type: ValueType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OperatorDefinition {
    pub key: Operator,
    pub label: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "1_hour")]
    OneHour,
    #[serde(rename = "24_hours")]
    TwentyFourHours,
    #[serde(rename = "7_days")]
    SevenDays,
    #[serde(rename = "30_days")]
    ThirtyDays,
    #[serde(rename = "90_days")]
    NinetyDays,
    #[serde(rename = "6_months")]
    SixMonths,
    #[serde(rename = "1_year")]
    OneYear,
}

impl Timeframe {
    pub fn duration(&self) -> Duration {
        match self {
            Timeframe::OneHour => Duration::hours(1),
            Timeframe::TwentyFourHours => Duration::hours(24),
            Timeframe::SevenDays => Duration::days(7),
            Timeframe::ThirtyDays => Duration::days(30),
            Timeframe::NinetyDays => Duration::days(90),
            Timeframe::SixMonths => Duration::days(180),
            Timeframe::OneYear => Duration::days(365),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeframeDefinition {
    pub key: Timeframe,
    pub label: &'static str,
}

macro_rules! field {
    ($key:literal, $label:literal, $ty:ident) => {
        FieldDefinition {
            key: $key,
            label: $label,
            value_type: ValueType::$ty,
        }
    };
}

macro_rules! op {
    ($key:ident, $label:literal) => {
        OperatorDefinition {
            key: Operator::$key,
            label: $label,
        }
    };
}

static FIELDS: [FieldDefinition; 29] = [
    field!("email", "Email", String),
    field!("first_name", "First Name", String),
    field!("last_name", "Last Name", String),
    field!("country", "Country", String),
    field!("city", "City", String),
    field!("device_type", "Device Type", String),
    field!("device_model", "Device Model", String),
    field!("os_version", "OS Version", String),
    field!("app_version", "App Version", String),
    field!("signup_date", "Signup Date", Date),
    field!("last_seen", "Last Seen", Date),
    field!("session_count", "Session Count", Number),
    field!("total_orders", "Total Orders", Number),
    field!("total_spent", "Total Spent", Number),
    field!("avg_order_value", "Avg Order Value", Number),
    field!("last_purchase_date", "Last Purchase Date", Date),
    field!("rfm_recency", "RFM Recency", Number),
    field!("rfm_frequency", "RFM Frequency", Number),
    field!("rfm_monetary", "RFM Monetary", Number),
    field!("rfm_score", "RFM Score", String),
    field!("push_enabled", "Push Enabled", Boolean),
    field!("email_subscribed", "Email Subscribed", Boolean),
    field!("sms_subscribed", "SMS Subscribed", Boolean),
    field!("custom_attributes.subscription_tier", "Subscription Tier", String),
    field!("custom_attributes.favorite_category", "Favorite Category", String),
    field!("events.purchase_completed", "Purchase Completed Event", Event),
    field!("events.cart_abandoned", "Cart Abandoned Event", Event),
    field!("events.page_view", "Page View Event", Event),
    field!("events.button_click", "Button Click Event", Event),
];

static STRING_OPERATORS: [OperatorDefinition; 8] = [
    op!(Equals, "Equals"),
    op!(NotEquals, "Not Equals"),
    op!(Contains, "Contains"),
    op!(NotContains, "Does Not Contain"),
    op!(StartsWith, "Starts With"),
    op!(EndsWith, "Ends With"),
    op!(In, "In List"),
    op!(NotIn, "Not In List"),
];

static NUMBER_OPERATORS: [OperatorDefinition; 7] = [
    op!(Equals, "Equals"),
    op!(NotEquals, "Not Equals"),
    op!(GreaterThan, "Greater Than"),
    op!(GreaterThanOrEqual, "Greater Than or Equal"),
    op!(LessThan, "Less Than"),
    op!(LessThanOrEqual, "Less Than or Equal"),
    op!(Between, "Between"),
];

static DATE_OPERATORS: [OperatorDefinition; 6] = [
    op!(Equals, "On Date"),
    op!(Before, "Before"),
    op!(After, "After"),
    op!(Between, "Between"),
    op!(WithinLast, "Within Last"),
    op!(MoreThanAgo, "More Than Ago"),
];

static BOOLEAN_OPERATORS: [OperatorDefinition; 2] = [op!(Equals, "Is"), op!(NotEquals, "Is Not")];

static EVENT_OPERATORS: [OperatorDefinition; 3] = [
    op!(Performed, "Performed"),
    op!(NotPerformed, "Not Performed"),
    op!(PerformedCount, "Performed Count"),
];

static TIMEFRAMES: [TimeframeDefinition; 7] = [
    TimeframeDefinition { key: Timeframe::OneHour, label: "Last 1 Hour" },
    TimeframeDefinition { key: Timeframe::TwentyFourHours, label: "Last 24 Hours" },
    TimeframeDefinition { key: Timeframe::SevenDays, label: "Last 7 Days" },
    TimeframeDefinition { key: Timeframe::ThirtyDays, label: "Last 30 Days" },
    TimeframeDefinition { key: Timeframe::NinetyDays, label: "Last 90 Days" },
    TimeframeDefinition { key: Timeframe::SixMonths, label: "Last 6 Months" },
    TimeframeDefinition { key: Timeframe::OneYear, label: "Last 1 Year" },
];

pub fn fields() -> &'static [FieldDefinition] {
    &FIELDS
}

pub fn field(key: &str) -> Option<&'static FieldDefinition> {
    FIELDS.iter().find(|f| f.key == key)
}

/// Declared value type of a field, or `String` for keys outside the catalog.
pub fn field_type(key: &str) -> ValueType {
    field(key).map_or(ValueType::String, |f| f.value_type)
}

pub fn operators_for(value_type: ValueType) -> &'static [OperatorDefinition] {
    match value_type {
        ValueType::String => &STRING_OPERATORS,
        ValueType::Number => &NUMBER_OPERATORS,
        ValueType::Date => &DATE_OPERATORS,
        ValueType::Boolean => &BOOLEAN_OPERATORS,
        ValueType::Event => &EVENT_OPERATORS,
    }
}

pub fn is_allowed(value_type: ValueType, operator: Operator) -> bool {
    operators_for(value_type).iter().any(|d| d.key == operator)
}

pub fn timeframes() -> &'static [TimeframeDefinition] {
    &TIMEFRAMES
}
