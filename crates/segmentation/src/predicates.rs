//! Typed predicates compiled from criteria, and their matching rules.

use crate::catalog::{self, Operator, Timeframe, ValueType};
use crate::criteria::Criterion;
use audience_core::types::UserContext;
use audience_core::ValidationError;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::cmp::Ordering;

/// Parsed right-hand side of a criterion.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    None,
    Text(String),
    TextList(Vec<String>),
    Number(f64),
    NumberRange(f64, f64),
    Date(DateTime<Utc>),
    DateRange(DateTime<Utc>, DateTime<Utc>),
    Flag(bool),
    Count(u64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub field: String,
    pub value_type: ValueType,
    pub operator: Operator,
    pub operand: Operand,
    /// Only kept for date and event fields.
    pub timeframe: Option<Timeframe>,
}

impl Predicate {
    /// Check a criterion against the catalogs and parse its value.
    /// `index` is the criterion's position, reported back in errors.
    pub fn compile(index: usize, criterion: &Criterion) -> Result<Self, ValidationError> {
        let field = criterion.field.trim();
        if field.is_empty() {
            return Err(ValidationError::MissingField { index });
        }

        let key = criterion.operator.trim();
        if key.is_empty() {
            return Err(ValidationError::MissingOperator { index });
        }
        let operator = Operator::from_key(key).ok_or_else(|| ValidationError::UnknownOperator {
            index,
            operator: key.to_string(),
        })?;

        let value_type = catalog::field_type(field);
        if !catalog::is_allowed(value_type, operator) {
            return Err(ValidationError::OperatorNotAllowed {
                index,
                operator: key.to_string(),
                value_type: value_type.to_string(),
            });
        }
        if operator.requires_timeframe() && criterion.timeframe.is_none() {
            return Err(ValidationError::MissingTimeframe {
                index,
                operator: key.to_string(),
            });
        }

        let operand = parse_operand(value_type, operator, criterion.value.trim())
            .map_err(|reason| ValidationError::InvalidValue { index, reason })?;

        Ok(Self {
            field: field.to_string(),
            value_type,
            operator,
            operand,
            timeframe: criterion.timeframe.filter(|_| value_type.accepts_timeframe()),
        })
    }

    /// Evaluate against one user. `now` anchors every relative window.
    pub fn matches(&self, user: &UserContext, now: DateTime<Utc>) -> bool {
        if self.value_type == ValueType::Event {
            return self.matches_events(user, now);
        }
        match user.attribute(&self.field) {
            Some(actual) => self.compare(actual, now),
            None => self.matches_missing(),
        }
    }

    /// An absent attribute satisfies only the negative equality operators.
    fn matches_missing(&self) -> bool {
        matches!(self.operator, Operator::NotEquals | Operator::NotPerformed)
    }

    fn matches_events(&self, user: &UserContext, now: DateTime<Utc>) -> bool {
        let event_name = self.field.strip_prefix("events.").unwrap_or(&self.field);
        let since = self.timeframe.map(|tf| now - tf.duration());
        let count = user.count_events(event_name, since);
        match (self.operator, &self.operand) {
            (Operator::Performed, _) => count > 0,
            (Operator::NotPerformed, _) => count == 0,
            (Operator::PerformedCount, Operand::Count(min)) => count >= *min,
            _ => false,
        }
    }

    fn compare(&self, actual: &serde_json::Value, now: DateTime<Utc>) -> bool {
        match self.value_type {
            ValueType::String => as_text(actual).map_or_else(
                || self.matches_missing(),
                |text| compare_text(&text.to_lowercase(), self.operator, &self.operand),
            ),
            ValueType::Number => as_number(actual).map_or_else(
                || self.matches_missing(),
                |n| compare_number(n, self.operator, &self.operand),
            ),
            ValueType::Date => as_date(actual).map_or_else(
                || self.matches_missing(),
                |d| compare_date(d, self.operator, &self.operand, self.timeframe, now),
            ),
            ValueType::Boolean => as_flag(actual).map_or_else(
                || self.matches_missing(),
                |b| compare_flag(b, self.operator, &self.operand),
            ),
            ValueType::Event => false,
        }
    }
}

fn parse_operand(value_type: ValueType, operator: Operator, raw: &str) -> Result<Operand, String> {
    match value_type {
        ValueType::String => match operator {
            Operator::In | Operator::NotIn => {
                let items: Vec<String> = raw
                    .split(',')
                    .map(|s| s.trim().to_lowercase())
                    .filter(|s| !s.is_empty())
                    .collect();
                if items.is_empty() {
                    return Err("expected a comma-separated list of values".to_string());
                }
                Ok(Operand::TextList(items))
            }
            _ if raw.is_empty() => Err("value is required".to_string()),
            _ => Ok(Operand::Text(raw.to_lowercase())),
        },
        ValueType::Number => match operator {
            Operator::Between => {
                let (low, high) = parse_range(raw, parse_number)?;
                Ok(Operand::NumberRange(low, high))
            }
            _ => parse_number(raw).map(Operand::Number),
        },
        ValueType::Date => match operator {
            Operator::WithinLast | Operator::MoreThanAgo => Ok(Operand::None),
            Operator::Between => {
                let (start, end) = parse_range(raw, parse_date_value)?;
                Ok(Operand::DateRange(start, end))
            }
            _ => parse_date_value(raw).map(Operand::Date),
        },
        ValueType::Boolean => parse_flag(raw)
            .map(Operand::Flag)
            .ok_or_else(|| format!("'{raw}' is not a boolean")),
        ValueType::Event => match operator {
            Operator::PerformedCount => raw
                .parse::<u64>()
                .map(Operand::Count)
                .map_err(|_| format!("'{raw}' is not a non-negative count")),
            _ => Ok(Operand::None),
        },
    }
}

fn parse_range<T: PartialOrd>(
    raw: &str,
    parse: fn(&str) -> Result<T, String>,
) -> Result<(T, T), String> {
    let (low, high) = raw
        .split_once(',')
        .ok_or_else(|| "expected a range as 'start,end'".to_string())?;
    let low = parse(low.trim())?;
    let high = parse(high.trim())?;
    if low > high {
        return Err("range start must not exceed range end".to_string());
    }
    Ok((low, high))
}

fn parse_number(raw: &str) -> Result<f64, String> {
    raw.parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .ok_or_else(|| format!("'{raw}' is not a number"))
}

fn parse_date_value(raw: &str) -> Result<DateTime<Utc>, String> {
    parse_date(raw).ok_or_else(|| format!("'{raw}' is not a date"))
}

/// Accepts RFC 3339 timestamps, naive `YYYY-MM-DDTHH:MM:SS` (read as UTC)
/// and plain `YYYY-MM-DD` dates (midnight UTC).
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(ndt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(ndt.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|ndt| ndt.and_utc())
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" => Some(true),
        "false" | "no" | "0" => Some(false),
        _ => None,
    }
}

fn as_text(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn as_number(value: &serde_json::Value) -> Option<f64> {
    value
        .as_f64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
}

fn as_date(value: &serde_json::Value) -> Option<DateTime<Utc>> {
    value.as_str().and_then(parse_date)
}

fn as_flag(value: &serde_json::Value) -> Option<bool> {
    match value {
        serde_json::Value::Bool(b) => Some(*b),
        serde_json::Value::String(s) => parse_flag(s.trim()),
        serde_json::Value::Number(n) => n.as_i64().and_then(|i| match i {
            0 => Some(false),
            1 => Some(true),
            _ => None,
        }),
        _ => None,
    }
}

fn compare_text(actual: &str, operator: Operator, operand: &Operand) -> bool {
    match (operator, operand) {
        (Operator::Equals, Operand::Text(e)) => actual == e,
        (Operator::NotEquals, Operand::Text(e)) => actual != e,
        (Operator::Contains, Operand::Text(e)) => actual.contains(e.as_str()),
        (Operator::NotContains, Operand::Text(e)) => !actual.contains(e.as_str()),
        (Operator::StartsWith, Operand::Text(e)) => actual.starts_with(e.as_str()),
        (Operator::EndsWith, Operand::Text(e)) => actual.ends_with(e.as_str()),
        (Operator::In, Operand::TextList(list)) => list.iter().any(|e| e == actual),
        (Operator::NotIn, Operand::TextList(list)) => !list.iter().any(|e| e == actual),
        _ => false,
    }
}

fn compare_number(actual: f64, operator: Operator, operand: &Operand) -> bool {
    match (operator, operand) {
        (Operator::Between, Operand::NumberRange(low, high)) => actual >= *low && actual <= *high,
        (_, Operand::Number(expected)) => {
            let Some(ord) = actual.partial_cmp(expected) else {
                return false;
            };
            match operator {
                Operator::Equals => ord == Ordering::Equal,
                Operator::NotEquals => ord != Ordering::Equal,
                Operator::GreaterThan => ord == Ordering::Greater,
                Operator::GreaterThanOrEqual => ord != Ordering::Less,
                Operator::LessThan => ord == Ordering::Less,
                Operator::LessThanOrEqual => ord != Ordering::Greater,
                _ => false,
            }
        }
        _ => false,
    }
}

/// Absolute date operators compare UTC calendar days; relative ones compare
/// instants against `now - timeframe`.
fn compare_date(
    actual: DateTime<Utc>,
    operator: Operator,
    operand: &Operand,
    timeframe: Option<Timeframe>,
    now: DateTime<Utc>,
) -> bool {
    let day = actual.date_naive();
    match (operator, operand) {
        (Operator::Equals, Operand::Date(e)) => day == e.date_naive(),
        (Operator::Before, Operand::Date(e)) => day < e.date_naive(),
        (Operator::After, Operand::Date(e)) => day > e.date_naive(),
        (Operator::Between, Operand::DateRange(start, end)) => {
            day >= start.date_naive() && day <= end.date_naive()
        }
        (Operator::WithinLast, _) => timeframe.is_some_and(|tf| actual >= now - tf.duration()),
        (Operator::MoreThanAgo, _) => timeframe.is_some_and(|tf| actual < now - tf.duration()),
        _ => false,
    }
}

fn compare_flag(actual: bool, operator: Operator, operand: &Operand) -> bool {
    match (operator, operand) {
        (Operator::Equals, Operand::Flag(e)) => actual == *e,
        (Operator::NotEquals, Operand::Flag(e)) => actual != *e,
        _ => false,
    }
}
