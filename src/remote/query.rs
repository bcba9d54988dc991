use std::cmp::Ordering;

use serde_json::{Map, Value};

use super::record::{decode_date, Record};

/// Upper bound the backend accepts for a single query.
pub const MAX_LIMIT: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Equal,
    GreaterThanOrEqual,
    LessThan,
}

impl Comparison {
    fn operator(self) -> Option<&'static str> {
        match self {
            Comparison::Equal => None,
            Comparison::GreaterThanOrEqual => Some("$gte"),
            Comparison::LessThan => Some("$lt"),
        }
    }

    fn accepts(self, ordering: Ordering) -> bool {
        match self {
            Comparison::Equal => ordering == Ordering::Equal,
            Comparison::GreaterThanOrEqual => ordering != Ordering::Less,
            Comparison::LessThan => ordering == Ordering::Less,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    pub field: String,
    pub comparison: Comparison,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub class_name: String,
    pub constraints: Vec<Constraint>,
    pub limit: usize,
}

impl Query {
    pub fn new(class_name: &str) -> Self {
        Self {
            class_name: class_name.to_string(),
            constraints: Vec::new(),
            limit: 100,
        }
    }

    pub fn equal_to(self, field: &str, value: impl Into<Value>) -> Self {
        self.push(field, Comparison::Equal, value.into())
    }

    pub fn greater_than_or_equal_to(self, field: &str, value: impl Into<Value>) -> Self {
        self.push(field, Comparison::GreaterThanOrEqual, value.into())
    }

    pub fn less_than(self, field: &str, value: impl Into<Value>) -> Self {
        self.push(field, Comparison::LessThan, value.into())
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit.min(MAX_LIMIT);
        self
    }

    fn push(mut self, field: &str, comparison: Comparison, value: Value) -> Self {
        self.constraints.push(Constraint {
            field: field.to_string(),
            comparison,
            value,
        });
        self
    }

    /// The `where` clause in the backend's JSON dialect. Operators on the
    /// same field are merged into one object.
    pub fn where_clause(&self) -> Value {
        let mut clause = Map::new();
        for c in &self.constraints {
            match c.comparison.operator() {
                None => {
                    clause.insert(c.field.clone(), c.value.clone());
                }
                Some(op) => {
                    let entry = clause
                        .entry(c.field.clone())
                        .or_insert_with(|| Value::Object(Map::new()));
                    if let Value::Object(ops) = entry {
                        ops.insert(op.to_string(), c.value.clone());
                    }
                }
            }
        }
        Value::Object(clause)
    }

    /// Evaluates every constraint against `record`. A missing field or
    /// values of incomparable types never match.
    pub fn matches(&self, record: &Record) -> bool {
        self.constraints.iter().all(|c| {
            record
                .fields
                .get(&c.field)
                .and_then(|v| compare_values(v, &c.value))
                .is_some_and(|ordering| c.comparison.accepts(ordering))
        })
    }
}

fn compare_values(left: &Value, right: &Value) -> Option<Ordering> {
    if let (Some(l), Some(r)) = (decode_date(left), decode_date(right)) {
        return Some(l.cmp(&r));
    }
    match (left, right) {
        (Value::Number(l), Value::Number(r)) => l.as_f64()?.partial_cmp(&r.as_f64()?),
        (Value::String(l), Value::String(r)) => Some(l.cmp(r)),
        (Value::Bool(l), Value::Bool(r)) => Some(l.cmp(r)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::record::encode_date;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn at(d: u32, h: u32) -> Value {
        encode_date(Utc.with_ymd_and_hms(2024, 3, d, h, 0, 0).unwrap())
    }

    #[test]
    fn where_clause_merges_operators_per_field() {
        let q = Query::new("Schedule")
            .greater_than_or_equal_to("startDate", at(1, 0))
            .less_than("startDate", at(2, 0))
            .equal_to("title", "x");
        assert_eq!(
            q.where_clause(),
            json!({
                "startDate": {"$gte": at(1, 0), "$lt": at(2, 0)},
                "title": "x"
            })
        );
    }

    #[test]
    fn limit_is_capped() {
        assert_eq!(Query::new("Schedule").limit(5000).limit, MAX_LIMIT);
    }

    #[test]
    fn matches_compares_dates_chronologically() {
        let q = Query::new("Schedule")
            .greater_than_or_equal_to("startDate", at(5, 0))
            .less_than("startDate", at(6, 0));

        let mut inside = Record::new();
        inside.fields.insert("startDate".into(), at(5, 10));
        let mut outside = Record::new();
        outside.fields.insert("startDate".into(), at(6, 0));
        let missing = Record::new();

        assert!(q.matches(&inside));
        assert!(!q.matches(&outside));
        assert!(!q.matches(&missing));
    }
}
