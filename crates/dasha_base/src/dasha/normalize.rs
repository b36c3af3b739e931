//! Period normalizer: heterogeneous backend records to `DashaNode` trees.
//!
//! Each logical field is resolved through the candidate table in
//! [`super::fields`]. A record that lacks a planet or a parseable start/end
//! is dropped and reported; its siblings still normalize.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::{DashaError, MalformedPeriodError, MalformedReason};

use super::date::parse_instant_value;
use super::fields::{Field, PERIOD_LIST_KEYS, as_f64};
use super::types::{DashaLevel, DashaLord, DashaNode, NodeId};

/// Output of a batch normalization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Normalized {
    /// Successfully normalized nodes, in input order.
    pub nodes: Vec<DashaNode>,
    /// Dropped records, including ones nested inside kept nodes.
    pub errors: Vec<MalformedPeriodError>,
}

impl Normalized {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Normalize a list of sibling records at `level` under `parent`.
pub fn normalize_periods(
    records: &[Value],
    parent: Option<&NodeId>,
    level: DashaLevel,
) -> Normalized {
    let mut out = Normalized {
        nodes: Vec::with_capacity(records.len()),
        errors: Vec::new(),
    };
    for (i, record) in records.iter().enumerate() {
        let order = (i as u32) + 1;
        match normalize_record(record, parent, level, order, &mut out.errors) {
            Ok(node) => out.nodes.push(node),
            Err(e) => {
                warn!(error = %e, "dropping malformed period record");
                out.errors.push(e);
            }
        }
    }
    out
}

/// Normalize one record (and any nested children) into a node.
///
/// Errors in nested children are dropped silently here; use
/// [`normalize_periods`] to collect them.
pub fn normalize_period(
    record: &Value,
    parent: Option<&NodeId>,
    level: DashaLevel,
    order: u32,
) -> Result<DashaNode, MalformedPeriodError> {
    let mut nested = Vec::new();
    normalize_record(record, parent, level, order, &mut nested)
}

/// Normalize the records fetched for `parent`'s next level.
pub fn normalize_children(parent: &DashaNode, records: &[Value]) -> Result<Normalized, DashaError> {
    let level = parent
        .level
        .child_level()
        .ok_or(DashaError::UnsupportedDepth(parent.level))?;
    Ok(normalize_periods(records, Some(&parent.id), level))
}

/// Locate the period list in a response and normalize it.
pub fn normalize_response(
    response: &Value,
    parent: Option<&NodeId>,
    level: DashaLevel,
) -> Result<Normalized, DashaError> {
    let records = find_period_list(response).ok_or(DashaError::NoPeriodList)?;
    Ok(normalize_periods(records, parent, level))
}

fn normalize_record(
    record: &Value,
    parent: Option<&NodeId>,
    level: DashaLevel,
    order: u32,
    errors: &mut Vec<MalformedPeriodError>,
) -> Result<DashaNode, MalformedPeriodError> {
    let fail = |reason| MalformedPeriodError {
        level,
        order,
        reason,
    };

    let obj = record
        .as_object()
        .ok_or_else(|| fail(MalformedReason::NotAnObject))?;

    let lord = Field::Planet
        .lookup(obj)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .map(DashaLord::parse)
        .ok_or_else(|| fail(MalformedReason::MissingPlanet))?;
    if let DashaLord::Unknown(raw) = &lord {
        debug!(planet = %raw, %level, order, "unrecognized planet identifier");
    }

    let start = date_field(obj, Field::Start, "start").map_err(fail)?;
    let end = date_field(obj, Field::End, "end").map_err(fail)?;
    if end < start {
        warn!(%level, order, %start, %end, "period ends before it starts");
    }

    let cycle_number = Field::Cycle
        .lookup(obj)
        .and_then(as_f64)
        .filter(|c| *c >= 1.0)
        .map(|c| c as u32);

    let id = NodeId::new(parent, level, order, &lord);

    let children = match (Field::Children.lookup(obj), level.child_level()) {
        (None, _) => None,
        (Some(Value::Array(items)), Some(child_level)) => {
            let nested = normalize_periods(items, Some(&id), child_level);
            errors.extend(nested.errors);
            Some(Arc::from(nested.nodes))
        }
        (Some(_), None) => {
            warn!(%id, "ignoring sub-periods below Prana");
            None
        }
        (Some(other), Some(_)) => {
            warn!(%id, kind = json_kind(other), "sub-periods field is not an array");
            None
        }
    };

    let raw: Map<String, Value> = obj
        .iter()
        .filter(|(k, _)| !Field::Children.matches(k))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    Ok(DashaNode {
        id,
        lord,
        start,
        end,
        level,
        order,
        children,
        is_current: false,
        is_balance: false,
        cycle_number,
        raw,
    })
}

fn date_field(
    obj: &Map<String, Value>,
    field: Field,
    name: &'static str,
) -> Result<chrono::DateTime<chrono::Utc>, MalformedReason> {
    let value = field.lookup(obj).ok_or(MalformedReason::MissingDate(name))?;
    parse_instant_value(value).ok_or_else(|| MalformedReason::UnparsableDate {
        field: name,
        value: match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        },
    })
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Find the list of period records inside a service response.
///
/// Order of preference: the response itself if it is an array, then known
/// list keys (descending through wrapper objects such as `data`), then the
/// first array anywhere whose first element looks like a period.
pub fn find_period_list(response: &Value) -> Option<&[Value]> {
    find_by_known_keys(response).or_else(|| first_plausible_array(response))
}

fn find_by_known_keys(value: &Value) -> Option<&[Value]> {
    if let Value::Array(items) = value {
        return Some(items);
    }
    let obj = value.as_object()?;
    for key in PERIOD_LIST_KEYS {
        match obj.get(key) {
            Some(Value::Array(items)) if items.first().is_none_or(is_period_like) => {
                return Some(items);
            }
            Some(inner @ Value::Object(_)) => {
                if let Some(found) = find_by_known_keys(inner) {
                    return Some(found);
                }
            }
            _ => {}
        }
    }
    None
}

fn first_plausible_array(value: &Value) -> Option<&[Value]> {
    match value {
        Value::Array(items) => {
            if items.first().is_some_and(is_period_like) {
                return Some(items);
            }
            items.iter().find_map(first_plausible_array)
        }
        Value::Object(obj) => obj.values().find_map(first_plausible_array),
        _ => None,
    }
}

/// An object with a planet and a start date candidate.
pub fn is_period_like(value: &Value) -> bool {
    value
        .as_object()
        .is_some_and(|o| Field::Planet.lookup(o).is_some() && Field::Start.lookup(o).is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graha::Graha;
    use serde_json::json;

    #[test]
    fn single_record_without_children_stays_unfetched() {
        let rec = json!({"planet": "Su", "startDate": "1980-01-01", "endDate": "1986-01-01"});
        let node = normalize_period(&rec, None, DashaLevel::Mahadasha, 1).unwrap();
        assert_eq!(node.level, DashaLevel::Mahadasha);
        assert_eq!(node.lord, DashaLord::Graha(Graha::Surya));
        assert!(node.children.is_none());
        assert_eq!(node.id.as_str(), "0.1.Su");
    }

    #[test]
    fn empty_children_means_no_subperiods() {
        let rec = json!({"planet": "Sun", "start": "1980-01-01", "end": "1986-01-01", "sub_periods": []});
        let node = normalize_period(&rec, None, DashaLevel::Mahadasha, 1).unwrap();
        assert_eq!(node.children(), Some(&[][..]));
    }

    #[test]
    fn nested_children_get_next_level_and_prefixed_ids() {
        let rec = json!({
            "lord": "Jupiter",
            "start_date": "2021-01-01",
            "end_date": "2037-01-01",
            "antardashas": [
                {"planet": "Ju", "start_date": "2021-01-01", "end_date": "2023-02-01"},
                {"planet": "Sa", "start_date": "2023-02-01", "end_date": "2025-08-01"}
            ]
        });
        let node = normalize_period(&rec, None, DashaLevel::Mahadasha, 7).unwrap();
        let kids = node.children().unwrap();
        assert_eq!(kids.len(), 2);
        assert_eq!(kids[0].level, DashaLevel::Antardasha);
        assert_eq!(kids[1].id.as_str(), "0.7.Ju/1.2.Sa");
        assert!(!node.raw.contains_key("antardashas"));
        assert!(node.raw.contains_key("lord"));
    }

    #[test]
    fn malformed_record_dropped_siblings_kept() {
        let recs = vec![
            json!({"planet": "Su", "startDate": "1980-01-01", "endDate": "1986-01-01"}),
            json!({"planet": "Mo", "startDate": "whenever", "endDate": "1996-01-01"}),
            json!({"planet": "Ma", "startDate": "1996-01-01", "endDate": "2003-01-01"}),
            json!({"startDate": "2003-01-01", "endDate": "2021-01-01"}),
            json!("Ra"),
        ];
        let out = normalize_periods(&recs, None, DashaLevel::Mahadasha);
        assert_eq!(out.nodes.len(), 2);
        assert_eq!(out.errors.len(), 3);
        // order follows raw position, so Mars keeps order 3
        assert_eq!(out.nodes[1].order, 3);
        assert_eq!(out.nodes[1].id.as_str(), "0.3.Ma");
        assert_eq!(out.errors[0].order, 2);
        assert_eq!(out.errors[1].reason, MalformedReason::MissingPlanet);
        assert_eq!(out.errors[2].reason, MalformedReason::NotAnObject);
    }

    #[test]
    fn nested_errors_are_collected() {
        let recs = vec![json!({
            "planet": "Ve", "startDate": "2000-01-01", "endDate": "2020-01-01",
            "subPeriods": [
                {"planet": "Ve", "startDate": "2000-01-01"},
                {"planet": "Su", "startDate": "2003-05-01", "endDate": "2004-05-01"}
            ]
        })];
        let out = normalize_periods(&recs, None, DashaLevel::Mahadasha);
        assert_eq!(out.nodes.len(), 1);
        assert_eq!(out.nodes[0].children().unwrap().len(), 1);
        assert_eq!(out.errors.len(), 1);
        assert_eq!(out.errors[0].level, DashaLevel::Antardasha);
        assert_eq!(out.errors[0].reason, MalformedReason::MissingDate("end"));
    }

    #[test]
    fn unknown_planet_is_tagged_not_rejected() {
        let rec = json!({"planet": "Px", "startDate": "2000-01-01", "endDate": "2001-01-01"});
        let node = normalize_period(&rec, None, DashaLevel::Mahadasha, 1).unwrap();
        assert_eq!(node.lord, DashaLord::Unknown("Px".to_string()));
    }

    #[test]
    fn explicit_cycle_number_read() {
        let rec = json!({"planet": "Mo", "startDate": "2000-01-01", "endDate": "2009-01-01", "cycle_number": 2});
        let node = normalize_period(&rec, None, DashaLevel::Mahadasha, 1).unwrap();
        assert_eq!(node.cycle_number, Some(2));
    }

    #[test]
    fn children_of_prana_rejected() {
        let rec = json!({"planet": "Su", "startDate": "2000-01-01", "endDate": "2000-01-02"});
        let prana = normalize_period(&rec, None, DashaLevel::Prana, 1).unwrap();
        assert_eq!(
            normalize_children(&prana, &[]),
            Err(DashaError::UnsupportedDepth(DashaLevel::Prana))
        );
    }

    #[test]
    fn period_list_known_keys() {
        let body = json!({"status": "ok", "mahadashas": [{"planet": "Su", "start": "1980-01-01"}]});
        assert_eq!(find_period_list(&body).unwrap().len(), 1);

        let wrapped = json!({"data": {"periods": [{"planet": "Su", "start": "1980-01-01"}, {}]}});
        assert_eq!(find_period_list(&wrapped).unwrap().len(), 2);

        let bare = json!([{"planet": "Su"}]);
        assert_eq!(find_period_list(&bare).unwrap().len(), 1);
    }

    #[test]
    fn period_list_empty_known_key_is_found() {
        let body = json!({"periods": []});
        assert_eq!(find_period_list(&body), Some(&[][..]));
    }

    #[test]
    fn period_list_falls_back_to_first_plausible_array() {
        let body = json!({
            "meta": {"tags": ["a", "b"]},
            "payload": {"rows": [{"graha": "Ke", "from": "2073-01-01", "to": "2080-01-01"}]}
        });
        let list = find_period_list(&body).unwrap();
        assert_eq!(list.len(), 1);
        assert!(is_period_like(&list[0]));
    }

    #[test]
    fn no_period_list() {
        let body = json!({"status": "ok", "count": 0});
        assert_eq!(
            normalize_response(&body, None, DashaLevel::Mahadasha),
            Err(DashaError::NoPeriodList)
        );
    }
}
