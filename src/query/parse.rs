use bson::Bson;
use serde_json::Value;

use crate::errors::DbError;
use crate::utils::json::json_to_bson;

use super::types::{CmpOp, Filter, MAX_IN_SET, Order, SortSpec, UpdateDoc};

/// Parse a Mongo-shaped filter, e.g. `{"genre": "Fiction"}`,
/// `{"published_year": {"$gt": 2000}}`,
/// `{"in_stock": true, "published_year": {"$gt": 2010}}`.
/// Multiple top-level keys combine with an implicit AND.
pub fn parse_filter_json(json: &str) -> Result<Filter, DbError> {
    let v: Value = serde_json::from_str(json)?;
    filter_from_value(&v)
}

pub fn filter_from_value(v: &Value) -> Result<Filter, DbError> {
    let obj = match v {
        Value::Object(m) => m,
        _ => return Err(DbError::QueryError("filter must be a JSON object".into())),
    };
    let mut conjuncts = Vec::with_capacity(obj.len());
    for (key, val) in obj {
        match key.as_str() {
            "$and" => conjuncts.push(Filter::And(parse_filter_array(val, "$and")?)),
            "$or" => conjuncts.push(Filter::Or(parse_filter_array(val, "$or")?)),
            "$not" => conjuncts.push(Filter::Not(Box::new(filter_from_value(val)?))),
            k if k.starts_with('$') => {
                return Err(DbError::QueryError(format!("unsupported operator: {k}")));
            }
            field => conjuncts.push(field_condition(field, val)?),
        }
    }
    Ok(match conjuncts.len() {
        0 => Filter::True,
        1 => conjuncts.remove(0),
        _ => Filter::And(conjuncts),
    })
}

fn parse_filter_array(v: &Value, op: &str) -> Result<Vec<Filter>, DbError> {
    let arr = v
        .as_array()
        .ok_or_else(|| DbError::QueryError(format!("{op} expects an array of filters")))?;
    arr.iter().map(filter_from_value).collect()
}

fn field_condition(field: &str, val: &Value) -> Result<Filter, DbError> {
    // An object whose keys are all operators is a condition document;
    // anything else (including plain objects) is an equality literal.
    if let Value::Object(m) = val
        && !m.is_empty()
        && m.keys().all(|k| k.starts_with('$'))
    {
        let mut ops = Vec::with_capacity(m.len());
        for (op, operand) in m {
            ops.push(operator_condition(field, op, operand)?);
        }
        return Ok(if ops.len() == 1 { ops.remove(0) } else { Filter::And(ops) });
    }
    Ok(Filter::Cmp { path: field.to_string(), op: CmpOp::Eq, value: json_to_bson(val) })
}

fn operator_condition(field: &str, op: &str, operand: &Value) -> Result<Filter, DbError> {
    let path = field.to_string();
    let cmp = |o: CmpOp| Filter::Cmp { path: path.clone(), op: o, value: json_to_bson(operand) };
    Ok(match op {
        "$eq" => cmp(CmpOp::Eq),
        "$gt" => cmp(CmpOp::Gt),
        "$gte" => cmp(CmpOp::Gte),
        "$lt" => cmp(CmpOp::Lt),
        "$lte" => cmp(CmpOp::Lte),
        "$ne" => Filter::Not(Box::new(cmp(CmpOp::Eq))),
        "$exists" => Filter::Exists {
            path,
            exists: operand
                .as_bool()
                .ok_or_else(|| DbError::QueryError("$exists expects a boolean".into()))?,
        },
        "$in" => Filter::In { path, values: bson_set(operand, "$in")? },
        "$nin" => Filter::Nin { path, values: bson_set(operand, "$nin")? },
        #[cfg(feature = "regex")]
        "$regex" => Filter::Regex {
            path,
            pattern: operand
                .as_str()
                .ok_or_else(|| DbError::QueryError("$regex expects a string".into()))?
                .to_string(),
            case_insensitive: false,
        },
        other => return Err(DbError::QueryError(format!("unsupported operator: {other}"))),
    })
}

fn bson_set(v: &Value, op: &str) -> Result<Vec<Bson>, DbError> {
    let arr =
        v.as_array().ok_or_else(|| DbError::QueryError(format!("{op} expects an array")))?;
    Ok(arr.iter().take(MAX_IN_SET).map(json_to_bson).collect())
}

/// Parse a Mongo-shaped update, e.g. `{"$set": {"price": 15.99}}`.
/// `$unset` accepts either the Mongo `{field: ""}` form or a plain array
/// of field names.
pub fn parse_update_json(json: &str) -> Result<UpdateDoc, DbError> {
    let v: Value = serde_json::from_str(json)?;
    update_from_value(&v)
}

pub fn update_from_value(v: &Value) -> Result<UpdateDoc, DbError> {
    let obj = match v {
        Value::Object(m) => m,
        _ => return Err(DbError::QueryError("update must be a JSON object".into())),
    };
    let mut out = UpdateDoc::default();
    for (key, val) in obj {
        match key.as_str() {
            "$set" => {
                let m = val
                    .as_object()
                    .ok_or_else(|| DbError::QueryError("$set expects an object".into()))?;
                for (k, v) in m {
                    out.set.push((k.clone(), json_to_bson(v)));
                }
            }
            "$inc" => {
                let m = val
                    .as_object()
                    .ok_or_else(|| DbError::QueryError("$inc expects an object".into()))?;
                for (k, v) in m {
                    let by = v
                        .as_f64()
                        .ok_or_else(|| DbError::QueryError("$inc requires numeric".into()))?;
                    out.inc.push((k.clone(), by));
                }
            }
            "$unset" => match val {
                Value::Object(m) => out.unset.extend(m.keys().cloned()),
                Value::Array(a) => {
                    for item in a {
                        let s = item.as_str().ok_or_else(|| {
                            DbError::QueryError("$unset array expects field names".into())
                        })?;
                        out.unset.push(s.to_string());
                    }
                }
                _ => return Err(DbError::QueryError("$unset expects object or array".into())),
            },
            other => return Err(DbError::QueryError(format!("unsupported update op: {other}"))),
        }
    }
    if out.set.is_empty() && out.inc.is_empty() && out.unset.is_empty() {
        return Err(DbError::QueryError("empty update document".into()));
    }
    Ok(out)
}

/// Parse a Mongo-shaped sort document: `{"price": 1}`, `{"count": -1}`.
pub fn sort_from_value(v: &Value) -> Result<Vec<SortSpec>, DbError> {
    let obj = match v {
        Value::Object(m) => m,
        _ => return Err(DbError::QueryError("sort must be a JSON object".into())),
    };
    let mut out = Vec::with_capacity(obj.len());
    for (field, dir) in obj {
        let order = match dir.as_i64() {
            Some(1) => Order::Asc,
            Some(-1) => Order::Desc,
            _ => {
                return Err(DbError::QueryError(format!(
                    "sort direction for {field} must be 1 or -1"
                )));
            }
        };
        out.push(SortSpec { field: field.clone(), order });
    }
    Ok(out)
}

pub fn parse_sort_json(json: &str) -> Result<Vec<SortSpec>, DbError> {
    let v: Value = serde_json::from_str(json)?;
    sort_from_value(&v)
}

/// Parse a projection document: `{"title": 1, "author": 1, "price": 1,
/// "_id": 0}`. Only include-lists are supported; `_id` is the lone field
/// that may be excluded (and is excluded by default, since the document
/// id lives outside the payload).
pub fn projection_from_value(v: &Value) -> Result<Vec<String>, DbError> {
    let obj = match v {
        Value::Object(m) => m,
        _ => return Err(DbError::QueryError("projection must be a JSON object".into())),
    };
    let mut fields = Vec::with_capacity(obj.len());
    for (field, flag) in obj {
        match (field.as_str(), flag.as_i64()) {
            ("_id", Some(0 | 1)) => {}
            (_, Some(1)) => fields.push(field.clone()),
            (_, Some(0)) => {
                return Err(DbError::QueryError(format!(
                    "exclusion projection is not supported: {field}"
                )));
            }
            _ => {
                return Err(DbError::QueryError(format!(
                    "projection flag for {field} must be 0 or 1"
                )));
            }
        }
    }
    Ok(fields)
}

pub fn parse_projection_json(json: &str) -> Result<Vec<String>, DbError> {
    let v: Value = serde_json::from_str(json)?;
    projection_from_value(&v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_value_is_equality() {
        let f = parse_filter_json(r#"{"genre": "Fiction"}"#).unwrap();
        assert!(matches!(f, Filter::Cmp { path, op: CmpOp::Eq, .. } if path == "genre"));
    }

    #[test]
    fn operator_object_and_implicit_and() {
        let f =
            parse_filter_json(r#"{"in_stock": true, "published_year": {"$gt": 2010}}"#).unwrap();
        match f {
            Filter::And(fs) => assert_eq!(fs.len(), 2),
            other => panic!("expected And, got {other:?}"),
        }
    }

    #[test]
    fn empty_filter_matches_everything() {
        assert!(matches!(parse_filter_json("{}").unwrap(), Filter::True));
    }

    #[test]
    fn ne_becomes_negated_eq() {
        let f = parse_filter_json(r#"{"genre": {"$ne": "Fiction"}}"#).unwrap();
        assert!(matches!(f, Filter::Not(_)));
    }

    #[test]
    fn unknown_operator_is_rejected() {
        assert!(parse_filter_json(r#"{"price": {"$near": 1}}"#).is_err());
    }

    #[test]
    fn update_set_parses() {
        let u = parse_update_json(r#"{"$set": {"price": 15.99}}"#).unwrap();
        assert_eq!(u.set.len(), 1);
        assert_eq!(u.set[0].0, "price");
    }

    #[test]
    fn empty_update_is_rejected() {
        assert!(parse_update_json("{}").is_err());
    }

    #[test]
    fn sort_directions() {
        let s = parse_sort_json(r#"{"price": 1}"#).unwrap();
        assert!(matches!(s[0].order, Order::Asc));
        let s = parse_sort_json(r#"{"price": -1}"#).unwrap();
        assert!(matches!(s[0].order, Order::Desc));
        assert!(parse_sort_json(r#"{"price": 2}"#).is_err());
    }

    #[test]
    fn projection_accepts_id_zero() {
        let p =
            parse_projection_json(r#"{"title": 1, "author": 1, "price": 1, "_id": 0}"#).unwrap();
        assert_eq!(p.len(), 3);
        assert!(parse_projection_json(r#"{"genre": 0}"#).is_err());
    }
}
