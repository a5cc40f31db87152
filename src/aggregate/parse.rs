use serde_json::Value;

use crate::errors::DbError;
use crate::query::{filter_from_value, projection_from_value, sort_from_value};
use crate::utils::json::json_to_bson;

use super::types::{Accumulator, Expr, GroupSpec, Pipeline, Stage};

/// Parse a Mongo-shaped pipeline: a JSON array of single-key stage
/// objects, e.g.
/// `[{"$group": {"_id": "$genre", "avgPrice": {"$avg": "$price"}}}]`.
pub fn parse_pipeline_json(json: &str) -> Result<Pipeline, DbError> {
    let v: Value = serde_json::from_str(json)?;
    pipeline_from_value(&v)
}

pub fn pipeline_from_value(v: &Value) -> Result<Pipeline, DbError> {
    let arr = v
        .as_array()
        .ok_or_else(|| DbError::AggregateError("pipeline must be a JSON array".into()))?;
    let stages = arr.iter().map(stage_from_value).collect::<Result<Vec<_>, _>>()?;
    Ok(Pipeline { stages })
}

fn stage_from_value(v: &Value) -> Result<Stage, DbError> {
    let obj = v
        .as_object()
        .ok_or_else(|| DbError::AggregateError("pipeline stage must be an object".into()))?;
    if obj.len() != 1 {
        return Err(DbError::AggregateError("pipeline stage must have exactly one key".into()));
    }
    let (name, body) = obj
        .iter()
        .next()
        .ok_or_else(|| DbError::AggregateError("empty pipeline stage".into()))?;
    match name.as_str() {
        "$match" => Ok(Stage::Match(filter_from_value(body)?)),
        "$group" => Ok(Stage::Group(group_from_value(body)?)),
        "$sort" => Ok(Stage::Sort(sort_from_value(body)?)),
        "$project" => Ok(Stage::Project(projection_from_value(body)?)),
        "$limit" => Ok(Stage::Limit(stage_count(body, "$limit")?)),
        "$skip" => Ok(Stage::Skip(stage_count(body, "$skip")?)),
        other => Err(DbError::AggregateError(format!("unsupported stage: {other}"))),
    }
}

fn stage_count(v: &Value, stage: &str) -> Result<usize, DbError> {
    v.as_u64()
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| DbError::AggregateError(format!("{stage} expects a non-negative integer")))
}

fn group_from_value(v: &Value) -> Result<GroupSpec, DbError> {
    let obj = v
        .as_object()
        .ok_or_else(|| DbError::AggregateError("$group expects an object".into()))?;
    let key = obj
        .get("_id")
        .ok_or_else(|| DbError::AggregateError("$group requires _id".into()))
        .and_then(expr_from_value)?;
    let mut fields = Vec::new();
    for (name, acc) in obj {
        if name == "_id" {
            continue;
        }
        fields.push((name.clone(), accumulator_from_value(acc)?));
    }
    Ok(GroupSpec { key, fields })
}

fn accumulator_from_value(v: &Value) -> Result<Accumulator, DbError> {
    let obj = v
        .as_object()
        .ok_or_else(|| DbError::AggregateError("accumulator must be an object".into()))?;
    if obj.len() != 1 {
        return Err(DbError::AggregateError("accumulator must have exactly one operator".into()));
    }
    let (op, operand) = obj
        .iter()
        .next()
        .ok_or_else(|| DbError::AggregateError("empty accumulator".into()))?;
    let expr = expr_from_value(operand)?;
    match op.as_str() {
        "$sum" => Ok(Accumulator::Sum(expr)),
        "$avg" => Ok(Accumulator::Avg(expr)),
        "$min" => Ok(Accumulator::Min(expr)),
        "$max" => Ok(Accumulator::Max(expr)),
        other => Err(DbError::AggregateError(format!("unsupported accumulator: {other}"))),
    }
}

fn expr_from_value(v: &Value) -> Result<Expr, DbError> {
    match v {
        Value::String(s) if s.starts_with('$') => Ok(Expr::Field(s[1..].to_string())),
        Value::Object(m) if m.len() == 1 && m.keys().all(|k| k.starts_with('$')) => {
            let (op, operand) = m
                .iter()
                .next()
                .ok_or_else(|| DbError::AggregateError("empty expression".into()))?;
            match op.as_str() {
                "$concat" => Ok(Expr::Concat(expr_list(operand, "$concat")?)),
                "$multiply" => Ok(Expr::Multiply(expr_list(operand, "$multiply")?)),
                "$divide" => {
                    let mut parts = expr_list(operand, "$divide")?;
                    if parts.len() != 2 {
                        return Err(DbError::AggregateError(
                            "$divide expects exactly two operands".into(),
                        ));
                    }
                    let right = parts.pop().unwrap_or(Expr::Literal(bson::Bson::Null));
                    let left = parts.pop().unwrap_or(Expr::Literal(bson::Bson::Null));
                    Ok(Expr::Divide(Box::new(left), Box::new(right)))
                }
                "$toString" => Ok(Expr::ToString(Box::new(expr_from_value(operand)?))),
                "$floor" => Ok(Expr::Floor(Box::new(expr_from_value(operand)?))),
                other => Err(DbError::AggregateError(format!("unsupported expression: {other}"))),
            }
        }
        other => Ok(Expr::Literal(json_to_bson(other))),
    }
}

fn expr_list(v: &Value, op: &str) -> Result<Vec<Expr>, DbError> {
    let arr = v
        .as_array()
        .ok_or_else(|| DbError::AggregateError(format!("{op} expects an array of operands")))?;
    arr.iter().map(expr_from_value).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_group_sort_limit() {
        let p = parse_pipeline_json(
            r#"[
              {"$group": {"_id": "$author", "count": {"$sum": 1}}},
              {"$sort": {"count": -1}},
              {"$limit": 1}
            ]"#,
        )
        .unwrap();
        assert_eq!(p.stages.len(), 3);
        assert!(matches!(p.stages[0], Stage::Group(_)));
        assert!(matches!(p.stages[1], Stage::Sort(_)));
        assert!(matches!(p.stages[2], Stage::Limit(1)));
    }

    #[test]
    fn parses_nested_decade_key() {
        let p = parse_pipeline_json(
            r#"[{"$group": {"_id": {"$concat": [
                {"$toString": {"$multiply": [{"$floor": {"$divide": ["$published_year", 10]}}, 10]}},
                "s"
            ]}, "count": {"$sum": 1}}}]"#,
        )
        .unwrap();
        let Stage::Group(g) = &p.stages[0] else { panic!("expected group") };
        assert!(matches!(g.key, Expr::Concat(_)));
        assert_eq!(g.fields.len(), 1);
    }

    #[test]
    fn rejects_multi_key_stage() {
        assert!(parse_pipeline_json(r#"[{"$limit": 1, "$skip": 2}]"#).is_err());
    }

    #[test]
    fn rejects_unknown_stage() {
        assert!(parse_pipeline_json(r#"[{"$lookup": {}}]"#).is_err());
    }
}
