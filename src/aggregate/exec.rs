use bson::{Bson, Document as BsonDocument, doc};
use ordered_float::OrderedFloat;
use std::collections::HashMap;
use std::sync::Arc;

use crate::collection::Collection;
use crate::errors::DbError;
use crate::query::{compare_bson, compare_docs, eval_filter, get_path, project_fields};

use super::types::{Accumulator, Expr, GroupSpec, Pipeline, Stage};

/// Run a pipeline over a collection's payloads.
pub fn run_pipeline(col: &Arc<Collection>, pipeline: &Pipeline) -> Result<Vec<BsonDocument>, DbError> {
    let start = std::time::Instant::now();
    let docs: Vec<BsonDocument> =
        col.all_documents().into_iter().map(|d| d.data.0).collect();
    let input = docs.len();
    let out = execute(docs, &pipeline.stages)?;
    log::debug!(
        "aggregate collection={} stages={} input={input} output={} duration_ms={}",
        col.name_str(),
        pipeline.stages.len(),
        out.len(),
        start.elapsed().as_millis()
    );
    Ok(out)
}

pub(crate) fn execute(
    mut docs: Vec<BsonDocument>,
    stages: &[Stage],
) -> Result<Vec<BsonDocument>, DbError> {
    for stage in stages {
        docs = match stage {
            Stage::Match(filter) => docs.into_iter().filter(|d| eval_filter(d, filter)).collect(),
            Stage::Group(spec) => run_group(&docs, spec),
            Stage::Sort(sort) => {
                let mut d = docs;
                d.sort_by(|a, b| compare_docs(a, b, sort));
                d
            }
            Stage::Skip(n) => docs.into_iter().skip(*n).collect(),
            Stage::Limit(n) => docs.into_iter().take(*n).collect(),
            Stage::Project(fields) => docs.iter().map(|d| project_fields(d, fields)).collect(),
        };
    }
    Ok(docs)
}

/// Hashable stand-in for a group key value. Numerics collapse so a key
/// computed as `Double(1980.0)` and one stored as `Int32(1980)` group
/// together.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum GroupKey {
    Null,
    Bool(bool),
    Num(OrderedFloat<f64>),
    Str(String),
}

fn group_key(v: &Bson) -> GroupKey {
    match v {
        Bson::Boolean(b) => GroupKey::Bool(*b),
        Bson::Int32(i) => GroupKey::Num(OrderedFloat(f64::from(*i))),
        Bson::Int64(i) => GroupKey::Num(OrderedFloat(*i as f64)),
        Bson::Double(f) => GroupKey::Num(OrderedFloat(*f)),
        Bson::String(s) => GroupKey::Str(s.clone()),
        _ => GroupKey::Null,
    }
}

#[derive(Debug, Clone)]
enum AccState {
    Sum { total: f64, ints_only: bool },
    Avg { total: f64, n: u64 },
    Min { cur: Option<Bson> },
    Max { cur: Option<Bson> },
}

impl AccState {
    fn new(acc: &Accumulator) -> Self {
        match acc {
            Accumulator::Sum(_) => Self::Sum { total: 0.0, ints_only: true },
            Accumulator::Avg(_) => Self::Avg { total: 0.0, n: 0 },
            Accumulator::Min(_) => Self::Min { cur: None },
            Accumulator::Max(_) => Self::Max { cur: None },
        }
    }

    fn expr<'a>(acc: &'a Accumulator) -> &'a Expr {
        match acc {
            Accumulator::Sum(e) | Accumulator::Avg(e) | Accumulator::Min(e)
            | Accumulator::Max(e) => e,
        }
    }

    /// Fold one value in. Non-numeric inputs are ignored by `$sum` and
    /// `$avg`, nulls by `$min`/`$max`.
    fn update(&mut self, value: &Bson) {
        match self {
            Self::Sum { total, ints_only } => {
                match value {
                    Bson::Int32(i) => *total += f64::from(*i),
                    Bson::Int64(i) => *total += *i as f64,
                    Bson::Double(f) => {
                        *total += f;
                        *ints_only = false;
                    }
                    _ => {}
                }
            }
            Self::Avg { total, n } => {
                if let Some(f) = numeric(value) {
                    *total += f;
                    *n += 1;
                }
            }
            Self::Min { cur } => {
                if !matches!(value, Bson::Null)
                    && cur.as_ref().is_none_or(|c| compare_bson(value, c).is_lt())
                {
                    *cur = Some(value.clone());
                }
            }
            Self::Max { cur } => {
                if !matches!(value, Bson::Null)
                    && cur.as_ref().is_none_or(|c| compare_bson(value, c).is_gt())
                {
                    *cur = Some(value.clone());
                }
            }
        }
    }

    fn finalize(self) -> Bson {
        match self {
            Self::Sum { total, ints_only } => {
                if ints_only && total.fract() == 0.0 && total.abs() < 9.0e15 {
                    Bson::Int64(total as i64)
                } else {
                    Bson::Double(total)
                }
            }
            Self::Avg { total, n } => {
                if n == 0 {
                    Bson::Null
                } else {
                    Bson::Double(total / n as f64)
                }
            }
            Self::Min { cur } | Self::Max { cur } => cur.unwrap_or(Bson::Null),
        }
    }
}

struct GroupState {
    key_bson: Bson,
    accs: Vec<AccState>,
}

fn run_group(docs: &[BsonDocument], spec: &GroupSpec) -> Vec<BsonDocument> {
    let mut groups: HashMap<GroupKey, GroupState> = HashMap::new();
    let mut order: Vec<GroupKey> = Vec::new();

    for d in docs {
        let key_bson = eval_expr(d, &spec.key);
        let key = group_key(&key_bson);
        let state = groups.entry(key.clone()).or_insert_with(|| {
            order.push(key.clone());
            GroupState {
                key_bson: key_bson.clone(),
                accs: spec.fields.iter().map(|(_, a)| AccState::new(a)).collect(),
            }
        });
        for (slot, (_, acc)) in state.accs.iter_mut().zip(&spec.fields) {
            slot.update(&eval_expr(d, AccState::expr(acc)));
        }
    }

    order
        .into_iter()
        .filter_map(|k| groups.remove(&k))
        .map(|state| {
            let mut out = doc! {"_id": state.key_bson};
            for ((name, _), acc) in spec.fields.iter().zip(state.accs) {
                out.insert(name.clone(), acc.finalize());
            }
            out
        })
        .collect()
}

fn numeric(v: &Bson) -> Option<f64> {
    match v {
        Bson::Int32(i) => Some(f64::from(*i)),
        Bson::Int64(i) => Some(*i as f64),
        Bson::Double(f) => Some(*f),
        _ => None,
    }
}

pub(crate) fn eval_expr(doc: &BsonDocument, expr: &Expr) -> Bson {
    match expr {
        Expr::Field(path) => get_path(doc, path).cloned().unwrap_or(Bson::Null),
        Expr::Literal(v) => v.clone(),
        Expr::Concat(parts) => {
            let mut out = String::new();
            for p in parts {
                match eval_expr(doc, p) {
                    Bson::String(s) => out.push_str(&s),
                    // Null (or any non-string) poisons the whole concat
                    _ => return Bson::Null,
                }
            }
            Bson::String(out)
        }
        Expr::ToString(inner) => match eval_expr(doc, inner) {
            Bson::Null => Bson::Null,
            Bson::String(s) => Bson::String(s),
            Bson::Boolean(b) => Bson::String(b.to_string()),
            Bson::Int32(i) => Bson::String(i.to_string()),
            Bson::Int64(i) => Bson::String(i.to_string()),
            Bson::Double(f) => Bson::String(double_to_string(f)),
            other => Bson::String(other.to_string()),
        },
        Expr::Multiply(parts) => {
            let mut product = 1.0;
            for p in parts {
                match numeric(&eval_expr(doc, p)) {
                    Some(f) => product *= f,
                    None => return Bson::Null,
                }
            }
            Bson::Double(product)
        }
        Expr::Divide(a, b) => {
            match (numeric(&eval_expr(doc, a)), numeric(&eval_expr(doc, b))) {
                (Some(x), Some(y)) if y != 0.0 => Bson::Double(x / y),
                _ => Bson::Null,
            }
        }
        Expr::Floor(inner) => match numeric(&eval_expr(doc, inner)) {
            Some(f) => Bson::Double(f.floor()),
            None => Bson::Null,
        },
    }
}

/// `$toString` of an integral double prints without a fractional part
/// (`1980.0` becomes `"1980"`).
fn double_to_string(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 9.0e15 {
        format!("{}", f as i64)
    } else {
        format!("{f}")
    }
}
