use bson::Bson;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

use crate::collection::Collection;
use crate::index::{IndexImpl, key_from_bson};
use crate::types::DocumentId;

use super::exec::run_find;
use super::types::{CmpOp, Filter, FindOptions};

/// Outcome of planning: either a candidate id set narrowed by an index,
/// or a full collection scan.
pub(crate) struct Plan {
    pub candidates: Option<Vec<DocumentId>>,
    pub index_name: Option<String>,
    pub keys_examined: usize,
}

impl Plan {
    fn coll_scan() -> Self {
        Self { candidates: None, index_name: None, keys_examined: 0 }
    }
}

#[derive(Debug, Default)]
struct RangeBound {
    min: Option<(Bson, bool)>,
    max: Option<(Bson, bool)>,
}

/// Walk AND-conjuncts collecting per-field equality values and range
/// bounds. OR/NOT subtrees contribute nothing; the surviving filter is
/// re-evaluated over the candidates anyway, so the index only has to
/// produce a superset.
fn gather_constraints(
    filter: &Filter,
    eqs: &mut HashMap<String, Bson>,
    ranges: &mut HashMap<String, RangeBound>,
) {
    match filter {
        Filter::Cmp { path, op, value } => match op {
            CmpOp::Eq => {
                eqs.entry(path.clone()).or_insert_with(|| value.clone());
            }
            CmpOp::Gt => {
                ranges.entry(path.clone()).or_default().min = Some((value.clone(), false));
            }
            CmpOp::Gte => {
                ranges.entry(path.clone()).or_default().min = Some((value.clone(), true));
            }
            CmpOp::Lt => {
                ranges.entry(path.clone()).or_default().max = Some((value.clone(), false));
            }
            CmpOp::Lte => {
                ranges.entry(path.clone()).or_default().max = Some((value.clone(), true));
            }
        },
        Filter::And(fs) => {
            for f in fs {
                gather_constraints(f, eqs, ranges);
            }
        }
        _ => {}
    }
}

/// Pick an index for the filter: full equality coverage of a compound
/// (or single) spec wins, then a single-field btree range. Indexes are
/// tried in name order for determinism.
pub(crate) fn choose_plan(col: &Arc<Collection>, filter: &Filter) -> Plan {
    let mut eqs = HashMap::new();
    let mut ranges = HashMap::new();
    gather_constraints(filter, &mut eqs, &mut ranges);
    if eqs.is_empty() && ranges.is_empty() {
        return Plan::coll_scan();
    }

    let mut mgr = col.indexes.write();
    let mut names: Vec<String> = mgr.indexes.keys().cloned().collect();
    names.sort();

    for name in &names {
        let Some(idx) = mgr.indexes.get_mut(name) else { continue };
        let spec = idx.spec().clone();
        let full_eq: Option<Vec<Bson>> =
            spec.fields.iter().map(|(f, _)| eqs.get(f).cloned()).collect();
        if let Some(values) = full_eq {
            if values.iter().any(|v| key_from_bson(v).is_none()) {
                continue;
            }
            let ids = idx.lookup_eq(&values).unwrap_or_default();
            let keys = ids.len();
            return Plan {
                candidates: Some(ids),
                index_name: Some(name.clone()),
                keys_examined: keys,
            };
        }
    }

    for name in &names {
        let Some(IndexImpl::BTree(btree)) = mgr.indexes.get_mut(name) else { continue };
        if btree.spec.fields.len() != 1 {
            continue;
        }
        let field = btree.spec.first_field().to_string();
        let Some(bound) = ranges.get(&field) else { continue };
        let ids = btree
            .lookup_range(
                bound.min.as_ref().map(|(v, _)| v),
                bound.max.as_ref().map(|(v, _)| v),
                bound.min.as_ref().is_some_and(|(_, incl)| *incl),
                bound.max.as_ref().is_some_and(|(_, incl)| *incl),
            )
            .unwrap_or_default();
        let keys = ids.len();
        return Plan { candidates: Some(ids), index_name: Some(name.clone()), keys_examined: keys };
    }

    Plan::coll_scan()
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryPlanner {
    pub namespace: String,
    pub winning_plan: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionStats {
    pub n_returned: usize,
    pub total_keys_examined: usize,
    pub total_docs_examined: usize,
    pub execution_time_millis: u128,
}

/// Report in the familiar `explain("executionStats")` shape, serialized
/// camelCase.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplainReport {
    pub query_planner: QueryPlanner,
    pub execution_stats: ExecutionStats,
}

/// Execute the query and report the winning plan plus execution stats.
pub fn explain(col: &Arc<Collection>, filter: &Filter, opts: &FindOptions) -> ExplainReport {
    let start = std::time::Instant::now();
    let (docs, stats) = run_find(col, filter, opts);
    let winning_plan =
        if stats.index_name.is_some() { "IXSCAN".to_string() } else { "COLLSCAN".to_string() };
    ExplainReport {
        query_planner: QueryPlanner {
            namespace: col.name_str(),
            winning_plan,
            index_name: stats.index_name,
        },
        execution_stats: ExecutionStats {
            n_returned: docs.len(),
            total_keys_examined: stats.keys_examined,
            total_docs_examined: stats.docs_examined,
            execution_time_millis: start.elapsed().as_millis(),
        },
    }
}
