// Submodules for separation of concerns
mod cursor;
mod eval;
mod exec;
mod parse;
mod plan;
mod types;

pub(crate) use eval::get_path;

pub use cursor::Cursor;
pub use eval::{bson_eq, compare_bson, compare_docs, eval_filter, project_fields};
pub use exec::{
    apply_update, count_docs, delete_many, delete_one, find_docs, update_many, update_one,
};
pub use parse::{
    filter_from_value, parse_filter_json, parse_projection_json, parse_sort_json,
    parse_update_json, projection_from_value, sort_from_value, update_from_value,
};
pub use plan::{ExecutionStats, ExplainReport, QueryPlanner, explain};
pub use types::{
    CmpOp, DeleteReport, Filter, FindOptions, Order, SortSpec, UpdateDoc, UpdateReport,
};
