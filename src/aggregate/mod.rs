mod exec;
mod parse;
mod types;

pub use exec::run_pipeline;
pub use parse::{parse_pipeline_json, pipeline_from_value};
pub use types::{Accumulator, Expr, GroupSpec, Pipeline, Stage};
