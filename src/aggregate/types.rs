use bson::Bson;

use crate::query::{Filter, SortSpec};

/// Expressions usable as group keys and accumulator inputs.
#[derive(Debug, Clone)]
pub enum Expr {
    /// `"$genre"` — a field path reference.
    Field(String),
    Literal(Bson),
    Concat(Vec<Expr>),
    ToString(Box<Expr>),
    Multiply(Vec<Expr>),
    Divide(Box<Expr>, Box<Expr>),
    Floor(Box<Expr>),
}

#[derive(Debug, Clone)]
pub enum Accumulator {
    Sum(Expr),
    Avg(Expr),
    Min(Expr),
    Max(Expr),
}

/// `$group`: a key expression plus named accumulators, in declaration
/// order.
#[derive(Debug, Clone)]
pub struct GroupSpec {
    pub key: Expr,
    pub fields: Vec<(String, Accumulator)>,
}

#[derive(Debug, Clone)]
pub enum Stage {
    Match(Filter),
    Group(GroupSpec),
    Sort(Vec<SortSpec>),
    Skip(usize),
    Limit(usize),
    Project(Vec<String>),
}

/// An ordered sequence of stages. Order is preserved exactly as parsed.
#[derive(Debug, Clone)]
pub struct Pipeline {
    pub stages: Vec<Stage>,
}
