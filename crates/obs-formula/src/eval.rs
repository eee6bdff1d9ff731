use std::collections::HashMap;

use obs_ranker::{apply_facet_filter, Ranker};
use obs_store::keys::series_keys;
use obs_store::payload::{Decoder, Payload};
use obs_store::reader::StoreGroup;
use obs_types::{Date, Entity, FacetFilterSpec, ObsError, Point, RequestContext, SourceSeries, Variable};
use tracing::instrument;

use crate::align::align_nodes;
use crate::ast::{Expr, Op};
use crate::node::parse_node_name;
use crate::parser::parse;
use crate::token::{decode_node_token, encode_formula};

/// Parses, extracts, aligns, and evaluates arithmetic formulas over
/// ranked observations for a single entity (spec §4.7).
pub struct FormulaEngine<'a> {
    ranker: &'a Ranker,
}

impl<'a> FormulaEngine<'a> {
    pub fn new(ranker: &'a Ranker) -> Self {
        Self { ranker }
    }

    /// Evaluates `formula` for `entity`, returning its derived series in
    /// the left operand's date order (spec §6 `derivedSeries`, §8
    /// invariant 7).
    #[instrument(skip(self, ctx, store, decode), fields(entity = entity.as_str()))]
    pub async fn derived_series(
        &self,
        ctx: &RequestContext,
        store: &StoreGroup,
        entity: &Entity,
        formula: &str,
        decode: Decoder,
    ) -> Result<Vec<Point>, ObsError> {
        ctx.check()?;

        let encoded = encode_formula(formula);
        let expr = parse(&encoded)?;
        let expr = expr.map_nodes(&|token| decode_node_token(token));

        let mut names = Vec::new();
        expr.node_names(&mut names);
        names.sort();
        names.dedup();

        let mut nodes: HashMap<String, (Variable, FacetFilterSpec)> = HashMap::with_capacity(names.len());
        for name in &names {
            nodes.insert(name.clone(), parse_node_name(name)?);
        }

        let mut variable_strs: Vec<&str> = nodes.values().map(|(v, _)| v.as_str()).collect();
        variable_strs.sort_unstable();
        variable_strs.dedup();
        let keys = series_keys(&[entity.as_str()], &variable_strs);
        let table_rows = store.read(ctx, keys, decode).await?;

        let mut candidates: HashMap<String, Vec<SourceSeries>> = HashMap::with_capacity(nodes.len());
        for (name, (variable, filter)) in &nodes {
            let mut all_series = Vec::new();
            for table in &table_rows {
                for (key, payload) in &table.rows {
                    if key.parts.get(1).map(String::as_str) != Some(variable.as_str()) {
                        continue;
                    }
                    if let Payload::Series(ts) = payload {
                        all_series.extend(ts.source_series.iter().cloned());
                    }
                }
            }
            candidates.insert(name.clone(), apply_facet_filter(&all_series, filter));
        }

        let winners = align_nodes(candidates, self.ranker)?;
        let points = eval_expr(&expr, &winners)?;
        Ok(points.into_iter().map(|(date, value)| Point { date, value }).collect())
    }
}

/// Walks the tree, combining aligned leaf series pointwise under each
/// operator. Leaves are already restricted to the longest common date
/// signature, so both sides of a `BinOp` carry identical dates in the
/// same order at every level of the recursion.
fn eval_expr(expr: &Expr, winners: &HashMap<String, SourceSeries>) -> Result<Vec<(Date, f64)>, ObsError> {
    match expr {
        Expr::Node(name) => {
            let series = winners.get(name).ok_or_else(|| {
                ObsError::internal(format!("formula node '{name}' has no aligned series"))
            })?;
            Ok(series.values.iter().map(|(d, v)| (d.clone(), *v)).collect())
        }
        Expr::BinOp(op, lhs, rhs) => {
            let left = eval_expr(lhs, winners)?;
            let right = eval_expr(rhs, winners)?;
            left.iter()
                .zip(right.iter())
                .map(|((date, l), (_, r))| {
                    let value = match op {
                        Op::Add => l + r,
                        Op::Sub => l - r,
                        Op::Mul => l * r,
                        Op::Div => {
                            if *r == 0.0 {
                                return Err(ObsError::computation_error("division by zero in formula"));
                            }
                            l / r
                        }
                    };
                    Ok((date.clone(), value))
                })
                .collect()
        }
    }
}
