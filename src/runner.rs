use crate::node::{DynOp, LocalFn, MergeFn, Node};
use crate::pipeline::{GraphSnapshot, Pipeline, step_label_of};
use crate::type_token::Partition;
use crate::NodeId;
use anyhow::{Context, Result, anyhow, bail};
use rayon::prelude::*;
use std::sync::Arc;
use tracing::debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecMode {
    Sequential,
    Parallel {
        threads: Option<usize>,
        partitions: Option<usize>,
    },
}

pub struct Runner {
    pub mode: ExecMode,
    pub default_partitions: usize,
}

impl Default for Runner {
    fn default() -> Self {
        Self {
            mode: ExecMode::Parallel {
                threads: None,
                partitions: None,
            },
            default_partitions: 2 * num_cpus::get().max(2),
        }
    }
}

/// One step of a linear plan: id, display label, node.
type Step = (NodeId, String, Node);

impl Runner {
    pub fn new(mode: ExecMode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }

    /// Execute the linear plan ending at `terminal` and materialize its output.
    ///
    /// Any step error aborts the run; the error is returned with the failing
    /// step's label as context and nothing downstream of it executes.
    pub fn run_collect<T: 'static + Send + Sync + Clone>(
        &self,
        p: &Pipeline,
        terminal: NodeId,
    ) -> Result<Vec<T>> {
        let plan = linear_plan(p.snapshot_graph(), terminal)?;
        debug!(
            steps = plan.len(),
            mode = ?self.mode,
            plan = %plan.iter().map(|(_, l, _)| l.as_str()).collect::<Vec<_>>().join(" -> "),
            "executing plan"
        );

        let out = match self.mode {
            ExecMode::Sequential => exec_seq::<T>(plan)?,
            ExecMode::Parallel {
                threads,
                partitions,
            } => {
                let parts = partitions.unwrap_or(self.default_partitions);
                match threads {
                    Some(t) => {
                        let pool = rayon::ThreadPoolBuilder::new()
                            .num_threads(t)
                            .build()
                            .context("build worker pool")?;
                        pool.install(|| exec_parallel::<T>(plan, parts))?
                    }
                    None => exec_parallel::<T>(plan, parts)?,
                }
            }
        };

        #[cfg(feature = "metrics")]
        if let Some(metrics) = p.metrics() {
            metrics.increment_counter("runner.output_elements", out.len() as u64);
        }
        Ok(out)
    }
}

/// Linear backwalk: terminal -> ... -> source, returned source-first.
fn linear_plan(graph: GraphSnapshot, terminal: NodeId) -> Result<Vec<Step>> {
    let GraphSnapshot {
        mut nodes,
        edges,
        labels,
    } = graph;
    let mut chain: Vec<Step> = Vec::new();
    let mut cur = terminal;
    loop {
        let label = step_label_of(&labels, &nodes, cur);
        let n = nodes
            .remove(&cur)
            .ok_or_else(|| anyhow!("missing node {cur:?}"))?;
        chain.push((cur, label, n));
        if let Some((from, _)) = edges.iter().find(|(_, to)| *to == cur).copied() {
            cur = from;
        } else {
            break;
        }
    }
    chain.reverse();
    Ok(chain)
}

fn take_input(buf: &mut Option<Partition>, label: &str) -> Result<Partition> {
    buf.take()
        .ok_or_else(|| anyhow!("step '{label}' has no input"))
}

/// Run fused stateless ops over one partition.
fn run_stateless(ops: &[(String, Arc<dyn DynOp>)], input: Partition) -> Result<Partition> {
    ops.iter().try_fold(input, |acc, (label, op)| {
        op.apply(acc)
            .with_context(|| format!("step '{label}' failed"))
    })
}

fn run_barrier(
    label: &str,
    local: &LocalFn,
    merge: &MergeFn,
    parts: Vec<Partition>,
    parallel: bool,
) -> Result<Partition> {
    let locals: Result<Vec<Partition>> = if parallel {
        parts.into_par_iter().map(|chunk| local(chunk)).collect()
    } else {
        parts.into_iter().map(|chunk| local(chunk)).collect()
    };
    let locals = locals.with_context(|| format!("step '{label}' failed"))?;
    merge(locals).with_context(|| format!("step '{label}' failed"))
}

fn exec_seq<T: 'static + Send + Sync + Clone>(plan: Vec<Step>) -> Result<Vec<T>> {
    let mut buf: Option<Partition> = None;

    for (_id, label, node) in plan {
        buf = Some(match node {
            Node::Source {
                payload,
                vec_ops,
                elem_tag,
            } => vec_ops.clone_any(payload.as_ref()).ok_or_else(|| {
                anyhow!("source '{label}': payload is not a Vec<{}>", elem_tag.name)
            })?,
            Node::Stateless(ops) => {
                let ops: Vec<(String, Arc<dyn DynOp>)> =
                    ops.into_iter().map(|op| (label.clone(), op)).collect();
                run_stateless(&ops, take_input(&mut buf, &label)?)?
            }
            Node::GroupByKey { local, merge } | Node::CombineValues { local, merge } => {
                let input = take_input(&mut buf, &label)?;
                run_barrier(&label, &local, &merge, vec![input], false)?
            }
        });
    }

    let out = buf.ok_or_else(|| anyhow!("empty plan"))?;
    let out_vec = *out
        .downcast::<Vec<T>>()
        .map_err(|_| anyhow!("terminal type mismatch"))?;
    Ok(out_vec)
}

/// Parallel executor: split the source, fuse stateless runs per partition,
/// and treat keyed steps as barriers (local per partition, then merge).
fn exec_parallel<T: 'static + Send + Sync + Clone>(
    plan: Vec<Step>,
    partitions: usize,
) -> Result<Vec<T>> {
    let mut plan = plan.into_iter().peekable();
    let Some((_, src_label, Node::Source {
        payload,
        vec_ops,
        elem_tag,
    })) = plan.next()
    else {
        bail!("plan must start with a Source node");
    };

    let total_len = vec_ops.len(payload.as_ref()).unwrap_or(0);
    let parts = partitions.max(1).min(total_len.max(1));
    let mut current: Vec<Partition> = vec_ops
        .split(payload.as_ref(), parts)
        .ok_or_else(|| anyhow!("source '{src_label}': payload is not a Vec<{}>", elem_tag.name))?;
    debug!(source = %src_label, elements = total_len, partitions = current.len(), "split source");

    while let Some((_, label, node)) = plan.next() {
        match node {
            Node::Stateless(first) => {
                // Collect contiguous stateless nodes and fuse them
                let mut ops: Vec<(String, Arc<dyn DynOp>)> =
                    first.into_iter().map(|op| (label.clone(), op)).collect();
                while let Some((_, next_label, Node::Stateless(_))) = plan.peek() {
                    let next_label = next_label.clone();
                    if let Some((_, _, Node::Stateless(more))) = plan.next() {
                        ops.extend(more.into_iter().map(|op| (next_label.clone(), op)));
                    }
                }
                current = current
                    .into_par_iter()
                    .map(|chunk| run_stateless(&ops, chunk))
                    .collect::<Result<Vec<_>>>()?;
            }
            Node::GroupByKey { local, merge } | Node::CombineValues { local, merge } => {
                let merged = run_barrier(&label, &local, &merge, current, true)?;
                current = vec![merged];
            }
            Node::Source { .. } => bail!("unexpected additional source '{label}' in plan"),
        }
    }

    let mut out = Vec::<T>::new();
    for part in current {
        let v = *part
            .downcast::<Vec<T>>()
            .map_err(|_| anyhow!("terminal type mismatch"))?;
        out.extend(v);
    }
    Ok(out)
}
