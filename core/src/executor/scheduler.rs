use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures::stream::FuturesUnordered;
use futures::StreamExt;
use serde::Serialize;
use tokio::sync::Semaphore;

use crate::error::{EngineError, GraphError};

use super::graph::StackDag;

/// Agents with no dependency on each other; eligible to run concurrently.
pub type Batch = Vec<String>;

/// Ordered batches produced by [`schedule`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExecutionPlan {
    pub batches: Vec<Batch>,
}

impl ExecutionPlan {
    /// Batches concatenated into one valid linear order.
    pub fn topological_order(&self) -> Vec<String> {
        self.batches.iter().flatten().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.batches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    pub fn total_agents(&self) -> usize {
        self.batches.iter().map(Vec::len).sum()
    }

    /// Index of the batch containing `id`.
    pub fn batch_of(&self, id: &str) -> Option<usize> {
        self.batches
            .iter()
            .position(|batch| batch.iter().any(|a| a == id))
    }
}

/// Batched topological sort using Kahn's algorithm
///
/// Returns execution batches where agents in the same batch can run in
/// parallel. Within a batch, agents appear in declaration order.
///
/// # Algorithm
///
/// 1. Calculate in-degree (predecessor count) for all nodes
/// 2. Collect all nodes with in-degree 0 (first batch)
/// 3. Decrement successors of the placed nodes; those reaching 0 form the
///    *next* batch, never the current one
/// 4. Repeat until all nodes processed
///
/// # Time Complexity
///
/// O(V log V + E) where V = number of agents, E = number of input edges
pub fn schedule(dag: &StackDag) -> Result<ExecutionPlan, GraphError> {
    let mut in_degree: HashMap<&str, usize> = dag
        .nodes()
        .map(|n| (n.id.as_str(), n.predecessors.len()))
        .collect();

    let position: HashMap<&str, usize> = dag
        .agent_ids()
        .iter()
        .enumerate()
        .map(|(i, id)| (id.as_str(), i))
        .collect();

    let mut batches: Vec<Batch> = Vec::new();
    let mut current: Vec<&str> = dag.start_nodes().iter().map(String::as_str).collect();
    let mut processed = 0;

    while !current.is_empty() {
        processed += current.len();

        let mut next: Vec<&str> = Vec::new();
        for id in &current {
            let Some(node) = dag.node(id) else {
                continue;
            };
            for succ in &node.successors {
                if let Some(degree) = in_degree.get_mut(succ.as_str()) {
                    *degree = degree.saturating_sub(1);
                    if *degree == 0 {
                        next.push(succ.as_str());
                    }
                }
            }
        }

        // Preserve declaration order
        next.sort_by_key(|id| position.get(id).copied().unwrap_or(usize::MAX));

        batches.push(current.iter().map(|s| s.to_string()).collect());
        current = next;
    }

    if processed != dag.len() {
        let placed: Vec<&String> = batches.iter().flatten().collect();
        let unplaced = dag
            .agent_ids()
            .iter()
            .filter(|id| !placed.contains(id))
            .cloned()
            .collect();
        return Err(GraphError::InternalScheduling { unplaced });
    }

    Ok(ExecutionPlan { batches })
}

/// Execute a single batch of agents in parallel
///
/// # Arguments
///
/// * `agent_ids` - Agents to run in this batch
/// * `max_concurrency` - Maximum number of agents in flight at once
/// * `run_fn` - Async function running a single agent to a terminal status
///
/// Each agent runs on its own tokio task, bounded by a semaphore.
/// Returns once every agent of the batch has finished; this is the barrier
/// between consecutive batches.
pub async fn execute_batch_parallel<F, Fut>(
    agent_ids: &[String],
    max_concurrency: usize,
    run_fn: F,
) -> Result<(), EngineError>
where
    F: Fn(String) -> Fut + Clone + Send + 'static,
    Fut: Future<Output = Result<(), EngineError>> + Send + 'static,
{
    let sem = Arc::new(Semaphore::new(max_concurrency.max(1)));
    let mut futs: FuturesUnordered<_> = FuturesUnordered::new();

    for id in agent_ids {
        let agent_id = id.clone();
        let sem = sem.clone();
        let run = run_fn.clone();

        futs.push(tokio::spawn(async move {
            let _permit = sem
                .acquire_owned()
                .await
                .map_err(|_| EngineError::Internal("semaphore closed unexpectedly".into()))?;

            run(agent_id).await
        }));
    }

    let mut first_err = None;
    while let Some(joined) = futs.next().await {
        // Drain the whole batch even on error so no agent is left mid-flight.
        let res = joined.map_err(|e| EngineError::Internal(format!("agent task aborted: {e}")));
        if let Err(e) = res.and_then(|r| r) {
            first_err.get_or_insert(e);
        }
    }

    match first_err {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::{AgentSpec, StackSpec};
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn agent(id: &str, deps: &[&str]) -> AgentSpec {
        AgentSpec::new(id, "agents/test").with_inputs(deps.iter().copied())
    }

    fn plan(agents: Vec<AgentSpec>) -> ExecutionPlan {
        let dag = StackDag::build(&StackSpec::new("t", agents)).unwrap();
        schedule(&dag).unwrap()
    }

    fn assert_edges_respected(agents: &[AgentSpec], order: &[String]) {
        let pos = |id: &str| order.iter().position(|x| x == id).unwrap();
        for a in agents {
            for dep in &a.input_from {
                assert!(pos(dep) < pos(&a.id), "{dep} must precede {}", a.id);
            }
        }
    }

    #[test]
    fn linear_chain_is_deterministic() {
        let plan = plan(vec![
            agent("agent1", &[]),
            agent("agent2", &["agent1"]),
            agent("agent3", &["agent2"]),
        ]);

        assert_eq!(
            plan.batches,
            vec![vec!["agent1"], vec!["agent2"], vec!["agent3"]]
        );
        assert_eq!(plan.topological_order(), vec!["agent1", "agent2", "agent3"]);
    }

    #[test]
    fn disjoint_chains_share_batches() {
        let plan = plan(vec![
            agent("A", &[]),
            agent("B", &["A"]),
            agent("C", &[]),
            agent("D", &["C"]),
        ]);

        assert_eq!(plan.batches, vec![vec!["A", "C"], vec!["B", "D"]]);
        assert_eq!(plan.batch_of("D"), Some(1));
    }

    #[test]
    fn diamond_joins_after_both_branches() {
        let plan = plan(vec![
            agent("root", &[]),
            agent("right", &["root"]),
            agent("left", &["root"]),
            agent("join", &["left", "right"]),
        ]);

        assert_eq!(
            plan.batches,
            vec![vec!["root"], vec!["right", "left"], vec!["join"]]
        );
    }

    #[test]
    fn no_batch_contains_a_dependency_pair() {
        let agents = vec![
            agent("fetch", &[]),
            agent("parse", &["fetch"]),
            agent("lint", &["fetch"]),
            agent("index", &["parse"]),
            agent("report", &["lint", "index", "fetch"]),
            agent("notify", &["report"]),
            agent("audit", &[]),
            agent("archive", &["audit", "notify"]),
        ];
        let plan = plan(agents.clone());

        assert_eq!(plan.total_agents(), agents.len());
        for batch in &plan.batches {
            for id in batch {
                let spec = agents.iter().find(|a| &a.id == id).unwrap();
                assert!(spec.input_from.iter().all(|d| !batch.contains(d)));
            }
        }
        assert_edges_respected(&agents, &plan.topological_order());
    }

    #[test]
    fn order_is_a_permutation_for_wide_graph() {
        let mut agents = vec![agent("seed", &[])];
        for i in 0..20 {
            let deps: Vec<String> = if i == 0 {
                vec!["seed".into()]
            } else {
                vec![format!("n{}", i - 1), "seed".into()]
            };
            agents.push(AgentSpec::new(format!("n{i}"), "x").with_inputs(deps));
        }
        let order = plan(agents.clone()).topological_order();

        let mut sorted = order.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), agents.len());
        assert_edges_respected(&agents, &order);
    }

    #[test]
    fn empty_graph_has_no_batches() {
        assert!(plan(Vec::new()).is_empty());
    }

    #[tokio::test]
    async fn batch_respects_max_concurrency() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let ids: Vec<String> = (0..6).map(|i| format!("a{i}")).collect();

        let (f, p) = (in_flight.clone(), peak.clone());
        execute_batch_parallel(&ids, 2, move |_id| {
            let (f, p) = (f.clone(), p.clone());
            async move {
                let now = f.fetch_add(1, Ordering::SeqCst) + 1;
                p.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                f.fetch_sub(1, Ordering::SeqCst);
                Ok(())
            }
        })
        .await
        .unwrap();

        assert_eq!(in_flight.load(Ordering::SeqCst), 0);
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn batch_drains_before_reporting_error() {
        let finished = Arc::new(AtomicUsize::new(0));
        let ids: Vec<String> = vec!["bad".into(), "good1".into(), "good2".into()];

        let done = finished.clone();
        let res = execute_batch_parallel(&ids, 3, move |id| {
            let done = done.clone();
            async move {
                if id == "bad" {
                    return Err(EngineError::Internal("boom".into()));
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
                done.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        })
        .await;

        assert!(res.is_err());
        assert_eq!(finished.load(Ordering::SeqCst), 2);
    }
}
