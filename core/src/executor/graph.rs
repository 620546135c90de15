use std::collections::{HashMap, HashSet};

use crate::error::GraphError;
use crate::spec::{AgentSpec, StackSpec};

/// A single agent in the dependency graph.
///
/// Edges point from dependency to dependent: an agent listed in
/// `predecessors` must produce its output before this node can run.
#[derive(Debug, Clone)]
pub struct DagNode {
    pub id: String,
    pub spec: AgentSpec,
    /// Agents this node takes input from, in `input_from` order, deduplicated
    pub predecessors: Vec<String>,
    /// Agents that take input from this node, in declaration order
    pub successors: Vec<String>,
}

/// Immutable agent dependency graph (DAG).
///
/// Never mutated after [`StackDag::build`]; wrap it in an `Arc` to share it
/// across tasks.
#[derive(Debug, Clone)]
pub struct StackDag {
    nodes: HashMap<String, DagNode>,
    /// Declaration order (for stable sorting)
    order: Vec<String>,
    /// Agents without inputs, in declaration order
    start_nodes: Vec<String>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

impl StackDag {
    /// Validate a stack spec and construct its dependency graph.
    ///
    /// # Algorithm
    ///
    /// 1. Reject duplicate ids (in declaration order)
    /// 2. Resolve every `input_from` entry against the id set
    /// 3. Build predecessor/successor adjacency
    /// 4. Three-color DFS for cycle detection
    /// 5. Collect start nodes
    ///
    /// # Time Complexity
    ///
    /// O(V + E) where V = number of agents, E = number of input edges
    pub fn build(spec: &StackSpec) -> Result<Self, GraphError> {
        let mut order: Vec<String> = Vec::with_capacity(spec.agents.len());
        let mut seen: HashSet<&str> = HashSet::with_capacity(spec.agents.len());

        for agent in &spec.agents {
            if !seen.insert(agent.id.as_str()) {
                return Err(GraphError::DuplicateAgentId(agent.id.clone()));
            }
            order.push(agent.id.clone());
        }

        for agent in &spec.agents {
            if let Some(missing) = agent.input_from.iter().find(|d| !seen.contains(d.as_str())) {
                return Err(GraphError::UnknownDependency {
                    agent: agent.id.clone(),
                    missing: missing.clone(),
                });
            }
        }

        let mut nodes: HashMap<String, DagNode> = spec
            .agents
            .iter()
            .map(|agent| {
                let mut predecessors: Vec<String> = Vec::with_capacity(agent.input_from.len());
                for dep in &agent.input_from {
                    if !predecessors.contains(dep) {
                        predecessors.push(dep.clone());
                    }
                }
                let node = DagNode {
                    id: agent.id.clone(),
                    spec: agent.clone(),
                    predecessors,
                    successors: Vec::new(),
                };
                (agent.id.clone(), node)
            })
            .collect();

        // Successors are filled by walking dependents in declaration order so
        // that every adjacency list is deterministic.
        for id in &order {
            let preds = nodes
                .get(id)
                .map(|n| n.predecessors.clone())
                .unwrap_or_default();
            for dep in preds {
                if let Some(dep_node) = nodes.get_mut(&dep) {
                    dep_node.successors.push(id.clone());
                }
            }
        }

        let start_nodes = order
            .iter()
            .filter(|id| nodes.get(*id).is_some_and(|n| n.predecessors.is_empty()))
            .cloned()
            .collect();

        let dag = Self {
            nodes,
            order,
            start_nodes,
        };

        if let Some(path) = dag.detect_cycle() {
            return Err(GraphError::CycleDetected { path });
        }

        Ok(dag)
    }

    pub fn node(&self, id: &str) -> Option<&DagNode> {
        self.nodes.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Agent ids in declaration order.
    pub fn agent_ids(&self) -> &[String] {
        &self.order
    }

    pub fn start_nodes(&self) -> &[String] {
        &self.start_nodes
    }

    /// Nodes in declaration order.
    pub fn nodes(&self) -> impl Iterator<Item = &DagNode> {
        self.order.iter().filter_map(|id| self.nodes.get(id))
    }

    /// A valid linear execution order: for every edge `u -> v`, `u` comes
    /// before `v`.
    pub fn topological_order(&self) -> Result<Vec<String>, GraphError> {
        super::scheduler::schedule(self).map(|plan| plan.topological_order())
    }

    /// Detect cycles with an iterative white/gray/black DFS over successors.
    ///
    /// Returns the cycle as a closed path (`[a, b, a]`) reconstructed from
    /// the traversal stack.
    fn detect_cycle(&self) -> Option<Vec<String>> {
        let mut color: HashMap<&str, Color> =
            self.order.iter().map(|id| (id.as_str(), Color::White)).collect();

        for root in &self.order {
            if color.get(root.as_str()) != Some(&Color::White) {
                continue;
            }

            // (node, index of next successor to visit)
            let mut stack: Vec<(&str, usize)> = vec![(root.as_str(), 0)];
            color.insert(root.as_str(), Color::Gray);

            while let Some((node, next)) = stack.last().copied() {
                let successors = self
                    .nodes
                    .get(node)
                    .map(|n| n.successors.as_slice())
                    .unwrap_or(&[]);

                let Some(succ) = successors.get(next) else {
                    color.insert(node, Color::Black);
                    stack.pop();
                    continue;
                };

                if let Some(top) = stack.last_mut() {
                    top.1 += 1;
                }

                match color.get(succ.as_str()).copied().unwrap_or(Color::White) {
                    Color::White => {
                        color.insert(succ.as_str(), Color::Gray);
                        stack.push((succ.as_str(), 0));
                    }
                    Color::Gray => {
                        // Back edge: the cycle is the stack suffix from `succ`.
                        let pos = stack.iter().position(|(id, _)| *id == succ.as_str())?;
                        let mut path: Vec<String> =
                            stack[pos..].iter().map(|(id, _)| id.to_string()).collect();
                        path.push(succ.clone());
                        return Some(path);
                    }
                    Color::Black => {}
                }
            }
        }

        None
    }
}
