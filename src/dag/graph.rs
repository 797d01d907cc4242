// src/dag/graph.rs

//! The resolved, cycle-free build graph.
//!
//! Edge direction is `dependency -> dependent`. An edge A→B exists when B
//! lists A in `task_deps`, or when B has a `file_dep` equal to one of A's
//! targets.

use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap, HashMap};
use std::path::{Path, PathBuf};

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use tracing::{debug, warn};

use crate::config::BuildConfig;
use crate::engine::TaskName;
use crate::errors::{BuildError, Result};
use crate::task::TaskDescriptor;

/// Why an edge exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    /// Declared in `task_deps`.
    TaskDep,
    /// Derived from a `file_dep` matching another task's target.
    FileDep,
}

#[derive(Debug, Clone)]
pub struct BuildGraph {
    graph: DiGraph<TaskName, EdgeKind>,
    index: HashMap<TaskName, NodeIndex>,
    tasks: HashMap<TaskName, TaskDescriptor>,
    producers: HashMap<PathBuf, TaskName>,
    order: Vec<TaskName>,
    position: HashMap<TaskName, usize>,
}

impl BuildGraph {
    /// Build and validate the graph from a flat, already-expanded task list.
    pub fn build(tasks: Vec<TaskDescriptor>, config: &BuildConfig) -> Result<Self> {
        let mut graph: DiGraph<TaskName, EdgeKind> = DiGraph::new();
        let mut index = HashMap::new();
        let mut by_name: HashMap<TaskName, TaskDescriptor> = HashMap::new();

        // Insert in name order so node indices (and everything derived from
        // them) do not depend on declaration order.
        let mut tasks = tasks;
        tasks.sort_by(|a, b| a.name.cmp(&b.name));

        for task in tasks {
            if by_name.contains_key(&task.name) {
                return Err(BuildError::DuplicateTask { name: task.name });
            }
            let node = graph.add_node(task.name.clone());
            index.insert(task.name.clone(), node);
            by_name.insert(task.name.clone(), task);
        }

        let mut names: Vec<&TaskName> = by_name.keys().collect();
        names.sort();

        // 1. Explicit task dependencies.
        for name in &names {
            let task = &by_name[*name];
            for dep in &task.task_deps {
                let Some(&from) = index.get(dep) else {
                    return Err(BuildError::MissingDependency {
                        task: task.name.clone(),
                        missing: dep.clone(),
                    });
                };
                graph.update_edge(from, index[*name], EdgeKind::TaskDep);
            }
        }

        // 2. Target ownership.
        let mut producers: HashMap<PathBuf, TaskName> = HashMap::new();
        for name in &names {
            let task = &by_name[*name];
            for target in &task.targets {
                if let Some(first) = producers.get(target) {
                    return Err(BuildError::DuplicateTarget {
                        target: target.clone(),
                        first: first.clone(),
                        second: task.name.clone(),
                    });
                }
                if !config.is_in_output_root(target) {
                    warn!(
                        task = %task.name,
                        target = ?target,
                        "target lies outside the output root"
                    );
                }
                producers.insert(target.clone(), task.name.clone());
            }
        }

        // 3. Implicit edges from file dependencies on other tasks' targets.
        for name in &names {
            let task = &by_name[*name];
            let to = index[*name];
            for dep in &task.file_deps {
                if let Some(producer) = producers.get(dep) {
                    let from = index[producer];
                    if graph.find_edge(from, to).is_none() {
                        debug!(task = %task.name, producer = %producer, file = ?dep, "implicit dependency");
                        graph.add_edge(from, to, EdgeKind::FileDep);
                    }
                }
            }
        }

        // 4. Cycles.
        if let Some(path) = find_cycle(&graph) {
            return Err(BuildError::Cycle { path });
        }

        // 5. Deterministic topological order.
        let order = stable_toposort(&graph);
        let position = order
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();

        Ok(Self {
            graph,
            index,
            tasks: by_name,
            producers,
            order,
            position,
        })
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn task(&self, name: &str) -> Option<&TaskDescriptor> {
        self.tasks.get(name)
    }

    /// All tasks, in topological order.
    pub fn tasks(&self) -> impl Iterator<Item = &TaskDescriptor> {
        self.order.iter().map(|name| &self.tasks[name])
    }

    pub fn topological_order(&self) -> &[TaskName] {
        &self.order
    }

    /// Index of `name` in the topological order.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.position.get(name).copied()
    }

    /// Task that declares `path` as a target.
    pub fn producer_of(&self, path: &Path) -> Option<&str> {
        self.producers.get(path).map(String::as_str)
    }

    /// Immediate dependencies, explicit and implicit, sorted by name.
    pub fn dependencies_of(&self, name: &str) -> Vec<TaskName> {
        self.neighbors(name, Direction::Incoming)
    }

    /// Immediate dependents, explicit and implicit, sorted by name.
    pub fn dependents_of(&self, name: &str) -> Vec<TaskName> {
        self.neighbors(name, Direction::Outgoing)
    }

    /// Kind of the edge `from -> to`, if any.
    pub fn edge_kind(&self, from: &str, to: &str) -> Option<EdgeKind> {
        let (a, b) = (self.index.get(from)?, self.index.get(to)?);
        let edge = self.graph.find_edge(*a, *b)?;
        self.graph.edge_weight(edge).copied()
    }

    /// `roots` plus everything they transitively depend on.
    pub fn upstream_closure(&self, roots: &[&str]) -> Result<BTreeSet<TaskName>> {
        self.closure(roots, Direction::Incoming)
    }

    /// `roots` plus everything that transitively depends on them.
    pub fn downstream_closure(&self, roots: &[&str]) -> Result<BTreeSet<TaskName>> {
        self.closure(roots, Direction::Outgoing)
    }

    fn neighbors(&self, name: &str, dir: Direction) -> Vec<TaskName> {
        let Some(&node) = self.index.get(name) else {
            return Vec::new();
        };
        let mut out: Vec<TaskName> = self
            .graph
            .neighbors_directed(node, dir)
            .map(|n| self.graph[n].clone())
            .collect();
        out.sort();
        out.dedup();
        out
    }

    fn closure(&self, roots: &[&str], dir: Direction) -> Result<BTreeSet<TaskName>> {
        let mut seen = BTreeSet::new();
        let mut stack = Vec::new();
        for root in roots {
            let node = self
                .index
                .get(*root)
                .ok_or_else(|| BuildError::UnknownTask(root.to_string()))?;
            stack.push(*node);
        }

        while let Some(node) = stack.pop() {
            if !seen.insert(self.graph[node].clone()) {
                continue;
            }
            stack.extend(self.graph.neighbors_directed(node, dir));
        }
        Ok(seen)
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Grey,
    Black,
}

/// Depth-first search with recursion-stack colouring. Returns the first
/// cycle found as the ordered list of task names on it.
fn find_cycle(graph: &DiGraph<TaskName, EdgeKind>) -> Option<Vec<TaskName>> {
    let mut color = vec![Color::White; graph.node_count()];
    let mut roots: Vec<NodeIndex> = graph.node_indices().collect();
    roots.sort_by(|a, b| graph[*a].cmp(&graph[*b]));

    for root in roots {
        if color[root.index()] != Color::White {
            continue;
        }
        let mut path = Vec::new();
        if let Some(cycle) = visit(graph, root, &mut color, &mut path) {
            return Some(cycle);
        }
    }
    None
}

fn visit(
    graph: &DiGraph<TaskName, EdgeKind>,
    node: NodeIndex,
    color: &mut [Color],
    path: &mut Vec<NodeIndex>,
) -> Option<Vec<TaskName>> {
    color[node.index()] = Color::Grey;
    path.push(node);

    let mut next: Vec<NodeIndex> = graph.neighbors_directed(node, Direction::Outgoing).collect();
    next.sort_by(|a, b| graph[*a].cmp(&graph[*b]));
    next.dedup();

    for succ in next {
        match color[succ.index()] {
            Color::Grey => {
                let start = path.iter().position(|n| *n == succ).unwrap_or(0);
                return Some(path[start..].iter().map(|n| graph[*n].clone()).collect());
            }
            Color::White => {
                if let Some(cycle) = visit(graph, succ, color, path) {
                    return Some(cycle);
                }
            }
            Color::Black => {}
        }
    }

    path.pop();
    color[node.index()] = Color::Black;
    None
}

/// Kahn's algorithm; among ready tasks the smallest name goes first.
fn stable_toposort(graph: &DiGraph<TaskName, EdgeKind>) -> Vec<TaskName> {
    let mut indegree: Vec<usize> = graph
        .node_indices()
        .map(|n| graph.neighbors_directed(n, Direction::Incoming).count())
        .collect();

    let mut ready: BinaryHeap<Reverse<(&str, usize)>> = graph
        .node_indices()
        .filter(|n| indegree[n.index()] == 0)
        .map(|n| Reverse((graph[n].as_str(), n.index())))
        .collect();

    let mut order = Vec::with_capacity(graph.node_count());
    while let Some(Reverse((name, idx))) = ready.pop() {
        order.push(name.to_string());
        for succ in graph.neighbors_directed(NodeIndex::new(idx), Direction::Outgoing) {
            indegree[succ.index()] -= 1;
            if indegree[succ.index()] == 0 {
                ready.push(Reverse((graph[succ].as_str(), succ.index())));
            }
        }
    }
    order
}
