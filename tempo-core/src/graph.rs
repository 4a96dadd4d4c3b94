//! Dependency graph over a goal's tasks.
//!
//! Edges come from two sources:
//! - the subtask hierarchy (`parent -> child`)
//! - explicit `depends_on` (`dependency -> dependent`)
//!
//! Both together must be acyclic. Cycle detection is an iterative DFS with a
//! three-color mark so adversarial input cannot blow the stack; a cycle is a
//! hard error, never repaired.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};
use tracing::debug;

use crate::error::{Result, ScheduleError};
use crate::task::Task;

/// Default cap on path length (in edges) during traversal.
pub const DEFAULT_MAX_DEPTH: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

#[derive(Debug, Clone)]
pub struct DependencyGraph {
    ids: Vec<String>,
    index: HashMap<String, usize>,
    order_index: Vec<i32>,
    /// Combined edges, sorted by (order_index, id) of the target.
    successors: Vec<Vec<usize>>,
    /// `depends_on` edges only.
    dependencies: Vec<Vec<usize>>,
    dependents: Vec<Vec<usize>>,
}

/// A validated topological order plus each task's topological depth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopoOrder {
    order: Vec<String>,
    depth: HashMap<String, usize>,
}

impl TopoOrder {
    pub fn ids(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Longest path (in edges) from any root to `id`.
    pub fn depth_of(&self, id: &str) -> Option<usize> {
        self.depth.get(id).copied()
    }

    pub fn max_depth(&self) -> usize {
        self.depth.values().copied().max().unwrap_or(0)
    }
}

// Min-heap entry for Kahn's ready set; BinaryHeap is a max-heap so the
// comparison is inverted.
#[derive(Debug)]
struct ReadyEntry<K> {
    key: K,
    node: usize,
}

impl<K: Ord> PartialEq for ReadyEntry<K> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl<K: Ord> Eq for ReadyEntry<K> {}

impl<K: Ord> PartialOrd for ReadyEntry<K> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<K: Ord> Ord for ReadyEntry<K> {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .key
            .cmp(&self.key)
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl DependencyGraph {
    /// Build adjacency from the hierarchy and `depends_on` edges.
    ///
    /// Fails on duplicate ids and on references to tasks not in the list.
    pub fn build(tasks: &[Task]) -> Result<Self> {
        let mut index = HashMap::with_capacity(tasks.len());
        for (i, t) in tasks.iter().enumerate() {
            if index.insert(t.id.clone(), i).is_some() {
                return Err(ScheduleError::DuplicateTask { task: t.id.clone() });
            }
        }

        let n = tasks.len();
        let mut successors = vec![Vec::new(); n];
        let mut dependencies = vec![Vec::new(); n];
        let mut dependents = vec![Vec::new(); n];

        let lookup = |task: &Task, reference: &str| -> Result<usize> {
            index
                .get(reference)
                .copied()
                .ok_or_else(|| ScheduleError::UnknownReference {
                    task: task.id.clone(),
                    reference: reference.to_string(),
                })
        };

        for (i, t) in tasks.iter().enumerate() {
            if let Some(pid) = &t.parent_id {
                let p = lookup(t, pid)?;
                successors[p].push(i);
            }
            for dep in &t.depends_on {
                let d = lookup(t, dep)?;
                dependencies[i].push(d);
                dependents[d].push(i);
                successors[d].push(i);
            }
        }

        let ids: Vec<String> = tasks.iter().map(|t| t.id.clone()).collect();
        let order_index: Vec<i32> = tasks.iter().map(|t| t.order_index).collect();

        for list in successors.iter_mut() {
            list.sort_by(|a, b| (order_index[*a], &ids[*a]).cmp(&(order_index[*b], &ids[*b])));
            list.dedup();
        }

        Ok(Self {
            ids,
            index,
            order_index,
            successors,
            dependencies,
            dependents,
        })
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Tasks `id` lists in `depends_on`.
    pub fn dependencies_of(&self, id: &str) -> Vec<&str> {
        self.index
            .get(id)
            .map(|&i| self.dependencies[i].iter().map(|&d| self.ids[d].as_str()).collect())
            .unwrap_or_default()
    }

    /// Number of tasks blocked by `id` through `depends_on`.
    pub fn fan_out(&self, id: &str) -> usize {
        self.index.get(id).map(|&i| self.dependents[i].len()).unwrap_or(0)
    }

    fn sorted_nodes(&self) -> Vec<usize> {
        let mut nodes: Vec<usize> = (0..self.ids.len()).collect();
        nodes.sort_by(|a, b| (self.order_index[*a], &self.ids[*a]).cmp(&(self.order_index[*b], &self.ids[*b])));
        nodes
    }

    /// Check acyclicity and depth, returning a topological order with ties
    /// broken by `order_index` then id.
    pub fn validate(&self, max_depth: usize) -> Result<TopoOrder> {
        let n = self.ids.len();
        let mut marks = vec![Mark::Unvisited; n];

        let mut indegree = vec![0usize; n];
        for list in &self.successors {
            for &s in list {
                indegree[s] += 1;
            }
        }

        // Roots first; anything left unvisited afterwards sits on a cycle.
        let mut starts = self.sorted_nodes();
        starts.sort_by_key(|&i| indegree[i] != 0);

        for start in starts {
            if marks[start] != Mark::Unvisited {
                continue;
            }
            marks[start] = Mark::InProgress;
            let mut stack: Vec<(usize, usize)> = vec![(start, 0)];

            while let Some(frame) = stack.last_mut() {
                let node = frame.0;
                let Some(&child) = self.successors[node].get(frame.1) else {
                    marks[node] = Mark::Done;
                    stack.pop();
                    continue;
                };
                frame.1 += 1;

                match marks[child] {
                    Mark::Done => {}
                    Mark::InProgress => {
                        return Err(ScheduleError::Cycle {
                            task: self.ids[child].clone(),
                        });
                    }
                    Mark::Unvisited => {
                        // Edges on the path once `child` is pushed.
                        if stack.len() > max_depth {
                            return Err(ScheduleError::DepthExceeded {
                                task: self.ids[child].clone(),
                                limit: max_depth,
                            });
                        }
                        marks[child] = Mark::InProgress;
                        stack.push((child, 0));
                    }
                }
            }
        }

        let order = self.order_by(|id| {
            let i = self.index[id];
            (self.order_index[i], id.to_string())
        });

        // DFS path lengths depend on visit order; the longest path does not.
        let mut depth: HashMap<String, usize> = HashMap::with_capacity(n);
        for id in &order {
            let i = self.index[id];
            let d = depth.get(id).copied().unwrap_or(0);
            if d > max_depth {
                return Err(ScheduleError::DepthExceeded {
                    task: id.clone(),
                    limit: max_depth,
                });
            }
            depth.entry(id.clone()).or_insert(0);
            for &s in &self.successors[i] {
                let e = depth.entry(self.ids[s].clone()).or_insert(0);
                *e = (*e).max(d + 1);
            }
        }

        debug!(tasks = n, max_depth = depth.values().max().copied().unwrap_or(0), "task graph validated");

        Ok(TopoOrder { order, depth })
    }

    /// Kahn's algorithm with ready ties broken by `key` (smallest first).
    ///
    /// The graph must already be validated; nodes on a cycle are left out.
    pub fn order_by<K: Ord>(&self, key: impl Fn(&str) -> K) -> Vec<String> {
        let n = self.ids.len();
        let mut indegree = vec![0usize; n];
        for list in &self.successors {
            for &s in list {
                indegree[s] += 1;
            }
        }

        let mut ready: BinaryHeap<ReadyEntry<K>> = (0..n)
            .filter(|&i| indegree[i] == 0)
            .map(|i| ReadyEntry {
                key: key(&self.ids[i]),
                node: i,
            })
            .collect();

        let mut out = Vec::with_capacity(n);
        while let Some(entry) = ready.pop() {
            out.push(self.ids[entry.node].clone());
            for &s in &self.successors[entry.node] {
                indegree[s] -= 1;
                if indegree[s] == 0 {
                    ready.push(ReadyEntry {
                        key: key(&self.ids[s]),
                        node: s,
                    });
                }
            }
        }
        out
    }
}

/// One row of the nested subtask view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchyEntry {
    pub task_id: String,
    pub title: String,
    pub parent_id: Option<String>,
    /// 0 for top-level tasks.
    pub level: usize,
    /// Ids from the root down to this task.
    pub path: Vec<String>,
}

/// Flatten the parent/child forest in pre-order.
///
/// Tasks whose parent is not in the list are shown as roots. Descent stops at
/// `max_depth` levels.
pub fn task_hierarchy(tasks: &[Task], max_depth: usize) -> Vec<HierarchyEntry> {
    let known: HashSet<&str> = tasks.iter().map(|t| t.id.as_str()).collect();
    let sort_key = |t: &&Task| (t.order_index, t.id.clone());

    let mut children: HashMap<&str, Vec<&Task>> = HashMap::new();
    let mut roots: Vec<&Task> = Vec::new();
    for t in tasks {
        match t.parent_id.as_deref() {
            Some(pid) if known.contains(pid) && pid != t.id => {
                children.entry(pid).or_default().push(t)
            }
            _ => roots.push(t),
        }
    }
    roots.sort_by_key(sort_key);
    for list in children.values_mut() {
        list.sort_by_key(sort_key);
    }

    let mut out = Vec::with_capacity(tasks.len());
    let mut seen: HashSet<&str> = HashSet::new();
    let mut stack: Vec<(&Task, usize, Vec<String>)> = roots
        .into_iter()
        .rev()
        .map(|t| (t, 0, Vec::new()))
        .collect();

    while let Some((task, level, mut path)) = stack.pop() {
        if !seen.insert(task.id.as_str()) {
            continue;
        }
        path.push(task.id.clone());

        if level < max_depth {
            if let Some(kids) = children.get(task.id.as_str()) {
                for kid in kids.iter().rev() {
                    stack.push((*kid, level + 1, path.clone()));
                }
            }
        }

        out.push(HierarchyEntry {
            task_id: task.id.clone(),
            title: task.title.clone(),
            parent_id: task.parent_id.clone().filter(|p| known.contains(p.as_str())),
            level,
            path,
        });
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: &str) -> Task {
        Task::new(id, "g")
    }

    fn chain(len: usize) -> Vec<Task> {
        (0..len)
            .map(|i| {
                let t = task(&format!("t{i:02}"));
                if i == 0 { t } else { t.depending_on(format!("t{:02}", i - 1)) }
            })
            .collect()
    }

    #[test]
    fn dependency_cycle_is_rejected() {
        let tasks = vec![task("a").depending_on("b"), task("b").depending_on("a")];
        let g = DependencyGraph::build(&tasks).unwrap();
        let err = g.validate(DEFAULT_MAX_DEPTH).unwrap_err();
        assert!(matches!(err, ScheduleError::Cycle { .. }));
        assert!(err.is_cycle_like());
    }

    #[test]
    fn self_dependency_and_self_parent_are_cycles() {
        let g = DependencyGraph::build(&[task("a").depending_on("a")]).unwrap();
        assert_eq!(g.validate(10).unwrap_err(), ScheduleError::Cycle { task: "a".into() });

        let g = DependencyGraph::build(&[task("a").with_parent("a")]).unwrap();
        assert_eq!(g.validate(10).unwrap_err(), ScheduleError::Cycle { task: "a".into() });
    }

    #[test]
    fn parent_cycle_is_rejected() {
        let tasks = vec![task("a").with_parent("c"), task("b").with_parent("a"), task("c").with_parent("b")];
        let g = DependencyGraph::build(&tasks).unwrap();
        assert!(matches!(g.validate(10), Err(ScheduleError::Cycle { .. })));
    }

    #[test]
    fn mixed_parent_and_dependency_cycle_is_rejected() {
        // a is b's parent (a before b) while a also waits on b.
        let tasks = vec![task("a").depending_on("b"), task("b").with_parent("a")];
        let g = DependencyGraph::build(&tasks).unwrap();
        assert!(matches!(g.validate(10), Err(ScheduleError::Cycle { .. })));
    }

    #[test]
    fn depth_guard_trips_past_limit() {
        // 11 tasks = 10 edges: fine. 12 tasks = 11 edges: too deep.
        let ok = DependencyGraph::build(&chain(11)).unwrap();
        assert_eq!(ok.validate(10).unwrap().max_depth(), 10);

        let deep = DependencyGraph::build(&chain(12)).unwrap();
        let err = deep.validate(10).unwrap_err();
        assert!(matches!(err, ScheduleError::DepthExceeded { limit: 10, .. }));
        assert!(err.is_cycle_like());

        assert!(deep.validate(20).is_ok());
    }

    #[test]
    fn topo_order_respects_dependencies_over_order_index() {
        let tasks = vec![
            task("b").with_order(0).depending_on("a"),
            task("a").with_order(5),
            task("c").with_order(1),
        ];
        let g = DependencyGraph::build(&tasks).unwrap();
        let order = g.validate(10).unwrap();
        // c (order 1) and a (order 5) are ready first; b waits on a.
        assert_eq!(order.ids(), &["c", "a", "b"]);
        assert_eq!(order.depth_of("b"), Some(1));
        assert_eq!(order.depth_of("c"), Some(0));
    }

    #[test]
    fn ties_fall_back_to_id() {
        let tasks = vec![task("z"), task("m"), task("a")];
        let g = DependencyGraph::build(&tasks).unwrap();
        assert_eq!(g.validate(10).unwrap().ids(), &["a", "m", "z"]);
    }

    #[test]
    fn parent_precedes_children() {
        let tasks = vec![task("child").with_order(0).with_parent("root"), task("root").with_order(9)];
        let g = DependencyGraph::build(&tasks).unwrap();
        assert_eq!(g.validate(10).unwrap().ids(), &["root", "child"]);
    }

    #[test]
    fn order_by_uses_caller_key() {
        let tasks = vec![task("a"), task("b"), task("c").depending_on("a")];
        let g = DependencyGraph::build(&tasks).unwrap();
        // Reverse alphabetical among ready tasks.
        let order = g.order_by(|id| std::cmp::Reverse(id.to_string()));
        assert_eq!(order, vec!["b", "a", "c"]);
    }

    #[test]
    fn unknown_reference_and_duplicates_fail_build() {
        let err = DependencyGraph::build(&[task("a").depending_on("ghost")]).unwrap_err();
        assert_eq!(
            err,
            ScheduleError::UnknownReference { task: "a".into(), reference: "ghost".into() }
        );

        let err = DependencyGraph::build(&[task("a"), task("a")]).unwrap_err();
        assert_eq!(err, ScheduleError::DuplicateTask { task: "a".into() });
    }

    #[test]
    fn fan_out_counts_dependents_only() {
        let tasks = vec![
            task("a"),
            task("b").depending_on("a"),
            task("c").depending_on("a"),
            task("d").with_parent("a"),
        ];
        let g = DependencyGraph::build(&tasks).unwrap();
        assert_eq!(g.fan_out("a"), 2);
        assert_eq!(g.dependencies_of("b"), vec!["a"]);
        assert!(g.dependencies_of("d").is_empty());
    }

    #[test]
    fn hierarchy_is_preorder_with_levels_and_paths() {
        let tasks = vec![
            task("p").with_order(1),
            task("p.2").with_parent("p").with_order(2),
            task("p.1").with_parent("p").with_order(1),
            task("p.1.a").with_parent("p.1"),
            task("q").with_order(2),
            task("orphan").with_parent("missing").with_order(3),
        ];
        let rows = task_hierarchy(&tasks, DEFAULT_MAX_DEPTH);
        let ids: Vec<&str> = rows.iter().map(|r| r.task_id.as_str()).collect();
        assert_eq!(ids, vec!["p", "p.1", "p.1.a", "p.2", "q", "orphan"]);
        assert_eq!(rows[2].level, 2);
        assert_eq!(rows[2].path, vec!["p", "p.1", "p.1.a"]);
        assert_eq!(rows[5].parent_id, None);
    }

    #[test]
    fn hierarchy_stops_at_depth_limit() {
        let tasks = vec![task("a"), task("b").with_parent("a"), task("c").with_parent("b")];
        let rows = task_hierarchy(&tasks, 1);
        let ids: Vec<&str> = rows.iter().map(|r| r.task_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }
}
