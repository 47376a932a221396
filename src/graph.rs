use crate::error::{InvariantError, Warning};
use nohash_hasher::IntSet;

/// One adjacency entry: the incident edge and the vertex on its far side.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct EdgeTarget {
    edge: usize,
    target: usize,
}

impl EdgeTarget {
    pub fn new(edge: usize, target: usize) -> EdgeTarget {
        EdgeTarget { edge, target }
    }

    pub fn edge(&self) -> usize {
        self.edge
    }

    pub fn target(&self) -> usize {
        self.target
    }
}

#[derive(Debug, Default, Clone)]
struct Vertex {
    targets: Vec<EdgeTarget>,
    removed: bool,
}

/// An unordered connection between two vertices.
///
/// The endpoint order only matters to consumers that render wedge bonds;
/// `swap_ends` lets the layout engine pick which endpoint is the origin.
#[derive(Debug, Clone)]
pub struct Edge {
    ends: [usize; 2],
    disconnected: bool,
    removed: bool,
}

impl Edge {
    pub fn ends(&self) -> [usize; 2] {
        self.ends
    }

    pub fn other_end(&self, vertex: usize) -> usize {
        if self.ends[0] == vertex {
            self.ends[1]
        } else {
            self.ends[0]
        }
    }

    pub fn is_disconnected(&self) -> bool {
        self.disconnected
    }
}

/// Arena-backed undirected graph with temporary edge disconnection.
///
/// Vertices and edges are identified by their index into the owning arena;
/// removal tombstones a slot instead of shifting indices. An edge can be
/// flagged "disconnected" to probe a subgraph without copying the graph:
/// flagged edges are skipped by every degree, neighbor and traversal query
/// until reconnected. Derived results (the ring cache) are invalidated on
/// every topology change through the single `mutated` entry point.
#[derive(Debug, Default, Clone)]
pub struct Graph {
    vertices: Vec<Vertex>,
    edges: Vec<Edge>,
    disconnected: IntSet<usize>,
    pub(crate) ring_cache: Option<Vec<IntSet<usize>>>,
    pub(crate) warnings: Vec<Warning>,
}

impl Graph {
    pub fn new() -> Graph {
        Graph::default()
    }

    /// Invalidation funnel: every mutation of the vertex or edge sets goes
    /// through here so derived caches can never go stale.
    fn mutated(&mut self) {
        self.ring_cache = None;
    }

    pub fn add_vertex(&mut self) -> usize {
        self.vertices.push(Vertex::default());
        self.mutated();
        self.vertices.len() - 1
    }

    pub fn add_edge(&mut self, a: usize, b: usize) -> Result<usize, InvariantError> {
        self.check_vertex(a)?;
        self.check_vertex(b)?;
        if a == b {
            return Err(InvariantError::LoopEdge(a));
        }
        if self.vertices[a]
            .targets
            .iter()
            .any(|entry| entry.target == b && !self.edges[entry.edge].removed)
        {
            return Err(InvariantError::DuplicateEdge(a, b));
        }
        self.edges.push(Edge {
            ends: [a, b],
            disconnected: false,
            removed: false,
        });
        let edge = self.edges.len() - 1;
        self.add_neighbor(a, EdgeTarget::new(edge, b));
        self.add_neighbor(b, EdgeTarget::new(edge, a));
        self.mutated();
        Ok(edge)
    }

    pub fn remove_edge(&mut self, edge: usize) -> Result<(), InvariantError> {
        self.check_edge(edge)?;
        let [a, b] = self.edges[edge].ends;
        self.remove_neighbor(a, b)?;
        self.remove_neighbor(b, a)?;
        self.edges[edge].removed = true;
        self.edges[edge].disconnected = false;
        self.disconnected.remove(&edge);
        self.mutated();
        Ok(())
    }

    pub fn remove_vertex(&mut self, vertex: usize) -> Result<(), InvariantError> {
        self.check_vertex(vertex)?;
        let incident: Vec<usize> = self.vertices[vertex]
            .targets
            .iter()
            .map(|entry| entry.edge)
            .filter(|&edge| !self.edges[edge].removed)
            .collect();
        for edge in incident {
            self.remove_edge(edge)?;
        }
        self.vertices[vertex].removed = true;
        self.mutated();
        Ok(())
    }

    fn add_neighbor(&mut self, vertex: usize, entry: EdgeTarget) {
        self.vertices[vertex].targets.push(entry);
    }

    fn remove_neighbor(&mut self, vertex: usize, target: usize) -> Result<(), InvariantError> {
        let targets = &mut self.vertices[vertex].targets;
        let position = targets
            .iter()
            .position(|entry| entry.target == target)
            .ok_or(InvariantError::MissingNeighbor { vertex, target })?;
        targets.remove(position);
        Ok(())
    }

    fn check_vertex(&self, vertex: usize) -> Result<(), InvariantError> {
        if self.vertices.get(vertex).is_some_and(|v| !v.removed) {
            Ok(())
        } else {
            Err(InvariantError::UnknownVertex(vertex))
        }
    }

    fn check_edge(&self, edge: usize) -> Result<(), InvariantError> {
        if self.edges.get(edge).is_some_and(|e| !e.removed) {
            Ok(())
        } else {
            Err(InvariantError::UnknownEdge(edge))
        }
    }

    /// Live vertex ids.
    pub fn vertices(&self) -> impl Iterator<Item = usize> + '_ {
        self.vertices
            .iter()
            .enumerate()
            .filter(|(_, vertex)| !vertex.removed)
            .map(|(index, _)| index)
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices().count()
    }

    /// Live, non-disconnected edge ids.
    pub fn active_edges(&self) -> impl Iterator<Item = usize> + '_ {
        self.edges
            .iter()
            .enumerate()
            .filter(|(_, edge)| !edge.removed && !edge.disconnected)
            .map(|(index, _)| index)
    }

    pub fn active_edge_count(&self) -> usize {
        self.active_edges().count()
    }

    pub fn edge(&self, edge: usize) -> Option<&Edge> {
        self.edges.get(edge).filter(|e| !e.removed)
    }

    pub fn endpoints(&self, edge: usize) -> Option<[usize; 2]> {
        self.edge(edge).map(|e| e.ends)
    }

    /// Swaps which endpoint of `edge` is considered the origin.
    pub fn swap_ends(&mut self, edge: usize) -> Result<(), InvariantError> {
        self.check_edge(edge)?;
        self.edges[edge].ends.swap(0, 1);
        Ok(())
    }

    /// Edge between `a` and `b` if one is active.
    pub fn edge_between(&self, a: usize, b: usize) -> Option<usize> {
        self.neighbor_edges(a)
            .find(|entry| entry.target == b)
            .map(|entry| entry.edge)
    }

    /// Adjacency of `vertex`, excluding disconnected edges.
    pub fn neighbor_edges(&self, vertex: usize) -> impl Iterator<Item = EdgeTarget> + '_ {
        self.vertices[vertex]
            .targets
            .iter()
            .copied()
            .filter(|entry| {
                let edge = &self.edges[entry.edge];
                !edge.removed && !edge.disconnected
            })
    }

    pub fn neighbors(&self, vertex: usize) -> impl Iterator<Item = usize> + '_ {
        self.neighbor_edges(vertex).map(|entry| entry.target)
    }

    pub fn degree(&self, vertex: usize) -> usize {
        self.neighbor_edges(vertex).count()
    }

    /// Moves `edge` to the disconnected set. The edge stays in both
    /// endpoints' adjacency lists but is skipped by every query until
    /// `reconnect_edge` puts it back.
    pub fn temporarily_disconnect_edge(&mut self, edge: usize) -> Result<(), InvariantError> {
        self.check_edge(edge)?;
        if !self.edges[edge].disconnected {
            self.edges[edge].disconnected = true;
            self.disconnected.insert(edge);
            self.mutated();
        }
        Ok(())
    }

    pub fn reconnect_edge(&mut self, edge: usize) -> Result<(), InvariantError> {
        self.check_edge(edge)?;
        if self.edges[edge].disconnected {
            self.edges[edge].disconnected = false;
            self.disconnected.remove(&edge);
            self.mutated();
        }
        Ok(())
    }

    pub fn reconnect_all(&mut self) {
        let pending: Vec<usize> = self.disconnected.iter().copied().collect();
        for edge in pending {
            self.edges[edge].disconnected = false;
        }
        self.disconnected.clear();
        self.mutated();
    }

    pub fn disconnected_edges(&self) -> impl Iterator<Item = usize> + '_ {
        self.disconnected.iter().copied()
    }

    /// Lazy sequence of connected components, one vertex set per component,
    /// flood-filling through non-disconnected edges.
    pub fn connected_components(&self) -> Components<'_> {
        Components {
            graph: self,
            visited: vec![false; self.vertices.len()],
            cursor: 0,
        }
    }

    /// Number of vertices reachable from `start` through active edges,
    /// including `start` itself.
    pub fn reachable_count(&self, start: usize) -> usize {
        self.flood_fill(start).len()
    }

    pub(crate) fn flood_fill(&self, start: usize) -> Vec<usize> {
        let mut visited = vec![false; self.vertices.len()];
        let mut stack = vec![start];
        let mut component = Vec::new();
        visited[start] = true;
        while let Some(index) = stack.pop() {
            component.push(index);
            for target in self.neighbors(index) {
                if !visited[target] {
                    visited[target] = true;
                    stack.push(target);
                }
            }
        }
        component
    }

    /// Single-component check with a fast-path rejection on the edge count.
    pub fn is_connected(&self) -> bool {
        let vertex_count = self.vertex_count();
        if vertex_count <= 1 {
            return true;
        }
        if self.active_edge_count() < vertex_count - 1 {
            return false;
        }
        self.connected_components()
            .next()
            .is_some_and(|component| component.len() == vertex_count)
    }

    /// Runs `probe` with `edge` temporarily disconnected, reconnecting it on
    /// the way out. The scoped shape makes forgetting the reconnect
    /// impossible at the call site.
    fn probe_without_edge<R>(&mut self, edge: usize, probe: impl FnOnce(&Graph) -> R) -> R {
        let was_disconnected = self.edges[edge].disconnected;
        self.edges[edge].disconnected = true;
        self.disconnected.insert(edge);
        let result = probe(self);
        if !was_disconnected {
            self.edges[edge].disconnected = false;
            self.disconnected.remove(&edge);
        }
        result
    }

    /// Whether removing `edge` would change the set of vertices reachable
    /// from one of its endpoints. A bridge is an edge that is part of no
    /// ring. The graph is left exactly as it was found.
    pub fn is_edge_bridge(&mut self, edge: usize) -> Result<bool, InvariantError> {
        self.check_edge(edge)?;
        Ok(self.edge_is_bridge_unchecked(edge))
    }

    fn edge_is_bridge_unchecked(&mut self, edge: usize) -> bool {
        let start = self.edges[edge].ends[0];
        let before = self.reachable_count(start);
        let after = self.probe_without_edge(edge, |graph| graph.reachable_count(start));
        after < before
    }

    /// Disconnects all degree-1 leaves and all bridge edges, repeating until
    /// only ring edges remain active. Returns the edges disconnected here so
    /// the caller can restore them (or keep the split).
    pub fn strip_bridge_edges(&mut self) -> Vec<usize> {
        let mut stripped = Vec::new();
        loop {
            let mut changed = false;
            loop {
                let leaf_edges: Vec<usize> = self
                    .vertices()
                    .filter(|&vertex| self.degree(vertex) == 1)
                    .filter_map(|vertex| self.neighbor_edges(vertex).next())
                    .map(|entry| entry.edge())
                    .collect();
                if leaf_edges.is_empty() {
                    break;
                }
                for edge in leaf_edges {
                    if !self.edges[edge].disconnected {
                        self.edges[edge].disconnected = true;
                        self.disconnected.insert(edge);
                        stripped.push(edge);
                        changed = true;
                    }
                }
            }
            let active: Vec<usize> = self.active_edges().collect();
            for edge in active {
                if self.edges[edge].disconnected {
                    continue;
                }
                if self.edge_is_bridge_unchecked(edge) {
                    self.edges[edge].disconnected = true;
                    self.disconnected.insert(edge);
                    stripped.push(edge);
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
        if !stripped.is_empty() {
            self.mutated();
        }
        stripped
    }

    /// Advisory warnings collected since the last call.
    pub fn take_warnings(&mut self) -> Vec<Warning> {
        std::mem::take(&mut self.warnings)
    }
}

pub struct Components<'a> {
    graph: &'a Graph,
    visited: Vec<bool>,
    cursor: usize,
}

impl Iterator for Components<'_> {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.cursor < self.visited.len() {
            let start = self.cursor;
            self.cursor += 1;
            if self.visited[start] || self.graph.vertices[start].removed {
                continue;
            }
            let mut stack = vec![start];
            let mut component = Vec::new();
            self.visited[start] = true;
            while let Some(index) = stack.pop() {
                component.push(index);
                for target in self.graph.neighbors(index) {
                    if !self.visited[target] {
                        self.visited[target] = true;
                        stack.push(target);
                    }
                }
            }
            component.sort_unstable();
            return Some(component);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Cycle of `n` vertices, returns (graph, edge ids in walk order).
    fn cycle(n: usize) -> (Graph, Vec<usize>) {
        let mut graph = Graph::new();
        let vertices: Vec<usize> = (0..n).map(|_| graph.add_vertex()).collect();
        let edges = (0..n)
            .map(|i| graph.add_edge(vertices[i], vertices[(i + 1) % n]).unwrap())
            .collect();
        (graph, edges)
    }

    /// Two benzene rings joined by one single bond.
    fn biphenyl() -> (Graph, usize) {
        let mut graph = Graph::new();
        for _ in 0..12 {
            graph.add_vertex();
        }
        for i in 0..6 {
            graph.add_edge(i, (i + 1) % 6).unwrap();
            graph.add_edge(6 + i, 6 + (i + 1) % 6).unwrap();
        }
        let link = graph.add_edge(0, 6).unwrap();
        (graph, link)
    }

    #[test]
    fn degree_counts_active_edges_only() {
        let (mut graph, edges) = cycle(6);
        assert_eq!(graph.degree(0), 2);
        graph.temporarily_disconnect_edge(edges[0]).unwrap();
        assert_eq!(graph.degree(0), 1);
        assert_eq!(graph.degree(1), 1);
        graph.reconnect_edge(edges[0]).unwrap();
        assert_eq!(graph.degree(0), 2);
    }

    #[test]
    fn duplicate_edge_rejected() {
        let mut graph = Graph::new();
        let a = graph.add_vertex();
        let b = graph.add_vertex();
        graph.add_edge(a, b).unwrap();
        assert_eq!(graph.add_edge(a, b), Err(InvariantError::DuplicateEdge(a, b)));
        assert_eq!(graph.add_edge(a, a), Err(InvariantError::LoopEdge(a)));
    }

    #[test]
    fn removing_missing_neighbor_is_an_invariant_violation() {
        let mut graph = Graph::new();
        let a = graph.add_vertex();
        let b = graph.add_vertex();
        let edge = graph.add_edge(a, b).unwrap();
        graph.remove_edge(edge).unwrap();
        assert_eq!(graph.remove_edge(edge), Err(InvariantError::UnknownEdge(edge)));
    }

    #[test]
    fn components_are_lazy_and_complete() {
        let mut graph = Graph::new();
        for _ in 0..5 {
            graph.add_vertex();
        }
        graph.add_edge(0, 1).unwrap();
        graph.add_edge(2, 3).unwrap();
        let components: Vec<Vec<usize>> = graph.connected_components().collect();
        assert_eq!(components, vec![vec![0, 1], vec![2, 3], vec![4]]);
        assert!(!graph.is_connected());
    }

    #[test]
    fn is_connected_fast_path() {
        let mut graph = Graph::new();
        for _ in 0..4 {
            graph.add_vertex();
        }
        graph.add_edge(0, 1).unwrap();
        graph.add_edge(1, 2).unwrap();
        // three vertices linked, one loose: edge count below |V| - 1
        assert!(!graph.is_connected());
        graph.add_edge(2, 3).unwrap();
        assert!(graph.is_connected());
    }

    #[test]
    fn biphenyl_bridge_law() {
        let (mut graph, link) = biphenyl();
        assert!(graph.is_edge_bridge(link).unwrap());
        for edge in 0..12 {
            assert!(!graph.is_edge_bridge(edge).unwrap(), "ring bond {edge} is not a bridge");
        }
    }

    #[test]
    fn bridge_probe_leaves_graph_untouched() {
        let (mut graph, link) = biphenyl();
        let degrees: Vec<usize> = graph.vertices().map(|v| graph.degree(v)).collect();
        let active: Vec<usize> = graph.active_edges().collect();
        graph.is_edge_bridge(link).unwrap();
        graph.is_edge_bridge(0).unwrap();
        assert_eq!(degrees, graph.vertices().map(|v| graph.degree(v)).collect::<Vec<_>>());
        assert_eq!(active, graph.active_edges().collect::<Vec<_>>());
        assert_eq!(graph.disconnected_edges().count(), 0);
    }

    #[test]
    fn strip_bridge_edges_keeps_only_ring_edges() {
        // cyclohexane with a two-carbon tail
        let (mut graph, _) = cycle(6);
        let tail1 = graph.add_vertex();
        let tail2 = graph.add_vertex();
        graph.add_edge(0, tail1).unwrap();
        graph.add_edge(tail1, tail2).unwrap();
        let stripped = graph.strip_bridge_edges();
        assert_eq!(stripped.len(), 2);
        assert_eq!(graph.active_edge_count(), 6);
        assert_eq!(graph.degree(tail1), 0);
        for edge in stripped {
            graph.reconnect_edge(edge).unwrap();
        }
        assert_eq!(graph.active_edge_count(), 8);
    }

    #[test]
    fn removal_tombstones_keep_indices_stable() {
        let mut graph = Graph::new();
        let a = graph.add_vertex();
        let b = graph.add_vertex();
        let c = graph.add_vertex();
        graph.add_edge(a, b).unwrap();
        let bc = graph.add_edge(b, c).unwrap();
        graph.remove_vertex(a).unwrap();
        assert_eq!(graph.vertex_count(), 2);
        assert_eq!(graph.endpoints(bc), Some([b, c]));
        assert_eq!(graph.degree(b), 1);
    }
}
