use crate::consts::MAX_RING_PASSES;
use crate::error::Warning;
use crate::graph::Graph;
use nohash_hasher::{IntMap, IntSet};
use std::collections::VecDeque;

/// A ring as the set of edges forming one cycle.
pub type EdgeRing = IntSet<usize>;

impl Graph {
    /// Expected number of independent rings: `|E| - |V| + 1` per connected
    /// component, summed. For a connected graph this is the familiar
    /// `|E| - |V| + 2 - components`.
    ///
    /// A multi-component graph gets an advisory warning, but every component
    /// still contributes its own cycle count, so rings are not lost when the
    /// input happens to be disconnected.
    pub fn expected_ring_count(&mut self) -> usize {
        let vertices = self.vertex_count();
        if vertices == 0 {
            return 0;
        }
        let edges = self.active_edge_count();
        let components: Vec<Vec<usize>> = self.connected_components().collect();
        if components.len() > 1 {
            self.warnings.push(Warning::MalformedComponent {
                vertices,
                edges,
                components: components.len(),
            });
        }
        components
            .iter()
            .map(|component| {
                let members: IntSet<usize> = component.iter().copied().collect();
                let local_edges = self
                    .active_edges()
                    .filter(|&edge| {
                        self.endpoints(edge)
                            .is_some_and(|ends| members.contains(&ends[0]))
                    })
                    .count();
                (local_edges + 1).saturating_sub(component.len())
            })
            .sum()
    }

    /// Smallest set of smallest rings: a minimum cycle basis, one edge set
    /// per independent cycle.
    ///
    /// A disconnected graph raises an advisory warning and is perceived per
    /// component in the same pass. Never fails on cyclic input, a count that
    /// cannot be reconciled with `|E| - |V| + 1` only produces an advisory
    /// warning. Results are cached until the next topology change.
    pub fn smallest_independent_cycles(&mut self) -> Vec<EdgeRing> {
        if let Some(cache) = &self.ring_cache {
            return cache.clone();
        }
        let expected = self.expected_ring_count();
        let mut rings: Vec<EdgeRing> = Vec::new();

        if expected > 0 {
            let mut restore = self.strip_bridge_edges();
            let mut passes = 0;
            while rings.len() < expected && passes < MAX_RING_PASSES {
                passes += 1;
                let has_degree_two = self.vertices().any(|vertex| self.degree(vertex) == 2);
                if !has_degree_two {
                    // spiro/bridgehead topology, every remaining vertex is a
                    // junction: manufacture a degree-2 vertex
                    if !self.process_junction_pass(&mut rings, &mut restore) {
                        break;
                    }
                    self.strip_leaves(&mut restore);
                    continue;
                }
                let found = self.collect_degree_two_rings();
                if found.is_empty() {
                    break;
                }
                for ring in found {
                    push_unique(&mut rings, ring.clone());
                    if let Some(cut) = self.degree_two_run_edge(&ring) {
                        self.force_disconnect(cut, &mut restore);
                    }
                }
                self.strip_leaves(&mut restore);
            }
            if rings.len() > expected {
                prune_redundant(&mut rings, expected);
            }
            for edge in restore {
                let _ = self.reconnect_edge(edge);
            }
        }

        if rings.len() != expected {
            self.warnings.push(Warning::RingCountMismatch {
                expected,
                found: rings.len(),
            });
        }
        self.ring_cache = Some(rings.clone());
        rings
    }

    /// One collection pass over every vertex that currently has degree 2.
    fn collect_degree_two_rings(&mut self) -> Vec<EdgeRing> {
        let starts: Vec<usize> = self
            .vertices()
            .filter(|&vertex| self.degree(vertex) == 2)
            .collect();
        let mut found: Vec<EdgeRing> = Vec::new();
        for vertex in starts {
            // earlier cuts in this pass may have changed the degree
            if self.degree(vertex) != 2 {
                continue;
            }
            if let Some(ring) = self.smallest_ring_through(vertex) {
                push_unique(&mut found, ring);
            }
        }
        found
    }

    /// Handles the all-junction case: temporarily drop one edge at a
    /// degree-3 vertex so its endpoints become degree 2, collect, restore,
    /// then persistently drop a different incident edge to shrink the
    /// remaining problem. Returns false when no junction is left.
    fn process_junction_pass(&mut self, rings: &mut Vec<EdgeRing>, restore: &mut Vec<usize>) -> bool {
        let Some(junction) = self.vertices().find(|&vertex| self.degree(vertex) >= 3) else {
            return false;
        };
        let incident: Vec<usize> = self
            .neighbor_edges(junction)
            .map(|entry| entry.edge())
            .collect();
        let probe = incident[0];
        self.force_disconnect(probe, &mut Vec::new());
        for ring in self.collect_degree_two_rings() {
            push_unique(rings, ring);
        }
        let _ = self.reconnect_edge(probe);
        if let Some(&other) = incident.get(1) {
            self.force_disconnect(other, restore);
        }
        true
    }

    /// The smallest ring containing `vertex`: for each incident edge, drop
    /// it and search breadth-first for the shortest way back to the far
    /// endpoint; the first depth that closes wins.
    pub fn smallest_ring_through(&mut self, vertex: usize) -> Option<EdgeRing> {
        let incident: Vec<(usize, usize)> = self
            .neighbor_edges(vertex)
            .map(|entry| (entry.edge(), entry.target()))
            .collect();
        let mut best: Option<EdgeRing> = None;
        for (edge, target) in incident {
            let was_disconnected = self.edge(edge).is_some_and(|e| e.is_disconnected());
            let _ = self.temporarily_disconnect_edge(edge);
            let path = self.shortest_edge_path(vertex, target);
            if !was_disconnected {
                let _ = self.reconnect_edge(edge);
            }
            if let Some(mut path) = path {
                path.insert(edge);
                if best.as_ref().map_or(true, |b| path.len() < b.len()) {
                    best = Some(path);
                }
            }
        }
        best
    }

    /// Breadth-first shortest path between two vertices over active edges,
    /// returned as the set of edges walked. Explicit frontier queue, one
    /// depth level at a time.
    fn shortest_edge_path(&self, from: usize, to: usize) -> Option<EdgeRing> {
        let mut predecessor: IntMap<usize, (usize, usize)> = IntMap::default();
        let mut queue = VecDeque::new();
        queue.push_back(from);
        let mut seen: IntSet<usize> = IntSet::default();
        seen.insert(from);
        while let Some(current) = queue.pop_front() {
            for entry in self.neighbor_edges(current) {
                let target = entry.target();
                if seen.contains(&target) {
                    continue;
                }
                seen.insert(target);
                predecessor.insert(target, (current, entry.edge()));
                if target == to {
                    let mut path = EdgeRing::default();
                    let mut cursor = to;
                    while cursor != from {
                        let (previous, edge) = predecessor[&cursor];
                        path.insert(edge);
                        cursor = previous;
                    }
                    return Some(path);
                }
                queue.push_back(target);
            }
        }
        None
    }

    /// Orders a ring's edges into a closed vertex walk. Returns an empty
    /// walk when the edge set is not a simple cycle.
    pub fn ring_vertex_walk(&self, ring: &EdgeRing) -> Vec<usize> {
        let mut adjacency: IntMap<usize, Vec<usize>> = IntMap::default();
        for &edge in ring {
            let Some(ends) = self.endpoints(edge) else {
                return Vec::new();
            };
            adjacency.entry(ends[0]).or_default().push(ends[1]);
            adjacency.entry(ends[1]).or_default().push(ends[0]);
        }
        if adjacency.values().any(|targets| targets.len() != 2) {
            return Vec::new();
        }
        let Some(&start) = adjacency.keys().min() else {
            return Vec::new();
        };
        let mut walk = vec![start];
        let mut previous = start;
        let mut current = adjacency[&start][0];
        while current != start {
            walk.push(current);
            let Some(next) = adjacency[&current]
                .iter()
                .copied()
                .find(|&candidate| candidate != previous)
            else {
                return Vec::new();
            };
            previous = current;
            current = next;
        }
        if walk.len() == ring.len() {
            walk
        } else {
            Vec::new()
        }
    }

    /// Picks an edge inside the longest run of purely degree-2 vertices of
    /// `ring`, the cut that keeps this ring from being rediscovered from
    /// several starting vertices.
    fn degree_two_run_edge(&self, ring: &EdgeRing) -> Option<usize> {
        let walk = self.ring_vertex_walk(ring);
        if walk.is_empty() {
            return ring.iter().next().copied();
        }
        let size = walk.len();
        let is_plain: Vec<bool> = walk.iter().map(|&vertex| self.degree(vertex) == 2).collect();
        if is_plain.iter().all(|&flag| flag) {
            return self.ring_edge_between(ring, walk[0], walk[1]);
        }
        // rotate to a junction so runs never wrap around
        let offset = is_plain.iter().position(|&flag| !flag)?;
        let mut best: Option<(usize, usize)> = None; // (run length, run start)
        let mut run_start = None;
        for step in 0..=size {
            let index = (offset + step) % size;
            let plain = step < size && is_plain[index];
            match (plain, run_start) {
                (true, None) => run_start = Some(step),
                (false, Some(start)) => {
                    let length = step - start;
                    if best.map_or(true, |(len, _)| length > len) {
                        best = Some((length, start));
                    }
                    run_start = None;
                }
                _ => {}
            }
        }
        let (length, start) = best?;
        let first = walk[(offset + start) % size];
        if length >= 2 {
            let second = walk[(offset + start + 1) % size];
            self.ring_edge_between(ring, first, second)
        } else {
            // single plain vertex: either of its two ring edges works
            let junction = walk[(offset + start + size - 1) % size];
            self.ring_edge_between(ring, junction, first)
        }
    }

    fn ring_edge_between(&self, ring: &EdgeRing, a: usize, b: usize) -> Option<usize> {
        ring.iter()
            .copied()
            .find(|&edge| {
                self.endpoints(edge)
                    .is_some_and(|ends| ends.contains(&a) && ends.contains(&b))
            })
    }

    /// Disconnects `edge` regardless of current state, recording it for the
    /// caller's restore pass.
    fn force_disconnect(&mut self, edge: usize, restore: &mut Vec<usize>) {
        if self.edge(edge).is_some_and(|e| !e.is_disconnected()) {
            let _ = self.temporarily_disconnect_edge(edge);
            restore.push(edge);
        }
    }

    /// Disconnects degree-1 leaf edges until none remain.
    fn strip_leaves(&mut self, restore: &mut Vec<usize>) {
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
                self.force_disconnect(edge, restore);
            }
        }
    }
}

fn push_unique(rings: &mut Vec<EdgeRing>, candidate: EdgeRing) -> bool {
    if rings.iter().any(|ring| *ring == candidate) {
        false
    } else {
        rings.push(candidate);
        true
    }
}

/// Drops the largest rings one at a time as long as the remaining set still
/// covers every ring edge. A coverage check, not a GF(2) independence test;
/// exotic bridged polycyclics may keep a non-minimal set.
fn prune_redundant(rings: &mut Vec<EdgeRing>, expected: usize) {
    let total: IntSet<usize> = rings.iter().flat_map(|ring| ring.iter().copied()).collect();
    while rings.len() > expected {
        let mut order: Vec<usize> = (0..rings.len()).collect();
        order.sort_by_key(|&index| std::cmp::Reverse(rings[index].len()));
        let mut dropped = false;
        for index in order {
            let union_others: IntSet<usize> = rings
                .iter()
                .enumerate()
                .filter(|&(other, _)| other != index)
                .flat_map(|(_, ring)| ring.iter().copied())
                .collect();
            if union_others == total {
                rings.remove(index);
                dropped = true;
                break;
            }
        }
        if !dropped {
            break;
        }
    }
}
