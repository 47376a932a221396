use crate::atom::Atom;
use crate::bond::{Bond, BondOrder};
use crate::error::InvariantError;
use crate::graph::{EdgeTarget, Graph};
use crate::stereo::StereoDescriptor;
use crate::vector::Vector;
use nohash_hasher::IntMap;
use petgraph::prelude::*;

/// A molecule: graph topology plus per-atom and per-bond payloads.
///
/// Atoms and bonds live in arenas parallel to the graph's vertex and edge
/// arenas, so a vertex id indexes its atom and an edge id indexes its bond.
/// All topology changes go through here, which keeps the payload arenas in
/// step and lets the graph invalidate its ring cache.
#[derive(Debug, Default, Clone)]
pub struct Molecule {
    graph: Graph,
    atoms: Vec<Atom>,
    bonds: Vec<Bond>,
    stereo: Vec<StereoDescriptor>,
}

impl Molecule {
    pub fn new() -> Molecule {
        Molecule::default()
    }

    pub fn add_atom(&mut self, atom: Atom) -> usize {
        let index = self.graph.add_vertex();
        debug_assert_eq!(index, self.atoms.len());
        self.atoms.push(atom);
        index
    }

    pub fn add_bond(&mut self, a: usize, b: usize, order: BondOrder) -> Result<usize, InvariantError> {
        let edge = self.graph.add_edge(a, b)?;
        debug_assert_eq!(edge, self.bonds.len());
        self.bonds.push(Bond::new(order));
        Ok(edge)
    }

    pub fn remove_bond(&mut self, bond: usize) -> Result<(), InvariantError> {
        self.graph.remove_edge(bond)
    }

    pub fn remove_atom(&mut self, atom: usize) -> Result<(), InvariantError> {
        self.graph.remove_vertex(atom)
    }

    pub fn add_stereo(&mut self, descriptor: StereoDescriptor) {
        self.stereo.push(descriptor);
    }

    pub fn stereo(&self) -> &[StereoDescriptor] {
        &self.stereo
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut Graph {
        &mut self.graph
    }

    pub fn atom(&self, atom: usize) -> &Atom {
        &self.atoms[atom]
    }

    pub fn bond(&self, bond: usize) -> &Bond {
        &self.bonds[bond]
    }

    pub fn bond_mut(&mut self, bond: usize) -> &mut Bond {
        &mut self.bonds[bond]
    }

    /// Live atom ids.
    pub fn atoms(&self) -> impl Iterator<Item = usize> + '_ {
        self.graph.vertices()
    }

    pub fn atom_count(&self) -> usize {
        self.graph.vertex_count()
    }

    pub fn bond_count(&self) -> usize {
        self.graph.active_edge_count()
    }

    pub fn neighbors(&self, atom: usize) -> impl Iterator<Item = usize> + '_ {
        self.graph.neighbors(atom)
    }

    pub fn neighbor_edges(&self, atom: usize) -> impl Iterator<Item = EdgeTarget> + '_ {
        self.graph.neighbor_edges(atom)
    }

    pub fn degree(&self, atom: usize) -> usize {
        self.graph.degree(atom)
    }

    pub fn bond_between(&self, a: usize, b: usize) -> Option<usize> {
        self.graph.edge_between(a, b)
    }

    pub fn position(&self, atom: usize) -> Option<Vector> {
        self.atoms[atom].position
    }

    pub fn is_placed(&self, atom: usize) -> bool {
        self.atoms[atom].position.is_some()
    }

    /// Sets a position only if the atom has none yet. A position, once
    /// assigned, survives until the bulk reset.
    pub fn place(&mut self, atom: usize, position: Vector) {
        let slot = &mut self.atoms[atom].position;
        if slot.is_none() {
            *slot = Some(position);
        }
    }

    pub fn clear_position(&mut self, atom: usize) {
        self.atoms[atom].position = None;
    }

    pub fn clear_all_positions(&mut self) {
        for atom in &mut self.atoms {
            atom.position = None;
        }
    }

    /// Average length over bonds whose endpoints are both placed. `None`
    /// when no such bond exists.
    pub fn average_bond_length(&self) -> Option<f64> {
        let mut total = 0.0;
        let mut count = 0usize;
        for edge in self.graph.active_edges() {
            let [a, b] = self.graph.endpoints(edge)?;
            if let (Some(pa), Some(pb)) = (self.position(a), self.position(b)) {
                total += pa.distance(&pb);
                count += 1;
            }
        }
        if count == 0 {
            None
        } else {
            Some(total / count as f64)
        }
    }

    /// Exports the connectivity as a petgraph graph with atomic numbers as
    /// node weights, for callers that want to run petgraph algorithms.
    pub fn to_ungraph(&self) -> UnGraph<u8, ()> {
        let mut graph = UnGraph::<u8, ()>::default();
        let mut node_indices = IntMap::<usize, NodeIndex<u32>>::default();

        for index in self.atoms() {
            let node_index = graph.add_node(self.atoms[index].atomic_number);
            node_indices.insert(index, node_index);
        }

        for edge in self.graph.active_edges() {
            if let Some([a, b]) = self.graph.endpoints(edge) {
                graph.add_edge(node_indices[&a], node_indices[&b], ());
            }
        }
        graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use petgraph::algo::connected_components;

    fn ethane() -> Molecule {
        let mut molecule = Molecule::new();
        let a = molecule.add_atom(Atom::carbon());
        let b = molecule.add_atom(Atom::carbon());
        molecule.add_bond(a, b, BondOrder::Single).unwrap();
        molecule
    }

    #[test]
    fn place_never_overwrites() {
        let mut molecule = ethane();
        molecule.place(0, Vector::xy(1.0, 2.0));
        molecule.place(0, Vector::xy(9.0, 9.0));
        assert_eq!(molecule.position(0), Some(Vector::xy(1.0, 2.0)));
        molecule.clear_position(0);
        molecule.place(0, Vector::xy(9.0, 9.0));
        assert_eq!(molecule.position(0), Some(Vector::xy(9.0, 9.0)));
    }

    #[test]
    fn average_bond_length_skips_unplaced() {
        let mut molecule = ethane();
        let c = molecule.add_atom(Atom::carbon());
        molecule.add_bond(1, c, BondOrder::Single).unwrap();
        assert_eq!(molecule.average_bond_length(), None);
        molecule.place(0, Vector::xy(0.0, 0.0));
        molecule.place(1, Vector::xy(2.0, 0.0));
        assert_eq!(molecule.average_bond_length(), Some(2.0));
    }

    #[test]
    fn ungraph_matches_component_structure() {
        let mut molecule = ethane();
        let c = molecule.add_atom(Atom::carbon());
        let d = molecule.add_atom(Atom::carbon());
        molecule.add_bond(c, d, BondOrder::Single).unwrap();
        let exported = molecule.to_ungraph();
        assert_eq!(exported.node_count(), 4);
        assert_eq!(
            connected_components(&exported),
            molecule.graph().connected_components().count()
        );
    }
}
