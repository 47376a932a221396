use crate::bond::{BondOrder, Wedge};
use crate::consts::{ANGLE_SHIFT, DEFAULT_BOND_LENGTH, GEOMETRY_TOLERANCE};
use crate::error::{InvariantError, Warning};
use crate::molecule::Molecule;
use crate::rings::EdgeRing;
use crate::stereo::{CisTransRelation, StereoDescriptor, StereoIndex, StereoRef, Winding};
use crate::vector::{normalized_angle, Vector};
use itertools::Itertools;
use std::collections::VecDeque;
use std::f64::consts::{PI, TAU};

/// Yields successive direction angles, accumulating a fixed turn per step.
///
/// Walking a regular polygon, distributing branches over an angular gap and
/// tracing a partially known ring all consume this stream.
struct AngleWalk {
    angle: f64,
    turn: f64,
}

impl AngleWalk {
    fn new(angle: f64, turn: f64) -> AngleWalk {
        AngleWalk { angle, turn }
    }
}

impl Iterator for AngleWalk {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        let angle = self.angle;
        self.angle += self.turn;
        Some(angle)
    }
}

/// A perceived ring with both representations layout needs: the edge set
/// from ring perception and the ordered closed vertex walk.
#[derive(Debug, Clone)]
struct Ring {
    edges: EdgeRing,
    walk: Vec<usize>,
}

impl Ring {
    fn size(&self) -> usize {
        self.walk.len()
    }

    fn contains(&self, atom: usize) -> bool {
        self.walk.contains(&atom)
    }

    /// Interior angle of the regular polygon of this size.
    fn interior_angle(&self) -> f64 {
        PI - TAU / self.size() as f64
    }

    /// Exterior turn per edge, `180 − 180·(n−2)/n` in radians.
    fn exterior_turn(&self) -> f64 {
        TAU / self.size() as f64
    }

    /// Rotates the walk so it starts at `atom`.
    fn walk_from(&self, atom: usize) -> Vec<usize> {
        let Some(offset) = self.walk.iter().position(|&candidate| candidate == atom) else {
            return self.walk.clone();
        };
        let size = self.size();
        (0..size).map(|step| self.walk[(offset + step) % size]).collect()
    }
}

/// How a ring about to be placed touches the already placed backbone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RingFusion {
    /// Exactly one placed atom reached through an ordinary chain bond.
    Chain(usize),
    /// One shared atom sitting inside the backbone (spiro junction).
    Spiro(usize),
    /// Two shared atoms joined by a shared edge (ortho-fused).
    Ortho,
    /// More than two shared atoms, or two without a shared edge.
    Bridged,
}

/// Automatic 2D coordinate generation.
///
/// A generator is used for a single layout request and discarded; it holds
/// the remaining unplaced rings, the stereo index and the propagation queue
/// for that one invocation.
#[derive(Debug, Default)]
pub struct CoordsGenerator {
    bond_length: f64,
    rings: Vec<Ring>,
    stereo: Vec<StereoDescriptor>,
    stereo_index: StereoIndex,
    queue: VecDeque<usize>,
    warnings: Vec<Warning>,
}

impl CoordsGenerator {
    /// Fills in 2D coordinates for every atom of `molecule`.
    ///
    /// `bond_length == 0` uses the default unit length, a negative value
    /// infers the length from bonds that already have both endpoints placed
    /// (extending a partial drawing), a positive value is used verbatim.
    /// With `force` every existing coordinate is discarded first.
    ///
    /// Advisory warnings are returned; they never prevent a complete
    /// coordinate assignment. An `InvariantError` means the input graph was
    /// structurally inconsistent and the layout was aborted.
    pub fn calculate_coords(
        molecule: &mut Molecule,
        bond_length: f64,
        force: bool,
    ) -> Result<Vec<Warning>, InvariantError> {
        let mut generator = CoordsGenerator::default();
        generator.run(molecule, bond_length, force)?;
        Ok(generator.warnings)
    }

    fn run(
        &mut self,
        molecule: &mut Molecule,
        bond_length: f64,
        force: bool,
    ) -> Result<(), InvariantError> {
        if force {
            molecule.clear_all_positions();
        }
        self.bond_length = resolve_bond_length(molecule, bond_length);
        self.stereo = molecule.stereo().to_vec();
        self.stereo_index = StereoIndex::build(&self.stereo);

        if molecule.atoms().all(|atom| molecule.is_placed(atom)) {
            // nothing to do, repeated calls are a no-op
            return Ok(());
        }

        let edge_rings = molecule.graph_mut().smallest_independent_cycles();
        self.warnings.extend(molecule.graph_mut().take_warnings());
        self.rings = edge_rings
            .iter()
            .map(|edges| Ring {
                edges: edges.clone(),
                walk: molecule.graph().ring_vertex_walk(edges),
            })
            .filter(|ring| !ring.walk.is_empty())
            .collect();

        self.select_backbone(molecule)?;
        self.propagate(molecule)?;

        // disconnected leftovers: reseed each fragment east of what exists
        let mut warned = false;
        loop {
            let unplaced = molecule.atoms().find(|&atom| !molecule.is_placed(atom));
            let Some(start) = unplaced else {
                break;
            };
            if !warned {
                self.warnings.push(Warning::DisconnectedInput);
                warned = true;
            }
            let offset = rightmost_x(molecule) + 2.0 * self.bond_length;
            molecule.place(start, Vector::xy(offset, 0.0));
            self.queue.push_back(start);
            self.propagate(molecule)?;
        }
        Ok(())
    }

    /// Picks the initial backbone the layout propagates from.
    fn select_backbone(&mut self, molecule: &mut Molecule) -> Result<(), InvariantError> {
        let placed: Vec<usize> = molecule
            .atoms()
            .filter(|&atom| molecule.is_placed(atom))
            .collect();
        if !placed.is_empty() {
            self.seed_from_existing(molecule, placed);
            return Ok(());
        }
        if let Some(index) = self.most_anelated_ring() {
            let ring = self.rings.remove(index);
            self.place_first_ring(molecule, &ring);
            self.enqueue_ring(&ring);
            self.process_anelated(molecule, &ring)?;
            return Ok(());
        }
        let Some(first) = molecule.atoms().next() else {
            return Ok(());
        };
        molecule.place(first, Vector::default());
        let neighbor = molecule.neighbors(first).next();
        if let Some(neighbor) = neighbor {
            molecule.place(neighbor, Vector::xy(self.bond_length, 0.0));
            self.queue.push_back(neighbor);
        }
        self.queue.push_back(first);
        Ok(())
    }

    /// Existing coordinates become the backbone if they form one connected
    /// block; disjoint pre-placed blocks are discarded down to the largest.
    fn seed_from_existing(&mut self, molecule: &mut Molecule, placed: Vec<usize>) {
        let blocks = placed_blocks(molecule, &placed);
        if let Some(largest) = blocks.iter().position_max_by_key(|block| block.len()) {
            for (index, block) in blocks.iter().enumerate() {
                if index != largest {
                    for &atom in block {
                        molecule.clear_position(atom);
                    }
                }
            }
            // rings the backbone already covers need no placement
            self.rings.retain(|ring| {
                !ring.walk.iter().all(|&atom| molecule.is_placed(atom))
            });
            for &atom in &blocks[largest] {
                self.queue.push_back(atom);
            }
        }
    }

    /// The ring sharing the most atoms with other rings; the densest part
    /// of a fused system is the most stable anchor.
    fn most_anelated_ring(&self) -> Option<usize> {
        (0..self.rings.len()).position_max_by_key(|&index| {
            self.rings
                .iter()
                .enumerate()
                .filter(|&(other, _)| other != index)
                .flat_map(|(_, ring)| ring.walk.iter())
                .filter(|atom| self.rings[index].contains(**atom))
                .count()
        })
    }

    /// Lays the very first ring out as a regular polygon anchored at the
    /// origin, walking the perimeter with an accumulating exterior turn.
    fn place_first_ring(&mut self, molecule: &mut Molecule, ring: &Ring) {
        let mut position = Vector::default();
        let angles = AngleWalk::new(0.0, ring.exterior_turn());
        for (&atom, angle) in ring.walk.iter().zip(angles) {
            molecule.place(atom, position);
            position = position + Vector::from_angle(angle) * self.bond_length;
        }
    }

    fn enqueue_ring(&mut self, ring: &Ring) {
        for &atom in &ring.walk {
            self.queue.push_back(atom);
        }
    }

    /// Grows outward from every placed atom until nothing is left to do.
    fn propagate(&mut self, molecule: &mut Molecule) -> Result<(), InvariantError> {
        while let Some(atom) = self.queue.pop_front() {
            let in_ring = self.rings.iter().position(|ring| ring.contains(atom));
            if let Some(index) = in_ring {
                let ring = self.rings.remove(index);
                self.place_ring(molecule, &ring)?;
                self.enqueue_ring(&ring);
                self.process_anelated(molecule, &ring)?;
                // the atom may still have acyclic branches or further rings
                self.queue.push_back(atom);
                continue;
            }
            self.process_atom_neighbors(molecule, atom)?;
        }
        Ok(())
    }

    /// After a ring is resolved, every stored ring sharing at least one
    /// atom with it is fused in turn, depth first.
    fn process_anelated(&mut self, molecule: &mut Molecule, ring: &Ring) -> Result<(), InvariantError> {
        loop {
            let shared = self
                .rings
                .iter()
                .position(|other| other.walk.iter().any(|&atom| ring.contains(atom)));
            let Some(index) = shared else {
                return Ok(());
            };
            let other = self.rings.remove(index);
            self.place_ring(molecule, &other)?;
            self.enqueue_ring(&other);
            self.process_anelated(molecule, &other)?;
        }
    }

    /// Places the unplaced members of `ring`, dispatching on how the ring
    /// touches the backbone.
    fn place_ring(&mut self, molecule: &mut Molecule, ring: &Ring) -> Result<(), InvariantError> {
        if ring.walk.is_empty() {
            return Err(InvariantError::MissingPathEndpoints(ring.edges.len()));
        }
        let placed: Vec<usize> = ring
            .walk
            .iter()
            .copied()
            .filter(|&atom| molecule.is_placed(atom))
            .collect();
        let fusion = match placed.len() {
            0 => {
                // freshly reseeded fragment, no anchor yet
                self.place_first_ring(molecule, ring);
                return Ok(());
            }
            1 => {
                let anchor = placed[0];
                let outside = molecule
                    .neighbors(anchor)
                    .filter(|&neighbor| molecule.is_placed(neighbor) && !ring.contains(neighbor))
                    .count();
                if outside >= 2 {
                    RingFusion::Spiro(anchor)
                } else {
                    RingFusion::Chain(anchor)
                }
            }
            2 => {
                let bond = molecule.bond_between(placed[0], placed[1]);
                match bond {
                    Some(edge) if ring.edges.contains(&edge) => RingFusion::Ortho,
                    _ => RingFusion::Bridged,
                }
            }
            n if n == ring.size() => return Ok(()),
            _ => RingFusion::Bridged,
        };
        match fusion {
            RingFusion::Chain(anchor) => self.place_ring_from_atom(molecule, ring, anchor),
            RingFusion::Spiro(junction) => self.place_spiro_ring(molecule, ring, junction),
            RingFusion::Ortho => self.place_ortho_ring(molecule, ring, placed[0], placed[1]),
            RingFusion::Bridged => self.place_bridged_ring(molecule, ring),
        }
    }

    /// One known atom: orient the ring off the incoming bond direction and
    /// walk the perimeter (4.3.c).
    fn place_ring_from_atom(
        &mut self,
        molecule: &mut Molecule,
        ring: &Ring,
        anchor: usize,
    ) -> Result<(), InvariantError> {
        let Some(anchor_position) = molecule.position(anchor) else {
            return Err(InvariantError::UnknownVertex(anchor));
        };
        let incoming = molecule
            .neighbors(anchor)
            .filter(|&neighbor| molecule.is_placed(neighbor) && !ring.contains(neighbor))
            .find_map(|neighbor| molecule.position(neighbor))
            .map(|position| (anchor_position - position).angle_2d())
            .unwrap_or(0.0);
        self.walk_ring(molecule, ring, anchor, incoming);
        Ok(())
    }

    /// One shared atom inside the backbone: the ring opens along the
    /// bisector of the two backbone bonds, pointing away from both.
    fn place_spiro_ring(
        &mut self,
        molecule: &mut Molecule,
        ring: &Ring,
        junction: usize,
    ) -> Result<(), InvariantError> {
        let Some(junction_position) = molecule.position(junction) else {
            return Err(InvariantError::UnknownVertex(junction));
        };
        let backbone: Vec<Vector> = molecule
            .neighbors(junction)
            .filter(|&neighbor| molecule.is_placed(neighbor) && !ring.contains(neighbor))
            .filter_map(|neighbor| molecule.position(neighbor))
            .collect();
        if backbone.len() < 2 {
            return Err(InvariantError::DegenerateRingJunction(junction));
        }
        let first = (backbone[0] - junction_position).normalize();
        let second = (backbone[1] - junction_position).normalize();
        let sum = first + second;
        let opening = if sum.length() < GEOMETRY_TOLERANCE {
            // collinear backbone bonds: open perpendicular to them
            first.rotated_2d(PI / 2.0).angle_2d()
        } else {
            (sum * -1.0).angle_2d()
        };
        self.walk_ring(molecule, ring, junction, opening);
        Ok(())
    }

    /// Walks a ring from `anchor`, first edge at half the interior angle off
    /// `incoming`, then a constant clockwise exterior turn per edge.
    fn walk_ring(&mut self, molecule: &mut Molecule, ring: &Ring, anchor: usize, incoming: f64) {
        let Some(mut position) = molecule.position(anchor) else {
            return;
        };
        let start = incoming + ring.interior_angle() / 2.0;
        let angles = AngleWalk::new(start, -ring.exterior_turn());
        let walk = ring.walk_from(anchor);
        for (&atom, angle) in walk.iter().zip(angles) {
            molecule.place(atom, position);
            position = position + Vector::from_angle(angle) * self.bond_length;
        }
    }

    /// Two shared atoms on a shared edge: orient along the edge and put the
    /// new ring on the side away from the rest of the backbone.
    fn place_ortho_ring(
        &mut self,
        molecule: &mut Molecule,
        ring: &Ring,
        shared_a: usize,
        shared_b: usize,
    ) -> Result<(), InvariantError> {
        // order the walk so it runs shared edge first
        let mut walk = ring.walk_from(shared_a);
        if walk.get(1) != Some(&shared_b) {
            walk.reverse();
            walk.rotate_right(1);
        }
        if walk.get(1) != Some(&shared_b) {
            return Err(InvariantError::MissingPathEndpoints(ring.size()));
        }
        let (Some(from), Some(to)) = (molecule.position(walk[0]), molecule.position(walk[1]))
        else {
            return Err(InvariantError::UnknownVertex(shared_a));
        };
        let axis = to - from;
        let side = -backbone_side(molecule, ring, &[shared_a, shared_b], from, axis);
        let angles = AngleWalk::new(
            axis.angle_2d() + side * ring.exterior_turn(),
            side * ring.exterior_turn(),
        );
        let mut position = to;
        for (&atom, angle) in walk[2..].iter().zip(angles) {
            position = position + Vector::from_angle(angle) * self.bond_length;
            molecule.place(atom, position);
        }
        Ok(())
    }

    /// Bridged or multiply-fused: walk the open arc between the endpoints
    /// of the longest placed path twice, first as a dry run to learn where
    /// the arc would land, then again rotated and rescaled so it lands on
    /// the already placed far endpoint.
    fn place_bridged_ring(&mut self, molecule: &mut Molecule, ring: &Ring) -> Result<(), InvariantError> {
        let (path, arc) = longest_placed_path(molecule, ring);
        if arc.is_empty() {
            return Ok(());
        }
        let (Some(&path_end), Some(&path_start)) = (path.last(), path.first()) else {
            return Err(InvariantError::MissingPathEndpoints(ring.size()));
        };
        let (Some(start_position), Some(target_position)) =
            (molecule.position(path_end), molecule.position(path_start))
        else {
            return Err(InvariantError::MissingPathEndpoints(ring.size()));
        };
        let chord = target_position - start_position;
        let incoming = if path.len() >= 2 {
            molecule
                .position(path[path.len() - 2])
                .map(|previous| (start_position - previous).angle_2d())
                .unwrap_or_else(|| chord.angle_2d())
        } else {
            chord.angle_2d()
        };
        let side = -backbone_side(molecule, ring, &path, start_position, chord);
        let turn = side * ring.exterior_turn();
        let steps = arc.len() + 1;

        let mut start_angle = incoming + turn;
        let mut dry_chord = arc_endpoint(start_angle, turn, steps, self.bond_length);
        if dry_chord.length() < GEOMETRY_TOLERANCE {
            // the arc would close on its start, e.g. two same-size rings
            // sharing all their anchors; nudge and retry
            start_angle += ANGLE_SHIFT;
            dry_chord = arc_endpoint(start_angle, turn, steps, self.bond_length);
            self.warnings.push(Warning::NudgedRingAngle { ring_size: ring.size() });
        }
        if dry_chord.length() < GEOMETRY_TOLERANCE {
            return Ok(());
        }

        let scale = chord.length() / dry_chord.length();
        let correction = chord.angle_2d() - dry_chord.angle_2d();
        if (scale - 1.0).abs() > 1e-6 {
            self.warnings.push(Warning::RescaledFusedRing { ring_size: ring.size() });
        }
        let length = self.bond_length * scale;
        let angles = AngleWalk::new(start_angle + correction, turn);
        let mut position = start_position;
        for (&atom, angle) in arc.iter().zip(angles) {
            position = position + Vector::from_angle(angle) * length;
            molecule.place(atom, position);
        }
        Ok(())
    }

    /// Places the unplaced neighbors of a placed, ring-free atom.
    fn process_atom_neighbors(
        &mut self,
        molecule: &mut Molecule,
        atom: usize,
    ) -> Result<(), InvariantError> {
        let unplaced: Vec<usize> = molecule
            .neighbors(atom)
            .filter(|&neighbor| !molecule.is_placed(neighbor))
            .collect();
        if unplaced.is_empty() {
            return Ok(());
        }
        let placed: Vec<usize> = molecule
            .neighbors(atom)
            .filter(|&neighbor| molecule.is_placed(neighbor))
            .collect();
        let Some(&direction_source) = placed.first() else {
            // seed atom of a fresh fragment: start its chain eastwards
            let Some(position) = molecule.position(atom) else {
                return Err(InvariantError::UnknownVertex(atom));
            };
            molecule.place(unplaced[0], position + Vector::xy(self.bond_length, 0.0));
            self.queue.push_back(unplaced[0]);
            self.queue.push_back(atom);
            return Ok(());
        };

        match unplaced.len() {
            1 => {
                self.place_single_neighbor(molecule, atom, direction_source, unplaced[0])?;
                self.queue.push_back(unplaced[0]);
            }
            2 if self
                .stereo_index
                .tetrahedral_at(&self.stereo, atom)
                .is_some() =>
            {
                self.place_tetrahedral_pair(molecule, atom, direction_source, &unplaced)?;
            }
            _ => {
                self.distribute_in_largest_gap(molecule, atom, &placed, &unplaced)?;
                for &neighbor in &unplaced {
                    self.queue.push_back(neighbor);
                }
            }
        }
        Ok(())
    }

    /// Default 120° turn off the incoming bond, 180° through triple bonds
    /// and cumulated double bonds; the turn side honors a resolved cis/trans
    /// descriptor, otherwise mirrors away from the previous turn.
    fn place_single_neighbor(
        &mut self,
        molecule: &mut Molecule,
        atom: usize,
        from: usize,
        target: usize,
    ) -> Result<(), InvariantError> {
        let (Some(atom_position), Some(from_position)) =
            (molecule.position(atom), molecule.position(from))
        else {
            return Err(InvariantError::UnknownVertex(atom));
        };
        let incoming = (atom_position - from_position).angle_2d();

        if self.is_linear_at(molecule, atom, from, target) {
            molecule.place(
                target,
                atom_position + Vector::from_angle(incoming) * self.bond_length,
            );
            return Ok(());
        }

        let axis = atom_position - from_position;
        let side = match self.cis_trans_side(molecule, atom, from, target, from_position, axis) {
            Some(side) => side,
            None => {
                // steer away from neighbors already sitting around this atom
                let local: f64 = molecule
                    .neighbors(atom)
                    .filter(|&neighbor| neighbor != from && molecule.is_placed(neighbor))
                    .filter_map(|neighbor| molecule.position(neighbor))
                    .map(|position| axis.cross_2d(&(position - atom_position)).signum())
                    .sum();
                if local > 0.0 {
                    -1.0
                } else if local < 0.0 {
                    1.0
                } else {
                    // mirror the previous chain turn, all-trans zig-zag
                    let previous = molecule
                        .neighbors(from)
                        .filter(|&neighbor| neighbor != atom && molecule.is_placed(neighbor))
                        .find_map(|neighbor| molecule.position(neighbor));
                    match previous {
                        Some(position) => {
                            if axis.cross_2d(&(position - from_position)) > 0.0 {
                                -1.0
                            } else {
                                1.0
                            }
                        }
                        None => 1.0,
                    }
                }
            }
        };
        let direction = incoming + side * (PI / 3.0);
        molecule.place(
            target,
            atom_position + Vector::from_angle(direction) * self.bond_length,
        );
        Ok(())
    }

    /// 180° cases: a triple bond at the atom, or the incoming double bond
    /// continuing into another double bond (cumulene).
    fn is_linear_at(&self, molecule: &Molecule, atom: usize, from: usize, target: usize) -> bool {
        let has_triple = molecule
            .neighbor_edges(atom)
            .any(|entry| molecule.bond(entry.edge()).order() == BondOrder::Triple);
        if has_triple {
            return true;
        }
        let incoming_double = molecule
            .bond_between(atom, from)
            .map(|edge| molecule.bond(edge).order() == BondOrder::Double)
            .unwrap_or(false);
        let outgoing_double = molecule
            .bond_between(atom, target)
            .map(|edge| molecule.bond(edge).order() == BondOrder::Double)
            .unwrap_or(false);
        incoming_double && outgoing_double
    }

    /// Turn side demanded by a cis/trans descriptor whose partner reference
    /// is already placed, if there is one for this bond.
    fn cis_trans_side(
        &self,
        molecule: &Molecule,
        atom: usize,
        from: usize,
        target: usize,
        from_position: Vector,
        axis: Vector,
    ) -> Option<f64> {
        let descriptor = self.stereo_index.cis_trans_for_terminal(&self.stereo, target)?;
        // the double bond must be the one we are turning off
        let (inner_a, inner_b) = descriptor.inner_pair()?;
        if !((inner_a == from && inner_b == atom) || (inner_a == atom && inner_b == from)) {
            return None;
        }
        let StereoDescriptor::CisTrans { path, relation } = descriptor else {
            return None;
        };
        let partner = if target == path[3] { path[0] } else { path[3] };
        let partner_position = molecule.position(partner)?;
        let partner_side = if axis.cross_2d(&(partner_position - from_position)) > 0.0 {
            1.0
        } else {
            -1.0
        };
        Some(match relation {
            CisTransRelation::Cis => partner_side,
            CisTransRelation::Trans => -partner_side,
        })
    }

    /// Tetrahedral stereo center with two open neighbors: the descriptor
    /// reference gets the single-neighbor treatment plus a wedge, the rest
    /// is placed by recursion.
    fn place_tetrahedral_pair(
        &mut self,
        molecule: &mut Molecule,
        atom: usize,
        from: usize,
        unplaced: &[usize],
    ) -> Result<(), InvariantError> {
        let Some(StereoDescriptor::Tetrahedral { winding, refs, .. }) = self
            .stereo_index
            .tetrahedral_at(&self.stereo, atom)
            .cloned()
        else {
            return Ok(());
        };
        let stereo_target = unplaced
            .iter()
            .copied()
            .find(|&candidate| {
                refs.iter()
                    .any(|reference| reference.atom() == Some(candidate))
            })
            .unwrap_or(unplaced[0]);
        self.place_single_neighbor(molecule, atom, from, stereo_target)?;
        self.queue.push_back(stereo_target);

        if let Some(edge) = molecule.bond_between(atom, stereo_target) {
            // the reference order may run opposite to the stored endpoints
            let reversed = refs
                .iter()
                .filter_map(StereoRef::atom)
                .position(|reference| reference == stereo_target)
                .map(|position| position % 2 == 1)
                .unwrap_or(false);
            let effective = if reversed { winding.reverse() } else { winding };
            molecule.bond_mut(edge).wedge = match effective {
                Winding::Clockwise => Wedge::Solid,
                Winding::Anticlockwise => Wedge::Hash,
            };
            if molecule.graph().endpoints(edge).map(|ends| ends[0]) != Some(atom) {
                molecule.graph_mut().swap_ends(edge)?;
            }
        }
        // the remaining neighbor is an ordinary single placement now
        self.process_atom_neighbors(molecule, atom)
    }

    /// Branch point: spread the new neighbors evenly over the largest free
    /// angular gap between the placed ones.
    fn distribute_in_largest_gap(
        &mut self,
        molecule: &mut Molecule,
        atom: usize,
        placed: &[usize],
        unplaced: &[usize],
    ) -> Result<(), InvariantError> {
        let Some(center) = molecule.position(atom) else {
            return Err(InvariantError::UnknownVertex(atom));
        };
        let mut occupied: Vec<f64> = placed
            .iter()
            .filter_map(|&neighbor| molecule.position(neighbor))
            .map(|position| normalized_angle((position - center).angle_2d()))
            .collect();
        occupied.sort_by(|a, b| a.total_cmp(b));
        if occupied.is_empty() {
            return Err(InvariantError::UnknownVertex(atom));
        }
        let (gap_start, gap) = occupied
            .iter()
            .circular_tuple_windows()
            .map(|(&current, &next)| {
                let gap = normalized_angle(next - current);
                let gap = if gap < GEOMETRY_TOLERANCE { TAU } else { gap };
                (current, gap)
            })
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .unwrap_or((occupied[0], TAU));
        let step = gap / (unplaced.len() + 1) as f64;
        let angles = AngleWalk::new(gap_start + step, step);
        for (&neighbor, angle) in unplaced.iter().zip(angles) {
            molecule.place(neighbor, center + Vector::from_angle(angle) * self.bond_length);
        }
        Ok(())
    }
}

fn resolve_bond_length(molecule: &Molecule, requested: f64) -> f64 {
    if requested > 0.0 {
        requested
    } else if requested < 0.0 {
        molecule
            .average_bond_length()
            .filter(|&length| length > GEOMETRY_TOLERANCE)
            .unwrap_or(DEFAULT_BOND_LENGTH)
    } else {
        DEFAULT_BOND_LENGTH
    }
}

fn rightmost_x(molecule: &Molecule) -> f64 {
    molecule
        .atoms()
        .filter_map(|atom| molecule.position(atom))
        .map(|position| position.x)
        .fold(0.0, f64::max)
}

/// Connected blocks within the pre-placed atom set, flood-filling only
/// through placed atoms.
fn placed_blocks(molecule: &Molecule, placed: &[usize]) -> Vec<Vec<usize>> {
    let mut blocks = Vec::new();
    let mut visited: Vec<usize> = Vec::new();
    for &start in placed {
        if visited.contains(&start) {
            continue;
        }
        let mut block = Vec::new();
        let mut stack = vec![start];
        visited.push(start);
        while let Some(current) = stack.pop() {
            block.push(current);
            for neighbor in molecule.neighbors(current) {
                if molecule.is_placed(neighbor) && !visited.contains(&neighbor) {
                    visited.push(neighbor);
                    stack.push(neighbor);
                }
            }
        }
        blocks.push(block);
    }
    blocks
}

/// Which side of `axis` (anchored at `origin`) the placed surroundings of a
/// ring lie on: positive for left, negative for right, zero when undecided.
fn backbone_side(
    molecule: &Molecule,
    ring: &Ring,
    anchors: &[usize],
    origin: Vector,
    axis: Vector,
) -> f64 {
    let mut balance = 0.0;
    for &anchor in anchors {
        for neighbor in molecule.neighbors(anchor) {
            if anchors.contains(&neighbor) || ring.contains(neighbor) {
                continue;
            }
            if let Some(position) = molecule.position(neighbor) {
                balance += axis.cross_2d(&(position - origin)).signum();
            }
        }
    }
    if balance > 0.0 {
        1.0
    } else if balance < 0.0 {
        -1.0
    } else {
        1.0
    }
}

/// Longest contiguous run of placed atoms in the ring walk, plus the
/// unplaced arc that follows it (in walk order back to the run's start).
fn longest_placed_path(molecule: &Molecule, ring: &Ring) -> (Vec<usize>, Vec<usize>) {
    let walk = &ring.walk;
    let size = walk.len();
    let placed_flags: Vec<bool> = walk.iter().map(|&atom| molecule.is_placed(atom)).collect();
    if placed_flags.iter().all(|&flag| flag) {
        return (walk.clone(), Vec::new());
    }
    let Some(offset) = placed_flags.iter().position(|&flag| !flag) else {
        return (walk.clone(), Vec::new());
    };
    let mut best: Option<(usize, usize)> = None; // (length, start step)
    let mut run_start: Option<usize> = None;
    for step in 0..=size {
        let index = (offset + step) % size;
        let placed = step < size && placed_flags[index];
        match (placed, run_start) {
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
    let Some((length, start)) = best else {
        return (Vec::new(), walk.clone());
    };
    let path: Vec<usize> = (0..length)
        .map(|step| walk[(offset + start + step) % size])
        .collect();
    let arc: Vec<usize> = (length..size)
        .map(|step| walk[(offset + start + step) % size])
        .collect();
    (path, arc)
}

/// Endpoint of an arc of `steps` unit moves with a constant turn, relative
/// to the arc's start.
fn arc_endpoint(start_angle: f64, turn: f64, steps: usize, length: f64) -> Vector {
    let mut position = Vector::default();
    let angles = AngleWalk::new(start_angle, turn);
    for (_, angle) in (0..steps).zip(angles) {
        position = position + Vector::from_angle(angle) * length;
    }
    position
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atom::Atom;
    use crate::stereo::StereoRef;

    fn chain(length: usize) -> Molecule {
        let mut molecule = Molecule::new();
        for _ in 0..length {
            molecule.add_atom(Atom::carbon());
        }
        for atom in 1..length {
            molecule.add_bond(atom - 1, atom, BondOrder::Single).unwrap();
        }
        molecule
    }

    fn ring_molecule(size: usize) -> Molecule {
        let mut molecule = chain(size);
        molecule.add_bond(size - 1, 0, BondOrder::Single).unwrap();
        molecule
    }

    fn naphthalene() -> Molecule {
        let mut molecule = Molecule::new();
        for _ in 0..10 {
            molecule.add_atom(Atom::carbon());
        }
        let bonds = [
            (0, 1), (1, 2), (2, 3), (3, 4), (4, 5), (5, 0),
            (4, 6), (6, 7), (7, 8), (8, 9), (9, 5),
        ];
        for (a, b) in bonds {
            molecule.add_bond(a, b, BondOrder::Single).unwrap();
        }
        molecule
    }

    fn layout(molecule: &mut Molecule) -> Vec<Warning> {
        CoordsGenerator::calculate_coords(molecule, 0.0, false).unwrap()
    }

    fn assert_all_placed(molecule: &Molecule) {
        for atom in molecule.atoms() {
            assert!(molecule.is_placed(atom), "atom {atom} was not placed");
        }
    }

    fn bond_distance(molecule: &Molecule, a: usize, b: usize) -> f64 {
        molecule
            .position(a)
            .unwrap()
            .distance(&molecule.position(b).unwrap())
    }

    fn min_atom_distance(molecule: &Molecule) -> f64 {
        let atoms: Vec<usize> = molecule.atoms().collect();
        let mut minimum = f64::MAX;
        for (index, &a) in atoms.iter().enumerate() {
            for &b in &atoms[index + 1..] {
                minimum = minimum.min(bond_distance(molecule, a, b));
            }
        }
        minimum
    }

    #[test]
    fn propane_gets_unit_bonds_and_a_bend() {
        let mut molecule = chain(3);
        layout(&mut molecule);
        assert_all_placed(&molecule);
        assert!((bond_distance(&molecule, 0, 1) - 1.0).abs() < 1e-9);
        assert!((bond_distance(&molecule, 1, 2) - 1.0).abs() < 1e-9);
        let center = molecule.position(1).unwrap();
        let left = molecule.position(0).unwrap() - center;
        let right = molecule.position(2).unwrap() - center;
        assert!((left.angle_between(&right) - 2.0 * PI / 3.0).abs() < 1e-6);
    }

    #[test]
    fn benzene_is_a_regular_hexagon() {
        let mut molecule = ring_molecule(6);
        layout(&mut molecule);
        assert_all_placed(&molecule);
        for edge in molecule.graph().active_edges() {
            let [a, b] = molecule.graph().endpoints(edge).unwrap();
            assert!((bond_distance(&molecule, a, b) - 1.0).abs() < 1e-9);
        }
        for atom in 0..6 {
            let center = molecule.position(atom).unwrap();
            let corner: Vec<Vector> = molecule
                .neighbors(atom)
                .map(|neighbor| molecule.position(neighbor).unwrap() - center)
                .collect();
            assert!(
                (corner[0].angle_between(&corner[1]) - 2.0 * PI / 3.0).abs() < 1e-6,
                "interior angle at atom {atom} is not 120 degrees"
            );
        }
        assert!(min_atom_distance(&molecule) > 0.99);
    }

    #[test]
    fn layout_is_idempotent() {
        let mut molecule = chain(4);
        layout(&mut molecule);
        let before: Vec<_> = molecule.atoms().map(|atom| molecule.position(atom)).collect();
        layout(&mut molecule);
        let after: Vec<_> = molecule.atoms().map(|atom| molecule.position(atom)).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn force_discards_existing_coordinates() {
        let mut molecule = chain(2);
        molecule.place(0, Vector::xy(5.0, 7.0));
        CoordsGenerator::calculate_coords(&mut molecule, 0.0, true).unwrap();
        assert_eq!(molecule.position(0), Some(Vector::default()));
        assert_eq!(molecule.position(1), Some(Vector::xy(1.0, 0.0)));
    }

    #[test]
    fn negative_bond_length_extends_at_existing_scale() {
        let mut molecule = chain(3);
        molecule.place(0, Vector::xy(0.0, 0.0));
        molecule.place(1, Vector::xy(2.0, 0.0));
        CoordsGenerator::calculate_coords(&mut molecule, -1.0, false).unwrap();
        assert_all_placed(&molecule);
        assert!((bond_distance(&molecule, 1, 2) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn triple_bond_keeps_the_chain_straight() {
        let mut molecule = chain(4);
        molecule.bond_mut(molecule.bond_between(1, 2).unwrap()).order = BondOrder::Triple;
        layout(&mut molecule);
        let origin = molecule.position(0).unwrap();
        let axis = molecule.position(1).unwrap() - origin;
        for atom in 2..4 {
            let offset = molecule.position(atom).unwrap() - origin;
            assert!(axis.cross_2d(&offset).abs() < 1e-9, "atom {atom} off axis");
        }
    }

    fn butene_with(relation: CisTransRelation) -> Molecule {
        let mut molecule = chain(4);
        molecule.bond_mut(molecule.bond_between(1, 2).unwrap()).order = BondOrder::Double;
        molecule.add_stereo(StereoDescriptor::CisTrans { path: [0, 1, 2, 3], relation });
        molecule
    }

    fn terminal_sides(molecule: &Molecule) -> (f64, f64) {
        let inner_a = molecule.position(1).unwrap();
        let inner_b = molecule.position(2).unwrap();
        let axis = inner_b - inner_a;
        let first = axis.cross_2d(&(molecule.position(0).unwrap() - inner_a));
        let second = axis.cross_2d(&(molecule.position(3).unwrap() - inner_a));
        (first, second)
    }

    #[test]
    fn cis_terminals_share_a_side() {
        let mut molecule = butene_with(CisTransRelation::Cis);
        layout(&mut molecule);
        let (first, second) = terminal_sides(&molecule);
        assert!(first * second > 0.0);
    }

    #[test]
    fn trans_terminals_take_opposite_sides() {
        let mut molecule = butene_with(CisTransRelation::Trans);
        layout(&mut molecule);
        let (first, second) = terminal_sides(&molecule);
        assert!(first * second < 0.0);
    }

    #[test]
    fn naphthalene_fuses_without_collisions() {
        let mut molecule = naphthalene();
        layout(&mut molecule);
        assert_all_placed(&molecule);
        for edge in molecule.graph().active_edges() {
            let [a, b] = molecule.graph().endpoints(edge).unwrap();
            assert!(
                (bond_distance(&molecule, a, b) - 1.0).abs() < 1e-6,
                "bond {a}-{b} is not unit length"
            );
        }
        assert!(min_atom_distance(&molecule) > 0.5);
    }

    #[test]
    fn spiro_rings_open_away_from_each_other() {
        let mut molecule = ring_molecule(6);
        for _ in 0..4 {
            molecule.add_atom(Atom::carbon());
        }
        for (a, b) in [(0, 6), (6, 7), (7, 8), (8, 9), (9, 0)] {
            molecule.add_bond(a, b, BondOrder::Single).unwrap();
        }
        layout(&mut molecule);
        assert_all_placed(&molecule);
        assert!(min_atom_distance(&molecule) > 0.3);
    }

    #[test]
    fn branches_spread_over_the_open_gap() {
        let mut molecule = chain(2);
        for _ in 0..3 {
            let branch = molecule.add_atom(Atom::carbon());
            molecule.add_bond(0, branch, BondOrder::Single).unwrap();
        }
        layout(&mut molecule);
        assert_all_placed(&molecule);
        let center = molecule.position(0).unwrap();
        let mut angles: Vec<f64> = molecule
            .neighbors(0)
            .map(|neighbor| {
                let offset = molecule.position(neighbor).unwrap() - center;
                assert!((offset.length() - 1.0).abs() < 1e-9);
                normalized_angle(offset.angle_2d())
            })
            .collect();
        angles.sort_by(|a, b| a.total_cmp(b));
        for pair in angles.windows(2) {
            assert!(pair[1] - pair[0] > 0.5, "neighbors bunched together");
        }
    }

    #[test]
    fn tetrahedral_center_gets_an_outgoing_wedge() {
        let mut molecule = chain(2);
        let second = molecule.add_atom(Atom::carbon());
        let third = molecule.add_atom(Atom::carbon());
        molecule.add_bond(1, second, BondOrder::Single).unwrap();
        molecule.add_bond(1, third, BondOrder::Single).unwrap();
        molecule.add_stereo(StereoDescriptor::Tetrahedral {
            center: 1,
            winding: Winding::Clockwise,
            refs: vec![
                StereoRef::Atom(0),
                StereoRef::Atom(second),
                StereoRef::Atom(third),
                StereoRef::ImplicitHydrogen,
            ],
        });
        layout(&mut molecule);
        assert_all_placed(&molecule);
        assert!(min_atom_distance(&molecule) > 0.5);
        let wedged: Vec<usize> = molecule
            .graph()
            .active_edges()
            .filter(|&edge| molecule.bond(edge).wedge != Wedge::None)
            .collect();
        assert_eq!(wedged.len(), 1);
        // the wedge points from the stereo center outwards
        assert_eq!(molecule.graph().endpoints(wedged[0]).unwrap()[0], 1);
    }

    #[test]
    fn disconnected_fragments_are_reseeded_east() {
        let mut molecule = chain(2);
        let c = molecule.add_atom(Atom::carbon());
        let d = molecule.add_atom(Atom::carbon());
        molecule.add_bond(c, d, BondOrder::Single).unwrap();
        let warnings = layout(&mut molecule);
        assert_all_placed(&molecule);
        assert!(warnings.contains(&Warning::DisconnectedInput));
        assert!(molecule.position(c).unwrap().x > molecule.position(1).unwrap().x);
    }

    #[test]
    fn disconnected_rings_stay_regular() {
        let mut molecule = ring_molecule(6);
        for _ in 0..6 {
            molecule.add_atom(Atom::carbon());
        }
        for i in 6..12 {
            let next = if i == 11 { 6 } else { i + 1 };
            molecule.add_bond(i, next, BondOrder::Single).unwrap();
        }
        let warnings = layout(&mut molecule);
        assert_all_placed(&molecule);
        assert!(warnings.contains(&Warning::DisconnectedInput));
        // the reseeded fragment closes into a proper polygon too
        for edge in molecule.graph().active_edges() {
            let [a, b] = molecule.graph().endpoints(edge).unwrap();
            assert!(
                (bond_distance(&molecule, a, b) - 1.0).abs() < 1e-6,
                "bond {a}-{b} is not unit length"
            );
        }
        assert!(min_atom_distance(&molecule) > 0.5);
    }

    #[test]
    fn single_atom_lands_at_the_origin() {
        let mut molecule = Molecule::new();
        molecule.add_atom(Atom::carbon());
        layout(&mut molecule);
        assert_eq!(molecule.position(0), Some(Vector::default()));
    }
}
