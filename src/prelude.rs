pub use crate::{
    atom::Atom,
    bond::{BondOrder, Wedge},
    coords::CoordsGenerator,
    error::{InvariantError, Warning},
    graph::Graph,
    molecule::Molecule,
    stereo::{CisTransRelation, StereoDescriptor, StereoRef, Winding},
    vector::Vector,
};
