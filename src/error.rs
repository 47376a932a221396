use core::fmt::{Display, Formatter};
use thiserror::Error;

/// Structural inconsistencies that should be unreachable with a well-formed
/// molecule. These abort the current operation; the caller is expected to fix
/// the input graph or drop the attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantError {
    #[error("vertex {vertex} has no neighbor {target} to remove")]
    MissingNeighbor { vertex: usize, target: usize },
    #[error("vertex {0} is not part of this graph")]
    UnknownVertex(usize),
    #[error("edge {0} is not part of this graph")]
    UnknownEdge(usize),
    #[error("an edge between vertices {0} and {1} already exists")]
    DuplicateEdge(usize, usize),
    #[error("a loop edge at vertex {0} is not allowed")]
    LoopEdge(usize),
    #[error("ring junction at atom {0} has fewer than two placed neighbors")]
    DegenerateRingJunction(usize),
    #[error("no open path with two endpoints in a ring of size {0}")]
    MissingPathEndpoints(usize),
}

/// Advisory conditions collected during ring perception and layout.
///
/// Warnings never abort a computation; the algorithms fall back to a
/// best-effort result and report what happened.
#[derive(Debug, Clone, PartialEq)]
pub enum Warning {
    /// The number of independent rings found differs from `|E| - |V| + 1`.
    RingCountMismatch { expected: usize, found: usize },
    /// The graph has several components where one was required.
    MalformedComponent { vertices: usize, edges: usize, components: usize },
    /// A multiply-fused ring needed a dry-run scaling correction.
    RescaledFusedRing { ring_size: usize },
    /// Two same-size rings would coincide; the start angle was nudged.
    NudgedRingAngle { ring_size: usize },
    /// Layout input was disconnected; extra components were reseeded.
    DisconnectedInput,
}

impl Display for Warning {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Warning::RingCountMismatch { expected, found } => {
                write!(f, "expected {expected} independent rings, found {found}")
            }
            Warning::MalformedComponent { vertices, edges, components } => {
                write!(
                    f,
                    "graph with {vertices} vertices and {edges} edges splits into {components} components"
                )
            }
            Warning::RescaledFusedRing { ring_size } => {
                write!(f, "bridged ring of size {ring_size} required a scaling correction")
            }
            Warning::NudgedRingAngle { ring_size } => {
                write!(f, "ring of size {ring_size} coincided with its backbone, start angle nudged")
            }
            Warning::DisconnectedInput => {
                write!(f, "molecule is disconnected, extra fragments laid out separately")
            }
        }
    }
}
