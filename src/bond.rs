use core::fmt::{Display, Formatter};

#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, PartialOrd, Ord)]
pub enum BondOrder {
    #[default]
    Single,
    Double,
    Triple,
    Aromatic,
}

impl BondOrder {
    pub fn order(&self) -> u8 {
        match self {
            BondOrder::Single => 1,
            BondOrder::Double => 2,
            BondOrder::Triple => 3,
            BondOrder::Aromatic => 1,
        }
    }
}

impl Display for BondOrder {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            BondOrder::Single => write!(f, "-"),
            BondOrder::Double => write!(f, "="),
            BondOrder::Triple => write!(f, "#"),
            BondOrder::Aromatic => write!(f, ":"),
        }
    }
}

/// Out-of-plane rendering of a bond at a stereo center.
///
/// Written by the layout engine when a tetrahedral descriptor is resolved;
/// the wedge narrows at the first endpoint of the underlying edge.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
pub enum Wedge {
    #[default]
    None,
    /// Solid wedge, bond points towards the viewer.
    Solid,
    /// Hashed wedge, bond points away from the viewer.
    Hash,
}

/// Per-bond payload stored next to the graph edge of the same index.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Bond {
    pub order: BondOrder,
    pub wedge: Wedge,
}

impl Bond {
    pub fn new(order: BondOrder) -> Bond {
        Bond {
            order,
            wedge: Wedge::None,
        }
    }

    pub fn single() -> Bond {
        Bond::new(BondOrder::Single)
    }

    pub fn double() -> Bond {
        Bond::new(BondOrder::Double)
    }

    pub fn triple() -> Bond {
        Bond::new(BondOrder::Triple)
    }

    pub fn order(&self) -> BondOrder {
        self.order
    }

    pub fn wedge(&self) -> Wedge {
        self.wedge
    }
}
