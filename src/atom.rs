use crate::vector::Vector;

/// A single atom: an element plus an optional 2D position.
///
/// `position` starts out as `None` and is filled in by the coordinate
/// generator; `None` is the "unset" sentinel the layout propagates from.
#[derive(Default, Debug, Clone, PartialEq)]
pub struct Atom {
    pub atomic_number: u8,
    pub position: Option<Vector>,
}

impl Atom {
    pub fn new(atomic_number: u8) -> Atom {
        Atom {
            atomic_number,
            ..Default::default()
        }
    }

    /// Plain carbon, the default building block of sketch fixtures.
    pub fn carbon() -> Atom {
        Atom::new(6)
    }

    pub fn with_position(mut self, position: (f64, f64)) -> Self {
        self.position = Some(Vector::xy(position.0, position.1));
        self
    }

    pub fn atomic_number(&self) -> u8 {
        self.atomic_number
    }

    pub fn position(&self) -> Option<Vector> {
        self.position
    }

    pub fn is_placed(&self) -> bool {
        self.position.is_some()
    }

    /// Calculates the distance between two placed atoms.
    ///
    /// Returns 0.0 when either atom has no position yet.
    ///
    /// # Example
    /// ```
    /// use moldraw::prelude::*;
    /// let atom1 = Atom::carbon().with_position((0.0, 0.0));
    /// let atom2 = Atom::carbon().with_position((1.0, 0.0));
    /// assert_eq!(atom1.distance(&atom2), 1.0);
    /// ```
    pub fn distance(&self, other: &Atom) -> f64 {
        let Some(self_position) = self.position else {
            return 0.0;
        };
        let Some(other_position) = other.position else {
            return 0.0;
        };
        self_position.distance(&other_position)
    }
}
