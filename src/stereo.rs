use nohash_hasher::IntMap;

/// Relation of the two terminal reference atoms across a double bond.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum CisTransRelation {
    /// Same side of the double-bond axis.
    Cis,
    /// Opposite sides of the double-bond axis.
    Trans,
}

/// Winding of the ordered neighbor references around a tetrahedral center,
/// as seen in the drawing plane.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Winding {
    Clockwise,
    Anticlockwise,
}

impl Winding {
    pub fn reverse(&self) -> Winding {
        match self {
            Winding::Clockwise => Winding::Anticlockwise,
            Winding::Anticlockwise => Winding::Clockwise,
        }
    }
}

/// A neighbor reference in a tetrahedral descriptor.
///
/// When a center has only three explicit neighbors the fourth slot is the
/// synthetic explicit-hydrogen placeholder.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum StereoRef {
    Atom(usize),
    ImplicitHydrogen,
}

impl StereoRef {
    pub fn atom(&self) -> Option<usize> {
        match self {
            StereoRef::Atom(index) => Some(*index),
            StereoRef::ImplicitHydrogen => None,
        }
    }
}

/// A declared geometric constraint the layout must reproduce.
#[derive(Debug, Clone, PartialEq)]
pub enum StereoDescriptor {
    /// `path` is the chain `r1 - i1 = i2 - r2`: two terminal reference atoms
    /// joined through the two inner atoms of the double bond.
    CisTrans {
        path: [usize; 4],
        relation: CisTransRelation,
    },
    /// An atom center with a winding over its (up to four) ordered neighbor
    /// references.
    Tetrahedral {
        center: usize,
        winding: Winding,
        refs: Vec<StereoRef>,
    },
}

impl StereoDescriptor {
    /// The two inner atoms of a cis/trans descriptor, i.e. the double bond.
    pub fn inner_pair(&self) -> Option<(usize, usize)> {
        match self {
            StereoDescriptor::CisTrans { path, .. } => Some((path[1], path[2])),
            StereoDescriptor::Tetrahedral { .. } => None,
        }
    }
}

/// One-pass index over a molecule's stereo descriptors.
///
/// Cis/trans descriptors are bucketed by their terminal reference atoms,
/// tetrahedral descriptors by their center, so placement can decide in O(1)
/// whether the atom it is about to put down carries a constraint.
#[derive(Debug, Default)]
pub struct StereoIndex {
    by_terminal: IntMap<usize, usize>,
    by_center: IntMap<usize, usize>,
}

impl StereoIndex {
    pub fn build(descriptors: &[StereoDescriptor]) -> StereoIndex {
        let mut index = StereoIndex::default();
        for (position, descriptor) in descriptors.iter().enumerate() {
            match descriptor {
                StereoDescriptor::CisTrans { path, .. } => {
                    index.by_terminal.insert(path[0], position);
                    index.by_terminal.insert(path[3], position);
                }
                StereoDescriptor::Tetrahedral { center, .. } => {
                    index.by_center.insert(*center, position);
                }
            }
        }
        index
    }

    /// Descriptor whose terminal reference is `atom`, if any.
    pub fn cis_trans_for_terminal<'a>(
        &self,
        descriptors: &'a [StereoDescriptor],
        atom: usize,
    ) -> Option<&'a StereoDescriptor> {
        self.by_terminal
            .get(&atom)
            .map(|&position| &descriptors[position])
    }

    /// Tetrahedral descriptor centered on `atom`, if any.
    pub fn tetrahedral_at<'a>(
        &self,
        descriptors: &'a [StereoDescriptor],
        atom: usize,
    ) -> Option<&'a StereoDescriptor> {
        self.by_center
            .get(&atom)
            .map(|&position| &descriptors[position])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_lookup_finds_both_ends() {
        let descriptors = vec![StereoDescriptor::CisTrans {
            path: [0, 1, 2, 3],
            relation: CisTransRelation::Cis,
        }];
        let index = StereoIndex::build(&descriptors);
        assert!(index.cis_trans_for_terminal(&descriptors, 0).is_some());
        assert!(index.cis_trans_for_terminal(&descriptors, 3).is_some());
        assert!(index.cis_trans_for_terminal(&descriptors, 1).is_none());
    }

    #[test]
    fn inner_pair_is_the_double_bond() {
        let cis_trans = StereoDescriptor::CisTrans {
            path: [7, 1, 2, 9],
            relation: CisTransRelation::Trans,
        };
        assert_eq!(cis_trans.inner_pair(), Some((1, 2)));
        let tetrahedral = StereoDescriptor::Tetrahedral {
            center: 4,
            winding: Winding::Anticlockwise,
            refs: vec![StereoRef::Atom(1), StereoRef::ImplicitHydrogen],
        };
        assert_eq!(tetrahedral.inner_pair(), None);
    }

    #[test]
    fn center_lookup() {
        let descriptors = vec![StereoDescriptor::Tetrahedral {
            center: 5,
            winding: Winding::Clockwise,
            refs: vec![
                StereoRef::Atom(1),
                StereoRef::Atom(2),
                StereoRef::Atom(3),
                StereoRef::ImplicitHydrogen,
            ],
        }];
        let index = StereoIndex::build(&descriptors);
        assert!(index.tetrahedral_at(&descriptors, 5).is_some());
        assert!(index.tetrahedral_at(&descriptors, 1).is_none());
    }
}
