// Unit bond length used when the caller passes 0; editors scale afterwards
pub const DEFAULT_BOND_LENGTH: f64 = 1.0;
// Coordinates closer than this are treated as coincident
pub const GEOMETRY_TOLERANCE: f64 = 1e-9;
// Nudge applied when two same-size rings would be laid on top of each other
pub const ANGLE_SHIFT: f64 = 0.35;
// Hard cap on ring-perception passes, guards against pathological inputs
pub const MAX_RING_PASSES: usize = 256;
