pub mod atom;
pub mod bond;
pub mod consts;
pub mod coords;
pub mod error;
pub mod graph;
pub mod molecule;
pub mod prelude;
pub mod rings;
pub mod stereo;
pub mod vector;
