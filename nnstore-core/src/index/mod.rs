//! Nearest-neighbour indexing: the closed Lp distance family and the
//! vantage-point tree built over it.

pub mod distance;
pub mod vptree;

pub use distance::LpDistance;
pub use vptree::{VpElement, VpTree, MAX_NN};
