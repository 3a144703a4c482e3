mod bspline_curve;
mod control_polygon;
mod degree_elevation;
mod evaluation;
mod flat_curve;
mod knot_editing;
mod knot_insertion;
mod knot_removal;
mod local_modification;
mod periodicity;
mod segment;
mod span_cache;
pub use bspline_curve::*;
pub use control_polygon::*;
pub use local_modification::*;
pub use span_cache::*;

#[cfg(test)]
mod tests;
