pub mod flat_knots;
pub mod knot_distribution;
pub mod knot_multiplicity;
pub mod knot_vector;
pub use flat_knots::*;
pub use knot_distribution::*;
pub use knot_multiplicity::*;
pub use knot_vector::*;

/// How a requested multiplicity combines with the one already present at a knot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MultiplicityMode {
    /// The requested multiplicity is added to the existing one.
    #[default]
    Add,
    /// The requested multiplicity is the target; existing multiplicities are never lowered.
    Set,
}
