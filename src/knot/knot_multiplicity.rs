use itertools::Itertools;

/// A distinct knot value paired with its multiplicity.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct KnotMultiplicity<T> {
    knot: T,
    multiplicity: usize,
}

impl<T: Copy> KnotMultiplicity<T> {
    pub fn new(knot: T, multiplicity: usize) -> Self {
        Self { knot, multiplicity }
    }

    pub fn knot(&self) -> T {
        self.knot
    }

    pub fn multiplicity(&self) -> usize {
        self.multiplicity
    }
}

/// Groups a non-decreasing flat knot sequence into distinct knots.
/// Values are compared exactly: copies of a knot are bitwise copies.
pub(crate) fn group_flat_knots<T: Copy + PartialEq>(flat: &[T]) -> Vec<KnotMultiplicity<T>> {
    flat.iter()
        .dedup_with_count()
        .map(|(multiplicity, knot)| KnotMultiplicity::new(*knot, multiplicity))
        .collect()
}
