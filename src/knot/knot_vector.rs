use std::ops::Index;

use itertools::Itertools;
use nalgebra::convert;
use simba::scalar::SupersetOf;

use crate::error::{ensure_construction, Result};
use crate::misc::FloatingPoint;

use super::{Continuity, KnotDistribution, KnotMultiplicity, MultiplicityForm};

/// Knot vector representation
/// Distinct, strictly increasing knot values, each carrying a positive multiplicity.
/// The flat (expanded) sequence consumed by evaluation is derived from it.
#[derive(Clone, Debug, PartialEq)]
pub struct KnotVector<T> {
    knots: Vec<T>,
    multiplicities: Vec<usize>,
}

impl<T: FloatingPoint> KnotVector<T> {
    /// Create a knot vector from distinct knots and their multiplicities
    /// # Failures
    /// - knots and multiplicities differ in length
    /// - less than two knots
    /// - a multiplicity is zero
    /// - two consecutive knots are not separated by more than the spacing of the lower one
    ///
    /// # Example
    /// ```
    /// use bspline_curve::prelude::*;
    /// let knots = KnotVector::try_new(vec![0., 1., 2.], vec![3, 1, 3]).unwrap();
    /// assert_eq!(knots.flatten(2, false), vec![0., 0., 0., 1., 2., 2., 2.]);
    /// assert!(KnotVector::try_new(vec![0., 0.], vec![1, 1]).is_err());
    /// ```
    pub fn try_new(knots: Vec<T>, multiplicities: Vec<usize>) -> Result<Self> {
        ensure_construction!(
            knots.len() == multiplicities.len(),
            "knots and multiplicities differ in length: {} != {}",
            knots.len(),
            multiplicities.len()
        );
        ensure_construction!(knots.len() >= 2, "at least two knots are required");
        ensure_construction!(
            multiplicities.iter().all(|m| *m > 0),
            "knot multiplicities must be positive"
        );
        for (i, w) in knots.windows(2).enumerate() {
            ensure_construction!(
                w[1] - w[0] > w[0].epsilon_at(),
                "knots must be strictly increasing at index {}",
                i + 1
            );
        }
        Ok(Self {
            knots,
            multiplicities,
        })
    }

    /// Knot vector with `count` unit-spaced knots starting at zero and the given end multiplicity
    pub fn uniform(count: usize, end_multiplicity: usize) -> Result<Self> {
        let knots = (0..count).map(|i| T::from_usize(i).unwrap()).collect();
        let mut multiplicities = vec![1; count];
        if let Some(first) = multiplicities.first_mut() {
            *first = end_multiplicity;
        }
        if let Some(last) = multiplicities.last_mut() {
            *last = end_multiplicity;
        }
        Self::try_new(knots, multiplicities)
    }

    pub fn len(&self) -> usize {
        self.knots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.knots.is_empty()
    }

    pub fn knots(&self) -> &[T] {
        &self.knots
    }

    pub fn multiplicities(&self) -> &[usize] {
        &self.multiplicities
    }

    pub fn knot(&self, index: usize) -> T {
        self.knots[index]
    }

    pub fn multiplicity(&self, index: usize) -> usize {
        self.multiplicities[index]
    }

    pub fn first(&self) -> T {
        self.knots[0]
    }

    pub fn last(&self) -> T {
        self.knots[self.knots.len() - 1]
    }

    /// Distance between the last and the first knot
    pub fn period(&self) -> T {
        self.last() - self.first()
    }

    pub fn iter(&self) -> impl Iterator<Item = KnotMultiplicity<T>> + '_ {
        self.knots
            .iter()
            .zip(self.multiplicities.iter())
            .map(|(k, m)| KnotMultiplicity::new(*k, *m))
    }

    /// Number of poles implied by the multiplicities, `None` for an invalid pattern
    /// # Example
    /// ```
    /// use bspline_curve::prelude::*;
    /// let knots = KnotVector::<f64>::try_new(vec![0., 1., 2., 3.], vec![4, 1, 1, 4]).unwrap();
    /// assert_eq!(knots.nb_poles(3, false), Some(6));
    /// assert_eq!(knots.nb_poles(2, false), None);
    /// let knots = KnotVector::<f64>::try_new(vec![0., 1., 2., 3.], vec![1, 1, 1, 1]).unwrap();
    /// assert_eq!(knots.nb_poles(3, true), Some(3));
    /// ```
    pub fn nb_poles(&self, degree: usize, periodic: bool) -> Option<usize> {
        let last = self.multiplicities.len() - 1;
        let first_mult = self.multiplicities[0];
        let last_mult = self.multiplicities[last];
        if first_mult == 0 || first_mult > degree + 1 || last_mult > degree + 1 {
            return None;
        }
        if periodic && (first_mult > degree || first_mult != last_mult) {
            return None;
        }
        if self.multiplicities[1..last]
            .iter()
            .any(|m| *m == 0 || *m > degree)
        {
            return None;
        }
        let sum: usize = self.multiplicities.iter().sum();
        if periodic {
            Some(sum - last_mult)
        } else {
            sum.checked_sub(degree + 1)
        }
    }

    /// Length of the flat knot sequence
    pub fn flat_len(&self, degree: usize, periodic: bool) -> usize {
        let sum: usize = self.multiplicities.iter().sum();
        if periodic {
            sum + 2 * (degree + 1 - self.multiplicities[0])
        } else {
            sum
        }
    }

    /// Expand the knots by multiplicity.
    /// A periodic vector gets `degree + 1 - m0` knots wrapped around each end
    /// so that the sequence describes the curve without explicit seam handling.
    /// # Example
    /// ```
    /// use bspline_curve::prelude::*;
    /// let knots = KnotVector::<f64>::try_new(vec![0., 1., 2., 3.], vec![1, 1, 1, 1]).unwrap();
    /// assert_eq!(
    ///     knots.flatten(2, true),
    ///     vec![-2., -1., 0., 1., 2., 3., 4., 5.]
    /// );
    /// ```
    pub fn flatten(&self, degree: usize, periodic: bool) -> Vec<T> {
        let mut flat = Vec::with_capacity(self.flat_len(degree, periodic));
        if !periodic {
            self.iter().for_each(|km| {
                flat.extend(std::iter::repeat_n(km.knot(), km.multiplicity()));
            });
            return flat;
        }

        let last = self.knots.len() - 1;
        let period = self.period();
        let ghosts = degree + 1 - self.multiplicities[0];

        let mut front = Vec::with_capacity(ghosts);
        let mut index = last;
        let mut shift = period;
        while front.len() < ghosts {
            if index == 0 {
                index = last;
                shift += period;
            }
            index -= 1;
            for _ in 0..self.multiplicities[index] {
                if front.len() < ghosts {
                    front.push(self.knots[index] - shift);
                }
            }
        }
        front.reverse();
        flat.extend(front);

        self.iter().for_each(|km| {
            flat.extend(std::iter::repeat_n(km.knot(), km.multiplicity()));
        });

        let mut back = 0;
        let mut index = 0;
        let mut shift = period;
        while back < ghosts {
            if index == last {
                index = 0;
                shift += period;
            }
            index += 1;
            for _ in 0..self.multiplicities[index] {
                if back < ghosts {
                    flat.push(self.knots[index] + shift);
                    back += 1;
                }
            }
        }
        flat
    }

    /// Index of the knot where the parametric domain starts
    pub fn first_knot_index(&self, degree: usize, periodic: bool) -> usize {
        if periodic {
            return 0;
        }
        let mut sigma = 0;
        for (i, m) in self.multiplicities.iter().enumerate() {
            sigma += m;
            if sigma > degree {
                return i;
            }
        }
        self.multiplicities.len() - 1
    }

    /// Index of the knot where the parametric domain ends
    pub fn last_knot_index(&self, degree: usize, periodic: bool) -> usize {
        let last = self.multiplicities.len() - 1;
        if periodic {
            return last;
        }
        let mut sigma = 0;
        for (i, m) in self.multiplicities.iter().enumerate().rev() {
            sigma += m;
            if sigma > degree {
                return i;
            }
        }
        0
    }

    /// Largest multiplicity strictly inside the domain, zero when there is no interior knot
    pub fn max_interior_multiplicity(&self, degree: usize, periodic: bool) -> usize {
        let first = self.first_knot_index(degree, periodic);
        let last = self.last_knot_index(degree, periodic);
        if last <= first + 1 {
            return 0;
        }
        self.multiplicities[first + 1..last]
            .iter()
            .copied()
            .max()
            .unwrap_or(0)
    }

    /// Classify the spacing and multiplicity pattern
    /// # Example
    /// ```
    /// use bspline_curve::prelude::*;
    /// let knots = KnotVector::<f64>::try_new(vec![0., 1., 2., 3.], vec![4, 1, 1, 4]).unwrap();
    /// assert_eq!(knots.distribution(3), KnotDistribution::QuasiUniform);
    /// let knots = KnotVector::<f64>::try_new(vec![0., 1., 2.5], vec![4, 3, 4]).unwrap();
    /// assert_eq!(knots.distribution(3), KnotDistribution::NonUniform);
    /// ```
    pub fn distribution(&self, degree: usize) -> KnotDistribution {
        if !self.is_equally_spaced() {
            return KnotDistribution::NonUniform;
        }
        match MultiplicityForm::of(&self.multiplicities) {
            MultiplicityForm::NonConstant => KnotDistribution::NonUniform,
            MultiplicityForm::Constant => {
                if self.knots.len() == 2 {
                    KnotDistribution::PiecewiseBezier
                } else if self.multiplicities[0] == 1 {
                    KnotDistribution::Uniform
                } else {
                    KnotDistribution::NonUniform
                }
            }
            MultiplicityForm::QuasiConstant => {
                if self.multiplicities[0] != degree + 1 {
                    KnotDistribution::NonUniform
                } else if self.multiplicities[1] == degree {
                    KnotDistribution::PiecewiseBezier
                } else if self.multiplicities[1] == 1 {
                    KnotDistribution::QuasiUniform
                } else {
                    KnotDistribution::NonUniform
                }
            }
        }
    }

    /// Continuity class over the interior of the domain
    pub fn continuity(&self, degree: usize, periodic: bool) -> Continuity {
        Continuity::from_max_multiplicity(
            degree,
            self.max_interior_multiplicity(degree, periodic),
        )
    }

    fn is_equally_spaced(&self) -> bool {
        if self.knots.len() < 3 {
            return true;
        }
        let first = self.knots[1] - self.knots[0];
        let eps = self.knots[0].epsilon_at() + self.knots[1].epsilon_at() + first.epsilon_at();
        self.knots
            .iter()
            .tuple_windows()
            .skip(1)
            .all(|(a, b)| ((*b - *a) - first).abs() <= eps)
    }

    /// Index of the first pole driving the span that starts at `knot_index`
    pub fn pole_index(&self, degree: usize, knot_index: usize, periodic: bool) -> usize {
        let cumulative: usize = self.multiplicities[..=knot_index].iter().sum();
        if periodic {
            let nb_poles: usize = self.multiplicities[..self.multiplicities.len() - 1]
                .iter()
                .sum();
            (cumulative - self.multiplicities[0]) % nb_poles.max(1)
        } else {
            cumulative.saturating_sub(degree + 1)
        }
    }

    /// Index of the knot closest to `u` and the signed offset `knot - u`
    pub fn nearest(&self, u: T) -> (usize, T) {
        let mut index = 0;
        let mut delta = self.knots[0] - u;
        for (i, k) in self.knots.iter().enumerate().skip(1) {
            let d = *k - u;
            if d.abs() < delta.abs() {
                index = i;
                delta = d;
            }
        }
        (index, delta)
    }

    /// Knots mirrored through `sum / 2` with the multiplicities reversed
    pub(crate) fn mirrored(&self, sum: T) -> Self {
        Self {
            knots: self.knots.iter().rev().map(|k| sum - *k).collect(),
            multiplicities: self.multiplicities.iter().rev().copied().collect(),
        }
    }

    /// Every knot shifted by `delta`
    pub(crate) fn shifted(&self, delta: T) -> Self {
        Self {
            knots: self.knots.iter().map(|k| *k + delta).collect(),
            multiplicities: self.multiplicities.clone(),
        }
    }

    /// Cast the knot vector to another floating point type
    /// # Example
    /// ```
    /// use bspline_curve::prelude::*;
    /// let knots = KnotVector::<f64>::try_new(vec![1., 2., 3.], vec![2, 1, 2]).unwrap();
    /// let knots = knots.cast::<f32>();
    /// assert_eq!(knots.first(), 1.0f32);
    /// ```
    pub fn cast<F: FloatingPoint + SupersetOf<T>>(&self) -> KnotVector<F> {
        KnotVector {
            knots: self.knots.iter().map(|v| convert(*v)).collect(),
            multiplicities: self.multiplicities.clone(),
        }
    }
}

impl<T> Index<usize> for KnotVector<T> {
    type Output = T;
    fn index(&self, index: usize) -> &Self::Output {
        &self.knots[index]
    }
}

impl<T: FloatingPoint> TryFrom<Vec<KnotMultiplicity<T>>> for KnotVector<T> {
    type Error = crate::error::CurveError;

    fn try_from(value: Vec<KnotMultiplicity<T>>) -> Result<Self> {
        let (knots, multiplicities) = value
            .into_iter()
            .map(|km| (km.knot(), km.multiplicity()))
            .unzip();
        Self::try_new(knots, multiplicities)
    }
}
