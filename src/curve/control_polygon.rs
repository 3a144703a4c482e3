use nalgebra::allocator::Allocator;
use nalgebra::{DVector, DefaultAllocator, DimName, OPoint, OVector};
use simba::scalar::SupersetOf;

use crate::error::{ensure_construction, Result};
use crate::misc::FloatingPoint;

/// Ordered poles with optional per-pole weights.
///
/// Weights are stored only for rational curves; a non-rational polygon
/// behaves as if every weight were one.
#[derive(Clone, Debug, PartialEq)]
pub struct ControlPolygon<T: FloatingPoint, D: DimName>
where
    DefaultAllocator: Allocator<D>,
{
    poles: Vec<OPoint<T, D>>,
    weights: Option<Vec<T>>,
}

/// Returns true if two consecutive weights differ by more than the resolution
pub fn weights_differ<T: FloatingPoint>(weights: &[T]) -> bool {
    weights
        .windows(2)
        .any(|w| (w[1] - w[0]).abs() > T::resolution())
}

impl<T: FloatingPoint, D: DimName> ControlPolygon<T, D>
where
    DefaultAllocator: Allocator<D>,
{
    /// Create a non-rational polygon
    /// # Failures
    /// - less than two poles
    pub fn try_new(poles: Vec<OPoint<T, D>>) -> Result<Self> {
        ensure_construction!(
            poles.len() >= 2,
            "at least two poles are required, got {}",
            poles.len()
        );
        Ok(Self {
            poles,
            weights: None,
        })
    }

    /// Create a weighted polygon
    /// With `check_rational`, weights that are all equal are dropped.
    /// # Failures
    /// - less than two poles
    /// - weight count differs from pole count
    /// - a weight does not exceed the resolution
    pub fn try_new_rational(
        poles: Vec<OPoint<T, D>>,
        weights: Vec<T>,
        check_rational: bool,
    ) -> Result<Self> {
        let mut polygon = Self::try_new(poles)?;
        ensure_construction!(
            weights.len() == polygon.poles.len(),
            "weight count {} differs from pole count {}",
            weights.len(),
            polygon.poles.len()
        );
        for (i, w) in weights.iter().enumerate() {
            ensure_construction!(
                *w > T::resolution(),
                "weight at index {} must be positive",
                i
            );
        }
        if !check_rational || weights_differ(&weights) {
            polygon.weights = Some(weights);
        }
        Ok(polygon)
    }

    pub fn len(&self) -> usize {
        self.poles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.poles.is_empty()
    }

    pub fn poles(&self) -> &[OPoint<T, D>] {
        &self.poles
    }

    pub fn pole(&self, index: usize) -> &OPoint<T, D> {
        &self.poles[index]
    }

    pub fn weights(&self) -> Option<&[T]> {
        self.weights.as_deref()
    }

    /// Weight of a pole, one for non-rational polygons
    pub fn weight(&self, index: usize) -> T {
        self.weights.as_ref().map_or(T::one(), |w| w[index])
    }

    pub fn is_rational(&self) -> bool {
        self.weights.is_some()
    }

    pub(crate) fn set_pole(&mut self, index: usize, pole: OPoint<T, D>) {
        self.poles[index] = pole;
    }

    pub(crate) fn translate_pole(&mut self, index: usize, delta: &OVector<T, D>) {
        self.poles[index] += delta;
    }

    /// Assign a weight, creating or dropping the weight buffer as rationality changes
    pub(crate) fn set_weight(&mut self, index: usize, weight: T) {
        let rational = self.is_rational() || (weight - T::one()).abs() > T::resolution();
        if !rational {
            return;
        }
        let n = self.poles.len();
        let weights = self.weights.get_or_insert_with(|| vec![T::one(); n]);
        weights[index] = weight;
        if !weights_differ(weights) {
            self.weights = None;
        }
    }

    /// Homogeneous form of a pole: weighted coordinates followed by the weight
    pub(crate) fn homogeneous(&self, index: usize) -> DVector<T> {
        let w = self.weight(index);
        DVector::from_iterator(
            D::dim() + 1,
            self.poles[index]
                .coords
                .iter()
                .map(|c| *c * w)
                .chain(std::iter::once(w)),
        )
    }

    pub(crate) fn to_homogeneous(&self) -> Vec<DVector<T>> {
        (0..self.poles.len()).map(|i| self.homogeneous(i)).collect()
    }

    /// Rebuild a polygon from homogeneous rows.
    /// The weights are kept only when `rational` is set.
    pub(crate) fn from_homogeneous(rows: &[DVector<T>], rational: bool) -> Self {
        let dim = D::dim();
        let poles = rows
            .iter()
            .map(|row| {
                let w = row[dim];
                OPoint::from(OVector::<T, D>::from_iterator(
                    row.iter().take(dim).map(|c| *c / w),
                ))
            })
            .collect();
        let weights = rational.then(|| rows.iter().map(|row| row[dim]).collect());
        Self { poles, weights }
    }

    /// Reverse the poles cyclically around `last`: pole `j` becomes pole `(last - j) mod n`
    pub(crate) fn reversed_around(&self, last: usize) -> Self {
        let n = self.poles.len();
        let l = last % n;
        let index = |j: usize| (l + n - j) % n;
        Self {
            poles: (0..n).map(|j| self.poles[index(j)].clone()).collect(),
            weights: self
                .weights
                .as_ref()
                .map(|w| (0..n).map(|j| w[index(j)]).collect()),
        }
    }

    /// Rotate so that pole `offset` becomes the first one
    pub(crate) fn rotated(&self, offset: usize) -> Self {
        let mut rotated = self.clone();
        let offset = offset % self.poles.len();
        rotated.poles.rotate_left(offset);
        if let Some(w) = rotated.weights.as_mut() {
            w.rotate_left(offset);
        }
        rotated
    }

    /// Keep the first `count` poles
    pub(crate) fn truncated(&self, count: usize) -> Self {
        Self {
            poles: self.poles[..count].to_vec(),
            weights: self.weights.as_ref().map(|w| w[..count].to_vec()),
        }
    }

    /// Repeat the poles cyclically up to `count` entries
    pub(crate) fn cycled(&self, count: usize) -> Self {
        let n = self.poles.len();
        Self {
            poles: (0..count).map(|j| self.poles[j % n].clone()).collect(),
            weights: self
                .weights
                .as_ref()
                .map(|w| (0..count).map(|j| w[j % n]).collect()),
        }
    }

    pub(crate) fn map_poles<F>(&mut self, f: F)
    where
        F: FnMut(&mut OPoint<T, D>),
    {
        self.poles.iter_mut().for_each(f);
    }

    /// Cast the polygon to another floating point type
    pub fn cast<F: FloatingPoint + SupersetOf<T>>(&self) -> ControlPolygon<F, D> {
        ControlPolygon {
            poles: self.poles.iter().map(|p| p.clone().cast()).collect(),
            weights: self
                .weights
                .as_ref()
                .map(|w| w.iter().map(|v| nalgebra::convert(*v)).collect()),
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use nalgebra::{Point2, Vector2, U2};

    use super::*;

    fn square() -> Vec<Point2<f64>> {
        vec![
            Point2::new(0., 0.),
            Point2::new(1., 0.),
            Point2::new(1., 1.),
            Point2::new(0., 1.),
        ]
    }

    #[test]
    fn construction() {
        assert!(ControlPolygon::try_new(vec![Point2::new(0., 0.)]).is_err());
        assert!(ControlPolygon::try_new_rational(square(), vec![1., 1., 1.], true).is_err());
        assert!(ControlPolygon::try_new_rational(square(), vec![1., 0., 1., 1.], true).is_err());

        let uniform = ControlPolygon::try_new_rational(square(), vec![2.; 4], true).unwrap();
        assert!(!uniform.is_rational());
        let kept = ControlPolygon::try_new_rational(square(), vec![2.; 4], false).unwrap();
        assert!(kept.is_rational());
        assert_eq!(kept.weight(3), 2.);
    }

    #[test]
    fn weight_toggles_rationality() {
        let mut polygon = ControlPolygon::try_new(square()).unwrap();
        polygon.set_weight(1, 1.);
        assert!(!polygon.is_rational());
        polygon.set_weight(1, 2.);
        assert!(polygon.is_rational());
        polygon.set_weight(1, 1.);
        assert!(!polygon.is_rational());
    }

    #[test]
    fn homogeneous_round_trip() {
        let polygon =
            ControlPolygon::try_new_rational(square(), vec![1., 2., 0.5, 1.], true).unwrap();
        let rows = polygon.to_homogeneous();
        assert_relative_eq!(rows[1][0], 2.);
        assert_relative_eq!(rows[1][2], 2.);
        let back = ControlPolygon::<f64, U2>::from_homogeneous(&rows, true);
        for (a, b) in back.poles().iter().zip(polygon.poles()) {
            assert_relative_eq!(a, b);
        }
        assert_eq!(back.weights(), polygon.weights());
    }

    #[test]
    fn cyclic_reorderings() {
        let mut polygon = ControlPolygon::try_new(square()).unwrap();
        let reversed = polygon.reversed_around(3);
        assert_eq!(reversed.pole(0), &Point2::new(0., 1.));
        assert_eq!(reversed.pole(3), &Point2::new(0., 0.));
        let wrapped = polygon.reversed_around(1);
        assert_eq!(wrapped.pole(0), &Point2::new(1., 0.));
        assert_eq!(wrapped.pole(1), &Point2::new(0., 0.));
        assert_eq!(wrapped.pole(2), &Point2::new(0., 1.));

        let rotated = polygon.rotated(5);
        assert_eq!(rotated.pole(0), &Point2::new(1., 0.));
        assert_eq!(polygon.cycled(6).pole(5), &Point2::new(1., 0.));
        assert_eq!(polygon.truncated(2).len(), 2);

        polygon.translate_pole(0, &Vector2::new(1., 1.));
        assert_eq!(polygon.pole(0), &Point2::new(1., 1.));
    }
}
