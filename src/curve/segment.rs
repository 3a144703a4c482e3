use nalgebra::allocator::Allocator;
use nalgebra::{DefaultAllocator, DimName};

use crate::error::{CurveError, Result};
use crate::knot::KnotVector;
use crate::misc::FloatingPoint;

use super::{BSplineCurve, ControlPolygon};

impl<T: FloatingPoint, D: DimName> BSplineCurve<T, D>
where
    DefaultAllocator: Allocator<D>,
{
    /// Reverse the direction of the curve.
    /// The point at `u` moves to `reversed_parameter(u)`.
    pub fn reverse(&mut self) {
        let (first, last) = self.knots_domain();
        let knots = self.knots().mirrored(first + last);
        let last_pole = if self.is_periodic() {
            self.flat_knots().len() - self.degree() - 2
        } else {
            self.nb_poles() - 1
        };
        let polygon = self.polygon().reversed_around(last_pole);
        self.replace(self.degree(), self.is_periodic(), knots, polygon);
    }

    /// Keep the part of the curve between `u1` and `u2`, see `segment_with_tolerance`.
    /// Bounds only snap onto knots closer than the floating-point spacing allows.
    pub fn segment(&mut self, u1: T, u2: T) -> Result<()> {
        self.segment_with_tolerance(u1, u2, T::zero())
    }

    /// Keep the part of the curve between `u1` and `u2`.
    ///
    /// The result is clamped at both ends. Bounds closer than `tolerance` to a knot snap
    /// onto it, as do bounds within `100` spacings at the largest of the bounds and the
    /// domain ends. On a periodic curve the segment may cross the seam; its length is taken
    /// modulo the period, a whole period when it reduces to zero.
    ///
    /// # Failures
    /// - `u2 < u1`
    /// - a bound is outside of the domain of a non-periodic curve
    /// - the segment has no length
    ///
    /// # Example
    /// ```
    /// use bspline_curve::prelude::*;
    /// use nalgebra::Point2;
    /// use approx::assert_relative_eq;
    ///
    /// let poles = vec![
    ///     Point2::new(0., 0.),
    ///     Point2::new(1., 2.),
    ///     Point2::new(3., 2.),
    ///     Point2::new(4., 0.),
    /// ];
    /// let curve = BSplineCurve2D::try_new(poles, vec![0., 1.], vec![4, 4], 3, false).unwrap();
    /// let mut segment = curve.clone();
    /// segment.segment_with_tolerance(0.25, 0.75, 1e-9).unwrap();
    /// assert_eq!(segment.knots_domain(), (0.25, 0.75));
    /// assert_relative_eq!(segment.point_at(0.5), curve.point_at(0.5), epsilon = 1e-12);
    /// ```
    pub fn segment_with_tolerance(&mut self, u1: T, u2: T, tolerance: T) -> Result<()> {
        if u2 < u1 {
            return Err(CurveError::Domain(format!(
                "segment bounds are reversed: {:?} > {:?}",
                u1, u2
            )));
        }
        if self.is_periodic() {
            self.periodic_segment(u1, u2, tolerance)
        } else {
            self.bounded_segment(u1, u2, tolerance)
        }
    }

    fn bounded_segment(&mut self, u1: T, u2: T, tolerance: T) -> Result<()> {
        let (first, last) = self.knots_domain();
        if u1 < first - tolerance || u2 > last + tolerance {
            return Err(CurveError::Domain(format!(
                "segment [{:?}, {:?}] is outside of the domain [{:?}, {:?}]",
                u1, u2, first, last
            )));
        }
        let eps = self.snap_distance(u1, u2, tolerance);
        let a = snap(self.knots(), u1.max(first), eps);
        let b = snap(self.knots(), u2.min(last), eps);
        if b - a <= eps {
            return Err(CurveError::Domain("segment has no length".to_string()));
        }

        let mut flat = self.to_flat();
        flat.restrict(a, b);
        let knot_vector = flat.knot_vector()?;
        let polygon = ControlPolygon::from_homogeneous(&flat.points, self.is_rational());
        self.replace(self.degree(), false, knot_vector, polygon);
        Ok(())
    }

    fn periodic_segment(&mut self, u1: T, u2: T, tolerance: T) -> Result<()> {
        let period = self.period()?;
        let eps = self.snap_distance(u1, u2, tolerance);
        let length = u2 - u1;
        if length == T::zero() {
            return Err(CurveError::Domain("segment has no length".to_string()));
        }
        let reduced = length - period * (length / period).floor();
        let length = if reduced <= eps || period - reduced <= eps {
            period
        } else {
            reduced
        };

        let mut curve = self.clone();
        curve.set_origin_at(u1, eps)?;
        curve.set_not_periodic()?;

        let (first, last) = curve.knots_domain();
        let end = snap(curve.knots(), (first + length).min(last), eps);
        let mut flat = curve.to_flat();
        flat.restrict(first, end);
        let restricted = flat.knot_vector()?;

        // re-anchor so that the domain is exactly [u1, u1 + length]
        let shift = u1 - first;
        let mut values: Vec<T> = restricted.knots().iter().map(|k| *k + shift).collect();
        if let Some(v) = values.last_mut() {
            *v = u1 + length;
        }
        let knot_vector = KnotVector::try_new(values, restricted.multiplicities().to_vec())?;
        let polygon = ControlPolygon::from_homogeneous(&flat.points, self.is_rational());
        self.replace(self.degree(), false, knot_vector, polygon);
        Ok(())
    }

    fn snap_distance(&self, u1: T, u2: T, tolerance: T) -> T {
        let (first, last) = self.knots_domain();
        let scale = u1.abs().max(u2.abs()).max(first.abs()).max(last.abs());
        (scale.epsilon_at() * T::from_f64(100.).unwrap()).max(tolerance)
    }
}

/// The knot closest to `u` when within `eps`, `u` otherwise
fn snap<T: FloatingPoint>(knots: &KnotVector<T>, u: T, eps: T) -> T {
    let (index, delta) = knots.nearest(u);
    if delta.abs() <= eps {
        knots.knot(index)
    } else {
        u
    }
}
