use nalgebra::allocator::Allocator;
use nalgebra::{DefaultAllocator, DimName};

use crate::error::{check_index, CurveError, Result};
use crate::knot::{group_flat_knots, KnotVector, MultiplicityMode};
use crate::misc::FloatingPoint;

use super::BSplineCurve;

impl<T: FloatingPoint, D: DimName> BSplineCurve<T, D>
where
    DefaultAllocator: Allocator<D>,
{
    /// Make the curve periodic over its current domain.
    ///
    /// The knots outside of the domain are dropped and the end multiplicities become
    /// `min(degree, max(first, last))`. The shape is kept when the curve is closed.
    ///
    /// # Example
    /// ```
    /// use bspline_curve::prelude::*;
    /// use nalgebra::Point2;
    ///
    /// let poles = vec![
    ///     Point2::new(0., 0.),
    ///     Point2::new(1., 0.),
    ///     Point2::new(1., 1.),
    ///     Point2::new(0., 1.),
    ///     Point2::new(0., 0.),
    /// ];
    /// let mut curve =
    ///     BSplineCurve2D::try_new(poles, vec![0., 1., 2., 3.], vec![3, 1, 1, 3], 2, false).unwrap();
    /// curve.set_periodic().unwrap();
    /// assert!(curve.is_periodic());
    /// assert_eq!(curve.nb_poles(), 4);
    /// assert_eq!(curve.knots().multiplicities(), &[2, 1, 1, 2]);
    /// ```
    pub fn set_periodic(&mut self) -> Result<()> {
        if self.is_periodic() {
            return Ok(());
        }
        let degree = self.degree();
        let first = self.first_knot_index();
        let last = self.last_knot_index();
        if last <= first {
            return Err(CurveError::Domain(
                "the curve domain holds a single knot".to_string(),
            ));
        }

        let knots = self.knots().knots()[first..=last].to_vec();
        let mut multiplicities = self.knots().multiplicities()[first..=last].to_vec();
        let end = degree.min(multiplicities[0].max(multiplicities[last - first]));
        multiplicities[0] = end;
        multiplicities[last - first] = end;

        let knot_vector = KnotVector::try_new(knots, multiplicities)?;
        let nb_poles = knot_vector
            .nb_poles(degree, true)
            .filter(|n| *n <= self.nb_poles())
            .ok_or_else(|| {
                CurveError::Construction("the poles cannot be wrapped around".to_string())
            })?;
        let polygon = self.polygon().truncated(nb_poles);
        self.replace(degree, true, knot_vector, polygon);
        Ok(())
    }

    /// Unwrap a periodic curve into the equivalent non-periodic curve.
    /// The knots and poles around the seam are duplicated, so the shape is unchanged.
    pub fn set_not_periodic(&mut self) -> Result<()> {
        if !self.is_periodic() {
            return Ok(());
        }
        let degree = self.degree();
        let count = self.flat_knots().len() - degree - 1;
        let knot_vector = KnotVector::try_from(group_flat_knots(self.flat_knots().as_slice()))?;
        let polygon = self.polygon().cycled(count);
        self.replace(degree, false, knot_vector, polygon);
        Ok(())
    }

    /// Move the seam of a periodic curve to the knot at `index`.
    ///
    /// # Failures
    /// - the curve is not periodic
    /// - `index` is not a knot index
    pub fn set_origin(&mut self, index: usize) -> Result<()> {
        if !self.is_periodic() {
            return Err(CurveError::Domain(
                "the origin of a non-periodic curve is fixed".to_string(),
            ));
        }
        let last = self.nb_knots() - 1;
        check_index(index, 0, last)?;
        if index == 0 || index == last {
            return Ok(());
        }

        let knots = self.knots();
        let period = knots.period();
        let values: Vec<T> = knots.knots()[index..=last]
            .iter()
            .copied()
            .chain(knots.knots()[1..=index].iter().map(|k| *k + period))
            .collect();
        let multiplicities: Vec<usize> = knots.multiplicities()[index..=last]
            .iter()
            .chain(knots.multiplicities()[1..=index].iter())
            .copied()
            .collect();
        let offset = knots.pole_index(self.degree(), index, true);

        let knot_vector = KnotVector::try_new(values, multiplicities)?;
        let polygon = self.polygon().rotated(offset);
        self.replace(self.degree(), true, knot_vector, polygon);
        Ok(())
    }

    /// Move the seam of a periodic curve to the parameter `u`.
    ///
    /// `u` is brought into the period first; the knots are shifted so that the new origin
    /// is `u` itself. A knot is inserted at `u` unless one lies within `tolerance`.
    ///
    /// # Example
    /// ```
    /// use bspline_curve::prelude::*;
    /// use nalgebra::Point2;
    /// use approx::assert_relative_eq;
    ///
    /// let poles = vec![
    ///     Point2::new(0., 0.),
    ///     Point2::new(1., 0.),
    ///     Point2::new(1., 1.),
    ///     Point2::new(0., 1.),
    /// ];
    /// let mut curve =
    ///     BSplineCurve2D::try_new(poles, vec![0., 1., 2., 3., 4.], vec![1; 5], 2, true).unwrap();
    /// let p = curve.point_at(1.5);
    /// curve.set_origin_at(1.5, 1e-9).unwrap();
    /// assert_relative_eq!(curve.first_parameter(), 1.5);
    /// assert_relative_eq!(curve.start_point(), p, epsilon = 1e-12);
    /// ```
    pub fn set_origin_at(&mut self, u: T, tolerance: T) -> Result<()> {
        if !self.is_periodic() {
            return Err(CurveError::Domain(
                "the origin of a non-periodic curve is fixed".to_string(),
            ));
        }
        let (first, last) = self.knots_domain();
        let period = last - first;
        let mut v = u;
        while tolerance < first - v {
            v += period;
        }
        while tolerance > last - v {
            v -= period;
        }

        if (u - v).abs() > tolerance {
            let shifted = self.knots().shifted(u - v);
            self.replace_knot_values(shifted);
        }
        if (u - self.first_parameter()).abs() < tolerance {
            return Ok(());
        }

        let (mut index, delta) = self.knots().nearest(u);
        if delta.abs() > tolerance {
            self.insert_knot(u, 1, T::zero(), MultiplicityMode::Add)?;
            if delta < T::zero() {
                index += 1;
            }
        }
        self.set_origin(index)
    }
}
