use nalgebra::allocator::Allocator;
use nalgebra::{DefaultAllocator, DimName};

use crate::error::{ensure_construction, CurveError, Result};
use crate::knot::KnotVector;
use crate::misc::FloatingPoint;

use super::bspline_curve::MAX_DEGREE;
use super::flat_curve::PeriodicWindow;
use super::{BSplineCurve, ControlPolygon};

impl<T: FloatingPoint, D: DimName> BSplineCurve<T, D>
where
    DefaultAllocator: Allocator<D>,
{
    /// Raise the degree of the curve without changing its shape.
    ///
    /// Interior multiplicities grow with the degree so the continuity class is kept.
    /// A non-periodic curve with unclamped ends comes out clamped to its domain.
    ///
    /// # Failures
    /// - `degree` is lower than the current degree or above `MAX_DEGREE`
    ///
    /// # Example
    /// ```
    /// use bspline_curve::prelude::*;
    /// use nalgebra::Point2;
    /// use approx::assert_relative_eq;
    ///
    /// let poles = vec![
    ///     Point2::new(0., 0.),
    ///     Point2::new(1., 1.),
    ///     Point2::new(2., 0.),
    /// ];
    /// let mut curve = BSplineCurve2D::try_new(poles, vec![0., 1.], vec![3, 3], 2, false).unwrap();
    /// let before = curve.point_at(0.3);
    /// curve.increase_degree(4).unwrap();
    /// assert_eq!(curve.degree(), 4);
    /// assert_eq!(curve.nb_poles(), 5);
    /// assert_relative_eq!(curve.point_at(0.3), before, epsilon = 1e-12);
    /// ```
    pub fn increase_degree(&mut self, degree: usize) -> Result<()> {
        if degree == self.degree() {
            return Ok(());
        }
        ensure_construction!(
            degree > self.degree() && degree <= MAX_DEGREE,
            "cannot change degree {} to {}",
            self.degree(),
            degree
        );

        let step = degree - self.degree();
        let periodic = self.is_periodic();
        let (knot_vector, rows) = if periodic {
            let multiplicities = self
                .knots()
                .multiplicities()
                .iter()
                .map(|m| m + step)
                .collect();
            let knot_vector = KnotVector::try_new(self.knots().knots().to_vec(), multiplicities)?;
            let nb_poles = knot_vector.nb_poles(degree, true).ok_or_else(|| {
                CurveError::Construction("degree elevation breaks the seam".to_string())
            })?;

            let pad = PeriodicWindow::<T>::padding(self.nb_poles(), degree);
            let mut window = PeriodicWindow::new(
                self.degree(),
                self.knots(),
                &self.polygon().to_homogeneous(),
                pad,
            );
            window.elevate(step);
            (knot_vector, window.principal_poles(nb_poles))
        } else {
            let mut flat = self.to_flat();
            let (a, b) = flat.domain();
            flat.restrict(a, b);
            let elevated = flat.elevate(step);
            (elevated.knot_vector()?, elevated.points)
        };

        let polygon = ControlPolygon::from_homogeneous(&rows, self.is_rational());
        self.replace(degree, periodic, knot_vector, polygon);
        Ok(())
    }
}
