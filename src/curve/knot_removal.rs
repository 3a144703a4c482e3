use nalgebra::allocator::Allocator;
use nalgebra::{DefaultAllocator, DimName};

use crate::error::{check_index, CurveError, Result};
use crate::knot::KnotVector;
use crate::misc::FloatingPoint;

use super::flat_curve::PeriodicWindow;
use super::{BSplineCurve, ControlPolygon};

impl<T: FloatingPoint, D: DimName> BSplineCurve<T, D>
where
    DefaultAllocator: Allocator<D>,
{
    /// Reduce the multiplicity of the knot at `index` to `multiplicity`.
    ///
    /// Returns `Ok(false)` and leaves the curve untouched when the shape cannot be kept
    /// within `tolerance`. A target at or above the current multiplicity is a success
    /// without any change.
    ///
    /// # Failures
    /// - `index` is not an interior knot (any knot for periodic curves)
    /// - the seam knot of a periodic curve would disappear
    ///
    /// # Example
    /// ```
    /// use bspline_curve::prelude::*;
    /// use nalgebra::Point2;
    ///
    /// let poles = vec![
    ///     Point2::new(0., 0.),
    ///     Point2::new(1., 2.),
    ///     Point2::new(3., 2.),
    ///     Point2::new(4., 0.),
    /// ];
    /// let mut curve = BSplineCurve2D::try_new(poles, vec![0., 1.], vec![4, 4], 3, false).unwrap();
    /// curve.insert_knot(0.25, 1, 0., MultiplicityMode::Add).unwrap();
    /// assert_eq!(curve.nb_knots(), 3);
    /// assert!(curve.remove_knot(1, 0, 1e-9).unwrap());
    /// assert_eq!(curve.nb_knots(), 2);
    /// ```
    pub fn remove_knot(&mut self, index: usize, multiplicity: usize, tolerance: T) -> Result<bool> {
        let periodic = self.is_periodic();
        let first = self.first_knot_index();
        let last = self.last_knot_index();
        if periodic {
            check_index(index, first, last)?;
        } else {
            check_index(index, first + 1, last.saturating_sub(1))?;
        }

        let index = if periodic && index == self.nb_knots() - 1 {
            0
        } else {
            index
        };
        let current = self.knots().multiplicity(index);
        if multiplicity >= current {
            return Ok(true);
        }
        if periodic && index == 0 && multiplicity == 0 {
            return Err(CurveError::Domain(
                "the seam knot of a periodic curve cannot be removed".to_string(),
            ));
        }

        let knot_vector = self.reduced_knots(index, multiplicity)?;
        let degree = self.degree();
        let nb_poles = knot_vector.nb_poles(degree, periodic).ok_or_else(|| {
            CurveError::Construction("knot removal breaks the pole count relation".to_string())
        })?;

        let u = self.knots().knot(index);
        let times = current - multiplicity;
        let rows = if periodic {
            let pad = PeriodicWindow::<T>::padding(self.nb_poles(), degree);
            let mut window = PeriodicWindow::new(
                degree,
                self.knots(),
                &self.polygon().to_homogeneous(),
                pad,
            );
            if !window.remove(u, times, tolerance) {
                log::warn!(
                    "knot {:?} cannot be reduced to multiplicity {} within {:?}",
                    u,
                    multiplicity,
                    tolerance
                );
                return Ok(false);
            }
            window.principal_poles(nb_poles)
        } else {
            let mut flat = self.to_flat();
            for _ in 0..times {
                if !flat.remove_once(u, Some(tolerance)) {
                    log::warn!(
                        "knot {:?} cannot be reduced to multiplicity {} within {:?}",
                        u,
                        multiplicity,
                        tolerance
                    );
                    return Ok(false);
                }
            }
            flat.points
        };

        let polygon = ControlPolygon::from_homogeneous(&rows, self.is_rational());
        self.replace(degree, periodic, knot_vector, polygon);
        Ok(true)
    }

    /// Knot vector with the multiplicity at `index` lowered, dropping the knot at zero
    fn reduced_knots(&self, index: usize, multiplicity: usize) -> Result<KnotVector<T>> {
        let last = self.nb_knots() - 1;
        let seam = self.is_periodic() && index == 0;
        let (knots, multiplicities): (Vec<T>, Vec<usize>) = self
            .knots()
            .iter()
            .enumerate()
            .filter_map(|(i, km)| {
                if i == index || (seam && i == last) {
                    (multiplicity > 0).then_some((km.knot(), multiplicity))
                } else {
                    Some((km.knot(), km.multiplicity()))
                }
            })
            .unzip();
        KnotVector::try_new(knots, multiplicities)
    }
}
