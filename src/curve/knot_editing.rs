use nalgebra::allocator::Allocator;
use nalgebra::{DefaultAllocator, DimName};

use crate::error::{check_index, ensure_construction, Result};
use crate::knot::KnotVector;
use crate::misc::FloatingPoint;

use super::BSplineCurve;

impl<T: FloatingPoint, D: DimName> BSplineCurve<T, D>
where
    DefaultAllocator: Allocator<D>,
{
    /// Change the value of the knot at `index`.
    ///
    /// # Failures
    /// - `index` is not a knot index
    /// - the value does not stay strictly between its neighbours
    ///
    /// # Example
    /// ```
    /// use bspline_curve::prelude::*;
    /// use nalgebra::Point2;
    ///
    /// let poles = vec![
    ///     Point2::new(0., 0.),
    ///     Point2::new(1., 1.),
    ///     Point2::new(2., 0.),
    ///     Point2::new(3., 1.),
    /// ];
    /// let mut curve =
    ///     BSplineCurve2D::try_new(poles, vec![0., 1., 2.], vec![3, 1, 3], 2, false).unwrap();
    /// curve.set_knot(1, 1.5).unwrap();
    /// assert_eq!(curve.knot(1).unwrap(), 1.5);
    /// assert!(curve.set_knot(1, 2.0).is_err());
    /// ```
    pub fn set_knot(&mut self, index: usize, value: T) -> Result<()> {
        self.check_knot_value(index, value)?;
        let knots = self.knots();
        if value == knots.knot(index) {
            return Ok(());
        }

        let mut values = knots.knots().to_vec();
        values[index] = value;
        let knot_vector = KnotVector::try_new(values, knots.multiplicities().to_vec())?;
        self.replace_knot_values(knot_vector);
        Ok(())
    }

    /// Raise the multiplicity of the knot at `index`, then change its value.
    /// The value is checked first, so a rejected call leaves the curve untouched.
    pub fn set_knot_with_multiplicity(
        &mut self,
        index: usize,
        value: T,
        multiplicity: usize,
    ) -> Result<()> {
        self.check_knot_value(index, value)?;
        self.increase_multiplicity(index, multiplicity)?;
        self.set_knot(index, value)
    }

    /// The knot at `index` may take `value` without breaking the ordering
    fn check_knot_value(&self, index: usize, value: T) -> Result<()> {
        let last = self.nb_knots() - 1;
        check_index(index, 0, last)?;
        let dk = value.epsilon_at();
        let knots = self.knots();
        if index > 0 {
            ensure_construction!(
                value > knots.knot(index - 1) + dk,
                "knot {:?} at index {} does not follow {:?}",
                value,
                index,
                knots.knot(index - 1)
            );
        }
        if index < last {
            ensure_construction!(
                value < knots.knot(index + 1) - dk,
                "knot {:?} at index {} does not precede {:?}",
                value,
                index,
                knots.knot(index + 1)
            );
        }
        Ok(())
    }

    /// Replace every knot value, keeping the multiplicities
    /// # Failures
    /// - the number of values differs from the number of knots
    /// - the values are not strictly increasing
    pub fn set_knots(&mut self, values: &[T]) -> Result<()> {
        ensure_construction!(
            values.len() == self.nb_knots(),
            "{} knot values given for {} knots",
            values.len(),
            self.nb_knots()
        );
        let knot_vector =
            KnotVector::try_new(values.to_vec(), self.knots().multiplicities().to_vec())?;
        self.replace_knot_values(knot_vector);
        Ok(())
    }
}
