use nalgebra::allocator::Allocator;
use nalgebra::{DefaultAllocator, DimName, OPoint, OVector};

use crate::error::{check_index, ensure_construction, CurveError, Result};
use crate::misc::FloatingPoint;

use super::BSplineCurve;

/// Outcome of a point and tangent constraint.
/// The poles are modified only on `Moved`.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintStatus {
    Moved,
    /// The boundary conditions leave no room to move the poles
    InvalidConditions,
    /// The parameter is too close to a constrained end
    ParameterOutOfDomain,
    /// The local system could not be solved within tolerance
    Singular,
}

impl ConstraintStatus {
    pub fn is_moved(&self) -> bool {
        matches!(self, ConstraintStatus::Moved)
    }
}

/// Options for `move_point_and_tangent`
#[derive(Debug, Clone, Copy)]
pub struct TangentConstraintOptions<T: FloatingPoint> {
    /// Determinant threshold below which the constraint is considered singular.
    /// Also the minimal distance between the parameter and a constrained end.
    pub tolerance: T,
    /// Derivative order kept at the start: `-1` leaves the start free,
    /// `0` keeps the start point, `1` also keeps the start tangent, and so on.
    pub start_condition: isize,
    /// Derivative order kept at the end, as `start_condition`
    pub end_condition: isize,
}

impl<T: FloatingPoint> Default for TangentConstraintOptions<T> {
    fn default() -> Self {
        Self {
            tolerance: T::from_f64(1e-7).unwrap(),
            start_condition: 0,
            end_condition: 0,
        }
    }
}

impl<T: FloatingPoint> TangentConstraintOptions<T> {
    pub fn with_tolerance(mut self, tolerance: T) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_start_condition(mut self, start_condition: isize) -> Self {
        self.start_condition = start_condition;
        self
    }

    pub fn with_end_condition(mut self, end_condition: isize) -> Self {
        self.end_condition = end_condition;
        self
    }
}

impl<T: FloatingPoint, D: DimName> BSplineCurve<T, D>
where
    DefaultAllocator: Allocator<D>,
{
    pub fn set_pole(&mut self, index: usize, pole: OPoint<T, D>) -> Result<()> {
        check_index(index, 0, self.nb_poles() - 1)?;
        self.polygon_mut().set_pole(index, pole);
        Ok(())
    }

    /// Change the weight of a pole.
    /// The curve becomes rational when weights differ, non-rational when they all agree.
    /// # Failures
    /// - `index` is not a pole index
    /// - `weight` does not exceed the resolution
    pub fn set_weight(&mut self, index: usize, weight: T) -> Result<()> {
        check_index(index, 0, self.nb_poles() - 1)?;
        ensure_construction!(
            weight > T::resolution(),
            "weight {:?} must be positive",
            weight
        );
        let was_rational = self.is_rational();
        self.polygon_mut().set_weight(index, weight);
        if was_rational != self.is_rational() {
            log::debug!(
                "curve rationality changed to {} by the weight at {}",
                self.is_rational(),
                index
            );
        }
        Ok(())
    }

    pub fn set_pole_with_weight(
        &mut self,
        index: usize,
        pole: OPoint<T, D>,
        weight: T,
    ) -> Result<()> {
        self.set_weight(index, weight)?;
        self.set_pole(index, pole)
    }

    /// Move the poles in `[first, last]` so that the curve passes through `point` at `u`.
    ///
    /// The displacement is spread over the poles whose basis functions are active at `u`,
    /// decreasing away from the dominant one. Returns the range of modified poles,
    /// `None` when no pole in `[first, last]` influences the curve at `u`.
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
    /// let mut curve = BSplineCurve2D::try_new(poles, vec![0., 1.], vec![4, 4], 3, false).unwrap();
    /// let target = Point2::new(2., 3.);
    /// let moved = curve.move_point(0.5, &target, 1, 2).unwrap();
    /// assert_eq!(moved, Some((1, 2)));
    /// assert_relative_eq!(curve.point_at(0.5), target, epsilon = 1e-12);
    /// ```
    pub fn move_point(
        &mut self,
        u: T,
        point: &OPoint<T, D>,
        first: usize,
        last: usize,
    ) -> Result<Option<(usize, usize)>> {
        let n = self.nb_poles();
        check_index(first, 0, n - 1)?;
        check_index(last, 0, n - 1)?;
        if first > last {
            return Err(CurveError::InvalidRange { first, last });
        }

        let degree = self.degree();
        let displacement = point - self.point_at(u);
        let v = self.normalized_parameter(u);
        let span = self.flat_knots().span_index(degree, v);
        let basis = self.flat_knots().basis_functions(span, v, degree);
        let start = span - degree;
        let pole_of = |j: usize| (start + j) % n;
        let in_range = |j: usize| (first..=last).contains(&pole_of(j));

        let mut dominant: Option<usize> = None;
        let mut max_value = T::zero();
        for (j, b) in basis.iter().enumerate() {
            if in_range(j) && *b > max_value {
                max_value = *b;
                dominant = Some(j);
            }
        }
        let Some(k1) = dominant else {
            return Ok(None);
        };
        let symmetric = T::from_f64(1e-10).unwrap();
        let k2 = if k1 < degree && in_range(k1 + 1) && (basis[k1 + 1] - max_value).abs() < symmetric
        {
            k1 + 1
        } else {
            k1
        };
        let distance = |j: usize| {
            if j < k1 {
                T::from_usize(k1 - j).unwrap()
            } else if j > k2 {
                T::from_usize(j - k2).unwrap()
            } else {
                T::zero()
            }
        };

        let rational = self.is_rational();
        let mut d1 = T::zero();
        let mut d2 = T::zero();
        for (j, b) in basis.iter().enumerate() {
            let h = if rational {
                *b * self.polygon().weight(pole_of(j))
            } else {
                *b
            };
            d2 += h;
            if in_range(j) {
                d1 += h / (distance(j) + T::one());
            }
        }
        if d1 <= T::zero() {
            return Ok(None);
        }
        let coef = if rational { d2 / d1 } else { T::one() / d1 };

        let mut moved: Option<(usize, usize)> = None;
        let polygon = self.polygon_mut();
        for j in 0..=degree {
            if !in_range(j) {
                continue;
            }
            let index = pole_of(j);
            let delta = &displacement * (coef / (distance(j) + T::one()));
            polygon.translate_pole(index, &delta);
            moved = Some(match moved {
                None => (index, index),
                Some((lo, hi)) => (lo.min(index), hi.max(index)),
            });
        }
        Ok(moved)
    }

    /// Modify the poles so that the curve passes through `point` with `tangent` at `u`.
    ///
    /// Two smooth bumps over the free poles, one peaking at the pole nearest to `u` and
    /// one at its neighbour, are combined to meet both constraints. Periodic curves are
    /// made non-periodic first. The poles are unchanged unless the returned status is
    /// `ConstraintStatus::Moved`.
    pub fn move_point_and_tangent(
        &mut self,
        u: T,
        point: &OPoint<T, D>,
        tangent: &OVector<T, D>,
        options: Option<TangentConstraintOptions<T>>,
    ) -> Result<ConstraintStatus> {
        let options = options.unwrap_or_default();
        if self.is_periodic() {
            self.set_not_periodic()?;
        }

        let degree = self.degree();
        let n = self.nb_poles();
        let deg = degree as isize;
        let (sc, ec) = (options.start_condition, options.end_condition);
        if !(-1..=deg).contains(&sc) || !(-1..=deg).contains(&ec) || sc + ec + 4 > n as isize {
            return Ok(ConstraintStatus::InvalidConditions);
        }

        let tolerance = options.tolerance;
        let flat = self.flat_knots();
        let start = flat[degree];
        let end = flat[flat.len() - degree - 1];
        let after_start = if sc == -1 {
            start <= u
        } else {
            start + tolerance < u
        };
        let before_end = if ec == -1 {
            end >= u
        } else {
            end - tolerance > u
        };
        if !(after_start && before_end) {
            return Ok(ConstraintStatus::ParameterOutOfDomain);
        }

        let greville = flat.greville_abscissae(degree, n);
        let lo = (sc + 1) as usize;
        let hi = n - (ec + 2) as usize;
        let located = greville.iter().rposition(|g| *g <= u).unwrap_or(0);
        let index = located.clamp(lo, hi - 1);
        let other = if index == lo {
            index + 1
        } else if u - greville[index] < greville[index + 1] - u {
            index - 1
        } else {
            index + 1
        };

        let g0 = greville[0];
        let gn = greville[n - 1];
        let start_value = if lo == 0 {
            g0 - (gn - g0)
        } else {
            greville[lo - 1]
        };
        let end_value = if hi == n - 1 {
            gn + (gn - g0)
        } else {
            greville[hi + 1]
        };
        let bump = |peak: usize| -> Vec<T> {
            (0..n)
                .map(|i| {
                    if i < lo || i > hi {
                        return T::zero();
                    }
                    let g = greville[i];
                    let t = if g <= greville[peak] {
                        (g - start_value) / (greville[peak] - start_value)
                    } else {
                        (end_value - g) / (end_value - greville[peak])
                    };
                    let t = t.max(T::zero()).min(T::one());
                    t * t * (T::from_f64(3.).unwrap() - T::from_f64(2.).unwrap() * t)
                })
                .collect()
        };
        let f1 = bump(index);
        let f2 = bump(other);

        let (v1, s1) = self.scalar_function(&f1, u);
        let (v2, s2) = self.scalar_function(&f2, u);
        let det = v1 * s2 - v2 * s1;
        if det.abs() <= tolerance {
            return Ok(ConstraintStatus::Singular);
        }

        let (p0, d0) = self.d1(u);
        let delta = point - p0;
        let delta_tangent = tangent - d0;
        let a = (&delta * s2 - &delta_tangent * v2) / det;
        let b = (&delta_tangent * v1 - &delta * s1) / det;

        let polygon = self.polygon_mut();
        for i in lo..=hi {
            let shift = &a * f1[i] + &b * f2[i];
            polygon.translate_pole(i, &shift);
        }
        log::debug!(
            "point and tangent constraint at {:?} moved poles {}..={}",
            u,
            lo,
            hi
        );
        Ok(ConstraintStatus::Moved)
    }

    /// Value and derivative at `u` of the scalar spline with coefficients `f` on the
    /// curve's basis and weights
    fn scalar_function(&self, f: &[T], u: T) -> (T, T) {
        let degree = self.degree();
        let flat = self.flat_knots();
        let span = flat.span_index(degree, u);
        let ders = flat.derivative_basis_functions(span, u, degree, 1);
        let mut a = [T::zero(); 2];
        let mut w = [T::zero(); 2];
        for j in 0..=degree {
            let i = span - degree + j;
            let weight = self.polygon().weight(i);
            for k in 0..2 {
                let h = ders[k][j] * weight;
                a[k] += h * f[i];
                w[k] += h;
            }
        }
        let value = a[0] / w[0];
        (value, (a[1] - value * w[1]) / w[0])
    }
}
