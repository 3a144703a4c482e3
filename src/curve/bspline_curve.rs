use std::cell::RefCell;

use nalgebra::allocator::Allocator;
use nalgebra::{Const, DefaultAllocator, DimName, Matrix3, Matrix4, OPoint, Point2, Point3};
use simba::scalar::SupersetOf;

use crate::error::{check_index, ensure_construction, CurveError, Result};
use crate::knot::{Continuity, FlatKnots, KnotDistribution, KnotVector};
use crate::misc::{FloatingPoint, Invertible, Transformable};

use super::flat_curve::FlatCurve;
use super::{ControlPolygon, SpanCache};

/// Highest supported degree
pub const MAX_DEGREE: usize = 25;

/// B-spline curve representation
/// By generics, it can be used for 2D or 3D curves with f32 or f64 scalar types.
///
/// The curve owns its knot vector, its control polygon and an evaluation cache.
/// Structural mutations replace the knot vector and the polygon together and
/// always invalidate the cache.
#[derive(Clone, Debug)]
pub struct BSplineCurve<T: FloatingPoint, D: DimName>
where
    DefaultAllocator: Allocator<D>,
{
    degree: usize,
    periodic: bool,
    knots: KnotVector<T>,
    /// expanded knots, with the periodic wrap-around applied
    flat_knots: FlatKnots<T>,
    polygon: ControlPolygon<T, D>,
    distribution: KnotDistribution,
    continuity: Continuity,
    pub(crate) cache: RefCell<SpanCache<T>>,
}

/// 2D B-spline curve alias
pub type BSplineCurve2D<T> = BSplineCurve<T, Const<2>>;

/// 3D B-spline curve alias
pub type BSplineCurve3D<T> = BSplineCurve<T, Const<3>>;

impl<T: FloatingPoint, D: DimName> BSplineCurve<T, D>
where
    DefaultAllocator: Allocator<D>,
{
    /// Create a non-rational B-spline curve
    /// # Failures
    /// - the degree is 0 or above `MAX_DEGREE`
    /// - less than two poles
    /// - knots and multiplicities differ in length
    /// - knots are not strictly increasing
    /// - the pole count does not match the degree and multiplicities
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
    /// let curve = BSplineCurve2D::try_new(poles, vec![0., 1.], vec![4, 4], 3, false);
    /// assert!(curve.is_ok());
    /// ```
    pub fn try_new(
        poles: Vec<OPoint<T, D>>,
        knots: Vec<T>,
        multiplicities: Vec<usize>,
        degree: usize,
        periodic: bool,
    ) -> Result<Self> {
        let knots = Self::check_data(poles.len(), knots, multiplicities, degree, periodic)?;
        let polygon = ControlPolygon::try_new(poles)?;
        Ok(Self::from_parts(degree, periodic, knots, polygon))
    }

    /// Create a rational B-spline curve
    /// With `check_rational`, weights that are all equal make the curve non-rational.
    /// # Failures
    /// - as `try_new`
    /// - weight count differs from pole count
    /// - a weight does not exceed the resolution
    pub fn try_new_rational(
        poles: Vec<OPoint<T, D>>,
        weights: Vec<T>,
        knots: Vec<T>,
        multiplicities: Vec<usize>,
        degree: usize,
        periodic: bool,
        check_rational: bool,
    ) -> Result<Self> {
        let knots = Self::check_data(poles.len(), knots, multiplicities, degree, periodic)?;
        let polygon = ControlPolygon::try_new_rational(poles, weights, check_rational)?;
        Ok(Self::from_parts(degree, periodic, knots, polygon))
    }

    fn check_data(
        nb_poles: usize,
        knots: Vec<T>,
        multiplicities: Vec<usize>,
        degree: usize,
        periodic: bool,
    ) -> Result<KnotVector<T>> {
        ensure_construction!(
            (1..=MAX_DEGREE).contains(&degree),
            "degree {} is outside [1, {}]",
            degree,
            MAX_DEGREE
        );
        ensure_construction!(
            nb_poles >= 2,
            "at least two poles are required, got {}",
            nb_poles
        );
        let knots = KnotVector::try_new(knots, multiplicities)?;
        let expected = knots.nb_poles(degree, periodic);
        ensure_construction!(
            expected == Some(nb_poles),
            "invalid number of poles, got {}, expected {:?}",
            nb_poles,
            expected
        );
        Ok(knots)
    }

    /// Assemble a curve from already consistent parts
    pub(crate) fn from_parts(
        degree: usize,
        periodic: bool,
        knots: KnotVector<T>,
        polygon: ControlPolygon<T, D>,
    ) -> Self {
        let mut curve = Self {
            degree,
            periodic,
            flat_knots: FlatKnots::new(vec![]),
            knots,
            polygon,
            distribution: KnotDistribution::NonUniform,
            continuity: Continuity::C0,
            cache: RefCell::new(SpanCache::new()),
        };
        curve.update_knots();
        curve
    }

    /// Recompute everything derived from the knot vector
    fn update_knots(&mut self) {
        debug_assert_eq!(
            self.knots.nb_poles(self.degree, self.periodic),
            Some(self.polygon.len())
        );
        self.distribution = self.knots.distribution(self.degree);
        self.continuity = self.knots.continuity(self.degree, self.periodic);
        self.flat_knots = FlatKnots::new(self.knots.flatten(self.degree, self.periodic));
        self.invalidate_cache();
    }

    pub(crate) fn invalidate_cache(&mut self) {
        self.cache.get_mut().invalidate();
    }

    /// Replace the whole structure in one step
    pub(crate) fn replace(
        &mut self,
        degree: usize,
        periodic: bool,
        knots: KnotVector<T>,
        polygon: ControlPolygon<T, D>,
    ) {
        log::debug!(
            "curve structure replaced: degree {} -> {}, poles {} -> {}, knots {} -> {}",
            self.degree,
            degree,
            self.polygon.len(),
            polygon.len(),
            self.knots.len(),
            knots.len()
        );
        self.degree = degree;
        self.periodic = periodic;
        self.knots = knots;
        self.polygon = polygon;
        self.update_knots();
    }

    pub(crate) fn replace_knot_values(&mut self, knots: KnotVector<T>) {
        self.knots = knots;
        self.update_knots();
    }

    pub(crate) fn polygon_mut(&mut self) -> &mut ControlPolygon<T, D> {
        self.invalidate_cache();
        &mut self.polygon
    }

    /// Non-periodic flat form; periodic curves are unwrapped over their flat knots
    pub(crate) fn to_flat(&self) -> FlatCurve<T> {
        let rows = if self.periodic {
            self.polygon
                .cycled(self.flat_knots.len() - self.degree - 1)
                .to_homogeneous()
        } else {
            self.polygon.to_homogeneous()
        };
        FlatCurve::new(self.degree, self.flat_knots.to_vec(), rows)
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    pub fn max_degree() -> usize {
        MAX_DEGREE
    }

    pub fn is_periodic(&self) -> bool {
        self.periodic
    }

    pub fn is_rational(&self) -> bool {
        self.polygon.is_rational()
    }

    pub fn knots(&self) -> &KnotVector<T> {
        &self.knots
    }

    pub fn nb_knots(&self) -> usize {
        self.knots.len()
    }

    pub fn knot(&self, index: usize) -> Result<T> {
        check_index(index, 0, self.knots.len() - 1)?;
        Ok(self.knots.knot(index))
    }

    pub fn multiplicity(&self, index: usize) -> Result<usize> {
        check_index(index, 0, self.knots.len() - 1)?;
        Ok(self.knots.multiplicity(index))
    }

    pub fn flat_knots(&self) -> &FlatKnots<T> {
        &self.flat_knots
    }

    pub fn polygon(&self) -> &ControlPolygon<T, D> {
        &self.polygon
    }

    pub fn nb_poles(&self) -> usize {
        self.polygon.len()
    }

    pub fn poles(&self) -> &[OPoint<T, D>] {
        self.polygon.poles()
    }

    pub fn pole(&self, index: usize) -> Result<&OPoint<T, D>> {
        check_index(index, 0, self.polygon.len() - 1)?;
        Ok(self.polygon.pole(index))
    }

    /// Weights of a rational curve, `None` otherwise
    pub fn weights(&self) -> Option<&[T]> {
        self.polygon.weights()
    }

    pub fn weight(&self, index: usize) -> Result<T> {
        check_index(index, 0, self.polygon.len() - 1)?;
        Ok(self.polygon.weight(index))
    }

    pub fn knot_distribution(&self) -> KnotDistribution {
        self.distribution
    }

    pub fn continuity(&self) -> Continuity {
        self.continuity
    }

    /// Returns true if the curve is at least `n` times continuously differentiable
    pub fn is_cn(&self, n: usize) -> bool {
        match self.continuity {
            Continuity::CN => true,
            _ => {
                n + self
                    .knots
                    .max_interior_multiplicity(self.degree, self.periodic)
                    <= self.degree
            }
        }
    }

    pub fn first_knot_index(&self) -> usize {
        self.knots.first_knot_index(self.degree, self.periodic)
    }

    pub fn last_knot_index(&self) -> usize {
        self.knots.last_knot_index(self.degree, self.periodic)
    }

    pub fn first_parameter(&self) -> T {
        self.flat_knots[self.degree]
    }

    pub fn last_parameter(&self) -> T {
        self.flat_knots[self.flat_knots.len() - self.degree - 1]
    }

    /// Get the parametric domain
    pub fn knots_domain(&self) -> (T, T) {
        (self.first_parameter(), self.last_parameter())
    }

    /// Length of the period of a periodic curve
    pub fn period(&self) -> Result<T> {
        if !self.periodic {
            return Err(CurveError::Domain("the curve is not periodic".to_string()));
        }
        Ok(self.last_parameter() - self.first_parameter())
    }

    /// Parameter on the reversed curve matching `u` on this one
    pub fn reversed_parameter(&self, u: T) -> T {
        self.first_parameter() + self.last_parameter() - u
    }

    /// Returns true if the start and end points coincide within `tolerance`
    pub fn is_closed(&self, tolerance: T) -> bool {
        (self.start_point() - self.end_point()).norm() <= tolerance
    }

    /// Cast the curve to a curve with another floating point type
    pub fn cast<F: FloatingPoint + SupersetOf<T>>(&self) -> BSplineCurve<F, D> {
        BSplineCurve::from_parts(
            self.degree,
            self.periodic,
            self.knots.cast(),
            self.polygon.cast(),
        )
    }
}

impl<T: FloatingPoint, D: DimName> Invertible for BSplineCurve<T, D>
where
    DefaultAllocator: Allocator<D>,
{
    /// Reverse the direction of the curve
    /// # Example
    /// ```
    /// use bspline_curve::prelude::*;
    /// use nalgebra::Point2;
    /// use approx::assert_relative_eq;
    /// let poles = vec![
    ///     Point2::new(0.0, 0.0),
    ///     Point2::new(1.0, 0.0),
    ///     Point2::new(1.0, 1.0),
    ///     Point2::new(0.0, 1.0),
    /// ];
    /// let mut curve = BSplineCurve2D::try_new(poles, vec![0., 1., 2.], vec![3, 1, 3], 2, false).unwrap();
    /// curve.invert();
    /// assert_relative_eq!(curve.start_point(), Point2::new(0.0, 1.0));
    /// assert_relative_eq!(curve.end_point(), Point2::new(0.0, 0.0));
    /// ```
    fn invert(&mut self) {
        self.reverse();
    }
}

/// Enable to transform a 2D curve by a homogeneous 3x3 matrix
impl<'a, T: FloatingPoint> Transformable<&'a Matrix3<T>> for BSplineCurve2D<T> {
    fn transform(&mut self, transform: &'a Matrix3<T>) {
        self.polygon_mut().map_poles(|p| {
            let h = transform * p.to_homogeneous();
            *p = Point2::new(h.x / h.z, h.y / h.z);
        });
    }
}

/// Enable to transform a 3D curve by a homogeneous 4x4 matrix
impl<'a, T: FloatingPoint> Transformable<&'a Matrix4<T>> for BSplineCurve3D<T> {
    fn transform(&mut self, transform: &'a Matrix4<T>) {
        self.polygon_mut().map_poles(|p| {
            let h = transform * p.to_homogeneous();
            *p = Point3::new(h.x / h.w, h.y / h.w, h.z / h.w);
        });
    }
}
