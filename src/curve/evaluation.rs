use nalgebra::allocator::Allocator;
use nalgebra::{DVector, DefaultAllocator, DimName, OPoint, OVector};

use crate::misc::{Binomial, FloatingPoint};

use super::{BSplineCurve, SpanCache};

impl<T: FloatingPoint, D: DimName> BSplineCurve<T, D>
where
    DefaultAllocator: Allocator<D>,
{
    /// Bring a parameter of a periodic curve back into its principal period
    pub(crate) fn normalized_parameter(&self, u: T) -> T {
        if !self.is_periodic() {
            return u;
        }
        let (first, last) = self.knots_domain();
        if u >= first && u <= last {
            return u;
        }
        let period = last - first;
        u - period * ((u - first) / period).floor()
    }

    /// Returns true if `u` is evaluated from the current cache without rebuilding it
    pub fn is_cache_valid(&self, u: T) -> bool {
        self.cache.borrow().is_valid(self.normalized_parameter(u))
    }

    /// Rebuild the cache around `u` if it does not already cover it
    pub fn validate_cache(&self, u: T) {
        let u = self.normalized_parameter(u);
        let mut cache = self.cache.borrow_mut();
        if !cache.is_valid(u) {
            self.rebuild_cache(&mut cache, u);
        }
    }

    /// Span index held by the cache, `None` when the cache is invalid
    pub fn cached_span(&self) -> Option<usize> {
        self.cache.borrow().span()
    }

    fn rebuild_cache(&self, cache: &mut SpanCache<T>, u: T) {
        let degree = self.degree();
        let span = self.flat_knots().span_index(degree, u);
        let n = self.nb_poles();
        let polygon = self.polygon();
        cache.rebuild(degree, self.flat_knots(), span, |i| polygon.homogeneous(i % n));
        log::trace!("span cache rebuilt on span {} for u = {:?}", span, u);
    }

    /// Homogeneous derivatives of order `0..=n` at `u`
    fn homogeneous_derivatives(&self, u: T, n: usize) -> Vec<DVector<T>> {
        let u = self.normalized_parameter(u);
        let mut cache = self.cache.borrow_mut();
        if !cache.is_valid(u) {
            self.rebuild_cache(&mut cache, u);
        }
        cache.derivatives(u, n)
    }

    /// Evaluate the curve at a given parameter
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
    /// let curve = BSplineCurve2D::try_new(poles, vec![0., 1.], vec![3, 3], 2, false).unwrap();
    /// assert_relative_eq!(curve.point_at(0.5), Point2::new(1., 0.5));
    /// ```
    pub fn point_at(&self, u: T) -> OPoint<T, D> {
        let h = self.homogeneous_derivatives(u, 0);
        OPoint::from(self.cartesian(&h[0]) / h[0][D::dim()])
    }

    /// Evaluate the point and its derivatives up to order `n` at a given parameter.
    /// The first entry holds the point coordinates.
    pub fn derivatives_at(&self, u: T, n: usize) -> Vec<OVector<T, D>> {
        let ders = self.homogeneous_derivatives(u, n);
        let a_ders: Vec<_> = ders.iter().map(|d| self.cartesian(d)).collect();
        if !self.is_rational() {
            return a_ders;
        }

        let w_ders: Vec<_> = ders.iter().map(|d| d[D::dim()]).collect();
        let mut ck: Vec<OVector<T, D>> = vec![];
        let mut binom = Binomial::<T>::new();
        for k in 0..=n {
            let mut v = a_ders[k].clone();
            for i in 1..=k {
                let coef = binom.get(k, i) * w_ders[i];
                v -= &ck[k - i] * coef;
            }
            ck.push(v / w_ders[0]);
        }
        ck
    }

    /// Evaluate the tangent vector at a given parameter
    pub fn tangent_at(&self, u: T) -> OVector<T, D> {
        self.derivatives_at(u, 1)[1].clone()
    }

    /// Point and first derivative
    pub fn d1(&self, u: T) -> (OPoint<T, D>, OVector<T, D>) {
        let ders = self.derivatives_at(u, 1);
        (OPoint::from(ders[0].clone()), ders[1].clone())
    }

    /// Point, first and second derivatives
    pub fn d2(&self, u: T) -> (OPoint<T, D>, OVector<T, D>, OVector<T, D>) {
        let ders = self.derivatives_at(u, 2);
        (
            OPoint::from(ders[0].clone()),
            ders[1].clone(),
            ders[2].clone(),
        )
    }

    pub fn start_point(&self) -> OPoint<T, D> {
        self.point_at(self.first_parameter())
    }

    pub fn end_point(&self) -> OPoint<T, D> {
        self.point_at(self.last_parameter())
    }

    fn cartesian(&self, h: &DVector<T>) -> OVector<T, D> {
        OVector::<T, D>::from_iterator(h.iter().take(D::dim()).copied())
    }
}
