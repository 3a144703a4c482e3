use nalgebra::allocator::Allocator;
use nalgebra::{DefaultAllocator, DimName};

use crate::error::{check_index, ensure_construction, CurveError, Result};
use crate::knot::{KnotVector, MultiplicityMode};
use crate::misc::FloatingPoint;

use super::flat_curve::PeriodicWindow;
use super::{BSplineCurve, ControlPolygon};

/// A knot of the refined vector with its multiplicity before and after insertion
#[derive(Clone, Copy, Debug)]
struct Refinement<T> {
    knot: T,
    before: usize,
    after: usize,
}

impl<T: FloatingPoint, D: DimName> BSplineCurve<T, D>
where
    DefaultAllocator: Allocator<D>,
{
    /// Insert a single knot, see `insert_knots`
    pub fn insert_knot(
        &mut self,
        u: T,
        multiplicity: usize,
        tolerance: T,
        mode: MultiplicityMode,
    ) -> Result<()> {
        self.insert_knots(&[u], &[multiplicity], tolerance, mode)
    }

    /// Insert knots without changing the shape of the curve.
    ///
    /// Requested knots within `tolerance` of an existing knot target that knot.
    /// With `MultiplicityMode::Add` the requested multiplicity is added to the existing one,
    /// with `MultiplicityMode::Set` it becomes the target multiplicity.
    /// Resulting multiplicities are capped at the degree and never lowered.
    ///
    /// # Failures
    /// - knots and multiplicities differ in length
    /// - knots are unsorted or outside of the domain
    /// - a multiplicity, or the sum of merged `Add` requests, exceeds `degree + 1`
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
    /// let before = curve.point_at(0.3);
    /// curve.insert_knot(0.5, 2, 0., MultiplicityMode::Add).unwrap();
    /// assert_eq!(curve.nb_poles(), 6);
    /// assert_eq!(curve.knots().multiplicities(), &[4, 2, 4]);
    /// assert_relative_eq!(curve.point_at(0.3), before, epsilon = 1e-12);
    /// ```
    pub fn insert_knots(
        &mut self,
        knots: &[T],
        multiplicities: &[usize],
        tolerance: T,
        mode: MultiplicityMode,
    ) -> Result<()> {
        ensure_construction!(
            knots.len() == multiplicities.len(),
            "{} knots given with {} multiplicities",
            knots.len(),
            multiplicities.len()
        );
        if knots.is_empty() {
            return Ok(());
        }

        let degree = self.degree();
        let (first, last) = self.knots_domain();
        ensure_construction!(
            knots.windows(2).all(|w| w[0] <= w[1]),
            "knots to insert must be sorted"
        );
        for (u, m) in knots.iter().zip(multiplicities.iter()) {
            ensure_construction!(
                *u >= first - tolerance && *u <= last + tolerance,
                "knot {:?} is outside of the domain [{:?}, {:?}]",
                u,
                first,
                last
            );
            ensure_construction!(
                *m <= degree + 1,
                "multiplicity {} exceeds degree + 1 = {}",
                m,
                degree + 1
            );
        }

        let requests = merge_requests(knots, multiplicities, tolerance, first, last, mode);
        for (u, m) in requests.iter() {
            ensure_construction!(
                *m <= degree + 1,
                "combined multiplicity {} at {:?} exceeds degree + 1 = {}",
                m,
                u,
                degree + 1
            );
        }
        let refined = self.refine(&requests, tolerance, mode);

        let knot_vector = KnotVector::try_new(
            refined.iter().map(|r| r.knot).collect(),
            refined.iter().map(|r| r.after).collect(),
        )?;
        let nb_poles = knot_vector.nb_poles(degree, self.is_periodic()).ok_or_else(|| {
            CurveError::Construction("knot insertion breaks the pole count relation".to_string())
        })?;
        if nb_poles == self.nb_poles() {
            return Ok(());
        }

        let rows = if self.is_periodic() {
            let pad = PeriodicWindow::<T>::padding(self.nb_poles(), degree);
            let mut window = PeriodicWindow::new(
                degree,
                self.knots(),
                &self.polygon().to_homogeneous(),
                pad,
            );
            for r in refined.iter().take(refined.len() - 1) {
                if r.after > r.before {
                    window.insert(r.knot, r.after - r.before);
                }
            }
            window.principal_poles(nb_poles)
        } else {
            let mut flat = self.to_flat();
            for r in refined.iter() {
                if r.after > r.before {
                    flat.insert(r.knot, r.after - r.before);
                }
            }
            flat.points
        };

        let polygon = ControlPolygon::from_homogeneous(&rows, self.is_rational());
        log::debug!(
            "{} knot request(s) inserted, poles {} -> {}",
            requests.len(),
            self.nb_poles(),
            nb_poles
        );
        self.replace(degree, self.is_periodic(), knot_vector, polygon);
        Ok(())
    }

    /// Merge the requests into the existing knots
    fn refine(
        &self,
        requests: &[(T, usize)],
        tolerance: T,
        mode: MultiplicityMode,
    ) -> Vec<Refinement<T>> {
        let degree = self.degree();
        let periodic = self.is_periodic();
        let current = self.knots();
        let last = current.len() - 1;

        let mut refined: Vec<Refinement<T>> = current
            .iter()
            .map(|km| Refinement {
                knot: km.knot(),
                before: km.multiplicity(),
                after: km.multiplicity(),
            })
            .collect();

        let combine = |existing: usize, requested: usize| match mode {
            MultiplicityMode::Add => existing.max((existing + requested).min(degree)),
            MultiplicityMode::Set => existing.max(requested.min(degree)),
        };

        let mut seam: Option<usize> = None;
        let mut added = vec![];
        for (u, m) in requests.iter() {
            let eps = tolerance.max(u.epsilon_at());
            let (index, delta) = current.nearest(*u);
            if delta.abs() > eps {
                let m = (*m).min(degree);
                if m > 0 {
                    added.push(Refinement {
                        knot: *u,
                        before: 0,
                        after: m,
                    });
                }
                continue;
            }
            if periodic && (index == 0 || index == last) {
                // both ends address the seam, the last request wins
                seam = Some(*m);
                continue;
            }
            let r = &mut refined[index];
            r.after = combine(r.after, *m);
        }

        if let Some(m) = seam {
            let after = combine(refined[0].before, m);
            refined[0].after = after;
            refined[last].after = after;
        }

        refined.extend(added);
        refined.sort_by(|a, b| {
            a.knot
                .partial_cmp(&b.knot)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        refined
    }

    /// Raise the multiplicity of the knot at `index` to `multiplicity`
    pub fn increase_multiplicity(&mut self, index: usize, multiplicity: usize) -> Result<()> {
        self.increase_multiplicity_range(index, index, multiplicity)
    }

    /// Raise the multiplicity of the knots in `[first, last]` to `multiplicity`
    pub fn increase_multiplicity_range(
        &mut self,
        first: usize,
        last: usize,
        multiplicity: usize,
    ) -> Result<()> {
        let knots = self.knot_range(first, last)?;
        let multiplicities = vec![multiplicity; knots.len()];
        self.insert_knots(
            &knots,
            &multiplicities,
            T::one().epsilon_at(),
            MultiplicityMode::Set,
        )
    }

    /// Add `step` to the multiplicity of the knots in `[first, last]`
    pub fn increment_multiplicity(&mut self, first: usize, last: usize, step: usize) -> Result<()> {
        let knots = self.knot_range(first, last)?;
        let multiplicities = vec![step; knots.len()];
        self.insert_knots(
            &knots,
            &multiplicities,
            T::one().epsilon_at(),
            MultiplicityMode::Add,
        )
    }

    fn knot_range(&self, first: usize, last: usize) -> Result<Vec<T>> {
        let upper = self.nb_knots() - 1;
        check_index(first, 0, upper)?;
        check_index(last, 0, upper)?;
        if first > last {
            return Err(CurveError::InvalidRange { first, last });
        }
        Ok(self.knots().knots()[first..=last].to_vec())
    }
}

/// Clamp the requests to the domain and merge the ones closer than the tolerance
fn merge_requests<T: FloatingPoint>(
    knots: &[T],
    multiplicities: &[usize],
    tolerance: T,
    first: T,
    last: T,
    mode: MultiplicityMode,
) -> Vec<(T, usize)> {
    let mut requests: Vec<(T, usize)> = vec![];
    for (u, m) in knots.iter().zip(multiplicities.iter()) {
        let u = (*u).max(first).min(last);
        match requests.last_mut() {
            Some((v, a)) if (u - *v).abs() <= tolerance.max(u.epsilon_at()) => {
                *a = match mode {
                    MultiplicityMode::Add => *a + m,
                    MultiplicityMode::Set => (*a).max(*m),
                };
            }
            _ => requests.push((u, *m)),
        }
    }
    requests
}
