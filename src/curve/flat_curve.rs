use nalgebra::DVector;

use crate::knot::{group_flat_knots, KnotVector};
use crate::misc::{Binomial, FloatingPoint};

/// Non-periodic B-spline over an explicit flat knot sequence, with poles in
/// homogeneous form (weighted coordinates followed by the weight).
///
/// Structural algorithms run here; the curve converts to and from this form.
#[derive(Clone, Debug)]
pub(crate) struct FlatCurve<T: FloatingPoint> {
    pub degree: usize,
    pub knots: Vec<T>,
    pub points: Vec<DVector<T>>,
}

impl<T: FloatingPoint> FlatCurve<T> {
    pub fn new(degree: usize, knots: Vec<T>, points: Vec<DVector<T>>) -> Self {
        debug_assert_eq!(knots.len(), points.len() + degree + 1);
        Self {
            degree,
            knots,
            points,
        }
    }

    pub fn domain(&self) -> (T, T) {
        (self.knots[self.degree], self.knots[self.points.len()])
    }

    /// Distinct knots and multiplicities of the flat sequence
    pub fn knot_vector(&self) -> crate::error::Result<KnotVector<T>> {
        KnotVector::try_from(group_flat_knots(&self.knots))
    }

    fn multiplicity_of(&self, u: T) -> usize {
        self.knots.iter().filter(|k| **k == u).count()
    }

    /// Span `k` with `knots[k] <= u < knots[k + 1]`, kept within the pole range
    fn insertion_span(&self, u: T) -> usize {
        let last = self.points.len() - 1;
        let found = self.knots.partition_point(|k| *k <= u);
        let mut k = found.saturating_sub(1).clamp(self.degree, last);
        while k > self.degree && self.knots[k] == self.knots[k + 1] {
            k -= 1;
        }
        k
    }

    /// Insert `u` `r` times (Boehm).
    /// The resulting multiplicity never exceeds the degree.
    pub fn insert(&mut self, u: T, r: usize) {
        let p = self.degree;
        let k = self.insertion_span(u);
        let s = if self.knots[k] == u {
            self.multiplicity_of(u)
        } else {
            0
        };
        let r = r.min(p.saturating_sub(s));
        if r == 0 {
            return;
        }

        let n = self.points.len();
        let one = T::one();
        let pw = &self.points;
        let knots = &self.knots;

        let mut q = vec![DVector::zeros(pw[0].len()); n + r];
        for i in 0..=k - p {
            q[i] = pw[i].clone();
        }
        for i in k - s..n {
            q[i + r] = pw[i].clone();
        }

        let mut rw: Vec<DVector<T>> = (0..=p - s).map(|i| pw[k - p + i].clone()).collect();
        for j in 1..=r {
            let l = k - p + j;
            for i in 0..=p - j - s {
                let alpha = (u - knots[l + i]) / (knots[i + k + 1] - knots[l + i]);
                let blended = &rw[i + 1] * alpha + &rw[i] * (one - alpha);
                rw[i] = blended;
            }
            q[l] = rw[0].clone();
            q[k + r - j - s] = rw[p - j - s].clone();
        }
        let l = k - p + r;
        for i in l + 1..k - s {
            q[i] = rw[i - l].clone();
        }

        let mut new_knots = Vec::with_capacity(self.knots.len() + r);
        new_knots.extend_from_slice(&self.knots[..=k]);
        new_knots.extend(std::iter::repeat_n(u, r));
        new_knots.extend_from_slice(&self.knots[k + 1..]);

        self.knots = new_knots;
        self.points = q;
    }

    /// Remove one copy of the knot `u` (Tiller).
    ///
    /// With a tolerance the removal is refused, leaving the curve untouched, when
    /// the homogeneous poles would move by more than it. `None` forces the removal,
    /// which is exact only when the knot is known to be superfluous.
    pub fn remove_once(&mut self, u: T, tolerance: Option<T>) -> bool {
        let p = self.degree;
        let n = self.points.len();
        let Some(r) = self.knots.iter().rposition(|k| *k == u) else {
            return false;
        };
        let s = self.multiplicity_of(u);
        if r < p + 1 || r + 2 > n + s {
            return false;
        }

        let one = T::one();
        let knots = &self.knots;
        let pw = &self.points;
        let first = r - p;
        let last = r - s;
        let off = first - 1;

        let mut temp = vec![DVector::zeros(pw[0].len()); last + 2 - off];
        temp[0] = pw[off].clone();
        temp[last + 1 - off] = pw[last + 1].clone();

        let (mut i, mut j) = (first, last);
        let (mut ii, mut jj) = (1, last - off);
        while j > i {
            let alfi = (u - knots[i]) / (knots[i + p + 1] - knots[i]);
            let alfj = (u - knots[j]) / (knots[j + p + 1] - knots[j]);
            temp[ii] = (&pw[i] - &temp[ii - 1] * (one - alfi)) / alfi;
            temp[jj] = (&pw[j] - &temp[jj + 1] * alfj) / (one - alfj);
            i += 1;
            ii += 1;
            j -= 1;
            jj -= 1;
        }

        if let Some(tolerance) = tolerance {
            let deviation = if j < i {
                (&temp[ii - 1] - &temp[jj + 1]).norm()
            } else {
                let alfi = (u - knots[i]) / (knots[i + p + 1] - knots[i]);
                (&pw[i] - (&temp[ii + 1] * alfi + &temp[ii - 1] * (one - alfi))).norm()
            };
            let scale = pw[off..=last + 1]
                .iter()
                .fold(one, |acc, v| acc.max(v.norm()));
            let noise = T::default_epsilon() * T::from_f64(1024.0).unwrap() * scale;
            if deviation > tolerance.max(noise) {
                return false;
            }
        }

        let (mut i, mut j) = (first, last);
        while j > i {
            self.points[i] = temp[i - off].clone();
            self.points[j] = temp[j - off].clone();
            i += 1;
            j -= 1;
        }
        let fout = (2 * r - s - p) / 2;
        self.knots.remove(r);
        self.points.remove(fout);
        true
    }

    /// Cut the curve down to `[a, b]` with both ends clamped (multiplicity `degree + 1`).
    /// `a < b` must lie inside the domain.
    pub fn restrict(&mut self, a: T, b: T) {
        let p = self.degree;
        for u in [a, b] {
            let s = self.multiplicity_of(u);
            if s < p {
                self.insert(u, p - s);
            }
        }
        let ia = self.knots.partition_point(|k| *k <= a) - 1;
        let ib = self.knots.partition_point(|k| *k < b);

        let mut knots = vec![a; p + 1];
        knots.extend_from_slice(&self.knots[ia + 1..ib]);
        knots.extend(std::iter::repeat_n(b, p + 1));
        self.points = self.points[ia - p..ib].to_vec();
        self.knots = knots;
    }

    /// Raise the degree by `t` on a clamped curve.
    ///
    /// The curve is split into Bezier pieces, each piece is elevated, and the
    /// interior knots are removed back down to their original multiplicity plus `t`.
    pub fn elevate(&self, t: usize) -> Self {
        if t == 0 {
            return self.clone();
        }
        let p = self.degree;
        let len = self.knots.len();
        let interior = group_flat_knots(&self.knots[p + 1..len - p - 1]);

        let mut bezier = self.clone();
        for km in interior.iter() {
            if km.multiplicity() < p {
                bezier.insert(km.knot(), p - km.multiplicity());
            }
        }

        let ph = p + t;
        let mut binomial = Binomial::<T>::new();
        let mut coefficients = vec![vec![T::zero(); p + 1]; ph + 1];
        for (i, row) in coefficients.iter_mut().enumerate() {
            for j in i.saturating_sub(t)..=i.min(p) {
                row[j] = binomial.get(p, j) * binomial.get(t, i - j) / binomial.get(ph, i);
            }
        }

        let dim = self.points[0].len();
        let segments = (bezier.points.len() - 1) / p.max(1);
        let mut points = Vec::with_capacity(segments * ph + 1);
        for segment in 0..segments {
            let ctrl = &bezier.points[segment * p..=segment * p + p];
            let start = if segment == 0 { 0 } else { 1 };
            for i in start..=ph {
                let mut q = DVector::zeros(dim);
                for j in i.saturating_sub(t)..=i.min(p) {
                    q += &ctrl[j] * coefficients[i][j];
                }
                points.push(q);
            }
        }

        let (a, b) = (self.knots[0], self.knots[len - 1]);
        let mut knots = vec![a; ph + 1];
        for km in interior.iter() {
            knots.extend(std::iter::repeat_n(km.knot(), ph));
        }
        knots.extend(std::iter::repeat_n(b, ph + 1));

        let mut elevated = FlatCurve::new(ph, knots, points);
        for km in interior.iter() {
            for _ in km.multiplicity()..p {
                elevated.remove_once(km.knot(), None);
            }
        }
        elevated
    }
}

/// A periodic curve unrolled over `pad` periods on each side of its principal period.
///
/// Local operations applied to every copy of a knot keep the window periodic, so the
/// principal period can be read back from the poles anchored at the seam.
#[derive(Clone, Debug)]
pub(crate) struct PeriodicWindow<T: FloatingPoint> {
    pub curve: FlatCurve<T>,
    origin: T,
    period: T,
    pad: usize,
}

impl<T: FloatingPoint> PeriodicWindow<T> {
    /// Unroll the periodic curve. `pad` periods on each side must hold at least
    /// `degree + 1` knots for every degree the window will be raised to.
    pub fn new(degree: usize, knots: &KnotVector<T>, points: &[DVector<T>], pad: usize) -> Self {
        let last = knots.len() - 1;
        let base: Vec<T> = knots
            .iter()
            .take(last)
            .flat_map(|km| std::iter::repeat_n(km.knot(), km.multiplicity()))
            .collect();
        let n = base.len() as isize;
        let ghosts = (degree + 1 - knots.multiplicity(0)) as isize;
        let period = knots.period();
        let pad_i = pad as isize;
        let deg = degree as isize;
        let lo = -(pad_i * n + deg + 1);
        let hi = (pad_i + 1) * n + deg + 1;

        let flat = (lo..=hi)
            .map(|j| {
                base[j.rem_euclid(n) as usize] + period * T::from_isize(j.div_euclid(n)).unwrap()
            })
            .collect();
        let poles = (lo..=hi - deg - 1)
            .map(|j| points[(j + ghosts).rem_euclid(n) as usize].clone())
            .collect();

        Self {
            curve: FlatCurve::new(degree, flat, poles),
            origin: knots.first(),
            period,
            pad,
        }
    }

    /// Padding sufficient for a curve of `nb_poles` poles raised to `degree`
    pub fn padding(nb_poles: usize, degree: usize) -> usize {
        (degree + 1).div_ceil(nb_poles.max(1)).max(1)
    }

    fn shifted(&self, u: T, periods: isize) -> T {
        u + self.period * T::from_isize(periods).unwrap()
    }

    fn copies(&self, u: T) -> impl Iterator<Item = T> + '_ {
        let pad = self.pad as isize;
        (-pad..=pad).map(move |c| self.shifted(u, c))
    }

    /// Insert every copy of the knot `u`
    pub fn insert(&mut self, u: T, r: usize) {
        let copies: Vec<T> = self.copies(u).collect();
        for v in copies {
            self.curve.insert(v, r);
        }
    }

    /// Remove `times` copies of `u` at every period, `false` if any removal is refused
    pub fn remove(&mut self, u: T, times: usize, tolerance: T) -> bool {
        let copies: Vec<T> = self.copies(u).collect();
        for v in copies {
            for _ in 0..times {
                if !self.curve.remove_once(v, Some(tolerance)) {
                    return false;
                }
            }
        }
        true
    }

    /// Clamp the window and raise its degree by `t`
    pub fn elevate(&mut self, t: usize) {
        let pad = self.pad as isize;
        let a = self.shifted(self.origin, -pad);
        let b = self.shifted(self.origin, pad + 1);
        self.curve.restrict(a, b);
        self.curve = self.curve.elevate(t);
    }

    /// The `count` poles of the principal period, starting at the seam
    pub fn principal_poles(&self, count: usize) -> Vec<DVector<T>> {
        let anchor = self.curve.knots.partition_point(|k| *k <= self.origin) - 1;
        let start = anchor - self.curve.degree;
        self.curve.points[start..start + count].to_vec()
    }
}
