use std::ops::Index;

use crate::misc::FloatingPoint;

/// Flat knot sequence: every knot repeated by its multiplicity,
/// with the periodic wrap-around already applied.
#[derive(Clone, Debug, PartialEq)]
pub struct FlatKnots<T>(Vec<T>);

impl<T: FloatingPoint> FlatKnots<T> {
    pub fn new(knots: Vec<T>) -> Self {
        Self(knots)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.0
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.0.clone()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.0.iter()
    }

    /// Get the parametric domain for a given degree
    pub fn domain(&self, degree: usize) -> (T, T) {
        (self.0[degree], self.0[self.0.len() - 1 - degree])
    }

    /// Index of the span used to evaluate `u`, in `[degree, len - degree - 2]`.
    ///
    /// A parameter sitting exactly on a knot belongs to the span that starts there.
    /// Parameters beyond the domain fall back to the closest non-degenerate end span.
    /// # Example
    /// ```
    /// use bspline_curve::prelude::*;
    /// let knots = FlatKnots::new(vec![0., 0., 0., 1., 2., 3., 3., 3.]);
    /// assert_eq!(knots.span_index(2, 0.5), 2);
    /// assert_eq!(knots.span_index(2, 1.0), 3);
    /// assert_eq!(knots.span_index(2, 2.5), 4);
    /// assert_eq!(knots.span_index(2, 3.0), 4);
    /// assert_eq!(knots.span_index(2, -1.0), 2);
    /// ```
    pub fn span_index(&self, degree: usize, u: T) -> usize {
        let lower = degree;
        let upper = self.0.len() - degree - 2;
        let found = self.0.partition_point(|k| *k <= u);
        if found <= lower {
            let mut span = lower;
            while span < upper && self.0[span + 1] <= self.0[span] {
                span += 1;
            }
            span
        } else if found - 1 >= upper {
            let mut span = upper;
            while span > lower && self.0[span + 1] <= self.0[span] {
                span -= 1;
            }
            span
        } else {
            found - 1
        }
    }

    /// Compute the non-vanishing basis functions
    pub fn basis_functions(&self, knot_span_index: usize, u: T, degree: usize) -> Vec<T> {
        let mut basis_functions = vec![T::zero(); degree + 1];
        let mut left = vec![T::zero(); degree + 1];
        let mut right = vec![T::zero(); degree + 1];

        basis_functions[0] = T::one();

        for j in 1..=degree {
            left[j] = u - self[knot_span_index + 1 - j];
            right[j] = self[knot_span_index + j] - u;
            let mut saved = T::zero();

            for r in 0..j {
                let temp = basis_functions[r] / (right[r + 1] + left[j - r]);
                basis_functions[r] = saved + right[r + 1] * temp;
                saved = left[j - r] * temp;
            }

            basis_functions[j] = saved;
        }

        basis_functions
    }

    /// Compute the non-vanishing basis functions and their derivatives up to order `n` (at most `degree`)
    /// Row k of the result holds the k-th derivatives.
    pub fn derivative_basis_functions(
        &self,
        knot_index: usize,
        u: T,
        degree: usize,
        n: usize,
    ) -> Vec<Vec<T>> {
        let n = n.min(degree);
        let mut ndu = vec![vec![T::zero(); degree + 1]; degree + 1];
        let mut left = vec![T::zero(); degree + 1];
        let mut right = vec![T::zero(); degree + 1];

        ndu[0][0] = T::one();

        for j in 1..=degree {
            left[j] = u - self[knot_index + 1 - j];
            right[j] = self[knot_index + j] - u;

            let mut saved = T::zero();
            for r in 0..j {
                // lower triangle
                ndu[j][r] = right[r + 1] + left[j - r];
                let temp = ndu[r][j - 1] / ndu[j][r];

                // upper triangle
                ndu[r][j] = saved + right[r + 1] * temp;
                saved = left[j - r] * temp;
            }
            ndu[j][j] = saved;
        }

        let mut ders = vec![vec![T::zero(); degree + 1]; n + 1];
        let mut a = vec![vec![T::zero(); degree + 1]; 2];

        for j in 0..=degree {
            ders[0][j] = ndu[j][degree];
        }

        let idegree = degree as isize;
        let n = n as isize;

        for r in 0..=idegree {
            let mut s1 = 0;
            let mut s2 = 1;
            a[0][0] = T::one();

            for k in 1..=n {
                let mut d = T::zero();
                let rk = r - k;
                let pk = idegree - k;

                if r >= k {
                    a[s2][0] = a[s1][0] / ndu[(pk + 1) as usize][rk as usize];
                    d = a[s2][0] * ndu[rk as usize][pk as usize];
                }

                let j1 = if rk >= -1 { 1 } else { -rk };
                let j2 = if r - 1 <= pk { k - 1 } else { idegree - r };

                for j in j1..=j2 {
                    a[s2][j as usize] = (a[s1][j as usize] - a[s1][j as usize - 1])
                        / ndu[(pk + 1) as usize][(rk + j) as usize];
                    d += a[s2][j as usize] * ndu[(rk + j) as usize][pk as usize];
                }

                let uk = k as usize;
                let ur = r as usize;
                if r <= pk {
                    a[s2][uk] = -a[s1][(k - 1) as usize] / ndu[(pk + 1) as usize][ur];
                    d += a[s2][uk] * ndu[ur][pk as usize];
                }

                ders[uk][ur] = d;

                std::mem::swap(&mut s1, &mut s2);
            }
        }

        let mut acc = idegree;
        for k in 1..=n {
            for j in 0..=idegree {
                ders[k as usize][j as usize] *= T::from_isize(acc).unwrap();
            }
            acc *= idegree - k;
        }
        ders
    }

    /// Greville abscissae: the average of the `degree` knots following each pole index
    pub fn greville_abscissae(&self, degree: usize, nb_poles: usize) -> Vec<T> {
        let inv = T::one() / T::from_usize(degree.max(1)).unwrap();
        (0..nb_poles)
            .map(|i| {
                self.0[i + 1..=i + degree]
                    .iter()
                    .fold(T::zero(), |acc, k| acc + *k)
                    * inv
            })
            .collect()
    }
}

impl<T> Index<usize> for FlatKnots<T> {
    type Output = T;
    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl<T> FromIterator<T> for FlatKnots<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
