use nalgebra::DVector;

use crate::knot::FlatKnots;
use crate::misc::FloatingPoint;

/// Polynomial form of the curve over a single knot span.
///
/// The homogeneous curve on the span `[origin, origin + length]` is stored as
/// Taylor coefficients in the normalized parameter `t = (u - origin) / length`,
/// so evaluation inside the span is a single Horner pass.
#[derive(Clone, Debug)]
pub struct SpanCache<T> {
    valid: bool,
    origin: T,
    length: T,
    span: usize,
    last_span: bool,
    coefficients: Vec<DVector<T>>,
}

impl<T: FloatingPoint> Default for SpanCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: FloatingPoint> SpanCache<T> {
    /// Create an empty, invalid cache
    pub fn new() -> Self {
        Self {
            valid: false,
            origin: T::zero(),
            length: T::one(),
            span: 0,
            last_span: false,
            coefficients: vec![],
        }
    }

    pub fn invalidate(&mut self) {
        self.valid = false;
    }

    /// Span index of the cached polynomial, if any
    pub fn span(&self) -> Option<usize> {
        self.valid.then_some(self.span)
    }

    pub fn origin(&self) -> T {
        self.origin
    }

    pub fn length(&self) -> T {
        self.length
    }

    /// Returns true if `u` can be evaluated from the cached span.
    /// The last span also accepts its closing knot.
    pub fn is_valid(&self, u: T) -> bool {
        if !self.valid {
            return false;
        }
        let d = u - self.origin;
        d >= T::zero() && (d < self.length || self.last_span)
    }

    /// Rebuild the cache for the span `span` of the flat knots.
    /// `pole` returns the homogeneous pole of the given flat index.
    pub(crate) fn rebuild<F>(&mut self, degree: usize, knots: &FlatKnots<T>, span: usize, pole: F)
    where
        F: Fn(usize) -> DVector<T>,
    {
        let origin = knots[span];
        let length = knots[span + 1] - origin;
        let last = knots.len() - degree - 2;
        let ders = knots.derivative_basis_functions(span, origin, degree, degree);

        let poles: Vec<DVector<T>> = (0..=degree).map(|j| pole(span - degree + j)).collect();
        let dim = poles[0].len();
        if self.coefficients.len() != degree + 1 {
            self.coefficients = vec![DVector::zeros(dim); degree + 1];
        }

        let mut scale = T::one();
        for (k, row) in ders.iter().enumerate() {
            if k > 0 {
                scale = scale * length / T::from_usize(k).unwrap();
            }
            let mut c = DVector::zeros(dim);
            for (j, p) in poles.iter().enumerate() {
                c += p * row[j];
            }
            self.coefficients[k] = c * scale;
        }

        self.origin = origin;
        self.length = length;
        self.span = span;
        self.last_span = span >= last;
        self.valid = true;
    }

    /// Homogeneous derivatives of order `0..=n` at `u`
    pub fn derivatives(&self, u: T, n: usize) -> Vec<DVector<T>> {
        let degree = self.coefficients.len() - 1;
        let dim = self.coefficients[0].len();
        let t = (u - self.origin) / self.length;
        let mut inv_length = T::one();
        (0..=n)
            .map(|d| {
                if d > 0 {
                    inv_length /= self.length;
                }
                if d > degree {
                    return DVector::zeros(dim);
                }
                let mut value = DVector::zeros(dim);
                for k in (d..=degree).rev() {
                    let falling = (k - d + 1..=k).fold(T::one(), |acc, f| {
                        acc * T::from_usize(f).unwrap()
                    });
                    value = value * t + &self.coefficients[k] * falling;
                }
                value * inv_length
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use nalgebra::DVector;

    use super::*;

    #[test]
    fn reproduces_the_span_polynomial() {
        let knots = FlatKnots::new(vec![0., 0., 0., 2., 4., 4., 4.]);
        let poles = [
            DVector::from_vec(vec![0., 0.]),
            DVector::from_vec(vec![1., 2.]),
            DVector::from_vec(vec![3., 2.]),
            DVector::from_vec(vec![4., 0.]),
        ];
        let mut cache = SpanCache::new();
        assert!(!cache.is_valid(1.0));
        let span = knots.span_index(2, 3.0);
        cache.rebuild(2, &knots, span, |i| poles[i].clone());
        assert_eq!(cache.span(), Some(3));
        assert_eq!(cache.origin(), 2.);
        assert_eq!(cache.length(), 2.);
        assert!(cache.is_valid(2.0));
        assert!(cache.is_valid(4.0));
        assert!(!cache.is_valid(1.5));

        for u in [2.0, 2.5, 3.0, 3.75, 4.0] {
            let basis = knots.basis_functions(span, u, 2);
            let mut expected = DVector::zeros(2);
            for (j, b) in basis.iter().enumerate() {
                expected += &poles[span - 2 + j] * *b;
            }
            let ders = cache.derivatives(u, 3);
            assert_relative_eq!(ders[0], expected, epsilon = 1e-12);
            assert_relative_eq!(ders[3], DVector::zeros(2));

            let basis = knots.derivative_basis_functions(span, u, 2, 1);
            let mut tangent = DVector::zeros(2);
            for (j, b) in basis[1].iter().enumerate() {
                tangent += &poles[span - 2 + j] * *b;
            }
            assert_relative_eq!(ders[1], tangent, epsilon = 1e-12);
        }

        cache.invalidate();
        assert_eq!(cache.span(), None);
    }
}
