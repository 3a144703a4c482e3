use nalgebra::RealField;

/// Binomial coefficients backed by a lazily grown Pascal triangle.
/// Degree elevation and rational derivatives query the same small rows repeatedly.
#[derive(Clone, Debug, Default)]
pub struct Binomial<T> {
    rows: Vec<Vec<T>>,
}

impl<T: RealField + Copy> Binomial<T> {
    pub fn new() -> Self {
        Self { rows: vec![] }
    }

    /// Returns `n choose k`, zero when `k > n`.
    pub fn get(&mut self, n: usize, k: usize) -> T {
        if k > n {
            return T::zero();
        }
        while self.rows.len() <= n {
            let row = match self.rows.last() {
                None => vec![T::one()],
                Some(prev) => {
                    let mut row = Vec::with_capacity(prev.len() + 1);
                    row.push(T::one());
                    row.extend(prev.windows(2).map(|w| w[0] + w[1]));
                    row.push(T::one());
                    row
                }
            };
            self.rows.push(row);
        }
        self.rows[n][k]
    }
}
