use thiserror::Error;

/// Errors raised by curve construction and mutation.
///
/// A rejected call never leaves a partially mutated curve behind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CurveError {
    /// Invalid structural data: degree, pole count, knot ordering, weights.
    #[error("construction error: {0}")]
    Construction(String),
    /// An index outside of `[lower, upper]`.
    #[error("index {index} is out of range [{lower}, {upper}]")]
    OutOfRange {
        index: usize,
        lower: usize,
        upper: usize,
    },
    /// A malformed index range where `first > last`.
    #[error("invalid index range: {first} > {last}")]
    InvalidRange { first: usize, last: usize },
    /// The call makes no sense for the current state of the curve.
    #[error("domain error: {0}")]
    Domain(String),
}

pub type Result<T> = std::result::Result<T, CurveError>;

/// Returns `Ok(())` when `index` lies within `[lower, upper]`.
pub(crate) fn check_index(index: usize, lower: usize, upper: usize) -> Result<()> {
    if index < lower || index > upper {
        Err(CurveError::OutOfRange {
            index,
            lower,
            upper,
        })
    } else {
        Ok(())
    }
}

/// Early return with a construction error, in the manner of `anyhow::ensure!`.
macro_rules! ensure_construction {
    ($cond:expr, $($arg:tt)+) => {
        if !$cond {
            return Err($crate::error::CurveError::Construction(format!($($arg)+)));
        }
    };
}

pub(crate) use ensure_construction;
