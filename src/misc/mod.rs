pub mod binomial;
pub mod floating_point;
pub mod traits;

pub use binomial::*;
pub use floating_point::*;
pub use traits::*;
