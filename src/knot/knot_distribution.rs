/// Classification of a knot vector by spacing and multiplicity pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KnotDistribution {
    /// Equally spaced knots, every multiplicity is 1.
    Uniform,
    /// Equally spaced knots, end multiplicities `degree + 1`, interior multiplicities 1.
    QuasiUniform,
    /// Equally spaced knots, interior multiplicities `degree`: a chain of Bezier segments.
    PiecewiseBezier,
    NonUniform,
}

/// Parametric continuity class over the interior of the curve.
/// Anything smoother than C3 but not infinitely smooth reports C3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Continuity {
    C0,
    C1,
    C2,
    C3,
    CN,
}

impl Continuity {
    /// Continuity from the degree and the largest interior multiplicity.
    /// A zero multiplicity means there is no interior knot at all.
    pub fn from_max_multiplicity(degree: usize, max_multiplicity: usize) -> Self {
        if max_multiplicity == 0 {
            return Continuity::CN;
        }
        match degree.saturating_sub(max_multiplicity) {
            0 => Continuity::C0,
            1 => Continuity::C1,
            2 => Continuity::C2,
            _ => Continuity::C3,
        }
    }
}

/// Multiplicity pattern, the second half of the distribution analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MultiplicityForm {
    /// Every multiplicity is the same.
    Constant,
    /// Ends equal each other, interior constant but different from the ends.
    QuasiConstant,
    NonConstant,
}

impl MultiplicityForm {
    pub(crate) fn of(mults: &[usize]) -> Self {
        if mults.len() < 2 {
            return MultiplicityForm::Constant;
        }
        let first = mults[0];
        let last = mults.len() - 1;
        let mut form = MultiplicityForm::Constant;
        let mut mult = mults[1];
        for i in 1..=last {
            if form == MultiplicityForm::NonConstant {
                break;
            }
            if i == 1 {
                if mult != first {
                    form = MultiplicityForm::QuasiConstant;
                }
            } else if i == last {
                let reference = if form == MultiplicityForm::QuasiConstant {
                    first
                } else {
                    mult
                };
                if mults[i] != reference {
                    form = MultiplicityForm::NonConstant;
                }
            } else {
                if mults[i] != mult {
                    form = MultiplicityForm::NonConstant;
                }
                mult = mults[i];
            }
        }
        form
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn continuity_from_multiplicity() {
        assert_eq!(Continuity::from_max_multiplicity(3, 0), Continuity::CN);
        assert_eq!(Continuity::from_max_multiplicity(3, 3), Continuity::C0);
        assert_eq!(Continuity::from_max_multiplicity(3, 2), Continuity::C1);
        assert_eq!(Continuity::from_max_multiplicity(3, 1), Continuity::C2);
        assert_eq!(Continuity::from_max_multiplicity(7, 1), Continuity::C3);
        assert!(Continuity::C1 < Continuity::CN);
    }

    #[test]
    fn multiplicity_forms() {
        assert_eq!(MultiplicityForm::of(&[1, 1, 1, 1]), MultiplicityForm::Constant);
        assert_eq!(
            MultiplicityForm::of(&[4, 1, 1, 4]),
            MultiplicityForm::QuasiConstant
        );
        assert_eq!(
            MultiplicityForm::of(&[4, 1, 2, 4]),
            MultiplicityForm::NonConstant
        );
        assert_eq!(
            MultiplicityForm::of(&[4, 1, 1, 3]),
            MultiplicityForm::NonConstant
        );
    }
}
