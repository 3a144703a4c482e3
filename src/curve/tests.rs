use approx::assert_relative_eq;
use nalgebra::{Matrix3, Point2, Vector2};

use crate::error::CurveError;
use crate::prelude::*;

fn open_curve() -> BSplineCurve2D<f64> {
    BSplineCurve2D::try_new(
        vec![
            Point2::new(0., 0.),
            Point2::new(1., 2.),
            Point2::new(2., -1.),
            Point2::new(3., 3.),
            Point2::new(4., 0.),
            Point2::new(5., 2.),
            Point2::new(6., 1.),
        ],
        vec![0., 1., 2., 3., 4.],
        vec![4, 1, 1, 1, 4],
        3,
        false,
    )
    .unwrap()
}

fn periodic_curve() -> BSplineCurve2D<f64> {
    let poles = (0..6)
        .map(|i| {
            let a = std::f64::consts::TAU * i as f64 / 6.;
            Point2::new(a.cos() * (1. + 0.1 * i as f64), a.sin())
        })
        .collect();
    BSplineCurve2D::try_new(poles, (0..7).map(|i| i as f64).collect(), vec![1; 7], 3, true)
        .unwrap()
}

fn quarter_circle() -> BSplineCurve2D<f64> {
    BSplineCurve2D::try_new_rational(
        vec![Point2::new(1., 0.), Point2::new(1., 1.), Point2::new(0., 1.)],
        vec![1., std::f64::consts::FRAC_1_SQRT_2, 1.],
        vec![0., 1.],
        vec![3, 3],
        2,
        false,
        true,
    )
    .unwrap()
}

fn samples(from: f64, to: f64, count: usize) -> impl Iterator<Item = f64> {
    (0..=count).map(move |i| from + (to - from) * i as f64 / count as f64)
}

fn assert_same_points(a: &BSplineCurve2D<f64>, b: &BSplineCurve2D<f64>, from: f64, to: f64) {
    for u in samples(from, to, 64) {
        assert_relative_eq!(a.point_at(u), b.point_at(u), epsilon = 1e-9);
    }
}

#[test]
fn construction_errors() {
    let poles = open_curve().poles().to_vec();
    let knots = vec![0., 1., 2., 3., 4.];
    let mults = vec![4, 1, 1, 1, 4];
    let construction =
        |r: Result<BSplineCurve2D<f64>>| matches!(r, Err(CurveError::Construction(_)));

    assert!(construction(BSplineCurve2D::try_new(
        poles.clone(),
        knots.clone(),
        mults.clone(),
        0,
        false
    )));
    assert!(construction(BSplineCurve2D::try_new(
        poles.clone(),
        knots.clone(),
        mults.clone(),
        MAX_DEGREE + 1,
        false
    )));
    assert!(construction(BSplineCurve2D::try_new(
        poles.clone(),
        knots.clone(),
        vec![4, 1, 1, 4],
        3,
        false
    )));
    assert!(construction(BSplineCurve2D::try_new(
        poles[..1].to_vec(),
        vec![0., 1.],
        vec![1, 1],
        1,
        false
    )));
    assert!(construction(BSplineCurve2D::try_new(
        poles[..6].to_vec(),
        knots.clone(),
        mults.clone(),
        3,
        false
    )));
    assert!(construction(BSplineCurve2D::try_new(
        poles.clone(),
        vec![0., 1., 1., 3., 4.],
        mults.clone(),
        3,
        false
    )));
    assert!(construction(BSplineCurve2D::try_new_rational(
        poles.clone(),
        vec![1.; 6],
        knots.clone(),
        mults.clone(),
        3,
        false,
        false
    )));
    assert!(construction(BSplineCurve2D::try_new_rational(
        poles,
        vec![1., 1., 0., 1., 1., 1., 1.],
        knots,
        mults,
        3,
        false,
        false
    )));
}

#[test]
fn accessors() {
    let curve = open_curve();
    assert_eq!(curve.degree(), 3);
    assert_eq!(BSplineCurve2D::<f64>::max_degree(), 25);
    assert_eq!(curve.knots_domain(), (0., 4.));
    assert_eq!(curve.nb_poles(), 7);
    assert_eq!(curve.nb_knots(), 5);
    assert_eq!(curve.continuity(), Continuity::C2);
    assert_eq!(curve.knot_distribution(), KnotDistribution::QuasiUniform);
    assert!(curve.is_cn(2));
    assert!(!curve.is_cn(3));
    assert!(!curve.is_rational());
    assert!(!curve.is_closed(1e-7));
    assert_eq!(curve.weight(3), Ok(1.));
    assert_eq!(
        curve.knot(5),
        Err(CurveError::OutOfRange {
            index: 5,
            lower: 0,
            upper: 4
        })
    );
    assert!(matches!(curve.period(), Err(CurveError::Domain(_))));
    assert_relative_eq!(curve.start_point(), Point2::new(0., 0.));
    assert_relative_eq!(curve.end_point(), Point2::new(6., 1.));
    assert_eq!(curve.reversed_parameter(1.), 3.);

    let periodic = periodic_curve();
    assert_eq!(periodic.period(), Ok(6.));
    assert!(periodic.is_closed(1e-12));
    assert_eq!(periodic.continuity(), Continuity::C2);
    assert_eq!(periodic.first_knot_index(), 0);
    assert_eq!(periodic.last_knot_index(), 6);
}

#[test]
fn rational_evaluation() {
    let circle = quarter_circle();
    assert!(circle.is_rational());
    for u in samples(0., 1., 20) {
        let ders = circle.derivatives_at(u, 2);
        assert_relative_eq!(ders[0].norm(), 1., epsilon = 1e-12);
        assert_relative_eq!(ders[0].dot(&ders[1]), 0., epsilon = 1e-12);
    }
    let equal = BSplineCurve2D::try_new_rational(
        circle.poles().to_vec(),
        vec![2.; 3],
        vec![0., 1.],
        vec![3, 3],
        2,
        false,
        true,
    )
    .unwrap();
    assert!(!equal.is_rational());
}

#[test]
fn insertion_modes() {
    let original = open_curve();

    let mut curve = original.clone();
    curve
        .insert_knot(2., 3, 0., MultiplicityMode::Set)
        .unwrap();
    assert_eq!(curve.knots().multiplicities(), &[4, 1, 3, 1, 4]);
    assert_eq!(curve.nb_poles(), 9);
    assert_same_points(&curve, &original, 0., 4.);

    let mut curve = original.clone();
    curve
        .insert_knot(2., 5, 0., MultiplicityMode::Add)
        .unwrap_err();
    curve
        .insert_knot(2., 4, 0., MultiplicityMode::Add)
        .unwrap();
    assert_eq!(curve.knots().multiplicities(), &[4, 1, 3, 1, 4]);

    let mut curve = original.clone();
    curve
        .insert_knot(1. + 1e-12, 1, 1e-9, MultiplicityMode::Add)
        .unwrap();
    assert_eq!(curve.knots().knots(), &[0., 1., 2., 3., 4.]);
    assert_eq!(curve.knots().multiplicities(), &[4, 2, 1, 1, 4]);

    let mut curve = original.clone();
    curve
        .insert_knot(2., 1, 0., MultiplicityMode::Set)
        .unwrap();
    assert_eq!(curve.nb_poles(), 7);

    let mut curve = original.clone();
    curve
        .insert_knots(&[0.5, 0.5, 2.5], &[1, 1, 2], 0., MultiplicityMode::Add)
        .unwrap();
    assert_eq!(curve.knots().knots(), &[0., 0.5, 1., 2., 2.5, 3., 4.]);
    assert_eq!(curve.knots().multiplicities(), &[4, 2, 1, 1, 2, 1, 4]);
    assert_same_points(&curve, &original, 0., 4.);
}

#[test]
fn insertion_errors_leave_the_curve_intact() {
    let original = open_curve();
    let mut curve = original.clone();
    for (knots, mults) in [
        (vec![5.], vec![1]),
        (vec![2., 1.], vec![1, 1]),
        (vec![1.5], vec![1, 1]),
        (vec![0.5, 0.5], vec![3, 3]),
    ] {
        assert!(matches!(
            curve.insert_knots(&knots, &mults, 0., MultiplicityMode::Add),
            Err(CurveError::Construction(_))
        ));
    }
    assert_eq!(curve.knots(), original.knots());
    assert_eq!(curve.poles(), original.poles());
}

#[test]
fn failed_multiplicity_edit_keeps_the_knots() {
    let original = open_curve();
    let mut curve = original.clone();
    assert!(matches!(
        curve.set_knot_with_multiplicity(2, 3.5, 2),
        Err(CurveError::Construction(_))
    ));
    assert_eq!(curve.knots().multiplicities(), &[4, 1, 1, 1, 4]);
    assert_eq!(curve.poles(), original.poles());
}

#[test]
fn multiplicity_ranges() {
    let original = open_curve();
    let mut curve = original.clone();
    curve.increase_multiplicity_range(1, 3, 2).unwrap();
    assert_eq!(curve.knots().multiplicities(), &[4, 2, 2, 2, 4]);
    assert_eq!(curve.nb_poles(), 10);
    assert_same_points(&curve, &original, 0., 4.);

    curve.increment_multiplicity(1, 2, 1).unwrap();
    assert_eq!(curve.knots().multiplicities(), &[4, 3, 3, 2, 4]);
    assert_same_points(&curve, &original, 0., 4.);

    curve.increase_multiplicity(3, 1).unwrap();
    assert_eq!(curve.knots().multiplicities(), &[4, 3, 3, 2, 4]);

    assert!(matches!(
        curve.increase_multiplicity(5, 2),
        Err(CurveError::OutOfRange { index: 5, .. })
    ));
    assert_eq!(
        curve.increment_multiplicity(3, 1, 1),
        Err(CurveError::InvalidRange { first: 3, last: 1 })
    );
}

#[test]
fn periodic_insertion() {
    let original = periodic_curve();

    let mut curve = original.clone();
    curve
        .insert_knot(2.5, 2, 0., MultiplicityMode::Add)
        .unwrap();
    assert!(curve.is_periodic());
    assert_eq!(curve.nb_poles(), 8);
    assert_same_points(&curve, &original, 0., 6.);

    let mut curve = original.clone();
    curve
        .insert_knot(0., 1, 0., MultiplicityMode::Add)
        .unwrap();
    let mults = curve.knots().multiplicities();
    assert_eq!(mults[0], 2);
    assert_eq!(mults[mults.len() - 1], 2);
    assert_eq!(curve.nb_poles(), 7);
    assert_same_points(&curve, &original, 0., 6.);
}

#[test]
fn removal() {
    let original = open_curve();

    let mut curve = original.clone();
    assert_eq!(curve.remove_knot(2, 0, 1e-9), Ok(false));
    assert_eq!(curve.poles(), original.poles());
    assert_eq!(curve.knots(), original.knots());

    assert!(matches!(
        curve.remove_knot(0, 0, 1e-9),
        Err(CurveError::OutOfRange { .. })
    ));
    assert!(matches!(
        curve.remove_knot(4, 0, 1e-9),
        Err(CurveError::OutOfRange { .. })
    ));
    assert_eq!(curve.remove_knot(2, 1, 1e-9), Ok(true));
    assert_eq!(curve.nb_poles(), 7);

    curve
        .insert_knot(2.5, 2, 0., MultiplicityMode::Add)
        .unwrap();
    assert_eq!(curve.remove_knot(3, 1, 1e-9), Ok(true));
    assert_eq!(curve.knots().multiplicities(), &[4, 1, 1, 1, 1, 4]);
    assert_eq!(curve.remove_knot(3, 0, 1e-9), Ok(true));
    assert_eq!(curve.knots().knots(), original.knots().knots());
    assert_same_points(&curve, &original, 0., 4.);
}

#[test]
fn periodic_removal() {
    let original = periodic_curve();
    let mut curve = original.clone();
    curve
        .insert_knot(2.5, 1, 0., MultiplicityMode::Add)
        .unwrap();
    assert_eq!(curve.nb_poles(), 7);
    assert_eq!(curve.remove_knot(3, 0, 1e-9), Ok(true));
    assert_eq!(curve.nb_poles(), 6);
    assert_same_points(&curve, &original, 0., 6.);

    assert!(matches!(
        curve.remove_knot(0, 0, 1e-9),
        Err(CurveError::Domain(_))
    ));
    let before = curve.clone();
    assert_eq!(curve.remove_knot(2, 0, 1e-9), Ok(false));
    assert_eq!(curve.poles(), before.poles());
    assert_eq!(curve.knots(), before.knots());
}

#[test]
fn elevation() {
    let original = open_curve();
    let mut curve = original.clone();
    curve.increase_degree(3).unwrap();
    assert_eq!(curve.poles(), original.poles());

    curve.increase_degree(5).unwrap();
    assert_eq!(curve.degree(), 5);
    assert_eq!(curve.knots().multiplicities(), &[6, 3, 3, 3, 6]);
    assert_eq!(curve.nb_poles(), 15);
    assert_eq!(curve.continuity(), Continuity::C2);
    assert_same_points(&curve, &original, 0., 4.);

    assert!(matches!(
        curve.increase_degree(4),
        Err(CurveError::Construction(_))
    ));
    assert!(matches!(
        curve.increase_degree(MAX_DEGREE + 1),
        Err(CurveError::Construction(_))
    ));

    let circle = quarter_circle();
    let mut elevated = circle.clone();
    elevated.increase_degree(4).unwrap();
    assert!(elevated.is_rational());
    assert_same_points(&elevated, &circle, 0., 1.);
}

#[test]
fn periodic_elevation() {
    let original = periodic_curve();
    let mut curve = original.clone();
    curve.increase_degree(4).unwrap();
    assert!(curve.is_periodic());
    assert_eq!(curve.knots().multiplicities(), &[2; 7]);
    assert_eq!(curve.nb_poles(), 12);
    assert_same_points(&curve, &original, 0., 6.);
}

#[test]
fn reversal() {
    for original in [open_curve(), periodic_curve(), quarter_circle()] {
        let mut curve = original.clone();
        curve.reverse();
        assert_eq!(curve.knots_domain(), original.knots_domain());
        let (first, last) = original.knots_domain();
        for u in samples(first, last, 32) {
            assert_relative_eq!(
                curve.point_at(original.reversed_parameter(u)),
                original.point_at(u),
                epsilon = 1e-9
            );
        }
        let twice = curve.inverse();
        assert_eq!(twice.poles(), original.poles());
        assert_eq!(twice.knots(), original.knots());
    }
}

#[test]
fn unperiodize() {
    let original = periodic_curve();
    let mut curve = original.clone();
    curve.set_not_periodic().unwrap();
    assert!(!curve.is_periodic());
    assert_eq!(curve.knots_domain(), (0., 6.));
    assert_eq!(curve.nb_poles(), 9);
    assert_same_points(&curve, &original, 0., 6.);

    curve.set_periodic().unwrap();
    assert!(curve.is_periodic());
    assert_eq!(curve.nb_poles(), 6);
    assert_same_points(&curve, &original, 0., 6.);
}

#[test]
fn origin() {
    let original = periodic_curve();

    let mut curve = original.clone();
    curve.set_origin(2).unwrap();
    assert_eq!(curve.knots_domain(), (2., 8.));
    assert_same_points(&curve, &original, 2., 8.);
    assert!(matches!(
        curve.set_origin(7),
        Err(CurveError::OutOfRange { .. })
    ));

    let mut curve = original.clone();
    curve.set_origin_at(2.5, 1e-9).unwrap();
    assert_eq!(curve.knots_domain(), (2.5, 8.5));
    assert_eq!(curve.nb_poles(), 7);
    assert_same_points(&curve, &original, 2.5, 8.5);

    let mut curve = original.clone();
    curve.set_origin_at(8.5, 1e-9).unwrap();
    assert_relative_eq!(curve.first_parameter(), 8.5);
    assert_same_points(&curve, &original, 8.5, 14.5);

    let mut open = open_curve();
    assert!(matches!(open.set_origin(1), Err(CurveError::Domain(_))));
    assert!(matches!(
        open.set_origin_at(1., 1e-9),
        Err(CurveError::Domain(_))
    ));
}

#[test]
fn segments() {
    let original = open_curve();
    let mut curve = original.clone();
    curve.segment(0.5, 3.2).unwrap();
    assert_eq!(curve.knots_domain(), (0.5, 3.2));
    assert_same_points(&curve, &original, 0.5, 3.2);

    let mut snapped = original.clone();
    snapped.segment_with_tolerance(1. + 1e-12, 3., 1e-9).unwrap();
    assert_eq!(snapped.knots_domain(), (1., 3.));

    // without a tolerance only the floating-point spacing snaps
    let mut near = original.clone();
    near.segment(1. + 1e-12, 3.).unwrap();
    assert_eq!(near.knots_domain(), (1. + 1e-12, 3.));
    let mut short = original.clone();
    short.segment(1.5, 1.5 + 1e-10).unwrap();
    assert_eq!(short.knots_domain(), (1.5, 1.5 + 1e-10));
    assert_relative_eq!(short.start_point(), original.point_at(1.5), epsilon = 1e-12);

    let mut curve = original.clone();
    for (u1, u2) in [(3., 1.), (-1., 2.), (1., 5.), (1., 1.)] {
        assert!(matches!(curve.segment(u1, u2), Err(CurveError::Domain(_))));
    }
    assert_eq!(curve.poles(), original.poles());
}

#[test]
fn periodic_segments() {
    let original = periodic_curve();

    let mut curve = original.clone();
    curve.segment(5., 7.5).unwrap();
    assert!(!curve.is_periodic());
    assert_eq!(curve.knots_domain(), (5., 7.5));
    assert_same_points(&curve, &original, 5., 7.5);

    let mut whole = original.clone();
    whole.segment(1., 7.).unwrap();
    assert_eq!(whole.knots_domain(), (1., 7.));
    assert_same_points(&whole, &original, 1., 7.);

    let mut curve = original.clone();
    assert!(matches!(curve.segment(2., 2.), Err(CurveError::Domain(_))));
    assert!(curve.is_periodic());
}

#[test]
fn knot_values() {
    let mut curve = open_curve();
    curve.set_knot(2, 2.5).unwrap();
    assert_eq!(curve.knot(2), Ok(2.5));
    assert!(matches!(
        curve.set_knot(2, 3.),
        Err(CurveError::Construction(_))
    ));
    assert!(matches!(
        curve.set_knot(5, 3.),
        Err(CurveError::OutOfRange { .. })
    ));

    curve.set_knot_with_multiplicity(1, 0.5, 2).unwrap();
    assert_eq!(curve.knots().knots(), &[0., 0.5, 2.5, 3., 4.]);
    assert_eq!(curve.knots().multiplicities(), &[4, 2, 1, 1, 4]);

    let before = curve.clone();
    assert!(matches!(
        curve.set_knot_with_multiplicity(2, 3.5, 2),
        Err(CurveError::Construction(_))
    ));
    assert_eq!(curve.knots(), before.knots());
    assert_eq!(curve.poles(), before.poles());

    assert!(curve.set_knots(&[0., 1., 2.]).is_err());
    assert!(curve.set_knots(&[0., 2., 1., 3., 4.]).is_err());
    curve.set_knots(&[0., 1., 2., 3., 10.]).unwrap();
    assert_eq!(curve.knots_domain(), (0., 10.));
}

#[test]
fn poles_and_weights() {
    let mut curve = open_curve();
    curve.set_pole(3, Point2::new(3., 4.)).unwrap();
    assert_eq!(curve.pole(3), Ok(&Point2::new(3., 4.)));
    assert!(curve.set_pole(7, Point2::origin()).is_err());

    curve.set_weight(2, 2.).unwrap();
    assert!(curve.is_rational());
    assert_eq!(curve.weight(2), Ok(2.));
    curve.set_weight(2, 1.).unwrap();
    assert!(!curve.is_rational());
    assert!(matches!(
        curve.set_weight(2, 0.),
        Err(CurveError::Construction(_))
    ));

    curve
        .set_pole_with_weight(1, Point2::new(1., 1.), 0.5)
        .unwrap();
    assert!(curve.is_rational());
    assert_eq!(curve.weights().map(|w| w[1]), Some(0.5));
}

#[test]
fn move_point_through_target() {
    let mut curve = open_curve();
    let target = Point2::new(2.5, 2.5);
    let moved = curve.move_point(1.7, &target, 0, 6).unwrap();
    assert!(moved.is_some());
    assert_relative_eq!(curve.point_at(1.7), target, epsilon = 1e-9);

    // pole 0 has no influence at u = 3.5
    let mut curve = open_curve();
    assert_eq!(curve.move_point(3.5, &target, 0, 0), Ok(None));
    assert_eq!(curve.poles(), open_curve().poles());
    assert_eq!(
        curve.move_point(1., &target, 4, 2),
        Err(CurveError::InvalidRange { first: 4, last: 2 })
    );
}

#[test]
fn move_point_and_tangent() {
    let original = open_curve();
    let mut curve = original.clone();
    let (p, d) = curve.d1(2.);
    let target = p + Vector2::new(0.1, 0.2);
    let tangent = d + Vector2::new(0.3, -0.1);
    let status = curve
        .move_point_and_tangent(2., &target, &tangent, None)
        .unwrap();
    assert_eq!(status, ConstraintStatus::Moved);
    let (q, e) = curve.d1(2.);
    assert_relative_eq!(q, target, epsilon = 1e-9);
    assert_relative_eq!(e, tangent, epsilon = 1e-9);
    assert_relative_eq!(curve.start_point(), original.start_point());
    assert_relative_eq!(curve.end_point(), original.end_point());

    let mut curve = original.clone();
    let options = TangentConstraintOptions::default().with_start_condition(4);
    let status = curve
        .move_point_and_tangent(2., &target, &tangent, Some(options))
        .unwrap();
    assert_eq!(status, ConstraintStatus::InvalidConditions);

    let status = curve
        .move_point_and_tangent(0., &target, &tangent, None)
        .unwrap();
    assert_eq!(status, ConstraintStatus::ParameterOutOfDomain);
    assert_eq!(curve.poles(), original.poles());

    let mut periodic = periodic_curve();
    let target = periodic.point_at(3.) + Vector2::new(0.05, 0.);
    let tangent = periodic.tangent_at(3.);
    let status = periodic
        .move_point_and_tangent(3., &target, &tangent, None)
        .unwrap();
    assert!(status.is_moved());
    assert!(!periodic.is_periodic());
    assert_relative_eq!(periodic.point_at(3.), target, epsilon = 1e-9);
}

#[test]
fn cache_tracks_the_span() {
    let mut curve = open_curve();
    assert_eq!(curve.cached_span(), None);
    assert!(!curve.is_cache_valid(0.5));

    curve.point_at(0.5);
    assert_eq!(curve.cached_span(), Some(3));
    assert!(curve.is_cache_valid(0.9));
    assert!(!curve.is_cache_valid(1.0));

    curve.validate_cache(4.);
    assert_eq!(curve.cached_span(), Some(6));
    assert!(curve.is_cache_valid(4.));

    curve.set_pole(2, Point2::new(2., 0.)).unwrap();
    assert_eq!(curve.cached_span(), None);

    let periodic = periodic_curve();
    assert_relative_eq!(periodic.point_at(7.), periodic.point_at(1.), epsilon = 1e-12);
    assert_relative_eq!(periodic.point_at(-2.), periodic.point_at(4.), epsilon = 1e-12);
}

#[test]
fn transform_and_cast() {
    let curve = open_curve();
    let moved = curve.transformed(&Matrix3::new(1., 0., 2., 0., 1., -1., 0., 0., 1.));
    for u in samples(0., 4., 8) {
        assert_relative_eq!(
            moved.point_at(u),
            curve.point_at(u) + Vector2::new(2., -1.),
            epsilon = 1e-12
        );
    }

    let single = curve.cast::<f32>();
    assert_eq!(single.nb_poles(), 7);
    assert_relative_eq!(single.point_at(2.).x, curve.point_at(2.).x as f32, epsilon = 1e-5);
}
