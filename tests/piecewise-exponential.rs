use postsurv::{
    Arm, Changepoints, EvaluateError, PiecewiseHazard, PosteriorSamples, SurvivalCurve,
    difference_curve, draw_hazards, evaluate, evaluate_log_scales, median_survival,
    restricted_mean_survival, survival_curve, survival_probability,
};
use std::f64::consts::E;

mod common;

use common::{assert_close, assert_close_slice, random_samples};

const CUTS: [f64; 4] = [6.0, 12.0, 18.0, 24.0];

fn single_draw(changepoints: &[f64], log_scales: &[f64]) -> PosteriorSamples {
    let cuts = Changepoints::new(changepoints).unwrap();
    let table: Vec<Vec<f64>> = log_scales.iter().map(|&value| vec![value]).collect();
    PosteriorSamples::from_log_scales(cuts, table.clone(), table).unwrap()
}

#[test]
fn unit_scales_with_one_changepoint_follow_closed_form() {
    let samples = single_draw(&[6.0], &[0.0, 0.0]);

    assert_eq!(evaluate(0.0, Arm::Control, &samples).unwrap(), vec![1.0]);
    assert_close(evaluate(3.0, Arm::Control, &samples).unwrap()[0], (-3.0_f64).exp());
    assert_close(evaluate(6.0, Arm::Control, &samples).unwrap()[0], (-6.0_f64).exp());
    assert_close(
        evaluate(10.0, Arm::Control, &samples).unwrap()[0],
        (-6.0_f64).exp() * (-4.0_f64).exp(),
    );
    assert_close(evaluate(10.0, Arm::Control, &samples).unwrap()[0], (-10.0_f64).exp());
}

#[test]
fn log_scale_one_over_two_changepoints_follows_closed_form() {
    let samples = single_draw(&[6.0, 12.0], &[1.0, 1.0, 1.0]);

    let value = evaluate(12.0, Arm::Experimental, &samples).unwrap()[0];
    assert_close(value, (-6.0 / E).exp() * (-6.0 / E).exp());
    assert_close(value, (-12.0 / E).exp());
}

#[test]
fn survival_at_time_zero_is_exactly_one() {
    let samples = random_samples(11, &CUTS, 200);
    for arm in Arm::ALL {
        let draws = evaluate(0.0, arm, &samples).unwrap();
        assert!(draws.iter().all(|&value| value == 1.0));
    }
}

#[test]
fn survival_is_non_increasing_and_within_unit_interval() {
    let samples = random_samples(2024, &CUTS, 100);
    let times: Vec<f64> = (0..=240).map(|k| k as f64 * 0.25).collect();

    for arm in Arm::ALL {
        let curve = survival_curve(&times, arm, &samples).unwrap();
        for draw in 0..curve.draw_count() {
            let trajectory = curve.draw(draw);
            assert!(trajectory.iter().all(|&value| value > 0.0 && value <= 1.0));
            for pair in trajectory.windows(2) {
                assert!(pair[1] <= pair[0], "draw {draw} increased: {pair:?}");
            }
        }
    }
}

#[test]
fn survival_is_continuous_at_changepoints() {
    let samples = random_samples(7, &CUTS, 50);
    let eps = 1e-9;

    for arm in Arm::ALL {
        for &cut in &CUTS {
            let at = evaluate(cut, arm, &samples).unwrap();
            let before = evaluate(cut - eps, arm, &samples).unwrap();
            let after = evaluate(cut + eps, arm, &samples).unwrap();
            for ((a, b), c) in at.iter().zip(&before).zip(&after) {
                assert!((a - b).abs() < 1e-8);
                assert!((a - c).abs() < 1e-8);
            }
        }
    }
}

#[test]
fn segment_starting_at_query_time_does_not_contribute() {
    let first = single_draw(&[6.0], &[0.0, 0.0]);
    let second = single_draw(&[6.0], &[0.0, -5.0]);

    assert_eq!(
        evaluate(6.0, Arm::Control, &first).unwrap(),
        evaluate(6.0, Arm::Control, &second).unwrap()
    );
    assert!(
        evaluate(6.5, Arm::Control, &second).unwrap()[0]
            < evaluate(6.5, Arm::Control, &first).unwrap()[0]
    );
}

#[test]
fn time_before_first_changepoint_uses_first_segment_only() {
    let samples = single_draw(&CUTS, &[1.5, -3.0, -3.0, -3.0, -3.0]);
    let value = evaluate(4.0, Arm::Control, &samples).unwrap()[0];
    assert_close(value, (-4.0 / 1.5_f64.exp()).exp());
}

#[test]
fn time_beyond_last_changepoint_uses_open_segment() {
    let log_scales = [2.0, 2.5, 3.0, 3.5, 4.0];
    let samples = single_draw(&CUTS, &log_scales);
    let value = evaluate(30.0, Arm::Control, &samples).unwrap()[0];

    let hazard: f64 = log_scales[..4]
        .iter()
        .map(|ls| 6.0 / ls.exp())
        .sum::<f64>()
        + 6.0 / log_scales[4].exp();
    assert_close(value, (-hazard).exp());
}

#[test]
fn evaluation_is_idempotent() {
    let samples = random_samples(99, &CUTS, 64);
    for arm in Arm::ALL {
        let first = evaluate(17.3, arm, &samples).unwrap();
        let second = evaluate(17.3, arm, &samples).unwrap();
        assert_eq!(first, second);
    }
}

#[test]
fn evaluate_agrees_with_single_draw_evaluation() {
    let samples = random_samples(5, &CUTS, 20);
    let draws = evaluate(19.0, Arm::Experimental, &samples).unwrap();

    for (idx, &value) in draws.iter().enumerate() {
        let log_scales = samples.draw_log_scales(Arm::Experimental, idx);
        let single = survival_probability(19.0, samples.changepoints(), &log_scales).unwrap();
        assert_eq!(value, single);
    }
}

#[test]
fn invalid_query_times_are_rejected() {
    let samples = single_draw(&[6.0], &[0.0, 0.0]);

    assert!(matches!(
        evaluate(-0.5, Arm::Control, &samples).unwrap_err(),
        EvaluateError::NegativeTime { value } if value == -0.5
    ));
    assert!(matches!(
        evaluate(f64::NAN, Arm::Control, &samples).unwrap_err(),
        EvaluateError::NonFiniteTime { .. }
    ));
    assert!(matches!(
        evaluate(f64::INFINITY, Arm::Control, &samples).unwrap_err(),
        EvaluateError::NonFiniteTime { .. }
    ));
}

#[test]
fn raw_tables_with_bad_shapes_are_rejected() {
    let cuts = Changepoints::new(&[6.0, 12.0]).unwrap();

    assert!(matches!(
        evaluate_log_scales(1.0, &cuts, &[vec![0.0], vec![0.0]]).unwrap_err(),
        EvaluateError::LogScaleCountMismatch {
            expected: 3,
            found: 2
        }
    ));
    assert!(matches!(
        evaluate_log_scales(1.0, &cuts, &[vec![0.0, 1.0], vec![0.0], vec![0.0, 1.0]])
            .unwrap_err(),
        EvaluateError::DrawCountMismatch {
            segment: 1,
            expected: 2,
            found: 1
        }
    ));
    assert!(matches!(
        evaluate_log_scales(1.0, &cuts, &[vec![0.0], vec![f64::NAN], vec![0.0]]).unwrap_err(),
        EvaluateError::NonFiniteLogScale { segment: 1 }
    ));
    assert!(matches!(
        PiecewiseHazard::new(&cuts, &[0.0, 0.0]).unwrap_err(),
        EvaluateError::LogScaleCountMismatch { .. }
    ));
}

#[test]
fn quantile_time_inverts_survival() {
    let cuts = Changepoints::new(&CUTS).unwrap();
    let hazard = PiecewiseHazard::new(&cuts, &[2.0, 2.4, 2.8, 3.2, 3.6]).unwrap();

    for &p in &[0.99, 0.9, 0.75, 0.5, 0.3, 0.1, 0.01] {
        let time = hazard.quantile_time(p).unwrap();
        assert_close(hazard.survival(time).unwrap(), p);
    }
    assert_eq!(hazard.quantile_time(1.0).unwrap(), 0.0);
    assert!(matches!(
        hazard.quantile_time(0.0).unwrap_err(),
        EvaluateError::ProbabilityOutOfRange { .. }
    ));
    assert!(hazard.quantile_time(1.5).is_err());
}

#[test]
fn median_survival_matches_half_quantile() {
    let samples = random_samples(31, &CUTS, 25);
    let medians = median_survival(Arm::Control, &samples).unwrap();
    let hazards = draw_hazards(Arm::Control, &samples).unwrap();

    for (median, hazard) in medians.iter().zip(&hazards) {
        assert_close(*median, hazard.quantile_time(0.5).unwrap());
        assert_close(hazard.survival(*median).unwrap(), 0.5);
    }
}

#[test]
fn restricted_mean_of_single_segment_follows_closed_form() {
    let cuts = Changepoints::new(&[100.0]).unwrap();
    let scale = 2.0_f64.exp();
    let hazard = PiecewiseHazard::new(&cuts, &[2.0, 0.0]).unwrap();

    let rmst = hazard.restricted_mean(10.0).unwrap();
    assert_close(rmst, scale * (1.0 - (-10.0 / scale).exp()));
    assert_eq!(hazard.restricted_mean(0.0).unwrap(), 0.0);
}

#[test]
fn restricted_mean_matches_numerical_integration() {
    let samples = random_samples(17, &CUTS, 10);
    let horizon = 30.0;
    let rmst = restricted_mean_survival(horizon, Arm::Experimental, &samples).unwrap();
    let hazards = draw_hazards(Arm::Experimental, &samples).unwrap();

    let steps = 30_000;
    let width = horizon / steps as f64;
    for (area, hazard) in rmst.iter().zip(&hazards) {
        let trapezoid: f64 = (0..steps)
            .map(|k| {
                let left = hazard.survival(k as f64 * width).unwrap();
                let right = hazard.survival((k + 1) as f64 * width).unwrap();
                0.5 * (left + right) * width
            })
            .sum();
        assert!((area - trapezoid).abs() < 1e-6, "{area} vs {trapezoid}");
    }
}

#[test]
fn difference_curve_subtracts_control_from_experimental() {
    let samples = random_samples(3, &CUTS, 40);
    let times = [0.0, 6.0, 13.5, 30.0];

    let control = survival_curve(&times, Arm::Control, &samples).unwrap();
    let experimental = survival_curve(&times, Arm::Experimental, &samples).unwrap();
    let difference = difference_curve(&times, &samples).unwrap();

    assert_eq!(difference.times(), &times);
    assert_eq!(difference.draw_count(), 40);
    for k in 0..times.len() {
        let expected: Vec<f64> = experimental
            .at(k)
            .iter()
            .zip(control.at(k))
            .map(|(e, c)| e - c)
            .collect();
        assert_close_slice(difference.at(k), &expected);
    }
    assert!(difference.at(0).iter().all(|&value| value == 0.0));
}

#[test]
fn curves_need_at_least_one_time_point() {
    let samples = random_samples(1, &CUTS, 4);
    assert!(matches!(
        survival_curve(&[], Arm::Control, &samples).unwrap_err(),
        EvaluateError::EmptyTimeGrid
    ));
}

#[test]
fn underflowed_scales_keep_survival_defined() {
    let samples = single_draw(&[6.0], &[-800.0, 0.0]);
    let hazards = draw_hazards(Arm::Control, &samples).unwrap();

    assert_eq!(evaluate(0.0, Arm::Control, &samples).unwrap(), vec![1.0]);
    assert_eq!(hazards[0].survival(0.0).unwrap(), 1.0);
    assert_eq!(hazards[0].restricted_mean(0.0).unwrap(), 0.0);

    for &t in &[0.5, 6.0, 10.0] {
        assert_eq!(evaluate(t, Arm::Control, &samples).unwrap(), vec![0.0]);
        assert_eq!(hazards[0].survival(t).unwrap(), 0.0);
    }
    assert!(!hazards[0].restricted_mean(10.0).unwrap().is_nan());
}

#[test]
fn curves_need_at_least_one_draw() {
    assert!(matches!(
        SurvivalCurve::new(vec![6.0, 12.0], vec![Vec::new(), Vec::new()]).unwrap_err(),
        EvaluateError::EmptyDraws
    ));
}
