use postsurv::split::{Episode, SplitError, Subject, period_totals, split_at_changepoints};
use postsurv::{Arm, Changepoints};

fn cuts() -> Changepoints {
    Changepoints::new(&[6.0, 12.0, 18.0, 24.0]).unwrap()
}

#[test]
fn follow_up_is_split_into_segment_episodes() {
    let subjects = [
        Subject { time: 3.0, event: true, arm: Arm::Control },
        Subject { time: 12.0, event: false, arm: Arm::Experimental },
        Subject { time: 30.5, event: true, arm: Arm::Experimental },
    ];
    let episodes = split_at_changepoints(&subjects, &cuts()).unwrap();

    let first: Vec<&Episode> = episodes.iter().filter(|e| e.subject == 0).collect();
    assert_eq!(first.len(), 1);
    assert_eq!((first[0].start, first[0].stop, first[0].event), (0.0, 3.0, true));

    let second: Vec<&Episode> = episodes.iter().filter(|e| e.subject == 1).collect();
    assert_eq!(second.len(), 2);
    assert_eq!((second[1].period, second[1].start, second[1].stop), (1, 6.0, 12.0));
    assert!(second.iter().all(|e| !e.event && e.arm == Arm::Experimental));

    let third: Vec<&Episode> = episodes.iter().filter(|e| e.subject == 2).collect();
    assert_eq!(third.len(), 5);
    assert_eq!((third[4].start, third[4].stop), (24.0, 30.5));
    assert_eq!(third.iter().filter(|e| e.event).count(), 1);
    assert!(third[4].event);
}

#[test]
fn episode_exposures_sum_to_subject_time() {
    let subjects: Vec<Subject> = (1..=40)
        .map(|k| Subject {
            time: k as f64 * 0.75,
            event: k % 3 == 0,
            arm: if k % 2 == 0 { Arm::Control } else { Arm::Experimental },
        })
        .collect();
    let episodes = split_at_changepoints(&subjects, &cuts()).unwrap();

    for (idx, subject) in subjects.iter().enumerate() {
        let total: f64 = episodes
            .iter()
            .filter(|e| e.subject == idx)
            .map(Episode::exposure)
            .sum();
        assert!((total - subject.time).abs() < 1e-12);
    }
}

#[test]
fn totals_aggregate_exposure_and_events_per_arm_and_period() {
    let subjects = [
        Subject { time: 4.0, event: true, arm: Arm::Control },
        Subject { time: 8.0, event: true, arm: Arm::Control },
        Subject { time: 10.0, event: false, arm: Arm::Experimental },
    ];
    let episodes = split_at_changepoints(&subjects, &cuts()).unwrap();
    let totals = period_totals(&episodes, 5).unwrap();

    assert_eq!(totals.len(), 10);
    assert_eq!(totals[0].arm, Arm::Control);
    assert_eq!((totals[0].exposure, totals[0].events), (10.0, 1));
    assert_eq!((totals[1].exposure, totals[1].events), (2.0, 1));
    assert_eq!(totals[1].log_scale_estimate(), Some(2.0_f64.ln()));
    assert_eq!(totals[5].arm, Arm::Experimental);
    assert_eq!((totals[6].exposure, totals[6].events), (4.0, 0));
    assert_eq!(totals[6].log_scale_estimate(), None);
    assert_eq!(totals[9].exposure, 0.0);
}

#[test]
fn invalid_inputs_are_rejected() {
    let zero = [Subject { time: 0.0, event: false, arm: Arm::Control }];
    assert!(matches!(
        split_at_changepoints(&zero, &cuts()).unwrap_err(),
        SplitError::InvalidTime { subject: 0, .. }
    ));

    let nan = [
        Subject { time: 1.0, event: false, arm: Arm::Control },
        Subject { time: f64::NAN, event: true, arm: Arm::Control },
    ];
    assert!(matches!(
        split_at_changepoints(&nan, &cuts()).unwrap_err(),
        SplitError::InvalidTime { subject: 1, .. }
    ));

    let subjects = [Subject { time: 30.0, event: true, arm: Arm::Control }];
    let episodes = split_at_changepoints(&subjects, &cuts()).unwrap();
    assert_eq!(
        period_totals(&episodes, 3).unwrap_err(),
        SplitError::PeriodOutOfRange {
            period: 3,
            segment_count: 3
        }
    );
}
