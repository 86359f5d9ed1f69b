//! Counting-process episodes for fitting a piecewise exponential regression.

use crate::changepoints::Changepoints;
use crate::posterior::Arm;
use log::debug;
use thiserror::Error;

/// Follow-up of one subject.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Subject {
    /// Observed time: event or censoring.
    pub time: f64,
    /// Whether `time` is an event rather than a censoring time.
    pub event: bool,
    /// Treatment arm.
    pub arm: Arm,
}

/// At-risk interval `(start, stop]` of a subject inside a single segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Episode {
    /// Index of the subject in the input slice.
    pub subject: usize,
    /// Treatment arm.
    pub arm: Arm,
    /// Segment index.
    pub period: usize,
    /// Exclusive start.
    pub start: f64,
    /// Inclusive stop.
    pub stop: f64,
    /// Whether the subject's event happens at `stop`.
    pub event: bool,
}

impl Episode {
    /// Time at risk contributed by this episode.
    pub fn exposure(&self) -> f64 {
        self.stop - self.start
    }
}

/// Split each subject's follow-up at the changepoints.
///
/// A subject produces one episode per segment it is at risk in. Only the final episode
/// carries the event flag. A time equal to a changepoint ends in the segment that the
/// changepoint closes.
///
/// # Errors
///
/// Returns [`SplitError::InvalidTime`] when a subject's time is not finite and positive.
///
/// # Examples
///
/// ```
/// use postsurv::{Arm, Changepoints};
/// use postsurv::split::{Subject, split_at_changepoints};
///
/// let cuts = Changepoints::new(&[6.0, 12.0]).unwrap();
/// let subjects = [Subject { time: 8.0, event: true, arm: Arm::Control }];
/// let episodes = split_at_changepoints(&subjects, &cuts).unwrap();
///
/// assert_eq!(episodes.len(), 2);
/// assert_eq!((episodes[1].start, episodes[1].stop), (6.0, 8.0));
/// assert!(!episodes[0].event && episodes[1].event);
/// ```
pub fn split_at_changepoints(
    subjects: &[Subject],
    changepoints: &Changepoints,
) -> Result<Vec<Episode>, SplitError> {
    let mut episodes = Vec::with_capacity(subjects.len());
    for (idx, subject) in subjects.iter().enumerate() {
        if !(subject.time.is_finite() && subject.time > 0.0) {
            return Err(SplitError::InvalidTime {
                subject: idx,
                value: subject.time,
            });
        }
        let last = changepoints.segment_of(subject.time);
        for period in 0..=last {
            episodes.push(Episode {
                subject: idx,
                arm: subject.arm,
                period,
                start: changepoints.lower(period),
                stop: subject.time.min(changepoints.upper(period)),
                event: subject.event && period == last,
            });
        }
    }
    debug!(
        "split {} subjects into {} episodes",
        subjects.len(),
        episodes.len()
    );
    Ok(episodes)
}

/// Exposure and event totals of one arm in one segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArmPeriodTotals {
    /// Treatment arm.
    pub arm: Arm,
    /// Segment index.
    pub period: usize,
    /// Summed time at risk.
    pub exposure: f64,
    /// Number of events.
    pub events: usize,
}

impl ArmPeriodTotals {
    /// Maximum-likelihood log-scale `ln(exposure / events)`, or `None` without events.
    pub fn log_scale_estimate(&self) -> Option<f64> {
        if self.events == 0 {
            return None;
        }
        Some((self.exposure / self.events as f64).ln())
    }
}

/// Aggregate episodes into per-arm, per-segment totals.
///
/// The result lists every control segment followed by every experimental segment, including
/// segments nobody reached.
///
/// # Errors
///
/// Returns [`SplitError::PeriodOutOfRange`] when an episode refers to a segment at or beyond
/// `segment_count`.
pub fn period_totals(
    episodes: &[Episode],
    segment_count: usize,
) -> Result<Vec<ArmPeriodTotals>, SplitError> {
    let mut totals: Vec<ArmPeriodTotals> = Arm::ALL
        .iter()
        .flat_map(|&arm| {
            (0..segment_count).map(move |period| ArmPeriodTotals {
                arm,
                period,
                exposure: 0.0,
                events: 0,
            })
        })
        .collect();
    for episode in episodes {
        if episode.period >= segment_count {
            return Err(SplitError::PeriodOutOfRange {
                period: episode.period,
                segment_count,
            });
        }
        let offset = match episode.arm {
            Arm::Control => 0,
            Arm::Experimental => segment_count,
        };
        let entry = &mut totals[offset + episode.period];
        entry.exposure += episode.exposure();
        if episode.event {
            entry.events += 1;
        }
    }
    Ok(totals)
}

/// Errors emitted while splitting follow-up into episodes.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SplitError {
    /// A subject's observed time is not finite and positive.
    #[error("subject {subject} has invalid time {value}; times must be finite and positive")]
    InvalidTime {
        /// Index of the offending subject.
        subject: usize,
        /// The offending time.
        value: f64,
    },
    /// An episode refers to a segment the schedule does not define.
    #[error("episode period {period} is outside the {segment_count} available segments")]
    PeriodOutOfRange {
        /// The offending period.
        period: usize,
        /// Number of segments.
        segment_count: usize,
    },
}
