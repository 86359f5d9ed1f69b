//! Summaries of posterior draws: pointwise intervals, joint regions, benefit probabilities.

use crate::curve::SurvivalCurve;
use log::debug;
use thiserror::Error;

/// Posterior mean and equal-tailed credible interval at one time point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointwiseInterval {
    /// Time point.
    pub time: f64,
    /// Posterior mean.
    pub mean: f64,
    /// Lower interval bound.
    pub lower: f64,
    /// Upper interval bound.
    pub upper: f64,
}

/// Simultaneous credible band over a time grid.
///
/// Built from the draws whose whole trajectory is no more extreme, rank-wise, than a
/// `level` share of all draws. The band is the envelope of those member trajectories, so
/// every member lies inside it at every time point.
#[derive(Debug, Clone, PartialEq)]
pub struct JointRegion {
    level: f64,
    times: Vec<f64>,
    lower: Vec<f64>,
    upper: Vec<f64>,
    members: Vec<bool>,
}

impl JointRegion {
    /// Requested credible level.
    pub fn level(&self) -> f64 {
        self.level
    }

    /// The time grid of the underlying curve.
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// Lower envelope, one value per time point.
    pub fn lower(&self) -> &[f64] {
        &self.lower
    }

    /// Upper envelope, one value per time point.
    pub fn upper(&self) -> &[f64] {
        &self.upper
    }

    /// Membership indicator per draw.
    pub fn members(&self) -> &[bool] {
        &self.members
    }

    /// Number of draws inside the region.
    pub fn member_count(&self) -> usize {
        self.members.iter().filter(|&&member| member).count()
    }

    /// Share of draws inside the region; at least the requested level.
    pub fn coverage(&self) -> f64 {
        self.member_count() as f64 / self.members.len() as f64
    }

    /// For each time point, whether `value` lies outside the band.
    ///
    /// On a difference curve `excludes(0.0)` marks the times at which the region rules out
    /// "no difference".
    pub fn excludes(&self, value: f64) -> Vec<bool> {
        self.lower
            .iter()
            .zip(&self.upper)
            .map(|(&lo, &hi)| value < lo || value > hi)
            .collect()
    }
}

/// Posterior mean.
///
/// # Errors
///
/// Returns [`SummaryError`] when `values` is empty or holds NaN.
pub fn mean(values: &[f64]) -> Result<f64, SummaryError> {
    check_values(values)?;
    Ok(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample quantile with linear interpolation between order statistics.
///
/// For sorted values `x` and `h = (n - 1) p` the result is
/// `x[floor(h)] + (h - floor(h)) (x[ceil(h)] - x[floor(h)])`.
///
/// # Errors
///
/// Returns [`SummaryError`] when `values` is empty or holds NaN, or when `probability` is
/// outside `[0, 1]`.
///
/// # Examples
///
/// ```
/// use postsurv::summary::quantile;
///
/// let values = [4.0, 1.0, 3.0, 2.0];
/// assert_eq!(quantile(&values, 0.5).unwrap(), 2.5);
/// assert_eq!(quantile(&values, 0.0).unwrap(), 1.0);
/// assert_eq!(quantile(&values, 1.0).unwrap(), 4.0);
/// ```
pub fn quantile(values: &[f64], probability: f64) -> Result<f64, SummaryError> {
    check_values(values)?;
    if !(0.0..=1.0).contains(&probability) {
        return Err(SummaryError::ProbabilityOutOfRange { value: probability });
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    Ok(sorted_quantile(&sorted, probability))
}

fn sorted_quantile(sorted: &[f64], probability: f64) -> f64 {
    let h = (sorted.len() - 1) as f64 * probability;
    let lo = h.floor() as usize;
    let hi = h.ceil() as usize;
    sorted[lo] + (h - lo as f64) * (sorted[hi] - sorted[lo])
}

/// Equal-tailed credible interval holding `level` of the posterior mass.
///
/// # Errors
///
/// Returns [`SummaryError`] when `values` is empty or holds NaN, or when `level` is not
/// within `(0, 1)`.
pub fn credible_interval(values: &[f64], level: f64) -> Result<(f64, f64), SummaryError> {
    check_level(level)?;
    check_values(values)?;
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let tail = (1.0 - level) / 2.0;
    Ok((
        sorted_quantile(&sorted, tail),
        sorted_quantile(&sorted, 1.0 - tail),
    ))
}

/// Posterior mean and equal-tailed interval at every time point of `curve`.
///
/// # Errors
///
/// Returns [`SummaryError`] when `level` is not within `(0, 1)` or the curve holds NaN.
pub fn pointwise_intervals(
    curve: &SurvivalCurve,
    level: f64,
) -> Result<Vec<PointwiseInterval>, SummaryError> {
    check_level(level)?;
    curve
        .times()
        .iter()
        .zip(curve.rows())
        .map(|(&time, values)| {
            let (lower, upper) = credible_interval(values, level)?;
            Ok(PointwiseInterval {
                time,
                mean: mean(values)?,
                lower,
                upper,
            })
        })
        .collect()
}

/// Rank-based joint credible region of `curve` at `level`.
///
/// At each time point the draws are ranked `1..=N`; a draw's extremeness is the largest
/// `max(rank, N + 1 - rank)` along its trajectory. Draws whose extremeness does not exceed
/// the `ceil(level N)`-th smallest extremeness form the region.
///
/// # Errors
///
/// Returns [`SummaryError`] when `level` is not within `(0, 1)` or the curve holds NaN.
///
/// # Examples
///
/// ```
/// use postsurv::SurvivalCurve;
/// use postsurv::summary::joint_region;
///
/// let rows = vec![
///     vec![0.1, 0.2, 0.3, 0.4, 0.5],
///     vec![0.5, 0.4, 0.3, 0.2, 0.1],
/// ];
/// let curve = SurvivalCurve::new(vec![1.0, 2.0], rows).unwrap();
/// let region = joint_region(&curve, 0.2).unwrap();
///
/// assert_eq!(region.members(), &[false, false, true, false, false]);
/// assert_eq!(region.lower(), &[0.3, 0.3]);
/// ```
pub fn joint_region(curve: &SurvivalCurve, level: f64) -> Result<JointRegion, SummaryError> {
    check_level(level)?;
    let draws = curve.draw_count();
    let mut extremeness = vec![0_usize; draws];
    let mut order: Vec<usize> = (0..draws).collect();
    for values in curve.rows() {
        check_values(values)?;
        order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
        for (position, &draw) in order.iter().enumerate() {
            let rank = position + 1;
            let score = rank.max(draws + 1 - rank);
            extremeness[draw] = extremeness[draw].max(score);
        }
    }

    let keep = ((level * draws as f64).ceil() as usize).clamp(1, draws);
    let mut sorted = extremeness.clone();
    sorted.sort_unstable();
    let threshold = sorted[keep - 1];
    let members: Vec<bool> = extremeness.iter().map(|&e| e <= threshold).collect();

    let mut lower = Vec::with_capacity(curve.time_count());
    let mut upper = Vec::with_capacity(curve.time_count());
    for values in curve.rows() {
        let (lo, hi) = values
            .iter()
            .zip(&members)
            .filter(|&(_, &member)| member)
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), (&v, _)| {
                (lo.min(v), hi.max(v))
            });
        lower.push(lo);
        upper.push(hi);
    }

    let region = JointRegion {
        level,
        times: curve.times().to_vec(),
        lower,
        upper,
        members,
    };
    debug!(
        "joint region at level {} keeps {} of {} draws (extremeness threshold {})",
        level,
        region.member_count(),
        draws,
        threshold
    );
    Ok(region)
}

/// Share of draws favouring the experimental arm at each time point of a difference curve.
pub fn probability_of_benefit(difference: &SurvivalCurve) -> Vec<f64> {
    let draws = difference.draw_count() as f64;
    difference
        .rows()
        .map(|values| values.iter().filter(|&&value| value > 0.0).count() as f64 / draws)
        .collect()
}

/// Share of draws whose difference trajectory is positive at one or more time points.
///
/// # Examples
///
/// ```
/// use postsurv::SurvivalCurve;
/// use postsurv::summary::probability_of_any_benefit;
///
/// let rows = vec![vec![-0.1, 0.05, -0.2, -0.3], vec![0.02, -0.01, -0.1, -0.2]];
/// let difference = SurvivalCurve::new(vec![6.0, 12.0], rows).unwrap();
/// assert_eq!(probability_of_any_benefit(&difference), 0.5);
/// ```
pub fn probability_of_any_benefit(difference: &SurvivalCurve) -> f64 {
    let draws = difference.draw_count();
    let benefiting = (0..draws)
        .filter(|&draw| difference.rows().any(|values| values[draw] > 0.0))
        .count();
    benefiting as f64 / draws as f64
}

fn check_values(values: &[f64]) -> Result<(), SummaryError> {
    if values.is_empty() {
        return Err(SummaryError::Empty);
    }
    if let Some(index) = values.iter().position(|value| value.is_nan()) {
        return Err(SummaryError::NanValue { index });
    }
    Ok(())
}

fn check_level(level: f64) -> Result<(), SummaryError> {
    if !(level > 0.0 && level < 1.0) {
        return Err(SummaryError::LevelOutOfRange { value: level });
    }
    Ok(())
}

/// Errors emitted while summarising posterior draws.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SummaryError {
    /// No values were supplied.
    #[error("cannot summarise an empty set of draws")]
    Empty,
    /// A value is NaN.
    #[error("draw {index} is NaN")]
    NanValue {
        /// Index of the offending draw.
        index: usize,
    },
    /// A credible level lies outside `(0, 1)`.
    #[error("credible level {value} must lie within the interval (0, 1)")]
    LevelOutOfRange {
        /// The offending level.
        value: f64,
    },
    /// A quantile probability lies outside `[0, 1]`.
    #[error("quantile probability {value} must lie within the interval [0, 1]")]
    ProbabilityOutOfRange {
        /// The offending probability.
        value: f64,
    },
}
