use crate::changepoints::Changepoints;
use crate::curve::SurvivalCurve;
use crate::posterior::{Arm, PosteriorSamples};
use log::warn;
use thiserror::Error;

/// Piecewise constant hazard of a single posterior draw.
///
/// Segment `j` has scale `exp(log_scale[j])`, i.e. hazard rate `1 / scale`. The cumulative
/// hazard is accumulated left to right at construction so queries only need a segment lookup.
///
/// # Examples
///
/// ```
/// use postsurv::{Changepoints, PiecewiseHazard};
///
/// let cuts = Changepoints::new(&[6.0]).unwrap();
/// let hazard = PiecewiseHazard::new(&cuts, &[0.0, 0.0]).unwrap();
///
/// assert_eq!(hazard.survival(10.0).unwrap(), (-10.0_f64).exp());
/// let median = hazard.quantile_time(0.5).unwrap();
/// assert!((median - 2.0_f64.ln()).abs() < 1e-12);
/// ```
#[derive(Debug, Clone)]
pub struct PiecewiseHazard {
    scales: Vec<f64>,
    cumulative_time: Vec<f64>,
    cumulative_hazard: Vec<f64>,
}

impl PiecewiseHazard {
    /// Build the hazard of one draw from its per-segment log-scales.
    ///
    /// # Errors
    ///
    /// Returns [`EvaluateError::LogScaleCountMismatch`] when `log_scales` does not hold one
    /// value per segment, and [`EvaluateError::NonFiniteLogScale`] when a value is NaN or
    /// infinite.
    pub fn new(changepoints: &Changepoints, log_scales: &[f64]) -> Result<Self, EvaluateError> {
        let segments = changepoints.segment_count();
        if log_scales.len() != segments {
            return Err(EvaluateError::LogScaleCountMismatch {
                expected: segments,
                found: log_scales.len(),
            });
        }
        if let Some(segment) = log_scales.iter().position(|value| !value.is_finite()) {
            return Err(EvaluateError::NonFiniteLogScale { segment });
        }

        let scales: Vec<f64> = log_scales.iter().map(|value| value.exp()).collect();
        let mut cumulative_time = Vec::with_capacity(segments);
        let mut cumulative_hazard = Vec::with_capacity(segments);
        cumulative_time.push(0.0);
        cumulative_hazard.push(0.0);

        let mut hazard_acc = 0.0;
        for (idx, &bound) in changepoints.as_slice().iter().enumerate() {
            hazard_acc += segment_hazard(bound - changepoints.lower(idx), scales[idx]);
            cumulative_time.push(bound);
            cumulative_hazard.push(hazard_acc);
        }

        Ok(Self {
            scales,
            cumulative_time,
            cumulative_hazard,
        })
    }

    /// Cumulative hazard `H(t)`.
    ///
    /// # Errors
    ///
    /// Returns [`EvaluateError`] when `t` is negative or not finite.
    pub fn cumulative_hazard(&self, t: f64) -> Result<f64, EvaluateError> {
        check_time(t)?;
        let idx = self.cumulative_time.partition_point(|&c| c < t).saturating_sub(1);
        let partial = segment_hazard(t - self.cumulative_time[idx], self.scales[idx]);
        Ok(self.cumulative_hazard[idx] + partial)
    }

    /// Survival probability `S(t) = exp(-H(t))`.
    ///
    /// # Errors
    ///
    /// Returns [`EvaluateError`] when `t` is negative or not finite.
    pub fn survival(&self, t: f64) -> Result<f64, EvaluateError> {
        Ok((-self.cumulative_hazard(t)?).exp())
    }

    /// Time at which the survival probability falls to `probability`.
    ///
    /// The final segment is open-ended, so every probability in `(0, 1]` is reached.
    ///
    /// # Errors
    ///
    /// Returns [`EvaluateError::ProbabilityOutOfRange`] when `probability` is not within
    /// `(0, 1]`.
    pub fn quantile_time(&self, probability: f64) -> Result<f64, EvaluateError> {
        if !(probability > 0.0 && probability <= 1.0) {
            return Err(EvaluateError::ProbabilityOutOfRange { value: probability });
        }
        Ok(self.time_at_hazard(-probability.ln()))
    }

    /// Median survival time, the time at which `S` reaches one half.
    pub fn median(&self) -> f64 {
        self.time_at_hazard(std::f64::consts::LN_2)
    }

    fn time_at_hazard(&self, hazard: f64) -> f64 {
        let idx = self
            .cumulative_hazard
            .partition_point(|&value| value <= hazard)
            .saturating_sub(1);
        let offset = (hazard - self.cumulative_hazard[idx]) * self.scales[idx];
        self.cumulative_time[idx] + offset
    }

    /// Restricted mean survival time, the area under `S` on `[0, horizon]`.
    ///
    /// Within a segment starting at `a` the survival curve is `S(a) exp(-(u - a) / scale)`,
    /// which integrates in closed form.
    ///
    /// # Errors
    ///
    /// Returns [`EvaluateError`] when `horizon` is negative or not finite.
    pub fn restricted_mean(&self, horizon: f64) -> Result<f64, EvaluateError> {
        check_time(horizon)?;
        let last = self
            .cumulative_time
            .partition_point(|&c| c < horizon)
            .saturating_sub(1);
        let mut area = 0.0;
        for idx in 0..=last {
            let start = self.cumulative_time[idx];
            let end = self
                .cumulative_time
                .get(idx + 1)
                .map_or(horizon, |&bound| bound.min(horizon));
            if end <= start {
                break;
            }
            let scale = self.scales[idx];
            let at_start = (-self.cumulative_hazard[idx]).exp();
            area += at_start * scale * -(-(end - start) / scale).exp_m1();
        }
        Ok(area)
    }
}

/// Survival probability at `t` for a single draw given its per-segment log-scales.
///
/// # Errors
///
/// Returns [`EvaluateError`] when `t` is invalid or `log_scales` does not hold one finite
/// value per segment.
///
/// # Examples
///
/// ```
/// use postsurv::{Changepoints, survival_probability};
///
/// let cuts = Changepoints::new(&[6.0]).unwrap();
/// let value = survival_probability(3.0, &cuts, &[0.0, 0.0]).unwrap();
/// assert_eq!(value, (-3.0_f64).exp());
/// ```
pub fn survival_probability(
    t: f64,
    changepoints: &Changepoints,
    log_scales: &[f64],
) -> Result<f64, EvaluateError> {
    PiecewiseHazard::new(changepoints, log_scales)?.survival(t)
}

/// Posterior draws of `S(t)` from a raw `segment -> draws` table of log-scales.
///
/// Element `i` of the result is
/// `exp(-sum_j (min(t, c_{j+1}) - c_j) / exp(log_scales[j][i]))` over the segments whose
/// left boundary lies below `t` (the first segment always contributes). A time equal to a
/// changepoint receives nothing from the segment that starts there.
///
/// # Errors
///
/// Returns [`EvaluateError`] when `t` is negative or not finite, when the table does not
/// have one row per segment, or when the rows differ in length.
///
/// # Examples
///
/// ```
/// use postsurv::{Changepoints, evaluate_log_scales};
///
/// let cuts = Changepoints::new(&[6.0, 12.0]).unwrap();
/// let table = vec![vec![1.0], vec![1.0], vec![1.0]];
/// let draws = evaluate_log_scales(12.0, &cuts, &table).unwrap();
///
/// let expected = (-12.0 / std::f64::consts::E).exp();
/// assert!((draws[0] - expected).abs() < 1e-15);
/// ```
pub fn evaluate_log_scales(
    t: f64,
    changepoints: &Changepoints,
    log_scales: &[Vec<f64>],
) -> Result<Vec<f64>, EvaluateError> {
    check_time(t)?;
    let segments = changepoints.segment_count();
    if log_scales.len() != segments {
        return Err(EvaluateError::LogScaleCountMismatch {
            expected: segments,
            found: log_scales.len(),
        });
    }
    let draws = log_scales[0].len();
    for (segment, values) in log_scales.iter().enumerate() {
        if values.len() != draws {
            return Err(EvaluateError::DrawCountMismatch {
                segment,
                expected: draws,
                found: values.len(),
            });
        }
        if values.iter().any(|value| !value.is_finite()) {
            return Err(EvaluateError::NonFiniteLogScale { segment });
        }
    }

    let exposures = changepoints.exposures(t);
    let mut hazard = vec![0.0; draws];
    for (width, values) in exposures.iter().zip(log_scales) {
        for (acc, log_scale) in hazard.iter_mut().zip(values) {
            *acc += segment_hazard(*width, log_scale.exp());
        }
    }

    let survival: Vec<f64> = hazard.into_iter().map(|h| (-h).exp()).collect();
    let underflow = survival.iter().filter(|&&value| value == 0.0).count();
    if underflow > 0 {
        warn!(
            "survival probability underflowed to zero for {} of {} draws at t = {}",
            underflow, draws, t
        );
    }
    Ok(survival)
}

/// Posterior draws of `S(t)` for `arm`.
///
/// # Errors
///
/// Returns [`EvaluateError`] when `t` is negative or not finite.
///
/// # Examples
///
/// ```
/// use postsurv::{Arm, Changepoints, PosteriorSamples, evaluate};
///
/// let cuts = Changepoints::new(&[6.0]).unwrap();
/// let control = vec![vec![0.0, 1.0], vec![0.0, 1.0]];
/// let experimental = vec![vec![0.5, 0.5], vec![0.5, 0.5]];
/// let samples = PosteriorSamples::from_log_scales(cuts, control, experimental).unwrap();
///
/// let at_zero = evaluate(0.0, Arm::Control, &samples).unwrap();
/// assert_eq!(at_zero, vec![1.0, 1.0]);
///
/// let later = evaluate(10.0, Arm::Control, &samples).unwrap();
/// assert_eq!(later[0], (-10.0_f64).exp());
/// ```
pub fn evaluate(
    t: f64,
    arm: Arm,
    samples: &PosteriorSamples,
) -> Result<Vec<f64>, EvaluateError> {
    evaluate_log_scales(t, samples.changepoints(), samples.arm_table(arm))
}

/// Posterior survival curve of `arm` over `times`.
///
/// # Errors
///
/// Returns [`EvaluateError`] when any time is negative or not finite, or when `times` is
/// empty.
pub fn survival_curve(
    times: &[f64],
    arm: Arm,
    samples: &PosteriorSamples,
) -> Result<SurvivalCurve, EvaluateError> {
    let rows = times
        .iter()
        .map(|&t| evaluate(t, arm, samples))
        .collect::<Result<Vec<_>, _>>()?;
    SurvivalCurve::new(times.to_vec(), rows)
}

/// Posterior draws of `S_experimental(t) - S_control(t)` over `times`.
///
/// Positive values favour the experimental arm.
///
/// # Errors
///
/// Returns [`EvaluateError`] when any time is negative or not finite, or when `times` is
/// empty.
pub fn difference_curve(
    times: &[f64],
    samples: &PosteriorSamples,
) -> Result<SurvivalCurve, EvaluateError> {
    let rows = times
        .iter()
        .map(|&t| {
            let control = evaluate(t, Arm::Control, samples)?;
            let experimental = evaluate(t, Arm::Experimental, samples)?;
            Ok(experimental
                .iter()
                .zip(&control)
                .map(|(e, c)| e - c)
                .collect())
        })
        .collect::<Result<Vec<Vec<f64>>, EvaluateError>>()?;
    SurvivalCurve::new(times.to_vec(), rows)
}

/// Per-draw hazards of `arm`, in draw order.
///
/// # Errors
///
/// Propagates [`EvaluateError`] from [`PiecewiseHazard::new`].
pub fn draw_hazards(
    arm: Arm,
    samples: &PosteriorSamples,
) -> Result<Vec<PiecewiseHazard>, EvaluateError> {
    (0..samples.draw_count())
        .map(|draw| {
            PiecewiseHazard::new(samples.changepoints(), &samples.draw_log_scales(arm, draw))
        })
        .collect()
}

/// Posterior draws of the median survival time of `arm`.
///
/// # Errors
///
/// Propagates [`EvaluateError`] from building the per-draw hazards.
pub fn median_survival(arm: Arm, samples: &PosteriorSamples) -> Result<Vec<f64>, EvaluateError> {
    Ok(draw_hazards(arm, samples)?
        .iter()
        .map(PiecewiseHazard::median)
        .collect())
}

/// Posterior draws of the restricted mean survival time of `arm` up to `horizon`.
///
/// # Errors
///
/// Returns [`EvaluateError`] when `horizon` is negative or not finite.
pub fn restricted_mean_survival(
    horizon: f64,
    arm: Arm,
    samples: &PosteriorSamples,
) -> Result<Vec<f64>, EvaluateError> {
    draw_hazards(arm, samples)?
        .iter()
        .map(|hazard| hazard.restricted_mean(horizon))
        .collect()
}

/// Hazard accumulated over `width` at constant `scale`.
///
/// A scale that underflowed to zero still contributes nothing over an empty width.
fn segment_hazard(width: f64, scale: f64) -> f64 {
    if width == 0.0 { 0.0 } else { width / scale }
}

fn check_time(t: f64) -> Result<(), EvaluateError> {
    if !t.is_finite() {
        return Err(EvaluateError::NonFiniteTime { value: t });
    }
    if t < 0.0 {
        return Err(EvaluateError::NegativeTime { value: t });
    }
    Ok(())
}

/// Errors emitted while evaluating survival probabilities.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvaluateError {
    /// The query time is below zero.
    #[error("query time {value} must be non-negative")]
    NegativeTime {
        /// The offending time.
        value: f64,
    },
    /// The query time is NaN or infinite.
    #[error("query time {value} must be finite")]
    NonFiniteTime {
        /// The offending time.
        value: f64,
    },
    /// The log-scales do not provide one entry per segment.
    #[error("expected one log-scale per segment ({expected}), found {found}")]
    LogScaleCountMismatch {
        /// Segments defined by the changepoints.
        expected: usize,
        /// Entries supplied.
        found: usize,
    },
    /// A segment holds a different number of draws than the first one.
    #[error("segment {segment} has {found} draws, expected {expected}")]
    DrawCountMismatch {
        /// Offending segment.
        segment: usize,
        /// Draw count of the first segment.
        expected: usize,
        /// Draw count of the offending segment.
        found: usize,
    },
    /// A log-scale is NaN or infinite.
    #[error("log-scale of segment {segment} must be finite")]
    NonFiniteLogScale {
        /// Offending segment.
        segment: usize,
    },
    /// A survival probability lies outside `(0, 1]`.
    #[error("survival probability {value} must lie within the interval (0, 1]")]
    ProbabilityOutOfRange {
        /// The offending probability.
        value: f64,
    },
    /// Curve rows hold no posterior draws.
    #[error("a survival curve needs at least one draw per time point")]
    EmptyDraws,
    /// A curve was requested over no time points.
    #[error("a survival curve needs at least one time point")]
    EmptyTimeGrid,
    /// Curve rows do not line up with the time grid or with each other.
    #[error("curve row {row} has {found} draws, expected {expected}")]
    RaggedCurve {
        /// Offending row.
        row: usize,
        /// Draw count of the first row.
        expected: usize,
        /// Draw count of the offending row.
        found: usize,
    },
    /// The number of curve rows differs from the number of time points.
    #[error("curve has {rows} rows for {times} time points")]
    CurveShapeMismatch {
        /// Number of time points.
        times: usize,
        /// Number of rows.
        rows: usize,
    },
}
