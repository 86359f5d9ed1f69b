use crate::changepoints::Changepoints;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Treatment arm of a two-arm trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Arm {
    /// Reference arm; its log-scales carry no arm or interaction terms.
    Control,
    /// Comparator arm.
    Experimental,
}

impl Arm {
    /// Both arms, control first.
    pub const ALL: [Arm; 2] = [Arm::Control, Arm::Experimental];

    fn index(self) -> usize {
        match self {
            Arm::Control => 0,
            Arm::Experimental => 1,
        }
    }
}

impl fmt::Display for Arm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arm::Control => f.write_str("control"),
            Arm::Experimental => f.write_str("experimental"),
        }
    }
}

/// Regression coefficient draws of the log-linear model `arm * period`.
///
/// Each vector holds one value per posterior draw. `period_effects[j - 1]` and
/// `interaction_effects[j - 1]` belong to segment `j` for `j = 1..=K`; segment 0 is the
/// reference period and has neither term.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoefficientDraws {
    /// Intercept: log-scale of the control arm in the first segment.
    pub intercept: Vec<f64>,
    /// Main effect of the experimental arm.
    pub arm_effect: Vec<f64>,
    /// Main effect of each later segment.
    pub period_effects: Vec<Vec<f64>>,
    /// Arm-by-period interaction of each later segment.
    pub interaction_effects: Vec<Vec<f64>>,
}

/// Immutable posterior log-scale draws for both arms of a piecewise exponential model.
///
/// For each arm the draws are stored as an ordered mapping from segment index to the
/// per-draw log-scales, built once at ingestion.
///
/// # Examples
///
/// ```
/// use postsurv::{Arm, Changepoints, PosteriorSamples};
///
/// let cuts = Changepoints::new(&[6.0]).unwrap();
/// let control = vec![vec![0.0, 0.1], vec![0.2, 0.3]];
/// let experimental = vec![vec![0.5, 0.4], vec![0.6, 0.7]];
/// let samples = PosteriorSamples::from_log_scales(cuts, control, experimental).unwrap();
///
/// assert_eq!(samples.draw_count(), 2);
/// assert_eq!(samples.log_scales(Arm::Experimental, 1), &[0.6, 0.7]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct PosteriorSamples {
    changepoints: Changepoints,
    arms: [Vec<Vec<f64>>; 2],
    draws: usize,
}

impl PosteriorSamples {
    /// Ingest per-segment log-scale draws for each arm.
    ///
    /// Both `control` and `experimental` must hold `changepoints.segment_count()` sequences of
    /// equal, non-zero length.
    ///
    /// # Errors
    ///
    /// Returns [`PosteriorError`] when the segment or draw counts disagree, or when a
    /// log-scale is not finite.
    pub fn from_log_scales(
        changepoints: Changepoints,
        control: Vec<Vec<f64>>,
        experimental: Vec<Vec<f64>>,
    ) -> Result<Self, PosteriorError> {
        let segments = changepoints.segment_count();
        let draws = control
            .first()
            .map(Vec::len)
            .ok_or(PosteriorError::SegmentCountMismatch {
                arm: Arm::Control,
                expected: segments,
                found: 0,
            })?;
        if draws == 0 {
            return Err(PosteriorError::NoDraws);
        }

        let arms = [control, experimental];
        for arm in Arm::ALL {
            let table = &arms[arm.index()];
            if table.len() != segments {
                return Err(PosteriorError::SegmentCountMismatch {
                    arm,
                    expected: segments,
                    found: table.len(),
                });
            }
            for (segment, values) in table.iter().enumerate() {
                if values.len() != draws {
                    return Err(PosteriorError::DrawCountMismatch {
                        arm,
                        segment,
                        expected: draws,
                        found: values.len(),
                    });
                }
                if let Some(draw) = values.iter().position(|value| !value.is_finite()) {
                    return Err(PosteriorError::NonFiniteLogScale { arm, segment, draw });
                }
            }
        }

        debug!(
            "ingested {} posterior draws over {} segments per arm",
            draws, segments
        );
        Ok(Self {
            changepoints,
            arms,
            draws,
        })
    }

    /// Ingest regression coefficient draws and derive the log-scale of every arm and segment.
    ///
    /// # Errors
    ///
    /// Returns [`PosteriorError`] when the number of period or interaction terms does not
    /// match the number of changepoints, or when any term holds a different number of
    /// draws than the intercept.
    ///
    /// # Examples
    ///
    /// ```
    /// use postsurv::{Arm, Changepoints, CoefficientDraws, PosteriorSamples};
    ///
    /// let coefficients = CoefficientDraws {
    ///     intercept: vec![2.0],
    ///     arm_effect: vec![0.5],
    ///     period_effects: vec![vec![-0.25]],
    ///     interaction_effects: vec![vec![0.125]],
    /// };
    /// let cuts = Changepoints::new(&[6.0]).unwrap();
    /// let samples = PosteriorSamples::from_coefficients(cuts, &coefficients).unwrap();
    ///
    /// assert_eq!(samples.log_scales(Arm::Control, 1), &[1.75]);
    /// assert_eq!(samples.log_scales(Arm::Experimental, 1), &[2.375]);
    /// ```
    pub fn from_coefficients(
        changepoints: Changepoints,
        coefficients: &CoefficientDraws,
    ) -> Result<Self, PosteriorError> {
        let later = changepoints.changepoint_count();
        let draws = coefficients.intercept.len();
        if draws == 0 {
            return Err(PosteriorError::NoDraws);
        }
        check_term_count("period", later, coefficients.period_effects.len())?;
        check_term_count("interaction", later, coefficients.interaction_effects.len())?;
        check_term_draws("arm", draws, &coefficients.arm_effect)?;
        for values in &coefficients.period_effects {
            check_term_draws("period", draws, values)?;
        }
        for values in &coefficients.interaction_effects {
            check_term_draws("interaction", draws, values)?;
        }

        let mut control: Vec<Vec<f64>> = Vec::with_capacity(later + 1);
        let mut experimental: Vec<Vec<f64>> = Vec::with_capacity(later + 1);
        control.push(coefficients.intercept.clone());
        experimental.push(
            coefficients
                .intercept
                .iter()
                .zip(&coefficients.arm_effect)
                .map(|(b0, arm)| b0 + arm)
                .collect(),
        );
        for (period, interaction) in coefficients
            .period_effects
            .iter()
            .zip(&coefficients.interaction_effects)
        {
            let base: Vec<f64> = coefficients
                .intercept
                .iter()
                .zip(period)
                .map(|(b0, p)| b0 + p)
                .collect();
            experimental.push(
                base.iter()
                    .zip(&coefficients.arm_effect)
                    .zip(interaction)
                    .map(|((value, arm), inter)| value + arm + inter)
                    .collect(),
            );
            control.push(base);
        }

        Self::from_log_scales(changepoints, control, experimental)
    }

    /// The changepoint schedule the draws refer to.
    pub fn changepoints(&self) -> &Changepoints {
        &self.changepoints
    }

    /// Number of posterior draws `N`.
    pub fn draw_count(&self) -> usize {
        self.draws
    }

    /// Log-scale draws of `segment` for `arm`.
    ///
    /// # Panics
    ///
    /// Panics when `segment` is not below [`Changepoints::segment_count`].
    pub fn log_scales(&self, arm: Arm, segment: usize) -> &[f64] {
        &self.arms[arm.index()][segment]
    }

    /// The full `segment -> draws` table of `arm`.
    pub fn arm_table(&self, arm: Arm) -> &[Vec<f64>] {
        &self.arms[arm.index()]
    }

    /// Log-scales of a single draw for `arm`, one per segment.
    ///
    /// # Panics
    ///
    /// Panics when `draw` is not below [`PosteriorSamples::draw_count`].
    pub fn draw_log_scales(&self, arm: Arm, draw: usize) -> Vec<f64> {
        self.arm_table(arm)
            .iter()
            .map(|values| values[draw])
            .collect()
    }
}

fn check_term_count(
    term: &'static str,
    expected: usize,
    found: usize,
) -> Result<(), PosteriorError> {
    if expected != found {
        return Err(PosteriorError::TermCountMismatch {
            term,
            expected,
            found,
        });
    }
    Ok(())
}

fn check_term_draws(
    term: &'static str,
    expected: usize,
    values: &[f64],
) -> Result<(), PosteriorError> {
    if values.len() != expected {
        return Err(PosteriorError::CoefficientDrawMismatch {
            term,
            expected,
            found: values.len(),
        });
    }
    Ok(())
}

/// Errors emitted while ingesting posterior draws.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PosteriorError {
    /// The sample set holds zero draws.
    #[error("posterior samples must contain at least one draw")]
    NoDraws,
    /// An arm does not have one log-scale sequence per segment.
    #[error("{arm} arm has {found} segments but the changepoints define {expected}")]
    SegmentCountMismatch {
        /// Arm whose table is malformed.
        arm: Arm,
        /// Segments defined by the changepoints.
        expected: usize,
        /// Sequences supplied.
        found: usize,
    },
    /// A segment holds a different number of draws than the first one.
    #[error("{arm} arm segment {segment} has {found} draws, expected {expected}")]
    DrawCountMismatch {
        /// Arm of the offending sequence.
        arm: Arm,
        /// Segment of the offending sequence.
        segment: usize,
        /// Draw count of the first sequence.
        expected: usize,
        /// Draw count of the offending sequence.
        found: usize,
    },
    /// A log-scale value is NaN or infinite.
    #[error("{arm} arm segment {segment} draw {draw} has a non-finite log-scale")]
    NonFiniteLogScale {
        /// Arm of the offending value.
        arm: Arm,
        /// Segment of the offending value.
        segment: usize,
        /// Draw index of the offending value.
        draw: usize,
    },
    /// The number of period-specific terms does not match the number of changepoints.
    #[error("expected {expected} {term} terms (one per changepoint), found {found}")]
    TermCountMismatch {
        /// Name of the term family.
        term: &'static str,
        /// Number of changepoints.
        expected: usize,
        /// Terms supplied.
        found: usize,
    },
    /// A coefficient holds a different number of draws than the intercept.
    #[error("{term} coefficient has {found} draws but the intercept has {expected}")]
    CoefficientDrawMismatch {
        /// Name of the term family.
        term: &'static str,
        /// Draw count of the intercept.
        expected: usize,
        /// Draw count of the offending coefficient.
        found: usize,
    },
}
