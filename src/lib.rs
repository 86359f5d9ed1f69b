#![warn(missing_docs)]

//! Posterior survival curves for piecewise exponential Bayesian models
//!
//! This crate maps posterior draws of the log-scale parameters of a two-arm piecewise
//! exponential survival model to posterior draws of the survival probability, and
//! summarises them with pointwise intervals, a joint credible region and the probability
//! that the experimental arm is better at any time.

mod changepoints;
pub mod config;
mod curve;
mod piecewise_exponential;
mod posterior;
pub mod split;
pub mod summary;

pub use changepoints::{ChangepointError, Changepoints};
pub use config::{AnalysisConfig, ConfigError, TimeGrid};
pub use curve::SurvivalCurve;
pub use piecewise_exponential::{
    EvaluateError, PiecewiseHazard, difference_curve, draw_hazards, evaluate,
    evaluate_log_scales, median_survival, restricted_mean_survival, survival_curve,
    survival_probability,
};
pub use posterior::{Arm, CoefficientDraws, PosteriorError, PosteriorSamples};
