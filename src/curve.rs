use crate::piecewise_exponential::EvaluateError;

/// Posterior draws of a time-indexed quantity over a grid of time points.
///
/// Row `k` holds one value per posterior draw at `times()[k]`. Every row has the same
/// number of draws, and draw `i` refers to the same posterior sample in every row.
#[derive(Debug, Clone, PartialEq)]
pub struct SurvivalCurve {
    times: Vec<f64>,
    rows: Vec<Vec<f64>>,
}

impl SurvivalCurve {
    /// Assemble a curve from its time grid and per-time draws.
    ///
    /// # Errors
    ///
    /// Returns [`EvaluateError`] when `times` is empty, when the number of rows differs from
    /// the number of time points, when the rows hold no draws, or when the rows differ in
    /// length.
    ///
    /// # Examples
    ///
    /// ```
    /// use postsurv::SurvivalCurve;
    ///
    /// let curve = SurvivalCurve::new(vec![1.0, 2.0], vec![vec![0.9, 0.8], vec![0.7, 0.6]])
    ///     .unwrap();
    /// assert_eq!(curve.draw_count(), 2);
    /// assert_eq!(curve.draw(1), vec![0.8, 0.6]);
    /// ```
    pub fn new(times: Vec<f64>, rows: Vec<Vec<f64>>) -> Result<Self, EvaluateError> {
        if times.is_empty() {
            return Err(EvaluateError::EmptyTimeGrid);
        }
        if times.len() != rows.len() {
            return Err(EvaluateError::CurveShapeMismatch {
                times: times.len(),
                rows: rows.len(),
            });
        }
        let draws = rows[0].len();
        if draws == 0 {
            return Err(EvaluateError::EmptyDraws);
        }
        if let Some(row) = rows.iter().position(|values| values.len() != draws) {
            return Err(EvaluateError::RaggedCurve {
                row,
                expected: draws,
                found: rows[row].len(),
            });
        }
        Ok(Self { times, rows })
    }

    /// The time grid.
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// Number of time points.
    pub fn time_count(&self) -> usize {
        self.times.len()
    }

    /// Number of posterior draws per time point.
    pub fn draw_count(&self) -> usize {
        self.rows[0].len()
    }

    /// Draws at time index `k`.
    pub fn at(&self, k: usize) -> &[f64] {
        &self.rows[k]
    }

    /// Rows in time order.
    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        self.rows.iter().map(Vec::as_slice)
    }

    /// The trajectory of draw `i` across the time grid.
    pub fn draw(&self, i: usize) -> Vec<f64> {
        self.rows.iter().map(|row| row[i]).collect()
    }
}
