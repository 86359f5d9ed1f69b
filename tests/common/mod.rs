#![allow(dead_code)]

use postsurv::{Changepoints, PosteriorSamples};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fs;
use std::path::{Path, PathBuf};

const ABS_TOL: f64 = 1e-14;
const REL_TOL: f64 = 1e-12;

fn fixtures_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

pub fn load_columns(filename: &str) -> Vec<Vec<f64>> {
    let path = fixtures_dir().join(filename);
    let contents = fs::read_to_string(&path)
        .unwrap_or_else(|err| panic!("failed to read {}: {}", path.display(), err));
    let mut columns: Vec<Vec<f64>> = Vec::new();
    for (line_idx, line) in contents.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let row: Vec<f64> = trimmed
            .split_whitespace()
            .map(|field| {
                field.parse::<f64>().unwrap_or_else(|err| {
                    panic!(
                        "failed to parse float at {} (line {}): {}",
                        path.display(),
                        line_idx + 1,
                        err
                    )
                })
            })
            .collect();
        if columns.is_empty() {
            columns.resize_with(row.len(), Vec::new);
        } else {
            assert_eq!(
                columns.len(),
                row.len(),
                "row {} in {} has inconsistent column count",
                line_idx + 1,
                path.display()
            );
        }
        for (col_idx, value) in row.into_iter().enumerate() {
            columns[col_idx].push(value);
        }
    }
    columns
}

pub fn assert_close(actual: f64, expected: f64) {
    let diff = (actual - expected).abs();
    let tol = ABS_TOL.max(REL_TOL * expected.abs());
    assert!(
        diff <= tol,
        "|{actual} - {expected}| = {diff} exceeds tolerance {tol}"
    );
}

pub fn assert_close_slice(actual: &[f64], expected: &[f64]) {
    assert_eq!(
        actual.len(),
        expected.len(),
        "vector lengths differ: {} vs {}",
        actual.len(),
        expected.len()
    );
    for (idx, (&a, &e)) in actual.iter().zip(expected.iter()).enumerate() {
        let diff = (a - e).abs();
        let tol = ABS_TOL.max(REL_TOL * e.abs());
        assert!(
            diff <= tol,
            "index {idx}: |{a} - {e}| = {diff} exceeds tolerance {tol}"
        );
    }
}

/// Log-scales drawn uniformly from `[1, 4)`, i.e. scales between roughly 2.7 and 55.
pub fn random_table(rng: &mut StdRng, segments: usize, draws: usize) -> Vec<Vec<f64>> {
    (0..segments)
        .map(|_| (0..draws).map(|_| rng.random_range(1.0..4.0)).collect())
        .collect()
}

pub fn random_samples(seed: u64, changepoints: &[f64], draws: usize) -> PosteriorSamples {
    let cuts = Changepoints::new(changepoints).unwrap();
    let mut rng = StdRng::seed_from_u64(seed);
    let control = random_table(&mut rng, cuts.segment_count(), draws);
    let experimental = random_table(&mut rng, cuts.segment_count(), draws);
    PosteriorSamples::from_log_scales(cuts, control, experimental).unwrap()
}
