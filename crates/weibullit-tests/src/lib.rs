//! Statistical checks for a finished flaw assignment.
//!
//! Each check looks at plain numbers (per-particle flaw counts of the
//! eligible particles, or activation thresholds) and returns a
//! [`TestResult`] with a p-value (where applicable), a pass/fail verdict and a
//! letter grade (A through F).

use statrs::distribution::{ChiSquared, ContinuousCDF, Discrete, Poisson};

// ═══════════════════════════════════════════════════════════════════════════════
// Core types
// ═══════════════════════════════════════════════════════════════════════════════

/// Result of a single check.
#[derive(Debug, Clone)]
pub struct TestResult {
    pub name: String,
    pub passed: bool,
    pub p_value: Option<f64>,
    pub statistic: f64,
    pub details: String,
    pub grade: char,
}

impl TestResult {
    /// Assign a letter grade based on p-value.
    ///
    /// - A: p >= 0.1
    /// - B: p >= 0.01
    /// - C: p >= 0.001
    /// - D: p >= 0.0001
    /// - F: otherwise or None
    pub fn grade_from_p(p: Option<f64>) -> char {
        match p {
            Some(p) if p >= 0.1 => 'A',
            Some(p) if p >= 0.01 => 'B',
            Some(p) if p >= 0.001 => 'C',
            Some(p) if p >= 0.0001 => 'D',
            _ => 'F',
        }
    }

    /// Determine pass/fail from p-value against a threshold (default 0.01).
    pub fn pass_from_p(p: Option<f64>, threshold: f64) -> bool {
        match p {
            Some(p) => p >= threshold,
            None => false,
        }
    }

    /// Verdict for checks without a p-value: A when it holds, F otherwise.
    fn exact(name: &str, passed: bool, statistic: f64, details: String) -> Self {
        Self {
            name: name.to_string(),
            passed,
            p_value: None,
            statistic,
            details,
            grade: if passed { 'A' } else { 'F' },
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Helpers
// ═══════════════════════════════════════════════════════════════════════════════

/// Return a failing `TestResult` when data is too short.
fn insufficient(name: &str, needed: usize, got: usize) -> TestResult {
    TestResult {
        name: name.to_string(),
        passed: false,
        p_value: None,
        statistic: 0.0,
        details: format!("Insufficient data: need {needed}, got {got}"),
        grade: 'F',
    }
}

fn mean(counts: &[usize]) -> f64 {
    counts.iter().sum::<usize>() as f64 / counts.len() as f64
}

// ═══════════════════════════════════════════════════════════════════════════════
// Coverage
// ═══════════════════════════════════════════════════════════════════════════════

/// Every eligible particle carries at least one flaw.
pub fn coverage(counts: &[usize]) -> TestResult {
    let name = "Coverage";
    if counts.is_empty() {
        return insufficient(name, 1, 0);
    }
    let uncovered = counts.iter().filter(|&&c| c == 0).count();
    let covered = (counts.len() - uncovered) as f64 / counts.len() as f64;
    TestResult::exact(
        name,
        uncovered == 0,
        covered,
        format!("n={}, without flaws={uncovered}", counts.len()),
    )
}

// ═══════════════════════════════════════════════════════════════════════════════
// Count distribution
// ═══════════════════════════════════════════════════════════════════════════════

/// Index of dispersion of per-particle flaw counts.
///
/// Uniform draws make the counts multinomial, so `sum (c - mean)^2 / mean`
/// follows chi-squared with `n - 1` degrees of freedom. Both tails are
/// suspicious: clumping means biased draws, counts that are too even usually
/// mean the per-particle cap was hit.
pub fn count_dispersion(counts: &[usize]) -> TestResult {
    let name = "Count Dispersion";
    let n = counts.len();
    if n < 10 {
        return insufficient(name, 10, n);
    }
    let m = mean(counts);
    if m <= 0.0 {
        return insufficient(name, 1, 0);
    }
    let chi2: f64 = counts
        .iter()
        .map(|&c| {
            let diff = c as f64 - m;
            diff * diff / m
        })
        .sum();
    let Ok(dist) = ChiSquared::new((n - 1) as f64) else {
        return insufficient(name, 2, n);
    };
    let p = (2.0 * dist.cdf(chi2).min(dist.sf(chi2))).min(1.0);
    TestResult {
        name: name.to_string(),
        passed: TestResult::pass_from_p(Some(p), 0.01),
        p_value: Some(p),
        statistic: chi2,
        details: format!("n={n}, mean={m:.3}, variance/mean={:.3}", chi2 / (n - 1) as f64),
        grade: TestResult::grade_from_p(Some(p)),
    }
}

/// Chi-squared goodness of fit of the per-particle counts against a Poisson
/// distribution with the observed mean.
///
/// Bins with fewer than five expected particles are merged into their
/// neighbours; the last bin takes the whole upper tail.
pub fn count_poisson_fit(counts: &[usize]) -> TestResult {
    let name = "Poisson Count Fit";
    let n = counts.len();
    if n < 50 {
        return insufficient(name, 50, n);
    }
    let lambda = mean(counts);
    let Ok(poisson) = Poisson::new(lambda) else {
        return insufficient(name, 1, 0);
    };

    let max = counts.iter().copied().max().unwrap_or(0);
    let mut observed = vec![0usize; max + 1];
    for &c in counts {
        observed[c] += 1;
    }

    // (observed, expected) per merged bin
    let mut bins: Vec<(f64, f64)> = Vec::new();
    let mut acc = (0.0, 0.0);
    let mut mass = 0.0;
    for (k, &obs) in observed.iter().enumerate() {
        let pk = poisson.pmf(k as u64);
        mass += pk;
        acc.0 += obs as f64;
        acc.1 += pk * n as f64;
        if acc.1 >= 5.0 {
            bins.push(acc);
            acc = (0.0, 0.0);
        }
    }
    // Upper tail beyond the largest observed count.
    acc.1 += (1.0 - mass).max(0.0) * n as f64;
    match bins.last_mut() {
        Some(last) if acc.1 < 5.0 => {
            last.0 += acc.0;
            last.1 += acc.1;
        }
        _ => bins.push(acc),
    }

    if bins.len() < 3 {
        return insufficient(name, 3, bins.len());
    }
    let chi2: f64 = bins
        .iter()
        .map(|&(o, e)| {
            let diff = o - e;
            diff * diff / e
        })
        .sum();
    let df = (bins.len() - 2) as f64;
    let Ok(dist) = ChiSquared::new(df) else {
        return insufficient(name, 3, bins.len());
    };
    let p = dist.sf(chi2);
    TestResult {
        name: name.to_string(),
        passed: TestResult::pass_from_p(Some(p), 0.01),
        p_value: Some(p),
        statistic: chi2,
        details: format!("n={n}, lambda={lambda:.3}, bins={}", bins.len()),
        grade: TestResult::grade_from_p(Some(p)),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Thresholds
// ═══════════════════════════════════════════════════════════════════════════════

/// Every particle's thresholds are positive, finite and non-decreasing.
///
/// Thresholds grow with the draw index and each particle receives its flaws
/// in draw order, so any inversion within a particle is a bookkeeping error.
pub fn threshold_order(flaws: &[&[f64]]) -> TestResult {
    let name = "Threshold Order";
    let total: usize = flaws.iter().map(|f| f.len()).sum();
    if total == 0 {
        return insufficient(name, 1, 0);
    }
    let invalid = flaws
        .iter()
        .flat_map(|f| f.iter())
        .filter(|t| !(t.is_finite() && **t > 0.0))
        .count();
    let inversions: usize = flaws
        .iter()
        .map(|f| f.windows(2).filter(|w| w[1] < w[0]).count())
        .sum();
    TestResult::exact(
        name,
        invalid == 0 && inversions == 0,
        inversions as f64,
        format!("n={total}, non-positive={invalid}, inversions={inversions}"),
    )
}

/// Recover the Weibull modulus from the thresholds.
///
/// The i-th smallest threshold satisfies `ln i = ln(kV) + m ln eps_i`, so a
/// least-squares line through `(ln eps_i, ln i)` has slope `m`. Passes when
/// the fitted slope is within 5% of `expected_m`.
pub fn exponent_fit(thresholds: &[f64], expected_m: f64) -> TestResult {
    let name = "Weibull Exponent Fit";
    let mut sorted: Vec<f64> = thresholds
        .iter()
        .copied()
        .filter(|t| t.is_finite() && *t > 0.0)
        .collect();
    if sorted.len() < 3 {
        return insufficient(name, 3, sorted.len());
    }
    sorted.sort_by(f64::total_cmp);

    let points: Vec<(f64, f64)> = sorted
        .iter()
        .enumerate()
        .map(|(i, t)| (t.ln(), ((i + 1) as f64).ln()))
        .collect();
    let n = points.len() as f64;
    let mx = points.iter().map(|p| p.0).sum::<f64>() / n;
    let my = points.iter().map(|p| p.1).sum::<f64>() / n;
    let sxx: f64 = points.iter().map(|p| (p.0 - mx).powi(2)).sum();
    let sxy: f64 = points.iter().map(|p| (p.0 - mx) * (p.1 - my)).sum();
    if sxx <= 0.0 {
        return TestResult::exact(name, false, 0.0, "all thresholds identical".to_string());
    }
    let slope = sxy / sxx;
    let rel_error = ((slope - expected_m) / expected_m).abs();
    TestResult::exact(
        name,
        rel_error < 0.05,
        slope,
        format!(
            "fitted m={slope:.3}, expected m={expected_m:.3}, error={:.2}%",
            rel_error * 100.0
        ),
    )
}

// ═══════════════════════════════════════════════════════════════════════════════
// Battery
// ═══════════════════════════════════════════════════════════════════════════════

/// Run every check.
///
/// `flaws` holds the thresholds of each eligible particle in the order they
/// were assigned, `m` is the Weibull modulus of the run.
pub fn run_all_tests(flaws: &[&[f64]], m: f64) -> Vec<TestResult> {
    let counts: Vec<usize> = flaws.iter().map(|f| f.len()).collect();
    let thresholds: Vec<f64> = flaws.iter().flat_map(|f| f.iter().copied()).collect();
    vec![
        coverage(&counts),
        count_dispersion(&counts),
        count_poisson_fit(&counts),
        threshold_order(flaws),
        exponent_fit(&thresholds, m),
    ]
}

/// Calculate overall quality score (0-100) from test results.
///
/// Each grade maps to a score: A=100, B=75, C=50, D=25, F=0.
/// Returns the average across all tests.
pub fn calculate_quality_score(results: &[TestResult]) -> f64 {
    if results.is_empty() {
        return 0.0;
    }
    let total: f64 = results
        .iter()
        .map(|r| match r.grade {
            'A' => 100.0,
            'B' => 75.0,
            'C' => 50.0,
            'D' => 25.0,
            _ => 0.0,
        })
        .sum();
    total / results.len() as f64
}
