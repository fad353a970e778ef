//! Linearized multi-branch secant search for spectral parameters.
//!
//! Near an eigenvalue R* the system matrix behaves like M(R) ≈ M(R*) + (R − R*)·M'(R),
//! so the eigenvalues δ of M'(R)⁻¹·M(R) estimate R − R* for every nearby root.
//! Each small δ spawns a candidate R − Re δ with half the radius, and candidates
//! below the error bound are accepted once two independent horocycle heights
//! produce the same coefficients.
//!
//! The columns of M decay like κ(R, kY), so both matrices are equilibrated by the
//! column maxima of M(R) and L is solved in double-double before its eigenvalues
//! are taken.

pub mod problem;
pub mod types;
pub mod util;

use anyhow::{bail, Context, Result};
use tracing::{debug, trace};

use crate::bessel::BesselEvaluator;
use crate::error::HejhalError;
use crate::group::GroupData;
use crate::horocycle::MaassSpace;
use crate::signs::{all_signs, short_all_signs, SignAssignment};
use crate::solvers::FourierCoefficients;
use crate::system::Symmetry;

pub use problem::{Discretization, MaassProblem, SpectralProblem};
pub use types::{
    Candidate, EigenResult, LinearizedRoot, ScanRequest, SearchRequest, SearchSettings,
};
pub use util::{
    coefficient_spread, column_scales, compute_eigenvalues, divide_columns, linearize,
};

fn is_recoverable(err: &anyhow::Error) -> bool {
    err.downcast_ref::<HejhalError>()
        .map_or(false, HejhalError::is_recoverable)
}

/// Runs the worklist search for a root of `problem` within `radius` of `guess`.
///
/// Returns `Ok(None)` when the worklist empties or `max_iterations` candidates have
/// been processed without an accepted root.
pub fn find_single_ev_linearized<P: SpectralProblem>(
    problem: &mut P,
    guess: f64,
    radius: f64,
    settings: &SearchSettings,
) -> Result<Option<LinearizedRoot>> {
    settings.validate()?;
    if !guess.is_finite() || !(radius > 0.0) {
        bail!("Search needs a finite guess and a positive radius.");
    }

    let mut worklist = vec![Candidate { guess, radius }];
    let mut iterations = 0usize;

    while let Some(candidate) = worklist.pop() {
        if iterations >= settings.max_iterations {
            debug!(iterations, pending = worklist.len() + 1, "iteration budget exhausted");
            return Ok(None);
        }
        iterations += 1;
        problem.on_iteration(iterations, candidate.guess, candidate.radius);

        if candidate.radius < settings.error_bound {
            match verify(problem, candidate.guess, settings) {
                Ok(Some((coefficients, spread))) => {
                    debug!(r = candidate.guess, spread, iterations, "accepted candidate");
                    return Ok(Some(LinearizedRoot {
                        r: candidate.guess,
                        coefficients,
                        spread,
                        iterations,
                    }));
                }
                Ok(None) => {}
                Err(err) if is_recoverable(&err) => {
                    debug!(r = candidate.guess, error = %err, "verification failed");
                }
                Err(err) => return Err(err),
            }
            continue;
        }

        let r = candidate.guess;
        let h = settings.secant_step;
        let m = problem
            .system_matrix(r)
            .with_context(|| format!("Failed to assemble system at R = {r}."))?;
        let shifted = problem
            .system_matrix(r + h)
            .with_context(|| format!("Failed to assemble system at R = {}.", r + h))?;
        // One column scaling for both matrices conjugates L by a diagonal matrix.
        let scales = column_scales(&m);
        let derivative = divide_columns((shifted - &m) / h, &scales);
        let m = divide_columns(m, &scales);

        let linearized = match linearize(&derivative, &m) {
            Ok(linearized) => linearized,
            Err(err) if err.is_recoverable() => {
                debug!(r, error = %err, "singular derivative, dropping branch");
                continue;
            }
            Err(err) => return Err(err.into()),
        };
        if linearized.iter().any(|v| !v.is_finite()) {
            debug!(r, "non-finite linearization, dropping branch");
            continue;
        }

        let before = worklist.len();
        for delta in compute_eigenvalues(&linearized)? {
            let size = delta.norm();
            if size < candidate.radius {
                worklist.push(Candidate {
                    guess: r - delta.re,
                    radius: size / 2.0,
                });
            }
        }
        trace!(
            iterations,
            r,
            radius = candidate.radius,
            branches = worklist.len() - before,
            "split candidate"
        );
    }

    debug!(iterations, "worklist exhausted");
    Ok(None)
}

/// Compares the coefficients from both discretizations at `r`.
fn verify<P: SpectralProblem>(
    problem: &mut P,
    r: f64,
    settings: &SearchSettings,
) -> Result<Option<(FourierCoefficients, f64)>> {
    let primary = problem.coefficients(r, Discretization::Primary)?;
    let secondary = problem.coefficients(r, Discretization::Secondary)?;
    let spread = coefficient_spread(&primary, &secondary, settings.compared_coefficients);
    trace!(r, spread, "verifying candidate");
    Ok((spread < settings.coefficient_tolerance).then_some((primary, spread)))
}

fn new_bessel(settings: &SearchSettings) -> BesselEvaluator {
    match settings.cache_capacity {
        Some(capacity) => BesselEvaluator::with_cache(capacity),
        None => BesselEvaluator::new(),
    }
}

fn sign_assignments(
    group: &GroupData,
    fixed: Option<&SignAssignment>,
    settings: &SearchSettings,
) -> Vec<SignAssignment> {
    match fixed {
        Some(signs) => vec![signs.clone()],
        None if settings.exhaustive_signs => all_signs(group.cusps()),
        None => short_all_signs(group.level()),
    }
}

/// Spaces at the primary and verification heights sharing the same truncation.
fn build_spaces(
    group: GroupData,
    r_max: f64,
    settings: &SearchSettings,
) -> Result<(MaassSpace, MaassSpace)> {
    let primary = MaassSpace::new(group, r_max, settings.space)
        .with_context(|| format!("Failed to sample horocycle for R_max = {r_max}."))?;
    let secondary = primary
        .resample(primary.height() * settings.secondary_height_factor)
        .context("Failed to sample verification horocycle.")?;
    Ok((primary, secondary))
}

struct SearchContext<'a> {
    primary: &'a MaassSpace,
    secondary: &'a MaassSpace,
    symmetry: Symmetry,
    assignments: &'a [SignAssignment],
    settings: &'a SearchSettings,
}

/// Runs `search` on each assignment in order and stops at the first acceptance.
fn first_accepted<'s, F>(
    assignments: &'s [SignAssignment],
    mut search: F,
) -> Result<Option<(&'s SignAssignment, LinearizedRoot)>>
where
    F: FnMut(&SignAssignment) -> Result<Option<LinearizedRoot>>,
{
    for signs in assignments {
        debug!(?signs, "searching sign assignment");
        if let Some(root) = search(signs)? {
            return Ok(Some((signs, root)));
        }
    }
    Ok(None)
}

impl SearchContext<'_> {
    fn run(
        &self,
        guess: f64,
        radius: f64,
        bessel: &mut BesselEvaluator,
    ) -> Result<Option<EigenResult>> {
        let found = first_accepted(self.assignments, |signs| {
            let mut problem = MaassProblem::new(
                self.primary,
                self.secondary,
                self.symmetry,
                signs,
                &mut *bessel,
            );
            find_single_ev_linearized(&mut problem, guess, radius, self.settings)
        })?;

        Ok(found.map(|(signs, root)| EigenResult {
            level: self.primary.group().level(),
            r: root.r,
            symmetry: self.symmetry,
            signs: signs.clone(),
            coefficients: root.coefficients,
            spread: root.spread,
            iterations: root.iterations,
        }))
    }
}

/// Searches for a Maass form on Γ0(N) with spectral parameter within `radius` of `guess`.
#[tracing::instrument(skip_all, fields(level = request.level, guess = request.guess))]
pub fn find_eigenvalue(request: &SearchRequest) -> Result<Option<EigenResult>> {
    let settings = &request.settings;
    settings.validate()?;
    if !request.guess.is_finite() || !(request.radius > 0.0) {
        bail!("Search needs a finite guess and a positive radius.");
    }

    let group = GroupData::build(request.level)
        .with_context(|| format!("Failed to build group data for level {}.", request.level))?;
    let assignments = sign_assignments(&group, request.signs.as_ref(), settings);
    let (primary, secondary) = build_spaces(group, request.guess + request.radius, settings)?;
    let mut bessel = new_bessel(settings);

    let context = SearchContext {
        primary: &primary,
        secondary: &secondary,
        symmetry: request.symmetry,
        assignments: &assignments,
        settings,
    };
    context.run(request.guess, request.radius, &mut bessel)
}

/// Searches every window of width `step` in [start, end] and returns the distinct hits in order.
#[tracing::instrument(skip_all, fields(level = request.level, start = request.start, end = request.end))]
pub fn scan_range(request: &ScanRequest) -> Result<Vec<EigenResult>> {
    let settings = &request.settings;
    settings.validate()?;
    if !(request.start.is_finite() && request.end.is_finite()) || request.start >= request.end {
        bail!("Scan interval must satisfy start < end.");
    }
    if !(request.step > 0.0) {
        bail!("Scan step must be positive.");
    }

    let group = GroupData::build(request.level)
        .with_context(|| format!("Failed to build group data for level {}.", request.level))?;
    let assignments = sign_assignments(&group, request.signs.as_ref(), settings);
    let (primary, secondary) = build_spaces(group, request.end + request.step / 2.0, settings)?;
    let mut bessel = new_bessel(settings);

    let context = SearchContext {
        primary: &primary,
        secondary: &secondary,
        symmetry: request.symmetry,
        assignments: &assignments,
        settings,
    };

    let radius = request.step / 2.0;
    let mut found: Vec<EigenResult> = Vec::new();
    let mut center = request.start + radius;
    while center - radius < request.end {
        if let Some(result) = context.run(center, radius, &mut bessel)? {
            let inside = result.r >= request.start && result.r <= request.end;
            let duplicate = found
                .iter()
                .any(|f| (f.r - result.r).abs() < settings.dedup_tolerance);
            if inside && !duplicate {
                debug!(r = result.r, "scan hit");
                found.push(result);
            }
        }
        center += request.step;
    }

    found.sort_by(|a, b| a.r.total_cmp(&b.r));
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::DMatrix;

    /// M(R) = diag(R − r_i), singular exactly at the listed roots.
    struct DiagonalProblem {
        roots: Vec<f64>,
        accept: bool,
        visited: Vec<(f64, f64)>,
    }

    impl DiagonalProblem {
        fn new(roots: &[f64]) -> Self {
            Self {
                roots: roots.to_vec(),
                accept: true,
                visited: Vec::new(),
            }
        }
    }

    impl SpectralProblem for DiagonalProblem {
        fn system_matrix(&mut self, r: f64) -> Result<DMatrix<f64>> {
            let n = self.roots.len();
            Ok(DMatrix::from_fn(n, n, |i, j| {
                if i == j {
                    r - self.roots[i]
                } else {
                    0.0
                }
            }))
        }

        fn coefficients(&mut self, r: f64, discretization: Discretization) -> Result<FourierCoefficients> {
            let offset = match (discretization, self.accept) {
                (Discretization::Primary, _) | (Discretization::Secondary, true) => 0.0,
                (Discretization::Secondary, false) => 1.0,
            };
            Ok(FourierCoefficients::from_unknowns([r + offset, 0.5]))
        }

        fn on_iteration(&mut self, _iteration: usize, guess: f64, radius: f64) {
            self.visited.push((guess, radius));
        }
    }

    /// Fails to solve anywhere, as if every candidate were singular.
    struct SingularProblem;

    impl SpectralProblem for SingularProblem {
        fn system_matrix(&mut self, r: f64) -> Result<DMatrix<f64>> {
            Ok(DMatrix::from_element(1, 1, r - 1.0))
        }

        fn coefficients(&mut self, _r: f64, _discretization: Discretization) -> Result<FourierCoefficients> {
            Err(HejhalError::SingularSystem {
                size: 1,
                column: 0,
                pivot: 0.0,
            }
            .into())
        }
    }

    fn settings() -> SearchSettings {
        SearchSettings {
            secant_step: 1e-6,
            ..SearchSettings::default()
        }
    }

    #[test]
    fn linear_problem_converges_to_its_root() {
        let mut problem = DiagonalProblem::new(&[2.25]);
        let root = find_single_ev_linearized(&mut problem, 2.0, 1.0, &settings())
            .expect("search runs")
            .expect("root found");
        assert!((root.r - 2.25).abs() < 1e-7);
        assert_eq!(root.coefficients.a(2), Some(root.r));
        assert_eq!(root.iterations, problem.visited.len());
        assert_eq!(problem.visited[0], (2.0, 1.0));
    }

    #[test]
    fn roots_outside_the_radius_are_ignored() {
        let mut problem = DiagonalProblem::new(&[5.0]);
        let result = find_single_ev_linearized(&mut problem, 2.0, 1.0, &settings())
            .expect("search runs");
        assert!(result.is_none());
        assert_eq!(problem.visited.len(), 1);
    }

    #[test]
    fn disagreeing_coefficients_reject_the_branch() {
        let mut problem = DiagonalProblem::new(&[2.25]);
        problem.accept = false;
        let result = find_single_ev_linearized(&mut problem, 2.0, 1.0, &settings())
            .expect("search runs");
        assert!(result.is_none());
    }

    #[test]
    fn worklist_is_last_in_first_out() {
        let roots = [1.8, 2.3];
        let mut problem = DiagonalProblem::new(&roots);
        let root = find_single_ev_linearized(&mut problem, 2.0, 1.0, &settings())
            .expect("search runs")
            .expect("root found");

        // L = diag(2 − r_i); both branches are pushed and the last one pushed is expanded next.
        let l = DMatrix::from_diagonal(&nalgebra::DVector::from_fn(2, |i, _| 2.0 - roots[i]));
        let last = compute_eigenvalues(&l).expect("finite")[1];
        let popped = 2.0 - last.re;
        let other = if (popped - 1.8).abs() < 1e-9 { 2.3 } else { 1.8 };

        assert_eq!(problem.visited[0], (2.0, 1.0));
        assert!((problem.visited[1].0 - popped).abs() < 1e-6, "{:?}", problem.visited);
        assert!((root.r - popped).abs() < 1e-7, "R = {}", root.r);
        assert!(problem.visited.iter().all(|&(g, _)| (g - other).abs() > 1e-3));
    }

    fn accepted_root(r: f64) -> LinearizedRoot {
        LinearizedRoot {
            r,
            coefficients: FourierCoefficients::from_unknowns([0.0]),
            spread: 0.0,
            iterations: 1,
        }
    }

    #[test]
    fn assignments_are_tried_in_order_until_one_is_accepted() {
        let assignments = short_all_signs(105);
        assert_eq!(assignments.len(), 4);

        let mut tried = Vec::new();
        let (signs, root) = first_accepted(&assignments, |signs| {
            let index = assignments.iter().position(|a| a == signs).expect("known");
            tried.push(index);
            Ok((index == 2).then(|| accepted_root(3.5)))
        })
        .expect("search runs")
        .expect("third assignment accepts");

        assert_eq!(tried, vec![0, 1, 2]);
        assert_eq!(signs, &assignments[2]);
        assert_eq!(root.r, 3.5);

        let mut count = 0;
        let none = first_accepted(&assignments, |_| {
            count += 1;
            Ok(None)
        })
        .expect("search runs");
        assert!(none.is_none());
        assert_eq!(count, 4);
    }

    #[test]
    fn assignment_errors_stop_the_sweep() {
        let assignments = short_all_signs(15);
        let mut count = 0;
        let err = first_accepted(&assignments, |_| {
            count += 1;
            bail!("assembly failed")
        })
        .expect_err("error propagates");
        assert_eq!(err.to_string(), "assembly failed");
        assert_eq!(count, 1);
    }

    #[test]
    fn unsigned_requests_use_the_multiplicative_assignments() {
        let group = GroupData::build(30).expect("valid level");
        let defaults = SearchSettings::default();
        assert_eq!(sign_assignments(&group, None, &defaults), short_all_signs(30));

        let exhaustive = SearchSettings {
            exhaustive_signs: true,
            ..defaults
        };
        let all = sign_assignments(&group, None, &exhaustive);
        assert_eq!(all, all_signs(group.cusps()));
        assert_eq!(all.len(), 1 << (group.cusps().len() - 1));

        let fixed = short_all_signs(30).pop().expect("nonempty");
        assert_eq!(sign_assignments(&group, Some(&fixed), &exhaustive), vec![fixed]);
    }

    #[test]
    fn iteration_budget_is_enforced() {
        let mut problem = DiagonalProblem::new(&[2.25]);
        let capped = SearchSettings {
            max_iterations: 1,
            ..settings()
        };
        let result = find_single_ev_linearized(&mut problem, 2.0, 1.0, &capped)
            .expect("search runs");
        assert!(result.is_none());
        assert_eq!(problem.visited.len(), 1);
    }

    #[test]
    fn singular_verification_drops_the_branch() {
        let result = find_single_ev_linearized(&mut SingularProblem, 0.9, 0.5, &settings())
            .expect("search runs");
        assert!(result.is_none());
    }

    #[test]
    fn invalid_settings_are_rejected() {
        let mut problem = DiagonalProblem::new(&[2.25]);
        let bad = SearchSettings {
            coefficient_tolerance: 0.0,
            ..SearchSettings::default()
        };
        let err = find_single_ev_linearized(&mut problem, 2.0, 1.0, &bad).expect_err("invalid");
        assert!(err.to_string().contains("coefficient_tolerance"));
        assert!(find_single_ev_linearized(&mut problem, 2.0, 0.0, &settings()).is_err());
    }

    #[test]
    fn level_one_linearization_is_stable_in_the_step() {
        let group = GroupData::build(1).expect("valid level");
        let primary = MaassSpace::with_height(group, 10.5, 0.5, Default::default())
            .expect("space");
        let secondary = primary.resample(0.45).expect("space");
        let signs = SignAssignment::trivial();
        let mut bessel = BesselEvaluator::new();
        let mut problem =
            MaassProblem::new(&primary, &secondary, Symmetry::Odd, &signs, &mut bessel);

        let r = 9.5;
        let m = problem.system_matrix(r).expect("assembled");
        let scales = column_scales(&m);
        let scaled = divide_columns(m.clone(), &scales);
        for h in [1e-10, 1e-7, 1e-5] {
            let shifted = problem.system_matrix(r + h).expect("assembled");
            let derivative = divide_columns((shifted - &m) / h, &scales);
            let l = linearize(&derivative, &scaled).expect("regular derivative");
            let smallest = compute_eigenvalues(&l)
                .expect("finite")
                .into_iter()
                .min_by(|a, b| a.norm().total_cmp(&b.norm()))
                .expect("nonempty");
            // R − R* = 9.5 − 9.5337 to first order
            assert!((smallest.re + 0.03447).abs() < 2e-4, "h = {h}: {smallest}");
            assert!(smallest.im.abs() < 1e-6);
        }
    }

    #[test]
    fn level_one_odd_form_is_located() {
        let group = GroupData::build(1).expect("valid level");
        let primary = MaassSpace::with_height(group, 10.5, 0.5, Default::default())
            .expect("space");
        let secondary = primary.resample(0.45).expect("space");
        let signs = SignAssignment::trivial();
        let mut bessel = BesselEvaluator::with_cache(100_000);
        let mut problem =
            MaassProblem::new(&primary, &secondary, Symmetry::Odd, &signs, &mut bessel);

        let root = find_single_ev_linearized(&mut problem, 9.5, 1.0, &SearchSettings::default())
            .expect("search runs")
            .expect("eigenvalue found");
        assert!((root.r - 9.53369526135).abs() < 1e-6, "R = {}", root.r);
        let a2 = root.coefficients.a(2).expect("a(2)");
        assert!((a2 + 1.0683335512).abs() < 1e-5);
    }
}
