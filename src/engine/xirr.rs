//! XIRR: the annualised rate that zeroes the NPV of irregularly dated cash flows.
//!
//! ```text
//! NPV(r) = Σ amount_i / (1 + r)^t_i,   t_i = (date_i - date_0) / 365
//! NPV'(r) = Σ -t_i * amount_i / (1 + r)^(t_i + 1)
//! ```
//!
//! The root is bracketed on a fixed grid over `r > -1`, then refined with
//! Newton-Raphson steps that fall back to bisection whenever a step would leave
//! the bracket or fails to halve the previous step.

use super::CashFlow;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

/// Annualised fractional return (0.15 = 15% per year).
pub type Rate = f64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum XirrError {
    /// Empty series, or no strictly negative or no strictly positive amount.
    #[error("cash flows need at least one buy and one sell")]
    InsufficientCashFlows,
    /// All amounts zero, or all flows on one date.
    #[error("cash flows are degenerate (single date or all zero)")]
    DegenerateInput,
    #[error("rate search did not converge")]
    NoConvergence,
}

const DAYS_PER_YEAR: f64 = 365.0;
const MAX_ITERATIONS: usize = 200;
const RATE_TOLERANCE: f64 = 1e-10;
const NPV_TOLERANCE: f64 = 1e-10;
const INITIAL_GUESS: f64 = 0.1;

/// Candidate rates scanned for a sign change, ascending.
const BRACKET_GRID: [f64; 14] = [
    -0.9999, -0.99, -0.9, -0.5, 0.0, 0.5, 1.0, 2.0, 5.0, 10.0, 100.0, 1_000.0, 10_000.0,
    1_000_000.0,
];

#[derive(Debug, Clone, Copy)]
struct Term {
    years: f64,
    amount: f64,
}

/// Solve for the XIRR of `flows`.
///
/// Flow order does not matter; time is measured from the earliest date.
///
/// # Errors
/// - `InsufficientCashFlows` when empty or lacking one of the two signs
/// - `DegenerateInput` when every amount is zero or every flow shares a date
/// - `NoConvergence` when no sign change is found or the iteration budget runs out
pub fn solve(flows: &[CashFlow]) -> Result<Rate, XirrError> {
    if flows.is_empty() {
        return Err(XirrError::InsufficientCashFlows);
    }
    if flows.iter().all(|cf| cf.amount.is_zero()) {
        return Err(XirrError::DegenerateInput);
    }
    let has_negative = flows.iter().any(|cf| cf.amount.is_negative());
    let has_positive = flows.iter().any(|cf| cf.amount.is_positive());
    if !has_negative || !has_positive {
        return Err(XirrError::InsufficientCashFlows);
    }

    let first = flows.iter().map(|cf| cf.date).min();
    let last = flows.iter().map(|cf| cf.date).max();
    let (Some(first), Some(last)) = (first, last) else {
        return Err(XirrError::InsufficientCashFlows);
    };
    if first == last {
        return Err(XirrError::DegenerateInput);
    }

    let terms = normalised_terms(flows, first)?;
    let (a, b) = find_bracket(&terms).ok_or(XirrError::NoConvergence)?;
    if a == b {
        return Ok(a);
    }
    let rate = refine(&terms, a, b)?;
    debug!(rate, flows = flows.len(), "XIRR converged");
    Ok(rate)
}

/// Amounts scaled into [-1, 1]; the root is scale-invariant.
fn normalised_terms(flows: &[CashFlow], first: chrono::NaiveDate) -> Result<Vec<Term>, XirrError> {
    let mut terms = Vec::with_capacity(flows.len());
    for cf in flows {
        let amount = cf.amount.to_f64().ok_or(XirrError::DegenerateInput)?;
        let years = (cf.date - first).num_days() as f64 / DAYS_PER_YEAR;
        terms.push(Term { years, amount });
    }
    let scale = terms.iter().fold(0.0_f64, |m, t| m.max(t.amount.abs()));
    if scale == 0.0 || !scale.is_finite() {
        return Err(XirrError::DegenerateInput);
    }
    for term in &mut terms {
        term.amount /= scale;
    }
    Ok(terms)
}

fn npv_and_derivative(terms: &[Term], rate: f64) -> (f64, f64) {
    let base = 1.0 + rate;
    let mut npv = 0.0;
    let mut derivative = 0.0;
    for term in terms {
        let discount = base.powf(-term.years);
        npv += term.amount * discount;
        derivative -= term.years * term.amount * discount / base;
    }
    (npv, derivative)
}

/// First adjacent grid pair with a sign change. Returns `(r, r)` on an exact root.
fn find_bracket(terms: &[Term]) -> Option<(f64, f64)> {
    let mut previous: Option<(f64, f64)> = None;
    for &rate in BRACKET_GRID.iter() {
        let (npv, _) = npv_and_derivative(terms, rate);
        if !npv.is_finite() {
            continue;
        }
        if npv == 0.0 {
            return Some((rate, rate));
        }
        if let Some((prev_rate, prev_npv)) = previous {
            if prev_npv.signum() != npv.signum() {
                return Some((prev_rate, rate));
            }
        }
        previous = Some((rate, npv));
    }
    None
}

/// Safeguarded Newton-Raphson inside a sign-change bracket `[a, b]`.
fn refine(terms: &[Term], a: f64, b: f64) -> Result<Rate, XirrError> {
    let (fa, _) = npv_and_derivative(terms, a);
    // Orient so that npv(neg_side) < 0 < npv(pos_side).
    let (mut neg_side, mut pos_side) = if fa < 0.0 { (a, b) } else { (b, a) };

    let mut rate = if INITIAL_GUESS > a.min(b) && INITIAL_GUESS < a.max(b) {
        INITIAL_GUESS
    } else {
        0.5 * (a + b)
    };
    let mut previous_step = (b - a).abs();

    for _ in 0..MAX_ITERATIONS {
        let (npv, derivative) = npv_and_derivative(terms, rate);
        if npv.abs() < NPV_TOLERANCE {
            return Ok(rate);
        }
        if npv < 0.0 {
            neg_side = rate;
        } else {
            pos_side = rate;
        }

        let lower = neg_side.min(pos_side);
        let upper = neg_side.max(pos_side);
        let bisect = 0.5 * (neg_side + pos_side);

        let newton = if derivative != 0.0 && derivative.is_finite() {
            rate - npv / derivative
        } else {
            f64::NAN
        };
        let next = if newton.is_finite()
            && newton > lower
            && newton < upper
            && (newton - rate).abs() <= 0.5 * previous_step
        {
            newton
        } else {
            bisect
        };

        let step = (next - rate).abs();
        if step <= RATE_TOLERANCE * (1.0 + next.abs()) {
            return Ok(next);
        }
        previous_step = step;
        rate = next;
    }

    Err(XirrError::NoConvergence)
}
