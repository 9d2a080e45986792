//! XIRR: the annual rate at which the net present value of dated cash flows
//! is zero. Brent's method on a bracketed root first, then Newton-Raphson.

use chrono::NaiveDate;
use log::debug;
use num_traits::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;

use super::performance_model::{CashFlow, XirrMethod, XirrResult, XirrUndefinedReason};
use crate::constants::{DECIMAL_PRECISION, DEFAULT_XIRR_MIN_SPAN_DAYS};

const DAYS_PER_YEAR: f64 = 365.0;
const MIN_RATE: f64 = -0.99;
const MAX_RATE: f64 = 10.0;
const TOLERANCE: f64 = 1e-10;
const MAX_ITERATIONS: usize = 100;
/// Points scanned for a sign change of the NPV, ascending.
const BRACKET_GRID: [f64; 14] = [
    MIN_RATE, -0.9, -0.75, -0.5, -0.25, -0.1, 0.0, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, MAX_RATE,
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct XirrSolver {
    min_span_days: i64,
}

impl Default for XirrSolver {
    fn default() -> Self {
        Self::new(DEFAULT_XIRR_MIN_SPAN_DAYS)
    }
}

struct Flow {
    years: f64,
    amount: f64,
}

impl XirrSolver {
    pub fn new(min_span_days: i64) -> Self {
        Self { min_span_days }
    }

    pub fn min_span_days(&self) -> i64 {
        self.min_span_days
    }

    pub fn solve(&self, cash_flows: &[CashFlow]) -> XirrResult {
        if cash_flows.len() < 2 {
            return XirrResult::undefined(XirrUndefinedReason::TooFewFlows);
        }
        let has_negative = cash_flows.iter().any(|cf| cf.amount < Decimal::ZERO);
        let has_positive = cash_flows.iter().any(|cf| cf.amount > Decimal::ZERO);
        if !has_negative || !has_positive {
            return XirrResult::undefined(XirrUndefinedReason::SingleSign);
        }

        let (Some(first), Some(last)) = (
            cash_flows.iter().map(|cf| cf.date).min(),
            cash_flows.iter().map(|cf| cf.date).max(),
        ) else {
            return XirrResult::undefined(XirrUndefinedReason::TooFewFlows);
        };
        if (last - first).num_days() < self.min_span_days {
            return XirrResult::undefined(XirrUndefinedReason::SpanTooShort);
        }

        let flows = to_year_fractions(cash_flows, first);
        let solved = solve_brent(&flows)
            .map(|rate| (rate, XirrMethod::Brent))
            .or_else(|| solve_newton(&flows).map(|rate| (rate, XirrMethod::Newton)));

        match solved.and_then(|(rate, method)| {
            Decimal::from_f64(rate).map(|r| (r.round_dp(DECIMAL_PRECISION), method))
        }) {
            Some((rate, method)) => {
                debug!("XIRR {} via {} over {} flows", rate, method.as_str(), cash_flows.len());
                XirrResult::solved(rate, method)
            }
            None => XirrResult::undefined(XirrUndefinedReason::NoConvergence),
        }
    }
}

fn to_year_fractions(cash_flows: &[CashFlow], base_date: NaiveDate) -> Vec<Flow> {
    cash_flows
        .iter()
        .map(|cf| Flow {
            years: (cf.date - base_date).num_days() as f64 / DAYS_PER_YEAR,
            amount: cf.amount.to_f64().unwrap_or(0.0),
        })
        .collect()
}

fn npv(flows: &[Flow], rate: f64) -> f64 {
    flows
        .iter()
        .map(|f| f.amount * (1.0 + rate).powf(-f.years))
        .sum()
}

fn npv_derivative(flows: &[Flow], rate: f64) -> f64 {
    flows
        .iter()
        .map(|f| -f.years * f.amount * (1.0 + rate).powf(-f.years - 1.0))
        .sum()
}

/// First adjacent pair of grid points whose NPVs differ in sign.
fn find_bracket(flows: &[Flow]) -> Option<(f64, f64)> {
    BRACKET_GRID.windows(2).find_map(|pair| {
        let (lo, hi) = (pair[0], pair[1]);
        let (f_lo, f_hi) = (npv(flows, lo), npv(flows, hi));
        (f_lo.is_finite() && f_hi.is_finite() && f_lo * f_hi <= 0.0).then_some((lo, hi))
    })
}

fn solve_brent(flows: &[Flow]) -> Option<f64> {
    let (mut a, mut b) = find_bracket(flows)?;
    let mut fa = npv(flows, a);
    let mut fb = npv(flows, b);
    if fa == 0.0 {
        return Some(a);
    }
    let (mut c, mut fc) = (b, fb);
    let mut d = b - a;
    let mut e = d;

    for _ in 0..MAX_ITERATIONS {
        if (fb > 0.0 && fc > 0.0) || (fb < 0.0 && fc < 0.0) {
            c = a;
            fc = fa;
            d = b - a;
            e = d;
        }
        if fc.abs() < fb.abs() {
            a = b;
            b = c;
            c = a;
            fa = fb;
            fb = fc;
            fc = fa;
        }

        let tol = 2.0 * f64::EPSILON * b.abs() + 0.5 * TOLERANCE;
        let midpoint = 0.5 * (c - b);
        if midpoint.abs() <= tol || fb == 0.0 {
            return Some(b);
        }

        if e.abs() >= tol && fa.abs() > fb.abs() {
            // inverse quadratic interpolation, or secant when only two points
            let s = fb / fa;
            let (mut p, mut q) = if a == c {
                (2.0 * midpoint * s, 1.0 - s)
            } else {
                let q = fa / fc;
                let r = fb / fc;
                (
                    s * (2.0 * midpoint * q * (q - r) - (b - a) * (r - 1.0)),
                    (q - 1.0) * (r - 1.0) * (s - 1.0),
                )
            };
            if p > 0.0 {
                q = -q;
            }
            p = p.abs();
            let bound = (3.0 * midpoint * q - (tol * q).abs()).min((e * q).abs());
            if 2.0 * p < bound {
                e = d;
                d = p / q;
            } else {
                d = midpoint;
                e = d;
            }
        } else {
            d = midpoint;
            e = d;
        }

        a = b;
        fa = fb;
        b += if d.abs() > tol { d } else { tol.copysign(midpoint) };
        fb = npv(flows, b);
        if !fb.is_finite() {
            return None;
        }
    }
    None
}

/// Newton-Raphson from 10%. Gives up as soon as an iterate leaves
/// `[-99%, 1000%]` or the derivative vanishes.
fn solve_newton(flows: &[Flow]) -> Option<f64> {
    let mut rate = 0.1;
    for _ in 0..MAX_ITERATIONS {
        let value = npv(flows, rate);
        let slope = npv_derivative(flows, rate);
        if !value.is_finite() || !slope.is_finite() || slope.abs() < 1e-12 {
            return None;
        }
        let next = rate - value / slope;
        if !(MIN_RATE..=MAX_RATE).contains(&next) {
            return None;
        }
        if (next - rate).abs() < TOLERANCE {
            return Some(next);
        }
        rate = next;
    }
    None
}
