use crate::pricing::{black_scholes, OptionKind, QuoteRequest, QuoteResult};
use smallvec::SmallVec;

/// Volatility bump used for the finite-difference vega, scaled below to a
/// one-percentage-point move.
const VEGA_BUMP: f64 = 1e-4;

/// Cox-Ross-Rubinstein binomial tree price for a European option.
///
/// Delta is the legacy one-step finite difference read from the node
/// buffer after the final in-place induction pass; vega re-runs the whole
/// tree at sigma + 1e-4, so each call costs O(steps^2) twice. The same
/// zero-quote guard as the closed form applies.
pub fn price(req: &QuoteRequest, steps: u16) -> QuoteResult {
    if !req.in_domain() {
        return QuoteResult::ZERO;
    }

    if req.maturity == 0.0 {
        return black_scholes::expiry_quote(req);
    }

    // Method dispatch never passes 0; clamp so a direct caller cannot
    // collapse the lattice to a single node.
    let steps = steps.max(1);

    let (price, delta) = tree_value(req, steps, req.volatility);
    let (bumped, _) = tree_value(req, steps, req.volatility + VEGA_BUMP);

    QuoteResult {
        price,
        delta,
        vega: (bumped - price) / VEGA_BUMP * 0.01,
    }
}

/// Root value and one-step delta for a single lattice evaluation.
fn tree_value(req: &QuoteRequest, steps: u16, sigma: f64) -> (f64, f64) {
    if sigma <= 0.0 {
        return deterministic_value(req);
    }

    let n = steps as usize;
    let dt = req.maturity / f64::from(steps);
    let u = (sigma * dt.sqrt()).exp();
    let d = 1.0 / u;
    let disc = (-req.rate * dt).exp();
    let q = ((req.rate * dt).exp() - d) / (u - d);

    // Terminal payoffs; node i has seen (n - i) up moves.
    let mut values: SmallVec<[f64; 128]> = SmallVec::with_capacity(n + 1);
    for i in 0..=n {
        let terminal = req.spot * u.powi((n - i) as i32) * d.powi(i as i32);
        values.push(match req.kind {
            OptionKind::Call => (terminal - req.strike).max(0.0),
            OptionKind::Put => (req.strike - terminal).max(0.0),
        });
    }

    // In-place backward induction. After the last pass values[0] is the
    // root and values[1] still holds the level-1 down node, which the
    // delta approximation below reads deliberately.
    for step in (0..n).rev() {
        for i in 0..=step {
            values[i] = disc * (q * values[i] + (1.0 - q) * values[i + 1]);
        }
    }

    let delta = (values[1] - values[0]) / (req.spot * (u - d));
    (values[0], delta)
}

/// sigma == 0 collapses the lattice: the underlying drifts at r with
/// certainty, so the option is worth its discounted forward payoff.
fn deterministic_value(req: &QuoteRequest) -> (f64, f64) {
    let disc = (-req.rate * req.maturity).exp();
    let forward = req.spot / disc;
    let (payoff, delta) = match req.kind {
        OptionKind::Call => (
            (forward - req.strike).max(0.0),
            if forward > req.strike { 1.0 } else { 0.0 },
        ),
        OptionKind::Put => (
            (req.strike - forward).max(0.0),
            if forward < req.strike { -1.0 } else { 0.0 },
        ),
    };
    (disc * payoff, delta)
}
