use crate::pricing::{OptionKind, QuoteRequest, QuoteResult};
use statrs::distribution::{Continuous, ContinuousCDF, Normal};

/// Closed-form Black-Scholes price, delta, and vega for a European
/// option.
///
/// d1 = (ln(S/K) + (r + sigma^2/2)*T) / (sigma * sqrt(T))
/// d2 = d1 - sigma * sqrt(T)
///
/// Out-of-domain inputs (S <= 0, K <= 0, T < 0, sigma < 0) return a zero
/// quote by legacy contract. At expiry (T == 0) the option is worth its
/// intrinsic value and vega is zero.
pub fn price(req: &QuoteRequest) -> QuoteResult {
    if !req.in_domain() {
        return QuoteResult::ZERO;
    }

    if req.maturity == 0.0 {
        return expiry_quote(req);
    }

    let normal = Normal::standard();
    let sqrt_t = req.maturity.sqrt();
    let d1 = ((req.spot / req.strike).ln()
        + (req.rate + 0.5 * req.volatility * req.volatility) * req.maturity)
        / (req.volatility * sqrt_t);
    let d2 = d1 - req.volatility * sqrt_t;
    let disc_strike = req.strike * (-req.rate * req.maturity).exp();

    let (price, delta) = match req.kind {
        OptionKind::Call => (
            req.spot * normal.cdf(d1) - disc_strike * normal.cdf(d2),
            normal.cdf(d1),
        ),
        OptionKind::Put => (
            disc_strike * normal.cdf(-d2) - req.spot * normal.cdf(-d1),
            normal.cdf(d1) - 1.0,
        ),
    };

    QuoteResult {
        price,
        delta,
        vega: req.spot * normal.pdf(d1) * sqrt_t,
    }
}

/// Expiry payoff shared with the lattice method's T == 0 path.
pub(crate) fn expiry_quote(req: &QuoteRequest) -> QuoteResult {
    let delta = match req.kind {
        OptionKind::Call => {
            if req.spot > req.strike {
                1.0
            } else {
                0.0
            }
        }
        OptionKind::Put => {
            if req.spot < req.strike {
                -1.0
            } else {
                0.0
            }
        }
    };
    QuoteResult {
        price: req.intrinsic(),
        delta,
        vega: 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(spot: f64, strike: f64, maturity: f64, kind: OptionKind) -> QuoteRequest {
        QuoteRequest {
            spot,
            strike,
            rate: 0.05,
            volatility: 0.2,
            maturity,
            kind,
            steps: 0,
        }
    }

    #[test]
    fn test_atm_call_reference_value() {
        let quote = price(&request(100.0, 100.0, 1.0, OptionKind::Call));
        // Standard textbook value for S=K=100, r=5%, sigma=20%, T=1y.
        assert!(
            (quote.price - 10.4506).abs() < 1e-3,
            "price={}",
            quote.price
        );
        assert!(quote.delta > 0.5 && quote.delta < 0.7, "delta={}", quote.delta);
        assert!(quote.vega > 0.0, "vega={}", quote.vega);
    }

    #[test]
    fn test_put_call_parity() {
        let call = price(&request(105.0, 98.0, 0.5, OptionKind::Call));
        let put = price(&request(105.0, 98.0, 0.5, OptionKind::Put));
        let forward = 105.0 - 98.0 * (-0.05f64 * 0.5).exp();
        assert!(
            (call.price - put.price - forward).abs() < 1e-9,
            "parity violated: C-P={} F={}",
            call.price - put.price,
            forward
        );
    }

    #[test]
    fn test_expiry_call_is_intrinsic() {
        let quote = price(&request(110.0, 100.0, 0.0, OptionKind::Call));
        assert_eq!(quote.price, 10.0);
        assert_eq!(quote.delta, 1.0);
        assert_eq!(quote.vega, 0.0);
    }

    #[test]
    fn test_expiry_otm_put_is_worthless() {
        let quote = price(&request(110.0, 100.0, 0.0, OptionKind::Put));
        assert_eq!(quote.price, 0.0);
        assert_eq!(quote.delta, 0.0);
        assert_eq!(quote.vega, 0.0);
    }

    #[test]
    fn test_out_of_domain_inputs_zeroed() {
        for req in [
            request(0.0, 100.0, 1.0, OptionKind::Call),
            request(-5.0, 100.0, 1.0, OptionKind::Put),
            request(100.0, 0.0, 1.0, OptionKind::Call),
            request(100.0, 100.0, -1.0, OptionKind::Call),
            QuoteRequest {
                volatility: -0.1,
                ..request(100.0, 100.0, 1.0, OptionKind::Put)
            },
        ] {
            assert_eq!(price(&req), QuoteResult::ZERO, "req={req:?}");
        }
    }

    #[test]
    fn test_put_delta_negative() {
        let quote = price(&request(90.0, 100.0, 1.0, OptionKind::Put));
        assert!(quote.delta < 0.0 && quote.delta > -1.0, "delta={}", quote.delta);
    }
}
