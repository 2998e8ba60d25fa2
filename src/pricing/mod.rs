pub mod binomial;
pub mod black_scholes;

/// European option side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionKind {
    Call,
    Put,
}

impl OptionKind {
    /// DB column value; the CHECK constraint mirrors these strings.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Call => "call",
            Self::Put => "put",
        }
    }
}

impl std::fmt::Display for OptionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The wire protocol encodes method selection as a step count, with 0
/// meaning the closed form. That sentinel is mapped into an explicit
/// variant here, once, at the edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceMethod {
    ClosedForm,
    Tree { steps: u16 },
}

impl PriceMethod {
    #[inline]
    pub fn from_steps(steps: u16) -> Self {
        if steps == 0 {
            Self::ClosedForm
        } else {
            Self::Tree { steps }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ClosedForm => "black_scholes",
            Self::Tree { .. } => "binomial",
        }
    }
}

impl std::fmt::Display for PriceMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One decoded pricing request. Plain data, no invariants enforced at
/// construction; the numeric guard lives in the pricing functions.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct QuoteRequest {
    pub spot: f64,
    pub strike: f64,
    pub rate: f64,
    pub volatility: f64,
    pub maturity: f64,
    pub kind: OptionKind,
    pub steps: u16,
}

impl QuoteRequest {
    #[inline]
    pub fn method(&self) -> PriceMethod {
        PriceMethod::from_steps(self.steps)
    }

    /// Legacy guard: out-of-domain inputs are answered with a zero quote,
    /// not an error. The response is indistinguishable from a genuinely
    /// worthless option, so callers of the guard log the inputs.
    #[inline]
    pub(crate) fn in_domain(&self) -> bool {
        self.spot > 0.0 && self.strike > 0.0 && self.maturity >= 0.0 && self.volatility >= 0.0
    }

    #[inline]
    pub(crate) fn intrinsic(&self) -> f64 {
        match self.kind {
            OptionKind::Call => (self.spot - self.strike).max(0.0),
            OptionKind::Put => (self.strike - self.spot).max(0.0),
        }
    }
}

/// Price and first-order risk sensitivities.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct QuoteResult {
    pub price: f64,
    pub delta: f64,
    pub vega: f64,
}

impl QuoteResult {
    pub const ZERO: Self = Self {
        price: 0.0,
        delta: 0.0,
        vega: 0.0,
    };
}

/// Dispatch on the requested method. Pure: no I/O, no shared state.
/// Cannot fail; invalid numeric inputs fall to the zero guard inside
/// each method.
pub fn evaluate(req: &QuoteRequest) -> QuoteResult {
    match req.method() {
        PriceMethod::ClosedForm => black_scholes::price(req),
        PriceMethod::Tree { steps } => binomial::price(req, steps),
    }
}
