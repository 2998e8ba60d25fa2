use crate::pricing::{OptionKind, QuoteRequest, QuoteResult};

/// Fixed-length binary protocol. One request per 43-byte frame, one
/// response per 24-byte frame. All multi-byte fields are little-endian
/// (the legacy service wrote host-native doubles; the layout is now
/// pinned so heterogeneous clients interoperate).
///
/// Request frame:
///   0..8    spot (f64)
///   8..16   strike (f64)
///   16..24  rate (f64)
///   24..32  volatility (f64)
///   32..40  maturity (f64)
///   40      option kind: 0 = call, anything else = put
///   41..43  steps (u16); 0 selects the closed form
///
/// Response frame: price, delta, vega as three f64s.
pub const REQUEST_LEN: usize = 43;
pub const RESPONSE_LEN: usize = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum WireError {
    #[error("request frame must be {REQUEST_LEN} bytes, got {0}")]
    WrongLength(usize),
}

pub fn decode_request(buf: &[u8]) -> Result<QuoteRequest, WireError> {
    if buf.len() != REQUEST_LEN {
        return Err(WireError::WrongLength(buf.len()));
    }

    let kind = if buf[40] == 0 {
        OptionKind::Call
    } else {
        OptionKind::Put
    };

    Ok(QuoteRequest {
        spot: read_f64(buf, 0),
        strike: read_f64(buf, 8),
        rate: read_f64(buf, 16),
        volatility: read_f64(buf, 24),
        maturity: read_f64(buf, 32),
        kind,
        steps: u16::from_le_bytes([buf[41], buf[42]]),
    })
}

pub fn encode_response(quote: &QuoteResult) -> [u8; RESPONSE_LEN] {
    let mut buf = [0u8; RESPONSE_LEN];
    buf[0..8].copy_from_slice(&quote.price.to_le_bytes());
    buf[8..16].copy_from_slice(&quote.delta.to_le_bytes());
    buf[16..24].copy_from_slice(&quote.vega.to_le_bytes());
    buf
}

/// Client-side counterpart of `decode_request`, for tooling and tests.
pub fn encode_request(req: &QuoteRequest) -> [u8; REQUEST_LEN] {
    let mut buf = [0u8; REQUEST_LEN];
    buf[0..8].copy_from_slice(&req.spot.to_le_bytes());
    buf[8..16].copy_from_slice(&req.strike.to_le_bytes());
    buf[16..24].copy_from_slice(&req.rate.to_le_bytes());
    buf[24..32].copy_from_slice(&req.volatility.to_le_bytes());
    buf[32..40].copy_from_slice(&req.maturity.to_le_bytes());
    buf[40] = match req.kind {
        OptionKind::Call => 0,
        OptionKind::Put => 1,
    };
    buf[41..43].copy_from_slice(&req.steps.to_le_bytes());
    buf
}

#[inline]
fn read_f64(buf: &[u8], offset: usize) -> f64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&buf[offset..offset + 8]);
    f64::from_le_bytes(bytes)
}
