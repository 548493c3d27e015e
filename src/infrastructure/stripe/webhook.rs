use crate::error::{MarketplaceError, Result};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the processor's signature.
pub const SIGNATURE_HEADER: &str = "stripe-signature";
pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

/// Parsed `t=<unix>,v1=<hex>[,v1=<hex>...]` header.
#[derive(Debug, PartialEq)]
struct SignatureHeader {
    timestamp: i64,
    signatures: Vec<String>,
}

impl SignatureHeader {
    fn parse(raw: &str) -> Result<Self> {
        let mut timestamp = None;
        let mut signatures = Vec::new();
        for part in raw.split(',') {
            let Some((key, value)) = part.trim().split_once('=') else {
                continue;
            };
            match key {
                "t" => {
                    timestamp = Some(value.parse::<i64>().map_err(|_| {
                        MarketplaceError::SignatureError("invalid timestamp".to_string())
                    })?)
                }
                "v1" => signatures.push(value.to_string()),
                // v0 and unknown schemes are not trusted
                _ => {}
            }
        }
        let timestamp = timestamp.ok_or_else(|| {
            MarketplaceError::SignatureError("missing timestamp".to_string())
        })?;
        if signatures.is_empty() {
            return Err(MarketplaceError::SignatureError(
                "no v1 signature".to_string(),
            ));
        }
        Ok(Self {
            timestamp,
            signatures,
        })
    }
}

fn mac(secret: &str, timestamp: i64, payload: &[u8]) -> Result<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| MarketplaceError::SignatureError(e.to_string()))?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(mac)
}

/// Builds a signature header for `payload`, as the processor would send it.
pub fn signature_header(secret: &str, timestamp: i64, payload: &[u8]) -> Result<String> {
    let digest = mac(secret, timestamp, payload)?.finalize().into_bytes();
    Ok(format!("t={timestamp},v1={}", hex::encode(digest)))
}

/// Checks webhook payloads against the shared signing secret.
#[derive(Clone)]
pub struct WebhookVerifier {
    secret: String,
    tolerance: Duration,
}

impl WebhookVerifier {
    pub fn new(secret: impl Into<String>, tolerance: Duration) -> Self {
        Self {
            secret: secret.into(),
            tolerance,
        }
    }

    /// Accepts the payload only if one of the `v1` signatures is an HMAC-SHA256
    /// of `"<t>.<payload>"` and `t` is within tolerance of `now`.
    pub fn verify(&self, payload: &[u8], header: Option<&str>, now: DateTime<Utc>) -> Result<()> {
        let header = header.ok_or_else(|| {
            MarketplaceError::SignatureError("missing signature header".to_string())
        })?;
        let header = SignatureHeader::parse(header)?;

        if (now.timestamp() - header.timestamp).abs() > self.tolerance.num_seconds() {
            return Err(MarketplaceError::SignatureError(
                "timestamp outside the tolerance zone".to_string(),
            ));
        }

        for signature in &header.signatures {
            let Ok(expected) = hex::decode(signature) else {
                continue;
            };
            // verify_slice compares in constant time
            if mac(&self.secret, header.timestamp, payload)?
                .verify_slice(&expected)
                .is_ok()
            {
                return Ok(());
            }
        }
        Err(MarketplaceError::SignatureError(
            "no signature matches the payload".to_string(),
        ))
    }
}
