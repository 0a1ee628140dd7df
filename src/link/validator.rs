use crate::{AccessGrant, LinkError, LinkParams};
use hmac::{Hmac, Mac, digest::KeyInit};
use percent_encoding::{NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use sha2::Sha256;
use tracing::{debug, warn};

type HmacSha256 = Hmac<Sha256>;

/// Checks signed links against the server-held secret
pub struct LinkValidator {
    secret: Vec<u8>,
    default_organization: String,
}

impl LinkValidator {
    pub fn new(secret: impl Into<Vec<u8>>, default_organization: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            default_organization: default_organization.into(),
        }
    }

    /// Validate link parameters at time `now` (unix seconds)
    /// Returns the organization to bind to the session, or the reason for refusal
    pub fn validate(&self, params: &LinkParams, now: i64) -> Result<AccessGrant, LinkError> {
        let org = present(&params.org);
        let exp = present(&params.exp);
        let sig = present(&params.sig);

        match (org, exp, sig) {
            (None, None, None) => {
                debug!("No link parameters, opening form for default organization");
                Ok(AccessGrant {
                    organization: self.default_organization.clone(),
                    signed: false,
                })
            }
            (Some(org), Some(exp), Some(sig)) => self.check_signed(org, exp, sig, now),
            _ => {
                warn!("Link rejected: only some of org/exp/sig were supplied");
                Err(LinkError::Incomplete)
            }
        }
    }

    /// Lower-case hex HMAC-SHA256 of `"{org}|{exp}"`
    pub fn sign(&self, org: &str, exp: &str) -> Result<String, LinkError> {
        Ok(hex::encode(self.mac(org, exp)?.finalize().into_bytes()))
    }

    fn check_signed(
        &self,
        encoded_org: &str,
        exp: &str,
        sig: &str,
        now: i64,
    ) -> Result<AccessGrant, LinkError> {
        let org = percent_decode_str(encoded_org)
            .decode_utf8()
            .map_err(|_| {
                warn!("Link rejected: organization is not valid UTF-8 once decoded");
                LinkError::Malformed
            })?
            .into_owned();

        // Signatures are lower-case hex digests; anything else can never match
        if sig.bytes().any(|b| b.is_ascii_uppercase()) {
            warn!("Link rejected: signature is not lower-case hex");
            return Err(LinkError::Tampered);
        }
        let expected = hex::decode(sig).map_err(|_| {
            warn!("Link rejected: signature is not hex");
            LinkError::Tampered
        })?;

        self.mac(&org, exp)?.verify_slice(&expected).map_err(|_| {
            warn!("Link rejected: signature mismatch for organization {:?}", org);
            LinkError::Tampered
        })?;

        let expires_at: i64 = exp.trim().parse().map_err(|_| {
            warn!("Link rejected: expiry {:?} is not an integer", exp);
            LinkError::Malformed
        })?;

        if now > expires_at {
            warn!("Link rejected: expired at {} (now {})", expires_at, now);
            return Err(LinkError::Expired {
                expired_at: expires_at,
            });
        }

        debug!("Signed link accepted for organization {:?}", org);
        Ok(AccessGrant {
            organization: org,
            signed: true,
        })
    }

    fn mac(&self, org: &str, exp: &str) -> Result<HmacSha256, LinkError> {
        let mut mac = <HmacSha256 as KeyInit>::new_from_slice(&self.secret).map_err(|_| {
            warn!("Link secret has an unusable length");
            LinkError::Malformed
        })?;
        mac.update(org.as_bytes());
        mac.update(b"|");
        mac.update(exp.as_bytes());
        Ok(mac)
    }
}

/// Build the `org=..&exp=..&sig=..` query string of a signed link
///
/// `org` is encoded twice: once for the query string itself and once for the
/// extra decoding step `validate` applies to the organization.
pub fn signed_query(validator: &LinkValidator, org: &str, exp: i64) -> Result<String, LinkError> {
    let exp = exp.to_string();
    let once = utf8_percent_encode(org, NON_ALPHANUMERIC).to_string();
    Ok(format!(
        "org={}&exp={}&sig={}",
        utf8_percent_encode(&once, NON_ALPHANUMERIC),
        exp,
        validator.sign(org, &exp)?
    ))
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}
