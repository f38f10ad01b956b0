//! Report signing and verification
//!
//! A signature covers [`Report::canonical_bytes`]. Verification strips the
//! `signature` and `publicKey` fields and re-derives the same canonical
//! bytes, so any change to a signed field is detected.

use crate::error::PlagError;
use crate::report::{canonical_json, Report, SignedReport};
use plag_crypto::{verify_detached, CryptoError, SigningIdentity};
use serde_json::Value;
use tracing::debug;

/// Signs reports with a signing identity
pub struct ReportSigner<'a, I: SigningIdentity> {
    identity: &'a I,
}

impl<'a, I: SigningIdentity> ReportSigner<'a, I> {
    pub fn new(identity: &'a I) -> Self {
        Self { identity }
    }

    pub fn sign(&self, report: Report) -> Result<SignedReport, PlagError> {
        let payload = report.canonical_bytes()?;
        let signature = self.identity.sign_hex(&payload);
        debug!(bytes = payload.len(), "signed report");

        Ok(SignedReport {
            report,
            signature,
            public_key: self.identity.public_key_pem().to_string(),
        })
    }
}

/// Check a typed signed report against its embedded public key
pub fn verify_report(signed: &SignedReport) -> Result<(), PlagError> {
    let payload = signed.report.canonical_bytes()?;
    verify_payload(&signed.public_key, &signed.signature, &payload)
}

/// Check a serialized signed report and return the verified report
pub fn verify_json(json: &str) -> Result<Report, PlagError> {
    let mut value: Value = serde_json::from_str(json)?;
    let object = value
        .as_object_mut()
        .ok_or_else(|| signature_error("signed report must be a JSON object"))?;

    let signature = take_string(object, "signature")?;
    let public_key = take_string(object, "publicKey")?;

    let payload = canonical_json(&value).into_bytes();
    verify_payload(&public_key, &signature, &payload)?;

    Ok(serde_json::from_value(value)?)
}

fn verify_payload(public_key: &str, signature_hex: &str, payload: &[u8]) -> Result<(), PlagError> {
    let signature = hex::decode(signature_hex)
        .map_err(|e| signature_error(&format!("signature is not hex: {}", e)))?;
    verify_detached(public_key, payload, &signature)?;
    Ok(())
}

fn take_string(
    object: &mut serde_json::Map<String, Value>,
    key: &str,
) -> Result<String, PlagError> {
    match object.remove(key) {
        Some(Value::String(s)) => Ok(s),
        Some(_) => Err(signature_error(&format!("`{}` must be a string", key))),
        None => Err(signature_error(&format!("`{}` is missing", key))),
    }
}

fn signature_error(message: &str) -> PlagError {
    PlagError::Crypto(CryptoError::Signature(message.to_string()))
}
