//! Result attestation
//!
//! A result's canonical payload is hashed with SHA-256 and the digest-bearing
//! payload is signed with HMAC-SHA256 by a [`SignerTrait`] implementation.
//! The engine only knows the signer's identity name; the key stays with the
//! signer.

use std::sync::Arc;

use hmac::{Hmac, Mac};
use nutriscan_types::{
	constant_time_eq, AnalysisResult, IntegrityPayload, IntegrityProof, SecretString,
};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, warn};

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_ALGORITHM: &str = "HMAC-SHA256";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IntegrityError {
	#[error("Failed to create HMAC: {0}")]
	HmacCreation(String),

	#[error("Signing unavailable: {0}")]
	SigningUnavailable(String),

	#[error("Integrity verification failed")]
	VerificationFailed,
}

#[cfg_attr(test, mockall::automock)]
pub trait SignerTrait: Send + Sync {
	/// Name of the identity whose key this signer holds
	fn signer_id(&self) -> String;

	/// Sign a payload, returning the hex signature
	fn sign_payload(&self, payload: &str) -> Result<String, IntegrityError>;

	/// Check a hex signature against a payload
	fn verify_payload(&self, payload: &str, signature: &str) -> Result<bool, IntegrityError>;
}

/// HMAC-SHA256 signer keyed by a configured secret
pub struct HmacSigner {
	signer_id: String,
	secret_key: SecretString,
}

impl HmacSigner {
	pub fn new(signer_id: impl Into<String>, secret_key: SecretString) -> Self {
		Self {
			signer_id: signer_id.into(),
			secret_key,
		}
	}

	fn mac(&self) -> Result<HmacSha256, IntegrityError> {
		if self.secret_key.is_blank() {
			return Err(IntegrityError::SigningUnavailable(format!(
				"signing key for '{}' is empty",
				self.signer_id
			)));
		}
		HmacSha256::new_from_slice(self.secret_key.expose_secret().as_bytes())
			.map_err(|e| IntegrityError::HmacCreation(e.to_string()))
	}
}

impl SignerTrait for HmacSigner {
	fn signer_id(&self) -> String {
		self.signer_id.clone()
	}

	fn sign_payload(&self, payload: &str) -> Result<String, IntegrityError> {
		let mut mac = self.mac()?;
		mac.update(payload.as_bytes());
		Ok(hex::encode(mac.finalize().into_bytes()))
	}

	fn verify_payload(&self, payload: &str, signature: &str) -> Result<bool, IntegrityError> {
		let expected = self.sign_payload(payload)?;
		Ok(constant_time_eq(expected.as_bytes(), signature.as_bytes()))
	}
}

/// SHA-256 hex digest of a payload
pub fn digest_payload(payload: &str) -> String {
	hex::encode(Sha256::digest(payload.as_bytes()))
}

fn signed_message(digest: &str, payload: &str) -> String {
	format!("digest={}|{}", digest, payload)
}

/// Signs and verifies analysis results
///
/// Without a signer every result stays unsigned, which is the normal state.
#[derive(Clone, Default)]
pub struct IntegritySigner {
	signer: Option<Arc<dyn SignerTrait>>,
}

impl std::fmt::Debug for IntegritySigner {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("IntegritySigner")
			.field("signer_id", &self.signer.as_ref().map(|s| s.signer_id()))
			.finish()
	}
}

impl IntegritySigner {
	pub fn new(signer: Arc<dyn SignerTrait>) -> Self {
		Self {
			signer: Some(signer),
		}
	}

	/// Signer that never signs
	pub fn disabled() -> Self {
		Self::default()
	}

	pub fn is_enabled(&self) -> bool {
		self.signer.is_some()
	}

	pub fn signer_id(&self) -> Option<String> {
		self.signer.as_ref().map(|s| s.signer_id())
	}

	/// Build a proof for `result`
	pub fn sign(&self, result: &AnalysisResult) -> Result<IntegrityProof, IntegrityError> {
		let signer = self.signer.as_ref().ok_or_else(|| {
			IntegrityError::SigningUnavailable("no signing identity configured".to_string())
		})?;

		let payload = result.to_integrity_payload();
		let digest = digest_payload(&payload);
		let signature = signer.sign_payload(&signed_message(&digest, &payload))?;

		Ok(IntegrityProof {
			digest,
			signature,
			signer_id: signer.signer_id(),
			algorithm: SIGNATURE_ALGORITHM.to_string(),
		})
	}

	/// Attach a proof to `result` if possible; failures are logged, not returned
	pub fn attach(&self, result: &mut AnalysisResult) -> bool {
		if !self.is_enabled() {
			return false;
		}
		match self.sign(result) {
			Ok(proof) => {
				debug!(
					"Signed analysis {} as {} (digest {})",
					result.analysis_id, proof.signer_id, proof.digest
				);
				result.integrity = Some(proof);
				true
			},
			Err(e) => {
				warn!(
					"Signing unavailable for analysis {}, returning unsigned result: {}",
					result.analysis_id, e
				);
				result.integrity = None;
				false
			},
		}
	}

	/// Check a result's proof against its content
	///
	/// Unsigned results, a foreign signer id, a digest mismatch or a bad
	/// signature all verify as `false`.
	pub fn verify(&self, result: &AnalysisResult) -> Result<bool, IntegrityError> {
		let proof = match &result.integrity {
			Some(proof) => proof,
			None => return Ok(false),
		};
		let signer = self.signer.as_ref().ok_or_else(|| {
			IntegrityError::SigningUnavailable("no signing identity configured".to_string())
		})?;

		if proof.algorithm != SIGNATURE_ALGORITHM || proof.signer_id != signer.signer_id() {
			return Ok(false);
		}

		let payload = result.to_integrity_payload();
		let digest = digest_payload(&payload);
		if !constant_time_eq(digest.as_bytes(), proof.digest.as_bytes()) {
			return Ok(false);
		}

		signer.verify_payload(&signed_message(&digest, &payload), &proof.signature)
	}

	/// Like [`verify`](Self::verify) but a mismatch is an error
	pub fn ensure_valid(&self, result: &AnalysisResult) -> Result<(), IntegrityError> {
		if self.verify(result)? {
			Ok(())
		} else {
			Err(IntegrityError::VerificationFailed)
		}
	}
}
