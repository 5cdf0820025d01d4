//! Canonical payloads for integrity attestation

/// Types that can be reduced to a canonical string for digesting and signing
///
/// Two values that are semantically equal must produce the same payload, and
/// any change to a protected field must change it.
pub trait IntegrityPayload {
	fn to_integrity_payload(&self) -> String;
}
