//! Error-text classification.
//!
//! The ledger and HTTP collaborators surface failures as strings, so
//! retryability is decided by content matching. The matching lives behind a
//! trait so deployments whose collaborators expose typed error codes can
//! substitute a structured classifier without touching caller logic.

/// Retryability category of a collaborator error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
	/// The ledger rejected the signature; the next execution strategy may
	/// still succeed.
	InvalidSignature,
	/// A transient network hiccup; safe to retry within a polling budget.
	Transient,
	/// Everything else. Aborts the current operation.
	Fatal,
}

/// Maps collaborator error text onto an [`ErrorClass`].
pub trait ErrorClassifier: Send + Sync {
	fn classify(&self, message: &str) -> ErrorClass;
}

/// Substrings (lowercased) that mark a transient network failure.
const TRANSIENT_MARKERS: [&str; 6] = [
	"timeout",
	"timed out",
	"temporarily unavailable",
	"connection reset",
	"broken pipe",
	"eof",
];

/// Default classifier matching well-known substrings in error text.
#[derive(Debug, Default, Clone, Copy)]
pub struct SubstringClassifier;

impl ErrorClassifier for SubstringClassifier {
	fn classify(&self, message: &str) -> ErrorClass {
		let lower = message.to_ascii_lowercase();
		if lower.contains("invalid_signature") {
			return ErrorClass::InvalidSignature;
		}
		if TRANSIENT_MARKERS.iter().any(|m| lower.contains(m)) {
			return ErrorClass::Transient;
		}
		ErrorClass::Fatal
	}
}
