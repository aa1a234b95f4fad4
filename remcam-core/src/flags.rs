//! Envelope flag word.

use bitflags::bitflags;

bitflags! {
    /// Flags carried in the envelope header.
    ///
    /// Only bit 0 is currently assigned; unknown bits are tolerated on
    /// decode so newer peers can extend the word.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct EnvelopeFlags: u64 {
        /// The header's session-id field is populated.
        const HAS_SESSION = 1 << 0;
    }
}

impl EnvelopeFlags {
    /// Returns `true` if the envelope carries a session identifier.
    pub fn has_session(&self) -> bool {
        self.contains(EnvelopeFlags::HAS_SESSION)
    }
}
