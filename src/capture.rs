//! RFID credential capture.
//!
//! Badge readers present themselves as keyboards: a tap delivers the badge
//! ID as a burst of keystrokes with no terminator. A credential is complete
//! once enough characters have arrived.

use std::fmt;

use crate::MIN_CREDENTIAL_LEN;

/// An RFID badge identifier.
///
/// Created by [`CredentialCapture`], consumed once by the session that
/// requested it, never persisted. `Debug` and `Display` are masked so the
/// badge ID does not end up in logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wrap a raw badge identifier.
    pub fn new(rfid: impl Into<String>) -> Self {
        Self(rfid.into())
    }

    /// The raw badge identifier, as sent to the backend.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of characters in the badge identifier.
    pub fn len(&self) -> usize {
        self.0.chars().count()
    }

    /// Whether the badge identifier is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Masked form showing only the last 2 characters, e.g. `"********3F"`.
    pub fn masked(&self) -> String {
        let len = self.len();
        let visible = len.min(2);
        let tail: String = self.0.chars().skip(len - visible).collect();
        format!("{}{}", "*".repeat(len - visible), tail)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Credential").field(&self.masked()).finish()
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.masked())
    }
}

/// Accumulates raw reader input into a [`Credential`].
///
/// # Example
///
/// ```
/// use evse_kiosk::CredentialCapture;
///
/// let mut capture = CredentialCapture::new();
/// assert!(capture.push_str("04A1B2").is_none());
///
/// let credential = capture.push_str("C3D4").unwrap();
/// assert_eq!(credential.as_str(), "04A1B2C3D4");
/// assert!(capture.is_empty());
/// ```
#[derive(Clone)]
pub struct CredentialCapture {
    buffer: String,
    chars: usize,
    min_len: usize,
}

impl fmt::Debug for CredentialCapture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialCapture")
            .field("buffered", &self.chars)
            .field("min_len", &self.min_len)
            .finish()
    }
}

impl Default for CredentialCapture {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialCapture {
    /// Create a capture with the standard 10 character threshold.
    pub fn new() -> Self {
        Self::with_min_len(MIN_CREDENTIAL_LEN)
    }

    /// Create a capture with a custom threshold (clamped to at least 1).
    pub fn with_min_len(min_len: usize) -> Self {
        Self {
            buffer: String::new(),
            chars: 0,
            min_len: min_len.max(1),
        }
    }

    /// Characters needed before a credential is emitted.
    pub fn min_len(&self) -> usize {
        self.min_len
    }

    /// Characters buffered so far.
    pub fn buffered(&self) -> usize {
        self.chars
    }

    /// Whether nothing has been buffered.
    pub fn is_empty(&self) -> bool {
        self.chars == 0
    }

    /// Feed one character. Returns the credential once the threshold is reached.
    pub fn push(&mut self, c: char) -> Option<Credential> {
        self.buffer.push(c);
        self.chars += 1;
        self.take_if_complete()
    }

    /// Feed a burst of characters (a paste, or a whole reader burst).
    ///
    /// The whole burst is buffered before the threshold is checked, so a
    /// 14 character paste yields one 14 character credential.
    pub fn push_str(&mut self, input: &str) -> Option<Credential> {
        self.buffer.push_str(input);
        self.chars += input.chars().count();
        self.take_if_complete()
    }

    /// Drop everything buffered.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.chars = 0;
    }

    fn take_if_complete(&mut self) -> Option<Credential> {
        if self.chars < self.min_len {
            return None;
        }
        self.chars = 0;
        Some(Credential(std::mem::take(&mut self.buffer)))
    }
}
