//! Payload construction for broadcast actions

/// Payload-length boundary below which WebSocket frames use the single-byte
/// length encoding (RFC 6455 §5.2)
pub const SMALL_FRAME_THRESHOLD: usize = 125;

/// Length of the long-text payload; must stay strictly above
/// [`SMALL_FRAME_THRESHOLD`] so the frame takes the extended-length encoding
pub const LONG_TEXT_LEN: usize = 130;

/// Default binary payload size in bytes
pub const DEFAULT_BINARY_LEN: usize = 32;

/// Maximum accepted binary payload size in bytes
pub const MAX_BINARY_LEN: usize = 1 << 20;

/// Build the long-text payload
#[must_use]
pub fn long_text() -> String {
    "X".repeat(LONG_TEXT_LEN)
}

/// Build a deterministic binary payload of `len` bytes
///
/// Content is byte `i % 256` at index `i`; only the size matters.
#[must_use]
pub fn binary(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 256) as u8).collect()
}

/// Resolve a requested binary size against the accepted bounds
///
/// Missing or out-of-range requests fall back to [`DEFAULT_BINARY_LEN`].
#[must_use]
pub fn clamp_binary_len(requested: Option<usize>) -> usize {
    match requested {
        Some(n) if n > 0 && n <= MAX_BINARY_LEN => n,
        _ => DEFAULT_BINARY_LEN,
    }
}
