//! CRLF-terminated JSON line framing.
//!
//! Used by the controller and camera-recorder links: one JSON object per
//! line, terminated `\r\n`. Receiving is byte-at-a-time against a
//! fixed-capacity accumulator; a line is only complete once the `\n`
//! arrives, and the trailing CR/LF is stripped with explicit bounds checks
//! so a degenerate short frame cannot underflow.

use serde::Serialize;
use serde_json::Value;

use crate::error::FormatError;

/// Receive buffer capacity for one logical line.
pub const LINE_BUFFER_SIZE: usize = 8192;

/// Byte-at-a-time line assembly.
///
/// Feed every received byte through [`LineAccumulator::push`]; a completed
/// logical line (terminator stripped) is handed back once per `\n`. An
/// overlong line is reported at its terminator and the accumulator
/// resynchronizes on the following byte.
#[derive(Debug, Default)]
pub struct LineAccumulator {
    buf: Vec<u8>,
    overflowed: bool,
}

impl LineAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume one byte. Returns `Ok(Some(line))` when `byte` completed a
    /// line, `Ok(None)` while a line is still being assembled.
    pub fn push(&mut self, byte: u8) -> Result<Option<Vec<u8>>, FormatError> {
        if byte == b'\n' {
            if self.overflowed {
                self.overflowed = false;
                self.buf.clear();
                return Err(FormatError::LineOverflow {
                    max: LINE_BUFFER_SIZE,
                });
            }
            let mut line = std::mem::take(&mut self.buf);
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            return Ok(Some(line));
        }
        if self.overflowed {
            return Ok(None);
        }
        if self.buf.len() >= LINE_BUFFER_SIZE {
            self.overflowed = true;
            return Ok(None);
        }
        self.buf.push(byte);
        Ok(None)
    }

    /// Drop any partially assembled line (used after a reconnect, where the
    /// stream restarts mid-frame).
    pub fn clear(&mut self) {
        self.buf.clear();
        self.overflowed = false;
    }
}

/// One classified inbound control line.
///
/// Member precedence mirrors the controller protocol: a `CMD` with both
/// `Value` and `Type` is the three-argument form, `CMD` + `Value` the
/// two-argument form, a bare `CMD` the zero-argument form. A `STATUS`
/// member alone is the heartbeat poll. Anything else is well-formed JSON
/// that dispatch ignores.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundLine {
    Command { cmd: String },
    ValueCommand { cmd: String, value: f64 },
    TypedCommand { cmd: String, value: i64, ty: i64 },
    Status,
    Unrecognized,
}

/// Parse and classify one logical line.
pub fn classify(line: &[u8]) -> Result<InboundLine, FormatError> {
    let doc: Value = serde_json::from_slice(line)?;
    let obj = doc
        .as_object()
        .ok_or(FormatError::WrongValueType { member: "document" })?;

    let cmd = match obj.get("CMD") {
        Some(v) => Some(
            v.as_str()
                .ok_or(FormatError::WrongValueType { member: "CMD" })?
                .to_owned(),
        ),
        None => None,
    };

    if let Some(cmd) = cmd {
        if let (Some(value), Some(ty)) = (obj.get("Value"), obj.get("Type")) {
            let value = value
                .as_i64()
                .ok_or(FormatError::WrongValueType { member: "Value" })?;
            let ty = ty
                .as_i64()
                .ok_or(FormatError::WrongValueType { member: "Type" })?;
            return Ok(InboundLine::TypedCommand { cmd, value, ty });
        }
        if let Some(value) = obj.get("Value") {
            let value = if let Some(i) = value.as_i64() {
                i as f64
            } else if value.is_f64() {
                // as_f64 only fails on non-numbers, checked above
                value.as_f64().unwrap_or_default()
            } else {
                return Err(FormatError::WrongValueType { member: "Value" });
            };
            return Ok(InboundLine::ValueCommand { cmd, value });
        }
        return Ok(InboundLine::Command { cmd });
    }
    if obj.contains_key("STATUS") {
        return Ok(InboundLine::Status);
    }
    Ok(InboundLine::Unrecognized)
}

/// Serialize one value as a CRLF-terminated JSON line.
pub fn encode_line<T: Serialize>(value: &T) -> Result<Vec<u8>, FormatError> {
    let mut out = serde_json::to_vec(value)?;
    out.extend_from_slice(b"\r\n");
    Ok(out)
}
