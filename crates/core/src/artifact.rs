// Engine output normalization
//
// Engines hand back documents in several shapes. They are collapsed into a
// single `Artifact` at the session boundary; anything that cannot be is an
// engine fault.

use base64::Engine as _;
use bytes::{Bytes, BytesMut};

use crate::error::EngineError;

/// Leading bytes of every PDF document
pub const PDF_SIGNATURE: &[u8] = b"%PDF-";

/// Representations an engine may return for one exported document
#[derive(Debug, Clone, PartialEq)]
pub enum EngineOutput {
    /// Owned buffer
    Bytes(Vec<u8>),
    /// Reference-counted buffer
    Shared(Bytes),
    /// Base64 text, as carried over the DevTools protocol
    Base64(String),
    /// Streamed chunks in order
    Chunks(Vec<Vec<u8>>),
}

/// A rendered document
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    bytes: Bytes,
}

impl Artifact {
    /// Collapse any engine output into one contiguous document
    pub fn normalize(output: EngineOutput) -> Result<Self, EngineError> {
        let bytes = match output {
            EngineOutput::Bytes(buf) => Bytes::from(buf),
            EngineOutput::Shared(buf) => buf,
            EngineOutput::Base64(text) => base64::engine::general_purpose::STANDARD
                .decode(text.trim())
                .map(Bytes::from)
                .map_err(|e| EngineError::malformed(format!("invalid base64: {}", e)))?,
            EngineOutput::Chunks(chunks) => {
                let mut buf = BytesMut::with_capacity(chunks.iter().map(Vec::len).sum());
                for chunk in &chunks {
                    buf.extend_from_slice(chunk);
                }
                buf.freeze()
            }
        };

        if bytes.is_empty() {
            return Err(EngineError::malformed("empty document"));
        }
        if !bytes.starts_with(PDF_SIGNATURE) {
            return Err(EngineError::malformed("missing PDF signature"));
        }

        Ok(Self { bytes })
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Bytes {
        self.bytes
    }
}
