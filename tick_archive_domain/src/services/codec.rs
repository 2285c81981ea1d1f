// /////////////////////////////////////////////////////////////////////////////
// Tick Archive
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Compression Codec Registry (C1)
//!
//! Stream-wrapping encoders/decoders with magic-byte auto-detection.
//!
//! ## Overview
//!
//! Selection on write is driven by configuration; selection on read is
//! driven by magic-byte detection on the first bytes of a blob. If no
//! registered codec's magic matches, the reader falls back to `identity`.
//!
//! Each codec's output wrapper must flush and close its framing when the
//! scoped writer exits, so the produced bytes are decodable without further
//! context — `wrap_output` therefore returns an owned boxed writer whose
//! `Drop`/explicit `finish` the caller is responsible for invoking before
//! reading the underlying buffer back.

use std::io::{self, Read, Write};

/// A registered compression codec.
///
/// Implementations must preserve stream semantics: no length-prefixing layer
/// is added above the codec's own framing, since the partial decoder (C2)
/// reads directly from the unwrapped stream.
pub trait Codec: Send + Sync {
    fn name(&self) -> &'static str;
    fn file_extension(&self) -> &'static str;
    /// The bytes a blob produced by this codec always starts with. `None`
    /// for the identity codec, which has no magic and is the detection
    /// fallback.
    fn magic_bytes_prefix(&self) -> Option<&'static [u8]>;

    /// Wraps a sink so that writes through the returned writer are encoded.
    /// The caller must call `.finish()`/flush the returned boxed writer (or
    /// let it drop after an explicit flush) so the framing is closed before
    /// the underlying bytes are persisted.
    fn wrap_output<'a>(&self, sink: Box<dyn Write + 'a>) -> Box<dyn Write + 'a>;

    /// Wraps a source so that reads through the returned reader are decoded.
    fn wrap_input<'a>(&self, source: Box<dyn Read + 'a>) -> Box<dyn Read + 'a>;
}

/// No-op codec: bytes pass through unchanged. The detection fallback when no
/// registered codec's magic prefix matches.
pub struct IdentityCodec;

impl Codec for IdentityCodec {
    fn name(&self) -> &'static str {
        "identity"
    }
    fn file_extension(&self) -> &'static str {
        ""
    }
    fn magic_bytes_prefix(&self) -> Option<&'static [u8]> {
        None
    }
    fn wrap_output<'a>(&self, sink: Box<dyn Write + 'a>) -> Box<dyn Write + 'a> {
        sink
    }
    fn wrap_input<'a>(&self, source: Box<dyn Read + 'a>) -> Box<dyn Read + 'a> {
        source
    }
}

/// Zstandard frames start with this four-byte magic number.
const ZSTD_MAGIC: [u8; 4] = [0x28, 0xB5, 0x2F, 0xFD];

pub struct ZstdCodec {
    level: i32,
}

impl ZstdCodec {
    pub fn new(level: i32) -> Self {
        Self { level }
    }
}

impl Codec for ZstdCodec {
    fn name(&self) -> &'static str {
        "zstd"
    }
    fn file_extension(&self) -> &'static str {
        "zst"
    }
    fn magic_bytes_prefix(&self) -> Option<&'static [u8]> {
        Some(&ZSTD_MAGIC)
    }
    fn wrap_output<'a>(&self, sink: Box<dyn Write + 'a>) -> Box<dyn Write + 'a> {
        // auto_finish ensures the frame is closed when the encoder drops,
        // even if the caller forgets to call finish() explicitly.
        Box::new(zstd::Encoder::new(sink, self.level).expect("zstd encoder init").auto_finish())
    }
    fn wrap_input<'a>(&self, source: Box<dyn Read + 'a>) -> Box<dyn Read + 'a> {
        Box::new(zstd::Decoder::new(source).expect("zstd decoder init"))
    }
}

/// Gzip frames start with this two-byte magic number.
const GZIP_MAGIC: [u8; 2] = [0x1F, 0x8B];

pub struct GzipCodec {
    level: flate2::Compression,
}

impl GzipCodec {
    pub fn new(level: u32) -> Self {
        Self {
            level: flate2::Compression::new(level),
        }
    }
}

impl Codec for GzipCodec {
    fn name(&self) -> &'static str {
        "gzip"
    }
    fn file_extension(&self) -> &'static str {
        "gz"
    }
    fn magic_bytes_prefix(&self) -> Option<&'static [u8]> {
        Some(&GZIP_MAGIC)
    }
    fn wrap_output<'a>(&self, sink: Box<dyn Write + 'a>) -> Box<dyn Write + 'a> {
        Box::new(flate2::write::GzEncoder::new(sink, self.level))
    }
    fn wrap_input<'a>(&self, source: Box<dyn Read + 'a>) -> Box<dyn Read + 'a> {
        Box::new(flate2::read::GzDecoder::new(source))
    }
}

/// A registry of codecs, selected by name on write and by magic-byte
/// detection on read.
pub struct CodecRegistry {
    codecs: Vec<Box<dyn Codec>>,
}

impl CodecRegistry {
    /// The registry used everywhere in this crate: identity, zstd, gzip.
    pub fn standard(zstd_level: i32, gzip_level: u32) -> Self {
        Self {
            codecs: vec![
                Box::new(ZstdCodec::new(zstd_level)),
                Box::new(GzipCodec::new(gzip_level)),
                Box::new(IdentityCodec),
            ],
        }
    }

    pub fn by_name(&self, name: &str) -> Option<&dyn Codec> {
        self.codecs.iter().find(|c| c.name() == name).map(|c| c.as_ref())
    }

    /// Detects the codec whose magic prefix matches the start of `blob`.
    /// Examines only bytes guaranteed present in a non-empty blob; falls
    /// back to identity for an empty blob or no match.
    pub fn detect<'a>(&'a self, blob: &[u8]) -> &'a dyn Codec {
        for codec in &self.codecs {
            if let Some(prefix) = codec.magic_bytes_prefix() {
                if blob.len() >= prefix.len() && &blob[..prefix.len()] == prefix {
                    return codec.as_ref();
                }
            }
        }
        self.codecs
            .iter()
            .find(|c| c.magic_bytes_prefix().is_none())
            .map(|c| c.as_ref())
            .expect("identity codec always registered")
    }

    /// Compresses `data` through the named codec, flushing its framing
    /// before returning the bytes.
    pub fn compress(&self, name: &str, data: &[u8]) -> io::Result<Vec<u8>> {
        let codec = self
            .by_name(name)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, format!("unknown codec {name}")))?;
        let mut output = Vec::new();
        {
            let mut writer = codec.wrap_output(Box::new(&mut output));
            writer.write_all(data)?;
            writer.flush()?;
        }
        Ok(output)
    }

    /// Decompresses `blob` using magic-byte detection.
    pub fn decompress(&self, blob: &[u8]) -> io::Result<Vec<u8>> {
        let codec = self.detect(blob);
        let mut reader = codec.wrap_input(Box::new(blob));
        let mut output = Vec::new();
        reader.read_to_end(&mut output)?;
        Ok(output)
    }
}
