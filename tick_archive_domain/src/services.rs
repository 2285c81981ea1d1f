// /////////////////////////////////////////////////////////////////////////////
// Tick Archive
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Domain Services
//!
//! Stateless (or purely-computational) operations over the value objects:
//! the compression codec registry (C1), the wire partial decoder (C2), and
//! the delta codec (C3).

pub mod codec;
pub mod delta_codec;
pub mod wire;

pub use codec::{Codec, CodecRegistry, GzipCodec, IdentityCodec, ZstdCodec};
pub use delta_codec::{decompress_tick, encode_chunk};
pub use wire::{
    chunk_fields, decode_environment_chunk, decode_full_chunk, encode_chunk_message, tick_data_fields,
    tick_delta_fields, FieldValue, Tag, WireReader, WireType, WireWriter,
};
