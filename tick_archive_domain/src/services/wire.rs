// /////////////////////////////////////////////////////////////////////////////
// Tick Archive
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Wire Partial Decoder (C2)
//!
//! A tag/field-number TLV stream reader that can skip fields without
//! materializing them, so a reader that only wants `cell_columns` never pays
//! to decode `organisms`, `rng_state`, `plugin_states`, or `genome_hashes`.
//!
//! Unlike a decoder built around a fixed, known field set, this reader walks
//! an arbitrary field layout and decides per tag, via an accept set, whether
//! to parse the value or skip its bytes outright.

use crate::error::{ArchiveError, DecodeErrorKind};
use std::collections::HashSet;
use std::io::Read;

/// Frozen field numbers for the chunk message shape.
pub mod chunk_fields {
    pub const SIMULATION_RUN_ID: u32 = 1;
    pub const FIRST_TICK: u32 = 2;
    pub const LAST_TICK: u32 = 3;
    pub const TICK_COUNT: u32 = 4;
    pub const SNAPSHOT: u32 = 5;
    pub const DELTAS: u32 = 6;
}

/// Frozen field numbers for the tick-data message shape.
pub mod tick_data_fields {
    pub const SIMULATION_RUN_ID: u32 = 1;
    pub const TICK_NUMBER: u32 = 2;
    pub const CAPTURE_TIME_MS: u32 = 3;
    pub const ORGANISMS: u32 = 4;
    pub const CELL_COLUMNS: u32 = 5;
    pub const RNG_STATE: u32 = 6;
    pub const PLUGIN_STATES: u32 = 7;
    pub const TOTAL_ORGANISMS_CREATED: u32 = 8;
    pub const TOTAL_UNIQUE_GENOMES: u32 = 9;
    pub const GENOME_HASHES: u32 = 10;
}

/// Frozen field numbers for the tick-delta message shape.
pub mod tick_delta_fields {
    pub const TICK_NUMBER: u32 = 1;
    pub const CAPTURE_TIME_MS: u32 = 2;
    pub const DELTA_TYPE: u32 = 3;
    pub const CHANGED_CELLS: u32 = 4;
    pub const ORGANISMS: u32 = 5;
    pub const TOTAL_ORGANISMS_CREATED: u32 = 6;
    pub const RNG_STATE: u32 = 7;
    pub const PLUGIN_STATES: u32 = 8;
    pub const TOTAL_UNIQUE_GENOMES: u32 = 9;
}

/// The wire type carried alongside a field number in every tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireType {
    /// A `u64`, stored as an 8-byte little-endian value.
    Fixed64,
    /// A length-delimited byte string or nested sub-message.
    LengthDelimited,
}

impl WireType {
    fn from_byte(b: u8) -> Result<Self, ArchiveError> {
        match b {
            0 => Ok(WireType::Fixed64),
            1 => Ok(WireType::LengthDelimited),
            _ => Err(ArchiveError::DecodeError {
                kind: DecodeErrorKind::InvalidTag,
            }),
        }
    }
}

/// A decoded tag: which field this record belongs to and how its value is
/// framed on the wire.
#[derive(Debug, Clone, Copy)]
pub struct Tag {
    pub field_number: u32,
    pub wire_type: WireType,
}

/// One field value read off the wire, typed loosely enough to cover both
/// accepted and materialized fields.
#[derive(Debug, Clone)]
pub enum FieldValue {
    Fixed64(u64),
    Bytes(Vec<u8>),
}

/// Reads a tag/field-number TLV stream, honoring an accept-set/skip-set split
/// so skipped fields — including nested length-delimited sub-messages — are
/// never materialized.
///
/// `max_nesting_depth` bounds recursive `push_limit` calls so a maliciously
/// or corruptly deep nested structure cannot blow the stack; exceeding it is
/// reported as [`DecodeErrorKind::NestedOverflow`].
pub struct WireReader<R: Read> {
    inner: R,
    /// Stack of remaining-byte limits for nested length-delimited scopes.
    limits: Vec<u64>,
    max_nesting_depth: usize,
}

impl<R: Read> WireReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            limits: Vec::new(),
            max_nesting_depth: 64,
        }
    }

    fn remaining_in_scope(&self) -> Option<u64> {
        self.limits.last().copied()
    }

    fn consumed(&mut self, n: u64) -> Result<(), ArchiveError> {
        if let Some(limit) = self.limits.last_mut() {
            if n > *limit {
                return Err(ArchiveError::DecodeError {
                    kind: DecodeErrorKind::NestedOverflow,
                });
            }
            *limit -= n;
        }
        Ok(())
    }

    fn read_exact_tracked(&mut self, buf: &mut [u8]) -> Result<(), ArchiveError> {
        self.inner.read_exact(buf).map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                ArchiveError::DecodeError {
                    kind: DecodeErrorKind::Truncated,
                }
            } else {
                ArchiveError::IoError(e.to_string())
            }
        })?;
        self.consumed(buf.len() as u64)?;
        Ok(())
    }

    /// Reads the next tag, or returns `Ok(None)` at a clean end-of-stream (no
    /// bytes available and no nested scope pending).
    ///
    /// Tag framing: one byte wire-type discriminant (`0` = fixed64, `1` =
    /// length-delimited) followed by the field number as a little-endian
    /// `u32`.
    pub fn read_tag(&mut self) -> Result<Option<Tag>, ArchiveError> {
        if let Some(0) = self.remaining_in_scope() {
            return Ok(None);
        }
        let mut wire_type_byte = [0u8; 1];
        match self.inner.read(&mut wire_type_byte) {
            Ok(0) => return Ok(None),
            Ok(_) => {}
            Err(e) => return Err(ArchiveError::IoError(e.to_string())),
        }
        self.consumed(1)?;
        let wire_type = WireType::from_byte(wire_type_byte[0])?;
        let mut field_bytes = [0u8; 4];
        self.read_exact_tracked(&mut field_bytes)?;
        let field_number = u32::from_le_bytes(field_bytes);
        Ok(Some(Tag {
            field_number,
            wire_type,
        }))
    }

    /// Reads a `Fixed64` value. Caller must have just read a tag with
    /// `wire_type == WireType::Fixed64`.
    pub fn read_fixed64(&mut self) -> Result<u64, ArchiveError> {
        let mut buf = [0u8; 8];
        self.read_exact_tracked(&mut buf)?;
        Ok(u64::from_le_bytes(buf))
    }

    /// Reads a length-delimited value's length prefix and returns the raw
    /// bytes. Caller must have just read a tag with
    /// `wire_type == WireType::LengthDelimited`.
    pub fn read_bytes(&mut self) -> Result<Vec<u8>, ArchiveError> {
        let mut len_buf = [0u8; 8];
        self.read_exact_tracked(&mut len_buf)?;
        let len = u64::from_le_bytes(len_buf);
        let mut buf = vec![0u8; len as usize];
        self.read_exact_tracked(&mut buf)?;
        Ok(buf)
    }

    /// Skips a length-delimited value without materializing it, descending
    /// into nested sub-messages only as far as needed to advance the outer
    /// cursor past the declared length.
    pub fn skip_length_delimited(&mut self) -> Result<(), ArchiveError> {
        if self.limits.len() >= self.max_nesting_depth {
            return Err(ArchiveError::DecodeError {
                kind: DecodeErrorKind::NestedOverflow,
            });
        }
        let mut len_buf = [0u8; 8];
        self.read_exact_tracked(&mut len_buf)?;
        let len = u64::from_le_bytes(len_buf);
        let mut remaining = len;
        let mut scratch = [0u8; 4096];
        while remaining > 0 {
            let chunk = remaining.min(scratch.len() as u64) as usize;
            self.read_exact_tracked(&mut scratch[..chunk])?;
            remaining -= chunk as u64;
        }
        Ok(())
    }

    /// Reads a value according to `wire_type`, returning it only if
    /// `field_number` is in `accept`; otherwise skips it without
    /// materialization. Fields in neither set are treated as skip.
    pub fn read_or_skip(
        &mut self,
        tag: Tag,
        accept: &HashSet<u32>,
    ) -> Result<Option<FieldValue>, ArchiveError> {
        if accept.contains(&tag.field_number) {
            match tag.wire_type {
                WireType::Fixed64 => Ok(Some(FieldValue::Fixed64(self.read_fixed64()?))),
                WireType::LengthDelimited => Ok(Some(FieldValue::Bytes(self.read_bytes()?))),
            }
        } else {
            match tag.wire_type {
                WireType::Fixed64 => {
                    self.read_fixed64()?;
                }
                WireType::LengthDelimited => {
                    self.skip_length_delimited()?;
                }
            }
            Ok(None)
        }
    }
}

/// Appends a tag/value pair to `buf` in the same framing [`WireReader`]
/// consumes: one wire-type byte, the field number as little-endian `u32`,
/// then the value.
pub struct WireWriter<'a> {
    buf: &'a mut Vec<u8>,
}

impl<'a> WireWriter<'a> {
    pub fn new(buf: &'a mut Vec<u8>) -> Self {
        Self { buf }
    }

    pub fn write_fixed64(&mut self, field_number: u32, value: u64) {
        self.buf.push(0);
        self.buf.extend_from_slice(&field_number.to_le_bytes());
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_bytes(&mut self, field_number: u32, value: &[u8]) {
        self.buf.push(1);
        self.buf.extend_from_slice(&field_number.to_le_bytes());
        self.buf.extend_from_slice(&(value.len() as u64).to_le_bytes());
        self.buf.extend_from_slice(value);
    }
}

/// Encodes a single sampled/reconstructed tick's fields as a standalone
/// length-delimited message body: the environment-relevant fields
/// (`tick_number`, `capture_time_ms`, `cell_columns`,
/// `total_organisms_created`, `total_unique_genomes`) plus the heavy
/// `organisms` sub-field. `cell_field` selects whether the cell grid is
/// written under the `cell_columns` (tick-data) or `changed_cells`
/// (tick-delta) field number, since the two message shapes share the same
/// remaining field numbers but name that one field differently.
///
/// `organisms` is serialized as one opaque length-delimited blob (JSON) per
/// the wire format's license to frame any inner byte layout for fields the
/// environment accept set never materializes — the partial decoder only
/// ever needs this sub-field's outer length to skip it, never its
/// contents. Omitted entirely when `organisms` is empty, so an
/// organism-free tick (or a chunk built without C5 data) costs nothing
/// extra on the wire.
#[allow(clippy::too_many_arguments)]
fn encode_tick_environment_fields(
    buf: &mut Vec<u8>,
    tick_number: u64,
    capture_time_ms: i64,
    cell_grid_field: u32,
    cell_grid: &crate::value_objects::CellGrid,
    organisms_field: u32,
    organisms: &[crate::value_objects::OrganismState],
    total_organisms_created: u64,
    total_unique_genomes: u64,
    tick_number_field: u32,
    capture_time_field: u32,
    total_created_field: u32,
    total_genomes_field: u32,
) {
    let mut writer = WireWriter::new(buf);
    writer.write_fixed64(tick_number_field, tick_number);
    writer.write_fixed64(capture_time_field, capture_time_ms as u64);
    writer.write_bytes(cell_grid_field, &cell_grid.to_wire_bytes());
    if !organisms.is_empty() {
        let encoded = serde_json::to_vec(organisms).expect("organism state is JSON-serializable");
        writer.write_bytes(organisms_field, &encoded);
    }
    writer.write_fixed64(total_created_field, total_organisms_created);
    writer.write_fixed64(total_genomes_field, total_unique_genomes);
}

/// Serializes a [`crate::value_objects::TickDataChunk`] to the wire format
/// this crate persists on disk (before compression): the chunk's own
/// header fields plus nested, length-delimited `snapshot` and `deltas`
/// sub-messages, each carrying its tick's `organisms` list alongside the
/// cell grid. The environment chunk store (C4) redundantly carries
/// organism state the organism archive (C5) also indexes — matching the
/// delta codec contract in §4.3, which folds "the full updated organism
/// list" into every delta — but [`decode_environment_chunk`] skips that
/// sub-field at the wire level on every read, so the redundancy costs
/// bytes on disk, never allocation on the read hot path.
pub fn encode_chunk_message(chunk: &crate::value_objects::TickDataChunk) -> Vec<u8> {
    use chunk_fields as cf;
    use tick_data_fields as tdf;
    use tick_delta_fields as tlf;

    let mut out = Vec::new();
    {
        let mut writer = WireWriter::new(&mut out);
        writer.write_fixed64(cf::FIRST_TICK, chunk.first_tick);
        writer.write_fixed64(cf::LAST_TICK, chunk.last_tick);
        writer.write_fixed64(cf::TICK_COUNT, chunk.tick_count as u64);
    }

    let mut snapshot_body = Vec::new();
    encode_tick_environment_fields(
        &mut snapshot_body,
        chunk.snapshot.tick_number,
        chunk.snapshot.capture_time_ms,
        tdf::CELL_COLUMNS,
        &chunk.snapshot.cell_grid,
        tdf::ORGANISMS,
        &chunk.snapshot.organisms,
        chunk.snapshot.total_organisms_created,
        chunk.snapshot.total_unique_genomes,
        tdf::TICK_NUMBER,
        tdf::CAPTURE_TIME_MS,
        tdf::TOTAL_ORGANISMS_CREATED,
        tdf::TOTAL_UNIQUE_GENOMES,
    );
    WireWriter::new(&mut out).write_bytes(cf::SNAPSHOT, &snapshot_body);

    for delta in &chunk.deltas {
        let mut delta_body = Vec::new();
        encode_tick_environment_fields(
            &mut delta_body,
            delta.tick_number,
            delta.capture_time_ms,
            tlf::CHANGED_CELLS,
            &delta.changed_cells,
            tlf::ORGANISMS,
            &delta.organisms,
            delta.total_organisms_created,
            delta.total_unique_genomes,
            tlf::TICK_NUMBER,
            tlf::CAPTURE_TIME_MS,
            tlf::TOTAL_ORGANISMS_CREATED,
            tlf::TOTAL_UNIQUE_GENOMES,
        );
        let delta_type_code: u64 = match delta.delta_type {
            crate::value_objects::DeltaType::Full => 0,
            crate::value_objects::DeltaType::Sparse => 1,
        };
        WireWriter::new(&mut delta_body).write_fixed64(tlf::DELTA_TYPE, delta_type_code);
        WireWriter::new(&mut out).write_bytes(cf::DELTAS, &delta_body);
    }
    out
}

/// Partially decodes a wire-encoded chunk using the environment accept set:
/// `{first_tick, last_tick, tick_count, snapshot, deltas}` at the chunk
/// level, and `{tick_number, capture_time_ms, cell_columns/changed_cells,
/// total_organisms_created, total_unique_genomes}` within each nested
/// message. `organisms`, `rng_state`, `plugin_states`, and `genome_hashes`
/// are never in the accept set, so the decoder skips them at the wire
/// level without allocating.
///
/// Delta type is always reported as [`crate::value_objects::DeltaType::Sparse`]
/// on this path, since the wire format does not carry `delta_type` in the
/// environment accept set and a pure environment read never needs to
/// distinguish it from `Full` (both are replayed the same way by
/// [`crate::value_objects::CellGrid::apply_changes`]).
pub fn decode_environment_chunk(bytes: &[u8]) -> Result<crate::value_objects::TickDataChunk, ArchiveError> {
    decode_chunk_message(bytes, false)
}

/// Fully decodes a wire-encoded chunk, materializing the `organisms`
/// sub-field alongside the environment fields. Used by the round-trip test
/// suite (§8) and by any reader that genuinely needs the redundant
/// per-delta organism list rather than querying the organism archive (C5).
pub fn decode_full_chunk(bytes: &[u8]) -> Result<crate::value_objects::TickDataChunk, ArchiveError> {
    decode_chunk_message(bytes, true)
}

fn decode_chunk_message(bytes: &[u8], materialize_organisms: bool) -> Result<crate::value_objects::TickDataChunk, ArchiveError> {
    use crate::value_objects::{DeltaType, TickData, TickDelta};
    use chunk_fields as cf;

    let accept: HashSet<u32> = [cf::FIRST_TICK, cf::LAST_TICK, cf::TICK_COUNT, cf::SNAPSHOT, cf::DELTAS]
        .into_iter()
        .collect();

    let mut reader = WireReader::new(bytes);
    let mut first_tick = None;
    let mut last_tick = None;
    let mut tick_count = None;
    let mut snapshot = None;
    let mut deltas = Vec::new();

    while let Some(tag) = reader.read_tag()? {
        match reader.read_or_skip(tag, &accept)? {
            Some(FieldValue::Fixed64(v)) if tag.field_number == cf::FIRST_TICK => first_tick = Some(v),
            Some(FieldValue::Fixed64(v)) if tag.field_number == cf::LAST_TICK => last_tick = Some(v),
            Some(FieldValue::Fixed64(v)) if tag.field_number == cf::TICK_COUNT => tick_count = Some(v as u32),
            Some(FieldValue::Bytes(body)) if tag.field_number == cf::SNAPSHOT => {
                snapshot = Some(decode_tick_data(&body, materialize_organisms)?);
            }
            Some(FieldValue::Bytes(body)) if tag.field_number == cf::DELTAS => {
                let fields = decode_tick_environment_fields(
                    &body,
                    tick_delta_fields::TICK_NUMBER,
                    tick_delta_fields::CAPTURE_TIME_MS,
                    tick_delta_fields::CHANGED_CELLS,
                    tick_delta_fields::ORGANISMS,
                    tick_delta_fields::TOTAL_ORGANISMS_CREATED,
                    tick_delta_fields::TOTAL_UNIQUE_GENOMES,
                    materialize_organisms,
                )?;
                // `delta_type` sits outside the environment accept set (§4.4
                // names only the tick-data field shape for the nested
                // message), so a pure environment decode always reports
                // `Sparse` — both variants replay identically through
                // `CellGrid::apply_changes`. Full decode recovers the true
                // tag so round-tripped chunks compare equal field-by-field.
                let delta_type = if materialize_organisms {
                    decode_delta_type(&body)?
                } else {
                    DeltaType::Sparse
                };
                deltas.push(TickDelta {
                    tick_number: fields.tick_number,
                    capture_time_ms: fields.capture_time_ms,
                    delta_type,
                    changed_cells: fields.cell_grid,
                    organisms: fields.organisms,
                    total_organisms_created: fields.total_organisms_created,
                    total_unique_genomes: fields.total_unique_genomes,
                });
            }
            _ => {}
        }
    }

    let first_tick = first_tick.ok_or(ArchiveError::DecodeError {
        kind: DecodeErrorKind::Truncated,
    })?;
    let last_tick = last_tick.ok_or(ArchiveError::DecodeError {
        kind: DecodeErrorKind::Truncated,
    })?;
    let tick_count = tick_count.ok_or(ArchiveError::DecodeError {
        kind: DecodeErrorKind::Truncated,
    })?;
    let snapshot = snapshot.ok_or(ArchiveError::DecodeError {
        kind: DecodeErrorKind::Truncated,
    })?;

    Ok(crate::value_objects::TickDataChunk {
        first_tick,
        last_tick,
        tick_count,
        snapshot: TickData {
            tick_number: snapshot.tick_number,
            capture_time_ms: snapshot.capture_time_ms,
            cell_grid: snapshot.cell_grid,
            organisms: snapshot.organisms,
            total_organisms_created: snapshot.total_organisms_created,
            total_unique_genomes: snapshot.total_unique_genomes,
        },
        deltas,
    })
}

/// Scans a tick-delta sub-message body for its `delta_type` tag, skipping
/// every other field. Kept as a separate pass rather than folded into
/// [`decode_tick_environment_fields`] since `delta_type` has no analog in
/// the tick-data message shape.
fn decode_delta_type(body: &[u8]) -> Result<crate::value_objects::DeltaType, ArchiveError> {
    use crate::value_objects::DeltaType;

    let accept: HashSet<u32> = [tick_delta_fields::DELTA_TYPE].into_iter().collect();
    let mut reader = WireReader::new(body);
    let mut delta_type = DeltaType::Sparse;
    while let Some(tag) = reader.read_tag()? {
        if let Some(FieldValue::Fixed64(v)) = reader.read_or_skip(tag, &accept)? {
            if tag.field_number == tick_delta_fields::DELTA_TYPE {
                delta_type = if v == 0 { DeltaType::Full } else { DeltaType::Sparse };
            }
        }
    }
    Ok(delta_type)
}

/// The environment-plus-organisms fields decoded out of one tick-data or
/// tick-delta sub-message body. `organisms` is empty whenever the caller
/// did not request materialization, or the source tick carried none.
struct DecodedTickFields {
    tick_number: u64,
    capture_time_ms: i64,
    cell_grid: crate::value_objects::CellGrid,
    organisms: Vec<crate::value_objects::OrganismState>,
    total_organisms_created: u64,
    total_unique_genomes: u64,
}

fn decode_tick_data(body: &[u8], materialize_organisms: bool) -> Result<DecodedTickFields, ArchiveError> {
    decode_tick_environment_fields(
        body,
        tick_data_fields::TICK_NUMBER,
        tick_data_fields::CAPTURE_TIME_MS,
        tick_data_fields::CELL_COLUMNS,
        tick_data_fields::ORGANISMS,
        tick_data_fields::TOTAL_ORGANISMS_CREATED,
        tick_data_fields::TOTAL_UNIQUE_GENOMES,
        materialize_organisms,
    )
}

#[allow(clippy::too_many_arguments)]
fn decode_tick_environment_fields(
    body: &[u8],
    tick_number_field: u32,
    capture_time_field: u32,
    cell_grid_field: u32,
    organisms_field: u32,
    total_created_field: u32,
    total_genomes_field: u32,
    materialize_organisms: bool,
) -> Result<DecodedTickFields, ArchiveError> {
    use crate::value_objects::CellGrid;

    let mut accept: HashSet<u32> =
        [tick_number_field, capture_time_field, cell_grid_field, total_created_field, total_genomes_field]
            .into_iter()
            .collect();
    if materialize_organisms {
        accept.insert(organisms_field);
    }
    let mut reader = WireReader::new(body);
    let mut tick_number = None;
    let mut capture_time_ms = None;
    let mut cell_grid = None;
    let mut organisms = Vec::new();
    let mut total_created = 0u64;
    let mut total_genomes = 0u64;

    while let Some(tag) = reader.read_tag()? {
        match reader.read_or_skip(tag, &accept)? {
            Some(FieldValue::Fixed64(v)) if tag.field_number == tick_number_field => tick_number = Some(v),
            Some(FieldValue::Fixed64(v)) if tag.field_number == capture_time_field => {
                capture_time_ms = Some(v as i64)
            }
            Some(FieldValue::Bytes(b)) if tag.field_number == cell_grid_field => {
                cell_grid = Some(
                    CellGrid::from_wire_bytes(&b).map_err(|_| ArchiveError::DecodeError {
                        kind: DecodeErrorKind::Truncated,
                    })?,
                );
            }
            Some(FieldValue::Bytes(b)) if tag.field_number == organisms_field => {
                organisms = serde_json::from_slice(&b).map_err(|_| ArchiveError::DecodeError {
                    kind: DecodeErrorKind::Truncated,
                })?;
            }
            Some(FieldValue::Fixed64(v)) if tag.field_number == total_created_field => total_created = v,
            Some(FieldValue::Fixed64(v)) if tag.field_number == total_genomes_field => total_genomes = v,
            _ => {}
        }
    }

    let tick_number = tick_number.ok_or(ArchiveError::DecodeError {
        kind: DecodeErrorKind::Truncated,
    })?;
    let capture_time_ms = capture_time_ms.ok_or(ArchiveError::DecodeError {
        kind: DecodeErrorKind::Truncated,
    })?;
    let cell_grid = cell_grid.ok_or(ArchiveError::DecodeError {
        kind: DecodeErrorKind::Truncated,
    })?;
    Ok(DecodedTickFields {
        tick_number,
        capture_time_ms,
        cell_grid,
        organisms,
        total_organisms_created: total_created,
        total_unique_genomes: total_genomes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_tag(buf: &mut Vec<u8>, field_number: u32, wire_type: u8) {
        buf.push(wire_type);
        buf.extend_from_slice(&field_number.to_le_bytes());
    }

    fn encode_fixed64(buf: &mut Vec<u8>, field_number: u32, value: u64) {
        encode_tag(buf, field_number, 0);
        buf.extend_from_slice(&value.to_le_bytes());
    }

    fn encode_bytes(buf: &mut Vec<u8>, field_number: u32, data: &[u8]) {
        encode_tag(buf, field_number, 1);
        buf.extend_from_slice(&(data.len() as u64).to_le_bytes());
        buf.extend_from_slice(data);
    }

    #[test]
    fn accept_set_materializes_only_requested_fields() {
        let mut raw = Vec::new();
        encode_fixed64(&mut raw, tick_data_fields::TICK_NUMBER, 42);
        encode_bytes(&mut raw, tick_data_fields::ORGANISMS, b"should be skipped");
        encode_bytes(&mut raw, tick_data_fields::CELL_COLUMNS, b"cell data");

        let mut reader = WireReader::new(&raw[..]);
        let accept: HashSet<u32> =
            [tick_data_fields::TICK_NUMBER, tick_data_fields::CELL_COLUMNS].into_iter().collect();

        let mut seen_tick = None;
        let mut seen_cells = None;
        while let Some(tag) = reader.read_tag().unwrap() {
            match reader.read_or_skip(tag, &accept).unwrap() {
                Some(FieldValue::Fixed64(v)) if tag.field_number == tick_data_fields::TICK_NUMBER => {
                    seen_tick = Some(v)
                }
                Some(FieldValue::Bytes(b)) if tag.field_number == tick_data_fields::CELL_COLUMNS => {
                    seen_cells = Some(b)
                }
                _ => {}
            }
        }
        assert_eq!(seen_tick, Some(42));
        assert_eq!(seen_cells.as_deref(), Some(&b"cell data"[..]));
    }

    #[test]
    fn truncated_stream_reports_truncated() {
        let mut raw = Vec::new();
        encode_tag(&mut raw, tick_data_fields::TICK_NUMBER, 0);
        // Omit the fixed64 payload entirely.
        let mut reader = WireReader::new(&raw[..]);
        let tag = reader.read_tag().unwrap().unwrap();
        let err = reader.read_fixed64_or_panic_helper(tag);
        assert!(matches!(
            err,
            Err(ArchiveError::DecodeError {
                kind: DecodeErrorKind::Truncated
            })
        ));
    }

    #[test]
    fn nested_skip_advances_past_unknown_field() {
        let mut raw = Vec::new();
        encode_bytes(&mut raw, 99, b"unknown field, should be skipped wholesale");
        encode_fixed64(&mut raw, tick_data_fields::TICK_NUMBER, 7);
        let mut reader = WireReader::new(&raw[..]);
        let accept: HashSet<u32> = [tick_data_fields::TICK_NUMBER].into_iter().collect();

        let first_tag = reader.read_tag().unwrap().unwrap();
        assert_eq!(reader.read_or_skip(first_tag, &accept).unwrap().is_none(), true);
        let second_tag = reader.read_tag().unwrap().unwrap();
        let value = reader.read_or_skip(second_tag, &accept).unwrap();
        assert!(matches!(value, Some(FieldValue::Fixed64(7))));
    }

    impl<R: Read> WireReader<R> {
        fn read_fixed64_or_panic_helper(&mut self, _tag: Tag) -> Result<u64, ArchiveError> {
            self.read_fixed64()
        }
    }

    #[test]
    fn chunk_message_round_trips_through_environment_accept_set() {
        use crate::value_objects::{CellGrid, DeltaType, TickData, TickDataChunk, TickDelta};

        let snapshot = TickData {
            tick_number: 100,
            capture_time_ms: 1_000,
            cell_grid: CellGrid::from_sorted(vec![0, 3, 9], vec![1, -2, 3]),
            organisms: Vec::new(),
            total_organisms_created: 5,
            total_unique_genomes: 2,
        };
        let delta = TickDelta {
            tick_number: 101,
            capture_time_ms: 1_010,
            delta_type: DeltaType::Sparse,
            changed_cells: CellGrid::from_sorted(vec![3], vec![9]),
            organisms: Vec::new(),
            total_organisms_created: 6,
            total_unique_genomes: 2,
        };
        let chunk = TickDataChunk {
            first_tick: 100,
            last_tick: 101,
            tick_count: 2,
            snapshot,
            deltas: vec![delta],
        };

        let encoded = encode_chunk_message(&chunk);
        let decoded = decode_environment_chunk(&encoded).unwrap();

        assert_eq!(decoded.first_tick, chunk.first_tick);
        assert_eq!(decoded.last_tick, chunk.last_tick);
        assert_eq!(decoded.tick_count, chunk.tick_count);
        assert_eq!(decoded.snapshot.cell_grid, chunk.snapshot.cell_grid);
        assert_eq!(decoded.snapshot.total_organisms_created, chunk.snapshot.total_organisms_created);
        assert_eq!(decoded.deltas.len(), 1);
        assert_eq!(decoded.deltas[0].changed_cells, chunk.deltas[0].changed_cells);
        assert_eq!(decoded.deltas[0].tick_number, chunk.deltas[0].tick_number);
    }

    #[test]
    fn decode_environment_chunk_rejects_truncated_input() {
        let mut raw = Vec::new();
        encode_fixed64(&mut raw, chunk_fields::FIRST_TICK, 1);
        // Missing last_tick, tick_count, and snapshot entirely.
        let err = decode_environment_chunk(&raw);
        assert!(matches!(
            err,
            Err(ArchiveError::DecodeError {
                kind: DecodeErrorKind::Truncated
            })
        ));
    }

    fn chunk_with_organisms() -> crate::value_objects::TickDataChunk {
        use crate::value_objects::{CellGrid, DeltaType, OrganismState, RuntimeBlob, TickData, TickDataChunk, TickDelta};

        let make_organism = |id: u32, tick: u64| OrganismState {
            organism_id: id,
            parent_id: if id == 0 { None } else { Some(id - 1) },
            birth_tick: 0,
            program_id: format!("prog-{id}"),
            initial_position: vec![1, 2],
            genome_hash: 0xdead_beef + id as u64,
            tick_number: tick,
            energy: 100 - id as i64,
            ip: vec![0, 1],
            dv: vec![1, 0],
            data_pointers: vec![vec![0, 0]],
            active_dp_index: 0,
            entropy: 0.5,
            molecule_marker: 3,
            runtime_blob: RuntimeBlob::default(),
        };

        let snapshot = TickData {
            tick_number: 0,
            capture_time_ms: 0,
            cell_grid: CellGrid::from_sorted(vec![0, 1], vec![10, 20]),
            organisms: vec![make_organism(0, 0), make_organism(1, 0)],
            total_organisms_created: 2,
            total_unique_genomes: 2,
        };
        let delta = TickDelta {
            tick_number: 1,
            capture_time_ms: 10,
            delta_type: DeltaType::Sparse,
            changed_cells: CellGrid::from_sorted(vec![1], vec![21]),
            organisms: vec![make_organism(0, 1), make_organism(1, 1), make_organism(2, 1)],
            total_organisms_created: 3,
            total_unique_genomes: 3,
        };
        TickDataChunk {
            first_tick: 0,
            last_tick: 1,
            tick_count: 2,
            snapshot,
            deltas: vec![delta],
        }
    }

    #[test]
    fn full_decode_round_trips_organisms_and_counters() {
        let chunk = chunk_with_organisms();
        let encoded = encode_chunk_message(&chunk);
        let decoded = decode_full_chunk(&encoded).unwrap();
        assert_eq!(decoded, chunk);
    }

    #[test]
    fn environment_decode_skips_organisms_full_decode_materializes_them() {
        let chunk = chunk_with_organisms();
        let encoded = encode_chunk_message(&chunk);

        let env_decoded = decode_environment_chunk(&encoded).unwrap();
        let full_decoded = decode_full_chunk(&encoded).unwrap();

        assert!(env_decoded.snapshot.organisms.is_empty());
        assert!(env_decoded.deltas[0].organisms.is_empty());
        assert!(!full_decoded.snapshot.organisms.is_empty());
        assert!(!full_decoded.deltas[0].organisms.is_empty());

        // Every non-skipped field agrees between the two decode modes.
        assert_eq!(env_decoded.first_tick, full_decoded.first_tick);
        assert_eq!(env_decoded.last_tick, full_decoded.last_tick);
        assert_eq!(env_decoded.tick_count, full_decoded.tick_count);
        assert_eq!(env_decoded.snapshot.cell_grid, full_decoded.snapshot.cell_grid);
        assert_eq!(env_decoded.snapshot.total_organisms_created, full_decoded.snapshot.total_organisms_created);
        assert_eq!(env_decoded.deltas[0].changed_cells, full_decoded.deltas[0].changed_cells);
        assert_eq!(env_decoded.deltas[0].total_unique_genomes, full_decoded.deltas[0].total_unique_genomes);
    }
}
