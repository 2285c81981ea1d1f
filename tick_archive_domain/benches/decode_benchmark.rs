// /////////////////////////////////////////////////////////////////////////////
// Tick Archive
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Wire Decode Latency Benchmarks
//!
//! Compares the partial environment decode (C2's accept-set skip path)
//! against the full decode that materializes every organism, across a range
//! of per-tick organism counts. The gap between the two is the whole point
//! of the accept-set design: a reader that only wants cell-grid state
//! should never pay to deserialize organism JSON it is going to discard.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tick_archive_domain::services::{decode_environment_chunk, decode_full_chunk, encode_chunk_message};
use tick_archive_domain::value_objects::{
    CellGrid, DeltaType, OrganismState, RuntimeBlob, TickData, TickDataChunk, TickDelta,
};

fn organism(id: u32, tick: u64) -> OrganismState {
    OrganismState {
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
    }
}

fn chunk_with_organism_count(organisms_per_tick: u32) -> TickDataChunk {
    let organisms: Vec<OrganismState> = (0..organisms_per_tick).map(|id| organism(id, 0)).collect();
    let cell_grid = CellGrid::from_sorted((0..256).collect(), (0..256).map(|i| i as i32).collect());

    let snapshot = TickData {
        tick_number: 0,
        capture_time_ms: 0,
        cell_grid: cell_grid.clone(),
        organisms: organisms.clone(),
        total_organisms_created: organisms_per_tick as u64,
        total_unique_genomes: organisms_per_tick as u64,
    };
    let delta = TickDelta {
        tick_number: 1,
        capture_time_ms: 10,
        delta_type: DeltaType::Sparse,
        changed_cells: cell_grid,
        organisms,
        total_organisms_created: organisms_per_tick as u64,
        total_unique_genomes: organisms_per_tick as u64,
    };

    TickDataChunk {
        first_tick: 0,
        last_tick: 1,
        tick_count: 2,
        snapshot,
        deltas: vec![delta],
    }
}

fn benchmark_decode_paths(c: &mut Criterion) {
    let mut group = c.benchmark_group("chunk_decode");

    for organisms_per_tick in [0u32, 10, 100, 1_000] {
        let encoded = encode_chunk_message(&chunk_with_organism_count(organisms_per_tick));

        group.bench_with_input(BenchmarkId::new("environment_only", organisms_per_tick), &encoded, |b, bytes| {
            b.iter(|| decode_environment_chunk(black_box(bytes)).unwrap());
        });

        group.bench_with_input(BenchmarkId::new("full_decode", organisms_per_tick), &encoded, |b, bytes| {
            b.iter(|| decode_full_chunk(black_box(bytes)).unwrap());
        });
    }

    group.finish();
}

fn benchmark_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("chunk_encode");

    for organisms_per_tick in [0u32, 10, 100, 1_000] {
        let chunk = chunk_with_organism_count(organisms_per_tick);
        group.bench_with_input(BenchmarkId::from_parameter(organisms_per_tick), &chunk, |b, chunk| {
            b.iter(|| encode_chunk_message(black_box(chunk)));
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_decode_paths, benchmark_encode);
criterion_main!(benches);
