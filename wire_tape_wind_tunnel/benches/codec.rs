// Copyright 2026 the Wire Tape Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use wire_tape::cursor::Cursor;
use wire_tape::gateway::Mode;
use wire_tape::opcode::Opcode;
use wire_tape::program::Program;
use wire_tape::trace::{ScopeKind, TraceMask, TraceOutcome, TraceSink};
use wire_tape::vm::{ExecutionContext, Vm};

use wire_tape_wind_tunnel::{
    Checksum, Filler, bit_run, bit_run_len, encoded, sensor_frame, sensor_frame_len,
    string_list, string_list_len, wide_open_limits,
};

fn bench_codec(c: &mut Criterion) {
    bench_sensor_frame_encode(c);
    bench_sensor_frame_decode(c);
    bench_sensor_frame_decode_reused_ctx(c);
    bench_sensor_frame_decode_traced_run(c);
    bench_sensor_frame_decode_traced_scopes(c);
    bench_sensor_frame_decode_traced_instr(c);
    bench_bit_run_encode(c);
    bench_bit_run_decode(c);
    bench_string_list_encode(c);
    bench_string_list_decode(c);
}

fn bench_sensor_frame_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("sensor_frame_encode");
    let p = sensor_frame();
    for &n in &[1_usize, 16, 256, 4096] {
        let mut buf = vec![0_u8; sensor_frame_len(n)];
        let mut vm = Vm::new(Filler::new(n as u64), wide_open_limits());
        group.bench_with_input(BenchmarkId::from_parameter(n), p.program(), |b, p| {
            b.iter(|| {
                let out = vm
                    .run(p, &mut buf, Mode::Encode, TraceMask::NONE, None)
                    .unwrap();
                black_box(out);
            });
        });
    }
    group.finish();
}

fn bench_sensor_frame_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("sensor_frame_decode");
    let p = sensor_frame();
    for &n in &[1_usize, 16, 256, 4096] {
        let mut buf = encoded(&p, n as u64, sensor_frame_len(n));
        let mut vm = Vm::new(Checksum::default(), wide_open_limits());
        group.bench_with_input(BenchmarkId::from_parameter(n), p.program(), |b, p| {
            b.iter(|| {
                let out = vm
                    .run(p, &mut buf, Mode::Decode, TraceMask::NONE, None)
                    .unwrap();
                black_box(out);
            });
        });
    }
    group.finish();
}

fn bench_sensor_frame_decode_reused_ctx(c: &mut Criterion) {
    let mut group = c.benchmark_group("sensor_frame_decode_reused_ctx");
    let p = sensor_frame();
    for &n in &[1_usize, 16, 256] {
        let mut buf = encoded(&p, n as u64, sensor_frame_len(n));
        let mut vm = Vm::new(Checksum::default(), wide_open_limits());
        let mut ctx = ExecutionContext::new();
        group.bench_with_input(BenchmarkId::from_parameter(n), p.program(), |b, p| {
            b.iter(|| {
                let out = vm
                    .run_with_ctx(&mut ctx, p, &mut buf, Mode::Decode, TraceMask::NONE, None)
                    .unwrap();
                black_box(out);
            });
        });
    }
    group.finish();
}

fn bench_sensor_frame_decode_traced_run(c: &mut Criterion) {
    bench_sensor_frame_decode_traced(c, "sensor_frame_decode_traced_run", CountingTrace::run());
}

fn bench_sensor_frame_decode_traced_scopes(c: &mut Criterion) {
    bench_sensor_frame_decode_traced(
        c,
        "sensor_frame_decode_traced_scopes",
        CountingTrace::scopes(),
    );
}

fn bench_sensor_frame_decode_traced_instr(c: &mut Criterion) {
    bench_sensor_frame_decode_traced(
        c,
        "sensor_frame_decode_traced_instr",
        CountingTrace::instr(),
    );
}

fn bench_sensor_frame_decode_traced(c: &mut Criterion, name: &str, mut sink: CountingTrace) {
    let mut group = c.benchmark_group(name);
    let p = sensor_frame();
    let mask = sink.mask();
    for &n in &[1_usize, 16, 256] {
        let mut buf = encoded(&p, n as u64, sensor_frame_len(n));
        let mut vm = Vm::new(Checksum::default(), wide_open_limits());
        group.bench_with_input(BenchmarkId::from_parameter(n), p.program(), |b, p| {
            b.iter(|| {
                let out = vm
                    .run(p, &mut buf, Mode::Decode, mask, Some(&mut sink))
                    .unwrap();
                black_box(out);
            });
        });
    }
    group.finish();
}

fn bench_bit_run_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("bit_run_encode");
    for &fields in &[8_u32, 64, 512] {
        let p = bit_run(fields);
        let mut buf = vec![0_u8; bit_run_len(fields)];
        let mut vm = Vm::new(Filler::new(0), wide_open_limits());
        group.bench_with_input(BenchmarkId::from_parameter(fields), p.program(), |b, p| {
            b.iter(|| {
                let out = vm
                    .run(p, &mut buf, Mode::Encode, TraceMask::NONE, None)
                    .unwrap();
                black_box(out);
            });
        });
    }
    group.finish();
}

fn bench_bit_run_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("bit_run_decode");
    for &fields in &[8_u32, 64, 512] {
        let p = bit_run(fields);
        let mut buf = encoded(&p, 0, bit_run_len(fields));
        let mut vm = Vm::new(Checksum::default(), wide_open_limits());
        group.bench_with_input(BenchmarkId::from_parameter(fields), p.program(), |b, p| {
            b.iter(|| {
                let out = vm
                    .run(p, &mut buf, Mode::Decode, TraceMask::NONE, None)
                    .unwrap();
                black_box(out);
            });
        });
    }
    group.finish();
}

fn bench_string_list_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("string_list_encode");
    let p = string_list();
    for &n in &[1_usize, 32, 1024] {
        let mut buf = vec![0_u8; string_list_len(n)];
        let mut vm = Vm::new(Filler::new(n as u64), wide_open_limits());
        group.bench_with_input(BenchmarkId::from_parameter(n), p.program(), |b, p| {
            b.iter(|| {
                let out = vm
                    .run(p, &mut buf, Mode::Encode, TraceMask::NONE, None)
                    .unwrap();
                black_box(out);
            });
        });
    }
    group.finish();
}

fn bench_string_list_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("string_list_decode");
    let p = string_list();
    for &n in &[1_usize, 32, 1024] {
        let mut buf = encoded(&p, n as u64, string_list_len(n));
        let mut vm = Vm::new(Checksum::default(), wide_open_limits());
        group.bench_with_input(BenchmarkId::from_parameter(n), p.program(), |b, p| {
            b.iter(|| {
                let out = vm
                    .run(p, &mut buf, Mode::Decode, TraceMask::NONE, None)
                    .unwrap();
                black_box(out);
            });
        });
    }
    group.finish();
}

struct CountingTrace {
    mask: TraceMask,
    _count: u64,
}

impl CountingTrace {
    fn run() -> Self {
        Self {
            mask: TraceMask::RUN,
            _count: 0,
        }
    }

    fn scopes() -> Self {
        Self {
            mask: TraceMask::SCOPE | TraceMask::GATEWAY,
            _count: 0,
        }
    }

    fn instr() -> Self {
        Self {
            mask: TraceMask::INSTR,
            _count: 0,
        }
    }
}

impl TraceSink for CountingTrace {
    fn mask(&self) -> TraceMask {
        self.mask
    }

    fn run_start(&mut self, _program: &Program, _mode: Mode, _buf_len: usize) {
        // Intentionally minimal: we want to measure VM overhead, not sink work.
        self._count = self._count.wrapping_add(1);
    }

    fn instr(
        &mut self,
        _program: &Program,
        _ip: usize,
        _next_ip: usize,
        _opcode: Opcode,
        _cursor: Cursor,
    ) {
        self._count = self._count.wrapping_add(1);
    }

    fn scope_enter(&mut self, _program: &Program, _kind: ScopeKind, _depth: usize, _ip: usize) {
        self._count = self._count.wrapping_add(1);
    }

    fn scope_exit(&mut self, _program: &Program, _kind: ScopeKind, _depth: usize, _ip: usize) {
        self._count = self._count.wrapping_add(1);
    }

    fn run_end(&mut self, _program: &Program, _outcome: TraceOutcome<'_>) {
        self._count = self._count.wrapping_add(1);
    }
}

criterion_group! {
    name = benches;
    config = Criterion::default()
        .warm_up_time(std::time::Duration::from_millis(300))
        .measurement_time(std::time::Duration::from_millis(1200))
        .sample_size(60);
    targets = bench_codec
}
criterion_main!(benches);
