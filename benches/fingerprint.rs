use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use mzvec::config::PipelineConfig;
use mzvec::extract::{MspReader, SpectrumSource};
use mzvec::fingerprint::{transform, BinWidth};
use mzvec::index::MemoryGateway;
use mzvec::ingest::Ingestor;
use mzvec::spectrum::Peak;
use std::io::Cursor;

/// Synthetic centroided spectrum with a few colliding peaks
fn make_peaks(count: usize) -> Vec<Peak> {
    (0..count)
        .map(|j| {
            let mz = 100.0 + j as f64 * 0.37;
            let intensity = 1000.0 + ((j * 7919) % 997) as f64;
            Peak::new(mz, intensity)
        })
        .collect()
}

/// MSP library text with `spectra` records of `peaks` peaks each
fn make_library(spectra: usize, peaks: usize) -> String {
    let mut text = String::new();
    for i in 0..spectra {
        text.push_str(&format!("NAME: compound {}\nComment: synthetic\nNum Peaks: {}\n", i, peaks));
        for peak in make_peaks(peaks) {
            text.push_str(&format!("{:.4} {:.1}\n", peak.mz + i as f64 * 0.01, peak.intensity));
        }
        text.push('\n');
    }
    text
}

fn bench_transform(c: &mut Criterion) {
    let mut group = c.benchmark_group("transform");

    for &count in &[50usize, 500, 5000] {
        let peaks = make_peaks(count);
        group.throughput(Throughput::Elements(count as u64));

        for &width in &[0.01f64, 0.1, 1.0] {
            let bin_width = BinWidth::new(width).unwrap();
            group.bench_with_input(
                BenchmarkId::new(format!("width_{}", width), count),
                &peaks,
                |b, peaks| b.iter(|| transform(black_box(peaks), bin_width)),
            );
        }
    }

    group.finish();
}

fn bench_msp_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("msp_parse");

    for &spectra in &[100usize, 1000] {
        let library = make_library(spectra, 50);
        group.throughput(Throughput::Bytes(library.len() as u64));

        group.bench_with_input(BenchmarkId::from_parameter(spectra), &library, |b, library| {
            b.iter(|| {
                let reader = MspReader::new(Cursor::new(library.as_bytes()));
                reader.records().filter_map(Result::ok).count()
            })
        });
    }

    group.finish();
}

fn bench_ingest_memory(c: &mut Criterion) {
    let library = make_library(1000, 50);
    let config = PipelineConfig::default();

    c.bench_function("ingest_memory_1000", |b| {
        b.iter(|| {
            let mut ingestor = Ingestor::new(MemoryGateway::default(), &config).unwrap();
            let reader = MspReader::new(Cursor::new(library.as_bytes()));
            ingestor.ingest_source(reader).unwrap()
        })
    });
}

criterion_group!(benches, bench_transform, bench_msp_parse, bench_ingest_memory);
criterion_main!(benches);
