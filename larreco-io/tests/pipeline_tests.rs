use larreco_algorithms::reconstruct_stream;
use larreco_core::{EventBuilderConfig, HitSource, HoughConfig, ReconstructionConfig};
use larreco_io::{
    encode_rows, scan_source, DataFileWriter, MappedRowSource, OutputFormat, ResultSink,
};
use std::io::Write;
use tempfile::NamedTempFile;

/// Two diagonal bursts of 20 hits, far apart in time, with the second
/// burst's first rows swapped to exercise the sorter.
fn burst_rows() -> Vec<[i64; 12]> {
    let mut rows = Vec::new();
    for burst in 0..2_i64 {
        for k in 0..20_i64 {
            let ts = burst * 1_000_000 + k * 500;
            rows.push([k % 64, 1, 0, 10 * k, 5 * k, 0, ts, 0, ts, 0, 80, 20]);
        }
    }
    rows.swap(20, 21);
    rows
}

fn row_file() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(&encode_rows(&burst_rows())).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_row_file_to_csv() {
    let input = row_file();
    let output = NamedTempFile::new().unwrap();
    let source = MappedRowSource::open(input.path()).unwrap();
    assert_eq!(source.len(), 40);

    let config = ReconstructionConfig {
        events: EventBuilderConfig::new().with_dt_cut(1_000),
        hough: HoughConfig::new().with_num_directions(300),
        ..ReconstructionConfig::default()
    };
    let mut writer = DataFileWriter::create(output.path(), OutputFormat::Csv).unwrap();
    let summary = reconstruct_stream(source, &config, |reco| writer.write_event(&reco)).unwrap();
    writer.flush().unwrap();

    assert_eq!(summary.events, 2);
    assert_eq!(summary.tracks, 2);

    let content = std::fs::read_to_string(output.path()).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 3);
    // the first hit of the second burst closes the first event and is dropped
    assert!(lines[1].starts_with("0,0,9500,20,0,0,"));
    assert!(lines[2].starts_with("1,1000500,1009500,19,0,0,"));
}

#[test]
fn test_scan_row_file() {
    let input = row_file();
    let source = MappedRowSource::open(input.path()).unwrap();
    let summary = scan_source(&source, 4).unwrap();

    assert_eq!(summary.rows, 40);
    assert_eq!(summary.out_of_order, 1);
    assert_eq!(summary.max_lag, 1);
    assert!(summary.sorted_within_buffer());
    assert!((summary.charge_sum - 40.0 * 60.0).abs() < 1e-9);
}
