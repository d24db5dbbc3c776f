use approx::assert_abs_diff_eq;
use localcorr::io::parse::linear_to_coordinate;
use localcorr::prelude::*;
use std::fs;
use std::io::{BufReader, Cursor};
use tempfile::TempDir;

fn parse(
    parser: RecordParser,
    line: &str,
) -> Result<Option<(Coordinate, Vec<f64>)>, LocalCorrError> {
    parser
        .parse_line::<f64>(line)
        .map(|record| record.map(|(c, s)| (c, s.to_vec())))
}

fn sample_result() -> LocalCorrResult<f64> {
    LocalCorrResult::from_pairs(
        vec![
            (Coordinate::new(1, 2, 1), 0.5),
            (Coordinate::new(3, 1, 1), f64::NAN),
            (Coordinate::new(2, 2, 2), -0.25),
        ],
        1,
        0,
    )
}

/// 3 × 3 × 1 text volume in `x y z v...` layout.
fn grid_text() -> String {
    let mut text = String::new();
    for y in 1..=3 {
        for x in 1..=3 {
            let index = (y - 1) * 3 + x;
            let values: Vec<String> = (0..6)
                .map(|t| format!("{}", ((t * index) as f64 * 0.4).sin() + t as f64))
                .collect();
            text.push_str(&format!("{x} {y} 1 {}\n", values.join(" ")));
        }
    }
    text
}

// ============================================================================
// Parsing
// ============================================================================

#[test]
fn test_parse_xyz_line() {
    let parsed = parse(RecordParser::new(), "1 2 3 0.5 1.5 2.5").unwrap();
    assert_eq!(parsed, Some((Coordinate::new(1, 2, 3), vec![0.5, 1.5, 2.5])));

    let tabs = parse(RecordParser::new(), "\t4\t5  6 -1e-3 7\n").unwrap();
    assert_eq!(tabs, Some((Coordinate::new(4, 5, 6), vec![-1e-3, 7.0])));

    let float_keys = parse(RecordParser::new(), "1.0 2.0 3 9").unwrap();
    assert_eq!(float_keys, Some((Coordinate::new(1, 2, 3), vec![9.0])));
}

#[test]
fn test_parse_blank_lines() {
    assert_eq!(parse(RecordParser::new(), "").unwrap(), None);
    assert_eq!(parse(RecordParser::new(), "   \t ").unwrap(), None);
}

#[test]
fn test_parse_malformed_lines() {
    for line in ["1 2 x 4", "1 2 3", "1 2", "1 2 3 4 five", "1.5 2 3 4"] {
        match parse(RecordParser::new(), line) {
            Err(LocalCorrError::Parse { .. }) => (),
            other => panic!("Expected Parse error for {line:?}, got {other:?}"),
        }
    }
}

#[test]
fn test_parse_error_truncates_long_lines() {
    let line = format!("1 2 x {}", "0.5 ".repeat(100));
    let message = parse(RecordParser::new(), &line).unwrap_err().to_string();
    assert!(message.contains("..."));
    assert!(message.len() < line.len());
}

#[test]
fn test_linear_keys() {
    let parser = RecordParser::new().key_format(KeyFormat::Linear { max_x: 3, max_y: 2 });

    let cases = [
        (1, Coordinate::new(1, 1, 1)),
        (3, Coordinate::new(3, 1, 1)),
        (4, Coordinate::new(1, 2, 1)),
        (6, Coordinate::new(3, 2, 1)),
        (7, Coordinate::new(1, 1, 2)),
    ];
    for (index, expected) in cases {
        let (coord, series) = parse(parser, &format!("{index} 1 2")).unwrap().unwrap();
        assert_eq!(coord, expected, "index {index}");
        assert_eq!(series, vec![1.0, 2.0]);
    }

    assert!(matches!(parse(parser, "0 1 2"), Err(LocalCorrError::Parse { .. })));
    assert!(linear_to_coordinate(5, 0, 2).is_err());
}

#[test]
fn test_preprocess() {
    let line = "1 1 1 1 2 3";

    let (_, centered) = parse(RecordParser::new().preprocess(Preprocess::SubtractMean), line)
        .unwrap()
        .unwrap();
    assert_eq!(centered, vec![-1.0, 0.0, 1.0]);

    let (_, dff) = parse(RecordParser::new().preprocess(Preprocess::DeltaF), line)
        .unwrap()
        .unwrap();
    assert_abs_diff_eq!(dff[0], -1.0 / 2.1, epsilon = 1e-12);
    assert_abs_diff_eq!(dff[1], 0.0, epsilon = 1e-12);
    assert_abs_diff_eq!(dff[2], 1.0 / 2.1, epsilon = 1e-12);
}

// ============================================================================
// Emission
// ============================================================================

#[test]
fn test_emit_text() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("results-localcorr");
    let paths = emit(&sample_result(), &out, OutputFormat::Text).unwrap();

    assert_eq!(paths.len(), 3);
    assert_eq!(paths[0], out.join("x.txt"));
    assert_eq!(paths[1], out.join("y.txt"));
    assert_eq!(paths[2], out.join("corr.txt"));

    assert_eq!(fs::read_to_string(&paths[0]).unwrap(), "1\n3\n2\n");
    assert_eq!(fs::read_to_string(&paths[1]).unwrap(), "2\n1\n2\n");
    assert_eq!(fs::read_to_string(&paths[2]).unwrap(), "0.5\nNaN\n-0.25\n");
}

#[test]
fn test_emit_json() {
    let dir = TempDir::new().unwrap();
    let paths = emit(&sample_result(), dir.path(), OutputFormat::Json).unwrap();

    let x: Vec<f64> = serde_json::from_str(&fs::read_to_string(&paths[0]).unwrap()).unwrap();
    assert_eq!(x, vec![1.0, 3.0, 2.0]);

    let corr: Vec<Option<f64>> =
        serde_json::from_str(&fs::read_to_string(&paths[2]).unwrap()).unwrap();
    assert_eq!(corr, vec![Some(0.5), None, Some(-0.25)]);
}

#[test]
fn test_emit_mat_layout() {
    let dir = TempDir::new().unwrap();
    let paths = emit(&sample_result(), dir.path(), OutputFormat::Mat).unwrap();
    assert_eq!(paths[1], dir.path().join("y.mat"));

    let bytes = fs::read(&paths[1]).unwrap();
    let u32_at = |i: usize| u32::from_le_bytes(bytes[i..i + 4].try_into().unwrap());
    let i32_at = |i: usize| i32::from_le_bytes(bytes[i..i + 4].try_into().unwrap());

    // 128-byte header, matrix tag, flags, dims, name, data.
    assert_eq!(bytes.len(), 128 + 8 + 16 + 16 + 16 + 8 + 3 * 8);
    assert!(bytes.starts_with(b"MATLAB 5.0 MAT-file"));
    assert_eq!(&bytes[124..126], &[0x00, 0x01]);
    assert_eq!(&bytes[126..128], b"IM");

    assert_eq!(u32_at(128), 14);
    assert_eq!(u32_at(132) as usize, bytes.len() - 136);
    assert_eq!(u32_at(136), 6);
    assert_eq!(u32_at(144), 6);
    assert_eq!(u32_at(152), 5);
    assert_eq!((i32_at(160), i32_at(164)), (3, 1));
    assert_eq!((u32_at(168), u32_at(172)), (1, 1));
    assert_eq!(bytes[176], b'y');
    assert_eq!((u32_at(184), u32_at(188)), (9, 24));

    let values: Vec<f64> = bytes[192..]
        .chunks_exact(8)
        .map(|b| f64::from_le_bytes(b.try_into().unwrap()))
        .collect();
    assert_eq!(values, vec![2.0, 1.0, 2.0]);
}

#[test]
fn test_emit_empty_result() {
    let dir = TempDir::new().unwrap();
    let empty = LocalCorrResult::<f64>::from_pairs(Vec::new(), 0, 0);
    let paths = emit(&empty, dir.path(), OutputFormat::Text).unwrap();
    for path in paths {
        assert_eq!(fs::read_to_string(path).unwrap(), "");
    }
}

// ============================================================================
// Text Input
// ============================================================================

#[test]
fn test_text_input_end_to_end() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("volume.txt");
    fs::write(&input, format!("{}\n\n", grid_text())).unwrap();

    let ctx = ExecutionContext::builder("local[2]".parse().unwrap())
        .partitions(2)
        .open()
        .unwrap();
    let processor = LocalCorr::new()
        .radius(1)
        .bounds(3, 3)
        .adapter(Adapter::Batch)
        .build()
        .unwrap();
    let mut result = processor
        .fit::<f64, _>(&ctx, TextInput::new(&input, RecordParser::new()))
        .unwrap();
    result.sort_by_coordinate();

    assert_eq!(result.len(), 9);
    assert_eq!(result.unmatched, 0);
    assert_eq!(result.coordinates[0], Coordinate::new(1, 1, 1));
    assert_eq!(result.coordinates[8], Coordinate::new(3, 3, 1));

    let out = dir.path().join("volume-localcorr");
    emit(&result, &out, OutputFormat::Text).unwrap();
    let x: Vec<i64> = fs::read_to_string(out.join("x.txt"))
        .unwrap()
        .lines()
        .map(|l| l.parse().unwrap())
        .collect();
    let corr: Vec<f64> = fs::read_to_string(out.join("corr.txt"))
        .unwrap()
        .lines()
        .map(|l| l.parse().unwrap())
        .collect();
    assert_eq!(x, result.x_values());
    for (i, coord) in result.coordinates.iter().enumerate() {
        assert_eq!(corr[i].to_bits(), result.correlation_at(*coord).unwrap().to_bits());
    }
}

#[test]
fn test_text_input_errors() {
    let dir = TempDir::new().unwrap();
    let ctx = ExecutionContext::local().unwrap();
    let processor = LocalCorr::new()
        .radius(1)
        .bounds(3, 3)
        .adapter(Adapter::Batch)
        .build()
        .unwrap();

    let missing = dir.path().join("missing.txt");
    let result = processor.fit::<f64, _>(&ctx, TextInput::new(&missing, RecordParser::new()));
    match result {
        Err(LocalCorrError::Io { path, .. }) => assert_eq!(path, missing),
        other => panic!("Expected Io error, got {other:?}"),
    }

    let broken = dir.path().join("broken.txt");
    fs::write(&broken, "1 1 1 0.5 0.7\n1 2 one 0.1 0.2\n").unwrap();
    let result = processor.fit::<f64, _>(&ctx, TextInput::new(&broken, RecordParser::new()));
    assert!(matches!(result, Err(LocalCorrError::Parse { .. })));
}

#[test]
fn test_streaming_lines_match_batch() {
    let text = grid_text();

    let mut streaming = LocalCorr::new()
        .radius(1)
        .bounds(3, 3)
        .adapter(Adapter::Streaming)
        .chunk_size(2)
        .build::<f64>()
        .unwrap();
    let read = streaming
        .process_lines(BufReader::new(Cursor::new(text.clone())), &RecordParser::new())
        .unwrap();
    assert_eq!(read, 9);
    let streamed = streaming.finalize().unwrap();

    let records: Vec<(Coordinate, TimeSeries<f64>)> = text
        .lines()
        .filter_map(|line| RecordParser::new().parse_line(line).unwrap())
        .collect();
    let ctx = ExecutionContext::local().unwrap();
    let batch = LocalCorr::new()
        .radius(1)
        .bounds(3, 3)
        .adapter(Adapter::Batch)
        .build()
        .unwrap()
        .fit(&ctx, records)
        .unwrap();

    assert_eq!(streamed.len(), batch.len());
    for (coord, r) in streamed.iter() {
        assert_abs_diff_eq!(r, batch.correlation_at(coord).unwrap(), epsilon = 1e-10);
    }
}
