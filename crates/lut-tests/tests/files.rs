//! LUT and calibration file handling

use std::fs;

use lut_tests::fixtures::cal_text;
use lut_tests::{GridPattern, compare_grids, generate_grid};
use oxlut_core::lut_file::{decode_cube, encode_cube};
use oxlut_core::pipeline::load_source;
use oxlut_core::{
    BinaryLut, CalibrationAppender, CalibrationCurve, ColorGrid, ConvertOptions, DeviceLinkBuilder,
    ErrorKind, InsertionPoint, Lut3d, LutFormat, Pipeline,
};

#[test]
fn test_cube_round_trip_within_print_precision() {
    let grid = generate_grid(GridPattern::Random(21), 6);
    let text = encode_cube(&grid, Some("Random"));
    let back = decode_cube(&text).unwrap();
    assert_eq!(back.title.as_deref(), Some("Random"));
    assert!(compare_grids(&grid, &back.grid).unwrap().max <= 5e-8);
}

#[test]
fn test_binary_round_trip_within_one_code_value() {
    let grid = generate_grid(GridPattern::Random(22), 7);
    let bytes = BinaryLut::new(grid.clone()).encode().unwrap();
    assert_eq!(bytes.len(), 16 + 7 * 7 * 7 * 6);
    let back = BinaryLut::decode(&bytes).unwrap();
    assert!(!back.hdr);
    assert!(compare_grids(&grid, &back.grid).unwrap().is_exact_u16());
}

#[test]
fn test_every_source_format_loads() {
    let dir = tempfile::tempdir().unwrap();
    let grid = generate_grid(GridPattern::Gamma(0.8), 5);

    let cube = dir.path().join("a.cube");
    fs::write(&cube, encode_cube(&grid, None)).unwrap();
    let binary = dir.path().join("a.3dlut");
    fs::write(&binary, BinaryLut::new(grid.clone()).encode().unwrap()).unwrap();
    let icc = dir.path().join("a.icm");
    fs::write(
        &icc,
        DeviceLinkBuilder::new()
            .encode(&Lut3d::from_grid(grid.clone()))
            .unwrap(),
    )
    .unwrap();

    for path in [cube, binary, icc] {
        let loaded = load_source(&path).unwrap();
        let stats = compare_grids(&grid, &loaded).unwrap();
        assert!(stats.is_exact_u16(), "{}: {:?}", path.display(), stats);
    }
}

#[test]
fn test_cube_output_through_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.cube");
    fs::write(&input, encode_cube(&ColorGrid::identity(9).unwrap(), None)).unwrap();

    let out_dir = dir.path().join("out");
    fs::create_dir(&out_dir).unwrap();
    let opts = ConvertOptions {
        inputs: vec![input],
        output_dir: Some(out_dir.clone()),
        format: LutFormat::Cube,
        size: 17,
        description: Some("Upsampled".to_string()),
        ..Default::default()
    };
    let reports = Pipeline::new(opts).unwrap().run().unwrap();
    assert_eq!(reports[0].output, out_dir.join("in.cube"));

    let text = fs::read_to_string(out_dir.join("in.cube")).unwrap();
    let cube = decode_cube(&text).unwrap();
    assert_eq!(cube.title.as_deref(), Some("Upsampled"));
    let identity = ColorGrid::identity(17).unwrap();
    assert!(compare_grids(&cube.grid, &identity).unwrap().max < 1e-4);
}

#[test]
fn test_default_output_keeps_source_file() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("display.3dlut");
    let source = BinaryLut::new(generate_grid(GridPattern::Random(30), 5))
        .encode()
        .unwrap();
    fs::write(&input, &source).unwrap();

    let opts = ConvertOptions {
        inputs: vec![input.clone()],
        size: 9,
        ..Default::default()
    };
    let reports = Pipeline::new(opts).unwrap().run().unwrap();

    assert_eq!(fs::read(&input).unwrap(), source);
    assert_eq!(reports[0].output, dir.path().join("display.9.3dlut"));
    let written = BinaryLut::decode(&fs::read(&reports[0].output).unwrap()).unwrap();
    assert_eq!(written.grid.size(), 9);
}

#[test]
fn test_explicit_output_onto_source_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("display.cube");
    let text = encode_cube(&ColorGrid::identity(3).unwrap(), None);
    fs::write(&input, &text).unwrap();

    let opts = ConvertOptions {
        inputs: vec![input.clone()],
        output: Some(dir.path().join(".").join("display.cube")),
        ..Default::default()
    };
    let err = Pipeline::new(opts).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Config);
    assert_eq!(fs::read_to_string(&input).unwrap(), text);
}

#[test]
fn test_cal_file_with_video_encoding() {
    // Codes 16 .. 235 widened to 16 bits by shifting unscale to 0 .. 1
    let encoded: Vec<(f64, f64)> = (0..5)
        .map(|i| {
            let x = i as f64 / 4.0;
            (x, (16.0 + 219.0 * x) / 256.0 * (65536.0 / 65535.0))
        })
        .collect();
    let cal = CalibrationCurve::parse_str(&cal_text(&encoded, true)).unwrap();
    assert!(cal.is_linear(1e-9));

    let plain = CalibrationCurve::parse_str(&cal_text(&encoded, false)).unwrap();
    assert!(!plain.is_linear(1e-9));
}

#[test]
fn test_cal_below_video_black_never_goes_negative() {
    let points = [(0.0, 0.0), (0.25, 0.2), (1.0, 235.0 / 256.0)];
    let cal = CalibrationCurve::parse_str(&cal_text(&points, true)).unwrap();
    for c in 0..3 {
        assert_eq!(cal.channel(c)[0], (0.0, 0.0));
        assert!(cal.channel(c).iter().all(|&(_, o)| o >= 0.0));
    }

    let lut = CalibrationAppender::new()
        .with_curve(cal)
        .append(&Lut3d::from_grid(ColorGrid::identity(3).unwrap()))
        .unwrap();
    assert!(lut.output_curves.iter().all(|curve| curve.eval(0.0) >= 0.0));
}

#[test]
fn test_cal_file_without_rgb_fields() {
    let text = "CAL\nBEGIN_DATA_FORMAT\nRGB_I RGB_R RGB_G XYZ_X\nEND_DATA_FORMAT\n\
                BEGIN_DATA\n0 0 0 0\n1 1 1 1\nEND_DATA\n";
    let err = CalibrationCurve::parse_str(text).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn test_calibration_survives_icc_output() {
    let dir = tempfile::tempdir().unwrap();
    let points: Vec<(f64, f64)> = (0..=16)
        .map(|i| {
            let x = i as f64 / 16.0;
            (x, x.powf(1.5))
        })
        .collect();
    let cal_path = dir.path().join("display.cal");
    fs::write(&cal_path, cal_text(&points, false)).unwrap();

    let input = dir.path().join("in.3dlut");
    fs::write(
        &input,
        BinaryLut::new(ColorGrid::identity(5).unwrap()).encode().unwrap(),
    )
    .unwrap();
    let output = dir.path().join("out.icc");
    let opts = ConvertOptions {
        inputs: vec![input],
        output: Some(output.clone()),
        size: 5,
        calibration: Some(cal_path.clone()),
        ..Default::default()
    };
    Pipeline::new(opts).unwrap().run().unwrap();

    let profile = oxlut_core::IccProfile::parse(&fs::read(&output).unwrap()).unwrap();
    let lut = Lut3d::from_profile(&profile).unwrap();
    assert!(lut.input_curves.iter().all(|c| c.is_identity(0.0)));
    assert_eq!(lut.output_curves[0].len(), 17);

    let expected = CalibrationAppender::new()
        .with_curve(CalibrationCurve::read_path(&cal_path).unwrap())
        .with_insertion_point(InsertionPoint::Output)
        .append(&Lut3d::from_grid(ColorGrid::identity(5).unwrap()))
        .unwrap();
    for x in [0.1, 0.37, 0.5, 0.9] {
        let got = lut.eval([x; 3]);
        let want = expected.eval([x; 3]);
        for c in 0..3 {
            assert!((got[c] - want[c]).abs() < 1e-4, "{} {:?} {:?}", x, got, want);
        }
    }
}
