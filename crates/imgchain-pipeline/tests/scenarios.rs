//! Integration test: end-to-end scenarios through the public API.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]

use std::io::Cursor;

use imgchain_pipeline::{
    Average, AverageParams, Binarization, BinarizationParams, Brightness, BrightnessParams,
    DynamicImage, Gaussian, GaussianParams, Grayscale, GrayscaleParams, Image, Negative,
    NegativeParams, Operation, OperationError, OperationKind, ParamValues, ParameterSet,
    Pipeline, PipelineError, Sobel, SobelParams, ValidationError, kernel, registry,
};

/// A deterministic 6x8 RGB gradient with a bright square in the middle.
fn test_card() -> Image {
    let (height, width) = (6, 8);
    let data = (0..height)
        .flat_map(|y| (0..width).map(move |x| (y, x)))
        .flat_map(|(y, x)| {
            let inside = (2..4).contains(&y) && (3..5).contains(&x);
            let base = f64::from(u32::try_from(x * 20 + y * 5).unwrap());
            if inside {
                [250.0, 240.0, 230.0]
            } else {
                [base, 255.0 - base, base / 2.0]
            }
        })
        .collect();
    Image::multi(height, width, 3, data).unwrap()
}

#[test]
fn brightness_on_constant_gray() {
    let img = Image::filled(vec![3, 3], 100.0).unwrap();
    let out = Brightness
        .apply(&img, &BrightnessParams { value: 50 })
        .unwrap();
    assert_eq!(out.shape(), &[3, 3]);
    assert!(out.as_slice().iter().all(|&v| v == 150.0));
}

#[test]
fn grayscale_of_solid_red() {
    let img = Image::multi(1, 1, 3, vec![255.0, 0.0, 0.0]).unwrap();
    let out = Grayscale.apply(&img, &GrayscaleParams::default()).unwrap();
    let exported = out.to_rgb8().unwrap();
    assert_eq!(exported.get_pixel(0, 0).0, [54, 54, 54]);
}

#[test]
fn average_kernel_is_all_ninths() {
    let k = kernel::average(&AverageParams { kernel_size: 3 }).unwrap();
    assert_eq!((k.rows(), k.cols()), (3, 3));
    assert!(k.weights().iter().all(|w| (w - 1.0 / 9.0).abs() < 1e-12));
}

#[test]
fn sobel_on_flat_image_is_empty() {
    let img = Image::filled(vec![8, 8, 3], 123.0).unwrap();
    let out = Sobel.apply(&img, &SobelParams { threshold: 128 }).unwrap();
    assert!(out.as_slice().iter().all(|&v| v == 0.0));
}

#[test]
fn binarization_threshold_is_exclusive() {
    let img = Image::gray(1, 4, vec![0.0, 128.0, 129.0, 255.0]).unwrap();
    let out = Binarization
        .apply(&img, &BinarizationParams { threshold: 128 })
        .unwrap();
    assert_eq!(out.as_slice(), &[0.0, 0.0, 255.0, 255.0]);
}

#[test]
fn negative_twice_is_identity() {
    let img = test_card();
    let mut pipeline = Pipeline::new(img.clone());
    pipeline
        .push(Negative, NegativeParams)
        .push(Negative, NegativeParams);
    assert_eq!(pipeline.execute().unwrap(), img);
}

#[test]
fn gaussian_kernels_are_normalized_and_symmetric() {
    for kernel_size in [3, 5, 9, 21] {
        for sigma in [0.1, 1.0, 5.0] {
            let k = kernel::gaussian(&GaussianParams { kernel_size, sigma }).unwrap();
            assert!((k.sum() - 1.0).abs() < 1e-9);
            let r = k.rotated_180();
            assert!(k.weights().iter().zip(r.weights()).all(|(a, b)| (a - b).abs() < 1e-12));
        }
    }
}

#[test]
fn tone_outputs_stay_in_range() {
    let img = test_card();
    for value in [-300, -20, 0, 90, 400] {
        let out = Brightness.apply(&img, &BrightnessParams { value }).unwrap();
        assert!(out.as_slice().iter().all(|v| (0.0..=255.0).contains(v)));
    }
}

#[test]
fn masks_are_binary_for_every_detector_and_threshold() {
    let img = test_card();
    for threshold in [0_i64, 30, 128, 255] {
        for kind in [OperationKind::Sobel, OperationKind::Roberts] {
            let params =
                registry::build(kind, &ParamValues::new().with("threshold", threshold)).unwrap();
            let out = kind.apply(&img, &params).unwrap();
            assert_eq!(out.shape(), img.shape());
            assert!(out.as_slice().iter().all(|&v| v == 0.0 || v == 255.0));
        }
    }
}

#[test]
fn empty_pipeline_returns_source() {
    let img = test_card();
    assert_eq!(Pipeline::new(img.clone()).execute().unwrap(), img);
}

#[test]
fn invalid_gaussian_is_rejected_before_transform() {
    let img = test_card();
    let even = Gaussian.apply(
        &img,
        &GaussianParams {
            kernel_size: 4,
            sigma: 1.0,
        },
    );
    assert!(matches!(
        even,
        Err(OperationError::InvalidParams(ValidationError::EvenKernelSize(4)))
    ));
    let zero_sigma = Gaussian.apply(
        &img,
        &GaussianParams {
            kernel_size: 3,
            sigma: 0.0,
        },
    );
    assert!(matches!(
        zero_sigma,
        Err(OperationError::InvalidParams(ValidationError::NotPositive { .. }))
    ));
}

#[test]
fn host_driven_pipeline_from_identifiers() {
    let mut pipeline = Pipeline::new(test_card());
    let steps = [
        ("grayscale", ParamValues::new().with("method", "average")),
        ("gaussian", ParamValues::new().with("sigma", 1.5)),
        ("sobel", ParamValues::new().with("threshold", 40_i64)),
    ];
    for (id, values) in &steps {
        let entry = registry::lookup(id).unwrap();
        let params = entry.build(values).unwrap();
        pipeline.add_step(entry.kind, params).unwrap();
    }
    assert_eq!(pipeline.len(), 3);

    let out = pipeline.execute().unwrap();
    assert_eq!(out.shape(), &[6, 8, 3]);
    // The bright square produces edges; every pixel is a mask value.
    assert!(out.as_slice().contains(&255.0));
    assert!(out.as_slice().iter().all(|&v| v == 0.0 || v == 255.0));
}

#[test]
fn mismatched_runtime_step_leaves_pipeline_unchanged() {
    let mut pipeline = Pipeline::new(test_card());
    pipeline.push(Average, AverageParams::default());
    let params = registry::build(OperationKind::Gaussian, &ParamValues::new()).unwrap();
    let err = pipeline.add_step(OperationKind::Average, params).unwrap_err();
    assert!(matches!(err, PipelineError::TypeMismatch { .. }));
    assert_eq!(pipeline.len(), 1);
}

#[test]
fn schema_json_lists_fields_in_order() {
    let json = serde_json::to_string(&GaussianParams::schema()).unwrap();
    let kernel_at = json.find("kernel_size").unwrap();
    let sigma_at = json.find("sigma").unwrap();
    assert!(kernel_at < sigma_at);
    assert!(json.contains(r#""kind":"slider""#));
}

#[test]
fn png_round_trip_through_pipeline() {
    let rgb = image::RgbImage::from_fn(5, 4, |x, y| {
        let v = u8::try_from(x * 40 + y * 10).unwrap();
        image::Rgb([v, 255 - v, 17])
    });
    let mut png = Vec::new();
    DynamicImage::ImageRgb8(rgb.clone())
        .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
        .unwrap();

    let decoded = image::load_from_memory(&png).unwrap();
    let source = Image::from_dynamic(&decoded);
    assert_eq!(source.shape(), &[4, 5, 3]);

    // An empty pipeline exports exactly what was decoded.
    let out = Pipeline::new(source).execute().unwrap();
    assert_eq!(out.to_rgb8().unwrap(), rgb);
}
