use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage};

use bmt_thermal::{
    bmtf::{self, PixelEncoding},
    fallback::luminance,
    DecodeError, DecodeHint, DecodedImage, Decoder, Strategy, TemperatureField,
    ThermalMetadata,
};

fn encoded(img: RgbImage, format: ImageOutputFormat) -> Vec<u8> {
    let mut buf = vec![];
    DynamicImage::ImageRgb8(img).write_to(&mut buf, format).unwrap();
    buf
}

fn gradient(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| Rgb([(x * 40) as u8, (y * 40) as u8, 100]))
}

#[test]
fn bmtf_is_tried_first() {
    let field =
        TemperatureField::from_vec(2, 2, vec![21.5, 22., 36.6, 19.], ThermalMetadata::default())
            .unwrap();
    let mut jpeg = vec![0xFF, 0xD8, 0xFF, 0xE0];
    jpeg.extend_from_slice(b"JFIF photo");
    let bytes = bmtf::encode(&field, PixelEncoding::Float32, Some(&jpeg)).unwrap();

    let decoded = DecodedImage::decode(&bytes).unwrap();
    assert_eq!(decoded.source, Strategy::Bmtf);
    assert_eq!(decoded.field.unwrap().values(), field.values());
    assert_eq!(decoded.real_image.unwrap().bytes(), &jpeg[..]);
}

#[test]
fn dual_bitmap_file() {
    let thermal = encoded(gradient(4, 3), ImageOutputFormat::Bmp);
    let real = encoded(RgbImage::from_pixel(8, 6, Rgb([1, 2, 3])), ImageOutputFormat::Bmp);
    let mut bytes = thermal.clone();
    bytes.extend(&real);

    let decoded = DecodedImage::decode(&bytes).unwrap();
    assert_eq!(decoded.source, Strategy::DualBitmap);
    let field = decoded.field.unwrap();
    assert_eq!((field.width(), field.height()), (4, 3));
    assert!((field.at(3, 2).unwrap() - luminance([120, 80, 100])).abs() < 1e-4);
    assert_eq!(decoded.real_image.unwrap().bytes(), &real[..]);
}

#[test]
fn lone_bitmap_is_also_the_photograph() {
    let bmp = encoded(gradient(4, 3), ImageOutputFormat::Bmp);

    let decoded = DecodedImage::decode(&bmp).unwrap();
    assert_eq!(decoded.source, Strategy::DualBitmap);
    assert!(decoded.field.is_some());
    let real = decoded.real_image.unwrap();
    assert_eq!(real.bytes(), &bmp[..]);
    assert_eq!(real.extension(), "bmp");
}

#[test]
fn plain_raster_falls_back() {
    let png = encoded(gradient(5, 5), ImageOutputFormat::Png);

    let decoded = DecodedImage::decode(&png).unwrap();
    assert_eq!(decoded.source, Strategy::Fallback);
    assert!(decoded.field.is_some());
    assert_eq!(decoded.real_image.unwrap().extension(), "png");
}

#[test]
fn hint_reorders_but_still_tries_everything() {
    let hint = DecodeHint {
        extension: Some("jpg".into()),
        content_type: None,
    };
    let decoder = Decoder::for_hint(&hint);
    assert_eq!(decoder.order()[0], Strategy::Fallback);
    assert_eq!(decoder.order().len(), 3);

    // a BMTF file uploaded as .jpg still decodes as BMTF
    let field = TemperatureField::uniform(3, 3, 30., ThermalMetadata::default()).unwrap();
    let bytes = bmtf::encode(&field, PixelEncoding::ScaledU16, None).unwrap();
    assert_eq!(decoder.decode(&bytes).unwrap().source, Strategy::Bmtf);

    let bmp_hint = DecodeHint {
        extension: None,
        content_type: Some("image/bmp".into()),
    };
    assert_eq!(Decoder::for_hint(&bmp_hint).order(), &Strategy::DEFAULT_ORDER[..]);
}

#[test]
fn unrecognized_input() {
    match DecodedImage::decode(b"hello world, not an image") {
        Err(DecodeError::NoImageData { attempts }) => {
            assert_eq!(attempts.len(), 3);
            assert!(attempts.iter().all(|a| a.error.is_none()));
        }
        other => panic!("unexpected: {:?}", other.map(|d| d.source)),
    }
}

#[test]
fn corrupt_container_reports_cause() {
    let mut bytes = b"BMTF".to_vec();
    bytes.extend_from_slice(&[0; 40]);

    let err = DecodedImage::decode(&bytes).unwrap_err();
    assert_eq!(err.to_string(), "no image data could be recovered");
    match err {
        DecodeError::NoImageData { attempts } => {
            assert_eq!(attempts[0].strategy, Strategy::Bmtf);
            assert!(attempts[0].error.as_ref().unwrap().is_structural());
        }
        other => panic!("unexpected: {:?}", other),
    }
}
