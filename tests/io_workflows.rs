//! Decode, process and encode workflows through the file and stream APIs

use heuristic_bgremove::{
    remove_background_from_bytes, remove_background_from_image, remove_background_from_reader,
    BackgroundRemovalProcessor, BgRemovalError, ImageIOService, OutputFormat,
    OutputFormatHandler, PixelBuffer, ProgressTracker, RemovalConfig, Result,
};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;
use tempfile::TempDir;

/// Dark square on a white card, encoded in `format`
fn product_shot(format: ImageFormat) -> Vec<u8> {
    let image = RgbImage::from_fn(24, 24, |x, y| {
        if (8..16).contains(&x) && (8..16).contains(&y) {
            Rgb([40, 30, 20])
        } else {
            Rgb([255, 255, 255])
        }
    });
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(image)
        .write_to(&mut Cursor::new(&mut bytes), format)
        .unwrap();
    bytes
}

#[test]
fn test_png_upload_to_png_file() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let output_path = temp_dir.path().join("nested").join("cutout.png");

    let result = remove_background_from_bytes(&product_shot(ImageFormat::Png), &RemovalConfig::default())?;
    result.save_png(&output_path)?;
    assert!(output_path.exists());

    let reloaded = ImageIOService::load_image(&output_path, usize::MAX)?;
    assert_eq!(reloaded.dimensions(), (24, 24));
    assert_eq!(reloaded.pixel(0, 0), Some([255, 255, 255, 0]));
    assert_eq!(reloaded.pixel(12, 12), Some([40, 30, 20, 255]));
    assert_eq!(reloaded, result.buffer);
    Ok(())
}

#[test]
fn test_tiff_upload_and_output() -> Result<()> {
    let config = RemovalConfig::builder()
        .output_format(OutputFormat::Tiff)
        .build()?;
    let result = remove_background_from_bytes(&product_shot(ImageFormat::Tiff), &config)?;

    let encoded = result.to_bytes()?;
    assert_eq!(image::guess_format(&encoded).ok(), Some(ImageFormat::Tiff));

    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join(format!(
        "cutout.{}",
        OutputFormatHandler::get_extension(config.output_format)
    ));
    result.save(&path)?;
    assert_eq!(ImageIOService::load_image(&path, usize::MAX)?, result.buffer);
    Ok(())
}

#[test]
fn test_jpeg_upload_keeps_dark_subject() -> Result<()> {
    let result = remove_background_from_bytes(&product_shot(ImageFormat::Jpeg), &RemovalConfig::default())?;

    // JPEG ringing makes exact colors unreliable; the corners and the center are not
    assert_eq!(result.buffer.pixel(0, 0).map(|px| px[3]), Some(0));
    assert_eq!(result.buffer.pixel(23, 23).map(|px| px[3]), Some(0));
    assert_eq!(result.buffer.pixel(12, 12).map(|px| px[3]), Some(255));
    assert!(result.metadata.background_pixels > 24 * 24 / 2);
    Ok(())
}

#[test]
fn test_raw_output_is_the_buffer() -> Result<()> {
    let config = RemovalConfig::builder()
        .output_format(OutputFormat::Rgba8)
        .build()?;
    let result = remove_background_from_bytes(&product_shot(ImageFormat::Png), &config)?;
    assert_eq!(result.to_bytes()?, result.buffer.as_bytes());
    assert_eq!(result.to_bytes_as(OutputFormat::Png)?[..8], [137, 80, 78, 71, 13, 10, 26, 10]);
    Ok(())
}

#[test]
fn test_upload_size_limit() -> Result<()> {
    let bytes = product_shot(ImageFormat::Png);
    let config = RemovalConfig::builder()
        .max_input_bytes(bytes.len() - 1)
        .build()?;

    let err = remove_background_from_bytes(&bytes, &config).unwrap_err();
    assert!(matches!(err, BgRemovalError::InvalidInput(_)));

    let config = RemovalConfig::builder().max_input_bytes(bytes.len()).build()?;
    assert!(remove_background_from_bytes(&bytes, &config).is_ok());
    Ok(())
}

#[test]
fn test_unsupported_and_corrupt_uploads() {
    let config = RemovalConfig::default();

    let err = remove_background_from_bytes(b"%PDF-1.7 not an image", &config).unwrap_err();
    assert!(matches!(err, BgRemovalError::UnsupportedFormat(_)));

    // Recognised, but not one of the accepted input formats
    let err = remove_background_from_bytes(b"GIF89a\x01\x00\x01\x00\x00\x00\x00;", &config).unwrap_err();
    assert!(matches!(err, BgRemovalError::UnsupportedFormat(_)));

    let mut truncated = product_shot(ImageFormat::Png);
    truncated.truncate(40);
    let err = remove_background_from_bytes(&truncated, &config).unwrap_err();
    assert!(matches!(err, BgRemovalError::Processing(_)));

    assert!(!ImageIOService::is_image_mime_type("text/plain"));
}

#[test]
fn test_missing_file() {
    let temp_dir = TempDir::new().unwrap();
    let err = ImageIOService::load_image(temp_dir.path().join("absent.png"), usize::MAX).unwrap_err();
    assert!(matches!(err, BgRemovalError::Io(_)));
    assert!(err.to_string().contains("absent.png"));
}

#[test]
fn test_dynamic_image_input() -> Result<()> {
    let gray = DynamicImage::new_luma8(5, 5);
    let result = remove_background_from_image(&gray, &RemovalConfig::default())?;
    assert_eq!(result.dimensions(), (5, 5));
    assert!(result.buffer.pixels().all(|px| px == [0u8, 0, 0, 255]));
    Ok(())
}

#[test]
fn test_processor_reuse_with_progress() -> Result<()> {
    let mut processor = BackgroundRemovalProcessor::new(RemovalConfig::default())?
        .with_progress_tracker(ProgressTracker::console(true));

    let first = processor.process_bytes(&product_shot(ImageFormat::Png))?;
    let second = processor.process_bytes(&product_shot(ImageFormat::Png))?;
    assert_eq!(first.buffer, second.buffer);
    assert_eq!(first.mask, second.mask);

    let white = PixelBuffer::filled(3, 3, [255, 255, 255, 255])?;
    let third = processor.process_buffer(&white)?;
    assert_eq!(third.metadata.background_pixels, 9);
    Ok(())
}

#[tokio::test]
async fn test_reader_from_file() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let input_path = temp_dir.path().join("input.png");
    tokio::fs::write(&input_path, product_shot(ImageFormat::Png)).await?;

    let file = tokio::fs::File::open(&input_path).await?;
    let result = remove_background_from_reader(file, &RemovalConfig::default()).await?;
    assert_eq!(result.dimensions(), (24, 24));
    assert_eq!(result.metadata.total_pixels, 576);
    Ok(())
}

#[tokio::test]
async fn test_reader_enforces_size_limit() -> Result<()> {
    let bytes = product_shot(ImageFormat::Png);
    let config = RemovalConfig::builder().max_input_bytes(64).build()?;

    let err = remove_background_from_reader(Cursor::new(bytes), &config)
        .await
        .unwrap_err();
    assert!(matches!(err, BgRemovalError::InvalidInput(_)));
    Ok(())
}
