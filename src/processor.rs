//! Background removal processor
//!
//! `BackgroundRemovalProcessor` drives the four engine stages (edge detection,
//! classification, edge gating, alpha write) over a `PixelBuffer`, records
//! timings and reports progress. It keeps no pixel data between calls; the
//! only state it holds is configuration and an optional progress tracker.

use crate::{
    classify::BackgroundClassifier,
    config::{RemovalConfig, SegmentationConfig},
    edge::EdgeMap,
    error::{BgRemovalError, Result},
    services::{ImageIOService, ProcessingStage, ProgressTracker},
    tracing_config::{events, spans},
    types::{PixelBuffer, ProcessingMetadata, ProcessingTimings, RemovalResult, SegmentationMask},
    utils::BufferValidator,
};
use image::DynamicImage;
use instant::Instant;
use tracing::{debug, instrument};

/// Run edge detection and classification without touching the buffer
///
/// Returns the mask (0 = background) together with the edge map it was
/// gated on. This is the whole engine minus the alpha write.
#[must_use]
pub fn segment(buffer: &PixelBuffer, config: &SegmentationConfig) -> (SegmentationMask, EdgeMap) {
    let edges = EdgeMap::compute(buffer, config.edge_threshold);
    let mask = BackgroundClassifier::new(config).classify(buffer, &edges);
    (mask, edges)
}

/// Stateless driver for the segmentation engine
pub struct BackgroundRemovalProcessor {
    config: RemovalConfig,
    progress_tracker: Option<ProgressTracker>,
}

impl BackgroundRemovalProcessor {
    /// Create a new processor
    ///
    /// # Errors
    /// - `InvalidConfig` if the configuration does not validate
    pub fn new(config: RemovalConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            progress_tracker: None,
        })
    }

    /// Attach a progress tracker
    #[must_use]
    pub fn with_progress_tracker(mut self, tracker: ProgressTracker) -> Self {
        self.progress_tracker = Some(tracker);
        self
    }

    /// Get the current configuration
    #[must_use]
    pub fn config(&self) -> &RemovalConfig {
        &self.config
    }

    /// Remove the background in place
    ///
    /// Alpha of background pixels in `buffer` is set to 0; RGB is never
    /// written. The caller keeps ownership of the buffer and gets back the
    /// classification and run metadata.
    ///
    /// # Errors
    /// - `InvalidInput` if the buffer geometry is inconsistent
    pub fn process_in_place(
        &mut self,
        buffer: &mut PixelBuffer,
    ) -> Result<(SegmentationMask, ProcessingMetadata)> {
        let (mask, _edges, metadata) = self.run(buffer, true)?;
        Ok((mask, metadata))
    }

    /// Remove the background from a copy of `buffer`
    ///
    /// The input is left untouched; the result owns a freshly allocated buffer
    /// of identical dimensions.
    ///
    /// # Errors
    /// - `InvalidInput` if the buffer geometry is inconsistent
    pub fn process_buffer(&mut self, buffer: &PixelBuffer) -> Result<RemovalResult> {
        self.process_owned(buffer.clone())
    }

    /// Remove the background from a buffer the caller hands over
    ///
    /// # Errors
    /// - `InvalidInput` if the buffer geometry is inconsistent
    pub fn process_owned(&mut self, buffer: PixelBuffer) -> Result<RemovalResult> {
        self.finish_owned(buffer, true)
    }

    fn finish_owned(&mut self, mut buffer: PixelBuffer, reset_clock: bool) -> Result<RemovalResult> {
        let (mask, edges, metadata) = self.run(&mut buffer, reset_clock)?;
        Ok(RemovalResult {
            buffer,
            mask,
            edge_map: self.config.debug.then_some(edges),
            metadata,
            output_format: self.config.output_format,
        })
    }

    /// Remove the background from raw RGBA bytes
    ///
    /// # Errors
    /// - `InvalidInput` for zero dimensions or a length that is not
    ///   `width * height * 4`
    pub fn process_rgba(&mut self, width: u32, height: u32, rgba: &[u8]) -> Result<RemovalResult> {
        let buffer = PixelBuffer::new(width, height, rgba.to_vec())?;
        self.process_owned(buffer)
    }

    /// Remove the background from a decoded `DynamicImage`
    ///
    /// # Errors
    /// - `InvalidInput` for a zero-sized image
    pub fn process_image(&mut self, image: &DynamicImage) -> Result<RemovalResult> {
        let buffer = PixelBuffer::from_rgba_image_owned(image.to_rgba8())?;
        self.process_owned(buffer)
    }

    /// Decode image bytes and remove the background
    ///
    /// # Errors
    /// - `InvalidInput` for empty input or input above `max_input_bytes`
    /// - `UnsupportedFormat` / `Processing` for decode failures
    pub fn process_bytes(&mut self, image_bytes: &[u8]) -> Result<RemovalResult> {
        if let Some(ref mut tracker) = self.progress_tracker {
            tracker.reset();
            tracker.report_stage(ProcessingStage::ImageLoading);
        }

        let decode_start = Instant::now();
        let buffer = match ImageIOService::load_from_bytes(image_bytes, self.config.max_input_bytes) {
            Ok(buffer) => buffer,
            Err(e) => {
                events::error_with_context(&e, "image decoding");
                if let Some(ref tracker) = self.progress_tracker {
                    tracker.report_error(&e.to_string());
                }
                return Err(e);
            },
        };
        let decode_ms = decode_start.elapsed().as_millis() as u64;
        events::performance_metric("image_decode", decode_ms);

        // The clock was reset above so the decode counts toward this run
        let mut result = self.finish_owned(buffer, false)?;
        result.metadata.timings.image_decode_ms = decode_ms;
        result.metadata.timings.total_ms += decode_ms;
        Ok(result)
    }

    /// Read an async stream to the end, then decode and process it
    ///
    /// # Errors
    /// - `Io` on read failure
    /// - Everything `process_bytes` returns
    pub async fn process_reader<R: tokio::io::AsyncRead + Unpin>(
        &mut self,
        reader: R,
    ) -> Result<RemovalResult> {
        use tokio::io::AsyncReadExt;

        // Read one byte past the limit so oversized streams are caught without
        // buffering all of them
        let limit = (self.config.max_input_bytes as u64).saturating_add(1);
        let mut buffer = Vec::new();
        if let Err(e) = reader.take(limit).read_to_end(&mut buffer).await {
            let e = BgRemovalError::from(e);
            events::error_with_context(&e, "reading image stream");
            if let Some(ref mut tracker) = self.progress_tracker {
                tracker.reset();
                tracker.report_stage(ProcessingStage::ImageLoading);
                tracker.report_error(&e.to_string());
            }
            return Err(e);
        }

        self.process_bytes(&buffer)
    }

    #[instrument(
        skip(self, buffer),
        fields(width = buffer.width(), height = buffer.height())
    )]
    fn run(
        &mut self,
        buffer: &mut PixelBuffer,
        reset_clock: bool,
    ) -> Result<(SegmentationMask, EdgeMap, ProcessingMetadata)> {
        let total_start = Instant::now();
        let mut timings = ProcessingTimings::default();
        let segmentation = &self.config.segmentation;
        let dimensions = buffer.dimensions();

        if let Some(ref mut tracker) = self.progress_tracker {
            if reset_clock {
                tracker.reset();
            }
            tracker.report_stage(ProcessingStage::Validation);
        }
        if let Err(e) =
            BufferValidator::validate_geometry(buffer.width(), buffer.height(), buffer.as_bytes().len())
        {
            if let Some(ref tracker) = self.progress_tracker {
                tracker.report_error(&e.to_string());
            }
            return Err(e);
        }

        let edges = {
            let _span = spans::edge_detection(dimensions, segmentation.edge_threshold).entered();
            if let Some(ref mut tracker) = self.progress_tracker {
                tracker.report_stage(ProcessingStage::EdgeDetection);
            }
            let start = Instant::now();
            let edges = EdgeMap::compute(buffer, segmentation.edge_threshold);
            timings.edge_detection_ms = start.elapsed().as_millis() as u64;
            events::performance_metric("edge_detection", timings.edge_detection_ms);
            edges
        };

        let mask = {
            let _span = spans::classification(dimensions).entered();
            if let Some(ref mut tracker) = self.progress_tracker {
                tracker.report_stage(ProcessingStage::Classification);
            }
            let start = Instant::now();
            let mask = BackgroundClassifier::new(segmentation).classify(buffer, &edges);
            timings.classification_ms = start.elapsed().as_millis() as u64;
            events::performance_metric("classification", timings.classification_ms);
            mask
        };

        {
            let _span = spans::alpha_write(mask.background_count()).entered();
            if let Some(ref mut tracker) = self.progress_tracker {
                tracker.report_stage(ProcessingStage::AlphaWrite);
            }
            let start = Instant::now();
            mask.apply_to_buffer(buffer)?;
            timings.alpha_write_ms = start.elapsed().as_millis() as u64;
            events::performance_metric("alpha_write", timings.alpha_write_ms);
        }

        timings.total_ms = total_start.elapsed().as_millis() as u64;

        let mut metadata = ProcessingMetadata::new(buffer.pixel_count());
        metadata.edge_pixels = edges.edge_count();
        metadata.background_pixels = mask.background_count();
        metadata.timings = timings.clone();

        debug!(
            edge_pixels = metadata.edge_pixels,
            total_ms = timings.total_ms,
            "segmentation finished"
        );
        events::removal_summary(metadata.background_pixels, metadata.total_pixels);

        if let Some(ref mut tracker) = self.progress_tracker {
            tracker.report_stage(ProcessingStage::Completed);
            tracker.report_completion(timings);
        }

        Ok((mask, edges, metadata))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OutputFormat;
    use crate::services::{ProgressReporter, ProgressUpdate};
    use std::pin::Pin;
    use std::sync::{Arc, Mutex};
    use std::task::{Context, Poll};
    use std::time::Duration;

    fn processor() -> BackgroundRemovalProcessor {
        BackgroundRemovalProcessor::new(RemovalConfig::default()).unwrap()
    }

    #[derive(Default, Clone)]
    struct RecordingReporter {
        updates: Arc<Mutex<Vec<(ProcessingStage, u64)>>>,
        errors: Arc<Mutex<Vec<(ProcessingStage, String)>>>,
    }

    impl ProgressReporter for RecordingReporter {
        fn report_progress(&self, update: ProgressUpdate) {
            self.updates.lock().unwrap().push((update.stage, update.elapsed_ms));
        }

        fn report_completion(&self, _timings: ProcessingTimings) {}

        fn report_error(&self, stage: ProcessingStage, error: &str) {
            self.errors.lock().unwrap().push((stage, error.to_string()));
        }
    }

    /// Stream that fails on the first read
    struct BrokenStream;

    impl tokio::io::AsyncRead for BrokenStream {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &mut tokio::io::ReadBuf<'_>,
        ) -> Poll<std::io::Result<()>> {
            Poll::Ready(Err(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "peer went away",
            )))
        }
    }

    #[test]
    fn test_rejects_invalid_config() {
        let mut config = RemovalConfig::default();
        config.segmentation.edge_threshold = -5.0;
        assert!(BackgroundRemovalProcessor::new(config).is_err());
    }

    #[test]
    fn test_in_place_edits_only_alpha() {
        let mut buffer = PixelBuffer::filled(4, 4, [255, 255, 255, 255]).unwrap();
        buffer.set_pixel(0, 0, [10, 10, 10, 200]);

        let (mask, metadata) = processor().process_in_place(&mut buffer).unwrap();

        assert_eq!(buffer.pixel(0, 0), Some([10, 10, 10, 200]));
        assert_eq!(buffer.pixel(3, 3), Some([255, 255, 255, 0]));
        assert_eq!(metadata.total_pixels, 16);
        assert_eq!(metadata.background_pixels, mask.background_count());
    }

    #[test]
    fn test_process_buffer_leaves_input_untouched() {
        let input = PixelBuffer::filled(5, 5, [255, 255, 255, 255]).unwrap();
        let result = processor().process_buffer(&input).unwrap();

        assert!(input.pixels().all(|px| px[3] == 255));
        assert!(result.buffer.pixels().all(|px| px[3] == 0));
        assert_eq!(result.dimensions(), (5, 5));
        assert!(result.edge_map.is_none());
    }

    #[test]
    fn test_debug_keeps_edge_map() {
        let config = RemovalConfig::builder()
            .debug(true)
            .output_format(OutputFormat::Rgba8)
            .build()
            .unwrap();
        let mut processor = BackgroundRemovalProcessor::new(config).unwrap();
        let result = processor
            .process_owned(PixelBuffer::filled(6, 6, [0, 0, 0, 255]).unwrap())
            .unwrap();

        let edges = result.edge_map.as_ref().unwrap();
        assert_eq!(edges.dimensions(), (6, 6));
        assert_eq!(edges.edge_count(), 0);
        assert_eq!(result.to_bytes().unwrap(), result.buffer.as_bytes());
    }

    #[test]
    fn test_process_rgba_validates_length() {
        let err = processor().process_rgba(3, 3, &[0; 35]).unwrap_err();
        assert!(matches!(err, crate::BgRemovalError::InvalidInput(_)));
        assert!(processor().process_rgba(0, 3, &[]).is_err());
    }

    #[test]
    fn test_process_bytes_records_decode_time() {
        let source = PixelBuffer::filled(8, 8, [255, 255, 255, 255]).unwrap();
        let png = ImageIOService::encode(&source, OutputFormat::Png).unwrap();

        let mut processor = processor().with_progress_tracker(ProgressTracker::no_op());
        let result = processor.process_bytes(&png).unwrap();
        assert_eq!(result.metadata.background_pixels, 64);
        assert!(result.metadata.timings.total_ms >= result.metadata.timings.image_decode_ms);
    }

    #[test]
    fn test_each_run_restarts_progress_clock() {
        let reporter = RecordingReporter::default();
        let mut processor = processor().with_progress_tracker(ProgressTracker::new(Box::new(reporter.clone())));
        let buffer = PixelBuffer::filled(4, 4, [255, 255, 255, 255]).unwrap();

        processor.process_buffer(&buffer).unwrap();
        let first_run_len = reporter.updates.lock().unwrap().len();
        std::thread::sleep(Duration::from_millis(300));
        processor.process_buffer(&buffer).unwrap();

        let updates = reporter.updates.lock().unwrap();
        let (stage, elapsed_ms) = updates[first_run_len];
        assert_eq!(stage, ProcessingStage::Validation);
        assert!(elapsed_ms < 100, "second run started at {elapsed_ms}ms");
        assert_eq!(updates.last().map(|u| u.0), Some(ProcessingStage::Completed));
    }

    #[test]
    fn test_process_bytes_keeps_decode_in_the_same_run() {
        let reporter = RecordingReporter::default();
        let mut processor = processor().with_progress_tracker(ProgressTracker::new(Box::new(reporter.clone())));
        let png = ImageIOService::encode(&PixelBuffer::filled(4, 4, [0, 0, 0, 255]).unwrap(), OutputFormat::Png)
            .unwrap();

        processor.process_buffer(&PixelBuffer::filled(2, 2, [0, 0, 0, 255]).unwrap()).unwrap();
        std::thread::sleep(Duration::from_millis(300));
        processor.process_bytes(&png).unwrap();

        let updates = reporter.updates.lock().unwrap();
        let loading = updates
            .iter()
            .position(|u| u.0 == ProcessingStage::ImageLoading)
            .unwrap();
        assert!(updates[loading].1 < 100);
        assert_eq!(updates[loading + 1].0, ProcessingStage::Validation);
        // No second reset between decode and validation
        assert!(updates[loading + 1].1 >= updates[loading].1);
    }

    #[tokio::test]
    async fn test_reader_failure_is_reported() {
        let reporter = RecordingReporter::default();
        let mut processor = processor().with_progress_tracker(ProgressTracker::new(Box::new(reporter.clone())));

        let err = processor.process_reader(BrokenStream).await.unwrap_err();
        assert!(matches!(err, BgRemovalError::Io(_)));

        let errors = reporter.errors.lock().unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].0, ProcessingStage::ImageLoading);
        assert!(errors[0].1.contains("peer went away"));
    }

    #[test]
    fn test_segment_does_not_mutate() {
        let buffer = PixelBuffer::filled(3, 3, [255, 255, 255, 255]).unwrap();
        let (mask, edges) = segment(&buffer, &SegmentationConfig::default());
        assert_eq!(mask.background_count(), 9);
        assert_eq!(edges.edge_count(), 0);
        assert!(buffer.pixels().all(|px| px[3] == 255));
    }
}
