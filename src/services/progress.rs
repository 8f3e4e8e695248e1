//! Progress reporting service
//!
//! This module separates progress reporting concerns from the engine,
//! allowing embedding applications to implement their own progress handling.

use crate::types::ProcessingTimings;
use instant::Instant;

/// Progress stages during background removal processing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingStage {
    /// Decoding an encoded upload into a pixel buffer
    ImageLoading,
    /// Checking buffer geometry and thresholds
    Validation,
    /// Sobel pass over luminance
    EdgeDetection,
    /// Per-pixel rule evaluation
    Classification,
    /// Zeroing alpha of background pixels
    AlphaWrite,
    /// Processing completed
    Completed,
}

impl ProcessingStage {
    /// Get a human-readable description of the processing stage
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            ProcessingStage::ImageLoading => "Loading input image",
            ProcessingStage::Validation => "Validating input",
            ProcessingStage::EdgeDetection => "Detecting edges",
            ProcessingStage::Classification => "Classifying background pixels",
            ProcessingStage::AlphaWrite => "Removing background",
            ProcessingStage::Completed => "Processing completed",
        }
    }

    /// Get the typical progress percentage for this stage
    #[must_use]
    pub fn progress_percentage(&self) -> u8 {
        match self {
            ProcessingStage::ImageLoading => 5,
            ProcessingStage::Validation => 10,
            ProcessingStage::EdgeDetection => 40,
            ProcessingStage::Classification => 80,
            ProcessingStage::AlphaWrite => 95,
            ProcessingStage::Completed => 100,
        }
    }
}

/// Progress update containing stage and timing information
#[derive(Debug, Clone)]
pub struct ProgressUpdate {
    /// Current processing stage
    pub stage: ProcessingStage,
    /// Progress percentage (0-100)
    pub progress: u8,
    /// Human-readable stage description
    pub description: String,
    /// Elapsed time since processing started (milliseconds)
    pub elapsed_ms: u64,
}

impl ProgressUpdate {
    /// Create a new progress update
    #[must_use]
    pub fn new(stage: ProcessingStage, start_time: Instant) -> Self {
        Self {
            progress: stage.progress_percentage(),
            description: stage.description().to_string(),
            elapsed_ms: start_time.elapsed().as_millis() as u64,
            stage,
        }
    }
}

/// Trait for reporting progress during background removal operations
pub trait ProgressReporter: Send + Sync {
    /// Report a progress update
    fn report_progress(&self, update: ProgressUpdate);

    /// Report processing completion with final timings
    fn report_completion(&self, timings: ProcessingTimings);

    /// Report an error during processing
    fn report_error(&self, stage: ProcessingStage, error: &str);
}

/// No-op progress reporter that discards all progress updates
pub struct NoOpProgressReporter;

impl ProgressReporter for NoOpProgressReporter {
    fn report_progress(&self, _update: ProgressUpdate) {}

    fn report_completion(&self, _timings: ProcessingTimings) {}

    fn report_error(&self, _stage: ProcessingStage, _error: &str) {}
}

/// Console progress reporter that logs progress through `log`
pub struct ConsoleProgressReporter {
    verbose: bool,
}

impl ConsoleProgressReporter {
    /// Create a new console progress reporter
    ///
    /// # Arguments
    /// * `verbose` - Whether to show detailed progress information
    #[must_use]
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl ProgressReporter for ConsoleProgressReporter {
    fn report_progress(&self, update: ProgressUpdate) {
        if self.verbose {
            log::info!(
                "[{}%] {} ({}ms elapsed)",
                update.progress,
                update.description,
                update.elapsed_ms
            );
        } else {
            log::info!("[{}%] {}", update.progress, update.description);
        }
    }

    fn report_completion(&self, timings: ProcessingTimings) {
        log::info!("Background removal completed in {}ms", timings.total_ms);

        if self.verbose {
            log::info!("  Detailed timings:");
            log::info!("    - Image decode: {}ms", timings.image_decode_ms);
            log::info!("    - Edge detection: {}ms", timings.edge_detection_ms);
            log::info!("    - Classification: {}ms", timings.classification_ms);
            log::info!("    - Alpha write: {}ms", timings.alpha_write_ms);
        }
    }

    fn report_error(&self, stage: ProcessingStage, error: &str) {
        log::error!("Error during {}: {}", stage.description(), error);
    }
}

/// Progress tracker that manages timing and progress reporting
pub struct ProgressTracker {
    reporter: Box<dyn ProgressReporter>,
    start_time: Instant,
    current_stage: Option<ProcessingStage>,
}

impl ProgressTracker {
    /// Create a new progress tracker with the specified reporter
    #[must_use]
    pub fn new(reporter: Box<dyn ProgressReporter>) -> Self {
        Self {
            reporter,
            start_time: Instant::now(),
            current_stage: None,
        }
    }

    /// Create a progress tracker with no-op reporter
    #[must_use]
    pub fn no_op() -> Self {
        Self::new(Box::new(NoOpProgressReporter))
    }

    /// Create a progress tracker with console reporter
    #[must_use]
    pub fn console(verbose: bool) -> Self {
        Self::new(Box::new(ConsoleProgressReporter::new(verbose)))
    }

    /// Restart the elapsed-time clock for a new run
    pub fn reset(&mut self) {
        self.start_time = Instant::now();
        self.current_stage = None;
    }

    /// Report entering a new stage
    pub fn report_stage(&mut self, stage: ProcessingStage) {
        self.current_stage = Some(stage);
        self.reporter
            .report_progress(ProgressUpdate::new(stage, self.start_time));
    }

    /// Report completion with final timings
    pub fn report_completion(&self, timings: ProcessingTimings) {
        self.reporter.report_completion(timings);
    }

    /// Report an error in the current stage
    pub fn report_error(&self, error: &str) {
        let stage = self.current_stage.unwrap_or(ProcessingStage::Validation);
        self.reporter.report_error(stage, error);
    }

    /// Stage most recently reported
    #[must_use]
    pub fn current_stage(&self) -> Option<ProcessingStage> {
        self.current_stage
    }

    /// Milliseconds since the tracker was created or reset
    #[must_use]
    pub fn elapsed_ms(&self) -> u64 {
        self.start_time.elapsed().as_millis() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct RecordingReporter {
        stages: Arc<Mutex<Vec<ProcessingStage>>>,
        errors: Arc<Mutex<Vec<String>>>,
    }

    impl ProgressReporter for RecordingReporter {
        fn report_progress(&self, update: ProgressUpdate) {
            self.stages.lock().unwrap().push(update.stage);
        }

        fn report_completion(&self, _timings: ProcessingTimings) {
            self.stages.lock().unwrap().push(ProcessingStage::Completed);
        }

        fn report_error(&self, stage: ProcessingStage, error: &str) {
            self.errors
                .lock()
                .unwrap()
                .push(format!("{}: {}", stage.description(), error));
        }
    }

    #[test]
    fn test_stage_percentages_increase() {
        let stages = [
            ProcessingStage::ImageLoading,
            ProcessingStage::Validation,
            ProcessingStage::EdgeDetection,
            ProcessingStage::Classification,
            ProcessingStage::AlphaWrite,
            ProcessingStage::Completed,
        ];
        for pair in stages.windows(2) {
            assert!(pair[0].progress_percentage() < pair[1].progress_percentage());
        }
        assert_eq!(ProcessingStage::Completed.progress_percentage(), 100);
    }

    #[test]
    fn test_tracker_records_stages_and_errors() {
        let reporter = RecordingReporter::default();
        let stages = Arc::clone(&reporter.stages);
        let errors = Arc::clone(&reporter.errors);

        let mut tracker = ProgressTracker::new(Box::new(reporter));
        tracker.report_stage(ProcessingStage::EdgeDetection);
        tracker.report_error("boom");
        tracker.report_completion(ProcessingTimings::default());

        assert_eq!(tracker.current_stage(), Some(ProcessingStage::EdgeDetection));
        assert_eq!(
            *stages.lock().unwrap(),
            vec![ProcessingStage::EdgeDetection, ProcessingStage::Completed]
        );
        assert_eq!(errors.lock().unwrap()[0], "Detecting edges: boom");
    }

    #[test]
    fn test_update_carries_description() {
        let update = ProgressUpdate::new(ProcessingStage::AlphaWrite, Instant::now());
        assert_eq!(update.progress, 95);
        assert_eq!(update.description, "Removing background");
    }
}
