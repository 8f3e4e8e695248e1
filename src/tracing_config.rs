//! Tracing spans, events and subscriber setup
//!
//! The engine emits its spans and events through `spans` and `events`.
//! Installing a subscriber is left to the host; with the `logging` feature
//! `TracingConfig` covers the common cases.

#[cfg(feature = "logging")]
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Rendering of emitted events
#[cfg(feature = "logging")]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TracingFormat {
    /// Colored single-line output
    #[default]
    Console,
    /// Plain single-line output without ANSI codes
    Compact,
    /// One JSON object per event
    #[cfg(feature = "tracing-json")]
    Json,
}

/// Subscriber configuration
#[cfg(feature = "logging")]
#[derive(Debug, Clone, Default)]
pub struct TracingConfig {
    /// 0 = info, 1 = debug, 2+ = trace
    pub verbosity: u8,
    pub format: TracingFormat,
    /// Filter directive; overrides `verbosity` when set
    pub env_filter: Option<String>,
    /// Label attached to the startup event so runs can be correlated
    pub session_label: Option<String>,
}

#[cfg(feature = "logging")]
impl TracingConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    #[must_use]
    pub fn with_format(mut self, format: TracingFormat) -> Self {
        self.format = format;
        self
    }

    #[must_use]
    pub fn with_env_filter<S: Into<String>>(mut self, filter: S) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    #[must_use]
    pub fn with_session_label<S: Into<String>>(mut self, label: S) -> Self {
        self.session_label = Some(label.into());
        self
    }

    /// Filter directive for the configured verbosity
    #[must_use]
    pub fn verbosity_to_filter(&self) -> &'static str {
        match self.verbosity {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }

    /// Build the filter this configuration describes
    ///
    /// # Errors
    /// Returns an error when `env_filter` is not a valid directive.
    pub fn build_filter(&self) -> anyhow::Result<EnvFilter> {
        let directive = self
            .env_filter
            .as_deref()
            .unwrap_or_else(|| self.verbosity_to_filter());
        Ok(EnvFilter::try_new(directive)?)
    }

    /// Install the subscriber globally
    ///
    /// # Errors
    /// Returns an error for an invalid filter or when a global subscriber is
    /// already installed.
    pub fn init(self) -> anyhow::Result<()> {
        use tracing_subscriber::fmt;

        let registry = Registry::default().with(self.build_filter()?);

        match self.format {
            TracingFormat::Console => {
                let fmt_layer = fmt::layer()
                    .with_ansi(true)
                    .with_target(false)
                    .with_level(true)
                    .compact();
                registry.with(fmt_layer).try_init()?;
            },
            TracingFormat::Compact => {
                let fmt_layer = fmt::layer()
                    .with_ansi(false)
                    .with_target(false)
                    .compact();
                registry.with(fmt_layer).try_init()?;
            },
            #[cfg(feature = "tracing-json")]
            TracingFormat::Json => {
                let fmt_layer = fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true);
                registry.with(fmt_layer).try_init()?;
            },
        }

        if let Some(label) = &self.session_label {
            tracing::info!(session = %label, "background removal session started");
        }

        Ok(())
    }
}

/// Install a minimal `RUST_LOG`-driven subscriber unless one is already set
#[cfg(feature = "logging")]
pub fn init_library_tracing() {
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_ok() {
        tracing::debug!("library tracing initialized");
    }
}

/// Span constructors shared by callers that wrap the engine
pub mod spans {
    use tracing::{Level, Span};

    /// Span around decoding, processing and saving one file
    pub fn file_processing(file_path: &std::path::Path, format: &str) -> Span {
        tracing::span!(
            Level::INFO,
            "file_processing",
            file_path = %file_path.display(),
            format = %format
        )
    }

    pub fn edge_detection(dimensions: (u32, u32), threshold: f32) -> Span {
        tracing::span!(
            Level::DEBUG,
            "edge_detection",
            width = dimensions.0,
            height = dimensions.1,
            threshold = threshold
        )
    }

    pub fn classification(dimensions: (u32, u32)) -> Span {
        tracing::span!(
            Level::DEBUG,
            "classification",
            width = dimensions.0,
            height = dimensions.1
        )
    }

    pub fn alpha_write(background_pixels: usize) -> Span {
        tracing::span!(Level::DEBUG, "alpha_write", background_pixels = background_pixels)
    }
}

/// Event helpers for common logging patterns
pub mod events {
    use tracing::{debug, error, info, warn};

    /// Log an error with context
    pub fn error_with_context(error: &dyn std::error::Error, context: &str) {
        error!(error = %error, context = %context, "operation failed");
    }

    pub fn warning_with_recommendation(message: &str, recommendation: &str) {
        warn!(message = %message, recommendation = %recommendation, "warning");
    }

    /// Log the duration of a named stage
    pub fn performance_metric(operation: &str, duration_ms: u64) {
        debug!(operation = %operation, duration_ms = duration_ms, "performance metric");
    }

    /// Log how much of an image was removed
    pub fn removal_summary(background_pixels: usize, total_pixels: usize) {
        let percent = if total_pixels == 0 {
            0.0
        } else {
            background_pixels as f64 / total_pixels as f64 * 100.0
        };
        info!(
            background_pixels = background_pixels,
            total_pixels = total_pixels,
            removed_percent = %format!("{:.1}", percent),
            "background removal summary"
        );
    }
}
