//! Log pipeline setup and the operator's text display.
//!
//! [`init_tracing`] installs the global `tracing` subscriber once at process
//! start.  [`DriverDisplay`] is unrelated to logging: it holds the six short
//! text lines shown on the driver station, overwritten by states every tick.
//!
//! # Environment variables
//!
//! | Variable | Effect |
//! |---|---|
//! | `OTEL_EXPORTER_OTLP_ENDPOINT` | OTLP collector base URL (e.g. `http://localhost:4318`). Enables span export. |
//! | `RUST_LOG` | Log filter (default `"info"`). |
//! | `BOSS_LOG_FORMAT=json` | Emit newline-delimited JSON logs. |
//!
//! ```rust,no_run
//! let _guard = boss_runtime::telemetry::init_tracing("boss");
//! ```

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{Resource, trace::SdkTracerProvider};
use tracing_subscriber::{
    EnvFilter, Layer, Registry, layer::SubscriberExt, util::SubscriberInitExt,
};

/// Env-var selecting the log output format.
pub const LOG_FORMAT_ENV: &str = "BOSS_LOG_FORMAT";

// ─────────────────────────────────────────────────────────────────────────────
// Subscriber
// ─────────────────────────────────────────────────────────────────────────────

/// Install the console formatter, the `RUST_LOG` filter and, when an
/// endpoint is configured, the OTLP span layer.
///
/// Spans are opened around state transitions and autonomous starts.  The
/// returned guard must outlive every span worth exporting.
pub fn init_tracing(service_name: &str) -> TracerProviderGuard {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let provider = build_provider(service_name);
    let otel = provider
        .as_ref()
        .map(|p| tracing_opentelemetry::layer().with_tracer(p.tracer("boss")));

    tracing_subscriber::registry()
        .with(console_layer(json_logs_requested()))
        .with(filter)
        .with(otel)
        .init();

    TracerProviderGuard(provider)
}

fn json_logs_requested() -> bool {
    std::env::var(LOG_FORMAT_ENV).is_ok_and(|v| v.eq_ignore_ascii_case("json"))
}

fn console_layer(json: bool) -> Box<dyn Layer<Registry> + Send + Sync> {
    let fmt = tracing_subscriber::fmt::layer().with_target(false);
    if json {
        fmt.json().boxed()
    } else {
        fmt.compact().boxed()
    }
}

/// Shuts the OTel [`SdkTracerProvider`] down on drop, flushing spans.
pub struct TracerProviderGuard(Option<SdkTracerProvider>);

impl TracerProviderGuard {
    /// `true` when spans are being exported.
    pub fn is_exporting(&self) -> bool {
        self.0.is_some()
    }
}

impl Drop for TracerProviderGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.0.take()
            && let Err(e) = provider.shutdown()
        {
            eprintln!("[boss] span exporter shutdown failed: {e}");
        }
    }
}

fn build_provider(service_name: &str) -> Option<SdkTracerProvider> {
    let endpoint = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").ok()?;

    let exporter = match opentelemetry_otlp::SpanExporter::builder()
        .with_http()
        .with_endpoint(endpoint)
        .build()
    {
        Ok(exporter) => exporter,
        Err(e) => {
            eprintln!("[boss] span export disabled: {e}");
            return None;
        }
    };

    let resource = Resource::builder()
        .with_service_name(service_name.to_string())
        .build();

    // Spans are rare, so the blocking simple exporter keeps the control
    // loop free of an async runtime.
    Some(
        SdkTracerProvider::builder()
            .with_resource(resource)
            .with_simple_exporter(exporter)
            .build(),
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// Driver display
// ─────────────────────────────────────────────────────────────────────────────

/// Number of text lines on the driver station.
pub const DISPLAY_LINES: usize = 6;
/// Characters per line; longer text is truncated.
pub const DISPLAY_WIDTH: usize = 21;

/// Six lines of operator-facing text.  Lines are numbered from 1.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DriverDisplay {
    lines: [String; DISPLAY_LINES],
}

impl DriverDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite line `n`.  Out-of-range line numbers are ignored.
    pub fn set_line(&mut self, n: usize, text: impl AsRef<str>) {
        if let Some(line) = n.checked_sub(1).and_then(|i| self.lines.get_mut(i)) {
            *line = text.as_ref().chars().take(DISPLAY_WIDTH).collect();
        }
    }

    pub fn line(&self, n: usize) -> &str {
        n.checked_sub(1)
            .and_then(|i| self.lines.get(i))
            .map_or("", String::as_str)
    }

    pub fn clear(&mut self) {
        for line in &mut self.lines {
            line.clear();
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}
