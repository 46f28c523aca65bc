//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound request:
//!     → correlation.rs (resolve / generate x-correlation-id)
//!     → interceptor.rs (request record, span, response/error record)
//!     → logger.rs (LogRecord → injected LogSink)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → TracingSink → tracing subscriber (logging.rs) → stdout
//!     → MemorySink (tests, embedding)
//!     → Prometheus scrape
//! ```
//!
//! # Design Decisions
//! - Correlation id flows through request extensions, not globals
//! - The sink is the only shared state and is append-only

pub mod correlation;
pub mod interceptor;
pub mod logger;
pub mod logging;
pub mod metrics;

pub use correlation::{CorrelationId, CORRELATION_ID_HEADER};
pub use logger::{LogContext, LogLevel, LogRecord, LogSink, MemorySink, StructuredLogger, TracingSink};
