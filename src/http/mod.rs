//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, graceful shutdown)
//!     → pipeline.rs (correlation, normalizer, identity, interceptor, limits)
//!     → route handlers (entities, health, fallback)
//!     → extract.rs (extractors rejecting with AppError)
//!     → Send to client
//! ```

pub mod extract;
pub mod pipeline;
pub mod server;

pub use extract::ApiJson;
pub use pipeline::PipelineState;
pub use server::HttpServer;
