//! Authenticated reverse proxy to the upstream data API.
//!
//! # Data Flow
//! ```text
//! /_api/<rest>?<query>
//!     → forward.rs (one upstream round-trip per call)
//!         → rewrite.rs (URL)
//!         → headers.rs (allow-list)
//!         → payload.rs (Structured | Raw)
//!     → Relayed (status, headers, payload) or ProxyError (error.rs)
//! ```

pub mod error;
pub mod forward;
pub mod headers;
pub mod payload;
pub mod rewrite;

pub use error::{ErrorBody, ProxyError};
pub use forward::{BuildError, Forwarder, Relayed};
pub use headers::{ForwardRule, HeaderPolicy, ODATA_ENTITY_ID, ODATA_VERSION};
pub use payload::Payload;
