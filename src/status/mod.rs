//! Status module: link classification and per-host politeness state
//!
//! # Components
//!
//! - `LinkStatus` / `classify`: the link classifier, a pure function of a fetch outcome
//! - `HostState`: per-host request pacing and concurrency tracking

mod host_state;
mod link_status;

// Re-export main types
pub use host_state::HostState;
pub use link_status::{
    classify, BrokenReason, ExclusionReason, FetchOutcome, HttpResponse, LinkStatus,
    StatusCategory, TransportErrorKind,
};
