//! Transparency module for the emotion engine.
//!
//! Tracks and exposes how much data the pipeline has processed, supporting
//! user trust without recording any readings.

pub mod log;

pub use log::{
    create_shared_log, create_shared_log_with_persistence, SharedTransparencyLog, TransparencyLog,
    TransparencyStats,
};
