//! Level Metering
//!
//! Real-time input level display for the capture screen. Runs only while
//! recording and shares nothing with the mixing pipeline.

pub mod level;

pub use level::{
    advance, measure, measure_bytes, LevelMeter, LevelSnapshot, LevelState, LevelStatus,
    Measurement, MeterConfig,
};
