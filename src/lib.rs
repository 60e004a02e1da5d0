//! seismag - region-dependent local earthquake magnitude.
//!
//! The MLa processor classifies a hypocenter against named polygons from a
//! BNA boundary file and evaluates the attenuation formula registered for
//! that region. The MSmax processor evaluates a period-dependent surface-wave
//! formula on amplitudes picked by scanning band-passed trial periods.

pub mod amplitude;
pub mod boundary;
pub mod classifier;
pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod filter;
pub mod formulas;
pub mod models;
pub mod output;
pub mod processor;
pub mod surface;
