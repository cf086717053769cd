// RasterGL
// copyright zipxing@hotmail.com 2022~2025

//! Log module provides the logging bootstrap, reference
//! https://docs.rs/log4rs
//!
//! The library itself only talks to the `log` facade. Hosts that want
//! the records on disk call `init_log` once at startup.

use crate::error::Result;
#[cfg(file_log)]
use crate::error::RasterError;
use log::LevelFilter;

#[cfg(file_log)]
use log4rs::{
    append::file::FileAppender,
    config::{Appender, Config, Root},
    encode::pattern::PatternEncoder,
    filter::threshold::ThresholdFilter,
};

/// init logs system
///
/// On wasm the records go to the browser console and `file_path` is ignored.
#[allow(unused_variables)]
pub fn init_log(level: LevelFilter, file_path: &str) -> Result<()> {
    #[cfg(wasm)]
    {
        wasm_logger::init(wasm_logger::Config::new(level.to_level().unwrap_or(log::Level::Error)));
    }
    #[cfg(file_log)]
    {
        let logfile = FileAppender::builder()
            .encoder(Box::new(PatternEncoder::new(
                "{d(%Y-%m-%d %H:%M:%S)} {l} {t} {m}{n}",
            )))
            .build(file_path)
            .map_err(|e| RasterError::LogInit(e.to_string()))?;
        let config = Config::builder()
            .appender(
                Appender::builder()
                    .filter(Box::new(ThresholdFilter::new(level)))
                    .build("logfile", Box::new(logfile)),
            )
            .build(Root::builder().appender("logfile").build(level))
            .map_err(|e| RasterError::LogInit(e.to_string()))?;
        log4rs::init_config(config).map_err(|e| RasterError::LogInit(e.to_string()))?;
    }
    Ok(())
}
