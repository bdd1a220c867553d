use log::{Level, LevelFilter, SetLoggerError};

pub fn init() -> Result<(), SetLoggerError> {
    // The backend passes everything through; `log::max_level` does the filtering.
    console_log::init_with_level(Level::Trace)?;
    log::set_max_level(LevelFilter::Info);
    Ok(())
}

pub fn set_level(level: LevelFilter) {
    log::set_max_level(level);
    log::debug!("log level set to {level}");
}
