#![allow(dead_code)]

use log::LevelFilter;
use std::{env, fs, process};

pub fn init_logs() {
    let mut logger = env_logger::builder();
    logger
        .is_test(true)
        .format_file(true)
        .format_line_number(true);
    if env::var("RUST_LOG").is_err() {
        logger.filter_level(LevelFilter::Warn);
    }
    let _ = logger.try_init();
}

#[macro_export]
macro_rules! silent_logs {
    ($($code:tt)+) => {{
        let level = log::max_level();
        log::set_max_level(log::LevelFilter::Off);
        let result = { $($code)+ };
        log::set_max_level(level);
        result
    }};
}

/// A database file in the temp directory, removed when dropped.
pub struct TempDb {
    pub path: String,
}

impl TempDb {
    pub fn new(name: &str) -> Self {
        let path = env::temp_dir()
            .join(format!("tabula-{}-{}.sqlite", name, process::id()))
            .to_string_lossy()
            .into_owned();
        let result = Self { path };
        result.remove();
        result
    }

    fn remove(&self) {
        for suffix in ["", "-journal", "-wal", "-shm"] {
            let _ = fs::remove_file(format!("{}{}", self.path, suffix));
        }
    }
}

impl Drop for TempDb {
    fn drop(&mut self) {
        self.remove();
    }
}
