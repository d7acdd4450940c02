// Declare modules at the root level
pub mod access;
pub mod config;
pub mod document;
pub mod error;
pub mod logging;
pub mod reader;
pub mod registers;
pub mod time;
pub mod validators;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

// Re-export commonly used types
pub use access::record::{
    AccessListEntry, AccessPage, AccessResult, AccessType, ScanResult, TagRecord,
};
pub use access::AccessStore;
pub use config::schema::{ConfigDocument, MeterKind};
pub use config::ConfigStore;
pub use error::{AccessError, ConfigError};
pub use reader::{CardData, CardReader};
pub use registers::{RegisterWriteError, RegisterWriter};
pub use time::{Clock, FixedClock, SystemClock};
