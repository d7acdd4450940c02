//! Test utilities for generating test data and integration test helpers.
//!
//! This module is only available when the `test-utils` feature is enabled
//! or when running tests.

use std::collections::VecDeque;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::reader::{CardData, CardReader};
use crate::registers::{RegisterWriteError, RegisterWriter};

static TEST_DIR_COUNTER: AtomicU32 = AtomicU32::new(0);

/// Unique scratch directory under the system temp dir, removed on drop.
pub struct TestDir {
    path: PathBuf,
}

impl TestDir {
    pub fn new(prefix: &str) -> Self {
        let id = TEST_DIR_COUNTER.fetch_add(1, Ordering::Relaxed);
        let path = env::temp_dir().join(format!("{}_{}_{}", prefix, process::id(), id));
        fs::create_dir_all(&path).expect("Failed to create test directory");
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of a file inside the directory (not created)
    pub fn file(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }
}

impl Drop for TestDir {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

/// Write a tag record file named after the UID
pub fn write_record(dir: &TestDir, uid: &str, body: &str) {
    fs::write(dir.file(uid), body).expect("Failed to write record file");
}

/// JSON body for a tag record; `user: None` omits the key entirely
pub fn record_body(user: Option<&str>, acctype: i64, validuntil: i64) -> String {
    match user {
        Some(user) => format!(
            r#"{{"user":"{}","acctype":{},"validuntil":{}}}"#,
            user, acctype, validuntil
        ),
        None => format!(r#"{{"acctype":{},"validuntil":{}}}"#, acctype, validuntil),
    }
}

/// Scripted card reader.
///
/// Queued cards are consumed front to back: `card_present` answers true
/// while the queue is non-empty and `read_card` pops one scripted
/// outcome. Call counters expose how often the hardware was touched.
pub struct MockReader {
    queue: VecDeque<Option<CardData>>,
    pub present_polls: u32,
    pub read_calls: u32,
    pub halt_calls: u32,
    pub reset_calls: u32,
    pub self_test_result: bool,
    pub version: u8,
}

impl MockReader {
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
            present_polls: 0,
            read_calls: 0,
            halt_calls: 0,
            reset_calls: 0,
            self_test_result: true,
            version: 0x92,
        }
    }

    /// Queue a successful read of the given UID bytes
    pub fn push_card(&mut self, uid: &[u8], card_type: &str) {
        self.queue.push_back(Some(CardData {
            uid: uid.to_vec(),
            card_type: card_type.to_string(),
        }));
    }

    /// Queue a present card whose serial read fails
    pub fn push_failed_read(&mut self) {
        self.queue.push_back(None);
    }
}

impl Default for MockReader {
    fn default() -> Self {
        Self::new()
    }
}

impl CardReader for MockReader {
    fn card_present(&mut self) -> bool {
        self.present_polls += 1;
        !self.queue.is_empty()
    }

    fn read_card(&mut self) -> Option<CardData> {
        self.read_calls += 1;
        self.queue.pop_front().flatten()
    }

    fn halt_card(&mut self) {
        self.halt_calls += 1;
    }

    fn self_test(&mut self) -> bool {
        self.self_test_result
    }

    fn reset(&mut self) {
        self.reset_calls += 1;
    }

    fn version_register(&mut self) -> u8 {
        self.version
    }
}

/// Register writer that counts attempts and scripts failures.
pub struct CountingRegisterWriter {
    pub attempts: u32,
    pub last_write: Option<(u16, u16)>,
    fail_first: u32,
}

impl CountingRegisterWriter {
    /// Acknowledges every write
    pub fn succeeding() -> Self {
        Self {
            attempts: 0,
            last_write: None,
            fail_first: 0,
        }
    }

    /// Fails the first `failures` writes, acknowledges the rest
    pub fn failing_first(failures: u32) -> Self {
        Self {
            attempts: 0,
            last_write: None,
            fail_first: failures,
        }
    }

    /// Never acknowledges a write
    pub fn always_failing() -> Self {
        Self {
            attempts: 0,
            last_write: None,
            fail_first: u32::MAX,
        }
    }
}

impl RegisterWriter for CountingRegisterWriter {
    fn write_register(&mut self, register: u16, value: u16) -> Result<(), RegisterWriteError> {
        self.attempts += 1;
        if self.attempts <= self.fail_first {
            return Err(RegisterWriteError { register, value });
        }
        self.last_write = Some((register, value));
        Ok(())
    }
}

pub mod generators {
    use proptest::prelude::*;

    /// Generates record-file UIDs: lowercase unpadded hex of 4 to 10 bytes
    pub fn uid() -> impl Strategy<Value = String> {
        prop::collection::vec(any::<u8>(), 4..=10)
            .prop_map(|bytes| crate::access::record::format_uid(&bytes))
    }

    /// Generates raw access classes weighted toward the known set
    pub fn acctype() -> impl Strategy<Value = i64> {
        prop_oneof![Just(0i64), Just(1i64), Just(99i64), any::<i64>()]
    }

    /// Generates epoch timestamps between 1970 and 2100
    pub fn epoch_seconds() -> impl Strategy<Value = i64> {
        0i64..4_102_444_800i64
    }

    /// Generates partial configuration documents: every group is optional
    /// and group contents mix current and legacy key spellings, exercising
    /// the defaulting and migration paths.
    pub fn partial_config() -> impl Strategy<Value = String> {
        (
            prop::option::of(wifi_group()),
            prop::option::of(meter_group()),
            prop::option::of(system_group()),
            prop::option::of(evse_group()),
            any::<bool>(),
        )
            .prop_map(|(wifi, meter, system, evse, versioned)| {
                let mut root = serde_json::Map::new();
                if versioned {
                    root.insert("configversion".to_string(), serde_json::json!(1));
                }
                if let Some(wifi) = wifi {
                    root.insert("wifi".to_string(), wifi);
                }
                if let Some(meter) = meter {
                    root.insert("meter".to_string(), serde_json::json!([meter]));
                }
                if let Some(system) = system {
                    root.insert("system".to_string(), system);
                }
                if let Some(evse) = evse {
                    root.insert("evse".to_string(), serde_json::json!([evse]));
                }
                serde_json::Value::Object(root).to_string()
            })
    }

    fn wifi_group() -> impl Strategy<Value = serde_json::Value> {
        ("[a-z]{1,12}", any::<bool>())
            .prop_map(|(ssid, wmode)| serde_json::json!({ "ssid": ssid, "wmode": wmode }))
    }

    fn meter_group() -> impl Strategy<Value = serde_json::Value> {
        (
            any::<bool>(),
            prop_oneof![Just("S0"), Just("SDM120"), Just("SDM630"), Just("")],
            0u16..2000u16,
        )
            .prop_map(|(usemeter, metertype, kwhimp)| {
                serde_json::json!({
                    "usemeter": usemeter,
                    "metertype": metertype,
                    "kwhimp": kwhimp,
                })
            })
    }

    fn system_group() -> impl Strategy<Value = serde_json::Value> {
        ("[a-z]{1,16}", 0u8..33u8, any::<bool>()).prop_map(|(hostnm, maxinstall, debug)| {
            serde_json::json!({
                "hostnm": hostnm,
                "maxinstall": maxinstall,
                "debug": debug,
            })
        })
    }

    fn evse_group() -> impl Strategy<Value = serde_json::Value> {
        (any::<bool>(), 0u8..33u8, any::<bool>()).prop_map(
            |(alwaysactive, install, legacy_keys)| {
                if legacy_keys {
                    serde_json::json!({
                        "alwaysactive": alwaysactive,
                        "maxinstall": install,
                        "disableled": true,
                    })
                } else {
                    serde_json::json!({
                        "alwaysactive": alwaysactive,
                        "evseinstall": install,
                    })
                }
            },
        )
    }
}

pub mod helpers {
    /// True when `uid` can name a record file
    pub fn is_valid_uid(uid: &str) -> bool {
        crate::validators::validate_uid(uid).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_test_dir_is_removed_on_drop() {
        let path;
        {
            let dir = TestDir::new("evse_test_utils");
            path = dir.path().to_path_buf();
            assert!(path.exists());
        }
        assert!(!path.exists());
    }

    #[test]
    fn test_mock_reader_scripts_reads() {
        let mut reader = MockReader::new();
        assert!(!reader.card_present());

        reader.push_card(&[0x04, 0xa1], "MIFARE 1KB");
        assert!(reader.card_present());
        let card = reader.read_card().expect("queued card");
        assert_eq!(card.uid, vec![0x04, 0xa1]);
        assert!(!reader.card_present());
        assert_eq!(reader.present_polls, 3);
        assert_eq!(reader.read_calls, 1);
    }

    #[test]
    fn test_counting_register_writer_scripts_failures() {
        let mut writer = CountingRegisterWriter::failing_first(2);
        assert!(writer.write_register(2005, 16448).is_err());
        assert!(writer.write_register(2005, 16448).is_err());
        assert!(writer.write_register(2005, 16448).is_ok());
        assert_eq!(writer.attempts, 3);
        assert_eq!(writer.last_write, Some((2005, 16448)));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_generated_uids_are_valid(uid in generators::uid()) {
            prop_assert!(helpers::is_valid_uid(&uid));
        }

        #[test]
        fn prop_generated_configs_parse(raw in generators::partial_config()) {
            prop_assert!(serde_json::from_str::<serde_json::Value>(&raw).is_ok());
        }
    }
}
