// Integration tests for the configuration store
//
// These tests verify the file-backed configuration flows including:
// - Factory template fallback when the file is missing
// - Default resolution for absent and zero-encoded fields
// - Round-trip stability of the canonical document
// - update_config stripping transport commands before persisting
// - Malformed updates leaving file and memory untouched
// - Schema migration via renew_config_file (and the never-downgrade rule)
// - The always-active exit handshake against the mode register
// - Storage errors surfacing as ConfigError::StorageUnavailable

use std::fs;

use evse_core::test_utils::{CountingRegisterWriter, TestDir};
use evse_core::{ConfigError, ConfigStore, MeterKind};

// Helper to build a store whose file lives inside the scratch directory
fn store_in(dir: &TestDir) -> ConfigStore {
    ConfigStore::new(dir.file("config.json"))
}

fn write_config(dir: &TestDir, body: &str) {
    fs::write(dir.file("config.json"), body).expect("Failed to write config file");
}

fn read_config(dir: &TestDir) -> String {
    fs::read_to_string(dir.file("config.json")).expect("Failed to read config file")
}

#[cfg(test)]
mod tests {
    use super::*;

    // ============================================================================
    // Test: Loading - factory template and defaults
    // ============================================================================

    #[test]
    fn test_missing_file_loads_factory_template() {
        let dir = TestDir::new("evse_config");
        let mut store = store_in(&dir);

        store.load().unwrap();

        assert!(store.is_loaded());
        assert!(!store.is_legacy());
        assert_eq!(store.schema_version(), 1);
        assert_eq!(store.wifi_ssid(), "EVSE-WiFi");
        assert!(store.wifi_access_point());
        assert_eq!(store.meter_kind(0), MeterKind::Sdm120);
        assert_eq!(store.system_max_install(), 10);
        assert_eq!(store.evse_max_current(0), 32);
        assert_eq!(store.evse_rse_value(0), 100);
        assert!(!store.rfid_enabled());

        // Loading the template does not create the file
        assert!(!dir.file("config.json").exists());
    }

    #[test]
    fn test_partial_file_resolves_documented_defaults() {
        let dir = TestDir::new("evse_config");
        write_config(
            &dir,
            r#"{"configversion":1,
                "wifi":{"ssid":"garage"},
                "meter":[{"usemeter":true,"metertype":"S0"}]}"#,
        );

        let mut store = store_in(&dir);
        store.load().unwrap();

        assert_eq!(store.wifi_ssid(), "garage");
        assert_eq!(store.meter_kind(0), MeterKind::Pulse);
        assert_eq!(store.meter_imp_per_kwh(0), 1000);
        assert_eq!(store.meter_pulse_length_ms(0), 30);
        assert_eq!(store.meter_price(0), 25.0);
        assert_eq!(store.ntp_server(), "pool.ntp.org");
        assert_eq!(store.system_hostname(), "evse-wifi");
    }

    #[test]
    fn test_garbage_file_content_is_a_parse_error() {
        let dir = TestDir::new("evse_config");
        write_config(&dir, "this is not json");

        let mut store = store_in(&dir);
        let result = store.load();

        assert!(matches!(result, Err(ConfigError::MalformedDocument(_))));
        assert!(!store.is_loaded());
    }

    // ============================================================================
    // Test: Round-trip stability
    // ============================================================================

    #[test]
    fn test_saved_document_reloads_identically() {
        let dir = TestDir::new("evse_config");
        write_config(
            &dir,
            r#"{"configversion":1,
                "wifi":{"ssid":"garage","wmode":true},
                "meter":[{"usemeter":true,"metertype":"S0","kwhimp":800}],
                "evse":[{"evseinstall":20,"alwaysactive":true}]}"#,
        );

        let mut first = store_in(&dir);
        first.load().unwrap();
        first.save_config_file(&first.to_json()).unwrap();

        let mut second = store_in(&dir);
        second.load().unwrap();

        assert_eq!(second.wifi_ssid(), "garage");
        assert_eq!(second.meter_imp_per_kwh(0), 800);
        assert_eq!(second.evse_max_current(0), 20);
        assert!(second.evse_always_active(0));
        assert_eq!(first.to_json(), second.to_json());
    }

    #[test]
    fn test_to_json_is_stable_across_calls() {
        let dir = TestDir::new("evse_config");
        let mut store = store_in(&dir);
        store.load().unwrap();

        assert_eq!(store.to_json(), store.to_json());
    }

    // ============================================================================
    // Test: update_config
    // ============================================================================

    #[test]
    fn test_update_config_applies_and_persists_without_command_key() {
        let dir = TestDir::new("evse_config");
        let mut store = store_in(&dir);
        store.load().unwrap();

        store
            .update_config(
                r#"{"command":"saveconfig","configversion":1,"wifi":{"ssid":"carport"}}"#,
            )
            .unwrap();

        assert_eq!(store.wifi_ssid(), "carport");

        let persisted = read_config(&dir);
        assert!(persisted.contains("carport"));
        assert!(
            !persisted.contains("command"),
            "Transport command must not reach storage: {}",
            persisted
        );
    }

    #[test]
    fn test_malformed_update_leaves_file_and_memory_untouched() {
        let dir = TestDir::new("evse_config");
        write_config(&dir, r#"{"configversion":1,"wifi":{"ssid":"garage"}}"#);

        let mut store = store_in(&dir);
        store.load().unwrap();
        let before = read_config(&dir);

        let result = store.update_config("{broken");

        assert!(matches!(result, Err(ConfigError::MalformedDocument(_))));
        assert_eq!(store.wifi_ssid(), "garage");
        assert_eq!(read_config(&dir), before);
    }

    // ============================================================================
    // Test: Schema migration
    // ============================================================================

    #[test]
    fn test_renew_migrates_legacy_file_once() {
        let dir = TestDir::new("evse_config");
        write_config(
            &dir,
            r#"{"wifi":{"ssid":"garage"},"evse":[{"maxinstall":20,"disableled":true}]}"#,
        );

        let mut store = store_in(&dir);
        store.load().unwrap();
        assert!(store.is_legacy());

        store.renew_config_file().unwrap();
        assert!(!store.is_legacy());
        assert_eq!(store.schema_version(), 1);

        let migrated = read_config(&dir);
        assert!(migrated.contains("\"configversion\":1"));
        assert!(migrated.contains("\"evseinstall\":20"));
        assert!(migrated.contains("\"ledconfig\":1"));
        assert!(!migrated.contains("maxinstall\":20"));
        assert!(!migrated.contains("disableled"));

        // A second renew is a no-op
        store.renew_config_file().unwrap();
        assert_eq!(read_config(&dir), migrated);
    }

    #[test]
    fn test_renew_never_downgrades_newer_files() {
        let dir = TestDir::new("evse_config");
        write_config(&dir, r#"{"configversion":99,"wifi":{"ssid":"garage"}}"#);

        let mut store = store_in(&dir);
        store.load().unwrap();
        let before = read_config(&dir);

        store.renew_config_file().unwrap();

        assert_eq!(store.schema_version(), 99);
        assert_eq!(read_config(&dir), before);
    }

    // ============================================================================
    // Test: Factory reset
    // ============================================================================

    #[test]
    fn test_factory_reset_removes_file_and_is_idempotent() {
        let dir = TestDir::new("evse_config");
        write_config(&dir, r#"{"configversion":1}"#);

        let store = store_in(&dir);
        store.factory_reset().unwrap();
        assert!(!dir.file("config.json").exists());

        // Missing file counts as success
        store.factory_reset().unwrap();
    }

    #[test]
    fn test_factory_reset_then_load_recovers_the_template() {
        let dir = TestDir::new("evse_config");
        write_config(&dir, r#"{"configversion":1,"wifi":{"ssid":"garage"}}"#);

        let mut store = store_in(&dir);
        store.load().unwrap();
        assert_eq!(store.wifi_ssid(), "garage");

        store.factory_reset().unwrap();
        store.load().unwrap();
        assert_eq!(store.wifi_ssid(), "EVSE-WiFi");
    }

    // ============================================================================
    // Test: Always-active exit handshake
    // ============================================================================

    #[test]
    fn test_update_pipeline_with_mode_handshake() {
        let dir = TestDir::new("evse_config");
        write_config(&dir, r#"{"configversion":1,"evse":[{"alwaysactive":true}]}"#);

        let mut store = store_in(&dir);
        store.load().unwrap();

        let incoming = r#"{"configversion":1,"evse":[{"alwaysactive":false,"evseinstall":16}]}"#;
        let mut registers = CountingRegisterWriter::failing_first(1);

        store.check_update_config(incoming, &mut registers).unwrap();
        assert_eq!(registers.attempts, 2);
        assert_eq!(registers.last_write, Some((2005, 16448)));

        store.update_config(incoming).unwrap();
        assert!(!store.evse_always_active(0));
        assert_eq!(store.evse_max_current(0), 16);
        assert!(read_config(&dir).contains("\"evseinstall\":16"));
    }

    #[test]
    fn test_rejected_handshake_blocks_the_update() {
        let dir = TestDir::new("evse_config");
        write_config(&dir, r#"{"configversion":1,"evse":[{"alwaysactive":true}]}"#);

        let mut store = store_in(&dir);
        store.load().unwrap();
        let before = read_config(&dir);

        let incoming = r#"{"configversion":1,"evse":[{"alwaysactive":false}]}"#;
        let mut registers = CountingRegisterWriter::always_failing();

        let result = store.check_update_config(incoming, &mut registers);
        assert!(matches!(
            result,
            Err(ConfigError::HardwareAckTimeout {
                register: 2005,
                attempts: 5
            })
        ));
        assert_eq!(registers.attempts, 5);

        // The caller never applies a rejected update; state is untouched
        assert!(store.evse_always_active(0));
        assert_eq!(read_config(&dir), before);
    }

    // ============================================================================
    // Test: Storage errors
    // ============================================================================

    #[test]
    fn test_save_into_missing_directory_is_a_storage_error() {
        let dir = TestDir::new("evse_config");
        let store = ConfigStore::new(dir.path().join("missing").join("config.json"));

        let result = store.save_config_file(r#"{"configversion":1}"#);
        assert!(matches!(result, Err(ConfigError::StorageUnavailable(_))));
    }

    #[test]
    fn test_print_config_file_needs_a_file() {
        let dir = TestDir::new("evse_config");
        let store = store_in(&dir);

        assert!(matches!(
            store.print_config_file(),
            Err(ConfigError::StorageUnavailable(_))
        ));

        write_config(&dir, r#"{"configversion":1}"#);
        store.print_config_file().unwrap();
        store.print_config();
    }
}
