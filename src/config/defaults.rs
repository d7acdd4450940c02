//! Documented defaults for every configuration field.
//!
//! Decode applies these exactly once (see `schema::ConfigDocument`), so the
//! typed accessors can stay trivial field reads. Values match what the
//! hardware shipped with; changing one here changes what absent fields in
//! old files resolve to.

/// Schema version written by this firmware generation
pub const CURRENT_CONFIG_VERSION: u8 = 1;

/// Platform identifier embedded in every serialized document
pub const HARDWARE_REVISION: &str = "ESP32";

// WiFi
pub const DEFAULT_WIFI_SSID: &str = "EVSE-WiFi";

// Meter
pub const DEFAULT_METER_PRICE: f64 = 25.0;
pub const DEFAULT_METER_INT_PIN: u8 = 17;
pub const DEFAULT_METER_IMP_PER_KWH: u16 = 1000;
pub const DEFAULT_METER_PULSE_LENGTH_MS: u16 = 30;
pub const DEFAULT_METER_PHASES: u8 = 1;
pub const DEFAULT_METER_FACTOR: u8 = 1;

// RFID
pub const DEFAULT_RFID_SELECT_PIN: u8 = 5;
pub const DEFAULT_RFID_GAIN: i8 = 112;

// NTP
pub const DEFAULT_NTP_SERVER: &str = "pool.ntp.org";

// Button
pub const DEFAULT_BUTTON_PIN: u8 = 16;

// System
pub const DEFAULT_HOSTNAME: &str = "evse-wifi";
pub const DEFAULT_ADMIN_PASSWORD: &str = "adminadmin";
pub const DEFAULT_MAX_INSTALL_CURRENT: u8 = 10;

// Modbus bus interface
pub const DEFAULT_MODBUS_RX_PIN: u8 = 22;
pub const DEFAULT_MODBUS_TX_PIN: u8 = 21;

// EVSE
pub const DEFAULT_AVG_CONSUMPTION_KWH: f64 = 15.0;
pub const DEFAULT_LED_CONFIG: u8 = 3;
pub const DEFAULT_RSE_VALUE: u8 = 100;

/// Fixed on this hardware generation: one EVSE on Modbus address 1
pub const EVSE_MODBUS_ID: u8 = 1;
pub const EVSE_COUNT: u8 = 1;

// Board wiring (not persisted)
pub const LED_PIN: u8 = 26;
pub const CP_INTERRUPT_PIN: u8 = 4;
pub const RSE_PIN: u8 = 2;

/// Built-in template used when no configuration file exists yet.
/// Ships an SDM120 meter profile with the RFID reader disabled; pulse
/// counter fields are zeroed because the serial meter does not use them.
pub const FACTORY_CONFIG: &str = r#"{
  "configversion": 1,
  "hardwarerev": "ESP32",
  "wifi": {
    "bssid": "",
    "ssid": "EVSE-WiFi",
    "wmode": true,
    "pswd": "",
    "staticip": false,
    "ip": "",
    "subnet": "",
    "gateway": "",
    "dns": ""
  },
  "meter": [
    {
      "usemeter": true,
      "metertype": "SDM120",
      "price": 25,
      "intpin": 0,
      "kwhimp": 0,
      "implen": 0,
      "meterphase": 1,
      "factor": 1
    }
  ],
  "rfid": {
    "userfid": false,
    "sspin": 5,
    "rfidgain": 112
  },
  "ntp": {
    "timezone": 1,
    "ntpip": "pool.ntp.org",
    "dst": false
  },
  "button": [
    {
      "usebutton": false,
      "buttonpin": 16
    }
  ],
  "system": {
    "hostnm": "evse-wifi",
    "adminpwd": "adminadmin",
    "wsauth": false,
    "debug": false,
    "maxinstall": 10,
    "evsecount": 1,
    "logging": true,
    "api": true
  },
  "modbus": {
    "enabled": true,
    "rxpin": 22,
    "txpin": 21
  },
  "evse": [
    {
      "mbid": 1,
      "usemodbus": true,
      "serialrxpin": 22,
      "serialtxpin": 21,
      "alwaysactive": false,
      "resetcurrentaftercharge": false,
      "evseinstall": 32,
      "avgconsumption": 15,
      "ledconfig": 3,
      "drotation": 0,
      "remote": false,
      "rseactive": false,
      "rsevalue": 100
    }
  ]
}"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_config_is_valid_json() {
        let value: serde_json::Value =
            serde_json::from_str(FACTORY_CONFIG).expect("factory template must parse");
        assert_eq!(value["configversion"].as_u64(), Some(1));
        assert_eq!(value["hardwarerev"].as_str(), Some(HARDWARE_REVISION));
    }

    #[test]
    fn test_factory_config_carries_current_version() {
        let value: serde_json::Value = serde_json::from_str(FACTORY_CONFIG).unwrap();
        assert_eq!(
            value["configversion"].as_u64(),
            Some(CURRENT_CONFIG_VERSION as u64)
        );
    }
}
