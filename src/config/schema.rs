use serde_json::{json, Value};

use crate::document::{
    bool_or, element, field, has, i8_or, nonzero_f64, nonzero_i8, nonzero_u16, nonzero_u8, str_or,
    u8_or,
};

use super::defaults;

/// WiFi group (`wifi`)
#[derive(Debug, Clone, PartialEq)]
pub struct WifiConfig {
    pub bssid: String,
    pub ssid: String,
    /// True when the device runs its own access point (`wmode`)
    pub access_point: bool,
    pub password: String,
    pub static_ip: bool,
    pub ip: String,
    pub subnet: String,
    pub gateway: String,
    pub dns: String,
}

/// Energy meter group (`meter[]`)
#[derive(Debug, Clone, PartialEq)]
pub struct MeterConfig {
    pub enabled: bool,
    /// Raw type tag from the file ("S0", "SDM120", "SDM630" or empty)
    pub meter_type: String,
    /// Energy price in cents per kWh
    pub price: f64,
    pub interrupt_pin: u8,
    pub imp_per_kwh: u16,
    pub pulse_length_ms: u16,
    pub phase_count: u8,
    pub factor: u8,
}

/// RFID reader group (`rfid`)
#[derive(Debug, Clone, PartialEq)]
pub struct RfidConfig {
    pub enabled: bool,
    pub select_pin: u8,
    pub antenna_gain: i8,
}

/// Time source group (`ntp`)
#[derive(Debug, Clone, PartialEq)]
pub struct NtpConfig {
    pub timezone: i8,
    pub server: String,
    pub dst: bool,
}

/// Front-panel button group (`button[]`)
#[derive(Debug, Clone, PartialEq)]
pub struct ButtonConfig {
    pub enabled: bool,
    pub pin: u8,
}

/// System group (`system`)
#[derive(Debug, Clone, PartialEq)]
pub struct SystemConfig {
    pub hostname: String,
    pub admin_password: String,
    pub ws_auth: bool,
    pub debug: bool,
    /// Installed supply limit in amperes
    pub max_install: u8,
    pub evse_count: u8,
    pub logging: bool,
    pub api: bool,
}

/// Serial bus interface group (`modbus`)
#[derive(Debug, Clone, PartialEq)]
pub struct ModbusConfig {
    pub enabled: bool,
    pub rx_pin: u8,
    pub tx_pin: u8,
}

/// Charge controller group (`evse[]`)
#[derive(Debug, Clone, PartialEq)]
pub struct EvseConfig {
    pub modbus_id: u8,
    pub use_modbus: bool,
    pub serial_rx_pin: u8,
    pub serial_tx_pin: u8,
    /// Charging allowed without tag authorization
    pub always_active: bool,
    pub reset_current_after_charge: bool,
    /// Installed charge current limit in amperes (`evseinstall`)
    pub max_current: u8,
    pub avg_consumption: f64,
    pub led_config: u8,
    pub display_rotation: u8,
    pub remote: bool,
    pub rse_active: bool,
    /// Current percentage applied while the relay-sense input is active
    pub rse_value: u8,
}

/// Classified meter hardware attached to the charge point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MeterKind {
    /// No meter, or metering disabled
    #[default]
    None,
    /// S0 pulse counter on an interrupt pin
    Pulse,
    /// Eastron SDM120 over the serial bus
    Sdm120,
    /// Eastron SDM630 over the serial bus
    Sdm630,
}

impl MeterKind {
    /// Classify the persisted type tag.
    /// Returns `None` when the tag names a meter this firmware does not know.
    pub fn classify(meter_type: &str, enabled: bool) -> Option<Self> {
        if !enabled || meter_type.is_empty() {
            return Some(Self::None);
        }
        match meter_type {
            "S0" => Some(Self::Pulse),
            "SDM120" => Some(Self::Sdm120),
            "SDM630" => Some(Self::Sdm630),
            _ => None,
        }
    }

    /// True for meters read over the serial bus
    pub fn is_serial(&self) -> bool {
        matches!(self, Self::Sdm120 | Self::Sdm630)
    }
}

/// The whole typed configuration document.
///
/// Owned by the configuration store and replaced wholesale on load; decode
/// never fails, every absent field resolves to its documented default.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigDocument {
    /// Version tag found in the file (0 for pre-versioning files)
    pub version: u8,
    /// True when the file carried no `configversion` at all
    pub legacy: bool,
    pub wifi: WifiConfig,
    pub meters: Vec<MeterConfig>,
    pub rfid: RfidConfig,
    pub ntp: NtpConfig,
    pub buttons: Vec<ButtonConfig>,
    pub system: SystemConfig,
    pub modbus: ModbusConfig,
    pub evses: Vec<EvseConfig>,
}

impl Default for ConfigDocument {
    fn default() -> Self {
        Self::from_value(&Value::Null)
    }
}

impl ConfigDocument {
    /// Decode a raw JSON document, resolving every absent or legacy-encoded
    /// field to its documented default. This is the only place missing-field
    /// and legacy-key handling lives; schema evolution happens here.
    pub fn from_value(root: &Value) -> Self {
        let root = Some(root);
        Self {
            version: u8_or(field(root, "configversion"), 0),
            legacy: !has(root, "configversion"),
            wifi: decode_wifi(field(root, "wifi")),
            meters: decode_group_array(root, "meter", decode_meter),
            rfid: decode_rfid(field(root, "rfid")),
            ntp: decode_ntp(field(root, "ntp")),
            buttons: decode_group_array(root, "button", decode_button),
            system: decode_system(field(root, "system")),
            modbus: decode_modbus(field(root, "modbus")),
            evses: decode_group_array(root, "evse", decode_evse),
        }
    }

    /// Serialize back to the canonical document shape.
    ///
    /// Always writes the current schema version and the platform identifier,
    /// and always the current key spellings (`evseinstall`, `ledconfig`).
    pub fn to_value(&self) -> Value {
        json!({
            "configversion": defaults::CURRENT_CONFIG_VERSION,
            "hardwarerev": defaults::HARDWARE_REVISION,
            "wifi": {
                "bssid": self.wifi.bssid.clone(),
                "ssid": self.wifi.ssid.clone(),
                "wmode": self.wifi.access_point,
                "pswd": self.wifi.password.clone(),
                "staticip": self.wifi.static_ip,
                "ip": self.wifi.ip.clone(),
                "subnet": self.wifi.subnet.clone(),
                "gateway": self.wifi.gateway.clone(),
                "dns": self.wifi.dns.clone(),
            },
            "meter": self.meters.iter().map(meter_to_value).collect::<Vec<Value>>(),
            "rfid": {
                "userfid": self.rfid.enabled,
                "sspin": self.rfid.select_pin,
                "rfidgain": self.rfid.antenna_gain,
            },
            "ntp": {
                "timezone": self.ntp.timezone,
                "ntpip": self.ntp.server.clone(),
                "dst": self.ntp.dst,
            },
            "button": self.buttons.iter().map(button_to_value).collect::<Vec<Value>>(),
            "system": {
                "hostnm": self.system.hostname.clone(),
                "adminpwd": self.system.admin_password.clone(),
                "wsauth": self.system.ws_auth,
                "debug": self.system.debug,
                "maxinstall": self.system.max_install,
                "evsecount": self.system.evse_count,
                "logging": self.system.logging,
                "api": self.system.api,
            },
            "modbus": {
                "enabled": self.modbus.enabled,
                "rxpin": self.modbus.rx_pin,
                "txpin": self.modbus.tx_pin,
            },
            "evse": self.evses.iter().map(evse_to_value).collect::<Vec<Value>>(),
        })
    }
}

fn decode_group_array<T>(
    root: Option<&Value>,
    key: &str,
    decode: fn(Option<&Value>) -> T,
) -> Vec<T> {
    let len = field(root, key)
        .and_then(Value::as_array)
        .map(|items| items.len())
        .unwrap_or(0);
    if len == 0 {
        // Old files sometimes miss a whole group; one defaulted entry
        return vec![decode(None)];
    }
    (0..len)
        .map(|index| decode(element(field(root, key), index)))
        .collect()
}

fn decode_wifi(group: Option<&Value>) -> WifiConfig {
    WifiConfig {
        bssid: str_or(field(group, "bssid"), ""),
        ssid: str_or(field(group, "ssid"), defaults::DEFAULT_WIFI_SSID),
        access_point: bool_or(field(group, "wmode"), false),
        password: str_or(field(group, "pswd"), ""),
        static_ip: bool_or(field(group, "staticip"), false),
        ip: str_or(field(group, "ip"), ""),
        subnet: str_or(field(group, "subnet"), ""),
        gateway: str_or(field(group, "gateway"), ""),
        dns: str_or(field(group, "dns"), ""),
    }
}

fn decode_meter(group: Option<&Value>) -> MeterConfig {
    MeterConfig {
        enabled: bool_or(field(group, "usemeter"), false),
        meter_type: str_or(field(group, "metertype"), ""),
        price: nonzero_f64(field(group, "price"), defaults::DEFAULT_METER_PRICE),
        interrupt_pin: nonzero_u8(field(group, "intpin"), defaults::DEFAULT_METER_INT_PIN),
        imp_per_kwh: nonzero_u16(field(group, "kwhimp"), defaults::DEFAULT_METER_IMP_PER_KWH),
        pulse_length_ms: nonzero_u16(
            field(group, "implen"),
            defaults::DEFAULT_METER_PULSE_LENGTH_MS,
        ),
        phase_count: nonzero_u8(field(group, "meterphase"), defaults::DEFAULT_METER_PHASES),
        factor: nonzero_u8(field(group, "factor"), defaults::DEFAULT_METER_FACTOR),
    }
}

fn decode_rfid(group: Option<&Value>) -> RfidConfig {
    RfidConfig {
        enabled: bool_or(field(group, "userfid"), false),
        select_pin: nonzero_u8(field(group, "sspin"), defaults::DEFAULT_RFID_SELECT_PIN),
        antenna_gain: nonzero_i8(field(group, "rfidgain"), defaults::DEFAULT_RFID_GAIN),
    }
}

fn decode_ntp(group: Option<&Value>) -> NtpConfig {
    NtpConfig {
        // Zero is a legitimate offset (UTC), kept verbatim
        timezone: i8_or(field(group, "timezone"), 0),
        server: str_or(field(group, "ntpip"), defaults::DEFAULT_NTP_SERVER),
        dst: bool_or(field(group, "dst"), false),
    }
}

fn decode_button(group: Option<&Value>) -> ButtonConfig {
    ButtonConfig {
        enabled: bool_or(field(group, "usebutton"), false),
        pin: nonzero_u8(field(group, "buttonpin"), defaults::DEFAULT_BUTTON_PIN),
    }
}

fn decode_system(group: Option<&Value>) -> SystemConfig {
    SystemConfig {
        hostname: str_or(field(group, "hostnm"), defaults::DEFAULT_HOSTNAME),
        admin_password: str_or(field(group, "adminpwd"), defaults::DEFAULT_ADMIN_PASSWORD),
        ws_auth: bool_or(field(group, "wsauth"), false),
        debug: bool_or(field(group, "debug"), false),
        max_install: nonzero_u8(
            field(group, "maxinstall"),
            defaults::DEFAULT_MAX_INSTALL_CURRENT,
        ),
        evse_count: nonzero_u8(field(group, "evsecount"), defaults::EVSE_COUNT),
        logging: bool_or(field(group, "logging"), true),
        api: bool_or(field(group, "api"), true),
    }
}

fn decode_modbus(group: Option<&Value>) -> ModbusConfig {
    ModbusConfig {
        enabled: bool_or(field(group, "enabled"), true),
        rx_pin: nonzero_u8(field(group, "rxpin"), defaults::DEFAULT_MODBUS_RX_PIN),
        tx_pin: nonzero_u8(field(group, "txpin"), defaults::DEFAULT_MODBUS_TX_PIN),
    }
}

fn decode_evse(group: Option<&Value>) -> EvseConfig {
    // "evseinstall" is the current spelling; pre-0.4 files said "maxinstall"
    let max_current = if has(group, "evseinstall") {
        u8_or(field(group, "evseinstall"), 0)
    } else {
        u8_or(field(group, "maxinstall"), 0)
    };

    // "ledconfig" replaced the pre-0.4 "disableled" flag; a present
    // ledconfig wins over the old flag
    let led_config = if has(group, "ledconfig") {
        nonzero_u8(field(group, "ledconfig"), defaults::DEFAULT_LED_CONFIG)
    } else if bool_or(field(group, "disableled"), false) {
        1
    } else {
        defaults::DEFAULT_LED_CONFIG
    };

    EvseConfig {
        modbus_id: nonzero_u8(field(group, "mbid"), defaults::EVSE_MODBUS_ID),
        use_modbus: bool_or(field(group, "usemodbus"), true),
        serial_rx_pin: nonzero_u8(field(group, "serialrxpin"), defaults::DEFAULT_MODBUS_RX_PIN),
        serial_tx_pin: nonzero_u8(field(group, "serialtxpin"), defaults::DEFAULT_MODBUS_TX_PIN),
        always_active: bool_or(field(group, "alwaysactive"), false),
        reset_current_after_charge: bool_or(field(group, "resetcurrentaftercharge"), false),
        max_current,
        avg_consumption: nonzero_f64(
            field(group, "avgconsumption"),
            defaults::DEFAULT_AVG_CONSUMPTION_KWH,
        ),
        led_config,
        display_rotation: u8_or(field(group, "drotation"), 0),
        remote: bool_or(field(group, "remote"), false),
        rse_active: bool_or(field(group, "rseactive"), false),
        rse_value: u8_or(field(group, "rsevalue"), defaults::DEFAULT_RSE_VALUE),
    }
}

fn meter_to_value(meter: &MeterConfig) -> Value {
    // Pulse counter fields do not apply to serial meters; they serialize
    // as zero so a reload keeps resolving them to the documented defaults
    let serial = meter.meter_type.starts_with("SDM");
    json!({
        "usemeter": meter.enabled,
        "metertype": meter.meter_type.clone(),
        "price": meter.price,
        "intpin": if serial { 0 } else { meter.interrupt_pin },
        "kwhimp": if serial { 0 } else { meter.imp_per_kwh },
        "implen": if serial { 0 } else { meter.pulse_length_ms },
        "meterphase": meter.phase_count,
        "factor": meter.factor,
    })
}

fn button_to_value(button: &ButtonConfig) -> Value {
    json!({
        "usebutton": button.enabled,
        "buttonpin": button.pin,
    })
}

fn evse_to_value(evse: &EvseConfig) -> Value {
    json!({
        "mbid": evse.modbus_id,
        "usemodbus": evse.use_modbus,
        "serialrxpin": evse.serial_rx_pin,
        "serialtxpin": evse.serial_tx_pin,
        "alwaysactive": evse.always_active,
        "resetcurrentaftercharge": evse.reset_current_after_charge,
        "evseinstall": evse.max_current,
        "avgconsumption": evse.avg_consumption,
        "ledconfig": evse.led_config,
        "drotation": evse.display_rotation,
        "remote": evse.remote,
        "rseactive": evse.rse_active,
        "rsevalue": evse.rse_value,
    })
}
