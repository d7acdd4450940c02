//! File-backed configuration store.
//!
//! The whole device configuration lives in one JSON document on the data
//! partition. Loading decodes it into a typed [`ConfigDocument`] in one
//! pass; everything after that goes through typed accessors that resolve
//! absent data to documented defaults and never fail.

use std::fs;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::document;
use crate::error::ConfigError;
use crate::logging;
use crate::registers::RegisterWriter;

pub mod defaults;
pub mod schema;

use schema::{ButtonConfig, ConfigDocument, EvseConfig, MeterConfig, MeterKind};

/// Default location of the configuration file on the data partition
pub const DEFAULT_CONFIG_PATH: &str = "/config.json";

/// Holding register selecting the charge controller operating mode
pub const EVSE_MODE_REGISTER: u16 = 2005;

/// Mode register value for normal (authorization-gated) operation
pub const EVSE_MODE_NORMAL: u16 = 16448;

const REGISTER_WRITE_ATTEMPTS: u32 = 5;
const REGISTER_RETRY_DELAY: Duration = Duration::from_millis(150);

/// Configuration store backed by a single JSON file.
pub struct ConfigStore {
    path: PathBuf,
    doc: ConfigDocument,
    loaded: bool,
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new(DEFAULT_CONFIG_PATH)
    }
}

impl ConfigStore {
    /// Create a store over the given file path. Nothing is read until
    /// [`load`](Self::load) is called.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            doc: ConfigDocument::default(),
            loaded: false,
        }
    }

    /// Delete the persisted configuration file. A missing file counts as
    /// success. The in-memory document is untouched until the next load.
    pub fn factory_reset(&self) -> Result<(), ConfigError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                info!(path = %self.path.display(), "Configuration file removed");
                Ok(())
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %self.path.display(), "No configuration file to remove");
                Ok(())
            }
            Err(err) => Err(ConfigError::StorageUnavailable(err)),
        }
    }

    /// Load the persisted configuration file. A missing or unreadable file
    /// falls back to the built-in factory template.
    pub fn load(&mut self) -> Result<(), ConfigError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(
                    path = %self.path.display(),
                    error = %err,
                    "Configuration file unreadable, using factory defaults"
                );
                defaults::FACTORY_CONFIG.to_string()
            }
        };
        self.load_from_str(&raw)
    }

    /// Decode `raw` as the new configuration.
    ///
    /// On parse failure the previously loaded document stays in place.
    /// Runtime log verbosity follows the decoded `system.debug` flag.
    pub fn load_from_str(&mut self, raw: &str) -> Result<(), ConfigError> {
        let root = document::parse(raw)?;
        let doc = ConfigDocument::from_value(&root);
        if doc.legacy {
            info!("Configuration file predates versioning, migration pending");
        }
        logging::set_debug(doc.system.debug);
        self.doc = doc;
        self.loaded = true;
        Ok(())
    }

    /// Classify every configured meter, logging unknown type tags as
    /// errors. Returns false when any tag failed to classify.
    pub fn resolve_meters(&self) -> bool {
        let mut all_known = true;
        for (index, meter) in self.doc.meters.iter().enumerate() {
            if MeterKind::classify(&meter.meter_type, meter.enabled).is_none() {
                error!(
                    index,
                    meter_type = %meter.meter_type,
                    "Unknown meter type, treating as no meter"
                );
                all_known = false;
            }
        }
        all_known
    }

    /// Canonical JSON text of the in-memory document.
    pub fn to_json(&self) -> String {
        document::to_text(&self.doc.to_value())
    }

    /// Rewrite the configuration file in the current schema when the loaded
    /// document is older. Files tagged with a newer version than this
    /// firmware understands are left alone.
    pub fn renew_config_file(&mut self) -> Result<(), ConfigError> {
        if !self.loaded {
            return Err(ConfigError::NotLoaded);
        }
        let current = defaults::CURRENT_CONFIG_VERSION;
        if self.doc.version == current {
            return Ok(());
        }
        if self.doc.version > current {
            warn!(
                file_version = self.doc.version,
                supported = current,
                "Configuration file version is newer than this firmware, not rewriting"
            );
            return Ok(());
        }
        info!(
            from_version = self.doc.version,
            to_version = current,
            "Migrating configuration file"
        );
        self.save_config_file(&self.to_json())?;
        self.doc.version = current;
        self.doc.legacy = false;
        Ok(())
    }

    /// Apply `raw` as the new configuration and persist it. Nothing is
    /// applied or persisted when `raw` does not parse.
    pub fn update_config(&mut self, raw: &str) -> Result<(), ConfigError> {
        self.load_from_str(raw)?;
        self.save_config_file(raw)
    }

    /// Pre-update hardware hook.
    ///
    /// Leaving always-active mode needs the charge controller back in
    /// normal (authorization-gated) mode before the new document may be
    /// applied. One acknowledged register write is sufficient; when every
    /// attempt goes unacknowledged the update is rejected.
    pub fn check_update_config(
        &self,
        raw: &str,
        registers: &mut dyn RegisterWriter,
    ) -> Result<(), ConfigError> {
        let root = document::parse(raw)?;
        let incoming = ConfigDocument::from_value(&root);

        let leaving_always_active = self.evse_always_active(0)
            && !incoming.evses.first().map(|e| e.always_active).unwrap_or(false);
        if !leaving_always_active {
            return Ok(());
        }

        for attempt in 1..=REGISTER_WRITE_ATTEMPTS {
            match registers.write_register(EVSE_MODE_REGISTER, EVSE_MODE_NORMAL) {
                Ok(()) => {
                    info!(attempt, "Charge controller back in normal mode");
                    return Ok(());
                }
                Err(err) => {
                    warn!(attempt, error = %err, "Mode register write not acknowledged");
                    if attempt < REGISTER_WRITE_ATTEMPTS {
                        thread::sleep(REGISTER_RETRY_DELAY);
                    }
                }
            }
        }
        error!(
            register = EVSE_MODE_REGISTER,
            "Charge controller did not acknowledge mode change, rejecting update"
        );
        Err(ConfigError::HardwareAckTimeout {
            register: EVSE_MODE_REGISTER,
            attempts: REGISTER_WRITE_ATTEMPTS,
        })
    }

    /// Persist raw configuration text, stripping any embedded transport
    /// command key first.
    pub fn save_config_file(&self, raw: &str) -> Result<(), ConfigError> {
        let mut root = document::parse(raw)?;
        document::strip_command(&mut root);
        let text = document::to_text(&root);
        fs::write(&self.path, &text)?;
        // Write verification: the file must open for read afterwards
        fs::File::open(&self.path)?;
        debug!(
            path = %self.path.display(),
            bytes = text.len(),
            "Configuration file written"
        );
        Ok(())
    }

    /// Dump the persisted file text through the logger.
    pub fn print_config_file(&self) -> Result<(), ConfigError> {
        let raw = fs::read_to_string(&self.path)?;
        debug!(path = %self.path.display(), contents = %raw, "Configuration file");
        Ok(())
    }

    /// Dump the decoded document through the logger, group by group.
    pub fn print_config(&self) {
        debug!(
            version = self.doc.version,
            legacy = self.doc.legacy,
            loaded = self.loaded,
            "Configuration"
        );
        debug!(
            ssid = %self.doc.wifi.ssid,
            access_point = self.doc.wifi.access_point,
            static_ip = self.doc.wifi.static_ip,
            "WiFi"
        );
        for (index, meter) in self.doc.meters.iter().enumerate() {
            debug!(
                index,
                enabled = meter.enabled,
                meter_type = %meter.meter_type,
                price = meter.price,
                "Meter"
            );
        }
        debug!(
            enabled = self.doc.rfid.enabled,
            select_pin = self.doc.rfid.select_pin,
            gain = self.doc.rfid.antenna_gain,
            "RFID"
        );
        debug!(
            timezone = self.doc.ntp.timezone,
            server = %self.doc.ntp.server,
            dst = self.doc.ntp.dst,
            "NTP"
        );
        for (index, button) in self.doc.buttons.iter().enumerate() {
            debug!(index, enabled = button.enabled, pin = button.pin, "Button");
        }
        debug!(
            hostname = %self.doc.system.hostname,
            evse_count = self.doc.system.evse_count,
            max_install = self.doc.system.max_install,
            debug_mode = self.doc.system.debug,
            "System"
        );
        debug!(
            enabled = self.doc.modbus.enabled,
            rx_pin = self.doc.modbus.rx_pin,
            tx_pin = self.doc.modbus.tx_pin,
            "Modbus"
        );
        for (index, evse) in self.doc.evses.iter().enumerate() {
            debug!(
                index,
                always_active = evse.always_active,
                max_current = evse.max_current,
                led_config = evse.led_config,
                "EVSE"
            );
        }
    }

    fn meter(&self, meter: usize) -> Option<&MeterConfig> {
        self.doc.meters.get(meter)
    }

    fn button(&self, button: usize) -> Option<&ButtonConfig> {
        self.doc.buttons.get(button)
    }

    fn evse(&self, evse: usize) -> Option<&EvseConfig> {
        self.doc.evses.get(evse)
    }

    pub fn wifi_bssid(&self) -> &str {
        &self.doc.wifi.bssid
    }

    pub fn wifi_ssid(&self) -> &str {
        &self.doc.wifi.ssid
    }

    pub fn wifi_access_point(&self) -> bool {
        self.doc.wifi.access_point
    }

    pub fn wifi_password(&self) -> &str {
        &self.doc.wifi.password
    }

    pub fn wifi_static_ip(&self) -> bool {
        self.doc.wifi.static_ip
    }

    pub fn wifi_ip(&self) -> &str {
        &self.doc.wifi.ip
    }

    pub fn wifi_subnet(&self) -> &str {
        &self.doc.wifi.subnet
    }

    pub fn wifi_gateway(&self) -> &str {
        &self.doc.wifi.gateway
    }

    pub fn wifi_dns(&self) -> &str {
        &self.doc.wifi.dns
    }

    pub fn meter_enabled(&self, meter: usize) -> bool {
        self.meter(meter).map(|m| m.enabled).unwrap_or(false)
    }

    pub fn meter_type(&self, meter: usize) -> &str {
        self.meter(meter).map(|m| m.meter_type.as_str()).unwrap_or("")
    }

    pub fn meter_price(&self, meter: usize) -> f64 {
        self.meter(meter)
            .map(|m| m.price)
            .unwrap_or(defaults::DEFAULT_METER_PRICE)
    }

    pub fn meter_interrupt_pin(&self, meter: usize) -> u8 {
        self.meter(meter)
            .map(|m| m.interrupt_pin)
            .unwrap_or(defaults::DEFAULT_METER_INT_PIN)
    }

    pub fn meter_imp_per_kwh(&self, meter: usize) -> u16 {
        self.meter(meter)
            .map(|m| m.imp_per_kwh)
            .unwrap_or(defaults::DEFAULT_METER_IMP_PER_KWH)
    }

    pub fn meter_pulse_length_ms(&self, meter: usize) -> u16 {
        self.meter(meter)
            .map(|m| m.pulse_length_ms)
            .unwrap_or(defaults::DEFAULT_METER_PULSE_LENGTH_MS)
    }

    pub fn meter_phase_count(&self, meter: usize) -> u8 {
        self.meter(meter)
            .map(|m| m.phase_count)
            .unwrap_or(defaults::DEFAULT_METER_PHASES)
    }

    pub fn meter_factor(&self, meter: usize) -> u8 {
        self.meter(meter)
            .map(|m| m.factor)
            .unwrap_or(defaults::DEFAULT_METER_FACTOR)
    }

    /// Classified kind for one meter slot. Unknown type tags degrade to
    /// [`MeterKind::None`] here; [`resolve_meters`](Self::resolve_meters)
    /// is where they are reported.
    pub fn meter_kind(&self, meter: usize) -> MeterKind {
        self.meter(meter)
            .and_then(|m| MeterKind::classify(&m.meter_type, m.enabled))
            .unwrap_or_default()
    }

    pub fn rfid_enabled(&self) -> bool {
        self.doc.rfid.enabled
    }

    pub fn rfid_select_pin(&self) -> u8 {
        self.doc.rfid.select_pin
    }

    pub fn rfid_gain(&self) -> i8 {
        self.doc.rfid.antenna_gain
    }

    pub fn ntp_timezone(&self) -> i8 {
        self.doc.ntp.timezone
    }

    pub fn ntp_server(&self) -> &str {
        &self.doc.ntp.server
    }

    pub fn ntp_dst(&self) -> bool {
        self.doc.ntp.dst
    }

    pub fn button_enabled(&self, button: usize) -> bool {
        self.button(button).map(|b| b.enabled).unwrap_or(false)
    }

    pub fn button_pin(&self, button: usize) -> u8 {
        self.button(button)
            .map(|b| b.pin)
            .unwrap_or(defaults::DEFAULT_BUTTON_PIN)
    }

    pub fn system_hostname(&self) -> &str {
        &self.doc.system.hostname
    }

    pub fn system_admin_password(&self) -> &str {
        &self.doc.system.admin_password
    }

    pub fn system_ws_auth(&self) -> bool {
        self.doc.system.ws_auth
    }

    pub fn system_debug(&self) -> bool {
        self.doc.system.debug
    }

    pub fn system_max_install(&self) -> u8 {
        self.doc.system.max_install
    }

    /// Number of charge controllers. Pinned to 1 on this hardware
    /// generation regardless of the stored value.
    pub fn system_evse_count(&self) -> u8 {
        defaults::EVSE_COUNT
    }

    pub fn system_logging(&self) -> bool {
        self.doc.system.logging
    }

    pub fn system_api(&self) -> bool {
        self.doc.system.api
    }

    pub fn modbus_enabled(&self) -> bool {
        self.doc.modbus.enabled
    }

    pub fn modbus_rx_pin(&self) -> u8 {
        self.doc.modbus.rx_pin
    }

    pub fn modbus_tx_pin(&self) -> u8 {
        self.doc.modbus.tx_pin
    }

    /// Bus id of the charge controller. Pinned to 1 on single-controller
    /// builds regardless of the stored value.
    pub fn evse_modbus_id(&self, _evse: usize) -> u8 {
        defaults::EVSE_MODBUS_ID
    }

    pub fn evse_use_modbus(&self, evse: usize) -> bool {
        self.evse(evse).map(|e| e.use_modbus).unwrap_or(true)
    }

    pub fn evse_serial_rx_pin(&self, evse: usize) -> u8 {
        self.evse(evse)
            .map(|e| e.serial_rx_pin)
            .unwrap_or(defaults::DEFAULT_MODBUS_RX_PIN)
    }

    pub fn evse_serial_tx_pin(&self, evse: usize) -> u8 {
        self.evse(evse)
            .map(|e| e.serial_tx_pin)
            .unwrap_or(defaults::DEFAULT_MODBUS_TX_PIN)
    }

    pub fn evse_always_active(&self, evse: usize) -> bool {
        self.evse(evse).map(|e| e.always_active).unwrap_or(false)
    }

    pub fn evse_reset_current_after_charge(&self, evse: usize) -> bool {
        self.evse(evse)
            .map(|e| e.reset_current_after_charge)
            .unwrap_or(false)
    }

    pub fn evse_max_current(&self, evse: usize) -> u8 {
        self.evse(evse).map(|e| e.max_current).unwrap_or(0)
    }

    pub fn evse_avg_consumption(&self, evse: usize) -> f64 {
        self.evse(evse)
            .map(|e| e.avg_consumption)
            .unwrap_or(defaults::DEFAULT_AVG_CONSUMPTION_KWH)
    }

    pub fn evse_led_config(&self, evse: usize) -> u8 {
        self.evse(evse)
            .map(|e| e.led_config)
            .unwrap_or(defaults::DEFAULT_LED_CONFIG)
    }

    pub fn evse_display_rotation(&self, evse: usize) -> u8 {
        self.evse(evse).map(|e| e.display_rotation).unwrap_or(0)
    }

    pub fn evse_remote(&self, evse: usize) -> bool {
        self.evse(evse).map(|e| e.remote).unwrap_or(false)
    }

    pub fn evse_rse_active(&self, evse: usize) -> bool {
        self.evse(evse).map(|e| e.rse_active).unwrap_or(false)
    }

    pub fn evse_rse_value(&self, evse: usize) -> u8 {
        self.evse(evse)
            .map(|e| e.rse_value)
            .unwrap_or(defaults::DEFAULT_RSE_VALUE)
    }

    /// Status LED data pin, fixed on this board
    pub fn led_pin(&self) -> u8 {
        defaults::LED_PIN
    }

    /// Control-pilot interrupt pin, fixed on this board
    pub fn cp_interrupt_pin(&self) -> u8 {
        defaults::CP_INTERRUPT_PIN
    }

    /// Relay-sense input pin, fixed on this board
    pub fn rse_pin(&self) -> u8 {
        defaults::RSE_PIN
    }

    /// Schema version of the loaded document (0 before versioning)
    pub fn schema_version(&self) -> u8 {
        self.doc.version
    }

    /// True when the loaded file carried no version tag at all
    pub fn is_legacy(&self) -> bool {
        self.loaded && self.doc.legacy
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }
}
