//! Tag authorization store.
//!
//! One JSON record file per card UID under a flat directory. The
//! filesystem is the database: records provisioned or revoked from the
//! outside are honored on the very next lookup, and lookups never cache.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::DateTime;
use tracing::{debug, error, info, warn};

use crate::error::AccessError;
use crate::reader::{self, CardReader};
use crate::time::Clock;
use crate::validators::validate_uid;

pub mod record;

use record::{
    display_name, format_uid, AccessListEntry, AccessPage, AccessResult, AccessType, ScanResult,
    TagRecord,
};

/// Default location of the tag record directory
pub const DEFAULT_RECORDS_DIR: &str = "/P";

/// Entries per listing page
pub const PAGE_SIZE: usize = 15;

const MISS_COOLDOWN_MS: u64 = 50;
const READ_COOLDOWN_MS: u64 = 3000;

/// Directory-backed tag authorization store.
pub struct AccessStore {
    dir: PathBuf,
    next_poll_at_ms: u64,
}

impl Default for AccessStore {
    fn default() -> Self {
        Self::new(DEFAULT_RECORDS_DIR)
    }
}

impl AccessStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            next_poll_at_ms: 0,
        }
    }

    pub fn records_dir(&self) -> &Path {
        &self.dir
    }

    /// Authorize one UID against its record file.
    ///
    /// A missing record is [`AccessResult::Unknown`]; a record that exists
    /// but fails to parse denies access rather than looking unknown. UIDs
    /// that fail validation never touch storage.
    pub fn lookup(&self, uid: &str, now: i64) -> AccessResult {
        if let Err(err) = validate_uid(uid) {
            warn!(uid = %uid, error = %err, "Rejecting lookup for invalid UID");
            return AccessResult::Unknown;
        }

        let path = self.dir.join(uid);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(uid = %uid, "No record for tag");
                return AccessResult::Unknown;
            }
            Err(err) => {
                warn!(uid = %uid, error = %err, "Record file unreadable");
                return AccessResult::Unknown;
            }
        };

        let tag: TagRecord = match serde_json::from_str(&raw) {
            Ok(tag) => tag,
            Err(err) => {
                warn!(uid = %uid, error = %err, "Corrupt access record, treating as unauthorized");
                return AccessResult::Denied {
                    username: uid.to_string(),
                };
            }
        };

        let username = display_name(uid, tag.user.as_deref());
        let access_type = AccessType::from_raw(tag.acctype);
        let authorized = access_type.grants_access() && now < tag.validuntil;
        info!(uid = %uid, username = %username, authorized, "Tag lookup");

        if authorized {
            let expiry = DateTime::from_timestamp(tag.validuntil, 0)
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| tag.validuntil.to_string());
            debug!(uid = %uid, valid_until = %expiry, "Access granted");
            AccessResult::Granted {
                username,
                access_type,
                valid_until: tag.validuntil,
            }
        } else {
            AccessResult::Denied { username }
        }
    }

    /// One page of the record listing, in storage-native order.
    ///
    /// Individual unreadable files show up with their UID only instead of
    /// aborting the listing.
    pub fn list_page(&self, page: u32) -> Result<AccessPage, AccessError> {
        let page = page.max(1);

        let mut files = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.is_file() {
                files.push(path);
            }
        }

        let total = files.len();
        let list = files
            .iter()
            .skip((page as usize - 1) * PAGE_SIZE)
            .take(PAGE_SIZE)
            .map(|path| self.read_entry(path))
            .collect();

        Ok(AccessPage {
            page,
            list,
            total_pages: total.div_ceil(PAGE_SIZE) as u32,
            has_more: total > page as usize * PAGE_SIZE,
        })
    }

    fn read_entry(&self, path: &Path) -> AccessListEntry {
        let uid = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        let tag = fs::read_to_string(path)
            .ok()
            .and_then(|raw| serde_json::from_str::<TagRecord>(&raw).ok());

        match tag {
            Some(tag) => AccessListEntry {
                uid,
                username: tag.user,
                acctype: Some(tag.acctype),
                validuntil: Some(tag.validuntil),
            },
            None => {
                warn!(uid = %uid, "Record file unreadable, listing UID only");
                AccessListEntry {
                    uid,
                    username: None,
                    acctype: None,
                    validuntil: None,
                }
            }
        }
    }

    /// Consume one scan event from the reader.
    ///
    /// Within a cooldown window the reader is not touched at all. A failed
    /// or absent read arms a short 50 ms cooldown; a successful read halts
    /// the card, performs exactly one lookup and arms a 3000 ms cooldown
    /// so the same card is not authorized in a tight loop.
    pub fn read_picc(&mut self, reader: &mut dyn CardReader, clock: &dyn Clock) -> ScanResult {
        let now_ms = clock.uptime_millis();
        if now_ms < self.next_poll_at_ms {
            return ScanResult::not_read();
        }

        if !reader.card_present() {
            self.next_poll_at_ms = now_ms + MISS_COOLDOWN_MS;
            return ScanResult::not_read();
        }

        let card = match reader.read_card() {
            Some(card) => card,
            None => {
                debug!("Card present but serial read failed");
                self.next_poll_at_ms = now_ms + MISS_COOLDOWN_MS;
                return ScanResult::not_read();
            }
        };
        reader.halt_card();
        self.next_poll_at_ms = now_ms + READ_COOLDOWN_MS;

        let uid = format_uid(&card.uid);
        let result = self.lookup(&uid, clock.now_epoch_seconds());
        let username = result.username().unwrap_or(&uid).to_string();

        ScanResult {
            read: true,
            uid,
            card_type: card.card_type,
            known: result.is_known(),
            authorized: result.is_authorized(),
            username,
        }
    }

    /// Milliseconds until the next poll will touch the reader again
    pub fn cooldown_remaining_ms(&self, clock: &dyn Clock) -> u64 {
        self.next_poll_at_ms.saturating_sub(clock.uptime_millis())
    }

    /// Run the reader's hardware self-test once. Failures are reported,
    /// not retried.
    pub fn self_test(&self, reader: &mut dyn CardReader) -> bool {
        if reader.self_test() {
            info!("RFID reader self-test passed");
            true
        } else {
            error!("RFID reader self-test failed");
            false
        }
    }

    /// Reinitialize the reader after a self-test or a fault
    pub fn reset(&self, reader: &mut dyn CardReader) {
        reader.reset();
        debug!("RFID reader reset");
    }

    /// Human-readable reader firmware version for diagnostics
    pub fn reader_version(&self, reader: &mut dyn CardReader) -> String {
        let raw = reader.version_register();
        let version = format!("0x{:02x} ({})", raw, reader::describe_version(raw));
        info!(version = %version, "RFID reader firmware");
        version
    }
}
