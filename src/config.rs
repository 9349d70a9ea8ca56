//! Responder configuration parameters
//!
//! All tunable parameters for the PAwR responder.  Defaults: 100 ms
//! connectable advertising, a 10 s sync timeout and a "WWSJ PAwR Demo" marker
//! in the scan response.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::app::ports::AdvertisingTiming;

/// Longest marker that still fits next to the manufacturer header (31 - 8).
pub const MAX_MARKER_LEN: usize = 23;

/// How a transferred periodic sync is handled by the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum SyncReceiveMode {
    /// Ignore transfers.
    Ignore = 0,
    /// Synchronize to the transferred train.
    Synchronize = 1,
}

/// Which sync events the stack reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum SyncReporting {
    None = 0,
    All = 1,
}

/// Default parameters for receiving a periodic advertising sync transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReceiveParams {
    pub mode: SyncReceiveMode,
    /// Periodic events that may be skipped after a successful receive.
    pub skip: u16,
    /// Sync supervision timeout in 10 ms units.
    pub timeout_10ms: u16,
    pub reporting: SyncReporting,
}

/// Advertising interval and limits, in human units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvertisingConfig {
    pub interval_min_ms: u16,
    pub interval_max_ms: u16,
    /// Advertising duration in 10 ms units, 0 = until stopped.
    pub duration_10ms: u16,
    /// Maximum advertising events, 0 = unlimited.
    pub max_events: u8,
}

impl AdvertisingConfig {
    /// Convert to stack units (interval × 1.6).
    pub fn timing(&self) -> AdvertisingTiming {
        AdvertisingTiming {
            interval_min: ms_to_adv_units(self.interval_min_ms),
            interval_max: ms_to_adv_units(self.interval_max_ms),
            duration: self.duration_10ms,
            max_events: self.max_events,
        }
    }
}

fn ms_to_adv_units(ms: u16) -> u32 {
    u32::from(ms) * 8 / 5
}

/// Core responder configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponderConfig {
    // --- Sync transfer ---
    pub sync_receive: SyncReceiveParams,

    // --- Advertising ---
    pub advertising: AdvertisingConfig,
    /// AD flags for the main advertisement.
    pub ad_flags: u8,
    /// Bluetooth SIG company identifier carried in the scan response.
    pub company_id: u16,
    /// Marker that lets scanners recognise this device class.
    pub marker: heapless::String<MAX_MARKER_LEN>,

    // --- Responses ---
    /// Slot used until the central writes one.
    pub default_response_slot: u8,
    /// Restart advertising when the central disconnects without a sync transfer.
    pub readvertise_on_disconnect: bool,
}

impl Default for ResponderConfig {
    fn default() -> Self {
        let mut marker = heapless::String::new();
        // 14 bytes, always fits
        let _ = marker.push_str("WWSJ PAwR Demo");

        Self {
            // Sync transfer
            sync_receive: SyncReceiveParams {
                mode: SyncReceiveMode::Synchronize,
                skip: 0,
                timeout_10ms: 1000, // 10 s
                reporting: SyncReporting::All,
            },

            // Advertising
            advertising: AdvertisingConfig {
                interval_min_ms: 100,
                interval_max_ms: 100,
                duration_10ms: 0,
                max_events: 0,
            },
            ad_flags: 0x06, // LE General Discoverable | BR/EDR not supported
            company_id: 0x02FF, // Silicon Labs
            marker,

            // Responses
            default_response_slot: 0,
            readvertise_on_disconnect: false,
        }
    }
}

impl ResponderConfig {
    /// Range-check every field.  Invalid values are rejected, not clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let adv = &self.advertising;
        if !(20..=10_240).contains(&adv.interval_min_ms) {
            return Err(ConfigError::ValidationFailed("interval_min_ms out of 20..=10240"));
        }
        if !(20..=10_240).contains(&adv.interval_max_ms) {
            return Err(ConfigError::ValidationFailed("interval_max_ms out of 20..=10240"));
        }
        if adv.interval_min_ms > adv.interval_max_ms {
            return Err(ConfigError::ValidationFailed("interval_min_ms above interval_max_ms"));
        }
        if !(0x000A..=0x4000).contains(&self.sync_receive.timeout_10ms) {
            return Err(ConfigError::ValidationFailed("sync timeout out of 100 ms..=163.84 s"));
        }
        if self.sync_receive.skip > 0x01F3 {
            return Err(ConfigError::ValidationFailed("sync skip above 499"));
        }
        Ok(())
    }

    /// Encode as a compact postcard blob for persistent storage.
    pub fn to_blob(&self) -> Result<Vec<u8>, ConfigError> {
        postcard::to_allocvec(self).map_err(|_| ConfigError::Encode)
    }

    /// Decode and validate a blob written by [`Self::to_blob`].
    pub fn from_blob(bytes: &[u8]) -> Result<Self, ConfigError> {
        let config: Self = postcard::from_bytes(bytes).map_err(|_| ConfigError::Corrupted)?;
        config.validate()?;
        Ok(config)
    }
}

/// Errors from [`ResponderConfig::validate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// A field failed range validation; the text names the field.
    ValidationFailed(&'static str),
    /// A stored blob could not be decoded.
    Corrupted,
    Encode,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::Corrupted => f.write_str("stored configuration is corrupted"),
            Self::Encode => f.write_str("configuration could not be encoded"),
        }
    }
}
