//! From a decoded QR string to a history entry.
//!
//! A scan goes through three checks in order: the scanner must have a
//! location fix, the scanning device must not be cooling down from its last
//! accepted scan, and the code must be recognized. Only a scan that passes
//! all three is stamped and appended to the history.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::codes::ValidCodeSet;
use crate::error::{BinscanError, Result};
use crate::geo::Coordinate;
use crate::history::{HistoryStore, ScanRecord, TimestampStyle};

/// Default pause between accepted scans from one device.
pub const DEFAULT_SCAN_COOLDOWN: Duration = Duration::from_secs(3);

/// Device key used when a request does not name its device.
pub const DEFAULT_DEVICE: &str = "default";

/// Per-device cooldown after an accepted scan.
#[derive(Debug, Clone)]
pub struct ScanCooldown {
    period: Duration,
    last_accepted: HashMap<String, DateTime<Utc>>,
}

impl Default for ScanCooldown {
    fn default() -> Self {
        Self::new(DEFAULT_SCAN_COOLDOWN)
    }
}

impl ScanCooldown {
    /// Create a cooldown with the given period. A zero period disables it.
    #[must_use]
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            last_accepted: HashMap::new(),
        }
    }

    /// Configured period.
    #[must_use]
    pub const fn period(&self) -> Duration {
        self.period
    }

    /// Time `device` must still wait at `now`, or `None` if it may scan.
    #[must_use]
    pub fn remaining(&self, device: &str, now: DateTime<Utc>) -> Option<Duration> {
        let last = self.last_accepted.get(device)?;
        // A clock that moved backwards counts as no time elapsed.
        let elapsed = (now - *last).to_std().unwrap_or(Duration::ZERO);
        self.period
            .checked_sub(elapsed)
            .filter(|left| !left.is_zero())
    }

    /// Start the cooldown for `device` at `now`.
    ///
    /// Devices whose cooldown has run out are forgotten here, so the map only
    /// holds devices that are still cooling down.
    pub fn mark(&mut self, device: &str, now: DateTime<Utc>) {
        let period = self.period;
        self.last_accepted.retain(|_, last| {
            (now - *last)
                .to_std()
                .map_or(true, |elapsed| elapsed < period)
        });
        self.last_accepted.insert(device.to_string(), now);
    }
}

/// A decoded scan as delivered by the camera collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanRequest {
    /// Decoded QR string, already sanitized by the caller.
    pub code: String,
    /// Device location at scan time, if known.
    pub position: Option<Coordinate>,
    /// Scanning device, for the cooldown.
    pub device: Option<String>,
}

/// What happened to a scan.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanOutcome {
    /// Accepted and appended to the history.
    Recorded(ScanRecord),
    /// The code is not recognized; nothing was recorded.
    Rejected {
        /// The unrecognized code.
        code: String,
    },
    /// The device scanned too recently; nothing was recorded.
    CoolingDown {
        /// How long until the device may scan again.
        retry_after: Duration,
    },
}

/// Validator, cooldown, and history composed into one scan step.
#[derive(Debug, Clone)]
pub struct ScanPipeline {
    cooldown: ScanCooldown,
    style: TimestampStyle,
    history: HistoryStore,
}

impl ScanPipeline {
    /// Create a pipeline.
    #[must_use]
    pub const fn new(cooldown: ScanCooldown, style: TimestampStyle, history: HistoryStore) -> Self {
        Self {
            cooldown,
            style,
            history,
        }
    }

    /// The history this pipeline appends to.
    #[must_use]
    pub const fn history(&self) -> &HistoryStore {
        &self.history
    }

    /// Process one scan at `now`.
    ///
    /// # Errors
    ///
    /// - [`BinscanError::LocationUnavailable`] when the request has no position
    /// - persistence errors if the history cannot be written
    pub fn process(
        &mut self,
        codes: &ValidCodeSet,
        request: ScanRequest,
        now: DateTime<Utc>,
    ) -> Result<ScanOutcome> {
        let position = request.position.ok_or(BinscanError::LocationUnavailable)?;
        let device = request.device.as_deref().unwrap_or(DEFAULT_DEVICE);

        if let Some(retry_after) = self.cooldown.remaining(device, now) {
            tracing::debug!(device, ?retry_after, "Scan ignored during cooldown");
            return Ok(ScanOutcome::CoolingDown { retry_after });
        }

        if !codes.is_valid(&request.code) {
            tracing::info!(device, code = %request.code, "Rejected unrecognized code");
            return Ok(ScanOutcome::Rejected { code: request.code });
        }

        let record = ScanRecord::new(position, Some(request.code), now, &self.style)?;
        self.history.append(&record)?;
        self.cooldown.mark(device, now);
        Ok(ScanOutcome::Recorded(record))
    }
}
