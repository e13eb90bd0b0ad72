//! Application state shared across handlers.

use std::sync::Arc;

use binscan_core::storage::DROPPED_PINS_KEY;
use binscan_core::{
    Bin, BinRegistry, Config, Coordinate, GeofenceGate, HistoryStore, RewardCatalog, ScanCooldown,
    ScanPipeline, Storage, ValidCodeSet,
};
use tokio::sync::RwLock;

/// State handle passed to every handler.
pub type SharedState = Arc<RwLock<AppState>>;

/// Everything the API needs, loaded once at startup.
#[derive(Debug)]
pub struct AppState {
    /// Effective configuration.
    pub config: Config,
    /// JSON storage for user codes, history, and dropped pins.
    pub storage: Storage,
    /// Known bins, packaged plus dropped.
    pub bins: BinRegistry,
    /// Bundled and user-registered codes.
    pub codes: ValidCodeSet,
    /// Scan-screen proximity gate.
    pub gate: GeofenceGate,
    /// Rewards catalog.
    pub rewards: RewardCatalog,
    /// Cooldown, stamping, and history append.
    pub scans: ScanPipeline,
}

impl AppState {
    /// Build state from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if packaged or stored data cannot be loaded.
    pub fn from_config(config: Config) -> binscan_core::Result<Self> {
        let storage = config.storage()?;
        let mut bins = config.data.load_bins()?;
        if config.storage.persist_dropped_pins {
            let stored: Vec<Bin> = storage.load(DROPPED_PINS_KEY)?.unwrap_or_default();
            let restored = bins.restore_dropped(stored);
            tracing::info!(restored, "Restored dropped pins");
        }

        let codes = ValidCodeSet::load(config.data.load_codes()?, &storage)?;
        let gate = config.geofence_gate()?;
        let scans = ScanPipeline::new(
            ScanCooldown::new(config.scan_cooldown()),
            config.timestamp_style()?,
            HistoryStore::new(storage.clone()),
        );

        tracing::info!(
            bins = bins.len(),
            data_dir = %storage.data_dir().display(),
            geofence_threshold_meters = gate.threshold_meters(),
            "Application state ready"
        );

        Ok(Self {
            config,
            storage,
            bins,
            codes,
            gate,
            rewards: RewardCatalog::bundled()?,
            scans,
        })
    }

    /// Wrap in the shared handle.
    #[must_use]
    pub fn into_shared(self) -> SharedState {
        Arc::new(RwLock::new(self))
    }

    /// Drop a pin and save it when the configuration asks for it.
    ///
    /// Returns the new bin and whether it was written. A pin whose save fails
    /// is taken back out of the registry before the error is returned.
    ///
    /// # Errors
    ///
    /// Returns an error if no id is free or the save fails.
    pub fn drop_pin(&mut self, position: Coordinate) -> binscan_core::Result<(Bin, bool)> {
        let bin = self.bins.drop_pin(position)?.clone();
        match self.persist_dropped_pins() {
            Ok(persisted) => Ok((bin, persisted)),
            Err(e) => {
                self.bins.undo_drop();
                tracing::warn!(id = %bin.id, error = %e, "Dropped pin not saved, rolled back");
                Err(e)
            }
        }
    }

    fn persist_dropped_pins(&self) -> binscan_core::Result<bool> {
        if !self.config.storage.persist_dropped_pins {
            return Ok(false);
        }
        self.storage.save(DROPPED_PINS_KEY, self.bins.dropped())?;
        Ok(true)
    }
}
