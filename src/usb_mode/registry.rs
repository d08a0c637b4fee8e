//! Mode resolution and write policy over the two mode records

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use super::store::ModeStore;
use super::{ModeSlot, UsbMode, UsbModeError, UsbModeStatus};

/// Resolves and changes the configured USB network mode
///
/// A temporary record, when it holds a valid mode, overrides the permanent
/// one. Every operation runs under one guard so concurrent requests cannot
/// interleave between reading and rewriting the two records.
pub struct UsbModeRegistry {
    store: Arc<dyn ModeStore>,
    guard: Mutex<()>,
}

impl UsbModeRegistry {
    pub fn new(store: Arc<dyn ModeStore>) -> Self {
        Self {
            store,
            guard: Mutex::new(()),
        }
    }

    /// Effective mode, `None` when neither record holds a valid mode
    pub fn effective_mode(&self) -> Option<UsbMode> {
        let _guard = self.guard.lock();
        self.resolve()
    }

    /// Effective mode together with temporary record presence
    pub fn status(&self) -> UsbModeStatus {
        let _guard = self.guard.lock();
        UsbModeStatus {
            mode: self.resolve(),
            is_temporary: self.store.exists(ModeSlot::Temporary),
        }
    }

    fn resolve(&self) -> Option<UsbMode> {
        if let Some(mode) = self.read_slot(ModeSlot::Temporary) {
            return Some(mode);
        }
        self.read_slot(ModeSlot::Permanent)
    }

    fn read_slot(&self, slot: ModeSlot) -> Option<UsbMode> {
        let raw = self.store.read(slot)?;
        match UsbMode::try_from(raw) {
            Ok(mode) => Some(mode),
            Err(_) => {
                debug!("Ignoring invalid value {} in {} mode record", raw, slot);
                None
            }
        }
    }

    /// Validate a raw mode value, then record it
    pub fn set_mode_value(&self, value: i32, permanent: bool) -> Result<(), UsbModeError> {
        let mode = UsbMode::try_from(value).map_err(|e| {
            warn!("Rejected invalid USB mode value: {}", value);
            e
        })?;
        self.set_mode(mode, permanent)
    }

    /// Record a mode change
    ///
    /// Temporary changes only touch the temporary record. Permanent changes
    /// write the permanent record first and drop the temporary one only once
    /// that succeeded; nothing is removed when the permanent write fails.
    pub fn set_mode(&self, mode: UsbMode, permanent: bool) -> Result<(), UsbModeError> {
        let _guard = self.guard.lock();

        if !permanent {
            self.write_slot(ModeSlot::Temporary, mode)?;
            info!("USB mode set temporarily: {} ({})", mode, mode.value());
            return Ok(());
        }

        self.write_slot(ModeSlot::Permanent, mode)?;

        if let Err(e) = self.store.remove(ModeSlot::Temporary) {
            // The permanent record is already committed. A leftover override
            // would shadow it, so pin the override to the same mode instead.
            warn!("Failed to remove temporary USB mode record: {}", e);
            match self.store.write(ModeSlot::Temporary, mode.value()) {
                Ok(()) => info!("Temporary USB mode record aligned to {}", mode),
                Err(e) => error!(
                    "Stale temporary USB mode record may shadow {}: {}",
                    mode, e
                ),
            }
        }

        info!("USB mode set permanently: {} ({})", mode, mode.value());
        Ok(())
    }

    /// Drop the temporary override, falling back to the permanent mode.
    ///
    /// Returns whether an override existed.
    pub fn clear_temporary(&self) -> Result<bool, UsbModeError> {
        let _guard = self.guard.lock();

        let existed = self.store.exists(ModeSlot::Temporary);
        self.store
            .remove(ModeSlot::Temporary)
            .map_err(|source| {
                warn!("Failed to remove temporary USB mode record: {}", source);
                UsbModeError::RemoveFailure {
                    slot: ModeSlot::Temporary,
                    source,
                }
            })?;

        if existed {
            info!("Temporary USB mode override cleared");
        }
        Ok(existed)
    }

    fn write_slot(&self, slot: ModeSlot, mode: UsbMode) -> Result<(), UsbModeError> {
        self.store.write(slot, mode.value()).map_err(|source| {
            error!("Failed to write {} USB mode record: {}", slot, source);
            UsbModeError::WriteFailure { slot, source }
        })
    }
}
