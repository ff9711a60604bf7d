//! Observed device-mode container.
//!
//! The controller holds the only [`ModeWriter`]; every other task gets a
//! cheap, cloneable [`ModeWatch`] and polls it.  The value is a single
//! atomic byte plus a change counter, so readers never block the writer.
//!
//! ```text
//!   ConnectivityController ──(ModeWriter)──▶ ModeCell ◀──(ModeWatch)── telemetry,
//!                                                                       indicators,
//!                                                                       HTTP portal
//! ```

use core::sync::atomic::{AtomicU32, AtomicU8, Ordering};
use std::sync::Arc;

pub use crate::fsm::DeviceMode;

struct ModeCell {
    mode: AtomicU8,
    version: AtomicU32,
}

/// Exclusive write handle.  Not `Clone`: there is exactly one writer.
pub struct ModeWriter {
    cell: Arc<ModeCell>,
}

/// Read-only, cloneable view of the current mode.
#[derive(Clone)]
pub struct ModeWatch {
    cell: Arc<ModeCell>,
}

/// Create a new container starting in [`DeviceMode::Unconfigured`].
pub fn mode_channel() -> (ModeWriter, ModeWatch) {
    let cell = Arc::new(ModeCell {
        mode: AtomicU8::new(DeviceMode::Unconfigured as u8),
        version: AtomicU32::new(0),
    });
    (
        ModeWriter { cell: Arc::clone(&cell) },
        ModeWatch { cell },
    )
}

impl ModeWriter {
    pub(crate) fn publish(&self, mode: DeviceMode) {
        self.cell.mode.store(mode as u8, Ordering::Release);
        self.cell.version.fetch_add(1, Ordering::AcqRel);
    }

    /// A read-only view sharing this writer's cell.
    pub fn watch(&self) -> ModeWatch {
        ModeWatch {
            cell: Arc::clone(&self.cell),
        }
    }
}

impl ModeWatch {
    pub fn get(&self) -> DeviceMode {
        DeviceMode::from_index(self.cell.mode.load(Ordering::Acquire) as usize)
    }

    /// Incremented on every publish; compare two readings to detect a change.
    pub fn version(&self) -> u32 {
        self.cell.version.load(Ordering::Acquire)
    }

    pub fn is(&self, mode: DeviceMode) -> bool {
        self.get() == mode
    }
}
