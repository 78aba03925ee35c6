//! Driver registration surface.
//!
//! [`SvcMemDriver`] owns the platform handle and the region table and exposes
//! the entry points the host OS calls: init, the ordered command table,
//! per-request IO, and abort notification.

use core::fmt;
use core::sync::atomic::{AtomicU32, Ordering};

use tracing::info;

use crate::bus::Platform;
use crate::dispatch::{command_table, dispatch, CommandHandler, COMMAND_TABLE_LEN};
use crate::request::{IoInfo, IoRequest};
use crate::{RegionTable, DEFAULT_REGION_TABLE};

/// Name the driver registers under unless configured otherwise.
pub const DEFAULT_DRIVER_NAME: &str = "svc-mem-drv";

/// Per-instance driver configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct DriverConfig {
    /// Registration name.
    pub name: String,
    /// Region table consulted by every request.
    pub regions: RegionTable,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_DRIVER_NAME.to_owned(),
            regions: DEFAULT_REGION_TABLE,
        }
    }
}

/// Identifier handed out when a driver instance is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DriverId(u32);

static NEXT_DRIVER_ID: AtomicU32 = AtomicU32::new(1);

impl DriverId {
    /// Raw identifier.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for DriverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Synchronous IO entry point, as the host's DoIO call sees a device.
pub trait Device {
    /// Runs one request to completion.
    fn do_io(&mut self, info: IoInfo) -> IoRequest;
}

/// The memory-access driver bound to one platform.
#[derive(Debug)]
pub struct SvcMemDriver<P: Platform> {
    platform: P,
    config: DriverConfig,
    id: Option<DriverId>,
}

impl<P: Platform> SvcMemDriver<P> {
    /// Binds a driver with the default configuration to `platform`.
    pub fn new(platform: P) -> Self {
        Self::with_config(platform, DriverConfig::default())
    }

    /// Binds a driver with `config` to `platform`.
    pub const fn with_config(platform: P, config: DriverConfig) -> Self {
        Self {
            platform,
            config,
            id: None,
        }
    }

    /// Opens the driver and returns its identifier.
    ///
    /// Repeated calls return the identifier assigned by the first.
    pub fn init(&mut self) -> DriverId {
        if let Some(id) = self.id {
            return id;
        }
        let id = DriverId(NEXT_DRIVER_ID.fetch_add(1, Ordering::Relaxed));
        self.id = Some(id);
        info!(driver = %self.config.name, %id, "driver opened");
        id
    }

    /// Identifier assigned by [`init`](Self::init), if it has run.
    #[must_use]
    pub const fn id(&self) -> Option<DriverId> {
        self.id
    }

    /// Abort notification. Requests complete synchronously, so there is
    /// nothing to cancel; the call is only logged.
    pub fn abort_io(&self, request: &IoRequest) {
        info!(
            driver = %self.config.name,
            command = request.info.command,
            unit = request.info.unit,
            "abort io"
        );
    }

    /// The ordered command table: write, read, status.
    #[must_use]
    pub fn command_table(&self) -> [CommandHandler<P>; COMMAND_TABLE_LEN] {
        command_table::<P>()
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// Shared access to the platform.
    #[must_use]
    pub const fn platform(&self) -> &P {
        &self.platform
    }

    /// Exclusive access to the platform, for staging caller buffers.
    pub fn platform_mut(&mut self) -> &mut P {
        &mut self.platform
    }

    /// Releases the platform.
    pub fn into_platform(self) -> P {
        self.platform
    }
}

impl<P: Platform> Device for SvcMemDriver<P> {
    fn do_io(&mut self, info: IoInfo) -> IoRequest {
        let mut request = IoRequest::new(info);
        let regions = &self.config.regions;
        match self.command_table().get(usize::from(info.command)) {
            Some(handler) => handler(&mut self.platform, regions, &mut request),
            None => dispatch(&mut self.platform, regions, &mut request),
        }
        request
    }
}
