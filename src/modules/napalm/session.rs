//! Device session lifecycle
//!
//! A session owns one driver for the duration of a module invocation and
//! moves through `Unopened -> Open -> Closed`. Once opened it is closed
//! exactly once: explicitly after the work succeeded, best effort when the
//! work failed, or on drop if neither happened.

use crate::driver::{ConnectionParams, DevOs, DriverRegistry, NetworkDriver};
use crate::modules::{ModuleError, ModuleResult};
use std::fmt;
use tracing::{debug, info, warn};

/// Lifecycle state of a [`DeviceSession`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unopened,
    Open,
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Unopened => write!(f, "unopened"),
            SessionState::Open => write!(f, "open"),
            SessionState::Closed => write!(f, "closed"),
        }
    }
}

/// A driver bound to one device for one module invocation
pub struct DeviceSession {
    driver: Box<dyn NetworkDriver>,
    hostname: String,
    dev_os: DevOs,
    state: SessionState,
}

impl DeviceSession {
    /// Construct the driver without connecting.
    pub fn new(registry: &DriverRegistry, params: &ConnectionParams) -> ModuleResult<Self> {
        let driver = registry
            .create(params)
            .map_err(|e| ModuleError::Connection(e.to_string()))?;
        Ok(Self {
            driver,
            hostname: params.hostname.clone(),
            dev_os: params.dev_os,
            state: SessionState::Unopened,
        })
    }

    /// Construct the driver and open the connection.
    pub fn connect(registry: &DriverRegistry, params: &ConnectionParams) -> ModuleResult<Self> {
        let mut session = Self::new(registry, params)?;
        session.open()?;
        Ok(session)
    }

    /// Open the connection. A failed open leaves nothing to close.
    pub fn open(&mut self) -> ModuleResult<()> {
        if self.state != SessionState::Unopened {
            return Err(ModuleError::ExecutionFailed(format!(
                "cannot open a session that is {}",
                self.state
            )));
        }
        match self.driver.open() {
            Ok(()) => {
                info!(hostname = %self.hostname, dev_os = %self.dev_os, "Connected to device");
                self.state = SessionState::Open;
                Ok(())
            }
            Err(e) => {
                self.state = SessionState::Closed;
                Err(ModuleError::Connection(e.to_string()))
            }
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn dev_os(&self) -> DevOs {
        self.dev_os
    }

    pub fn driver(&mut self) -> &mut dyn NetworkDriver {
        self.driver.as_mut()
    }

    /// Close the connection if it is open.
    pub fn close(&mut self) -> ModuleResult<()> {
        if self.state != SessionState::Open {
            return Ok(());
        }
        self.state = SessionState::Closed;
        self.driver
            .close()
            .map_err(|e| ModuleError::Disconnect(e.to_string()))?;
        info!(hostname = %self.hostname, "Closed device connection");
        Ok(())
    }

    fn close_quietly(&mut self) {
        if let Err(e) = self.close() {
            warn!(hostname = %self.hostname, error = %e, "Best-effort close failed");
        }
    }

    /// Run `work` against the open driver, then close the session.
    ///
    /// When `work` fails the session is still closed, but a close failure is
    /// only logged and the original error is returned.
    pub fn run<T, F>(mut self, work: F) -> ModuleResult<T>
    where
        F: FnOnce(&mut dyn NetworkDriver) -> ModuleResult<T>,
    {
        match work(self.driver.as_mut()) {
            Ok(value) => {
                self.close()?;
                Ok(value)
            }
            Err(e) => {
                debug!(error = %e, "Device operation failed, closing session");
                self.close_quietly();
                Err(e)
            }
        }
    }
}

impl Drop for DeviceSession {
    fn drop(&mut self) {
        self.close_quietly();
    }
}

impl fmt::Debug for DeviceSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceSession")
            .field("hostname", &self.hostname)
            .field("dev_os", &self.dev_os)
            .field("state", &self.state)
            .finish()
    }
}
