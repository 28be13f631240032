//! Network driver boundary
//!
//! This module defines the contract between the napalm modules and the vendor
//! drivers that actually talk to devices. A driver is looked up by device OS
//! tag in a [`DriverRegistry`], constructed from resolved
//! [`ConnectionParams`], opened, used and closed. All transport, parsing and
//! diffing work lives behind the [`NetworkDriver`] trait.
//!
//! Every operation except `open`/`close` has a default implementation that
//! returns [`DriverError::NotImplemented`], so a driver only implements what
//! its platform supports.
//!
//! # Example
//!
//! ```rust,ignore
//! use rustible_napalm::driver::{DevOs, DriverRegistry, Getter};
//!
//! let registry = DriverRegistry::with_builtins();
//! let mut device = registry.create(&params)?;
//! device.open()?;
//! let facts = device.get(Getter::Facts, &Default::default())?;
//! device.close()?;
//! ```

pub mod compliance;
#[cfg(feature = "mock")]
pub mod mock;

use crate::no_log::SecretString;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use similar::{ChangeTag, TextDiff};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Errors raised at the driver boundary.
#[derive(Error, Debug)]
pub enum DriverError {
    /// The operation exists but this driver does not support it.
    #[error("{method}() is not implemented by this driver")]
    NotImplemented { method: String },

    /// Driver construction or `open()` failed.
    #[error("{0}")]
    Connection(String),

    /// A call on an open connection failed.
    #[error("{0}")]
    Operation(String),

    /// A call was made on a connection that is not open.
    #[error("connection is not open")]
    Closed,

    /// No driver is registered for the requested device OS.
    #[error("driver unavailable for '{0}'")]
    Unavailable(DevOs),

    /// Canned or validation data could not be parsed.
    #[error("invalid data in '{path}': {message}")]
    InvalidData { path: PathBuf, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DriverError {
    pub fn not_implemented(method: impl Into<String>) -> Self {
        DriverError::NotImplemented {
            method: method.into(),
        }
    }

    /// Whether this is the distinguished "not implemented" kind.
    pub fn is_not_implemented(&self) -> bool {
        matches!(self, DriverError::NotImplemented { .. })
    }
}

/// Result type for driver operations
pub type DriverResult<T> = Result<T, DriverError>;

// ============================================================================
// Device OS tags
// ============================================================================

/// Device OS tag selecting a vendor driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DevOs {
    Eos,
    Junos,
    Iosxr,
    Fortios,
    Ios,
    Mock,
    Nxos,
    NxosSsh,
    Panos,
    Vyos,
    Ros,
}

impl DevOs {
    /// Every known tag, in documentation order.
    pub const ALL: &'static [DevOs] = &[
        DevOs::Eos,
        DevOs::Junos,
        DevOs::Iosxr,
        DevOs::Fortios,
        DevOs::Ios,
        DevOs::Mock,
        DevOs::Nxos,
        DevOs::NxosSsh,
        DevOs::Panos,
        DevOs::Vyos,
        DevOs::Ros,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DevOs::Eos => "eos",
            DevOs::Junos => "junos",
            DevOs::Iosxr => "iosxr",
            DevOs::Fortios => "fortios",
            DevOs::Ios => "ios",
            DevOs::Mock => "mock",
            DevOs::Nxos => "nxos",
            DevOs::NxosSsh => "nxos_ssh",
            DevOs::Panos => "panos",
            DevOs::Vyos => "vyos",
            DevOs::Ros => "ros",
        }
    }

    /// Comment leader used in this platform's configuration text, if known.
    pub fn comment_leader(&self) -> Option<char> {
        match self {
            DevOs::Junos => Some('#'),
            DevOs::Ios | DevOs::Iosxr | DevOs::Nxos | DevOs::NxosSsh | DevOs::Eos => Some('!'),
            _ => None,
        }
    }
}

impl fmt::Display for DevOs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DevOs {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DevOs::ALL
            .iter()
            .copied()
            .find(|os| os.as_str() == s)
            .ok_or_else(|| format!("unknown device OS '{}'", s))
    }
}

// ============================================================================
// Connection parameters
// ============================================================================

/// Default driver timeout in seconds
pub const DEFAULT_TIMEOUT: u64 = 60;

/// Fully resolved parameters a driver is constructed with.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionParams {
    pub hostname: String,
    pub username: String,
    pub password: SecretString,
    pub dev_os: DevOs,
    pub timeout: u64,
    /// Driver specific arguments, passed through untouched
    pub optional_args: serde_json::Map<String, Value>,
}

impl ConnectionParams {
    pub fn new(
        hostname: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<SecretString>,
        dev_os: DevOs,
    ) -> Self {
        Self {
            hostname: hostname.into(),
            username: username.into(),
            password: password.into(),
            dev_os,
            timeout: DEFAULT_TIMEOUT,
            optional_args: serde_json::Map::new(),
        }
    }

    pub fn with_timeout(mut self, timeout: u64) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_optional_arg(mut self, key: impl Into<String>, value: Value) -> Self {
        self.optional_args.insert(key.into(), value);
        self
    }
}

// ============================================================================
// Getters
// ============================================================================

/// Read-only driver operations selectable by name.
///
/// Filter names map one to one onto `get_<name>` driver methods; anything
/// outside this list is rejected when the name is parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Getter {
    ArpTable,
    BgpConfig,
    BgpNeighbors,
    BgpNeighborsDetail,
    Config,
    Environment,
    Facts,
    FirewallPolicies,
    Interfaces,
    InterfacesCounters,
    InterfacesIp,
    Ipv6NeighborsTable,
    LldpNeighbors,
    LldpNeighborsDetail,
    MacAddressTable,
    NetworkInstances,
    NtpPeers,
    NtpServers,
    NtpStats,
    Optics,
    ProbesConfig,
    ProbesResults,
    RouteTo,
    SnmpInformation,
    Users,
    Vlans,
}

impl Getter {
    pub const ALL: &'static [Getter] = &[
        Getter::ArpTable,
        Getter::BgpConfig,
        Getter::BgpNeighbors,
        Getter::BgpNeighborsDetail,
        Getter::Config,
        Getter::Environment,
        Getter::Facts,
        Getter::FirewallPolicies,
        Getter::Interfaces,
        Getter::InterfacesCounters,
        Getter::InterfacesIp,
        Getter::Ipv6NeighborsTable,
        Getter::LldpNeighbors,
        Getter::LldpNeighborsDetail,
        Getter::MacAddressTable,
        Getter::NetworkInstances,
        Getter::NtpPeers,
        Getter::NtpServers,
        Getter::NtpStats,
        Getter::Optics,
        Getter::ProbesConfig,
        Getter::ProbesResults,
        Getter::RouteTo,
        Getter::SnmpInformation,
        Getter::Users,
        Getter::Vlans,
    ];

    /// Filter name, e.g. `interfaces_ip`
    pub fn as_str(&self) -> &'static str {
        match self {
            Getter::ArpTable => "arp_table",
            Getter::BgpConfig => "bgp_config",
            Getter::BgpNeighbors => "bgp_neighbors",
            Getter::BgpNeighborsDetail => "bgp_neighbors_detail",
            Getter::Config => "config",
            Getter::Environment => "environment",
            Getter::Facts => "facts",
            Getter::FirewallPolicies => "firewall_policies",
            Getter::Interfaces => "interfaces",
            Getter::InterfacesCounters => "interfaces_counters",
            Getter::InterfacesIp => "interfaces_ip",
            Getter::Ipv6NeighborsTable => "ipv6_neighbors_table",
            Getter::LldpNeighbors => "lldp_neighbors",
            Getter::LldpNeighborsDetail => "lldp_neighbors_detail",
            Getter::MacAddressTable => "mac_address_table",
            Getter::NetworkInstances => "network_instances",
            Getter::NtpPeers => "ntp_peers",
            Getter::NtpServers => "ntp_servers",
            Getter::NtpStats => "ntp_stats",
            Getter::Optics => "optics",
            Getter::ProbesConfig => "probes_config",
            Getter::ProbesResults => "probes_results",
            Getter::RouteTo => "route_to",
            Getter::SnmpInformation => "snmp_information",
            Getter::Users => "users",
            Getter::Vlans => "vlans",
        }
    }

    /// Driver method name, e.g. `get_interfaces_ip`
    pub fn method_name(&self) -> String {
        format!("get_{}", self.as_str())
    }

    /// Parse a driver method name (`get_facts`) back into a getter.
    pub fn from_method_name(name: &str) -> Option<Self> {
        name.strip_prefix("get_").and_then(|n| n.parse().ok())
    }
}

impl fmt::Display for Getter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Getter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Getter::ALL
            .iter()
            .copied()
            .find(|g| g.as_str() == s)
            .ok_or_else(|| s.to_string())
    }
}

/// Keyword arguments for a single getter call
pub type GetterArgs = serde_json::Map<String, Value>;

// ============================================================================
// Operation argument types
// ============================================================================

/// Which configuration datastore to retrieve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConfigRetrieve {
    #[default]
    Running,
    Candidate,
    Startup,
}

impl ConfigRetrieve {
    pub const ALL: &'static [ConfigRetrieve] = &[
        ConfigRetrieve::Running,
        ConfigRetrieve::Candidate,
        ConfigRetrieve::Startup,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigRetrieve::Running => "running",
            ConfigRetrieve::Candidate => "candidate",
            ConfigRetrieve::Startup => "startup",
        }
    }
}

impl fmt::Display for ConfigRetrieve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ConfigRetrieve {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "running" => Ok(ConfigRetrieve::Running),
            "candidate" => Ok(ConfigRetrieve::Candidate),
            "startup" => Ok(ConfigRetrieve::Startup),
            _ => Err(format!(
                "value of type must be one of: running, candidate, startup, got: {}",
                s
            )),
        }
    }
}

/// Where a candidate configuration comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateSource {
    /// Path to a file on the control node
    File(PathBuf),
    /// Inline configuration text
    Text(String),
}

impl CandidateSource {
    /// Read the candidate text.
    pub fn read(&self) -> DriverResult<String> {
        match self {
            CandidateSource::File(path) => Ok(std::fs::read_to_string(path)?),
            CandidateSource::Text(text) => Ok(text.clone()),
        }
    }
}

/// Optional arguments for `ping`. Unset fields use the driver's defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PingOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vrf: Option<String>,
}

// ============================================================================
// Driver trait
// ============================================================================

/// A vendor driver bound to a single device.
pub trait NetworkDriver: Send {
    /// Open the connection to the device
    fn open(&mut self) -> DriverResult<()>;

    /// Close the connection to the device
    fn close(&mut self) -> DriverResult<()>;

    /// Run a read-only getter
    fn get(&mut self, getter: Getter, args: &GetterArgs) -> DriverResult<Value> {
        let _ = args;
        Err(DriverError::not_implemented(getter.method_name()))
    }

    /// Retrieve one configuration datastore as text.
    ///
    /// The default implementation goes through the `config` getter and
    /// picks the requested key out of its result.
    fn get_config(&mut self, retrieve: ConfigRetrieve) -> DriverResult<String> {
        let mut args = GetterArgs::new();
        args.insert("retrieve".to_string(), Value::from(retrieve.as_str()));
        let all = self.get(Getter::Config, &args)?;
        Ok(all
            .get(retrieve.as_str())
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string())
    }

    fn load_merge_candidate(&mut self, source: &CandidateSource) -> DriverResult<()> {
        let _ = source;
        Err(DriverError::not_implemented("load_merge_candidate"))
    }

    fn load_replace_candidate(&mut self, source: &CandidateSource) -> DriverResult<()> {
        let _ = source;
        Err(DriverError::not_implemented("load_replace_candidate"))
    }

    /// Diff between the loaded candidate and the running configuration
    fn compare_config(&mut self) -> DriverResult<String> {
        Err(DriverError::not_implemented("compare_config"))
    }

    fn commit_config(&mut self) -> DriverResult<()> {
        Err(DriverError::not_implemented("commit_config"))
    }

    fn discard_config(&mut self) -> DriverResult<()> {
        Err(DriverError::not_implemented("discard_config"))
    }

    /// Run CLI commands, returning a map of command to output
    fn cli(&mut self, commands: &[String]) -> DriverResult<Value> {
        let _ = commands;
        Err(DriverError::not_implemented("cli"))
    }

    fn ping(&mut self, destination: &str, options: &PingOptions) -> DriverResult<Value> {
        let _ = (destination, options);
        Err(DriverError::not_implemented("ping"))
    }

    /// Compare device state against a validation file.
    fn compliance_report(&mut self, validation_file: &Path) -> DriverResult<Value> {
        compliance::compliance_report(self, validation_file)
    }
}

/// Only changed lines, prefixed with `+`/`-`, the way drivers report
/// `compare_config`.
pub fn line_diff(before: &str, after: &str) -> String {
    let diff = TextDiff::from_lines(before, after);
    let mut out = String::new();
    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => '-',
            ChangeTag::Insert => '+',
            ChangeTag::Equal => continue,
        };
        out.push(sign);
        out.push_str(change.value().trim_end_matches('\n'));
        out.push('\n');
    }
    out.trim_end().to_string()
}

// ============================================================================
// Driver registry
// ============================================================================

/// Constructs drivers for one device OS.
pub trait DriverFactory: Send + Sync {
    fn create(&self, params: &ConnectionParams) -> DriverResult<Box<dyn NetworkDriver>>;
}

impl<F> DriverFactory for F
where
    F: Fn(&ConnectionParams) -> DriverResult<Box<dyn NetworkDriver>> + Send + Sync,
{
    fn create(&self, params: &ConnectionParams) -> DriverResult<Box<dyn NetworkDriver>> {
        self(params)
    }
}

/// Registry for looking up driver factories by device OS tag.
///
/// This replaces a runtime "is the driver library importable" check: a tag
/// with no registered factory yields [`DriverError::Unavailable`] before any
/// connection is attempted.
#[derive(Clone, Default)]
pub struct DriverRegistry {
    factories: HashMap<DevOs, Arc<dyn DriverFactory>>,
}

impl DriverRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Create a registry with the built-in drivers
    pub fn with_builtins() -> Self {
        #[allow(unused_mut)]
        let mut registry = Self::new();
        #[cfg(feature = "mock")]
        registry.register(DevOs::Mock, mock::MockDriverFactory::default());
        registry
    }

    /// Register (or replace) the factory for a device OS
    pub fn register<F>(&mut self, dev_os: DevOs, factory: F)
    where
        F: DriverFactory + 'static,
    {
        self.factories.insert(dev_os, Arc::new(factory));
    }

    pub fn contains(&self, dev_os: DevOs) -> bool {
        self.factories.contains_key(&dev_os)
    }

    /// Registered device OS tags, sorted by name
    pub fn available(&self) -> Vec<DevOs> {
        let mut tags: Vec<DevOs> = self.factories.keys().copied().collect();
        tags.sort_by_key(|os| os.as_str());
        tags
    }

    /// Look up the factory for a device OS
    pub fn get_network_driver(&self, dev_os: DevOs) -> DriverResult<Arc<dyn DriverFactory>> {
        self.factories
            .get(&dev_os)
            .cloned()
            .ok_or(DriverError::Unavailable(dev_os))
    }

    /// Construct an unopened driver for the given parameters
    pub fn create(&self, params: &ConnectionParams) -> DriverResult<Box<dyn NetworkDriver>> {
        self.get_network_driver(params.dev_os)?.create(params)
    }
}

impl fmt::Debug for DriverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriverRegistry")
            .field("drivers", &self.available())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullDriver;

    impl NetworkDriver for NullDriver {
        fn open(&mut self) -> DriverResult<()> {
            Ok(())
        }

        fn close(&mut self) -> DriverResult<()> {
            Ok(())
        }
    }

    #[test]
    fn test_dev_os_round_trip_names() {
        for os in DevOs::ALL {
            assert_eq!(os.as_str().parse::<DevOs>().unwrap(), *os);
        }
        assert!("cisco".parse::<DevOs>().is_err());
    }

    #[test]
    fn test_getter_names() {
        assert_eq!("facts".parse::<Getter>().unwrap(), Getter::Facts);
        assert_eq!(Getter::InterfacesIp.method_name(), "get_interfaces_ip");
        assert_eq!(
            Getter::from_method_name("get_lldp_neighbors"),
            Some(Getter::LldpNeighbors)
        );
        assert_eq!("bogus".parse::<Getter>(), Err("bogus".to_string()));
        assert_eq!(Getter::from_method_name("facts"), None);
    }

    #[test]
    fn test_default_operations_not_implemented() {
        let mut driver = NullDriver;
        let err = driver.get(Getter::Facts, &GetterArgs::new()).unwrap_err();
        assert!(err.is_not_implemented());
        assert_eq!(err.to_string(), "get_facts() is not implemented by this driver");
        assert!(driver.compare_config().unwrap_err().is_not_implemented());
        assert!(driver
            .ping("8.8.8.8", &PingOptions::default())
            .unwrap_err()
            .is_not_implemented());
    }

    #[test]
    fn test_registry_unavailable() {
        let registry = DriverRegistry::new();
        let params = ConnectionParams::new("10.0.0.1", "admin", "admin", DevOs::Ios);
        match registry.create(&params) {
            Err(DriverError::Unavailable(DevOs::Ios)) => {}
            Err(e) => panic!("unexpected error: {}", e),
            Ok(_) => panic!("expected unavailable driver"),
        }
    }

    #[test]
    fn test_registry_register_closure() {
        let mut registry = DriverRegistry::new();
        registry.register(
            DevOs::Eos,
            |_: &ConnectionParams| -> DriverResult<Box<dyn NetworkDriver>> {
                Ok(Box::new(NullDriver))
            },
        );
        assert!(registry.contains(DevOs::Eos));
        assert_eq!(registry.available(), vec![DevOs::Eos]);

        let params = ConnectionParams::new("sw1", "admin", "admin", DevOs::Eos);
        let mut driver = registry.create(&params).unwrap();
        assert!(driver.open().is_ok());
    }

    #[test]
    fn test_comment_leader() {
        assert_eq!(DevOs::Junos.comment_leader(), Some('#'));
        assert_eq!(DevOs::Eos.comment_leader(), Some('!'));
        assert_eq!(DevOs::Panos.comment_leader(), None);
    }
}
