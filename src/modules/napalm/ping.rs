//! napalm_ping - ping a destination from a network device
//!
//! Only a subset of platforms implement ping, so the device OS allow-list is
//! narrower than for the other modules.

use super::common::{merge_provider, resolve_connection, PING_OS_CHOICES};
use super::docs::{connection_options, ModuleDoc, OptionDoc, OptionType, ReturnDoc};
use super::session::DeviceSession;
use crate::driver::PingOptions;
use crate::modules::{Module, ModuleContext, ModuleOutput, ModuleParams, ModuleResult, ParamExt};
use serde_json::json;

/// Parsed parameters for napalm_ping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PingParams {
    pub destination: String,
    pub options: PingOptions,
}

impl PingParams {
    pub fn from_params(params: &ModuleParams) -> ModuleResult<Self> {
        Ok(Self {
            destination: params.get_string_required("destination")?,
            options: PingOptions {
                source: params.get_string("source")?,
                ttl: params.get_string("ttl")?,
                // ping_timeout avoids clashing with the connection timeout
                timeout: params.get_string("ping_timeout")?,
                size: params.get_string("size")?,
                count: params.get_string("count")?,
                vrf: params.get_string("vrf")?,
            },
        })
    }
}

/// Module for executing ping on a network device
pub struct NapalmPingModule;

impl Module for NapalmPingModule {
    fn name(&self) -> &'static str {
        "napalm_ping"
    }

    fn description(&self) -> &'static str {
        "Executes ping on the device and returns response using napalm"
    }

    fn required_params(&self) -> &[&'static str] {
        &["destination"]
    }

    fn validate_params(&self, params: &ModuleParams) -> ModuleResult<()> {
        documentation().check_params(params)
    }

    fn execute(
        &self,
        params: &ModuleParams,
        context: &ModuleContext,
    ) -> ModuleResult<ModuleOutput> {
        let params = merge_provider(params);
        let ping = PingParams::from_params(&params)?;
        let connection = resolve_connection(&params, PING_OS_CHOICES)?;

        let session = DeviceSession::connect(&context.drivers, &connection)?;
        let results = session.run(|driver| Ok(driver.ping(&ping.destination, &ping.options)?))?;

        Ok(ModuleOutput::ok(format!(
            "Pinged {} from {}",
            ping.destination, connection.hostname
        ))
        .with_data("results", results))
    }
}

pub(crate) fn documentation() -> ModuleDoc {
    ModuleDoc::new(
        "napalm_ping",
        "Executes ping on the device and returns response using napalm",
    )
    .description(
        "This module logs into the device, issues a ping request, and returns the response",
    )
    .options(connection_options(Some(PING_OS_CHOICES)))
    .option(
        "destination",
        OptionDoc::new(OptionType::Str, "Host or IP address of the destination").required(),
    )
    .option(
        "source",
        OptionDoc::new(OptionType::Str, "Source address of echo request"),
    )
    .option(
        "ttl",
        OptionDoc::new(OptionType::Str, "Maximum number of hops"),
    )
    .option(
        "ping_timeout",
        OptionDoc::new(OptionType::Str, "Maximum seconds to wait after sending final packet"),
    )
    .option(
        "size",
        OptionDoc::new(OptionType::Str, "Size of request (bytes)"),
    )
    .option(
        "count",
        OptionDoc::new(OptionType::Str, "Number of ping request to send"),
    )
    .option(
        "vrf",
        OptionDoc::new(OptionType::Str, "vrf to source the echo request"),
    )
    .examples(
        r#"
- napalm_ping:
    hostname: 10.0.0.1
    username: napalm
    password: napalm
    dev_os: eos
    destination: 10.0.0.5
    vrf: MANAGEMENT
    count: 2

- napalm_ping:
    provider:
      hostname: 10.0.0.1
      username: napalm
      password: napalm
      dev_os: ios
    destination: 8.8.8.8
    count: 2
"#,
    )
    .returns(
        "changed",
        ReturnDoc::new("bool", "Always false").sample(json!(false)),
    )
    .returns(
        "results",
        ReturnDoc::new("dict", "Structured response data of ping").sample(json!({
            "success": {
                "packet_loss": 0,
                "probes_sent": 2,
                "results": [{"ip_address": "10.0.0.5", "rtt": 1.71}],
                "rtt_avg": 1.2215,
                "rtt_max": 1.71,
                "rtt_min": 0.733,
                "rtt_stddev": 0.4885
            }
        })),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::napalm::testing::{mock_device, mock_params};
    use pretty_assertions::assert_eq;
    use std::path::Path;

    #[test]
    fn test_ping_timeout_becomes_timeout() {
        let params = mock_params(
            Path::new("/tmp"),
            json!({"destination": "8.8.8.8", "ping_timeout": 3, "count": "2", "timeout": 30}),
        );
        let parsed = PingParams::from_params(&params).unwrap();
        assert_eq!(parsed.destination, "8.8.8.8");
        assert_eq!(parsed.options.timeout.as_deref(), Some("3"));
        assert_eq!(parsed.options.count.as_deref(), Some("2"));
        assert_eq!(parsed.options.vrf, None);
    }

    #[test]
    fn test_mock_not_in_allow_list() {
        let dir = mock_device(&[("ping.1", r#"{"success": {"packet_loss": 0}}"#)]);
        let params = mock_params(dir.path(), json!({"destination": "8.8.8.8"}));

        let err = NapalmPingModule
            .execute(&params, &ModuleContext::new())
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "dev_os is not set to ['eos', 'junos', 'ios', 'vyos', 'ros']"
        );
    }

    #[test]
    fn test_results_from_driver() {
        let dir = mock_device(&[("ping.1", r#"{"success": {"packet_loss": 0}}"#)]);
        let mut params = mock_params(dir.path(), json!({"destination": "8.8.8.8"}));
        params.insert("dev_os".to_string(), json!("eos"));

        let mut drivers = crate::driver::DriverRegistry::new();
        drivers.register(
            crate::driver::DevOs::Eos,
            crate::driver::mock::MockDriverFactory::default(),
        );
        let context = ModuleContext::new().with_drivers(std::sync::Arc::new(drivers));

        let output = NapalmPingModule.execute(&params, &context).unwrap();
        assert!(!output.changed);
        assert_eq!(output.data["results"]["success"]["packet_loss"], 0);
    }

    #[test]
    fn test_unavailable_driver() {
        let dir = mock_device(&[]);
        let mut params = mock_params(dir.path(), json!({"destination": "8.8.8.8"}));
        params.insert("dev_os".to_string(), json!("junos"));

        let err = NapalmPingModule
            .execute(&params, &ModuleContext::new())
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "cannot connect to device: driver unavailable for 'junos'"
        );
    }
}
