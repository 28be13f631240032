//! napalm_get_facts - gather facts from a network device
//!
//! Runs one read-only getter per filter entry and publishes the results as
//! `ansible_facts`, every key prefixed with `napalm_`. The keys of the
//! `facts` getter are also flattened so `napalm_hostname`, `napalm_vendor`
//! and friends are directly accessible.
//!
//! ```yaml
//! - napalm_get_facts:
//!     provider: "{{ ios_provider }}"
//!     filter: [facts, route_to, interfaces]
//!     args:
//!       route_to:
//!         protocol: static
//!         destination: 8.8.8.8
//! ```

use super::common::{merge_provider, resolve_connection, OS_CHOICES};
use super::docs::{connection_options, ModuleDoc, OptionDoc, OptionType, ReturnDoc};
use super::session::DeviceSession;
use crate::driver::{DevOs, Getter, GetterArgs, NetworkDriver};
use crate::modules::{
    Module, ModuleContext, ModuleError, ModuleOutput, ModuleParams, ModuleResult, ParamExt,
};
use indexmap::IndexMap;
use serde_json::{json, Map, Value};
use tracing::debug;

const DEFAULT_FILTER: &str = "facts";

/// Parsed parameters for napalm_get_facts
#[derive(Debug, Clone)]
pub struct GetFactsParams {
    /// Getters to run, in order
    pub filter: Vec<Getter>,
    /// Keyword arguments per getter name
    pub args: Map<String, Value>,
    /// Collect unsupported getters instead of failing
    pub ignore_notimplemented: bool,
}

impl GetFactsParams {
    pub fn from_params(params: &ModuleParams) -> ModuleResult<Self> {
        let names = params
            .get_vec_string("filter")?
            .unwrap_or_else(|| vec![DEFAULT_FILTER.to_string()]);
        let filter = names
            .iter()
            .map(|name| {
                name.parse::<Getter>().map_err(|unknown| {
                    ModuleError::InvalidParameter(format!("filter not recognized: {}", unknown))
                })
            })
            .collect::<ModuleResult<Vec<_>>>()?;

        Ok(Self {
            filter,
            args: params.get_object("args")?.unwrap_or_default(),
            ignore_notimplemented: params
                .get_bool("ignore_notimplemented")?
                .unwrap_or(false),
        })
    }

    fn getter_args(&self, getter: Getter) -> GetterArgs {
        match self.args.get(getter.as_str()) {
            Some(Value::Object(kwargs)) => kwargs.clone(),
            _ => GetterArgs::new(),
        }
    }
}

/// Results of running the requested getters
#[derive(Debug, Default)]
struct Gathered {
    facts: IndexMap<Getter, Value>,
    not_implemented: Vec<String>,
}

fn gather(
    driver: &mut dyn NetworkDriver,
    params: &GetFactsParams,
    dev_os: DevOs,
) -> ModuleResult<Gathered> {
    let mut gathered = Gathered::default();

    for &getter in &params.filter {
        debug!(getter = %getter, "Running getter");
        match driver.get(getter, &params.getter_args(getter)) {
            Ok(result) => {
                gathered.facts.insert(getter, result);
            }
            Err(e) if e.is_not_implemented() => {
                if params.ignore_notimplemented {
                    gathered.not_implemented.push(getter.as_str().to_string());
                } else {
                    return Err(ModuleError::ExecutionFailed(format!(
                        "The filter {} is not supported in napalm-{} [{}()]",
                        getter,
                        dev_os,
                        getter.method_name()
                    )));
                }
            }
            Err(e) => {
                return Err(ModuleError::ExecutionFailed(format!(
                    "[{}] cannot retrieve device data: {}",
                    getter, e
                )))
            }
        }
    }

    gathered.not_implemented.sort();
    Ok(gathered)
}

/// Prefix every fact with `napalm_`, flattening the `facts` getter.
pub fn to_ansible_facts(facts: &IndexMap<Getter, Value>) -> Map<String, Value> {
    let mut published = Map::new();
    for (getter, value) in facts {
        if *getter == Getter::Facts {
            if let Value::Object(inner) = value {
                for (name, fact) in inner {
                    published.insert(format!("napalm_{}", name), fact.clone());
                }
            }
        }
        published.insert(format!("napalm_{}", getter), value.clone());
    }
    published
}

/// Module for gathering facts from a network device
pub struct NapalmGetFactsModule;

impl Module for NapalmGetFactsModule {
    fn name(&self) -> &'static str {
        "napalm_get_facts"
    }

    fn description(&self) -> &'static str {
        "Gathers facts from a network device via napalm"
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
        let options = GetFactsParams::from_params(&params)?;
        let connection = resolve_connection(&params, OS_CHOICES)?;
        let dev_os = connection.dev_os;

        let session = DeviceSession::connect(&context.drivers, &connection)?;
        let gathered = session.run(|driver| gather(driver, &options, dev_os))?;

        let ansible_facts = to_ansible_facts(&gathered.facts);
        let mut output = ModuleOutput::ok(format!(
            "Gathered {} from {}",
            gathered
                .facts
                .keys()
                .map(Getter::as_str)
                .collect::<Vec<_>>()
                .join(", "),
            connection.hostname
        ))
        .with_data("ansible_facts", Value::Object(ansible_facts));

        if options.ignore_notimplemented {
            output = output.with_data("not_implemented", json!(gathered.not_implemented));
        }
        Ok(output)
    }
}

pub(crate) fn documentation() -> ModuleDoc {
    ModuleDoc::new(
        "napalm_get_facts",
        "Gathers facts from a network device via napalm",
    )
    .description("Runs napalm getters on a device and returns their results as facts")
    .options(connection_options(Some(OS_CHOICES)))
    .option(
        "ignore_notimplemented",
        OptionDoc::new(
            OptionType::Bool,
            "Ignores NotImplementedError for filters which aren't supported by the driver. \
             Returns invalid filters in a list called not_implemented",
        )
        .default(json!(false)),
    )
    .option(
        "filter",
        OptionDoc::new(
            OptionType::List,
            "A list of facts to retrieve from a device and provided through ansible_facts. \
             Not all getters are implemented on all supported device types",
        )
        .default(json!([DEFAULT_FILTER])),
    )
    .option(
        "args",
        OptionDoc::new(
            OptionType::Dict,
            "Dictionary of kwargs arguments to pass to the filter. The outer key is the name \
             of the getter (same as the filter)",
        ),
    )
    .examples(
        r#"
- name: get facts from device
  napalm_get_facts:
    hostname: 10.0.0.1
    username: napalm
    dev_os: ios
    password: napalm
    filter: ['facts']

- name: Getters
  napalm_get_facts:
    provider:
      hostname: 10.0.0.1
      username: napalm
      password: napalm
      dev_os: ios
    filter:
      - lldp_neighbors_detail
      - interfaces

- name: get facts from device
  napalm_get_facts:
    hostname: 10.0.0.1
    username: napalm
    dev_os: eos
    password: napalm
    optional_args:
      port: 8443
    filter: ['facts', 'route_to', 'interfaces']
    args:
      route_to:
        protocol: static
        destination: 8.8.8.8
"#,
    )
    .returns(
        "changed",
        ReturnDoc::new("bool", "Always false, facts gathering does not change the device")
            .sample(json!(false)),
    )
    .returns(
        "ansible_facts",
        ReturnDoc::new("dict", "Facts gathered on the device provided via ansible_facts")
            .returned("certain keys are returned depending on filter"),
    )
    .returns(
        "not_implemented",
        ReturnDoc::new("list", "Sorted filters the driver does not implement")
            .returned("when ignore_notimplemented is true")
            .sample(json!(["bgp_neighbors"])),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::napalm::testing::{mock_device, mock_params};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_filter_parsing() {
        let params = mock_params(std::path::Path::new("/tmp"), json!({}));
        let parsed = GetFactsParams::from_params(&params).unwrap();
        assert_eq!(parsed.filter, vec![Getter::Facts]);

        let params = mock_params(
            std::path::Path::new("/tmp"),
            json!({"filter": ["facts", "bogus"]}),
        );
        let err = GetFactsParams::from_params(&params).unwrap_err();
        assert_eq!(err.to_string(), "filter not recognized: bogus");
    }

    #[test]
    fn test_invalid_ignore_flag_from_provider() {
        let params = merge_provider(&mock_params(
            std::path::Path::new("/tmp"),
            json!({"provider": {"ignore_notimplemented": "maybe"}}),
        ));
        let err = GetFactsParams::from_params(&params).unwrap_err();
        assert_eq!(err.to_string(), "ignore_notimplemented must be a boolean");
    }

    #[test]
    fn test_flattened_facts() {
        let mut facts = IndexMap::new();
        facts.insert(Getter::Facts, json!({"hostname": "r1", "vendor": "Cisco"}));
        facts.insert(Getter::Interfaces, json!({"Gi0/0": {"is_up": true}}));

        let published = to_ansible_facts(&facts);
        assert_eq!(published["napalm_hostname"], "r1");
        assert_eq!(published["napalm_vendor"], "Cisco");
        assert_eq!(published["napalm_facts"]["hostname"], "r1");
        assert_eq!(published["napalm_interfaces"]["Gi0/0"]["is_up"], true);
    }

    #[test]
    fn test_execute_against_mock() {
        let dir = mock_device(&[(
            "get_facts.1",
            r#"{"hostname": "r1", "os_version": "15.1", "vendor": "Cisco"}"#,
        )]);
        let params = mock_params(dir.path(), json!({"filter": ["facts"]}));

        let output = NapalmGetFactsModule
            .execute(&params, &ModuleContext::new())
            .unwrap();
        assert!(!output.changed);
        assert_eq!(output.data["ansible_facts"]["napalm_os_version"], "15.1");
        assert!(!output.data.contains_key("not_implemented"));
    }

    #[test]
    fn test_not_implemented_collected() {
        let dir = mock_device(&[("get_facts.1", r#"{"hostname": "r1"}"#)]);
        let params = mock_params(
            dir.path(),
            json!({
                "filter": ["vlans", "facts", "bgp_neighbors"],
                "ignore_notimplemented": true
            }),
        );

        let output = NapalmGetFactsModule
            .execute(&params, &ModuleContext::new())
            .unwrap();
        assert_eq!(
            output.data["not_implemented"],
            json!(["bgp_neighbors", "vlans"])
        );
        assert_eq!(output.data["ansible_facts"]["napalm_hostname"], "r1");
    }

    #[test]
    fn test_not_implemented_fails_by_default() {
        let dir = mock_device(&[]);
        let params = mock_params(dir.path(), json!({"filter": ["vlans"]}));

        let err = NapalmGetFactsModule
            .execute(&params, &ModuleContext::new())
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "The filter vlans is not supported in napalm-mock [get_vlans()]"
        );
    }

    #[test]
    fn test_getter_error() {
        let dir = mock_device(&[(
            "get_interfaces.1",
            r#"{"exception": "ConnectionClosedException", "message": "session dropped"}"#,
        )]);
        let params = mock_params(dir.path(), json!({"filter": ["interfaces"]}));

        let err = NapalmGetFactsModule
            .execute(&params, &ModuleContext::new())
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "[interfaces] cannot retrieve device data: ConnectionClosedException: session dropped"
        );
    }
}
