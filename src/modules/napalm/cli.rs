//! napalm_cli - run CLI commands on a device
//!
//! `args` holds the keyword arguments of the driver's `cli` call; only
//! `commands` is understood. The raw output of every command is returned
//! under `results`, keyed by command.

use super::common::{merge_provider, resolve_connection, OS_CHOICES};
use super::docs::{connection_options, ModuleDoc, OptionDoc, OptionType, ReturnDoc};
use super::session::DeviceSession;
use crate::modules::{
    Module, ModuleContext, ModuleError, ModuleOutput, ModuleParams, ModuleResult, ParamExt,
};
use serde_json::{json, Value};
use tracing::debug;

/// Parse the `args` dictionary into the list of commands to run.
pub fn parse_commands(params: &ModuleParams) -> ModuleResult<Vec<String>> {
    let args = params
        .get_object("args")?
        .ok_or_else(|| ModuleError::MissingParameter("args".to_string()))?;

    if let Some(unexpected) = args.keys().find(|key| key.as_str() != "commands") {
        return Err(ModuleError::InvalidParameter(format!(
            "cli() got an unexpected keyword argument '{}'",
            unexpected
        )));
    }

    match args.get("commands") {
        Some(Value::Array(commands)) => Ok(commands
            .iter()
            .map(|c| match c {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect()),
        Some(Value::String(command)) => Ok(vec![command.clone()]),
        Some(_) => Err(ModuleError::InvalidParameter(
            "commands must be a list of strings".to_string(),
        )),
        None => Err(ModuleError::InvalidParameter(
            "cli() missing 1 required positional argument: 'commands'".to_string(),
        )),
    }
}

/// Module for running CLI commands on a network device
pub struct NapalmCliModule;

impl Module for NapalmCliModule {
    fn name(&self) -> &'static str {
        "napalm_cli"
    }

    fn description(&self) -> &'static str {
        "Executes network device CLI commands and returns response using Napalm"
    }

    fn supports_check_mode(&self) -> bool {
        false
    }

    fn required_params(&self) -> &[&'static str] {
        &["args"]
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
        let commands = parse_commands(&params)?;
        let connection = resolve_connection(&params, OS_CHOICES)?;

        debug!(count = commands.len(), "Running CLI commands");
        let session = DeviceSession::connect(&context.drivers, &connection)?;
        let results = session.run(|driver| {
            driver
                .cli(&commands)
                .map_err(|e| ModuleError::ExecutionFailed(e.to_string()))
        })?;

        Ok(ModuleOutput::ok(format!(
            "Ran {} command(s) on {}",
            commands.len(),
            connection.hostname
        ))
        .with_data("results", results))
    }
}

pub(crate) fn documentation() -> ModuleDoc {
    ModuleDoc::new(
        "napalm_cli",
        "Executes network device CLI commands and returns response using Napalm",
    )
    .description(
        "Executes network device CLI commands and returns response using Napalm. Check mode \
         is not supported.",
    )
    .options(connection_options(Some(OS_CHOICES)))
    .option(
        "args",
        OptionDoc::new(
            OptionType::Dict,
            "Keyword arguments to pass to the cli method, the list of commands to run is \
             given as commands",
        )
        .required(),
    )
    .examples(
        r#"
- napalm_cli:
    hostname: 10.0.0.1
    username: napalm
    password: napalm
    dev_os: eos
    args:
      commands:
        - show version
        - show snmp chassis

- napalm_cli:
    provider:
      hostname: 10.0.0.1
      username: napalm
      password: napalm
      dev_os: eos
    args:
      commands:
        - show version
"#,
    )
    .returns(
        "changed",
        ReturnDoc::new("bool", "Always false").sample(json!(false)),
    )
    .returns(
        "results",
        ReturnDoc::new("dict", "Output of every command keyed by command")
            .sample(json!({"show snmp chassis": "Chassis: 1234\n"})),
    )
}
