//! napalm_get_config - retrieve a configuration datastore
//!
//! Returns the running, candidate or startup configuration as the result
//! message. An empty candidate or startup configuration falls back to the
//! running one. With `strip_comments` the platform's comment lines (which
//! usually carry timestamps) are removed so that saving to `dest` is
//! idempotent: the file is only rewritten when its SHA-1 differs.

use super::common::{
    expand_path, file_differs, merge_provider, resolve_connection, strip_comments,
    write_if_changed, OS_CHOICES,
};
use super::docs::{connection_options, ModuleDoc, OptionDoc, OptionType, ReturnDoc};
use super::session::DeviceSession;
use crate::driver::{line_diff, ConfigRetrieve, DevOs, NetworkDriver};
use crate::modules::{
    Diff, Module, ModuleContext, ModuleError, ModuleOutput, ModuleParams, ModuleResult, ParamExt,
};
use serde_json::json;
use std::path::PathBuf;
use tracing::debug;

/// Parsed parameters for napalm_get_config
#[derive(Debug, Clone)]
pub struct GetConfigParams {
    pub retrieve: ConfigRetrieve,
    pub dest: Option<PathBuf>,
    pub strip_comments: bool,
}

impl GetConfigParams {
    pub fn from_params(params: &ModuleParams) -> ModuleResult<Self> {
        let retrieve = match params.get_string("type")? {
            Some(kind) => kind
                .parse::<ConfigRetrieve>()
                .map_err(ModuleError::InvalidParameter)?,
            None => ConfigRetrieve::default(),
        };

        Ok(Self {
            retrieve,
            dest: params.get_string("dest")?.map(|d| expand_path(&d)),
            strip_comments: params.get_bool("strip_comments")?.unwrap_or(false),
        })
    }
}

fn retrieve_config(
    driver: &mut dyn NetworkDriver,
    params: &GetConfigParams,
    dev_os: DevOs,
) -> ModuleResult<String> {
    let failed = |e: &dyn std::fmt::Display| {
        ModuleError::ExecutionFailed(format!("cannot retrieve config: {}", e))
    };

    let mut config = driver.get_config(params.retrieve).map_err(|e| failed(&e))?;
    if config.is_empty() && params.retrieve != ConfigRetrieve::Running {
        debug!(retrieve = %params.retrieve, "Empty configuration, falling back to running");
        config = driver
            .get_config(ConfigRetrieve::Running)
            .map_err(|e| failed(&e))?;
    }

    if params.strip_comments {
        config = strip_comments(&config, dev_os);
    }
    Ok(config)
}

/// Module for retrieving device configuration
pub struct NapalmGetConfigModule;

impl Module for NapalmGetConfigModule {
    fn name(&self) -> &'static str {
        "napalm_get_config"
    }

    fn description(&self) -> &'static str {
        "Get and save to file config taken from a device supported by napalm"
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
        let options = GetConfigParams::from_params(&params)?;
        let connection = resolve_connection(&params, OS_CHOICES)?;
        let dev_os = connection.dev_os;

        let session = DeviceSession::connect(&context.drivers, &connection)?;
        let config = session.run(|driver| retrieve_config(driver, &options, dev_os))?;

        let Some(dest) = options.dest.as_ref() else {
            return Ok(ModuleOutput::ok(config));
        };

        let write_error =
            |e: std::io::Error| ModuleError::ExecutionFailed(format!("cannot retrieve config: {}", e));
        let before = context
            .diff_mode
            .then(|| std::fs::read_to_string(dest).unwrap_or_default());
        let changed = if context.check_mode {
            file_differs(&config, dest).map_err(write_error)?
        } else {
            write_if_changed(&config, dest).map_err(write_error)?
        };

        let mut output = ModuleOutput::from_changed(changed, config)
            .with_data("dest", json!(dest.display().to_string()));
        if let Some(before) = before.filter(|_| changed) {
            let details = line_diff(&before, &output.msg);
            output = output
                .with_diff(Diff::new(dest.display().to_string(), "device").with_details(details));
        }
        Ok(output)
    }
}

pub(crate) fn documentation() -> ModuleDoc {
    ModuleDoc::new(
        "napalm_get_config",
        "Get and save to file config taken from a device supported by napalm",
    )
    .description(
        "This module will get configuration from a device with any OS supported by napalm \
         and save it to a file.",
    )
    .options(connection_options(None))
    .option(
        "dest",
        OptionDoc::new(OptionType::Path, "File where to save retrieved configuration from a device."),
    )
    .option(
        "type",
        OptionDoc::new(
            OptionType::Str,
            "Config type to retrieve from device. If retrieved config is empty retrieve \
             running type instead.",
        )
        .default(json!("running"))
        .choices(ConfigRetrieve::ALL.iter().map(|r| r.as_str())),
    )
    .option(
        "strip_comments",
        OptionDoc::new(
            OptionType::Bool,
            "Strip comments with timestamps from the config to behave in idempotent way.",
        )
        .default(json!(false)),
    )
    .examples(
        r#"
- name: get the running config with stripped comments
  napalm_get_config:
    hostname: 10.0.0.1
    username: napalm
    dev_os: junos
    password: napalm
    dest: ../backup/r1.conf
    type: running
    strip_comments: true

- name: get the startup config using provider
  napalm_get_config:
    provider:
      hostname: 10.0.0.2
      username: napalm
      password: napalm
      dev_os: ios
    dest: ../backup/r2.conf
    type: startup
"#,
    )
    .returns(
        "changed",
        ReturnDoc::new("bool", "Whether the config was retrieved and saved to file")
            .sample(json!(true)),
    )
    .returns(
        "msg",
        ReturnDoc::new("string", "Retrieved config")
            .sample(json!("## Last commit: 2018-05-30 13:52:39 UTC by root ...")),
    )
}
