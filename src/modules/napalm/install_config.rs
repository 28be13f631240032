//! napalm_install_config - load and commit a configuration
//!
//! The candidate configuration (from `config_file` or inline `config`) is
//! merged into or replaces the device configuration. The flow is:
//!
//! 1. archive the running configuration to `archive_file` if requested
//! 2. load the candidate (merge or replace)
//! 3. diff candidate against running, optionally saving it to `diff_file`
//! 4. discard the candidate in check mode or when `commit_changes` is false,
//!    otherwise commit it if there is a difference
//!
//! The diff is returned as the result message.

use super::common::{expand_path, merge_provider, resolve_connection, save_to_file, OS_CHOICES};
use super::docs::{connection_options, ModuleDoc, OptionDoc, OptionType, ReturnDoc};
use super::session::DeviceSession;
use crate::driver::{CandidateSource, ConfigRetrieve, DriverError, NetworkDriver};
use crate::modules::{
    Diff, Module, ModuleContext, ModuleError, ModuleOutput, ModuleParams, ModuleResult, ParamExt,
};
use serde_json::json;
use std::path::PathBuf;
use tracing::{debug, info};

/// Parsed parameters for napalm_install_config
#[derive(Debug, Clone)]
pub struct InstallConfigParams {
    pub source: CandidateSource,
    pub commit_changes: bool,
    pub replace_config: bool,
    pub diff_file: Option<PathBuf>,
    pub get_diffs: bool,
    pub archive_file: Option<PathBuf>,
}

impl InstallConfigParams {
    pub fn from_params(params: &ModuleParams) -> ModuleResult<Self> {
        let source = if let Some(file) = params.get_string("config_file")? {
            CandidateSource::File(expand_path(&file))
        } else if let Some(config) = params.get_string("config")? {
            CandidateSource::Text(config)
        } else {
            return Err(ModuleError::InvalidParameter(
                "You have to specify either config or config_file".to_string(),
            ));
        };

        let commit_changes = params
            .get_bool("commit_changes")?
            .ok_or_else(|| ModuleError::MissingParameter("commit_changes".to_string()))?;

        Ok(Self {
            source,
            commit_changes,
            replace_config: params.get_bool("replace_config")?.unwrap_or(false),
            diff_file: params.get_string("diff_file")?.map(|p| expand_path(&p)),
            get_diffs: params.get_bool("get_diffs")?.unwrap_or(true),
            archive_file: params.get_string("archive_file")?.map(|p| expand_path(&p)),
        })
    }
}

/// What happened on the device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOutcome {
    pub changed: bool,
    pub diff: Option<String>,
    pub committed: bool,
}

fn install(
    driver: &mut dyn NetworkDriver,
    params: &InstallConfigParams,
    check_mode: bool,
) -> ModuleResult<InstallOutcome> {
    if let Some(archive) = &params.archive_file {
        let running = driver.get_config(ConfigRetrieve::Running).map_err(|e| {
            ModuleError::ExecutionFailed(format!("cannot retrieve running config: {}", e))
        })?;
        save_to_file(&running, archive).map_err(|e| {
            ModuleError::ExecutionFailed(format!("cannot retrieve running config: {}", e))
        })?;
        debug!(path = %archive.display(), "Archived running configuration");
    }

    let loaded = if params.replace_config {
        driver.load_replace_candidate(&params.source)
    } else {
        driver.load_merge_candidate(&params.source)
    };
    loaded.map_err(|e| ModuleError::ExecutionFailed(format!("cannot load config: {}", e)))?;

    let diff_error = |e: &dyn std::fmt::Display| {
        ModuleError::ExecutionFailed(format!("cannot diff config: {}", e))
    };
    let (changed, diff) = if params.get_diffs {
        let diff = driver.compare_config().map_err(|e| diff_error(&e))?;
        if let Some(diff_file) = &params.diff_file {
            save_to_file(&diff, diff_file).map_err(|e| diff_error(&e))?;
        }
        (!diff.is_empty(), Some(diff))
    } else {
        (true, None)
    };

    let install_error =
        |e: DriverError| ModuleError::ExecutionFailed(format!("cannot install config: {}", e));
    let mut committed = false;
    if check_mode || !params.commit_changes {
        debug!(check_mode, "Discarding candidate configuration");
        driver.discard_config().map_err(install_error)?;
    } else if changed {
        driver.commit_config().map_err(install_error)?;
        info!("Committed candidate configuration");
        committed = true;
    }

    Ok(InstallOutcome {
        changed,
        diff,
        committed,
    })
}

/// Module for installing configuration on a network device
pub struct NapalmInstallConfigModule;

impl Module for NapalmInstallConfigModule {
    fn name(&self) -> &'static str {
        "napalm_install_config"
    }

    fn description(&self) -> &'static str {
        "Installs the configuration taken from a file on a device supported by napalm"
    }

    fn required_params(&self) -> &[&'static str] {
        &["commit_changes"]
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
        let options = InstallConfigParams::from_params(&params)?;
        let connection = resolve_connection(&params, OS_CHOICES)?;

        let session = DeviceSession::connect(&context.drivers, &connection)?;
        let outcome = session.run(|driver| install(driver, &options, context.check_mode))?;

        let diff = outcome.diff.unwrap_or_default();
        let mut output = ModuleOutput::from_changed(outcome.changed, diff.clone())
            .with_data("committed", json!(outcome.committed));
        if context.diff_mode && !diff.is_empty() {
            output = output.with_diff(Diff::new("running", "candidate").with_details(diff));
        }
        Ok(output)
    }
}

pub(crate) fn documentation() -> ModuleDoc {
    ModuleDoc::new(
        "napalm_install_config",
        "Installs the configuration taken from a file on a device supported by napalm",
    )
    .description(
        "This library will take the configuration from a file and load it into a device \
         running any OS supported by napalm. The old configuration will be replaced or merged \
         with the new one.",
    )
    .options(connection_options(Some(OS_CHOICES)))
    .option(
        "config_file",
        OptionDoc::new(
            OptionType::Path,
            "Path to the file to load the configuration from. Either config or config_file is \
             needed.",
        ),
    )
    .option(
        "config",
        OptionDoc::new(
            OptionType::Str,
            "Configuration to load. Either config or config_file is needed.",
        ),
    )
    .option(
        "commit_changes",
        OptionDoc::new(
            OptionType::Bool,
            "If set to true the configuration will be actually merged or replaced. If set to \
             false, we will not apply the changes, just check and report the diff",
        )
        .required(),
    )
    .option(
        "replace_config",
        OptionDoc::new(
            OptionType::Bool,
            "If set to true, the entire configuration on the device will be replaced during \
             the commit. If set to false, we will merge the new config with the existing one.",
        )
        .default(json!(false)),
    )
    .option(
        "diff_file",
        OptionDoc::new(
            OptionType::Path,
            "A path to the file where we store the diff between the running configuration and \
             the new configuration. If not set the diff between configurations will not be \
             saved.",
        ),
    )
    .option(
        "get_diffs",
        OptionDoc::new(
            OptionType::Bool,
            "Set to false to not have any diffs generated. Useful if platform does not support \
             commands being used to generate diffs. By default diffs are generated even if the \
             diff_file param is not set.",
        )
        .default(json!(true)),
    )
    .option(
        "archive_file",
        OptionDoc::new(
            OptionType::Path,
            "File to store backup of running-configuration from device. Configuration will not \
             be retrieved if not set.",
        ),
    )
    .examples(
        r#"
- name: Install Config and save diff
  napalm_install_config:
    hostname: 10.0.0.1
    username: napalm
    dev_os: junos
    password: napalm
    config_file: ../compiled/r1/running.conf
    commit_changes: true
    replace_config: false
    get_diffs: true
    diff_file: ../compiled/r1/diff

- name: Install Config using Provider
  napalm_install_config:
    provider:
      hostname: 10.0.0.1
      username: napalm
      password: napalm
      dev_os: junos
    config: |
      set system host-name lab
    commit_changes: false
    archive_file: ../backup/r1.conf
"#,
    )
    .returns(
        "changed",
        ReturnDoc::new("bool", "Whether the config on the device was changed").sample(json!(true)),
    )
    .returns(
        "msg",
        ReturnDoc::new("string", "Diff of the change")
            .sample(json!("[edit system]\n-  host-name lab-testing;\n+  host-name lab;")),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::napalm::testing::{mock_device, mock_params};
    use pretty_assertions::assert_eq;

    const RUNNING: &str = "hostname r1\ninterface Gi0/0\n";

    #[test]
    fn test_requires_config_source() {
        let params = mock_params(
            std::path::Path::new("/tmp"),
            json!({"commit_changes": true}),
        );
        let err = InstallConfigParams::from_params(&params).unwrap_err();
        assert_eq!(
            err.to_string(),
            "You have to specify either config or config_file"
        );
    }

    #[test]
    fn test_merge_and_commit() {
        let dir = mock_device(&[("running.conf", RUNNING)]);
        let out = tempfile::tempdir().unwrap();
        let diff_file = out.path().join("diff");
        let archive = out.path().join("archive.conf");
        std::fs::write(
            dir.path().join("get_config.1"),
            json!({"running": RUNNING, "candidate": "", "startup": ""}).to_string(),
        )
        .unwrap();

        let params = mock_params(
            dir.path(),
            json!({
                "config": "ntp server 10.0.0.5\n",
                "commit_changes": true,
                "diff_file": diff_file.to_str().unwrap(),
                "archive_file": archive.to_str().unwrap()
            }),
        );

        let output = NapalmInstallConfigModule
            .execute(&params, &ModuleContext::new())
            .unwrap();
        assert!(output.changed);
        assert_eq!(output.msg, "+ntp server 10.0.0.5");
        assert_eq!(output.data["committed"], json!(true));
        assert_eq!(std::fs::read_to_string(&diff_file).unwrap(), "+ntp server 10.0.0.5");
        assert_eq!(std::fs::read_to_string(&archive).unwrap(), RUNNING);
    }

    #[test]
    fn test_no_commit_discards() {
        let dir = mock_device(&[("running.conf", RUNNING)]);
        let params = mock_params(
            dir.path(),
            json!({"config": "ntp server 10.0.0.5\n", "commit_changes": false}),
        );

        let output = NapalmInstallConfigModule
            .execute(&params, &ModuleContext::new())
            .unwrap();
        assert!(output.changed);
        assert_eq!(output.data["committed"], json!(false));
    }

    #[test]
    fn test_check_mode_discards() {
        let dir = mock_device(&[("running.conf", RUNNING)]);
        let params = mock_params(
            dir.path(),
            json!({"config": "ntp server 10.0.0.5\n", "commit_changes": true}),
        );

        let output = NapalmInstallConfigModule
            .check(&params, &ModuleContext::new())
            .unwrap();
        assert_eq!(output.data["committed"], json!(false));
    }

    #[test]
    fn test_replace_without_diffs_is_changed() {
        let dir = mock_device(&[("running.conf", RUNNING)]);
        let params = mock_params(
            dir.path(),
            json!({
                "config": RUNNING,
                "commit_changes": true,
                "replace_config": true,
                "get_diffs": false
            }),
        );

        let output = NapalmInstallConfigModule
            .execute(&params, &ModuleContext::new())
            .unwrap();
        assert!(output.changed);
        assert_eq!(output.msg, "");
        assert_eq!(output.data["committed"], json!(true));
    }

    #[test]
    fn test_identical_config_not_changed() {
        let dir = mock_device(&[("running.conf", RUNNING)]);
        let params = mock_params(
            dir.path(),
            json!({"config": RUNNING, "commit_changes": true, "replace_config": true}),
        );

        let output = NapalmInstallConfigModule
            .execute(&params, &ModuleContext::new())
            .unwrap();
        assert!(!output.changed);
        assert_eq!(output.data["committed"], json!(false));
    }

    #[test]
    fn test_load_failure() {
        let dir = mock_device(&[(
            "load_merge_candidate.1",
            r#"{"exception": "MergeConfigException", "message": "syntax error"}"#,
        )]);
        let params = mock_params(
            dir.path(),
            json!({"config": "bogus\n", "commit_changes": true}),
        );

        let err = NapalmInstallConfigModule
            .execute(&params, &ModuleContext::new())
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "cannot load config: MergeConfigException: syntax error"
        );
    }
}
