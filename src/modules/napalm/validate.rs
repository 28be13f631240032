//! napalm_validate - check a device against a validation file

use super::common::{expand_path, merge_provider, resolve_connection, OS_CHOICES};
use super::docs::{connection_options, ModuleDoc, OptionDoc, OptionType, ReturnDoc};
use super::session::DeviceSession;
use crate::modules::{Module, ModuleContext, ModuleOutput, ModuleParams, ModuleResult, ParamExt};
use serde_json::{json, Value};
use tracing::info;

/// Module for validating device state against a policy file
pub struct NapalmValidateModule;

impl Module for NapalmValidateModule {
    fn name(&self) -> &'static str {
        "napalm_validate"
    }

    fn description(&self) -> &'static str {
        "Performs deployment validation via napalm"
    }

    fn supports_check_mode(&self) -> bool {
        false
    }

    fn required_params(&self) -> &[&'static str] {
        &["validation_file"]
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
        let validation_file = expand_path(&params.get_string_required("validation_file")?);
        let connection = resolve_connection(&params, OS_CHOICES)?;

        let session = DeviceSession::connect(&context.drivers, &connection)?;
        let report = session.run(|driver| Ok(driver.compliance_report(&validation_file)?))?;

        let complies = report
            .get("complies")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        info!(complies, hostname = %connection.hostname, "Compliance report built");

        let output = if complies {
            ModuleOutput::ok("Device complies with policy")
        } else {
            ModuleOutput::failed("Device does not comply with policy")
        };
        Ok(output.with_data("compliance_report", report))
    }
}

pub(crate) fn documentation() -> ModuleDoc {
    ModuleDoc::new("napalm_validate", "Performs deployment validation via napalm")
        .description("Performs deployment validation via napalm.")
        .options(connection_options(Some(OS_CHOICES)))
        .option(
            "validation_file",
            OptionDoc::new(
                OptionType::Path,
                "YAML Validation file containing resources desired states",
            )
            .required(),
        )
        .examples(
            r#"
- name: GET VALIDATION REPORT
  napalm_validate:
    username: napalm
    password: napalm
    hostname: 10.0.0.1
    dev_os: eos
    validation_file: validate.yml

- name: GET VALIDATION REPORT USING PROVIDER
  napalm_validate:
    provider:
      hostname: 10.0.0.1
      username: napalm
      password: napalm
      dev_os: ios
    validation_file: validate.yml
"#,
        )
        .returns(
            "changed",
            ReturnDoc::new("bool", "Check to see if a change was made on the device")
                .sample(json!(false)),
        )
        .returns(
            "compliance_report",
            ReturnDoc::new("dict", "validation report obtained via napalm").returned("always"),
        )
}
