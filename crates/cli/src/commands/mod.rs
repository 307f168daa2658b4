pub mod check;
pub mod config;
pub mod evaluate;
pub mod price;
pub mod tiers;

use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use solbill_core::config::{AppConfig, LoadOptions};
use solbill_core::errors::ApplicationError;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl CommandResult {
    pub fn success_with_data(
        command: &str,
        message: impl Into<String>,
        data: &impl Serialize,
    ) -> Self {
        match serde_json::to_value(data) {
            Ok(data) => Self::ok(command, message.into(), Some(data)),
            Err(error) => Self::failure(command, "serialization", error.to_string(), 5),
        }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        Self::failure_with_data(command, error_class, message, exit_code, None)
    }

    pub fn failure_with_data(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
        data: Option<Value>,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
            data,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    /// Maps an application error onto its stable class and exit code.
    pub fn from_error(command: &str, error: ApplicationError) -> Self {
        let exit_code = match error {
            ApplicationError::Configuration(_) => 2,
            ApplicationError::Input(_) => 3,
            ApplicationError::Domain(_) | ApplicationError::Pricing(_) => 4,
        };
        let error_class = error.error_class();
        Self::failure(command, error_class, error.to_string(), exit_code)
    }

    fn ok(command: &str, message: String, data: Option<Value>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message,
            data,
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }
}

pub fn load_config(options: LoadOptions) -> Result<AppConfig, ApplicationError> {
    AppConfig::load(options)
        .map_err(|error| ApplicationError::Configuration(format!("configuration issue: {error}")))
}

pub(crate) fn read_input<T: DeserializeOwned>(path: &Path) -> Result<T, ApplicationError> {
    read_json(path).map_err(|error| ApplicationError::Input(format!("{error:#}")))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("could not read input file `{}`", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("could not parse input file `{}`", path.display()))
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

#[cfg(test)]
mod tests {
    use serde_json::Value;
    use solbill_core::errors::{ApplicationError, PricingError};

    use super::CommandResult;

    #[test]
    fn failure_envelope_omits_data() {
        let result = CommandResult::failure("price", "input", "missing file", 3);
        let payload: Value = serde_json::from_str(&result.output).expect("json");

        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "input");
        assert!(payload.get("data").is_none());
    }

    #[test]
    fn pricing_errors_exit_with_code_four() {
        let result = CommandResult::from_error(
            "price",
            ApplicationError::from(PricingError::MissingCurrency),
        );
        let payload: Value = serde_json::from_str(&result.output).expect("json");

        assert_eq!(result.exit_code, 4);
        assert_eq!(payload["error_class"], "pricing_input");
    }
}
