use serde::Serialize;

use crate::error::CliError;

pub fn render<T: Serialize>(value: &T) -> Result<String, CliError> {
    Ok(serde_json::to_string_pretty(value)?)
}
