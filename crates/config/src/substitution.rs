//! Environment variable substitution for config files.

use anyhow::Result;
use regex::Regex;
use std::env;
use tracing::{debug, warn};

/// Substitute environment variables in the format `${VAR_NAME}` or `$VAR_NAME`.
///
/// Unset variables keep their placeholder; the validator flags them later.
pub fn substitute_env_vars(content: &str) -> Result<String> {
    let re = Regex::new(r"\$\{(\w+)\}|\$(\w+)").expect("static regex");
    let mut result = content.to_string();
    let mut missing = Vec::new();

    for caps in re.captures_iter(content) {
        let var_name = caps
            .get(1)
            .or_else(|| caps.get(2))
            .map(|m| m.as_str())
            .unwrap_or_default();
        let placeholder = caps.get(0).map(|m| m.as_str()).unwrap_or_default();

        match env::var(var_name) {
            Ok(value) => {
                debug!("Substituting environment variable: {}", var_name);
                result = result.replace(placeholder, &value);
            }
            Err(_) => {
                warn!("Environment variable '{}' not set", var_name);
                missing.push(var_name.to_string());
            }
        }
    }

    if !missing.is_empty() {
        debug!("Unresolved environment variables: {:?}", missing);
    }

    Ok(result)
}

/// Check if a string still contains environment variable placeholders.
pub fn has_unresolved_env_vars(content: &str) -> bool {
    let re = Regex::new(r"\$\{(\w+)\}|\$(\w+)").expect("static regex");
    re.is_match(content)
}
