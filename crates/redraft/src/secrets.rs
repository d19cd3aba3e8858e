//! API key resolution for generative service bindings.
//!
//! Keys are looked up in priority order:
//!
//! 1. **Direct value** - a per-run override or a literal in the settings file
//! 2. **Env var reference** - e.g. `api_key_env: "OPENAI_API_KEY"`
//!
//! A key that resolves to nothing is not an error here; the service reports
//! a missing key when it is first called.

use secrecy::SecretString;

/// Error type for secret resolution failures.
#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("Environment variable '{name}' contains invalid UTF-8")]
    EnvVarNotUnicode { name: String },
}

/// Resolves an optional API key from a direct value, then an env var.
///
/// Empty values are skipped. Env var contents are trimmed.
pub fn resolve_api_key(
    direct: Option<&str>,
    env_var: Option<&str>,
) -> Result<Option<SecretString>, SecretError> {
    if let Some(value) = direct.map(str::trim).filter(|v| !v.is_empty()) {
        return Ok(Some(SecretString::from(value.to_string())));
    }

    if let Some(var_name) = env_var.filter(|v| !v.is_empty()) {
        return match std::env::var(var_name) {
            Ok(value) if !value.trim().is_empty() => {
                Ok(Some(SecretString::from(value.trim().to_string())))
            }
            Ok(_) | Err(std::env::VarError::NotPresent) => Ok(None),
            Err(std::env::VarError::NotUnicode(_)) => Err(SecretError::EnvVarNotUnicode {
                name: var_name.to_string(),
            }),
        };
    }

    Ok(None)
}
