// SPDX-FileCopyrightText: 2026 Coffer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Master-password acquisition from the environment or a TTY prompt.

use coffer_core::CofferError;
use secrecy::SecretString;
use zeroize::Zeroizing;

/// Environment variable holding the current master password (headless use).
pub const MASTER_PASSWORD_ENV_VAR: &str = "COFFER_MASTER_PASSWORD";

/// Environment variable holding the replacement password for a password change.
pub const NEW_MASTER_PASSWORD_ENV_VAR: &str = "COFFER_NEW_MASTER_PASSWORD";

fn from_env(var: &str) -> Option<SecretString> {
    std::env::var(var)
        .ok()
        .filter(|value| !value.is_empty())
        .map(SecretString::from)
}

/// Typed passwords stay in `Zeroizing` until handed to a `SecretString`.
fn read_password(prompt: &str) -> Result<Zeroizing<String>, CofferError> {
    eprint!("{prompt}");
    rpassword::read_password()
        .map(Zeroizing::new)
        .map_err(|e| CofferError::InvalidArgument(format!("failed to read password: {e}")))
}

/// Move the password into a `SecretString`, wiping the source buffer.
fn into_secret(password: Zeroizing<String>) -> SecretString {
    SecretString::from(password.as_str())
}

fn no_source(var: &str) -> CofferError {
    CofferError::InvalidArgument(format!(
        "no master password provided; set {var} or run interactively"
    ))
}

/// Get the current master password.
///
/// `COFFER_MASTER_PASSWORD` wins; otherwise the user is prompted when stdin
/// is a terminal.
pub fn get_master_password() -> Result<SecretString, CofferError> {
    if let Some(password) = from_env(MASTER_PASSWORD_ENV_VAR) {
        return Ok(password);
    }
    if std::io::IsTerminal::is_terminal(&std::io::stdin()) {
        let password = read_password("Master password: ")?;
        if password.is_empty() {
            return Err(CofferError::InvalidArgument(
                "empty master password not allowed".to_string(),
            ));
        }
        return Ok(into_secret(password));
    }
    Err(no_source(MASTER_PASSWORD_ENV_VAR))
}

/// Get a new master password, prompting twice for confirmation.
///
/// `env_var` is consulted first and needs no confirmation. Pass
/// [`MASTER_PASSWORD_ENV_VAR`] when initializing a vault and
/// [`NEW_MASTER_PASSWORD_ENV_VAR`] when changing the password.
pub fn get_new_master_password(env_var: &str) -> Result<SecretString, CofferError> {
    if let Some(password) = from_env(env_var) {
        return Ok(password);
    }
    if std::io::IsTerminal::is_terminal(&std::io::stdin()) {
        let first = read_password("New master password: ")?;
        let second = read_password("Confirm master password: ")?;
        if first != second {
            return Err(CofferError::InvalidArgument(
                "passwords do not match".to_string(),
            ));
        }
        if first.is_empty() {
            return Err(CofferError::InvalidArgument(
                "empty master password not allowed".to_string(),
            ));
        }
        return Ok(into_secret(first));
    }
    Err(no_source(env_var))
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use serial_test::serial;

    #[test]
    fn typed_password_moves_into_secret() {
        let typed = Zeroizing::new("correct horse".to_string());
        let secret = into_secret(typed);
        assert_eq!(secret.expose_secret(), "correct horse");
    }

    #[test]
    #[serial]
    fn master_password_from_env_var() {
        // SAFETY: env mutation is confined to #[serial] tests.
        unsafe { std::env::set_var(MASTER_PASSWORD_ENV_VAR, "from-env") };
        let result = get_master_password();
        unsafe { std::env::remove_var(MASTER_PASSWORD_ENV_VAR) };

        assert_eq!(result.unwrap().expose_secret(), "from-env");
    }

    #[test]
    #[serial]
    fn new_password_reads_requested_variable() {
        unsafe { std::env::set_var(NEW_MASTER_PASSWORD_ENV_VAR, "replacement") };
        let result = get_new_master_password(NEW_MASTER_PASSWORD_ENV_VAR);
        unsafe { std::env::remove_var(NEW_MASTER_PASSWORD_ENV_VAR) };

        assert_eq!(result.unwrap().expose_secret(), "replacement");
    }

    #[test]
    #[serial]
    fn empty_env_var_is_ignored() {
        unsafe { std::env::set_var(MASTER_PASSWORD_ENV_VAR, "") };
        // Under test, stdin is not a terminal, so no source remains.
        let result = get_master_password();
        unsafe { std::env::remove_var(MASTER_PASSWORD_ENV_VAR) };

        assert!(matches!(result, Err(CofferError::InvalidArgument(_))));
    }
}
