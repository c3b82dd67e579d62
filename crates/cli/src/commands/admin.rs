//! Operator account commands.
//!
//! # Usage
//!
//! ```bash
//! echo -n 'a long passphrase' | vitrina-cli admin hash-password
//! ```
//!
//! The printed PHC string goes into `ADMIN_PASSWORD_HASH`.

use std::io::{BufRead, Write};

use thiserror::Error;
use vitrina_admin::services::{self, AuthError};

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    /// Reading stdin or writing stdout failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Nothing was read from stdin.
    #[error("No password given on stdin")]
    EmptyInput,

    /// Hashing failed or the password was rejected.
    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// Read one line from `input` without its line ending.
fn read_password(input: &mut impl BufRead) -> Result<String, AdminError> {
    let mut line = String::new();
    input.read_line(&mut line)?;
    let password = line.trim_end_matches(['\r', '\n']).to_owned();
    if password.is_empty() {
        return Err(AdminError::EmptyInput);
    }
    Ok(password)
}

/// Hash a password read from stdin and print the PHC string.
///
/// # Errors
///
/// Returns an error if stdin is empty or the password is too short.
pub fn hash_password() -> Result<(), AdminError> {
    let password = read_password(&mut std::io::stdin().lock())?;
    let hash = services::hash_password(&password)?;

    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{hash}")?;

    tracing::info!("Set ADMIN_PASSWORD_HASH to the line above");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_read_password_strips_newline() {
        let mut input = "hunter22hunter\r\n".as_bytes();
        assert_eq!(read_password(&mut input).unwrap(), "hunter22hunter");
    }

    #[test]
    fn test_read_password_keeps_inner_spaces() {
        let mut input = " two words \n".as_bytes();
        assert_eq!(read_password(&mut input).unwrap(), " two words ");
    }

    #[test]
    fn test_read_password_rejects_empty() {
        let mut input = "\n".as_bytes();
        assert!(matches!(
            read_password(&mut input),
            Err(AdminError::EmptyInput)
        ));
    }
}
