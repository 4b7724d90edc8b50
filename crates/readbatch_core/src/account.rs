use std::fmt;

use crate::ValidationError;

/// One `login:password` pair. Immutable once parsed.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    login: String,
    password: String,
}

impl Credential {
    pub fn new(login: impl Into<String>, password: impl Into<String>) -> Result<Self, ValidationError> {
        let login = login.into().trim().to_string();
        let password = password.into().trim().to_string();
        if login.is_empty() {
            return Err(ValidationError::EmptyLogin);
        }
        if password.is_empty() {
            return Err(ValidationError::EmptyPassword { login });
        }
        Ok(Self { login, password })
    }

    pub fn login(&self) -> &str {
        &self.login
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    /// Text before the first `@`, or `user` when that is empty.
    pub fn local_part(&self) -> &str {
        match self.login.split('@').next() {
            Some(local) if !local.is_empty() => local,
            _ => "user",
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("login", &self.login)
            .field("password", &"***")
            .finish()
    }
}

/// Parses one account per line in `login:password` form.
///
/// Blank lines are skipped. The password is everything after the first `:`,
/// so passwords may themselves contain colons.
pub fn parse_accounts(raw: &str) -> Result<Vec<Credential>, ValidationError> {
    let mut accounts = Vec::new();
    for (index, line) in raw.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Some((login, password)) = line.split_once(':') else {
            return Err(ValidationError::MalformedAccountLine { line: index + 1 });
        };
        let credential = Credential::new(login, password).map_err(|_| {
            ValidationError::MalformedAccountLine { line: index + 1 }
        })?;
        accounts.push(credential);
    }

    if accounts.is_empty() {
        return Err(ValidationError::NoAccounts);
    }
    Ok(accounts)
}
