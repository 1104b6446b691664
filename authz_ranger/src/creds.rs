use anyhow::{anyhow, Result};

/// Credentials for the Ranger admin API.
///
/// Only simple (HTTP basic) authentication is supported.
#[derive(Clone, Default)]
pub(crate) struct RangerCredentials {
    pub(crate) username: String,
    pub(crate) password: String,
}

impl RangerCredentials {
    pub(crate) fn new<S: Into<String>>(username: S, password: S) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Perform simple field validation to catch bad input.
    pub(crate) fn validate(&self) -> Result<()> {
        if self.username.is_empty() || self.password.is_empty() {
            return Err(anyhow!(
                "Ranger credentials are missing. Please make sure your authorization config is correct. Credentials received: {:#?}",
                self
            ));
        }
        Ok(())
    }
}

impl std::fmt::Debug for RangerCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RangerCredentials")
            .field("username", &self.username)
            .field(
                "password",
                &if self.password.is_empty() { "" } else { "****" },
            )
            .finish()
    }
}
