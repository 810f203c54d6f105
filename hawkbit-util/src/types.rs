use serde::{Deserialize, Serialize};
use std::ops::Deref;
use std::{fmt::Display, str::FromStr};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("controller id cannot be empty or contain '/': got '{0}'")]
pub struct InvalidControllerIdError(String);

/// Identifier of this device on the hawkBit server.
///
/// The id becomes a path segment of every controller URL so it is
/// validated on creation.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(try_from = "String", into = "String")]
pub struct ControllerId(String);

impl Deref for ControllerId {
    type Target = String;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Display for ControllerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for ControllerId {
    type Err = InvalidControllerIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(s.to_owned())
    }
}

impl TryFrom<String> for ControllerId {
    type Error = InvalidControllerIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let trimmed = value.trim();
        if trimmed.is_empty() || trimmed.contains('/') {
            return Err(InvalidControllerIdError(value));
        }
        Ok(Self(trimmed.to_owned()))
    }
}

impl From<ControllerId> for String {
    fn from(value: ControllerId) -> Self {
        value.0
    }
}

/// hawkBit tenant name, `DEFAULT` on single tenant installations
pub type Tenant = String;
