//! Authentication material for the code-hosting API and git pushes.
//!
//! [`Credentials`] is resolved exactly once at startup from the raw optional
//! inputs (flags or environment). Downstream code matches on the variant and
//! never re-inspects which fields were present.

use crate::core::error::{Result, SweeperError};
use std::fmt;
use std::path::Path;

#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Personal access token.
    Token(String),
    /// GitHub App installation. `private_key` holds PEM text.
    App {
        app_id: u64,
        installation_id: u64,
        private_key: String,
    },
}

/// Raw, unvalidated credential inputs.
#[derive(Debug, Default, Clone)]
pub struct CredentialInputs {
    pub token: Option<String>,
    pub app_id: Option<String>,
    pub installation_id: Option<String>,
    pub private_key: Option<String>,
}

impl Credentials {
    /// Resolve the credential bundle. Exactly one complete path must be set.
    pub fn resolve(inputs: &CredentialInputs) -> Result<Self> {
        let token = non_empty(&inputs.token);
        let app_id = non_empty(&inputs.app_id);
        let installation_id = non_empty(&inputs.installation_id);
        let private_key = non_empty(&inputs.private_key);

        let any_app = app_id.is_some() || installation_id.is_some() || private_key.is_some();

        match (token, any_app) {
            (Some(_), true) => Err(SweeperError::invalid_credentials(
                "both a token and GitHub App credentials were supplied; use exactly one",
            )),
            (Some(token), false) => Ok(Self::Token(token.to_string())),
            (None, false) => Err(SweeperError::invalid_credentials(
                "no credentials supplied; set GITHUB_TOKEN or the GitHub App variables",
            )),
            (None, true) => {
                let (Some(app_id), Some(installation_id), Some(private_key)) =
                    (app_id, installation_id, private_key)
                else {
                    return Err(SweeperError::invalid_credentials(
                        "GitHub App auth requires app id, installation id and private key",
                    ));
                };

                Ok(Self::App {
                    app_id: parse_id("app id", app_id)?,
                    installation_id: parse_id("installation id", installation_id)?,
                    private_key: load_private_key(private_key)?,
                })
            }
        }
    }

    /// Username used when embedding an access token into an HTTPS remote URL.
    pub fn git_username(&self) -> &'static str {
        match self {
            Self::Token(_) => "git",
            Self::App { .. } => "x-access-token",
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Token(_) => "token",
            Self::App { .. } => "app",
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Token(_) => f.debug_tuple("Token").field(&"<redacted>").finish(),
            Self::App {
                app_id,
                installation_id,
                ..
            } => f
                .debug_struct("App")
                .field("app_id", app_id)
                .field("installation_id", installation_id)
                .field("private_key", &"<redacted>")
                .finish(),
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn parse_id(label: &str, value: &str) -> Result<u64> {
    value.parse().map_err(|_| {
        SweeperError::invalid_credentials(format!("{label} must be numeric (got '{value}')"))
    })
}

/// Accept either inline PEM text or a path to a PEM file.
fn load_private_key(value: &str) -> Result<String> {
    if value.starts_with("-----BEGIN") {
        return Ok(value.replace("\\n", "\n"));
    }

    let path = Path::new(value);
    if !path.is_file() {
        return Err(SweeperError::invalid_credentials(format!(
            "private key is neither PEM text nor a readable file: {}",
            path.display()
        )));
    }

    Ok(std::fs::read_to_string(path)?)
}
