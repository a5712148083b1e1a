//! The authentication sub-model for remote providers (`spec.md §4.12`).

use std::fmt;
use std::hash::{Hash, Hasher};

/// A secret value that never prints its contents in `Debug`.
///
/// Equality compares the underlying bytes (callers may legitimately need to
/// know whether two credentials are the same); `Hash` is implemented only
/// on [`AuthMethod`], which deliberately excludes the secret so that hashing
/// an `AuthMethod` can never leak it through a hash-derived debug path.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretValue(String);

impl SecretValue {
    /// Wrap a secret string.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Expose the secret's contents.
    ///
    /// Named to make call sites searchable; this is not a constant-time
    /// comparison primitive (out of scope per `spec.md §1`).
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "***")
    }
}

/// A resolved `(header name, header value)` pair to attach to a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthHeader {
    /// The HTTP header name.
    pub name: String,
    /// The HTTP header value.
    pub value: String,
}

/// How a provider authenticates its requests.
///
/// Deliberately HTTP-client-agnostic: `resolve`/`apply` produce a header
/// name/value pair that `conduit-provider-kernel` attaches to the outgoing
/// `reqwest::RequestBuilder`, keeping this crate free of an HTTP dependency.
#[derive(Clone, PartialEq, Eq)]
pub enum AuthMethod {
    /// No authentication.
    None,
    /// `Authorization: Bearer <token>`.
    Bearer(SecretValue),
    /// A custom-named API key header.
    ApiKey {
        /// The header value.
        value: SecretValue,
        /// The header name (e.g. `"x-api-key"`).
        header_name: String,
    },
    /// Read the token from a named environment variable at resolution time.
    Environment(String),
    /// Probe a priority list of environment variable names, first hit wins.
    Auto(Vec<String>),
}

impl fmt::Debug for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "AuthMethod::None"),
            Self::Bearer(_) => write!(f, "AuthMethod::Bearer(***)"),
            Self::ApiKey { header_name, .. } => {
                write!(f, "AuthMethod::ApiKey {{ value: ***, header_name: {header_name:?} }}")
            }
            Self::Environment(var) => write!(f, "AuthMethod::Environment({var:?})"),
            Self::Auto(vars) => write!(f, "AuthMethod::Auto({vars:?})"),
        }
    }
}

impl Hash for AuthMethod {
    /// Hashes only the variant tag and any non-secret fields, so secret
    /// bytes never enter a hash-derived debug path (e.g. `HashMap` key
    /// dumps), per `spec.md §4.12`.
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Self::None => 0u8.hash(state),
            Self::Bearer(_) => 1u8.hash(state),
            Self::ApiKey { header_name, .. } => {
                2u8.hash(state);
                header_name.hash(state);
            }
            Self::Environment(var) => {
                3u8.hash(state);
                var.hash(state);
            }
            Self::Auto(vars) => {
                4u8.hash(state);
                vars.hash(state);
            }
        }
    }
}

impl AuthMethod {
    /// Resolve this method to a bare token string, if one is available.
    ///
    /// `Environment`/`Auto` read `std::env` at call time so credential
    /// rotation via the process environment takes effect without
    /// reconstructing the provider.
    #[must_use]
    pub fn resolve(&self) -> Option<String> {
        match self {
            Self::None => None,
            Self::Bearer(v) | Self::ApiKey { value: v, .. } => Some(v.expose().to_string()),
            Self::Environment(var) => std::env::var(var).ok(),
            Self::Auto(vars) => vars.iter().find_map(|var| std::env::var(var).ok()),
        }
    }

    /// Produce the header to attach to an outgoing request, if any.
    #[must_use]
    pub fn apply(&self) -> Option<AuthHeader> {
        let token = self.resolve()?;
        let name = match self {
            Self::ApiKey { header_name, .. } => header_name.clone(),
            _ => "authorization".to_string(),
        };
        let value = match self {
            Self::ApiKey { .. } => token,
            _ => format!("Bearer {token}"),
        };
        Some(AuthHeader { name, value })
    }
}
