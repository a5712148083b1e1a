//! Attaches a `conduit_core::AuthMethod`'s resolved header to an outgoing
//! `reqwest::RequestBuilder`.

use conduit_core::AuthMethod;
use reqwest::RequestBuilder;

/// Applies `auth`'s header, if any, to `builder`.
///
/// `AuthMethod::None` (or an `Environment`/`Auto` variant that resolves to
/// nothing) leaves `builder` untouched, matching `spec.md §4.2`'s
/// "unauthenticated" variant.
#[must_use]
pub fn apply_auth(builder: RequestBuilder, auth: &AuthMethod) -> RequestBuilder {
    match auth.apply() {
        Some(header) => builder.header(header.name, header.value),
        None => builder,
    }
}
