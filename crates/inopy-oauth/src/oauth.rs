//! Authorization-code flow helpers: CSRF state and the provider URL.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
use subtle::ConstantTimeEq;

use crate::credential::Credential;

/// Generate a random state string for CSRF protection.
pub fn generate_state() -> String {
    let mut state_bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut state_bytes);
    URL_SAFE_NO_PAD.encode(state_bytes)
}

/// Compare a callback `state` against the issued one without leaking timing.
pub fn state_matches(expected: &str, received: &str) -> bool {
    expected.as_bytes().ct_eq(received.as_bytes()).into()
}

/// Build the provider authorization URL the local `/` route redirects to.
pub fn build_authorization_url(credential: &Credential, state: &str) -> String {
    let params = [
        ("client_id", credential.client_id.as_str()),
        ("redirect_uri", credential.callback.as_str()),
        ("response_type", "code"),
        ("scope", credential.scope.as_str()),
        ("state", state),
    ];

    let query = params
        .iter()
        .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");

    let separator = if credential.authorize_url.contains('?') {
        '&'
    } else {
        '?'
    };
    format!("{}{}{}", credential.authorize_url, separator, query)
}
