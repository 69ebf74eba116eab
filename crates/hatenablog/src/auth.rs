//! Request authentication.
//!
//! The publishing API accepts either HTTP Basic authentication or a WSSE
//! `UsernameToken`, both built from the same API key. Every request
//! carries exactly one of the two headers; there is no session to
//! establish or refresh.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::{SecondsFormat, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};

/// Account credentials for one blog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub hatena_id: String,
    pub blog_id: String,
    pub api_key: String,
}

impl Credentials {
    pub fn new(
        hatena_id: impl Into<String>,
        blog_id: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Credentials {
            hatena_id: hatena_id.into(),
            blog_id: blog_id.into(),
            api_key: api_key.into(),
        }
    }
}

/// Authentication scheme attached to outgoing requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Auth {
    /// `Authorization: Basic base64(hatena_id:api_key)`.
    Basic,
    /// `X-WSSE: UsernameToken …` with a fresh nonce per request.
    #[default]
    Wsse,
}

impl Auth {
    /// The header this scheme adds to a request.
    pub(crate) fn header(&self, credentials: &Credentials) -> (&'static str, String) {
        match self {
            Auth::Basic => {
                let token =
                    STANDARD.encode(format!("{}:{}", credentials.hatena_id, credentials.api_key));
                ("Authorization", format!("Basic {token}"))
            }
            Auth::Wsse => {
                let mut nonce = [0u8; 16];
                rand::rng().fill_bytes(&mut nonce);
                let created = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
                ("X-WSSE", wsse_token(credentials, &nonce, &created))
            }
        }
    }
}

/// Builds a WSSE `UsernameToken` value.
///
/// `PasswordDigest` is `base64(sha1(nonce + created + api_key))` with the
/// raw nonce bytes; the header carries the nonce base64-encoded.
fn wsse_token(credentials: &Credentials, nonce: &[u8], created: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(nonce);
    hasher.update(created.as_bytes());
    hasher.update(credentials.api_key.as_bytes());
    let digest = hasher.finalize();

    format!(
        r#"UsernameToken Username="{}", PasswordDigest="{}", Nonce="{}", Created="{}""#,
        credentials.hatena_id,
        STANDARD.encode(digest),
        STANDARD.encode(nonce),
        created,
    )
}
