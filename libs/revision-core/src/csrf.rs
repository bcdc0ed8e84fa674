//! CSRF token plumbing shared by server and client.
//!
//! Unsafe requests carry the token twice: in the `csrftoken` cookie and in
//! the `X-CSRFToken` header. The server accepts the request only when both
//! are present and equal.

use serde::{Deserialize, Serialize};

/// Cookie holding the token.
pub const CSRF_COOKIE_NAME: &str = "csrftoken";

/// Request header echoing the token.
pub const CSRF_HEADER_NAME: &str = "x-csrftoken";

/// Hidden form field carrying the token in rendered pages.
pub const CSRF_FORM_FIELD: &str = "csrfmiddlewaretoken";

/// Value of `name` in a `Cookie` header. Empty values count as absent.
pub fn cookie_value<'a>(cookie_header: &'a str, name: &str) -> Option<&'a str> {
    cookie_header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| key.trim() == name)
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
}

/// Places a page may expose the token.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenSources {
    /// Value of the hidden `csrfmiddlewaretoken` input.
    pub form_field: Option<String>,
    /// Raw `Cookie` header / `document.cookie` string.
    pub cookies: Option<String>,
    /// Content of `<meta name="csrf-token">`.
    pub meta_tag: Option<String>,
}

impl TokenSources {
    /// First non-blank token: form field, then cookie, then meta tag.
    pub fn resolve(&self) -> Option<String> {
        let from_field = non_blank(self.form_field.as_deref());
        let from_cookie = || {
            self.cookies
                .as_deref()
                .and_then(|c| cookie_value(c, CSRF_COOKIE_NAME))
        };
        let from_meta = || non_blank(self.meta_tag.as_deref());

        from_field
            .or_else(from_cookie)
            .or_else(from_meta)
            .map(str::to_string)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
