use std::borrow::Cow;

use time::{Duration, OffsetDateTime};
use tower_cookies::Cookie;

use crate::SameSite;

pub const DEFAULT_COOKIE_NAME: &str = "s";
pub const DEFAULT_MAX_AGE: Duration = Duration::weeks(1);
pub const DEFAULT_SESSION_ID_LENGTH: usize = 16;

/// Value sent in place of the session id when the cookie is cleared.
pub(crate) const CLEARED_COOKIE_VALUE: &str = "null";

#[derive(Debug, Clone)]
pub struct ServerSessionConfig {
    pub(crate) name: Cow<'static, str>,
    pub(crate) max_age: Option<Duration>,
    pub(crate) path: Cow<'static, str>,
    pub(crate) domain: Option<Cow<'static, str>>,
    pub(crate) same_site: SameSite,
    pub(crate) https_only: bool,
    pub(crate) session_id_length: usize,
    pub(crate) clear_stale_cookie: bool,
}

impl Default for ServerSessionConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_COOKIE_NAME.into(),
            max_age: Some(DEFAULT_MAX_AGE),
            path: "/".into(),
            domain: None,
            same_site: SameSite::Lax,
            https_only: false,
            session_id_length: DEFAULT_SESSION_ID_LENGTH,
            clear_stale_cookie: false,
        }
    }
}

impl ServerSessionConfig {
    #[must_use]
    pub fn with_name<N: Into<Cow<'static, str>>>(mut self, name: N) -> Self {
        self.name = name.into();
        self
    }

    /// Lifetime of new sessions, used both as the cookie's `Max-Age` and as the store TTL.
    ///
    /// `None` or a non-positive duration disables expiry entirely; sessions then live until they
    /// are cleared.
    #[must_use]
    pub fn with_max_age(mut self, max_age: Option<Duration>) -> Self {
        self.max_age = max_age.filter(|max_age| max_age.is_positive());
        self
    }

    #[must_use]
    pub fn with_path<P: Into<Cow<'static, str>>>(mut self, path: P) -> Self {
        self.path = path.into();
        self
    }

    #[must_use]
    pub fn with_domain<D: Into<Cow<'static, str>>>(mut self, domain: D) -> Self {
        self.domain = Some(domain.into());
        self
    }

    #[must_use]
    pub fn without_domain(mut self) -> Self {
        self.domain = None;
        self
    }

    #[must_use]
    pub fn with_same_site(mut self, same_site: SameSite) -> Self {
        self.same_site = same_site;
        self
    }

    /// Mark the cookie `Secure`, so browsers only send it over HTTPS.
    #[must_use]
    pub fn with_https_only(mut self, https_only: bool) -> Self {
        self.https_only = https_only;
        self
    }

    /// Number of random bytes in a session id (the id itself is hex, so twice as long).
    #[must_use]
    pub fn with_session_id_length(mut self, length: usize) -> Self {
        self.session_id_length = length.max(1);
        self
    }

    /// Clear the client's cookie when it carried an invalid signature or a session the store no
    /// longer has, and the request did not create a new session.
    #[must_use]
    pub fn with_clear_stale_cookie(mut self, clear_stale_cookie: bool) -> Self {
        self.clear_stale_cookie = clear_stale_cookie;
        self
    }

    pub(crate) fn build_cookie(&self, value: String) -> Cookie<'static> {
        let mut cookie_builder = Cookie::build((self.name.clone(), value))
            .path(self.path.clone())
            .http_only(true)
            .same_site(self.same_site)
            .secure(self.https_only);

        if let Some(max_age) = self.max_age {
            cookie_builder = cookie_builder.max_age(max_age);
        }

        if let Some(domain) = self.domain.clone() {
            cookie_builder = cookie_builder.domain(domain);
        }

        cookie_builder.build()
    }

    pub(crate) fn build_removal_cookie(&self) -> Cookie<'static> {
        let mut cookie_builder = Cookie::build((self.name.clone(), CLEARED_COOKIE_VALUE))
            .path(self.path.clone())
            .expires(OffsetDateTime::UNIX_EPOCH)
            .http_only(true)
            .same_site(self.same_site)
            .secure(self.https_only);

        if let Some(domain) = self.domain.clone() {
            cookie_builder = cookie_builder.domain(domain);
        }

        cookie_builder.build()
    }
}
