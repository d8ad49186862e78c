//! Transport settings for [`HyperClient`](crate::HyperClient).
//!
//! Call duration is owned by endpoints: the supervisor bounds each call with
//! the endpoint timeout. The transport therefore leaves round trips unbounded
//! unless `request_timeout` is set, and only limits how long a connection
//! attempt may take.

use std::time::Duration;

/// `User-Agent` sent when a request does not carry its own.
pub const DEFAULT_USER_AGENT: &str = concat!("courier/", env!("CARGO_PKG_VERSION"));

/// Connection pool and timeout settings of the default transport.
///
/// Values are set with consuming `with_*` methods on top of
/// [`ClientConfig::default`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    request_timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    max_idle_per_host: usize,
    idle_timeout: Option<Duration>,
    user_agent: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: None,
            connect_timeout: Some(Duration::from_secs(10)),
            max_idle_per_host: 32,
            idle_timeout: Some(Duration::from_secs(90)),
            user_agent: Some(DEFAULT_USER_AGENT.to_string()),
        }
    }
}

impl ClientConfig {
    /// Bound every round trip, body included, independently of endpoint timeouts.
    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Limit connection attempts; `None` waits for the OS.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Keep at most `count` idle connections per host. Zero disables pooling.
    #[must_use]
    pub const fn with_max_idle_per_host(mut self, count: usize) -> Self {
        self.max_idle_per_host = count;
        self
    }

    /// Close idle connections after `timeout`; `None` keeps them open.
    #[must_use]
    pub const fn with_idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Default `User-Agent`; `None` sends none.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: Option<impl Into<String>>) -> Self {
        self.user_agent = user_agent.map(Into::into);
        self
    }

    /// Round-trip bound, when set.
    #[must_use]
    pub const fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout
    }

    /// Connection attempt bound, when set.
    #[must_use]
    pub const fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout
    }

    /// Idle connections kept per host.
    #[must_use]
    pub const fn max_idle_per_host(&self) -> usize {
        self.max_idle_per_host
    }

    /// Idle connection lifetime, when bounded.
    #[must_use]
    pub const fn idle_timeout(&self) -> Option<Duration> {
        self.idle_timeout
    }

    /// Default `User-Agent`, when one is sent.
    #[must_use]
    pub fn user_agent(&self) -> Option<&str> {
        self.user_agent.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use assert2::check;

    use super::*;

    #[test]
    fn round_trips_are_unbounded_by_default() {
        let config = ClientConfig::default();
        check!(config.request_timeout().is_none());
        check!(config.connect_timeout() == Some(Duration::from_secs(10)));
        check!(config.max_idle_per_host() == 32);
        check!(config.idle_timeout() == Some(Duration::from_secs(90)));
        check!(config.user_agent() == Some(DEFAULT_USER_AGENT));
    }

    #[test]
    fn setters_change_only_their_field() {
        let config = ClientConfig::default()
            .with_request_timeout(Duration::from_secs(60))
            .with_max_idle_per_host(0)
            .with_user_agent(None::<String>);

        check!(config.request_timeout() == Some(Duration::from_secs(60)));
        check!(config.max_idle_per_host() == 0);
        check!(config.user_agent().is_none());
        check!(config.connect_timeout() == ClientConfig::default().connect_timeout());
    }

    #[test]
    fn default_user_agent_names_the_crate() {
        check!(DEFAULT_USER_AGENT.starts_with("courier/"));
    }
}
