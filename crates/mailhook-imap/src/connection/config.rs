//! Connection configuration types.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Connection security mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Security {
    /// No encryption.
    #[default]
    None,
    /// Start with plaintext, upgrade with STARTTLS before login.
    StartTls,
    /// TLS from the start.
    Implicit,
}

impl Security {
    /// Returns the configuration keyword for this mode.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::StartTls => "starttls",
            Self::Implicit => "ssl",
        }
    }

    /// Returns true if the connection ends up encrypted.
    #[must_use]
    pub const fn is_encrypted(self) -> bool {
        !matches!(self, Self::None)
    }
}

impl FromStr for Security {
    type Err = UnknownMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "starttls" => Ok(Self::StartTls),
            "ssl" | "tls" => Ok(Self::Implicit),
            _ => Err(UnknownMode(s.to_string())),
        }
    }
}

/// How strictly the server certificate is validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CertificateCheck {
    /// Any certificate is accepted.
    None,
    /// A presented chain is validated like with `Required`.
    Optional,
    /// The chain must validate.
    #[default]
    Required,
}

impl CertificateCheck {
    /// Returns the configuration keyword for this mode.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Optional => "optional",
            Self::Required => "required",
        }
    }
}

impl FromStr for CertificateCheck {
    type Err = UnknownMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "optional" => Ok(Self::Optional),
            "required" => Ok(Self::Required),
            _ => Err(UnknownMode(s.to_string())),
        }
    }
}

/// A mode keyword that is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown mode {0:?}")]
pub struct UnknownMode(pub String);

/// Login credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Login name.
    pub username: String,
    /// Password, empty when none is configured.
    pub password: String,
}

impl Credentials {
    /// Creates credentials.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// IMAP server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server hostname.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Login credentials.
    pub credentials: Option<Credentials>,
    /// Security mode.
    pub security: Security,
    /// Certificate validation mode.
    pub certificate_check: CertificateCheck,
    /// PEM bundle replacing the built-in trust roots.
    pub ca_file: Option<PathBuf>,
    /// Whether the certificate must match the hostname.
    pub hostname_check: bool,
    /// TCP connection timeout.
    pub connect_timeout: Duration,
}

impl ServerConfig {
    /// Default IMAP port.
    pub const DEFAULT_PORT: u16 = 143;

    /// Creates a plaintext configuration on port 143.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        ServerConfigBuilder::new(host).build()
    }

    /// Creates a configuration builder.
    #[must_use]
    pub fn builder(host: impl Into<String>) -> ServerConfigBuilder {
        ServerConfigBuilder::new(host)
    }

    /// Returns `host:port`.
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Builder for [`ServerConfig`].
#[derive(Debug, Clone)]
pub struct ServerConfigBuilder {
    host: String,
    port: u16,
    credentials: Option<Credentials>,
    security: Security,
    certificate_check: CertificateCheck,
    ca_file: Option<PathBuf>,
    hostname_check: bool,
    connect_timeout: Duration,
}

impl ServerConfigBuilder {
    /// Creates a new builder with the given hostname.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: ServerConfig::DEFAULT_PORT,
            credentials: None,
            security: Security::None,
            certificate_check: CertificateCheck::Required,
            ca_file: None,
            hostname_check: true,
            connect_timeout: Duration::from_secs(30),
        }
    }

    /// Sets the port.
    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the credentials.
    #[must_use]
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Some(Credentials::new(username, password));
        self
    }

    /// Sets the security mode.
    #[must_use]
    pub const fn security(mut self, security: Security) -> Self {
        self.security = security;
        self
    }

    /// Sets the certificate validation mode.
    #[must_use]
    pub const fn certificate_check(mut self, check: CertificateCheck) -> Self {
        self.certificate_check = check;
        self
    }

    /// Sets a CA bundle.
    #[must_use]
    pub fn ca_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.ca_file = Some(path.into());
        self
    }

    /// Enables or disables hostname verification.
    #[must_use]
    pub const fn hostname_check(mut self, enabled: bool) -> Self {
        self.hostname_check = enabled;
        self
    }

    /// Sets the connection timeout.
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> ServerConfig {
        ServerConfig {
            host: self.host,
            port: self.port,
            credentials: self.credentials,
            security: self.security,
            certificate_check: self.certificate_check,
            ca_file: self.ca_file,
            hostname_check: self.hostname_check,
            connect_timeout: self.connect_timeout,
        }
    }
}
