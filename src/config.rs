//! Process-wide configuration, read from the environment exactly once at
//! startup and passed down by value. Nothing below `main` re-reads env vars;
//! in particular the local-vs-external verification path is fixed when the
//! gate is composed, not re-evaluated per request.

use anyhow::{Context, Result, bail};

/// External credential provider endpoint. Present only when both the URL and
/// the API key are configured; the pair is all the gate needs to delegate
/// secret verification.
#[derive(Debug, Clone)]
pub struct ExternalProvider {
    pub base_url: String,
    pub api_key: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    /// Allowed email-domain suffix for identities, including the leading '@'.
    pub email_domain: String,
    pub session_ttl_secs: u64,
    pub external_provider: Option<ExternalProvider>,
    /// Seed account created on first start so an empty store is reachable.
    pub seed_admin_email: String,
    pub seed_admin_password: String,
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).ok().filter(|v| !v.is_empty()).unwrap_or_else(|| default.to_string())
}

/// Ensure a domain suffix carries its leading '@' so `ends_with` checks
/// cannot match a longer domain by accident (e.g. "college.edu" matching
/// "evilcollege.edu").
pub fn normalize_domain(domain: &str) -> String {
    let d = domain.trim();
    if d.starts_with('@') { d.to_string() } else { format!("@{}", d) }
}

impl Config {
    pub fn from_env() -> Result<Config> {
        let http_port: u16 = env_or("NEXUS_HTTP_PORT", "8080")
            .parse()
            .context("NEXUS_HTTP_PORT must be a port number")?;
        let email_domain = normalize_domain(&env_or("NEXUS_EMAIL_DOMAIN", "@college.edu"));
        let session_ttl_secs: u64 = env_or("NEXUS_SESSION_TTL_SECS", "3600")
            .parse()
            .context("NEXUS_SESSION_TTL_SECS must be seconds")?;

        let auth_url = std::env::var("NEXUS_AUTH_URL").ok().filter(|v| !v.is_empty());
        let auth_key = std::env::var("NEXUS_AUTH_KEY").ok().filter(|v| !v.is_empty());
        let external_provider = match (auth_url, auth_key) {
            (Some(base_url), Some(api_key)) => Some(ExternalProvider { base_url, api_key }),
            (None, None) => None,
            _ => bail!("NEXUS_AUTH_URL and NEXUS_AUTH_KEY must be set together"),
        };

        let seed_admin_email = std::env::var("NEXUS_ADMIN_EMAIL")
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| format!("admin{}", email_domain));
        let seed_admin_password = env_or("NEXUS_ADMIN_PASSWORD", "nexusgate");

        Ok(Config {
            http_port,
            email_domain,
            session_ttl_secs,
            external_provider,
            seed_admin_email,
            seed_admin_password,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_domain_keeps_or_adds_at_sign() {
        assert_eq!(normalize_domain("@college.edu"), "@college.edu");
        assert_eq!(normalize_domain("college.edu"), "@college.edu");
        assert_eq!(normalize_domain("  college.edu "), "@college.edu");
    }
}
