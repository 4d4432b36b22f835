use std::net::SocketAddr;

use url::Url;

const DEFAULT_WORKER_ENDPOINT: &str = "0.0.0.0:3000";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpConnectionConfig {
    pub endpoint: SocketAddr,
    pub public_url: Url,
    pub orchestrator_url: Option<Url>,
    pub signing_key: Option<String>,
}

impl HttpConnectionConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| dotenvy::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let endpoint =
            lookup("WORKER_ENDPOINT").unwrap_or_else(|| DEFAULT_WORKER_ENDPOINT.to_owned());
        let endpoint: SocketAddr = endpoint
            .parse()
            .map_err(|err| anyhow::anyhow!("invalid WORKER_ENDPOINT '{}': {}", endpoint, err))?;

        let public_url =
            lookup("WORKER_PUBLIC_URL").unwrap_or_else(|| format!("http://{}", endpoint));
        let public_url = parse_url("WORKER_PUBLIC_URL", &public_url)?;

        let orchestrator_url = match lookup("ORCHESTRATOR_URL") {
            Some(orchestrator_url) => Some(parse_url("ORCHESTRATOR_URL", &orchestrator_url)?),
            None => None,
        };

        let signing_key = lookup("ORCHESTRATOR_SIGNING_KEY").filter(|key| !key.is_empty());

        Ok(HttpConnectionConfig {
            endpoint,
            public_url,
            orchestrator_url,
            signing_key,
        })
    }
}

// Url::join drops the last path segment of a base without a trailing slash.
fn parse_url(name: &str, value: &str) -> anyhow::Result<Url> {
    let value = if value.ends_with('/') {
        value.to_owned()
    } else {
        format!("{}/", value)
    };

    Url::parse(&value).map_err(|err| anyhow::anyhow!("invalid {} '{}': {}", name, value, err))
}
