use serde::{Deserialize, Serialize};
use ukuvi_core::{App, Trigger};
use url::Url;

const SDK_NAME: &str = concat!("ukuvi-rust:v", env!("CARGO_PKG_VERSION"));

/// Body of the app sync call made to the orchestrator at startup.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct RegisterRequest {
    pub url: String,
    pub app_name: String,
    pub sdk: String,
    pub functions: Vec<FunctionRegistration>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct FunctionRegistration {
    pub id: String,
    pub name: String,
    pub triggers: Vec<Trigger>,
    pub url: String,
}

impl RegisterRequest {
    pub fn new<F>(app: &App, url: &str, function_url: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> anyhow::Result<String>,
    {
        let functions = app
            .functions()
            .iter()
            .map(|function| -> anyhow::Result<FunctionRegistration> {
                Ok(FunctionRegistration {
                    id: function.id().to_owned(),
                    name: function.id().to_owned(),
                    triggers: vec![function.trigger().clone()],
                    url: function_url(function.id())?,
                })
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        Ok(RegisterRequest {
            url: url.to_owned(),
            app_name: app.app_id().to_owned(),
            sdk: SDK_NAME.to_owned(),
            functions,
        })
    }
}

#[tracing::instrument(name = "http::register", skip_all, fields(app_name = %request.app_name))]
pub async fn register(
    http: &reqwest::Client,
    orchestrator_url: &Url,
    signing_key: Option<&str>,
    request: &RegisterRequest,
) -> anyhow::Result<()> {
    let register_url = orchestrator_url.join("fn/register")?;

    let mut builder = http.post(register_url).json(request);
    if let Some(signing_key) = signing_key {
        builder = builder.bearer_auth(signing_key);
    }

    builder.send().await?.error_for_status()?;

    Ok(())
}
