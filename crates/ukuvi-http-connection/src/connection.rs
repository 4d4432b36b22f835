use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use tokio::sync::{mpsc, oneshot};
use ukuvi_core::{App, Connection, Invocation, Outcome};
use uuid::Uuid;

use crate::register::{register, RegisterRequest};
use crate::routes::{router, AppSummary};
use crate::HttpConnectionConfig;

const INVOCATION_QUEUE_DEPTH: usize = 64;
const RECEIVE_TIMEOUT: Duration = Duration::from_secs(1);

type PendingReplies = HashMap<Uuid, oneshot::Sender<Vec<Outcome>>>;

/// State shared between the HTTP handlers and the connection.
pub(crate) struct Shared {
    apps: RwLock<Vec<AppSummary>>,
    signing_key: Option<String>,
    sender: mpsc::Sender<Invocation>,
    pending: Mutex<PendingReplies>,
}

impl Shared {
    pub(crate) fn apps(&self) -> anyhow::Result<Vec<AppSummary>> {
        let apps = self
            .apps
            .read()
            .map_err(|_| anyhow::anyhow!("app summaries lock poisoned"))?;

        Ok(apps.clone())
    }

    pub(crate) fn signing_key(&self) -> Option<&str> {
        self.signing_key.as_deref()
    }

    /// Queues an invocation for the dispatcher and waits for its outcomes.
    pub(crate) async fn deliver(&self, invocation: Invocation) -> anyhow::Result<Vec<Outcome>> {
        let invocation_id = invocation.id;

        // Reply slot and queued invocation are installed together, after the
        // only await that can be cancelled while the queue is full.
        let permit = self
            .sender
            .reserve()
            .await
            .map_err(|_| anyhow::anyhow!("dispatcher is not receiving invocations"))?;

        let (reply, outcomes) = oneshot::channel();
        self.pending()?.insert(invocation_id, reply);
        permit.send(invocation);

        outcomes
            .await
            .map_err(|_| anyhow::anyhow!("invocation {} dropped without a response", invocation_id))
    }

    fn pending(&self) -> anyhow::Result<MutexGuard<'_, PendingReplies>> {
        self.pending
            .lock()
            .map_err(|_| anyhow::anyhow!("pending invocations lock poisoned"))
    }
}

pub struct HttpConnection {
    config: HttpConnectionConfig,
    http: reqwest::Client,
    shared: Arc<Shared>,
    receiver: tokio::sync::Mutex<mpsc::Receiver<Invocation>>,
}

impl HttpConnection {
    pub fn new(config: HttpConnectionConfig) -> Self {
        let (sender, receiver) = mpsc::channel(INVOCATION_QUEUE_DEPTH);

        let shared = Arc::new(Shared {
            apps: RwLock::new(vec![]),
            signing_key: config.signing_key.clone(),
            sender,
            pending: Mutex::new(HashMap::new()),
        });

        HttpConnection {
            config,
            http: reqwest::Client::new(),
            shared,
            receiver: tokio::sync::Mutex::new(receiver),
        }
    }

    pub fn config(&self) -> &HttpConnectionConfig {
        &self.config
    }

    /// Makes the apps visible to the HTTP routes without binding a listener.
    pub fn install(&self, apps: &[App]) -> anyhow::Result<()> {
        let mut summaries = self
            .shared
            .apps
            .write()
            .map_err(|_| anyhow::anyhow!("app summaries lock poisoned"))?;

        *summaries = apps.iter().map(AppSummary::from).collect();

        Ok(())
    }

    pub fn router(&self) -> Router {
        router(Arc::clone(&self.shared))
    }

    fn function_url(&self, app_id: &str, function_id: &str) -> anyhow::Result<String> {
        let url = self
            .config
            .public_url
            .join(&format!("api/apps/{}/functions/{}", app_id, function_id))?;

        Ok(url.to_string())
    }

    fn registration(&self, app: &App) -> anyhow::Result<RegisterRequest> {
        RegisterRequest::new(app, self.config.public_url.as_str(), |function_id| {
            self.function_url(app.app_id(), function_id)
        })
    }
}

#[async_trait]
impl Connection for HttpConnection {
    async fn open(&self, apps: &[App]) -> anyhow::Result<()> {
        self.install(apps)?;

        let server = axum::Server::try_bind(&self.config.endpoint)?
            .serve(self.router().into_make_service());

        tracing::info!("http connection listening on {}", server.local_addr());

        tokio::spawn(async move {
            if let Err(err) = server.await {
                tracing::error!("http connection server failed: {}", err);
            }
        });

        match &self.config.orchestrator_url {
            Some(orchestrator_url) => {
                for app in apps {
                    let request = self.registration(app)?;

                    register(
                        &self.http,
                        orchestrator_url,
                        self.config.signing_key.as_deref(),
                        &request,
                    )
                    .await?;

                    tracing::info!(
                        "registered app '{}' with {}",
                        app.app_id(),
                        orchestrator_url
                    );
                }
            }
            None => {
                tracing::info!("no orchestrator url configured, skipping registration");
            }
        }

        Ok(())
    }

    async fn receive(&self) -> anyhow::Result<Option<Invocation>> {
        let mut receiver = self.receiver.lock().await;

        match tokio::time::timeout(RECEIVE_TIMEOUT, receiver.recv()).await {
            Ok(Some(invocation)) => Ok(Some(invocation)),
            Ok(None) => anyhow::bail!("http connection closed"),
            Err(_) => Ok(None),
        }
    }

    async fn respond(
        &self,
        invocation: &Invocation,
        outcomes: Vec<Outcome>,
    ) -> anyhow::Result<()> {
        let reply = self.shared.pending()?.remove(&invocation.id);

        match reply {
            Some(reply) => {
                if reply.send(outcomes).is_err() {
                    tracing::warn!("caller for invocation {} went away", invocation.id);
                }
            }
            None => {
                tracing::warn!("no pending request for invocation {}", invocation.id);
            }
        }

        Ok(())
    }
}
