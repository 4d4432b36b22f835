use std::sync::Arc;

use super::{App, Connection, Context, FunctionDescriptor, Invocation, Outcome};

pub struct Dispatcher {
    connection: Arc<dyn Connection>,
    apps: Vec<App>,
}

/// Pairs the apps with a connection. Nothing happens until `start`.
pub fn connect(connection: Arc<dyn Connection>, apps: Vec<App>) -> Dispatcher {
    Dispatcher::new(connection, apps)
}

impl Dispatcher {
    pub fn new(connection: Arc<dyn Connection>, apps: Vec<App>) -> Self {
        Dispatcher { connection, apps }
    }

    pub fn apps(&self) -> &[App] {
        &self.apps
    }

    /// Opens the connection and serves invocations until an error occurs.
    /// Waiting for work is left to `Connection::receive`.
    pub async fn start(&self) -> anyhow::Result<()> {
        self.connection.open(&self.apps).await?;

        tracing::info!("dispatcher: starting event loop");

        loop {
            if let Some(invocation) = self.connection.receive().await? {
                tracing::info!("processing invocation: {}", invocation.id);

                let outcomes = self.dispatch(&invocation).await;
                self.connection.respond(&invocation, outcomes).await?;
            }
        }
    }

    pub async fn dispatch(&self, invocation: &Invocation) -> Vec<Outcome> {
        match &invocation.function_id {
            Some(function_id) => {
                let target = self
                    .apps
                    .iter()
                    .filter(|app| {
                        invocation
                            .app_id
                            .as_deref()
                            .map_or(true, |app_id| app_id == app.app_id())
                    })
                    .find_map(|app| app.function(function_id).map(|function| (app, function)));

                match target {
                    Some((app, function)) => vec![run(app, function, invocation).await],
                    None => {
                        tracing::warn!(
                            "no function '{}' registered for app {:?}",
                            function_id,
                            invocation.app_id
                        );
                        vec![]
                    }
                }
            }
            None => {
                let mut outcomes = Vec::new();

                for app in &self.apps {
                    for function in app.triggered_by(&invocation.event) {
                        outcomes.push(run(app, function, invocation).await);
                    }
                }

                if outcomes.is_empty() {
                    tracing::info!("no function triggered by event '{}'", invocation.event.name);
                }

                outcomes
            }
        }
    }
}

#[tracing::instrument(name = "dispatcher::run", skip_all, fields(app_id = %app.app_id(), function_id = %function.id()))]
async fn run(app: &App, function: &FunctionDescriptor, invocation: &Invocation) -> Outcome {
    let events = if invocation.events.is_empty() {
        vec![invocation.event.clone()]
    } else {
        invocation.events.clone()
    };

    let ctx = Context {
        app_id: app.app_id().to_owned(),
        function_id: function.id().to_owned(),
        run_id: invocation.run_id.clone(),
        attempt: invocation.attempt,
        event: invocation.event.clone(),
        events,
    };

    match function.invoke(ctx).await {
        Ok(output) => Outcome::Completed {
            app_id: app.app_id().to_owned(),
            function_id: function.id().to_owned(),
            output,
        },
        Err(err) => {
            tracing::warn!("function failed: {:#}", err);

            Outcome::Failed {
                app_id: app.app_id().to_owned(),
                function_id: function.id().to_owned(),
                error: format!("{:#}", err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::{Duration, Instant};

    use async_trait::async_trait;
    use serde_json::{json, Value};

    use super::*;
    use crate::{Client, Event, Trigger};

    #[derive(Default)]
    struct ScriptedConnection {
        opened: Mutex<Vec<String>>,
        pending: Mutex<Vec<Option<Invocation>>>,
        responded: Mutex<Vec<Vec<Outcome>>>,
    }

    #[async_trait]
    impl Connection for ScriptedConnection {
        async fn open(&self, apps: &[App]) -> anyhow::Result<()> {
            let mut opened = self.opened.lock().unwrap();
            opened.extend(apps.iter().map(|app| app.app_id().to_owned()));

            Ok(())
        }

        async fn receive(&self) -> anyhow::Result<Option<Invocation>> {
            let mut pending = self.pending.lock().unwrap();

            if pending.is_empty() {
                anyhow::bail!("script exhausted");
            }

            Ok(pending.remove(0))
        }

        async fn respond(
            &self,
            _invocation: &Invocation,
            outcomes: Vec<Outcome>,
        ) -> anyhow::Result<()> {
            self.responded.lock().unwrap().push(outcomes);

            Ok(())
        }
    }

    async fn greet(ctx: Context) -> anyhow::Result<String> {
        Ok(format!("hi {}", ctx.event.data["name"].as_str().unwrap_or("anon")))
    }

    async fn explode(_ctx: Context) -> anyhow::Result<Value> {
        Err(anyhow::anyhow!("inventory service unavailable"))
    }

    fn apps() -> Vec<App> {
        let shop = App::new(
            Client::new("shop"),
            vec![
                FunctionDescriptor::new("greet", Trigger::event("user.signed_up"), greet),
                FunctionDescriptor::new("explode", Trigger::event("order.placed"), explode),
            ],
        )
        .unwrap();

        let mailer = App::new(
            Client::new("mailer"),
            vec![FunctionDescriptor::new(
                "welcome",
                Trigger::event("user.signed_up"),
                greet,
            )],
        )
        .unwrap();

        vec![shop, mailer]
    }

    fn dispatcher() -> Dispatcher {
        connect(Arc::new(ScriptedConnection::default()), apps())
    }

    #[tokio::test]
    async fn test_event_runs_every_matching_function() {
        let event = Event::new("user.signed_up", json!({ "name": "ana" }));
        let outcomes = dispatcher().dispatch(&Invocation::for_event(event)).await;

        let ids: Vec<&str> = outcomes.iter().map(|o| o.function_id()).collect();
        assert_eq!(ids, vec!["greet", "welcome"]);
        assert!(outcomes.iter().all(|o| o.is_completed()));

        assert_eq!(
            outcomes[0],
            Outcome::Completed {
                app_id: "shop".to_owned(),
                function_id: "greet".to_owned(),
                output: json!("hi ana"),
            }
        );
    }

    #[tokio::test]
    async fn test_unmatched_event_runs_nothing() {
        let event = Event::new("user.deleted", Value::Null);

        assert!(dispatcher()
            .dispatch(&Invocation::for_event(event))
            .await
            .is_empty());
    }

    #[tokio::test]
    async fn test_targeted_invocation_ignores_trigger_name() {
        let event = Event::new("manual.replay", json!({ "name": "bo" }));
        let invocation = Invocation::for_function("mailer", "welcome", event);

        let outcomes = dispatcher().dispatch(&invocation).await;

        assert_eq!(outcomes.len(), 1);
        assert_eq!(
            outcomes[0],
            Outcome::Completed {
                app_id: "mailer".to_owned(),
                function_id: "welcome".to_owned(),
                output: json!("hi bo"),
            }
        );
    }

    #[tokio::test]
    async fn test_targeted_invocation_respects_app_id() {
        let event = Event::new("user.signed_up", Value::Null);
        let invocation = Invocation::for_function("mailer", "greet", event);

        assert!(dispatcher().dispatch(&invocation).await.is_empty());
    }

    #[tokio::test]
    async fn test_handler_error_becomes_failed_outcome() {
        let event = Event::new("order.placed", Value::Null);
        let outcomes = dispatcher().dispatch(&Invocation::for_event(event)).await;

        assert_eq!(
            outcomes,
            vec![Outcome::Failed {
                app_id: "shop".to_owned(),
                function_id: "explode".to_owned(),
                error: "inventory service unavailable".to_owned(),
            }]
        );
    }

    #[tokio::test]
    async fn test_start_opens_and_answers_until_connection_errors() {
        let connection = Arc::new(ScriptedConnection::default());
        connection
            .pending
            .lock()
            .unwrap()
            .push(Some(Invocation::for_event(Event::new(
                "user.signed_up",
                Value::Null,
            ))));

        let dispatcher = connect(Arc::clone(&connection) as Arc<dyn Connection>, apps());
        let err = dispatcher.start().await.unwrap_err();

        assert_eq!(err.to_string(), "script exhausted");
        assert_eq!(*connection.opened.lock().unwrap(), vec!["shop", "mailer"]);

        let responded = connection.responded.lock().unwrap();
        assert_eq!(responded.len(), 1);
        assert_eq!(responded[0].len(), 2);
    }

    #[tokio::test]
    async fn test_start_polls_again_right_after_empty_receive() {
        let connection = Arc::new(ScriptedConnection::default());
        connection.pending.lock().unwrap().extend([
            None,
            None,
            Some(Invocation::for_event(Event::new("user.signed_up", Value::Null))),
        ]);

        let dispatcher = connect(Arc::clone(&connection) as Arc<dyn Connection>, apps());

        let started = Instant::now();
        let err = dispatcher.start().await.unwrap_err();

        assert_eq!(err.to_string(), "script exhausted");
        assert!(started.elapsed() < Duration::from_millis(200));
        assert_eq!(connection.responded.lock().unwrap().len(), 1);
    }
}
