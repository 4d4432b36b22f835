use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use ukuvi_core::{App, Connection, Invocation, Outcome};

const EMPTY_RECEIVE_WAIT: Duration = Duration::from_millis(250);

#[derive(Debug, Default)]
pub struct MemoryConnection {
    registered: Mutex<Vec<String>>,
    invocations: Mutex<VecDeque<Invocation>>,
    responses: Mutex<Vec<(Invocation, Vec<Outcome>)>>,
}

impl MemoryConnection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn send(&self, invocation: Invocation) -> anyhow::Result<()> {
        lock(&self.invocations)?.push_back(invocation);

        Ok(())
    }

    /// App ids seen by `open`, in order.
    pub fn registered(&self) -> anyhow::Result<Vec<String>> {
        Ok(lock(&self.registered)?.clone())
    }

    pub fn responses(&self) -> anyhow::Result<Vec<(Invocation, Vec<Outcome>)>> {
        Ok(lock(&self.responses)?.clone())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> anyhow::Result<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|_| anyhow::anyhow!("memory connection lock poisoned"))
}

#[async_trait]
impl Connection for MemoryConnection {
    async fn open(&self, apps: &[App]) -> anyhow::Result<()> {
        let mut registered = lock(&self.registered)?;

        registered.extend(apps.iter().map(|app| app.app_id().to_owned()));

        Ok(())
    }

    async fn receive(&self) -> anyhow::Result<Option<Invocation>> {
        let invocation = lock(&self.invocations)?.pop_front();

        if invocation.is_none() {
            tokio::time::sleep(EMPTY_RECEIVE_WAIT).await;
        }

        Ok(invocation)
    }

    async fn respond(
        &self,
        invocation: &Invocation,
        outcomes: Vec<Outcome>,
    ) -> anyhow::Result<()> {
        let mut responses = lock(&self.responses)?;

        responses.push((invocation.clone(), outcomes));

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use serde_json::json;
    use ukuvi_core::Event;

    use super::*;

    #[tokio::test]
    async fn test_send_receive_respond() {
        let connection = MemoryConnection::new();

        let first = Invocation::for_event(Event::new("invoice.issued", json!({ "total": 12 })));
        let second = Invocation::for_function("billing", "archive", Event::default());

        connection.send(first.clone()).unwrap();
        connection.send(second.clone()).unwrap();

        let received = connection.receive().await.unwrap().unwrap();
        assert_eq!(received, first);

        let outcomes = vec![Outcome::Completed {
            app_id: "billing".to_owned(),
            function_id: "archive".to_owned(),
            output: json!(null),
        }];
        connection.respond(&received, outcomes.clone()).await.unwrap();

        assert_eq!(connection.receive().await.unwrap().unwrap(), second);
        assert!(connection.receive().await.unwrap().is_none());

        let responses = connection.responses().unwrap();
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].0.id, first.id);
        assert_eq!(responses[0].1, outcomes);
    }

    #[tokio::test]
    async fn test_empty_receive_waits_before_returning() {
        let connection = MemoryConnection::new();

        let started = Instant::now();
        assert!(connection.receive().await.unwrap().is_none());
        assert!(started.elapsed() >= EMPTY_RECEIVE_WAIT);

        connection.send(Invocation::for_event(Event::default())).unwrap();

        let started = Instant::now();
        assert!(connection.receive().await.unwrap().is_some());
        assert!(started.elapsed() < EMPTY_RECEIVE_WAIT);
    }
}
