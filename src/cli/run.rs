//! `roleplex run`: start the configured agents and route queue traffic.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use roleplex::agent::{Agent, StatusReport};
use roleplex::bus::{InMemoryQueue, Message, MessageQueue, SharedQueue};
use roleplex::config::{QueueConfig, RuntimeConfig};
use roleplex::roles::RoleProvider;

/// How long the router blocks on an empty queue before re-checking shutdown.
const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// What the router did with one message.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Delivery {
    Heartbeat,
    Delivered { handled: bool },
    Unroutable,
}

pub(crate) fn build_queue(cfg: &QueueConfig) -> SharedQueue {
    match cfg.capacity {
        Some(capacity) => Arc::new(InMemoryQueue::bounded(capacity)),
        None => InMemoryQueue::shared(),
    }
}

/// Hands `message` to the agent it is addressed to.
pub(crate) async fn route(message: Message, agents: &[Arc<Agent>]) -> Delivery {
    if message.is_heartbeat() {
        info!(
            agent_id = %message.sender_id(),
            status = ?message.field("status"),
            messages_processed = ?message.field("messages_processed"),
            error_count = ?message.field("error_count"),
            "Heartbeat"
        );
        return Delivery::Heartbeat;
    }

    let target = message
        .recipient_id()
        .and_then(|id| agents.iter().find(|a| a.agent_id() == id));
    match target {
        Some(agent) => {
            let handled = agent.process_message(message).await;
            Delivery::Delivered { handled }
        }
        None => {
            warn!(
                sender = %message.sender_id(),
                recipient = ?message.recipient_id(),
                message_type = %message.message_type(),
                "Dropping message with no matching agent"
            );
            Delivery::Unroutable
        }
    }
}

async fn router_loop(queue: SharedQueue, agents: Vec<Arc<Agent>>, token: CancellationToken) {
    loop {
        let next = tokio::select! {
            biased;
            _ = token.cancelled() => break,
            next = queue.get(POLL_INTERVAL) => next,
        };
        if let Some(message) = next {
            let delivery = route(message, &agents).await;
            debug!(?delivery, "Routed message");
        }
    }
}

async fn wait_for_shutdown(duration: Option<u64>) {
    let elapsed = async {
        match duration {
            Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("Received Ctrl-C, stopping agents"),
        _ = elapsed => info!("Run duration elapsed, stopping agents"),
    }
}

/// Run every configured agent until Ctrl-C or `duration` seconds.
pub(crate) async fn cmd_run(config: RuntimeConfig, duration: Option<u64>) -> Result<()> {
    if config.agents.is_empty() {
        println!("No agents configured. Add entries under \"agents\" in the config file.");
        return Ok(());
    }

    let queue = build_queue(&config.queue);
    let provider = Arc::new(RoleProvider::with_builtin_roles());

    let mut agents = Vec::with_capacity(config.agents.len());
    for agent_config in config.agents {
        let agent = Arc::new(Agent::new(
            agent_config,
            Arc::clone(&provider),
            Arc::clone(&queue),
        ));
        if !agent.start().await {
            warn!(agent_id = %agent.agent_id(), "Agent failed to start");
        }
        agents.push(agent);
    }
    info!(agents = agents.len(), "Roleplex running");

    let token = CancellationToken::new();
    let router = tokio::spawn(router_loop(
        Arc::clone(&queue),
        agents.clone(),
        token.clone(),
    ));

    wait_for_shutdown(duration).await;
    token.cancel();
    router.await.context("Router task failed")?;

    for agent in &agents {
        agent.stop().await;
    }

    let statuses: Vec<StatusReport> = agents.iter().map(|a| a.get_status()).collect();
    println!(
        "{}",
        serde_json::to_string_pretty(&statuses).context("Failed to serialize agent status")?
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use roleplex::config::AgentConfig;

    async fn running_echo(queue: &SharedQueue) -> Arc<Agent> {
        let agent = Arc::new(Agent::new(
            AgentConfig::new("echo-1", "echo").unwrap(),
            Arc::new(RoleProvider::with_builtin_roles()),
            Arc::clone(queue),
        ));
        assert!(agent.start().await);
        agent
    }

    #[test]
    fn test_build_queue_respects_capacity() {
        let bounded = build_queue(&QueueConfig { capacity: Some(1) });
        bounded.put(Message::new("a", "x")).unwrap();
        assert!(bounded.put(Message::new("b", "x")).is_err());

        let unbounded = build_queue(&QueueConfig::default());
        for _ in 0..10 {
            unbounded.put(Message::new("a", "x")).unwrap();
        }
        assert_eq!(unbounded.len(), 10);
    }

    #[tokio::test]
    async fn test_route_delivers_to_recipient() {
        let queue = InMemoryQueue::shared();
        let agents = vec![running_echo(&queue).await];

        let delivery = route(Message::new("PING", "tester").to("echo-1"), &agents).await;
        assert_eq!(delivery, Delivery::Delivered { handled: true });
        assert_eq!(agents[0].get_metrics().messages_processed, 1);
        agents[0].stop().await;
    }

    #[tokio::test]
    async fn test_route_heartbeat_and_unroutable() {
        let queue = InMemoryQueue::shared();
        let agents = vec![running_echo(&queue).await];

        let beat = Message::new(roleplex::bus::HEARTBEAT, "echo-1");
        assert_eq!(route(beat, &agents).await, Delivery::Heartbeat);

        let stray = Message::new("PING", "tester").to("nobody");
        assert_eq!(route(stray, &agents).await, Delivery::Unroutable);

        let broadcast = Message::new("PING", "tester");
        assert_eq!(route(broadcast, &agents).await, Delivery::Unroutable);
        assert_eq!(agents[0].get_metrics().messages_received, 0);
        agents[0].stop().await;
    }

    #[tokio::test]
    async fn test_router_loop_stops_on_cancel() {
        let queue = InMemoryQueue::shared();
        let agents = vec![running_echo(&queue).await];
        let token = CancellationToken::new();
        let handle = tokio::spawn(router_loop(
            Arc::clone(&queue),
            agents.clone(),
            token.clone(),
        ));

        queue
            .put(Message::new("PING", "tester").to("echo-1"))
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        token.cancel();
        handle.await.unwrap();

        assert_eq!(agents[0].get_metrics().messages_processed, 1);
        agents[0].stop().await;
    }
}
