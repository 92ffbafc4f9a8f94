use std::sync::Arc;
use std::time::Duration;
use think_space_core::session::SessionManager;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Periodically evict idle sessions until shutdown is signalled.
pub fn spawn_session_sweeper(
    sessions: Arc<SessionManager>,
    every: Duration,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let evicted = sessions.evict_idle(chrono::Utc::now());
                    if evicted > 0 {
                        tracing::info!(
                            "Evicted {} idle sessions ({} active)",
                            evicted,
                            sessions.len()
                        );
                    }
                }
                _ = shutdown_rx.recv() => {
                    tracing::debug!("Session sweeper stopping");
                    break;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use think_space_core::session::RetentionPolicy;

    #[tokio::test]
    async fn test_sweeper_evicts_and_stops() {
        let sessions = Arc::new(SessionManager::with_policy(RetentionPolicy {
            idle_ttl: Some(chrono::Duration::zero()),
            max_sessions: None,
        }));
        sessions.resolve(None);

        let (tx, rx) = broadcast::channel(1);
        let handle = spawn_session_sweeper(sessions.clone(), Duration::from_millis(10), rx);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(sessions.is_empty());

        tx.send(()).unwrap();
        handle.await.unwrap();
    }
}
