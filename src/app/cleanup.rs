//! Usage: Best-effort teardown for the real-time provider (process exit / provider drop).

use super::real_time::RealTimeProvider;
use std::time::Duration;
use tokio::task::JoinHandle;

const STOP_TIMEOUT: Duration = Duration::from_secs(3);
const ABORT_GRACE: Duration = Duration::from_secs(1);

pub(crate) async fn stop_real_time_best_effort(
    provider: &RealTimeProvider,
    generator_task: Option<JoinHandle<()>>,
    loop_task: Option<JoinHandle<()>>,
) {
    // The generator is a producer on the command queue; stop it first so the loop can drain.
    if let Some(task) = generator_task {
        task.abort();
        let _ = task.await;
    }

    let Some(mut task) = loop_task else {
        return;
    };

    let graceful = async {
        if let Err(err) = provider.shutdown_loop().await {
            tracing::debug!("real-time loop already closed: {}", err);
        }
        let _ = (&mut task).await;
    };

    if tokio::time::timeout(STOP_TIMEOUT, graceful).await.is_err() {
        tracing::warn!("real-time provider shutdown timed out, aborting update loop");
        task.abort();
        let _ = tokio::time::timeout(ABORT_GRACE, &mut task).await;
    }
}
