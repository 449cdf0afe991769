use std::sync::Arc;
use std::time::Duration;

use ichiryu_rules::ExternalJob;
use tokio::time::timeout;

use crate::reply_render::{render_execution_reply, render_publish_reply};
use crate::sandbox_executor::DEFAULT_CPU_LIMIT_MARKER;
use crate::{CodeExecutor, ExecutionLimits, ExternalError, Publisher};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalRunnerSettings {
    pub publish_timeout: Duration,
    pub execution_timeout: Duration,
    pub execution_limits: ExecutionLimits,
    pub cpu_limit_marker: String,
}

impl Default for ExternalRunnerSettings {
    fn default() -> Self {
        Self {
            publish_timeout: Duration::from_secs(10),
            execution_timeout: Duration::from_secs(10),
            execution_limits: ExecutionLimits::default(),
            cpu_limit_marker: DEFAULT_CPU_LIMIT_MARKER.to_string(),
        }
    }
}

/// Turns an [`ExternalJob`] into its single reply line, bounding the
/// collaborator call with a timeout. Cheap to clone into spawned tasks.
#[derive(Clone)]
pub struct ExternalRunner {
    publisher: Arc<dyn Publisher>,
    executor: Arc<dyn CodeExecutor>,
    settings: Arc<ExternalRunnerSettings>,
}

impl ExternalRunner {
    pub fn new(
        publisher: Arc<dyn Publisher>,
        executor: Arc<dyn CodeExecutor>,
        settings: ExternalRunnerSettings,
    ) -> Self {
        Self {
            publisher,
            executor,
            settings: Arc::new(settings),
        }
    }

    pub async fn run(self, job: ExternalJob) -> String {
        match job {
            ExternalJob::Publish { speaker, text } => {
                let limit = self.settings.publish_timeout;
                let result = match timeout(limit, self.publisher.publish(&text)).await {
                    Ok(result) => result,
                    Err(_) => Err(ExternalError::TimedOut(duration_ms(limit))),
                };
                if let Err(error) = &result {
                    tracing::warn!(speaker = %speaker, error = %error, "publish failed");
                }
                render_publish_reply(&speaker, &result)
            }
            ExternalJob::Execute { speaker, code } => {
                let limit = self.settings.execution_timeout;
                let execution = self
                    .executor
                    .execute(&code, self.settings.execution_limits);
                let result = match timeout(limit, execution).await {
                    Ok(result) => result,
                    Err(_) => Err(ExternalError::TimedOut(duration_ms(limit))),
                };
                if let Err(error) = &result {
                    tracing::warn!(speaker = %speaker, error = %error, "code execution failed");
                }
                render_execution_reply(&speaker, &result, &self.settings.cpu_limit_marker)
            }
        }
    }
}

fn duration_ms(duration: Duration) -> u64 {
    duration.as_millis().try_into().unwrap_or(u64::MAX)
}
