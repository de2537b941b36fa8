use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::error;

#[derive(Error, Debug)]
#[error("{0}")]
pub struct Error(String);

impl Error {
    pub fn new(s: &str) -> Error {
        Error(s.to_string())
    }

    pub fn from<E: std::error::Error>(e: E) -> Self {
        Self(e.to_string())
    }
}

/// How long a crashed service waits before its loop is restarted.
const RESTART_BACKOFF: Duration = Duration::from_secs(10);

#[async_trait]
pub trait Service {
    type Context: Clone + Send;
    async fn new(context: Self::Context) -> Self;
    async fn run(self) -> Result<(), Error>;
}

/// Spawns each service in a restart loop: a failed run is logged and the
/// service is rebuilt after a fixed backoff, so one bad poll cycle never
/// takes the process down.
pub struct ServiceManager<C> {
    context: C,
    services: JoinSet<()>,
}

impl<C> ServiceManager<C>
where
    C: 'static + Clone + Send,
{
    pub fn new(context: C) -> Self {
        Self {
            context,
            services: JoinSet::new(),
        }
    }

    pub fn spawn<T: Service<Context = C>>(&mut self) {
        let context = self.context.clone();
        self.services.spawn(async move {
            loop {
                let service = T::new(context.clone()).await;
                if let Err(e) = service.run().await {
                    error!("Service crashed: {e}; restarting in {RESTART_BACKOFF:?}");
                    tokio::time::sleep(RESTART_BACKOFF).await;
                }
            }
        });
    }

    pub async fn wait(&mut self) -> Result<(), Error> {
        if self.services.join_next().await.is_some() {
            return Err(Error::new("Internal Service Error"));
        }
        Ok(())
    }
}
