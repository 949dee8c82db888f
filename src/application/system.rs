use crate::application::trading_instance::{InstanceHandle, TradingInstance};
use crate::config::Config;
use crate::domain::events::EventListener;
use crate::domain::ports::TickSource;
use crate::infrastructure::event_bus::EventBus;
use crate::infrastructure::tick_hub::TickHub;
use anyhow::{Context, Result};
use futures::future::join_all;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

pub struct Application {
    pub config: Config,
    pub events: EventBus,
}

impl Application {
    pub async fn build(config: Config) -> Result<Self> {
        info!(
            "Building Regime Trader (Execution: {:?}, Instances: {})...",
            config.execution_mode,
            config.instances.len()
        );
        config.validate().context("Invalid configuration")?;

        Ok(Self {
            config,
            events: EventBus::new(),
        })
    }

    pub async fn subscribe(&self, listener: Arc<dyn EventListener>) {
        self.events.subscribe(listener).await;
    }

    /// Launches every configured instance behind one shared tick hub.
    ///
    /// The upstream subscription covers the symbols of all instances.
    pub async fn start(self, source: Arc<dyn TickSource>) -> Result<SystemHandle> {
        let mut hub = TickHub::new();
        let capacities = self.config.queues.streaming_capacities();

        let mut instances = Vec::with_capacity(self.config.instances.len());
        for instance_config in &self.config.instances {
            let ticks = hub.subscribe(&instance_config.symbol, self.config.queues.tick_queue_capacity);
            instances.push(TradingInstance::launch(
                instance_config,
                self.config.execution_mode,
                capacities,
                self.events.clone(),
                ticks,
            ));
        }

        let symbols = hub.symbols();
        info!("Subscribing to tick stream for {:?}", symbols);
        let upstream = source
            .subscribe(symbols)
            .await
            .context("Failed to subscribe to tick source")?;
        let hub_task = tokio::spawn(hub.run(upstream));

        info!("All {} trading instances running", instances.len());
        Ok(SystemHandle {
            instances,
            hub_task,
            events: self.events,
        })
    }
}

pub struct SystemHandle {
    pub instances: Vec<InstanceHandle>,
    pub events: EventBus,
    hub_task: JoinHandle<()>,
}

impl SystemHandle {
    pub fn instance(&self, symbol: &str) -> Option<&InstanceHandle> {
        self.instances.iter().find(|h| h.symbol() == symbol)
    }

    /// Stops the hub and every instance worker, then waits for them to exit
    pub async fn shutdown(self) {
        self.hub_task.abort();
        let mut tasks = vec![self.hub_task];
        for instance in self.instances {
            instance.abort();
            tasks.extend(instance.tasks);
        }
        join_all(tasks).await;
        info!("Trading system stopped");
    }
}
