//! Processing engine configuration

use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use crate::adapters::consumer::{ConsumerLoop, DeliverySource, FailurePolicy, InboundConsumer};
use crate::application::{ProcessOrderHandler, ProcessingSettings};
use crate::domain::processing::ProcessingStrategy;
use crate::ports::{EventPublisher, PreMutationHook, ProcessingMetrics, TransactionManager};

use super::error::ValidationError;

/// Processing engine configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ProcessingConfig {
    /// Topic for direct publishes
    #[serde(default = "default_outbound_topic")]
    pub outbound_topic: String,

    /// Destination recorded on outbox entries
    #[serde(default = "default_outbox_destination")]
    pub outbox_destination: String,

    /// Schema version recorded on outbox entries
    #[serde(default = "default_schema_version")]
    pub schema_version: String,

    /// Acknowledgement for hard processing failures
    #[serde(default)]
    pub failure_policy: FailurePolicy,

    /// Max processing attempts running at once
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Run the inbound consumer
    #[serde(default = "default_consumer_enabled")]
    pub consumer_enabled: bool,

    /// Strategy applied to every inbound delivery
    #[serde(default = "default_strategy")]
    pub strategy: ProcessingStrategy,

    /// Destination the consumer reads from
    #[serde(default = "default_inbound_stream")]
    pub inbound_stream: String,

    /// Consumer group shared by all instances
    #[serde(default = "default_consumer_group")]
    pub consumer_group: String,

    /// Name of this instance within the group
    #[serde(default = "default_consumer_name")]
    pub consumer_name: String,

    /// How long a read waits for new deliveries, in milliseconds
    #[serde(default = "default_read_block_ms")]
    pub read_block_ms: u64,
}

impl ProcessingConfig {
    /// Settings for `ProcessOrderHandler::with_settings`.
    pub fn settings(&self) -> ProcessingSettings {
        ProcessingSettings {
            outbound_topic: self.outbound_topic.clone(),
            outbox_destination: self.outbox_destination.clone(),
            schema_version: self.schema_version.clone(),
        }
    }

    /// Engine writing to this section's destinations.
    pub fn handler(
        &self,
        transactions: Arc<dyn TransactionManager>,
        publisher: Arc<dyn EventPublisher>,
        hook: Arc<dyn PreMutationHook>,
        metrics: Arc<dyn ProcessingMetrics>,
    ) -> ProcessOrderHandler {
        ProcessOrderHandler::new(transactions, publisher, hook, metrics)
            .with_settings(self.settings())
    }

    /// Consumer applying this section's strategy and failure policy.
    pub fn consumer(
        &self,
        handler: Arc<ProcessOrderHandler>,
        metrics: Arc<dyn ProcessingMetrics>,
    ) -> InboundConsumer {
        InboundConsumer::new(handler, metrics, self.strategy)
            .with_failure_policy(self.failure_policy)
    }

    /// Loop running at most `max_concurrency` deliveries at once.
    pub fn consumer_loop(
        &self,
        source: Arc<dyn DeliverySource>,
        consumer: Arc<InboundConsumer>,
    ) -> ConsumerLoop {
        ConsumerLoop::new(source, consumer).with_max_concurrency(self.max_concurrency)
    }

    /// Get read block as Duration
    pub fn read_block(&self) -> Duration {
        Duration::from_millis(self.read_block_ms)
    }

    /// Validate processing configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.outbound_topic.trim().is_empty() {
            return Err(ValidationError::EmptyTopic("outbound_topic"));
        }
        if self.outbox_destination.trim().is_empty() {
            return Err(ValidationError::EmptyTopic("outbox_destination"));
        }
        if self.schema_version.trim().is_empty() {
            return Err(ValidationError::MissingRequired("PROCESSING__SCHEMA_VERSION"));
        }
        if self.max_concurrency == 0 {
            return Err(ValidationError::InvalidConcurrency);
        }
        if self.inbound_stream.trim().is_empty() {
            return Err(ValidationError::EmptyTopic("inbound_stream"));
        }
        if self.consumer_group.trim().is_empty() {
            return Err(ValidationError::MissingRequired("PROCESSING__CONSUMER_GROUP"));
        }
        if self.consumer_name.trim().is_empty() {
            return Err(ValidationError::MissingRequired("PROCESSING__CONSUMER_NAME"));
        }
        if self.read_block_ms == 0 || self.read_block_ms > 60_000 {
            return Err(ValidationError::InvalidReadBlock);
        }
        Ok(())
    }
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            outbound_topic: default_outbound_topic(),
            outbox_destination: default_outbox_destination(),
            schema_version: default_schema_version(),
            failure_policy: FailurePolicy::default(),
            max_concurrency: default_max_concurrency(),
            consumer_enabled: default_consumer_enabled(),
            strategy: default_strategy(),
            inbound_stream: default_inbound_stream(),
            consumer_group: default_consumer_group(),
            consumer_name: default_consumer_name(),
            read_block_ms: default_read_block_ms(),
        }
    }
}

fn default_outbound_topic() -> String {
    ProcessingSettings::default().outbound_topic
}

fn default_outbox_destination() -> String {
    ProcessingSettings::default().outbox_destination
}

fn default_schema_version() -> String {
    ProcessingSettings::default().schema_version
}

fn default_max_concurrency() -> usize {
    8
}

fn default_consumer_enabled() -> bool {
    true
}

fn default_strategy() -> ProcessingStrategy {
    ProcessingStrategy::IdempotentWithOutbox
}

fn default_inbound_stream() -> String {
    "demo-idempotent-with-outbox-inbound-topic".to_string()
}

fn default_consumer_group() -> String {
    "demo-consumer-group".to_string()
}

fn default_consumer_name() -> String {
    "idempotent-consumer-1".to_string()
}

fn default_read_block_ms() -> u64 {
    1000
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::consumer::{Acknowledgement, InboundDelivery, SourcedDelivery};
    use crate::adapters::events::InMemoryTransport;
    use crate::adapters::hooks::NoDelay;
    use crate::adapters::memory::InMemoryStore;
    use crate::adapters::metrics::NoopMetrics;
    use crate::domain::foundation::DomainError;
    use async_trait::async_trait;

    struct IdleSource;

    #[async_trait]
    impl DeliverySource for IdleSource {
        async fn receive(&self, _max: usize) -> Result<Vec<SourcedDelivery>, DomainError> {
            Ok(Vec::new())
        }

        async fn settle(
            &self,
            _delivery: &SourcedDelivery,
            _acknowledgement: Acknowledgement,
        ) -> Result<(), DomainError> {
            Ok(())
        }
    }

    struct Wired {
        store: InMemoryStore,
        transport: Arc<InMemoryTransport>,
        handler: Arc<ProcessOrderHandler>,
        consumer: Arc<InboundConsumer>,
    }

    fn wire(config: &ProcessingConfig) -> Wired {
        let store = InMemoryStore::new();
        let transport = Arc::new(InMemoryTransport::new());
        let handler = Arc::new(config.handler(
            Arc::new(store.clone()),
            transport.clone(),
            Arc::new(NoDelay),
            Arc::new(NoopMetrics),
        ));
        let consumer = Arc::new(config.consumer(handler.clone(), Arc::new(NoopMetrics)));
        Wired {
            store,
            transport,
            handler,
            consumer,
        }
    }

    fn delivery(event_id: Option<&str>) -> InboundDelivery {
        InboundDelivery::new(
            event_id.map(str::to_string),
            "someKey",
            br#"{"id":"abc","data":"someData"}"#.to_vec(),
        )
    }

    #[tokio::test]
    async fn direct_publishes_go_to_configured_topic() {
        let config = ProcessingConfig {
            outbound_topic: "orders-out".to_string(),
            strategy: ProcessingStrategy::Idempotent,
            ..Default::default()
        };
        let wired = wire(&config);

        assert_eq!(wired.handler.settings(), &config.settings());
        assert_eq!(wired.consumer.strategy(), ProcessingStrategy::Idempotent);
        assert_eq!(
            wired.consumer.on_delivery(delivery(Some("e-1"))).await,
            Acknowledgement::Ack
        );
        assert_eq!(wired.transport.count("orders-out"), 1);
        assert_eq!(wired.transport.count("demo-outbound-topic"), 0);
    }

    #[tokio::test]
    async fn outbox_entries_use_configured_destination() {
        let config = ProcessingConfig {
            outbox_destination: "orders-outbox".to_string(),
            schema_version: "v2".to_string(),
            ..Default::default()
        };
        let wired = wire(&config);

        assert_eq!(
            wired.consumer.on_delivery(delivery(Some("e-1"))).await,
            Acknowledgement::Ack
        );

        let entries = wired.store.outbox_entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].destination, "orders-outbox");
        assert_eq!(entries[0].schema_version, "v2");
        assert!(wired.transport.published().is_empty());
    }

    #[tokio::test]
    async fn consumer_applies_configured_failure_policy() {
        let config = ProcessingConfig {
            failure_policy: FailurePolicy::DeadLetter,
            ..Default::default()
        };
        let wired = wire(&config);

        assert_eq!(
            wired.consumer.on_delivery(delivery(None)).await,
            Acknowledgement::DeadLetter
        );
        assert!(wired.store.orders().is_empty());
    }

    #[test]
    fn consumer_loop_uses_configured_concurrency() {
        let config = ProcessingConfig {
            max_concurrency: 3,
            ..Default::default()
        };
        let wired = wire(&config);

        let consumer_loop = config.consumer_loop(Arc::new(IdleSource), wired.consumer);
        assert_eq!(consumer_loop.max_concurrency(), 3);
    }

    #[test]
    fn test_processing_config_defaults() {
        let config = ProcessingConfig::default();
        assert_eq!(config.settings(), ProcessingSettings::default());
        assert_eq!(config.failure_policy, FailurePolicy::Redeliver);
        assert_eq!(config.max_concurrency, 8);
        assert!(config.consumer_enabled);
        assert_eq!(config.strategy, ProcessingStrategy::IdempotentWithOutbox);
        assert_eq!(config.inbound_stream, "demo-idempotent-with-outbox-inbound-topic");
        assert_eq!(config.read_block(), Duration::from_secs(1));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_empty_inbound_stream() {
        let config = ProcessingConfig {
            inbound_stream: String::new(),
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ValidationError::EmptyTopic("inbound_stream")));
    }

    #[test]
    fn test_validation_missing_consumer_group() {
        let config = ProcessingConfig {
            consumer_group: " ".to_string(),
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ValidationError::MissingRequired("PROCESSING__CONSUMER_GROUP"))
        );
    }

    #[test]
    fn test_validation_read_block_out_of_range() {
        for read_block_ms in [0, 60_001] {
            let config = ProcessingConfig {
                read_block_ms,
                ..Default::default()
            };
            assert_eq!(config.validate(), Err(ValidationError::InvalidReadBlock));
        }
    }

    #[test]
    fn test_validation_empty_topic() {
        let config = ProcessingConfig {
            outbound_topic: "  ".to_string(),
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ValidationError::EmptyTopic("outbound_topic")));
    }

    #[test]
    fn test_validation_zero_concurrency() {
        let config = ProcessingConfig {
            max_concurrency: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidConcurrency));
    }
}
