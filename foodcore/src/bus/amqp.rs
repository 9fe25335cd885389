//! AMQP (RabbitMQ) event bus implementation.
//!
//! Publishes to the topic exchange derived from the routing key's prefix
//! (spec §4.4, §6); subscribers bind a durable queue to one or more
//! routing-key patterns with dead-letter fallback to `dlx`.

use std::sync::Arc;

use async_trait::async_trait;
use deadpool_lapin::{Manager, Pool};
use lapin::{
    options::{
        BasicConsumeOptions, BasicNackOptions, BasicPublishOptions, ExchangeDeclareOptions,
        QueueBindOptions, QueueDeclareOptions,
    },
    types::{AMQPValue, FieldTable},
    BasicProperties, ExchangeKind,
};
use tracing::{debug, error, info, warn};

use super::{topology, EventBus, EventHandler};
use crate::contracts::Event;
use crate::error::{CoreError, Result};

/// AMQP connection settings for one service.
#[derive(Clone, Debug)]
pub struct AmqpConfig {
    pub url: String,
}

/// RabbitMQ-backed event bus.
pub struct AmqpEventBus {
    pool: Pool,
}

impl AmqpEventBus {
    /// Connect and declare the three topic exchanges plus the DLX.
    pub async fn new(config: AmqpConfig) -> Result<Self> {
        let manager = Manager::new(config.url.clone(), Default::default());
        let pool = Pool::builder(manager)
            .max_size(10)
            .build()
            .map_err(|e| CoreError::Transport(format!("failed to build amqp pool: {e}")))?;

        let conn = pool.get().await?;
        let channel = conn.create_channel().await?;

        for exchange in [
            topology::ORDER_EXCHANGE,
            topology::STORE_EXCHANGE,
            topology::COURIER_EXCHANGE,
        ] {
            channel
                .exchange_declare(
                    exchange,
                    ExchangeKind::Topic,
                    ExchangeDeclareOptions {
                        durable: true,
                        ..Default::default()
                    },
                    FieldTable::default(),
                )
                .await?;
        }
        channel
            .exchange_declare(
                topology::DEAD_LETTER_EXCHANGE,
                ExchangeKind::Topic,
                ExchangeDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await?;

        info!(url = %config.url, "connected to amqp broker");
        Ok(Self { pool })
    }

    fn queue_args(&self) -> FieldTable {
        let mut args = FieldTable::default();
        args.insert(
            "x-dead-letter-exchange".into(),
            AMQPValue::LongString(topology::DEAD_LETTER_EXCHANGE.into()),
        );
        args
    }
}

#[async_trait]
impl EventBus for AmqpEventBus {
    async fn publish(&self, event: &Event) -> Result<()> {
        let conn = self.pool.get().await?;
        let channel = conn.create_channel().await?;

        let routing_key = event.routing_key();
        let exchange = topology::exchange_for_routing_key(routing_key);
        let payload = serde_json::to_vec(event)?;

        channel
            .basic_publish(
                exchange,
                routing_key,
                BasicPublishOptions::default(),
                &payload,
                BasicProperties::default().with_content_type("application/json".into()),
            )
            .await?
            .await?;

        debug!(exchange, routing_key, "published event");
        Ok(())
    }

    async fn subscribe(
        &self,
        queue: &str,
        routing_keys: &[&str],
        handler: Arc<dyn EventHandler>,
    ) -> Result<()> {
        let conn = self.pool.get().await?;
        let channel = conn.create_channel().await?;

        channel
            .queue_declare(
                queue,
                QueueDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                self.queue_args(),
            )
            .await?;

        for routing_key in routing_keys {
            let exchange = topology::exchange_for_routing_key(routing_key);
            channel
                .queue_bind(
                    queue,
                    exchange,
                    routing_key,
                    QueueBindOptions::default(),
                    FieldTable::default(),
                )
                .await?;
        }

        let consumer_tag = format!("{queue}-consumer");
        let mut consumer = channel
            .basic_consume(
                queue,
                &consumer_tag,
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await?;

        let queue_name = queue.to_string();
        tokio::spawn(async move {
            use futures::StreamExt;

            while let Some(delivery) = consumer.next().await {
                let delivery = match delivery {
                    Ok(d) => d,
                    Err(e) => {
                        error!(queue = %queue_name, error = %e, "consumer error");
                        continue;
                    }
                };

                let parsed = serde_json::from_slice::<serde_json::Value>(&delivery.data)
                    .map_err(CoreError::from)
                    .and_then(|value| Event::from_routing_key(delivery.routing_key.as_str(), &value));

                match parsed {
                    Ok(event) => {
                        if let Err(e) = handler.handle(event).await {
                            // At-least-once: a failed handler re-queues the
                            // message rather than dead-lettering it (spec
                            // §5, "raising an exception re-queues the
                            // message"). `requeue: false` would hand it
                            // straight to the DLX instead of retrying.
                            warn!(queue = %queue_name, error = %e, "handler failed, requeueing");
                            if let Err(e) = delivery
                                .nack(BasicNackOptions { multiple: false, requeue: true })
                                .await
                            {
                                error!(error = %e, "failed to nack delivery");
                            }
                            continue;
                        }
                        if let Err(e) = delivery.ack(Default::default()).await {
                            error!(error = %e, "failed to ack delivery");
                        }
                    }
                    Err(e) => {
                        error!(queue = %queue_name, error = %e, "malformed payload, routing to dlq");
                        if let Err(e) = delivery.reject(Default::default()).await {
                            error!(error = %e, "failed to reject malformed delivery");
                        }
                    }
                }
            }
        });

        info!(queue, ?routing_keys, "subscribed");
        Ok(())
    }
}
