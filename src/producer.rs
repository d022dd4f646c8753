use futures::future::BoxFuture;
use rdkafka::error::{KafkaError, RDKafkaErrorCode};
use rdkafka::producer::{FutureProducer, FutureRecord};
use std::time::{Duration, Instant};
use tokio::task::{JoinError, JoinSet};
use tracing::{error, info, warn};

use crate::config::*;
use crate::launcher::{Worker, WorkerReport};
use crate::mode::DeliveryMode;

pub const DEFAULT_MAX_IN_FLIGHT: usize = 1000;
const QUEUE_FULL_BACKOFF: Duration = Duration::from_millis(100);

pub fn create_producer(config: &ProducerConfig) -> Result<FutureProducer, AppError> {
    Ok(config.client_config().create()?)
}

/// Where a record landed once the broker acknowledged it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    pub partition: i32,
    pub offset: i64,
}

/// Resolves once the broker acknowledges (or rejects) a queued record.
pub type PendingDelivery = BoxFuture<'static, Result<Delivery, AppError>>;

/// Queues keyed text records for a topic.
///
/// `enqueue` never waits on the broker: the record is queued before it
/// returns, in call order, and the returned future tracks its delivery.
/// A full queue is reported as [`AppError::QueueFull`].
pub trait MessageSink: Send + Sync + 'static {
    fn enqueue(&self, topic: &str, key: i32, payload: &str) -> Result<PendingDelivery, AppError>;
}

impl MessageSink for FutureProducer {
    fn enqueue(&self, topic: &str, key: i32, payload: &str) -> Result<PendingDelivery, AppError> {
        // Big-endian i32, the layout of Kafka's IntegerSerializer.
        let key = key.to_be_bytes();
        let record = FutureRecord::to(topic).key(&key[..]).payload(payload);
        match self.send_result(record) {
            Ok(delivery) => Ok(Box::pin(async move {
                match delivery.await {
                    Ok(Ok((partition, offset))) => Ok(Delivery { partition, offset }),
                    Ok(Err((e, _))) => Err(AppError::Kafka(e)),
                    Err(_) => Err(AppError::DeliveryCanceled),
                }
            })),
            Err((KafkaError::MessageProduction(RDKafkaErrorCode::QueueFull), _)) => {
                Err(AppError::QueueFull)
            }
            Err((e, _)) => Err(AppError::Kafka(e)),
        }
    }
}

/// Produces `Message_<n>` records keyed by `n`, starting at 1.
pub struct DemoProducer<S> {
    sink: S,
    topic: TopicName,
    mode: DeliveryMode,
    limit: Option<u64>,
    interval: Duration,
    max_in_flight: usize,
}

impl<S: MessageSink> DemoProducer<S> {
    pub fn new(sink: S, topic: TopicName, mode: DeliveryMode) -> Self {
        DemoProducer {
            sink,
            topic,
            mode,
            limit: None,
            interval: Duration::ZERO,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
        }
    }

    /// Stops after `limit` messages. Without a limit the producer runs forever.
    pub fn with_limit(mut self, limit: Option<u64>) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Caps unacknowledged async sends; at the cap the loop waits for one to
    /// complete before queueing the next.
    pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = max_in_flight.max(1);
        self
    }

    pub fn topic(&self) -> &TopicName {
        &self.topic
    }

    pub fn mode(&self) -> DeliveryMode {
        self.mode
    }

    #[tracing::instrument(skip(self), fields(topic = %self.topic, mode = %self.mode))]
    async fn produce(self) -> Result<WorkerReport, AppError> {
        let mut report = WorkerReport::default();
        let mut in_flight = JoinSet::new();
        let mut message_no: i32 = 1;
        let mut issued: u64 = 0;

        while self.limit.map_or(true, |limit| issued < limit) {
            let payload = format!("Message_{message_no}");
            let started = Instant::now();
            match self
                .enqueue(&mut in_flight, &mut report, message_no, &payload)
                .await
            {
                Ok(pending) => match self.mode {
                    DeliveryMode::Async => {
                        in_flight.spawn(on_completion(message_no, payload, started, pending));
                        if in_flight.len() >= self.max_in_flight {
                            if let Some(done) = in_flight.join_next().await {
                                report.record(completion_status(done));
                            }
                        }
                        while let Some(done) = in_flight.try_join_next() {
                            report.record(completion_status(done));
                        }
                    }
                    DeliveryMode::Sync => match pending.await {
                        Ok(_) => {
                            info!("Sent message: ({message_no}, {payload})");
                            report.record(true);
                        }
                        Err(e) => {
                            error!(key = message_no, "Failed to send message: {e}");
                            report.record(false);
                        }
                    },
                },
                Err(e) => {
                    error!(key = message_no, "Failed to send message: {e}");
                    report.record(false);
                }
            }

            issued += 1;
            message_no = message_no.wrapping_add(1);
            if self.interval.is_zero() {
                tokio::task::yield_now().await;
            } else {
                tokio::time::sleep(self.interval).await;
            }
        }

        while let Some(done) = in_flight.join_next().await {
            report.record(completion_status(done));
        }

        info!(
            delivered = report.delivered,
            failed = report.failed,
            "Producer finished"
        );
        Ok(report)
    }

    /// Queues one record, waiting for outstanding deliveries while the
    /// client queue is full.
    async fn enqueue(
        &self,
        in_flight: &mut JoinSet<bool>,
        report: &mut WorkerReport,
        key: i32,
        payload: &str,
    ) -> Result<PendingDelivery, AppError> {
        loop {
            match self.sink.enqueue(&self.topic.0, key, payload) {
                Err(AppError::QueueFull) => {
                    warn!(key, in_flight = in_flight.len(), "Producer queue full");
                    match in_flight.join_next().await {
                        Some(done) => report.record(completion_status(done)),
                        None => tokio::time::sleep(QUEUE_FULL_BACKOFF).await,
                    }
                }
                queued => return queued,
            }
        }
    }
}

impl<S: MessageSink> Worker for DemoProducer<S> {
    fn run(self) -> BoxFuture<'static, Result<WorkerReport, AppError>> {
        Box::pin(self.produce())
    }
}

/// Delivery callback for async sends.
async fn on_completion(
    key: i32,
    payload: String,
    started: Instant,
    delivery: PendingDelivery,
) -> bool {
    match delivery.await {
        Ok(Delivery { partition, offset }) => {
            let elapsed = started.elapsed().as_millis();
            info!(
                %partition,
                %offset,
                "message({key}, {payload}) sent to partition({partition}), offset({offset}) in {elapsed} ms"
            );
            true
        }
        Err(e) => {
            error!(key, "Failed to deliver message: {e}");
            false
        }
    }
}

fn completion_status(done: Result<bool, JoinError>) -> bool {
    done.unwrap_or_else(|e| {
        warn!("Delivery callback did not complete: {e}");
        false
    })
}
