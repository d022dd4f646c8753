use itertools::Itertools;
use rdkafka::ClientConfig;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_BROKER: &str = "localhost:9092";
pub const DEFAULT_TOPIC: &str = "topic1";
pub const DEFAULT_CLIENT_ID: &str = "DemoProducer";

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),
    #[error("Kafka error: {0}")]
    Kafka(#[from] rdkafka::error::KafkaError),
    #[error("Producer queue is full")]
    QueueFull,
    #[error("Delivery canceled before the broker acknowledged it")]
    DeliveryCanceled,
}

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
#[display(fmt = "{host}:{port}")]
pub struct Broker {
    pub host: String,
    pub port: u16,
}

impl FromStr for Broker {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split_once(':')
            .filter(|(host, _)| !host.is_empty())
            .and_then(|(host, port)| {
                let host = host.to_string();
                port.parse::<u16>().map(|port| Broker { host, port }).ok()
            })
            .ok_or_else(|| {
                AppError::InvalidArguments(
                    r#"Expected "<host>:<port>(,<host>:<port>)*""#.to_string(),
                )
            })
    }
}

pub fn brokers_to_str(brokers: impl IntoIterator<Item = Broker>) -> String {
    brokers
        .into_iter()
        .map(|broker| broker.to_string())
        .join(",")
}

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::FromStr)]
pub struct TopicName(pub String);

impl Default for TopicName {
    fn default() -> Self {
        TopicName(DEFAULT_TOPIC.to_string())
    }
}

/// Connection and delivery settings for the demo producer.
#[derive(Debug, Clone)]
pub struct ProducerConfig {
    pub brokers: Vec<Broker>,
    pub client_id: String,
    pub message_timeout: Duration,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        ProducerConfig {
            brokers: vec![Broker {
                host: "localhost".to_string(),
                port: 9092,
            }],
            client_id: DEFAULT_CLIENT_ID.to_string(),
            message_timeout: Duration::from_millis(5000),
        }
    }
}

impl ProducerConfig {
    pub fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new();
        config
            .set("bootstrap.servers", brokers_to_str(self.brokers.clone()))
            .set("client.id", &self.client_id)
            .set(
                "message.timeout.ms",
                self.message_timeout.as_millis().to_string(),
            );
        config
    }
}
