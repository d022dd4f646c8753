pub mod cli;
pub mod config;
pub mod launcher;
pub mod mode;
pub mod producer;

pub use cli::Args;
pub use config::{AppError, Broker, ProducerConfig, TopicName};
pub use launcher::{LaunchError, Launcher, LifecycleState, Worker, WorkerReport};
pub use mode::DeliveryMode;
pub use producer::{create_producer, DemoProducer, MessageSink};
