//! Command-line surface of the demo binary.
//!
//! Only the flags below are parsed strictly. Every other token, including
//! unknown `-x` style tokens, is handed to the delivery mode interpreter,
//! which looks at the first one and ignores the rest.

use clap::{Command, CommandFactory, Parser};
use std::time::Duration;

use crate::config::*;
use crate::launcher::DEFAULT_STARTUP_DELAY;
use crate::mode::DeliveryMode;
use crate::producer::{DemoProducer, MessageSink, DEFAULT_MAX_IN_FLIGHT};

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Delivery mode: "sync" blocks on every send, anything else is asynchronous
    #[arg(value_name = "MODE", allow_hyphen_values = true)]
    pub mode: Vec<String>,
    /// Broker <host>:<port>
    #[arg(short, long = "broker", default_value = DEFAULT_BROKER)]
    pub brokers: Vec<Broker>,
    /// Destination topic
    #[arg(short, long, default_value = DEFAULT_TOPIC)]
    pub topic: TopicName,
    /// Kafka client.id
    #[arg(long, default_value = DEFAULT_CLIENT_ID)]
    pub client_id: String,
    /// Kafka message.timeout.ms
    #[arg(long, default_value_t = 5000)]
    pub message_timeout_ms: u64,
    /// Stop after this many messages (runs forever when omitted)
    #[arg(short = 'n', long)]
    pub messages: Option<u64>,
    /// Pause between messages, in milliseconds
    #[arg(long, default_value_t = 0)]
    pub interval_ms: u64,
    /// Most unacknowledged sends in async mode
    #[arg(long, default_value_t = DEFAULT_MAX_IN_FLIGHT)]
    pub max_in_flight: usize,
    /// Wait between starting the producer and joining it, in milliseconds
    #[arg(long, default_value_t = DEFAULT_STARTUP_DELAY.as_millis() as u64)]
    pub startup_delay_ms: u64,
}

impl Args {
    /// Parses `argv` (program name first), exiting on `--help`, `--version`
    /// or a malformed flag value.
    pub fn parse_lenient<I, T>(argv: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Args::parse_from(split_mode_tokens(argv))
    }

    pub fn try_parse_lenient<I, T>(argv: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Args::try_parse_from(split_mode_tokens(argv))
    }

    pub fn delivery_mode(&self) -> DeliveryMode {
        DeliveryMode::from_args(self.mode.as_slice())
    }

    pub fn producer_config(&self) -> ProducerConfig {
        ProducerConfig {
            brokers: self.brokers.clone(),
            client_id: self.client_id.clone(),
            message_timeout: Duration::from_millis(self.message_timeout_ms),
        }
    }

    pub fn startup_delay(&self) -> Duration {
        Duration::from_millis(self.startup_delay_ms)
    }

    pub fn demo_producer<S: MessageSink>(&self, sink: S) -> DemoProducer<S> {
        DemoProducer::new(sink, self.topic.clone(), self.delivery_mode())
            .with_limit(self.messages)
            .with_interval(Duration::from_millis(self.interval_ms))
            .with_max_in_flight(self.max_in_flight)
    }
}

/// Reorders `argv` so that recognised flags (with their values) come first
/// and every other token follows a `--`, where clap takes it as `MODE`.
fn split_mode_tokens<I, T>(argv: I) -> Vec<String>
where
    I: IntoIterator<Item = T>,
    T: Into<String>,
{
    let mut command = Args::command();
    command.build();

    let mut tokens = argv.into_iter().map(Into::into);
    let mut owned: Vec<String> = tokens.next().into_iter().collect();
    let mut mode = Vec::new();

    while let Some(token) = tokens.next() {
        match flag_value(&command, &token) {
            Some(FlagValue::Separate) => {
                owned.push(token);
                owned.extend(tokens.next());
            }
            Some(FlagValue::None | FlagValue::Attached) => owned.push(token),
            None => mode.push(token),
        }
    }

    if !mode.is_empty() {
        owned.push("--".to_string());
        owned.extend(mode);
    }
    owned
}

enum FlagValue {
    /// Switch without a value, e.g. `--help`.
    None,
    /// Value inside the token, e.g. `--topic=x` or `-n5`.
    Attached,
    /// Value is the next token.
    Separate,
}

/// Classifies `token` if it names one of the command's flags.
fn flag_value(command: &Command, token: &str) -> Option<FlagValue> {
    if let Some(long) = token.strip_prefix("--") {
        let (name, inline) = match long.split_once('=') {
            Some((name, _)) => (name, true),
            None => (long, false),
        };
        let arg = command
            .get_arguments()
            .find(|arg| !name.is_empty() && arg.get_long() == Some(name))?;
        return match (arg.get_action().takes_values(), inline) {
            (true, true) => Some(FlagValue::Attached),
            (true, false) => Some(FlagValue::Separate),
            (false, false) => Some(FlagValue::None),
            (false, true) => None,
        };
    }

    let short = token.strip_prefix('-')?;
    let mut chars = short.chars();
    let flag = chars.next()?;
    let rest = chars.as_str();
    let arg = command
        .get_arguments()
        .find(|arg| arg.get_short() == Some(flag))?;
    match (arg.get_action().takes_values(), rest.is_empty()) {
        (true, true) => Some(FlagValue::Separate),
        (true, false) => Some(FlagValue::Attached),
        (false, true) => Some(FlagValue::None),
        (false, false) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::producer::{Delivery, PendingDelivery};

    struct NullSink;

    impl MessageSink for NullSink {
        fn enqueue(&self, _: &str, _: i32, _: &str) -> Result<PendingDelivery, AppError> {
            Ok(Box::pin(async {
                Ok(Delivery {
                    partition: 0,
                    offset: 0,
                })
            }))
        }
    }

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_lenient(std::iter::once("demo").chain(argv.iter().copied()))
            .unwrap_or_else(|e| panic!("{argv:?} rejected: {e}"))
    }

    #[test]
    fn defaults() {
        let args = parse(&[]);
        assert_eq!(args.delivery_mode(), DeliveryMode::Async);
        assert_eq!(args.topic.to_string(), "topic1");
        assert_eq!(args.messages, None);
        assert_eq!(args.startup_delay(), Duration::from_millis(1000));
        assert_eq!(args.max_in_flight, DEFAULT_MAX_IN_FLIGHT);

        let config = args.producer_config();
        assert_eq!(brokers_to_str(config.brokers), "localhost:9092");
        assert_eq!(config.client_id, "DemoProducer");
        assert_eq!(config.message_timeout, Duration::from_millis(5000));
    }

    #[test]
    fn sync_positional_selects_sync() {
        assert_eq!(parse(&["sync"]).delivery_mode(), DeliveryMode::Sync);
        assert_eq!(parse(&["Sync"]).delivery_mode(), DeliveryMode::Sync);
        assert_eq!(parse(&[" sync "]).delivery_mode(), DeliveryMode::Sync);
        assert_eq!(parse(&["async"]).delivery_mode(), DeliveryMode::Async);
    }

    #[test]
    fn unknown_hyphen_tokens_are_not_errors() {
        for argv in [&["-x"][..], &["--async"], &["-sync"], &["-hx"]] {
            assert_eq!(parse(argv).delivery_mode(), DeliveryMode::Async, "{argv:?}");
        }
    }

    #[test]
    fn extra_tokens_after_mode_are_ignored() {
        let args = parse(&["sync", "extra", "-q", "--verbose"]);
        assert_eq!(args.delivery_mode(), DeliveryMode::Sync);
        assert_eq!(args.mode, vec!["sync", "extra", "-q", "--verbose"]);
    }

    #[test]
    fn mode_and_flags_mix_in_any_order() {
        let args = parse(&["sync", "--topic", "x"]);
        assert_eq!(args.delivery_mode(), DeliveryMode::Sync);
        assert_eq!(args.topic.to_string(), "x");

        let args = parse(&["--topic=y", "-n5", "-b", "k1:9093", "Sync", "-z"]);
        assert_eq!(args.delivery_mode(), DeliveryMode::Sync);
        assert_eq!(args.topic.to_string(), "y");
        assert_eq!(args.messages, Some(5));
        assert_eq!(brokers_to_str(args.brokers), "k1:9093");
    }

    #[test]
    fn flag_value_is_not_a_mode_token() {
        let args = parse(&["--topic", "sync"]);
        assert_eq!(args.delivery_mode(), DeliveryMode::Async);
        assert_eq!(args.topic.to_string(), "sync");
    }

    #[test]
    fn malformed_flag_values_are_still_rejected() {
        assert!(Args::try_parse_lenient(["demo", "--broker", "nope"]).is_err());
        assert!(Args::try_parse_lenient(["demo", "-n", "many"]).is_err());
    }

    #[test]
    fn producer_gets_topic_and_mode() {
        let args = parse(&["sync", "--topic", "orders", "--max-in-flight", "3"]);
        let producer = args.demo_producer(NullSink);
        assert_eq!(producer.topic().to_string(), "orders");
        assert_eq!(producer.mode(), DeliveryMode::Sync);

        let producer = parse(&[]).demo_producer(NullSink);
        assert_eq!(producer.topic().to_string(), "topic1");
        assert_eq!(producer.mode(), DeliveryMode::Async);
    }
}
