//! Durable command subscriber.
//!
//! Pulls from the commands stream through a durable consumer, runs each
//! message on its own task and acknowledges it once handling returns,
//! whatever the outcome. Nothing is redelivered on purpose; a message that
//! cannot be decoded or handled is logged and dropped.

use async_nats::jetstream;
use async_nats::jetstream::consumer::{AckPolicy, DeliverPolicy, PullConsumer};
use futures::StreamExt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use todo_processor_domain::command::{ProcessorError, TodoCommandHandler};
use todoflow_shared::config::NatsConfig;
use todoflow_shared::{
    COMMANDS_STREAM_NAME, COMMANDS_SUBJECT, CommandEnvelope, CommandType, DURABLE_CONSUMER_NAME,
    DecodeError, TodoCommand,
};
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

use super::nats::MessagingError;
use crate::observability::ProcessorMetrics;
use crate::observability::metrics::{OUTCOME_FAILURE, OUTCOME_SUCCESS};

/// Consumer binding
#[derive(Debug, Clone)]
pub struct CommandSubscriberConfig {
    pub stream_name: String,
    pub consumer_name: String,
    pub filter_subject: String,
    /// Redelivery deadline for unacknowledged messages
    pub ack_wait: Duration,
}

impl Default for CommandSubscriberConfig {
    fn default() -> Self {
        Self {
            stream_name: COMMANDS_STREAM_NAME.to_string(),
            consumer_name: DURABLE_CONSUMER_NAME.to_string(),
            filter_subject: COMMANDS_SUBJECT.to_string(),
            ack_wait: Duration::from_secs(30),
        }
    }
}

impl From<&NatsConfig> for CommandSubscriberConfig {
    fn from(config: &NatsConfig) -> Self {
        Self {
            ack_wait: config.ack_wait(),
            ..Self::default()
        }
    }
}

impl CommandSubscriberConfig {
    pub fn consumer_config(&self) -> jetstream::consumer::pull::Config {
        jetstream::consumer::pull::Config {
            durable_name: Some(self.consumer_name.clone()),
            filter_subject: self.filter_subject.clone(),
            ack_policy: AckPolicy::Explicit,
            ack_wait: self.ack_wait,
            deliver_policy: DeliverPolicy::All,
            ..Default::default()
        }
    }
}

/// What happened to one message
#[derive(Debug)]
pub enum DispatchOutcome {
    /// Handler returned without error
    Handled(CommandType),
    /// Handler returned an error; its failed event was already published
    Failed(CommandType, ProcessorError),
    /// Never reached a handler
    Dropped(DecodeError),
}

impl DispatchOutcome {
    pub fn command_type(&self) -> Option<CommandType> {
        match self {
            Self::Handled(t) | Self::Failed(t, _) => Some(*t),
            Self::Dropped(_) => None,
        }
    }
}

/// Decodes one payload and runs the matching handler.
///
/// The envelope is read first to learn the discriminant; only a known
/// discriminant leads to decoding the concrete command.
pub async fn dispatch<H>(
    handler: &H,
    payload: &[u8],
    metrics: Option<&ProcessorMetrics>,
) -> DispatchOutcome
where
    H: TodoCommandHandler + ?Sized,
{
    let dropped = |err: DecodeError| {
        if let Some(metrics) = metrics {
            metrics.record_dropped(err.reason());
        }
        DispatchOutcome::Dropped(err)
    };

    let envelope = match CommandEnvelope::decode(payload) {
        Ok(envelope) => envelope,
        Err(e) => {
            error!(error = %e, "Failed to decode command envelope");
            return dropped(e);
        }
    };

    let command_type = match envelope.resolve_type() {
        Ok(command_type) => command_type,
        Err(e) => {
            warn!(
                command_type = %envelope.command_type,
                user_id = envelope.user_id.as_deref().unwrap_or_default(),
                "Unknown command type"
            );
            return dropped(e);
        }
    };

    if let Some(metrics) = metrics {
        metrics.record_received(command_type.as_str());
    }
    debug!(command_type = %command_type, id = envelope.id.as_deref().unwrap_or_default(), "Received command");

    let command = match TodoCommand::decode_as(command_type, payload) {
        Ok(command) => command,
        Err(e) => {
            error!(command_type = %command_type, error = %e, "Failed to decode command");
            return dropped(e);
        }
    };

    let started = Instant::now();
    let result = handler.handle(command).await;
    let elapsed = started.elapsed();

    match result {
        Ok(()) => {
            if let Some(metrics) = metrics {
                metrics.record_handled(command_type.as_str(), OUTCOME_SUCCESS, elapsed);
            }
            DispatchOutcome::Handled(command_type)
        }
        Err(e) => {
            if let Some(metrics) = metrics {
                metrics.record_handled(command_type.as_str(), OUTCOME_FAILURE, elapsed);
            }
            error!(
                command_type = %command_type,
                kind = e.kind(),
                error = %e,
                "Command handling failed"
            );
            DispatchOutcome::Failed(command_type, e)
        }
    }
}

/// Pull subscriber feeding the command handler
pub struct CommandSubscriber {
    jetstream: jetstream::Context,
    handler: Arc<dyn TodoCommandHandler>,
    metrics: Arc<ProcessorMetrics>,
    config: CommandSubscriberConfig,
}

impl CommandSubscriber {
    pub fn new(
        jetstream: jetstream::Context,
        handler: Arc<dyn TodoCommandHandler>,
        metrics: Arc<ProcessorMetrics>,
        config: CommandSubscriberConfig,
    ) -> Self {
        Self {
            jetstream,
            handler,
            metrics,
            config,
        }
    }

    /// Binds the durable consumer and starts the receive loop.
    ///
    /// The returned task ends after `shutdown` fires and every in-flight
    /// message has been handled and acknowledged.
    pub async fn start(
        self,
        mut shutdown: watch::Receiver<()>,
    ) -> Result<JoinHandle<()>, MessagingError> {
        let stream = self
            .jetstream
            .get_stream(&self.config.stream_name)
            .await
            .map_err(|e| {
                MessagingError::Stream(format!(
                    "Failed to get stream {}: {}",
                    self.config.stream_name, e
                ))
            })?;

        let consumer: PullConsumer = stream
            .get_or_create_consumer(&self.config.consumer_name, self.config.consumer_config())
            .await
            .map_err(|e| {
                MessagingError::Consumer(format!(
                    "Failed to create consumer {}: {}",
                    self.config.consumer_name, e
                ))
            })?;

        let mut messages = consumer
            .messages()
            .await
            .map_err(|e| MessagingError::Consumer(format!("Failed to get messages: {}", e)))?;

        let Self {
            handler,
            metrics,
            config,
            ..
        } = self;

        Ok(tokio::spawn(async move {
            info!(
                consumer = %config.consumer_name,
                subject = %config.filter_subject,
                "Started command subscriber"
            );

            let mut in_flight = JoinSet::new();

            loop {
                tokio::select! {
                    _ = shutdown.changed() => {
                        info!(consumer = %config.consumer_name, "Command subscriber stopping");
                        break;
                    }
                    next = messages.next() => match next {
                        Some(Ok(msg)) => {
                            let handler = Arc::clone(&handler);
                            let metrics = Arc::clone(&metrics);
                            in_flight.spawn(async move {
                                dispatch(handler.as_ref(), &msg.payload, Some(&metrics)).await;
                                if let Err(e) = msg.ack().await {
                                    warn!(error = %e, "Failed to ack command");
                                }
                            });
                        }
                        Some(Err(e)) => {
                            warn!(error = %e, "Error receiving command");
                        }
                        None => {
                            warn!("Command message stream ended");
                            break;
                        }
                    },
                    Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                        if let Err(e) = joined {
                            error!(error = %e, "Command task panicked");
                        }
                    }
                }
            }

            let pending = in_flight.len();
            if pending > 0 {
                info!(pending, "Waiting for in-flight commands");
            }
            while let Some(joined) = in_flight.join_next().await {
                if let Err(e) = joined {
                    error!(error = %e, "Command task panicked");
                }
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use todo_processor_domain::command::TodoCommandProcessor;
    use todo_processor_domain::persistence::PersistenceError;
    use todo_processor_domain::testing::{RecordingPublisher, ScriptedDb};
    use todoflow_shared::{
        CreateTodoCommand, DeleteTodoCommand, EventType, TodoEvent, UpdateTodoCommand,
    };
    use tokio::sync::Mutex;

    /// Records which handler ran; optionally fails every call.
    #[derive(Default)]
    struct RecordingHandler {
        calls: Mutex<Vec<CommandType>>,
        fail: bool,
    }

    impl RecordingHandler {
        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }

        async fn calls(&self) -> Vec<CommandType> {
            self.calls.lock().await.clone()
        }

        async fn record(&self, command_type: CommandType) -> Result<(), ProcessorError> {
            self.calls.lock().await.push(command_type);
            if self.fail {
                return Err(PersistenceError::new("store unavailable").into());
            }
            Ok(())
        }
    }

    #[async_trait]
    impl TodoCommandHandler for RecordingHandler {
        async fn handle_create(&self, _cmd: CreateTodoCommand) -> Result<(), ProcessorError> {
            self.record(CommandType::CreateTodo).await
        }

        async fn handle_update(&self, _cmd: UpdateTodoCommand) -> Result<(), ProcessorError> {
            self.record(CommandType::UpdateTodo).await
        }

        async fn handle_delete(&self, _cmd: DeleteTodoCommand) -> Result<(), ProcessorError> {
            self.record(CommandType::DeleteTodo).await
        }
    }

    fn gathered(metrics: &ProcessorMetrics) -> String {
        String::from_utf8(metrics.gather().unwrap()).unwrap()
    }

    #[tokio::test]
    async fn malformed_payload_is_dropped_without_handling() {
        let handler = RecordingHandler::default();
        let metrics = ProcessorMetrics::new().unwrap();

        let outcome = dispatch(&handler, b"not json", Some(&metrics)).await;

        assert!(matches!(outcome, DispatchOutcome::Dropped(DecodeError::Envelope(_))));
        assert!(handler.calls().await.is_empty());
        assert!(gathered(&metrics).contains("messages_dropped_total{reason=\"decode\"} 1"));
    }

    #[tokio::test]
    async fn unknown_type_is_dropped_without_handling() {
        let handler = RecordingHandler::default();
        let metrics = ProcessorMetrics::new().unwrap();

        let outcome = dispatch(
            &handler,
            br#"{"type":"ArchiveTodo","id":"t1","userId":"u1"}"#,
            Some(&metrics),
        )
        .await;

        assert!(matches!(
            outcome,
            DispatchOutcome::Dropped(DecodeError::UnknownCommandType(_))
        ));
        assert!(outcome.command_type().is_none());
        assert!(handler.calls().await.is_empty());
        assert!(gathered(&metrics).contains("messages_dropped_total{reason=\"unknown_type\"} 1"));
    }

    #[tokio::test]
    async fn invalid_concrete_payload_is_dropped() {
        let handler = RecordingHandler::default();

        // known type, but the title is missing
        let outcome = dispatch(&handler, br#"{"type":"CreateTodo","userId":"u1"}"#, None).await;

        assert!(matches!(
            outcome,
            DispatchOutcome::Dropped(DecodeError::Payload { .. })
        ));
        assert!(handler.calls().await.is_empty());
    }

    #[tokio::test]
    async fn routes_each_type_to_its_handler() {
        let handler = RecordingHandler::default();
        let payloads: [&[u8]; 3] = [
            br#"{"type":"CreateTodo","userId":"u1","title":"a"}"#,
            br#"{"type":"UpdateTodo","id":"t1","userId":"u1","completed":true}"#,
            br#"{"type":"DeleteTodo","id":"t1","userId":"u1"}"#,
        ];

        for payload in payloads {
            // same bytes twice must pick the same handler
            let first = dispatch(&handler, payload, None).await;
            let second = dispatch(&handler, payload, None).await;
            assert_eq!(first.command_type(), second.command_type());
        }

        assert_eq!(
            handler.calls().await,
            vec![
                CommandType::CreateTodo,
                CommandType::CreateTodo,
                CommandType::UpdateTodo,
                CommandType::UpdateTodo,
                CommandType::DeleteTodo,
                CommandType::DeleteTodo,
            ]
        );
    }

    #[tokio::test]
    async fn handler_error_is_reported_as_failed_outcome() {
        let handler = RecordingHandler::failing();
        let metrics = ProcessorMetrics::new().unwrap();

        let outcome = dispatch(
            &handler,
            br#"{"type":"DeleteTodo","id":"t1","userId":"u1"}"#,
            Some(&metrics),
        )
        .await;

        assert!(matches!(
            outcome,
            DispatchOutcome::Failed(CommandType::DeleteTodo, ProcessorError::Persistence(_))
        ));
        let text = gathered(&metrics);
        assert!(text.contains("commands_received_total{command_type=\"DeleteTodo\"} 1"));
        assert!(text.contains(
            "commands_handled_total{command_type=\"DeleteTodo\",outcome=\"failure\"} 1"
        ));
    }

    #[tokio::test]
    async fn create_payload_flows_through_processor_to_event() {
        let db = ScriptedDb::new();
        let publisher = RecordingPublisher::new();
        let created_at = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();
        db.push_created_row("t1", created_at).await;
        let processor =
            TodoCommandProcessor::new(Arc::new(db.clone()), Arc::new(publisher.clone()));
        let handler: Arc<dyn TodoCommandHandler> = Arc::new(processor);

        let outcome = dispatch(
            handler.as_ref(),
            br#"{"type":"CreateTodo","userId":"u1","title":"buy milk"}"#,
            None,
        )
        .await;

        assert!(matches!(outcome, DispatchOutcome::Handled(CommandType::CreateTodo)));
        let events = publisher.events().await;
        assert_eq!(events.len(), 1);
        let TodoEvent::TodoCreated(created) = &events[0] else {
            panic!("expected TodoCreated, got {:?}", events[0]);
        };
        assert_eq!(created.id, "t1");
        assert_eq!(created.user_id, "u1");
        assert_eq!(created.title, "buy milk");
        assert_eq!(created.timestamp, created_at);
    }

    #[tokio::test]
    async fn delete_of_missing_todo_fails_and_emits_failed_event() {
        let db = ScriptedDb::new();
        let publisher = RecordingPublisher::new();
        db.push_exec_rows(0).await;
        let processor =
            TodoCommandProcessor::new(Arc::new(db.clone()), Arc::new(publisher.clone()));

        let outcome = dispatch(
            &processor,
            br#"{"type":"DeleteTodo","id":"t1","userId":"u1"}"#,
            None,
        )
        .await;

        assert!(matches!(
            outcome,
            DispatchOutcome::Failed(CommandType::DeleteTodo, ProcessorError::NotFound { .. })
        ));
        assert_eq!(
            publisher.events().await[0].event_type(),
            EventType::TodoDeleteFailed
        );
    }

    #[test]
    fn consumer_config_is_durable_with_explicit_ack() {
        let nats = NatsConfig {
            urls: vec!["nats://localhost:4222".to_string()],
            connect_timeout_secs: 10,
            ack_wait_secs: 45,
        };

        let config = CommandSubscriberConfig::from(&nats).consumer_config();

        assert_eq!(config.durable_name.as_deref(), Some("domain-processor"));
        assert_eq!(config.filter_subject, "todo.commands");
        assert_eq!(config.ack_policy, AckPolicy::Explicit);
        assert_eq!(config.ack_wait, Duration::from_secs(45));
    }
}
