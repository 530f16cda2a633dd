// Todo Command Processor
//
// mutate store -> build event -> publish. Exactly one publish per command.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use todoflow_shared::{
    CreateTodoCommand, DeleteTodoCommand, EVENTS_SUBJECT, TodoCreatedEvent, TodoEvent,
    TodoUpdatedEvent, UpdateTodoCommand,
};
use tracing::{debug, error, instrument, warn};

use super::TodoCommandHandler;
use super::error::ProcessorError;
use super::statements::{
    DELETE_TODO, INSERT_TODO, UPDATE_TODO, delete_params, insert_params, update_params,
};
use crate::event_bus::EventPublisher;
use crate::persistence::{DbExecutor, ScanSlot};

/// Applies todo commands to the store and publishes the outcome.
///
/// Holds only the two shared handles; safe to share across tasks.
#[derive(Clone)]
pub struct TodoCommandProcessor {
    db: Arc<dyn DbExecutor>,
    publisher: Arc<dyn EventPublisher>,
    events_subject: String,
}

impl TodoCommandProcessor {
    /// Creates a processor publishing on `todo.events`.
    #[inline]
    pub fn new(db: Arc<dyn DbExecutor>, publisher: Arc<dyn EventPublisher>) -> Self {
        Self::with_subject(db, publisher, EVENTS_SUBJECT)
    }

    pub fn with_subject(
        db: Arc<dyn DbExecutor>,
        publisher: Arc<dyn EventPublisher>,
        events_subject: impl Into<String>,
    ) -> Self {
        Self {
            db,
            publisher,
            events_subject: events_subject.into(),
        }
    }

    async fn publish(&self, event: TodoEvent) -> Result<(), ProcessorError> {
        self.publisher.publish(&self.events_subject, &event).await?;
        debug!(
            event_type = %event.event_type(),
            id = %event.id(),
            "event published"
        );
        Ok(())
    }

    /// Publishes a failed event on a path that already carries an error.
    /// A publish failure here is logged; the store error wins.
    async fn publish_failure(&self, event: TodoEvent) {
        let event_type = event.event_type();
        if let Err(e) = self.publish(event).await {
            error!(event_type = %event_type, error = %e, "failed to publish failure event");
        }
    }
}

impl std::fmt::Debug for TodoCommandProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TodoCommandProcessor")
            .field("events_subject", &self.events_subject)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl TodoCommandHandler for TodoCommandProcessor {
    #[instrument(skip_all, fields(user_id = %cmd.base.user_id))]
    async fn handle_create(&self, cmd: CreateTodoCommand) -> Result<(), ProcessorError> {
        let mut row = self.db.query_row(INSERT_TODO, &insert_params(&cmd)).await;

        let mut id = String::new();
        let mut created_at = DateTime::<Utc>::default();
        let scanned = row.scan(&mut [
            ScanSlot::Text(&mut id),
            ScanSlot::Timestamp(&mut created_at),
        ]);

        if let Err(e) = scanned {
            error!(error = %e, "insert todo failed");
            self.publish_failure(TodoEvent::create_failed(cmd.base.user_id))
                .await;
            return Err(e.into());
        }

        let event = TodoEvent::TodoCreated(TodoCreatedEvent {
            id,
            user_id: cmd.base.user_id,
            timestamp: created_at,
            title: cmd.title,
            description: cmd.description,
            completed: false,
            due_date: cmd.due_date,
            priority: cmd.priority,
            tags: cmd.tags.unwrap_or_default(),
        });

        self.publish(event).await
    }

    #[instrument(skip_all, fields(id = %cmd.base.id, user_id = %cmd.base.user_id))]
    async fn handle_update(&self, cmd: UpdateTodoCommand) -> Result<(), ProcessorError> {
        let rows = match self.db.exec(UPDATE_TODO, &update_params(&cmd)).await {
            Ok(rows) => rows,
            Err(e) => {
                error!(error = %e, "update todo failed");
                self.publish_failure(TodoEvent::update_failed(&cmd.base.id, &cmd.base.user_id))
                    .await;
                return Err(e.into());
            }
        };

        if rows == 0 {
            warn!("no todo matched update; reporting failure without error");
            return self
                .publish(TodoEvent::update_failed(cmd.base.id, cmd.base.user_id))
                .await;
        }

        let event = TodoEvent::TodoUpdated(TodoUpdatedEvent {
            id: cmd.base.id,
            user_id: cmd.base.user_id,
            timestamp: Utc::now(),
            title: cmd.title.unwrap_or_default(),
            description: cmd.description.unwrap_or_default(),
            completed: cmd.completed.unwrap_or_default(),
            due_date: cmd.due_date,
            priority: cmd.priority,
            tags: cmd.tags.unwrap_or_default(),
        });

        self.publish(event).await
    }

    #[instrument(skip_all, fields(id = %cmd.base.id, user_id = %cmd.base.user_id))]
    async fn handle_delete(&self, cmd: DeleteTodoCommand) -> Result<(), ProcessorError> {
        let failure = match self.db.exec(DELETE_TODO, &delete_params(&cmd)).await {
            Ok(0) => ProcessorError::NotFound {
                id: cmd.base.id.clone(),
                user_id: cmd.base.user_id.clone(),
            },
            Ok(_) => {
                return self
                    .publish(TodoEvent::deleted(cmd.base.id, cmd.base.user_id))
                    .await;
            }
            Err(e) => e.into(),
        };

        error!(error = %failure, kind = failure.kind(), "delete todo failed");
        self.publish_failure(TodoEvent::delete_failed(cmd.base.id, cmd.base.user_id))
            .await;
        Err(failure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{CallKind, RecordingPublisher, ScriptedDb};
    use crate::persistence::SqlParam;
    use chrono::TimeZone;
    use todoflow_shared::{EventType, Priority, TodoCommand};

    fn processor(db: &ScriptedDb, publisher: &RecordingPublisher) -> TodoCommandProcessor {
        TodoCommandProcessor::new(Arc::new(db.clone()), Arc::new(publisher.clone()))
    }

    fn created_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn create_publishes_created_event_with_store_id_and_timestamp() {
        let db = ScriptedDb::new();
        let publisher = RecordingPublisher::new();
        db.push_created_row("t1", created_at()).await;

        processor(&db, &publisher)
            .handle_create(CreateTodoCommand::new("u1", "buy milk"))
            .await
            .unwrap();

        let published = publisher.published().await;
        assert_eq!(published.len(), 1);
        let (subject, event) = &published[0];
        assert_eq!(subject, "todo.events");

        let TodoEvent::TodoCreated(created) = event else {
            panic!("expected TodoCreated, got {:?}", event);
        };
        assert_eq!(created.id, "t1");
        assert_eq!(created.user_id, "u1");
        assert_eq!(created.title, "buy milk");
        assert_eq!(created.timestamp, created_at());
        assert!(!created.completed);

        let calls = db.calls().await;
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].kind, CallKind::QueryRow);
        assert_eq!(calls[0].statement, INSERT_TODO);
    }

    #[tokio::test]
    async fn create_echoes_optional_fields() {
        let db = ScriptedDb::new();
        let publisher = RecordingPublisher::new();
        db.push_created_row("t2", created_at()).await;

        let mut cmd = CreateTodoCommand::new("u1", "file taxes");
        cmd.description = Some("before april".to_string());
        cmd.priority = Some(Priority::High);
        cmd.tags = Some(vec!["admin".to_string()]);

        processor(&db, &publisher).handle_create(cmd).await.unwrap();

        let TodoEvent::TodoCreated(created) = &publisher.events().await[0] else {
            panic!("expected TodoCreated");
        };
        assert_eq!(created.description.as_deref(), Some("before april"));
        assert_eq!(created.priority, Some(Priority::High));
        assert_eq!(created.tags, vec!["admin".to_string()]);
    }

    #[tokio::test]
    async fn create_failure_publishes_failed_event_and_returns_error() {
        let db = ScriptedDb::new();
        let publisher = RecordingPublisher::new();
        db.push_row_error("duplicate key").await;

        let err = processor(&db, &publisher)
            .handle_create(CreateTodoCommand::new("u1", "buy milk"))
            .await
            .unwrap_err();

        assert!(matches!(err, ProcessorError::Persistence(_)));
        assert!(err.to_string().contains("duplicate key"));

        let events = publisher.events().await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type(), EventType::TodoCreateFailed);
        assert_eq!(events[0].id(), "");
        assert_eq!(events[0].user_id(), "u1");
        assert_eq!(db.calls().await.len(), 1);
    }

    #[tokio::test]
    async fn create_failure_keeps_store_error_when_publish_also_fails() {
        let db = ScriptedDb::new();
        let publisher = RecordingPublisher::failing("broker down");
        db.push_row_error("connection refused").await;

        let err = processor(&db, &publisher)
            .handle_create(CreateTodoCommand::new("u1", "buy milk"))
            .await
            .unwrap_err();

        assert!(matches!(err, ProcessorError::Persistence(_)));
        assert_eq!(publisher.attempts().await, 1);
    }

    #[tokio::test]
    async fn update_with_match_echoes_request_values_not_stored_row() {
        let db = ScriptedDb::new();
        let publisher = RecordingPublisher::new();
        db.push_exec_rows(1).await;

        let mut cmd = UpdateTodoCommand::new("t1", "u1");
        cmd.completed = Some(true);

        let before = Utc::now();
        processor(&db, &publisher).handle_update(cmd).await.unwrap();

        let events = publisher.events().await;
        assert_eq!(events.len(), 1);
        let TodoEvent::TodoUpdated(updated) = &events[0] else {
            panic!("expected TodoUpdated, got {:?}", events[0]);
        };
        assert_eq!(updated.id, "t1");
        assert_eq!(updated.user_id, "u1");
        assert!(updated.completed);
        assert_eq!(updated.title, "");
        assert_eq!(updated.description, "");
        assert!(updated.tags.is_empty());
        assert!(updated.due_date.is_none());
        assert!(updated.timestamp >= before);
    }

    #[tokio::test]
    async fn update_binds_null_for_absent_fields() {
        let db = ScriptedDb::new();
        let publisher = RecordingPublisher::new();
        db.push_exec_rows(1).await;

        let mut cmd = UpdateTodoCommand::new("t1", "u1");
        cmd.title = Some("renamed".to_string());

        processor(&db, &publisher).handle_update(cmd).await.unwrap();

        let calls = db.calls().await;
        assert_eq!(calls[0].kind, CallKind::Exec);
        assert_eq!(calls[0].statement, UPDATE_TODO);
        assert_eq!(calls[0].params[0], SqlParam::Text(Some("renamed".to_string())));
        assert!(calls[0].params[1].is_null());
        assert!(calls[0].params[2].is_null());
    }

    #[tokio::test]
    async fn update_without_match_is_soft_failure() {
        let db = ScriptedDb::new();
        let publisher = RecordingPublisher::new();
        db.push_exec_rows(0).await;

        let result = processor(&db, &publisher)
            .handle_update(UpdateTodoCommand::new("missing", "u1"))
            .await;

        assert!(result.is_ok());
        let events = publisher.events().await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type(), EventType::TodoUpdateFailed);
        assert_eq!(events[0].id(), "missing");
        assert_eq!(events[0].user_id(), "u1");
    }

    #[tokio::test]
    async fn update_of_non_uuid_id_is_soft_failure() {
        let db = ScriptedDb::new();
        let publisher = RecordingPublisher::new();
        db.push_exec_rows(0).await;

        let mut cmd = UpdateTodoCommand::new("t1", "u1");
        cmd.completed = Some(true);
        let result = processor(&db, &publisher).handle_update(cmd).await;

        assert!(result.is_ok());
        let calls = db.calls().await;
        assert_eq!(calls[0].params[6], SqlParam::Text(Some("t1".to_string())));
        let events = publisher.events().await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type(), EventType::TodoUpdateFailed);
        assert_eq!(events[0].id(), "t1");
    }

    #[tokio::test]
    async fn update_statement_error_is_hard_failure() {
        let db = ScriptedDb::new();
        let publisher = RecordingPublisher::new();
        db.push_exec_error("connection reset").await;

        let err = processor(&db, &publisher)
            .handle_update(UpdateTodoCommand::new("t1", "u1"))
            .await
            .unwrap_err();

        assert!(matches!(err, ProcessorError::Persistence(_)));
        let events = publisher.events().await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type(), EventType::TodoUpdateFailed);
    }

    #[tokio::test]
    async fn update_soft_failure_still_reports_publish_error() {
        let db = ScriptedDb::new();
        let publisher = RecordingPublisher::failing("timeout");
        db.push_exec_rows(0).await;

        let err = processor(&db, &publisher)
            .handle_update(UpdateTodoCommand::new("t1", "u1"))
            .await
            .unwrap_err();

        assert!(matches!(err, ProcessorError::Publish(_)));
    }

    #[tokio::test]
    async fn delete_with_match_publishes_deleted() {
        let db = ScriptedDb::new();
        let publisher = RecordingPublisher::new();
        db.push_exec_rows(1).await;

        processor(&db, &publisher)
            .handle_delete(DeleteTodoCommand::new("t1", "u1"))
            .await
            .unwrap();

        let events = publisher.events().await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type(), EventType::TodoDeleted);
        assert_eq!(events[0].id(), "t1");

        let calls = db.calls().await;
        assert_eq!(calls[0].statement, DELETE_TODO);
    }

    #[tokio::test]
    async fn delete_without_match_is_hard_failure() {
        let db = ScriptedDb::new();
        let publisher = RecordingPublisher::new();
        db.push_exec_rows(0).await;

        let err = processor(&db, &publisher)
            .handle_delete(DeleteTodoCommand::new("t1", "u1"))
            .await
            .unwrap_err();

        assert!(matches!(err, ProcessorError::NotFound { ref id, .. } if id == "t1"));
        let events = publisher.events().await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type(), EventType::TodoDeleteFailed);
        assert_eq!(events[0].user_id(), "u1");
    }

    #[tokio::test]
    async fn delete_statement_error_publishes_failed_event() {
        let db = ScriptedDb::new();
        let publisher = RecordingPublisher::new();
        db.push_exec_error("connection reset").await;

        let err = processor(&db, &publisher)
            .handle_delete(DeleteTodoCommand::new("t1", "u1"))
            .await
            .unwrap_err();

        assert!(matches!(err, ProcessorError::Persistence(_)));
        assert_eq!(
            publisher.events().await[0].event_type(),
            EventType::TodoDeleteFailed
        );
    }

    #[tokio::test]
    async fn update_and_delete_disagree_on_missing_rows() {
        let db = ScriptedDb::new();
        let publisher = RecordingPublisher::new();
        db.push_exec_rows(0).await;
        db.push_exec_rows(0).await;
        let processor = processor(&db, &publisher);

        let update = processor
            .handle_update(UpdateTodoCommand::new("t9", "u1"))
            .await;
        let delete = processor
            .handle_delete(DeleteTodoCommand::new("t9", "u1"))
            .await;

        assert!(update.is_ok());
        assert!(delete.is_err());
        let types: Vec<_> = publisher
            .events()
            .await
            .iter()
            .map(TodoEvent::event_type)
            .collect();
        assert_eq!(
            types,
            vec![EventType::TodoUpdateFailed, EventType::TodoDeleteFailed]
        );
    }

    #[tokio::test]
    async fn every_command_yields_exactly_one_event() {
        let db = ScriptedDb::new();
        let publisher = RecordingPublisher::new();
        db.push_created_row("t1", created_at()).await;
        db.push_row_error("insert failed").await;
        db.push_exec_rows(1).await;
        db.push_exec_rows(0).await;
        db.push_exec_error("boom").await;
        db.push_exec_rows(1).await;
        db.push_exec_rows(0).await;
        let processor = processor(&db, &publisher);

        let commands = vec![
            TodoCommand::Create(CreateTodoCommand::new("u1", "a")),
            TodoCommand::Create(CreateTodoCommand::new("u1", "b")),
            TodoCommand::Update(UpdateTodoCommand::new("t1", "u1")),
            TodoCommand::Update(UpdateTodoCommand::new("t2", "u1")),
            TodoCommand::Update(UpdateTodoCommand::new("t3", "u1")),
            TodoCommand::Delete(DeleteTodoCommand::new("t1", "u1")),
            TodoCommand::Delete(DeleteTodoCommand::new("t2", "u1")),
        ];
        let count = commands.len();

        for (i, command) in commands.into_iter().enumerate() {
            let _ = processor.handle(command).await;
            assert_eq!(publisher.attempts().await, i + 1);
        }

        assert_eq!(db.calls().await.len(), count);
        assert!(publisher.events().await.iter().all(|e| e.user_id() == "u1"));
    }
}
