// Command Handling Module
//
// Todo command handlers: one persistence mutation and one published event
// per command.

use async_trait::async_trait;
use todoflow_shared::{CreateTodoCommand, DeleteTodoCommand, TodoCommand, UpdateTodoCommand};

pub mod error;
pub mod processor;
pub mod statements;

pub use error::ProcessorError;
pub use processor::TodoCommandProcessor;

/// Handler for the closed set of todo commands.
///
/// Implementations must be safe to call concurrently for distinct commands.
#[async_trait]
pub trait TodoCommandHandler: Send + Sync {
    async fn handle_create(&self, cmd: CreateTodoCommand) -> Result<(), ProcessorError>;

    async fn handle_update(&self, cmd: UpdateTodoCommand) -> Result<(), ProcessorError>;

    async fn handle_delete(&self, cmd: DeleteTodoCommand) -> Result<(), ProcessorError>;

    /// Routes a decoded command to its handler.
    async fn handle(&self, command: TodoCommand) -> Result<(), ProcessorError> {
        match command {
            TodoCommand::Create(cmd) => self.handle_create(cmd).await,
            TodoCommand::Update(cmd) => self.handle_update(cmd).await,
            TodoCommand::Delete(cmd) => self.handle_delete(cmd).await,
        }
    }
}
