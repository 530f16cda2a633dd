//! SQL statements against `todos.todo` and their positional parameters.
//!
//! The partial-update merge lives here: every optional column of
//! [`UPDATE_TODO`] is wrapped in `COALESCE($n, column)`, so a `NULL` parameter
//! keeps the stored value.
//!
//! Ids are matched as text, so an id of any shape that names no row affects
//! zero rows instead of failing the statement.

use todoflow_shared::{CreateTodoCommand, DeleteTodoCommand, Priority, UpdateTodoCommand};

use crate::persistence::SqlParam;

pub const INSERT_TODO: &str = "\
INSERT INTO todos.todo (user_id, title, description, due_date, priority, tags)
VALUES ($1, $2, $3, $4, $5, $6)
RETURNING id::text, created_at";

pub const UPDATE_TODO: &str = "\
UPDATE todos.todo SET
    title = COALESCE($1, title),
    description = COALESCE($2, description),
    completed = COALESCE($3, completed),
    due_date = COALESCE($4, due_date),
    priority = COALESCE($5, priority),
    tags = COALESCE($6, tags),
    updated_at = NOW()
WHERE id::text = $7 AND user_id = $8";

pub const DELETE_TODO: &str = "DELETE FROM todos.todo WHERE id::text = $1 AND user_id = $2";

fn priority_param(priority: Option<Priority>) -> SqlParam {
    SqlParam::Text(priority.map(|p| p.as_str().to_string()))
}

/// `$1..$6` of [`INSERT_TODO`]. Absent tags are stored as an empty array.
pub fn insert_params(cmd: &CreateTodoCommand) -> Vec<SqlParam> {
    vec![
        SqlParam::Text(Some(cmd.base.user_id.clone())),
        SqlParam::Text(Some(cmd.title.clone())),
        SqlParam::Text(cmd.description.clone()),
        SqlParam::Timestamp(cmd.due_date),
        priority_param(cmd.priority),
        SqlParam::TextArray(Some(cmd.tags.clone().unwrap_or_default())),
    ]
}

/// `$1..$8` of [`UPDATE_TODO`]. Absent fields bind `NULL`.
pub fn update_params(cmd: &UpdateTodoCommand) -> Vec<SqlParam> {
    vec![
        SqlParam::Text(cmd.title.clone()),
        SqlParam::Text(cmd.description.clone()),
        SqlParam::Bool(cmd.completed),
        SqlParam::Timestamp(cmd.due_date),
        priority_param(cmd.priority),
        SqlParam::TextArray(cmd.tags.clone()),
        SqlParam::Text(Some(cmd.base.id.clone())),
        SqlParam::Text(Some(cmd.base.user_id.clone())),
    ]
}

pub fn delete_params(cmd: &DeleteTodoCommand) -> Vec<SqlParam> {
    vec![
        SqlParam::Text(Some(cmd.base.id.clone())),
        SqlParam::Text(Some(cmd.base.user_id.clone())),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn placeholder_count(statement: &str) -> usize {
        (1..=16)
            .filter(|n| statement.contains(&format!("${}", n)))
            .count()
    }

    #[test]
    fn param_counts_match_placeholders() {
        let create = CreateTodoCommand::new("u1", "buy milk");
        let update = UpdateTodoCommand::new("t1", "u1");
        let delete = DeleteTodoCommand::new("t1", "u1");

        assert_eq!(insert_params(&create).len(), placeholder_count(INSERT_TODO));
        assert_eq!(update_params(&update).len(), placeholder_count(UPDATE_TODO));
        assert_eq!(delete_params(&delete).len(), placeholder_count(DELETE_TODO));
    }

    #[test]
    fn absent_update_fields_bind_null() {
        let mut update = UpdateTodoCommand::new("t1", "u1");
        update.completed = Some(true);

        let params = update_params(&update);

        assert_eq!(params[2], SqlParam::Bool(Some(true)));
        for idx in [0, 1, 3, 4, 5] {
            assert!(params[idx].is_null(), "param ${} should be NULL", idx + 1);
        }
        assert_eq!(params[6], SqlParam::Text(Some("t1".to_string())));
        assert_eq!(params[7], SqlParam::Text(Some("u1".to_string())));
    }

    #[test]
    fn every_optional_column_is_merged() {
        for column in ["title", "description", "completed", "due_date", "priority", "tags"] {
            assert!(
                UPDATE_TODO.contains(&format!("{column} = COALESCE(")),
                "{column} must keep its stored value when absent"
            );
        }
    }

    #[test]
    fn ids_are_compared_as_text_without_cast() {
        for statement in [UPDATE_TODO, DELETE_TODO] {
            assert!(statement.contains("id::text = $"), "{statement}");
            assert!(!statement.contains("::uuid"), "{statement}");
        }
    }

    #[test]
    fn create_binds_empty_tags_and_priority_text() {
        let mut create = CreateTodoCommand::new("u1", "buy milk");
        create.priority = Some(Priority::Medium);

        let params = insert_params(&create);

        assert_eq!(params[4], SqlParam::Text(Some("medium".to_string())));
        assert_eq!(params[5], SqlParam::TextArray(Some(vec![])));
        assert!(params[2].is_null());
    }
}
