//! Groups a flat ticket list into the three board columns.

use uuid::Uuid;

use super::models::{BoardView, ColumnView, Ticket, TicketStatus};
use super::store::RemoteStore;
use crate::errors::TaskflowError;

/// Split `tickets` into one column per status, in board order.
///
/// Relative order inside each column follows the input order, so a list
/// already sorted by `position` stays sorted.
pub fn compose(tickets: &[Ticket]) -> Vec<ColumnView> {
    TicketStatus::ALL
        .iter()
        .map(|status| {
            let bucket: Vec<Ticket> = tickets
                .iter()
                .filter(|t| t.status == *status)
                .cloned()
                .collect();
            ColumnView {
                status: *status,
                title: status.title().to_string(),
                count: bucket.len(),
                tickets: bucket,
            }
        })
        .collect()
}

/// Fetch a project and its tickets and compose the full board.
pub async fn load_board(
    store: &dyn RemoteStore,
    project_id: Uuid,
) -> Result<BoardView, TaskflowError> {
    let project = store
        .get_project(project_id)
        .await
        .map_err(TaskflowError::from_store)?
        .ok_or(TaskflowError::ProjectNotFound { id: project_id })?;
    let tickets = store
        .list_tickets(project_id)
        .await
        .map_err(TaskflowError::from_store)?;
    Ok(BoardView {
        project,
        columns: compose(&tickets),
    })
}

/// The column for `status` inside a composed board.
pub fn column<'a>(columns: &'a [ColumnView], status: TicketStatus) -> Option<&'a ColumnView> {
    columns.iter().find(|c| c.status == status)
}
