//! Update propagator: persist a ticket change, notify its creator, refetch.
//!
//! The three steps run in order and only the first one can fail the
//! operation. The notification is best-effort and the refetch result is
//! reported alongside the update rather than replacing it; there is no
//! local merge of the patch into the visible list.

use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use super::models::*;
use super::store::RemoteStore;
use crate::errors::TaskflowError;

/// Outcome of a successful primary update.
#[derive(Debug, Clone, Serialize)]
pub struct Propagation {
    pub ticket: Ticket,
    pub notification: Option<Notification>,
    /// Fresh ticket list for the project, when the refetch succeeded.
    pub tickets: Option<Vec<Ticket>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refetch_error: Option<String>,
}

pub fn update_message(title: &str) -> String {
    format!("Ticket \"{}\" was updated", title)
}

#[derive(Clone)]
pub struct UpdatePropagator {
    store: Arc<dyn RemoteStore>,
}

impl UpdatePropagator {
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self { store }
    }

    /// Apply `patch` to `ticket_id` as `actor`.
    ///
    /// `current` is the caller's visible ticket list; the notification is
    /// addressed to the creator found there, so a ticket missing from it
    /// gets no notification.
    pub async fn propagate(
        &self,
        actor: &Profile,
        ticket_id: Uuid,
        patch: TicketPatch,
        current: &[Ticket],
    ) -> Result<Propagation, TaskflowError> {
        let updated = self
            .store
            .update_ticket(ticket_id, patch, actor.id)
            .await
            .map_err(TaskflowError::from_store)?;
        tracing::info!(
            ticket_id = %ticket_id,
            status = %updated.status,
            updater = %actor.email,
            "ticket updated"
        );

        let notification = match current.iter().find(|t| t.id == ticket_id) {
            Some(before) => self.notify_creator(before).await,
            None => None,
        };

        let (tickets, refetch_error) = match self.store.list_tickets(updated.project_id).await {
            Ok(tickets) => (Some(tickets), None),
            Err(e) => {
                tracing::warn!(project_id = %updated.project_id, error = %e, "ticket refetch failed");
                (None, Some(format!("{:#}", e)))
            }
        };

        Ok(Propagation {
            ticket: updated,
            notification,
            tickets,
            refetch_error,
        })
    }

    async fn notify_creator(&self, ticket: &Ticket) -> Option<Notification> {
        let result = self
            .store
            .insert_notification(NewNotification {
                user_id: ticket.creator_id,
                message: update_message(&ticket.title),
                ticket_id: Some(ticket.id),
                project_id: Some(ticket.project_id),
            })
            .await;
        match result {
            Ok(notification) => Some(notification),
            Err(e) => {
                tracing::warn!(ticket_id = %ticket.id, error = %e, "notification insert failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::testing::{RecordingStore, seed_board};

    #[tokio::test]
    async fn test_drop_to_done_updates_once_and_notifies_creator() {
        let store = Arc::new(RecordingStore::new());
        let seeded = seed_board(&store).await;
        let propagator = UpdatePropagator::new(store.clone());
        let before = store.calls();

        let outcome = propagator
            .propagate(
                &seeded.mover,
                seeded.ticket.id,
                TicketPatch::status(TicketStatus::Done),
                &seeded.tickets,
            )
            .await
            .unwrap();

        let calls = store.calls().since(&before);
        assert_eq!(calls.updates, 1);
        assert_eq!(calls.notifications, 1);
        assert_eq!(calls.ticket_fetches, 1);
        assert_eq!(
            store.last_patch().unwrap(),
            TicketPatch::status(TicketStatus::Done)
        );

        assert_eq!(outcome.ticket.status, TicketStatus::Done);
        assert_eq!(outcome.ticket.updater_id, Some(seeded.mover.id));
        let note = outcome.notification.expect("notification");
        assert_eq!(note.user_id, seeded.creator.id);
        assert_eq!(note.message, "Ticket \"t1\" was updated");
        assert_eq!(note.project_id, Some(seeded.project.id));

        let refreshed = outcome.tickets.expect("refetched");
        assert_eq!(refreshed[0].status, TicketStatus::Done);
    }

    #[tokio::test]
    async fn test_failed_update_skips_notification_and_refetch() {
        let store = Arc::new(RecordingStore::new());
        let seeded = seed_board(&store).await;
        store.fail_updates(true);
        let propagator = UpdatePropagator::new(store.clone());
        let before = store.calls();

        let err = propagator
            .propagate(
                &seeded.mover,
                seeded.ticket.id,
                TicketPatch::status(TicketStatus::Done),
                &seeded.tickets,
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("update rejected"));

        let calls = store.calls().since(&before);
        assert_eq!(calls.updates, 1);
        assert_eq!(calls.notifications, 0);
        assert_eq!(calls.ticket_fetches, 0);

        store.fail_updates(false);
        let stored = store.list_tickets(seeded.project.id).await.unwrap();
        assert_eq!(stored[0].status, TicketStatus::Todo);
    }

    #[tokio::test]
    async fn test_notification_failure_does_not_fail_update() {
        let store = Arc::new(RecordingStore::new());
        let seeded = seed_board(&store).await;
        store.fail_notifications(true);
        let propagator = UpdatePropagator::new(store.clone());

        let outcome = propagator
            .propagate(
                &seeded.mover,
                seeded.ticket.id,
                TicketPatch::status(TicketStatus::InProgress),
                &seeded.tickets,
            )
            .await
            .unwrap();

        assert!(outcome.notification.is_none());
        assert_eq!(outcome.ticket.status, TicketStatus::InProgress);
        assert!(outcome.tickets.is_some());
    }

    #[tokio::test]
    async fn test_ticket_missing_from_visible_list_gets_no_notification() {
        let store = Arc::new(RecordingStore::new());
        let seeded = seed_board(&store).await;
        let propagator = UpdatePropagator::new(store.clone());
        let before = store.calls();

        let outcome = propagator
            .propagate(
                &seeded.mover,
                seeded.ticket.id,
                TicketPatch::status(TicketStatus::Done),
                &[],
            )
            .await
            .unwrap();

        assert!(outcome.notification.is_none());
        assert_eq!(store.calls().since(&before).notifications, 0);
    }

    #[tokio::test]
    async fn test_unknown_ticket_is_not_found() {
        let store = Arc::new(RecordingStore::new());
        let seeded = seed_board(&store).await;
        let propagator = UpdatePropagator::new(store.clone());

        let err = propagator
            .propagate(
                &seeded.mover,
                Uuid::new_v4(),
                TicketPatch::status(TicketStatus::Done),
                &seeded.tickets,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, TaskflowError::TicketNotFound { .. }));
    }
}
