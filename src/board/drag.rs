//! Drag interaction controller.
//!
//! Decides intent only: a drop onto a different status column yields a
//! [`DragIntent`] for the update propagator; every other drop is a no-op.
//! The controller never touches the store.

use std::str::FromStr;

use uuid::Uuid;

use super::models::{Ticket, TicketPatch, TicketStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DragState {
    #[default]
    Idle,
    Dragging {
        ticket_id: Uuid,
    },
}

/// A status change requested by a drop.
#[derive(Debug, Clone, PartialEq)]
pub struct DragIntent {
    pub ticket_id: Uuid,
    pub from: TicketStatus,
    pub to: TicketStatus,
}

impl DragIntent {
    pub fn patch(&self) -> TicketPatch {
        TicketPatch::status(self.to)
    }
}

#[derive(Debug, Default)]
pub struct DragController {
    state: DragState,
}

impl DragController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> DragState {
        self.state
    }

    /// Capture `ticket_id` if it is on the board. Unknown ids leave the
    /// controller idle.
    pub fn drag_start(&mut self, ticket_id: Uuid, tickets: &[Ticket]) -> bool {
        if tickets.iter().any(|t| t.id == ticket_id) {
            self.state = DragState::Dragging { ticket_id };
            true
        } else {
            self.state = DragState::Idle;
            false
        }
    }

    /// Finish the drag over `over` (a column id such as `"done"`), or over
    /// nothing. Always returns the controller to idle.
    pub fn drag_end(&mut self, over: Option<&str>, tickets: &[Ticket]) -> Option<DragIntent> {
        let state = std::mem::take(&mut self.state);
        let DragState::Dragging { ticket_id } = state else {
            return None;
        };
        let target = TicketStatus::from_str(over?).ok()?;
        let ticket = tickets.iter().find(|t| t.id == ticket_id)?;
        if ticket.status == target {
            return None;
        }
        Some(DragIntent {
            ticket_id,
            from: ticket.status,
            to: target,
        })
    }

    pub fn cancel(&mut self) {
        self.state = DragState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ticket(status: TicketStatus) -> Ticket {
        Ticket {
            id: Uuid::new_v4(),
            title: "t1".into(),
            description: None,
            status,
            project_id: Uuid::nil(),
            creator_id: Uuid::new_v4(),
            updater_id: None,
            position: 0,
            created_at: String::new(),
            updated_at: String::new(),
            creator: None,
            updater: None,
        }
    }

    #[test]
    fn test_drop_on_other_column_yields_intent() {
        let tickets = vec![ticket(TicketStatus::Todo)];
        let mut ctl = DragController::new();
        assert!(ctl.drag_start(tickets[0].id, &tickets));
        assert_eq!(
            ctl.state(),
            DragState::Dragging {
                ticket_id: tickets[0].id
            }
        );

        let intent = ctl.drag_end(Some("done"), &tickets).expect("intent");
        assert_eq!(intent.ticket_id, tickets[0].id);
        assert_eq!(intent.from, TicketStatus::Todo);
        assert_eq!(intent.to, TicketStatus::Done);
        assert_eq!(intent.patch(), TicketPatch::status(TicketStatus::Done));
        assert_eq!(ctl.state(), DragState::Idle);
    }

    #[test]
    fn test_drop_on_own_column_is_noop() {
        let tickets = vec![ticket(TicketStatus::InProgress)];
        let mut ctl = DragController::new();
        ctl.drag_start(tickets[0].id, &tickets);
        assert!(ctl.drag_end(Some("in_progress"), &tickets).is_none());
        assert_eq!(ctl.state(), DragState::Idle);
    }

    #[test]
    fn test_drop_without_target_is_noop() {
        let tickets = vec![ticket(TicketStatus::Todo)];
        let mut ctl = DragController::new();
        ctl.drag_start(tickets[0].id, &tickets);
        assert!(ctl.drag_end(None, &tickets).is_none());
        assert_eq!(ctl.state(), DragState::Idle);
    }

    #[test]
    fn test_drop_on_unrecognized_target_is_noop() {
        let tickets = vec![ticket(TicketStatus::Todo)];
        let mut ctl = DragController::new();
        ctl.drag_start(tickets[0].id, &tickets);
        // Dropping onto another card reports the card's id, not a column.
        let other_card = Uuid::new_v4().to_string();
        assert!(ctl.drag_end(Some(&other_card), &tickets).is_none());
        assert_eq!(ctl.state(), DragState::Idle);
    }

    #[test]
    fn test_ticket_removed_mid_drag_is_noop() {
        let tickets = vec![ticket(TicketStatus::Todo)];
        let mut ctl = DragController::new();
        ctl.drag_start(tickets[0].id, &tickets);
        // A refetch replaced the list while dragging.
        assert!(ctl.drag_end(Some("done"), &[]).is_none());
    }

    #[test]
    fn test_unknown_ticket_never_starts_drag() {
        let tickets = vec![ticket(TicketStatus::Todo)];
        let mut ctl = DragController::new();
        assert!(!ctl.drag_start(Uuid::new_v4(), &tickets));
        assert_eq!(ctl.state(), DragState::Idle);
        assert!(ctl.drag_end(Some("done"), &tickets).is_none());
    }

    #[test]
    fn test_cancel_returns_to_idle() {
        let tickets = vec![ticket(TicketStatus::Todo)];
        let mut ctl = DragController::new();
        ctl.drag_start(tickets[0].id, &tickets);
        ctl.cancel();
        assert_eq!(ctl.state(), DragState::Idle);
        assert!(ctl.drag_end(Some("done"), &tickets).is_none());
    }
}
