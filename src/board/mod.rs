//! TaskFlow board: projects, tickets and the three-column status board.
//!
//! ## Module Map
//!
//! ```text
//! ┌──────────┐   HTTP   ┌──────────────────────────────────────────────────┐
//! │  Client  │ ───────> │  server.rs  (axum Router, pages, ServerConfig)   │
//! │          │ <─────── │    ├─ api.rs  (JSON handlers, AppState)          │
//! └──────────┘ WebSocket│    └─ ws.rs   (change feed → client frames)      │
//!                       │         │                                        │
//! ┌──────────┐          │         v                                        │
//! │   CLI    │ ───────> │  views.rs  (DashboardView, ProjectBoardView)     │
//! └──────────┘          │    ├─ drag.rs        (DragController)            │
//!                       │    ├─ propagator.rs  (UpdatePropagator)          │
//!                       │    ├─ forms.rs       (ProjectForm, TicketForm)   │
//!                       │    └─ visibility.rs  (SuperUserMode, cards)      │
//!                       │         │                                        │
//!                       │         v                                        │
//!                       │  store.rs  (RemoteStore trait, LocalStore,       │
//!                       │             ChangeFeed)                          │
//!                       │         │                                        │
//!                       │         v                                        │
//!                       │  db.rs     (SQLite via DbHandle)                 │
//!                       └──────────────────────────────────────────────────┘
//! ```
//!
//! ## Supporting Modules
//!
//! | Module     | Responsibility                                         |
//! |------------|--------------------------------------------------------|
//! | `models`   | Rows and payloads: `Ticket`, `TicketStatus`, `Project` |
//! | `composer` | Groups tickets into status columns                     |
//! | `session`  | `AuthState`, `Route` and the route guard               |
//! | `notice`   | Transient user-facing messages                         |
//!
//! ## Typical Flow (drop a ticket on "Done")
//!
//! 1. `DragController::drag_end` sees a different target column and yields
//!    a `DragIntent`.
//! 2. `UpdatePropagator::propagate` updates the row with the actor as
//!    updater, then inserts a notification for the ticket's creator.
//! 3. The store publishes a `ChangeEvent`; every subscribed view and
//!    WebSocket client refetches the project's tickets.

pub mod api;
pub mod composer;
pub mod db;
pub mod drag;
pub mod forms;
pub mod models;
pub mod notice;
pub mod propagator;
pub mod server;
pub mod session;
pub mod store;
pub mod views;
pub mod visibility;
pub mod ws;

#[cfg(test)]
pub(crate) mod testing;
