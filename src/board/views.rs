//! Dashboard and project board view models.
//!
//! Each view owns its collection, replaces it wholesale on every fetch and
//! holds a change subscription for as long as it is mounted. Failures are
//! queued as notices; the previous collection stays in place.

use std::sync::Arc;

use uuid::Uuid;

use super::composer;
use super::drag::DragController;
use super::forms::{self, ProjectForm, TicketForm};
use super::models::*;
use super::notice::Notice;
use super::propagator::{Propagation, UpdatePropagator};
use super::session::{AuthState, Navigation, Route, guard};
use super::store::{ChangeFilter, ChangeSubscription, RemoteStore, Table};
use super::visibility::{ProjectCardView, SuperUserMode, TicketCardView, ToggleOutcome};
use crate::errors::TaskflowError;

/// Drain pending change signals; true when at least one arrived.
fn drain(subscription: &mut Option<ChangeSubscription>) -> bool {
    let Some(sub) = subscription.as_mut() else {
        return false;
    };
    let mut changed = false;
    while sub.try_next().is_some() {
        changed = true;
    }
    changed
}

fn actor(auth: &AuthState) -> Result<Profile, TaskflowError> {
    auth.user().cloned().ok_or(TaskflowError::Unauthenticated)
}

pub struct DashboardView {
    store: Arc<dyn RemoteStore>,
    auth: AuthState,
    loading: bool,
    projects: Vec<Project>,
    notices: Vec<Notice>,
    subscription: Option<ChangeSubscription>,
    pub form: ProjectForm,
    pub super_user: SuperUserMode,
}

impl DashboardView {
    pub fn new(store: Arc<dyn RemoteStore>, auth: AuthState, super_user: SuperUserMode) -> Self {
        Self {
            store,
            auth,
            loading: true,
            projects: Vec::new(),
            notices: Vec::new(),
            subscription: None,
            form: ProjectForm::new(),
            super_user,
        }
    }

    /// Guard, then fetch and subscribe when the page may render.
    pub async fn mount(&mut self) -> Navigation {
        let nav = guard(Route::Dashboard, &self.auth);
        if nav == Navigation::Render {
            self.subscription = Some(self.store.subscribe(ChangeFilter::table(Table::Projects)));
            self.refresh().await;
        }
        nav
    }

    pub fn unmount(&mut self) {
        self.subscription = None;
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_some()
    }

    pub async fn refresh(&mut self) {
        match self.store.list_projects().await {
            Ok(projects) => self.projects = projects,
            Err(e) => self.notices.push(Notice::error(e)),
        }
        self.loading = false;
    }

    /// Refetch if any project change arrived since the last call.
    pub async fn sync(&mut self) -> bool {
        let changed = drain(&mut self.subscription);
        if changed {
            self.refresh().await;
        }
        changed
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    pub fn cards(&self) -> Vec<ProjectCardView> {
        let reveal = self.super_user.is_enabled();
        self.projects
            .iter()
            .map(|p| ProjectCardView::render(p, reveal))
            .collect()
    }

    pub async fn create_project(&mut self) -> Option<Project> {
        let result = match actor(&self.auth) {
            Ok(user) => self.form.submit(self.store.as_ref(), &user).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(project) => {
                self.notices.push(forms::project_created_notice());
                self.refresh().await;
                Some(project)
            }
            Err(e) => {
                self.notices.push(Notice::error(e));
                None
            }
        }
    }

    pub async fn notifications(&mut self) -> Vec<Notification> {
        let user = match actor(&self.auth) {
            Ok(user) => user,
            Err(e) => {
                self.notices.push(Notice::error(e));
                return Vec::new();
            }
        };
        match self.store.list_notifications(user.id).await {
            Ok(list) => list,
            Err(e) => {
                self.notices.push(Notice::error(e));
                Vec::new()
            }
        }
    }

    pub fn toggle_super_user(&mut self) -> ToggleOutcome {
        let (outcome, notice) = self.super_user.toggle();
        self.notices.extend(notice);
        outcome
    }

    pub fn submit_secret(&mut self, candidate: &str) {
        let notice = self.super_user.submit_secret(candidate);
        self.notices.push(notice);
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }
}

pub struct ProjectBoardView {
    store: Arc<dyn RemoteStore>,
    propagator: UpdatePropagator,
    auth: AuthState,
    project_id: Uuid,
    project: Option<Project>,
    tickets: Vec<Ticket>,
    loading: bool,
    drag: DragController,
    notices: Vec<Notice>,
    subscription: Option<ChangeSubscription>,
    pub form: TicketForm,
    pub super_user: SuperUserMode,
}

impl ProjectBoardView {
    pub fn new(
        store: Arc<dyn RemoteStore>,
        auth: AuthState,
        project_id: Uuid,
        super_user: SuperUserMode,
    ) -> Self {
        Self {
            propagator: UpdatePropagator::new(store.clone()),
            store,
            auth,
            project_id,
            project: None,
            tickets: Vec::new(),
            loading: true,
            drag: DragController::new(),
            notices: Vec::new(),
            subscription: None,
            form: TicketForm::new(project_id),
            super_user,
        }
    }

    pub async fn mount(&mut self) -> Navigation {
        let nav = guard(Route::Project(self.project_id), &self.auth);
        if nav == Navigation::Render {
            self.subscription = Some(
                self.store
                    .subscribe(ChangeFilter::table(Table::Tickets).in_project(self.project_id)),
            );
            self.fetch_project().await;
            self.refresh().await;
        }
        nav
    }

    pub fn unmount(&mut self) {
        self.subscription = None;
        self.drag.cancel();
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_some()
    }

    async fn fetch_project(&mut self) {
        match self.store.get_project(self.project_id).await {
            Ok(Some(project)) => self.project = Some(project),
            Ok(None) => self.notices.push(Notice::error(TaskflowError::ProjectNotFound {
                id: self.project_id,
            })),
            Err(e) => self.notices.push(Notice::error(e)),
        }
    }

    pub async fn refresh(&mut self) {
        match self.store.list_tickets(self.project_id).await {
            Ok(tickets) => self.tickets = tickets,
            Err(e) => self.notices.push(Notice::error(e)),
        }
        self.loading = false;
    }

    /// Refetch if any ticket change for this project arrived.
    pub async fn sync(&mut self) -> bool {
        let changed = drain(&mut self.subscription);
        if changed {
            self.refresh().await;
        }
        changed
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn project(&self) -> Option<&Project> {
        self.project.as_ref()
    }

    pub fn tickets(&self) -> &[Ticket] {
        &self.tickets
    }

    pub fn columns(&self) -> Vec<ColumnView> {
        composer::compose(&self.tickets)
    }

    /// Card views per column, identity fields gated by super user mode.
    pub fn card_columns(&self) -> Vec<(TicketStatus, Vec<TicketCardView>)> {
        let reveal = self.super_user.is_enabled();
        self.columns()
            .into_iter()
            .map(|col| {
                let cards = col
                    .tickets
                    .iter()
                    .map(|t| TicketCardView::render(t, reveal))
                    .collect();
                (col.status, cards)
            })
            .collect()
    }

    pub fn drag_start(&mut self, ticket_id: Uuid) -> bool {
        self.drag.drag_start(ticket_id, &self.tickets)
    }

    pub fn drag_cancel(&mut self) {
        self.drag.cancel();
    }

    /// Finish a drag over `over`. Returns the propagation when an update
    /// was issued and succeeded.
    pub async fn drag_end(&mut self, over: Option<&str>) -> Option<Propagation> {
        let intent = self.drag.drag_end(over, &self.tickets)?;
        let user = match actor(&self.auth) {
            Ok(user) => user,
            Err(e) => {
                self.notices.push(Notice::error(e));
                return None;
            }
        };
        let result = self
            .propagator
            .propagate(&user, intent.ticket_id, intent.patch(), &self.tickets)
            .await;
        match result {
            Ok(outcome) => {
                if let Some(tickets) = &outcome.tickets {
                    self.tickets = tickets.clone();
                }
                if let Some(err) = &outcome.refetch_error {
                    self.notices.push(Notice::error(err));
                }
                Some(outcome)
            }
            Err(e) => {
                self.notices.push(Notice::error(e));
                None
            }
        }
    }

    pub async fn create_ticket(&mut self) -> Option<Ticket> {
        let result = match actor(&self.auth) {
            Ok(user) => self.form.submit(self.store.as_ref(), &user).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(ticket) => {
                self.notices.push(forms::ticket_created_notice());
                self.refresh().await;
                Some(ticket)
            }
            Err(e) => {
                self.notices.push(Notice::error(e));
                None
            }
        }
    }

    pub fn toggle_super_user(&mut self) -> ToggleOutcome {
        let (outcome, notice) = self.super_user.toggle();
        self.notices.extend(notice);
        outcome
    }

    pub fn submit_secret(&mut self, candidate: &str) {
        let notice = self.super_user.submit_secret(candidate);
        self.notices.push(notice);
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }
}
