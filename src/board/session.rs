//! Auth state and the route guard shared by the page and view layers.

use std::fmt;

use uuid::Uuid;

use super::models::Profile;

#[derive(Debug, Clone, PartialEq)]
pub enum AuthState {
    Loading,
    SignedOut,
    SignedIn(Profile),
}

impl AuthState {
    pub fn user(&self) -> Option<&Profile> {
        match self {
            Self::SignedIn(profile) => Some(profile),
            _ => None,
        }
    }
}

impl From<Option<Profile>> for AuthState {
    fn from(profile: Option<Profile>) -> Self {
        match profile {
            Some(p) => Self::SignedIn(p),
            None => Self::SignedOut,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Landing,
    Auth,
    Dashboard,
    Project(Uuid),
}

impl Route {
    /// Parse a request path. Unknown paths yield `None`.
    pub fn parse(path: &str) -> Option<Self> {
        let trimmed = path.trim_end_matches('/');
        match trimmed {
            "" => Some(Self::Landing),
            "/auth" => Some(Self::Auth),
            "/dashboard" => Some(Self::Dashboard),
            _ => trimmed
                .strip_prefix("/project/")
                .and_then(|id| Uuid::parse_str(id).ok())
                .map(Self::Project),
        }
    }

    pub fn path(&self) -> String {
        match self {
            Self::Landing => "/".to_string(),
            Self::Auth => "/auth".to_string(),
            Self::Dashboard => "/dashboard".to_string(),
            Self::Project(id) => format!("/project/{}", id),
        }
    }

    pub fn requires_auth(&self) -> bool {
        matches!(self, Self::Dashboard | Self::Project(_))
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Render,
    /// Auth is still resolving; render nothing.
    Wait,
    Redirect(Route),
}

pub fn guard(route: Route, auth: &AuthState) -> Navigation {
    match (auth, route) {
        (AuthState::Loading, _) => Navigation::Wait,
        (AuthState::SignedOut, r) if r.requires_auth() => Navigation::Redirect(Route::Auth),
        (AuthState::SignedIn(_), Route::Landing) => Navigation::Redirect(Route::Dashboard),
        _ => Navigation::Render,
    }
}
