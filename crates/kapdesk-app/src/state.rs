// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::locale::{Direction, Locale};
use crate::session::{Route, Session, landing_route};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppState {
    pub route: Route,
    pub session: Option<Session>,
    pub locale: Locale,
    pub status_line: Option<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            route: Route::Login,
            session: None,
            locale: Locale::En,
            status_line: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    Navigate(Route),
    NextScreen,
    PrevScreen,
    SignIn(Session),
    ProfileCompleted,
    SignOut,
    ToggleLocale,
    SetStatus(String),
    ClearStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    RouteChanged(Route),
    SignedIn,
    SignedOut,
    LocaleChanged(Locale, Direction),
    StatusUpdated(String),
    StatusCleared,
}

impl AppState {
    pub fn with_session(session: Option<Session>, locale: Locale) -> Self {
        Self {
            route: landing_route(session.as_ref()),
            session,
            locale,
            status_line: None,
        }
    }

    pub fn dispatch(&mut self, command: AppCommand) -> Vec<AppEvent> {
        match command {
            AppCommand::Navigate(route) => self.navigate(route),
            AppCommand::NextScreen => self.rotate_screen(1),
            AppCommand::PrevScreen => self.rotate_screen(-1),
            AppCommand::SignIn(session) => {
                self.route = session.landing_route();
                self.session = Some(session);
                vec![AppEvent::SignedIn, AppEvent::RouteChanged(self.route)]
            }
            AppCommand::ProfileCompleted => {
                let Some(session) = self.session.as_mut() else {
                    return Vec::new();
                };
                session.user.first_login = false;
                self.route = session.landing_route();
                vec![
                    AppEvent::RouteChanged(self.route),
                    self.set_status("profile completed"),
                ]
            }
            AppCommand::SignOut => {
                self.session = None;
                self.route = Route::Login;
                vec![AppEvent::SignedOut, AppEvent::RouteChanged(self.route)]
            }
            AppCommand::ToggleLocale => {
                self.locale = self.locale.other();
                vec![AppEvent::LocaleChanged(
                    self.locale,
                    self.locale.direction(),
                )]
            }
            AppCommand::SetStatus(message) => vec![self.set_status(&message)],
            AppCommand::ClearStatus => {
                self.status_line = None;
                vec![AppEvent::StatusCleared]
            }
        }
    }

    /// Guarded: a route the role cannot open leaves the route as is.
    fn navigate(&mut self, route: Route) -> Vec<AppEvent> {
        let allowed = match &self.session {
            Some(session) => session.can_open(route),
            None => route == Route::Login,
        };
        if !allowed {
            return vec![self.set_status(&format!("{} is not available", route.label()))];
        }
        if route == self.route {
            return Vec::new();
        }
        self.route = route;
        vec![AppEvent::RouteChanged(route)]
    }

    fn rotate_screen(&mut self, delta: isize) -> Vec<AppEvent> {
        let Some(session) = &self.session else {
            return Vec::new();
        };
        if session.user.first_login {
            return Vec::new();
        }
        let screens = crate::session::routes_for(session.role());
        if screens.is_empty() {
            return Vec::new();
        }
        let current = screens
            .iter()
            .position(|route| *route == self.route)
            .unwrap_or(0) as isize;
        let len = screens.len() as isize;
        let next = screens[(current + delta).rem_euclid(len) as usize];
        self.navigate(next)
    }

    fn set_status(&mut self, message: &str) -> AppEvent {
        self.status_line = Some(message.to_owned());
        AppEvent::StatusUpdated(message.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::{AppCommand, AppEvent, AppState};
    use crate::locale::{Direction, Locale};
    use crate::session::{Route, Session};
    use crate::{CompanyId, Role, SessionUser, UserId};

    fn session(role: Role, first_login: bool) -> Session {
        Session::new(SessionUser {
            id: UserId::new(4),
            username: "lina".to_owned(),
            full_name: "Lina".to_owned(),
            role,
            sector_id: None,
            company_id: Some(CompanyId::new(3)),
            first_login,
        })
    }

    #[test]
    fn signed_out_state_lands_on_login() {
        let state = AppState::with_session(None, Locale::En);
        assert_eq!(state.route, Route::Login);
    }

    #[test]
    fn forbidden_navigation_is_refused_with_status() {
        let mut state =
            AppState::with_session(Some(session(Role::CompanyEmployee, false)), Locale::En);
        assert_eq!(state.route, Route::Tickets);

        let events = state.dispatch(AppCommand::Navigate(Route::Sectors));
        assert_eq!(state.route, Route::Tickets);
        assert_eq!(
            events,
            vec![AppEvent::StatusUpdated("Sectors is not available".to_owned())]
        );
    }

    #[test]
    fn screen_rotation_wraps_over_allowed_routes() {
        let mut state =
            AppState::with_session(Some(session(Role::CompanyManager, false)), Locale::En);
        assert_eq!(state.route, Route::CompanyUsers);

        state.dispatch(AppCommand::NextScreen);
        assert_eq!(state.route, Route::Tickets);
        let events = state.dispatch(AppCommand::NextScreen);
        assert_eq!(state.route, Route::CompanyUsers);
        assert_eq!(events, vec![AppEvent::RouteChanged(Route::CompanyUsers)]);
    }

    #[test]
    fn first_login_is_held_on_profile_until_completed() {
        let mut state = AppState::default();
        state.dispatch(AppCommand::SignIn(session(Role::CompanyManager, true)));
        assert_eq!(state.route, Route::CompleteProfile);
        assert!(state.dispatch(AppCommand::NextScreen).is_empty());

        state.dispatch(AppCommand::ProfileCompleted);
        assert_eq!(state.route, Route::CompanyUsers);
    }

    #[test]
    fn sign_out_clears_session() {
        let mut state = AppState::with_session(Some(session(Role::KapAdmin, false)), Locale::En);
        let events = state.dispatch(AppCommand::SignOut);
        assert!(state.session.is_none());
        assert_eq!(state.route, Route::Login);
        assert_eq!(
            events,
            vec![AppEvent::SignedOut, AppEvent::RouteChanged(Route::Login)]
        );
    }

    #[test]
    fn locale_toggle_flips_direction_in_lockstep() {
        let mut state = AppState::default();
        let events = state.dispatch(AppCommand::ToggleLocale);
        assert_eq!(events, vec![AppEvent::LocaleChanged(Locale::Ar, Direction::Rtl)]);
        state.dispatch(AppCommand::ToggleLocale);
        assert_eq!(state.locale, Locale::En);
    }
}
