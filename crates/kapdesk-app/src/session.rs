// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::dispatch::{ApiRequest, DispatchError, Envelope, Method, RequestBody};
use crate::{Role, SessionUser};

pub const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Route {
    Login,
    CompleteProfile,
    Sectors,
    Companies,
    SectorUsers,
    CompanyUsers,
    Tickets,
}

impl Route {
    pub const SCREENS: [Self; 5] = [
        Self::Sectors,
        Self::Companies,
        Self::SectorUsers,
        Self::CompanyUsers,
        Self::Tickets,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Login => "Login",
            Self::CompleteProfile => "Complete Profile",
            Self::Sectors => "Sectors",
            Self::Companies => "Companies",
            Self::SectorUsers => "Sector Users",
            Self::CompanyUsers => "Company Users",
            Self::Tickets => "Tickets",
        }
    }

    pub const fn allowed_roles(self) -> &'static [Role] {
        match self {
            Self::Login => &[],
            Self::CompleteProfile | Self::Tickets => &Role::ALL,
            Self::Sectors => &[Role::KapAdmin],
            Self::Companies | Self::SectorUsers => &[Role::KapAdmin, Role::SectorManager],
            Self::CompanyUsers => &[Role::KapAdmin, Role::CompanyManager],
        }
    }
}

/// The guard used by the router; pure so it can be checked anywhere.
pub fn can_access(role: Role, allowed: &[Role]) -> bool {
    allowed.contains(&role)
}

pub fn routes_for(role: Role) -> Vec<Route> {
    Route::SCREENS
        .into_iter()
        .filter(|route| can_access(role, route.allowed_roles()))
        .collect()
}

/// Explicit auth context handed to the router and screens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user: SessionUser,
}

impl Session {
    pub fn new(user: SessionUser) -> Self {
        Self { user }
    }

    pub fn role(&self) -> Role {
        self.user.role
    }

    pub fn can_open(&self, route: Route) -> bool {
        match route {
            Route::Login => false,
            route => can_access(self.role(), route.allowed_roles()),
        }
    }

    pub fn landing_route(&self) -> Route {
        if self.user.first_login {
            return Route::CompleteProfile;
        }
        routes_for(self.role())
            .into_iter()
            .next()
            .unwrap_or(Route::Tickets)
    }
}

pub fn landing_route(session: Option<&Session>) -> Route {
    session.map_or(Route::Login, Session::landing_route)
}

pub fn login_request(username: &str, password: &str) -> ApiRequest {
    ApiRequest::auth(
        Method::Post,
        "login",
        RequestBody::Json(json!({ "username": username.trim(), "password": password })),
    )
}

pub fn logout_request() -> ApiRequest {
    ApiRequest::auth(Method::Post, "logout", RequestBody::None)
}

#[derive(Debug, Deserialize)]
struct LoginData {
    user: SessionUser,
}

/// The login reply carries the account under `data.user`.
pub fn decode_login(envelope: &Envelope) -> Result<SessionUser, DispatchError> {
    envelope.decode_data::<LoginData>().map(|data| data.user)
}

/// First-login profile completion.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ProfileUpdate {
    pub full_name: String,
    pub email: String,
    pub new_password: String,
}

impl ProfileUpdate {
    pub fn validate(&self) -> Result<()> {
        if self.full_name.trim().is_empty() {
            bail!("Full Name is required");
        }
        if self.email.trim().is_empty() {
            bail!("Email is required");
        }
        if self.new_password.chars().count() < MIN_PASSWORD_LEN {
            bail!("New Password must be at least {MIN_PASSWORD_LEN} characters");
        }
        Ok(())
    }

    pub fn request(&self) -> ApiRequest {
        ApiRequest::auth(
            Method::Put,
            "update-admin",
            RequestBody::Json(json!({
                "full_name": self.full_name.trim(),
                "email": self.email.trim(),
                "password": self.new_password,
            })),
        )
    }
}
