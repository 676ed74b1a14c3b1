// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Organization screens: sectors, companies and the two user directories.

use crate::crud::Entity;
use crate::forms::{Draft, FieldKind, FieldSpec};
use crate::model::{Company, Role, Sector, User, format_timestamp};
use crate::resource::Resource;
use crate::session::Session;
use crate::table::{CellValue, Column};
use crate::ticket::ticket_scope_query;
use crate::{CompanyId, SectorId, UserId};

const SECTOR_FIELDS: &[FieldSpec] = &[
    FieldSpec::required("name", "Name", FieldKind::Text),
    FieldSpec::required("code", "Code", FieldKind::Text),
    FieldSpec::required("email", "Email", FieldKind::Email),
    FieldSpec::optional("phone", "Phone", FieldKind::Text),
    FieldSpec::optional("logo", "Logo", FieldKind::File),
];

const COMPANY_FIELDS: &[FieldSpec] = &[
    FieldSpec::required("name", "Name", FieldKind::Text),
    FieldSpec::required("registration_number", "Registration Number", FieldKind::Text),
    FieldSpec::required("sector_id", "Sector ID", FieldKind::Number),
    FieldSpec::required("email", "Email", FieldKind::Email),
    FieldSpec::optional("phone", "Phone", FieldKind::Text),
    FieldSpec::optional("logo", "Logo", FieldKind::File),
];

const SECTOR_ROLES: &[(&str, &str)] = &[
    ("sector_employee", "Sector Employee"),
    ("sector_manager", "Sector Manager"),
];

const COMPANY_ROLES: &[(&str, &str)] = &[
    ("company_employee", "Company Employee"),
    ("company_manager", "Company Manager"),
];

const SECTOR_USER_CREATE: &[FieldSpec] = &[
    FieldSpec::required("username", "Username", FieldKind::Text),
    FieldSpec::required("full_name", "Full Name", FieldKind::Text),
    FieldSpec::required("email", "Email", FieldKind::Email),
    FieldSpec::optional("phone", "Phone", FieldKind::Text),
    FieldSpec::required("password", "Password", FieldKind::Password),
    FieldSpec::required("role", "Role", FieldKind::Select(SECTOR_ROLES)),
    FieldSpec::required("sector_id", "Sector ID", FieldKind::Number),
    FieldSpec::optional("avatar", "Avatar", FieldKind::File),
];

const SECTOR_USER_EDIT: &[FieldSpec] = &[
    FieldSpec::required("username", "Username", FieldKind::Text),
    FieldSpec::required("full_name", "Full Name", FieldKind::Text),
    FieldSpec::required("email", "Email", FieldKind::Email),
    FieldSpec::optional("phone", "Phone", FieldKind::Text),
    FieldSpec::required("role", "Role", FieldKind::Select(SECTOR_ROLES)),
    FieldSpec::required("sector_id", "Sector ID", FieldKind::Number),
    FieldSpec::optional("avatar", "Avatar", FieldKind::File),
];

const COMPANY_USER_CREATE: &[FieldSpec] = &[
    FieldSpec::required("username", "Username", FieldKind::Text),
    FieldSpec::required("full_name", "Full Name", FieldKind::Text),
    FieldSpec::required("email", "Email", FieldKind::Email),
    FieldSpec::optional("phone", "Phone", FieldKind::Text),
    FieldSpec::required("password", "Password", FieldKind::Password),
    FieldSpec::required("role", "Role", FieldKind::Select(COMPANY_ROLES)),
    FieldSpec::required("company_id", "Company ID", FieldKind::Number),
    FieldSpec::optional("avatar", "Avatar", FieldKind::File),
];

const COMPANY_USER_EDIT: &[FieldSpec] = &[
    FieldSpec::required("username", "Username", FieldKind::Text),
    FieldSpec::required("full_name", "Full Name", FieldKind::Text),
    FieldSpec::required("email", "Email", FieldKind::Email),
    FieldSpec::optional("phone", "Phone", FieldKind::Text),
    FieldSpec::required("role", "Role", FieldKind::Select(COMPANY_ROLES)),
    FieldSpec::required("company_id", "Company ID", FieldKind::Number),
    FieldSpec::optional("avatar", "Avatar", FieldKind::File),
];

fn optional_id(value: Option<impl ToString>) -> String {
    value.map(|id| id.to_string()).unwrap_or_default()
}

impl Entity for Sector {
    type Id = SectorId;

    fn id(&self) -> SectorId {
        self.id
    }

    fn label(&self) -> String {
        self.name.clone()
    }

    fn columns(_resource: Resource) -> Vec<Column<Self>> {
        vec![
            Column::image("logo", "Logo", |s: &Sector| CellValue::Image(s.logo_url.clone())),
            Column::plain("name", "Name", |s: &Sector| CellValue::text(&s.name)),
            Column::plain("code", "Code", |s: &Sector| CellValue::text(&s.code)),
            Column::plain("email", "Email", |s: &Sector| CellValue::text(&s.email)),
            Column::plain("phone", "Phone", |s: &Sector| CellValue::text(&s.phone)),
            Column::plain("created", "Created", |s: &Sector| {
                CellValue::text(format_timestamp(s.created_at))
            }),
        ]
    }

    fn create_fields(_resource: Resource) -> &'static [FieldSpec] {
        SECTOR_FIELDS
    }

    fn draft_from(&self, _resource: Resource) -> Draft {
        Draft::blank(SECTOR_FIELDS)
            .with("name", &self.name)
            .with("code", &self.code)
            .with("email", &self.email)
            .with("phone", &self.phone)
    }
}

impl Entity for Company {
    type Id = CompanyId;

    fn id(&self) -> CompanyId {
        self.id
    }

    fn label(&self) -> String {
        self.name.clone()
    }

    fn columns(_resource: Resource) -> Vec<Column<Self>> {
        vec![
            Column::image("logo", "Logo", |c: &Company| CellValue::Image(c.logo_url.clone())),
            Column::plain("name", "Name", |c: &Company| CellValue::text(&c.name)),
            Column::plain("registration_number", "Registration Number", |c: &Company| {
                CellValue::text(&c.registration_number)
            }),
            Column::plain("sector", "Sector", |c: &Company| {
                CellValue::text(optional_id(c.sector_id))
            }),
            Column::plain("email", "Email", |c: &Company| CellValue::text(&c.email)),
            Column::plain("phone", "Phone", |c: &Company| CellValue::text(&c.phone)),
        ]
    }

    fn create_fields(_resource: Resource) -> &'static [FieldSpec] {
        COMPANY_FIELDS
    }

    fn draft_from(&self, _resource: Resource) -> Draft {
        Draft::blank(COMPANY_FIELDS)
            .with("name", &self.name)
            .with("registration_number", &self.registration_number)
            .with("sector_id", optional_id(self.sector_id))
            .with("email", &self.email)
            .with("phone", &self.phone)
    }
}

impl Entity for User {
    type Id = UserId;

    fn id(&self) -> UserId {
        self.id
    }

    fn label(&self) -> String {
        if self.full_name.trim().is_empty() {
            self.username.clone()
        } else {
            self.full_name.clone()
        }
    }

    fn columns(resource: Resource) -> Vec<Column<Self>> {
        let organization = match resource {
            Resource::CompanyUsers => Column::plain("company", "Company", |u: &User| {
                CellValue::text(optional_id(u.company_id))
            }),
            _ => Column::plain("sector", "Sector", |u: &User| {
                CellValue::text(optional_id(u.sector_id))
            }),
        };
        vec![
            Column::image("avatar", "Avatar", |u: &User| CellValue::Image(u.avatar_url.clone())),
            Column::plain("username", "Username", |u: &User| CellValue::text(&u.username)),
            Column::plain("full_name", "Full Name", |u: &User| CellValue::text(&u.full_name)),
            Column::plain("email", "Email", |u: &User| CellValue::text(&u.email)),
            Column::plain("role", "Role", |u: &User| CellValue::Label(u.role.label())),
            organization,
        ]
    }

    fn create_fields(resource: Resource) -> &'static [FieldSpec] {
        match resource {
            Resource::CompanyUsers => COMPANY_USER_CREATE,
            _ => SECTOR_USER_CREATE,
        }
    }

    fn edit_fields(resource: Resource) -> &'static [FieldSpec] {
        match resource {
            Resource::CompanyUsers => COMPANY_USER_EDIT,
            _ => SECTOR_USER_EDIT,
        }
    }

    fn draft_from(&self, resource: Resource) -> Draft {
        let draft = Draft::blank(Self::edit_fields(resource))
            .with("username", &self.username)
            .with("full_name", &self.full_name)
            .with("email", &self.email)
            .with("phone", &self.phone)
            .with("role", self.role.as_str());
        match resource {
            Resource::CompanyUsers => draft.with("company_id", optional_id(self.company_id)),
            _ => draft.with("sector_id", optional_id(self.sector_id)),
        }
    }
}

/// Query parameters that narrow a list to what the signed-in role may see.
pub fn list_scope(resource: Resource, session: &Session) -> Vec<(String, String)> {
    let user = &session.user;
    let scoped = |key: &str, id: Option<String>| {
        id.map(|id| vec![(key.to_owned(), id)]).unwrap_or_default()
    };
    match (resource, user.role) {
        (Resource::Tickets, _) => ticket_scope_query(session),
        (_, Role::KapAdmin) => Vec::new(),
        (Resource::Companies | Resource::SectorUsers, Role::SectorManager) => {
            scoped("sector_id", user.sector_id.map(|id| id.to_string()))
        }
        (Resource::CompanyUsers, Role::CompanyManager) => {
            scoped("company_id", user.company_id.map(|id| id.to_string()))
        }
        _ => Vec::new(),
    }
}
