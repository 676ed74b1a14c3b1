// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, bail};
use serde_json::json;

use crate::crud::{ActionForm, Entity};
use crate::dispatch::{ApiRequest, RequestBody};
use crate::forms::{Draft, FieldKind, FieldSpec};
use crate::model::{Role, Ticket, TicketNote, format_timestamp};
use crate::resource::Resource;
use crate::session::Session;
use crate::table::{ActionStyle, CellValue, Column, DELETE_ACTION, RowAction};
use crate::{TicketId, TicketNoteId};

pub const ASSIGN_ACTION: RowAction = RowAction {
    key: "assign",
    label: "Assign",
    icon: "➜",
    style: ActionStyle::Primary,
};

pub const PROGRESS_ACTION: RowAction = RowAction {
    key: "progress",
    label: "Update Progress",
    icon: "◔",
    style: ActionStyle::Primary,
};

pub const TRANSFER_ACTION: RowAction = RowAction {
    key: "transfer",
    label: "Transfer",
    icon: "⇄",
    style: ActionStyle::Secondary,
};

pub const NOTE_ACTION: RowAction = RowAction {
    key: "note",
    label: "Add Note",
    icon: "✎",
    style: ActionStyle::Secondary,
};

/// Opens the note list for one ticket; handled by the caller.
pub const VIEW_NOTES_ACTION: RowAction = RowAction {
    key: "view-notes",
    label: "View Notes",
    icon: "✉",
    style: ActionStyle::Secondary,
};

const PRIORITIES: &[(&str, &str)] = &[
    ("medium", "Medium"),
    ("low", "Low"),
    ("high", "High"),
    ("critical", "Critical"),
];

const TICKET_FIELDS: &[FieldSpec] = &[
    FieldSpec::required("title", "Title", FieldKind::Text),
    FieldSpec::required("description", "Description", FieldKind::Text),
    FieldSpec::required("priority", "Priority", FieldKind::Select(PRIORITIES)),
    FieldSpec::optional("company_id", "Company ID", FieldKind::Number),
    FieldSpec::optional("attachment", "Attachment", FieldKind::File),
];

const ASSIGN_FIELDS: &[FieldSpec] =
    &[FieldSpec::required("assignee_id", "Assignee ID", FieldKind::Number)];

const PROGRESS_FIELDS: &[FieldSpec] = &[
    FieldSpec::required("percentage", "Percentage", FieldKind::Number),
    FieldSpec::optional("comment", "Comment", FieldKind::Text),
];

const TRANSFER_FIELDS: &[FieldSpec] =
    &[FieldSpec::required("company_id", "Company ID", FieldKind::Number)];

const NOTE_FIELDS: &[FieldSpec] = &[FieldSpec::required("note", "Note", FieldKind::Text)];

const ASSIGN_FORM: ActionForm = ActionForm {
    title: "Assign",
    fields: ASSIGN_FIELDS,
    success: "Ticket assigned successfully",
    failure: "Failed to assign ticket",
};

const PROGRESS_FORM: ActionForm = ActionForm {
    title: "Update Progress",
    fields: PROGRESS_FIELDS,
    success: "Progress updated successfully",
    failure: "Failed to update progress",
};

const TRANSFER_FORM: ActionForm = ActionForm {
    title: "Transfer",
    fields: TRANSFER_FIELDS,
    success: "Ticket transferred successfully",
    failure: "Failed to transfer ticket",
};

const NOTE_FORM: ActionForm = ActionForm {
    title: "Add Note",
    fields: NOTE_FIELDS,
    success: "Note added successfully",
    failure: "Failed to add note",
};

fn whole_number(draft: &Draft, key: &str, label: &str) -> Result<i64> {
    match draft.trimmed(key).parse::<i64>() {
        Ok(value) if value > 0 => Ok(value),
        _ => bail!("{label} must be a positive whole number"),
    }
}

/// 0 through 100 inclusive.
pub fn parse_percentage(raw: &str) -> Result<u8> {
    match raw.trim().parse::<u8>() {
        Ok(value) if value <= 100 => Ok(value),
        _ => bail!("Percentage must be between 0 and 100"),
    }
}

impl Entity for Ticket {
    type Id = TicketId;

    fn id(&self) -> TicketId {
        self.id
    }

    fn label(&self) -> String {
        format!("ticket #{} \"{}\"", self.id, self.title)
    }

    fn columns(_resource: Resource) -> Vec<Column<Self>> {
        vec![
            Column::plain("title", "Title", |t: &Ticket| CellValue::text(&t.title)),
            Column::plain("status", "Status", |t: &Ticket| CellValue::Label(t.status.label())),
            Column::plain("priority", "Priority", |t: &Ticket| {
                CellValue::Label(t.priority.label())
            }),
            Column::plain("assignee", "Assignee", |t: &Ticket| {
                CellValue::text(&t.assignee_name)
            }),
            Column::progress("progress", "Progress", |t: &Ticket| {
                CellValue::progress(t.progress)
            }),
            Column::plain("created", "Created", |t: &Ticket| {
                CellValue::text(format_timestamp(t.created_at))
            }),
            Column::action_icon("notes", "Notes", |_: &Ticket| CellValue::Icon {
                icon: VIEW_NOTES_ACTION.icon,
                tooltip: VIEW_NOTES_ACTION.label.to_owned(),
            }),
        ]
    }

    fn row_actions(_resource: Resource) -> Vec<RowAction> {
        vec![
            ASSIGN_ACTION,
            PROGRESS_ACTION,
            TRANSFER_ACTION,
            NOTE_ACTION,
            VIEW_NOTES_ACTION,
            DELETE_ACTION,
        ]
    }

    fn create_fields(_resource: Resource) -> &'static [FieldSpec] {
        TICKET_FIELDS
    }

    fn draft_from(&self, _resource: Resource) -> Draft {
        let draft = Draft::blank(TICKET_FIELDS)
            .with("title", &self.title)
            .with("description", &self.description)
            .with("priority", self.priority.as_str());
        match self.company_id {
            Some(company) => draft.with("company_id", company.to_string()),
            None => draft,
        }
    }

    fn action_form(_resource: Resource, key: &str) -> Option<ActionForm> {
        match key {
            "assign" => Some(ASSIGN_FORM),
            "progress" => Some(PROGRESS_FORM),
            "transfer" => Some(TRANSFER_FORM),
            "note" => Some(NOTE_FORM),
            _ => None,
        }
    }

    fn action_draft(&self, _resource: Resource, key: &str, fields: &[FieldSpec]) -> Draft {
        let draft = Draft::blank(fields);
        match (key, self.assignee_id) {
            ("progress", _) => draft.with("percentage", self.progress.to_string()),
            ("assign", Some(assignee)) => draft.with("assignee_id", assignee.to_string()),
            _ => draft,
        }
    }

    fn action_request(
        _resource: Resource,
        key: &str,
        id: TicketId,
        draft: &Draft,
    ) -> Result<ApiRequest> {
        let endpoint = Resource::Tickets.endpoint();
        match key {
            "assign" => {
                let assignee_id = whole_number(draft, "assignee_id", "Assignee ID")?;
                Ok(ApiRequest::patch(
                    &format!("{endpoint}/assign"),
                    id,
                    json!({ "assignee_id": assignee_id }),
                ))
            }
            "progress" => {
                let percentage = parse_percentage(draft.get("percentage"))?;
                Ok(ApiRequest::patch(
                    &format!("{endpoint}/progress"),
                    id,
                    json!({ "percentage": percentage, "comment": draft.trimmed("comment") }),
                ))
            }
            "transfer" => {
                let company_id = whole_number(draft, "company_id", "Company ID")?;
                Ok(ApiRequest::patch(
                    &format!("{endpoint}/transfer"),
                    id,
                    json!({ "company_id": company_id }),
                ))
            }
            "note" => Ok(ApiRequest::create(
                Resource::TicketNotes.endpoint(),
                RequestBody::Json(json!({ "ticket_id": id, "note": draft.trimmed("note") })),
            )),
            other => bail!("unknown ticket action {other:?}"),
        }
    }
}

impl Entity for TicketNote {
    type Id = TicketNoteId;

    fn id(&self) -> TicketNoteId {
        self.id
    }

    fn label(&self) -> String {
        format!("note #{}", self.id)
    }

    fn columns(_resource: Resource) -> Vec<Column<Self>> {
        vec![
            Column::plain("note", "Note", |n: &TicketNote| CellValue::text(&n.note)),
            Column::plain("author", "Author", |n: &TicketNote| {
                CellValue::text(&n.author_name)
            }),
            Column::plain("created", "Created", |n: &TicketNote| {
                CellValue::text(format_timestamp(n.created_at))
            }),
        ]
    }

    fn row_actions(_resource: Resource) -> Vec<RowAction> {
        vec![DELETE_ACTION]
    }

    // Notes are added from the ticket row, which knows the ticket id.
    fn can_create(_resource: Resource) -> bool {
        false
    }

    fn create_fields(_resource: Resource) -> &'static [FieldSpec] {
        NOTE_FIELDS
    }

    fn draft_from(&self, _resource: Resource) -> Draft {
        Draft::blank(NOTE_FIELDS).with("note", &self.note)
    }
}

/// KAP admins see every ticket, managers their organization, employees
/// what is assigned to them.
pub fn ticket_scope_query(session: &Session) -> Vec<(String, String)> {
    let user = &session.user;
    let pair = |key: &str, value: String| vec![(key.to_owned(), value)];
    match user.role {
        Role::KapAdmin => Vec::new(),
        Role::SectorManager => user
            .sector_id
            .map(|id| pair("sector_id", id.to_string()))
            .unwrap_or_default(),
        Role::CompanyManager => user
            .company_id
            .map(|id| pair("company_id", id.to_string()))
            .unwrap_or_default(),
        Role::SectorEmployee | Role::CompanyEmployee => pair("assignee_id", user.id.to_string()),
    }
}

/// Query scoping the note list to one ticket.
pub fn notes_query(ticket: TicketId) -> Vec<(String, String)> {
    vec![("ticket_id".to_owned(), ticket.to_string())]
}
