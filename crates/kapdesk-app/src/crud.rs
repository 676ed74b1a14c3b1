// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! One controller type drives every resource screen.
//!
//! [`CrudController`] binds a [`Resource`] to a [`TableState`] and mediates
//! create, edit, custom row actions and deletes through modal forms and a
//! confirmation dialog. Every write ends the same way regardless of outcome:
//! loading cleared, modal and confirm intent dropped, and exactly one
//! re-fetch to reconcile with the server.

use anyhow::{Result, bail};
use serde::de::DeserializeOwned;
use std::fmt::{Debug, Display};
use std::hash::Hash;
use tracing::{debug, info, warn};

use crate::dispatch::{ApiRequest, DispatchError, Dispatcher, RequestBody, UNABLE_TO_CONNECT};
use crate::forms::{Draft, FieldSpec, FormState, has_file_value};
use crate::notify::{ConfirmChoice, ConfirmDialog, ConfirmIntent, ToastKind, ToastSlot};
use crate::resource::{CacheKey, Resource, ResourceCache};
use crate::table::{
    BULK_DELETE_ACTION, BulkAction, Column, DEFAULT_PAGE_SIZE, DELETE_ACTION, EDIT_ACTION, Row,
    RowAction, TableState, TableView,
};

pub const EMPTY_SELECTION_MESSAGE: &str = "Please select at least one item";

/// A custom row workflow that collects input in a modal before one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionForm {
    pub title: &'static str,
    pub fields: &'static [FieldSpec],
    pub success: &'static str,
    pub failure: &'static str,
}

/// A backend record shown on a resource screen.
///
/// The same type may back several resources (users are listed per sector and
/// per company), so the resource is passed to everything that varies by it.
pub trait Entity: DeserializeOwned + Clone + Send + Sync + 'static {
    type Id: Copy + Ord + Hash + Display + Debug + Send + Sync + 'static;

    fn id(&self) -> Self::Id;

    /// Text used in confirmation prompts, for example the record's name.
    fn label(&self) -> String;

    fn columns(resource: Resource) -> Vec<Column<Self>>;

    fn row_actions(_resource: Resource) -> Vec<RowAction> {
        vec![EDIT_ACTION, DELETE_ACTION]
    }

    fn bulk_actions(_resource: Resource) -> Vec<BulkAction> {
        vec![BULK_DELETE_ACTION]
    }

    fn can_create(_resource: Resource) -> bool {
        true
    }

    fn create_fields(resource: Resource) -> &'static [FieldSpec];

    fn edit_fields(resource: Resource) -> &'static [FieldSpec] {
        Self::create_fields(resource)
    }

    /// Edit-form values pre-filled from the cached record.
    fn draft_from(&self, resource: Resource) -> Draft;

    /// POST to the resource endpoint; multipart when a file was chosen.
    fn create_request(resource: Resource, draft: &Draft) -> Result<ApiRequest> {
        let fields = Self::create_fields(resource);
        let body = if has_file_value(draft, fields) {
            RequestBody::Multipart(draft.to_multipart(fields)?)
        } else {
            RequestBody::Json(draft.to_json(fields))
        };
        Ok(ApiRequest::create(resource.endpoint(), body))
    }

    /// PATCH with JSON, or the multipart PUT path when a file was chosen.
    fn update_request(resource: Resource, id: Self::Id, draft: &Draft) -> Result<ApiRequest> {
        let fields = Self::edit_fields(resource);
        if has_file_value(draft, fields) {
            return Ok(ApiRequest::put(
                resource.endpoint(),
                id,
                draft.to_multipart(fields)?,
            ));
        }
        Ok(ApiRequest::patch(
            resource.endpoint(),
            id,
            draft.to_json(fields),
        ))
    }

    fn action_form(_resource: Resource, _key: &str) -> Option<ActionForm> {
        None
    }

    fn action_draft(&self, _resource: Resource, _key: &str, fields: &[FieldSpec]) -> Draft {
        Draft::blank(fields)
    }

    fn action_request(
        _resource: Resource,
        key: &str,
        _id: Self::Id,
        _draft: &Draft,
    ) -> Result<ApiRequest> {
        bail!("unknown action {key:?}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrudOptions {
    pub page_size: usize,
    /// Keep the modal and draft open when a write fails so the user can
    /// correct and resubmit.
    pub keep_modal_on_failure: bool,
    /// Sent with every list request, for example a role-derived scope.
    pub list_query: Vec<(String, String)>,
}

impl Default for CrudOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            keep_modal_on_failure: false,
            list_query: Vec::new(),
        }
    }
}

impl CrudOptions {
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.list_query.push((key.into(), value.into()));
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UiState {
    pub is_loading: bool,
    pub toast: ToastSlot,
    pub is_modal_open: bool,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormIntent<Id> {
    Create,
    Edit(Id),
    Action { key: &'static str, id: Id },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModalKind {
    Create,
    Edit,
    Action,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Loaded,
    Loading,
    ModalOpen(ModalKind),
    ConfirmPending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrudEvent {
    LoadingStarted,
    LoadingFinished,
    Fetched { count: usize },
    FetchFailed,
    ModalOpened(ModalKind),
    ModalClosed,
    ValidationFailed(String),
    ConfirmRequested,
    ConfirmCleared,
    RequestsIssued(usize),
    ToastShown { kind: ToastKind, token: u64 },
    /// A row action the controller does not own, for the caller to route.
    Delegated { action: &'static str, id: String },
}

/// Borrowed view of the open modal, free of the entity's id type.
#[derive(Debug, Clone, Copy)]
pub struct FormView<'a> {
    pub title: &'a str,
    pub fields: &'static [FieldSpec],
    pub draft: &'a Draft,
    pub focus: usize,
    pub error: Option<&'a str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormInput {
    Char(char),
    Backspace,
    NextField,
    PrevField,
    CycleOption(isize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableInput {
    CursorUp,
    CursorDown,
    NextPage,
    PrevPage,
    ToggleRow,
    ToggleAll,
}

type FormSlot<Id> = FormState<FormIntent<Id>>;

pub struct CrudController<E: Entity> {
    resource: Resource,
    options: CrudOptions,
    columns: Vec<Column<E>>,
    table: TableState<E::Id>,
    ui: UiState,
    form: Option<FormSlot<E::Id>>,
    confirm: Option<ConfirmDialog<ConfirmIntent<E::Id>>>,
}

impl<E: Entity> CrudController<E> {
    pub fn new(resource: Resource, options: CrudOptions) -> Self {
        let columns = E::columns(resource);
        let table = TableState::new(
            resource.label(),
            columns.iter().map(Column::descriptor).collect(),
            options.page_size,
        )
        .with_row_actions(E::row_actions(resource))
        .with_bulk_actions(E::bulk_actions(resource));
        Self {
            resource,
            options,
            columns,
            table,
            ui: UiState::default(),
            form: None,
            confirm: None,
        }
    }

    pub fn resource(&self) -> Resource {
        self.resource
    }

    pub fn options(&self) -> &CrudOptions {
        &self.options
    }

    pub fn table(&self) -> &TableState<E::Id> {
        &self.table
    }

    pub fn table_mut(&mut self) -> &mut TableState<E::Id> {
        &mut self.table
    }

    pub fn ui(&self) -> &UiState {
        &self.ui
    }

    pub fn form(&self) -> Option<&FormSlot<E::Id>> {
        self.form.as_ref()
    }

    pub fn form_mut(&mut self) -> Option<&mut FormSlot<E::Id>> {
        self.form.as_mut()
    }

    pub fn confirm_dialog(&self) -> Option<&ConfirmDialog<ConfirmIntent<E::Id>>> {
        self.confirm.as_ref()
    }

    pub fn phase(&self) -> Phase {
        if self.ui.is_loading {
            return Phase::Loading;
        }
        if self.confirm.is_some() {
            return Phase::ConfirmPending;
        }
        match self.form.as_ref().map(|form| form.intent) {
            Some(FormIntent::Create) => Phase::ModalOpen(ModalKind::Create),
            Some(FormIntent::Edit(_)) => Phase::ModalOpen(ModalKind::Edit),
            Some(FormIntent::Action { .. }) => Phase::ModalOpen(ModalKind::Action),
            None => Phase::Loaded,
        }
    }

    pub fn entity<'c>(&self, cache: &'c ResourceCache, id: E::Id) -> Option<&'c E> {
        cache
            .slice::<E>(self.cache_key())
            .iter()
            .find(|entity| entity.id() == id)
    }

    /// Fresh UI state, then one fetch.
    pub fn mount(
        &mut self,
        dispatcher: &dyn Dispatcher,
        cache: &mut ResourceCache,
    ) -> Vec<CrudEvent> {
        info!(resource = self.resource.endpoint(), "mount");
        self.ui = UiState::default();
        self.form = None;
        self.confirm = None;
        self.rebuild_rows(cache);
        self.with_loading(|this, events| this.fetch(dispatcher, cache, events))
    }

    pub fn refresh(
        &mut self,
        dispatcher: &dyn Dispatcher,
        cache: &mut ResourceCache,
    ) -> Vec<CrudEvent> {
        self.with_loading(|this, events| this.fetch(dispatcher, cache, events))
    }

    /// Re-projects rows from the cache without a fetch, for when another
    /// screen refreshed the same slice.
    pub fn rebuild_rows(&mut self, cache: &ResourceCache) {
        let rows = cache
            .slice::<E>(self.cache_key())
            .iter()
            .map(|entity| Row::project(entity.id(), entity, &self.columns))
            .collect();
        self.table.replace_rows(rows);
    }

    pub fn open_create(&mut self) -> Vec<CrudEvent> {
        if !E::can_create(self.resource) {
            return Vec::new();
        }
        let fields = E::create_fields(self.resource);
        let title = format!("Add {}", title_case(self.resource.singular()));
        self.open_form(FormState::new(
            title,
            FormIntent::Create,
            fields,
            Draft::blank(fields),
        ))
    }

    pub fn open_edit(&mut self, cache: &ResourceCache, id: E::Id) -> Vec<CrudEvent> {
        let Some(entity) = self.entity(cache, id) else {
            return Vec::new();
        };
        let fields = E::edit_fields(self.resource);
        let title = format!("Edit {}", title_case(self.resource.singular()));
        let draft = entity.draft_from(self.resource);
        self.open_form(FormState::new(title, FormIntent::Edit(id), fields, draft))
    }

    pub fn open_action(&mut self, cache: &ResourceCache, key: &str, id: E::Id) -> Vec<CrudEvent> {
        let Some(action) = E::action_form(self.resource, key) else {
            return Vec::new();
        };
        let Some(key) = self
            .table
            .row_actions()
            .iter()
            .find(|row_action| row_action.key == key)
            .map(|row_action| row_action.key)
        else {
            return Vec::new();
        };
        let draft = self
            .entity(cache, id)
            .map(|entity| entity.action_draft(self.resource, key, action.fields))
            .unwrap_or_else(|| Draft::blank(action.fields));
        self.open_form(FormState::new(
            action.title,
            FormIntent::Action { key, id },
            action.fields,
            draft,
        ))
    }

    fn open_form(&mut self, form: FormSlot<E::Id>) -> Vec<CrudEvent> {
        let kind = match form.intent {
            FormIntent::Create => ModalKind::Create,
            FormIntent::Edit(_) => ModalKind::Edit,
            FormIntent::Action { .. } => ModalKind::Action,
        };
        self.form = Some(form);
        self.ui.is_modal_open = true;
        self.ui.error_message = None;
        vec![CrudEvent::ModalOpened(kind)]
    }

    /// Routes a row action by key: edit and delete are built in, keys with a
    /// form open it, anything else is handed back to the caller.
    pub fn invoke_row(&mut self, cache: &ResourceCache, key: &str, id: E::Id) -> Vec<CrudEvent> {
        let Some(invocation) = self.table.invoke_row_action(key, id) else {
            return Vec::new();
        };
        match invocation.action {
            "edit" => self.open_edit(cache, id),
            "delete" => self.request_delete(cache, id),
            action if E::action_form(self.resource, action).is_some() => {
                self.open_action(cache, action, id)
            }
            action => vec![CrudEvent::Delegated {
                action,
                id: id.to_string(),
            }],
        }
    }

    pub fn set_field(&mut self, key: &'static str, value: impl Into<String>) {
        if let Some(form) = self.form.as_mut() {
            form.draft.set(key, value);
        }
    }

    pub fn form_input(&mut self, input: FormInput) {
        let Some(form) = self.form.as_mut() else {
            return;
        };
        match input {
            FormInput::Char(ch) => form.type_char(ch),
            FormInput::Backspace => form.backspace(),
            FormInput::NextField => form.move_focus(1),
            FormInput::PrevField => form.move_focus(-1),
            FormInput::CycleOption(delta) => form.cycle_option(delta),
        }
    }

    pub fn cancel_modal(&mut self) -> Vec<CrudEvent> {
        if self.form.take().is_none() {
            return Vec::new();
        }
        self.ui.is_modal_open = false;
        self.ui.error_message = None;
        vec![CrudEvent::ModalClosed]
    }

    pub fn submit(
        &mut self,
        dispatcher: &dyn Dispatcher,
        cache: &mut ResourceCache,
    ) -> Vec<CrudEvent> {
        let Some(form) = self.form.as_ref() else {
            return Vec::new();
        };
        let intent = form.intent;
        let built = form
            .draft
            .validate(form.fields)
            .and_then(|()| self.build_request(intent, &form.draft));
        let request = match built {
            Ok(request) => request,
            Err(error) => {
                let message = format!("{error:#}");
                if let Some(form) = self.form.as_mut() {
                    form.error = Some(message.clone());
                }
                self.ui.error_message = Some(message.clone());
                return vec![CrudEvent::ValidationFailed(message)];
            }
        };
        let (success, failure) = self.outcome_messages(intent);

        self.with_loading(|this, events| {
            debug!(
                method = request.method.as_str(),
                path = %request.path,
                "submit"
            );
            events.push(CrudEvent::RequestsIssued(1));
            let failed = match dispatcher.dispatch(&request) {
                Ok(_) => {
                    this.show_toast(ToastKind::Success, success, events);
                    None
                }
                Err(error) => {
                    warn!(path = %request.path, %error, "write failed");
                    let message = failure_message(&error, &failure);
                    this.show_toast(ToastKind::Error, message.clone(), events);
                    Some(message)
                }
            };
            match failed {
                Some(message) if this.options.keep_modal_on_failure => {
                    if let Some(form) = this.form.as_mut() {
                        form.error = Some(message.clone());
                    }
                    this.ui.error_message = Some(message);
                }
                _ => {
                    this.form = None;
                    this.ui.is_modal_open = false;
                    this.ui.error_message = None;
                    events.push(CrudEvent::ModalClosed);
                }
            }
            this.fetch(dispatcher, cache, events);
        })
    }

    fn build_request(&self, intent: FormIntent<E::Id>, draft: &Draft) -> Result<ApiRequest> {
        match intent {
            FormIntent::Create => E::create_request(self.resource, draft),
            FormIntent::Edit(id) => E::update_request(self.resource, id, draft),
            FormIntent::Action { key, id } => E::action_request(self.resource, key, id, draft),
        }
    }

    fn outcome_messages(&self, intent: FormIntent<E::Id>) -> (String, String) {
        let singular = self.resource.singular();
        match intent {
            FormIntent::Create => (
                format!("{} created successfully", title_case(singular)),
                format!("Failed to create {singular}"),
            ),
            FormIntent::Edit(_) => (
                format!("{} updated successfully", title_case(singular)),
                format!("Failed to update {singular}"),
            ),
            FormIntent::Action { key, .. } => E::action_form(self.resource, key)
                .map(|action| (action.success.to_owned(), action.failure.to_owned()))
                .unwrap_or_else(|| ("Done".to_owned(), "Action failed".to_owned())),
        }
    }

    pub fn request_delete(&mut self, cache: &ResourceCache, id: E::Id) -> Vec<CrudEvent> {
        let label = self
            .entity(cache, id)
            .map(E::label)
            .unwrap_or_else(|| format!("{} {id}", self.resource.singular()));
        self.open_confirm(ConfirmIntent::single(id, label))
    }

    /// Bulk actions with nothing selected warn and stop there.
    pub fn request_bulk(&mut self, key: &str) -> Vec<CrudEvent> {
        let Some(invocation) = self.table.invoke_bulk_action(key) else {
            return Vec::new();
        };
        if invocation.ids.is_empty() {
            let mut events = Vec::new();
            self.show_toast(ToastKind::Warning, EMPTY_SELECTION_MESSAGE, &mut events);
            return events;
        }
        match invocation.action {
            "delete" => self.open_confirm(ConfirmIntent::bulk(invocation.ids)),
            _ => Vec::new(),
        }
    }

    fn open_confirm(&mut self, intent: ConfirmIntent<E::Id>) -> Vec<CrudEvent> {
        self.confirm = Some(ConfirmDialog::new(intent.title(), intent.message(), intent));
        vec![CrudEvent::ConfirmRequested]
    }

    pub fn cancel_confirm(&mut self) -> Vec<CrudEvent> {
        match self.confirm.take() {
            Some(dialog) => {
                drop(dialog);
                vec![CrudEvent::ConfirmCleared]
            }
            None => Vec::new(),
        }
    }

    /// Issues one DELETE per pending id concurrently, joins them all, then
    /// re-fetches whatever the outcome.
    pub fn confirm(
        &mut self,
        dispatcher: &dyn Dispatcher,
        cache: &mut ResourceCache,
    ) -> Vec<CrudEvent> {
        let Some(intent) = self
            .confirm
            .take()
            .and_then(|dialog| dialog.resolve(ConfirmChoice::Confirm))
        else {
            return Vec::new();
        };
        let endpoint = self.resource.endpoint();
        let requests: Vec<ApiRequest> = intent
            .ids
            .iter()
            .map(|id| ApiRequest::delete(endpoint, id))
            .collect();

        self.with_loading(|this, events| {
            events.push(CrudEvent::ConfirmCleared);
            events.push(CrudEvent::RequestsIssued(requests.len()));
            let results = dispatch_all(dispatcher, &requests);
            let failures: Vec<&DispatchError> =
                results.iter().filter_map(|result| result.as_ref().err()).collect();
            let singular = this.resource.singular();
            match failures.first() {
                None => {
                    let message = if intent.is_bulk {
                        format!("{} items deleted successfully", requests.len())
                    } else {
                        format!("{} deleted successfully", title_case(singular))
                    };
                    this.show_toast(ToastKind::Success, message, events);
                }
                Some(error) => {
                    warn!(
                        endpoint,
                        failed = failures.len(),
                        total = requests.len(),
                        "delete failed"
                    );
                    let message = failure_message(error, &format!("Failed to delete {singular}"));
                    this.show_toast(ToastKind::Error, message, events);
                }
            }
            if intent.is_bulk {
                this.table.clear_selection();
            }
            this.fetch(dispatcher, cache, events);
        })
    }

    pub fn dismiss_toast(&mut self, token: u64) -> bool {
        self.ui.toast.dismiss(token)
    }

    pub fn close_toast(&mut self) {
        self.ui.toast.close();
    }

    fn show_toast(
        &mut self,
        kind: ToastKind,
        message: impl Into<String>,
        events: &mut Vec<CrudEvent>,
    ) {
        let token = self.ui.toast.show(kind, message);
        events.push(CrudEvent::ToastShown { kind, token });
    }

    fn with_loading(
        &mut self,
        body: impl FnOnce(&mut Self, &mut Vec<CrudEvent>),
    ) -> Vec<CrudEvent> {
        let mut events = vec![CrudEvent::LoadingStarted];
        self.ui.is_loading = true;
        body(self, &mut events);
        self.ui.is_loading = false;
        events.push(CrudEvent::LoadingFinished);
        events
    }

    fn cache_key(&self) -> CacheKey {
        CacheKey::scoped(self.resource, self.options.list_query.clone())
    }

    fn list_request(&self) -> ApiRequest {
        self.options.list_query.iter().fold(
            ApiRequest::list(self.resource.endpoint()),
            |request, (key, value)| request.with_query(key.as_str(), value.as_str()),
        )
    }

    /// On failure the previous slice stays in place and an error toast shows.
    fn fetch(
        &mut self,
        dispatcher: &dyn Dispatcher,
        cache: &mut ResourceCache,
        events: &mut Vec<CrudEvent>,
    ) {
        let request = self.list_request();
        debug!(path = %request.path, query = ?request.query, "fetch");
        let fetched = dispatcher
            .dispatch(&request)
            .and_then(|envelope| envelope.decode_data::<Vec<E>>());
        match fetched {
            Ok(items) => {
                let count = items.len();
                cache.replace(self.cache_key(), items);
                self.rebuild_rows(cache);
                events.push(CrudEvent::Fetched { count });
            }
            Err(error) => {
                warn!(path = %request.path, %error, "fetch failed");
                let fallback = format!("Failed to load {}", self.resource.label().to_lowercase());
                self.show_toast(ToastKind::Error, failure_message(&error, &fallback), events);
                self.rebuild_rows(cache);
                events.push(CrudEvent::FetchFailed);
            }
        }
    }
}

fn dispatch_all(
    dispatcher: &dyn Dispatcher,
    requests: &[ApiRequest],
) -> Vec<Result<(), DispatchError>> {
    std::thread::scope(|scope| {
        let handles: Vec<_> = requests
            .iter()
            .map(|request| scope.spawn(move || dispatcher.dispatch(request).map(|_| ())))
            .collect();
        handles
            .into_iter()
            .map(|handle| {
                handle.join().unwrap_or_else(|_| {
                    Err(DispatchError::Unreachable {
                        detail: "request thread panicked".to_owned(),
                    })
                })
            })
            .collect()
    })
}

/// Server text when the server said something, connectivity text when it
/// could not be reached, otherwise the action's own fallback.
pub fn failure_message(error: &DispatchError, fallback: &str) -> String {
    match error {
        DispatchError::Unreachable { .. } => UNABLE_TO_CONNECT.to_owned(),
        DispatchError::Server { message, .. } | DispatchError::Rejected { message }
            if !message.trim().is_empty() =>
        {
            message.clone()
        }
        _ => fallback.to_owned(),
    }
}

pub fn title_case(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Object-safe surface so the terminal UI can drive any controller.
pub trait Screen {
    fn resource(&self) -> Resource;
    fn view(&self) -> TableView;
    fn ui(&self) -> &UiState;
    fn phase(&self) -> Phase;
    fn form_view(&self) -> Option<FormView<'_>>;
    fn confirm_view(&self) -> Option<(&str, &str)>;
    fn can_create(&self) -> bool;
    fn query(&self) -> &str;

    fn mount(&mut self, dispatcher: &dyn Dispatcher, cache: &mut ResourceCache) -> Vec<CrudEvent>;
    fn refresh(&mut self, dispatcher: &dyn Dispatcher, cache: &mut ResourceCache) -> Vec<CrudEvent>;
    fn rebuild_rows(&mut self, cache: &ResourceCache);
    fn open_create(&mut self) -> Vec<CrudEvent>;
    fn invoke_focused(&mut self, cache: &ResourceCache, key: &str) -> Vec<CrudEvent>;
    fn request_bulk(&mut self, key: &str) -> Vec<CrudEvent>;
    fn form_input(&mut self, input: FormInput);
    fn submit(&mut self, dispatcher: &dyn Dispatcher, cache: &mut ResourceCache) -> Vec<CrudEvent>;
    fn cancel_modal(&mut self) -> Vec<CrudEvent>;
    fn confirm(&mut self, dispatcher: &dyn Dispatcher, cache: &mut ResourceCache) -> Vec<CrudEvent>;
    fn cancel_confirm(&mut self) -> Vec<CrudEvent>;
    fn table_input(&mut self, input: TableInput);
    fn set_query(&mut self, query: &str);
    fn dismiss_toast(&mut self, token: u64) -> bool;
    fn close_toast(&mut self);
}

impl<E: Entity> Screen for CrudController<E> {
    fn resource(&self) -> Resource {
        self.resource
    }

    fn view(&self) -> TableView {
        self.table.view()
    }

    fn ui(&self) -> &UiState {
        &self.ui
    }

    fn phase(&self) -> Phase {
        CrudController::phase(self)
    }

    fn form_view(&self) -> Option<FormView<'_>> {
        self.form.as_ref().map(|form| FormView {
            title: &form.title,
            fields: form.fields,
            draft: &form.draft,
            focus: form.focus,
            error: form.error.as_deref(),
        })
    }

    fn confirm_view(&self) -> Option<(&str, &str)> {
        self.confirm
            .as_ref()
            .map(|dialog| (dialog.title.as_str(), dialog.message.as_str()))
    }

    fn can_create(&self) -> bool {
        E::can_create(self.resource)
    }

    fn query(&self) -> &str {
        self.table.query()
    }

    fn mount(&mut self, dispatcher: &dyn Dispatcher, cache: &mut ResourceCache) -> Vec<CrudEvent> {
        CrudController::mount(self, dispatcher, cache)
    }

    fn refresh(
        &mut self,
        dispatcher: &dyn Dispatcher,
        cache: &mut ResourceCache,
    ) -> Vec<CrudEvent> {
        CrudController::refresh(self, dispatcher, cache)
    }

    fn rebuild_rows(&mut self, cache: &ResourceCache) {
        CrudController::rebuild_rows(self, cache);
    }

    fn open_create(&mut self) -> Vec<CrudEvent> {
        CrudController::open_create(self)
    }

    fn invoke_focused(&mut self, cache: &ResourceCache, key: &str) -> Vec<CrudEvent> {
        match self.table.focused_id() {
            Some(id) => self.invoke_row(cache, key, id),
            None => Vec::new(),
        }
    }

    fn request_bulk(&mut self, key: &str) -> Vec<CrudEvent> {
        CrudController::request_bulk(self, key)
    }

    fn form_input(&mut self, input: FormInput) {
        CrudController::form_input(self, input);
    }

    fn submit(&mut self, dispatcher: &dyn Dispatcher, cache: &mut ResourceCache) -> Vec<CrudEvent> {
        CrudController::submit(self, dispatcher, cache)
    }

    fn cancel_modal(&mut self) -> Vec<CrudEvent> {
        CrudController::cancel_modal(self)
    }

    fn confirm(
        &mut self,
        dispatcher: &dyn Dispatcher,
        cache: &mut ResourceCache,
    ) -> Vec<CrudEvent> {
        CrudController::confirm(self, dispatcher, cache)
    }

    fn cancel_confirm(&mut self) -> Vec<CrudEvent> {
        CrudController::cancel_confirm(self)
    }

    fn table_input(&mut self, input: TableInput) {
        match input {
            TableInput::CursorUp => self.table.move_cursor(-1),
            TableInput::CursorDown => self.table.move_cursor(1),
            TableInput::NextPage => {
                self.table.next_page();
            }
            TableInput::PrevPage => {
                self.table.prev_page();
            }
            TableInput::ToggleRow => {
                if let Some(id) = self.table.focused_id() {
                    self.table.toggle_row(id);
                }
            }
            TableInput::ToggleAll => self.table.toggle_select_all(),
        }
    }

    fn set_query(&mut self, query: &str) {
        self.table.set_query(query);
    }

    fn dismiss_toast(&mut self, token: u64) -> bool {
        CrudController::dismiss_toast(self, token)
    }

    fn close_toast(&mut self) {
        CrudController::close_toast(self);
    }
}
