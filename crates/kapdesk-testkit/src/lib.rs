// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use kapdesk_app::{
    ApiRequest, Company, CompanyId, DispatchError, Dispatcher, Envelope, Method, Role, Sector,
    SectorId, SessionUser, Ticket, TicketId, TicketNote, TicketNoteId, TicketPriority,
    TicketStatus, User, UserId,
};
use serde::Serialize;
use serde_json::Value;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};
use time::{Date, Duration, Month, OffsetDateTime, Time};

const SECTOR_NAMES: [&str; 10] = [
    "Water",
    "Electricity",
    "Health",
    "Education",
    "Transport",
    "Housing",
    "Telecom",
    "Agriculture",
    "Tourism",
    "Environment",
];

const COMPANY_ADJECTIVES: [&str; 10] = [
    "National", "United", "Gulf", "Crescent", "Desert", "Coastal", "Royal", "Modern", "Golden",
    "Northern",
];

const COMPANY_SUFFIXES: [&str; 6] = ["Services", "Holding", "Group", "Works", "Co", "Solutions"];

const FIRST_NAMES: [&str; 16] = [
    "Omar", "Lina", "Yousef", "Huda", "Karim", "Rana", "Tariq", "Maha", "Sami", "Noor", "Faris",
    "Dana", "Ziad", "Salma", "Adel", "Reem",
];

const LAST_NAMES: [&str; 14] = [
    "Haddad", "Khalil", "Mansour", "Nasser", "Saleh", "Aziz", "Hamdan", "Rahman", "Qasim",
    "Farouk", "Jaber", "Sabbagh", "Odeh", "Darwish",
];

const TICKET_SUBJECTS: [&str; 12] = [
    "Water outage",
    "Billing dispute",
    "Meter reading",
    "Power flicker",
    "Road damage",
    "Permit delay",
    "Street light",
    "Leak report",
    "Service request",
    "Network down",
    "Inspection",
    "Complaint",
];

const TICKET_PLACES: [&str; 8] = [
    "Block 4",
    "North district",
    "Main office",
    "Harbor road",
    "Old town",
    "Industrial zone",
    "Airport road",
    "University area",
];

const TICKET_STATUSES: [TicketStatus; 6] = [
    TicketStatus::Open,
    TicketStatus::Assigned,
    TicketStatus::InProgress,
    TicketStatus::Transferred,
    TicketStatus::Resolved,
    TicketStatus::Closed,
];

const TICKET_PRIORITIES: [TicketPriority; 4] = [
    TicketPriority::Low,
    TicketPriority::Medium,
    TicketPriority::High,
    TicketPriority::Critical,
];

const REFERENCE_YEAR: i32 = 2026;

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }

    fn bool(&mut self) -> bool {
        (self.next_u64() & 1) == 1
    }
}

/// Seeded generator of realistic console records. Ids count up per kind so
/// fixtures stay readable in assertions.
#[derive(Debug, Clone)]
pub struct KapFaker {
    rng: DeterministicRng,
    next_id: i64,
}

impl KapFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
            next_id: 1,
        }
    }

    pub fn int_n(&mut self, n: usize) -> usize {
        self.rng.int_n(n)
    }

    fn take_id(&mut self) -> i64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn sector(&mut self) -> Sector {
        let id = self.take_id();
        let name = self.pick(&SECTOR_NAMES).to_owned();
        let code = format!(
            "{}-{id:03}",
            name.chars().take(3).collect::<String>().to_uppercase()
        );
        Sector {
            id: SectorId::new(id),
            email: format!("{}@kap.gov", name.to_lowercase()),
            phone: self.phone(),
            logo_url: self.rng.bool().then(|| format!("/uploads/sector-{id}.png")),
            created_at: Some(self.date_in_year(REFERENCE_YEAR - 1)),
            name,
            code,
        }
    }

    pub fn company(&mut self, sector: SectorId) -> Company {
        let id = self.take_id();
        let name = format!(
            "{} {}",
            self.pick(&COMPANY_ADJECTIVES),
            self.pick(&COMPANY_SUFFIXES)
        );
        Company {
            id: CompanyId::new(id),
            email: format!(
                "contact@{}.com",
                name.to_lowercase().replace(' ', "-")
            ),
            name,
            sector_id: Some(sector),
            registration_number: format!("CR-{:06}", self.int_range(100_000, 999_999)),
            phone: self.phone(),
            logo_url: None,
            created_at: Some(self.date_in_year(REFERENCE_YEAR - 1)),
        }
    }

    pub fn user(&mut self, role: Role) -> User {
        let id = self.take_id();
        let first = self.pick(&FIRST_NAMES);
        let last = self.pick(&LAST_NAMES);
        let username = format!("{}.{}{id}", first.to_lowercase(), last.to_lowercase());
        User {
            id: UserId::new(id),
            full_name: format!("{first} {last}"),
            email: format!("{username}@kap.gov"),
            username,
            phone: self.phone(),
            role,
            sector_id: None,
            company_id: None,
            avatar_url: self.rng.bool().then(|| format!("/uploads/avatar-{id}.png")),
        }
    }

    pub fn ticket(&mut self) -> Ticket {
        let id = self.take_id();
        let status = TICKET_STATUSES[self.rng.int_n(TICKET_STATUSES.len())];
        let progress = match status {
            TicketStatus::Open => 0,
            TicketStatus::Resolved | TicketStatus::Closed => 100,
            _ => self.int_range(5, 95) as u8,
        };
        Ticket {
            id: TicketId::new(id),
            title: format!(
                "{} - {}",
                self.pick(&TICKET_SUBJECTS),
                self.pick(&TICKET_PLACES)
            ),
            description: "Reported by a resident through the service desk.".to_owned(),
            status,
            priority: TICKET_PRIORITIES[self.rng.int_n(TICKET_PRIORITIES.len())],
            sector_id: None,
            company_id: None,
            assignee_id: None,
            assignee_name: String::new(),
            progress,
            attachment_url: None,
            created_at: Some(self.date_in_year(REFERENCE_YEAR)),
        }
    }

    pub fn note(&mut self, ticket: TicketId) -> TicketNote {
        let id = self.take_id();
        TicketNote {
            id: TicketNoteId::new(id),
            ticket_id: ticket,
            note: format!("Followed up at {}.", self.pick(&TICKET_PLACES)),
            author_name: format!("{} {}", self.pick(&FIRST_NAMES), self.pick(&LAST_NAMES)),
            created_at: Some(self.date_in_year(REFERENCE_YEAR)),
        }
    }

    pub fn session_user(&mut self, role: Role) -> SessionUser {
        let user = self.user(role);
        SessionUser {
            id: user.id,
            username: user.username,
            full_name: user.full_name,
            role,
            sector_id: Some(SectorId::new(1)),
            company_id: Some(CompanyId::new(2)),
            first_login: false,
        }
    }

    pub fn sectors(&mut self, count: usize) -> Vec<Sector> {
        (0..count).map(|_| self.sector()).collect()
    }

    pub fn tickets(&mut self, count: usize) -> Vec<Ticket> {
        (0..count).map(|_| self.ticket()).collect()
    }

    pub fn date_in_year(&mut self, year: i32) -> OffsetDateTime {
        let start = midnight_utc(year, Month::January, 1);
        let offset = self.int_range(0, 364 * 24 * 60 * 60);
        start + Duration::seconds(offset)
    }

    fn phone(&mut self) -> String {
        format!(
            "+962 7{} {:03} {:04}",
            self.int_range(7, 9),
            self.int_range(0, 999),
            self.int_range(0, 9999)
        )
    }

    fn pick<'a>(&mut self, items: &'a [&'a str]) -> &'a str {
        items[self.rng.int_n(items.len())]
    }

    fn int_range(&mut self, min: i64, max: i64) -> i64 {
        if max <= min {
            return min;
        }
        let span = max - min + 1;
        min + (self.rng.next_u64() % (span as u64)) as i64
    }
}

fn midnight_utc(year: i32, month: Month, day: u8) -> OffsetDateTime {
    let date = Date::from_calendar_date(year, month, day).unwrap_or(Date::MIN);
    date.with_time(Time::MIDNIGHT).assume_utc()
}

pub fn fixture_datetime() -> &'static str {
    "2026-02-19T12:34:56Z"
}

pub fn temp_data_dir() -> Result<(tempfile::TempDir, PathBuf)> {
    let dir = tempfile::tempdir().context("create temp dir")?;
    let path = dir.path().join("kapdesk");
    Ok((dir, path))
}

/// Successful envelope around any serializable payload.
pub fn ok_envelope(data: impl Serialize) -> Envelope {
    Envelope {
        data: serde_json::to_value(data).unwrap_or(Value::Null),
        message: String::new(),
        success: true,
    }
}

pub fn server_error(status: u16, message: &str) -> DispatchError {
    DispatchError::Server {
        status,
        message: message.to_owned(),
    }
}

pub fn unreachable() -> DispatchError {
    DispatchError::Unreachable {
        detail: "connection refused".to_owned(),
    }
}

type Reply = Result<Envelope, DispatchError>;

#[derive(Debug)]
struct Script {
    method: Method,
    path: String,
    once: VecDeque<Reply>,
    sticky: Option<Reply>,
}

/// In-memory [`Dispatcher`] that records every request and answers from a
/// script keyed by method and path. One-shot replies are used first, then
/// the sticky reply; anything unscripted succeeds with `null` data.
#[derive(Debug, Default)]
pub struct ScriptedDispatcher {
    scripts: Mutex<Vec<Script>>,
    log: Mutex<Vec<ApiRequest>>,
}

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ScriptedDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_script(&self, method: Method, path: &str, apply: impl FnOnce(&mut Script)) {
        let mut scripts = locked(&self.scripts);
        let index = match scripts
            .iter()
            .position(|script| script.method == method && script.path == path)
        {
            Some(index) => index,
            None => {
                scripts.push(Script {
                    method,
                    path: path.to_owned(),
                    once: VecDeque::new(),
                    sticky: None,
                });
                scripts.len() - 1
            }
        };
        apply(&mut scripts[index]);
    }

    pub fn respond(&self, method: Method, path: &str, reply: Reply) -> &Self {
        self.with_script(method, path, |script| script.sticky = Some(reply));
        self
    }

    pub fn respond_once(&self, method: Method, path: &str, reply: Reply) -> &Self {
        self.with_script(method, path, |script| script.once.push_back(reply));
        self
    }

    /// Sticky list reply for `GET /protected/{endpoint}`.
    pub fn list<T: Serialize>(&self, endpoint: &str, items: &[T]) -> &Self {
        self.respond(
            Method::Get,
            &format!("/protected/{endpoint}"),
            Ok(ok_envelope(items)),
        )
    }

    pub fn fail(&self, method: Method, path: &str, error: DispatchError) -> &Self {
        self.respond(method, path, Err(error))
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        locked(&self.log).clone()
    }

    pub fn count(&self, method: Method) -> usize {
        locked(&self.log)
            .iter()
            .filter(|request| request.method == method)
            .count()
    }

    pub fn count_path(&self, method: Method, path: &str) -> usize {
        locked(&self.log)
            .iter()
            .filter(|request| request.method == method && request.path == path)
            .count()
    }

    pub fn clear_log(&self) {
        locked(&self.log).clear();
    }
}

impl Dispatcher for ScriptedDispatcher {
    fn dispatch(&self, request: &ApiRequest) -> Result<Envelope, DispatchError> {
        locked(&self.log).push(request.clone());
        let mut scripts = locked(&self.scripts);
        let script = scripts
            .iter_mut()
            .find(|script| script.method == request.method && script.path == request.path);
        match script {
            Some(script) => match script.once.pop_front() {
                Some(reply) => reply,
                None => script
                    .sticky
                    .clone()
                    .unwrap_or_else(|| Ok(ok_envelope(Value::Null))),
            },
            None => Ok(ok_envelope(Value::Null)),
        }
    }
}
