// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use kapdesk_api::Client;
use kapdesk_app::{
    DEFAULT_PAGE_SIZE, DispatchError, Dispatcher, ProfileUpdate, Session, SessionUser,
};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Signed-in user kept on disk between launches. Only the user record is
/// stored; the server cookie lives in the HTTP client for one process.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Option<Session>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("read session file {}", self.path.display()))?;
        if raw.trim().is_empty() {
            return Ok(None);
        }
        let user: SessionUser = serde_json::from_str(&raw).with_context(|| {
            format!(
                "decode session file {}; delete it or run `kapdesk --logout`",
                self.path.display()
            )
        })?;
        Ok(Some(Session::new(user)))
    }

    pub fn save(&self, session: &Session) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create session directory {}", parent.display()))?;
        }
        let body = serde_json::to_string_pretty(&session.user).context("encode session")?;
        fs::write(&self.path, body)
            .with_context(|| format!("write session file {}", self.path.display()))?;
        debug!(path = %self.path.display(), "session saved");
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(error)
                .with_context(|| format!("remove session file {}", self.path.display())),
        }
    }
}

pub struct ApiRuntime {
    client: Client,
    store: SessionStore,
    page_size: usize,
}

impl ApiRuntime {
    pub fn new(client: Client, store: SessionStore) -> Self {
        Self {
            client,
            store,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }
}

impl kapdesk_tui::ConsoleRuntime for ApiRuntime {
    fn dispatcher(&self) -> &dyn Dispatcher {
        &self.client
    }

    fn page_size(&self) -> usize {
        self.page_size
    }

    fn login(&mut self, username: &str, password: &str) -> Result<SessionUser, DispatchError> {
        self.client.login(username, password)
    }

    fn update_profile(&mut self, update: &ProfileUpdate) -> Result<(), DispatchError> {
        self.client.update_profile(update).map(|_| ())
    }

    fn logout(&mut self) -> Result<(), DispatchError> {
        self.client.logout()
    }

    fn persist_session(&mut self, session: &Session) -> Result<()> {
        self.store.save(session)
    }

    fn clear_session(&mut self) -> Result<()> {
        self.store.clear()
    }
}

#[cfg(test)]
mod tests {
    use super::{ApiRuntime, SessionStore};
    use anyhow::{Result, anyhow};
    use kapdesk_api::Client;
    use kapdesk_app::{Role, Session};
    use kapdesk_testkit::{KapFaker, temp_data_dir};
    use kapdesk_tui::ConsoleRuntime;
    use std::thread;
    use std::time::Duration;
    use tiny_http::{Header, Method, Response, Server};

    #[test]
    fn store_round_trips_and_clears() -> Result<()> {
        let (_temp, dir) = temp_data_dir()?;
        let store = SessionStore::new(dir.join("nested").join("session.json"));
        assert!(store.load()?.is_none());

        let user = KapFaker::new(11).session_user(Role::CompanyManager);
        let session = Session::new(user.clone());
        store.save(&session)?;
        assert!(store.path().exists());
        assert_eq!(store.load()?, Some(session));

        store.clear()?;
        assert!(store.load()?.is_none());
        store.clear()?;
        Ok(())
    }

    #[test]
    fn corrupt_session_file_points_at_logout() -> Result<()> {
        let (_temp, dir) = temp_data_dir()?;
        std::fs::create_dir_all(&dir)?;
        let path = dir.join("session.json");
        std::fs::write(&path, "{not json")?;
        let error = SessionStore::new(path)
            .load()
            .expect_err("corrupt session should fail");
        assert!(format!("{error:#}").contains("kapdesk --logout"));
        Ok(())
    }

    #[test]
    fn runtime_login_goes_through_client_and_persists() -> Result<()> {
        let server =
            Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
        let base_url = format!("http://{}/api", server.server_addr());

        let handle = thread::spawn(move || {
            let request = server.recv().expect("request expected");
            assert_eq!(request.method(), &Method::Post);
            assert_eq!(request.url(), "/api/auth/login");
            let reply = r#"{"success":true,"data":{"user":{"id":3,"username":"omar","role":"company_employee","company_id":8}}}"#;
            let response = Response::from_string(reply).with_header(
                Header::from_bytes("Content-Type", "application/json")
                    .expect("valid content type header"),
            );
            request.respond(response).expect("response should succeed");
        });

        let (_temp, dir) = temp_data_dir()?;
        let store = SessionStore::new(dir.join("session.json"));
        let client = Client::new(&base_url, Duration::from_secs(1))?;
        let mut runtime = ApiRuntime::new(client, store.clone()).with_page_size(0);
        assert_eq!(runtime.page_size(), 1);

        let user = runtime
            .login("omar", "secret-pass")
            .map_err(|error| anyhow!("{error}"))?;
        assert_eq!(user.role, Role::CompanyEmployee);
        runtime.persist_session(&Session::new(user))?;
        assert_eq!(
            store.load()?.map(|session| session.user.username),
            Some("omar".to_owned())
        );

        runtime.clear_session()?;
        assert!(store.load()?.is_none());

        handle.join().expect("server thread should join");
        Ok(())
    }
}
