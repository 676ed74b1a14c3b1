// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow};
use kapdesk_api::Client;
use kapdesk_app::{
    ApiRequest, DispatchError, Dispatcher, FormPart, PartValue, ProfileUpdate, RequestBody, Role,
    UNABLE_TO_CONNECT,
};
use std::io::{Read, Write};
use std::net::TcpListener;
use std::thread;
use std::time::Duration;
use tiny_http::{Header, Method, Response, Server};

fn json_response(status: u16, body: &str) -> Response<std::io::Cursor<Vec<u8>>> {
    Response::from_string(body)
        .with_status_code(status)
        .with_header(
            Header::from_bytes("Content-Type", "application/json")
                .expect("valid content type header"),
        )
}

fn mock_server() -> Result<(Server, String)> {
    let server =
        Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
    let addr = format!("http://{}/api", server.server_addr());
    Ok((server, addr))
}

#[test]
fn unreachable_server_maps_to_connect_message() {
    let client = Client::new("http://127.0.0.1:1/api", Duration::from_millis(50))
        .expect("client should initialize");

    let error = client
        .dispatch(&ApiRequest::list("sector"))
        .expect_err("dispatch should fail for unreachable endpoint");
    assert!(matches!(error, DispatchError::Unreachable { .. }));
    assert_eq!(error.user_message(), UNABLE_TO_CONNECT);
    assert!(error.to_string().contains("api.base_url"));
}

#[test]
fn list_sends_scope_query_and_decodes_rows() -> Result<()> {
    let (server, addr) = mock_server()?;

    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        assert_eq!(request.method(), &Method::Get);
        assert_eq!(request.url(), "/api/protected/company?sector_id=2");
        let body = r#"{"success":true,"message":"","data":[{"id":1,"name":"Acme"}]}"#;
        request
            .respond(json_response(200, body))
            .expect("response should succeed");
    });

    let client = Client::new(&addr, Duration::from_secs(1))?;
    let envelope = client
        .dispatch(&ApiRequest::list("company").with_query("sector_id", "2"))
        .map_err(|error| anyhow!("{error}"))?;
    assert!(envelope.success);
    assert_eq!(envelope.data[0]["name"], "Acme");

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn login_posts_credentials_and_returns_user() -> Result<()> {
    let (server, addr) = mock_server()?;

    let handle = thread::spawn(move || {
        let mut request = server.recv().expect("request expected");
        assert_eq!(request.method(), &Method::Post);
        assert_eq!(request.url(), "/api/auth/login");
        let mut body = String::new();
        request
            .as_reader()
            .read_to_string(&mut body)
            .expect("request body");
        assert!(body.contains(r#""username":"nadia""#));
        let reply = r#"{"success":true,"message":"Welcome","data":{"user":{"id":9,"username":"nadia","full_name":"Nadia Saleh","role":"sector_manager","sector_id":2,"first_login":true}}}"#;
        let response = json_response(200, reply).with_header(
            Header::from_bytes("Set-Cookie", "session=abc; Path=/").expect("valid cookie header"),
        );
        request.respond(response).expect("response should succeed");
    });

    let client = Client::new(&addr, Duration::from_secs(1))?;
    let user = client
        .login(" nadia ", "hunter22")
        .map_err(|error| anyhow!("{error}"))?;
    assert_eq!(user.username, "nadia");
    assert_eq!(user.role, Role::SectorManager);
    assert!(user.first_login);

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn session_cookie_is_replayed_on_later_requests() -> Result<()> {
    let (server, addr) = mock_server()?;

    let handle = thread::spawn(move || {
        let login = server.recv().expect("login expected");
        let reply = r#"{"success":true,"data":{"user":{"id":1,"username":"root","role":"kap_admin"}}}"#;
        let response = json_response(200, reply).with_header(
            Header::from_bytes("Set-Cookie", "session=abc; Path=/").expect("valid cookie header"),
        );
        login.respond(response).expect("response should succeed");

        let update = server.recv().expect("profile update expected");
        assert_eq!(update.method(), &Method::Put);
        assert_eq!(update.url(), "/api/auth/update-admin");
        let cookie = update
            .headers()
            .iter()
            .find(|header| header.field.equiv("Cookie"))
            .map(|header| header.value.as_str().to_owned())
            .unwrap_or_default();
        assert!(cookie.contains("session=abc"));
        assert!(
            !update
                .headers()
                .iter()
                .any(|header| header.field.equiv("Authorization"))
        );
        update
            .respond(json_response(200, r#"{"success":true,"message":"Profile updated"}"#))
            .expect("response should succeed");
    });

    let client = Client::new(&addr, Duration::from_secs(1))?;
    client
        .login("root", "password1")
        .map_err(|error| anyhow!("{error}"))?;
    let envelope = client
        .update_profile(&ProfileUpdate {
            full_name: "Root Admin".to_owned(),
            email: "root@kap.gov".to_owned(),
            new_password: "password2".to_owned(),
        })
        .map_err(|error| anyhow!("{error}"))?;
    assert_eq!(envelope.message, "Profile updated");

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn error_status_keeps_server_message() -> Result<()> {
    let (server, addr) = mock_server()?;

    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        request
            .respond(json_response(
                409,
                r#"{"success":false,"message":"Sector code already exists"}"#,
            ))
            .expect("response should succeed");
    });

    let client = Client::new(&addr, Duration::from_secs(1))?;
    let error = client
        .dispatch(&ApiRequest::create(
            "sector",
            RequestBody::Json(serde_json::json!({"name": "Energy", "code": "EN"})),
        ))
        .expect_err("conflict should fail");
    assert_eq!(
        error,
        DispatchError::Server {
            status: 409,
            message: "Sector code already exists".to_owned(),
        }
    );
    assert_eq!(error.user_message(), "Sector code already exists");

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn multipart_upload_carries_file_part() -> Result<()> {
    let (server, addr) = mock_server()?;

    let handle = thread::spawn(move || {
        let mut request = server.recv().expect("request expected");
        assert_eq!(request.method(), &Method::Put);
        assert_eq!(request.url(), "/api/protected/sector/4");
        let content_type = request
            .headers()
            .iter()
            .find(|header| header.field.equiv("Content-Type"))
            .map(|header| header.value.as_str().to_owned())
            .unwrap_or_default();
        assert!(content_type.starts_with("multipart/form-data"));
        let mut body = Vec::new();
        request
            .as_reader()
            .read_to_end(&mut body)
            .expect("request body");
        let body = String::from_utf8_lossy(&body);
        assert!(body.contains(r#"name="logo"; filename="logo.png""#));
        assert!(body.contains("Energy"));
        request
            .respond(json_response(200, r#"{"success":true,"message":"Updated"}"#))
            .expect("response should succeed");
    });

    let client = Client::new(&addr, Duration::from_secs(1))?;
    let parts = vec![
        FormPart::text("name", "Energy"),
        FormPart {
            name: "logo".to_owned(),
            value: PartValue::File {
                file_name: "logo.png".to_owned(),
                mime_type: "image/png".to_owned(),
                bytes: vec![0x89, b'P', b'N', b'G'],
            },
        },
    ];
    let envelope = client
        .dispatch(&ApiRequest::put("sector", 4, parts))
        .map_err(|error| anyhow!("{error}"))?;
    assert_eq!(envelope.message, "Updated");

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn delete_with_empty_body_succeeds_and_rejection_fails() -> Result<()> {
    let (server, addr) = mock_server()?;

    let handle = thread::spawn(move || {
        let first = server.recv().expect("request expected");
        assert_eq!(first.method(), &Method::Delete);
        assert_eq!(first.url(), "/api/protected/ticket/12");
        first
            .respond(Response::empty(204))
            .expect("response should succeed");

        let second = server.recv().expect("request expected");
        second
            .respond(json_response(
                200,
                r#"{"success":false,"message":"Ticket is locked"}"#,
            ))
            .expect("response should succeed");
    });

    let client = Client::new(&addr, Duration::from_secs(1))?;
    client
        .dispatch(&ApiRequest::delete("ticket", 12))
        .map_err(|error| anyhow!("{error}"))?;
    let error = client
        .dispatch(&ApiRequest::delete("ticket", 13))
        .expect_err("rejected delete");
    assert_eq!(error.user_message(), "Ticket is locked");

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn truncated_success_body_is_a_connection_failure() -> Result<()> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    let addr = format!("http://{}/api", listener.local_addr()?);

    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().expect("connection expected");
        let mut head = Vec::new();
        let mut byte = [0_u8; 1];
        while !head.ends_with(b"\r\n\r\n") {
            let read = stream.read(&mut byte).expect("request head");
            if read == 0 {
                break;
            }
            head.push(byte[0]);
        }
        assert!(String::from_utf8_lossy(&head).starts_with("DELETE /api/protected/sector/4"));
        stream
            .write_all(
                b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 200\r\n\r\n{\"succ",
            )
            .expect("partial response");
        stream.flush().expect("flush");
    });

    let client = Client::new(&addr, Duration::from_secs(2))?;
    let error = client
        .dispatch(&ApiRequest::delete("sector", 4))
        .expect_err("a cut-off body must not count as success");
    assert!(matches!(error, DispatchError::Unreachable { .. }));
    assert_eq!(error.user_message(), UNABLE_TO_CONNECT);

    handle.join().expect("server thread should join");
    Ok(())
}
