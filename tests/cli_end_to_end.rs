#![deny(clippy::all, clippy::pedantic)]

use assert_cmd::Command;
use httpmock::MockServer;
use predicates::str::contains;
use serde_json::json;
use std::io::Write;
use tempfile::{NamedTempFile, TempDir};

fn document_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("tmp file");
    file.write_all(contents.as_bytes()).expect("write document");
    file
}

fn pedium() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("pedium"))
}

#[test]
fn render_writes_markup_for_a_document_file() {
    let file = document_file(
        r#"{"blocks": [
            {"type": "header", "data": {"text": "Hello", "level": 2}},
            {"type": "paragraph", "data": {"text": "World"}}
        ]}"#,
    );

    pedium()
        .arg("render")
        .arg(file.path())
        .assert()
        .success()
        .stdout(contains("<h2 class=\"article-heading\">Hello</h2>"))
        .stdout(contains("<p class=\"article-paragraph\">World</p>"));
}

#[test]
fn extract_speech_strips_markup_and_joins_sentences() {
    let file = document_file(
        r#"{"blocks": [
            {"type": "header", "data": {"text": "The <em>Title</em>"}},
            {"type": "paragraph", "data": {"text": "First <b>sentence</b>"}}
        ]}"#,
    );

    pedium()
        .arg("extract")
        .arg("--speech")
        .arg(file.path())
        .assert()
        .success()
        .stdout(contains("The Title. First sentence"))
        .stderr(contains("4 words, 1 min read"));
}

#[test]
fn malformed_document_fails_with_a_readable_message() {
    let file = document_file("{not json at all");

    pedium()
        .arg("render")
        .arg(file.path())
        .assert()
        .failure()
        .stderr(contains("The story content could not be read."));
}

#[test]
fn whoami_reports_logged_out_without_a_session() {
    let server = MockServer::start();
    let account = server.mock(|when, then| {
        when.method("GET").path("/account");
        then.status(401)
            .header("content-type", "application/json")
            .json_body(json!({ "message": "User (role: guests) missing scope (account)" }));
    });
    let state = TempDir::new().expect("state dir");

    pedium()
        .arg("whoami")
        .arg("--store-endpoint")
        .arg(server.base_url())
        .arg("--state-dir")
        .arg(state.path())
        .assert()
        .success()
        .stdout(contains("Not logged in."));

    account.assert();
}

#[test]
fn feed_lists_stories_from_the_store() {
    let server = MockServer::start();
    let documents = server.mock(|when, then| {
        when.method("GET")
            .path("/databases/pedium_db/collections/articles/documents");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({
                "total": 1,
                "documents": [{
                    "$id": "a1",
                    "$createdAt": "2024-07-06T12:30:00.000+00:00",
                    "title": "Falling Water",
                    "content": "{\"blocks\":[]}",
                    "authorId": "u1",
                    "authorName": "R. Levy",
                    "excerpt": "The river does not hurry",
                    "views": 41,
                    "likesCount": 7,
                    "tags": ["rivers"],
                }],
            }));
    });
    let state = TempDir::new().expect("state dir");

    pedium()
        .arg("feed")
        .arg("--store-endpoint")
        .arg(server.base_url())
        .arg("--state-dir")
        .arg(state.path())
        .assert()
        .success()
        .stdout(contains("a1  Falling Water"))
        .stdout(contains("by R. Levy, 41 views, 7 likes"));

    documents.assert();
}

#[test]
fn login_persists_the_session_token() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method("POST").path("/account/sessions/email");
        then.status(201)
            .header("content-type", "application/json")
            .json_body(json!({ "$id": "s1", "secret": "session-secret" }));
    });
    server.mock(|when, then| {
        when.method("GET").path("/account");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({ "$id": "u1", "name": "Jane", "email": "jane@example.com" }));
    });
    let state = TempDir::new().expect("state dir");

    pedium()
        .arg("login")
        .arg("--email")
        .arg("jane@example.com")
        .arg("--password")
        .arg("hunter22")
        .arg("--store-endpoint")
        .arg(server.base_url())
        .arg("--state-dir")
        .arg(state.path())
        .assert()
        .success()
        .stdout(contains("Logged in as Jane."));

    let session = std::fs::read_to_string(state.path().join("session.json")).expect("session file");
    assert!(session.contains("session-secret"));
}
