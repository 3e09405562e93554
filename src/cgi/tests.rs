//! CGIモジュールのテスト

use std::os::unix::process::ExitStatusExt;
use std::process::ExitStatus;

use temp_env::with_vars;

use crate::common::FormData;
use crate::error::Error;
use crate::relay::MockMailTransport;
use super::core::deliver;
use super::error_logging::{log_error_to_file, redact_query_string, redact_value_for_log, is_sensitive_key_like};
use super::request::RawRequest;
use super::response::{write_error_to, write_success_to, Outcome};
use super::validation::{is_valid_header_value, require_sender};

fn complete_form() -> FormData {
    FormData::new()
        .with_field("to", "info@example.com")
        .with_field("from", "ada@example.com")
        .with_field("name", "Ada Lovelace")
        .with_field("subject", "Hello")
        .with_field("text", "Body")
}

fn exit_code(code: i32) -> ExitStatus {
    ExitStatus::from_raw(code << 8)
}

#[test]
fn test_raw_request_from_env() {
    with_vars(
        [
            ("REQUEST_METHOD", Some("POST")),
            ("QUERY_STRING", Some("a=1")),
            ("CONTENT_LENGTH", Some("12")),
        ],
        || {
            let raw = RawRequest::from_env();
            assert_eq!(raw.method, "POST");
            assert_eq!(raw.query_string, "a=1");
            assert_eq!(raw.content_length.as_deref(), Some("12"));
        },
    );
}

#[test]
fn test_raw_request_from_env_missing_vars() {
    with_vars(
        [
            ("REQUEST_METHOD", None::<&str>),
            ("QUERY_STRING", None),
            ("CONTENT_LENGTH", None),
        ],
        || {
            let raw = RawRequest::from_env();
            assert_eq!(raw, RawRequest::default());

            let err = raw.parse_form(std::io::empty(), 1024).unwrap_err();
            assert!(matches!(err, Error::UnsupportedMethod(_)));
        },
    );
}

#[test]
fn test_raw_request_parse_post_body() {
    let raw = RawRequest {
        method: "POST".to_string(),
        query_string: String::new(),
        content_length: Some("11".to_string()),
    };
    let parsed = raw.parse_form(&b"name=Ada+L."[..], 1024).unwrap();
    assert_eq!(parsed.data.get("name"), Some("Ada L."));
}

#[test]
fn test_require_sender() {
    assert!(require_sender(&complete_form()).is_ok());

    let err = require_sender(&complete_form().with_field("name", "")).unwrap_err();
    assert!(matches!(err, Error::IncompleteRequiredFields(ref m) if m == "missing name"));

    let err = require_sender(&FormData::new()).unwrap_err();
    assert!(matches!(err, Error::IncompleteRequiredFields(ref m) if m == "missing from, name"));
}

#[test]
fn test_is_valid_header_value() {
    assert!(is_valid_header_value("https://example.com/thanks?x=1"));
    assert!(is_valid_header_value("a\tb c"));
    assert!(!is_valid_header_value("https://example.com\r\nSet-Cookie: x=1"));
    assert!(!is_valid_header_value("bad\nvalue"));
    assert!(!is_valid_header_value("ü"));
}

#[test]
fn test_outcome_prefers_location() {
    let form = complete_form()
        .with_field("location", "https://example.com/thanks")
        .with_field("feedback", "<p>Thanks</p>");
    assert_eq!(
        Outcome::from_form(&form).unwrap(),
        Outcome::Redirect("https://example.com/thanks".to_string())
    );

    let form = complete_form().with_field("feedback", "<p>Thanks</p>");
    assert_eq!(Outcome::from_form(&form).unwrap(), Outcome::Feedback("<p>Thanks</p>".to_string()));

    assert_eq!(Outcome::from_form(&complete_form()).unwrap(), Outcome::Empty);
}

#[test]
fn test_outcome_rejects_injected_location() {
    let form = complete_form().with_field("location", "/ok\r\nStatus: 500");
    let err = Outcome::from_form(&form).unwrap_err();
    assert!(matches!(err, Error::HeaderInjection(_)));
}

#[test]
fn test_write_success_outputs() {
    let mut buf = Vec::new();
    write_success_to(&Outcome::Redirect("https://example.com/".to_string()), &mut buf).unwrap();
    assert_eq!(String::from_utf8(buf).unwrap(), "Location: https://example.com/\r\n\r\n");

    let mut buf = Vec::new();
    write_success_to(&Outcome::Feedback("<p>Thanks</p>".to_string()), &mut buf).unwrap();
    assert_eq!(
        String::from_utf8(buf).unwrap(),
        "Content-Type: text/html\r\n\r\n<p>Thanks</p>\n"
    );

    let mut buf = Vec::new();
    write_success_to(&Outcome::Empty, &mut buf).unwrap();
    assert_eq!(String::from_utf8(buf).unwrap(), "Content-Type: text/html\r\n\r\n");
}

#[test]
fn test_write_error_page() {
    let mut buf = Vec::new();
    let err = Error::RecipientNotAllowed("<evil>@example.com".to_string());
    write_error_to(&err, "admin@example.com", &mut buf).unwrap();
    let out = String::from_utf8(buf).unwrap();

    assert!(out.starts_with("Status: 403 Forbidden\r\nContent-Type: text/html\r\n\r\n"));
    assert!(out.contains("<TITLE>CGI error!</TITLE>"));
    assert!(out.contains("Not allowed to send to this address: &lt;evil&gt;@example.com"));
    assert!(out.contains("mailto:admin@example.com"));
}

#[test]
fn test_write_incomplete_page() {
    let mut buf = Vec::new();
    let err = Error::IncompleteRequiredFields("missing name".to_string());
    write_error_to(&err, "admin@example.com", &mut buf).unwrap();
    let out = String::from_utf8(buf).unwrap();

    assert!(out.starts_with("Status: 400 Bad Request\r\n"));
    assert!(out.contains("<H1>NOT complete!</H1>"));
    assert!(out.contains("history.back()"));
}

#[tokio::test]
async fn test_deliver_success() {
    let mut transport = MockMailTransport::new();
    transport
        .expect_send()
        .withf(|form: &FormData| form.field("to") == "info@example.com")
        .times(1)
        .returning(|_| Ok(exit_code(0)));

    let form = complete_form().with_field("feedback", "<p>Sent</p>");
    let outcome = deliver(&form, &transport).await.unwrap();
    assert_eq!(outcome, Outcome::Feedback("<p>Sent</p>".to_string()));
}

#[tokio::test]
async fn test_deliver_incomplete_never_sends() {
    let mut transport = MockMailTransport::new();
    transport.expect_send().times(0);

    let form = complete_form().with_field("from", "");
    let err = deliver(&form, &transport).await.unwrap_err();
    assert!(matches!(err, Error::IncompleteRequiredFields(_)));
}

#[tokio::test]
async fn test_deliver_bad_location_never_sends() {
    let mut transport = MockMailTransport::new();
    transport.expect_send().times(0);

    let form = complete_form().with_field("location", "/x\nLocation: /y");
    let err = deliver(&form, &transport).await.unwrap_err();
    assert!(matches!(err, Error::HeaderInjection(_)));
}

#[tokio::test]
async fn test_deliver_mailer_failure() {
    let mut transport = MockMailTransport::new();
    transport.expect_send().times(1).returning(|_| Ok(exit_code(1)));

    let err = deliver(&complete_form(), &transport).await.unwrap_err();
    assert!(matches!(err, Error::MailerFailed(_)));
}

#[tokio::test]
async fn test_deliver_propagates_transport_error() {
    let mut transport = MockMailTransport::new();
    transport
        .expect_send()
        .times(1)
        .returning(|form| Err(Error::RecipientNotAllowed(form.field("to").to_string())));

    let err = deliver(&complete_form(), &transport).await.unwrap_err();
    assert!(matches!(err, Error::RecipientNotAllowed(ref to) if to == "info@example.com"));
}

#[test]
fn test_redact_query_string() {
    assert_eq!(
        redact_query_string("name=Ada&password=hunter2&api_key=abc&x"),
        "name=Ada&password=***redacted***&api_key=***redacted***&x"
    );
    assert_eq!(redact_query_string(""), "");
}

#[test]
fn test_redact_value_for_log() {
    assert_eq!(redact_value_for_log("CONTENT_TYPE", "application/x-www-form-urlencoded"), "application/x-www-form-urlencoded");
    assert_eq!(redact_value_for_log("QUERY_STRING", "token=abc"), "token=***redacted***");

    let long = "a".repeat(300);
    let redacted = redact_value_for_log("HTTP_USER_AGENT", &long);
    assert!(redacted.ends_with("...[truncated]"));
    assert_eq!(redacted.len(), 200 + "...[truncated]".len());
}

#[test]
fn test_is_sensitive_key_like() {
    assert!(is_sensitive_key_like("password"));
    assert!(is_sensitive_key_like("session_id"));
    assert!(!is_sensitive_key_like("subject"));
}

#[test]
fn test_log_error_to_file_appends() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("formrelay_error.log");

    log_error_to_file(&path, "first failure");
    log_error_to_file(&path, "second failure");

    let contents = std::fs::read_to_string(&path).unwrap();
    assert_eq!(contents.matches("FORMRELAY CGI ERROR").count(), 2);
    assert!(contents.contains("first failure"));
    assert!(contents.contains("second failure"));
    assert!(contents.contains(&format!("Process ID: {}", std::process::id())));
}
