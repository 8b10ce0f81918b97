//! Registry client
//!
//! [`RegistryClient`] is the seam between the migration logic and a live
//! schema registry. [`HttpRegistryClient`] speaks the registry's REST API over
//! blocking HTTP with optional basic authentication.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::config::RegistryConfig;
use crate::error::{MigrateError, Result};

const CONTENT_TYPE: &str = "application/vnd.schemaregistry.v1+json";

/// Subject-scoped registry mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Mode {
    /// Accepts versions with explicit version numbers and ids
    Import,
    /// Normal operation, versions are numbered by the server
    ReadWrite,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Import => "IMPORT",
            Mode::ReadWrite => "READWRITE",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operations the migrator needs from a schema registry.
///
/// Subjects are always passed in wire form (`:.ctx:name` or `name`).
/// A registry refusal is reported as [`MigrateError::Rejected`] carrying the
/// raw response body; connection problems as [`MigrateError::Transport`].
pub trait RegistryClient {
    /// All subject names known to the registry
    fn list_subjects(&self) -> Result<Vec<String>>;

    /// All context names, in registry-native `.`-prefixed form
    fn list_contexts(&self) -> Result<Vec<String>>;

    /// Switch a subject's mode
    fn set_mode(&self, subject: &str, mode: Mode) -> Result<()>;

    /// Register one version payload under a subject
    fn register_version(&self, subject: &str, payload: &Value) -> Result<()>;

    /// Version numbers registered under a subject
    fn list_versions(&self, subject: &str) -> Result<Vec<i64>>;

    /// Full payload of one subject version
    fn get_version(&self, subject: &str, version: i64) -> Result<Value>;
}

/// Blocking HTTP client for a schema registry
pub struct HttpRegistryClient {
    base_url: String,
    agent: ureq::Agent,
    authorization: Option<String>,
    force_mode: bool,
}

impl HttpRegistryClient {
    /// Build a client for the registry at `url`
    pub fn new(url: &str, settings: &RegistryConfig) -> Result<Self> {
        let tls = native_tls::TlsConnector::builder()
            .danger_accept_invalid_certs(!settings.verify_tls)
            .danger_accept_invalid_hostnames(!settings.verify_tls)
            .build()?;

        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .tls_connector(Arc::new(tls))
            .build();

        let authorization = match (&settings.username, &settings.password) {
            (Some(user), Some(password)) => Some(basic_auth(user, password)),
            (Some(user), None) => Some(basic_auth(user, "")),
            _ => None,
        };

        Ok(Self {
            base_url: url.trim_end_matches('/').to_string(),
            agent,
            authorization,
            force_mode: settings.force_mode,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: &str, path: &str) -> ureq::Request {
        let url = format!("{}{}", self.base_url, path);
        debug!(%method, %url, "registry request");
        let request = self
            .agent
            .request(method, &url)
            .set("Accept", CONTENT_TYPE)
            .set("Content-Type", CONTENT_TYPE);
        match &self.authorization {
            Some(header) => request.set("Authorization", header),
            None => request,
        }
    }

    fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = send(self.request("GET", path), None)?;
        Ok(response.into_json::<T>()?)
    }
}

impl RegistryClient for HttpRegistryClient {
    fn list_subjects(&self) -> Result<Vec<String>> {
        self.get_json("/subjects")
    }

    fn list_contexts(&self) -> Result<Vec<String>> {
        self.get_json("/contexts")
    }

    fn set_mode(&self, subject: &str, mode: Mode) -> Result<()> {
        let mut path = format!("/mode/{}", urlencoding::encode(subject));
        if self.force_mode {
            path.push_str("?force=true");
        }
        let body = serde_json::json!({ "mode": mode });
        send(self.request("PUT", &path), Some(&body))?;
        Ok(())
    }

    fn register_version(&self, subject: &str, payload: &Value) -> Result<()> {
        let path = format!("/subjects/{}/versions", urlencoding::encode(subject));
        send(self.request("POST", &path), Some(payload))?;
        Ok(())
    }

    fn list_versions(&self, subject: &str) -> Result<Vec<i64>> {
        self.get_json(&format!("/subjects/{}/versions", urlencoding::encode(subject)))
    }

    fn get_version(&self, subject: &str, version: i64) -> Result<Value> {
        self.get_json(&format!(
            "/subjects/{}/versions/{}",
            urlencoding::encode(subject),
            version
        ))
    }
}

fn basic_auth(user: &str, password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{user}:{password}")))
}

fn send(request: ureq::Request, body: Option<&Value>) -> Result<ureq::Response> {
    let result = match body {
        Some(body) => request.send_json(body),
        None => request.call(),
    };
    match result {
        Ok(response) => Ok(response),
        Err(ureq::Error::Status(status, response)) => {
            let body = response
                .into_string()
                .unwrap_or_else(|e| format!("<failed to read response body: {e}>"));
            Err(MigrateError::Rejected { status, body })
        }
        Err(ureq::Error::Transport(transport)) => Err(MigrateError::Transport(transport.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use std::thread;
    use tiny_http::{Header, Response, Server};

    /// What the registry saw of one request
    #[derive(Debug)]
    struct Seen {
        method: String,
        url: String,
        headers: Vec<(String, String)>,
        body: String,
    }

    impl Seen {
        fn header(&self, name: &str) -> Option<&str> {
            self.headers
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.as_str())
        }
    }

    /// Serve exactly one request with the given status and body
    fn serve_once(status: u16, reply: &'static str) -> (String, thread::JoinHandle<Seen>) {
        let server = Server::http("127.0.0.1:0").unwrap();
        let port = server.server_addr().to_ip().unwrap().port();
        let handle = thread::spawn(move || {
            let mut request = server.recv().unwrap();
            let mut body = String::new();
            request.as_reader().read_to_string(&mut body).unwrap();
            let seen = Seen {
                method: request.method().to_string(),
                url: request.url().to_string(),
                headers: request
                    .headers()
                    .iter()
                    .map(|h| (h.field.to_string(), h.value.to_string()))
                    .collect(),
                body,
            };
            let content_type = Header::from_bytes("Content-Type", CONTENT_TYPE).unwrap();
            request
                .respond(
                    Response::from_string(reply)
                        .with_status_code(status)
                        .with_header(content_type),
                )
                .unwrap();
            seen
        });
        (format!("http://127.0.0.1:{port}"), handle)
    }

    fn settings(user: Option<&str>, password: Option<&str>) -> RegistryConfig {
        RegistryConfig {
            username: user.map(String::from),
            password: password.map(String::from),
            ..RegistryConfig::default()
        }
    }

    #[test]
    fn test_mode_wire_names() {
        assert_eq!(serde_json::to_value(Mode::Import).unwrap(), "IMPORT");
        assert_eq!(serde_json::to_value(Mode::ReadWrite).unwrap(), "READWRITE");
        assert_eq!(Mode::ReadWrite.to_string(), "READWRITE");
    }

    #[test]
    fn test_basic_auth_header() {
        assert_eq!(basic_auth("user", "pass"), "Basic dXNlcjpwYXNz");
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = HttpRegistryClient::new("http://localhost:8081/", &RegistryConfig::default()).unwrap();
        assert_eq!(client.base_url(), "http://localhost:8081");
    }

    #[test]
    fn test_set_mode_request() {
        let (url, server) = serve_once(200, r#"{"mode":"IMPORT"}"#);
        let client = HttpRegistryClient::new(&url, &settings(Some("user"), Some("pass"))).unwrap();

        client.set_mode(":.team-a:bar", Mode::Import).unwrap();

        let seen = server.join().unwrap();
        assert_eq!(seen.method, "PUT");
        assert_eq!(seen.url, "/mode/%3A.team-a%3Abar?force=true");
        assert_eq!(seen.header("Content-Type"), Some(CONTENT_TYPE));
        assert_eq!(seen.header("Authorization"), Some("Basic dXNlcjpwYXNz"));
        let body: Value = serde_json::from_str(&seen.body).unwrap();
        assert_eq!(body, serde_json::json!({"mode": "IMPORT"}));
    }

    #[test]
    fn test_set_mode_without_force() {
        let (url, server) = serve_once(200, r#"{"mode":"READWRITE"}"#);
        let config = RegistryConfig {
            force_mode: false,
            ..RegistryConfig::default()
        };
        let client = HttpRegistryClient::new(&url, &config).unwrap();

        client.set_mode("foo", Mode::ReadWrite).unwrap();

        let seen = server.join().unwrap();
        assert_eq!(seen.url, "/mode/foo");
        assert_eq!(seen.header("Authorization"), None);
    }

    #[test]
    fn test_register_version_request() {
        let (url, server) = serve_once(200, r#"{"id":1001}"#);
        let client = HttpRegistryClient::new(&url, &settings(None, None)).unwrap();
        let payload = serde_json::json!({"version": 1, "id": 1001, "schema": "\"string\""});

        client.register_version(":.a.b:foo", &payload).unwrap();

        let seen = server.join().unwrap();
        assert_eq!(seen.method, "POST");
        assert_eq!(seen.url, "/subjects/%3A.a.b%3Afoo/versions");
        assert_eq!(seen.header("Content-Type"), Some(CONTENT_TYPE));
        assert_eq!(serde_json::from_str::<Value>(&seen.body).unwrap(), payload);
    }

    #[test]
    fn test_rejection_body_passed_through() {
        let reply = r#"{"error_code":409,"message":"Schema being registered is incompatible"}"#;
        let (url, server) = serve_once(409, reply);
        let client = HttpRegistryClient::new(&url, &settings(None, None)).unwrap();

        let err = client
            .register_version("foo", &serde_json::json!({"version": 2, "schema": "{}"}))
            .unwrap_err();

        server.join().unwrap();
        match err {
            MigrateError::Rejected { status, body } => {
                assert_eq!(status, 409);
                assert_eq!(body, reply);
            }
            other => panic!("Expected Rejected, got {:?}", other),
        }
    }

    #[test]
    fn test_list_subjects_request() {
        let (url, server) = serve_once(200, r#"["orders-value",":.team-a:invoice"]"#);
        let client = HttpRegistryClient::new(&url, &settings(None, None)).unwrap();

        let subjects = client.list_subjects().unwrap();

        let seen = server.join().unwrap();
        assert_eq!(seen.method, "GET");
        assert_eq!(seen.url, "/subjects");
        assert_eq!(subjects, vec!["orders-value", ":.team-a:invoice"]);
    }

    #[test]
    fn test_unreachable_registry_is_transport_error() {
        let port = {
            let server = Server::http("127.0.0.1:0").unwrap();
            server.server_addr().to_ip().unwrap().port()
        };
        let client = HttpRegistryClient::new(&format!("http://127.0.0.1:{port}"), &settings(None, None)).unwrap();

        assert!(matches!(client.list_contexts(), Err(MigrateError::Transport(_))));
    }
}
