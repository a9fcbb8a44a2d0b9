//! # Transport Adapter
//!
//! Remote calls to the Coralogix incidents service go through the
//! [`Transport`] trait. The shipped implementation, [`GrpcurlTransport`],
//! shells out to `grpcurl`; a native gRPC client can replace it without
//! touching the selector, gate or mutator.
//!
//! ## Example
//!
//! ```no_run
//! use incident_ack::config::{Overrides, Settings};
//! use incident_ack::transport::{GrpcurlTransport, RpcMethod, Transport};
//!
//! # async fn example() -> Result<(), incident_ack::Error> {
//! let settings = Settings::resolve(&Overrides::default())?;
//! let transport = GrpcurlTransport::new(&settings);
//! transport.ensure_available()?;
//!
//! let page = transport
//!     .invoke(RpcMethod::ListIncidents, serde_json::json!({}))
//!     .await?;
//! println!("{page}");
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use serde_json::Value;
use tokio::process::Command;
use tracing::debug;

use crate::config::{Action, ApiKey, Settings};
use crate::error::Error;

/// Fully-qualified gRPC service name.
pub const INCIDENTS_SERVICE: &str = "com.coralogixapis.incidents.v1.IncidentsService";

/// Largest response grpcurl will accept (50 MiB).
const MAX_MESSAGE_BYTES: u64 = 52_428_800;

/// Variable carrying the bearer token into the child's environment, so
/// the key never appears on the child's command line.
const TOKEN_ENV: &str = "CX_INCIDENTS_TOKEN";

/// gRPC status code for rejected credentials.
const UNAUTHENTICATED_CODE: i64 = 16;

/// Remote methods used by this tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpcMethod {
    ListIncidents,
    AcknowledgeIncidents,
    ResolveIncidents,
}

impl RpcMethod {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::ListIncidents => "ListIncidents",
            Self::AcknowledgeIncidents => "AcknowledgeIncidents",
            Self::ResolveIncidents => "ResolveIncidents",
        }
    }

    /// `service/method` as grpcurl expects it.
    #[must_use]
    pub fn full_name(self) -> String {
        format!("{INCIDENTS_SERVICE}/{}", self.name())
    }

    /// Mutating method for an action.
    #[must_use]
    pub fn for_action(action: Action) -> Self {
        match action {
            Action::Acknowledge => Self::AcknowledgeIncidents,
            Action::Resolve => Self::ResolveIncidents,
        }
    }
}

impl fmt::Display for RpcMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Issues one remote call and returns the decoded JSON response.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    async fn invoke(&self, method: RpcMethod, request: Value) -> Result<Value, Error>;
}

/// [`Transport`] backed by the `grpcurl` binary.
#[derive(Debug, Clone)]
pub struct GrpcurlTransport {
    binary: String,
    endpoint: String,
    api_key: ApiKey,
    timeout_secs: Option<u64>,
}

impl GrpcurlTransport {
    #[must_use]
    pub fn new(settings: &Settings) -> Self {
        Self {
            binary: settings.grpcurl.clone(),
            endpoint: settings.endpoint.clone(),
            api_key: settings.api_key.clone(),
            timeout_secs: settings.timeout_secs,
        }
    }

    /// Check that the binary can be found before any call is made.
    pub fn ensure_available(&self) -> Result<PathBuf, Error> {
        let path = which::which(&self.binary).map_err(|_| Error::ToolingUnavailable {
            tool: self.binary.clone(),
        })?;
        debug!(path = %path.display(), "Found transport binary");
        Ok(path)
    }

    fn build_args(&self, method: RpcMethod, payload: &str) -> Vec<String> {
        let mut args = vec![
            "-max-msg-sz".to_string(),
            MAX_MESSAGE_BYTES.to_string(),
        ];
        if let Some(secs) = self.timeout_secs {
            args.push("-max-time".to_string());
            args.push(secs.to_string());
        }
        args.push("-expand-headers".to_string());
        args.push("-H".to_string());
        args.push(format!("Authorization: Bearer ${{{TOKEN_ENV}}}"));
        args.push("-d".to_string());
        args.push(payload.to_string());
        args.push(self.endpoint.clone());
        args.push(method.full_name());
        args
    }
}

#[async_trait]
impl Transport for GrpcurlTransport {
    async fn invoke(&self, method: RpcMethod, request: Value) -> Result<Value, Error> {
        let payload = serde_json::to_string(&request).map_err(|e| {
            Error::transport(method.name(), format!("failed to encode request: {e}"))
        })?;
        debug!(%method, endpoint = %self.endpoint, bytes = payload.len(), "Invoking remote method");

        let output = Command::new(&self.binary)
            .args(self.build_args(method, &payload))
            .env(TOKEN_ENV, self.api_key.expose())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == ErrorKind::NotFound {
                    Error::ToolingUnavailable {
                        tool: self.binary.clone(),
                    }
                } else {
                    Error::transport(method.name(), format!("failed to run {}: {e}", self.binary))
                }
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(classify_failure(method, output.status.code(), &stderr, &stdout));
        }

        parse_response(method, &stdout)
    }
}

/// Map a failed invocation to `Auth` or `Transport`.
pub(crate) fn classify_failure(
    method: RpcMethod,
    exit_code: Option<i32>,
    stderr: &str,
    stdout: &str,
) -> Error {
    let diagnostic = if stderr.trim().is_empty() {
        stdout.trim()
    } else {
        stderr.trim()
    };

    if diagnostic.to_lowercase().contains("unauthenticated") {
        return Error::Auth {
            message: status_message(diagnostic),
        };
    }

    let status = exit_code.map_or_else(|| "signal".to_string(), |c| c.to_string());
    Error::transport(method.name(), format!("exit {status}: {diagnostic}"))
}

/// Decode stdout, treating an error envelope as a failure.
pub(crate) fn parse_response(method: RpcMethod, stdout: &str) -> Result<Value, Error> {
    if stdout.trim().is_empty() {
        return Ok(Value::Object(serde_json::Map::new()));
    }

    let value: Value = serde_json::from_str(stdout).map_err(|e| {
        Error::transport(
            method.name(),
            format!("unparsable response ({e}): {}", stdout.trim()),
        )
    })?;

    if let Some(err) = error_envelope(method, &value) {
        return Err(err);
    }
    Ok(value)
}

fn error_envelope(method: RpcMethod, value: &Value) -> Option<Error> {
    let obj = value.as_object()?;
    let code = obj.get("code")?;
    let message = obj.get("message")?.as_str().unwrap_or_default().to_string();

    let unauthenticated = match code {
        Value::Number(n) => {
            if n.as_i64() == Some(0) {
                return None;
            }
            n.as_i64() == Some(UNAUTHENTICATED_CODE)
        }
        Value::String(s) => {
            if s.eq_ignore_ascii_case("ok") {
                return None;
            }
            s.eq_ignore_ascii_case("unauthenticated")
        }
        _ => return None,
    };

    if unauthenticated {
        Some(Error::Auth { message })
    } else {
        Some(Error::transport(
            method.name(),
            format!("remote error {code}: {message}"),
        ))
    }
}

/// Pull the `Message:` line out of grpcurl's error block.
fn status_message(diagnostic: &str) -> String {
    diagnostic
        .lines()
        .find_map(|line| line.trim().strip_prefix("Message:"))
        .map_or_else(|| diagnostic.to_string(), |m| m.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Overrides;
    use serde_json::json;

    fn transport_for(binary: &str) -> GrpcurlTransport {
        let overrides = Overrides {
            api_key: Some("secret-key".to_string()),
            grpcurl: Some(binary.to_string()),
            ..Overrides::default()
        };
        let settings = Settings::resolve_with(&overrides, |_| None).unwrap();
        GrpcurlTransport::new(&settings)
    }

    #[test]
    fn test_method_names() {
        assert_eq!(
            RpcMethod::ListIncidents.full_name(),
            "com.coralogixapis.incidents.v1.IncidentsService/ListIncidents"
        );
        assert_eq!(
            RpcMethod::for_action(Action::Resolve),
            RpcMethod::ResolveIncidents
        );
        assert_eq!(RpcMethod::AcknowledgeIncidents.to_string(), "AcknowledgeIncidents");
    }

    #[test]
    fn test_build_args_keeps_key_off_argv() {
        let transport = transport_for("grpcurl");
        let args = transport.build_args(RpcMethod::ListIncidents, "{}");

        assert_eq!(args[0], "-max-msg-sz");
        assert_eq!(args[1], "52428800");
        assert!(args.windows(2).any(|w| w[0] == "-max-time" && w[1] == "60"));
        assert!(args.contains(&"-expand-headers".to_string()));
        assert!(args.contains(&"Authorization: Bearer ${CX_INCIDENTS_TOKEN}".to_string()));
        assert!(!args.iter().any(|a| a.contains("secret-key")));
        assert_eq!(args[args.len() - 2], "ng-api-grpc.eu1.coralogix.com:443");
        assert!(args[args.len() - 1].ends_with("/ListIncidents"));
    }

    #[test]
    fn test_classify_unauthenticated() {
        let stderr = "ERROR:\n  Code: Unauthenticated\n  Message: invalid api key\n";
        let err = classify_failure(RpcMethod::ListIncidents, Some(1), stderr, "");
        match err {
            Error::Auth { message } => assert_eq!(message, "invalid api key"),
            other => panic!("expected auth error, got {other:?}"),
        }
    }

    #[test]
    fn test_classify_generic_failure_prefers_stderr() {
        let err = classify_failure(
            RpcMethod::AcknowledgeIncidents,
            Some(1),
            "Failed to dial target host",
            "ignored",
        );
        assert_eq!(
            err.to_string(),
            "AcknowledgeIncidents failed: exit 1: Failed to dial target host"
        );

        let err = classify_failure(RpcMethod::ListIncidents, None, "  ", "stdout detail");
        assert!(err.to_string().contains("exit signal: stdout detail"));
    }

    #[test]
    fn test_parse_response_variants() {
        assert_eq!(
            parse_response(RpcMethod::AcknowledgeIncidents, "\n").unwrap(),
            json!({})
        );
        assert_eq!(
            parse_response(RpcMethod::ListIncidents, r#"{"incidents": []}"#).unwrap(),
            json!({"incidents": []})
        );
        assert!(matches!(
            parse_response(RpcMethod::ListIncidents, "not json"),
            Err(Error::Transport { .. })
        ));
    }

    #[test]
    fn test_error_envelope() {
        let auth = parse_response(
            RpcMethod::ListIncidents,
            r#"{"code": 16, "message": "token expired"}"#,
        );
        assert!(matches!(auth, Err(Error::Auth { ref message }) if message == "token expired"));

        let named = parse_response(
            RpcMethod::ListIncidents,
            r#"{"code": "UNAUTHENTICATED", "message": "nope"}"#,
        );
        assert!(matches!(named, Err(Error::Auth { .. })));

        let other = parse_response(
            RpcMethod::ResolveIncidents,
            r#"{"code": 14, "message": "unavailable"}"#,
        )
        .unwrap_err();
        assert!(other.to_string().contains("remote error 14: unavailable"));

        assert!(parse_response(RpcMethod::ListIncidents, r#"{"code": 0, "message": ""}"#).is_ok());
    }

    #[test]
    fn test_missing_binary_is_tooling_unavailable() {
        let transport = transport_for("definitely-not-a-real-grpcurl-binary");
        assert!(matches!(
            transport.ensure_available(),
            Err(Error::ToolingUnavailable { ref tool }) if tool == "definitely-not-a-real-grpcurl-binary"
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_invoke_runs_subprocess() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let write_script = |name: &str, body: &str| {
            let path = dir.path().join(name);
            std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            path.to_string_lossy().to_string()
        };

        // Echo the token from the environment and the method from argv
        let ok = write_script(
            "ok.sh",
            r#"for last; do :; done; printf '{"token":"%s","method":"%s"}' "$CX_INCIDENTS_TOKEN" "$last""#,
        );
        let transport = transport_for(&ok);
        assert!(transport.ensure_available().is_ok());
        let value = transport
            .invoke(RpcMethod::ListIncidents, json!({"page_token": "p1"}))
            .await
            .unwrap();
        assert_eq!(value["token"], "secret-key");
        assert_eq!(value["method"], RpcMethod::ListIncidents.full_name());

        let denied = write_script(
            "denied.sh",
            "echo 'ERROR:' >&2; echo '  Code: Unauthenticated' >&2; echo '  Message: bad key' >&2; exit 1",
        );
        let err = transport_for(&denied)
            .invoke(RpcMethod::ListIncidents, json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Auth { .. }));

        let broken = write_script("broken.sh", "echo 'connection refused' >&2; exit 2");
        let err = transport_for(&broken)
            .invoke(RpcMethod::AcknowledgeIncidents, json!({"incident_ids": ["a"]}))
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "AcknowledgeIncidents failed: exit 2: connection refused"
        );
    }
}
