//! User data document behind an HTTP endpoint

use reqwest::StatusCode;
use serde::Deserialize;

use super::RemoteUserData;
use crate::models::UserData;
use crate::util::{is_http_url, normalize_text_option};
use crate::{Error, Result};

const MAX_ERROR_BODY_CHARS: usize = 180;

/// `GET`/`PUT` of the JSON document at a fixed URL.
#[derive(Clone)]
pub struct HttpRemote {
    endpoint: String,
    token: Option<String>,
    client: reqwest::Client,
}

impl std::fmt::Debug for HttpRemote {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("HttpRemote")
            .field("endpoint", &self.endpoint)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish_non_exhaustive()
    }
}

impl HttpRemote {
    pub fn new(endpoint: impl Into<String>, token: Option<String>) -> Result<Self> {
        Ok(Self {
            endpoint: normalize_endpoint(endpoint.into())?,
            token: normalize_text_option(token),
            client: reqwest::Client::builder().build()?,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

impl RemoteUserData for HttpRemote {
    async fn fetch(&self) -> Result<UserData> {
        let response = self
            .authorize(self.client.get(&self.endpoint))
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            tracing::debug!("Remote {} holds no user data yet", self.endpoint);
            return Ok(UserData::default());
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Remote(parse_api_error(status, &body)));
        }

        UserData::from_json_str(&response.text().await?)
    }

    async fn push(&self, data: &UserData) -> Result<()> {
        let response = self
            .authorize(self.client.put(&self.endpoint))
            .json(data)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Remote(parse_api_error(status, &body)));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct RemoteErrorBody {
    error: Option<String>,
    message: Option<String>,
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<RemoteErrorBody>(body) {
        if let Some(message) = payload.message.or(payload.error) {
            return format!("{} ({})", message.trim(), status.as_u16());
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        let excerpt = trimmed.chars().take(MAX_ERROR_BODY_CHARS).collect::<String>();
        format!("{excerpt} ({})", status.as_u16())
    }
}

fn normalize_endpoint(raw: String) -> Result<String> {
    let endpoint = normalize_text_option(Some(raw))
        .ok_or_else(|| Error::Config("remote URL must not be empty".to_string()))?;
    if is_http_url(&endpoint) {
        Ok(endpoint.trim_end_matches('/').to_string())
    } else {
        Err(Error::Config(
            "remote URL must include http:// or https://".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BookmarkedSession, ReservationStatus, ReservedSession};
    use pretty_assertions::assert_eq;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::task::JoinHandle;

    /// Serve one canned response and hand back the raw request text.
    async fn serve_once(status_line: &'static str, body: String) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/users/me", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let request = read_request(&mut socket).await;
            let response = format!(
                "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            request
        });

        (url, handle)
    }

    async fn read_request(socket: &mut TcpStream) -> String {
        let mut raw = Vec::new();
        let mut chunk = [0_u8; 1024];
        loop {
            let read = socket.read(&mut chunk).await.unwrap();
            if read == 0 {
                break;
            }
            raw.extend_from_slice(&chunk[..read]);

            let text = String::from_utf8_lossy(&raw);
            if let Some(header_end) = text.find("\r\n\r\n") {
                let content_length = text[..header_end]
                    .lines()
                    .filter_map(|line| line.split_once(':'))
                    .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
                    .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if raw.len() >= header_end + 4 + content_length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&raw).into_owned()
    }

    fn request_body(request: &str) -> &str {
        request
            .split_once("\r\n\r\n")
            .map_or("", |(_, body)| body)
    }

    fn sample() -> UserData {
        let mut data = UserData::default();
        data.insert_bookmark(BookmarkedSession::new("keynote", true, 100));
        data.insert_reservation(ReservedSession::new("lab", ReservationStatus::Waitlisted, 200));
        data
    }

    #[tokio::test]
    async fn fetch_of_missing_document_is_empty_user_data() {
        let (url, server) = serve_once("404 Not Found", String::new()).await;
        let remote = HttpRemote::new(url, None).unwrap();

        assert!(remote.fetch().await.unwrap().is_empty());
        server.await.unwrap();
    }

    #[tokio::test]
    async fn fetch_sends_bearer_token_and_parses_document() {
        let body = sample().to_json_string().unwrap();
        let (url, server) = serve_once("200 OK", body).await;
        let remote = HttpRemote::new(url, Some(" secret ".to_string())).unwrap();

        assert_eq!(remote.fetch().await.unwrap(), sample());

        let request = server.await.unwrap().to_ascii_lowercase();
        assert!(request.starts_with("get /users/me "));
        assert!(request.contains("authorization: bearer secret\r\n"));
    }

    #[tokio::test]
    async fn fetch_error_status_is_a_remote_error() {
        let (url, server) = serve_once(
            "500 Internal Server Error",
            r#"{"message":"store unavailable"}"#.to_string(),
        )
        .await;
        let remote = HttpRemote::new(url, None).unwrap();

        let error = remote.fetch().await.unwrap_err();
        match error {
            Error::Remote(message) => assert_eq!(message, "store unavailable (500)"),
            other => panic!("unexpected error: {other:?}"),
        }
        server.await.unwrap();
    }

    #[tokio::test]
    async fn push_puts_json_document_without_token() {
        let (url, server) = serve_once("200 OK", String::new()).await;
        let remote = HttpRemote::new(url, None).unwrap();

        remote.push(&sample()).await.unwrap();

        let request = server.await.unwrap();
        let lowered = request.to_ascii_lowercase();
        assert!(lowered.starts_with("put /users/me "));
        assert!(lowered.contains("content-type: application/json"));
        assert!(!lowered.contains("authorization:"));
        assert_eq!(UserData::from_json_str(request_body(&request)).unwrap(), sample());
    }

    #[tokio::test]
    async fn push_rejection_is_a_remote_error() {
        let (url, server) =
            serve_once("403 Forbidden", r#"{"error":"read only"}"#.to_string()).await;
        let remote = HttpRemote::new(url, Some("token".to_string())).unwrap();

        let error = remote.push(&sample()).await.unwrap_err();
        assert!(!error.is_storage());
        assert!(matches!(error, Error::Remote(message) if message == "read only (403)"));
        server.await.unwrap();
    }

    #[test]
    fn normalize_endpoint_rejects_invalid_values() {
        assert!(normalize_endpoint(String::new()).is_err());
        assert!(normalize_endpoint("sync.example.com".to_string()).is_err());
        assert_eq!(
            normalize_endpoint(" https://sync.example.com/users/me/ ".to_string()).unwrap(),
            "https://sync.example.com/users/me"
        );
    }

    #[test]
    fn parse_api_error_prefers_message_field() {
        let status = StatusCode::UNAUTHORIZED;
        assert_eq!(
            parse_api_error(status, r#"{"message":" token expired "}"#),
            "token expired (401)"
        );
        assert_eq!(parse_api_error(status, r#"{"error":"denied"}"#), "denied (401)");
        assert_eq!(parse_api_error(status, "  "), "HTTP 401");
        assert_eq!(parse_api_error(status, "nope"), "nope (401)");
        let long = "x".repeat(500);
        assert_eq!(
            parse_api_error(status, &long),
            format!("{} (401)", "x".repeat(MAX_ERROR_BODY_CHARS))
        );
    }

    #[test]
    fn debug_redacts_token() {
        let remote =
            HttpRemote::new("https://sync.example.com", Some("secret".to_string())).unwrap();
        let debug = format!("{remote:?}");
        assert!(!debug.contains("secret"));
        assert!(debug.contains("[REDACTED]"));
    }
}
