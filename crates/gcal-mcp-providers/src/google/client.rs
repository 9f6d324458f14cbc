//! Google Calendar API v3 client.
//!
//! Responses are returned as raw JSON; callers receive exactly what the API
//! sent.

use std::time::Duration;

use gcal_mcp_core::{CreateEventArgs, DeleteEventArgs, FreeBusyArgs, ListEventsArgs, UpdateEventArgs};
use reqwest::{Method, RequestBuilder};
use serde_json::{Map, Value};
use tracing::debug;
use url::Url;

use crate::error::{ProviderError, ProviderResult};

/// Calendar API client bound to one access token.
#[derive(Debug)]
pub struct GoogleCalendarClient {
    http_client: reqwest::Client,
    base_url: Url,
    access_token: String,
}

impl GoogleCalendarClient {
    /// Creates a client. `base_url` must end with `/`.
    pub fn new(
        base_url: Url,
        access_token: impl Into<String>,
        timeout: Duration,
        user_agent: &str,
    ) -> ProviderResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| {
                ProviderError::internal(format!("failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            http_client,
            base_url,
            access_token: access_token.into(),
        })
    }

    pub fn set_access_token(&mut self, token: impl Into<String>) {
        self.access_token = token.into();
    }

    /// `GET calendars/{calendarId}/events`
    pub async fn list_events(&self, args: &ListEventsArgs) -> ProviderResult<Value> {
        let url = self.endpoint(&["calendars", &args.calendar_id, "events"])?;
        let request = self
            .http_client
            .get(url)
            .query(&list_events_query(args));
        self.send(request).await
    }

    /// `GET users/me/calendarList`
    pub async fn list_calendars(&self) -> ProviderResult<Value> {
        let url = self.endpoint(&["users", "me", "calendarList"])?;
        self.send(self.http_client.get(url)).await
    }

    /// `POST freeBusy`
    pub async fn query_free_busy(&self, args: &FreeBusyArgs) -> ProviderResult<Value> {
        let url = self.endpoint(&["freeBusy"])?;
        self.send(self.http_client.post(url).json(&args.body)).await
    }

    /// `POST calendars/{calendarId}/events`
    pub async fn insert_event(&self, args: &CreateEventArgs) -> ProviderResult<Value> {
        let url = self.endpoint(&["calendars", &args.calendar_id, "events"])?;
        let request = self
            .http_client
            .post(url)
            .query(&insert_event_query(args))
            .json(args.event.fields());
        self.send(request).await
    }

    /// `PATCH calendars/{calendarId}/events/{eventId}`
    pub async fn patch_event(&self, args: &UpdateEventArgs) -> ProviderResult<Value> {
        let url = self.endpoint(&["calendars", &args.calendar_id, "events", &args.event_id])?;
        let request = self
            .http_client
            .request(Method::PATCH, url)
            .query(&[("sendUpdates", args.send_updates.as_str())])
            .json(args.event.fields());
        self.send(request).await
    }

    /// `DELETE calendars/{calendarId}/events/{eventId}`
    pub async fn delete_event(&self, args: &DeleteEventArgs) -> ProviderResult<Value> {
        let url = self.endpoint(&["calendars", &args.calendar_id, "events", &args.event_id])?;
        let request = self
            .http_client
            .delete(url)
            .query(&[("sendUpdates", args.send_updates.as_str())]);
        self.send(request).await
    }

    /// Joins percent-encoded path segments onto the base URL.
    fn endpoint(&self, segments: &[&str]) -> ProviderResult<Url> {
        let path = segments
            .iter()
            .map(|s| urlencoding::encode(s).into_owned())
            .collect::<Vec<_>>()
            .join("/");
        self.base_url
            .join(&path)
            .map_err(|e| ProviderError::internal(format!("failed to build URL for {}: {}", path, e)))
    }

    async fn send(&self, request: RequestBuilder) -> ProviderResult<Value> {
        let response = request
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        debug!(status = status.as_u16(), url = %response.url(), "calendar API response");

        let body = response.text().await.map_err(|e| {
            ProviderError::network(format!("failed to read response: {}", e)).with_source(e)
        })?;

        if !status.is_success() {
            return Err(api_error(status.as_u16(), &body));
        }

        parse_body(&body)
    }
}

fn transport_error(e: reqwest::Error) -> ProviderError {
    let error = if e.is_timeout() {
        ProviderError::timeout("request timed out")
    } else if e.is_connect() {
        ProviderError::network(format!("connection failed: {}", e))
    } else {
        ProviderError::network(format!("request failed: {}", e))
    };
    error.with_source(e)
}

/// Query parameters for events.list. Unset arguments are not sent.
pub(crate) fn list_events_query(args: &ListEventsArgs) -> Vec<(&'static str, String)> {
    let mut query = Vec::new();
    if let Some(ref time_min) = args.time_min {
        query.push(("timeMin", time_min.clone()));
    }
    if let Some(ref time_max) = args.time_max {
        query.push(("timeMax", time_max.clone()));
    }
    if let Some(max) = args.max_results {
        query.push(("maxResults", max.to_string()));
    }
    if let Some(single) = args.single_events {
        query.push(("singleEvents", single.to_string()));
    }
    if let Some(order) = args.order_by {
        query.push(("orderBy", order.as_str().to_string()));
    }
    query
}

/// Query parameters for events.insert.
pub(crate) fn insert_event_query(args: &CreateEventArgs) -> Vec<(&'static str, &'static str)> {
    let mut query = Vec::new();
    if args.event.has_conference_data() {
        query.push(("conferenceDataVersion", "1"));
    }
    if args.event.has_attachments() {
        query.push(("supportsAttachments", "true"));
    }
    query
}

/// Builds the error for a non-2xx response.
///
/// Google wraps errors as `{"error": {"code": 404, "message": "Not Found"}}`;
/// the message is kept verbatim. Other bodies are used as-is.
pub(crate) fn api_error(status: u16, body: &str) -> ProviderError {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(Value::as_str)
                .map(String::from)
        })
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                format!("HTTP {}", status)
            } else {
                trimmed.to_string()
            }
        });
    ProviderError::from_status(status, message).with_provider("google")
}

/// Parses a success body. An empty body (events.delete) becomes `{}`.
pub(crate) fn parse_body(body: &str) -> ProviderResult<Value> {
    if body.trim().is_empty() {
        return Ok(Value::Object(Map::new()));
    }
    serde_json::from_str(body)
        .map_err(|e| ProviderError::invalid_response(format!("failed to parse response: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderErrorCode;
    use crate::google::mock_http::MockServer;
    use gcal_mcp_core::{EventBody, EventOrder, SendUpdates};
    use serde_json::json;

    fn client_for(server: &MockServer) -> GoogleCalendarClient {
        let base = Url::parse(&server.url("calendar/v3/")).unwrap();
        GoogleCalendarClient::new(base, "token-1", Duration::from_secs(5), "gcal-mcp-test").unwrap()
    }

    fn event(value: Value) -> EventBody {
        EventBody::new(value.as_object().cloned().unwrap())
    }

    #[test]
    fn list_query_only_has_set_fields() {
        assert!(list_events_query(&ListEventsArgs::new("primary")).is_empty());

        let mut args = ListEventsArgs::new("primary");
        args.time_min = Some("2024-12-14T00:00:00Z".into());
        args.max_results = Some(10);
        args.order_by = Some(EventOrder::StartTime);
        assert_eq!(
            list_events_query(&args),
            vec![
                ("timeMin", "2024-12-14T00:00:00Z".to_string()),
                ("maxResults", "10".to_string()),
                ("orderBy", "startTime".to_string()),
            ]
        );
    }

    #[test]
    fn insert_query_flags() {
        let plain = CreateEventArgs {
            calendar_id: "primary".into(),
            event: event(json!({"summary": "x"})),
        };
        assert!(insert_event_query(&plain).is_empty());

        let rich = CreateEventArgs {
            calendar_id: "primary".into(),
            event: event(json!({
                "conferenceData": {"createRequest": {"requestId": "r1"}},
                "attachments": [{"fileUrl": "https://drive.google.com/x"}]
            })),
        };
        assert_eq!(
            insert_event_query(&rich),
            vec![("conferenceDataVersion", "1"), ("supportsAttachments", "true")]
        );
    }

    #[test]
    fn api_error_extracts_google_message() {
        let err = api_error(
            404,
            r#"{"error": {"code": 404, "message": "Not Found", "errors": [{"reason": "notFound"}]}}"#,
        );
        assert_eq!(err.code(), ProviderErrorCode::NotFound);
        assert_eq!(err.status(), Some(404));
        assert_eq!(err.message(), "Not Found");

        let err = api_error(502, "<html>Bad Gateway</html>\n");
        assert_eq!(err.code(), ProviderErrorCode::ServerError);
        assert_eq!(err.message(), "<html>Bad Gateway</html>");

        assert_eq!(api_error(500, "").message(), "HTTP 500");
    }

    #[test]
    fn empty_body_is_empty_object() {
        assert_eq!(parse_body("").unwrap(), json!({}));
        assert_eq!(parse_body(" \n").unwrap(), json!({}));
        assert!(parse_body("{").is_err());
    }

    #[tokio::test]
    async fn list_events_request() {
        let server = MockServer::start(vec![(200, r#"{"kind": "calendar#events", "items": []}"#.into())]).await;
        let client = client_for(&server);

        let mut args = ListEventsArgs::new("team@example.com");
        args.single_events = Some(true);
        let response = client.list_events(&args).await.unwrap();
        assert_eq!(response, json!({"kind": "calendar#events", "items": []}));

        let requests = server.requests();
        assert_eq!(requests[0].method, "GET");
        assert_eq!(
            requests[0].target,
            "/calendar/v3/calendars/team%40example.com/events?singleEvents=true"
        );
        assert_eq!(requests[0].header("authorization"), Some("Bearer token-1"));
    }

    #[tokio::test]
    async fn insert_sends_event_body_verbatim() {
        let server = MockServer::start(vec![(200, r#"{"id": "evt1", "status": "confirmed"}"#.into())]).await;
        let client = client_for(&server);

        let body = json!({
            "summary": "Sync",
            "start": {"dateTime": "2024-12-14T09:00:00-07:00"},
            "end": {"dateTime": "2024-12-14T10:00:00-07:00"},
            "conferenceData": {"createRequest": {"requestId": "abc"}}
        });
        let args = CreateEventArgs {
            calendar_id: "primary".into(),
            event: event(body.clone()),
        };
        let response = client.insert_event(&args).await.unwrap();
        assert_eq!(response["id"], "evt1");

        let requests = server.requests();
        assert_eq!(requests[0].method, "POST");
        assert_eq!(
            requests[0].target,
            "/calendar/v3/calendars/primary/events?conferenceDataVersion=1"
        );
        let sent: Value = serde_json::from_str(&requests[0].body).unwrap();
        assert_eq!(sent, body);
    }

    #[tokio::test]
    async fn patch_and_delete_send_updates() {
        let server = MockServer::start(vec![
            (200, r#"{"id": "evt1", "summary": "Renamed"}"#.into()),
            (200, String::new()),
        ])
        .await;
        let client = client_for(&server);

        let update = UpdateEventArgs {
            calendar_id: "primary".into(),
            event_id: "evt1".into(),
            event: event(json!({"summary": "Renamed"})),
            send_updates: SendUpdates::ExternalOnly,
        };
        client.patch_event(&update).await.unwrap();

        let delete = DeleteEventArgs {
            calendar_id: "primary".into(),
            event_id: "evt1".into(),
            send_updates: SendUpdates::All,
        };
        assert_eq!(client.delete_event(&delete).await.unwrap(), json!({}));

        let requests = server.requests();
        assert_eq!(requests[0].method, "PATCH");
        assert_eq!(
            requests[0].target,
            "/calendar/v3/calendars/primary/events/evt1?sendUpdates=externalOnly"
        );
        assert_eq!(requests[1].method, "DELETE");
        assert_eq!(
            requests[1].target,
            "/calendar/v3/calendars/primary/events/evt1?sendUpdates=all"
        );
    }

    #[tokio::test]
    async fn free_busy_posts_raw_body() {
        let server = MockServer::start(vec![(200, r#"{"calendars": {}}"#.into())]).await;
        let client = client_for(&server);

        let body = json!({"timeMin": "a", "timeMax": "b", "items": [{"id": "primary"}], "extra": 1});
        let args = FreeBusyArgs {
            body: body.as_object().cloned().unwrap(),
        };
        client.query_free_busy(&args).await.unwrap();

        let requests = server.requests();
        assert_eq!(requests[0].target, "/calendar/v3/freeBusy");
        let sent: Value = serde_json::from_str(&requests[0].body).unwrap();
        assert_eq!(sent, body);
    }

    #[tokio::test]
    async fn error_status_is_propagated() {
        let server = MockServer::start(vec![(
            403,
            r#"{"error": {"code": 403, "message": "Rate Limit Exceeded"}}"#.into(),
        )])
        .await;
        let client = client_for(&server);

        let err = client.list_calendars().await.unwrap_err();
        assert_eq!(err.status(), Some(403));
        assert_eq!(err.message(), "Rate Limit Exceeded");
        assert_eq!(err.provider(), Some("google"));
    }
}
