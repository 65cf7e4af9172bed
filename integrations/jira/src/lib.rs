//! Ticketing through the Jira REST API
//!
//! ## Configuration
//!
//! Environment variables (each also readable from `<NAME>_FILE`):
//! - `JIRA_URL` - Jira base URL (e.g., "https://jira.example.com")
//! - `JIRA_USER` - Account used to open tickets
//! - `JIRA_TOKEN` - API token or password for that account

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{error, info, instrument};
use zbxutil_core::{get_secret, Error, Logger, Result};

fn default_issue_type() -> String {
    "Task".to_string()
}

/// Flat ticket record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub summary: String,
    /// Project key (e.g., "OPS")
    pub project: String,
    /// Reporter account name
    pub owner: String,
    pub assignee: String,
    pub priority: String,
    pub description: String,
    #[serde(default = "default_issue_type")]
    pub issue_type: String,
}

impl Ticket {
    pub fn new(
        summary: impl Into<String>,
        project: impl Into<String>,
        owner: impl Into<String>,
        assignee: impl Into<String>,
        priority: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            summary: summary.into(),
            project: project.into(),
            owner: owner.into(),
            assignee: assignee.into(),
            priority: priority.into(),
            description: description.into(),
            issue_type: default_issue_type(),
        }
    }

    pub fn with_issue_type(mut self, issue_type: impl Into<String>) -> Self {
        self.issue_type = issue_type.into();
        self
    }

    /// `fields` object for issue creation; blank people/priority are omitted
    fn fields(&self) -> Value {
        let mut fields = json!({
            "project": {"key": self.project},
            "summary": self.summary,
            "description": self.description,
            "issuetype": {"name": self.issue_type},
        });

        if !self.owner.is_empty() {
            fields["reporter"] = json!({"name": self.owner});
        }
        if !self.assignee.is_empty() {
            fields["assignee"] = json!({"name": self.assignee});
        }
        if !self.priority.is_empty() {
            fields["priority"] = json!({"name": self.priority});
        }

        fields
    }
}

#[derive(Debug, Deserialize)]
struct CreatedIssue {
    key: String,
}

#[derive(Debug, Deserialize)]
struct CreatedComment {
    id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorCollection {
    #[serde(default)]
    error_messages: Vec<String>,
    #[serde(default)]
    errors: std::collections::BTreeMap<String, String>,
}

impl ErrorCollection {
    fn summary(&self) -> String {
        self.error_messages
            .iter()
            .cloned()
            .chain(self.errors.iter().map(|(field, msg)| format!("{}: {}", field, msg)))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Jira REST client
#[derive(Debug, Clone)]
pub struct JiraClient {
    client: Client,
    base_url: String,
    user: String,
    token: String,
    logger: Logger,
}

impl JiraClient {
    /// Create a new client from environment variables
    pub fn new(client: Client, logger: Logger) -> Result<Self> {
        let base_url = get_secret("JIRA_URL")
            .ok_or_else(|| Error::ConfigError("JIRA_URL not configured".to_string()))?;
        let user = get_secret("JIRA_USER")
            .ok_or_else(|| Error::ConfigError("JIRA_USER not configured".to_string()))?;
        let token = get_secret("JIRA_TOKEN")
            .ok_or_else(|| Error::ConfigError("JIRA_TOKEN not configured".to_string()))?;

        Ok(Self::with_credentials(client, base_url, user, token, logger))
    }

    /// Create a new client with explicit URL and credentials
    pub fn with_credentials(
        client: Client,
        base_url: impl Into<String>,
        user: impl Into<String>,
        token: impl Into<String>,
        logger: Logger,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            user: user.into(),
            token: token.into(),
            logger,
        }
    }

    /// Open a ticket and return its key (e.g., "OPS-123")
    #[instrument(skip(self, ticket), fields(project = %ticket.project))]
    pub async fn create_ticket(&self, ticket: &Ticket) -> Result<String> {
        let url = format!("{}/rest/api/2/issue", self.base_url.trim_end_matches('/'));
        let body = self
            .post(&url, &json!({"fields": ticket.fields()}))
            .await?;

        let created: CreatedIssue = serde_json::from_value(body)
            .map_err(|e| self.fail(format!("Unexpected create response: {}", e)))?;

        self.logger
            .in_scope(|| info!(key = %created.key, "Ticket opened: {}", created.key));
        Ok(created.key)
    }

    /// Comment on an existing ticket, returning the comment id
    #[instrument(skip(self, comment))]
    pub async fn add_comment(&self, key: &str, comment: &str) -> Result<String> {
        let url = format!(
            "{}/rest/api/2/issue/{}/comment",
            self.base_url.trim_end_matches('/'),
            key
        );
        let body = self.post(&url, &json!({"body": comment})).await?;

        let created: CreatedComment = serde_json::from_value(body)
            .map_err(|e| self.fail(format!("Unexpected comment response: {}", e)))?;

        self.logger
            .in_scope(|| info!(key = %key, comment_id = %created.id, "Comment added"));
        Ok(created.id)
    }

    async fn post(&self, url: &str, body: &Value) -> Result<Value> {
        let response = self
            .client
            .post(url)
            .basic_auth(&self.user, Some(&self.token))
            .json(body)
            .send()
            .await
            .map_err(|e| self.fail(format!("Jira request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown".to_string());
            let detail = serde_json::from_str::<ErrorCollection>(&error_body)
                .map(|e| e.summary())
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or(error_body);
            return Err(self.fail(format!("Jira error: {} - {}", status, detail)));
        }

        response
            .json()
            .await
            .map_err(|e| self.fail(format!("Invalid Jira response: {}", e)))
    }

    fn fail(&self, message: String) -> Error {
        self.logger.in_scope(|| error!("{}", message));
        Error::TicketError(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zbxutil_core::testing::{CannedResponse, MockHttpServer};
    use zbxutil_core::LogBuffer;

    fn client(server: &MockHttpServer, logs: &LogBuffer) -> JiraClient {
        JiraClient::with_credentials(
            Client::new(),
            server.url(),
            "automation",
            "api-token",
            Logger::from_writer("jira", logs.clone()),
        )
    }

    fn ticket() -> Ticket {
        Ticket::new(
            "web01 unreachable",
            "OPS",
            "automation",
            "oncall",
            "High",
            "Ping failed for 5 minutes",
        )
    }

    #[test]
    fn test_fields_omit_blank_people() {
        let fields = Ticket::new("s", "OPS", "", "", "", "d").fields();
        assert!(fields.get("reporter").is_none());
        assert!(fields.get("assignee").is_none());
        assert!(fields.get("priority").is_none());
        assert_eq!(fields["issuetype"]["name"], "Task");
    }

    #[test]
    fn test_ticket_deserializes_with_default_issue_type() {
        let ticket: Ticket = serde_json::from_value(json!({
            "summary": "s", "project": "OPS", "owner": "a",
            "assignee": "b", "priority": "Low", "description": "d"
        }))
        .unwrap();
        assert_eq!(ticket.issue_type, "Task");
    }

    #[tokio::test]
    async fn test_create_ticket_returns_key() {
        let server = MockHttpServer::start(vec![CannedResponse::json(
            201,
            json!({"id": "10000", "key": "OPS-17", "self": "http://jira/rest/api/2/issue/10000"}),
        )])
        .await;
        let logs = LogBuffer::new();

        let key = client(&server, &logs).create_ticket(&ticket()).await.unwrap();

        assert_eq!(key, "OPS-17");
        let request = &server.requests()[0];
        assert_eq!(request.path, "/rest/api/2/issue");
        assert!(request.header("authorization").unwrap().starts_with("Basic "));
        let fields = &request.json()["fields"];
        assert_eq!(fields["project"]["key"], "OPS");
        assert_eq!(fields["summary"], "web01 unreachable");
        assert_eq!(fields["reporter"]["name"], "automation");
        assert_eq!(fields["assignee"]["name"], "oncall");
        assert_eq!(fields["priority"]["name"], "High");
        assert!(logs.contents().contains("OPS-17"));
    }

    #[tokio::test]
    async fn test_add_comment() {
        let server = MockHttpServer::start(vec![CannedResponse::json(
            201,
            json!({"id": "10010", "body": "Recovered"}),
        )])
        .await;
        let logs = LogBuffer::new();

        let id = client(&server, &logs)
            .add_comment("OPS-17", "Recovered")
            .await
            .unwrap();

        assert_eq!(id, "10010");
        let request = &server.requests()[0];
        assert_eq!(request.path, "/rest/api/2/issue/OPS-17/comment");
        assert_eq!(request.json(), json!({"body": "Recovered"}));
    }

    #[tokio::test]
    async fn test_error_collection_is_summarised_and_logged() {
        let server = MockHttpServer::start(vec![CannedResponse::json(
            400,
            json!({"errorMessages": [], "errors": {"project": "valid project is required"}}),
        )])
        .await;
        let logs = LogBuffer::new();

        let err = client(&server, &logs)
            .create_ticket(&ticket())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::TicketError(ref msg) if msg.contains("project: valid project is required")));
        assert!(logs.contents().contains("ERROR"));
    }

    #[test]
    fn test_from_env_requires_url() {
        std::env::remove_var("JIRA_URL");
        std::env::remove_var("JIRA_URL_FILE");
        let err = JiraClient::new(Client::new(), Logger::from_writer("jira", LogBuffer::new()))
            .unwrap_err();
        assert!(matches!(err, Error::ConfigError(ref msg) if msg.contains("JIRA_URL")));
    }

    #[tokio::test]
    async fn test_plain_text_error_body_is_kept() {
        let server = MockHttpServer::start(vec![CannedResponse::text(401, "Unauthorized")]).await;
        let logs = LogBuffer::new();

        let err = client(&server, &logs)
            .add_comment("OPS-1", "x")
            .await
            .unwrap_err();

        assert!(matches!(err, Error::TicketError(ref msg) if msg.contains("Unauthorized")));
    }
}
