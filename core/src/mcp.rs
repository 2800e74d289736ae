//! Requests for the backend's `/mcp/message` dispatch endpoint.

use chrono::{NaiveDate, Utc};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum McpMethod {
    GetResolution,
    GetAnswerFromKnowledgeBase,
    GetTodaysEmails,
    Other(String),
}

impl McpMethod {
    /// Methods offered in the UI, in display order.
    pub const KNOWN: [McpMethod; 3] = [
        McpMethod::GetResolution,
        McpMethod::GetAnswerFromKnowledgeBase,
        McpMethod::GetTodaysEmails,
    ];

    pub fn parse(name: &str) -> Self {
        match name {
            "get_resolution" => McpMethod::GetResolution,
            "get_answer_from_KnowledgeBase" => McpMethod::GetAnswerFromKnowledgeBase,
            "get_todays_emails" => McpMethod::GetTodaysEmails,
            other => McpMethod::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            McpMethod::GetResolution => "get_resolution",
            McpMethod::GetAnswerFromKnowledgeBase => "get_answer_from_KnowledgeBase",
            McpMethod::GetTodaysEmails => "get_todays_emails",
            McpMethod::Other(name) => name,
        }
    }

    /// Whether the method takes a free-text query.
    pub fn shows_query(&self) -> bool {
        matches!(
            self,
            McpMethod::GetResolution | McpMethod::GetAnswerFromKnowledgeBase
        )
    }

    pub fn shows_module(&self) -> bool {
        matches!(self, McpMethod::GetResolution)
    }

    fn wants_date(&self) -> bool {
        matches!(self, McpMethod::GetTodaysEmails)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct McpParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct McpRequest {
    pub method: String,
    pub params: McpParams,
}

impl McpRequest {
    /// Builds the body for `method`, keeping only the params it accepts.
    /// Empty query/module inputs are left out.
    pub fn build(method: &McpMethod, query: &str, module: &str, today: NaiveDate) -> Self {
        let query = (method.shows_query() && !query.is_empty()).then(|| query.to_string());
        let module = (method.shows_module() && !module.is_empty()).then(|| module.to_string());
        let date = method
            .wants_date()
            .then(|| today.format("%Y-%m-%d").to_string());

        Self {
            method: method.as_str().to_string(),
            params: McpParams { query, module, date },
        }
    }

    /// [`McpRequest::build`] dated with today's UTC calendar day.
    pub fn for_today(method: &McpMethod, query: &str, module: &str) -> Self {
        Self::build(method, query, module, Utc::now().date_naive())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 7).unwrap()
    }

    fn body(method: &str, query: &str, module: &str) -> serde_json::Value {
        serde_json::to_value(McpRequest::build(&McpMethod::parse(method), query, module, day())).unwrap()
    }

    #[test]
    fn resolution_carries_query_and_module() {
        assert_eq!(
            body("get_resolution", "card blocked", "cards"),
            json!({"method": "get_resolution", "params": {"query": "card blocked", "module": "cards"}})
        );
    }

    #[test]
    fn knowledge_base_drops_module() {
        assert_eq!(
            body("get_answer_from_KnowledgeBase", "limits?", "cards"),
            json!({"method": "get_answer_from_KnowledgeBase", "params": {"query": "limits?"}})
        );
    }

    #[test]
    fn todays_emails_sends_only_the_date() {
        assert_eq!(
            body("get_todays_emails", "ignored", "ignored"),
            json!({"method": "get_todays_emails", "params": {"date": "2024-03-07"}})
        );
    }

    #[test]
    fn empty_inputs_and_unknown_methods_send_empty_params() {
        assert_eq!(
            body("get_resolution", "", ""),
            json!({"method": "get_resolution", "params": {}})
        );
        assert_eq!(
            body("list_tools", "q", "m"),
            json!({"method": "list_tools", "params": {}})
        );
    }

    #[test]
    fn field_visibility_follows_method() {
        assert!(McpMethod::GetResolution.shows_module());
        assert!(McpMethod::GetAnswerFromKnowledgeBase.shows_query());
        assert!(!McpMethod::GetAnswerFromKnowledgeBase.shows_module());
        assert!(!McpMethod::GetTodaysEmails.shows_query());
    }

    #[test]
    fn todays_emails_are_dated_with_the_utc_day() {
        // a midnight rollover between the two reads would shift the date by one
        let before = Utc::now().date_naive();
        let request = McpRequest::for_today(&McpMethod::GetTodaysEmails, "", "");
        let after = Utc::now().date_naive();

        let date = request.params.date.expect("date param");
        let sent = NaiveDate::parse_from_str(&date, "%Y-%m-%d").unwrap();
        assert!(sent == before || sent == after, "{sent} is not the UTC day");
    }
}
