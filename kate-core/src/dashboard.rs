use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Aggregate snapshot for the landing view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardHome {
    pub total_api_count: u32,
    pub request_volume: u64,
    #[serde(rename = "averageLatency")]
    pub average_latency_ms: u64,
    pub error_rate_percent: f64,
    pub last24_hour_increase_percent: f64,
    #[serde(rename = "last7HoursFlow")]
    pub last_7_hours_flow: Vec<FlowChart>,
    pub recent_requests_with_issue: Vec<LastRequestIssue>,
}

/// One bar of the request-volume chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowChart {
    pub title: String,
    pub value: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastRequestIssue {
    /// Request id as reported by the gateway. Not guaranteed to be a UUID.
    pub uuid: String,
    pub time: NaiveDateTime,
    pub path: String,
    #[serde(default)]
    pub upstream: Option<String>,
    pub response_status: u16,
}
