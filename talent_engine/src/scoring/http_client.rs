use std::time::Duration;

use log::*;
use serde::Serialize;
use serde_json::{json, Value};

use crate::scoring::{ScoreRequest, ScoringClient, ScoringError};

/// A [`ScoringClient`] that talks to the scoring service over HTTP.
///
/// Responses are parsed defensively: the score (or skill list) may sit at the top level or inside a `data` object.
#[derive(Debug, Clone)]
pub struct HttpScoringClient {
    base_url: String,
    client: reqwest::Client,
}

impl HttpScoringClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ScoringError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ScoringError::Unavailable(format!("Could not build HTTP client. {e}")))?;
        let base_url = base_url.trim_end_matches('/').to_string();
        Ok(Self { base_url, client })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Value, ScoringError> {
        let url = format!("{}{path}", self.base_url);
        let response = self.client.post(&url).json(body).send().await.map_err(map_reqwest_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(ScoringError::Unavailable(format!("{path} returned HTTP {status}")));
        }
        response.json::<Value>().await.map_err(map_reqwest_error)
    }
}

/// Looks for `key` at the top level of the response, then inside `data`.
fn lookup<'v>(body: &'v Value, key: &str) -> Option<&'v Value> {
    body.get(key).or_else(|| body.get("data").and_then(|d| d.get(key)))
}

fn parse_score(body: &Value) -> Result<f64, ScoringError> {
    lookup(body, "score")
        .and_then(Value::as_f64)
        .filter(|s| s.is_finite())
        .ok_or_else(|| ScoringError::MalformedResponse(format!("No numeric score in {body}")))
}

fn parse_skills(body: &Value) -> Vec<String> {
    match lookup(body, "skills").and_then(Value::as_array) {
        Some(skills) => skills.iter().filter_map(Value::as_str).map(str::to_string).collect(),
        None => {
            warn!("🧮️ Skill extraction response has no skill list. {body}");
            Vec::new()
        },
    }
}

impl ScoringClient for HttpScoringClient {
    async fn score(&self, request: ScoreRequest<'_>) -> Result<f64, ScoringError> {
        let body = self.post("/match", &request).await?;
        let score = parse_score(&body)?;
        trace!("🧮️ Scored candidate text ({} chars): {score}", request.candidate_text.len());
        Ok(score)
    }

    async fn extract_skills(&self, text: &str) -> Result<Vec<String>, ScoringError> {
        let body = self.post("/skills/extract", &json!({ "text": text })).await?;
        Ok(parse_skills(&body))
    }
}

fn map_reqwest_error(err: reqwest::Error) -> ScoringError {
    if err.is_timeout() {
        return ScoringError::Timeout;
    }
    if err.is_decode() || err.is_body() {
        return ScoringError::MalformedResponse(err.to_string());
    }
    ScoringError::Unavailable(err.to_string())
}

#[cfg(test)]
mod test {
    use wiremock::{
        matchers::{body_json, method, path},
        Mock,
        MockServer,
        ResponseTemplate,
    };

    use super::*;

    fn client(server: &MockServer) -> HttpScoringClient {
        HttpScoringClient::new(&format!("{}/", server.uri()), Duration::from_millis(500)).unwrap()
    }

    #[test]
    fn score_shapes() {
        assert_eq!(parse_score(&json!({"score": 72.5})).unwrap(), 72.5);
        assert_eq!(parse_score(&json!({"data": {"score": 0}})).unwrap(), 0.0);
        assert!(parse_score(&json!({"score": "high"})).is_err());
        assert!(parse_score(&json!({"result": 50})).is_err());
        assert!(parse_score(&json!([1, 2])).is_err());
    }

    #[test]
    fn skill_shapes() {
        assert_eq!(parse_skills(&json!({"skills": ["rust", 3, "sql"]})), vec!["rust", "sql"]);
        assert_eq!(parse_skills(&json!({"data": {"skills": ["go"]}})), vec!["go"]);
        assert!(parse_skills(&json!({"skills": "rust"})).is_empty());
    }

    #[tokio::test]
    async fn posts_match_request() {
        let server = MockServer::start().await;
        let skills = vec!["rust".to_string()];
        let request = ScoreRequest {
            job_text: "Backend engineer",
            candidate_text: "Systems programmer",
            required_skills: &skills,
            candidate_skills: &[],
        };
        Mock::given(method("POST"))
            .and(path("/match"))
            .and(body_json(json!({
                "job_description": "Backend engineer",
                "candidate_bio": "Systems programmer",
                "job_skills": ["rust"],
                "candidate_skills": []
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"score": 81.25})))
            .expect(1)
            .mount(&server)
            .await;
        assert_eq!(client(&server).score(request).await.unwrap(), 81.25);
    }

    #[tokio::test]
    async fn slow_service_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/match"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)).set_body_json(json!({"score": 1})))
            .mount(&server)
            .await;
        let request = ScoreRequest { job_text: "a", candidate_text: "b", required_skills: &[], candidate_skills: &[] };
        let err = client(&server).score(request).await.unwrap_err();
        assert!(matches!(err, ScoringError::Timeout));
    }

    #[tokio::test]
    async fn server_errors_are_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST")).respond_with(ResponseTemplate::new(500)).mount(&server).await;
        let request = ScoreRequest { job_text: "a", candidate_text: "b", required_skills: &[], candidate_skills: &[] };
        let err = client(&server).score(request).await.unwrap_err();
        assert!(matches!(err, ScoringError::Unavailable(_)));
        assert!(client(&server).extract_skills("text").await.is_err());
    }

    #[tokio::test]
    async fn extracts_skills() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/skills/extract"))
            .and(body_json(json!({"text": "I write Rust and SQL"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"skills": ["Rust", "SQL"]}})))
            .mount(&server)
            .await;
        let skills = client(&server).extract_skills("I write Rust and SQL").await.unwrap();
        assert_eq!(skills, vec!["Rust", "SQL"]);
    }
}
