//! OpenAI-compatible chat completions backend.
//!
//! The model is asked for a single JSON object. In [`GeneratorMode::Code`]
//! it writes terraform directly (`planDescription` + `terraformCode`); in
//! [`GeneratorMode::Structured`] it returns an [`InfraPlan`] that is rendered
//! locally from templates.

use async_trait::async_trait;
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, trace, warn};

use crate::config::{GeneratorConfig, GeneratorMode};
use crate::error::{GenerationError, Result, StagehandError};

use super::template::{InfraPlan, TemplateRenderer};
use super::{GeneratedPlan, PlanGenerator};

/// Maximum number of attempts for transient failures.
const MAX_RETRIES: u32 = 3;

/// Base delay between retries in milliseconds.
const RETRY_DELAY_MS: u64 = 1000;

/// Upper bound on a server-requested `retry-after` wait.
const MAX_RETRY_AFTER_SECS: u64 = 60;

const THINKING_OPEN: &str = "<thinking>";
const THINKING_CLOSE: &str = "</thinking>";

const CODE_PROMPT: &str = r#"You are a Terraform expert for AWS.
Given the user's request, answer with exactly one JSON object of this shape:

{
  "planDescription": "Clear, human-readable description of the resources that will be created",
  "terraformCode": "terraform {\n  required_providers {\n    aws = {\n      source = \"hashicorp/aws\"\n    }\n  }\n}\n\nprovider \"aws\" {\n  region = \"us-east-1\"\n}\n\nresource \"aws_s3_bucket\" \"example\" {\n  bucket = \"example\"\n}"
}

Return ONLY the JSON object: no markdown fences, no text outside the JSON.

Terraform format:
- Use HCL syntax only, never the JSON configuration syntax.
- "terraformCode" is a JSON string: newlines are \n and quotes are \".

General rules:
- Always include a terraform {} block with required_providers for aws (source = "hashicorp/aws").
- Always include a provider "aws" block with the appropriate region (default: {region}).
- Use resource names without spaces (hyphens or underscores).

S3:
- Create aws_s3_bucket with the requested name.
- If versioning is requested add aws_s3_bucket_versioning with status "Enabled".
- If encryption is requested add aws_s3_bucket_server_side_encryption_configuration.
- Add aws_s3_bucket_public_access_block with every flag set to true.

SQS:
- Create aws_sqs_queue with the requested name.
- FIFO queue names end in .fifo and set content_based_deduplication = true.
- Set visibility_timeout_seconds as requested (default: 30).
- If a dead letter queue is requested create a second queue and configure redrive_policy.

ECS:
- Use FARGATE as launch_type with network_mode = "awsvpc".
- Create aws_ecs_cluster, aws_ecs_task_definition and aws_ecs_service.
- Create an execution role with the AmazonECSTaskExecutionRolePolicy policy.
- Create the network: aws_vpc, aws_subnet, aws_internet_gateway, aws_route_table, aws_route_table_association, aws_security_group.

Any other AWS service follows the same conventions: reference other resources through attributes (.id, .arn) and stay compatible with the hashicorp/aws provider documentation."#;

const STRUCTURED_PROMPT: &str = r#"You are an AWS architect.
Answer with exactly one JSON object of this shape:

{
  "region": "{region}",
  "resources": [
    { "type": "s3", "name": "bucket-name", "versioning": true, "encrypted": true },
    { "type": "sqs", "name": "queue-name", "fifo": false, "visibility_timeout": 30 },
    { "type": "ecs_cluster", "cluster_name": "cluster", "service_name": "service", "task_name": "task", "cpu": 256, "memory": 512 }
  ],
  "tags": { "Key": "Value" }
}

Rules:
- "type" is exactly one of s3, sqs or ecs_cluster.
- Only include the resources the user asked for.
- Return ONLY the JSON object."#;

/// [`PlanGenerator`] backed by a chat completions endpoint.
#[derive(Clone)]
pub struct ChatCompletionsGenerator {
    /// HTTP client.
    client: Client,
    endpoint: String,
    model: String,
    api_key: String,
    mode: GeneratorMode,
    default_region: String,
    temperature: Option<f32>,
    system_prompt: String,
    retry_delay: Duration,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

/// Reply expected in code mode.
#[derive(Debug, Deserialize)]
struct CodeReply {
    #[serde(rename = "planDescription", default)]
    plan_description: String,
    #[serde(rename = "terraformCode", default)]
    terraform_code: String,
}

impl ChatCompletionsGenerator {
    /// Creates a generator from configuration and an API key.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: &GeneratorConfig, api_key: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GenerationError::network(format!("Failed to create HTTP client: {e}")))?;

        let template = match config.mode {
            GeneratorMode::Code => CODE_PROMPT,
            GeneratorMode::Structured => STRUCTURED_PROMPT,
        };

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            api_key: api_key.to_string(),
            mode: config.mode,
            default_region: config.default_region.clone(),
            temperature: config.temperature,
            system_prompt: template.replace("{region}", &config.default_region),
            retry_delay: Duration::from_millis(RETRY_DELAY_MS),
        })
    }

    /// Sets the base delay between retries.
    #[must_use]
    pub const fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Output mode.
    #[must_use]
    pub const fn mode(&self) -> GeneratorMode {
        self.mode
    }

    async fn complete(&self, request: &str) -> Result<String> {
        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &self.system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: request,
                },
            ],
            temperature: self.temperature,
        };

        let mut last_error: Option<StagehandError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                let delay = last_error
                    .as_ref()
                    .and_then(StagehandError::retry_delay_secs)
                    .map_or(self.retry_delay * attempt, |secs| {
                        Duration::from_secs(secs.min(MAX_RETRY_AFTER_SECS))
                    });
                debug!("Retry attempt {attempt} of {MAX_RETRIES} in {delay:?}");
                tokio::time::sleep(delay).await;
            }

            match self.complete_once(&body).await {
                Ok(content) => return Ok(content),
                Err(e) => {
                    if e.is_retryable() {
                        warn!("Model request failed: {}", e);
                        last_error = Some(e);
                        continue;
                    }
                    return Err(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            StagehandError::Generation(GenerationError::network("Max retries exceeded"))
        }))
    }

    async fn complete_once(&self, body: &ChatRequest<'_>) -> Result<String> {
        trace!("Posting chat completion to {}", self.endpoint);

        let response = self
            .client
            .post(&self.endpoint)
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::AUTHORIZATION, format!("Bearer {}", self.api_key))
            .json(body)
            .send()
            .await
            .map_err(|e| GenerationError::network(format!("Request failed: {e}")))?;

        let status = response.status();

        if status.as_u16() == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or_default();
            let retry_after = if retry_after == 0 { 60 } else { retry_after };

            return Err(GenerationError::RateLimited {
                retry_after_secs: retry_after,
            }
            .into());
        }

        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(GenerationError::AuthenticationFailed {
                message: String::from("Invalid API key"),
            }
            .into());
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::api_error(status.as_u16(), body).into());
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::invalid(format!("Failed to parse response: {e}")))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| GenerationError::invalid("No content in response").into())
    }

    /// Turns the model's answer into a plan.
    fn interpret(&self, content: &str) -> Result<GeneratedPlan> {
        let visible = strip_thinking(content);
        let json = extract_json_object(&visible)
            .ok_or_else(|| GenerationError::invalid("No JSON object in response"))?;

        match self.mode {
            GeneratorMode::Code => {
                let reply: CodeReply = serde_json::from_str(json)
                    .map_err(|e| GenerationError::invalid(format!("Unexpected reply shape: {e}")))?;
                let code = clean_code(&reply.terraform_code);
                if code.is_empty() {
                    return Err(GenerationError::EmptyCode.into());
                }
                Ok(GeneratedPlan::new(reply.plan_description.trim(), code))
            }
            GeneratorMode::Structured => {
                let mut plan: InfraPlan = serde_json::from_str(json)
                    .map_err(|e| GenerationError::invalid(format!("Unexpected plan shape: {e}")))?;
                if plan.region.trim().is_empty() {
                    plan.region.clone_from(&self.default_region);
                }
                plan.validate()?;

                let renderer = TemplateRenderer::new();
                Ok(GeneratedPlan::new(renderer.describe(&plan), renderer.render(&plan)))
            }
        }
    }
}

impl std::fmt::Debug for ChatCompletionsGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatCompletionsGenerator")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl PlanGenerator for ChatCompletionsGenerator {
    async fn generate(&self, request: &str) -> Result<GeneratedPlan> {
        debug!("Generating plan with {} ({:?} mode)", self.model, self.mode);
        let content = self.complete(request).await?;
        trace!("Model reply: {}", content);
        self.interpret(&content)
    }
}

/// Removes `<thinking>…</thinking>` sections.
///
/// An unterminated opening tag is dropped on its own.
#[must_use]
pub fn strip_thinking(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    let mut rest = content;

    while let Some(start) = rest.find(THINKING_OPEN) {
        out.push_str(&rest[..start]);
        let after_open = &rest[start + THINKING_OPEN.len()..];
        rest = match after_open.find(THINKING_CLOSE) {
            Some(end) => &after_open[end + THINKING_CLOSE.len()..],
            None => after_open,
        };
    }

    out.push_str(rest);
    out
}

/// Returns the span from the first `{` to the last `}`.
#[must_use]
pub fn extract_json_object(content: &str) -> Option<&str> {
    let start = content.find('{')?;
    let end = content.rfind('}')?;
    (start < end).then(|| &content[start..=end])
}

/// Normalizes model-written terraform.
///
/// Markdown fences are removed, literal `\n` and `\"` sequences left over
/// from double encoding are unescaped, and surrounding whitespace trimmed.
#[must_use]
pub fn clean_code(raw: &str) -> String {
    raw.replace("```terraform", "")
        .replace("```hcl", "")
        .replace("```", "")
        .replace("\\n", "\n")
        .replace("\\\"", "\"")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header as header_eq, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const HCL: &str = "provider \"aws\" {\n  region = \"us-east-1\"\n}\n\nresource \"aws_s3_bucket\" \"demo\" {\n  bucket = \"demo\"\n}";

    fn generator(server: &MockServer, mode: GeneratorMode) -> ChatCompletionsGenerator {
        let config = GeneratorConfig {
            mode,
            endpoint: format!("{}/v1/chat/completions", server.uri()),
            model: String::from("test-model"),
            ..GeneratorConfig::default()
        };
        ChatCompletionsGenerator::new(&config, "test-key")
            .unwrap()
            .with_retry_delay(Duration::ZERO)
    }

    fn reply(content: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "role": "assistant", "content": content } }]
        }))
    }

    #[tokio::test]
    async fn test_code_mode() {
        let server = MockServer::start().await;
        let content = json!({
            "planDescription": "create S3 bucket demo",
            "terraformCode": HCL,
        })
        .to_string();

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header_eq("authorization", "Bearer test-key"))
            .and(body_partial_json(json!({ "model": "test-model" })))
            .respond_with(reply(&content))
            .expect(1)
            .mount(&server)
            .await;

        let plan = generator(&server, GeneratorMode::Code)
            .generate("create bucket named demo")
            .await
            .unwrap();

        assert_eq!(plan.description, "create S3 bucket demo");
        assert_eq!(plan.code, HCL);
    }

    #[tokio::test]
    async fn test_code_mode_tolerates_thinking_and_prose() {
        let server = MockServer::start().await;
        let content = format!(
            "<thinking>the user wants {{ a bucket }}</thinking>Here you go:\n{}\nDone.",
            json!({ "planDescription": "bucket", "terraformCode": HCL })
        );
        Mock::given(method("POST"))
            .respond_with(reply(&content))
            .mount(&server)
            .await;

        let plan = generator(&server, GeneratorMode::Code)
            .generate("bucket")
            .await
            .unwrap();
        assert_eq!(plan.code, HCL);
    }

    #[tokio::test]
    async fn test_empty_code_is_rejected() {
        let server = MockServer::start().await;
        let content = json!({ "planDescription": "nothing", "terraformCode": "```hcl\n```" }).to_string();
        Mock::given(method("POST"))
            .respond_with(reply(&content))
            .mount(&server)
            .await;

        let err = generator(&server, GeneratorMode::Code)
            .generate("nothing")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StagehandError::Generation(GenerationError::EmptyCode)
        ));
    }

    #[tokio::test]
    async fn test_structured_mode_renders_templates() {
        let server = MockServer::start().await;
        let content = json!({
            "region": "",
            "resources": [{ "type": "s3", "name": "demo", "versioning": true }],
        })
        .to_string();
        Mock::given(method("POST"))
            .respond_with(reply(&content))
            .mount(&server)
            .await;

        let plan = generator(&server, GeneratorMode::Structured)
            .generate("create bucket named demo")
            .await
            .unwrap();

        assert!(plan.code.contains("region = \"us-east-1\""));
        assert!(plan.code.contains("resource \"aws_s3_bucket\" \"demo\""));
        assert!(plan.description.contains("S3 bucket demo (versioning enabled)"));
    }

    #[tokio::test]
    async fn test_auth_failure_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;

        let err = generator(&server, GeneratorMode::Code)
            .generate("bucket")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StagehandError::Generation(GenerationError::AuthenticationFailed { .. })
        ));
    }

    #[tokio::test]
    async fn test_rate_limit_is_retried() {
        let server = MockServer::start().await;
        let content = json!({ "planDescription": "bucket", "terraformCode": HCL }).to_string();

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "1"))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(reply(&content))
            .expect(1)
            .mount(&server)
            .await;

        let started = std::time::Instant::now();
        let plan = generator(&server, GeneratorMode::Code)
            .generate("bucket")
            .await
            .unwrap();
        assert_eq!(plan.description, "bucket");
        // The zero base delay is overridden by the server's retry-after.
        assert!(started.elapsed() >= Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_server_error_surfaces_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
            .mount(&server)
            .await;

        let err = generator(&server, GeneratorMode::Code)
            .generate("bucket")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StagehandError::Generation(GenerationError::ApiRequestFailed { status: 500, .. })
        ));
    }

    #[test]
    fn test_clean_code() {
        assert_eq!(
            clean_code("```terraform\nresource \\\"a\\\" \\\"b\\\" {}\\n```"),
            "resource \"a\" \"b\" {}"
        );
        assert_eq!(clean_code("  \n"), "");
    }

    #[test]
    fn test_strip_thinking() {
        assert_eq!(strip_thinking("<thinking>x</thinking>{}"), "{}");
        assert_eq!(strip_thinking("a<thinking>b</thinking>c<thinking>d</thinking>e"), "ace");
        assert_eq!(strip_thinking("<thinking>{\"a\":1}"), "{\"a\":1}");
    }

    #[test]
    fn test_extract_json_object() {
        assert_eq!(extract_json_object("sure: {\"a\": {}} ok"), Some("{\"a\": {}}"));
        assert_eq!(extract_json_object("no json"), None);
        assert_eq!(extract_json_object("} {"), None);
    }
}
