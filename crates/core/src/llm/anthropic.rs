use crate::config::Settings;
use crate::domain::contract::parse_intent_value;
use crate::domain::intent::ParsedIntent;
use crate::domain::simulation::SimulationResult;
use crate::engine::ScenarioCatalog;
use crate::llm::error::LlmDiagnosticsError;
use crate::llm::json;
use crate::llm::{LlmClient, Provider};
use crate::report::format_impact;
use anyhow::Context;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_MODEL: &str = "claude-3-5-sonnet-latest";
const DEFAULT_MAX_TOKENS: u32 = 1024;
const DEFAULT_TIMEOUT_SECS: u64 = 60;

const TOOL_NAME_EMIT_INTENT: &str = "emit_intent";

const INTENT_TEMPERATURE: f32 = 0.1;
const EXPLAIN_TEMPERATURE: f32 = 0.5;
const UNCERTAINTY_TEMPERATURE: f32 = 0.3;
const EXPLAIN_MAX_TOKENS: u32 = 600;
const UNCERTAINTY_MAX_TOKENS: u32 = 160;

#[derive(Debug, Clone)]
pub struct AnthropicClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
    scenario_keys: Vec<String>,
    scenario_lines: Vec<String>,
}

impl AnthropicClient {
    pub fn from_settings(settings: &Settings, catalog: &ScenarioCatalog) -> anyhow::Result<Self> {
        let api_key = settings.require_anthropic_api_key()?.to_string();
        let base_url =
            std::env::var("ANTHROPIC_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let model = std::env::var("ANTHROPIC_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let max_tokens = std::env::var("ANTHROPIC_MAX_TOKENS")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(DEFAULT_MAX_TOKENS);

        let timeout_secs = std::env::var("ANTHROPIC_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build reqwest client")?;

        Ok(Self {
            http,
            api_key,
            base_url,
            model,
            max_tokens,
            scenario_keys: catalog.keys(),
            scenario_lines: scenario_lines(catalog),
        })
    }

    async fn create_message(
        &self,
        req: CreateMessageRequest,
    ) -> anyhow::Result<(serde_json::Value, CreateMessageResponse)> {
        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", HeaderValue::from_str(&self.api_key)?);
        headers.insert(
            "anthropic-version",
            HeaderValue::from_static(ANTHROPIC_VERSION),
        );

        let url = format!("{}/v1/messages", self.base_url.trim_end_matches('/'));
        let res = self
            .http
            .post(url)
            .headers(headers)
            .json(&req)
            .send()
            .await
            .map_err(|e| LlmDiagnosticsError {
                provider: Provider::Anthropic,
                stage: "http",
                detail: format!("request failed: {e}"),
                raw_output: None,
                raw_response_json: None,
            })?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read Anthropic response body")?;
        if !status.is_success() {
            let raw_response_json = serde_json::from_str::<serde_json::Value>(&text).ok();
            return Err(LlmDiagnosticsError {
                provider: Provider::Anthropic,
                stage: "http",
                detail: format!("status={status}"),
                raw_output: Some(text),
                raw_response_json,
            }
            .into());
        }

        let raw_json = serde_json::from_str::<serde_json::Value>(&text)
            .with_context(|| format!("failed to parse Anthropic response JSON: {text}"))?;
        let parsed = serde_json::from_value::<CreateMessageResponse>(raw_json.clone())
            .context("failed to decode Anthropic response into CreateMessageResponse")?;
        Ok((raw_json, parsed))
    }

    fn intent_request(&self, content: String, max_tokens: u32) -> CreateMessageRequest {
        CreateMessageRequest {
            model: self.model.clone(),
            max_tokens,
            temperature: Some(INTENT_TEMPERATURE),
            system: Some(self.intent_system_prompt()),
            messages: vec![Message {
                role: "user",
                content,
            }],
            tools: Some(self.tools()),
            tool_choice: Some(Self::tool_choice()),
        }
    }

    fn text_request(
        &self,
        system: Option<String>,
        content: String,
        max_tokens: u32,
        temperature: f32,
    ) -> CreateMessageRequest {
        CreateMessageRequest {
            model: self.model.clone(),
            max_tokens,
            temperature: Some(temperature),
            system,
            messages: vec![Message {
                role: "user",
                content,
            }],
            tools: None,
            tool_choice: None,
        }
    }

    fn tools(&self) -> Vec<Tool> {
        let schema = serde_json::json!({
            "type": "object",
            "additionalProperties": false,
            "required": ["scenario_key", "magnitude_modifier", "confidence", "reasoning"],
            "properties": {
                "scenario_key": {"type": "string", "enum": self.scenario_keys},
                "magnitude_modifier": {"type": "number"},
                "confidence": {"type": "string", "enum": ["low", "medium", "high"]},
                "reasoning": {"type": "string"},
                "scenario_context": {"type": ["string", "null"]},
                "specific_entity": {"type": ["string", "null"]},
                "forecast_weeks": {"type": ["integer", "null"]}
            }
        });

        vec![Tool {
            name: TOOL_NAME_EMIT_INTENT,
            description: "Emit the scenario intent matched to the user's question",
            input_schema: schema,
        }]
    }

    fn tool_choice() -> ToolChoice {
        ToolChoice::Tool {
            name: TOOL_NAME_EMIT_INTENT,
        }
    }

    fn intent_system_prompt(&self) -> String {
        let mut lines = vec![
            "You are a financial analyst mapping oil market questions to scenario parameters.",
            "",
            "Available scenarios:",
        ]
        .into_iter()
        .map(str::to_string)
        .collect::<Vec<_>>();
        lines.extend(self.scenario_lines.iter().cloned());
        lines.extend(
            [
                "",
                "Return ONLY valid JSON. Do not wrap in markdown. No trailing commas. No comments.",
                "Output schema:",
                "{",
                "  \"scenario_key\": \"one of the keys above\",",
                "  \"magnitude_modifier\": 1.0,",
                "  \"confidence\": \"low|medium|high\",",
                "  \"reasoning\": \"why this scenario fits\",",
                "  \"scenario_context\": \"the user's question restated in one sentence, keeping their framing\",",
                "  \"specific_entity\": \"country/organisation/event named by the user, or null\",",
                "  \"forecast_weeks\": null",
                "}",
                "magnitude_modifier:",
                "- 2.0 = extreme/total/catastrophic/complete halt",
                "- 1.5 = major/severe/significant",
                "- 1.0 = standard/moderate (default)",
                "- 0.5 = mild/slight/modest",
                "- negative values describe the opposite move (e.g. an OPEC output increase)",
                "forecast_weeks: only set it if the user asked for a specific horizon.",
            ]
            .into_iter()
            .map(str::to_string),
        );
        lines.join("\n")
    }

    fn user_prompt(query: &str) -> String {
        format!("Query: {query}")
    }

    fn repair_prompt(&self, query: &str, previous_output: &str) -> String {
        format!(
            "Your previous message was NOT a valid intent object.\n\n\
TASK: Output ONLY a single JSON object that matches the schema.\n\
- Do NOT include any markdown, prose, or code fences.\n\
- scenario_key MUST be one of: {keys}.\n\
- magnitude_modifier MUST be a number.\n\
- confidence MUST be one of: low, medium, high.\n\
- reasoning MUST be a string.\n\n\
ORIGINAL QUERY: {query}\n\n\
INVALID OUTPUT (for reference only; DO NOT copy verbatim):\n{previous_output}",
            keys = self.scenario_keys.join(", ")
        )
    }

    fn explain_system_prompt(intent: &ParsedIntent) -> String {
        let mut prompt = [
            "You are a senior energy economist explaining oil market forecasts.",
            "Your explanation must directly address the user's specific scenario as they framed it,",
            "not the generic scenario category.",
            "",
            "Structure your response in 3 short paragraphs:",
            "1. Bottom line: state the price impact immediately, naming the user's scenario.",
            "2. Mechanism: explain which macro variables (USD, VIX, inventories, industrial",
            "   production, policy rate) drove the model result and why.",
            "3. Historical analog: name one real historical event similar to this scenario and",
            "   compare what happened to oil prices then with this forecast.",
            "",
            "Rules:",
            "- Under 220 words total",
            "- Never invent numbers beyond what is given",
            "- Plain English, explain any jargon",
        ]
        .join("\n");

        if let Some(entity) = &intent.specific_entity {
            prompt.push_str(&format!(
                "\n\nThe user asked specifically about {entity}. Reference {entity} by name and \
                 discuss its role in global oil markets where relevant."
            ));
        }
        prompt
    }

    fn explain_user_prompt(result: &SimulationResult, intent: &ParsedIntent) -> String {
        let context = intent
            .scenario_context
            .as_deref()
            .unwrap_or(result.scenario_name.as_str());
        let shocks = serde_json::to_string_pretty(&result.shock_vector)
            .unwrap_or_else(|_| "{}".to_string());

        let mut out = format!(
            "User's specific scenario: \"{context}\"\n\n\
             Current Brent price: ${:.2}/barrel\n",
            result.current_price
        );
        if let Some(w1) = &result.impact_week1 {
            out.push_str(&format!("Immediate impact (Week 1): {}\n", format_impact(w1)));
        }
        let last = &result.impact_final;
        out.push_str(&format!(
            "Full impact (Week {}): {}\n\
             Baseline Week {}: ${:.2}/barrel\n\
             Scenario Week {}: ${:.2}/barrel\n\n\
             Shocks applied to macro model:\n{shocks}",
            result.horizon_weeks,
            format_impact(last),
            result.horizon_weeks,
            last.baseline,
            result.horizon_weeks,
            last.shocked,
        ));
        out
    }

    fn uncertainty_prompt(result: &SimulationResult) -> String {
        format!(
            "Write a 2-sentence uncertainty note for this specific forecast.\n\n\
             Scenario: {}\n\
             Estimated impact: {} over {} weeks\n\n\
             Sentence 1: what specific factors could make this forecast wrong for THIS scenario.\n\
             Sentence 2: what the model cannot capture about this type of event.\n\n\
             Be specific, not boilerplate. Under 60 words.",
            result.scenario_name,
            format_impact(&result.impact_final),
            result.horizon_weeks,
        )
    }

    fn response_text(res: &CreateMessageResponse) -> String {
        let mut out = String::new();
        for block in &res.content {
            if let ContentBlock::Text { text } = block {
                if !out.is_empty() {
                    out.push('\n');
                }
                out.push_str(text);
            }
        }
        out
    }

    fn response_tool_intent(res: &CreateMessageResponse) -> Option<serde_json::Value> {
        res.content.iter().find_map(|block| match block {
            ContentBlock::ToolUse { name, input, .. } if name == TOOL_NAME_EMIT_INTENT => {
                Some(input.clone())
            }
            _ => None,
        })
    }

    async fn complete_text(&self, req: CreateMessageRequest) -> anyhow::Result<String> {
        let (_raw, res) = self.create_message(req).await?;
        let text = Self::response_text(&res).trim().to_string();
        anyhow::ensure!(!text.is_empty(), "Anthropic returned an empty completion");
        Ok(text)
    }

    async fn try_parse_with_repairs(
        &self,
        query: &str,
        initial_text: String,
        initial_raw_json: serde_json::Value,
    ) -> anyhow::Result<serde_json::Value> {
        let first_err = match json::parse_intent_text(&initial_text) {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        let mut last_err = first_err;
        let mut last_text = initial_text;
        let mut last_raw_json = initial_raw_json;

        for attempt in 1..=2u32 {
            let repair_req = self.intent_request(self.repair_prompt(query, &last_text), self.max_tokens);
            let (repair_raw_json, repair_res) = self.create_message(repair_req).await?;

            let candidate = match Self::response_tool_intent(&repair_res) {
                Some(value) => parse_intent_value(&value).map(|_| value).map_err(anyhow::Error::from),
                None => json::parse_intent_text(&Self::response_text(&repair_res)),
            };
            match candidate {
                Ok(value) => return Ok(value),
                Err(err) => {
                    last_err = err;
                    last_text = Self::response_text(&repair_res);
                    last_raw_json = repair_raw_json;
                    tracing::warn!(
                        attempt,
                        error = %last_err,
                        "LLM intent still invalid after repair attempt"
                    );
                }
            }
        }

        Err(LlmDiagnosticsError {
            provider: Provider::Anthropic,
            stage: "parse_after_repair",
            detail: format!("final_error={last_err:#}"),
            raw_output: Some(last_text),
            raw_response_json: Some(last_raw_json),
        }
        .into())
    }
}

#[async_trait::async_trait]
impl LlmClient for AnthropicClient {
    fn provider(&self) -> Provider {
        Provider::Anthropic
    }

    async fn parse_intent(&self, query: &str) -> anyhow::Result<serde_json::Value> {
        let query = query.trim();
        anyhow::ensure!(!query.is_empty(), "query must be non-empty");

        let (mut raw_json, mut res) = self
            .create_message(self.intent_request(Self::user_prompt(query), self.max_tokens))
            .await?;

        // If the model hit max_tokens, retry once with a higher ceiling.
        if matches!(res.stop_reason.as_deref(), Some("max_tokens")) {
            let bumped = self.max_tokens.saturating_mul(2).max(2048);
            tracing::warn!(
                from = self.max_tokens,
                to = bumped,
                "Anthropic stop_reason=max_tokens; retrying once with higher max_tokens"
            );
            let (rj, r) = self
                .create_message(self.intent_request(Self::user_prompt(query), bumped))
                .await?;
            raw_json = rj;
            res = r;
        }

        if let Some(value) = Self::response_tool_intent(&res) {
            if parse_intent_value(&value).is_ok() {
                tracing::debug!(%value, "intent parsed from tool output");
                return Ok(value);
            }
            let text = value.to_string();
            return self.try_parse_with_repairs(query, text, raw_json).await;
        }

        // Fallback to text (should be rare).
        let text = Self::response_text(&res);
        self.try_parse_with_repairs(query, text, raw_json).await
    }

    async fn explain_results(
        &self,
        result: &SimulationResult,
        intent: &ParsedIntent,
    ) -> anyhow::Result<String> {
        let req = self.text_request(
            Some(Self::explain_system_prompt(intent)),
            Self::explain_user_prompt(result, intent),
            EXPLAIN_MAX_TOKENS,
            EXPLAIN_TEMPERATURE,
        );
        self.complete_text(req).await
    }

    async fn uncertainty_note(&self, result: &SimulationResult) -> anyhow::Result<String> {
        let req = self.text_request(
            None,
            Self::uncertainty_prompt(result),
            UNCERTAINTY_MAX_TOKENS,
            UNCERTAINTY_TEMPERATURE,
        );
        self.complete_text(req).await
    }
}

fn scenario_lines(catalog: &ScenarioCatalog) -> Vec<String> {
    catalog
        .list_all()
        .iter()
        .map(|def| format!("- {}: {}. {}", def.key, def.display_name, def.description))
        .collect()
}

#[derive(Debug, Clone, Serialize)]
struct CreateMessageRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<Message>,

    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<Tool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<ToolChoice>,
}

#[derive(Debug, Clone, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Debug, Clone, Deserialize)]
struct CreateMessageResponse {
    content: Vec<ContentBlock>,

    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
struct Tool {
    name: &'static str,
    description: &'static str,
    input_schema: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
enum ToolChoice {
    #[serde(rename = "tool")]
    Tool { name: &'static str },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },

    #[serde(rename = "tool_use")]
    ToolUse {
        #[serde(default)]
        name: String,
        #[serde(default)]
        input: serde_json::Value,
    },

    #[serde(other)]
    Unknown,
}
