use crate::config::RemoteEnvConfig;
use crate::domain::errors::{InferenceError, ParseError, RemoteApiError};
use crate::domain::ports::RemoteSignalService;
use crate::domain::privacy::SanitizedRequest;
use crate::domain::types::{PredictionResult, ProbabilityTriple, Signal};
use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{info, warn};

/// Source tag attached to every remote result.
pub const REMOTE_SOURCE: &str = "deepseek";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

/// Strict shape of the signal object the model is instructed to return.
/// Missing `Option`s are detected per-field rather than failing the decode.
#[derive(Debug, Deserialize)]
struct RawRemoteSignal {
    signal: Option<String>,
    confidence: Option<f64>,
    position_size: Option<f64>,
    stop_loss: Option<f64>,
    take_profit: Option<f64>,
    reasoning: Option<String>,
}

/// Client for a DeepSeek-compatible chat-completions API. Builds a structured
/// analysis prompt from the sanitized request, retries with exponential
/// backoff, and validates the JSON response strictly: out-of-range values are
/// rejected, never coerced (the local model is the tolerant one).
pub struct DeepSeekClient {
    client: Client,
    api_key: String,
    endpoint: String,
    model: String,
    max_retries: u32,
    temperature: f32,
}

impl DeepSeekClient {
    pub fn new(config: &RemoteEnvConfig) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs))
                .connect_timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
            api_key: config.api_key.clone(),
            endpoint: format!(
                "{}/chat/completions",
                config.base_url.trim_end_matches('/')
            ),
            model: config.model.clone(),
            max_retries: config.max_retries.max(1),
            temperature: config.temperature,
        }
    }

    fn build_prompt(request: &SanitizedRequest) -> String {
        let market = &request.market;
        let mut prompt = format!(
            "You are a professional quantitative crypto trading assistant. \
             Analyze the data below and produce a trading recommendation.\n\n\
             ## Market Data\n\
             - Symbol: {}\n\
             - Current price: ${}\n\
             - 24h high: ${}\n\
             - 24h low: ${}\n\
             - 24h volume: ${}\n\
             - Bid-ask spread: {}\n\
             - Funding rate: {:.6}\n\n\
             ## Technical Indicators\n",
            market.symbol,
            market.price.round_dp(2),
            market.high_24h.round_dp(2),
            market.low_24h.round_dp(2),
            market.volume_24h.round_dp(0),
            market.bid_ask_spread,
            market.funding_rate,
        );

        let mut names: Vec<&String> = request.features.iter().map(|(name, _)| name).collect();
        names.sort();
        for name in names {
            if let Some(value) = request.features.get(name) {
                prompt.push_str(&format!("- {name}: {value:.2}\n"));
            }
        }

        if let Some(sentiment) = &request.sentiment {
            prompt.push_str("\n## Market Sentiment\n");
            Self::push_metrics(&mut prompt, sentiment);
        }

        if let Some(on_chain) = &request.on_chain {
            prompt.push_str("\n## On-Chain Data\n");
            Self::push_metrics(&mut prompt, on_chain);
        }

        prompt.push_str(concat!(
            "\n## Task\n",
            "Weigh the technical, sentiment and flow data against each other, ",
            "identify key support/resistance levels, and give clear risk guidance.\n\n",
            "## Output Format\n",
            "Respond with a single JSON object and nothing else:\n",
            "{\n",
            "  \"signal\": \"BUY\" | \"SELL\" | \"HOLD\",\n",
            "  \"confidence\": number in [0, 1],\n",
            "  \"position_size\": fraction of account in [0, 1],\n",
            "  \"stop_loss\": price or null,\n",
            "  \"take_profit\": price or null,\n",
            "  \"reasoning\": \"concise analysis\"\n",
            "}\n",
        ));

        prompt
    }

    fn push_metrics(prompt: &mut String, metrics: &crate::domain::types::MetricMap) {
        let mut names: Vec<&String> = metrics.keys().collect();
        names.sort();
        for name in names {
            let rendered = match &metrics[name] {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            prompt.push_str(&format!("- {name}: {rendered}\n"));
        }
    }

    async fn request_completion(&self, prompt: &str) -> Result<String, RemoteApiError> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.temperature,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| RemoteApiError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteApiError::HttpStatus {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        let envelope: ChatResponse = response
            .json()
            .await
            .map_err(|e| RemoteApiError::MalformedEnvelope(e.to_string()))?;

        envelope
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or(RemoteApiError::EmptyCompletion)
    }

    /// Strict response contract: every required field present, signal one of
    /// BUY/SELL/HOLD, confidence and position_size inside [0, 1].
    fn parse_signal(text: &str) -> Result<PredictionResult, ParseError> {
        let start = text
            .find('{')
            .ok_or_else(|| ParseError::InvalidJson("no JSON object in completion".to_string()))?;
        let end = text
            .rfind('}')
            .filter(|end| *end > start)
            .ok_or_else(|| ParseError::InvalidJson("unterminated JSON object".to_string()))?;

        let raw: RawRemoteSignal = serde_json::from_str(&text[start..=end])
            .map_err(|e| ParseError::InvalidJson(e.to_string()))?;

        let signal = match raw.signal.ok_or(ParseError::MissingField("signal"))?.as_str() {
            "BUY" => Signal::Buy,
            "SELL" => Signal::Sell,
            "HOLD" => Signal::Hold,
            other => return Err(ParseError::InvalidSignal(other.to_string())),
        };

        let confidence = raw.confidence.ok_or(ParseError::MissingField("confidence"))?;
        if !(0.0..=1.0).contains(&confidence) {
            return Err(ParseError::OutOfRange {
                field: "confidence",
                value: confidence,
            });
        }

        let position_size = raw
            .position_size
            .ok_or(ParseError::MissingField("position_size"))?;
        if !(0.0..=1.0).contains(&position_size) {
            return Err(ParseError::OutOfRange {
                field: "position_size",
                value: position_size,
            });
        }

        let reasoning = raw.reasoning.ok_or(ParseError::MissingField("reasoning"))?;

        // Stop levels only make sense for directional signals.
        let (stop_loss, take_profit) = if signal.is_directional() {
            (
                raw.stop_loss.and_then(Decimal::from_f64),
                raw.take_profit.and_then(Decimal::from_f64),
            )
        } else {
            (None, None)
        };

        Ok(PredictionResult {
            signal,
            confidence,
            probabilities: ProbabilityTriple::from_confidence(signal, confidence),
            position_size,
            stop_loss,
            take_profit,
            reasoning,
            source: REMOTE_SOURCE.to_string(),
        })
    }
}

#[async_trait]
impl RemoteSignalService for DeepSeekClient {
    async fn analyze(&self, request: &SanitizedRequest) -> Result<PredictionResult, InferenceError> {
        let prompt = Self::build_prompt(request);
        let mut last_error: Option<InferenceError> = None;

        for attempt in 0..self.max_retries {
            let outcome: Result<PredictionResult, InferenceError> = async {
                let text = self.request_completion(&prompt).await?;
                let result = Self::parse_signal(&text)?;
                Ok(result)
            }
            .await;

            match outcome {
                Ok(result) => {
                    info!(
                        "remote analysis complete: signal={} confidence={:.2}",
                        result.signal, result.confidence
                    );
                    return Ok(result);
                }
                Err(e) => {
                    warn!(
                        "remote analysis attempt {}/{} failed: {}",
                        attempt + 1,
                        self.max_retries,
                        e
                    );
                    last_error = Some(e);
                    // Exponential backoff between attempts, none after the last.
                    if attempt + 1 < self.max_retries {
                        tokio::time::sleep(Duration::from_secs(1u64 << attempt)).await;
                    }
                }
            }
        }

        let last = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no attempts executed".to_string());
        Err(RemoteApiError::RetriesExhausted {
            attempts: self.max_retries,
            last,
        }
        .into())
    }
}
