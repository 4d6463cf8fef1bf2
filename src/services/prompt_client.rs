// src/services/prompt_client.rs
use crate::config::Config;
use crate::errors::PromptError;
use crate::models::{EncodedImage, PromptData};
use async_trait::async_trait;
use log::debug;
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};

pub const SYSTEM_INSTRUCTION: &str = r#"You are an advanced image-to-text prompt engineer AI. Your job is to describe any uploaded image with extreme precision and structure it into a ready-to-use prompt for image-generation models such as Midjourney, DALL·E, or Stable Diffusion.

Rules:
1. Describe all visible elements objectively: subject, pose, environment, lighting, color palette, materials, mood, camera style, composition, and style.
2. DO NOT guess identity or use proper names of real people or copyrighted characters.
3. Always include a detailed "positive prompt", "negative prompt", and "generation parameters".
4. Maintain descriptive richness, but avoid artistic exaggeration unless visible in the image.
5. Output ONLY in the specified JSON structure. Do not include any other text or markdown formatting."#;

/// Anything that can turn one encoded image into one prompt.
#[async_trait]
pub trait PromptModel: Send + Sync {
    async fn generate_prompt(&self, image: &EncodedImage) -> Result<PromptData, PromptError>;
}

/// Output contract handed to Gemini's structured-output feature.
pub fn response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "positive_prompt": {
                "type": "STRING",
                "description": "A detailed, objective description of the image's content, style, and composition for the AI to generate."
            },
            "negative_prompt": {
                "type": "STRING",
                "description": "A list of elements to exclude from the generated image, such as poor quality, deformities, or unwanted objects."
            },
            "parameters": {
                "type": "OBJECT",
                "properties": {
                    "style": { "type": "STRING", "description": "The artistic style of the image (e.g., 'photorealistic', 'impressionistic', 'anime')." },
                    "lighting": { "type": "STRING", "description": "Description of the lighting (e.g., 'soft natural light', 'dramatic studio lighting')." },
                    "camera": { "type": "STRING", "description": "Camera settings and perspective (e.g., 'close-up shot, 50mm lens, shallow depth of field')." },
                    "color_palette": {
                        "type": "ARRAY",
                        "items": { "type": "STRING" },
                        "description": "An array of dominant hex color codes from the image."
                    },
                    "cfg_scale": { "type": "STRING", "description": "A recommended CFG scale value (e.g., '7.5')." },
                    "steps": { "type": "STRING", "description": "A recommended number of generation steps (e.g., '30')." },
                    "sampler": { "type": "STRING", "description": "A recommended sampler method (e.g., 'DPM++ 2M Karras')." },
                    "seed": { "type": "STRING", "description": "A random seed value or '-1' for random." },
                    "aspect_ratio": { "type": "STRING", "description": "The aspect ratio of the image (e.g., '16:9')." }
                },
                "required": ["style", "lighting", "camera", "color_palette", "cfg_scale", "steps", "sampler", "seed", "aspect_ratio"]
            }
        },
        "required": ["positive_prompt", "negative_prompt", "parameters"]
    })
}

pub struct GeminiClient {
    api_key: String,
    model: String,
    api_base: String,
    client: Client,
}

impl GeminiClient {
    pub fn new(config: &Config) -> Self {
        Self {
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            api_base: config.api_base.clone(),
            client: Client::new(),
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.api_base.trim_end_matches('/'),
            self.model
        )
    }

    pub fn request_body(image: &EncodedImage) -> Value {
        json!({
            "systemInstruction": {
                "parts": [{ "text": SYSTEM_INSTRUCTION }]
            },
            "contents": [{
                "parts": [{ "inlineData": image }]
            }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": response_schema()
            }
        })
    }
}

#[async_trait]
impl PromptModel for GeminiClient {
    async fn generate_prompt(&self, image: &EncodedImage) -> Result<PromptData, PromptError> {
        debug!(
            "Requesting prompt from {} for {} ({} base64 chars)",
            self.model,
            image.mime_type,
            image.data.len()
        );

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&Self::request_body(image))
            .send()
            .await
            .map_err(|e| PromptError::Transport(format!("Gemini request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| PromptError::Transport(format!("Failed to read Gemini response: {}", e)))?;

        if !status.is_success() {
            return Err(PromptError::Transport(provider_error_message(status, &body)));
        }

        let result: Value = serde_json::from_str(&body)
            .map_err(|e| PromptError::Transport(format!("Malformed Gemini response: {}", e)))?;

        let content = candidate_text(&result)?;
        parse_prompt_data(&content)
    }
}

const MAX_ERROR_BODY_CHARS: usize = 200;

/// Prefers the provider's own `error.message` so the user sees e.g.
/// "Invalid API key" rather than a wrapped JSON blob. Bodies that are not
/// JSON (proxy error pages and the like) are reduced to the status line.
fn provider_error_message(status: StatusCode, body: &str) -> String {
    let Ok(parsed) = serde_json::from_str::<Value>(body) else {
        return format!("Gemini returned {}", status);
    };

    match parsed["error"]["message"].as_str().map(str::trim) {
        Some(message) if !message.is_empty() => message.to_string(),
        _ => {
            let body = body.trim();
            if body.chars().count() > MAX_ERROR_BODY_CHARS {
                let excerpt: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
                format!("Gemini returned {}: {}...", status, excerpt)
            } else {
                format!("Gemini returned {}: {}", status, body)
            }
        }
    }
}

fn candidate_text(result: &Value) -> Result<String, PromptError> {
    let Some(candidate) = result["candidates"].get(0) else {
        let reason = result["promptFeedback"]["blockReason"]
            .as_str()
            .map(|reason| format!("Gemini blocked the request: {}", reason))
            .unwrap_or_else(|| "No candidates in Gemini response".to_string());
        return Err(PromptError::Transport(reason));
    };

    let parts = candidate["content"]["parts"].as_array().ok_or_else(|| {
        let finish = candidate["finishReason"].as_str().unwrap_or("unknown");
        PromptError::Transport(format!(
            "No content in Gemini response (finish reason: {})",
            finish
        ))
    })?;

    let text: String = parts
        .iter()
        .filter_map(|part| part["text"].as_str())
        .collect();

    Ok(text.trim().to_string())
}

/// Parses the model's JSON text. Anything short of a complete, non-blank
/// `PromptData` is an error.
pub fn parse_prompt_data(text: &str) -> Result<PromptData, PromptError> {
    let prompt: PromptData = serde_json::from_str(text.trim()).map_err(|e| {
        PromptError::Parse(format!("the model response was not valid prompt JSON ({})", e))
    })?;
    prompt.validate()?;
    Ok(prompt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::models::sample_prompt;
    use actix_web::{App, HttpRequest, HttpResponse, HttpServer, web};

    fn gemini_envelope(text: &str) -> Value {
        json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": text }] },
                "finishReason": "STOP"
            }]
        })
    }

    fn png_payload() -> EncodedImage {
        EncodedImage {
            data: "iVBORw0KGgo=".to_string(),
            mime_type: "image/png".to_string(),
        }
    }

    /// Serves `response` for every generateContent call on a throwaway port.
    fn fake_gemini(status: u16, response: String) -> String {
        let server = HttpServer::new(move || {
            let response = response.clone();
            App::new().default_service(web::to(move |req: HttpRequest, body: web::Bytes| {
                let response = response.clone();
                async move {
                    assert!(req.path().ends_with(":generateContent"));
                    assert_eq!(
                        req.headers()
                            .get("x-goog-api-key")
                            .and_then(|v| v.to_str().ok()),
                        Some("test-key")
                    );
                    let sent: Value = serde_json::from_slice(&body).unwrap();
                    assert_eq!(
                        sent["contents"][0]["parts"][0]["inlineData"]["mimeType"],
                        "image/png"
                    );
                    HttpResponse::build(
                        actix_web::http::StatusCode::from_u16(status).unwrap(),
                    )
                    .content_type("application/json")
                    .body(response)
                }
            }))
        })
        .workers(1)
        .disable_signals()
        .bind(("127.0.0.1", 0))
        .unwrap();

        let addr = server.addrs()[0];
        actix_web::rt::spawn(server.run());
        format!("http://{}/v1beta", addr)
    }

    fn client_for(api_base: String) -> GeminiClient {
        let config = Config::from_lookup(|key| match key {
            "API_KEY" => Some("test-key".to_string()),
            "GEMINI_API_BASE" => Some(api_base.clone()),
            _ => None,
        })
        .unwrap();
        GeminiClient::new(&config)
    }

    #[test]
    fn schema_requires_every_field() {
        let schema = response_schema();

        assert_eq!(
            schema["required"],
            json!(["positive_prompt", "negative_prompt", "parameters"])
        );
        assert_eq!(
            schema["properties"]["parameters"]["required"],
            json!([
                "style",
                "lighting",
                "camera",
                "color_palette",
                "cfg_scale",
                "steps",
                "sampler",
                "seed",
                "aspect_ratio"
            ])
        );
        assert_eq!(
            schema["properties"]["parameters"]["properties"]["color_palette"]["items"]["type"],
            "STRING"
        );
    }

    #[test]
    fn request_carries_image_instruction_and_schema() {
        let body = GeminiClient::request_body(&png_payload());

        assert_eq!(
            body["contents"][0]["parts"][0]["inlineData"],
            json!({ "data": "iVBORw0KGgo=", "mimeType": "image/png" })
        );
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], SYSTEM_INSTRUCTION);
        assert_eq!(
            body["generationConfig"]["responseMimeType"],
            "application/json"
        );
        assert_eq!(body["generationConfig"]["responseSchema"], response_schema());
    }

    #[test]
    fn parses_complete_prompt() {
        let text = serde_json::to_string(&sample_prompt()).unwrap();

        assert_eq!(parse_prompt_data(&text).unwrap(), sample_prompt());
    }

    #[test]
    fn prose_response_is_a_parse_error() {
        let err = parse_prompt_data("Here is your prompt: a cat on a mat").unwrap_err();

        assert!(matches!(err, PromptError::Parse(_)));
        assert!(err.to_string().starts_with("Failed to generate prompt: "));
    }

    #[test]
    fn partial_prompt_is_a_parse_error() {
        let mut value = serde_json::to_value(sample_prompt()).unwrap();
        value["parameters"]
            .as_object_mut()
            .unwrap()
            .remove("seed");

        assert!(matches!(
            parse_prompt_data(&value.to_string()),
            Err(PromptError::Parse(_))
        ));
    }

    #[test]
    fn candidate_parts_are_joined() {
        let result = json!({
            "candidates": [{
                "content": { "parts": [{ "text": "{\"a\":" }, { "text": " 1}\n" }] }
            }]
        });

        assert_eq!(candidate_text(&result).unwrap(), "{\"a\": 1}");
    }

    #[test]
    fn blocked_prompt_is_a_transport_error() {
        let result = json!({ "promptFeedback": { "blockReason": "SAFETY" } });

        let err = candidate_text(&result).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Failed to generate prompt: Gemini blocked the request: SAFETY"
        );
    }

    #[test]
    fn provider_error_message_prefers_provider_text() {
        let json_body = r#"{"error":{"code":400,"message":"Invalid API key","status":"INVALID_ARGUMENT"}}"#;

        assert_eq!(
            provider_error_message(StatusCode::BAD_REQUEST, json_body),
            "Invalid API key"
        );
    }

    #[test]
    fn non_json_error_body_is_reduced_to_status_line() {
        let html = format!(
            "<html><head><title>502 Bad Gateway</title></head><body>{}</body></html>",
            "<p>upstream connect error</p>".repeat(100)
        );

        assert_eq!(
            provider_error_message(StatusCode::BAD_GATEWAY, &html),
            "Gemini returned 502 Bad Gateway"
        );
        assert_eq!(
            provider_error_message(StatusCode::TOO_MANY_REQUESTS, ""),
            "Gemini returned 429 Too Many Requests"
        );
    }

    #[test]
    fn json_error_body_without_message_is_truncated() {
        let body = json!({ "detail": "x".repeat(1000) }).to_string();

        let message = provider_error_message(StatusCode::INTERNAL_SERVER_ERROR, &body);

        assert!(message.starts_with("Gemini returned 500 Internal Server Error: {"));
        assert!(message.ends_with("..."));
        assert!(message.len() < 300);
    }

    #[actix_web::test]
    async fn proxy_error_page_does_not_reach_the_user_verbatim() {
        let api_base = fake_gemini(503, "<html><body><h1>Service Unavailable</h1></body></html>".to_string());

        let err = client_for(api_base)
            .generate_prompt(&png_payload())
            .await
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "Failed to generate prompt: Gemini returned 503 Service Unavailable"
        );
    }

    #[actix_web::test]
    async fn generates_prompt_over_http() {
        let text = serde_json::to_string(&sample_prompt()).unwrap();
        let api_base = fake_gemini(200, gemini_envelope(&text).to_string());

        let prompt = client_for(api_base)
            .generate_prompt(&png_payload())
            .await
            .unwrap();

        assert_eq!(prompt, sample_prompt());
    }

    #[actix_web::test]
    async fn invalid_key_surfaces_provider_message() {
        let body = json!({
            "error": { "code": 400, "message": "Invalid API key", "status": "INVALID_ARGUMENT" }
        });
        let api_base = fake_gemini(400, body.to_string());

        let err = client_for(api_base)
            .generate_prompt(&png_payload())
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Failed to generate prompt: Invalid API key");
    }

    #[actix_web::test]
    async fn non_json_candidate_fails_without_partial_result() {
        let api_base = fake_gemini(200, gemini_envelope("I see a lovely sunset.").to_string());

        let err = client_for(api_base)
            .generate_prompt(&png_payload())
            .await
            .unwrap_err();

        assert!(matches!(err, PromptError::Parse(_)));
    }
}
