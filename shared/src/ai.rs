use log::{debug, error, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::env;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_MODEL: &str = "gemini-3-flash-preview";

const THANKS_NO_KEY: &str = "Thank you for your kindness! May this warmth light up your life too.";
const THANKS_EMPTY: &str = "Thank you for your kindness. May warmth always be with you.";
const ENCOURAGEMENT_NO_KEY: &str = "Keep going! The future is bright!";
const ENCOURAGEMENT_EMPTY: &str = "Even through the cracks, may you bloom into the loveliest flower.";
const ENCOURAGEMENT_FAILED: &str =
    "Kids, the world out there is wonderful, and I'll be waiting for you in the future!";

fn thanks_failed(name: &str) -> String {
    format!(
        "Thank you, {}. Every act of kindness is a ray of light in the dark. We'll carry your love forward.",
        name
    )
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Deserialize, Default)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateResponse {
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| {
                c.parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
            .trim()
            .to_string()
    }
}

/// Generative text for the thank-you note and guestbook suggestions.
///
/// Never fails: a missing key, an empty completion or a failed call all fall
/// back to fixed text.
#[derive(Clone)]
pub struct TextWriter {
    client: Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
}

impl TextWriter {
    pub fn new(api_key: Option<String>) -> Self {
        Self::with_base_url(api_key, GEMINI_BASE_URL, DEFAULT_MODEL)
    }

    pub fn with_base_url(
        api_key: Option<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        TextWriter {
            client: Client::new(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            model: model.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_env() -> Self {
        let api_key = env::var("GEMINI_API_KEY").ok();
        if api_key.is_none() {
            error!("GEMINI_API_KEY is missing; generated text will use fallbacks");
        }
        Self::with_base_url(
            api_key,
            env::var("GEMINI_BASE_URL").unwrap_or_else(|_| GEMINI_BASE_URL.to_string()),
            env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
        )
    }

    async fn generate(&self, api_key: &str, prompt: &str) -> Result<String, String> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        let body = GenerateRequest {
            contents: [Content {
                parts: [Part { text: prompt }],
            }],
        };

        let response = self
            .client
            .post(url)
            .query(&[("key", api_key)])
            .json(&body)
            .send()
            .await
            .map_err(|e| format!("Failed to reach text API: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(format!("Text API error: {} - {}", status, text));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| format!("Failed to parse text API response: {}", e))?;
        Ok(parsed.text())
    }

    /// Short thank-you note for a new subscriber.
    pub async fn thank_you_note(&self, name: &str, wants_postcard: bool) -> String {
        let Some(api_key) = self.api_key.as_deref() else {
            return THANKS_NO_KEY.to_string();
        };

        let context = if wants_postcard {
            "The user has also requested a physical postcard."
        } else {
            "The user has subscribed to email updates."
        };
        let prompt = format!(
            "You are a warm, gentle voice for a charity group of 4 girls donating clothes to rural schools.\n\
             Write a short, poetic, and emotional thank you message (max 60 words) in Chinese for a donor named \"{}\".\n\
             {}\n\
             Express gratitude for their connection and promise to keep them updated.\n\
             Tone: Sincere, touching, hopeful.",
            name, context
        );

        match self.generate(api_key, &prompt).await {
            Ok(text) if !text.is_empty() => text,
            Ok(_) => THANKS_EMPTY.to_string(),
            Err(e) => {
                error!("Error generating thank you note: {}", e);
                thanks_failed(name)
            }
        }
    }

    /// One encouraging sentence a donor might leave for a student.
    pub async fn encouragement(&self) -> String {
        let Some(api_key) = self.api_key.as_deref() else {
            return ENCOURAGEMENT_NO_KEY.to_string();
        };

        let prompt = "Generate a short, encouraging message (1 sentence, Chinese) that a donor might write to a student in a rural school.\n\
                      Focus on studying hard, dreaming big, or feeling loved.";

        match self.generate(api_key, prompt).await {
            Ok(text) if !text.is_empty() => text,
            Ok(_) => {
                debug!("Text API returned an empty encouragement");
                ENCOURAGEMENT_EMPTY.to_string()
            }
            Err(e) => {
                warn!("Error generating encouragement: {}", e);
                ENCOURAGEMENT_FAILED.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    const PATH: &str = "/v1beta/models/test-model:generateContent";

    #[tokio::test]
    async fn missing_key_uses_canned_text() {
        let writer = TextWriter::with_base_url(None, "http://127.0.0.1:9", "test-model");
        assert_eq!(writer.thank_you_note("Ann", true).await, THANKS_NO_KEY);
        assert_eq!(writer.encouragement().await, ENCOURAGEMENT_NO_KEY);

        let blank = TextWriter::with_base_url(Some("  ".into()), "http://127.0.0.1:9", "m");
        assert_eq!(blank.encouragement().await, ENCOURAGEMENT_NO_KEY);
    }

    #[tokio::test]
    async fn returns_generated_text() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", PATH)
            .match_query(Matcher::UrlEncoded("key".into(), "secret".into()))
            .match_body(Matcher::Regex("postcard".into()))
            .with_status(200)
            .with_body(
                r#"{"candidates":[{"content":{"parts":[{"text":" Thank you, Ann! "}]}}]}"#,
            )
            .create_async()
            .await;

        let writer = TextWriter::with_base_url(Some("secret".into()), server.url(), "test-model");
        assert_eq!(writer.thank_you_note("Ann", true).await, "Thank you, Ann!");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn failure_falls_back_to_personal_note() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", PATH)
            .match_query(Matcher::Any)
            .with_status(500)
            .create_async()
            .await;

        let writer = TextWriter::with_base_url(Some("secret".into()), server.url(), "test-model");
        assert_eq!(writer.thank_you_note("Ann", false).await, thanks_failed("Ann"));
        assert_eq!(writer.encouragement().await, ENCOURAGEMENT_FAILED);
    }

    #[tokio::test]
    async fn empty_completion_uses_secondary_text() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", PATH)
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"candidates":[]}"#)
            .expect_at_least(1)
            .create_async()
            .await;

        let writer = TextWriter::with_base_url(Some("secret".into()), server.url(), "test-model");
        assert_eq!(writer.encouragement().await, ENCOURAGEMENT_EMPTY);
        assert_eq!(writer.thank_you_note("Ann", false).await, THANKS_EMPTY);
    }
}
