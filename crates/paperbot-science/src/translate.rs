//! Abstract translation and structured paper extraction through an
//! OpenAI-compatible chat-completions endpoint.

use std::time::Duration;

use async_trait::async_trait;
use paperbot_core::config::TranslatorConfig;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::{Result, TranslationError};
use crate::http::{HttpClient, HttpOptions};

/// Fields returned by the structured extraction call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuredExtraction {
    pub title: String,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    #[serde(default)]
    pub translation: String,
    #[serde(default)]
    pub keywords: Vec<String>,
}

#[async_trait]
pub trait Translator: Send + Sync {
    /// Translated text, or `None` when no translation is available.
    async fn translate(&self, text: &str) -> Option<String>;

    /// Title, authors, abstract, translation and keywords from a paper excerpt.
    async fn extract_structured(&self, text: &str) -> Option<StructuredExtraction>;
}

pub struct OpenAiTranslator {
    client: HttpClient,
    base_url: String,
    model: String,
    api_key: Option<String>,
    api_key_env: String,
    target_language: String,
}

impl OpenAiTranslator {
    /// Build from config. The API key is read from the environment variable the
    /// config names; a missing key is reported on first use, not here.
    pub fn new(config: &TranslatorConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty());
        Self::with_key(config, api_key)
    }

    pub fn with_key(config: &TranslatorConfig, api_key: Option<String>) -> Result<Self> {
        let client = HttpClient::new(HttpOptions {
            timeout: Duration::from_secs(config.timeout_secs),
            retries: 0,
            ..HttpOptions::default()
        })?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
            api_key_env: config.api_key_env.clone(),
            target_language: config.target_language.clone(),
        })
    }

    pub async fn try_translate(&self, text: &str) -> std::result::Result<String, TranslationError> {
        let system = format!(
            "You are a professional translator specializing in academic research articles, \
             particularly in the fields of psychology and neuroscience. Your task is to produce \
             high-quality, accurate, and elegant {lang} translations of English abstracts. \
             Ensure the translation retains the original meaning while using professional and precise terminology.",
            lang = self.target_language
        );
        let user = format!(
            "Translate the following academic abstract to {lang}:\n\n{text}\n\n\
             Requirements:\n\
             1. Maintain high accuracy and fidelity to the original meaning.\n\
             2. Use professional terminology commonly used in psychology and neuroscience.\n\
             3. Ensure the translation reads naturally and elegantly in {lang}.",
            lang = self.target_language
        );

        let body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user},
            ],
        });
        self.complete(&body).await
    }

    pub async fn try_extract_structured(
        &self,
        text: &str,
    ) -> std::result::Result<StructuredExtraction, TranslationError> {
        let system = format!(
            "You are an assistant specialized in processing academic papers in psychology and neuroscience. \
             Your task is to accurately extract structured information from the provided content without adding interpretations or modifications. \
             Focus on precision. When translating to {lang}, ensure the translation retains the original meaning accurately.",
            lang = self.target_language
        );
        let user = format!(
            "The following is an excerpt from an academic paper:\n{text}\n\n\
             Please perform the following tasks:\n\
             1. Extract the 'Abstract' exactly as written in the original text.\n\
             2. Translate the abstract into {lang}.\n\
             3. Extract the 'Title' of the paper.\n\
             4. Extract the 'Authors'.\n\
             5. Extract the 'Keywords'.\n\
             Return the results as a JSON object with the keys title, authors, abstract, translation and keywords.",
            lang = self.target_language
        );

        let body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user},
            ],
            "response_format": {
                "type": "json_schema",
                "json_schema": {
                    "name": "academic_extraction",
                    "schema": extraction_schema(&self.target_language),
                },
            },
        });

        let content = self.complete(&body).await?;
        serde_json::from_str(&content).map_err(|e| TranslationError::MalformedResponse(e.to_string()))
    }

    async fn complete(&self, body: &Value) -> std::result::Result<String, TranslationError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| TranslationError::MissingApiKey(self.api_key_env.clone()))?;

        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {api_key}"))
            .map_err(|e| TranslationError::MissingApiKey(e.to_string()))?;
        headers.insert(AUTHORIZATION, bearer);

        let url = format!("{}/chat/completions", self.base_url);
        let val: Value = self.client.post_json_with_headers(&url, body, headers).await?;

        let content = val["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| {
                TranslationError::MalformedResponse("missing choices[0].message.content".to_string())
            })?
            .trim();
        if content.is_empty() {
            return Err(TranslationError::EmptyResponse);
        }
        Ok(content.to_string())
    }
}

#[async_trait]
impl Translator for OpenAiTranslator {
    async fn translate(&self, text: &str) -> Option<String> {
        if text.trim().is_empty() {
            return None;
        }
        match self.try_translate(text).await {
            Ok(t) => Some(t),
            Err(e) => {
                tracing::warn!(error = %e, "translation failed");
                None
            }
        }
    }

    async fn extract_structured(&self, text: &str) -> Option<StructuredExtraction> {
        match self.try_extract_structured(text).await {
            Ok(x) => Some(x),
            Err(e) => {
                tracing::warn!(error = %e, "structured extraction failed");
                None
            }
        }
    }
}

fn extraction_schema(lang: &str) -> Value {
    json!({
        "type": "object",
        "properties": {
            "title": {"description": "The title of the academic paper", "type": "string"},
            "authors": {
                "description": "A list of authors of the paper",
                "type": "array",
                "items": {"type": "string"}
            },
            "abstract": {"description": "The abstract text as it appears in the paper", "type": "string"},
            "translation": {"description": format!("The {lang} translation of the abstract"), "type": "string"},
            "keywords": {
                "description": "Keywords extracted from the paper",
                "type": "array",
                "items": {"type": "string"}
            }
        },
        "required": ["title", "authors", "abstract", "translation", "keywords"]
    })
}
