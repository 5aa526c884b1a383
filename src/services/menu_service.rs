//! Menu suggestions from an OpenAI-compatible chat completion endpoint.

use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::{
    config::SuggestionSettings,
    dto::menu::{MenuSuggestRequest, MenuSuggestResponse},
    error::ServiceError,
    services::upstream::{UpstreamError, UpstreamResult, send_json},
    state::SharedState,
};

const PROVIDER: &str = "suggestions";
const CHAT_COMPLETIONS_PATH: &str = "/chat/completions";

/// Ask the model for `count` menu names. Single attempt, no retry.
pub async fn suggest(
    state: &SharedState,
    request: MenuSuggestRequest,
) -> Result<MenuSuggestResponse, ServiceError> {
    let settings = &state.config().suggestions;
    match request_items(state.http(), settings, &request).await {
        Ok(items) => {
            info!(theme = %request.theme, count = items.len(), "menu suggestions generated");
            Ok(MenuSuggestResponse { items })
        }
        Err(err) => {
            warn!(theme = %request.theme, error = %err, "menu suggestion failed");
            Err(err.into())
        }
    }
}

async fn request_items(
    http: &reqwest::Client,
    settings: &SuggestionSettings,
    request: &MenuSuggestRequest,
) -> UpstreamResult<Vec<String>> {
    let key = settings
        .api_key
        .as_deref()
        .ok_or(UpstreamError::MissingKey { provider: PROVIDER })?;

    let url = format!("{}{}", settings.base_url.trim_end_matches('/'), CHAT_COMPLETIONS_PATH);
    let builder = http
        .post(url)
        .bearer_auth(key)
        .json(&completion_body(&settings.model, request));

    let completion: ChatCompletion = send_json(PROVIDER, builder).await?;
    let content = completion
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content)
        .ok_or_else(|| malformed("no choices returned"))?;

    parse_items(&content, usize::from(request.count()))
}

fn completion_body(model: &str, request: &MenuSuggestRequest) -> Value {
    let locale = request.locale.as_deref().unwrap_or("en");
    json!({
        "model": model,
        "temperature": 0.8,
        "messages": [
            {
                "role": "system",
                "content": "You suggest dishes for a lunch roulette wheel. Answer with a JSON array of short dish names and nothing else."
            },
            {
                "role": "user",
                "content": format!(
                    "Suggest {} dishes for the theme \"{}\". Use the language of locale {}.",
                    request.count(),
                    request.theme,
                    locale
                )
            }
        ]
    })
}

/// Extract a JSON string array from the model output, tolerating surrounding prose or code
/// fences. Blank and duplicate names are dropped.
fn parse_items(content: &str, limit: usize) -> UpstreamResult<Vec<String>> {
    let start = content.find('[').ok_or_else(|| malformed("no JSON array in answer"))?;
    let end = content.rfind(']').ok_or_else(|| malformed("no JSON array in answer"))?;
    if end < start {
        return Err(malformed("no JSON array in answer"));
    }

    let raw: Vec<Value> = serde_json::from_str(&content[start..=end])
        .map_err(|err| malformed(&format!("invalid JSON array: {err}")))?;

    let mut items: Vec<String> = Vec::new();
    for name in raw.iter().filter_map(Value::as_str).map(str::trim) {
        if !name.is_empty() && !items.iter().any(|existing| existing == name) {
            items.push(name.to_string());
        }
    }
    items.truncate(limit);

    if items.is_empty() {
        return Err(malformed("empty suggestion list"));
    }
    Ok(items)
}

fn malformed(reason: &str) -> UpstreamError {
    UpstreamError::Malformed {
        provider: PROVIDER,
        reason: reason.to_string(),
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arrays_inside_code_fences_are_parsed() {
        let content = "Sure!\n```json\n[\"Bibimbap\", \" Kimchi stew \", \"Bibimbap\", \"\", 3]\n```";
        let items = parse_items(content, 8).unwrap();
        assert_eq!(items, vec!["Bibimbap".to_string(), "Kimchi stew".to_string()]);
    }

    #[test]
    fn suggestions_are_capped() {
        let items = parse_items(r#"["a","b","c","d"]"#, 2).unwrap();
        assert_eq!(items, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn prose_without_array_is_malformed() {
        assert!(matches!(
            parse_items("I like noodles.", 3),
            Err(UpstreamError::Malformed { .. })
        ));
        assert!(matches!(parse_items("[]", 3), Err(UpstreamError::Malformed { .. })));
    }

    #[test]
    fn malformed_answers_map_to_bad_gateway() {
        let err = ServiceError::from(malformed("nope"));
        assert!(matches!(err, ServiceError::Upstream { provider: PROVIDER, .. }));
    }
}
