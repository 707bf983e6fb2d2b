//! The two LLM-calling stages of template generation.
//!
//! Stage 1 turns a slide image (plus any extracted markup) into a
//! standalone HTML layout. Stage 2 turns that HTML into a reusable
//! component. Both go through the same client.

use slidegen_core::types::{LlmRequest, Message};
use slidegen_providers::{FatalReason, LlmClient, LlmError};
use tracing::debug;

use crate::job::SlideInput;

const HTML_SYSTEM_PROMPT: &str = "\
You recreate presentation slides as HTML.

Rules:
- Output a single self-contained HTML fragment styled with Tailwind CSS classes.
- Match the layout, spacing, colors and typography of the slide image.
- Replace concrete text with short placeholder text of similar length.
- Keep images as <img> tags with descriptive alt text and placeholder src.
- Do not add scripts. Do not explain; output only the HTML.";

const COMPONENT_SYSTEM_PROMPT: &str = "\
You convert slide HTML into a React component written in TypeScript (TSX).

Rules:
- Export a default function component that renders the same layout.
- Every placeholder text or image becomes a typed prop with a sensible default.
- Keep the Tailwind classes unchanged.
- Output only the component source.";

/// Upper bound on tokens for either stage.
pub const STAGE_MAX_TOKENS: u32 = 8192;

// ─────────────────────────────────────────────
// Request builders
// ─────────────────────────────────────────────

pub fn html_request(slide: &SlideInput) -> LlmRequest {
    let mut prompt = format!("Recreate slide {} as HTML.", slide.index + 1);
    if let Some(markup) = slide.markup.as_deref().filter(|m| !m.trim().is_empty()) {
        prompt.push_str("\n\nText and structure extracted from the source document:\n");
        prompt.push_str(markup);
    }
    LlmRequest::new(vec![
        Message::system(HTML_SYSTEM_PROMPT),
        Message::user_with_image(prompt, slide.image_data_uri.as_str()),
    ])
    .with_max_tokens(STAGE_MAX_TOKENS)
}

pub fn component_request(html: &str) -> LlmRequest {
    LlmRequest::new(vec![
        Message::system(COMPONENT_SYSTEM_PROMPT),
        Message::user(format!("Convert this slide HTML:\n\n{html}")),
    ])
    .with_max_tokens(STAGE_MAX_TOKENS)
}

// ─────────────────────────────────────────────
// Stage runners
// ─────────────────────────────────────────────

/// Stage 1: slide image to HTML.
pub async fn generate_html(client: &dyn LlmClient, slide: &SlideInput) -> Result<String, LlmError> {
    let response = client.chat(&html_request(slide)).await?;
    let html = non_empty(client, extract_code(response.content_str(), &["html"]))?;
    debug!(slide = slide.index, bytes = html.len(), "html stage done");
    Ok(html)
}

/// Stage 2: HTML to component source.
pub async fn generate_component(client: &dyn LlmClient, index: usize, html: &str) -> Result<String, LlmError> {
    let response = client.chat(&component_request(html)).await?;
    let code = non_empty(
        client,
        extract_code(response.content_str(), &["tsx", "jsx", "typescript", "ts"]),
    )?;
    debug!(slide = index, bytes = code.len(), "component stage done");
    Ok(code)
}

fn non_empty(client: &dyn LlmClient, text: &str) -> Result<String, LlmError> {
    if text.trim().is_empty() {
        return Err(LlmError::fatal(
            client.provider(),
            client.model(),
            FatalReason::MalformedResponse,
            "model returned no content",
        ));
    }
    Ok(text.to_string())
}

/// Extract code from a reply that may be wrapped in markdown fences.
///
/// Prefers a fence tagged with one of `langs`, then any fence, then the
/// whole reply.
pub fn extract_code<'a>(text: &'a str, langs: &[&str]) -> &'a str {
    for lang in langs {
        let tag = format!("```{lang}");
        if let Some(start) = text.find(&tag) {
            let content = &text[start + tag.len()..];
            // Skip the rest of the fence line
            let content = content.split_once('\n').map_or("", |(_, rest)| rest);
            if let Some(end) = content.find("```") {
                return content[..end].trim();
            }
        }
    }
    if let Some(start) = text.find("```") {
        let content = &text[start + 3..];
        let content = content.split_once('\n').map_or("", |(_, rest)| rest);
        if let Some(end) = content.find("```") {
            return content[..end].trim();
        }
    }
    text.trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use slidegen_core::types::LlmResponse;
    use slidegen_core::Provider;

    struct Reply(&'static str);

    #[async_trait]
    impl LlmClient for Reply {
        async fn chat(&self, _request: &LlmRequest) -> Result<LlmResponse, LlmError> {
            Ok(LlmResponse::text(self.0))
        }
        fn provider(&self) -> Provider {
            Provider::Custom
        }
        fn model(&self) -> &str {
            "stub"
        }
    }

    #[test]
    fn test_extract_code_tagged_fence() {
        let text = "Here you go:\n```html\n<div>a</div>\n```\nDone.";
        assert_eq!(extract_code(text, &["html"]), "<div>a</div>");
    }

    #[test]
    fn test_extract_code_prefers_tagged_over_first_fence() {
        let text = "```\nnotes\n```\n```tsx\nexport default function S() {}\n```";
        assert_eq!(extract_code(text, &["tsx"]), "export default function S() {}");
    }

    #[test]
    fn test_extract_code_untagged_and_bare() {
        assert_eq!(extract_code("```\n<p/>\n```", &["html"]), "<p/>");
        assert_eq!(extract_code("  <section/>  ", &["html"]), "<section/>");
        // Unterminated fence falls back to the whole reply
        assert_eq!(extract_code("```html\n<p>", &["html"]), "```html\n<p>");
    }

    #[test]
    fn test_html_request_carries_image_and_markup() {
        let slide = SlideInput::new(2, "data:image/png;base64,AA==").with_markup("<h1>Q3</h1>");
        let request = html_request(&slide);
        assert!(request.has_images());
        assert_eq!(request.max_tokens, STAGE_MAX_TOKENS);
        let json = serde_json::to_value(&request.messages[1]).unwrap();
        let text = json["content"][1]["text"].as_str().unwrap();
        assert!(text.contains("slide 3"));
        assert!(text.contains("<h1>Q3</h1>"));
    }

    #[test]
    fn test_component_request_has_no_image() {
        let request = component_request("<div/>");
        assert!(!request.has_images());
    }

    #[tokio::test]
    async fn test_stage_runners_strip_fences() {
        let client = Reply("```html\n<div>x</div>\n```");
        let html = generate_html(&client, &SlideInput::new(0, "data:image/png;base64,AA=="))
            .await
            .unwrap();
        assert_eq!(html, "<div>x</div>");

        let client = Reply("```tsx\nexport default function Slide() {}\n```");
        let code = generate_component(&client, 0, "<div>x</div>").await.unwrap();
        assert_eq!(code, "export default function Slide() {}");
    }

    #[tokio::test]
    async fn test_empty_reply_is_fatal() {
        let err = generate_html(&Reply("   "), &SlideInput::new(0, "data:image/png;base64,AA=="))
            .await
            .unwrap_err();
        assert!(!err.is_transient());
        assert_eq!(err.provider(), Provider::Custom);
        assert_eq!(err.model(), "stub");
    }
}
