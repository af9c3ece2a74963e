//! README to article conversion.
//!
//! A README is expected to open with a single level-1 heading. That heading
//! becomes the article title and is dropped from the body; the rest of the
//! document is posted as markdown with relative images made absolute.

use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::error::FormatError;
use crate::links::{resolve_relative_links, split_leading_image};

/// Tag attached to every generated article.
pub const AUTOGENERATED_TAG: &str = "autogenerated";

/// Article content as sent to the publishing platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleDocument {
    pub title: String,
    pub published: bool,
    #[serde(rename = "body_markdown")]
    pub body: String,
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_image: Option<String>,
}

impl ArticleDocument {
    /// The request body expected by the create/update article endpoints.
    pub fn to_request_body(&self) -> serde_json::Value {
        serde_json::json!({ "article": self })
    }
}

/// Everything the builder needs besides the README itself.
#[derive(Debug, Clone)]
pub struct PayloadContext {
    /// Where relative image links in the README resolve to.
    pub base_url: Url,
    pub organization_id: Option<i64>,
    /// Move an image that opens the body into the cover image slot.
    pub cover_image: bool,
}

/// Build an article from README markdown.
pub fn build_article(readme: &str, ctx: &PayloadContext) -> Result<ArticleDocument, FormatError> {
    let readme = readme.trim();
    if readme.is_empty() {
        return Err(FormatError::Empty);
    }

    let (first_line, rest) = readme.split_once('\n').unwrap_or((readme, ""));
    let first_line = first_line.trim();

    // H1 only: one `#` and not `##`.
    if !first_line.starts_with('#') || first_line[1..].starts_with('#') {
        return Err(FormatError::NotH1);
    }

    let title = first_line.trim_start_matches('#').trim();
    if title.is_empty() {
        return Err(FormatError::EmptyTitle);
    }

    let mut body = rest.trim();
    let mut main_image = None;
    if ctx.cover_image {
        if let Some((cover, remainder)) = split_leading_image(body, &ctx.base_url) {
            main_image = Some(cover);
            body = remainder;
        }
    }

    let body = resolve_relative_links(body, &ctx.base_url).into_owned();

    Ok(ArticleDocument {
        title: title.to_string(),
        published: false,
        body,
        tags: vec![AUTOGENERATED_TAG.to_string()],
        organization_id: ctx.organization_id,
        main_image,
    })
}
