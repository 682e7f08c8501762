//! Prompt construction for every AI call in the pipeline. All responses
//! are parsed through `ai_client::parse_completion`, so each prompt pins
//! down the expected JSON shape.

use ai_client::truncate_utf8;
use newsloom_common::Criterion;
use newsloom_store::{Article, SourceItem};

/// Item content is truncated to stay clear of token limits.
const MAX_CONTENT_BYTES: usize = 30_000;

pub const SCORING_SYSTEM_PROMPT: &str = "You are an editorial scorer for a daily news digest. \
You evaluate one story against one criterion at a time and respond with JSON only: \
{\"score\": <number 0-10>, \"reason\": \"<one or two sentences>\"}. \
Scores are on a 0-10 scale where 0 means the story completely fails the criterion \
and 10 means it could not do better.";

pub fn criterion_prompt(criterion: &Criterion, item: &SourceItem) -> String {
    let content = truncate_utf8(&item.description, MAX_CONTENT_BYTES);
    format!(
        "Criterion: {name}\n{guidance}\n\nStory title: {title}\n\nStory content:\n{content}\n\n\
         Respond with JSON only: {{\"score\": <0-10>, \"reason\": \"...\"}}",
        name = criterion.name,
        guidance = criterion.guidance,
        title = item.title,
    )
}

pub const DEDUP_SYSTEM_PROMPT: &str = "You detect duplicate news coverage. Given a numbered list \
of stories, group the ones covering the same underlying event. Respond with JSON only: \
{\"groups\": [{\"primary\": <index>, \"duplicates\": [<index>, ...], \"topic\": \"<short topic \
signature>\"}]}. Use the 1-based indices from the list. The primary should be the most complete \
telling of the story. Stories without duplicates must not appear in any group. If there are no \
duplicates at all, respond {\"groups\": []}.";

pub fn dedup_prompt(items: &[SourceItem]) -> String {
    let mut lines = Vec::with_capacity(items.len() + 1);
    for (i, item) in items.iter().enumerate() {
        let summary = truncate_utf8(&item.description, 500);
        lines.push(format!("{}. {} — {}", i + 1, item.title, summary));
    }
    lines.push("\nGroup the duplicates. JSON only.".to_string());
    lines.join("\n")
}

pub const REWRITE_SYSTEM_PROMPT: &str = "You are a newsletter writer. Rewrite the given story \
into original, publish-ready copy: a punchy headline and a body of roughly 150-250 words in a \
conversational but precise tone. Never invent facts that are not in the source. Respond with \
JSON only: {\"headline\": \"...\", \"body\": \"...\"}.";

pub fn rewrite_prompt(item: &SourceItem) -> String {
    let content = truncate_utf8(&item.description, MAX_CONTENT_BYTES);
    format!(
        "Source title: {title}\nSource URL: {url}\n\nSource content:\n{content}",
        title = item.title,
        url = item.url,
    )
}

pub const FACT_CHECK_SYSTEM_PROMPT: &str = "You are a fact-checker. Compare rewritten newsletter \
copy against its source text. Score fidelity from 0 to 20: start at 20 and subtract for every \
claim in the copy that the source does not support. 15 or above passes. Respond with JSON only: \
{\"score\": <0-20>, \"passed\": <bool>, \"issues\": [\"<unsupported claim>\", ...]}.";

pub fn fact_check_prompt(headline: &str, body: &str, item: &SourceItem) -> String {
    let content = truncate_utf8(&item.description, MAX_CONTENT_BYTES);
    format!(
        "Rewritten headline: {headline}\n\nRewritten body:\n{body}\n\n---\n\n\
         Source title: {title}\n\nSource text:\n{content}",
        title = item.title,
    )
}

pub const SUBJECT_SYSTEM_PROMPT: &str = "You write email subject lines for a daily news digest. \
Given the lead story, respond with one subject line of at most 70 characters. Plain text only, \
no quotes, no emoji.";

pub fn subject_prompt(top_article: &Article) -> String {
    format!(
        "Lead headline: {}\n\nLead story:\n{}",
        top_article.headline,
        truncate_utf8(&top_article.body, 2_000),
    )
}
