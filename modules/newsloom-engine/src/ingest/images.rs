//! Best-effort image extraction from a feed entry.

use regex::Regex;
use url::Url;

use super::feed::RawItem;

/// Extract an image URL with ordered fallbacks: structured media fields,
/// then an embedded HTML `<img>`, then a bare image URL in the raw text,
/// then thumbnail-like fields. Relative and non-http candidates are
/// discarded.
pub fn extract_image_url(item: &RawItem) -> Option<String> {
    if let Some(url) = item
        .media_urls
        .iter()
        .find(|u| is_http_url(u) && looks_like_image(u))
    {
        return Some(url.clone());
    }
    if let Some(url) = image_from_html(&item.description).filter(|u| is_http_url(u)) {
        return Some(url);
    }
    if let Some(url) = image_from_raw_text(&item.description) {
        return Some(url);
    }
    item.thumbnail_urls
        .iter()
        .find(|u| is_http_url(u))
        .cloned()
}

fn is_http_url(candidate: &str) -> bool {
    Url::parse(candidate)
        .map(|u| matches!(u.scheme(), "http" | "https"))
        .unwrap_or(false)
}

fn looks_like_image(url: &str) -> bool {
    let path = url.split(['?', '#']).next().unwrap_or(url).to_lowercase();
    [".png", ".jpg", ".jpeg", ".gif", ".webp"]
        .iter()
        .any(|ext| path.ends_with(ext))
        // media:content attachments are usually images even without an
        // extension; accept anything that isn't obviously audio/video.
        || !([".mp3", ".mp4", ".m4a", ".mov", ".avi", ".ogg", ".wav"]
            .iter()
            .any(|ext| path.ends_with(ext)))
}

fn image_from_html(html: &str) -> Option<String> {
    let pattern = Regex::new(r#"<img[^>]+src\s*=\s*["']([^"']+)["']"#).expect("Invalid img regex");
    pattern
        .captures(html)
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str().to_string())
}

fn image_from_raw_text(text: &str) -> Option<String> {
    let pattern = Regex::new(r#"(?i)https?://[^\s"'<>]+\.(?:png|jpe?g|gif|webp)(?:\?[^\s"'<>]*)?"#)
        .expect("Invalid image URL regex");
    pattern.find(text).map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item() -> RawItem {
        RawItem {
            external_id: "e1".to_string(),
            title: "Title".to_string(),
            url: "https://example.com/story".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn prefers_structured_media() {
        let mut i = item();
        i.media_urls = vec!["https://cdn.example.com/photo.jpg".to_string()];
        i.description = r#"<img src="https://example.com/other.png">"#.to_string();
        assert_eq!(
            extract_image_url(&i).as_deref(),
            Some("https://cdn.example.com/photo.jpg")
        );
    }

    #[test]
    fn skips_non_image_media() {
        let mut i = item();
        i.media_urls = vec!["https://cdn.example.com/episode.mp3".to_string()];
        i.thumbnail_urls = vec!["https://cdn.example.com/thumb.jpg".to_string()];
        assert_eq!(
            extract_image_url(&i).as_deref(),
            Some("https://cdn.example.com/thumb.jpg")
        );
    }

    #[test]
    fn falls_back_to_html_img() {
        let mut i = item();
        i.description =
            r#"<p>Story</p><img class="hero" src='https://example.com/hero.webp' alt="x">"#
                .to_string();
        assert_eq!(
            extract_image_url(&i).as_deref(),
            Some("https://example.com/hero.webp")
        );
    }

    #[test]
    fn falls_back_to_raw_url_scan() {
        let mut i = item();
        i.description = "See the chart at https://example.com/chart.PNG?w=800 today".to_string();
        assert_eq!(
            extract_image_url(&i).as_deref(),
            Some("https://example.com/chart.PNG?w=800")
        );
    }

    #[test]
    fn falls_back_to_thumbnail() {
        let mut i = item();
        i.description = "no images here".to_string();
        i.thumbnail_urls = vec!["https://cdn.example.com/t.jpg".to_string()];
        assert_eq!(
            extract_image_url(&i).as_deref(),
            Some("https://cdn.example.com/t.jpg")
        );
    }

    #[test]
    fn rejects_relative_img_src() {
        let mut i = item();
        i.description = r#"<img src="/images/hero.png">"#.to_string();
        assert_eq!(extract_image_url(&i), None);
    }

    #[test]
    fn none_when_no_candidates() {
        let mut i = item();
        i.description = "plain text only".to_string();
        assert_eq!(extract_image_url(&i), None);
    }
}
