//! Apache `mod_autoindex` style listings.
//!
//! Anchors are read in document order. Modification date and size are taken
//! from the text node right after each anchor, which is where the `<pre>`
//! autoindex layout prints them. Other layouts simply yield no metadata.

use percent_encoding::percent_decode_str;
use scraper::{ElementRef, Html};
use tracing::debug;

use super::ParseOptions;
use crate::media::{is_absolute_http, resolve_href, MediaItem, MediaType};

const PARENT_HREF: &str = "../";
const PARENT_TEXT: &str = "Parent Directory";

pub fn parse_directory_listing(html: &str, base: &str, options: &ParseOptions) -> Vec<MediaItem> {
    let document = Html::parse_document(html);
    let anchors = document
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|el| el.value().name().eq_ignore_ascii_case("a"));

    let mut items = Vec::new();
    let mut skipped = 0usize;

    for (index, link) in anchors.enumerate() {
        let Some(href) = link.value().attr("href") else {
            skipped += 1;
            continue;
        };
        let text = link.text().collect::<String>();

        if should_skip(href, text.trim()) {
            skipped += 1;
            continue;
        }

        let clean_href = href.strip_prefix('/').unwrap_or(href);
        let media_type = options.extensions.classify(clean_href);
        if media_type == MediaType::Unknown {
            skipped += 1;
            continue;
        }

        let url = resolve_href(href, base);
        let name = display_name(clean_href);
        let mut item = MediaItem::new(format!("media-{index}-{}", options.stamp), name, url, media_type);

        if let Some((date, size)) = trailing_metadata(&link) {
            item.date = Some(date);
            item.size = size;
        }

        items.push(item);
    }

    debug!(base, found = items.len(), skipped, "Parsed directory listing");
    items
}

fn should_skip(href: &str, text: &str) -> bool {
    if href.is_empty() || href == PARENT_HREF || text == PARENT_TEXT || href.contains('?') {
        return true;
    }
    let lower = href.to_ascii_lowercase();
    if lower.starts_with("javascript:") || lower.starts_with("data:") {
        return true;
    }
    has_foreign_scheme(href)
}

/// True for hrefs such as `mailto:x` or `ftp://host/` that carry a scheme other
/// than http(s).
fn has_foreign_scheme(href: &str) -> bool {
    let Some((scheme, _)) = href.split_once(':') else {
        return false;
    };
    let well_formed = scheme.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    well_formed && !scheme.eq_ignore_ascii_case("http") && !scheme.eq_ignore_ascii_case("https")
}

fn display_name(clean_href: &str) -> String {
    let raw = if is_absolute_http(clean_href) {
        clean_href
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or(clean_href)
    } else {
        clean_href
    };
    percent_decode_str(raw).decode_utf8_lossy().into_owned()
}

/// `(date, size)` from the text node following the anchor.
fn trailing_metadata(link: &ElementRef<'_>) -> Option<(String, Option<String>)> {
    let sibling = link.next_sibling()?;
    let text = sibling.value().as_text()?;
    let parts: Vec<&str> = text.split_whitespace().collect();
    if parts.len() < 2 {
        return None;
    }
    let date = format!("{} {}", parts[0], parts[1]);
    let size = parts.get(2).map(|s| s.to_string());
    Some((date, size))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::ExtensionSet;

    const APACHE_LISTING: &str = r#"<!DOCTYPE HTML PUBLIC "-//W3C//DTD HTML 3.2 Final//EN">
<html>
 <head><title>Index of /p</title></head>
 <body>
<h1>Index of /p</h1>
<pre><img src="/icons/blank.gif" alt="Icon "> <a href="?C=N;O=D">Name</a>                    <a href="?C=M;O=A">Last modified</a>      <a href="?C=S;O=A">Size</a>
<hr><img src="/icons/back.gif" alt="[PARENTDIR]"> <a href="/">Parent Directory</a>                             -
<img src="/icons/image2.gif" alt="[IMG]"> <a href="beach%20day.jpg">beach day.jpg</a>           2023-07-14 09:12  2.4M
<img src="/icons/movie.gif" alt="[VID]"> <a href="clip.mp4">clip.mp4</a>                2023-07-15 18:40   48M
<img src="/icons/text.gif" alt="[TXT]"> <a href="notes.txt">notes.txt</a>               2023-07-15 18:41  120
<img src="/icons/folder.gif" alt="[DIR]"> <a href="sub/">sub/</a>                    2023-07-16 10:00    -
<hr></pre>
</body></html>"#;

    fn options() -> ParseOptions {
        ParseOptions::new(ExtensionSet::Strict).with_stamp(1)
    }

    #[test]
    fn parses_single_anchor_with_metadata() {
        let html = r#"<a href="photo.JPG">photo.JPG</a> 2023-01-01 10:00 1.2M"#;
        let items = parse_directory_listing(html, "https://s.com/p/", &options());
        assert_eq!(items.len(), 1);
        let item = &items[0];
        assert_eq!(item.name, "photo.JPG");
        assert_eq!(item.url, "https://s.com/p/photo.JPG");
        assert_eq!(item.media_type, MediaType::Image);
        assert_eq!(item.date.as_deref(), Some("2023-01-01 10:00"));
        assert_eq!(item.size.as_deref(), Some("1.2M"));
    }

    #[test]
    fn parses_apache_listing_in_document_order() {
        let items = parse_directory_listing(APACHE_LISTING, "https://s.com/p", &options());
        let names: Vec<_> = items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["beach day.jpg", "clip.mp4"]);
        assert_eq!(items[0].url, "https://s.com/p/beach%20day.jpg");
        assert_eq!(items[1].media_type, MediaType::Video);
        assert_eq!(items[1].size.as_deref(), Some("48M"));
    }

    #[test]
    fn no_anchors_yields_empty() {
        let items = parse_directory_listing("<html><body><p>nothing</p></body></html>", "https://s.com/", &options());
        assert!(items.is_empty());
    }

    #[test]
    fn drops_unknown_extensions() {
        let items = parse_directory_listing(r#"<a href="report.pdf">report.pdf</a>"#, "https://s.com/", &options());
        assert!(items.is_empty());
    }

    #[test]
    fn skips_navigation_and_pseudo_links() {
        let html = r#"
            <a href="../">Up</a>
            <a href="x.jpg">Parent Directory</a>
            <a href="a.jpg?download=1">a.jpg</a>
            <a href="javascript:void('b.jpg')">b.jpg</a>
            <a href="data:image/png;base64,AAAA.png">inline</a>
            <a href="mailto:me@x.com?subject=c.jpg">c.jpg</a>
            <a>no href</a>
            <a href="kept.png">kept.png</a>"#;
        let items = parse_directory_listing(html, "https://s.com/", &options());
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "kept.png");
    }

    #[test]
    fn leading_slash_is_stripped_before_joining() {
        let items = parse_directory_listing(r#"<a href="/img/a.png">a.png</a>"#, "https://s.com/p", &options());
        assert_eq!(items[0].url, "https://s.com/p/img/a.png");
        assert_eq!(items[0].name, "img/a.png");
    }

    #[test]
    fn absolute_hrefs_are_kept_verbatim() {
        let html = r#"<a href="https://cdn.s.com/media/sun%20set.webp">sun set</a>"#;
        let items = parse_directory_listing(html, "https://s.com/p/", &options());
        assert_eq!(items[0].url, "https://cdn.s.com/media/sun%20set.webp");
        assert_eq!(items[0].name, "sun set.webp");
    }

    #[test]
    fn table_layout_has_no_metadata() {
        let html = r#"<table><tr><td><a href="a.gif">a.gif</a></td><td>2023-01-01 10:00</td><td>3K</td></tr></table>"#;
        let items = parse_directory_listing(html, "https://s.com/", &options());
        assert_eq!(items.len(), 1);
        assert!(items[0].date.is_none());
        assert!(items[0].size.is_none());
    }

    #[test]
    fn single_token_metadata_is_ignored() {
        let items = parse_directory_listing(r#"<a href="a.png">a.png</a> -"#, "https://s.com/", &options());
        assert!(items[0].date.is_none());
    }

    #[test]
    fn ids_are_unique_within_a_parse() {
        let html = r#"<a href="a.png">a</a><a href="a.png">a</a><a href="b.png">b</a>"#;
        let items = parse_directory_listing(html, "https://s.com/", &options());
        let mut ids: Vec<_> = items.iter().map(|i| i.id.clone()).collect();
        ids.dedup();
        assert_eq!(ids.len(), 3);
    }

    #[test]
    fn loose_extensions_accept_svg() {
        let html = r#"<a href="logo.svg">logo.svg</a>"#;
        assert!(parse_directory_listing(html, "https://s.com/", &options()).is_empty());
        let loose = ParseOptions::new(ExtensionSet::Loose);
        assert_eq!(parse_directory_listing(html, "https://s.com/", &loose).len(), 1);
    }

    #[test]
    fn malformed_percent_escapes_do_not_fail() {
        let items = parse_directory_listing(r#"<a href="bad%E9name.jpg">x</a>"#, "https://s.com/", &options());
        assert_eq!(items.len(), 1);
        assert!(items[0].name.ends_with("name.jpg"));
    }
}
