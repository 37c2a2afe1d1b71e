//! HTML document assembly.
//!
//! The page template is consumed through the narrow [`PageTemplate`]
//! contract (`render(data) -> markup`). [`DefaultDocument`] renders with
//! [maud](https://maud.lambda.xyz/) so every dynamic text value is escaped;
//! bundle output, rendered markup and configured head HTML are trusted and
//! inserted verbatim.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use maud::{html, Escaper, Markup, PreEscaped, DOCTYPE};

use crate::routing::route::{CssLink, JsLink, MetaTag};

/// URL prefix for route assets that are not external.
pub const ASSETS_PREFIX: &str = "/assets/";

/// Error raised by a page template.
#[derive(Debug, thiserror::Error)]
#[error("template error: {0}")]
pub struct TemplateError(pub String);

/// Resolved `<link rel="stylesheet">` tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleTag {
    pub href: String,
    pub attrs: BTreeMap<String, String>,
}

impl From<&CssLink> for StyleTag {
    fn from(link: &CssLink) -> Self {
        Self {
            href: asset_url(&link.href),
            attrs: link.attrs.clone(),
        }
    }
}

/// Resolved `<script src>` tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptTag {
    pub src: String,
    pub attrs: BTreeMap<String, String>,
}

impl From<&JsLink> for ScriptTag {
    fn from(link: &JsLink) -> Self {
        let mut attrs = link.attrs.clone();
        attrs.entry("type".to_string()).or_insert_with(|| "module".to_string());
        Self {
            src: asset_url(&link.src),
            attrs,
        }
    }
}

/// Live-reload bootstrap injected in development.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReloadBootstrap {
    /// Websocket endpoint, e.g. `ws://localhost:3001/ws`.
    pub socket_url: String,
    /// Identifier sent as the first frame.
    pub route_id: String,
}

/// Everything a template needs to produce a page.
#[derive(Debug, Clone, Default)]
pub struct PageData {
    pub title: String,
    pub description: String,
    pub favicon: String,
    pub meta_tags: Vec<MetaTag>,
    pub css_links: Vec<StyleTag>,
    pub js_links: Vec<ScriptTag>,
    pub head_extra: Vec<String>,
    /// Inline stylesheet.
    pub css: String,
    /// Inline browser bundle.
    pub js: String,
    /// Server-rendered markup.
    pub markup: String,
    pub reload: Option<ReloadBootstrap>,
}

/// Renders page data into a complete document.
pub trait PageTemplate: Send + Sync {
    fn render(&self, data: &PageData) -> Result<String, TemplateError>;
}

/// Built-in document layout.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultDocument;

impl PageTemplate for DefaultDocument {
    fn render(&self, data: &PageData) -> Result<String, TemplateError> {
        Ok(document(data).into_string())
    }
}

/// Absolute URLs pass through; anything else is served from the assets dir.
pub fn asset_url(href: &str) -> String {
    if is_external(href) {
        href.to_string()
    } else {
        format!("{ASSETS_PREFIX}{}", href.trim_start_matches('/'))
    }
}

fn is_external(href: &str) -> bool {
    href.starts_with("//")
        || url::Url::parse(href)
            .map(|url| matches!(url.scheme(), "http" | "https"))
            .unwrap_or(false)
}

fn document(data: &PageData) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                meta name="description" content=(data.description);
                @for tag in &data.meta_tags {
                    (PreEscaped(meta_tag(tag)))
                }
                link rel="icon" href=(data.favicon);
                title { (data.title) }
                @for extra in &data.head_extra {
                    (PreEscaped(extra))
                }
                @for link in &data.css_links {
                    (PreEscaped(style_tag(link)))
                }
                @for script in &data.js_links {
                    (PreEscaped(script_tag(script)))
                }
                style { (PreEscaped(&data.css)) }
            }
            body {
                div id="root" { (PreEscaped(&data.markup)) }
                script type="module" { (PreEscaped(&data.js)) }
                @if let Some(reload) = &data.reload {
                    script { (PreEscaped(reload_script(reload))) }
                }
            }
        }
    }
}

fn style_tag(tag: &StyleTag) -> String {
    let mut out = String::from("<link");
    push_attr(&mut out, "href", &tag.href);
    if !tag.attrs.contains_key("rel") {
        push_attr(&mut out, "rel", "stylesheet");
    }
    push_attrs(&mut out, &tag.attrs);
    out.push_str(" />");
    out
}

fn script_tag(tag: &ScriptTag) -> String {
    let mut out = String::from("<script");
    push_attr(&mut out, "src", &tag.src);
    push_attrs(&mut out, &tag.attrs);
    out.push_str("></script>");
    out
}

fn meta_tag(tag: &MetaTag) -> String {
    let mut out = String::from("<meta");
    push_attr(&mut out, "name", &tag.name);
    push_attr(&mut out, "content", &tag.content);
    push_attrs(&mut out, &tag.attrs);
    out.push_str(" />");
    out
}

fn push_attrs(out: &mut String, attrs: &BTreeMap<String, String>) {
    for (name, value) in attrs {
        if is_attr_name(name) {
            push_attr(out, name, value);
        } else {
            tracing::warn!(attr = %name, "Skipping invalid attribute name");
        }
    }
}

fn push_attr(out: &mut String, name: &str, value: &str) {
    let _ = write!(out, " {name}=\"");
    let _ = Escaper::new(out).write_str(value);
    out.push('"');
}

fn is_attr_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':'))
}

fn reload_script(reload: &ReloadBootstrap) -> String {
    format!(
        r#"(function(){{var ws=new WebSocket({url});ws.onopen=function(){{ws.send({route})}};ws.onmessage=function(e){{if(e.data==="reload"){{window.location.reload()}}}}}})();"#,
        url = js_string(&reload.socket_url),
        route = js_string(&reload.route_id),
    )
}

/// JSON string literal that is also safe inside a `<script>` element.
fn js_string(value: &str) -> String {
    serde_json::Value::from(value)
        .to_string()
        .replace("</", "<\\/")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> PageData {
        PageData {
            title: "Home & Garden".into(),
            description: "A \"quoted\" page".into(),
            favicon: "/favicon.ico".into(),
            css_links: vec![StyleTag::from(&CssLink::new("main.css"))],
            js_links: vec![ScriptTag::from(&JsLink::new("https://cdn.example.com/lib.js"))],
            css: "body{margin:0}".into(),
            js: "console.log(1)".into(),
            markup: "<h1>Hello</h1>".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_asset_url() {
        assert_eq!(asset_url("main.css"), "/assets/main.css");
        assert_eq!(asset_url("/css/main.css"), "/assets/css/main.css");
        assert_eq!(asset_url("https://cdn.example.com/a.css"), "https://cdn.example.com/a.css");
        assert_eq!(asset_url("http://cdn.example.com/a.css"), "http://cdn.example.com/a.css");
        assert_eq!(asset_url("//cdn.example.com/a.css"), "//cdn.example.com/a.css");
    }

    #[test]
    fn test_document_contents() {
        let html = DefaultDocument.render(&page()).unwrap();
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<title>Home &amp; Garden</title>"));
        assert!(html.contains("content=\"A &quot;quoted&quot; page\""));
        assert!(html.contains("<link href=\"/assets/main.css\" rel=\"stylesheet\" />"));
        assert!(html.contains(
            "<script src=\"https://cdn.example.com/lib.js\" type=\"module\"></script>"
        ));
        assert!(html.contains("<div id=\"root\"><h1>Hello</h1></div>"));
        assert!(html.contains("<style>body{margin:0}</style>"));
        assert!(!html.contains("WebSocket"));
    }

    #[test]
    fn test_link_order_preserved() {
        let mut data = page();
        data.css_links = vec![
            StyleTag::from(&CssLink::new("a.css")),
            StyleTag::from(&CssLink::new("b.css")),
        ];
        let html = DefaultDocument.render(&data).unwrap();
        let a = html.find("/assets/a.css").unwrap();
        let b = html.find("/assets/b.css").unwrap();
        assert!(a < b);
    }

    #[test]
    fn test_reload_script_only_when_requested() {
        let mut data = page();
        data.reload = Some(ReloadBootstrap {
            socket_url: "ws://localhost:3001/ws".into(),
            route_id: "/users/:id".into(),
        });
        let html = DefaultDocument.render(&data).unwrap();
        assert!(html.contains("new WebSocket(\"ws://localhost:3001/ws\")"));
        assert!(html.contains("ws.send(\"/users/:id\")"));
        assert!(html.contains("e.data===\"reload\""));
    }

    #[test]
    fn test_attribute_escaping() {
        let link = CssLink::new("x.css")
            .attr("media", "screen\" onload=\"alert(1)")
            .attr("bad name", "ignored");
        let tag = style_tag(&StyleTag::from(&link));
        assert!(tag.contains("media=\"screen&quot; onload=&quot;alert(1)\""));
        assert!(!tag.contains("bad name"));
    }

    #[test]
    fn test_meta_content_escaped_by_maud() {
        let tag = meta_tag(&MetaTag {
            name: "og:title".into(),
            content: "<Tom & Jerry>".into(),
            attrs: BTreeMap::new(),
        });
        assert_eq!(tag, "<meta name=\"og:title\" content=\"&lt;Tom &amp; Jerry&gt;\" />");
    }

    #[test]
    fn test_js_string_escapes_script_close() {
        assert_eq!(js_string("</script>"), "\"<\\/script>\"");
    }
}
