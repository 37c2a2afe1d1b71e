//! Route definitions.
//!
//! A [`Route`] couples a path pattern with the document head metadata, an
//! optional props resolver, an ordered middleware chain and a cache TTL.
//! Routes are immutable once registered.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::schema::RouteConfig;
use crate::http::context::RequestContext;
use crate::http::middleware::RouteMiddleware;
use crate::routing::matcher::RouteParams;

/// Per-request data handed to the frontend. Route authors supply arbitrary
/// JSON, so the shape is kept dynamic.
pub type Props = serde_json::Map<String, serde_json::Value>;

/// Produces the props for a matched route.
pub type PropsResolver = Arc<dyn Fn(&RequestContext, &RouteParams) -> Props + Send + Sync>;

/// Produces request-scoped data shared by every route.
pub type StoreResolver = Arc<dyn Fn(&RequestContext) -> Props + Send + Sync>;

/// Stylesheet link declared by a route.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct CssLink {
    pub href: String,
    #[serde(default)]
    pub attrs: BTreeMap<String, String>,
}

impl CssLink {
    pub fn new(href: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            attrs: BTreeMap::new(),
        }
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }
}

/// Script tag declared by a route.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct JsLink {
    pub src: String,
    #[serde(default)]
    pub attrs: BTreeMap<String, String>,
}

impl JsLink {
    pub fn new(src: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            attrs: BTreeMap::new(),
        }
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }
}

/// `<meta>` tag declared by a route.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct MetaTag {
    pub name: String,
    pub content: String,
    #[serde(default)]
    pub attrs: BTreeMap<String, String>,
}

/// Document head metadata.
#[derive(Debug, Clone, Default)]
pub struct Head {
    pub title: String,
    pub description: String,
    pub css_links: Vec<CssLink>,
    pub js_links: Vec<JsLink>,
    pub meta_tags: Vec<MetaTag>,
}

/// A registered page route.
#[derive(Clone)]
pub struct Route {
    path: String,
    head: Head,
    props: Option<PropsResolver>,
    middleware: Vec<Arc<dyn RouteMiddleware>>,
    cache_ttl: Option<Duration>,
}

impl Route {
    /// Create a route for the given path pattern.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            head: Head::default(),
            props: None,
            middleware: Vec::new(),
            cache_ttl: None,
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.head.title = title.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.head.description = description.into();
        self
    }

    pub fn css(mut self, link: CssLink) -> Self {
        self.head.css_links.push(link);
        self
    }

    pub fn js(mut self, link: JsLink) -> Self {
        self.head.js_links.push(link);
        self
    }

    pub fn meta(mut self, tag: MetaTag) -> Self {
        self.head.meta_tags.push(tag);
        self
    }

    /// Attach the props resolver.
    pub fn props<F>(mut self, resolver: F) -> Self
    where
        F: Fn(&RequestContext, &RouteParams) -> Props + Send + Sync + 'static,
    {
        self.props = Some(Arc::new(resolver));
        self
    }

    /// Append a middleware. The first one added runs outermost.
    pub fn middleware<M>(mut self, middleware: M) -> Self
    where
        M: RouteMiddleware + 'static,
    {
        self.middleware.push(Arc::new(middleware));
        self
    }

    /// Cache TTL for rendered pages. Zero disables caching for this route.
    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn head(&self) -> &Head {
        &self.head
    }

    pub fn middleware_chain(&self) -> &[Arc<dyn RouteMiddleware>] {
        &self.middleware
    }

    /// TTL for this route, falling back to `default`.
    pub fn ttl_or(&self, default: Duration) -> Duration {
        self.cache_ttl.unwrap_or(default)
    }

    /// Run the props resolver. Routes without one yield empty props.
    pub fn resolve_props(&self, ctx: &RequestContext, params: &RouteParams) -> Props {
        match &self.props {
            Some(resolver) => resolver(ctx, params),
            None => Props::new(),
        }
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("path", &self.path)
            .field("head", &self.head)
            .field("has_props", &self.props.is_some())
            .field("middleware", &self.middleware.len())
            .field("cache_ttl", &self.cache_ttl)
            .finish()
    }
}

impl From<RouteConfig> for Route {
    fn from(config: RouteConfig) -> Self {
        Self {
            path: config.path,
            head: Head {
                title: config.title,
                description: config.description,
                css_links: config.css_links,
                js_links: config.js_links,
                meta_tags: config.meta_tags,
            },
            props: None,
            middleware: Vec::new(),
            cache_ttl: config.cache_ttl_secs.map(Duration::from_secs),
        }
    }
}
