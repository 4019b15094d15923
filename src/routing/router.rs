//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Store the compiled API matcher and both origins
//! - Classify a request path as API or SITE
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - Exactly one target per path; SITE is the fallback, never "no match"

use crate::config::{RoutingConfig, UpstreamsConfig};
use crate::routing::matcher::{AnyMatcher, Matcher, PathPrefixMatcher, PathSuffixMatcher};

/// Destination chosen for a request, carrying the base origin to forward to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteTarget<'a> {
    /// The data/API service.
    Api(&'a str),
    /// The content/site service.
    Site(&'a str),
}

impl<'a> RouteTarget<'a> {
    /// Base origin, without trailing slash.
    pub fn origin(&self) -> &'a str {
        match self {
            RouteTarget::Api(origin) | RouteTarget::Site(origin) => origin,
        }
    }

    /// Label used in logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            RouteTarget::Api(_) => "api",
            RouteTarget::Site(_) => "site",
        }
    }
}

/// Compiled routing table.
#[derive(Debug)]
pub struct Router {
    api: AnyMatcher,
    api_origin: String,
    site_origin: String,
}

impl Router {
    /// Build a router from configuration.
    pub fn from_config(routing: &RoutingConfig, upstreams: &UpstreamsConfig) -> Self {
        let api = AnyMatcher::new(vec![
            Box::new(PathPrefixMatcher::new(routing.api_path_prefix.clone())),
            Box::new(PathSuffixMatcher::new(routing.api_path_suffix.clone())),
        ]);

        Self {
            api,
            api_origin: upstreams.api_origin.trim_end_matches('/').to_string(),
            site_origin: upstreams.site_origin.trim_end_matches('/').to_string(),
        }
    }

    /// Classify a request path. Pure function of `path`.
    pub fn route(&self, path: &str) -> RouteTarget<'_> {
        if self.api.matches(path) {
            RouteTarget::Api(&self.api_origin)
        } else {
            RouteTarget::Site(&self.site_origin)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn router() -> Router {
        Router::from_config(
            &RoutingConfig::default(),
            &UpstreamsConfig {
                api_origin: "https://api.example.com/".into(),
                site_origin: "https://site.example.com".into(),
            },
        )
    }

    #[test]
    fn test_prefix_routes_to_api() {
        assert_eq!(
            router().route("/api/status"),
            RouteTarget::Api("https://api.example.com")
        );
    }

    #[test]
    fn test_suffix_routes_to_api() {
        assert_eq!(
            router().route("/content/posts.json"),
            RouteTarget::Api("https://api.example.com")
        );
    }

    #[test]
    fn test_both_predicates_route_to_api() {
        assert!(matches!(router().route("/api/data.json"), RouteTarget::Api(_)));
    }

    #[test]
    fn test_everything_else_routes_to_site() {
        let router = router();
        for path in ["/", "/about", "/api", "/apiary/", "/data.jsonp", "/blog/api/x"] {
            assert_eq!(
                router.route(path),
                RouteTarget::Site("https://site.example.com"),
                "path {path}"
            );
        }
    }

    #[test]
    fn test_labels() {
        let router = router();
        assert_eq!(router.route("/api/x").label(), "api");
        assert_eq!(router.route("/x").label(), "site");
        assert_eq!(router.route("/x").origin(), "https://site.example.com");
    }
}
