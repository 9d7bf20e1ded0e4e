//! URL generation for links and images embedded in messages.
//!
//! Mailers do not know the host application's routes. Instead, a
//! [`UrlResolver`] is injected, and mailers merge the configured
//! [`UrlOptions`](crate::UrlOptions) into every request.
//!
//! [`RouteTable`] is a small resolver for applications that only need
//! `:param` substitution:
//!
//! ```
//! use mandrill_mailer::{RouteTable, UrlResolver};
//! use serde_json::{json, Map};
//!
//! let routes = RouteTable::new()
//!     .route("root", "/")
//!     .route("invitation", "/invitations/:token");
//!
//! let mut params = Map::new();
//! params.insert("host".into(), json!("app.example.com"));
//! params.insert("token".into(), json!("abc123"));
//!
//! let url = routes.url_for("invitation", &params).unwrap();
//! assert_eq!(url, "http://app.example.com/invitations/abc123");
//! ```

use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::error::MailError;

/// Resolves named routes and asset paths for a mailer.
pub trait UrlResolver: Send + Sync {
    /// Build an absolute URL for a named route.
    ///
    /// `params` carries route parameters along with the `host` and `protocol`
    /// merged in from the mailer configuration.
    fn url_for(&self, route: &str, params: &Map<String, Value>) -> Result<String, MailError>;

    /// Resolve the public path of an asset, e.g. `logo.png` to `/assets/logo.png`.
    fn asset_path(&self, asset: &str) -> Result<String, MailError>;
}

/// A table of named path patterns.
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: HashMap<String, String>,
    asset_prefix: String,
}

impl RouteTable {
    pub fn new() -> Self {
        Self {
            routes: HashMap::new(),
            asset_prefix: "/assets".to_string(),
        }
    }

    /// Register a route. Segments starting with `:` are filled from params.
    pub fn route(mut self, name: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.routes.insert(name.into(), pattern.into());
        self
    }

    /// Directory assets are served from (default `/assets`).
    pub fn asset_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.asset_prefix = prefix.into();
        self
    }

    fn expand(&self, pattern: &str, params: &Map<String, Value>) -> Result<String, MailError> {
        let segments = pattern
            .split('/')
            .map(|segment| match segment.strip_prefix(':') {
                Some(param) => params
                    .get(param)
                    .map(param_to_string)
                    .ok_or_else(|| {
                        MailError::Configuration(format!("missing route parameter `{}`", param))
                    }),
                None => Ok(segment.to_string()),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(segments.join("/"))
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::new()
    }
}

impl UrlResolver for RouteTable {
    fn url_for(&self, route: &str, params: &Map<String, Value>) -> Result<String, MailError> {
        let pattern = self
            .routes
            .get(route)
            .ok_or_else(|| MailError::Configuration(format!("unknown route `{}`", route)))?;

        let host = params
            .get("host")
            .and_then(Value::as_str)
            .ok_or_else(|| MailError::Configuration("no host to generate URLs for".into()))?;
        let protocol = params
            .get("protocol")
            .and_then(Value::as_str)
            .unwrap_or("http");
        let protocol = protocol.trim_end_matches("://");

        let path = self.expand(pattern, params)?;
        let path = if path.starts_with('/') {
            path
        } else {
            format!("/{}", path)
        };

        Ok(format!("{}://{}{}", protocol, host, path))
    }

    fn asset_path(&self, asset: &str) -> Result<String, MailError> {
        if asset.starts_with('/') || asset.contains("://") {
            return Ok(asset.to_string());
        }
        Ok(format!("{}/{}", self.asset_prefix.trim_end_matches('/'), asset))
    }
}

fn param_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Join a root URL with the non-empty segments of an asset path.
pub(crate) fn join_image_url(root: &str, path: &str) -> String {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let root = if root.ends_with('/') {
        root.to_string()
    } else {
        format!("{}/", root)
    };
    format!("{}{}", root, segments.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(pairs: &[(&str, Value)]) -> Map<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_url_for_with_protocol() {
        let routes = RouteTable::new().route("user", "/users/:id");
        let url = routes
            .url_for(
                "user",
                &params(&[
                    ("host", json!("example.com")),
                    ("protocol", json!("https")),
                    ("id", json!(42)),
                ]),
            )
            .unwrap();
        assert_eq!(url, "https://example.com/users/42");
    }

    #[test]
    fn test_url_for_requires_host() {
        let routes = RouteTable::new().route("root", "/");
        assert!(matches!(
            routes.url_for("root", &Map::new()),
            Err(MailError::Configuration(_))
        ));
    }

    #[test]
    fn test_unknown_route() {
        let routes = RouteTable::new();
        let err = routes
            .url_for("nope", &params(&[("host", json!("example.com"))]))
            .unwrap_err();
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn test_missing_route_param() {
        let routes = RouteTable::new().route("user", "/users/:id");
        assert!(routes
            .url_for("user", &params(&[("host", json!("example.com"))]))
            .is_err());
    }

    #[test]
    fn test_asset_path() {
        let routes = RouteTable::new();
        assert_eq!(routes.asset_path("logo.png").unwrap(), "/assets/logo.png");
        assert_eq!(routes.asset_path("/static/logo.png").unwrap(), "/static/logo.png");

        let routes = RouteTable::new().asset_prefix("/public/");
        assert_eq!(routes.asset_path("logo.png").unwrap(), "/public/logo.png");
    }

    #[test]
    fn test_join_image_url_drops_empty_segments() {
        assert_eq!(
            join_image_url("http://example.com/", "/assets//logo.png"),
            "http://example.com/assets/logo.png"
        );
        assert_eq!(
            join_image_url("http://example.com", "assets/logo.png"),
            "http://example.com/assets/logo.png"
        );
    }
}
