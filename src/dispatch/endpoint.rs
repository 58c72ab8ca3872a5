//! Endpoint identity.

use std::fmt;

use url::Url;

/// Identifies one rate-limit bucket and one ordering domain.
///
/// Two sends share a bucket and a queue exactly when their `EndpointId`s
/// are equal. The optional route discriminator splits one webhook URL into
/// independent buckets (Discord rate-limits each thread of a webhook
/// separately); it is sent as the `thread_id` query parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EndpointId {
    url: Url,
    route: Option<String>,
}

impl EndpointId {
    /// Query parameter carrying the route discriminator.
    pub const ROUTE_PARAM: &'static str = "thread_id";

    /// Creates an identity for a webhook URL with no route discriminator.
    #[must_use]
    pub const fn new(url: Url) -> Self {
        Self { url, route: None }
    }

    /// Parses a webhook URL.
    ///
    /// # Errors
    ///
    /// Returns the parse error if `url` is not a valid absolute URL.
    pub fn parse(url: &str) -> Result<Self, url::ParseError> {
        Url::parse(url).map(Self::new)
    }

    /// Sets the route discriminator.
    #[must_use]
    pub fn with_route(mut self, route: impl Into<String>) -> Self {
        self.route = Some(route.into());
        self
    }

    /// Returns the base webhook URL.
    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }

    /// Returns the route discriminator, if any.
    #[must_use]
    pub fn route(&self) -> Option<&str> {
        self.route.as_deref()
    }

    /// Builds the URL a request for this endpoint is sent to.
    #[must_use]
    pub fn request_url(&self) -> Url {
        let mut url = self.url.clone();
        if let Some(route) = &self.route {
            url.query_pairs_mut().append_pair(Self::ROUTE_PARAM, route);
        }
        url
    }
}

/// Displays the endpoint with its final path segment (the webhook token)
/// masked, so identities can be logged safely.
impl fmt::Display for EndpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let host = self.url.host_str().unwrap_or("?");
        let path = self.url.path().trim_end_matches('/');
        let masked = path
            .rsplit_once('/')
            .map_or_else(|| path.to_string(), |(head, _)| format!("{head}/***"));

        write!(f, "{host}{masked}")?;
        if let Some(route) = &self.route {
            write!(f, "#{route}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    const URL: &str = "https://discord.com/api/webhooks/123/secret-token";

    #[test]
    fn request_url_without_route_is_base_url() {
        let endpoint = EndpointId::parse(URL).unwrap();

        assert_eq!(endpoint.request_url().as_str(), URL);
        assert_eq!(endpoint.route(), None);
    }

    #[test]
    fn request_url_appends_route_as_thread_id() {
        let endpoint = EndpointId::parse(URL).unwrap().with_route("987");

        assert_eq!(
            endpoint.request_url().as_str(),
            format!("{URL}?thread_id=987")
        );
    }

    #[test]
    fn route_preserves_existing_query() {
        let endpoint = EndpointId::parse(&format!("{URL}?wait=true"))
            .unwrap()
            .with_route("5");

        assert_eq!(
            endpoint.request_url().query(),
            Some("wait=true&thread_id=5")
        );
    }

    #[test]
    fn routes_split_identity() {
        let base = EndpointId::parse(URL).unwrap();
        let mut set = HashSet::new();
        set.insert(base.clone());
        set.insert(base.clone().with_route("1"));
        set.insert(base.clone().with_route("2"));
        set.insert(base);

        assert_eq!(set.len(), 3);
    }

    #[test]
    fn display_masks_token() {
        let endpoint = EndpointId::parse(URL).unwrap().with_route("7");
        let shown = endpoint.to_string();

        assert_eq!(shown, "discord.com/api/webhooks/123/***#7");
        assert!(!shown.contains("secret-token"));
    }

    #[test]
    fn parse_rejects_relative_url() {
        assert!(EndpointId::parse("/api/webhooks/1/x").is_err());
    }
}
