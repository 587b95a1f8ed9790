use core::fmt;

/// HTTP methods a service route can be registered under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Options,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Options => "OPTIONS",
        };
        f.write_str(name)
    }
}

/// A transport-independent view of one incoming request.
///
/// Whatever HTTP server fronts the dispatch layer builds one of these per
/// request. GET requests carry no body: the envelope id comes from the
/// `id` query parameter (defaulting to 0) and the params are empty.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: String,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: String::new(),
        }
    }

    /// Builder-style body assignment.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Builder-style query-pair assignment.
    #[must_use]
    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    /// First value of the named query parameter, if present.
    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// A transport-independent view of one WebSocket connection, handed to the
/// service resolver when a streaming route opens.
#[derive(Debug, Clone, Default)]
pub struct WsSession {
    pub path: String,
    pub query: Vec<(String, String)>,
}

impl WsSession {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            query: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_param_returns_the_first_match() {
        let request = HttpRequest::new(HttpMethod::Get, "/kv/route")
            .with_query("id", "7")
            .with_query("id", "8");
        assert_eq!(request.query_param("id"), Some("7"));
        assert_eq!(request.query_param("missing"), None);
    }
}
