use crate::error::ServlexException;
use crate::model::Item;
use std::sync::Arc;
use url::Url;

/// A request body: its content type and raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestBody {
    pub content_type: String,
    pub bytes: Arc<[u8]>,
}

impl RequestBody {
    pub fn new(content_type: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            content_type: content_type.into(),
            bytes: bytes.into(),
        }
    }

    /// Media type without parameters, lower-cased.
    #[must_use]
    pub fn media_type(&self) -> String {
        self.content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase()
    }

    /// The `charset` parameter of the content type, if any.
    #[must_use]
    pub fn charset(&self) -> Option<String> {
        self.content_type.split(';').skip(1).find_map(|param| {
            let (name, value) = param.split_once('=')?;
            name.trim()
                .eq_ignore_ascii_case("charset")
                .then(|| value.trim().trim_matches('"').to_ascii_lowercase())
        })
    }

    /// Textual bodies are `text/*`, XML (`*/xml`, `*+xml`) and JSON (`*/json`, `*+json`).
    #[must_use]
    pub fn is_textual(&self) -> bool {
        let media = self.media_type();
        media.starts_with("text/")
            || media.ends_with("/xml")
            || media.ends_with("+xml")
            || media.ends_with("/json")
            || media.ends_with("+json")
    }

    /// Decode the body into an item: a string for textual bodies, bytes otherwise.
    ///
    /// Text is decoded as UTF-8, invalid sequences are replaced.
    #[must_use]
    pub fn to_item(&self) -> Item {
        self.decode(crate::config::DEFAULT_CHARSET)
    }

    /// Like [`to_item`](Self::to_item), decoding text without a declared charset with
    /// `default_charset`. Latin-1 is decoded byte per char, anything else as UTF-8.
    #[must_use]
    pub fn decode(&self, default_charset: &str) -> Item {
        if !self.is_textual() {
            return Item::Binary(Arc::clone(&self.bytes));
        }
        let charset = self
            .charset()
            .unwrap_or_else(|| default_charset.to_ascii_lowercase());
        match charset.as_str() {
            "iso-8859-1" | "latin1" | "latin-1" => {
                Item::String(self.bytes.iter().map(|&b| char::from(b)).collect())
            }
            _ => Item::String(String::from_utf8_lossy(&self.bytes).into_owned()),
        }
    }
}

/// An HTTP request as handed over by the host.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: String,
    /// Scheme, authority and path, without the query string.
    pub request_url: String,
    pub query_string: Option<String>,
    /// Path prefix where Servlex is mounted (e.g. `/servlex`).
    pub context_path: String,
    /// Servlet path inside the context (often empty).
    pub servlet_path: String,
    /// Path after the servlet path: `/<context-root>/<path inside the app>`.
    pub path_info: String,
    /// Header names with all their values, in arrival order.
    pub headers: Vec<(String, Vec<String>)>,
    /// Parameter names with all their values, in arrival order.
    pub params: Vec<(String, Vec<String>)>,
    pub body: Option<RequestBody>,
    pub session_id: Option<String>,
}

impl HttpRequest {
    /// Build a request from a full URL.
    ///
    /// # Arguments
    ///
    /// * `method` - HTTP method, any case
    /// * `url` - Absolute request URL, possibly with a query string
    /// * `context_path` - Prefix of the URL path where Servlex is mounted
    ///
    /// # Errors
    ///
    /// 400 if the URL cannot be parsed, 404 if its path is outside `context_path`.
    pub fn from_url(method: &str, url: &str, context_path: &str) -> Result<Self, ServlexException> {
        let parsed = Url::parse(url)
            .map_err(|e| ServlexException::with_cause(400, format!("invalid request URL: {url}"), e))?;
        let path = parsed.path();
        let path_info = path
            .strip_prefix(context_path.trim_end_matches('/'))
            .filter(|rest| rest.is_empty() || rest.starts_with('/'))
            .ok_or_else(|| {
                ServlexException::not_found(format!("{path} is not under {context_path}"))
            })?;
        let path_info = if path_info.is_empty() { "/" } else { path_info };

        let mut params: Vec<(String, Vec<String>)> = Vec::new();
        for (name, value) in parsed.query_pairs() {
            push_value(&mut params, &name, value.into_owned(), false);
        }

        let mut request_url = parsed.clone();
        request_url.set_query(None);
        request_url.set_fragment(None);

        Ok(Self {
            method: method.to_string(),
            request_url: request_url.to_string(),
            query_string: parsed.query().map(str::to_string),
            context_path: context_path.to_string(),
            servlet_path: String::new(),
            path_info: path_info.to_string(),
            headers: Vec::new(),
            params,
            body: None,
            session_id: None,
        })
    }

    /// Add a header value. Values for an existing name (case-insensitive) are appended.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        push_value(&mut self.headers, name, value.to_string(), true);
        self
    }

    #[must_use]
    pub fn with_param(mut self, name: &str, value: &str) -> Self {
        push_value(&mut self.params, name, value.to_string(), false);
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: RequestBody) -> Self {
        self.body = Some(body);
        self
    }

    #[must_use]
    pub fn with_session(mut self, id: impl Into<String>) -> Self {
        self.session_id = Some(id.into());
        self
    }

    /// First value of a header (case-insensitive name).
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .and_then(|(_, v)| v.first())
            .map(String::as_str)
    }

    /// Full request URI: the request URL, plus `?` and the query string when present.
    #[must_use]
    pub fn request_uri(&self) -> String {
        match &self.query_string {
            Some(q) => format!("{}?{q}", self.request_url),
            None => self.request_url.clone(),
        }
    }

    /// Split the path info into the context root and the path inside the application.
    ///
    /// `/app/a/b` gives `("app", "/a/b")`, and `/app` gives `("app", "/")`.
    #[must_use]
    pub fn split_path(&self) -> (&str, &str) {
        let rest = self.path_info.strip_prefix('/').unwrap_or(&self.path_info);
        match rest.find('/') {
            Some(slash) => (&rest[..slash], &rest[slash..]),
            None => (rest, "/"),
        }
    }
}

fn push_value(list: &mut Vec<(String, Vec<String>)>, name: &str, value: String, ignore_case: bool) {
    let existing = list.iter_mut().find(|(n, _)| {
        if ignore_case {
            n.eq_ignore_ascii_case(name)
        } else {
            n == name
        }
    });
    match existing {
        Some((_, values)) => values.push(value),
        None => list.push((name.to_string(), vec![value])),
    }
}

/// The authority part of a URI: everything before the third slash.
#[must_use]
pub fn authority(uri: &str) -> &str {
    let mut slashes = uri.match_indices('/').map(|(i, _)| i);
    match slashes.nth(2) {
        Some(third) => &uri[..third],
        None => uri,
    }
}
