use super::core::{authority, HttpRequest};
use crate::config::DEFAULT_CHARSET;
use crate::error::TechnicalException;
use crate::model::{DocumentBuilder, Document, Item, Sequence, TreeBuilder, WEBAPP_NS, WEBAPP_PREFIX};
use crate::router::{PathSegment, RouteMatch};

/// Emits the `request` document for one request through a [`TreeBuilder`].
///
/// Shape:
///
/// ```text
/// request @servlet? @path @method
///   uri            full URL including the query string
///   authority      scheme, host and port
///   context-root   context path + servlet path + "/" + context root
///   path           part* and match(@name?)* in path order
///   param*         @name @value, one per value
///   header*        @name @value, one per value
///   body?          @content-type @position
/// ```
pub struct RequestParser<'a> {
    request: &'a HttpRequest,
    path: &'a str,
    app_name: &'a str,
    servlet: Option<&'a str>,
    segments: Option<&'a [PathSegment]>,
    default_charset: &'a str,
}

impl<'a> RequestParser<'a> {
    /// # Arguments
    ///
    /// * `request` - The HTTP request
    /// * `path` - The path inside the application
    /// * `app_name` - The context root of the application
    pub fn new(request: &'a HttpRequest, path: &'a str, app_name: &'a str) -> Self {
        Self {
            request,
            path,
            app_name,
            servlet: None,
            segments: None,
            default_charset: DEFAULT_CHARSET,
        }
    }

    /// Take the servlet name and path segments from a route.
    #[must_use]
    pub fn with_route(mut self, route: &'a RouteMatch) -> Self {
        self.servlet = Some(route.servlet.name.as_str());
        self.segments = Some(&route.segments);
        self
    }

    #[must_use]
    pub fn with_servlet(mut self, name: &'a str) -> Self {
        self.servlet = Some(name);
        self
    }

    /// Charset for textual bodies that do not declare one.
    #[must_use]
    pub fn with_default_charset(mut self, charset: &'a str) -> Self {
        self.default_charset = charset;
        self
    }

    #[must_use]
    pub fn with_segments(mut self, segments: &'a [PathSegment]) -> Self {
        self.segments = Some(segments);
        self
    }

    /// Emit the request element. Returns the decoded body items, to follow the request
    /// element in the input sequence.
    pub fn parse<B>(&self, builder: &mut B) -> Result<Vec<Item>, TechnicalException>
    where
        B: TreeBuilder + ?Sized,
    {
        builder.start_elem("request")?;
        if let Some(servlet) = self.servlet {
            builder.attribute("servlet", servlet)?;
        }
        builder.attribute("path", self.path)?;
        builder.attribute("method", &self.request.method.to_lowercase())?;
        builder.start_content()?;

        let uri = self.request.request_uri();
        builder.text_elem("uri", &uri)?;
        builder.text_elem("authority", authority(&uri))?;
        let context_root = format!(
            "{}{}/{}",
            self.request.context_path, self.request.servlet_path, self.app_name
        );
        builder.text_elem("context-root", &context_root)?;

        self.make_path(builder)?;
        make_multi("param", &self.request.params, builder)?;
        make_multi("header", &self.request.headers, builder)?;
        let bodies = self.make_bodies(builder)?;

        builder.end_elem()?;
        Ok(bodies)
    }

    fn make_path<B>(&self, builder: &mut B) -> Result<(), TechnicalException>
    where
        B: TreeBuilder + ?Sized,
    {
        builder.start_elem("path")?;
        builder.start_content()?;
        match self.segments {
            Some(segments) => {
                for segment in segments {
                    match segment {
                        PathSegment::Literal(text) => builder.text_elem("part", text)?,
                        PathSegment::Match { name, value } => {
                            builder.start_elem("match")?;
                            if let Some(name) = name {
                                builder.attribute("name", name)?;
                            }
                            builder.start_content()?;
                            builder.characters(value)?;
                            builder.end_elem()?;
                        }
                    }
                }
            }
            None if !self.path.is_empty() => builder.text_elem("part", self.path)?,
            None => {}
        }
        builder.end_elem()
    }

    fn make_bodies<B>(&self, builder: &mut B) -> Result<Vec<Item>, TechnicalException>
    where
        B: TreeBuilder + ?Sized,
    {
        let Some(body) = &self.request.body else {
            return Ok(Vec::new());
        };
        builder.start_elem("body")?;
        builder.attribute("content-type", &body.content_type)?;
        builder.attribute("position", "1")?;
        builder.end_elem()?;
        Ok(vec![body.decode(self.default_charset)])
    }
}

fn make_multi<B>(
    local: &str,
    entries: &[(String, Vec<String>)],
    builder: &mut B,
) -> Result<(), TechnicalException>
where
    B: TreeBuilder + ?Sized,
{
    for (name, values) in entries {
        for value in values {
            builder.start_elem(local)?;
            builder.attribute("name", name)?;
            builder.attribute("value", value)?;
            builder.end_elem()?;
        }
    }
    Ok(())
}

/// The request document and the input sequence of a request connector.
#[derive(Debug, Clone)]
pub struct RequestInput {
    pub document: Document,
    /// The `request` element followed by the body items.
    pub input: Sequence,
}

/// Build the request document in the webapp namespace and the matching input sequence.
pub fn build_request_input(
    request: &HttpRequest,
    path: &str,
    app_name: &str,
    route: Option<&RouteMatch>,
) -> Result<RequestInput, TechnicalException> {
    let mut parser = RequestParser::new(request, path, app_name);
    if let Some(route) = route {
        parser = parser.with_route(route);
    }
    build_with(&parser)
}

/// Build the request document from a configured parser.
pub fn build_with(parser: &RequestParser<'_>) -> Result<RequestInput, TechnicalException> {
    let mut builder = DocumentBuilder::new(WEBAPP_NS, Some(WEBAPP_PREFIX));
    let bodies = parser.parse(&mut builder)?;
    let document = builder.finish()?;
    let root = document.root_element()?;
    let input = std::iter::once(Item::from(root)).chain(bodies).collect();
    Ok(RequestInput { document, input })
}
