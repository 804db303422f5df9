//! Line-oriented HLS playlist rewriting.
//!
//! Every URI in the playlist (segments, nested playlists, key URIs) is
//! replaced by a proxy URI that carries the absolute upstream URL and the
//! forwarded header map. Everything else passes through byte-for-byte.

use crate::error::Result;
use crate::hls::attributes::{self, Attribute};
use crate::headers::{self, ForwardHeaders};
use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;
use tracing::debug;
use url::Url;

/// Proxy path serving rewritten playlists.
pub const MANIFEST_ENDPOINT: &str = "/m3u8-proxy";

/// Proxy path relaying segments and keys.
pub const SEGMENT_ENDPOINT: &str = "/ts-proxy";

const AUDIO_RENDITION_PREFIX: &str = "#EXT-X-MEDIA:TYPE=AUDIO";
const KEY_TAG: &str = "#EXT-X-KEY:";

/// Tags whose `URI` attribute is rewritten when tag URI rewriting is on.
/// `Some` pins the endpoint, `None` classifies by path.
const URI_TAGS: &[(&str, Option<Endpoint>)] = &[
    ("#EXT-X-MAP:", None),
    ("#EXT-X-MEDIA:", None),
    ("#EXT-X-I-FRAME-STREAM-INF:", None),
    ("#EXT-X-SESSION-KEY:", Some(Endpoint::Segment)),
    ("#EXT-X-PART:", None),
    ("#EXT-X-PRELOAD-HINT:", None),
    ("#EXT-X-RENDITION-REPORT:", None),
];

static HTTP_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"https?://[^\s"']+"#).expect("valid URL pattern"));

/// Which proxy endpoint a rewritten URI points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Manifest,
    Segment,
}

impl Endpoint {
    pub fn path(self) -> &'static str {
        match self {
            Endpoint::Manifest => MANIFEST_ENDPOINT,
            Endpoint::Segment => SEGMENT_ENDPOINT,
        }
    }

    /// Playlists are recognised by a `.m3u8` path suffix; query and fragment are ignored.
    pub fn for_url(url: &Url) -> Self {
        if url.path().ends_with(".m3u8") {
            Endpoint::Manifest
        } else {
            Endpoint::Segment
        }
    }
}

/// Textual classification of one playlist line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaylistLine<'a> {
    Blank,
    Directive(&'a str),
    KeyDirective(&'a str),
    Uri(&'a str),
}

impl<'a> PlaylistLine<'a> {
    pub fn classify(line: &'a str) -> Self {
        if line.starts_with(KEY_TAG) {
            PlaylistLine::KeyDirective(line)
        } else if line.starts_with('#') {
            PlaylistLine::Directive(line)
        } else if line.trim().is_empty() {
            PlaylistLine::Blank
        } else {
            PlaylistLine::Uri(line)
        }
    }
}

/// Alternate audio renditions are dropped; the proxy does not multiplex them.
pub fn is_audio_rendition(line: &str) -> bool {
    line.starts_with(AUDIO_RENDITION_PREFIX)
}

/// Outcome of trying to rewrite the `URI` attribute of a tag line.
enum UriAttribute {
    Rewritten(String),
    /// Nothing to proxy: the URI resolves to a non-HTTP scheme
    Untouched,
    /// No parseable attribute list with a quoted, resolvable `URI`
    Unparsed,
}

/// Rewrites playlists fetched from `base` so every URI routes through the proxy.
#[derive(Debug, Clone)]
pub struct PlaylistRewriter<'a> {
    base: &'a Url,
    headers: &'a ForwardHeaders,
    public_base_url: Option<&'a str>,
    rewrite_tag_uris: bool,
}

impl<'a> PlaylistRewriter<'a> {
    pub fn new(base: &'a Url, headers: &'a ForwardHeaders) -> Self {
        Self {
            base,
            headers,
            public_base_url: None,
            rewrite_tag_uris: false,
        }
    }

    /// Emit absolute proxy URIs under `base` instead of root-relative ones.
    pub fn with_public_base_url(mut self, base: Option<&'a str>) -> Self {
        self.public_base_url = base;
        self
    }

    /// Also rewrite `URI` attributes of MAP, MEDIA, I-FRAME, PART and similar tags.
    pub fn with_tag_uris(mut self, enabled: bool) -> Self {
        self.rewrite_tag_uris = enabled;
        self
    }

    /// Proxy URI for an absolute upstream URL.
    pub fn proxy_uri(&self, endpoint: Endpoint, target: &Url) -> String {
        format!(
            "{}{}?{}",
            self.public_base_url.unwrap_or(""),
            endpoint.path(),
            headers::proxy_query(target, self.headers)
        )
    }

    /// Rewrite a whole playlist.
    ///
    /// Lines are joined with `\n` without a trailing newline. Blank lines and
    /// audio renditions are dropped. Fails on the first URI line that cannot
    /// be resolved against the base URL.
    pub fn rewrite(&self, content: &str) -> Result<String> {
        let mut out: Vec<Cow<'_, str>> = Vec::new();
        let mut audio_dropped = 0usize;

        for raw in content.split('\n') {
            let line = raw.strip_suffix('\r').unwrap_or(raw);

            if is_audio_rendition(line) {
                audio_dropped += 1;
                continue;
            }

            match PlaylistLine::classify(line) {
                PlaylistLine::Blank => {}
                PlaylistLine::Directive(tag) => out.push(self.rewrite_directive(tag)),
                PlaylistLine::KeyDirective(tag) => out.push(self.rewrite_key(tag)),
                PlaylistLine::Uri(uri) => {
                    let target = self.base.join(uri.trim())?;
                    out.push(Cow::Owned(self.proxy_uri(Endpoint::for_url(&target), &target)));
                }
            }
        }

        debug!(
            "Rewrote playlist from {}: {} lines out, {} audio renditions dropped",
            self.base,
            out.len(),
            audio_dropped
        );

        Ok(out.join("\n"))
    }

    /// `#EXT-X-KEY`: structured `URI` replacement, then the first bare
    /// `http(s)://` match as a fallback for lines that do not parse.
    fn rewrite_key<'l>(&self, line: &'l str) -> Cow<'l, str> {
        match self.rewrite_uri_attribute(line, Some(Endpoint::Segment)) {
            UriAttribute::Rewritten(rewritten) => Cow::Owned(rewritten),
            UriAttribute::Untouched => Cow::Borrowed(line),
            UriAttribute::Unparsed => self.rewrite_first_http_url(line),
        }
    }

    fn rewrite_directive<'l>(&self, line: &'l str) -> Cow<'l, str> {
        if !self.rewrite_tag_uris {
            return Cow::Borrowed(line);
        }

        let Some((_, endpoint)) = URI_TAGS.iter().find(|(tag, _)| line.starts_with(tag)) else {
            return Cow::Borrowed(line);
        };

        match self.rewrite_uri_attribute(line, *endpoint) {
            UriAttribute::Rewritten(rewritten) => Cow::Owned(rewritten),
            UriAttribute::Untouched | UriAttribute::Unparsed => Cow::Borrowed(line),
        }
    }

    fn rewrite_uri_attribute(&self, line: &str, endpoint: Option<Endpoint>) -> UriAttribute {
        let Some((tag, list)) = attributes::split_tag(line) else {
            return UriAttribute::Unparsed;
        };
        let Some(attrs) = attributes::parse_attribute_list(list) else {
            return UriAttribute::Unparsed;
        };
        let Some(Attribute {
            value, span, quoted: true, ..
        }) = attributes::find(&attrs, "URI")
        else {
            return UriAttribute::Unparsed;
        };

        let target = match self.base.join(value) {
            Ok(target) => target,
            Err(e) => {
                debug!("Tag URI {:?} does not resolve: {}", value, e);
                return UriAttribute::Unparsed;
            }
        };

        if !matches!(target.scheme(), "http" | "https") {
            return UriAttribute::Untouched;
        }

        let endpoint = endpoint.unwrap_or_else(|| Endpoint::for_url(&target));
        let offset = tag.len();
        let mut rewritten = String::with_capacity(line.len() + 64);
        rewritten.push_str(&line[..offset + span.start]);
        rewritten.push_str(&self.proxy_uri(endpoint, &target));
        rewritten.push_str(&line[offset + span.end..]);
        UriAttribute::Rewritten(rewritten)
    }

    fn rewrite_first_http_url<'l>(&self, line: &'l str) -> Cow<'l, str> {
        let Some(found) = HTTP_URL.find(line) else {
            return Cow::Borrowed(line);
        };
        let Ok(target) = Url::parse(found.as_str()) else {
            return Cow::Borrowed(line);
        };

        let mut rewritten = String::with_capacity(line.len() + 64);
        rewritten.push_str(&line[..found.start()]);
        rewritten.push_str(&self.proxy_uri(Endpoint::Segment, &target));
        rewritten.push_str(&line[found.end()..]);
        Cow::Owned(rewritten)
    }
}
