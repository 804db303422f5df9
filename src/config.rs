use std::collections::HashSet;
use std::env;

/// Desktop browser User-Agent sent with every upstream request.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 Chrome/120 Safari/537.36";

/// Default per-request upstream timeout in seconds.
pub const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 30;

/// How the forged upstream header set is built
#[derive(Clone, Debug, PartialEq)]
pub enum HeaderPolicy {
    /// User-Agent plus whatever the caller put in the `headers` parameter
    Passthrough,
    /// Like `Passthrough`, but `Referer` and `Origin` are derived from the
    /// target URL's own origin before caller headers are applied
    Inferred,
}

/// What to do with a `headers` parameter that is not a JSON object of strings
#[derive(Clone, Debug, PartialEq)]
pub enum HeaderDecodeMode {
    /// Fail the request with 500
    Strict,
    /// Log a warning and continue with no forwarded headers
    Lenient,
}

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub is_dev: bool,
    /// Prefix for emitted proxy URIs; root-relative URIs when `None`
    pub public_base_url: Option<String>,
    /// Origins always allowed to use the proxy (`*` allows everyone)
    pub origin_allowlist: HashSet<String>,
    /// Origins refused unless allow-listed (`*` denies everyone)
    pub origin_denylist: HashSet<String>,
    pub header_policy: HeaderPolicy,
    pub header_decode: HeaderDecodeMode,
    pub user_agent: String,
    pub upstream_timeout_secs: u64,
    /// Refuse IP-literal targets in private/reserved ranges
    pub block_private_targets: bool,
    /// Also rewrite the URI attribute of MAP/MEDIA/I-FRAME/PART/... tags
    pub rewrite_tag_uris: bool,
    /// Serve the demo player at `/`
    pub demo_page: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            is_dev: true,
            public_base_url: None,
            origin_allowlist: HashSet::new(),
            origin_denylist: HashSet::new(),
            header_policy: HeaderPolicy::Passthrough,
            header_decode: HeaderDecodeMode::Strict,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            upstream_timeout_secs: DEFAULT_UPSTREAM_TIMEOUT_SECS,
            block_private_targets: false,
            rewrite_tag_uris: false,
            demo_page: true,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    /// In DEV mode, `PORT` defaults to 3000. In PROD mode it is required.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let is_dev = parse_bool("DEV_MODE", false);

        let port = if is_dev {
            env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()?
        } else {
            env::var("PORT")
                .map_err(|_| "PORT is required in production")?
                .parse()?
        };

        let public_base_url = env::var("PUBLIC_BASE_URL")
            .ok()
            .map(|s| s.trim().trim_end_matches('/').to_string())
            .filter(|s| !s.is_empty());

        let header_policy = match env::var("HEADER_POLICY")
            .unwrap_or_else(|_| "passthrough".to_string())
            .to_lowercase()
            .as_str()
        {
            "inferred" | "infer" => HeaderPolicy::Inferred,
            _ => HeaderPolicy::Passthrough,
        };

        let header_decode = match env::var("HEADERS_DECODE")
            .unwrap_or_else(|_| "strict".to_string())
            .to_lowercase()
            .as_str()
        {
            "lenient" => HeaderDecodeMode::Lenient,
            _ => HeaderDecodeMode::Strict,
        };

        let user_agent = env::var("USER_AGENT")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());

        let upstream_timeout_secs = env::var("UPSTREAM_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_UPSTREAM_TIMEOUT_SECS);

        Ok(Config {
            port,
            is_dev,
            public_base_url,
            origin_allowlist: parse_origin_list("ORIGIN_ALLOWLIST"),
            origin_denylist: parse_origin_list("ORIGIN_DENYLIST"),
            header_policy,
            header_decode,
            user_agent,
            upstream_timeout_secs,
            block_private_targets: parse_bool("BLOCK_PRIVATE_TARGETS", false),
            rewrite_tag_uris: parse_bool("REWRITE_TAG_URIS", false),
            demo_page: parse_bool("DEMO_PAGE", true),
        })
    }
}

fn parse_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .ok()
        .and_then(|v| match v.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        })
        .unwrap_or(default)
}

/// Comma separated origins; surrounding whitespace and trailing slashes are dropped.
fn parse_origin_list(key: &str) -> HashSet<String> {
    env::var(key)
        .map(|v| {
            v.split(',')
                .map(|s| s.trim().trim_end_matches('/').to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}
