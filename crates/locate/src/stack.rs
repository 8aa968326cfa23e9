//! Stack-trace dialects.
//!
//! Engines print frames differently: V8 writes `at fn (url:line:col)`,
//! SpiderMonkey and JavaScriptCore write `fn@url:line:col`, and some older
//! engines glue the argument list to the location as `fn()@url:line:col`.
//! Each dialect gets its own pattern, and the patterns are tried in
//! [`StackDialect::ORDER`]. A looser pattern run first can pick the wrong
//! token out of a format meant for a stricter one.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

/// URL token: inline `data:text/javascript` payload, or an optionally
/// `blob:`-wrapped `http(s)`/`file` URL. Lazy quantifiers keep the token from
/// swallowing the `:line:col` suffix.
macro_rules! url_token {
    () => {
        r"(data:text/javascript(?:;[^,]+)?,.+?|(?:blob:)??(?:https?|file)://[/]?.+?/[^:)]*?)"
    };
}

macro_rules! line_col {
    () => {
        r":\d+(?::\d+)?"
    };
}

const AT_URL: &str = concat!(url_token!(), line_col!());

const FRAME_AT_URL: &str = concat!(
    r"^(?:[^:@]*@|.+\)@|.+?\s+(?: at |@)(?:[^:(]+ )*\(?)??",
    url_token!(),
    line_col!()
);

const PAREN_AT_URL: &str = concat!(r"\)@", url_token!(), line_col!());

static PATTERNS: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [AT_URL, FRAME_AT_URL, PAREN_AT_URL]
        .map(|pattern| Regex::new(pattern).expect("static stack pattern must compile"))
});

/// One stack-trace format, with the pattern that extracts its script URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StackDialect {
    /// `at <url>:line:col`, bare or inside parentheses.
    AtUrl,
    /// `<frame>@<url>:line:col`.
    FrameAtUrl,
    /// `<frame>(...)@<url>:line:col`.
    ParenAtUrl,
}

impl StackDialect {
    /// The order dialects must be tried in.
    pub const ORDER: [StackDialect; 3] = [Self::AtUrl, Self::FrameAtUrl, Self::ParenAtUrl];

    fn pattern(self) -> &'static Regex {
        let index = match self {
            Self::AtUrl => 0,
            Self::FrameAtUrl => 1,
            Self::ParenAtUrl => 2,
        };
        &PATTERNS[index]
    }

    /// URL of the first frame in `stack` written in this dialect, with the
    /// `:line:col` suffix removed.
    pub fn extract(self, stack: &str) -> Option<String> {
        self.pattern()
            .captures(stack)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_owned())
            .filter(|url| !url.is_empty())
    }
}

impl fmt::Display for StackDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::AtUrl => "at-url",
            Self::FrameAtUrl => "frame-at-url",
            Self::ParenAtUrl => "paren-at-url",
        })
    }
}

/// Try every dialect in order and return the first URL found.
pub fn script_from_stack(stack: &str) -> Option<(StackDialect, String)> {
    StackDialect::ORDER.into_iter().find_map(|dialect| {
        let url = dialect.extract(stack)?;
        tracing::trace!(%dialect, %url, "stack dialect matched");
        Some((dialect, url))
    })
}
