use std::fmt;
use std::sync::Arc;

use url::Url;

/// Pure transform from a host's "view" URL to its direct-file form.
/// Returns `None` when the URL does not have the expected shape.
pub type RewriteFn = dyn Fn(&Url) -> Option<String> + Send + Sync;

struct RewriteRule {
    host: String,
    rewrite: Arc<RewriteFn>,
}

/// Host-pattern → rewrite table. A pattern matches the host itself and any
/// subdomain of it. First matching rule that produces a URL wins.
#[derive(Clone, Default)]
pub struct RewriteTable {
    rules: Vec<Arc<RewriteRule>>,
}

impl RewriteTable {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Table with the built-in host rules.
    pub fn builtin() -> Self {
        Self::empty().with_rule("pixeldrain.com", pixeldrain)
    }

    pub fn with_rule<F>(mut self, host: impl Into<String>, rewrite: F) -> Self
    where
        F: Fn(&Url) -> Option<String> + Send + Sync + 'static,
    {
        self.rules.push(Arc::new(RewriteRule {
            host: host.into().to_ascii_lowercase(),
            rewrite: Arc::new(rewrite),
        }));
        self
    }

    /// Rewritten form of `link`, or `None` when no rule applies.
    pub fn rewrite(&self, link: &str) -> Option<String> {
        let url = Url::parse(link.trim()).ok()?;
        let host = url.host_str()?.to_ascii_lowercase();
        self.rules
            .iter()
            .filter(|rule| host_matches(&host, &rule.host))
            .find_map(|rule| (rule.rewrite)(&url))
    }

    /// `rewrite(link)` or the link unchanged.
    pub fn rewrite_or_keep(&self, link: &str) -> String {
        self.rewrite(link).unwrap_or_else(|| link.to_string())
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl fmt::Debug for RewriteTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.rules.iter().map(|rule| rule.host.as_str()))
            .finish()
    }
}

fn host_matches(host: &str, pattern: &str) -> bool {
    host == pattern
        || host
            .strip_suffix(pattern)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

/// `https://pixeldrain.com/u/<id>` → `https://pixeldrain.com/api/file/<id>?download`
fn pixeldrain(url: &Url) -> Option<String> {
    let mut segments = url.path_segments()?;
    if segments.next()? != "u" {
        return None;
    }
    let id = segments.next().filter(|id| !id.is_empty())?;
    Some(format!("https://pixeldrain.com/api/file/{id}?download"))
}
