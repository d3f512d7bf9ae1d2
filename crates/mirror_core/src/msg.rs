use std::collections::BTreeMap;

/// Input to the interception machine, produced by whoever drives the browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    /// The initial navigation was issued and the page started loading.
    Navigated,
    /// Result of checking the current page content for challenge markers.
    ChallengeChecked { challenged: bool },
    /// Network responses observed since the previous inspection, in arrival order.
    Responses(Vec<ObservedResponse>),
    /// The overall ceiling expired (or the run was cancelled).
    DeadlineElapsed,
    /// The browser session failed in a way that cannot be retried.
    SessionFailed(String),
}

/// One network response seen by the browser session.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ObservedResponse {
    pub url: String,
    /// Header names are lower-cased on construction.
    pub headers: BTreeMap<String, String>,
}

const ARCHIVE_EXTENSIONS: &[&str] = &[".zip", ".rar"];

impl ObservedResponse {
    pub fn new<I, K, V>(url: impl Into<String>, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        Self {
            url: url.into(),
            headers: headers
                .into_iter()
                .map(|(k, v)| (k.as_ref().to_ascii_lowercase(), v.into()))
                .collect(),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Attachment disposition, or a URL ending in a known archive extension.
    pub fn is_downloadable(&self) -> bool {
        let attachment = self
            .header("content-disposition")
            .is_some_and(|cd| cd.to_ascii_lowercase().contains("attachment"));
        if attachment {
            return true;
        }
        let url = self.url.to_ascii_lowercase();
        ARCHIVE_EXTENSIONS.iter().any(|ext| url.ends_with(ext))
    }
}

/// Anti-automation interstitial markers in page content.
pub fn is_challenge_page(content: &str) -> bool {
    let lower = content.to_lowercase();
    lower.contains("cloudflare") && (lower.contains("checking") || lower.contains("challenge"))
}
