use tracing::info;
use url::Url;

use super::flow::UserAgent;

/// [`UserAgent`] for a terminal session.
///
/// There is no browser to drive, so a redirect is only recorded; the caller
/// prints it, the user signs in, and passes the URL they land on back as the
/// current URL of the next run.
#[derive(Debug, Clone)]
pub struct ConsoleUserAgent {
    current: Url,
    pending_redirect: Option<Url>,
}

impl ConsoleUserAgent {
    pub fn new(current: Url) -> Self {
        Self {
            current,
            pending_redirect: None,
        }
    }

    /// The authorize URL the user still has to visit, if any.
    pub fn pending_redirect(&self) -> Option<&Url> {
        self.pending_redirect.as_ref()
    }
}

impl UserAgent for ConsoleUserAgent {
    fn current_url(&self) -> Url {
        self.current.clone()
    }

    fn redirect(&mut self, to: &Url) {
        info!("sign-in required; open the authorize URL in a browser");
        self.pending_redirect = Some(to.clone());
    }

    fn replace_url(&mut self, to: &Url) {
        self.current = to.clone();
    }
}
