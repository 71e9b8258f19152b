use reqwest::Client;
use serde::Deserialize;
use std::{fmt, sync::Arc};
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::pkce::{generate_state, PkcePair};
use super::session::{SessionStore, STATE_KEY, TOKEN_KEY, VERIFIER_KEY};
use crate::error::{DashboardError, Result};

/// Query parameters the provider appends to the redirect URI; removed once
/// the callback has been handled.
const CALLBACK_PARAMS: &[&str] = &[
    "code",
    "state",
    "session_state",
    "error",
    "error_description",
    "error_uri",
];

/// The browser-like side of the flow: where we are, and how to move.
pub trait UserAgent {
    fn current_url(&self) -> Url;
    /// Navigate away to `to`. The flow resumes on the next page load.
    fn redirect(&mut self, to: &Url);
    /// Replace the current history entry without navigating.
    fn replace_url(&mut self, to: &Url);
}

/// Identity-provider registration used by [`TokenFlow`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OAuthSettings {
    /// e.g. `https://login.microsoftonline.com/<tenant>`
    pub authority: String,
    pub client_id: String,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
}

impl OAuthSettings {
    pub fn authorize_endpoint(&self) -> Result<Url> {
        self.endpoint("authorize")
    }

    pub fn token_endpoint(&self) -> Result<Url> {
        self.endpoint("token")
    }

    fn endpoint(&self, leaf: &str) -> Result<Url> {
        Ok(Url::parse(&format!(
            "{}/oauth2/v2.0/{}",
            self.authority.trim_end_matches('/'),
            leaf
        ))?)
    }

    fn scope(&self) -> String {
        self.scopes.join(" ")
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthState {
    Idle,
    AwaitingRedirect,
    AwaitingTokenExchange,
    Authorized,
    Expired,
    Failed,
}

/// Bearer credential. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum AuthOutcome {
    Authorized(AccessToken),
    /// The user agent was sent to the authorize endpoint.
    Redirected(Url),
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    expires_in: Option<u64>,
}

#[derive(Debug, Default)]
struct Callback {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

impl Callback {
    fn from_url(url: &Url) -> Self {
        let mut cb = Callback::default();
        for (k, v) in url.query_pairs() {
            match &*k {
                "code" => cb.code = Some(v.into_owned()),
                "state" => cb.state = Some(v.into_owned()),
                "error" => cb.error = Some(v.into_owned()),
                "error_description" => cb.error_description = Some(v.into_owned()),
                _ => {}
            }
        }
        cb
    }
}

/// OAuth2 authorization-code + PKCE handshake.
///
/// Each [`acquire`](TokenFlow::acquire) call starts at `Idle` and ends in
/// `Authorized`, `AwaitingRedirect` (after navigating away) or `Failed`.
/// Nothing is retried.
pub struct TokenFlow {
    settings: OAuthSettings,
    store: Arc<dyn SessionStore>,
    client: Client,
    state: AuthState,
}

impl TokenFlow {
    pub fn new(settings: OAuthSettings, store: Arc<dyn SessionStore>, client: Client) -> Self {
        Self {
            settings,
            store,
            client,
            state: AuthState::Idle,
        }
    }

    pub fn state(&self) -> AuthState {
        self.state
    }

    pub async fn acquire(&mut self, agent: &mut dyn UserAgent) -> Result<AuthOutcome> {
        self.transition(AuthState::Idle);
        let result = self.run(agent).await;
        if let Err(e) = &result {
            warn!(error = %e, "token acquisition failed");
            self.transition(AuthState::Failed);
        }
        result
    }

    /// Drop the cached token after the resource server rejected it.
    pub fn expire(&mut self) -> Result<()> {
        self.store.clear(TOKEN_KEY)?;
        self.transition(AuthState::Expired);
        Ok(())
    }

    /// Abandon any half-finished round trip and return to `Idle`.
    pub fn reset(&mut self) -> Result<()> {
        self.store.clear(VERIFIER_KEY)?;
        self.store.clear(STATE_KEY)?;
        self.transition(AuthState::Idle);
        Ok(())
    }

    async fn run(&mut self, agent: &mut dyn UserAgent) -> Result<AuthOutcome> {
        if let Some(token) = self.store.get(TOKEN_KEY)? {
            debug!("using cached token");
            self.transition(AuthState::Authorized);
            return Ok(AuthOutcome::Authorized(AccessToken(token)));
        }

        let current = agent.current_url();
        let callback = Callback::from_url(&current);

        if let Some(error) = callback.error {
            // a reload must not hit the same error again
            agent.replace_url(&strip_callback_params(&current));
            return Err(DashboardError::AuthorizationDenied {
                error,
                description: callback.error_description.unwrap_or_default(),
            });
        }

        let Some(code) = callback.code else {
            let target = self.begin_redirect()?;
            agent.redirect(&target);
            return Ok(AuthOutcome::Redirected(target));
        };

        self.transition(AuthState::AwaitingTokenExchange);
        let verifier = self
            .store
            .get(VERIFIER_KEY)?
            .ok_or(DashboardError::MissingVerifier)?;
        if let Some(expected) = self.store.get(STATE_KEY)? {
            if callback.state.as_deref() != Some(expected.as_str()) {
                return Err(DashboardError::StateMismatch);
            }
        }

        let exchanged = self.exchange(&code, &verifier).await;
        // verifier and code are single-use either way
        self.store.clear(VERIFIER_KEY)?;
        self.store.clear(STATE_KEY)?;
        let token = exchanged?;

        self.store.set(TOKEN_KEY, token.secret())?;
        agent.replace_url(&strip_callback_params(&current));
        self.transition(AuthState::Authorized);
        Ok(AuthOutcome::Authorized(token))
    }

    fn begin_redirect(&mut self) -> Result<Url> {
        self.transition(AuthState::AwaitingRedirect);
        let pair = PkcePair::generate()?;
        let state = generate_state()?;
        self.store.set(VERIFIER_KEY, &pair.verifier)?;
        self.store.set(STATE_KEY, &state)?;

        let scope = self.settings.scope();
        let url = Url::parse_with_params(
            self.settings.authorize_endpoint()?.as_str(),
            &[
                ("client_id", self.settings.client_id.as_str()),
                ("response_type", "code"),
                ("redirect_uri", self.settings.redirect_uri.as_str()),
                ("response_mode", "query"),
                ("scope", scope.as_str()),
                ("code_challenge", pair.challenge.as_str()),
                ("code_challenge_method", "S256"),
                ("state", state.as_str()),
            ],
        )?;
        info!(endpoint = %self.settings.authorize_endpoint()?, "redirecting to authorize");
        Ok(url)
    }

    #[instrument(level = "debug", skip_all)]
    async fn exchange(&self, code: &str, verifier: &str) -> Result<AccessToken> {
        let endpoint = self.settings.token_endpoint()?;
        let scope = self.settings.scope();
        let form = [
            ("client_id", self.settings.client_id.as_str()),
            ("scope", scope.as_str()),
            ("code", code),
            ("redirect_uri", self.settings.redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
            ("code_verifier", verifier),
        ];

        debug!(%endpoint, "exchanging authorization code");
        let resp = self.client.post(endpoint).form(&form).send().await?;
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(DashboardError::TokenExchangeFailed {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: Option<TokenResponse> = serde_json::from_str(&body).ok();
        match parsed {
            Some(TokenResponse {
                access_token: Some(token),
                expires_in,
            }) if !token.is_empty() => {
                info!(expires_in = ?expires_in, "token exchange succeeded");
                Ok(AccessToken(token))
            }
            _ => Err(DashboardError::TokenExchangeFailed {
                status: status.as_u16(),
                body,
            }),
        }
    }

    fn transition(&mut self, next: AuthState) {
        if self.state != next {
            debug!(from = ?self.state, to = ?next, "auth state");
            self.state = next;
        }
    }
}

/// `url` without the provider's callback parameters.
pub fn strip_callback_params(url: &Url) -> Url {
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| !CALLBACK_PARAMS.contains(&k.as_ref()))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let mut out = url.clone();
    if kept.is_empty() {
        out.set_query(None);
    } else {
        out.query_pairs_mut().clear().extend_pairs(kept);
    }
    out
}
