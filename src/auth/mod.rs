pub mod agent;
pub mod flow;
pub mod pkce;
pub mod session;

pub use agent::ConsoleUserAgent;
pub use flow::{
    strip_callback_params, AccessToken, AuthOutcome, AuthState, OAuthSettings, TokenFlow,
    UserAgent,
};
pub use pkce::{challenge_for, PkcePair};
pub use session::{FileSessionStore, MemorySessionStore, SessionStore};
