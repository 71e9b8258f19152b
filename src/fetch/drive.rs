use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, instrument};
use url::Url;

use crate::auth::AccessToken;
use crate::error::{DashboardError, FetchStage, Result};

/// Raw export body plus what the drive told us about it.
#[derive(Debug, Clone)]
pub struct RemoteFile {
    pub name: Option<String>,
    pub text: String,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Deserialize)]
struct DriveItem {
    name: Option<String>,
    #[serde(rename = "@microsoft.graph.downloadUrl")]
    download_url: Option<String>,
}

/// Two-step drive download: item metadata, then the short-lived direct URL.
#[derive(Debug, Clone)]
pub struct DriveFetcher {
    client: Client,
    item_url: Url,
}

impl DriveFetcher {
    /// `item_url` addresses the drive item itself (no `/content` suffix), e.g.
    /// `https://graph.microsoft.com/v1.0/sites/{site}/drive/root:/{path}`.
    pub fn new(client: Client, item_url: Url) -> Self {
        Self { client, item_url }
    }

    pub fn item_url(&self) -> &Url {
        &self.item_url
    }

    #[instrument(level = "info", skip_all, fields(item = %self.item_url))]
    pub async fn fetch_file(&self, token: &AccessToken) -> Result<RemoteFile> {
        let resp = self
            .client
            .get(self.item_url.clone())
            .bearer_auth(token.secret())
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(DashboardError::FileFetchError {
                stage: FetchStage::Metadata,
                status: status.as_u16(),
            });
        }
        let item: DriveItem = serde_json::from_str(&resp.text().await?)?;
        let download_url = item
            .download_url
            .filter(|u| !u.is_empty())
            .ok_or(DashboardError::MissingDownloadUrl)?;
        let download_url = Url::parse(&download_url)?;
        debug!(name = ?item.name, "resolved download URL");

        // the download URL is pre-authenticated; no bearer header
        let resp = self.client.get(download_url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(DashboardError::FileFetchError {
                stage: FetchStage::Content,
                status: status.as_u16(),
            });
        }
        let text = resp.text().await?;
        info!(bytes = text.len(), "downloaded export");

        Ok(RemoteFile {
            name: item.name,
            text,
            fetched_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{CapturedRequest, TestServer};

    const CSV: &str = "Project Name,Project Status\nAlpha,On Track\n";

    fn fetcher_for(server: &TestServer) -> DriveFetcher {
        DriveFetcher::new(Client::new(), Url::parse(&server.url("/drive/item")).unwrap())
    }

    fn drive_server_handler(
        metadata_status: u16,
        content_status: u16,
    ) -> impl Fn(&CapturedRequest, &str) -> (u16, String) + Send + Sync + 'static
    {
        move |req: &CapturedRequest, base: &str| match req.path() {
            "/drive/item" if metadata_status == 200 => (
                200,
                format!(
                    r#"{{"name":"report.csv","@microsoft.graph.downloadUrl":"{}/download/abc?sig=1"}}"#,
                    base
                ),
            ),
            "/drive/item" => (metadata_status, r#"{"error":{"code":"nope"}}"#.into()),
            "/download/abc" => (content_status, CSV.into()),
            _ => (404, String::new()),
        }
    }

    #[tokio::test]
    async fn metadata_then_content() {
        let server = TestServer::start(drive_server_handler(200, 200)).await;
        let fetcher = fetcher_for(&server);

        let file = fetcher.fetch_file(&AccessToken::new("tok")).await.unwrap();
        assert_eq!(file.name.as_deref(), Some("report.csv"));
        assert_eq!(file.text, CSV);

        let requests = server.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].method, "GET");
        assert_eq!(requests[0].header("authorization"), Some("Bearer tok"));
        assert_eq!(requests[1].target, "/download/abc?sig=1");
        assert_eq!(requests[1].header("authorization"), None);
    }

    #[tokio::test]
    async fn metadata_failure_carries_status() {
        let server = TestServer::start(drive_server_handler(401, 200)).await;
        let fetcher = fetcher_for(&server);

        let err = fetcher.fetch_file(&AccessToken::new("tok")).await.unwrap_err();
        assert!(err.is_unauthorized(), "{err}");
        assert!(matches!(
            err,
            DashboardError::FileFetchError {
                stage: FetchStage::Metadata,
                status: 401
            }
        ));
        assert_eq!(server.requests().len(), 1);
    }

    #[tokio::test]
    async fn content_failure_carries_status() {
        let server = TestServer::start(drive_server_handler(200, 403)).await;
        let fetcher = fetcher_for(&server);

        let err = fetcher.fetch_file(&AccessToken::new("tok")).await.unwrap_err();
        assert!(matches!(
            err,
            DashboardError::FileFetchError {
                stage: FetchStage::Content,
                status: 403
            }
        ));
    }

    #[tokio::test]
    async fn metadata_without_download_url() {
        let server = TestServer::start(|_, _| (200, r#"{"name":"report.csv"}"#.into())).await;
        let fetcher = fetcher_for(&server);

        let err = fetcher.fetch_file(&AccessToken::new("tok")).await.unwrap_err();
        assert!(matches!(err, DashboardError::MissingDownloadUrl), "{err}");
    }

    #[tokio::test]
    async fn unreachable_drive_is_network_error() {
        let fetcher =
            DriveFetcher::new(Client::new(), Url::parse("http://127.0.0.1:1/item").unwrap());
        let err = fetcher.fetch_file(&AccessToken::new("tok")).await.unwrap_err();
        assert!(matches!(err, DashboardError::Network(_)), "{err}");
    }
}
