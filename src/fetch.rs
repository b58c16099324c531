use tracing::info;

use crate::error::{Error, Result};

/// Single-GET page fetcher. No retries; transport defaults for timeouts.
pub struct Fetcher {
    client: reqwest::Client,
}

impl Fetcher {
    pub fn new(user_agent: Option<&str>) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(ua) = user_agent {
            builder = builder.user_agent(ua.to_string());
        }
        let client = builder
            .build()
            .map_err(|e| Error::Config(format!("http client: {}", e)))?;
        Ok(Fetcher { client })
    }

    /// GET `url` and return the body as text. Transport failures and
    /// non-success statuses are both fetch failures.
    pub async fn fetch(&self, url: &str) -> Result<String> {
        info!("Fetching {}", url);
        let fetch_err = |source| Error::Fetch {
            url: url.to_string(),
            source,
        };

        let response = self.client.get(url).send().await.map_err(fetch_err)?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::FetchStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(fetch_err)?;
        info!("Fetched {} bytes from {}", body.len(), url);
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve exactly one canned HTTP response on a local port.
    async fn serve_once(status_line: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            let response = format!(
                "{}\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
        });
        format!("http://{}/", addr)
    }

    #[tokio::test]
    async fn returns_body() {
        let url = serve_once("HTTP/1.1 200 OK", "<h2 class=\"title\"></h2>").await;
        let body = Fetcher::new(Some("article_scraper-test"))
            .unwrap()
            .fetch(&url)
            .await
            .unwrap();
        assert_eq!(body, "<h2 class=\"title\"></h2>");
    }

    #[tokio::test]
    async fn error_status_is_failure() {
        let url = serve_once("HTTP/1.1 503 Service Unavailable", "busy").await;
        let err = Fetcher::new(None).unwrap().fetch(&url).await.unwrap_err();
        assert!(matches!(err, Error::FetchStatus { status: 503, .. }));
    }

    #[tokio::test]
    async fn unreachable_host() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/", listener.local_addr().unwrap());
        drop(listener);

        let err = Fetcher::new(None).unwrap().fetch(&url).await.unwrap_err();
        assert!(matches!(err, Error::Fetch { .. }));
    }
}
