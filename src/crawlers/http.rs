use crate::crawlers::crawler::Fetcher;
use crate::error::Result;
use crate::results::Page;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use url::Url;

/// Fetches pages with a plain HTTP client
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Create a fetcher sending `user_agent` and giving up after `timeout`
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<Page> {
        ::log::debug!("GET {}", url);

        let response = self.client.get(url.clone()).send().await?.error_for_status()?;
        let final_url = response.url().clone();
        if &final_url != url {
            ::log::debug!("{} redirected to {}", url, final_url);
        }

        let body = response.text().await?;
        Ok(Page::new(final_url, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CrawlError;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serves `/old` as a redirect to `/new`, `/new` as a page, anything else as 404
    async fn serve() -> Url {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                tokio::spawn(async move {
                    let mut request = Vec::new();
                    let mut buf = [0u8; 1024];
                    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                        match socket.read(&mut buf).await {
                            Ok(0) | Err(_) => return,
                            Ok(n) => request.extend_from_slice(&buf[..n]),
                        }
                    }

                    let request = String::from_utf8_lossy(&request);
                    let path = request.split_whitespace().nth(1).unwrap_or("/");
                    let response = match path {
                        "/old" => "HTTP/1.1 301 Moved Permanently\r\nLocation: /new\r\nContent-Length: 0\r\nConnection: close\r\n\r\n".to_string(),
                        "/new" => {
                            let body = "<html><body>moved here</body></html>";
                            format!(
                                "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                                body.len(),
                                body
                            )
                        }
                        _ => "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n".to_string(),
                    };
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        Url::parse(&format!("http://{}/", addr)).unwrap()
    }

    fn fetcher() -> HttpFetcher {
        HttpFetcher::new("credit-crawl-test", Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_not_found_is_an_error() {
        let base = serve().await;
        let result = fetcher().fetch(&base.join("missing").unwrap()).await;
        assert!(matches!(result, Err(CrawlError::Http(_))));
    }

    #[tokio::test]
    async fn test_page_location_is_the_redirect_target() {
        let base = serve().await;
        let page = fetcher().fetch(&base.join("old").unwrap()).await.unwrap();

        assert_eq!(page.url, base.join("new").unwrap());
        assert!(page.body.contains("moved here"));
    }
}
