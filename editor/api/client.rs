use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use tokio_util::sync::CancellationToken;

use super::error::error_message;
use super::{ApiError, EditService, ImageBlob};
use crate::editor::tool::ToolMode;
use crate::editor::upload::ImageFile;

pub const DEFAULT_REMOVE_BG_TIMEOUT: Duration = Duration::from_secs(60);

/// Talks to the editing server over multipart HTTP.
#[derive(Debug, Clone)]
pub struct HttpEditClient {
    client: reqwest::Client,
    base_url: String,
    remove_bg_timeout: Duration,
}

impl HttpEditClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        HttpEditClient {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            remove_bg_timeout: DEFAULT_REMOVE_BG_TIMEOUT,
        }
    }

    pub fn with_remove_bg_timeout(mut self, timeout: Duration) -> Self {
        self.remove_bg_timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn file_part(file: &ImageFile) -> Result<Part, ApiError> {
        Part::bytes(file.bytes.to_vec())
            .file_name(file.name.clone())
            .mime_str(&file.mime)
            .map_err(|err| ApiError::InvalidPart(err.to_string()))
    }

    fn blob_part(blob: &ImageBlob, name: &str) -> Result<Part, ApiError> {
        Part::bytes(blob.bytes.to_vec())
            .file_name(name.to_string())
            .mime_str(&blob.mime)
            .map_err(|err| ApiError::InvalidPart(err.to_string()))
    }

    async fn post(
        &self,
        tool: ToolMode,
        form: Form,
        timeout: Option<Duration>,
        cancel: &CancellationToken,
    ) -> Result<ImageBlob, ApiError> {
        let url = self.url(tool.endpoint().unwrap_or_default());
        tracing::info!(%url, "uploading");

        let request = async {
            let response = self.client.post(&url).multipart(form).send().await?;
            let status = response.status();
            if !status.is_success() {
                let body = match response.text().await {
                    Ok(body) => body,
                    Err(err) => {
                        tracing::warn!(%url, %status, error = %err, "could not read error body");
                        String::new()
                    }
                };
                let reason = status.canonical_reason().unwrap_or("Request failed");
                return Err(ApiError::Status {
                    status: status.as_u16(),
                    message: error_message(reason, &body),
                });
            }

            let content_type = response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string);
            let bytes = response.bytes().await?;
            ImageBlob::from_response(bytes, content_type.as_deref())
        };

        let deadline = async {
            match timeout {
                Some(timeout) => tokio::time::sleep(timeout).await,
                None => futures::future::pending::<()>().await,
            }
        };

        // Whichever branch loses is dropped, which aborts the connection.
        let result = tokio::select! {
            _ = cancel.cancelled() => Err(ApiError::Cancelled),
            _ = deadline => Err(ApiError::Timeout {
                after: timeout.unwrap_or_default(),
            }),
            result = request => result,
        };

        match &result {
            Ok(blob) => tracing::info!(%url, result = %blob.summary(), "upload finished"),
            Err(err) => tracing::warn!(%url, error = %err, "upload failed"),
        }
        result
    }
}

#[async_trait]
impl EditService for HttpEditClient {
    async fn remove_background(
        &self,
        image: &ImageFile,
        cancel: &CancellationToken,
    ) -> Result<ImageBlob, ApiError> {
        let form = Form::new().part("image", Self::file_part(image)?);
        self.post(ToolMode::RemoveBackground, form, Some(self.remove_bg_timeout), cancel)
            .await
    }

    async fn blur_background(
        &self,
        original: &ImageFile,
        subject: &ImageBlob,
        strength: u8,
        cancel: &CancellationToken,
    ) -> Result<ImageBlob, ApiError> {
        let form = Form::new()
            .part("original", Self::file_part(original)?)
            .part("subject", Self::blob_part(subject, "subject.png")?)
            .text("blur", strength.to_string());
        self.post(ToolMode::Blur, form, None, cancel).await
    }

    async fn ai_background(
        &self,
        image: &ImageFile,
        prompt: &str,
        cancel: &CancellationToken,
    ) -> Result<ImageBlob, ApiError> {
        let form = Form::new()
            .part("image", Self::file_part(image)?)
            .text("prompt", prompt.to_string());
        self.post(ToolMode::AiBackground, form, None, cancel).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::upload::tests::{png, PNG_HEADER};
    use pretty_assertions::assert_eq;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    struct Canned {
        status: &'static str,
        content_type: &'static str,
        body: Vec<u8>,
        delay: Duration,
    }

    /// Serves exactly one request and hands back the raw request bytes.
    async fn serve_once(canned: Canned) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let request = read_request(&mut socket).await;

            tokio::time::sleep(canned.delay).await;
            let head = format!(
                "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                canned.status,
                canned.content_type,
                canned.body.len()
            );
            socket.write_all(head.as_bytes()).await.ok();
            socket.write_all(&canned.body).await.ok();
            socket.shutdown().await.ok();
            request
        });

        (format!("http://{addr}"), handle)
    }

    async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
        let mut buffer = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let read = socket.read(&mut chunk).await.unwrap();
            if read == 0 {
                break;
            }
            buffer.extend_from_slice(&chunk[..read]);

            let text = String::from_utf8_lossy(&buffer).to_string();
            if let Some(header_end) = text.find("\r\n\r\n") {
                let headers = text[..header_end].to_ascii_lowercase();
                let content_length = headers
                    .lines()
                    .find_map(|line| line.strip_prefix("content-length:"))
                    .and_then(|value| value.trim().parse::<usize>().ok());
                let body_len = buffer.len() - (header_end + 4);
                match content_length {
                    Some(length) if body_len >= length => break,
                    None if buffer.ends_with(b"0\r\n\r\n") => break,
                    _ => {}
                }
            }
        }
        String::from_utf8_lossy(&buffer).to_string()
    }

    fn ok_png() -> Canned {
        Canned {
            status: "200 OK",
            content_type: "image/png",
            body: PNG_HEADER.to_vec(),
            delay: Duration::ZERO,
        }
    }

    #[tokio::test]
    async fn remove_background_posts_image_field() {
        let (base, server) = serve_once(ok_png()).await;
        let client = HttpEditClient::new(format!("{base}/"));

        let blob = client
            .remove_background(&png("cat.png"), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(blob.mime, "image/png");
        let request = server.await.unwrap();
        assert!(request.starts_with("POST /remove-bg HTTP/1.1"));
        assert!(request.contains("name=\"image\"; filename=\"cat.png\""));
    }

    #[tokio::test]
    async fn blur_sends_original_subject_and_strength() {
        let (base, server) = serve_once(ok_png()).await;
        let client = HttpEditClient::new(base);
        let subject = ImageBlob::new(PNG_HEADER.to_vec(), "image/png");

        client
            .blur_background(&png("cat.png"), &subject, 7, &CancellationToken::new())
            .await
            .unwrap();

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /blur-background HTTP/1.1"));
        assert!(request.contains("name=\"original\""));
        assert!(request.contains("name=\"subject\""));
        assert!(request.contains("name=\"blur\"\r\n\r\n7"));
    }

    #[tokio::test]
    async fn ai_background_sends_prompt() {
        let (base, server) = serve_once(ok_png()).await;
        let client = HttpEditClient::new(base);

        client
            .ai_background(&png("cat.png"), "a beach at dusk", &CancellationToken::new())
            .await
            .unwrap();

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /ai-background HTTP/1.1"));
        assert!(request.contains("name=\"prompt\"\r\n\r\na beach at dusk"));
    }

    #[tokio::test]
    async fn non_success_status_surfaces_body_text() {
        let (base, _server) = serve_once(Canned {
            status: "500 Internal Server Error",
            content_type: "text/plain",
            body: b"model crashed".to_vec(),
            delay: Duration::ZERO,
        })
        .await;
        let client = HttpEditClient::new(base);

        let err = client
            .remove_background(&png("cat.png"), &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(
            err,
            ApiError::Status {
                status: 500,
                message: "model crashed".to_string()
            }
        );
    }

    #[tokio::test]
    async fn remove_background_times_out() {
        let (base, server) = serve_once(Canned {
            delay: Duration::from_secs(5),
            ..ok_png()
        })
        .await;
        let client = HttpEditClient::new(base).with_remove_bg_timeout(Duration::from_millis(100));

        let err = client
            .remove_background(&png("cat.png"), &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(
            err,
            ApiError::Timeout {
                after: Duration::from_millis(100)
            }
        );
        assert_eq!(err.to_string(), "Request timed out.");
        server.abort();
    }

    #[tokio::test]
    async fn cancellation_aborts_request() {
        let (base, server) = serve_once(Canned {
            delay: Duration::from_secs(5),
            ..ok_png()
        })
        .await;
        let client = HttpEditClient::new(base);
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let err = client
            .ai_background(&png("cat.png"), "forest", &cancel)
            .await
            .unwrap_err();

        assert_eq!(err, ApiError::Cancelled);
        server.abort();
    }

    #[tokio::test]
    async fn unreachable_server_is_a_network_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = HttpEditClient::new(format!("http://{addr}"));
        let err = client
            .remove_background(&png("cat.png"), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Network(_)));
    }
}
