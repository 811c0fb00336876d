use std::path::PathBuf;
use std::sync::Arc;

use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;
use tracing::debug;
use url::Url;

use crate::client::Client;
use crate::config::Progress;
use crate::response::Downloaded;
use crate::Error;

///Builder for a download request.
///
/// Streams the response body to disk. Without a destination the file lands in
/// a temporary directory owned by the returned [`Downloaded`] and is deleted
/// when that value is dropped.
pub struct Download<'a> {
    client: &'a Client,
    url: String,
    destination: Option<PathBuf>,
    progress: Option<Progress>,
}

impl<'a> Download<'a> {
    pub(crate) fn new(client: &'a Client, url: &str) -> Download<'a> {
        Download {
            client,
            url: url.to_owned(),
            destination: None,
            progress: None,
        }
    }

    ///File path to stream the body into.
    pub fn destination(mut self, destination: impl Into<PathBuf>) -> Self {
        self.destination = Some(destination.into());
        self
    }

    ///Progress callback, called with a non-decreasing fraction in [0, 1].
    ///
    /// Fractional ticks need a Content-Length; without one only the final
    /// 1.0 tick fires.
    pub fn progress(mut self, progress: impl Fn(f64) + Send + Sync + 'static) -> Self {
        self.progress = Some(Arc::new(progress));
        self
    }

    ///Dispatch and stream the body to disk.
    pub async fn perform(self) -> Result<Downloaded, Error> {
        let Download {
            client,
            url,
            destination,
            progress,
        } = self;
        let url = match Url::parse(&url) {
            Ok(url) => url,
            Err(_) => return Err(Error::InvalidURL(url)),
        };
        let file_name = file_name_for(&url);
        debug!(url = %url, "dispatching download");

        let response = client.http.get(url).send().await?;
        let status = response.status().as_u16();
        let total = response.content_length().unwrap_or(0);

        let (tempdir, path) = match destination {
            Some(path) => (None, path),
            None => {
                let dir = tempfile::tempdir()?;
                let path = dir.path().join(file_name);
                (Some(dir), path)
            }
        };

        let mut file = tokio::fs::File::create(&path).await?;
        let mut stream = response.bytes_stream();
        let mut done: u64 = 0;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            done += chunk.len() as u64;
            if let Some(progress) = &progress {
                if total > 0 {
                    progress((done as f64 / total as f64).min(1.0));
                }
            }
        }
        file.flush().await?;
        if let Some(progress) = &progress {
            progress(1.0);
        }
        Ok(Downloaded::new(tempdir, path, status))
    }
}

///Last path segment of the URL, with a fallback for bare hosts.
fn file_name_for(url: &Url) -> String {
    url.path_segments()
        .and_then(|segments| segments.last())
        .filter(|segment| !segment.is_empty())
        .unwrap_or("download")
        .to_owned()
}
