//! HTTP serving contract
//!
//! Framework-neutral: turns a node into status/headers/body that any
//! HTTP layer can translate. Conditional requests use a strong ETag
//! when the backend carries a native digest and a weak mtime/size ETag
//! otherwise, so object-store content revalidates without a read.

use ferry_core::{ByteStream, FerryError, FerryResult, Node};
use ferry_sync::resolver;

/// Request-side options for serving a node
#[derive(Debug, Clone, Default)]
pub struct ServeOptions {
    /// `If-None-Match` header from the client, if any
    pub if_none_match: Option<String>,
    /// Serve as an attachment under this filename
    pub download_name: Option<String>,
}

/// Framework-neutral response
pub struct ServeResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Option<ByteStream>,
}

impl ServeResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    fn not_found() -> Self {
        Self {
            status: 404,
            headers: Vec::new(),
            body: None,
        }
    }
}

/// Serve a node's content.
///
/// Missing nodes and directories produce a bodyless 404. A matching
/// `If-None-Match` produces a 304 with the ETag and no body; otherwise
/// the full 200 with content headers and a streaming body.
pub async fn serve(node: &Node, options: &ServeOptions) -> FerryResult<ServeResponse> {
    let meta = resolver::resolve(node).await?;
    if !meta.exists || meta.is_dir {
        return Ok(ServeResponse::not_found());
    }

    let etag = match &meta.digest {
        Some(digest) => format!("\"{}\"", digest.value),
        None => format!(
            "W/\"{}-{}\"",
            meta.mtime.map(|t| t.timestamp()).unwrap_or(0),
            meta.size.unwrap_or(0)
        ),
    };

    if options.if_none_match.as_deref() == Some(etag.as_str()) {
        return Ok(ServeResponse {
            status: 304,
            headers: vec![("ETag".to_string(), etag)],
            body: None,
        });
    }

    // The node can vanish between the stat and the read; that is still
    // a 404, not a caller error
    let body = match node.read_stream().await {
        Ok(stream) => stream,
        Err(FerryError::NotFound(_)) => return Ok(ServeResponse::not_found()),
        Err(e) => return Err(e),
    };

    let mut headers = vec![
        ("ETag".to_string(), etag),
        (
            "Content-Type".to_string(),
            content_type_for(node.extension()).to_string(),
        ),
    ];
    if let Some(size) = meta.size {
        headers.push(("Content-Length".to_string(), size.to_string()));
    }
    if let Some(name) = &options.download_name {
        headers.push((
            "Content-Disposition".to_string(),
            format!("attachment; filename=\"{}\"", name),
        ));
    }

    Ok(ServeResponse {
        status: 200,
        headers,
        body: Some(body),
    })
}

/// Content type from the filename extension.
pub fn content_type_for(extension: Option<&str>) -> &'static str {
    match extension.map(|e| e.to_ascii_lowercase()).as_deref() {
        Some("html") | Some("htm") => "text/html",
        Some("css") => "text/css",
        Some("js") => "text/javascript",
        Some("json") => "application/json",
        Some("txt") => "text/plain",
        Some("md") => "text/markdown",
        Some("csv") => "text/csv",
        Some("xml") => "application/xml",
        Some("pdf") => "application/pdf",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("webp") => "image/webp",
        Some("ico") => "image/x-icon",
        Some("mp4") => "video/mp4",
        Some("webm") => "video/webm",
        Some("mp3") => "audio/mpeg",
        Some("wav") => "audio/wav",
        Some("zip") => "application/zip",
        Some("gz") => "application/gzip",
        Some("tar") => "application/x-tar",
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        _ => "application/octet-stream",
    }
}
