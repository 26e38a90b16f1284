use std::{
    io,
    path::{Path, PathBuf},
};

use anyhow::Result;
use async_trait::async_trait;
use http::{header, Method, Request, Response, StatusCode};
use hyper::Body;
use tokio::fs;
use tokio_util::io::ReaderStream;

#[async_trait]
pub trait Handler {
    async fn handle(&self, request: Request<Body>) -> Result<Response<Body>>;
}

/// Serves the files under a directory, listing directories that have no
/// index.html.
pub struct StaticDir {
    root: PathBuf,
}

impl StaticDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        StaticDir { root: root.into() }
    }

    fn resolve(&self, segments: &[String]) -> PathBuf {
        segments.iter().fold(self.root.clone(), |p, s| p.join(s))
    }

    async fn file(&self, path: &Path, len: u64, head: bool) -> Result<Response<Body>> {
        let body = if head {
            Body::empty()
        } else {
            Body::wrap_stream(ReaderStream::new(fs::File::open(path).await?))
        };
        Response::builder()
            .header(header::CONTENT_TYPE, content_type(path))
            .header(header::CONTENT_LENGTH, len)
            .body(body)
            .map_err(From::from)
    }

    async fn listing(&self, path: &Path, head: bool) -> Result<Response<Body>> {
        let mut names = Vec::new();
        let mut entries = fs::read_dir(path).await?;
        while let Some(entry) = entries.next_entry().await? {
            let mut name = entry.file_name().to_string_lossy().into_owned();
            if entry.file_type().await?.is_dir() {
                name.push('/');
            }
            names.push(name);
        }
        names.sort();

        let mut html = String::from("<!doctype html>\n<meta name=\"viewport\" content=\"width=device-width\">\n<pre>\n");
        for name in &names {
            html.push_str(&format!(
                "<a href=\"{}\">{}</a>\n",
                urlencoding::encode(name).replace("%2F", "/"),
                escape_html(name)
            ));
        }
        html.push_str("</pre>\n");

        let len = html.len();
        Response::builder()
            .header(header::CONTENT_TYPE, "text/html; charset=utf-8")
            .header(header::CONTENT_LENGTH, len)
            .body(if head { Body::empty() } else { Body::from(html) })
            .map_err(From::from)
    }
}

#[async_trait]
impl Handler for StaticDir {
    async fn handle(&self, request: Request<Body>) -> Result<Response<Body>> {
        let head = match *request.method() {
            Method::GET => false,
            Method::HEAD => true,
            _ => {
                return Response::builder()
                    .status(StatusCode::METHOD_NOT_ALLOWED)
                    .header(header::ALLOW, "GET, HEAD")
                    .body(Body::from("405 method not allowed\n"))
                    .map_err(From::from)
            }
        };

        let raw = request.uri().path().to_owned();
        let segments = match clean_path(&raw) {
            Some(s) => s,
            None => return status(StatusCode::BAD_REQUEST),
        };
        if raw.ends_with("/index.html") {
            return redirect(&raw[..raw.len() - "index.html".len()]);
        }

        let path = self.resolve(&segments);
        let meta = match fs::metadata(&path).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return status(StatusCode::NOT_FOUND),
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                return status(StatusCode::FORBIDDEN)
            }
            Err(e) => return Err(e.into()),
        };

        if !meta.is_dir() {
            return self.file(&path, meta.len(), head).await;
        }
        if !raw.ends_with('/') {
            return redirect(&format!("{}/", raw));
        }
        let index = path.join("index.html");
        match fs::metadata(&index).await {
            Ok(m) if m.is_file() => self.file(&index, m.len(), head).await,
            _ => self.listing(&path, head).await,
        }
    }
}

/// Percent-decodes a request path and resolves `.` and `..` so the result can
/// never leave the served root. `None` if the path is not valid UTF-8 once
/// decoded or contains a NUL.
fn clean_path(raw: &str) -> Option<Vec<String>> {
    let decoded = urlencoding::decode(raw).ok()?;
    if decoded.contains('\0') {
        return None;
    }
    let mut segments: Vec<String> = Vec::new();
    for seg in decoded.split(|c: char| c == '/' || c == '\\') {
        match seg {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s.to_owned()),
        }
    }
    Some(segments)
}

fn content_type(path: &Path) -> String {
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    if mime.type_() == mime_guess::mime::TEXT && mime.get_param(mime_guess::mime::CHARSET).is_none() {
        format!("{}; charset=utf-8", mime)
    } else {
        mime.to_string()
    }
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

fn status(code: StatusCode) -> Result<Response<Body>> {
    let msg = format!(
        "{} {}\n",
        code.as_u16(),
        code.canonical_reason().unwrap_or_default()
    );
    Response::builder()
        .status(code)
        .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .body(Body::from(msg))
        .map_err(From::from)
}

fn redirect(location: &str) -> Result<Response<Body>> {
    Response::builder()
        .status(StatusCode::MOVED_PERMANENTLY)
        .header(header::LOCATION, location)
        .body(Body::empty())
        .map_err(From::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs as stdfs;

    fn request(method: Method, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    async fn body(resp: Response<Body>) -> String {
        let bytes = hyper::body::to_bytes(resp.into_body()).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn tree() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        stdfs::write(dir.path().join("hello.txt"), "hello\n").unwrap();
        stdfs::write(dir.path().join("a&b.css"), "body{}").unwrap();
        stdfs::create_dir(dir.path().join("site")).unwrap();
        stdfs::write(dir.path().join("site/index.html"), "<h1>site</h1>").unwrap();
        stdfs::create_dir(dir.path().join("empty")).unwrap();
        dir
    }

    #[test]
    fn clean_path_stays_inside_root() {
        assert_eq!(clean_path("/"), Some(vec![]));
        assert_eq!(clean_path("/a/./b//c"), Some(vec!["a".into(), "b".into(), "c".into()]));
        assert_eq!(clean_path("/../../etc/passwd"), Some(vec!["etc".into(), "passwd".into()]));
        assert_eq!(clean_path("/a/%2e%2e/%2e%2e/b"), Some(vec!["b".into()]));
        assert_eq!(clean_path("/a%20b"), Some(vec!["a b".into()]));
        assert_eq!(clean_path("/%00"), None);
        assert_eq!(clean_path("/%ff"), None);
    }

    #[test]
    fn content_types() {
        assert_eq!(content_type(Path::new("x/INDEX.HTML")), "text/html; charset=utf-8");
        assert_eq!(content_type(Path::new("notes.txt")), "text/plain; charset=utf-8");
        assert_eq!(content_type(Path::new("data.csv")), "text/csv; charset=utf-8");
        assert_eq!(content_type(Path::new("a.png")), "image/png");
        assert_eq!(content_type(Path::new("song.mp3")), "audio/mpeg");
        assert_eq!(content_type(Path::new("bundle.zip")), "application/zip");
        assert_eq!(content_type(Path::new("Makefile")), "application/octet-stream");
    }

    #[tokio::test]
    async fn serves_file() {
        let dir = tree();
        let resp = StaticDir::new(dir.path())
            .handle(request(Method::GET, "/hello.txt"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[header::CONTENT_TYPE], "text/plain; charset=utf-8");
        assert_eq!(resp.headers()[header::CONTENT_LENGTH], "6");
        assert_eq!(body(resp).await, "hello\n");
    }

    #[tokio::test]
    async fn streams_large_file() {
        let dir = tree();
        let data: String = (0..64 * 1024).map(|i| (b'a' + (i % 26) as u8) as char).collect();
        stdfs::write(dir.path().join("big.txt"), &data).unwrap();
        let resp = StaticDir::new(dir.path())
            .handle(request(Method::GET, "/big.txt"))
            .await
            .unwrap();
        assert_eq!(resp.headers()[header::CONTENT_LENGTH], data.len().to_string().as_str());
        assert_eq!(body(resp).await, data);
    }

    #[tokio::test]
    async fn head_has_no_body() {
        let dir = tree();
        let resp = StaticDir::new(dir.path())
            .handle(request(Method::HEAD, "/hello.txt"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[header::CONTENT_LENGTH], "6");
        assert_eq!(body(resp).await, "");
    }

    #[tokio::test]
    async fn rejects_other_methods() {
        let dir = tree();
        let resp = StaticDir::new(dir.path())
            .handle(request(Method::POST, "/hello.txt"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(resp.headers()[header::ALLOW], "GET, HEAD");
    }

    #[tokio::test]
    async fn missing_is_404() {
        let dir = tree();
        let resp = StaticDir::new(dir.path())
            .handle(request(Method::GET, "/nope.txt"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn dotdot_cannot_escape() {
        let dir = tree();
        let inner = dir.path().join("site");
        let resp = StaticDir::new(&inner)
            .handle(request(Method::GET, "/../hello.txt"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn directory_redirects_to_slash() {
        let dir = tree();
        let resp = StaticDir::new(dir.path())
            .handle(request(Method::GET, "/site"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(resp.headers()[header::LOCATION], "/site/");
    }

    #[tokio::test]
    async fn index_html_redirects_to_dir() {
        let dir = tree();
        let resp = StaticDir::new(dir.path())
            .handle(request(Method::GET, "/site/index.html"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(resp.headers()[header::LOCATION], "/site/");
    }

    #[tokio::test]
    async fn directory_serves_index() {
        let dir = tree();
        let resp = StaticDir::new(dir.path())
            .handle(request(Method::GET, "/site/"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[header::CONTENT_TYPE], "text/html; charset=utf-8");
        assert_eq!(body(resp).await, "<h1>site</h1>");
    }

    #[tokio::test]
    async fn directory_lists_entries() {
        let dir = tree();
        let resp = StaticDir::new(dir.path())
            .handle(request(Method::GET, "/"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let html = body(resp).await;
        let a = html.find("<a href=\"a%26b.css\">a&amp;b.css</a>").unwrap();
        let e = html.find("<a href=\"empty/\">empty/</a>").unwrap();
        let h = html.find("<a href=\"hello.txt\">hello.txt</a>").unwrap();
        let s = html.find("<a href=\"site/\">site/</a>").unwrap();
        assert!(a < e && e < h && h < s);
    }
}
