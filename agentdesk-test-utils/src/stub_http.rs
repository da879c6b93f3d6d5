//! Canned-reply HTTP/1.1 server for driving the real REST and provider
//! clients over a loopback socket.
//!
//! Replies are served in order, one per connection; once the list is
//! exhausted the last reply repeats. Every request is recorded before its
//! reply is written.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

#[derive(Debug, Clone)]
pub struct StubReply {
    status: u16,
    headers: Vec<(String, String)>,
    body: String,
}

impl StubReply {
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// e.g. `POST /api/tasks HTTP/1.1`
    pub request_line: String,
    /// Header names are lowercased.
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.headers
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }
}

pub struct StubServer {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    task: JoinHandle<()>,
}

impl StubServer {
    pub async fn start(replies: Vec<StubReply>) -> Self {
        assert!(!replies.is_empty(), "stub server needs at least one reply");
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind stub listener");
        let addr = listener.local_addr().expect("stub local addr");
        let requests = Arc::new(Mutex::new(Vec::new()));
        let task = tokio::spawn(serve(listener, replies, requests.clone()));
        Self {
            addr,
            requests,
            task,
        }
    }

    /// A reply carrying `body` as `application/json`.
    pub fn json(status: u16, body: impl Into<String>) -> StubReply {
        StubReply {
            status,
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
            body: body.into(),
        }
    }

    /// A loopback URL nothing is listening on.
    pub async fn unreachable_url() -> String {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind stub listener");
        let addr = listener.local_addr().expect("stub local addr");
        drop(listener);
        format!("http://{}", addr)
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn serve(
    listener: TcpListener,
    replies: Vec<StubReply>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
) {
    let mut served = 0usize;
    while let Ok((mut stream, _)) = listener.accept().await {
        let reply = &replies[served.min(replies.len() - 1)];
        served += 1;
        let Ok(request) = read_request(&mut stream).await else {
            continue;
        };
        requests.lock().unwrap().push(request);
        let _ = write_reply(&mut stream, reply).await;
    }
}

async fn read_request(stream: &mut TcpStream) -> std::io::Result<RecordedRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let head_end = loop {
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos;
        }
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Err(std::io::ErrorKind::UnexpectedEof.into());
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).into_owned();
    let mut lines = head.split("\r\n");
    let request_line = lines.next().unwrap_or_default().to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(name, value)| (name.trim().to_ascii_lowercase(), value.trim().to_string()))
        .collect();
    let content_length = headers
        .iter()
        .find(|(name, _)| name == "content-length")
        .and_then(|(_, value)| value.parse::<usize>().ok())
        .unwrap_or(0);

    let mut body = buf[head_end + 4..].to_vec();
    while body.len() < content_length {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
    }

    Ok(RecordedRequest {
        request_line,
        headers,
        body: String::from_utf8_lossy(&body).into_owned(),
    })
}

async fn write_reply(stream: &mut TcpStream, reply: &StubReply) -> std::io::Result<()> {
    let mut response = format!(
        "HTTP/1.1 {} Stub\r\nContent-Length: {}\r\nConnection: close\r\n",
        reply.status,
        reply.body.len()
    );
    for (name, value) in &reply.headers {
        response.push_str(&format!("{}: {}\r\n", name, value));
    }
    response.push_str("\r\n");
    response.push_str(&reply.body);
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_request_and_repeats_last_reply() {
        let server = StubServer::start(vec![
            StubServer::json(201, r#"{"ok":true}"#),
            StubServer::json(500, "{}").with_header("Retry-After", "3"),
        ])
        .await;

        for expected in ["201", "500", "500"] {
            let mut stream = TcpStream::connect(server.addr).await.unwrap();
            stream
                .write_all(b"POST /x HTTP/1.1\r\nHost: a\r\nContent-Length: 4\r\n\r\nping")
                .await
                .unwrap();
            let mut response = String::new();
            stream.read_to_string(&mut response).await.unwrap();
            assert!(response.starts_with(&format!("HTTP/1.1 {} ", expected)));
        }

        let recorded = server.requests();
        assert_eq!(recorded.len(), 3);
        assert_eq!(recorded[0].request_line, "POST /x HTTP/1.1");
        assert_eq!(recorded[0].header("HOST"), Some("a"));
        assert_eq!(recorded[0].body, "ping");
    }
}
