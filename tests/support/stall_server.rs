//! Raw TCP origin that sends response headers and part of the body, then
//! holds the connection open without sending anything else.
//!
//! `HEAD` is answered in full and the connection closed. Every `GET` gets a
//! `206` (ranged) or `200` (unranged) head advertising the full span, then
//! `prefix` body bytes, then silence.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use super::socket_guard::should_skip_socket_bound_test;

const MAX_HEAD: usize = 8 * 1024;

#[derive(Debug)]
pub struct StallingOrigin {
    addr: SocketAddr,
    gets: Arc<AtomicUsize>,
    accept: JoinHandle<()>,
}

impl StallingOrigin {
    /// Starts an origin for a `total`-byte resource, or `None` when local
    /// sockets are unavailable.
    pub async fn start_or_skip(total: u64, ranges: bool, prefix: usize) -> Option<Self> {
        if should_skip_socket_bound_test() {
            return None;
        }
        let listener = TcpListener::bind("127.0.0.1:0").await.ok()?;
        let addr = listener.local_addr().ok()?;
        let gets = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&gets);
        let accept = tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                tokio::spawn(serve(socket, total, ranges, prefix, Arc::clone(&counter)));
            }
        });
        Some(Self { addr, gets, accept })
    }

    #[must_use]
    pub fn url(&self, route: &str) -> String {
        format!("http://{}{route}", self.addr)
    }

    /// Number of `GET` requests received so far.
    #[must_use]
    pub fn get_count(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }
}

impl Drop for StallingOrigin {
    fn drop(&mut self) {
        self.accept.abort();
    }
}

async fn read_head(socket: &mut TcpStream) -> Option<String> {
    let mut buf = Vec::with_capacity(1024);
    let mut scratch = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        if buf.len() > MAX_HEAD {
            return None;
        }
        let n = socket.read(&mut scratch).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&scratch[..n]);
    }
    Some(String::from_utf8_lossy(&buf).into_owned())
}

fn requested_range(head: &str) -> Option<(u64, u64)> {
    let value = head.lines().find_map(|line| {
        let (name, value) = line.split_once(':')?;
        name.trim()
            .eq_ignore_ascii_case("range")
            .then(|| value.trim().to_owned())
    })?;
    let (start, end) = value.strip_prefix("bytes=")?.split_once('-')?;
    Some((start.parse().ok()?, end.parse().ok()?))
}

async fn serve(
    mut socket: TcpStream,
    total: u64,
    ranges: bool,
    prefix: usize,
    gets: Arc<AtomicUsize>,
) {
    let Some(head) = read_head(&mut socket).await else {
        return;
    };

    if head.starts_with("HEAD ") {
        let accept = if ranges { "Accept-Ranges: bytes\r\n" } else { "" };
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Length: {total}\r\n{accept}Connection: close\r\n\r\n"
        );
        let _ = socket.write_all(response.as_bytes()).await;
        let _ = socket.shutdown().await;
        return;
    }

    gets.fetch_add(1, Ordering::SeqCst);
    let (status, len) = match requested_range(&head).filter(|_| ranges) {
        Some((start, end)) => {
            let end = end.min(total - 1);
            ("206 Partial Content", end - start + 1)
        }
        None => ("200 OK", total),
    };
    let response =
        format!("HTTP/1.1 {status}\r\nContent-Length: {len}\r\nConnection: close\r\n\r\n");
    let body = vec![7u8; prefix.min(usize::try_from(len).unwrap_or(usize::MAX))];
    if socket.write_all(response.as_bytes()).await.is_err() || socket.write_all(&body).await.is_err()
    {
        return;
    }
    let _ = socket.flush().await;

    tokio::time::sleep(Duration::from_secs(60)).await;
}
