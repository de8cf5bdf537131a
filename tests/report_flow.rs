//! End-to-end report delivery against an in-process fake collector.

use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::mpsc;
use std::thread;

use stathub_agent::error::AgentError;
use stathub_agent::{auth, transport, StatRecord};

fn sample_record() -> StatRecord {
    StatRecord {
        id: "abc".into(),
        time_stamp: 1_700_000_000,
        host_name: "node1".into(),
        os_release: "Linux 6.1 64bit".into(),
        cpu_name: "Test CPU".into(),
        cpu_core: 4,
        uptime: 3600,
        load: "0.50 0.25 0.05".into(),
        cpu_rate: 30.0,
        mem_rate: 40.0,
        swap_rate: 10.0,
        disk_rate: 0.53,
        disk_warn: "/ 95.00;".into(),
        disk_read: 12,
        disk_write: 6,
        net_read: 8,
        net_write: 4,
    }
}

/// Accept exactly one HTTP request, answer with `body`, and hand the raw
/// request back through the channel.
fn serve_once(body: &'static str) -> (String, mpsc::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();

        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = stream.read(&mut chunk).unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            if let Some(header_end) = find_header_end(&buf) {
                let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
                if buf.len() >= header_end + 4 + content_length(&head) {
                    break;
                }
            }
        }

        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            body.len(),
            body
        );
        stream.write_all(response.as_bytes()).unwrap();
        stream.flush().unwrap();

        let _ = tx.send(String::from_utf8_lossy(&buf).to_string());
    });

    (format!("http://{}", addr), rx)
}

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

fn content_length(head: &str) -> usize {
    head.lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            if name.eq_ignore_ascii_case("content-length") {
                value.trim().parse().ok()
            } else {
                None
            }
        })
        .unwrap_or(0)
}

#[test]
fn empty_response_is_success_and_token_covers_payload_bytes() {
    let (server, requests) = serve_once("");

    let payload = sample_record().to_json().unwrap();
    let token = auth::token("s3cret", payload.as_bytes());

    let dir = tempfile::tempdir().unwrap();
    transport::send(
        &server,
        payload.clone().into_bytes(),
        &token,
        &dir.path().join("cert.pem"),
    )
    .unwrap();

    let request = requests.recv().unwrap();
    let head = request.to_lowercase();

    assert!(request.starts_with("POST /api/stat HTTP/1.1\r\n"));
    assert!(head.contains(&format!("x-client-key: {token}")));
    assert!(head.contains("content-type: application/json"));
    assert!(head.contains("user-agent: stathub-agent/"));
    assert!(request.ends_with(&payload));
}

#[test]
fn non_empty_response_body_is_a_rejection() {
    let (server, _requests) = serve_once("unknown client id");

    let payload = sample_record().to_json().unwrap();
    let token = auth::token("s3cret", payload.as_bytes());

    let dir = tempfile::tempdir().unwrap();
    let err = transport::send(
        &server,
        payload.into_bytes(),
        &token,
        &dir.path().join("cert.pem"),
    )
    .unwrap_err();

    match err {
        AgentError::ServerRejected(body) => assert_eq!(body, "unknown client id"),
        other => panic!("expected ServerRejected, got {other}"),
    }
}
