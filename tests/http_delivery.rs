use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread::JoinHandle;
use std::time::Duration;

use serde_json::Value;

use roi_watch::detect::{BBox, Detection};
use roi_watch::notify::{DeliveryError, Dispatcher, HttpTransport, IdGenerator, NotificationTransport};
use roi_watch::RoiRect;

/// Request as seen by the one-shot endpoint.
struct Captured {
    head: String,
    body: Value,
}

enum Reply {
    Status(u16, &'static str),
    Stall(Duration),
}

fn read_request(stream: &mut TcpStream) -> Captured {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    let header_end = loop {
        let n = stream.read(&mut chunk).expect("read request");
        assert!(n > 0, "client closed before headers");
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };
    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let content_length: usize = head
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.eq_ignore_ascii_case("content-length")
                .then(|| value.trim().parse().ok())
                .flatten()
        })
        .unwrap_or(0);
    while buf.len() < header_end + content_length {
        let n = stream.read(&mut chunk).expect("read body");
        assert!(n > 0, "client closed before body");
        buf.extend_from_slice(&chunk[..n]);
    }
    let body = serde_json::from_slice(&buf[header_end..header_end + content_length])
        .expect("json body");
    Captured { head, body }
}

/// Accept exactly one request and answer it.
fn one_shot_endpoint(reply: Reply) -> (String, JoinHandle<Captured>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind endpoint");
    let url = format!("http://{}/notifications", listener.local_addr().unwrap());
    let handle = std::thread::spawn(move || {
        let (mut stream, _) = listener.accept().expect("accept");
        let captured = read_request(&mut stream);
        match reply {
            Reply::Status(status, body) => {
                let response = format!(
                    "HTTP/1.1 {} X\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                stream.write_all(response.as_bytes()).expect("write response");
            }
            Reply::Stall(duration) => std::thread::sleep(duration),
        }
        captured
    });
    (url, handle)
}

fn dispatcher(url: &str, timeout: Duration) -> Dispatcher {
    let transport = HttpTransport::new(url, "secret-key", timeout);
    Dispatcher::new(Box::new(transport), IdGenerator::default())
}

fn notification(dispatcher: &Dispatcher) -> roi_watch::Notification {
    let detection = Detection::new("person", 0.85, BBox::new(100, 150, 200, 250));
    let roi = RoiRect {
        x: 50,
        y: 50,
        width: 300,
        height: 300,
    };
    dispatcher.build_payload(&detection, roi, "camera_1", None, &chrono::Local::now())
}

#[test]
fn posts_json_with_bearer_token() {
    let (url, server) = one_shot_endpoint(Reply::Status(200, "ok"));
    let dispatcher = dispatcher(&url, Duration::from_secs(5));
    let n = notification(&dispatcher);

    assert!(dispatcher.send(&n));

    let captured = server.join().unwrap();
    let head = captured.head.to_ascii_lowercase();
    assert!(head.starts_with("post /notifications "), "{head}");
    assert!(head.contains("authorization: bearer secret-key"), "{head}");
    assert!(head.contains("content-type: application/json"), "{head}");
    assert_eq!(captured.body["id"], Value::String(n.id.clone()));
    assert_eq!(captured.body["detection"]["bbox"], serde_json::json!([100, 150, 200, 250]));
    assert_eq!(captured.body["location"]["coordinates"], Value::Null);
}

#[test]
fn accepts_any_2xx() {
    let (url, server) = one_shot_endpoint(Reply::Status(204, ""));
    let dispatcher = dispatcher(&url, Duration::from_secs(5));
    let receipt = dispatcher.deliver(&notification(&dispatcher)).unwrap();
    assert_eq!(receipt.status, 204);
    server.join().unwrap();
}

#[test]
fn non_2xx_is_rejected_with_body() {
    let (url, server) = one_shot_endpoint(Reply::Status(500, "database down"));
    let dispatcher = dispatcher(&url, Duration::from_secs(5));
    let n = notification(&dispatcher);

    match dispatcher.deliver(&n) {
        Err(DeliveryError::Rejected { status, body }) => {
            assert_eq!(status, 500);
            assert_eq!(body, "database down");
        }
        other => panic!("expected rejection, got {other:?}"),
    }
    server.join().unwrap();
}

#[test]
fn stalled_endpoint_times_out() {
    let (url, server) = one_shot_endpoint(Reply::Stall(Duration::from_secs(2)));
    let transport = HttpTransport::new(&url, "secret-key", Duration::from_millis(300));
    assert_eq!(transport.endpoint(), url);
    let dispatcher = Dispatcher::new(Box::new(transport), IdGenerator::default());
    let n = notification(&dispatcher);

    match dispatcher.deliver(&n) {
        Err(DeliveryError::Timeout(after)) => assert_eq!(after, Duration::from_millis(300)),
        other => panic!("expected timeout, got {other:?}"),
    }
    server.join().unwrap();
}

#[test]
fn unreachable_endpoint_is_a_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}/notifications", listener.local_addr().unwrap());
    drop(listener);

    let dispatcher = dispatcher(&url, Duration::from_secs(2));
    let n = notification(&dispatcher);
    assert!(matches!(
        dispatcher.deliver(&n),
        Err(DeliveryError::Transport(_))
    ));
    assert!(!dispatcher.send(&n));
}
