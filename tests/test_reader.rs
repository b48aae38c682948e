use std::time::Duration;

use lantern::gemini::error::{ConnectionError, RequestError, TransportError};
use lantern::gemini::reader::{MAX_LINE_LEN, MAX_URL_LEN, parse_request_line, read_request_line};
use tokio::io::AsyncWriteExt;
use tokio::time::Instant;

fn deadline() -> Instant {
    Instant::now() + Duration::from_secs(5)
}

#[test]
fn test_parse_valid_line() {
    let line = parse_request_line(b"gemini://localhost/page.gmi\r\n").unwrap();
    assert_eq!(line, "gemini://localhost/page.gmi");
}

#[test]
fn test_parse_too_long() {
    let mut raw = vec![b'a'; MAX_URL_LEN + 1];
    raw.extend_from_slice(b"\r\n");
    assert_eq!(parse_request_line(&raw), Err(RequestError::TooLong(MAX_LINE_LEN + 1)));
}

#[test]
fn test_parse_length_checked_before_encoding() {
    let raw = vec![0xFF; MAX_LINE_LEN + 10];
    assert!(matches!(parse_request_line(&raw), Err(RequestError::TooLong(_))));
}

#[test]
fn test_parse_invalid_utf8() {
    let raw = b"gemini://localhost/\xFF\xFE\r\n";
    assert_eq!(parse_request_line(raw), Err(RequestError::InvalidEncoding));
}

#[test]
fn test_parse_missing_terminator() {
    assert_eq!(
        parse_request_line(b"gemini://localhost/"),
        Err(RequestError::MalformedFraming)
    );
    assert_eq!(
        parse_request_line(b"gemini://localhost/\n"),
        Err(RequestError::MalformedFraming)
    );
    assert_eq!(parse_request_line(b""), Err(RequestError::MalformedFraming));
}

#[test]
fn test_parse_trailing_data_after_terminator() {
    assert_eq!(
        parse_request_line(b"gemini://localhost/\r\nextra"),
        Err(RequestError::MalformedFraming)
    );
}

#[test]
fn test_parse_empty_line() {
    assert_eq!(parse_request_line(b"\r\n"), Err(RequestError::Empty));
    assert_eq!(parse_request_line(b"  \t \r\n"), Err(RequestError::Empty));
}

#[tokio::test]
async fn test_read_single_segment() {
    let mut input: &[u8] = b"gemini://localhost/\r\n";
    let line = read_request_line(&mut input, deadline()).await.unwrap();
    assert_eq!(line, "gemini://localhost/");
}

#[tokio::test]
async fn test_read_fragmented_line() {
    let (mut client, mut server) = tokio::io::duplex(4096);

    let writer = tokio::spawn(async move {
        client.write_all(b"gemini://local").await.unwrap();
        client.flush().await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        client.write_all(b"host/a.gmi\r").await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        client.write_all(b"\n").await.unwrap();
        client
    });

    let line = read_request_line(&mut server, deadline()).await.unwrap();
    assert_eq!(line, "gemini://localhost/a.gmi");
    drop(writer.await.unwrap());
}

#[tokio::test]
async fn test_read_oversize_stops_at_cap() {
    let (mut client, mut server) = tokio::io::duplex(8192);
    client.write_all(&vec![b'a'; 3000]).await.unwrap();

    let err = read_request_line(&mut server, deadline()).await.unwrap_err();
    assert!(matches!(
        err,
        ConnectionError::Request(RequestError::TooLong(n)) if n > MAX_LINE_LEN
    ));
}

#[tokio::test]
async fn test_read_peer_closes_without_terminator() {
    let mut input: &[u8] = b"gemini://localhost/";
    let err = read_request_line(&mut input, deadline()).await.unwrap_err();
    assert!(matches!(err, ConnectionError::Request(RequestError::MalformedFraming)));
}

#[tokio::test]
async fn test_read_times_out() {
    let (_client, mut server) = tokio::io::duplex(64);
    let deadline = Instant::now() + Duration::from_millis(50);

    let err = read_request_line(&mut server, deadline).await.unwrap_err();
    assert!(matches!(err, ConnectionError::Transport(TransportError::Timeout)));
}
