//! Headless protocol client for the quiz server
//!
//! Speaks the newline-delimited JSON protocol: typed request senders plus a
//! push stream. The interactive frontend is intentionally thin; this crate
//! carries everything needed to play a game or drive one from a test.

use log::debug;
use shared::{current_timestamp, Request, Response};
use std::error::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

/// Receiving half: server replies and game pushes, in arrival order.
pub struct EventStream {
    lines: Lines<BufReader<OwnedReadHalf>>,
}

impl EventStream {
    /// Next message from the server. Errors when the connection closes.
    pub async fn next_event(&mut self) -> Result<Response, Box<dyn Error>> {
        loop {
            match self.lines.next_line().await? {
                Some(line) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    let response: Response = serde_json::from_str(line)?;
                    debug!("Received: {:?}", response);
                    return Ok(response);
                }
                None => return Err("connection closed by server".into()),
            }
        }
    }
}

/// Sending half. Can be moved to a separate task so answers go out while
/// the event stream is being consumed.
pub struct RequestSink {
    write_half: OwnedWriteHalf,
}

impl RequestSink {
    pub async fn send(&mut self, request: &Request) -> Result<(), Box<dyn Error>> {
        let payload = encode_line(request)?;
        self.write_half.write_all(&payload).await?;
        Ok(())
    }

    /// Fire-and-forget answer submission, stamped with the current
    /// wall-clock time. The server replies only through game broadcasts.
    pub async fn submit_answer(&mut self, room_id: &str, answer: &str) -> Result<(), Box<dyn Error>> {
        self.send(&Request::SubmitAnswer {
            room_id: room_id.to_string(),
            answer: answer.to_string(),
            timestamp: current_timestamp(),
        })
        .await
    }
}

/// A connected quiz client.
pub struct QuizClient {
    events: EventStream,
    requests: RequestSink,
}

impl QuizClient {
    pub async fn connect(addr: &str) -> Result<Self, Box<dyn Error>> {
        let socket = TcpStream::connect(addr).await?;
        socket.set_nodelay(true)?;
        let (read_half, write_half) = socket.into_split();

        Ok(Self {
            events: EventStream {
                lines: BufReader::new(read_half).lines(),
            },
            requests: RequestSink { write_half },
        })
    }

    /// Splits into independently owned receive/send halves.
    pub fn into_split(self) -> (EventStream, RequestSink) {
        (self.events, self.requests)
    }

    pub async fn next_event(&mut self) -> Result<Response, Box<dyn Error>> {
        self.events.next_event().await
    }

    /// Sends a request and returns the next inbound message. Valid for the
    /// request kinds that produce a direct reply; per-connection sends are
    /// ordered, so the reply arrives before any subsequent game push.
    pub async fn request(&mut self, request: &Request) -> Result<Response, Box<dyn Error>> {
        self.requests.send(request).await?;
        self.events.next_event().await
    }

    pub async fn register(&mut self, name: &str) -> Result<Response, Box<dyn Error>> {
        self.request(&Request::Register {
            name: name.to_string(),
        })
        .await
    }

    pub async fn create_room(
        &mut self,
        mode: usize,
        question_count: usize,
    ) -> Result<Response, Box<dyn Error>> {
        self.request(&Request::CreateRoom {
            mode,
            question_count,
        })
        .await
    }

    pub async fn join_room(&mut self, room_id: &str) -> Result<Response, Box<dyn Error>> {
        self.request(&Request::JoinRoom {
            room_id: room_id.to_string(),
        })
        .await
    }

    pub async fn submit_answer(&mut self, room_id: &str, answer: &str) -> Result<(), Box<dyn Error>> {
        self.requests.submit_answer(room_id, answer).await
    }

    pub async fn list_rankings(&mut self) -> Result<Vec<(String, u32)>, Box<dyn Error>> {
        match self.request(&Request::ListRankings).await? {
            Response::Ok {
                rankings: Some(rankings),
                ..
            } => Ok(rankings),
            other => Err(format!("unexpected rankings reply: {:?}", other).into()),
        }
    }
}

fn encode_line(request: &Request) -> Result<Vec<u8>, serde_json::Error> {
    let mut payload = serde_json::to_vec(request)?;
    payload.push(b'\n');
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[test]
    fn test_encode_line_is_newline_terminated() {
        let payload = encode_line(&Request::ListRankings).unwrap();
        assert_eq!(payload.last(), Some(&b'\n'));
        assert!(!payload[..payload.len() - 1].contains(&b'\n'));
    }

    #[tokio::test]
    async fn test_request_reply_over_loopback() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        // Minimal peer: read one request line, send one welcome line.
        let peer = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let (read_half, mut write_half) = socket.into_split();
            let mut lines = BufReader::new(read_half).lines();

            let line = lines.next_line().await.unwrap().unwrap();
            let request: Request = serde_json::from_str(&line).unwrap();
            let name = match request {
                Request::Register { name } => name,
                other => panic!("Expected register, got {:?}", other),
            };

            let reply = serde_json::to_string(&Response::ok(format!("Welcome, {}!", name))).unwrap();
            write_half
                .write_all(format!("{}\n", reply).as_bytes())
                .await
                .unwrap();
        });

        let mut client = QuizClient::connect(&addr.to_string()).await.unwrap();
        match client.register("alice").await.unwrap() {
            Response::Ok {
                message: Some(message),
                ..
            } => assert_eq!(message, "Welcome, alice!"),
            other => panic!("Expected welcome, got {:?}", other),
        }

        peer.await.unwrap();
    }

    #[tokio::test]
    async fn test_next_event_reports_closed_connection() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let peer = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            drop(socket);
        });

        let mut client = QuizClient::connect(&addr.to_string()).await.unwrap();
        assert!(client.next_event().await.is_err());

        peer.await.unwrap();
    }
}
