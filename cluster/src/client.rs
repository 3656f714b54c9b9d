//! Admin-command client for a valkey node.
//!
//! The controller only ever issues a handful of commands (PING, CLUSTER
//! INFO, SET-CONFIG-EPOCH, ADDSLOTSRANGE, MEET, REPLICATE), so this is a
//! deliberately small RESP implementation over one persistent TCP
//! connection per target, not a general client. None of the issued
//! commands reply with arrays, so array replies are rejected outright.
//!
//! `NodeAdmin` is the seam the configurator works against; tests swap in a
//! recording fake. `Connector` abstracts dialing so the readiness gate can
//! retry against arbitrary peers.

use async_trait::async_trait;
use bytes::{BufMut, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufStream};
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;

use crate::errors::ClusterError;
use crate::resolve::NodeAddr;
use crate::PING_CHECK_INTERVAL;

/// One decoded server reply.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Reply {
    Simple(String),
    Integer(i64),
    Bulk(String),
    Nil,
}

/// The admin commands the controller needs from a node.
#[async_trait]
pub trait NodeAdmin: Send {
    async fn ping(&mut self) -> Result<(), ClusterError>;
    async fn cluster_info(&mut self) -> Result<String, ClusterError>;
    async fn set_config_epoch(&mut self, epoch: u64) -> Result<(), ClusterError>;
    async fn add_slots_range(&mut self, first: u16, last: u16) -> Result<(), ClusterError>;
    async fn meet(&mut self, host: &str, port: u16) -> Result<(), ClusterError>;
    async fn replicate(&mut self, primary: &str) -> Result<(), ClusterError>;
}

/// Dials a fresh admin connection to an address.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, addr: &NodeAddr) -> Result<Box<dyn NodeAdmin>, ClusterError>;
}

/// A persistent admin connection to one node.
pub struct Connection {
    stream: BufStream<TcpStream>,
}

impl Connection {
    pub async fn open(addr: &NodeAddr) -> Result<Self, ClusterError> {
        let stream = TcpStream::connect((addr.host.as_str(), addr.port)).await?;

        Ok(Self {
            stream: BufStream::new(stream),
        })
    }

    async fn command(&mut self, args: &[&str]) -> Result<Reply, ClusterError> {
        let mut buf = BytesMut::new();
        encode_command(&mut buf, args);

        self.stream.write_all(&buf).await?;
        self.stream.flush().await?;

        self.read_reply().await
    }

    async fn read_reply(&mut self) -> Result<Reply, ClusterError> {
        let line = self.read_line().await?;

        let Some(kind) = line.chars().next() else {
            return Err(ClusterError::ProtocolError("empty reply line".to_string()));
        };
        let rest = &line[1..];

        match kind {
            '+' => Ok(Reply::Simple(rest.to_string())),
            '-' => Err(ClusterError::CommandError(rest.to_string())),
            ':' => rest
                .parse()
                .map(Reply::Integer)
                .map_err(|_| ClusterError::ProtocolError(format!("bad integer reply {rest}"))),
            '$' => {
                let len: i64 = rest
                    .parse()
                    .map_err(|_| ClusterError::ProtocolError(format!("bad bulk length {rest}")))?;
                if len < 0 {
                    return Ok(Reply::Nil);
                }

                // Payload plus the trailing CRLF.
                let mut payload = vec![0u8; len as usize + 2];
                self.stream.read_exact(&mut payload).await?;
                payload.truncate(len as usize);

                String::from_utf8(payload)
                    .map(Reply::Bulk)
                    .map_err(|_| ClusterError::ProtocolError("bulk reply is not utf-8".to_string()))
            }
            other => Err(ClusterError::ProtocolError(format!(
                "unsupported reply type {other:?}"
            ))),
        }
    }

    async fn read_line(&mut self) -> Result<String, ClusterError> {
        use tokio::io::AsyncBufReadExt;

        let mut line = String::new();
        let n = self.stream.read_line(&mut line).await?;
        if n == 0 {
            return Err(ClusterError::ProtocolError(
                "connection closed by peer".to_string(),
            ));
        }

        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }
}

fn encode_command(buf: &mut BytesMut, args: &[&str]) {
    buf.put_slice(format!("*{}\r\n", args.len()).as_bytes());
    for arg in args {
        buf.put_slice(format!("${}\r\n", arg.len()).as_bytes());
        buf.put_slice(arg.as_bytes());
        buf.put_slice(b"\r\n");
    }
}

fn expect_ok(reply: Reply) -> Result<(), ClusterError> {
    match reply {
        Reply::Simple(s) if s == "OK" => Ok(()),
        other => Err(ClusterError::ProtocolError(format!(
            "expected +OK, got {other:?}"
        ))),
    }
}

#[async_trait]
impl NodeAdmin for Connection {
    async fn ping(&mut self) -> Result<(), ClusterError> {
        match self.command(&["PING"]).await? {
            Reply::Simple(s) if s == "PONG" => Ok(()),
            other => Err(ClusterError::ProtocolError(format!(
                "unexpected ping reply {other:?}"
            ))),
        }
    }

    async fn cluster_info(&mut self) -> Result<String, ClusterError> {
        match self.command(&["CLUSTER", "INFO"]).await? {
            Reply::Bulk(text) | Reply::Simple(text) => Ok(text),
            other => Err(ClusterError::ProtocolError(format!(
                "unexpected cluster info reply {other:?}"
            ))),
        }
    }

    async fn set_config_epoch(&mut self, epoch: u64) -> Result<(), ClusterError> {
        expect_ok(
            self.command(&["CLUSTER", "SET-CONFIG-EPOCH", &epoch.to_string()])
                .await?,
        )
    }

    async fn add_slots_range(&mut self, first: u16, last: u16) -> Result<(), ClusterError> {
        expect_ok(
            self.command(&[
                "CLUSTER",
                "ADDSLOTSRANGE",
                &first.to_string(),
                &last.to_string(),
            ])
            .await?,
        )
    }

    async fn meet(&mut self, host: &str, port: u16) -> Result<(), ClusterError> {
        expect_ok(
            self.command(&["CLUSTER", "MEET", host, &port.to_string()])
                .await?,
        )
    }

    async fn replicate(&mut self, primary: &str) -> Result<(), ClusterError> {
        expect_ok(self.command(&["CLUSTER", "REPLICATE", primary]).await?)
    }
}

/// The production connector: plain TCP.
#[derive(Clone, Copy, Debug, Default)]
pub struct TcpConnector;

#[async_trait]
impl Connector for TcpConnector {
    async fn connect(&self, addr: &NodeAddr) -> Result<Box<dyn NodeAdmin>, ClusterError> {
        Ok(Box::new(Connection::open(addr).await?))
    }
}

/// Block until the node at `addr` answers a ping, returning the live
/// connection for reuse.
///
/// Retries forever at a fixed interval; the store may simply not be
/// scheduled yet. The interval sleep races the cancellation token, so
/// cancellation returns immediately rather than waiting out the delay.
pub async fn wait_ready(
    cancel: &CancellationToken,
    connector: &dyn Connector,
    addr: &NodeAddr,
) -> Result<Box<dyn NodeAdmin>, ClusterError> {
    loop {
        match connector.connect(addr).await {
            Ok(mut conn) => match conn.ping().await {
                Ok(()) => {
                    log::debug!(addr = addr.to_string(); "node is ready");
                    return Ok(conn);
                }
                Err(e) => {
                    log::debug!(addr = addr.to_string(), err = e.to_string(); "node ping failed")
                }
            },
            Err(e) => {
                log::debug!(addr = addr.to_string(), err = e.to_string(); "node connection failed")
            }
        }

        log::debug!(addr = addr.to_string(), wait_secs = PING_CHECK_INTERVAL.as_secs(); "waiting for node to become ready");

        tokio::select! {
            _ = cancel.cancelled() => return Err(ClusterError::Cancelled),
            _ = tokio::time::sleep(PING_CHECK_INTERVAL) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    /// Serves one connection, answering each request with the next canned
    /// reply regardless of what was asked.
    async fn canned_server(replies: Vec<&'static str>) -> NodeAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 512];

            for reply in replies {
                match stream.read(&mut buf).await {
                    Ok(n) if n > 0 => {}
                    _ => return,
                }
                let _ = stream.write_all(reply.as_bytes()).await;
            }
        });

        NodeAddr {
            host: "127.0.0.1".to_string(),
            port,
        }
    }

    #[test]
    fn commands_encode_as_resp_arrays() {
        let mut buf = BytesMut::new();
        encode_command(&mut buf, &["CLUSTER", "MEET", "valkey-1", "6379"]);

        assert_eq!(
            &buf[..],
            b"*4\r\n$7\r\nCLUSTER\r\n$4\r\nMEET\r\n$8\r\nvalkey-1\r\n$4\r\n6379\r\n"
        );
    }

    #[tokio::test]
    async fn ping_and_bulk_replies_round_trip() {
        let addr = canned_server(vec![
            "+PONG\r\n",
            "$32\r\ncluster_state:ok\r\ncluster_size:3\r\n",
        ])
        .await;

        let mut conn = Connection::open(&addr).await.unwrap();
        conn.ping().await.unwrap();

        let info = conn.cluster_info().await.unwrap();
        assert!(info.contains("cluster_state:ok"));
    }

    #[tokio::test]
    async fn server_errors_surface_as_command_errors() {
        let addr = canned_server(vec!["-ERR Slot 0 is already busy\r\n"]).await;

        let mut conn = Connection::open(&addr).await.unwrap();
        let err = conn.add_slots_range(0, 5460).await.unwrap_err();

        assert!(matches!(err, ClusterError::CommandError(_)));
    }

    #[tokio::test]
    async fn array_replies_are_rejected() {
        let addr = canned_server(vec!["*2\r\n"]).await;

        let mut conn = Connection::open(&addr).await.unwrap();
        let err = conn.ping().await.unwrap_err();

        assert!(matches!(err, ClusterError::ProtocolError(_)));
    }
}
