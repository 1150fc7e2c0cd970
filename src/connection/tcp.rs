//! Default transport: one TCP stream per connection speaking RESP.
//!
//! Wraps a `tokio::net::TcpStream` with an integrated read buffer and the
//! RESP parser for streaming request/response I/O.

use crate::args::CommandArgs;
use crate::connection::{NodeRole, Transport};
use crate::error::{Error, Result};
use crate::resp::{parse, write_command, RawReply};

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, trace};

/// Initial read buffer capacity (64 KB).
const DEFAULT_BUF_CAPACITY: usize = 64 * 1024;

/// Default maximum read buffer size (512 MB).
pub const DEFAULT_MAX_BUF_SIZE: usize = 512 * 1024 * 1024;

/// A single connection to a Redis server.
pub struct RedisConnection {
    stream: TcpStream,
    /// Data read from the socket but not yet consumed by the parser.
    buf: BytesMut,
    /// Outgoing frames are encoded here before one `write_all`.
    out: BytesMut,
    max_buf_size: usize,
}

impl RedisConnection {
    /// Open a TCP connection to `addr` (e.g. "127.0.0.1:6379").
    pub async fn connect(addr: &str, max_buf_size: usize) -> Result<Self> {
        let stream = TcpStream::connect(addr).await.map_err(Error::Connection)?;
        stream.set_nodelay(true).ok();
        Ok(Self {
            stream,
            buf: BytesMut::with_capacity(DEFAULT_BUF_CAPACITY),
            out: BytesMut::new(),
            max_buf_size,
        })
    }

    async fn send_raw(&mut self, data: &[u8]) -> Result<()> {
        self.stream.write_all(data).await?;
        Ok(())
    }

    /// Read one complete reply. RESP3 push frames (out-of-band
    /// invalidations) are skipped.
    pub async fn read_reply(&mut self) -> Result<RawReply> {
        loop {
            match self.read_frame().await? {
                RawReply::Push { kind, .. } => trace!(%kind, "skipping out-of-band push"),
                reply => return Ok(reply),
            }
        }
    }

    async fn read_frame(&mut self) -> Result<RawReply> {
        loop {
            if !self.buf.is_empty() {
                // Freeze for zero-copy bulk slices; unconsumed bytes go back.
                let snapshot = self.buf.split().freeze();
                match parse(&snapshot) {
                    Ok((value, consumed)) => {
                        if consumed < snapshot.len() {
                            self.buf.extend_from_slice(&snapshot[consumed..]);
                        }
                        return Ok(value);
                    }
                    Err(Error::Incomplete) => self.buf.extend_from_slice(&snapshot),
                    Err(e) => {
                        self.buf.extend_from_slice(&snapshot);
                        return Err(e);
                    }
                }
            }

            self.grow()?;
            let n = self.stream.read_buf(&mut self.buf).await?;
            if n == 0 {
                return Err(Error::Transport(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "connection closed by server",
                )));
            }
        }
    }

    fn grow(&mut self) -> Result<()> {
        if self.buf.capacity() - self.buf.len() >= 4096 {
            return Ok(());
        }
        let new_cap = (self.buf.capacity() * 2).max(DEFAULT_BUF_CAPACITY);
        if new_cap > self.max_buf_size {
            if self.buf.capacity() >= self.max_buf_size {
                return Err(Error::Protocol(format!(
                    "RESP message too large: buffer would exceed {} bytes",
                    self.max_buf_size
                )));
            }
            self.buf.reserve(self.max_buf_size - self.buf.capacity());
        } else {
            self.buf.reserve(new_cap - self.buf.capacity());
        }
        Ok(())
    }

    /// Send one command and read its reply.
    pub async fn execute<T: AsRef<[u8]>>(&mut self, tokens: &[T]) -> Result<RawReply> {
        self.out.clear();
        write_command(&mut self.out, tokens);
        let frame = self.out.split().freeze();
        self.send_raw(&frame).await?;
        self.read_reply().await
    }

    /// Write every command in one go, then read the replies in order.
    pub async fn execute_batch(&mut self, batch: &[CommandArgs]) -> Result<Vec<RawReply>> {
        self.out.clear();
        for args in batch {
            write_command(&mut self.out, args.tokens());
        }
        let frame: Bytes = self.out.split().freeze();
        self.send_raw(&frame).await?;

        let mut replies = Vec::with_capacity(batch.len());
        for _ in batch {
            replies.push(self.read_reply().await?);
        }
        Ok(replies)
    }

    /// `AUTH [username] password`.
    pub async fn auth(&mut self, username: Option<&str>, password: &str) -> Result<()> {
        let reply = match username {
            Some(user) => self.execute(&["AUTH", user, password]).await?,
            None => self.execute(&["AUTH", password]).await?,
        };
        expect_ok("AUTH", reply)
    }

    /// `SELECT db`; skipped for the default database.
    pub async fn select_db(&mut self, db: u16) -> Result<()> {
        if db == 0 {
            return Ok(());
        }
        let db = itoa::Buffer::new().format(db).to_owned();
        let reply = self.execute(&["SELECT", db.as_str()]).await?;
        expect_ok("SELECT", reply)
    }

    /// Handshake: credentials first, then database selection.
    pub async fn init(&mut self, username: Option<&str>, password: Option<&str>, db: u16) -> Result<()> {
        if let Some(pass) = password {
            self.auth(username, pass).await?;
        }
        self.select_db(db).await
    }
}

fn expect_ok(command: &str, reply: RawReply) -> Result<()> {
    match reply {
        RawReply::SimpleString(ref s) if s == "OK" => Ok(()),
        RawReply::Error(msg) => Err(Error::server(msg)),
        other => Err(Error::Protocol(format!(
            "unexpected {command} response: {}",
            other.type_name()
        ))),
    }
}

/// Handshake parameters for [`TcpTransport`].
#[derive(Debug, Clone, Default)]
pub struct TcpSettings {
    pub username: Option<String>,
    pub password: Option<String>,
    pub db: u16,
    /// Credentials for sentinel nodes, which may differ from the data nodes'.
    pub sentinel_username: Option<String>,
    pub sentinel_password: Option<String>,
    pub tls: bool,
    pub max_buffer_size: usize,
}

/// [`Transport`] over plain TCP.
#[derive(Debug, Clone)]
pub struct TcpTransport {
    settings: TcpSettings,
}

impl TcpTransport {
    pub fn new(settings: TcpSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &TcpSettings {
        &self.settings
    }
}

/// Nothing of the caller's command was written during the handshake.
fn handshake_failure(e: Error) -> Error {
    match e {
        Error::Transport(io) => Error::Connection(io),
        other => other,
    }
}

impl Transport for TcpTransport {
    type Connection = RedisConnection;

    async fn connect(&self, addr: &str, role: NodeRole) -> Result<RedisConnection> {
        if self.settings.tls {
            return Err(Error::Protocol(
                "TLS connections (rediss://) are not supported; use redis://".into(),
            ));
        }
        let s = &self.settings;
        let mut conn = RedisConnection::connect(addr, s.max_buffer_size).await?;
        let init = match role {
            NodeRole::Data => conn.init(s.username.as_deref(), s.password.as_deref(), s.db).await,
            NodeRole::Sentinel => {
                conn.init(s.sentinel_username.as_deref(), s.sentinel_password.as_deref(), 0)
                    .await
            }
        };
        init.map_err(handshake_failure)?;
        debug!(addr, ?role, "connection ready");
        Ok(conn)
    }

    async fn send(&self, conn: &mut RedisConnection, args: &CommandArgs) -> Result<RawReply> {
        conn.execute(args.tokens()).await
    }

    async fn send_batch(&self, conn: &mut RedisConnection, batch: &[CommandArgs]) -> Result<Vec<RawReply>> {
        conn.execute_batch(batch).await
    }
}

// ── Tests ──────────────────────────────────────────────────────────
