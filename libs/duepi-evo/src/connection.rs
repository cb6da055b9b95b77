//! TCP link to the stove relay
//!
//! One socket per client. Opening a link performs the `master:{code}#`
//! handshake and waits out the settle delay; the device never acknowledges it.

use std::io;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, warn};

use crate::codec::hex_dump;
use crate::constants::{
    COMMAND_DELAY, DEFAULT_HOST, DEFAULT_PORT, HANDSHAKE_DELAY, RESPONSE_LEN, SOCKET_TIMEOUT,
};
use crate::error::{DuepiError, Result};

/// Connection parameters and protocol timings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionParams {
    pub host: String,
    pub port: u16,
    pub device_code: String,
    pub connect_timeout: Duration,
    pub io_timeout: Duration,
    pub handshake_delay: Duration,
    pub command_delay: Duration,
}

impl ConnectionParams {
    pub fn new(host: impl Into<String>, port: u16, device_code: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            device_code: device_code.into(),
            connect_timeout: SOCKET_TIMEOUT,
            io_timeout: SOCKET_TIMEOUT,
            handshake_delay: HANDSHAKE_DELAY,
            command_delay: COMMAND_DELAY,
        }
    }

    /// Default relay host and port
    pub fn for_device(device_code: impl Into<String>) -> Self {
        Self::new(DEFAULT_HOST, DEFAULT_PORT, device_code)
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn handshake(&self) -> String {
        format!("master:{}#", self.device_code)
    }
}

/// An open, handshaken socket
#[derive(Debug)]
pub struct DuepiConnection {
    stream: TcpStream,
    io_timeout: Duration,
}

impl DuepiConnection {
    /// Connect, send the handshake and wait the settle delay
    pub async fn open(params: &ConnectionParams) -> Result<Self> {
        let addr = params.address();
        debug!("TCP connecting: {}", addr);

        let stream = match timeout(
            params.connect_timeout,
            TcpStream::connect((params.host.as_str(), params.port)),
        )
        .await
        {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                error!("TCP err: {} - {}", addr, e);
                return Err(DuepiError::connection(&params.host, params.port, e));
            },
            Err(_) => {
                warn!("TCP timeout: {}", addr);
                return Err(DuepiError::connection(
                    &params.host,
                    params.port,
                    format!("connect timed out after {:?}", params.connect_timeout),
                ));
            },
        };

        if let Err(e) = stream.set_nodelay(true) {
            debug!("TCP_NODELAY: {}", e);
        }

        let mut conn = Self {
            stream,
            io_timeout: params.io_timeout,
        };

        let handshake = params.handshake();
        if let Err(e) = conn.write(handshake.as_bytes()).await {
            error!("Handshake err: {} - {}", addr, e);
            conn.close().await;
            return Err(DuepiError::connection(
                &params.host,
                params.port,
                format!("handshake failed: {e}"),
            ));
        }
        debug!("Handshake sent: {}", handshake);

        sleep(params.handshake_delay).await;
        info!("Stove connected: {}", addr);
        Ok(conn)
    }

    async fn write(&mut self, data: &[u8]) -> io::Result<()> {
        match timeout(self.io_timeout, self.stream.write_all(data)).await {
            Ok(result) => result,
            Err(_) => Err(io::Error::new(io::ErrorKind::TimedOut, "write timed out")),
        }
    }

    /// Write one request frame and read the fixed-length response
    pub async fn exchange(&mut self, frame: &[u8]) -> io::Result<[u8; RESPONSE_LEN]> {
        self.write(frame).await?;
        debug!("TX: [{}]", hex_dump(frame));

        let mut response = [0u8; RESPONSE_LEN];
        match timeout(self.io_timeout, self.stream.read_exact(&mut response)).await {
            Ok(Ok(_)) => {
                debug!("RX: [{}]", hex_dump(&response));
                Ok(response)
            },
            Ok(Err(e)) => Err(e),
            Err(_) => Err(io::Error::new(
                io::ErrorKind::TimedOut,
                format!("no response within {:?}", self.io_timeout),
            )),
        }
    }

    /// Close the socket, ignoring shutdown errors
    pub async fn close(mut self) {
        if let Err(e) = self.stream.shutdown().await {
            debug!("TCP shutdown: {}", e);
        }
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    fn fast_params(port: u16) -> ConnectionParams {
        ConnectionParams {
            connect_timeout: Duration::from_millis(500),
            io_timeout: Duration::from_millis(200),
            handshake_delay: Duration::from_millis(1),
            command_delay: Duration::from_millis(1),
            ..ConnectionParams::new("127.0.0.1", port, "ABC123")
        }
    }

    // ========================================================================
    // Parameter Tests
    // ========================================================================

    #[test]
    fn test_default_params() {
        let params = ConnectionParams::for_device("ABC123");
        assert_eq!(params.address(), "duepiwebserver2.com:3000");
        assert_eq!(params.handshake(), "master:ABC123#");
        assert_eq!(params.connect_timeout, Duration::from_secs(5));
        assert_eq!(params.io_timeout, Duration::from_secs(5));
        assert_eq!(params.handshake_delay, Duration::from_millis(500));
        assert_eq!(params.command_delay, Duration::from_millis(200));
    }

    // ========================================================================
    // Connection Tests
    // ========================================================================

    #[tokio::test]
    async fn test_open_sends_handshake() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 14];
            socket.read_exact(&mut buf).await.unwrap();
            buf
        });

        let conn = DuepiConnection::open(&fast_params(port)).await.unwrap();
        assert_eq!(&server.await.unwrap(), b"master:ABC123#");
        conn.close().await;
    }

    #[tokio::test]
    async fn test_open_refused_is_connection_error() {
        // Bind then drop to get a port with nothing listening
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };

        let err = DuepiConnection::open(&fast_params(port)).await.unwrap_err();
        assert!(matches!(
            err,
            DuepiError::Connection { ref host, port: p, .. } if host == "127.0.0.1" && p == port
        ));
    }

    #[tokio::test]
    async fn test_exchange_reads_exactly_ten_bytes() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut handshake = [0u8; 14];
            socket.read_exact(&mut handshake).await.unwrap();
            let mut frame = [0u8; 10];
            socket.read_exact(&mut frame).await.unwrap();
            // Extra trailing bytes stay in the socket
            socket.write_all(b"R02000000&EXTRA").await.unwrap();
            sleep(Duration::from_millis(200)).await;
        });

        let mut conn = DuepiConnection::open(&fast_params(port)).await.unwrap();
        let response = conn.exchange(b"\x1bRD90005F&").await.unwrap();
        assert_eq!(&response, b"R02000000&");
    }

    #[tokio::test]
    async fn test_exchange_times_out_on_silent_peer() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            sleep(Duration::from_secs(2)).await;
        });

        let mut conn = DuepiConnection::open(&fast_params(port)).await.unwrap();
        let err = conn.exchange(b"\x1bRD90005F&").await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
    }

    #[tokio::test]
    async fn test_exchange_short_response_is_eof() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 24];
            socket.read_exact(&mut buf).await.unwrap();
            socket.write_all(b"R0200").await.unwrap();
            // Dropping the socket closes it mid-response
        });

        let mut conn = DuepiConnection::open(&fast_params(port)).await.unwrap();
        let err = conn.exchange(b"\x1bRD90005F&").await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }
}
