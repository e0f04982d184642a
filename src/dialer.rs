// SPDX-License-Identifier: MIT
// Proxy-aware, TLS-capable TCP dialer used by every protocol handler.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use rustls::ClientConfig;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::{client::TlsStream, TlsConnector};
use tokio_socks::tcp::Socks5Stream;

use crate::error::ScanError;
use crate::tls;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Carries the one piece of per-process configuration every handler needs to
/// reach a target: an optional upstream SOCKS5 proxy and a shared TLS config.
#[derive(Clone)]
pub struct Dialer {
    proxy: Option<SocketAddr>,
    tls_config: Arc<ClientConfig>,
}

impl Dialer {
    pub fn new(proxy: Option<SocketAddr>) -> Self {
        Self {
            proxy,
            tls_config: tls::insecure_client_config(),
        }
    }

    /// Opens a plaintext TCP stream to `addr`, through the proxy if configured.
    pub async fn dial(&self, addr: SocketAddr) -> Result<TcpStream, ScanError> {
        self.dial_context(addr, CONNECT_TIMEOUT).await
    }

    pub async fn dial_context(
        &self,
        addr: SocketAddr,
        connect_timeout: Duration,
    ) -> Result<TcpStream, ScanError> {
        let connect = async {
            match self.proxy {
                Some(proxy) => Socks5Stream::connect(proxy, addr)
                    .await
                    .map(Socks5Stream::into_inner)
                    .map_err(|e| ScanError::Transport(std::io::Error::new(std::io::ErrorKind::Other, e))),
                None => TcpStream::connect(addr).await.map_err(ScanError::from),
            }
        };
        timeout(connect_timeout, connect)
            .await
            .map_err(|_| ScanError::Timeout(connect_timeout))?
    }

    /// Dials `addr` and, if `use_tls` is set, immediately wraps the stream in
    /// a TLS client session using `sni_name` for the handshake.
    pub async fn dial_auto_context(
        &self,
        addr: SocketAddr,
        sni_name: &str,
        use_tls: bool,
        connect_timeout: Duration,
    ) -> Result<EitherStream, ScanError> {
        let tcp = self.dial_context(addr, connect_timeout).await?;
        if !use_tls {
            return Ok(EitherStream::Plain(tcp));
        }
        let name = tls::server_name(sni_name)?;
        let connector = TlsConnector::from(self.tls_config.clone());
        let tls_stream = timeout(connect_timeout, connector.connect(name, tcp))
            .await
            .map_err(|_| ScanError::Timeout(connect_timeout))?
            .map_err(|e| ScanError::tls(e.to_string()))?;
        Ok(EitherStream::Tls(Box::new(tls_stream)))
    }

    /// A `reqwest::Client` sharing this dialer's TLS policy and proxy, used by
    /// the HTTP Basic-auth handler.
    pub fn http_client(&self) -> Result<reqwest::Client, ScanError> {
        let mut builder = reqwest::Client::builder()
            .danger_accept_invalid_certs(true)
            .danger_accept_invalid_hostnames(true)
            .timeout(CONNECT_TIMEOUT)
            .redirect(reqwest::redirect::Policy::none());
        if let Some(proxy) = self.proxy {
            let url = format!("socks5://{proxy}");
            builder = builder.proxy(
                reqwest::Proxy::all(&url).map_err(|e| ScanError::Config(e.to_string()))?,
            );
        }
        builder.build().map_err(|e| ScanError::Config(e.to_string()))
    }
}

/// A plaintext or TLS-wrapped stream, handled uniformly by callers that
/// implement their protocol framing against `AsyncRead + AsyncWrite`.
pub enum EitherStream {
    Plain(TcpStream),
    Tls(Box<TlsStream<TcpStream>>),
}

impl tokio::io::AsyncRead for EitherStream {
    fn poll_read(
        self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
        buf: &mut tokio::io::ReadBuf<'_>,
    ) -> std::task::Poll<std::io::Result<()>> {
        match self.get_mut() {
            EitherStream::Plain(s) => std::pin::Pin::new(s).poll_read(cx, buf),
            EitherStream::Tls(s) => std::pin::Pin::new(s.as_mut()).poll_read(cx, buf),
        }
    }
}

impl tokio::io::AsyncWrite for EitherStream {
    fn poll_write(
        self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
        buf: &[u8],
    ) -> std::task::Poll<std::io::Result<usize>> {
        match self.get_mut() {
            EitherStream::Plain(s) => std::pin::Pin::new(s).poll_write(cx, buf),
            EitherStream::Tls(s) => std::pin::Pin::new(s.as_mut()).poll_write(cx, buf),
        }
    }

    fn poll_flush(
        self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<std::io::Result<()>> {
        match self.get_mut() {
            EitherStream::Plain(s) => std::pin::Pin::new(s).poll_flush(cx),
            EitherStream::Tls(s) => std::pin::Pin::new(s.as_mut()).poll_flush(cx),
        }
    }

    fn poll_shutdown(
        self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<std::io::Result<()>> {
        match self.get_mut() {
            EitherStream::Plain(s) => std::pin::Pin::new(s).poll_shutdown(cx),
            EitherStream::Tls(s) => std::pin::Pin::new(s.as_mut()).poll_shutdown(cx),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dialer_without_proxy_has_no_proxy_addr() {
        let d = Dialer::new(None);
        assert!(d.proxy.is_none());
    }

    #[test]
    fn dialer_with_proxy_retains_addr() {
        let addr: SocketAddr = "127.0.0.1:1080".parse().unwrap();
        let d = Dialer::new(Some(addr));
        assert_eq!(d.proxy, Some(addr));
    }
}
