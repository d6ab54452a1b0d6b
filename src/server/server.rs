use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::Request;
use hyper_util::rt::TokioIo;
use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

use crate::config::settings::ServerConfig;

use super::http_handler::HttpHandler;

/// Plain HTTP/1.1 listener serving the inspection handler on every route.
pub struct InspectionServer {
    config: ServerConfig,
    handler: Arc<HttpHandler>,
}

impl InspectionServer {
    pub fn new(config: ServerConfig, handler: Arc<HttpHandler>) -> Self {
        Self { config, handler }
    }

    /// Bind the configured address. Failure here is fatal to the process.
    pub fn bind(&self) -> Result<TcpListener> {
        let listener = bind_tcp_listener(&self.config.bind)
            .with_context(|| format!("Failed to bind {}", self.config.bind))?;
        let listener = TcpListener::from_std(listener)?;
        info!(addr = %self.config.bind, "HTTP listener started");
        Ok(listener)
    }

    /// Accept loop; one task per connection.
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        loop {
            let (stream, peer_addr) = match listener.accept().await {
                Ok(conn) => conn,
                Err(err) => {
                    warn!("Failed to accept TCP connection: {}", err);
                    continue;
                }
            };

            let handler = Arc::clone(&self.handler);
            let keepalive = self.config.keepalive;
            tokio::spawn(async move {
                handle_connection(stream, peer_addr, handler, keepalive).await;
            });
        }
    }
}

fn bind_tcp_listener(addr: &str) -> Result<std::net::TcpListener> {
    let sock_addr: SocketAddr = addr.parse()?;

    let domain = if sock_addr.is_ipv6() {
        Domain::IPV6
    } else {
        Domain::IPV4
    };

    let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&sock_addr.into())?;
    socket.listen(1024)?;

    Ok(socket.into())
}

async fn handle_connection(stream: TcpStream, peer_addr: SocketAddr, handler: Arc<HttpHandler>, keepalive: bool) {
    let io = TokioIo::new(stream);

    let service = service_fn(move |req: Request<Incoming>| {
        let h = Arc::clone(&handler);
        async move { Ok::<_, hyper::Error>(h.handle(&req, peer_addr)) }
    });

    let conn = http1::Builder::new()
        .keep_alive(keepalive)
        .serve_connection(io, service);

    if let Err(err) = conn.await {
        debug!(
            client_ip = %peer_addr.ip(),
            error = %err,
            "HTTP connection error"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::defaults;
    use crate::inspection::client_chain::ClientChainResolver;
    use crate::inspection::executor::NoopExecutor;
    use crate::inspection::responder::InspectionResponder;
    use crate::inspection::validator::{DirectiveValidator, ValidatorTable};
    use crate::models::host::HostIdentity;
    use crate::storage::resource_registry::ResourceRegistry;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[test]
    fn test_bind_rejects_bad_address() {
        assert!(bind_tcp_listener("not-an-address").is_err());
    }

    #[tokio::test]
    async fn test_serves_report_over_tcp() {
        let responder = InspectionResponder::new(
            Arc::new(HostIdentity::new("web-01", "127.0.0.1", None)),
            Arc::new(ResourceRegistry::new()),
            ClientChainResolver::default(),
            DirectiveValidator::new(ValidatorTable::new().unwrap()),
            Arc::new(NoopExecutor),
        );
        let mut config = defaults::default_server_config();
        config.bind = "127.0.0.1:0".to_string();
        let server = Arc::new(InspectionServer::new(
            config,
            Arc::new(HttpHandler::new(Arc::new(responder), None)),
        ));

        let listener = server.bind().unwrap();
        let addr = listener.local_addr().unwrap();
        let serving = Arc::clone(&server);
        let task = tokio::spawn(async move { serving.serve(listener).await });

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(
                b"GET /check?status=503&sleep=10-20 HTTP/1.1\r\n\
                  Host: localhost:9000\r\n\
                  X-Forwarded-For: 10.0.0.1, 10.0.0.2\r\n\
                  Connection: close\r\n\r\n",
            )
            .await
            .unwrap();
        let mut raw = String::new();
        stream.read_to_string(&mut raw).await.unwrap();

        assert!(raw.starts_with("HTTP/1.1 200 OK"));
        let body = raw.split_once("\r\n\r\n").unwrap().1;
        let value: serde_json::Value = serde_json::from_str(body.trim()).unwrap();
        assert_eq!(value["request"]["clientip"], "10.0.0.1");
        assert_eq!(value["request"]["proxy1ip"], "10.0.0.2");
        assert_eq!(value["request"]["targetip"], "localhost");
        assert_eq!(value["direction"]["process"]["status"], "503");
        assert_eq!(value["direction"]["process"]["sleep"], "10-20");

        task.abort();
    }
}
