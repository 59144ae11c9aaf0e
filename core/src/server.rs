use crate::{handler::Service, middleware::Middleware, response::Response};
use anyhow::{bail, Context};
use hyper::{Body, Method, Request};
use log::{debug, error, info};
use std::{
    fmt::Display,
    io::{self, Read, Write},
    net::{SocketAddr, TcpListener, TcpStream},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::{Duration, Instant},
};

/// How long the accept loop sleeps when no connection is pending.
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(25);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,

    /// The server stops itself when no connection arrives for this long.
    pub idle_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 80,
            idle_timeout: Duration::from_secs(120),
        }
    }
}

/// Cloneable flag used to stop a running server from another thread.
#[derive(Debug, Clone, Default)]
pub struct Shutdown(Arc<AtomicBool>);

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Why `Listening::serve` returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stopped {
    /// The shutdown flag was triggered.
    Interrupted,

    /// No connection arrived within the idle timeout.
    IdleTimeout,
}

pub struct Server<V> {
    host: String,
    port: u16,
    idle_timeout: Duration,

    service: V,

    /// Registered middlewares that will be run during request handling.
    middlewares: Vec<Box<dyn Middleware>>,
}

impl<V> Server<V>
where
    V: Service<Request<Body>, Response = anyhow::Result<Response>> + Send + Sync + 'static,
{
    pub fn new(config: &ServerConfig, service: V) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            idle_timeout: config.idle_timeout,
            service,
            middlewares: Vec::new(),
        }
    }

    /// Registers new middleware.
    pub fn middleware<M>(mut self, m: M) -> Self
    where
        M: Middleware + 'static,
    {
        self.middlewares.push(Box::new(m));
        self
    }

    /// Binds the listening socket. Port 0 picks a free port, see
    /// `Listening::local_addr`.
    pub fn bind(self) -> anyhow::Result<Listening<V>> {
        let listener = TcpListener::bind((self.host.as_str(), self.port))
            .with_context(|| format!("could not bind {}:{}", self.host, self.port))?;
        listener.set_nonblocking(true)?;

        info!("listening on {}", listener.local_addr()?);

        Ok(Listening {
            listener,
            server: Arc::new(self),
        })
    }

    /// Method that runs whole server's logic for one request, middlewares
    /// included. Used directly by tests that don't need a socket.
    pub fn fire(&self, mut request: Request<Body>) -> anyhow::Result<Response> {
        for m in &self.middlewares {
            m.on_request(&mut request)?;
        }

        let mut response = self.service.call(request)?;

        for m in &self.middlewares {
            m.on_response(&mut response)?;
        }

        Ok(response)
    }

    /// Reads one request from the stream and writes one response back.
    fn handle(&self, mut stream: TcpStream) -> anyhow::Result<()> {
        stream.set_nonblocking(false)?;
        stream.set_read_timeout(Some(self.idle_timeout))?;

        let response = match read_request(&mut stream) {
            Ok(Some(request)) => self.fire(request).unwrap_or_else(|e| {
                error!("could not answer request: {:#}", e);
                Response::plain(500, e.to_string())
            }),
            Ok(None) => {
                debug!("connection closed without a request");
                return Ok(());
            }
            Err(e) if e.is::<UnsupportedMethod>() => Response::plain(501, e.to_string()),
            Err(e) if e.is::<io::Error>() => return Err(e),
            Err(e) => Response::plain(400, e.to_string()),
        };

        let response_bytes: Vec<u8> = response.into();
        stream.write_all(&response_bytes)?;
        stream.flush()?;

        Ok(())
    }
}

/// A bound server waiting to be served.
pub struct Listening<V> {
    listener: TcpListener,
    server: Arc<Server<V>>,
}

impl<V> Listening<V>
where
    V: Service<Request<Body>, Response = anyhow::Result<Response>> + Send + Sync + 'static,
{
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts connections until `shutdown` is triggered or the server has
    /// been idle for the configured timeout. Each connection is handled on its
    /// own thread. The listening socket is closed on return.
    pub fn serve(self, shutdown: &Shutdown) -> anyhow::Result<Stopped> {
        let mut last_connection = Instant::now();

        loop {
            if shutdown.is_triggered() {
                info!("shutdown requested");
                return Ok(Stopped::Interrupted);
            }

            match self.listener.accept() {
                Ok((stream, peer)) => {
                    debug!("accepted connection from {}", peer);
                    last_connection = Instant::now();

                    let s = self.server.clone();
                    thread::spawn(move || {
                        if let Err(e) = s.handle(stream) {
                            error!("got error during handling connection: {:#}", e);
                        }
                    });
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    if last_connection.elapsed() >= self.server.idle_timeout {
                        info!(
                            "no connection for {:?}, stopping",
                            self.server.idle_timeout
                        );
                        return Ok(Stopped::IdleTimeout);
                    }
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e).context("could not accept connection"),
            }
        }
    }
}

/// Request line carried a method the responder doesn't simulate.
#[derive(Debug)]
pub struct UnsupportedMethod(pub String);

impl Display for UnsupportedMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unsupported method: {}", self.0)
    }
}

impl std::error::Error for UnsupportedMethod {}

const MESSAGE_SIZE: usize = 1024;
const MAX_HEADERS: usize = 64;
const MAX_HEAD_SIZE: usize = 64 * 1024;
const MAX_BODY_SIZE: usize = 16 * 1024 * 1024;

/// Reads a single request: the head up to the blank line, then exactly
/// `Content-Length` bytes of body. `None` means the peer closed the
/// connection before sending anything.
pub fn read_request<R: Read>(stream: &mut R) -> anyhow::Result<Option<Request<Body>>> {
    // Store all the bytes for our received request
    let mut received: Vec<u8> = vec![];

    // Array with a fixed size
    let mut rx_bytes = [0u8; MESSAGE_SIZE];
    let head_len = loop {
        let bytes_read = stream.read(&mut rx_bytes)?;
        if bytes_read == 0 {
            if received.is_empty() {
                return Ok(None);
            }
            bail!("connection closed in the middle of request head");
        }
        received.extend_from_slice(&rx_bytes[..bytes_read]);

        if let Some(len) = head_length(&received)? {
            break len;
        }
        if received.len() > MAX_HEAD_SIZE {
            bail!("request head larger than {} bytes", MAX_HEAD_SIZE);
        }
    };

    let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
    let mut req = httparse::Request::new(&mut headers);
    req.parse(&received[..head_len])?;

    let content_length = content_length(&req)?;
    if content_length > MAX_BODY_SIZE {
        bail!("request body larger than {} bytes", MAX_BODY_SIZE);
    }

    let mut body = received[head_len..].to_vec();
    body.truncate(content_length);
    if body.len() < content_length {
        let already = body.len();
        body.resize(content_length, 0);
        stream.read_exact(&mut body[already..])?;
    }

    httparse_req_to_hyper_request(req, body).map(Some)
}

/// Length of the request head once it is complete.
fn head_length(received: &[u8]) -> anyhow::Result<Option<usize>> {
    let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
    let mut req = httparse::Request::new(&mut headers);

    Ok(match req.parse(received)? {
        httparse::Status::Complete(len) => Some(len),
        httparse::Status::Partial => None,
    })
}

/// Declared body length, zero when the header is missing.
fn content_length(req: &httparse::Request) -> anyhow::Result<usize> {
    match req
        .headers
        .iter()
        .find(|h| h.name.eq_ignore_ascii_case("content-length"))
    {
        Some(header) => Ok(std::str::from_utf8(header.value)?
            .trim()
            .parse()
            .context("invalid content-length")?),
        None => Ok(0),
    }
}

fn httparse_req_to_hyper_request(
    req: httparse::Request,
    body: Vec<u8>,
) -> anyhow::Result<Request<Body>> {
    let method = req.method.context("request has no method")?;
    let method = match method {
        "GET" => Method::GET,
        "POST" => Method::POST,
        "PUT" => Method::PUT,
        "DELETE" => Method::DELETE,
        other => return Err(UnsupportedMethod(other.to_string()).into()),
    };

    let mut builder = Request::builder()
        .method(method)
        .uri(req.path.context("request has no path")?);

    for header in req.headers.iter() {
        builder = builder.header(header.name, header.value);
    }

    Ok(builder.body(Body::from(body))?)
}
