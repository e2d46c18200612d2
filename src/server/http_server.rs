use std::io::{self, Read};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::request::Request;
use super::response::Response;
use crate::dispatcher::Dispatcher;

/// Blocking HTTP front end for a [`Dispatcher`].
///
/// A fixed pool of worker threads pulls requests from one `tiny_http`
/// listener; each request is dispatched on the worker that received it.
pub struct HttpServer {
    dispatcher: Arc<Dispatcher>,
    workers: usize,
}

/// Handle to a running HTTP server
pub struct ServerHandle {
    addr: SocketAddr,
    server: Arc<tiny_http::Server>,
    shutdown: Arc<AtomicBool>,
    workers: Vec<JoinHandle<()>>,
}

impl ServerHandle {
    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Wait for the server to be ready to accept connections
    ///
    /// # Errors
    ///
    /// Returns `TimedOut` if the server doesn't accept a connection within ~250ms.
    pub fn wait_ready(&self) -> io::Result<()> {
        for _ in 0..50 {
            if TcpStream::connect(self.addr).is_ok() {
                return Ok(());
            }
            thread::sleep(Duration::from_millis(5));
        }
        Err(io::Error::new(io::ErrorKind::TimedOut, "server not ready"))
    }

    /// Stop accepting requests and wait for every worker to finish.
    pub fn stop(self) {
        self.shutdown.store(true, Ordering::SeqCst);
        for _ in &self.workers {
            self.server.unblock();
        }
        for worker in self.workers {
            if worker.join().is_err() {
                error!("HTTP worker panicked during shutdown");
            }
        }
        info!(addr = %self.addr, "HTTP server stopped");
    }

    /// Block until every worker exits.
    ///
    /// # Errors
    ///
    /// Returns an error if a worker thread panicked.
    pub fn join(self) -> thread::Result<()> {
        for worker in self.workers {
            worker.join()?;
        }
        Ok(())
    }
}

impl HttpServer {
    #[must_use]
    pub fn new(dispatcher: Arc<Dispatcher>, workers: usize) -> Self {
        Self {
            dispatcher,
            workers: workers.max(1),
        }
    }

    /// Start the HTTP server on the given address
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid or cannot be bound.
    pub fn start<A: ToSocketAddrs>(self, addr: A) -> io::Result<ServerHandle> {
        let addr = addr
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "invalid address"))?;
        let server = tiny_http::Server::http(addr)
            .map_err(|e| io::Error::new(io::ErrorKind::AddrNotAvailable, e.to_string()))?;
        let addr = server.server_addr().to_ip().unwrap_or(addr);
        let server = Arc::new(server);
        let shutdown = Arc::new(AtomicBool::new(false));

        let mut workers = Vec::with_capacity(self.workers);
        for idx in 0..self.workers {
            let server = Arc::clone(&server);
            let shutdown = Arc::clone(&shutdown);
            let dispatcher = Arc::clone(&self.dispatcher);
            let worker = thread::Builder::new()
                .name(format!("tagroute-http-{idx}"))
                .spawn(move || worker_loop(&server, &dispatcher, &shutdown))?;
            workers.push(worker);
        }
        info!(addr = %addr, workers = self.workers, "HTTP server listening");

        Ok(ServerHandle {
            addr,
            server,
            shutdown,
            workers,
        })
    }
}

/// Start a server and block until it exits.
///
/// # Errors
///
/// Binding failures, or a worker panic.
pub fn serve<A: ToSocketAddrs>(
    addr: A,
    dispatcher: Arc<Dispatcher>,
    workers: usize,
) -> io::Result<()> {
    let handle = HttpServer::new(dispatcher, workers).start(addr)?;
    handle
        .join()
        .map_err(|_| io::Error::other("HTTP worker panicked"))
}

fn worker_loop(server: &tiny_http::Server, dispatcher: &Dispatcher, shutdown: &AtomicBool) {
    loop {
        let mut incoming = match server.recv() {
            Ok(request) => request,
            Err(e) => {
                if shutdown.load(Ordering::SeqCst) {
                    break;
                }
                warn!(error = %e, "Failed to receive request");
                continue;
            }
        };
        let request = match read_request(&mut incoming) {
            Ok(request) => request,
            Err(e) => {
                warn!(error = %e, "Failed to read request body");
                continue;
            }
        };
        match dispatcher.dispatch(&request) {
            Ok(response) => {
                if let Err(e) = incoming.respond(into_tiny(response)) {
                    debug!(error = %e, "Client went away before the response was written");
                }
            }
            Err(fatal) => {
                error!(error = %fatal, "Dropping connection after fatal error");
                drop(incoming);
            }
        }
    }
}

fn read_request(incoming: &mut tiny_http::Request) -> io::Result<Request> {
    let mut request = Request::new(incoming.method().as_str(), incoming.url());
    for header in incoming.headers() {
        request = request.header(header.field.as_str().as_str(), header.value.as_str());
    }
    let mut body = Vec::new();
    incoming.as_reader().read_to_end(&mut body)?;
    Ok(request.body(body))
}

fn into_tiny(response: Response) -> tiny_http::Response<io::Cursor<Vec<u8>>> {
    let Response {
        status,
        headers,
        body,
    } = response;
    let mut out = Vec::with_capacity(headers.len());
    for (name, value) in &headers {
        if name.eq_ignore_ascii_case("content-length") {
            continue;
        }
        match tiny_http::Header::from_bytes(name.as_bytes(), value.as_bytes()) {
            Ok(header) => out.push(header),
            Err(()) => warn!(header = %name, "Skipping invalid response header"),
        }
    }
    let body = body.into_bytes();
    let len = body.len();
    tiny_http::Response::new(
        tiny_http::StatusCode(status.as_u16()),
        out,
        io::Cursor::new(body),
        Some(len),
        None,
    )
}
