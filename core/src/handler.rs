use crate::response::Response;
use hyper::{Body, Request};

/// Something that turns a request into a response. The server is generic over
/// it so tests can fire requests without a socket.
pub trait Service<R> {
    type Response;

    /// Calls service's logic.
    fn call(&self, req: R) -> Self::Response;
}

/// Blanket implementation for plain functions and closures.
///
/// ```rust
/// use hyper::{Body, Request};
/// use stubhttp_core::{handler::Service, response::Response};
///
/// let teapot = |_: Request<Body>| -> anyhow::Result<Response> { Ok(Response::plain(418, "")) };
/// let response = Service::call(&teapot, Request::new(Body::empty())).unwrap();
/// assert_eq!(response.status, 418);
/// ```
impl<F> Service<Request<Body>> for F
where
    F: Fn(Request<Body>) -> anyhow::Result<Response>,
{
    type Response = anyhow::Result<Response>;

    fn call(&self, req: Request<Body>) -> Self::Response {
        self(req)
    }
}
