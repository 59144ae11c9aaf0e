#![allow(dead_code)]
use hyper::{Body, Method, Request};
use stubhttp_core::{
    dispatch::Dispatcher,
    response::Response,
    server::{Server, ServerConfig},
    store::GuessMime,
    testing::MemoryStore,
};

struct Client {
    server: Server<Dispatcher<MemoryStore, GuessMime>>,
}

impl Client {
    fn new(store: MemoryStore) -> Self {
        Self {
            server: Server::new(&ServerConfig::default(), Dispatcher::new(store, GuessMime)),
        }
    }

    fn send(&self, request: Request<Body>) -> anyhow::Result<Response> {
        self.server.fire(request)
    }
}

pub struct TestCaseBuilder {
    name: Option<String>,
    store: MemoryStore,

    /// Url of a request.
    url: String,
    method: Method,

    body: Option<String>,
    headers: Vec<(String, String)>,

    status: Option<u16>,
    result: Option<Vec<u8>>,
    expected_headers: Vec<(String, Option<String>)>,
}

impl TestCaseBuilder {
    pub fn new<T>(url: T, method: Method) -> Self
    where
        T: ToString,
    {
        Self {
            name: None,
            store: MemoryStore::default(),
            url: url.to_string(),
            method,
            body: None,
            headers: Vec::new(),
            status: None,
            result: None,
            expected_headers: Vec::new(),
        }
    }

    pub fn name<T: ToString>(mut self, name: T) -> Self {
        self.name = Some(name.to_string());
        self
    }

    /// Makes a file available to the default fetch.
    pub fn file(mut self, path: &str, content: &str) -> Self {
        self.store = self.store.file(path, content.to_string());
        self
    }

    pub fn body<T: ToString>(mut self, body: T) -> Self {
        self.body = Some(body.to_string());
        self
    }

    pub fn header<K, L>(mut self, key: K, value: L) -> Self
    where
        K: ToString,
        L: ToString,
    {
        self.headers.push((key.to_string(), value.to_string()));
        self
    }

    pub fn status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn result(mut self, result: &str) -> Self {
        self.result = Some(result.as_bytes().to_vec());
        self
    }

    pub fn expect_header<K: ToString, L: ToString>(mut self, key: K, value: L) -> Self {
        self.expected_headers
            .push((key.to_string(), Some(value.to_string())));
        self
    }

    pub fn expect_no_header<K: ToString>(mut self, key: K) -> Self {
        self.expected_headers.push((key.to_string(), None));
        self
    }

    pub fn run(self) -> anyhow::Result<Response> {
        let name = self.name.unwrap_or_else(|| self.url.clone());

        let mut builder = Request::builder().uri(self.url).method(self.method);
        for (key, value) in self.headers {
            builder = builder.header(key, value);
        }
        let req = builder.body(self.body.map(Body::from).unwrap_or_default())?;

        let res = Client::new(self.store).send(req)?;

        if let Some(status) = self.status {
            assert_eq!(res.status, status, "test case {}: status", name);
        }

        if let Some(result) = self.result {
            assert_eq!(
                res.body.to_vec(),
                result,
                "test case {}, left: {}, right: {}",
                name,
                String::from_utf8_lossy(&res.body),
                String::from_utf8_lossy(&result)
            );
        }

        for (key, value) in self.expected_headers {
            assert_eq!(
                res.header(&key),
                value.as_deref(),
                "test case {}: header {}",
                name,
                key
            );
        }

        Ok(res)
    }
}
