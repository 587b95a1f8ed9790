use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error};

use crate::data::{RemoteData, RemoteFilter, RemoteSorter};
use crate::envelope::{RpcRequest, RpcResponse, decode_parameter};
use crate::http::{HttpMethod, HttpRequest, WsSession};
use crate::{RegistrationError, RemoteError, ServiceError};

/// Buffered capacity of the per-connection stream channels.
const STREAM_CHANNEL_CAPACITY: usize = 32;

type RouteHandler<T> =
    Arc<dyn Fn(Arc<T>, RpcRequest) -> BoxFuture<'static, RpcResponse> + Send + Sync>;
type StreamHandler<T> = Arc<
    dyn Fn(Arc<T>, mpsc::Receiver<String>, mpsc::Sender<String>) -> BoxFuture<'static, ()>
        + Send
        + Sync,
>;

/// Capability to produce the service instance a request dispatches
/// against.
///
/// The request (or WebSocket session) is passed explicitly; resolvers that
/// need per-request context read it from the argument rather than from any
/// ambient state.
pub trait ServiceResolver<T>: Send + Sync {
    fn resolve(&self, request: &HttpRequest) -> Arc<T>;
    fn resolve_session(&self, session: &WsSession) -> Arc<T>;
}

/// Resolver that always yields the same shared instance.
pub struct FixedResolver<T> {
    service: Arc<T>,
}

impl<T> FixedResolver<T> {
    pub fn new(service: T) -> Self {
        Self {
            service: Arc::new(service),
        }
    }

    pub fn shared(service: Arc<T>) -> Self {
        Self { service }
    }
}

impl<T> core::fmt::Debug for FixedResolver<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FixedResolver")
            .field("service", &core::any::type_name::<T>())
            .finish()
    }
}

impl<T: Send + Sync> ServiceResolver<T> for FixedResolver<T> {
    fn resolve(&self, _request: &HttpRequest) -> Arc<T> {
        self.service.clone()
    }

    fn resolve_session(&self, _session: &WsSession) -> Arc<T> {
        self.service.clone()
    }
}

/// Positional decoding of an envelope's params into a typed argument
/// tuple. Implemented for tuples of arity 0 through 6.
pub trait FromParams: Sized {
    const ARITY: usize;
    fn from_params(params: &[String]) -> Result<Self, RemoteError>;
}

/// A bindable service method: anything callable with the resolved service
/// instance and a decoded argument tuple. Implemented for async closures
/// of arity 0 through 6.
pub trait ServiceHandler<T, Args, R>: Send + Sync + 'static {
    fn invoke(&self, service: Arc<T>, args: Args) -> BoxFuture<'static, Result<R, ServiceError>>;
}

impl FromParams for () {
    const ARITY: usize = 0;

    fn from_params(_params: &[String]) -> Result<Self, RemoteError> {
        Ok(())
    }
}

impl<T, F, Fut, R> ServiceHandler<T, (), R> for F
where
    T: Send + Sync + 'static,
    F: Fn(Arc<T>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, ServiceError>> + Send + 'static,
    R: 'static,
{
    fn invoke(&self, service: Arc<T>, (): ()) -> BoxFuture<'static, Result<R, ServiceError>> {
        Box::pin(self(service))
    }
}

macro_rules! impl_params {
    (@one $ty:ident) => {
        1usize
    };
    ($($name:ident: $ty:ident),+) => {
        impl<$($ty: DeserializeOwned + Send + 'static),+> FromParams for ($($ty,)+) {
            const ARITY: usize = 0usize $(+ impl_params!(@one $ty))+;

            fn from_params(params: &[String]) -> Result<Self, RemoteError> {
                if params.len() != Self::ARITY {
                    return Err(RemoteError::InvalidParameters);
                }
                let mut params = params.iter();
                Ok(($(
                    decode_parameter::<$ty>(
                        params.next().ok_or(RemoteError::InvalidParameters)?,
                    )?,
                )+))
            }
        }

        impl<T, F, Fut, R, $($ty),+> ServiceHandler<T, ($($ty,)+), R> for F
        where
            T: Send + Sync + 'static,
            F: Fn(Arc<T>, $($ty),+) -> Fut + Send + Sync + 'static,
            Fut: Future<Output = Result<R, ServiceError>> + Send + 'static,
            R: 'static,
            $($ty: Send + 'static,)+
        {
            fn invoke(
                &self,
                service: Arc<T>,
                args: ($($ty,)+),
            ) -> BoxFuture<'static, Result<R, ServiceError>> {
                let ($($name,)+) = args;
                Box::pin(self(service, $($name),+))
            }
        }
    };
}

impl_params!(p1: P1);
impl_params!(p1: P1, p2: P2);
impl_params!(p1: P1, p2: P2, p3: P3);
impl_params!(p1: P1, p2: P2, p3: P3, p4: P4);
impl_params!(p1: P1, p2: P2, p3: P3, p4: P4, p5: P5);
impl_params!(p1: P1, p2: P2, p3: P3, p4: P4, p5: P5, p6: P6);

/// Registry mapping one service's typed methods to wire routes.
///
/// Routes live under the fixed `/kv/` prefix and are unique per HTTP
/// method. The table is written only during registration, a
/// single-threaded setup phase, and is read-only afterwards: handlers are
/// shared `Arc` closures and dispatch never locks.
///
/// The manager is transport-agnostic. An HTTP server plugs into
/// [`dispatch`](ServiceManager::dispatch), a WebSocket framer into
/// [`dispatch_ws`](ServiceManager::dispatch_ws); both receive the complete
/// response body (or pipeline future) and only move bytes.
pub struct ServiceManager<T> {
    service_name: String,
    counter: u32,
    routes: HashMap<HttpMethod, HashMap<String, RouteHandler<T>>>,
    ws_routes: HashMap<String, StreamHandler<T>>,
}

impl<T> core::fmt::Debug for ServiceManager<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ServiceManager")
            .field("service_name", &self.service_name)
            .field("routes", &self.routes.values().map(HashMap::len).sum::<usize>())
            .field("ws_routes", &self.ws_routes.len())
            .finish()
    }
}

impl<T: Send + Sync + 'static> Default for ServiceManager<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + Sync + 'static> ServiceManager<T> {
    pub fn new() -> Self {
        let service_name = core::any::type_name::<T>()
            .rsplit("::")
            .next()
            .unwrap_or("Service")
            .to_owned();
        Self {
            service_name,
            counter: 0,
            routes: HashMap::new(),
            ws_routes: HashMap::new(),
        }
    }

    /// The short service type name used in auto-generated route names.
    #[must_use]
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// Registers a service method under `method` and `route`.
    ///
    /// `route` of `None` allocates the next auto-generated name
    /// `route<ServiceName><n>`; the allocator is owned by this manager
    /// instance and seeded at zero. GET routes carry no body, so binding a
    /// parameterized method to GET fails here, at registration, never at
    /// request time.
    ///
    /// Request handling is uniform across arities: parameter count is
    /// validated against the method's arity before anything is decoded
    /// ("Invalid parameters" envelope on mismatch, handler never invoked),
    /// parameters decode positionally, the method runs exactly once, and
    /// the outcome is wrapped in exactly one envelope carrying the request
    /// id. Handler failures are logged unless expected.
    pub fn bind<Args, R, F>(
        &mut self,
        function: F,
        method: HttpMethod,
        route: Option<&str>,
    ) -> Result<(), RegistrationError>
    where
        Args: FromParams + Send + 'static,
        R: Serialize + 'static,
        F: ServiceHandler<T, Args, R>,
    {
        if method == HttpMethod::Get && Args::ARITY > 0 {
            return Err(RegistrationError::GetWithParameters);
        }
        let path = format!("/kv/{}", self.allocate_route(route));
        let routes = self.routes.entry(method).or_default();
        if routes.contains_key(&path) {
            return Err(RegistrationError::DuplicateRoute(path));
        }

        let function = Arc::new(function);
        let handler: RouteHandler<T> = Arc::new(move |service, request: RpcRequest| {
            let function = function.clone();
            Box::pin(async move {
                if request.params.len() != Args::ARITY {
                    return RpcResponse::failure(
                        request.id,
                        RemoteError::InvalidParameters.to_string(),
                        None,
                    );
                }
                let args = match Args::from_params(&request.params) {
                    Ok(args) => args,
                    Err(err) => {
                        debug!(%err, "rejecting request with undecodable parameters");
                        let kind = match err {
                            RemoteError::InvalidParameters => None,
                            RemoteError::Decode { .. } => Some(String::from("DecodeError")),
                        };
                        return RpcResponse::failure(request.id, err.to_string(), kind);
                    }
                };
                match function.invoke(service, args).await {
                    Ok(value) => RpcResponse::encode(request.id, &value),
                    Err(err) => {
                        if !err.is_expected() {
                            error!(error = %err, kind = err.type_name(), "service handler failed");
                        }
                        RpcResponse::failure(
                            request.id,
                            err.wire_message(),
                            Some(err.type_name().to_owned()),
                        )
                    }
                }
            })
        });
        routes.insert(path, handler);
        Ok(())
    }

    /// Registers a tabular query method under the fixed POST convention:
    /// page offset, page size, filter list, sorter list, global search
    /// string, returning one [`RemoteData`] page. Envelope and arity
    /// handling are exactly those of [`bind`](ServiceManager::bind).
    pub fn bind_table<R, F, Fut>(
        &mut self,
        function: F,
        route: Option<&str>,
    ) -> Result<(), RegistrationError>
    where
        R: Serialize + Send + 'static,
        F: Fn(
                Arc<T>,
                Option<usize>,
                Option<usize>,
                Option<Vec<RemoteFilter>>,
                Option<Vec<RemoteSorter>>,
                Option<String>,
            ) -> Fut
            + Send
            + Sync
            + 'static,
        Fut: Future<Output = Result<RemoteData<R>, ServiceError>> + Send + 'static,
    {
        self.bind(function, HttpMethod::Post, route)
    }

    /// Registers a two-channel streaming method.
    ///
    /// Per connection, three pipelines run concurrently until all have
    /// finished:
    /// - the inbound pump parses wire frames as envelopes, decodes the
    ///   single parameter and forwards it into the request channel
    ///   (frames with any other arity, or that fail to parse, are
    ///   skipped);
    /// - the service method consumes the request channel and writes the
    ///   response channel, which closes when the method returns;
    /// - the outbound pump wraps each response in a server-push envelope
    ///   (id 0) and writes it to the wire, then cancels a still-open
    ///   inbound pump once the response channel is closed.
    ///
    /// Closing the inbound wire closes the request channel but leaves the
    /// method and outbound pump running until the method completes, so a
    /// handler can keep pushing after the peer stops sending. No pipeline
    /// blocks forever on a dead peer.
    pub fn bind_stream<P1, P2, F, Fut>(
        &mut self,
        function: F,
        route: Option<&str>,
    ) -> Result<(), RegistrationError>
    where
        P1: DeserializeOwned + Send + 'static,
        P2: Serialize + Send + 'static,
        F: Fn(Arc<T>, mpsc::Receiver<P1>, mpsc::Sender<P2>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let path = format!("/kv/{}", self.allocate_route(route));
        if self.ws_routes.contains_key(&path) {
            return Err(RegistrationError::DuplicateRoute(path));
        }

        let function = Arc::new(function);
        let handler: StreamHandler<T> = Arc::new(move |service, mut incoming, outgoing| {
            let function = function.clone();
            Box::pin(async move {
                let (request_tx, request_rx) = mpsc::channel::<P1>(STREAM_CHANNEL_CAPACITY);
                let (response_tx, mut response_rx) = mpsc::channel::<P2>(STREAM_CHANNEL_CAPACITY);
                let (cancel_tx, mut cancel_rx) = oneshot::channel::<()>();

                let inbound = async move {
                    loop {
                        tokio::select! {
                            frame = incoming.recv() => {
                                let Some(text) = frame else { break };
                                let Ok(request) = serde_json::from_str::<RpcRequest>(&text)
                                else {
                                    debug!("skipping unparseable stream frame");
                                    continue;
                                };
                                if request.params.len() != 1 {
                                    continue;
                                }
                                let Ok(value) = decode_parameter::<P1>(&request.params[0])
                                else {
                                    continue;
                                };
                                if request_tx.send(value).await.is_err() {
                                    break;
                                }
                            }
                            _ = &mut cancel_rx => break,
                        }
                    }
                    // dropping request_tx closes the request channel
                };

                let outbound = async move {
                    while let Some(value) = response_rx.recv().await {
                        let frame = RpcResponse::push(&value).to_body();
                        if outgoing.send(frame).await.is_err() {
                            break;
                        }
                    }
                    // response side finished; release an inbound pump
                    // still waiting on a silent peer
                    let _ = cancel_tx.send(());
                };

                tokio::join!(inbound, outbound, function(service, request_rx, response_tx));
            })
        });
        self.ws_routes.insert(path, handler);
        Ok(())
    }

    /// Looks up the handler for an incoming request and returns a future
    /// producing the complete response body, or `None` when no route
    /// matches.
    ///
    /// Every matched request yields a well-formed envelope: a malformed
    /// body is answered with an error envelope under id 0, never a raw
    /// transport failure.
    pub fn dispatch(
        &self,
        request: HttpRequest,
        resolver: &dyn ServiceResolver<T>,
    ) -> Option<BoxFuture<'static, String>> {
        let handler = self
            .routes
            .get(&request.method)?
            .get(request.path.as_str())?
            .clone();
        let rpc = match envelope_from(&request) {
            Ok(rpc) => rpc,
            Err(response) => return Some(Box::pin(async move { response.to_body() })),
        };
        let service = resolver.resolve(&request);
        Some(Box::pin(async move { handler(service, rpc).await.to_body() }))
    }

    /// Looks up the streaming handler for a WebSocket session and returns
    /// the connection's pipeline future, or `None` when no route matches.
    /// `incoming` carries inbound text frames; `outgoing` receives the
    /// frames to write.
    pub fn dispatch_ws(
        &self,
        session: &WsSession,
        resolver: &dyn ServiceResolver<T>,
        incoming: mpsc::Receiver<String>,
        outgoing: mpsc::Sender<String>,
    ) -> Option<BoxFuture<'static, ()>> {
        let handler = self.ws_routes.get(session.path.as_str())?.clone();
        let service = resolver.resolve_session(session);
        Some(handler(service, incoming, outgoing))
    }

    /// Whether a route is registered for `method` and `path`.
    #[must_use]
    pub fn has_route(&self, method: HttpMethod, path: &str) -> bool {
        self.routes
            .get(&method)
            .is_some_and(|routes| routes.contains_key(path))
    }

    /// All paths registered under `method`, sorted.
    #[must_use]
    pub fn route_paths(&self, method: HttpMethod) -> Vec<&str> {
        let mut paths: Vec<&str> = self
            .routes
            .get(&method)
            .map(|routes| routes.keys().map(String::as_str).collect())
            .unwrap_or_default();
        paths.sort_unstable();
        paths
    }

    /// All registered WebSocket paths, sorted.
    #[must_use]
    pub fn ws_route_paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = self.ws_routes.keys().map(String::as_str).collect();
        paths.sort_unstable();
        paths
    }

    fn allocate_route(&mut self, route: Option<&str>) -> String {
        match route {
            Some(name) => name.to_owned(),
            None => {
                let name = format!("route{}{}", self.service_name, self.counter);
                self.counter += 1;
                name
            }
        }
    }
}

fn envelope_from(request: &HttpRequest) -> Result<RpcRequest, RpcResponse> {
    if request.method == HttpMethod::Get {
        let id = request
            .query_param("id")
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(0);
        return Ok(RpcRequest::new(id, Vec::new()));
    }
    serde_json::from_str(&request.body).map_err(|err| {
        debug!(%err, "rejecting malformed request body");
        RpcResponse::failure(0, err.to_string(), None)
    })
}
