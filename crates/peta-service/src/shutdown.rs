//! Request draining for graceful shutdown.
//!
//! Once shutdown starts, new requests get `503 Service Unavailable` while
//! requests already in flight run to completion. [`ShutdownState::drained`]
//! resolves when the last of them finishes.

use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::task::{Context, Poll, ready};

use http::{Request, Response, StatusCode};
use http_body::Body;
use pin_project::pin_project;
use tokio::sync::Notify;
use tower::{Layer, Service};

#[derive(Default)]
struct Inner {
    draining: AtomicBool,
    in_flight: AtomicUsize,
    idle: Notify,
}

#[derive(Clone, Default)]
pub struct ShutdownState {
    inner: Arc<Inner>,
}

impl ShutdownState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start_shutdown(&self) {
        self.inner.draining.store(true, Ordering::SeqCst);
        if self.in_flight_count() == 0 {
            self.inner.idle.notify_waiters();
        }
    }

    pub fn is_shutting_down(&self) -> bool {
        self.inner.draining.load(Ordering::SeqCst)
    }

    pub fn in_flight_count(&self) -> usize {
        self.inner.in_flight.load(Ordering::SeqCst)
    }

    /// Resolves once no request is in flight.
    pub async fn drained(&self) {
        loop {
            let idle = self.inner.idle.notified();
            if self.in_flight_count() == 0 {
                return;
            }
            idle.await;
        }
    }

    fn enter(&self) -> InFlightGuard {
        self.inner.in_flight.fetch_add(1, Ordering::SeqCst);
        InFlightGuard {
            state: self.clone(),
        }
    }
}

/// Counts one request as in flight until dropped, including when the
/// request future is cancelled.
pub struct InFlightGuard {
    state: ShutdownState,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let previous = self.state.inner.in_flight.fetch_sub(1, Ordering::SeqCst);
        if previous == 1 {
            self.state.inner.idle.notify_waiters();
        }
    }
}

#[derive(Clone)]
pub struct GracefulShutdownLayer {
    state: ShutdownState,
}

impl GracefulShutdownLayer {
    pub fn new(state: ShutdownState) -> Self {
        Self { state }
    }
}

impl<S> Layer<S> for GracefulShutdownLayer {
    type Service = GracefulShutdownService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        GracefulShutdownService {
            inner,
            state: self.state.clone(),
        }
    }
}

#[derive(Clone)]
pub struct GracefulShutdownService<S> {
    inner: S,
    state: ShutdownState,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for GracefulShutdownService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
    ResBody: Body + Default,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = DrainFuture<S::Future, ResBody, S::Error>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        if self.state.is_shutting_down() {
            let mut response = Response::new(ResBody::default());
            *response.status_mut() = StatusCode::SERVICE_UNAVAILABLE;
            return DrainFuture::Rejected {
                response: Some(response),
                _error: PhantomData,
            };
        }

        let guard = self.state.enter();
        DrainFuture::Running {
            inner: self.inner.call(req),
            guard: Some(guard),
        }
    }
}

#[pin_project(project = DrainFutureProj)]
pub enum DrainFuture<F, B, E> {
    Running {
        #[pin]
        inner: F,
        guard: Option<InFlightGuard>,
    },
    Rejected {
        response: Option<Response<B>>,
        _error: PhantomData<fn() -> E>,
    },
}

impl<F, B, E> Future for DrainFuture<F, B, E>
where
    F: Future<Output = Result<Response<B>, E>>,
{
    type Output = Result<Response<B>, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.project() {
            DrainFutureProj::Running { inner, guard } => {
                let output = ready!(inner.poll(cx));
                guard.take();
                Poll::Ready(output)
            }
            DrainFutureProj::Rejected { response, .. } => Poll::Ready(Ok(response
                .take()
                .expect("DrainFuture polled after completion"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http_body_util::Empty;
    use std::convert::Infallible;
    use std::time::Duration;
    use tower::{ServiceBuilder, ServiceExt, service_fn};

    async fn slow(_req: Request<Empty<Bytes>>) -> Result<Response<Empty<Bytes>>, Infallible> {
        tokio::time::sleep(Duration::from_millis(20)).await;
        Ok(Response::new(Empty::new()))
    }

    fn request() -> Request<Empty<Bytes>> {
        Request::builder().body(Empty::new()).unwrap()
    }

    #[tokio::test]
    async fn test_passes_requests_through() {
        let state = ShutdownState::new();
        let service = ServiceBuilder::new()
            .layer(GracefulShutdownLayer::new(state.clone()))
            .service_fn(slow);

        let response = service.oneshot(request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(state.in_flight_count(), 0);
    }

    #[tokio::test]
    async fn test_rejects_after_shutdown_starts() {
        let state = ShutdownState::new();
        state.start_shutdown();

        let service = ServiceBuilder::new()
            .layer(GracefulShutdownLayer::new(state.clone()))
            .service_fn(slow);

        let response = service.oneshot(request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(state.in_flight_count(), 0);
    }

    #[tokio::test]
    async fn test_drained_waits_for_in_flight_requests() {
        let state = ShutdownState::new();
        let service = ServiceBuilder::new()
            .layer(GracefulShutdownLayer::new(state.clone()))
            .service(service_fn(slow));

        let running = tokio::spawn(service.clone().oneshot(request()));
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(state.in_flight_count(), 1);

        state.start_shutdown();
        let rejected = service.clone().oneshot(request()).await.unwrap();
        assert_eq!(rejected.status(), StatusCode::SERVICE_UNAVAILABLE);

        tokio::time::timeout(Duration::from_secs(1), state.drained())
            .await
            .expect("drain should finish");
        assert_eq!(state.in_flight_count(), 0);

        let finished = running.await.unwrap().unwrap();
        assert_eq!(finished.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_cancelled_request_is_released() {
        let state = ShutdownState::new();
        let service = ServiceBuilder::new()
            .layer(GracefulShutdownLayer::new(state.clone()))
            .service(service_fn(slow));

        let handle = tokio::spawn(service.oneshot(request()));
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(state.in_flight_count(), 1);

        handle.abort();
        let _ = handle.await;
        assert_eq!(state.in_flight_count(), 0);
    }

    #[tokio::test]
    async fn test_drained_is_immediate_when_idle() {
        let state = ShutdownState::new();
        state.start_shutdown();
        tokio::time::timeout(Duration::from_millis(50), state.drained())
            .await
            .expect("idle state drains immediately");
    }
}
