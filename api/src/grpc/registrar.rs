//! Registration of OTLP receivers onto a gRPC server.

use super::services::{MetricsReceiver, TracesReceiver};
use shared::otlp::proto::collector::metrics::v1::metrics_service_server::MetricsServiceServer;
use shared::otlp::proto::collector::trace::v1::trace_service_server::TraceServiceServer;
use std::collections::HashSet;
use std::future::Future;
use std::net::SocketAddr;
use thiserror::Error;
use tonic::server::NamedService;
use tonic::service::RoutesBuilder;
use tonic::transport::Server;

/// Errors returned when a receiver cannot be registered.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistrationError {
    /// The gRPC service already has a handler on this server.
    #[error("gRPC service '{0}' is already registered")]
    AlreadyRegistered(&'static str),
}

/// Accepts the OTLP receivers for each telemetry kind.
pub trait ReceiverRegistrar {
    /// Registers the trace export service.
    ///
    /// # Errors
    ///
    /// Returns an error if the service cannot be registered.
    fn register_trace_receiver(&mut self, receiver: TracesReceiver)
        -> Result<(), RegistrationError>;

    /// Registers the metrics export service.
    ///
    /// # Errors
    ///
    /// Returns an error if the service cannot be registered.
    fn register_metrics_receiver(
        &mut self,
        receiver: MetricsReceiver,
    ) -> Result<(), RegistrationError>;
}

/// Collects receiver services and serves them with tonic.
pub struct GrpcServer {
    routes: RoutesBuilder,
    registered: HashSet<&'static str>,
    max_decoding_message_size: usize,
}

impl GrpcServer {
    /// Creates a server accepting messages up to `max_decoding_message_size` bytes.
    #[must_use]
    pub fn new(max_decoding_message_size: usize) -> Self {
        Self {
            routes: RoutesBuilder::default(),
            registered: HashSet::new(),
            max_decoding_message_size,
        }
    }

    /// Names of the registered gRPC services.
    #[must_use]
    pub fn services(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.registered.iter().copied().collect();
        names.sort_unstable();
        names
    }

    fn claim(&mut self, name: &'static str) -> Result<(), RegistrationError> {
        if !self.registered.insert(name) {
            return Err(RegistrationError::AlreadyRegistered(name));
        }
        tracing::debug!(service = name, "Registered gRPC service");
        Ok(())
    }

    /// Serves the registered services on `addr` until `signal` resolves.
    ///
    /// # Errors
    ///
    /// Returns an error if binding or serving fails.
    pub async fn serve_with_shutdown<F>(
        self,
        addr: SocketAddr,
        signal: F,
    ) -> Result<(), tonic::transport::Error>
    where
        F: Future<Output = ()>,
    {
        Server::builder()
            .add_routes(self.routes.routes())
            .serve_with_shutdown(addr, signal)
            .await
    }
}

impl ReceiverRegistrar for GrpcServer {
    fn register_trace_receiver(
        &mut self,
        receiver: TracesReceiver,
    ) -> Result<(), RegistrationError> {
        self.claim(TraceServiceServer::<TracesReceiver>::NAME)?;
        self.routes.add_service(
            TraceServiceServer::new(receiver)
                .max_decoding_message_size(self.max_decoding_message_size),
        );
        Ok(())
    }

    fn register_metrics_receiver(
        &mut self,
        receiver: MetricsReceiver,
    ) -> Result<(), RegistrationError> {
        self.claim(MetricsServiceServer::<MetricsReceiver>::NAME)?;
        self.routes.add_service(
            MetricsServiceServer::new(receiver)
                .max_decoding_message_size(self.max_decoding_message_size),
        );
        Ok(())
    }
}
