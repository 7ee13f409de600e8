use std::convert::Infallible;
use std::sync::Arc;
use std::task::Poll;

use axum::body::Body;
use futures::future::BoxFuture;
use http::Request;
use http::Response;
use http::StatusCode;
use tower::Service;
use tracing_futures::Instrument;

use super::response_builder::ResponseBuilder;
use crate::aggregator::SchemaAggregator;
use crate::gate::Enabled;
use crate::gate::RequestContext;
use crate::gateway::Gateway;

const DISABLED_MESSAGE: &str = "Disabled";
const NO_GATEWAY_MESSAGE: &str = "federation info is not available: the host has no federation gateway";

#[derive(Clone)]
pub(crate) struct FederationInfoService {
    gateway: Option<Arc<Gateway>>,
    enabled: Enabled,
    aggregator: Arc<SchemaAggregator>,
}

impl FederationInfoService {
    pub(crate) fn new(
        gateway: Option<Arc<Gateway>>,
        enabled: Enabled,
        aggregator: Arc<SchemaAggregator>,
    ) -> Self {
        Self {
            gateway,
            enabled,
            aggregator,
        }
    }

    async fn handle(self, request: Request<Body>) -> Response<Body> {
        let Some(gateway) = self.gateway else {
            tracing::error!("federation info requested but the host has no federation gateway");
            return ResponseBuilder::error_response(StatusCode::NOT_FOUND, NO_GATEWAY_MESSAGE);
        };

        let (parts, _body) = request.into_parts();
        if !self.enabled.evaluate(RequestContext::from(&parts)).await {
            tracing::debug!("federation info is disabled for this request");
            return ResponseBuilder::error_response(StatusCode::FORBIDDEN, DISABLED_MESSAGE);
        }

        let services = gateway.service_map();
        let response = self
            .aggregator
            .aggregate(&services)
            .and_then(|schema| ResponseBuilder::json_response(StatusCode::OK, &schema));
        match response {
            Ok(response) => response,
            Err(err) => {
                tracing::error!(%err, "could not build the federation info");
                ResponseBuilder::error_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
        }
    }
}

impl Service<Request<Body>> for FederationInfoService {
    type Response = Response<Body>;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut std::task::Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        let this = self.clone();
        Box::pin(
            async move { Ok(this.handle(request).await) }
                .instrument(tracing::info_span!("federation_info_endpoint")),
        )
    }
}
