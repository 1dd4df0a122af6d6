// ── Remote filter gateway ──
//
// The controller is generic over `FilterGateway`; `HttpGateway` is the
// production adapter over `crossfilter_api::FilterClient`.

use std::future::Future;

use crossfilter_api::{FilterClient, TlsMode, TransportConfig};

use crate::config::{GatewayConfig, TlsVerification};
use crate::error::CoreError;
use crate::model::{ConstraintContext, Dimension, FilterOption, Selections, ValidationOutcome};

/// The four request/response operations the controller consumes.
///
/// Implementations are stateless from the controller's point of view.
/// Every failure surfaces as [`CoreError::GatewayUnavailable`]; a negative
/// validation is a normal `Ok` result.
pub trait FilterGateway: Send + Sync + 'static {
    /// List the options of `context.target()` under the other two
    /// dimensions' constraints.
    fn list_options(
        &self,
        context: &ConstraintContext,
    ) -> impl Future<Output = Result<Vec<FilterOption>, CoreError>> + Send;

    /// Validate the full selection.
    fn validate_selection(
        &self,
        selections: &Selections,
    ) -> impl Future<Output = Result<ValidationOutcome, CoreError>> + Send;
}

/// [`FilterGateway`] backed by the REST API.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: FilterClient,
}

impl HttpGateway {
    pub fn new(config: &GatewayConfig) -> Result<Self, CoreError> {
        let transport = TransportConfig {
            tls: tls_to_transport(&config.tls),
            timeout: config.timeout,
        };
        let client = FilterClient::new(config.base_url.clone(), &transport)?;
        Ok(Self { client })
    }
}

impl FilterGateway for HttpGateway {
    async fn list_options(
        &self,
        context: &ConstraintContext,
    ) -> Result<Vec<FilterOption>, CoreError> {
        let modules = context.id_vec(Dimension::Module);
        let units = context.id_vec(Dimension::Unit);
        let locations = context.id_vec(Dimension::Location);

        let options = match context.target() {
            Dimension::Module => into_options(self.client.list_modules(&units, &locations).await?),
            Dimension::Unit => into_options(self.client.list_units(&modules, &locations).await?),
            Dimension::Location => {
                into_options(self.client.list_locations(&modules, &units).await?)
            }
        };
        Ok(options)
    }

    async fn validate_selection(
        &self,
        selections: &Selections,
    ) -> Result<ValidationOutcome, CoreError> {
        let ids = |d: Dimension| selections[d].iter().copied().collect::<Vec<_>>();
        let resp = self
            .client
            .validate_selection(
                &ids(Dimension::Module),
                &ids(Dimension::Unit),
                &ids(Dimension::Location),
            )
            .await?;
        Ok(resp.into())
    }
}

fn into_options<R: Into<FilterOption>>(records: Vec<R>) -> Vec<FilterOption> {
    records.into_iter().map(Into::into).collect()
}

fn tls_to_transport(tls: &TlsVerification) -> TlsMode {
    match tls {
        TlsVerification::SystemDefaults => TlsMode::System,
        TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
        TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
    }
}
