//! Where period lists come from.

use std::future::Future;

use serde_json::Value;

use crate::error::ServiceError;
use crate::request::DashaRequest;

/// A backend that answers [`DashaRequest`]s with raw JSON.
///
/// Implementations return the undecoded body; locating the period list and
/// normalizing it is the controller's job, so sources stay schema-agnostic.
pub trait PeriodSource: Send + Sync + 'static {
    fn fetch(
        &self,
        request: &DashaRequest,
    ) -> impl Future<Output = Result<Value, ServiceError>> + Send;
}

impl<S: PeriodSource> PeriodSource for std::sync::Arc<S> {
    fn fetch(
        &self,
        request: &DashaRequest,
    ) -> impl Future<Output = Result<Value, ServiceError>> + Send {
        (**self).fetch(request)
    }
}
