//! Concrete source adapters, one per [`repute_core::SourceKind`]

pub mod on_chain;
pub mod code_hosting;
pub mod attestation;
pub mod webhook;

pub use on_chain::*;
pub use code_hosting::*;
pub use attestation::*;
pub use webhook::*;

use std::sync::Arc;

use repute_core::SourceKind;

use crate::traits::SourceAdapter;

/// Default adapter for a kind
pub fn default_adapter(kind: SourceKind) -> Arc<dyn SourceAdapter> {
    match kind {
        SourceKind::OnChainPaymentHistory => Arc::new(OnChainAdapter::new()),
        SourceKind::CodeHostingActivity => Arc::new(CodeHostingAdapter::new()),
        SourceKind::AttestationFeed => Arc::new(AttestationAdapter::new()),
        SourceKind::OperatorWebhook => Arc::new(WebhookAdapter::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_adapter_kinds() {
        for kind in SourceKind::ALL {
            assert_eq!(default_adapter(kind).kind(), kind);
        }
    }
}
