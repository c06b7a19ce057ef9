/// Delivery metadata taken from the inbound webhook headers.
///
/// Inserted into request extensions by [`crate::middleware::delivery_context`].
/// Nothing here is trusted until the ingestor has verified the signature.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryContext {
    shop_domain: Option<String>,
    signature: Option<String>,
    webhook_id: Option<String>,
}

impl DeliveryContext {
    pub fn new(shop_domain: Option<String>, signature: Option<String>, webhook_id: Option<String>) -> Self {
        Self {
            shop_domain,
            signature,
            webhook_id,
        }
    }

    pub fn shop_domain(&self) -> Option<&str> {
        self.shop_domain.as_deref()
    }

    pub fn signature(&self) -> Option<&str> {
        self.signature.as_deref()
    }

    pub fn webhook_id(&self) -> Option<&str> {
        self.webhook_id.as_deref()
    }
}
