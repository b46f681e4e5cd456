use async_trait::async_trait;
use aws_sdk_sesv2::Client as SesClient;
use aws_sdk_sesv2::types::{Body, Content, Destination, EmailContent, Message};
use shared::models::Order;

use super::{BoxError, ReceiptDispatcher, receipt_subject, render_receipt};

/// Mails receipts through AWS SES. The customer identity is the address.
pub struct SesReceiptDispatcher {
    ses: SesClient,
    from: String,
}

impl SesReceiptDispatcher {
    pub fn new(ses: SesClient, from: impl Into<String>) -> Self {
        Self {
            ses,
            from: from.into(),
        }
    }

    /// Build a client from the default AWS config (`SES_REGION` overrides the region)
    pub async fn from_env(from: impl Into<String>) -> Self {
        let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let ses = if let Ok(ses_region) = std::env::var("SES_REGION") {
            let ses_config = aws_config
                .to_builder()
                .region(aws_config::Region::new(ses_region))
                .build();
            SesClient::new(&ses_config)
        } else {
            SesClient::new(&aws_config)
        };
        Self::new(ses, from)
    }
}

#[async_trait]
impl ReceiptDispatcher for SesReceiptDispatcher {
    async fn send_receipt(&self, order: &Order) -> Result<(), BoxError> {
        let to = order.customer.as_str();
        let subject = Content::builder().data(receipt_subject(order)).build()?;
        let body = Body::builder()
            .text(Content::builder().data(render_receipt(order)).build()?)
            .build();
        let message = Message::builder().subject(subject).body(body).build();

        self.ses
            .send_email()
            .from_email_address(&self.from)
            .destination(Destination::builder().to_addresses(to).build())
            .content(EmailContent::builder().simple(message).build())
            .send()
            .await?;

        tracing::info!(order_id = order.id, to = to, "Receipt sent");
        Ok(())
    }
}
