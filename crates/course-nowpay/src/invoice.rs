//! # NOWPayments Hosted Invoices
//!
//! Implementation of the NOWPayments invoice-creation API.
//! The gateway hosts the checkout page; this client only creates the
//! invoice and hands back the redirect URL.

use crate::config::NowPaymentsConfig;
use async_trait::async_trait;
use course_core::{Invoice, InvoiceGateway, InvoiceRequest, MarketError, MarketResult};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument};

/// Bounded timeout for the outbound gateway call; past this the call is
/// treated as `GatewayUnavailable`.
const GATEWAY_TIMEOUT_SECS: u64 = 10;

/// NOWPayments invoice gateway
pub struct NowPaymentsGateway {
    config: NowPaymentsConfig,
    client: Client,
}

impl NowPaymentsGateway {
    /// Create a new gateway client
    pub fn new(config: NowPaymentsConfig) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(GATEWAY_TIMEOUT_SECS))
            .build()
            .expect("Failed to create HTTP client");

        Self { config, client }
    }

    /// Create from environment variables
    pub fn from_env() -> MarketResult<Self> {
        let config = NowPaymentsConfig::from_env()?;
        Ok(Self::new(config))
    }
}

#[async_trait]
impl InvoiceGateway for NowPaymentsGateway {
    #[instrument(skip(self, request), fields(order_id = %request.order_id))]
    async fn create_invoice(&self, request: &InvoiceRequest) -> MarketResult<Invoice> {
        let body = NowInvoiceRequest {
            price_amount: request.amount,
            price_currency: request.currency.clone(),
            order_id: request.order_id.clone(),
            order_description: request.description.clone(),
            ipn_callback_url: request.callback_url.clone(),
            success_url: request.success_url.clone(),
            cancel_url: request.cancel_url.clone(),
        };

        debug!(
            order_id = %request.order_id,
            amount = %request.amount,
            "creating NOWPayments invoice"
        );

        let response = self
            .client
            .post(self.config.invoice_url())
            .header("x-api-key", &self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| MarketError::GatewayUnavailable(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| MarketError::GatewayUnavailable(e.to_string()))?;

        if !status.is_success() {
            error!(
                order_id = %request.order_id,
                %status,
                body = %text,
                "NOWPayments invoice creation failed"
            );
            return Err(MarketError::GatewayUnavailable(format!(
                "HTTP {}: {}",
                status, text
            )));
        }

        let invoice: NowInvoiceResponse = serde_json::from_str(&text).map_err(|e| {
            MarketError::GatewayUnavailable(format!("unexpected invoice response: {}", e))
        })?;

        info!(
            order_id = %request.order_id,
            invoice_id = %invoice.id,
            "created NOWPayments invoice"
        );

        Ok(Invoice {
            id: invoice.id,
            invoice_url: invoice.invoice_url,
        })
    }

    fn gateway_name(&self) -> &'static str {
        "nowpayments"
    }
}

// =============================================================================
// NOWPayments API Types
// =============================================================================

#[derive(Debug, Serialize)]
struct NowInvoiceRequest {
    price_amount: Decimal,
    price_currency: String,
    order_id: String,
    order_description: String,
    ipn_callback_url: String,
    success_url: String,
    cancel_url: String,
}

#[derive(Debug, Deserialize)]
struct NowInvoiceResponse {
    id: String,
    invoice_url: String,
}
