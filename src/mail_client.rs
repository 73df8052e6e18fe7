use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use crate::circuit_breaker::{create_mail_circuit_breaker, MailCircuitBreaker};
use crate::errors::AppError;
use crate::models::{Consultor, IndicacaoRequest};

/// Client for the templated-mail gateway.
///
/// Notification delivery is strictly best-effort: callers spawn
/// `notificar_atribuicao` after the assignment is committed and only ever
/// log its failures. A circuit breaker keeps a dead gateway from stalling
/// the notification tasks.
#[derive(Clone)]
pub struct MailGatewayClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
    from: String,
    breaker: Arc<MailCircuitBreaker>,
}

impl MailGatewayClient {
    /// Creates a new `MailGatewayClient`.
    ///
    /// # Arguments
    ///
    /// * `base_url` - The base URL of the mail gateway.
    /// * `token` - The API token for authentication.
    /// * `from` - The sender address stamped on every message.
    pub fn new(base_url: String, token: String, from: String) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| {
                AppError::ExternalApiError(format!("Failed to create mail client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url,
            token,
            from,
            breaker: Arc::new(create_mail_circuit_breaker()),
        })
    }

    /// Sends one message through the gateway.
    pub async fn enviar(
        &self,
        to: &str,
        cc: &str,
        subject: &str,
        body: &str,
    ) -> Result<(), AppError> {
        use failsafe::futures::CircuitBreaker;

        let envio = async {
            let url = format!("{}/messages", self.base_url);

            let payload = json!({
                "from": self.from,
                "to": to,
                "cc": cc,
                "subject": subject,
                "text": body,
            });

            let response = self
                .client
                .post(&url)
                .header("Authorization", format!("Bearer {}", self.token))
                .json(&payload)
                .send()
                .await
                .map_err(|e| {
                    AppError::ExternalApiError(format!("Mail gateway request failed: {}", e))
                })?;

            if !response.status().is_success() {
                let status = response.status();
                let error_text = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".to_string());
                return Err(AppError::ExternalApiError(format!(
                    "Mail gateway returned {}: {}",
                    status, error_text
                )));
            }

            Ok(())
        };

        match self.breaker.call(envio).await {
            Ok(()) => Ok(()),
            Err(failsafe::Error::Inner(e)) => Err(e),
            Err(failsafe::Error::Rejected) => Err(AppError::ExternalApiError(
                "Mail gateway circuit open, notification skipped".to_string(),
            )),
        }
    }

    /// Sends the assignment notification for a drawn consultant, CCing the
    /// manager address.
    pub async fn notificar_atribuicao(
        &self,
        consultor: &Consultor,
        cc: &str,
        dados: &IndicacaoRequest,
    ) -> Result<(), AppError> {
        let subject = format!(
            "[INDICAÇÃO CRI/ADIM] {} - Cliente: {} (Atribuído: {})",
            dados.natureza, dados.nome_cliente, consultor.nome
        );

        let body = format!(
            "Nova Indicação Recebida - Prioridade Máxima!\n\
             Atribuído a: {}\n\
             Detalhes: Corretor Indicador: {}\n\
             Natureza: {} / Cidade: {}\n\
             Dados do Cliente: Nome: {}, Telefone: {}.",
            consultor.nome,
            dados.nome_corretor.as_deref().unwrap_or("Não Informado"),
            dados.natureza,
            dados.cidade,
            dados.nome_cliente,
            dados.tel_cliente.as_deref().unwrap_or("N/A"),
        );

        self.enviar(&consultor.email, cc, &subject, &body).await?;

        tracing::info!(
            "E-mail de atribuição enviado para {} ({})",
            consultor.nome,
            consultor.email
        );
        Ok(())
    }
}
