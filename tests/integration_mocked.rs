/// Integration tests with a mocked mail gateway.
/// Exercise the notification contract without a real provider: delivery is
/// best-effort, failures surface as errors for the spawner to log, and the
/// circuit breaker stops hammering a dead gateway.
use chrono::Utc;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use rust_roleta_api::mail_client::MailGatewayClient;
use rust_roleta_api::models::{Consultor, IndicacaoRequest};

fn consultor_teste() -> Consultor {
    Consultor {
        id: 7,
        nome: "João Silva".to_string(),
        email: "joao@imobiliaria.com.br".to_string(),
        natureza: "consorcio".to_string(),
        cidade: "Itapema".to_string(),
        ativo_na_roleta: true,
        data_ultima_indicacao: Utc::now(),
        criado_em: Utc::now(),
    }
}

fn indicacao_teste() -> IndicacaoRequest {
    IndicacaoRequest {
        natureza: "consorcio".to_string(),
        cidade: "Itapema".to_string(),
        nome_cliente: "Maria Santos".to_string(),
        tel_cliente: Some("+5547987654321".to_string()),
        nome_corretor: Some("Pedro Corretor".to_string()),
        unidade_corretor: Some("Unidade Centro".to_string()),
        descricao_situacao: None,
    }
}

#[tokio::test]
async fn test_notification_payload_and_success() {
    let mock_server = MockServer::start().await;

    // The gateway receives the assembled Portuguese template with the
    // consultant as recipient and the manager CCed.
    Mock::given(method("POST"))
        .and(path("/messages"))
        .and(body_partial_json(serde_json::json!({
            "from": "roleta@imobiliaria.com.br",
            "to": "joao@imobiliaria.com.br",
            "cc": "gerente@imobiliaria.com.br",
            "subject": "[INDICAÇÃO CRI/ADIM] consorcio - Cliente: Maria Santos (Atribuído: João Silva)",
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = MailGatewayClient::new(
        mock_server.uri(),
        "test_token".to_string(),
        "roleta@imobiliaria.com.br".to_string(),
    )
    .expect("client creation");

    let resultado = client
        .notificar_atribuicao(
            &consultor_teste(),
            "gerente@imobiliaria.com.br",
            &indicacao_teste(),
        )
        .await;

    assert!(resultado.is_ok());
}

#[tokio::test]
async fn test_gateway_failure_surfaces_as_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/messages"))
        .respond_with(ResponseTemplate::new(500).set_body_string("smtp pool exhausted"))
        .mount(&mock_server)
        .await;

    let client = MailGatewayClient::new(
        mock_server.uri(),
        "test_token".to_string(),
        "roleta@imobiliaria.com.br".to_string(),
    )
    .expect("client creation");

    let resultado = client
        .notificar_atribuicao(
            &consultor_teste(),
            "gerente@imobiliaria.com.br",
            &indicacao_teste(),
        )
        .await;

    let erro = resultado.expect_err("500 must surface as an error");
    assert!(erro.to_string().contains("Mail gateway returned"));
}

#[tokio::test]
async fn test_circuit_opens_after_consecutive_failures() {
    let mock_server = MockServer::start().await;

    // Exactly 5 requests reach the gateway; the 6th is rejected locally by
    // the open circuit.
    Mock::given(method("POST"))
        .and(path("/messages"))
        .respond_with(ResponseTemplate::new(500))
        .expect(5)
        .mount(&mock_server)
        .await;

    let client = MailGatewayClient::new(
        mock_server.uri(),
        "test_token".to_string(),
        "roleta@imobiliaria.com.br".to_string(),
    )
    .expect("client creation");

    for _ in 0..5 {
        let resultado = client
            .enviar(
                "joao@imobiliaria.com.br",
                "gerente@imobiliaria.com.br",
                "assunto",
                "corpo",
            )
            .await;
        assert!(resultado.is_err());
    }

    let rejeitado = client
        .enviar(
            "joao@imobiliaria.com.br",
            "gerente@imobiliaria.com.br",
            "assunto",
            "corpo",
        )
        .await
        .expect_err("open circuit must fail fast");
    assert!(rejeitado.to_string().contains("circuit open"));
}
