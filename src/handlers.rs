use crate::acesso::{resolver_papel, PapelCache};
use crate::config::Config;
use crate::consultores::{ConsultoresService, ResultadoRemocao};
use crate::errors::AppError;
use crate::mail_client::MailGatewayClient;
use crate::models::*;
use crate::registro::RegistroService;
use crate::roleta::RoletaService;
use crate::validacao::normalizar_tel_cliente;
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: PgPool,
    /// Application configuration.
    pub config: Config,
    /// Client for the mail gateway (optional; without it assignments still
    /// happen, nobody is notified).
    pub mail_client: Option<MailGatewayClient>,
    /// Cache of resolved dashboard roles, keyed by credential digest.
    pub papel_cache: PapelCache,
}

/// Health check endpoint.
///
/// Returns the service status, version, and health information.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "rust-roleta-api",
            "version": "0.1.0"
        })),
    )
}

/// POST /api/indicacoes
///
/// The heart of the system: draws the next consultant from the
/// (natureza, cidade) rotation queue, records the assignment and fires the
/// notification e-mail in the background.
///
/// # Returns
///
/// * 201 with `{success, message, consultor_sorteado}` on success.
/// * 503 when the queue has no active consultant (a domain outcome).
/// * 500 on infrastructure faults.
pub async fn processar_indicacao(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<IndicacaoRequest>,
) -> Result<(StatusCode, Json<IndicacaoResponse>), AppError> {
    tracing::info!(
        "POST /api/indicacoes - natureza: {}, cidade: {}, cliente: {}",
        payload.natureza,
        payload.cidade,
        payload.nome_cliente
    );

    let natureza = payload.natureza.trim().to_string();
    let cidade = payload.cidade.trim().to_string();
    if natureza.is_empty() || cidade.is_empty() || payload.nome_cliente.trim().is_empty() {
        return Err(AppError::BadRequest(
            "natureza, cidade and nome_cliente are required".to_string(),
        ));
    }

    let dados = IndicacaoRequest {
        natureza: natureza.clone(),
        cidade: cidade.clone(),
        nome_cliente: payload.nome_cliente.trim().to_string(),
        tel_cliente: normalizar_tel_cliente(payload.tel_cliente),
        nome_corretor: payload.nome_corretor,
        unidade_corretor: payload.unidade_corretor,
        descricao_situacao: payload.descricao_situacao,
    };

    // 1. Draw: atomic head selection + rotation advance.
    let roleta = RoletaService::new(state.db.clone());
    let consultor = roleta.sortear(&natureza, &cidade).await?;

    // 2. Record. If this fails the rotation already advanced; the gap is
    // logged here and the submission fails loudly.
    let registro = RegistroService::new(state.db.clone());
    if let Err(e) = registro.registrar(&dados, &consultor).await {
        tracing::error!(
            "Rotação avançada para consultor {} mas o registro da indicação falhou: {}",
            consultor.id,
            e
        );
        return Err(e);
    }

    // 3. Notify, best-effort. Never blocks or fails the response.
    if let Some(mailer) = state.mail_client.clone() {
        let cc = state.config.email_gerente_cc.clone();
        let consultor_mail = consultor.clone();
        let dados_mail = dados.clone();
        tokio::spawn(async move {
            if let Err(e) = mailer
                .notificar_atribuicao(&consultor_mail, &cc, &dados_mail)
                .await
            {
                tracing::error!(
                    "Falha ao enviar e-mail de atribuição para {}: {}",
                    consultor_mail.email,
                    e
                );
            }
        });
    }

    Ok((
        StatusCode::CREATED,
        Json(IndicacaoResponse {
            success: true,
            message: "Indicação atribuída com sucesso!".to_string(),
            consultor_sorteado: Some(consultor.nome),
        }),
    ))
}

/// GET /api/consultores
///
/// Lists the registry, restricted to the caller's cities when the role is
/// scoped.
pub async fn listar_consultores(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<Consultor>>, AppError> {
    let papel = resolver_papel(&state.db, &state.papel_cache, &headers).await?;
    let consultores = ConsultoresService::new(state.db.clone())
        .listar(&papel)
        .await?;
    Ok(Json(consultores))
}

/// POST /api/consultores
pub async fn criar_consultor(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(novo): Json<NovoConsultor>,
) -> Result<(StatusCode, Json<Consultor>), AppError> {
    let papel = resolver_papel(&state.db, &state.papel_cache, &headers).await?;
    let consultor = ConsultoresService::new(state.db.clone())
        .criar(&novo, &papel)
        .await?;
    Ok((StatusCode::CREATED, Json(consultor)))
}

/// PATCH /api/consultores/:id/roleta
///
/// Toggles participation in the rotation. A deactivated consultant stops
/// receiving leads immediately; their history is untouched.
pub async fn alternar_roleta_consultor(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(req): Json<AlternarRoletaRequest>,
) -> Result<Json<Consultor>, AppError> {
    let papel = resolver_papel(&state.db, &state.papel_cache, &headers).await?;
    let consultor = ConsultoresService::new(state.db.clone())
        .alternar_roleta(id, req.ativo, &papel)
        .await?;
    Ok(Json(consultor))
}

/// DELETE /api/consultores/:id
///
/// Hard delete when the consultant has no history, soft-deactivate
/// otherwise.
pub async fn remover_consultor(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    let papel = resolver_papel(&state.db, &state.papel_cache, &headers).await?;
    let resultado = ConsultoresService::new(state.db.clone())
        .remover(id, &papel)
        .await?;

    let removido = match resultado {
        ResultadoRemocao::Excluido => "excluido",
        ResultadoRemocao::Desativado => "desativado",
    };
    Ok(Json(json!({ "success": true, "removido": removido })))
}

/// GET /api/indicacoes
///
/// Assignment history with filters (date range, consultant ids, cities,
/// natureza, status), always narrowed to the caller's authorized cities
/// when scoped.
pub async fn listar_indicacoes(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<HistoricoParams>,
) -> Result<Json<Vec<Indicacao>>, AppError> {
    let papel = resolver_papel(&state.db, &state.papel_cache, &headers).await?;
    let registros = RegistroService::new(state.db.clone())
        .listar(&params, &papel)
        .await?;
    Ok(Json(registros))
}

/// PATCH /api/indicacoes/:id/status
pub async fn atualizar_status_indicacao(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(req): Json<AtualizarStatusRequest>,
) -> Result<Json<Indicacao>, AppError> {
    let papel = resolver_papel(&state.db, &state.papel_cache, &headers).await?;
    let registro = RegistroService::new(state.db.clone())
        .atualizar_status(id, &req.status, &papel)
        .await?;
    Ok(Json(registro))
}
