use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// ============ Database Models ============

/// A consultant enrolled in the assignment rotation.
///
/// One rotation queue exists per (natureza, cidade) pair; within it the
/// active consultants are ordered by `data_ultima_indicacao` ascending,
/// ties broken by `id` ascending.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Consultor {
    /// Unique identifier.
    pub id: i64,
    /// Display name.
    pub nome: String,
    /// Contact e-mail, target of assignment notifications.
    pub email: String,
    /// Business-line tag partitioning the rotation.
    pub natureza: String,
    /// City tag partitioning the rotation.
    pub cidade: String,
    /// Whether the consultant currently takes part in the rotation.
    pub ativo_na_roleta: bool,
    /// Timestamp of the last assignment; the epoch for fresh consultants.
    pub data_ultima_indicacao: DateTime<Utc>,
    /// Timestamp of creation.
    pub criado_em: DateTime<Utc>,
}

/// Historical record of one lead assignment.
///
/// Immutable after creation except for `status`.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Indicacao {
    /// Unique identifier (server-assigned).
    pub id: Uuid,
    /// Timestamp of creation (server-assigned).
    pub criado_em: DateTime<Utc>,
    /// The assigned consultant; NULL if the consultant was later removed.
    pub consultor_id: Option<i64>,
    /// Name of the referring broker.
    pub nome_corretor: Option<String>,
    /// Unit of the referring broker.
    pub unidade_corretor: Option<String>,
    /// Business-line tag.
    pub natureza: String,
    /// City tag.
    pub cidade: String,
    /// Client name.
    pub nome_cliente: String,
    /// Client phone, normalized to E.164 when it validated as Brazilian.
    pub tel_cliente: Option<String>,
    /// Free-text description of the client's situation.
    pub descricao_situacao: Option<String>,
    /// Internal follow-up tag, editable from the dashboard.
    pub status: String,
}

// ============ API Request/Response Models ============

/// Inbound lead submission.
#[derive(Debug, Clone, Deserialize)]
pub struct IndicacaoRequest {
    pub natureza: String,
    pub cidade: String,
    pub nome_cliente: String,
    pub tel_cliente: Option<String>,
    pub nome_corretor: Option<String>,
    pub unidade_corretor: Option<String>,
    pub descricao_situacao: Option<String>,
}

/// Response for a lead submission.
#[derive(Debug, Serialize)]
pub struct IndicacaoResponse {
    /// Whether the assignment succeeded.
    pub success: bool,
    /// Human-readable outcome.
    pub message: String,
    /// Name of the consultant who won the draw.
    pub consultor_sorteado: Option<String>,
}

/// Payload for registering a new consultant.
#[derive(Debug, Deserialize)]
pub struct NovoConsultor {
    pub nome: String,
    pub email: String,
    pub natureza: String,
    pub cidade: String,
}

/// Payload for toggling a consultant's participation in the rotation.
#[derive(Debug, Deserialize)]
pub struct AlternarRoletaRequest {
    pub ativo: bool,
}

/// Payload for editing an assignment record's status tag.
#[derive(Debug, Deserialize)]
pub struct AtualizarStatusRequest {
    pub status: String,
}

/// Query parameters accepted by the history listing.
///
/// `consultores` and `cidades` are comma-separated lists; timestamps are
/// RFC 3339. Every filter is optional.
#[derive(Debug, Default, Deserialize)]
pub struct HistoricoParams {
    pub inicio: Option<DateTime<Utc>>,
    pub fim: Option<DateTime<Utc>>,
    pub consultores: Option<String>,
    pub cidades: Option<String>,
    pub natureza: Option<String>,
    pub status: Option<String>,
}

impl HistoricoParams {
    /// Parses the comma-separated consultant id list, dropping blanks.
    pub fn consultor_ids(&self) -> Result<Option<Vec<i64>>, String> {
        match &self.consultores {
            None => Ok(None),
            Some(raw) => {
                let mut ids = Vec::new();
                for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
                    let id = part
                        .parse::<i64>()
                        .map_err(|_| format!("Invalid consultant id: {}", part))?;
                    ids.push(id);
                }
                Ok(if ids.is_empty() { None } else { Some(ids) })
            }
        }
    }

    /// Parses the comma-separated city list, dropping blanks.
    pub fn lista_cidades(&self) -> Option<Vec<String>> {
        self.cidades.as_ref().and_then(|raw| {
            let cidades: Vec<String> = raw
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect();
            if cidades.is_empty() {
                None
            } else {
                Some(cidades)
            }
        })
    }
}
