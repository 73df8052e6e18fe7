use sqlx::PgPool;

use crate::acesso::{exigir_cidade, Papel};
use crate::errors::{AppError, ResultExt};
use crate::models::{Consultor, NovoConsultor};
use crate::validacao::is_valid_email;

/// Outcome of a consultant removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultadoRemocao {
    /// Row deleted; the consultant had no assignment history.
    Excluido,
    /// Row kept but taken out of the rotation; history referenced it.
    Desativado,
}

/// Consultant registry service backing the dashboard.
///
/// Every write is scope-checked against the actor's role before touching
/// the row.
pub struct ConsultoresService {
    pool: PgPool,
}

impl ConsultoresService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Lists consultants, restricted to the caller's cities when scoped.
    pub async fn listar(&self, papel: &Papel) -> Result<Vec<Consultor>, AppError> {
        let escopo = papel.cidades_permitidas();

        let consultores = sqlx::query_as::<_, Consultor>(
            r#"
            SELECT id, nome, email, natureza, cidade, ativo_na_roleta,
                   data_ultima_indicacao, criado_em
            FROM consultores
            WHERE ($1::text[] IS NULL OR cidade = ANY($1))
            ORDER BY natureza ASC, cidade ASC, nome ASC
            "#,
        )
        .bind(escopo)
        .fetch_all(&self.pool)
        .await?;

        Ok(consultores)
    }

    /// Registers a new consultant.
    ///
    /// Seeded at the epoch so the newcomer is first in line for their
    /// (natureza, cidade) queue.
    pub async fn criar(&self, novo: &NovoConsultor, papel: &Papel) -> Result<Consultor, AppError> {
        let nome = novo.nome.trim();
        let natureza = novo.natureza.trim();
        let cidade = novo.cidade.trim();

        if nome.is_empty() || natureza.is_empty() || cidade.is_empty() {
            return Err(AppError::BadRequest(
                "nome, natureza and cidade are required".to_string(),
            ));
        }
        if !is_valid_email(novo.email.trim()) {
            return Err(AppError::BadRequest(format!(
                "Invalid consultant e-mail: {}",
                novo.email
            )));
        }

        exigir_cidade(papel, cidade)?;

        let consultor = sqlx::query_as::<_, Consultor>(
            r#"
            INSERT INTO consultores (nome, email, natureza, cidade)
            VALUES ($1, $2, $3, $4)
            RETURNING id, nome, email, natureza, cidade, ativo_na_roleta,
                      data_ultima_indicacao, criado_em
            "#,
        )
        .bind(nome)
        .bind(novo.email.trim())
        .bind(natureza)
        .bind(cidade)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(
            "Consultor {} ({}) cadastrado na fila {}/{}",
            consultor.id,
            consultor.nome,
            consultor.natureza,
            consultor.cidade
        );

        Ok(consultor)
    }

    /// Toggles a consultant's participation in the rotation.
    pub async fn alternar_roleta(
        &self,
        id: i64,
        ativo: bool,
        papel: &Papel,
    ) -> Result<Consultor, AppError> {
        let atual = self.buscar(id).await?;
        exigir_cidade(papel, &atual.cidade)?;

        let consultor = sqlx::query_as::<_, Consultor>(
            r#"
            UPDATE consultores SET ativo_na_roleta = $2
            WHERE id = $1
            RETURNING id, nome, email, natureza, cidade, ativo_na_roleta,
                      data_ultima_indicacao, criado_em
            "#,
        )
        .bind(id)
        .bind(ativo)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(
            "Consultor {}: ativo_na_roleta = {}",
            consultor.id,
            consultor.ativo_na_roleta
        );

        Ok(consultor)
    }

    /// Removes a consultant.
    ///
    /// Hard delete only when no assignment history references them;
    /// otherwise the row is kept and deactivated so history stays intact.
    pub async fn remover(&self, id: i64, papel: &Papel) -> Result<ResultadoRemocao, AppError> {
        let atual = self.buscar(id).await?;
        exigir_cidade(papel, &atual.cidade)?;

        let (historico,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM indicacoes WHERE consultor_id = $1")
                .bind(id)
                .fetch_one(&self.pool)
                .await
                .context("counting consultant history before removal")?;

        if historico == 0 {
            sqlx::query("DELETE FROM consultores WHERE id = $1")
                .bind(id)
                .execute(&self.pool)
                .await?;
            tracing::info!("Consultor {} excluído (sem histórico)", id);
            return Ok(ResultadoRemocao::Excluido);
        }

        sqlx::query("UPDATE consultores SET ativo_na_roleta = FALSE WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        tracing::info!(
            "Consultor {} desativado ({} indicações no histórico)",
            id,
            historico
        );

        Ok(ResultadoRemocao::Desativado)
    }

    async fn buscar(&self, id: i64) -> Result<Consultor, AppError> {
        sqlx::query_as::<_, Consultor>(
            r#"
            SELECT id, nome, email, natureza, cidade, ativo_na_roleta,
                   data_ultima_indicacao, criado_em
            FROM consultores WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Consultor {} not found", id)))
    }
}
