use sqlx::PgPool;
use uuid::Uuid;

use crate::acesso::{exigir_cidade, Papel};
use crate::errors::AppError;
use crate::models::{Consultor, HistoricoParams, Indicacao, IndicacaoRequest};

/// Assignment history service.
///
/// Records are created exactly once per successful draw and never deleted;
/// only the `status` tag is editable afterwards. Inserts deliberately run
/// outside the allocator's unit of work — history appends must not hold
/// locks on the hot `consultores` rows.
pub struct RegistroService {
    pool: PgPool,
}

impl RegistroService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Persists the historical record of an assignment.
    ///
    /// Called only after a successful draw. A failure here fails the whole
    /// submission even though the rotation already advanced; the caller
    /// logs that gap, it is never hidden.
    pub async fn registrar(
        &self,
        dados: &IndicacaoRequest,
        consultor: &Consultor,
    ) -> Result<Indicacao, AppError> {
        let registro = sqlx::query_as::<_, Indicacao>(
            r#"
            INSERT INTO indicacoes (
                consultor_id, nome_corretor, unidade_corretor, natureza,
                cidade, nome_cliente, tel_cliente, descricao_situacao
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, criado_em, consultor_id, nome_corretor, unidade_corretor,
                      natureza, cidade, nome_cliente, tel_cliente, descricao_situacao, status
            "#,
        )
        .bind(consultor.id)
        .bind(&dados.nome_corretor)
        .bind(&dados.unidade_corretor)
        .bind(&dados.natureza)
        .bind(&dados.cidade)
        .bind(&dados.nome_cliente)
        .bind(&dados.tel_cliente)
        .bind(&dados.descricao_situacao)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(
            "Indicação {} registrada para consultor {} ({}/{})",
            registro.id,
            consultor.id,
            registro.natureza,
            registro.cidade
        );

        Ok(registro)
    }

    /// Lists assignment history with the dashboard filters applied.
    ///
    /// A scoped role gets its city set ANDed on top of whatever cities the
    /// request asked for, so asking for an out-of-scope city yields zero
    /// rows rather than an error.
    pub async fn listar(
        &self,
        params: &HistoricoParams,
        papel: &Papel,
    ) -> Result<Vec<Indicacao>, AppError> {
        let consultor_ids = params.consultor_ids().map_err(AppError::BadRequest)?;
        let cidades = params.lista_cidades();
        let escopo = papel.cidades_permitidas();

        let registros = sqlx::query_as::<_, Indicacao>(
            r#"
            SELECT id, criado_em, consultor_id, nome_corretor, unidade_corretor,
                   natureza, cidade, nome_cliente, tel_cliente, descricao_situacao, status
            FROM indicacoes
            WHERE ($1::timestamptz IS NULL OR criado_em >= $1)
              AND ($2::timestamptz IS NULL OR criado_em <= $2)
              AND ($3::bigint[] IS NULL OR consultor_id = ANY($3))
              AND ($4::text[] IS NULL OR cidade = ANY($4))
              AND ($5::text IS NULL OR natureza = $5)
              AND ($6::text IS NULL OR status = $6)
              AND ($7::text[] IS NULL OR cidade = ANY($7))
            ORDER BY criado_em DESC
            "#,
        )
        .bind(params.inicio)
        .bind(params.fim)
        .bind(consultor_ids)
        .bind(cidades)
        .bind(&params.natureza)
        .bind(&params.status)
        .bind(escopo)
        .fetch_all(&self.pool)
        .await?;

        Ok(registros)
    }

    /// Updates the status tag of an existing record.
    pub async fn atualizar_status(
        &self,
        id: Uuid,
        status: &str,
        papel: &Papel,
    ) -> Result<Indicacao, AppError> {
        let status = status.trim();
        if status.is_empty() {
            return Err(AppError::BadRequest("status cannot be empty".to_string()));
        }

        let atual = sqlx::query_as::<_, Indicacao>(
            r#"
            SELECT id, criado_em, consultor_id, nome_corretor, unidade_corretor,
                   natureza, cidade, nome_cliente, tel_cliente, descricao_situacao, status
            FROM indicacoes WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Indicação {} not found", id)))?;

        exigir_cidade(papel, &atual.cidade)?;

        let registro = sqlx::query_as::<_, Indicacao>(
            r#"
            UPDATE indicacoes SET status = $2
            WHERE id = $1
            RETURNING id, criado_em, consultor_id, nome_corretor, unidade_corretor,
                      natureza, cidade, nome_cliente, tel_cliente, descricao_situacao, status
            "#,
        )
        .bind(id)
        .bind(status)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!("Indicação {}: status '{}' -> '{}'", id, atual.status, status);

        Ok(registro)
    }
}
