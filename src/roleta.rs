use sqlx::PgPool;

use crate::errors::AppError;
use crate::models::Consultor;

/// Draws beyond this count mean the queue is being hammered faster than we
/// can win a round; surfaced as an infrastructure fault, never retried
/// silently forever.
const MAX_DISPUTAS: u32 = 8;

/// The rotation allocator ("roleta").
///
/// A rotation queue is the set of consultants sharing (natureza, cidade)
/// with `ativo_na_roleta = TRUE`, ordered by `data_ultima_indicacao`
/// ascending, ties broken by `id` ascending. `sortear` picks the head of
/// that queue and advances its timestamp as one atomic step.
pub struct RoletaService {
    pool: PgPool,
}

impl RoletaService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Selects the next consultant for (natureza, cidade) and advances their
    /// rotation timestamp.
    ///
    /// Concurrency contract: two concurrent calls on the same queue never
    /// both take the same consultant while an alternative exists. The
    /// read-then-write is guarded by a compare-and-swap on the timestamp
    /// observed at read time — a second caller that saw the same head loses
    /// the UPDATE (zero rows) and re-reads the new head. On a queue of one,
    /// the loser re-reads the same consultant and wins the next round, so
    /// every caller succeeds.
    ///
    /// # Errors
    ///
    /// * `AppError::NoConsultantAvailable` - the queue is empty or fully
    ///   deactivated. Maps to HTTP 503, not a server fault.
    /// * `AppError::DatabaseError` / `AppError::InternalError` -
    ///   infrastructure faults (storage unreachable, CAS contention beyond
    ///   the retry bound).
    pub async fn sortear(&self, natureza: &str, cidade: &str) -> Result<Consultor, AppError> {
        for tentativa in 1..=MAX_DISPUTAS {
            let cabeca = sqlx::query_as::<_, Consultor>(
                r#"
                SELECT id, nome, email, natureza, cidade, ativo_na_roleta,
                       data_ultima_indicacao, criado_em
                FROM consultores
                WHERE natureza = $1 AND cidade = $2 AND ativo_na_roleta = TRUE
                ORDER BY data_ultima_indicacao ASC, id ASC
                LIMIT 1
                "#,
            )
            .bind(natureza)
            .bind(cidade)
            .fetch_optional(&self.pool)
            .await?;

            let Some(cabeca) = cabeca else {
                return Err(AppError::NoConsultantAvailable(format!(
                    "{}/{}",
                    natureza, cidade
                )));
            };

            // Advance only if nobody moved this consultant since the read.
            // The ativo check keeps a deactivation that raced the draw from
            // being overridden.
            let vencedor = sqlx::query_as::<_, Consultor>(
                r#"
                UPDATE consultores
                SET data_ultima_indicacao = now()
                WHERE id = $1
                  AND data_ultima_indicacao = $2
                  AND ativo_na_roleta = TRUE
                RETURNING id, nome, email, natureza, cidade, ativo_na_roleta,
                          data_ultima_indicacao, criado_em
                "#,
            )
            .bind(cabeca.id)
            .bind(cabeca.data_ultima_indicacao)
            .fetch_optional(&self.pool)
            .await?;

            if let Some(consultor) = vencedor {
                tracing::info!(
                    "Roleta {}/{}: consultor {} ({}) sorteado",
                    natureza,
                    cidade,
                    consultor.id,
                    consultor.nome
                );
                return Ok(consultor);
            }

            tracing::debug!(
                "Roleta {}/{}: perdeu a disputa pelo consultor {} (tentativa {}), relendo fila",
                natureza,
                cidade,
                cabeca.id,
                tentativa
            );
        }

        Err(AppError::InternalError(format!(
            "Rotation queue {}/{} contended beyond {} attempts",
            natureza, cidade, MAX_DISPUTAS
        )))
    }
}
