use axum::http::HeaderMap;
use moka::future::Cache;
use sha2::{Digest, Sha256};
use sqlx::PgPool;

use crate::errors::AppError;

/// Role resolved from a dashboard credential.
///
/// `Diretoria` reads and writes everything; `Gerente` is limited to the
/// cities listed on its credential row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Papel {
    Diretoria,
    Gerente { cidades: Vec<String> },
}

impl Papel {
    /// Whether this role may touch rows belonging to `cidade`.
    pub fn autoriza_cidade(&self, cidade: &str) -> bool {
        match self {
            Papel::Diretoria => true,
            Papel::Gerente { cidades } => cidades.iter().any(|c| c == cidade),
        }
    }

    /// City filter to append to read queries: `None` means unrestricted.
    pub fn cidades_permitidas(&self) -> Option<Vec<String>> {
        match self {
            Papel::Diretoria => None,
            Papel::Gerente { cidades } => Some(cidades.clone()),
        }
    }
}

/// Cache of resolved roles keyed by token digest (never by the raw token).
/// `None` entries record unknown credentials so repeated bad tokens do not
/// hit the database.
pub type PapelCache = Cache<String, Option<Papel>>;

/// SHA-256 digest of a bearer token, hex encoded. This is the only form in
/// which credentials are stored or cached.
pub fn digest_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Constant-time string comparison (basic implementation)
/// For production, consider using a crypto library like `subtle`
pub fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.as_bytes()
        .iter()
        .zip(b.as_bytes().iter())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

#[derive(Debug, sqlx::FromRow)]
struct AcessoRow {
    token_sha256: String,
    papel: String,
    cidades: Option<Vec<String>>,
}

/// Extract the bearer token from the Authorization header.
fn extrair_token(headers: &HeaderMap) -> Result<&str, AppError> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::Unauthorized("Missing bearer token".to_string()))
}

/// Resolve the presented credential to a role.
///
/// The token is hashed and the digest compared against every `acessos` row
/// in constant time; the outcome (including "unknown") is cached briefly so
/// dashboard polling does not re-scan the table on every request.
pub async fn resolver_papel(
    pool: &PgPool,
    cache: &PapelCache,
    headers: &HeaderMap,
) -> Result<Papel, AppError> {
    let token = extrair_token(headers)?;
    let digest = digest_token(token);

    if let Some(cached) = cache.get(&digest).await {
        return cached.ok_or_else(|| AppError::Unauthorized("Invalid access token".to_string()));
    }

    let rows = sqlx::query_as::<_, AcessoRow>("SELECT token_sha256, papel, cidades FROM acessos")
        .fetch_all(pool)
        .await?;

    // Scan every row even after a hit so the lookup cost does not depend on
    // which credential matched.
    let mut achado: Option<Papel> = None;
    for row in &rows {
        if constant_time_compare(row.token_sha256.trim(), &digest) {
            achado = match row.papel.as_str() {
                "diretoria" => Some(Papel::Diretoria),
                "gerente" => Some(Papel::Gerente {
                    cidades: row.cidades.clone().unwrap_or_default(),
                }),
                outro => {
                    tracing::error!("Unknown papel '{}' in acessos table", outro);
                    None
                }
            };
        }
    }

    cache.insert(digest, achado.clone()).await;

    achado.ok_or_else(|| AppError::Unauthorized("Invalid access token".to_string()))
}

/// Authorization gate for city-bound writes.
pub fn exigir_cidade(papel: &Papel, cidade: &str) -> Result<(), AppError> {
    if papel.autoriza_cidade(cidade) {
        Ok(())
    } else {
        // Deliberately the same failure as a bad credential.
        Err(AppError::Unauthorized(format!(
            "City out of scope: {}",
            cidade
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_hex_sha256() {
        let d = digest_token("segredo");
        assert_eq!(d.len(), 64);
        assert!(d.chars().all(|c| c.is_ascii_hexdigit()));
        // Deterministic
        assert_eq!(d, digest_token("segredo"));
        assert_ne!(d, digest_token("outro segredo"));
    }

    #[test]
    fn constant_time_compare_behaves() {
        assert!(constant_time_compare("abc", "abc"));
        assert!(!constant_time_compare("abc", "abd"));
        assert!(!constant_time_compare("abc", "abcd"));
        assert!(constant_time_compare("", ""));
    }

    #[test]
    fn diretoria_autoriza_qualquer_cidade() {
        let papel = Papel::Diretoria;
        assert!(papel.autoriza_cidade("Itapema"));
        assert!(papel.autoriza_cidade("Itajai"));
        assert_eq!(papel.cidades_permitidas(), None);
    }

    #[test]
    fn gerente_limitado_ao_escopo() {
        let papel = Papel::Gerente {
            cidades: vec!["Itapema".to_string()],
        };
        assert!(papel.autoriza_cidade("Itapema"));
        assert!(!papel.autoriza_cidade("Itajai"));
        assert_eq!(
            papel.cidades_permitidas(),
            Some(vec!["Itapema".to_string()])
        );
    }

    #[test]
    fn gerente_sem_cidades_nao_autoriza_nada() {
        let papel = Papel::Gerente { cidades: vec![] };
        assert!(!papel.autoriza_cidade("Itapema"));
    }

    #[test]
    fn exigir_cidade_rejeita_fora_do_escopo() {
        let papel = Papel::Gerente {
            cidades: vec!["Itapema".to_string()],
        };
        assert!(exigir_cidade(&papel, "Itapema").is_ok());
        assert!(matches!(
            exigir_cidade(&papel, "Itajai"),
            Err(AppError::Unauthorized(_))
        ));
    }
}
