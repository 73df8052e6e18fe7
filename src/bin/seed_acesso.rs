//! Script to register a dashboard credential without ever storing the raw token.
//!
//! Usage: seed_acesso <descricao> <token> <papel> [cidades]
//!   papel: "diretoria" | "gerente"
//!   cidades: comma-separated list, required for gerente

use dotenvy::dotenv;
use sqlx::postgres::PgPoolOptions;
use std::env;

use rust_roleta_api::acesso::digest_token;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt::init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 4 {
        eprintln!("Usage: seed_acesso <descricao> <token> <papel> [cidades]");
        std::process::exit(1);
    }

    let descricao = &args[1];
    let token = &args[2];
    let papel = &args[3];

    if papel != "diretoria" && papel != "gerente" {
        eprintln!("papel must be 'diretoria' or 'gerente'");
        std::process::exit(1);
    }

    let cidades: Option<Vec<String>> = if papel == "gerente" {
        let lista: Vec<String> = args
            .get(4)
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|c| !c.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        if lista.is_empty() {
            eprintln!("gerente requires a comma-separated cidades list");
            std::process::exit(1);
        }
        Some(lista)
    } else {
        None
    };

    // Database connection
    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?;

    let digest = digest_token(token);

    // Idempotent: re-running with the same token updates the row in place.
    sqlx::query(
        r#"
        INSERT INTO acessos (descricao, token_sha256, papel, cidades)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (token_sha256) DO UPDATE
        SET descricao = EXCLUDED.descricao,
            papel = EXCLUDED.papel,
            cidades = EXCLUDED.cidades
        "#,
    )
    .bind(descricao)
    .bind(&digest)
    .bind(papel)
    .bind(&cidades)
    .execute(&pool)
    .await?;

    tracing::info!(
        "Acesso '{}' registrado (papel: {}, cidades: {:?})",
        descricao,
        papel,
        cidades
    );

    Ok(())
}
