use tranzantions::infra::config::{self, MailTransport, StoreBackend};
use tranzantions::infra::{logging, mailer, ExplorerClient};
use tranzantions::storage::postgres;

fn usage_and_exit() -> ! {
    eprintln!(
        "Usage: cargo run --bin preflight -- [--skip-smtp] [--skip-explorer]\n\
         \n\
         Reads the same env vars as api_server:\n\
           STORE_BACKEND, DATABASE_URL, MAIL_TRANSPORT, SMTP_USERNAME, SMTP_PASSWORD,\n\
           EXPLORER_API_URL, EXPLORER_API_KEY\n"
    );
    std::process::exit(2);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    logging::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.iter().any(|a| a == "-h" || a == "--help") {
        usage_and_exit();
    }
    let skip_smtp = args.iter().any(|a| a == "--skip-smtp");
    let skip_explorer = args.iter().any(|a| a == "--skip-explorer");

    // Force-read config (nice error messages if missing)
    let listen = config::listen_addr()?;
    let backend = config::store_backend()?;
    let transport = config::mail_transport()?;
    let (capacity, retain) = config::ledger_bounds()?;
    let dev_fallback = config::dev_fallback_email()?;

    println!("> Preflight:");
    println!("  LISTEN_ADDR={}", listen);
    println!("  STORE_BACKEND={:?}", backend);
    println!("  MAIL_TRANSPORT={:?}", transport);
    println!("  EXPLORER_API_URL={}", config::explorer_api_url());
    if let Some(email) = &dev_fallback {
        println!("  DEV_FALLBACK_EMAIL={} (enabled)", email);
    }

    let mut failures = 0usize;

    match backend {
        StoreBackend::Postgres => {
            let url = config::database_url()
                .ok_or_else(|| anyhow::anyhow!("STORE_BACKEND=postgres requires DATABASE_URL"))?;
            match postgres::connect(&url, 1).await {
                Ok(pool) => {
                    println!("> Postgres: OK (migrations applied)");
                    pool.close().await;
                }
                Err(e) => {
                    println!("> Postgres: FAILED: {:#}", e);
                    failures += 1;
                }
            }
        }
        StoreBackend::Memory => {
            println!(
                "> Store: in-memory (ledger capacity={}, retain={})",
                capacity, retain
            );
        }
    }

    if transport == MailTransport::Smtp && !skip_smtp {
        match mailer::from_env() {
            Ok(m) => match m.check().await {
                Ok(()) => println!("> SMTP: OK"),
                Err(e) => {
                    println!("> SMTP: FAILED: {}", e);
                    failures += 1;
                }
            },
            Err(e) => {
                println!("> SMTP: FAILED: {:#}", e);
                failures += 1;
            }
        }
    }

    if !skip_explorer {
        let explorer = ExplorerClient::from_env()?;
        match explorer.check().await {
            Ok(()) => println!("> Explorer: OK"),
            Err(e) => {
                println!("> Explorer: FAILED: {}", e);
                failures += 1;
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("Preflight failed ({} check(s))", failures);
    }
    println!("> Preflight OK.");
    Ok(())
}
