use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use clap::{Parser, Subcommand};
use credential_core::keys::generate_material;
use credential_core::observability::init_tracing;
use credential_core::{Config, CredentialError, CredentialService, SigningAlgorithm, SystemClock};
use secrecy::SecretString;
use std::process::ExitCode;
use std::sync::Arc;

/// Issue and verify credential tokens from the command line.
///
/// Configuration is read from CREDENTIAL_* environment variables and `.env`.
#[derive(Parser)]
#[command(name = "credctl", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Authenticate and print a signed token
    Login {
        /// Account name
        #[arg(long)]
        username: String,

        /// Account password
        #[arg(long, env = "CREDCTL_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Verify a token and print its claims as JSON
    Verify {
        /// Wire token
        token: String,
    },

    /// Print the claims of a token without verifying it
    Inspect {
        /// Wire token
        token: String,
    },

    /// Generate key material for CREDENTIAL_SIGNING_KEY
    Keygen {
        /// HS256, HS384, HS512 or EdDSA
        #[arg(long, default_value = "HS256", value_parser = parse_algorithm)]
        algorithm: SigningAlgorithm,
    },

    /// Print the public verification keys as a JWK set
    Jwks,
}

fn parse_algorithm(name: &str) -> Result<SigningAlgorithm, String> {
    SigningAlgorithm::from_name_ignore_case(name).ok_or_else(|| format!("unsupported algorithm {name}"))
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if let Some(err) = e.downcast_ref::<CredentialError>() {
                eprintln!("error[{}]: {err}", err.code());
            } else {
                eprintln!("error: {e:#}");
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::from_env().context("failed to load configuration")?;
    init_tracing(&config.tracing.clone().with_service_name("credctl"))
        .context("failed to initialize tracing")?;

    let service = || CredentialService::from_config(&config, Arc::new(SystemClock::new()));

    match cli.command {
        Command::Login { username, password } => {
            let token = service()?.login(&username, &SecretString::from(password))?;
            println!("{token}");
        }
        Command::Verify { token } => {
            let claims = service()?.verify(&token)?;
            println!("{}", serde_json::to_string_pretty(&claims)?);
        }
        Command::Inspect { token } => {
            let claims = service()?.inspect(&token)?;
            println!("{}", serde_json::to_string_pretty(&claims)?);
        }
        Command::Jwks => println!("{}", service()?.keys().jwks().to_json()),
        Command::Keygen { algorithm } => {
            let material = generate_material(algorithm)?;
            println!("CREDENTIAL_SIGNING_ALGORITHM={algorithm}");
            println!("CREDENTIAL_SIGNING_KEY={}", STANDARD.encode(material.as_slice()));
        }
    }
    Ok(())
}
