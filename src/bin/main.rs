use std::error::Error;

use clap::Parser;
use smart_backend_auth::config::SmartClientConfig;
use smart_backend_auth::discovery::{HttpEndpointResolver, TokenEndpointResolver};
use smart_backend_auth::http::client::BlockingHttpClient;
use smart_backend_auth::parameters::{Commands, SmartArgs};
use smart_backend_auth::token_manager::HttpTokenManager;
use tracing::Level;

#[derive(Parser, Debug)]
#[command(name = "smart-backend-cli")]
struct Cli {
    /// Log discovery and token exchange steps
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(flatten)]
    args: SmartArgs,

    #[command(subcommand)]
    command: Commands,
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
        .with_writer(std::io::stderr)
        .init();

    let config = SmartClientConfig::try_from(cli.args)?;

    match cli.command {
        Commands::Jwks => println!("{}", config.published_keys().jwks()?),
        Commands::PublicKey => println!("{}", config.published_keys().public_key()?),
        Commands::Endpoint => {
            let fhir_server_url = config
                .fhir_server_url
                .as_deref()
                .ok_or("no FHIR server configured")?;
            let resolver = HttpEndpointResolver::new(BlockingHttpClient::new(&config.http)?);
            println!("{}", resolver.resolve_token_endpoint(fhir_server_url)?);
        }
        Commands::Assertion => {
            let manager = HttpTokenManager::from_config(&config)?;
            println!("{}", manager.build_signed_assertion()?.value());
        }
        Commands::Token {
            token_endpoint,
            output_format,
        } => {
            let manager = HttpTokenManager::from_config(&config)?;
            let token = manager
                .get_access_token(token_endpoint.as_deref())?
                .ok_or("no access token available from the authorization server")?;
            let output = output_format
                .render(&token)
                .ok_or("token response carries no access_token")?;
            println!("{output}");
        }
    }

    Ok(())
}
