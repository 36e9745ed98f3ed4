/*!
 * smbstream CLI - inspect and read SMB shares
 */

use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use smbstream::{logging, ClientConfig, ConnectionId, SessionReader, SmbClient};

#[derive(Parser)]
#[command(name = "smbstream")]
#[command(version, about = "Read-only SMB2/3 client for media streaming", long_about = None)]
struct Cli {
    /// Server host name or address
    #[arg(long, env = "SMBSTREAM_SERVER", global = true)]
    server: Option<String>,

    /// Share name
    #[arg(long, env = "SMBSTREAM_SHARE", global = true)]
    share: Option<String>,

    /// User name
    #[arg(short, long, env = "SMBSTREAM_USER", default_value = "", global = true)]
    user: String,

    /// Password
    #[arg(long, env = "SMBSTREAM_PASSWORD", default_value = "", hide_env_values = true, global = true)]
    password: String,

    /// Domain (overrides the configured default)
    #[arg(long, env = "SMBSTREAM_DOMAIN", global = true)]
    domain: Option<String>,

    /// Configuration file (TOML)
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List a directory
    Ls {
        #[arg(default_value = "/")]
        path: String,

        /// Output format
        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Show whether a path is a file or directory, and its size
    Stat { path: String },

    /// Write a file (or a byte range of it) to stdout
    Cat {
        path: String,

        /// First byte to read
        #[arg(long, default_value = "0")]
        start: u64,

        /// End of the range (exclusive); defaults to end of file
        #[arg(long)]
        end: Option<u64>,
    },

    /// Print the direct smb:// URL for a path
    Url {
        #[arg(default_value = "")]
        path: String,

        /// Embed the connection credentials in the URL
        #[arg(long)]
        with_credentials: bool,
    },

    /// Show negotiated dialect and connection summary
    Info,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match cli.config {
        Some(ref path) => ClientConfig::from_file(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => ClientConfig::default(),
    };
    if cli.verbose {
        config.verbose = true;
    }
    logging::init_logging(&config)?;

    let client = build_client(config)?;
    let server = cli.server.as_deref().context("--server is required")?;
    let share = cli.share.as_deref().context("--share is required")?;
    let domain = cli
        .domain
        .clone()
        .unwrap_or_else(|| client.config().default_domain.clone());
    let conn = client.connect_with_domain(server, share, &cli.user, &cli.password, &domain)?;

    let outcome = execute(&client, conn, &cli);
    client.disconnect(conn)?;
    outcome
}

#[cfg(feature = "smb-native")]
fn build_client(config: ClientConfig) -> Result<SmbClient> {
    Ok(SmbClient::native(config)?)
}

#[cfg(not(feature = "smb-native"))]
fn build_client(_config: ClientConfig) -> Result<SmbClient> {
    bail!("this build has no SMB transport; rebuild with --features smb-native")
}

fn execute(client: &SmbClient, conn: ConnectionId, cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Ls { path, format } => {
            let entries = client.list_directory(conn, path)?;
            match format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&entries)?);
                }
                OutputFormat::Table => {
                    for entry in entries {
                        let modified = chrono::DateTime::from_timestamp(entry.modified as i64, 0)
                            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                            .unwrap_or_default();
                        let kind = if entry.is_directory { "d" } else { "-" };
                        println!("{} {:>14} {:16} {}", kind, entry.size, modified, entry.name);
                    }
                }
            }
        }
        Commands::Stat { path } => {
            if client.directory_exists(conn, path)? {
                println!("{}: directory", path);
            } else if client.file_exists(conn, path)? {
                let session = client.open_file(conn, path)?;
                let size = client.file_size(session);
                client.close_file(session)?;
                println!("{}: file, {} bytes", path, size?);
            } else {
                bail!("{}: not found", path);
            }
        }
        Commands::Cat { path, start, end } => {
            let session = client.open_for_streaming(conn, path)?;
            let copied = client.with_session(session, |s| {
                let mut reader = SessionReader::new(s);
                reader.seek(SeekFrom::Start(*start))?;
                let mut out = io::stdout().lock();
                let copied = match end {
                    Some(end) => {
                        io::copy(&mut reader.take(end.saturating_sub(*start)), &mut out)?
                    }
                    None => io::copy(&mut reader, &mut out)?,
                };
                out.flush()?;
                Ok(copied)
            });
            client.close_file(session)?;
            tracing::info!("Copied {} bytes from {}", copied?, path);
        }
        Commands::Url {
            path,
            with_credentials,
        } => {
            let url = if *with_credentials {
                client.generate_url_with_credentials(conn, path, &cli.user, &cli.password)?
            } else {
                client.generate_direct_url(conn, path)?
            };
            println!("{}", url);
        }
        Commands::Info => {
            println!("{}", client.connection_info(conn)?);
            println!("URL: {}", client.connection_url(conn)?);
        }
    }
    Ok(())
}
