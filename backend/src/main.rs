//! tableconverter CLI - melt wide tables into long format
//!
//! ```bash
//! tableconverter melt wide.csv --fixed site,plot            # long CSV on stdout
//! tableconverter melt wide.tsv -s tab -f id -o long.csv     # tab-separated input
//! tableconverter labels wide.csv -s ';'                     # list header columns
//! tableconverter serve --port 8080                          # start HTTP server
//! ```

use clap::{Parser, Subcommand};
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tableconverter::{
    logging::init_logging, melt, read_labels, server::start_server, Delimiter, ServerConfig,
};

#[derive(Parser)]
#[command(name = "tableconverter")]
#[command(about = "Convert wide delimited tables into long (melted) format", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Melt a table: one output row per measurement column
    Melt {
        /// Input file ("-" for stdin)
        input: PathBuf,

        /// Fixed (identifier) columns, comma-separated, in output order
        #[arg(short, long, value_delimiter = ',')]
        fixed: Vec<String>,

        /// Field delimiter: "tab" or a string whose first character is used
        #[arg(short, long, default_value = ",")]
        separator: String,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the trimmed header labels of a table
    Labels {
        /// Input file ("-" for stdin)
        input: PathBuf,

        /// Field delimiter: "tab" or a string whose first character is used
        #[arg(short, long, default_value = ",")]
        separator: String,
    },

    /// Start HTTP server
    Serve {
        /// Port to listen on (overrides TABLECONVERTER_PORT)
        #[arg(short, long)]
        port: Option<u16>,

        /// Seconds an upload waits for conversion (overrides TABLECONVERTER_SESSION_TTL_SECS)
        #[arg(long)]
        session_ttl: Option<u64>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Melt {
            input,
            fixed,
            separator,
            output,
        } => cmd_melt(&input, fixed, &separator, output.as_deref()),

        Commands::Labels { input, separator } => cmd_labels(&input, &separator),

        Commands::Serve { port, session_ttl } => cmd_serve(port, session_ttl).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn open_input(path: &Path) -> io::Result<Box<dyn Read>> {
    if path == Path::new("-") {
        Ok(Box::new(io::stdin().lock()))
    } else {
        Ok(Box::new(File::open(path)?))
    }
}

fn cmd_melt(
    input: &Path,
    mut fixed: Vec<String>,
    separator: &str,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let reader = open_input(input)?;

    let stats = match output {
        Some(path) => {
            let file = File::create(path)?;
            match melt(reader, file, &mut fixed, separator) {
                Ok(stats) => stats,
                Err(e) => {
                    // Output of a failed melt is never valid.
                    let _ = fs::remove_file(path);
                    return Err(e.into());
                }
            }
        }
        None => melt(reader, io::stdout().lock(), &mut fixed, separator)?,
    };

    tracing::info!(
        rows = stats.rows,
        records = stats.records,
        fixed = %fixed.join(","),
        "Melt complete"
    );
    Ok(())
}

fn cmd_labels(input: &Path, separator: &str) -> Result<(), Box<dyn std::error::Error>> {
    let delimiter = Delimiter::from_spec(separator)?;
    let labels = read_labels(open_input(input)?, delimiter)?;

    let mut out = io::stdout().lock();
    for (i, label) in labels.iter().enumerate() {
        writeln!(out, "{:>3}  {}", i, label)?;
    }
    Ok(())
}

async fn cmd_serve(
    port: Option<u16>,
    session_ttl: Option<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = ServerConfig::from_env()?;
    if let Some(port) = port {
        config = config.with_port(port);
    }
    if let Some(secs) = session_ttl {
        config = config.with_session_ttl(Duration::from_secs(secs));
    }
    start_server(config).await
}
