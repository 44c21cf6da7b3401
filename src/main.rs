use backup_relay::core::system::System;
use clap::{Parser, Subcommand};
use macros::log;
use std::path::PathBuf;
use std::process::ExitCode;
use uuid::Uuid;

#[derive(Parser)]
#[command(
    name = "backup-relay",
    version,
    about = "Runs scheduled backups to local, SFTP, SMB, Dropbox and Google Drive targets"
)]
struct Cli {
    /// Configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Arm every active schedule and run until Ctrl-C
    Serve,

    /// Run one backup for a schedule now
    Run {
        /// Schedule id
        schedule: Uuid,
    },

    /// Print the next trigger instants of a schedule
    Next {
        /// Schedule id
        schedule: Uuid,
        /// Number of instants to print
        #[arg(short = 'n', long, default_value = "5")]
        count: usize,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let system = match System::initialize(&cli.config).await {
        Ok(system) => system,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command {
        Commands::Serve => system.run().await,
        Commands::Run { schedule } => system
            .engine()
            .run_schedule_now(schedule)
            .await
            .map(|record| println!("{} {} {} bytes", record.uuid, record.status, record.size)),
        Commands::Next { schedule, count } => {
            system
                .engine()
                .next_triggers(schedule, count)
                .await
                .map(|instants| {
                    let zone = system.engine().zone();
                    for instant in instants {
                        println!("{}", zone.render(instant));
                    }
                })
        }
    };

    let code = match &result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log!(err);
            ExitCode::FAILURE
        }
    };
    system.terminate().await;
    code
}
