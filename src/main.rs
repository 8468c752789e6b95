use std::env;
use std::process::ExitCode;

use clap::Parser;

use batch_sync::{
    config::Config,
    store,
    sync::{self, Action},
};

#[derive(Parser)]
#[command(version, about = "Syncs batch job inputs and outputs with an S3 bucket", long_about = None)]
struct Cli {
    #[arg(short, long, action = clap::ArgAction::Count, help = "Increase debug level (use -d for debug, -dd for trace)")]
    debug: u8,

    /// Action to perform
    #[arg(value_enum)]
    action: Action,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.debug {
        0 => {}
        1 => env::set_var("RUST_LOG", "debug"),
        _ => env::set_var("RUST_LOG", "trace"),
    }
    dotenv::dotenv().ok();
    // progress lines are info, so they show without any flag
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(cli.action).await {
        Ok(()) => {
            println!("Done");
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("error: {:#}", e);
            println!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(action: Action) -> anyhow::Result<()> {
    let config = Config::from_env()?;

    println!("\nConfiguration:");
    println!("-----------------");
    println!("\t{:20}: {:?}", "INPUT_OBJECT_IDS", config.input_object_ids);
    println!("\t{:20}: {}", "SUBMISSION_ID", config.submission_id);
    println!("\t{:20}: {}", "FPS", config.fps);
    println!("\t{:20}: {}", "TIMESTAMP", config.timestamp);
    println!("\t{:20}: {}", "BASE_IMAGE", config.base_image);

    // building the client does no I/O; the folder check in `sync::run` still
    // precedes every request
    let store = store::new(&config)?;
    sync::run(action, &config, &store).await?;

    Ok(())
}
