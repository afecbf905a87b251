use clap::Parser;

use sdl_engine::cli::Args;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr so they never mix with command output.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let ctx = args.context()?;
    let output = args.command.run(&ctx, args.format)?;
    println!("{}", output);
    Ok(())
}
