use clap::Parser as _;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = url2ref::CliArgs::parse();
    tracing_init(args.verbose);

    let reference = url2ref::run(args).await?;
    println!("{}", reference.wiki_markup());
    Ok(())
}

fn tracing_init(verbose: u8) {
    let default_directive = match verbose {
        0 => "url2ref=warn",
        1 => "url2ref=info",
        2 => "url2ref=debug",
        _ => "trace",
    };
    let filter = EnvFilter::builder()
        .with_default_directive(
            default_directive
                .parse()
                .unwrap_or_else(|_| tracing::level_filters::LevelFilter::WARN.into()),
        )
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
