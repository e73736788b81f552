use clap::Parser;
use larder_core::Server;
use std::num::NonZeroUsize;

/// Serve the working directory as an HTTP/1.1 key-value file store.
#[derive(Parser)]
#[command(name = "larder")]
#[command(about = "A multi-threaded HTTP/1.1 file-store server")]
#[command(version)]
struct Cli {
    /// Number of worker threads.
    #[arg(short = 't', long = "threads", default_value = "4")]
    threads: NonZeroUsize,

    /// TCP port to listen on.
    #[arg(value_parser = clap::value_parser!(u16).range(1..))]
    port: u16,
}


fn main() {
    let cli = Cli::parse();

    larder_core::logging::init_logging();

    let server = Server::bind(cli.port).workers(cli.threads.get());
    if let Err(err) = server.serve() {
        tracing::error!(error = %err, "server failed");
        std::process::exit(1);
    }
}
