use kn::config::Env;
use kn::plugins::{platform_classifier, platform_launcher};
use kn::utils::signal::cancel_on_interrupt;
use kn::{format_error, Root};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let argv: Vec<String> = std::env::args_os()
        .skip(1)
        .map(|a| a.to_string_lossy().into_owned())
        .collect();
    let env: Env = std::env::vars_os()
        .map(|(k, v)| {
            (
                k.to_string_lossy().into_owned(),
                v.to_string_lossy().into_owned(),
            )
        })
        .collect();

    let root = Root::new(env, platform_classifier(), platform_launcher());
    cancel_on_interrupt(root.cancellation_token());

    let mut stdout = std::io::stdout();
    if let Err(e) = root.run(&argv, &mut stdout).await {
        eprintln!("{}", format_error(&e));
        std::process::exit(1);
    }
}
