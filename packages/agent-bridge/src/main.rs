use agent_bridge::cli;

fn main() {
    if let Err(err) = cli::run() {
        tracing::error!(error = %err, "agent-bridge failed");
        std::process::exit(1);
    }
}
