// Tether CLI Entry Point

use tether_cli::{output, router::CommandRouter};

#[tokio::main]
async fn main() {
    match CommandRouter::route().await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            output::print_error(&e.user_message());
            std::process::exit(1);
        }
    }
}
