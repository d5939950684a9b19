//! Echo server.
//!
//! ```text
//! RUST_LOG=debug cargo run --example echo_server
//! curl http://127.0.0.1:8080/echo/hello
//! curl -d 'anything' http://127.0.0.1:8080/echo
//! curl http://127.0.0.1:8080/health
//! ```

use std::sync::Arc;

use quimby::context::Context;
use quimby::controller::{Controller, HealthCheckController};
use quimby::http::StatusCode;
use quimby::server::{Dispatcher, Server};
use tracing_subscriber::EnvFilter;

/// Echoes the `toEcho` path segment on GET and the request body on POST.
struct EchoController;

impl Controller for EchoController {
    fn routes(&self) -> Vec<String> {
        vec!["echo".into(), "echo/{{toEcho}}".into()]
    }

    fn authenticate(&self, _ctx: &Context) -> bool {
        true
    }

    fn get(&self, ctx: &mut Context) {
        let text = ctx
            .uri_parameters()
            .get("toEcho")
            .unwrap_or_default()
            .to_owned();
        ctx.set_header("Content-Type", "text/plain");
        ctx.write(&text);
    }

    fn post(&self, ctx: &mut Context) {
        let body = ctx.read().unwrap_or_default();
        ctx.set_header("Content-Type", "text/plain");
        ctx.write(&String::from_utf8_lossy(&body));
        ctx.set_response("", StatusCode::Ok);
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let mut dispatcher = Dispatcher::new(None);
    dispatcher.add_controller(Arc::new(EchoController))?;
    dispatcher.add_controller(Arc::new(HealthCheckController))?;

    let server = Server::bind("127.0.0.1:8080", dispatcher).await?;
    println!("Listening on http://{}", server.local_addr());
    server.run().await?;
    Ok(())
}
