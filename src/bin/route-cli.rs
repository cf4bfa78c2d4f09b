use std::path::PathBuf;
use std::time::Duration;

use axum::http::Method;
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use url::Url;

use route_engine::config::load_config;
use route_engine::http::ControllerRegistry;
use route_engine::lifecycle::build_router;
use route_engine::middleware::MiddlewareRegistry;
use route_engine::routing::Router;

#[derive(Parser)]
#[command(name = "route-cli")]
#[command(about = "Inspect the route table of a route-engine config", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "route-engine.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the flattened routes with their sorted middleware
    Routes,
    /// Resolve a request against the route table
    Match {
        /// HTTP method, e.g. GET
        method: String,
        /// Absolute URL, e.g. http://api.example.com/posts/1
        url: String,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;
    let middleware = MiddlewareRegistry::with_builtins(Duration::from_millis(config.middleware.timeout_ms));
    let router = build_router(&config, &middleware, &ControllerRegistry::with_builtins())?;

    let output = match cli.command {
        Commands::Routes => list_routes(&router),
        Commands::Match { method, url } => match_request(&router, &method, &url)?,
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn list_routes(router: &Router) -> Value {
    let routes: Vec<Value> = router
        .routes()
        .iter()
        .map(|route| {
            let middleware: Vec<String> = route
                .middleware()
                .sorted(router.priority())
                .iter()
                .map(|m| m.name().to_string())
                .collect();
            json!({
                "methods": route.methods().iter().map(Method::as_str).collect::<Vec<_>>(),
                "domain": route.domain(),
                "path": route.path(),
                "name": route.name(),
                "controller": route.controller().label(),
                "middleware": middleware,
            })
        })
        .collect();
    Value::Array(routes)
}

fn match_request(router: &Router, method: &str, url: &str) -> Result<Value, Box<dyn std::error::Error>> {
    let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())?;
    let url = Url::parse(url)?;
    let host = url.host_str().unwrap_or_default();

    let lookup = router.lookup(&method, host, url.path())?;
    let output = match lookup.matched {
        Some(matched) => {
            let params: serde_json::Map<String, Value> = matched
                .params
                .iter()
                .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
                .collect();
            json!({
                "matched": true,
                "path": matched.route.path(),
                "domain": matched.route.domain(),
                "name": matched.route.name(),
                "controller": matched.route.controller().label(),
                "params": params,
                "middleware": matched.pipeline.names(),
            })
        }
        None => json!({
            "matched": false,
            "method_mismatch": lookup.method_mismatch,
            "allowed": router
                .allowed_methods(&method, host, url.path())
                .iter()
                .map(Method::as_str)
                .collect::<Vec<_>>(),
        }),
    };
    Ok(output)
}
