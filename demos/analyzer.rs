use argh::FromArgs;
use std::sync::Arc;
use vlm_analyzer::{Dispatcher, GeminiConfig, GeminiModel, server};

// defaults for the server
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3000;

#[derive(FromArgs)]
/// Serves a form that describes uploaded images with a hosted vision model.
struct AnalyzerArgs {
    /// the host to run the server on
    #[argh(option, short = 'h', default = "DEFAULT_HOST.to_string()")]
    host: String,

    /// the port to run the server on
    #[argh(option, short = 'p', default = "DEFAULT_PORT")]
    port: u16,

    /// the model to call, overriding GEMINI_MODEL
    #[argh(option, short = 'm')]
    model: Option<String>,

    /// the largest accepted upload in bytes
    #[argh(option, default = "server::DEFAULT_MAX_UPLOAD_BYTES")]
    max_upload_bytes: usize,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args: AnalyzerArgs = argh::from_env();

    // format the host and port
    let addr = format!("{}:{}", args.host, args.port);

    let mut config = GeminiConfig::from_env();
    if let Some(model) = args.model {
        config = config.with_model(model);
    }
    log::debug!("Using {:?}", config);

    let dispatcher = Arc::new(Dispatcher::new(GeminiModel::new(config)));
    let app = server::router(dispatcher, args.max_upload_bytes);

    log::info!("Starting the analyzer");
    log::info!("Listening on: http://{}", addr);
    log::info!("Press Ctrl+C to stop the server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
