use argh::FromArgs;
use reqwest::multipart::{Form, Part};
use std::path::PathBuf;
use vlm_analyzer::{ImageFormat, messages::AnalyzeReply, messages::StatusReply};

// defaults for the client
const DEFAULT_HOST: &str = "localhost";
const DEFAULT_PORT: u16 = 3000;

#[derive(FromArgs)]
/// Analyzer client for submitting images and checking the server state
struct ClientArgs {
    /// the host to connect to
    #[argh(option, short = 'h', default = "DEFAULT_HOST.to_string()")]
    host: String,

    /// the port to connect to
    #[argh(option, short = 'p', default = "DEFAULT_PORT")]
    port: u16,

    /// command to execute: "analyze" or "status"
    #[argh(subcommand)]
    command: ClientCommands,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum ClientCommands {
    Analyze(AnalyzeCommand),
    Status(StatusCommand),
}

#[derive(FromArgs)]
/// Describe an image, optionally guided by a prompt
#[argh(subcommand, name = "analyze")]
struct AnalyzeCommand {
    /// the path to the image
    #[argh(option, short = 'i')]
    image_path: PathBuf,

    /// the prompt to use
    #[argh(option, short = 'p', default = "String::new()")]
    prompt: String,
}

#[derive(FromArgs)]
/// Check whether the server is busy
#[argh(subcommand, name = "status")]
struct StatusCommand {}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: ClientArgs = argh::from_env();

    let client = reqwest::Client::new();

    // format the host and port
    let addr = format!("{}:{}", args.host, args.port);

    match args.command {
        ClientCommands::Analyze(command) => {
            let file_name = command
                .image_path
                .file_name()
                .and_then(|name| name.to_str())
                .unwrap_or("upload")
                .to_string();
            let mime = command
                .image_path
                .extension()
                .and_then(|ext| ext.to_str())
                .and_then(ImageFormat::from_extension)
                .map(|format| format.mime_type())
                .unwrap_or("application/octet-stream");
            let bytes = tokio::fs::read(&command.image_path).await?;

            let form = Form::new().text("prompt", command.prompt).part(
                "image",
                Part::bytes(bytes).file_name(file_name).mime_str(mime)?,
            );

            let response = client
                .post(format!("http://{}/api/analyze", addr))
                .multipart(form)
                .send()
                .await?;

            match response.json::<AnalyzeReply>().await? {
                AnalyzeReply::Success { response } => {
                    println!("{}", response.response);
                    eprintln!("({} in {:?})", response.model, response.duration);
                }
                AnalyzeReply::Warning { message } | AnalyzeReply::Error { message } => {
                    eprintln!("{}", message);
                    std::process::exit(1);
                }
            }
        }
        ClientCommands::Status(_) => {
            let response = client
                .get(format!("http://{}/status", addr))
                .send()
                .await?;

            let result = response.json::<StatusReply>().await?;
            println!("Result: {}", serde_json::to_string_pretty(&result)?);
        }
    }

    Ok(())
}
