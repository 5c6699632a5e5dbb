use std::io::Read;

use anyhow::Context;
use clap::{Parser, Subcommand};
use faas_grip::{
    get_websocket, Format, GripError, Item, ProxyRequest, Received, ToProxyResponse,
    WebSocketContext,
};
use grip_telemetry::{init_telemetry, LogFormat, TelemetryConfig};

/// Local harness for GRIP WebSocket-over-HTTP handlers.
#[derive(Debug, Parser)]
#[command(name = "faas-grip", version)]
struct Cli {
    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Read a Lambda proxy event on stdin, echo its messages, print the response.
    Echo {
        /// Channel to subscribe opening connections to.
        #[arg(long)]
        subscribe: Option<String>,
    },
    /// Publish a WebSocket text message to a channel.
    Publish {
        channel: String,
        message: String,
        #[arg(long)]
        id: Option<String>,
        #[arg(long)]
        prev_id: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let telemetry = TelemetryConfig {
        format: if cli.json_logs {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        },
        ..Default::default()
    };
    init_telemetry(&telemetry)?;

    match cli.command {
        Command::Echo { subscribe } => {
            let mut input = String::new();
            std::io::stdin()
                .read_to_string(&mut input)
                .context("failed to read event from stdin")?;
            let event: ProxyRequest =
                serde_json::from_str(&input).context("stdin is not a Lambda proxy event")?;

            let mut ctx = get_websocket(&event)?;
            echo(&mut ctx, subscribe.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&ctx.to_response())?);
        }
        Command::Publish {
            channel,
            message,
            id,
            prev_id,
        } => {
            let mut item = Item::new(vec![Format::ws_message(message)]);
            item.id = id;
            item.prev_id = prev_id;
            faas_grip::publish(&channel, &item).await?;
            tracing::info!(channel = %channel, "published");
        }
    }

    Ok(())
}

/// Accept opening connections and send every message back.
fn echo(ctx: &mut WebSocketContext, subscribe: Option<&str>) -> Result<(), GripError> {
    if ctx.is_opening() {
        ctx.accept();
        if let Some(channel) = subscribe {
            ctx.subscribe(channel);
        }
    }

    while ctx.can_recv() {
        match ctx.recv() {
            Ok(Received::Text(text)) => ctx.send(&text),
            Ok(Received::Binary(bytes)) => ctx.send_binary(&bytes),
            Ok(Received::Close(code)) => {
                ctx.close(code);
                break;
            }
            Err(GripError::Disconnected) => break,
            Err(e) => return Err(e),
        }
    }
    Ok(())
}
