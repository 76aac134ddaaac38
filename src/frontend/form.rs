use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::extract::State;
use axum::response::Html;
use axum::routing::get;
use axum::{Form, Router};
use serde::Deserialize;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::controller::GenerateText;

pub const DEFAULT_FORM_ADDRESS: &str = "127.0.0.1:7860";

pub type SharedGenerator = Arc<dyn GenerateText + Send + Sync>;

#[derive(Deserialize)]
pub struct PromptForm {
    #[serde(default)]
    prompt: String,
}

/// Single-field page: GET renders the empty form, POST runs the controller and renders the
/// result (or the error text) below the form.
pub fn router(generator: SharedGenerator) -> Router {
    Router::new()
        .route("/", get(show_form).post(submit))
        .with_state(generator)
}

pub async fn serve(addr: SocketAddr, generator: SharedGenerator) -> Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("Text Generator form available on http://{}", listener.local_addr()?);
    axum::serve(listener, router(generator))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

/// Resolves on Ctrl-C. If the handler cannot be installed the form keeps serving.
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutting down..."),
        Err(e) => {
            error!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await
        }
    }
}

async fn show_form() -> Html<String> {
    Html(render_page("", None))
}

async fn submit(
    State(generator): State<SharedGenerator>,
    Form(form): Form<PromptForm>,
) -> Html<String> {
    let prompt = form.prompt.clone();
    // the controller does blocking I/O
    let outcome = tokio::task::spawn_blocking(move || generator.generate_text(&prompt)).await;
    let output = match outcome {
        Ok(Ok(text)) => text,
        Ok(Err(err)) => err.to_string(),
        Err(err) => err.to_string(),
    };
    Html(render_page(&form.prompt, Some(&output)))
}

fn render_page(prompt: &str, output: Option<&str>) -> String {
    let output = output
        .map(|text| format!("<h2>Output</h2>\n<pre id=\"output\">{}</pre>\n", escape_html(text)))
        .unwrap_or_default();
    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>Text Generator</title></head>
<body>
<h1>Text Generator</h1>
<p>Enter a prompt to generate text.</p>
<form method="post" action="/">
<textarea name="prompt" rows="4" cols="80">{}</textarea>
<br><button type="submit">Submit</button>
</form>
{}</body>
</html>
"#,
        escape_html(prompt),
        output
    )
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
