use std::path::PathBuf;

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::app::service::PublishRequest;
use crate::app::{AppContext, Result};
use crate::cli::Commands;

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub async fn status(ctx: &AppContext, cancel: &CancellationToken) -> Result<()> {
    print_json(&ctx.service.check_login_status(cancel).await?)
}

pub async fn login(ctx: &AppContext, cancel: &CancellationToken) -> Result<()> {
    eprintln!("Scan the QR code in the browser window to log in...");
    print_json(&ctx.service.login(cancel).await?)
}

pub async fn publish(ctx: &AppContext, request: PublishRequest, cancel: &CancellationToken) -> Result<()> {
    print_json(&ctx.service.publish_content(request, cancel).await?)
}

pub async fn feeds(ctx: &AppContext, cancel: &CancellationToken) -> Result<()> {
    print_json(&ctx.service.list_feeds(cancel).await?)
}

pub async fn search(ctx: &AppContext, keyword: &str, cancel: &CancellationToken) -> Result<()> {
    print_json(&ctx.service.search_feeds(keyword, cancel).await?)
}

pub async fn detail(ctx: &AppContext, feed_id: &str, xsec_token: &str, cancel: &CancellationToken) -> Result<()> {
    print_json(&ctx.service.feed_detail(feed_id, xsec_token, cancel).await?)
}

pub async fn comment(
    ctx: &AppContext,
    feed_id: &str,
    xsec_token: &str,
    content: &str,
    cancel: &CancellationToken,
) -> Result<()> {
    print_json(&ctx.service.post_comment(feed_id, xsec_token, content, cancel).await?)
}

pub async fn archive(
    ctx: &AppContext,
    limit: Option<usize>,
    output: Option<PathBuf>,
    cancel: &CancellationToken,
) -> Result<()> {
    let response = ctx.service.save_recommended_feeds(limit, output, cancel).await?;
    if response.saved == 0 {
        eprintln!("No notes saved");
    }
    print_json(&response)
}

/// Run one parsed command to completion.
pub async fn run(ctx: &AppContext, command: Commands, cancel: &CancellationToken) -> Result<()> {
    match command {
        Commands::Status => status(ctx, cancel).await,
        Commands::Login => login(ctx, cancel).await,
        Commands::Publish {
            title,
            content,
            images,
            tags,
        } => {
            let request = PublishRequest {
                title,
                content,
                images,
                tags,
            };
            publish(ctx, request, cancel).await
        }
        Commands::Feeds => feeds(ctx, cancel).await,
        Commands::Search { keyword } => search(ctx, &keyword, cancel).await,
        Commands::Detail {
            feed_id,
            xsec_token,
        } => detail(ctx, &feed_id, &xsec_token, cancel).await,
        Commands::Comment {
            feed_id,
            xsec_token,
            content,
        } => comment(ctx, &feed_id, &xsec_token, &content, cancel).await,
        Commands::Archive { limit, output } => archive(ctx, limit, output, cancel).await,
    }
}
