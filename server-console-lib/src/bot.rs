//! Telegram adapter: one gateway call per inbound message.
//!
//! Replies with command output go to the configured admin chat only; a
//! denied caller gets a refusal and the admin receives an intruder alert
//! naming the caller.

use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::types::InputFile;

use gateway_runtime::util::chunk_text;
use gateway_runtime::{ExecutionRequest, ExecutionResult, Gateway};

use crate::commands::{BotCommand, PING8_COMMAND, TOP_COMMAND, parse_message};

/// Telegram message size limit.
const TELEGRAM_MESSAGE_LIMIT: usize = 4096;

const WELCOME_TEXT: &str = "Welcome to the server console bot. This is a Linux \
server/PC manager; please use /help and read carefully!";

const HELP_TEXT: &str = "This bot has full access to your server/PC, so it can do \
anything. Commands:\n\
/ping8 - ping 8.8.8.8\n\
/top - process snapshot\n\
/htop - htop snapshot as an HTML document\n\
/eval <code> - evaluate Python code\n\
/node <code> - run JavaScript under Node.js\n\
Send a .py document to run it.\n\
Any other text is executed as a shell command.";

const NOT_ADMIN_TEXT: &str = "You cannot use this bot, because you are not Admin!!!!";

struct BotContext {
    gateway: Arc<Gateway>,
    admin_chat_id: ChatId,
}

/// Run the long-polling bot until the process exits.
pub async fn run_bot(token: String, admin_chat_id: i64, gateway: Arc<Gateway>) {
    let bot = Bot::new(token);
    let context = Arc::new(BotContext {
        gateway,
        admin_chat_id: ChatId(admin_chat_id),
    });

    tracing::info!("telegram bot starting (long polling)");
    teloxide::repl(bot, move |bot: Bot, msg: Message| {
        let context = context.clone();
        async move { handle_message(bot, msg, context).await }
    })
    .await;
}

async fn handle_message(bot: Bot, msg: Message, ctx: Arc<BotContext>) -> ResponseResult<()> {
    let chat_id = msg.chat.id;
    let identity = chat_id.0.to_string();

    // Authorization first; a denied caller triggers the intruder alert and
    // nothing is dispatched.
    if ctx.gateway.authorize(&identity).is_err() {
        let username = msg
            .from
            .as_ref()
            .and_then(|user| user.username.clone())
            .unwrap_or_else(|| "unknown".to_string());
        tracing::warn!(%chat_id, %username, "rejected non-admin caller");
        bot.send_message(chat_id, NOT_ADMIN_TEXT).await?;
        bot.send_message(
            ctx.admin_chat_id,
            format!(
                "Someone tried to use this bot:\nchat_id is {chat_id} and username is {username}"
            ),
        )
        .await?;
        return Ok(());
    }

    if let Some(document) = msg.document() {
        return handle_document(bot, ctx, document, identity).await;
    }

    let Some(text) = msg.text() else {
        return Ok(());
    };

    match parse_message(text) {
        BotCommand::Start => {
            bot.send_message(ctx.admin_chat_id, WELCOME_TEXT).await?;
        }
        BotCommand::Help => {
            bot.send_message(ctx.admin_chat_id, HELP_TEXT).await?;
        }
        BotCommand::Ping8 => {
            dispatch_and_reply(&bot, &ctx, ExecutionRequest::shell(PING8_COMMAND, identity))
                .await?;
        }
        BotCommand::Top => {
            dispatch_and_reply(&bot, &ctx, ExecutionRequest::shell(TOP_COMMAND, identity)).await?;
        }
        BotCommand::Htop => {
            handle_htop(&bot, &ctx, identity).await?;
        }
        BotCommand::Eval(code) if code.is_empty() => {
            bot.send_message(
                ctx.admin_chat_id,
                "Please provide Python code to evaluate.\nUsage: /eval <python_code>",
            )
            .await?;
        }
        BotCommand::Eval(code) => {
            dispatch_and_reply(&bot, &ctx, ExecutionRequest::eval(code, identity)).await?;
        }
        BotCommand::Node(code) if code.is_empty() => {
            bot.send_message(
                ctx.admin_chat_id,
                "Please provide JavaScript to run.\nUsage: /node <code>",
            )
            .await?;
        }
        BotCommand::Node(code) => {
            dispatch_and_reply(&bot, &ctx, ExecutionRequest::foreign(code, identity)).await?;
        }
        BotCommand::Unknown(command) => {
            bot.send_message(
                ctx.admin_chat_id,
                format!("Unknown command /{command}. See /help."),
            )
            .await?;
        }
        BotCommand::Shell(command) if command.is_empty() => {}
        BotCommand::Shell(command) => {
            dispatch_and_reply(&bot, &ctx, ExecutionRequest::shell(command, identity)).await?;
        }
    }

    Ok(())
}

async fn dispatch_and_reply(
    bot: &Bot,
    ctx: &BotContext,
    request: ExecutionRequest,
) -> ResponseResult<()> {
    let result = ctx.gateway.execute(request).await;
    reply_chunked(bot, ctx.admin_chat_id, &render_result(&result)).await
}

/// Render a gateway result for chat: plain output on success, a marked
/// error block otherwise.
fn render_result(result: &ExecutionResult) -> String {
    if result.success {
        result.output.clone()
    } else {
        let reason = result
            .error
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_else(|| "unknown failure".to_string());
        format!("❌ Error:\n{reason}")
    }
}

async fn reply_chunked(bot: &Bot, chat_id: ChatId, text: &str) -> ResponseResult<()> {
    for chunk in chunk_text(text, TELEGRAM_MESSAGE_LIMIT) {
        bot.send_message(chat_id, chunk).await?;
    }
    Ok(())
}

/// `/htop`: render an htop snapshot to HTML and send it as a document.
/// Requires `htop` and `aha` on the host.
async fn handle_htop(bot: &Bot, ctx: &BotContext, identity: String) -> ResponseResult<()> {
    for tool in ["htop", "aha"] {
        let check = ctx
            .gateway
            .execute(ExecutionRequest::shell(format!("which {tool}"), identity.clone()))
            .await;
        if check.exit_code != Some(0) {
            bot.send_message(
                ctx.admin_chat_id,
                format!("{tool} is not installed on your system, please install it first and try again"),
            )
            .await?;
            return Ok(());
        }
    }

    let snapshot = match htop_snapshot_file() {
        Ok(file) => file,
        Err(err) => {
            bot.send_message(
                ctx.admin_chat_id,
                format!("Could not create a snapshot file: {err}"),
            )
            .await?;
            return Ok(());
        }
    };
    let result = ctx
        .gateway
        .execute(ExecutionRequest::shell(
            format!(
                "echo q | htop | aha --black --line-fix > {}",
                snapshot.path().display()
            ),
            identity,
        ))
        .await;
    if !result.success {
        reply_chunked(bot, ctx.admin_chat_id, &render_result(&result)).await?;
        return Ok(());
    }

    bot.send_document(
        ctx.admin_chat_id,
        InputFile::file(snapshot.path().to_path_buf()),
    )
    .await?;
    if let Err(err) = snapshot.close() {
        tracing::warn!("failed to remove htop snapshot: {err}");
    }
    Ok(())
}

/// Unique snapshot file per `/htop` request; concurrent requests never
/// collide on a shared path.
fn htop_snapshot_file() -> std::io::Result<tempfile::NamedTempFile> {
    tempfile::Builder::new()
        .prefix("htop-")
        .suffix(".html")
        .tempfile()
}

async fn handle_document(
    bot: Bot,
    ctx: Arc<BotContext>,
    document: &teloxide::types::Document,
    identity: String,
) -> ResponseResult<()> {
    let name = document
        .file_name
        .clone()
        .unwrap_or_else(|| "uploaded_file".to_string());

    let file = bot.get_file(document.file.id.clone()).await?;
    let url = format!(
        "https://api.telegram.org/file/bot{}/{}",
        bot.token(),
        file.path
    );
    let bytes = match reqwest::get(&url).await {
        Ok(response) => match response.bytes().await {
            Ok(bytes) => bytes.to_vec(),
            Err(err) => {
                bot.send_message(ctx.admin_chat_id, format!("Download failed: {err}"))
                    .await?;
                return Ok(());
            }
        },
        Err(err) => {
            bot.send_message(ctx.admin_chat_id, format!("Download failed: {err}"))
                .await?;
            return Ok(());
        }
    };

    let result = ctx
        .gateway
        .execute(ExecutionRequest::upload(name, bytes, identity))
        .await;
    reply_chunked(&bot, ctx.admin_chat_id, &render_result(&result)).await
}
