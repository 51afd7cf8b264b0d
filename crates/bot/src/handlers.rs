use std::path::PathBuf;
use std::sync::Arc;

use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::types::{CallbackQuery, ChatId, InputFile, User};
use teloxide::utils::command::BotCommands;

use quiz_core::model::UserId;
use services::view::QuestionView;
use services::{EngineError, QuestionReply, QuizEngine};

use crate::callback::CallbackAction;
use crate::render;
use crate::render::{CHOOSE_THEME_TEXT, USE_BUTTONS_TEXT};

pub type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Everything the handlers need: the engine plus the media directory for
/// resolving a question's voice files.
pub struct BotContext {
    pub engine: QuizEngine,
    pub media_dir: PathBuf,
}

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "Available commands:")]
pub enum Command {
    #[command(description = "pick a theme and start")]
    Start,
    #[command(description = "your statistics")]
    Stats,
    #[command(description = "cross-user leaderboard")]
    Leaderboard,
    #[command(description = "reset your statistics")]
    Reset,
    #[command(description = "show this help")]
    Help,
}

/// Update-routing tree: commands, then free text, then button callbacks.
pub fn schema() -> UpdateHandler<Box<dyn std::error::Error + Send + Sync + 'static>> {
    dptree::entry()
        .branch(
            Update::filter_message()
                .filter_command::<Command>()
                .endpoint(handle_command),
        )
        .branch(Update::filter_message().endpoint(handle_message))
        .branch(Update::filter_callback_query().endpoint(handle_callback))
}

/// Run the dispatcher until ctrl-c.
pub async fn run(bot: Bot, ctx: Arc<BotContext>) {
    Dispatcher::builder(bot, schema())
        .dependencies(dptree::deps![ctx])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

fn quiz_user_id(user: &User) -> UserId {
    UserId::new(user.id.0)
}

fn display_name(user: &User) -> String {
    user.username
        .clone()
        .unwrap_or_else(|| user.first_name.clone())
}

async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    ctx: Arc<BotContext>,
) -> HandlerResult {
    let Some(user) = msg.from() else {
        return Ok(());
    };
    let user_id = quiz_user_id(user);
    let name = display_name(user);
    let chat_id = msg.chat.id;
    log::info!("command from user {user_id}: {:?}", msg.text());

    match cmd {
        Command::Start => {
            let themes = ctx.engine.start(user_id, &name).await?;
            bot.send_message(chat_id, format!("Welcome! {CHOOSE_THEME_TEXT}"))
                .reply_markup(render::theme_keyboard(&themes))
                .await?;
        }
        Command::Stats => send_stats(&bot, &ctx, chat_id, user_id, &name).await?,
        Command::Leaderboard => send_leaderboard(&bot, &ctx, chat_id, user_id, &name).await?,
        Command::Reset => {
            ctx.engine.reset(user_id, &name).await?;
            bot.send_message(chat_id, "Your statistics were reset.")
                .reply_markup(render::after_answer_keyboard())
                .await?;
        }
        Command::Help => {
            bot.send_message(chat_id, Command::descriptions().to_string())
                .await?;
        }
    }
    Ok(())
}

async fn handle_message(bot: Bot, msg: Message, ctx: Arc<BotContext>) -> HandlerResult {
    let Some(user) = msg.from() else {
        return Ok(());
    };
    let user_id = quiz_user_id(user);
    let name = display_name(user);

    if ctx.engine.has_pending_question(user_id, &name).await? {
        bot.send_message(msg.chat.id, USE_BUTTONS_TEXT).await?;
        return Ok(());
    }
    send_next_question(&bot, &ctx, msg.chat.id, user_id, &name).await
}

async fn handle_callback(bot: Bot, q: CallbackQuery, ctx: Arc<BotContext>) -> HandlerResult {
    let user_id = quiz_user_id(&q.from);
    let name = display_name(&q.from);

    let Some(chat_id) = q.message.as_ref().map(|m| m.chat.id) else {
        bot.answer_callback_query(q.id).await?;
        return Ok(());
    };
    let Some(action) = q.data.as_deref().and_then(CallbackAction::parse) else {
        // Buttons from an older build of the bot, or garbage.
        bot.answer_callback_query(q.id).await?;
        return Ok(());
    };
    log::info!("callback from user {user_id}: {action:?}");

    match action {
        CallbackAction::SelectTheme(tag) => {
            bot.answer_callback_query(q.id).await?;
            match ctx.engine.select_theme(user_id, &name, &tag).await {
                Ok(view) => send_question(&bot, &ctx, chat_id, &view).await?,
                Err(err) => send_engine_error(&bot, chat_id, &err).await?,
            }
        }
        CallbackAction::Answer {
            question_id,
            option_index,
        } => match ctx
            .engine
            .submit_answer(user_id, &name, question_id, option_index)
            .await
        {
            Ok(result) => {
                bot.answer_callback_query(q.id).await?;
                match render::secondary_text(&result) {
                    Some(secondary) => {
                        bot.send_message(chat_id, render::answer_text(&result)).await?;
                        send_media(&bot, &ctx, chat_id, &result.secondary_media_refs).await;
                        bot.send_message(chat_id, secondary)
                            .reply_markup(render::after_answer_keyboard())
                            .await?;
                    }
                    None => {
                        bot.send_message(chat_id, render::answer_text(&result))
                            .reply_markup(render::after_answer_keyboard())
                            .await?;
                    }
                }
            }
            Err(err @ EngineError::Judge(_)) => {
                // A stale double-tap only warrants a popup, not a chat message.
                let reason = err
                    .rejection()
                    .map_or_else(|| "Question expired.".to_owned(), |r| r.reason);
                bot.answer_callback_query(q.id).text(reason).await?;
            }
            Err(err) => {
                bot.answer_callback_query(q.id).await?;
                send_engine_error(&bot, chat_id, &err).await?;
            }
        },
        CallbackAction::NextQuestion => {
            bot.answer_callback_query(q.id).await?;
            send_next_question(&bot, &ctx, chat_id, user_id, &name).await?;
        }
        CallbackAction::Stats => {
            bot.answer_callback_query(q.id).await?;
            send_stats(&bot, &ctx, chat_id, user_id, &name).await?;
        }
        CallbackAction::Leaderboard => {
            bot.answer_callback_query(q.id).await?;
            send_leaderboard(&bot, &ctx, chat_id, user_id, &name).await?;
        }
        CallbackAction::ChangeTheme => {
            bot.answer_callback_query(q.id).await?;
            bot.send_message(chat_id, CHOOSE_THEME_TEXT)
                .reply_markup(render::theme_keyboard(&ctx.engine.theme_list()))
                .await?;
        }
    }
    Ok(())
}

async fn send_next_question(
    bot: &Bot,
    ctx: &BotContext,
    chat_id: ChatId,
    user_id: UserId,
    name: &str,
) -> HandlerResult {
    match ctx.engine.next_question(user_id, name).await {
        Ok(QuestionReply::Question(view)) => send_question(bot, ctx, chat_id, &view).await,
        Ok(QuestionReply::ChooseTheme(list)) => {
            bot.send_message(chat_id, CHOOSE_THEME_TEXT)
                .reply_markup(render::theme_keyboard(&list))
                .await?;
            Ok(())
        }
        Err(err) => send_engine_error(bot, chat_id, &err).await,
    }
}

async fn send_question(
    bot: &Bot,
    ctx: &BotContext,
    chat_id: ChatId,
    view: &QuestionView,
) -> HandlerResult {
    send_media(bot, ctx, chat_id, &view.media_refs).await;
    bot.send_message(chat_id, render::question_text(view))
        .reply_markup(render::options_keyboard(view))
        .await?;
    Ok(())
}

/// Send voice media, degrading to text-only on failure.
async fn send_media(bot: &Bot, ctx: &BotContext, chat_id: ChatId, media_refs: &[String]) {
    for media in media_refs {
        let path = ctx.media_dir.join(media);
        if let Err(e) = bot.send_voice(chat_id, InputFile::file(path)).await {
            log::warn!("failed to send media '{media}': {e}");
        }
    }
}

async fn send_stats(
    bot: &Bot,
    ctx: &BotContext,
    chat_id: ChatId,
    user_id: UserId,
    name: &str,
) -> HandlerResult {
    match ctx.engine.stats(user_id, name).await {
        Ok(stats) => {
            bot.send_message(chat_id, render::stats_text(&stats))
                .reply_markup(render::after_answer_keyboard())
                .await?;
        }
        Err(err) => send_engine_error(bot, chat_id, &err).await?,
    }
    Ok(())
}

async fn send_leaderboard(
    bot: &Bot,
    ctx: &BotContext,
    chat_id: ChatId,
    user_id: UserId,
    name: &str,
) -> HandlerResult {
    // Scope the ranking to the user's active theme, like the stats view.
    let result = async {
        let stats = ctx.engine.stats(user_id, name).await?;
        ctx.engine
            .leaderboard(user_id, name, stats.active_theme.as_deref())
            .await
    }
    .await;

    match result {
        Ok(board) => {
            bot.send_message(chat_id, render::leaderboard_text(&board, user_id))
                .reply_markup(render::after_answer_keyboard())
                .await?;
        }
        Err(err) => send_engine_error(bot, chat_id, &err).await?,
    }
    Ok(())
}

/// Recoverable rejections go to the user verbatim; faults are logged and
/// answered generically.
async fn send_engine_error(bot: &Bot, chat_id: ChatId, err: &EngineError) -> HandlerResult {
    match err.rejection() {
        Some(rejection) => {
            bot.send_message(chat_id, rejection.reason).await?;
        }
        None => {
            log::error!("engine failure: {err}");
            bot.send_message(chat_id, "Something went wrong, please try again.")
                .await?;
        }
    }
    Ok(())
}
