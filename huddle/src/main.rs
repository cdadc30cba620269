use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};

use huddle::builder::{App, AppBuilder};
use huddle::config::Config;
use huddle::console::{Command, HELP};
use huddle::logging::init_logging;
use huddle::types::{AiMessage, ChangeEvent, ChannelKind, Message};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
    Channel,
    AiChat,
}

enum Input {
    Line(Option<String>),
    Chat(ChangeEvent),
    AiChat(ChangeEvent),
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let config = Config::load().map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;
    init_logging(&config.logging)?;

    tracing::info!("Starting huddle ({})", config.environment);
    let mut app = AppBuilder::from_config(&config).build()?;

    let mode = app.start().await;
    if let Some(reason) = mode.reason() {
        println!("! offline: {}", reason);
    }
    render_channels(&app);
    render_messages(&app);

    let mut focus = Focus::Channel;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let input = {
            let (chat, ai_chat) = app.hooks_mut();
            tokio::select! {
                line = lines.next_line() => Input::Line(line.context("Failed to read stdin")?),
                Some(event) = chat.recv_change() => Input::Chat(event),
                Some(event) = ai_chat.recv_change() => Input::AiChat(event),
            }
        };

        match input {
            Input::Line(None) => break,
            Input::Line(Some(line)) => {
                let command = match Command::parse(&line) {
                    None => continue,
                    Some(Ok(command)) => command,
                    Some(Err(e)) => {
                        println!("! {}", e);
                        continue;
                    }
                };
                if command == Command::Quit {
                    break;
                }
                if let Err(e) = execute(&mut app, &mut focus, command).await {
                    println!("! {}", e);
                }
            }
            Input::Chat(event) => {
                let before = app.chat().messages().len();
                if let Err(e) = app.chat_mut().apply_change(event).await {
                    tracing::warn!("Skipping change event: {}", e);
                }
                for message in &app.chat().messages()[before.min(app.chat().messages().len())..] {
                    print_message(&app, message);
                }
            }
            Input::AiChat(event) => {
                let before = app.ai_chat().messages().len();
                if let Err(e) = app.ai_chat_mut().apply_change(event).await {
                    tracing::warn!("Skipping change event: {}", e);
                }
                for message in &app.ai_chat().messages()[before.min(app.ai_chat().messages().len())..] {
                    print_ai_message(&app, message);
                }
            }
        }
    }

    app.shutdown().await;
    Ok(())
}

async fn execute(app: &mut App, focus: &mut Focus, command: Command) -> Result<()> {
    match command {
        Command::Channels => render_channels(app),
        Command::Join(target) => {
            let id = app
                .chat()
                .channels()
                .iter()
                .chain(app.chat().direct_messages())
                .find(|c| c.name == target || c.id == target)
                .map(|c| c.id.clone())
                .unwrap_or(target);
            app.chat_mut().select_by_id(&id).await?;
            *focus = Focus::Channel;
            render_messages(app);
        }
        Command::Direct(user_id) => {
            app.chat_mut().create_direct_channel(&user_id).await?;
            *focus = Focus::Channel;
            render_messages(app);
        }
        Command::NewChannel(name) => {
            let channel = app.chat_mut().create_channel(&name, ChannelKind::Group, false).await?;
            println!("# created {}", channel.name);
            *focus = Focus::Channel;
        }
        Command::Members => {
            let channel_id = match app.chat().active_channel() {
                Some(channel) => channel.id.clone(),
                None => {
                    println!("! no channel selected");
                    return Ok(());
                }
            };
            for member in app.chat_mut().channel_members(&channel_id).await? {
                let name = member.member_name.as_deref().unwrap_or(&member.member_id);
                let badge = if member.is_admin { " (admin)" } else { "" };
                println!("  {}{}", name, badge);
            }
        }
        Command::NewAiChat(prompt) => {
            println!("… thinking");
            let chat = app.ai_chat_mut().create_chat(&prompt).await?;
            *focus = Focus::AiChat;
            println!("# {}", chat.title);
            render_ai_messages(app);
        }
        Command::Chats => {
            for (index, chat) in app.ai_chat().chats().iter().enumerate() {
                let marker = if app.ai_chat().active_chat().is_some_and(|a| a.id == chat.id) { "*" } else { " " };
                println!("{} {}. {} [{}]", marker, index + 1, chat.title, chat.privacy);
            }
        }
        Command::Open(target) => {
            let id = target
                .parse::<usize>()
                .ok()
                .and_then(|n| n.checked_sub(1))
                .and_then(|i| app.ai_chat().chats().get(i))
                .map(|c| c.id.clone())
                .unwrap_or(target);
            app.ai_chat_mut().select_by_id(&id).await?;
            *focus = Focus::AiChat;
            render_ai_messages(app);
        }
        Command::Privacy(privacy) => {
            let chat_id = active_ai_chat(app)?;
            let chat = app.ai_chat_mut().update_chat_privacy(&chat_id, privacy).await?;
            println!("# {} is now {}", chat.title, chat.privacy);
        }
        Command::DeleteChat => {
            let chat_id = active_ai_chat(app)?;
            app.ai_chat_mut().delete_chat(&chat_id).await?;
            println!("# chat deleted");
            *focus = Focus::Channel;
        }
        Command::Upload(path) => {
            let bytes = tokio::fs::read(&path)
                .await
                .with_context(|| format!("Failed to read {}", path))?;
            let file_name = std::path::Path::new(&path)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.clone());
            let uploaded = app
                .resources()
                .upload(&file_name, bytes, "application/octet-stream")
                .await?;
            println!("# uploaded {} ({} bytes): {}", uploaded.file_name, uploaded.size, uploaded.public_url);
        }
        Command::Help => println!("{}", HELP),
        Command::Quit => {}
        Command::Say(text) => match focus {
            Focus::Channel => {
                let message = app.chat_mut().send(&text).await?;
                print_message(app, &message);
            }
            Focus::AiChat => {
                println!("… thinking");
                let reply = app.ai_chat_mut().send_message(&text).await?;
                print_ai_message(app, &reply);
            }
        },
    }
    Ok(())
}

fn active_ai_chat(app: &App) -> Result<String> {
    app.ai_chat()
        .active_chat()
        .map(|c| c.id.clone())
        .context("No AI chat selected. Use /chats and /open first")
}

fn render_channels(app: &App) {
    let chat = app.chat();
    let active = chat.active_channel().map(|c| c.id.as_str());
    println!("Channels");
    for channel in chat.channels() {
        let marker = if Some(channel.id.as_str()) == active { "*" } else { " " };
        println!("{} #{}", marker, chat.channel_display_name(channel));
    }
    if !chat.direct_messages().is_empty() {
        println!("Direct messages");
        for channel in chat.direct_messages() {
            let marker = if Some(channel.id.as_str()) == active { "*" } else { " " };
            println!("{} @{}", marker, chat.channel_display_name(channel));
        }
    }
    if let Some(error) = chat.last_error() {
        println!("! {}", error);
    }
}

fn render_messages(app: &App) {
    if let Some(channel) = app.chat().active_channel() {
        println!("── {} ──", app.chat().channel_display_name(channel));
    }
    for message in app.chat().messages() {
        print_message(app, message);
    }
}

fn render_ai_messages(app: &App) {
    for message in app.ai_chat().messages() {
        print_ai_message(app, message);
    }
}

fn print_message(app: &App, message: &Message) {
    let author = message
        .user_id
        .as_deref()
        .and_then(|id| app.chat().users().get(id))
        .map(|u| u.display_name())
        .unwrap_or_else(|| "Unknown".to_string());
    println!("[{}] {}: {}", message.created_at.format("%H:%M"), author, message.content);
}

fn print_ai_message(app: &App, message: &AiMessage) {
    let me = app.user().map(|u| u.id.as_str());
    let author = match message.user_id.as_deref() {
        _ if message.is_ai => "AI".to_string(),
        Some(id) if Some(id) == me => "You".to_string(),
        Some(id) => app
            .chat()
            .users()
            .get(id)
            .map(|u| u.display_name())
            .unwrap_or_else(|| "Member".to_string()),
        None => "Member".to_string(),
    };
    println!("[{}] {}: {}", message.created_at.format("%H:%M"), author, message.content);
}
