use notekeeper_core::Message;

use crate::cli::MessageCommands;
use crate::commands::common::{
    format_message_line, login, open_client, open_messages, resolve_content, Context,
    MessageSession,
};
use crate::error::CliError;

pub async fn run_messages(command: MessageCommands, context: &Context) -> Result<(), CliError> {
    match command {
        MessageCommands::List { json } => run_messages_list(json, context).await,
        MessageCommands::Send { content } => run_messages_send(&content, context).await,
        MessageCommands::Listen { history } => run_messages_listen(history, context).await,
        MessageCommands::History => run_messages_history(context).await,
    }
}

async fn run_messages_list(as_json: bool, context: &Context) -> Result<(), CliError> {
    let session = open_messages(context).await?;
    let messages = session.messages.list().await;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&messages)?);
    } else if messages.is_empty() {
        println!("No messages yet.");
    } else {
        print_messages(&messages);
    }
    Ok(())
}

async fn run_messages_send(content_parts: &[String], context: &Context) -> Result<(), CliError> {
    let content = resolve_content(content_parts)?;
    let session = open_messages(context).await?;

    let message = session.messages.send_local(&content).await?;

    // Give the channel a bounded window to flush before the process exits
    if tokio::time::timeout(session.config.http_timeout(), session.channel.close())
        .await
        .is_err()
    {
        tracing::warn!("Realtime channel did not flush in time; message is stored locally");
    }
    println!("{}", message.id);
    Ok(())
}

async fn run_messages_listen(with_history: bool, context: &Context) -> Result<(), CliError> {
    let session = open_messages(context).await?;
    if with_history {
        import_history(&session).await?;
    }

    let mut stored = session.messages.attach();
    println!("Listening for messages (Ctrl-C to stop)");

    loop {
        tokio::select! {
            message = stored.recv() => {
                let Some(message) = message else { break };
                println!("{}", format_message_line(&message));
            }
            signal = tokio::signal::ctrl_c() => {
                signal?;
                break;
            }
        }
    }

    session.channel.close().await;
    Ok(())
}

async fn run_messages_history(context: &Context) -> Result<(), CliError> {
    let session = open_messages(context).await?;
    let imported = import_history(&session).await?;
    println!("Imported {imported} new message(s)");
    Ok(())
}

async fn import_history(session: &MessageSession) -> Result<usize, CliError> {
    let client = open_client(&session.config, &*session.store).await?;
    let identifier = login(&client, &*session.store).await?;
    let history = client.list_messages().await?;
    tracing::debug!(total = history.len(), "Fetched message history");

    Ok(session
        .messages
        .import_history(history, Some(&identifier))
        .await?)
}

fn print_messages(messages: &[Message]) {
    for message in messages {
        println!("{}", format_message_line(message));
    }
}
