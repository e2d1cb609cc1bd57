use crate::commands::common::{describe_outcome, open_synchronizer, resolve_content, Context};
use crate::error::CliError;

pub async fn run_add(content_parts: &[String], context: &Context) -> Result<(), CliError> {
    let content = resolve_content(content_parts)?;

    let synchronizer = open_synchronizer(context).await?;
    let (note, outcome) = synchronizer.add(&content).await?;

    match note.id {
        Some(id) => println!("{id}"),
        None => println!("Note saved ({})", describe_outcome(outcome)),
    }
    Ok(())
}
