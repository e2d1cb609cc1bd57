use crate::commands::common::{
    describe_outcome, normalize_note_identifier, open_synchronizer, resolve_content, Context,
};
use crate::error::CliError;

pub async fn run_edit(id: &str, content_parts: &[String], context: &Context) -> Result<(), CliError> {
    let note_id = normalize_note_identifier(id)?;
    let content = resolve_content(content_parts)?;

    let synchronizer = open_synchronizer(context).await?;
    let note = synchronizer
        .notes()
        .get(&note_id)
        .await
        .ok_or_else(|| CliError::NoteNotFound(note_id.to_string()))?;

    if note.content == content && !note.is_pending() {
        println!("{note_id}");
        return Ok(());
    }

    let outcome = synchronizer.update(&note_id, &content).await?;
    println!("{note_id} ({})", describe_outcome(outcome));
    Ok(())
}
