use crate::commands::common::{
    describe_outcome, normalize_note_identifier, open_synchronizer, Context,
};
use crate::error::CliError;

pub async fn run_delete(id: &str, context: &Context) -> Result<(), CliError> {
    let note_id = normalize_note_identifier(id)?;

    let synchronizer = open_synchronizer(context).await?;
    if synchronizer.notes().get(&note_id).await.is_none() {
        return Err(CliError::NoteNotFound(note_id.to_string()));
    }

    let outcome = synchronizer.delete(&note_id).await?;
    println!("{note_id} ({})", describe_outcome(outcome));
    Ok(())
}
