//! JSON import/export of review progress.
//! A progress file is a JSON array of review states.

use crate::database::ReviewRepository;
use crate::error::Result;
use crate::models::{ReviewState, UserId};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tracing::info;

/// Writes the states to a pretty-printed JSON file at `path`.
pub fn export_states_to_path(states: &[ReviewState], path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, states)?;
    writer.flush()?;
    info!(path = %path.display(), states = states.len(), "Exported progress");
    Ok(())
}

/// Reads states from a progress file. Files written by the legacy web client
/// are accepted too.
pub fn import_states(path: impl AsRef<Path>) -> Result<Vec<ReviewState>> {
    let reader = BufReader::new(File::open(path.as_ref())?);
    let states: Vec<ReviewState> = serde_json::from_reader(reader)?;

    for state in &states {
        state.validate()?;
    }
    Ok(states)
}

/// Imports a progress file into `repo` for `user`, overwriting existing
/// states of the same items. Returns how many states were written.
pub fn import_into<R: ReviewRepository>(
    repo: &mut R,
    user: &UserId,
    path: impl AsRef<Path>,
) -> Result<usize> {
    let path = path.as_ref();
    let states = import_states(path)?;
    for state in &states {
        repo.save(user, state)?;
    }
    info!(path = %path.display(), user = %user, states = states.len(), "Imported progress");
    Ok(states.len())
}
