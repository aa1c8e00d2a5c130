use anyhow::Result;

use crate::domain::models::Show;
use crate::domain::reconcile::Reconciliation;
use crate::error::ClientError;

/// Receives the progress and per-show outcomes of a run.
///
/// Exactly one of the `on_show_*` callbacks fires for every show handed to
/// [`Reporter::on_process_shows`].
pub trait Reporter: Send {
    fn on_list_shows(&mut self) {}

    fn on_process_shows(&mut self, _shows: &[Show]) {}

    fn on_show_without_external_id(&mut self, _show: &Show) {}

    fn on_show_not_found_on_provider(&mut self, _show: &Show) {}

    fn on_show_consistent(&mut self, _show: &Show) {}

    fn on_show_inconsistent(&mut self, _show: &Show, _reconciliation: &Reconciliation) {}

    fn on_show_failed(&mut self, _show: &Show, _error: &ClientError) {}

    fn on_complete(&mut self) -> Result<()> {
        Ok(())
    }
}

pub mod console;
pub mod structured;
