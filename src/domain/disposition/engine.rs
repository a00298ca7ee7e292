use chrono::NaiveDate;
use log::{debug, info};

use crate::{
    backend, Action, ArchiverConfig, Backend, Disposition, DispositionPlan, Flag, Flags,
};

/// Represents the Gmail label added before deleting an email, so
/// that Gmail moves it to the trash instead of archiving it.
pub const GMAIL_TRASH_LABEL: &str = "\\Trash";

/// Applies dispositions to the emails of one folder.
pub struct DispositionEngine<'a, B: Backend + ?Sized> {
    backend: &'a B,
    config: &'a ArchiverConfig,
    folder: &'a str,
    today: NaiveDate,
}

impl<'a, B: Backend + ?Sized> DispositionEngine<'a, B> {
    pub fn new(
        backend: &'a B,
        config: &'a ArchiverConfig,
        folder: &'a str,
        today: NaiveDate,
    ) -> Self {
        Self {
            backend,
            config,
            folder,
            today,
        }
    }

    /// Lists the actions fired by the given disposition.
    pub fn actions(&self, disposition: Disposition) -> Vec<Action> {
        self.config.actions_config(disposition).actions(self.today)
    }

    /// Applies every action of the plan to the email, in plan order.
    ///
    /// A moved email is already flagged as deleted and expunged from
    /// the source folder, so a following delete action is skipped.
    pub fn apply(&self, id: &str, plan: &DispositionPlan) -> backend::Result<()> {
        let mut moved = false;

        for action in plan.iter() {
            match action {
                Action::MarkRead => self.mark_read(id)?,
                Action::Move(folder) => {
                    self.move_to(id, folder)?;
                    moved = true;
                }
                Action::Delete if moved => {
                    debug!("email {} already moved, skipping deletion", id)
                }
                Action::Delete => self.delete(id)?,
            }
        }

        Ok(())
    }

    fn mark_read(&self, id: &str) -> backend::Result<()> {
        debug!("marking email {} as read", id);
        self.backend
            .add_flags(self.folder, id, &Flags::from_iter([Flag::Seen]))
    }

    fn delete(&self, id: &str) -> backend::Result<()> {
        debug!("flagging email {} as deleted", id);

        if self.config.use_gmail_trash_flag_with_delete {
            self.backend
                .add_labels(self.folder, id, &[GMAIL_TRASH_LABEL])?;
        }

        self.backend
            .add_flags(self.folder, id, &Flags::from_iter([Flag::Deleted]))
    }

    fn move_to(&self, id: &str, folder: &str) -> backend::Result<()> {
        if self.backend.add_folder(folder)? {
            info!("created folder {}", folder);
        }

        self.backend.copy_email(self.folder, folder, id)?;
        info!("copied email {} to folder {}", id, folder);

        self.delete(id)?;
        self.backend.expunge(self.folder)
    }
}
