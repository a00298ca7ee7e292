//! Archiver module.
//!
//! This module contains the session driver: it searches the inbox,
//! classifies every email, extracts the attachments of the matching
//! ones and applies the configured dispositions.

use chrono::{Local, NaiveDate};
use log::{debug, info, warn};
use std::{fmt, result};
use thiserror::Error;

use crate::{
    backend, email, find_match, ArchiverConfig, Backend, Disposition, DispositionEngine,
    DispositionPlan, Email, Extractor, PartOutcome, DEFAULT_INBOX_FOLDER,
};

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    BackendError(#[from] backend::Error),
    #[error(transparent)]
    EmailError(#[from] email::Error),
}

pub type Result<T> = result::Result<T, Error>;

/// Represents the summary of a run.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
pub struct Report {
    pub emails: usize,
    pub no_attachments: usize,
    pub no_match: usize,
    pub processed: usize,
    pub saved: usize,
    pub duplicates: usize,
    pub failures: usize,
}

impl Report {
    fn count(&mut self, disposition: Disposition) {
        self.emails += 1;
        match disposition {
            Disposition::NoAttachments => self.no_attachments += 1,
            Disposition::NoMatch => self.no_match += 1,
            Disposition::Processed => self.processed += 1,
        }
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} email(s): {} processed, {} without match, {} without attachments; \
             {} attachment(s) saved, {} duplicate(s), {} failure(s)",
            self.emails,
            self.processed,
            self.no_match,
            self.no_attachments,
            self.saved,
            self.duplicates,
            self.failures,
        )
    }
}

/// Drives one pass over the inbox of a mailbox.
pub struct Archiver<'a, B: Backend + ?Sized> {
    config: &'a ArchiverConfig,
    backend: &'a B,
    folder: &'a str,
    today: NaiveDate,
}

impl<'a, B: Backend + ?Sized> Archiver<'a, B> {
    pub fn new(config: &'a ArchiverConfig, backend: &'a B) -> Self {
        Self {
            config,
            backend,
            folder: DEFAULT_INBOX_FOLDER,
            today: Local::now().date_naive(),
        }
    }

    /// Overrides the date used to name dated subfolders.
    pub fn today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// Processes every email matching the search query, then
    /// expunges the folder if processed emails are deleted.
    ///
    /// Attachment failures are logged and counted, any other error
    /// stops the run.
    pub fn run(&self) -> Result<Report> {
        let mut report = Report::default();
        let ids = self
            .backend
            .search_emails(self.folder, self.config.search_query())?;
        info!("found {} email(s) in {}", ids.len(), self.folder);

        for id in ids {
            let email = self.backend.get_email(self.folder, &id)?;
            let disposition = self.process(&email, &mut report)?;
            debug!("email {} disposition: {}", id, disposition);
            report.count(disposition);
        }

        if self.config.delete_email {
            debug!("expunging deleted emails from {}", self.folder);
            self.backend.expunge(self.folder)?;
        }

        Ok(report)
    }

    /// Runs the archiver, then closes the backend. A close failure
    /// is only logged so that it cannot hide the result of the run.
    pub fn run_and_close(&self) -> Result<Report> {
        let report = self.run();

        if let Err(err) = self.backend.close() {
            warn!("cannot close backend: {}", err);
        }

        report
    }

    /// Classifies one email, extracts its attachments and applies
    /// the resulting disposition.
    pub fn process(&self, email: &Email, report: &mut Report) -> Result<Disposition> {
        let engine = DispositionEngine::new(self.backend, self.config, self.folder, self.today);
        let mut plan = DispositionPlan::default();

        let parsed = email.parsed()?;
        info!("{}", parsed);

        let disposition = if !parsed.is_multipart() {
            plan.fire(&engine.actions(Disposition::NoAttachments));
            Disposition::NoAttachments
        } else {
            match find_match(&self.config.mappings, &parsed.from, &parsed.to, &parsed.subject) {
                None => {
                    plan.fire(&engine.actions(Disposition::NoMatch));
                    Disposition::NoMatch
                }
                Some(rule) => {
                    let actions = engine.actions(Disposition::Processed);
                    for outcome in Extractor::new(&parsed, rule) {
                        match outcome {
                            PartOutcome::Saved(_) => report.saved += 1,
                            PartOutcome::SkippedDuplicate(_) => report.duplicates += 1,
                            PartOutcome::Failed(err) => {
                                warn!("cannot save attachment of email {}: {}", email.id, err);
                                report.failures += 1;
                            }
                            PartOutcome::SkippedContainer | PartOutcome::SkippedNonAttachment => (),
                        }
                        plan.fire(&actions);
                    }
                    Disposition::Processed
                }
            }
        };

        engine.apply(&email.id, &plan)?;

        Ok(disposition)
    }
}
