use chrono::NaiveDate;
use std::{
    cell::{Cell, RefCell},
    collections::BTreeMap,
    fs,
    path::Path,
};

use mail_attachments_archiver::{
    archiver, backend, Archiver, ArchiverConfig, Backend, Email, Flag, Flags, MappingRule,
    Report,
};

#[derive(Debug, Clone)]
struct StoredEmail {
    email: Email,
    flags: Flags,
    labels: Vec<String>,
}

/// In-memory mailbox mimicking the IMAP semantics the archiver
/// relies on: copies keep flags, expunge drops deleted emails.
#[derive(Default)]
struct MemoryBackend {
    folders: RefCell<BTreeMap<String, Vec<StoredEmail>>>,
    calls: RefCell<Vec<String>>,
}

impl MemoryBackend {
    fn with_inbox<I: IntoIterator<Item = Email>>(emails: I) -> Self {
        let inbox = emails
            .into_iter()
            .map(|email| StoredEmail {
                email,
                flags: Flags::default(),
                labels: vec![],
            })
            .collect();
        let backend = Self::default();
        backend.folders.borrow_mut().insert("INBOX".into(), inbox);
        backend
    }

    fn with_email<T>(
        &self,
        folder: &str,
        id: &str,
        f: impl FnOnce(&mut StoredEmail) -> T,
    ) -> backend::Result<T> {
        self.folders
            .borrow_mut()
            .get_mut(folder)
            .and_then(|emails| emails.iter_mut().find(|stored| stored.email.id == id))
            .map(f)
            .ok_or_else(|| backend::Error::FindEmailError(id.into(), folder.into()))
    }

    fn ids(&self, folder: &str) -> Vec<String> {
        self.folders
            .borrow()
            .get(folder)
            .map(|emails| emails.iter().map(|stored| stored.email.id.clone()).collect())
            .unwrap_or_default()
    }

    fn flags(&self, folder: &str, id: &str) -> Flags {
        self.with_email(folder, id, |stored| stored.flags.clone())
            .unwrap()
    }

    fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }
}

impl Backend for MemoryBackend {
    fn search_emails(&self, folder: &str, query: &str) -> backend::Result<Vec<String>> {
        self.calls.borrow_mut().push(format!("search {}", query));
        Ok(self
            .folders
            .borrow()
            .get(folder)
            .into_iter()
            .flatten()
            .filter(|stored| query != "UNSEEN" || !stored.flags.contains(&Flag::Seen))
            .map(|stored| stored.email.id.clone())
            .collect())
    }

    fn get_email(&self, folder: &str, id: &str) -> backend::Result<Email> {
        self.with_email(folder, id, |stored| stored.email.clone())
    }

    fn add_folder(&self, folder: &str) -> backend::Result<bool> {
        let mut folders = self.folders.borrow_mut();
        if folders.contains_key(folder) {
            return Ok(false);
        }
        self.calls.borrow_mut().push(format!("create {}", folder));
        folders.insert(folder.into(), vec![]);
        Ok(true)
    }

    fn copy_email(&self, from_folder: &str, to_folder: &str, id: &str) -> backend::Result<()> {
        let stored = self.with_email(from_folder, id, |stored| stored.clone())?;
        self.folders
            .borrow_mut()
            .get_mut(to_folder)
            .ok_or_else(|| backend::Error::FindEmailError(id.into(), to_folder.into()))?
            .push(stored);
        self.calls
            .borrow_mut()
            .push(format!("copy {} {}", id, to_folder));
        Ok(())
    }

    fn add_flags(&self, folder: &str, id: &str, flags: &Flags) -> backend::Result<()> {
        self.with_email(folder, id, |stored| stored.flags.extend(flags.iter().cloned()))
    }

    fn add_labels(&self, folder: &str, id: &str, labels: &[&str]) -> backend::Result<()> {
        self.with_email(folder, id, |stored| {
            stored.labels.extend(labels.iter().map(|label| label.to_string()))
        })
    }

    fn expunge(&self, folder: &str) -> backend::Result<()> {
        self.calls.borrow_mut().push(format!("expunge {}", folder));
        if let Some(emails) = self.folders.borrow_mut().get_mut(folder) {
            emails.retain(|stored| !stored.flags.contains(&Flag::Deleted));
        }
        Ok(())
    }

    fn close(&self) -> backend::Result<()> {
        Ok(())
    }
}

fn email_with_attachment(id: u32, from: &str, subject: &str) -> Email {
    let raw = format!(
        concat!(
            "From: {}\r\n",
            "To: Bob <bob@localhost>\r\n",
            "Subject: {}\r\n",
            "Date: Mon, 02 Jan 2023 03:04:05 +0000\r\n",
            "MIME-Version: 1.0\r\n",
            "Content-Type: multipart/mixed; boundary=boundary\r\n",
            "\r\n",
            "--boundary\r\n",
            "Content-Type: text/plain\r\n",
            "\r\n",
            "Please find the report attached.\r\n",
            "--boundary\r\n",
            "Content-Type: application/pdf; name=\"report.pdf\"\r\n",
            "Content-Disposition: attachment; filename=\"report.pdf\"\r\n",
            "Content-Transfer-Encoding: base64\r\n",
            "\r\n",
            "JVBERi0xLjQ=\r\n",
            "--boundary--\r\n",
        ),
        from, subject
    );
    Email::new(id, raw)
}

fn plain_email(id: u32, from: &str, subject: &str) -> Email {
    let raw = format!(
        concat!(
            "From: {}\r\n",
            "To: bob@localhost\r\n",
            "Subject: {}\r\n",
            "Date: Mon, 02 Jan 2023 03:04:05 +0000\r\n",
            "Content-Type: text/plain\r\n",
            "\r\n",
            "No attachment here.\r\n",
        ),
        from, subject
    );
    Email::new(id, raw)
}

fn invoice_rule(destination: &Path) -> MappingRule {
    MappingRule {
        filter_sender: true,
        senders: ["a@x.com".to_string()].into_iter().collect(),
        filter_subject: true,
        subjects: vec!["invoice".into()],
        destination: destination.to_owned(),
        ..MappingRule::default()
    }
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 9).unwrap()
}

#[test]
fn test_invoice_attachment_is_saved_and_marked_read() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    let config = ArchiverConfig {
        mappings: vec![invoice_rule(&out)],
        mark_as_read: true,
        ..ArchiverConfig::default()
    };
    let backend =
        MemoryBackend::with_inbox([email_with_attachment(1, "Alice <A@X.com>", "Invoice March")]);

    let report = Archiver::new(&config, &backend).today(today()).run().unwrap();

    assert_eq!(
        Report {
            emails: 1,
            processed: 1,
            saved: 1,
            ..Report::default()
        },
        report
    );
    assert_eq!(b"%PDF-1.4".to_vec(), fs::read(out.join("report.pdf")).unwrap());
    assert!(backend.flags("INBOX", "1").contains(&Flag::Seen));
    assert!(!backend.flags("INBOX", "1").contains(&Flag::Deleted));
    assert_eq!(vec!["search ALL"], backend.calls());
}

#[test]
fn test_rerun_skips_existing_attachments() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    let config = ArchiverConfig {
        mappings: vec![invoice_rule(&out)],
        ..ArchiverConfig::default()
    };
    let backend =
        MemoryBackend::with_inbox([email_with_attachment(1, "a@x.com", "Invoice March")]);
    let archiver = Archiver::new(&config, &backend).today(today());

    let first = archiver.run().unwrap();
    fs::write(out.join("report.pdf"), "kept").unwrap();
    let second = archiver.run().unwrap();

    assert_eq!(1, first.saved);
    assert_eq!(0, second.saved);
    assert_eq!(1, second.duplicates);
    assert_eq!("kept", fs::read_to_string(out.join("report.pdf")).unwrap());
}

#[test]
fn test_date_prefix() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    let config = ArchiverConfig {
        mappings: vec![MappingRule {
            add_date: true,
            ..invoice_rule(&out)
        }],
        ..ArchiverConfig::default()
    };
    let backend =
        MemoryBackend::with_inbox([email_with_attachment(1, "a@x.com", "Invoice March")]);

    Archiver::new(&config, &backend).today(today()).run().unwrap();

    assert!(out.join("20230102_report.pdf").is_file());
}

#[test]
fn test_non_multipart_email_is_never_extracted() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    let config = ArchiverConfig {
        mappings: vec![MappingRule {
            destination: out.clone(),
            ..MappingRule::default()
        }],
        mark_as_read: true,
        mark_as_read_no_attachments: true,
        ..ArchiverConfig::default()
    };
    let backend = MemoryBackend::with_inbox([plain_email(1, "a@x.com", "Invoice March")]);

    let report = Archiver::new(&config, &backend).today(today()).run().unwrap();

    assert_eq!(1, report.no_attachments);
    assert!(!out.exists());
    assert!(backend.flags("INBOX", "1").contains(&Flag::Seen));
}

#[test]
fn test_unmatched_email_is_never_extracted() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    let config = ArchiverConfig {
        mappings: vec![invoice_rule(&out)],
        delete_email_no_match: true,
        ..ArchiverConfig::default()
    };
    let backend =
        MemoryBackend::with_inbox([email_with_attachment(1, "eve@x.com", "Invoice March")]);

    let report = Archiver::new(&config, &backend).today(today()).run().unwrap();

    assert_eq!(1, report.no_match);
    assert!(!out.exists());
    assert!(backend.flags("INBOX", "1").contains(&Flag::Deleted));
    assert!(!backend.calls().iter().any(|call| call.starts_with("expunge")));
}

#[test]
fn test_last_matching_rule_wins() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("first");
    let second = dir.path().join("second");
    let config = ArchiverConfig {
        mappings: vec![
            invoice_rule(&first),
            MappingRule {
                destination: second.clone(),
                ..MappingRule::default()
            },
        ],
        ..ArchiverConfig::default()
    };
    let backend =
        MemoryBackend::with_inbox([email_with_attachment(1, "a@x.com", "Invoice March")]);

    Archiver::new(&config, &backend).today(today()).run().unwrap();

    assert!(!first.exists());
    assert!(second.join("report.pdf").is_file());
}

#[test]
fn test_move_to_date_subfolder() {
    let dir = tempfile::tempdir().unwrap();
    let config = ArchiverConfig {
        mappings: vec![invoice_rule(&dir.path().join("out"))],
        move_mail: true,
        move_to_folder: Some("Archive".into()),
        move_to_date_subfolder: true,
        ..ArchiverConfig::default()
    };
    let backend = MemoryBackend::with_inbox([
        email_with_attachment(1, "a@x.com", "Invoice March"),
        email_with_attachment(2, "a@x.com", "Invoice April"),
    ]);

    let report = Archiver::new(&config, &backend).today(today()).run().unwrap();

    assert_eq!(2, report.processed);
    assert!(backend.ids("INBOX").is_empty());
    assert_eq!(vec!["1", "2"], backend.ids("Archive/2024-03-09"));
    assert_eq!(
        vec![
            "search ALL",
            "create Archive/2024-03-09",
            "copy 1 Archive/2024-03-09",
            "expunge INBOX",
            "copy 2 Archive/2024-03-09",
            "expunge INBOX",
        ],
        backend.calls()
    );
}

#[test]
fn test_delete_with_gmail_trash_label() {
    let dir = tempfile::tempdir().unwrap();
    let config = ArchiverConfig {
        mappings: vec![invoice_rule(&dir.path().join("out"))],
        delete_email: true,
        use_gmail_trash_flag_with_delete: true,
        ..ArchiverConfig::default()
    };
    let backend = MemoryBackend::with_inbox([
        email_with_attachment(1, "a@x.com", "Invoice March"),
        plain_email(2, "a@x.com", "Hello"),
    ]);

    let archiver = Archiver::new(&config, &backend).today(today());
    let email = backend.get_email("INBOX", "1").unwrap();
    archiver.process(&email, &mut Report::default()).unwrap();
    let labels = backend
        .with_email("INBOX", "1", |stored| stored.labels.clone())
        .unwrap();

    assert_eq!(vec![String::from("\\Trash")], labels);
    assert!(backend.flags("INBOX", "1").contains(&Flag::Deleted));

    archiver.run().unwrap();

    assert_eq!(vec!["2"], backend.ids("INBOX"));
    assert_eq!(Some("expunge INBOX"), backend.calls().last().map(String::as_str));
}

#[test]
fn test_unread_filter() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    let config = ArchiverConfig {
        mappings: vec![invoice_rule(&out)],
        filter_unread_emails: true,
        mark_as_read: true,
        ..ArchiverConfig::default()
    };
    let backend = MemoryBackend::with_inbox([
        email_with_attachment(1, "a@x.com", "Invoice March"),
        plain_email(2, "a@x.com", "Hello"),
    ]);
    let archiver = Archiver::new(&config, &backend).today(today());

    let first = archiver.run().unwrap();
    let second = archiver.run().unwrap();

    assert_eq!(2, first.emails);
    assert_eq!(1, second.emails);
    assert_eq!(1, second.no_attachments);
    assert_eq!(vec!["search UNSEEN", "search UNSEEN"], backend.calls());
}

#[test]
fn test_failed_attachment_does_not_stop_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    fs::write(&out, "not a directory").unwrap();
    let config = ArchiverConfig {
        mappings: vec![invoice_rule(&out)],
        mark_as_read: true,
        ..ArchiverConfig::default()
    };
    let backend = MemoryBackend::with_inbox([
        email_with_attachment(1, "a@x.com", "Invoice March"),
        email_with_attachment(2, "a@x.com", "Invoice April"),
    ]);

    let report = Archiver::new(&config, &backend).today(today()).run().unwrap();

    assert_eq!(2, report.processed);
    assert_eq!(2, report.failures);
    assert!(backend.flags("INBOX", "1").contains(&Flag::Seen));
    assert!(backend.flags("INBOX", "2").contains(&Flag::Seen));
}

#[test]
fn test_move_unmatched_email_to_date_subfolder() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    let config = ArchiverConfig {
        mappings: vec![invoice_rule(&out)],
        move_mail: true,
        move_to_folder: Some("Archive".into()),
        move_mail_no_match: true,
        move_to_folder_no_match: Some("Unsorted".into()),
        move_to_date_subfolder_no_match: true,
        ..ArchiverConfig::default()
    };
    let backend =
        MemoryBackend::with_inbox([email_with_attachment(1, "eve@x.com", "Invoice March")]);

    let report = Archiver::new(&config, &backend).today(today()).run().unwrap();

    assert_eq!(1, report.no_match);
    assert!(!out.exists());
    assert!(backend.ids("INBOX").is_empty());
    assert_eq!(vec!["1"], backend.ids("Unsorted/2024-03-09"));
    assert_eq!(
        vec![
            "search ALL",
            "create Unsorted/2024-03-09",
            "copy 1 Unsorted/2024-03-09",
            "expunge INBOX",
        ],
        backend.calls()
    );
}

#[test]
fn test_move_email_without_attachments() {
    let dir = tempfile::tempdir().unwrap();
    let config = ArchiverConfig {
        mappings: vec![invoice_rule(&dir.path().join("out"))],
        move_mail: true,
        move_to_folder: Some("Archive".into()),
        move_mail_no_attachments: true,
        move_to_folder_no_attachments: Some("Plain".into()),
        ..ArchiverConfig::default()
    };
    let backend = MemoryBackend::with_inbox([
        plain_email(1, "a@x.com", "Invoice March"),
        email_with_attachment(2, "eve@x.com", "Hello"),
    ]);

    let report = Archiver::new(&config, &backend).today(today()).run().unwrap();

    assert_eq!(1, report.no_attachments);
    assert_eq!(1, report.no_match);
    assert_eq!(vec!["2"], backend.ids("INBOX"));
    assert_eq!(vec!["1"], backend.ids("Plain"));
    assert!(!backend.calls().iter().any(|call| call.contains("Archive")));
}

#[test]
fn test_duplicate_attachment_still_fires_actions() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    let backend =
        MemoryBackend::with_inbox([email_with_attachment(1, "a@x.com", "Invoice March")]);

    let config = ArchiverConfig {
        mappings: vec![invoice_rule(&out)],
        ..ArchiverConfig::default()
    };
    let first = Archiver::new(&config, &backend).today(today()).run().unwrap();
    assert_eq!(1, first.saved);
    assert!(backend.flags("INBOX", "1").is_empty());

    let config = ArchiverConfig {
        mark_as_read: true,
        delete_email: true,
        ..config
    };
    let archiver = Archiver::new(&config, &backend).today(today());
    let email = backend.get_email("INBOX", "1").unwrap();
    let mut report = Report::default();
    archiver.process(&email, &mut report).unwrap();

    assert_eq!(0, report.saved);
    assert_eq!(1, report.duplicates);
    assert!(backend.flags("INBOX", "1").contains(&Flag::Seen));
    assert!(backend.flags("INBOX", "1").contains(&Flag::Deleted));

    archiver.run().unwrap();
    assert!(backend.ids("INBOX").is_empty());
}

/// Mailbox failing every operation, remembering whether it was
/// closed.
#[derive(Default)]
struct BrokenBackend {
    closed: Cell<bool>,
}

impl BrokenBackend {
    fn error(op: &str) -> backend::Error {
        backend::Error::FindEmailError(op.into(), "INBOX".into())
    }
}

impl Backend for BrokenBackend {
    fn search_emails(&self, _: &str, _: &str) -> backend::Result<Vec<String>> {
        Err(Self::error("search"))
    }

    fn get_email(&self, _: &str, _: &str) -> backend::Result<Email> {
        Err(Self::error("get"))
    }

    fn add_folder(&self, _: &str) -> backend::Result<bool> {
        Err(Self::error("add folder"))
    }

    fn copy_email(&self, _: &str, _: &str, _: &str) -> backend::Result<()> {
        Err(Self::error("copy"))
    }

    fn add_flags(&self, _: &str, _: &str, _: &Flags) -> backend::Result<()> {
        Err(Self::error("add flags"))
    }

    fn add_labels(&self, _: &str, _: &str, _: &[&str]) -> backend::Result<()> {
        Err(Self::error("add labels"))
    }

    fn expunge(&self, _: &str) -> backend::Result<()> {
        Err(Self::error("expunge"))
    }

    fn close(&self) -> backend::Result<()> {
        self.closed.set(true);
        Err(Self::error("close"))
    }
}

#[test]
fn test_close_failure_keeps_run_error() {
    let config = ArchiverConfig::default();
    let backend = BrokenBackend::default();

    let err = Archiver::new(&config, &backend)
        .today(today())
        .run_and_close()
        .unwrap_err();

    assert!(backend.closed.get());
    assert!(matches!(
        err,
        archiver::Error::BackendError(backend::Error::FindEmailError(ref op, _)) if op == "search"
    ));
}

#[test]
fn test_run_and_close() {
    let dir = tempfile::tempdir().unwrap();
    let config = ArchiverConfig {
        mappings: vec![invoice_rule(&dir.path().join("out"))],
        ..ArchiverConfig::default()
    };
    let backend =
        MemoryBackend::with_inbox([email_with_attachment(1, "a@x.com", "Invoice March")]);

    let report = Archiver::new(&config, &backend)
        .today(today())
        .run_and_close()
        .unwrap();

    assert_eq!(1, report.saved);
}
