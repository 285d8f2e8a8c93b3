//! End-to-end delivery through the public API.

#![allow(clippy::unwrap_used)]

use mailwright::{Attachment, DirectoryTransport, Mailer, MailerConfig, MemoryTransport, Message};
use std::collections::HashMap;

#[tokio::test]
async fn file_attachment_is_read_once_and_delivered() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("report.csv");
    std::fs::write(&path, "a,b\n1,2\n").unwrap();

    let message = Message::new("Report")
        .from("reports@example.com")
        .to("alice@example.com")
        .body("See attached.")
        .html("<p>See attached.</p>")
        .attachment(Attachment::from_path(&path).unwrap());

    let mailer = Mailer::new(MemoryTransport::new(), MailerConfig::default());
    mailer.send(&message).await.unwrap();

    // The file is cached, so later sends never touch the disk
    std::fs::remove_file(&path).unwrap();
    mailer.send(&message).await.unwrap();

    let outbox = mailer.transport().outbox();
    assert_eq!(outbox.len(), 2);

    let root = outbox[1].document.root();
    assert_eq!(root.content_type().mime_type(), "multipart/mixed");
    let csv = &root.parts()[1];
    assert_eq!(csv.content_type().mime_type(), "text/csv");
    assert_eq!(
        csv.header("Content-Disposition"),
        Some("attachment; filename=\"report.csv\"")
    );
    assert_eq!(csv.decoded_text().unwrap().as_deref(), Some("a,b\n1,2\n"));
}

#[tokio::test]
async fn directory_transport_from_settings() {
    let dir = tempfile::tempdir().unwrap();
    let settings: HashMap<String, String> = [
        ("mail.default_sender", "noreply@example.com".to_string()),
        (
            "mail.debug_directory",
            dir.path().join("out").to_string_lossy().into_owned(),
        ),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect();

    let config = MailerConfig::from_settings(&settings, "mail.").unwrap();
    let transport = DirectoryTransport::from_config(&config).unwrap();
    let mailer = Mailer::new(transport, config);

    let message = Message::new("Débogage")
        .to("bob@example.com")
        .bcc("audit@example.com")
        .body("written to disk");
    mailer.send(&message).await.unwrap();

    let files: Vec<_> = std::fs::read_dir(dir.path().join("out"))
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].extension().and_then(|e| e.to_str()), Some("msg"));

    let contents = std::fs::read_to_string(&files[0]).unwrap();
    assert!(contents.contains("From: noreply@example.com\r\n"));
    assert!(contents.contains("Subject: =?utf-8?"));
    assert!(contents.contains("MIME-Version: 1.0\r\n"));
    assert!(!contents.contains("audit@example.com"));
}
