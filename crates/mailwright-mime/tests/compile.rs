//! End-to-end tests for message compilation.
//!
//! These drive the public API only: build a `Message`, compile it, and
//! inspect the resulting wire document.

#![allow(clippy::unwrap_used)]

use mailwright_mime::encoding::{decode_base64, decode_rfc2047};
use mailwright_mime::{Attachment, Error, Message, Payload, WirePart};
use proptest::prelude::*;

fn base() -> Message {
    Message::new("Hello")
        .from("sender@example.com")
        .to("to@example.com")
}

fn mime_type(part: &WirePart) -> String {
    part.content_type().mime_type()
}

#[test]
fn body_only_is_single_text_part() {
    let document = base().body("just text").to_wire_document().unwrap();
    let root = document.root();

    assert_eq!(mime_type(root), "text/plain");
    assert!(root.parts().is_empty());
    assert_eq!(root.header("Subject"), Some("Hello"));
    assert_eq!(root.header("Content-Transfer-Encoding"), Some("quoted-printable"));
    assert_eq!(root.decoded_text().unwrap().as_deref(), Some("just text"));
}

#[test]
fn html_only_is_single_html_part() {
    let document = base().html("<b>hi</b>").to_wire_document().unwrap();
    assert_eq!(mime_type(document.root()), "text/html");
    assert!(document.root().parts().is_empty());
}

#[test]
fn body_and_html_make_alternative() {
    let document = base()
        .body("plain")
        .html("<p>html</p>")
        .to_wire_document()
        .unwrap();
    let root = document.root();

    assert_eq!(mime_type(root), "multipart/alternative");
    assert_eq!(root.parts().len(), 2);
    assert_eq!(mime_type(&root.parts()[0]), "text/plain");
    assert_eq!(mime_type(&root.parts()[1]), "text/html");
    assert_eq!(root.header("To"), Some("to@example.com"));
}

#[test]
fn attachment_wraps_alternative_in_mixed() {
    let document = base()
        .body("plain")
        .html("<p>html</p>")
        .attachment(Attachment::from_data(vec![1u8, 2, 3]).with_filename("a.png"))
        .attachment(Attachment::from_data("x,y").with_filename("b.csv"))
        .to_wire_document()
        .unwrap();
    let root = document.root();

    assert_eq!(mime_type(root), "multipart/mixed");
    let children: Vec<String> = root.parts().iter().map(mime_type).collect();
    assert_eq!(children, vec!["multipart/alternative", "image/png", "text/csv"]);

    let alternative = &root.parts()[0];
    assert_eq!(mime_type(&alternative.parts()[0]), "text/plain");
    assert_eq!(mime_type(&alternative.parts()[1]), "text/html");
    assert_ne!(
        alternative.content_type().boundary(),
        root.content_type().boundary()
    );

    assert_eq!(
        root.parts()[1].header("Content-Disposition"),
        Some("attachment; filename=\"a.png\"")
    );
    assert_eq!(
        root.parts()[1].header("Content-Type"),
        Some("image/png; name=\"a.png\"")
    );
}

#[test]
fn body_with_attachment_has_no_alternative_level() {
    let document = base()
        .body("plain")
        .attachment(Attachment::from_data("x").with_filename("notes.txt"))
        .to_wire_document()
        .unwrap();
    let root = document.root();

    assert_eq!(mime_type(root), "multipart/mixed");
    assert_eq!(mime_type(&root.parts()[0]), "text/plain");
    assert_eq!(mime_type(&root.parts()[1]), "text/plain");
}

#[test]
fn bcc_never_rendered() {
    let message = base()
        .cc("cc@example.com")
        .bcc("secret@example.com")
        .body("text");
    let document = message.to_wire_document().unwrap();
    let rendered = document.to_string();

    assert!(!rendered.contains("secret@example.com"));
    assert!(!rendered.contains("Bcc:"));
    assert!(rendered.contains("Cc: cc@example.com\r\n"));
    assert!(message.send_to().contains("secret@example.com"));
}

#[test]
fn empty_extra_header_suppresses_cc() {
    let document = base()
        .cc("cc@example.com")
        .header("Cc", "")
        .body("text")
        .to_wire_document()
        .unwrap();
    assert!(document.header("Cc").is_none());
}

#[test]
fn extra_headers_rendered() {
    let document = base()
        .header("reply-to", "replies@example.com")
        .header("X-Campaign", "spring")
        .body("text")
        .to_wire_document()
        .unwrap();
    assert_eq!(document.header("Reply-To"), Some("replies@example.com"));
    assert_eq!(document.header("X-Campaign"), Some("spring"));
}

#[test]
fn header_injection_rejected() {
    let message = Message::new("x\r\nEvil: header")
        .from("a@b.com")
        .to("c@d.com")
        .body("y");
    assert!(matches!(message.validate(), Err(Error::BadHeaders(_))));
    assert!(matches!(message.to_wire_document(), Err(Error::BadHeaders(_))));
}

#[test]
fn missing_pieces_rejected() {
    let no_body = Message::new("x").to("a@b.com");
    assert!(matches!(no_body.validate(), Err(Error::InvalidMessage(_))));

    let no_recipients = Message::new("x").body("y");
    assert!(matches!(no_recipients.validate(), Err(Error::InvalidMessage(_))));

    let no_sender = Message::new("x").body("y").to("a@b.com");
    assert!(matches!(no_sender.validate(), Err(Error::InvalidMessage(_))));
}

#[test]
fn latin1_body_charset() {
    let document = base().body("Hola señor").to_wire_document().unwrap();
    assert_eq!(
        document.header("Content-Type"),
        Some("text/plain; charset=\"iso-8859-1\"")
    );
}

#[test]
fn utf8_body_charset() {
    let document = base().body("Привет").to_wire_document().unwrap();
    assert_eq!(
        document.header("Content-Type"),
        Some("text/plain; charset=\"utf-8\"")
    );
    assert_eq!(
        document.root().decoded_text().unwrap().as_deref(),
        Some("Привет")
    );
}

#[test]
fn body_and_html_as_latin1_attachments() {
    let text = "Ol\u{e1} mundo";
    let html = format!("<p>{text}</p>");
    let document = base()
        .body(
            Attachment::from_data(text)
                .with_content_type("text/plain")
                .with_disposition("inline")
                .with_transfer_encoding("quoted-printable"),
        )
        .html(
            Attachment::from_data(html.as_str())
                .with_content_type("text/html")
                .with_disposition("inline")
                .with_transfer_encoding("quoted-printable"),
        )
        .to_wire_document()
        .unwrap();

    let plain = &document.root().parts()[0];
    assert_eq!(
        plain.header("Content-Type"),
        Some("text/plain; charset=\"iso-8859-1\"")
    );
    assert_eq!(plain.header("Content-Transfer-Encoding"), Some("quoted-printable"));
    assert_eq!(plain.body(), Some(&b"Ol=E1=20mundo"[..]));

    let rich = &document.root().parts()[1];
    assert_eq!(rich.decoded_text().unwrap(), Some(html));
}

#[test]
fn body_attachment_defaults_to_base64() {
    let document = base()
        .body(Attachment::from_data("encoded body"))
        .to_wire_document()
        .unwrap();
    let root = document.root();
    assert_eq!(mime_type(root), "text/plain");
    assert_eq!(root.header("Content-Transfer-Encoding"), Some("base64"));
    assert_eq!(root.decoded_text().unwrap().as_deref(), Some("encoded body"));
}

#[test]
fn declared_windows_1252_charset_is_honoured() {
    let document = base()
        .body(Attachment::from_data("café").with_content_type("text/plain; charset=windows-1252"))
        .to_wire_document()
        .unwrap();
    let root = document.root();
    assert_eq!(
        root.header("Content-Type"),
        Some("text/plain; charset=\"windows-1252\"")
    );
    assert_eq!(root.decoded_body().unwrap().as_deref(), Some(&b"caf\xe9"[..]));
    assert_eq!(root.decoded_text().unwrap().as_deref(), Some("café"));

    let unmappable = base()
        .body(Attachment::from_data("☃").with_content_type("text/plain; charset=koi8-r"));
    assert!(matches!(unmappable.to_wire_document(), Err(Error::Encoding(_))));

    let unknown = base()
        .body(Attachment::from_data("x").with_content_type("text/plain; charset=klingon"));
    assert!(matches!(unknown.to_wire_document(), Err(Error::Encoding(_))));
}

#[test]
fn empty_text_body_is_no_body() {
    assert!(matches!(
        base().body("").to_wire_document(),
        Err(Error::InvalidMessage(_))
    ));

    let document = base().body("").html("<p>x</p>").to_wire_document().unwrap();
    assert_eq!(mime_type(document.root()), "text/html");
    assert!(document.root().parts().is_empty());
}

#[test]
fn quoted_printable_space_before_line_break() {
    let document = base()
        .body(
            Attachment::from_data("line one \nline two")
                .with_content_type("text/plain")
                .with_transfer_encoding("quoted-printable"),
        )
        .to_wire_document()
        .unwrap();
    let body = document.root().body().unwrap();
    let body = std::str::from_utf8(body).unwrap();

    assert!(body.contains("one=20\r\n"));
    assert!(!body.contains(" \r\n"));
}

#[test]
fn seven_bit_attachment_with_high_bytes_fails() {
    let message = base().body("x").attachment(
        Attachment::from_data(vec![0xffu8])
            .with_content_type("application/octet-stream")
            .with_transfer_encoding("7bit"),
    );
    assert!(matches!(message.to_wire_document(), Err(Error::Encoding(_))));
}

#[test]
fn unresolvable_attachment_type_fails() {
    let message = base().body("x").attachment(Attachment::from_data(vec![1u8]));
    assert!(matches!(
        message.to_wire_document(),
        Err(Error::ContentTypeUnresolved(_))
    ));
}

#[test]
fn non_ascii_subject_is_encoded() {
    let document = Message::new("Café ☕")
        .from("José <jose@example.com>")
        .to("to@example.com")
        .body("x")
        .to_wire_document()
        .unwrap();

    let subject = document.header("Subject").unwrap();
    assert!(subject.is_ascii());
    assert_eq!(decode_rfc2047(subject).unwrap(), "Café ☕");

    let from = document.header("From").unwrap();
    assert!(from.ends_with("<jose@example.com>"));
    assert!(from.is_ascii());
}

#[test]
fn long_headers_are_folded() {
    let subject = "x".repeat(1200);
    let mut message = Message::new(subject.as_str())
        .from("sender@example.com")
        .body("x");
    for i in 0..80 {
        message.add_recipient(format!("recipient{i:03}@example.com"));
    }
    let document = message.to_wire_document().unwrap();
    let rendered = document.to_string();

    let longest = rendered.split("\r\n").map(str::len).max().unwrap();
    assert!(longest <= 998, "longest line is {longest}");

    let to = document.header("To").unwrap();
    assert!(format!("To: {to}").split("\r\n").all(|line| line.len() <= 78));
    assert_eq!(to.replace("\r\n", "").split(", ").count(), 80);

    assert_eq!(decode_rfc2047(document.header("Subject").unwrap()).unwrap(), subject);
}

#[test]
fn lazy_source_survives_repeated_compilation() {
    let reader = std::io::Cursor::new(b"%PDF-1.4 fake".to_vec());
    let message = base()
        .body("see attached")
        .attachment(Attachment::from_reader("doc.pdf", reader).unwrap());

    let first = message.to_wire_document().unwrap();
    let second = message.to_wire_document().unwrap();
    assert_eq!(first.to_bytes(), second.to_bytes());

    let pdf = &second.root().parts()[1];
    assert_eq!(
        pdf.decoded_body().unwrap().as_deref(),
        Some(&b"%PDF-1.4 fake"[..])
    );
}

#[test]
fn rendered_document_shape() {
    let document = base().body("hi").to_wire_document().unwrap();
    let rendered = document.to_string();

    let (head, body) = rendered.split_once("\r\n\r\n").unwrap();
    assert!(head.starts_with("Content-Type: text/plain; charset=\"us-ascii\"\r\nMIME-Version: 1.0\r\n"));
    assert!(head.contains("From: sender@example.com"));
    assert!(head.contains("Content-Disposition: inline"));
    assert_eq!(body, "hi");
}

proptest! {
    #[test]
    fn base64_attachment_round_trips(data in proptest::collection::vec(any::<u8>(), 0..4096)) {
        let message = base().body("x").attachment(
            Attachment::from_data(Payload::Binary(data.clone()))
                .with_content_type("application/octet-stream"),
        );
        let document = message.to_wire_document().unwrap();
        let part = &document.root().parts()[1];
        let encoded = std::str::from_utf8(part.body().unwrap()).unwrap();
        prop_assert_eq!(decode_base64(encoded).unwrap(), data);
    }

    #[test]
    fn compilation_is_idempotent(subject in "[a-zA-Z0-9 ]{0,40}", body in "\\PC{1,200}", html in proptest::option::of("\\PC{1,80}")) {
        let mut message = base().body(body);
        message.subject = subject;
        if let Some(html) = html {
            message = message.html(html);
        }
        let first = message.to_wire_document().unwrap();
        let second = message.to_wire_document().unwrap();
        prop_assert_eq!(first.to_bytes(), second.to_bytes());
    }

    #[test]
    fn recipient_union_and_bcc_hidden(
        to in proptest::collection::vec("[a-z]{1,8}@to\\.example", 1..4),
        cc in proptest::collection::vec("[a-z]{1,8}@cc\\.example", 0..4),
        bcc in proptest::collection::vec("[a-z]{1,8}@bcc\\.example", 0..4),
    ) {
        let message = Message {
            recipients: to.clone(),
            cc: cc.clone(),
            bcc: bcc.clone(),
            ..base().body("x")
        };
        let expected: std::collections::BTreeSet<String> =
            to.iter().chain(&cc).chain(&bcc).cloned().collect();
        prop_assert_eq!(message.send_to(), expected);

        let rendered = message.to_wire_document().unwrap().to_string();
        for hidden in &bcc {
            prop_assert!(!rendered.contains(hidden.as_str()));
        }
    }
}
